use joymap_bit_derive::Bit;
use joymap_bit_mask::{Bitable, Bitmask};

/// The four directions a hat switch can report.
#[derive(Bit, Debug, Clone, Copy, PartialEq, Eq)]
enum HatPart {
    West,
    East,
    North,
    South,
}

fn decode(octant: i32) -> Bitmask<HatPart> {
    let mut mask = Bitmask::empty();
    mask.set(HatPart::West, matches!(octant, 5..=7));
    mask.set(HatPart::East, matches!(octant, 1..=3));
    mask.set(HatPart::North, matches!(octant, 7 | 0 | 1));
    mask.set(HatPart::South, matches!(octant, 3..=5));
    mask
}

fn main() {
    let mut previous = Bitmask::empty();
    for octant in 0..8 {
        let current = decode(octant);
        for part in previous.symmetric_difference(&current) {
            let edge = if current.contains(part) { "press" } else { "release" };
            println!("octant {octant}: {part:?} {edge} (bit {})", part.index());
        }
        previous = current;
    }
}
