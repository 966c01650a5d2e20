use joymap_bit_derive::Bit;
use joymap_bit_mask::Bitable;

#[derive(Bit, Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Direction {
    West,
    East,
    North,
    South,
}

fn main() {
    assert_eq!(Direction::West.bit(), 1u64 << 0);
    assert_eq!(Direction::South.bit(), 1u64 << 3);
    assert_eq!(Direction::from_index(2), Some(Direction::North));
    assert_eq!(Direction::from_index(4), None);
}
