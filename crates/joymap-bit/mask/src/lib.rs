mod bitmask;

pub use bitmask::{Bitmask, Iter};

/// A fieldless enum whose variants occupy distinct bit positions.
pub trait Bitable: Sized + Copy {
    fn bit(&self) -> u64;
    fn index(&self) -> u32;
    /// Inverse of [`Bitable::index`].
    fn from_index(index: u32) -> Option<Self>;
}
