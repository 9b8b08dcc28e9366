//! Provide the I/O layer that lets captured spans be carved out of the source.

mod input;

pub use input::*;
