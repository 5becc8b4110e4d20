//! Ternary (0/1/x/z) header patterns

mod algebra;
mod trit;
mod vector;

pub use algebra::Combined;
pub use trit::Trit;
pub use vector::{TernaryVector, TRITS_PER_BYTE, TRITS_PER_WORD};
