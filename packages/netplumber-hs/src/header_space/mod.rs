//! Unions of ternary patterns with nested exclusions

mod parse;
mod set;
mod term;

pub use set::HeaderSpace;
pub use term::Term;
