//! Header-space algebra for NetPlumber
//!
//! - [`TernaryVector`]: a packed wildcard header pattern over `{0, 1, x, z}`
//! - [`HeaderSpace`]: a union of patterns with nested exclusions, closed
//!   under intersection, complement and difference
//! - [`PacketSet`]: the set interface the propagation engine is written against
//!
//! Text forms:
//!
//! ```text
//! vector: 1xxxxxxx,0000x001
//! set:    (1xxxxxxx + (0xxxxxxx - (0xxxxxx1)))
//! empty:  (nil)
//! ```

pub mod error;
pub mod header_space;
pub mod packet_set;
pub mod ternary;

pub use error::{ErrorKind, HsError, Result};
pub use header_space::{HeaderSpace, Term};
pub use packet_set::PacketSet;
pub use ternary::{Combined, TernaryVector, Trit};
