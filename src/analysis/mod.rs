//! Derived insights computed from a completed analysis payload.
//!
//! Nothing here feeds back into polling; these values only shape how a
//! report is presented.

pub mod mentions;
pub mod visibility;

pub use mentions::*;
pub use visibility::*;
