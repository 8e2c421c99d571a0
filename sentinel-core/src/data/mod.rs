//! Market data structures
//!
//! Instruments, price samples, and option chain snapshots. These are the
//! boundary types delivered by an external tick source.

pub mod chain;
pub mod instrument;
pub mod sample;

pub use chain::*;
pub use instrument::*;
pub use sample::*;
