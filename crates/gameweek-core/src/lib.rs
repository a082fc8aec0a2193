//! gameweek-core: rules for the gameweek lifecycle and points settlement
//!
//! Everything in this crate is pure. Time is always passed in, never read from a clock,
//! so the state machine can be driven from tests and from the store alike.

pub mod errors;
pub mod points;
pub mod ranking;
pub mod status;
pub mod transfers;
pub mod types;

pub use errors::*;
pub use points::*;
pub use ranking::*;
pub use status::*;
pub use transfers::*;
pub use types::*;
