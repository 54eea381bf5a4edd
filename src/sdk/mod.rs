//! Numeric vocabulary of the engine interface: command codes, tag ids, tag types, status codes
//! and the enumerations carried inside tag values and parameter blocks.

mod status;
pub mod tags;

pub use status::{ErrorCode, StatusCode, WarningCode};
