//! Shared foundational types used across the Talus FPGA toolchain.
//!
//! This crate provides core types including interned identifiers, content hashing,
//! frequency values, 4-state logic values, packed logic vectors, and the two
//! common result channels: [`TalusResult`]/[`InternalError`] for internal
//! invariant violations, and [`PnrResult`]/[`PnrError`] for user-facing
//! placement/routing failures.

#![warn(missing_docs)]

pub mod frequency;
pub mod hash;
pub mod ident;
pub mod logic;
pub mod logic_vec;
pub mod pnr_error;
pub mod result;

pub use frequency::{Frequency, ParseFrequencyError};
pub use hash::ContentHash;
pub use ident::{Ident, Interner};
pub use logic::Logic;
pub use logic_vec::LogicVec;
pub use pnr_error::{PnrError, PnrResult};
pub use result::{TalusResult, InternalError};
