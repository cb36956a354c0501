//! # lift-core
//!
//! Core types for lift: the error taxonomy shared by every crate, the panel
//! and cohort data model, and the columnar view the causal backend reads.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::ColumnSource;
pub use types::{CohortRow, CohortTable, Observation};
