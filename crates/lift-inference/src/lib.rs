//! # lift-inference
//!
//! Effect analysis for a monthly loyalty-program panel.
//!
//! This crate provides:
//! - A seeded panel simulator with a known treatment effect ([`simulate`])
//! - Pre/post cohort aggregation around a signup month ([`cohort`])
//! - Causal DAGs with DOT I/O and d-separation ([`graph`])
//! - Identification, estimation and refutation ([`causal`])
//!
//! ## Architecture
//!
//! The pipeline talks to a [`causal::CausalBackend`] trait; the native
//! backend is the default and the only one shipped here.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Identification, estimation, refutation and the staged pipeline.
pub mod causal;
/// Pre/post cohort aggregation.
pub mod cohort;
/// Causal DAG with DOT parsing and d-separation.
pub mod graph;
/// Synthetic loyalty-program panel generator.
pub mod simulate;

pub use causal::{
    AnalysisResult, CausalBackend, CausalEstimate, CausalPipeline, Estimand, EstimationMethod,
    NativeBackend, RefutationOutcome, RefutationResult, RefuteOptions, Stage, TargetUnits,
};
pub use cohort::aggregate_cohort;
pub use graph::CausalGraph;
pub use simulate::{PanelConfig, generate_panel};
