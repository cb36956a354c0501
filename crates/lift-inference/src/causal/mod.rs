//! Causal analysis over a cohort table.
//!
//! This module provides:
//! - **Identification** of the treatment effect from a causal graph: backdoor
//!   adjustment set, validity by d-separation, and candidate instruments.
//! - **Estimation** with propensity-score matching or weighting, linear
//!   regression adjustment, and the Wald instrumental-variable ratio.
//! - **Refutation** by placebo treatment, random common cause and data subset.
//! - A staged [`CausalPipeline`] that enforces identify → estimate → refute.

pub mod backend;
pub mod estimand;
pub mod estimate;
pub mod pipeline;
mod propensity;
pub mod refute;

pub use backend::{CausalBackend, NativeBackend};
pub use estimand::{Estimand, identify_effect};
pub use estimate::{CausalEstimate, EstimationMethod, Estimator, Identifier, TargetUnits};
pub use pipeline::{AnalysisResult, CausalPipeline, Stage};
pub use refute::{RefutationOutcome, RefutationResult, RefuteOptions, Refuter, RefuterSettings};
