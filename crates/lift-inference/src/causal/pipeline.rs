//! Staged causal analysis: identify, then estimate, then refute.
//!
//! A [`CausalPipeline`] owns the cohort table and the causal graph and
//! advances through [`Stage`]s. Each stage requires its predecessor:
//! calling [`CausalPipeline::estimate`] before [`CausalPipeline::identify`]
//! or [`CausalPipeline::refute`] before [`CausalPipeline::estimate`] fails
//! with [`Error::OrderingViolation`]. Re-running an earlier stage discards
//! everything downstream of it. A stage that fails leaves the pipeline where
//! it was.

use std::fmt;

use lift_core::{CohortTable, ColumnSource, Error, Result};
use serde::Serialize;

use super::backend::{CausalBackend, NativeBackend};
use super::estimand::Estimand;
use super::estimate::{CausalEstimate, EstimationMethod, TargetUnits};
use super::refute::{RefutationOutcome, RefuteOptions};
use crate::graph::CausalGraph;

/// How far a pipeline has progressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Nothing run yet.
    Uninitialized,
    /// Estimand available.
    Identified,
    /// Estimate available.
    Estimated,
    /// Refutations available.
    Refuted,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Uninitialized => "uninitialized",
            Self::Identified => "identified",
            Self::Estimated => "estimated",
            Self::Refuted => "refuted",
        })
    }
}

#[derive(Debug, Clone)]
enum PipelineState {
    Uninitialized,
    Identified { estimand: Estimand },
    Estimated { estimand: Estimand, estimate: CausalEstimate },
    Refuted { estimand: Estimand, estimate: CausalEstimate, refutations: Vec<RefutationOutcome> },
}

impl PipelineState {
    fn stage(&self) -> Stage {
        match self {
            Self::Uninitialized => Stage::Uninitialized,
            Self::Identified { .. } => Stage::Identified,
            Self::Estimated { .. } => Stage::Estimated,
            Self::Refuted { .. } => Stage::Refuted,
        }
    }

    fn estimand(&self) -> Option<&Estimand> {
        match self {
            Self::Uninitialized => None,
            Self::Identified { estimand }
            | Self::Estimated { estimand, .. }
            | Self::Refuted { estimand, .. } => Some(estimand),
        }
    }

    fn estimate(&self) -> Option<&CausalEstimate> {
        match self {
            Self::Estimated { estimate, .. } | Self::Refuted { estimate, .. } => Some(estimate),
            _ => None,
        }
    }

    fn refutations(&self) -> Option<&[RefutationOutcome]> {
        match self {
            Self::Refuted { refutations, .. } => Some(refutations),
            _ => None,
        }
    }
}

/// Snapshot of a pipeline's results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    /// Stage reached.
    pub stage: Stage,
    /// Identified estimand, once identified.
    pub estimand: Option<Estimand>,
    /// Effect estimate, once estimated.
    pub estimate: Option<CausalEstimate>,
    /// Shortcut for `estimate.value`.
    pub ate: Option<f64>,
    /// Refutation outcomes, once refuted.
    pub refutations: Option<Vec<RefutationOutcome>>,
}

/// Identify → estimate → refute over a cohort table.
pub struct CausalPipeline<B: CausalBackend = NativeBackend> {
    data: CohortTable,
    graph: CausalGraph,
    treatment: String,
    outcome: String,
    backend: B,
    state: PipelineState,
}

impl CausalPipeline<NativeBackend> {
    /// Pipeline on the native backend.
    ///
    /// Fails if `treatment` or `outcome` is not a column of `data`.
    pub fn new(
        data: CohortTable,
        treatment: impl Into<String>,
        outcome: impl Into<String>,
        graph: CausalGraph,
    ) -> Result<Self> {
        Self::with_backend(data, treatment, outcome, graph, NativeBackend::default())
    }
}

impl<B: CausalBackend> CausalPipeline<B> {
    /// Pipeline on a caller-supplied backend.
    pub fn with_backend(
        data: CohortTable,
        treatment: impl Into<String>,
        outcome: impl Into<String>,
        graph: CausalGraph,
        backend: B,
    ) -> Result<Self> {
        let treatment = treatment.into();
        let outcome = outcome.into();
        for (role, name) in [("treatment", &treatment), ("outcome", &outcome)] {
            if !data.has_column(name) {
                return Err(Error::InvalidArgument(format!(
                    "{role} column '{name}' not found (available: {})",
                    data.column_names().join(", ")
                )));
            }
        }
        Ok(Self { data, graph, treatment, outcome, backend, state: PipelineState::Uninitialized })
    }

    /// Identify the effect from the graph. Resets any later stages.
    pub fn identify(&mut self) -> Result<Estimand> {
        tracing::info!(backend = self.backend.name(), treatment = %self.treatment, outcome = %self.outcome, "identifying effect");
        let estimand =
            self.backend.identify_effect(&self.data, &self.graph, &self.treatment, &self.outcome)?;
        self.state = PipelineState::Identified { estimand: estimand.clone() };
        Ok(estimand)
    }

    /// Estimate the identified effect. Resets any refutations.
    pub fn estimate(
        &mut self,
        method: &EstimationMethod,
        target_units: TargetUnits,
    ) -> Result<CausalEstimate> {
        let estimand = self
            .state
            .estimand()
            .cloned()
            .ok_or(Error::OrderingViolation { operation: "estimate", requires: "identify" })?;
        tracing::info!(%method, %target_units, "estimating effect");
        let estimate = self.backend.estimate_effect(&self.data, &estimand, method, target_units)?;
        self.state = PipelineState::Estimated { estimand, estimate: estimate.clone() };
        Ok(estimate)
    }

    /// Run the configured refutation checks against the current estimate.
    ///
    /// A check that errors is recorded as [`RefutationOutcome::Failed`] and
    /// the remaining checks still run. Invalid options fail the whole call.
    pub fn refute(&mut self, options: &RefuteOptions) -> Result<Vec<RefutationOutcome>> {
        let (estimand, estimate) = match (self.state.estimand(), self.state.estimate()) {
            (Some(estimand), Some(estimate)) => (estimand.clone(), estimate.clone()),
            _ => return Err(Error::OrderingViolation { operation: "refute", requires: "estimate" }),
        };
        let refuters = options.refuters()?;
        let settings = options.settings()?;

        let mut refutations = Vec::with_capacity(refuters.len());
        for refuter in &refuters {
            tracing::info!(refuter = refuter.name(), simulations = settings.num_simulations, "running refuter");
            let outcome = match self.backend.refute_estimate(
                &self.data, &estimand, &estimate, refuter, &settings,
            ) {
                Ok(result) => RefutationOutcome::Completed(result),
                Err(e) => {
                    tracing::warn!(refuter = refuter.name(), error = %e, "refuter failed");
                    RefutationOutcome::Failed { name: refuter.name().to_string(), error: e.to_string() }
                }
            };
            refutations.push(outcome);
        }

        self.state = PipelineState::Refuted { estimand, estimate, refutations: refutations.clone() };
        Ok(refutations)
    }

    /// Run identify, estimate and (optionally, with default options) refute.
    pub fn run(
        &mut self,
        method: &EstimationMethod,
        target_units: TargetUnits,
        refute: bool,
    ) -> Result<AnalysisResult> {
        self.identify()?;
        self.estimate(method, target_units)?;
        if refute {
            self.refute(&RefuteOptions::default())?;
        }
        Ok(self.result())
    }

    /// Stage reached so far.
    pub fn stage(&self) -> Stage {
        self.state.stage()
    }

    /// Current estimand, if identified.
    pub fn estimand(&self) -> Option<&Estimand> {
        self.state.estimand()
    }

    /// Current estimate, if estimated.
    pub fn estimate_result(&self) -> Option<&CausalEstimate> {
        self.state.estimate()
    }

    /// Current effect value, if estimated.
    pub fn ate(&self) -> Option<f64> {
        self.state.estimate().map(|e| e.value)
    }

    /// Refutation outcomes, if refuted.
    pub fn refutations(&self) -> Option<&[RefutationOutcome]> {
        self.state.refutations()
    }

    /// Snapshot of everything computed so far.
    pub fn result(&self) -> AnalysisResult {
        AnalysisResult {
            stage: self.stage(),
            estimand: self.estimand().cloned(),
            estimate: self.estimate_result().cloned(),
            ate: self.ate(),
            refutations: self.refutations().map(<[_]>::to_vec),
        }
    }

    /// The cohort table under analysis.
    pub fn data(&self) -> &CohortTable {
        &self.data
    }

    /// The causal graph under analysis.
    pub fn graph(&self) -> &CausalGraph {
        &self.graph
    }
}
