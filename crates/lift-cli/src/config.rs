//! YAML configuration: parsing + semantic validation.
//!
//! `simulation` and `model` are required; `refutation` is optional with every
//! key defaulted. Everything is checked at load time so a bad file fails
//! before any data is generated.

use lift_core::{Error, Result};
use lift_inference::{CausalGraph, EstimationMethod, PanelConfig, RefuteOptions, TargetUnits};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    simulation: SimulationSection,
    model: ModelSection,
    #[serde(default)]
    refutation: RefutationSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct SimulationSection {
    num_users: usize,
    num_months: u32,
    base_spend_lambda: f64,
    month_decay_rate: f64,
    treatment_effect: f64,
    /// Cohort signup month passed to the aggregator.
    signup_month: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ModelSection {
    treatment: String,
    outcome: String,
    estimation_method: String,
    target_units: String,
    /// DOT text of the causal graph. Defaults to the built-in loyalty graph.
    #[serde(default)]
    graph: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
struct RefutationSection {
    placebo: bool,
    random_common_cause: bool,
    data_subset: bool,
    subset_fraction: f64,
    num_simulations: usize,
}

impl Default for RefutationSection {
    fn default() -> Self {
        let d = RefuteOptions::default();
        Self {
            placebo: d.placebo,
            random_common_cause: d.random_common_cause,
            data_subset: d.data_subset,
            subset_fraction: d.subset_fraction,
            num_simulations: d.num_simulations,
        }
    }
}

/// Validated analysis configuration.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub panel: PanelConfig,
    pub signup_month: u32,
    pub treatment: String,
    pub outcome: String,
    pub method: EstimationMethod,
    pub target_units: TargetUnits,
    pub graph: CausalGraph,
    pub refute: RefuteOptions,
}

impl AnalysisConfig {
    /// Seed the simulator and the refuters.
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.panel.seed = seed;
        self.refute.seed = seed;
        self
    }
}

/// Read and validate a YAML config file.
pub fn load(path: &Path) -> Result<AnalysisConfig> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("{}: cannot read: {e}", path.display())))?;
    parse(&text).map_err(|e| match e {
        Error::Config(msg) => Error::Config(format!("{}: {msg}", path.display())),
        other => other,
    })
}

/// Parse and validate YAML config text.
pub fn parse(text: &str) -> Result<AnalysisConfig> {
    let raw: ConfigFile =
        serde_yaml_ng::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
    let invalid = |key: &str, e: Error| Error::Config(format!("{key}: {e}"));

    let sim = raw.simulation;
    let panel = PanelConfig {
        num_users: sim.num_users,
        num_months: sim.num_months,
        base_spend_lambda: sim.base_spend_lambda,
        month_decay_rate: sim.month_decay_rate,
        treatment_effect: sim.treatment_effect,
        seed: None,
    };
    panel.validate().map_err(|e| invalid("simulation", e))?;
    if sim.signup_month < 1 || sim.signup_month >= sim.num_months {
        return Err(Error::Config(format!(
            "simulation.signup_month must be in [1, {}), got {}",
            sim.num_months, sim.signup_month
        )));
    }

    let model = raw.model;
    let method: EstimationMethod =
        model.estimation_method.parse().map_err(|e| invalid("model.estimation_method", e))?;
    let target_units: TargetUnits =
        model.target_units.parse().map_err(|e| invalid("model.target_units", e))?;
    let graph = match &model.graph {
        Some(dot) => CausalGraph::from_dot(dot).map_err(|e| invalid("model.graph", e))?,
        None => CausalGraph::loyalty_program(),
    };
    for (key, name) in [("model.treatment", &model.treatment), ("model.outcome", &model.outcome)] {
        if !graph.contains(name) {
            return Err(Error::Config(format!("{key} '{name}' is not a node of the causal graph")));
        }
    }

    let r = raw.refutation;
    let refute = RefuteOptions {
        placebo: r.placebo,
        random_common_cause: r.random_common_cause,
        data_subset: r.data_subset,
        subset_fraction: r.subset_fraction,
        num_simulations: r.num_simulations,
        seed: None,
    };
    refute.refuters().map_err(|e| invalid("refutation", e))?;
    refute.settings().map_err(|e| invalid("refutation", e))?;

    Ok(AnalysisConfig {
        panel,
        signup_month: sim.signup_month,
        treatment: model.treatment,
        outcome: model.outcome,
        method,
        target_units,
        graph,
        refute,
    })
}
