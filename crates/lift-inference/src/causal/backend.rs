//! Pluggable causal backend.
//!
//! The pipeline drives identification, estimation and refutation through
//! [`CausalBackend`]. [`NativeBackend`] is the in-crate implementation.

use lift_core::{ColumnSource, Result};

use super::estimand::{self, Estimand};
use super::estimate::{
    CausalEstimate, DEFAULT_PROPENSITY_RIDGE, EstimationData, EstimationMethod, Identifier,
    TargetUnits, estimate_on,
};
use super::refute::{RefutationResult, Refuter, RefuterSettings, run_refuter};
use crate::graph::CausalGraph;

/// Identification, estimation and refutation over a column source.
pub trait CausalBackend: Send + Sync {
    /// Backend name, for logs.
    fn name(&self) -> &str;

    /// Identify the effect of `treatment` on `outcome` under `graph`.
    fn identify_effect(
        &self,
        data: &dyn ColumnSource,
        graph: &CausalGraph,
        treatment: &str,
        outcome: &str,
    ) -> Result<Estimand>;

    /// Estimate the identified effect.
    fn estimate_effect(
        &self,
        data: &dyn ColumnSource,
        estimand: &Estimand,
        method: &EstimationMethod,
        target_units: TargetUnits,
    ) -> Result<CausalEstimate>;

    /// Run one refutation check against `estimate`.
    fn refute_estimate(
        &self,
        data: &dyn ColumnSource,
        estimand: &Estimand,
        estimate: &CausalEstimate,
        refuter: &Refuter,
        settings: &RefuterSettings,
    ) -> Result<RefutationResult>;
}

/// In-crate backend: graph identification, propensity/regression/IV estimators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NativeBackend {
    ridge: f64,
}

impl Default for NativeBackend {
    fn default() -> Self {
        Self { ridge: DEFAULT_PROPENSITY_RIDGE }
    }
}

impl NativeBackend {
    /// Backend with a custom ridge penalty for the propensity model.
    pub fn with_ridge(ridge: f64) -> Self {
        Self { ridge }
    }

    /// Ridge penalty of the propensity model.
    pub fn ridge(&self) -> f64 {
        self.ridge
    }
}

impl CausalBackend for NativeBackend {
    fn name(&self) -> &str {
        "native"
    }

    fn identify_effect(
        &self,
        data: &dyn ColumnSource,
        graph: &CausalGraph,
        treatment: &str,
        outcome: &str,
    ) -> Result<Estimand> {
        estimand::identify_effect(data, graph, treatment, outcome)
    }

    fn estimate_effect(
        &self,
        data: &dyn ColumnSource,
        estimand: &Estimand,
        method: &EstimationMethod,
        target_units: TargetUnits,
    ) -> Result<CausalEstimate> {
        if method.identifier == Identifier::Backdoor && !estimand.backdoor_identified {
            tracing::warn!(%method, "backdoor criterion not satisfied; estimate may be confounded");
        }
        let prepared = EstimationData::from_source(data, estimand)?;
        let value = estimate_on(&prepared, method, target_units, self.ridge)?;
        let (n_treated, n_control) = prepared.arm_sizes();
        tracing::info!(%method, %target_units, value, n_treated, n_control, "effect estimated");
        Ok(CausalEstimate {
            value,
            method: *method,
            target_units,
            n_obs: prepared.n(),
            n_treated,
            n_control,
            covariates: prepared.covariate_names,
        })
    }

    fn refute_estimate(
        &self,
        data: &dyn ColumnSource,
        estimand: &Estimand,
        estimate: &CausalEstimate,
        refuter: &Refuter,
        settings: &RefuterSettings,
    ) -> Result<RefutationResult> {
        let prepared = EstimationData::from_source(data, estimand)?;
        let result = run_refuter(&prepared, estimate, refuter, settings, self.ridge)?;
        tracing::info!(
            refuter = %result.name,
            new_effect = result.new_effect,
            p_value = ?result.p_value,
            "refutation completed"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lift_core::{CohortRow, CohortTable};

    fn cohort() -> CohortTable {
        let rows = (0..40u64)
            .map(|i| {
                let treated = i % 2 == 0;
                let pre = 400.0 + (i % 7) as f64 * 10.0;
                CohortRow {
                    user_id: i,
                    signup_month: if treated { 3 } else { 0 },
                    treatment: treated,
                    pre_spends: Some(pre),
                    post_spends: Some(pre - 30.0 + if treated { 100.0 } else { 0.0 }),
                }
            })
            .collect();
        CohortTable::new(rows)
    }

    #[test]
    fn native_backend_runs_all_stages() {
        let backend = NativeBackend::default();
        assert_eq!(backend.name(), "native");
        assert_eq!(backend.ridge(), DEFAULT_PROPENSITY_RIDGE);

        let data = cohort();
        let graph = CausalGraph::loyalty_program();
        let estimand = backend.identify_effect(&data, &graph, "treatment", "post_spends").unwrap();

        let method: EstimationMethod = "iv.propensity_score_matching".parse().unwrap();
        let est = backend.estimate_effect(&data, &estimand, &method, TargetUnits::Att).unwrap();
        assert!((est.value - 100.0).abs() < 1e-9, "att={}", est.value);
        assert_eq!((est.n_obs, est.n_treated, est.n_control), (40, 20, 20));
        // signup_month is constant within arms and drops out.
        assert_eq!(est.covariates, vec!["pre_spends"]);

        let settings = RefuterSettings { num_simulations: 10, seed: Some(1) };
        let r = backend
            .refute_estimate(&data, &estimand, &est, &Refuter::DataSubset { fraction: 1.0 }, &settings)
            .unwrap();
        assert_eq!(r.name, "Data Subset");
        assert!((r.new_effect - est.value).abs() < 1e-9);
    }

    #[test]
    fn wald_uses_observed_instrument() {
        let rows = (0..40u64)
            .map(|i| {
                let z = (i % 4) as f64;
                let treated = z >= 2.0 || i % 5 == 0;
                CohortRow {
                    user_id: i,
                    signup_month: if treated { 3 } else { 0 },
                    treatment: treated,
                    pre_spends: Some(z),
                    post_spends: Some(50.0 + if treated { 100.0 } else { 0.0 }),
                }
            })
            .collect();
        let data = CohortTable::new(rows);
        let graph =
            CausalGraph::from_edges(&[("pre_spends", "treatment"), ("treatment", "post_spends")]).unwrap();
        let backend = NativeBackend::with_ridge(0.5);
        let estimand = backend.identify_effect(&data, &graph, "treatment", "post_spends").unwrap();
        assert_eq!(estimand.observed_instruments(), vec!["pre_spends"]);

        let method: EstimationMethod = "iv.instrumental_variable".parse().unwrap();
        let est = backend.estimate_effect(&data, &estimand, &method, TargetUnits::Ate).unwrap();
        assert!((est.value - 100.0).abs() < 1e-9, "wald={}", est.value);
    }
}
