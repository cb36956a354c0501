//! Refutation checks for an estimated effect.
//!
//! Each check perturbs the estimation setup, re-estimates with the original
//! method and target units `num_simulations` times, and compares the
//! original effect against the simulated distribution:
//!
//! - **Placebo treatment**: permute the treatment column. The new effect
//!   should be close to zero.
//! - **Random common cause**: add an independent N(0, 1) covariate. The new
//!   effect should be close to the original.
//! - **Data subset**: re-estimate on a random subset of the rows. The new
//!   effect should be close to the original.

use lift_core::{Error, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{SeedableRng, seq::index};
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

use super::estimate::{CausalEstimate, EstimationData, estimate_on};

/// A single refutation check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Refuter {
    /// Replace treatment with a random permutation of itself.
    PlaceboTreatment,
    /// Add an independent random covariate.
    RandomCommonCause,
    /// Re-estimate on a random subset keeping `fraction` of the rows.
    DataSubset {
        /// Retained share, in (0, 1].
        fraction: f64,
    },
}

impl Refuter {
    /// Display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PlaceboTreatment => "Placebo Treatment",
            Self::RandomCommonCause => "Random Common Cause",
            Self::DataSubset { .. } => "Data Subset",
        }
    }

    fn stream(&self) -> u64 {
        match self {
            Self::PlaceboTreatment => 1,
            Self::RandomCommonCause => 2,
            Self::DataSubset { .. } => 3,
        }
    }
}

/// Which checks to run and how.
#[derive(Debug, Clone, PartialEq)]
pub struct RefuteOptions {
    /// Run the placebo-treatment check.
    pub placebo: bool,
    /// Run the random-common-cause check.
    pub random_common_cause: bool,
    /// Run the data-subset check.
    pub data_subset: bool,
    /// Retained share for the data-subset check, in (0, 1].
    pub subset_fraction: f64,
    /// Re-estimations per check.
    pub num_simulations: usize,
    /// Seed for the perturbations. `None` is not reproducible.
    pub seed: Option<u64>,
}

impl Default for RefuteOptions {
    fn default() -> Self {
        Self {
            placebo: true,
            random_common_cause: true,
            data_subset: true,
            subset_fraction: 0.9,
            num_simulations: 100,
            seed: None,
        }
    }
}

impl RefuteOptions {
    /// Enabled checks in run order: placebo, random common cause, data subset.
    pub fn refuters(&self) -> Result<Vec<Refuter>> {
        if self.data_subset && !(self.subset_fraction > 0.0 && self.subset_fraction <= 1.0) {
            return Err(Error::InvalidArgument(format!(
                "subset_fraction must be in (0, 1], got {}",
                self.subset_fraction
            )));
        }
        let mut out = Vec::with_capacity(3);
        if self.placebo {
            out.push(Refuter::PlaceboTreatment);
        }
        if self.random_common_cause {
            out.push(Refuter::RandomCommonCause);
        }
        if self.data_subset {
            out.push(Refuter::DataSubset { fraction: self.subset_fraction });
        }
        Ok(out)
    }

    /// Settings shared by every check.
    pub fn settings(&self) -> Result<RefuterSettings> {
        if self.num_simulations == 0 {
            return Err(Error::InvalidArgument("num_simulations must be > 0".into()));
        }
        Ok(RefuterSettings { num_simulations: self.num_simulations, seed: self.seed })
    }
}

/// Per-check execution settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefuterSettings {
    /// Re-estimations per check.
    pub num_simulations: usize,
    /// Base seed; each check derives its own stream from it.
    pub seed: Option<u64>,
}

/// Outcome of one completed check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefutationResult {
    /// Check name.
    pub name: String,
    /// Effect of the original estimate.
    pub estimated_effect: f64,
    /// Mean effect across the perturbed re-estimations.
    pub new_effect: f64,
    /// One-sided normal-test p-value of the original effect against the
    /// simulated distribution; `None` when it cannot be computed.
    pub p_value: Option<f64>,
}

/// Outcome of one configured check: completed, or failed without stopping the batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RefutationOutcome {
    /// The check ran to completion.
    Completed(RefutationResult),
    /// The check raised an error.
    Failed {
        /// Check name.
        name: String,
        /// Error message.
        error: String,
    },
}

impl RefutationOutcome {
    /// Check name.
    pub fn name(&self) -> &str {
        match self {
            Self::Completed(r) => &r.name,
            Self::Failed { name, .. } => name,
        }
    }

    /// The result, if the check completed.
    pub fn result(&self) -> Option<&RefutationResult> {
        match self {
            Self::Completed(r) => Some(r),
            Self::Failed { .. } => None,
        }
    }
}

/// Run one check against `estimate` on complete-case data.
pub(crate) fn run_refuter(
    data: &EstimationData,
    estimate: &CausalEstimate,
    refuter: &Refuter,
    settings: &RefuterSettings,
    ridge: f64,
) -> Result<RefutationResult> {
    if settings.num_simulations == 0 {
        return Err(Error::InvalidArgument("num_simulations must be > 0".into()));
    }
    let mut rng = match settings.seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(refuter.stream())),
        None => StdRng::from_os_rng(),
    };

    let n = data.n();
    let mut effects = Vec::with_capacity(settings.num_simulations);
    for sim in 0..settings.num_simulations {
        let perturbed = match *refuter {
            Refuter::PlaceboTreatment => {
                let mut t = data.treatment.clone();
                t.shuffle(&mut rng);
                data.with_treatment(t)
            }
            Refuter::RandomCommonCause => {
                let w: Vec<f64> = (0..n).map(|_| Distribution::<f64>::sample(&StandardNormal, &mut rng)).collect();
                data.with_extra_covariate("w_random", w)
            }
            Refuter::DataSubset { fraction } => {
                let k = ((fraction * n as f64).round() as usize).clamp(1, n);
                let mut rows = index::sample(&mut rng, n, k).into_vec();
                rows.sort_unstable();
                data.subset(&rows)
            }
        };
        let effect = estimate_on(&perturbed, &estimate.method, estimate.target_units, ridge)?;
        tracing::debug!(refuter = refuter.name(), sim, effect, "refutation simulation");
        effects.push(effect);
    }

    let new_effect = effects.iter().sum::<f64>() / effects.len() as f64;
    Ok(RefutationResult {
        name: refuter.name().to_string(),
        estimated_effect: estimate.value,
        new_effect,
        p_value: normal_test_p_value(estimate.value, &effects),
    })
}

/// One-sided p-value of `estimate` under a normal fitted to `simulations`.
fn normal_test_p_value(estimate: f64, simulations: &[f64]) -> Option<f64> {
    let n = simulations.len();
    if n < 2 {
        return None;
    }
    let mean = simulations.iter().sum::<f64>() / n as f64;
    let var = simulations.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    let sd = var.sqrt();
    if !(sd > 0.0 && sd.is_finite()) {
        return None;
    }
    let z = (estimate - mean) / sd;
    let std_normal = Normal::new(0.0, 1.0).ok()?;
    Some(if estimate > mean { 1.0 - std_normal.cdf(z) } else { std_normal.cdf(z) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::causal::estimate::{EstimationMethod, TargetUnits};
    use approx::assert_relative_eq;

    fn toy() -> (EstimationData, CausalEstimate) {
        let n = 80;
        let x: Vec<f64> = (0..n).map(|i| ((i * 37) % 11) as f64).collect();
        let t: Vec<bool> = (0..n).map(|i| i % 2 == 0).collect();
        let y: Vec<f64> = (0..n).map(|i| x[i] + if t[i] { 10.0 } else { 0.0 }).collect();
        let data = EstimationData {
            treatment: t,
            outcome: y,
            covariates: vec![x],
            covariate_names: vec!["x".into()],
            instruments: vec![],
        };
        let method: EstimationMethod = "backdoor.propensity_score_matching".parse().unwrap();
        let value = estimate_on(&data, &method, TargetUnits::Att, 1.0).unwrap();
        let estimate = CausalEstimate {
            value,
            method,
            target_units: TargetUnits::Att,
            n_obs: n,
            n_treated: n / 2,
            n_control: n / 2,
            covariates: vec!["x".into()],
        };
        (data, estimate)
    }

    fn settings(seed: u64) -> RefuterSettings {
        RefuterSettings { num_simulations: 30, seed: Some(seed) }
    }

    #[test]
    fn options_order_and_validation() {
        let all = RefuteOptions::default().refuters().unwrap();
        assert_eq!(
            all.iter().map(Refuter::name).collect::<Vec<_>>(),
            vec!["Placebo Treatment", "Random Common Cause", "Data Subset"]
        );

        let only_subset = RefuteOptions { placebo: false, random_common_cause: false, ..Default::default() };
        assert_eq!(only_subset.refuters().unwrap(), vec![Refuter::DataSubset { fraction: 0.9 }]);

        for bad in [0.0, -0.5, 1.5, f64::NAN] {
            let o = RefuteOptions { subset_fraction: bad, ..Default::default() };
            assert!(o.refuters().is_err(), "fraction {bad} accepted");
        }
        let o = RefuteOptions { subset_fraction: 1.0, ..Default::default() };
        assert!(o.refuters().is_ok());

        let o = RefuteOptions { num_simulations: 0, ..Default::default() };
        assert!(o.settings().is_err());
    }

    #[test]
    fn placebo_effect_is_near_zero() {
        let (data, est) = toy();
        assert!(est.value > 5.0);
        let r = run_refuter(&data, &est, &Refuter::PlaceboTreatment, &settings(7), 1.0).unwrap();
        assert_eq!(r.name, "Placebo Treatment");
        assert_relative_eq!(r.estimated_effect, est.value);
        assert!(r.new_effect.abs() < 3.0, "placebo new_effect={}", r.new_effect);
        let p = r.p_value.unwrap();
        assert!((0.0..=0.05).contains(&p), "p={p}");
    }

    #[test]
    fn random_common_cause_keeps_effect() {
        let (data, est) = toy();
        let r = run_refuter(&data, &est, &Refuter::RandomCommonCause, &settings(3), 1.0).unwrap();
        assert!((r.new_effect - est.value).abs() < 3.0, "new={} orig={}", r.new_effect, est.value);
    }

    #[test]
    fn full_subset_reproduces_estimate() {
        let (data, est) = toy();
        let r = run_refuter(&data, &est, &Refuter::DataSubset { fraction: 1.0 }, &settings(1), 1.0)
            .unwrap();
        assert_relative_eq!(r.new_effect, est.value, epsilon = 1e-9);
        // Zero spread across simulations: no p-value.
        assert_eq!(r.p_value, None);
    }

    #[test]
    fn seeded_refuters_are_deterministic() {
        let (data, est) = toy();
        let a = run_refuter(&data, &est, &Refuter::PlaceboTreatment, &settings(42), 1.0).unwrap();
        let b = run_refuter(&data, &est, &Refuter::PlaceboTreatment, &settings(42), 1.0).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn tiny_subset_fails_with_empty_arm() {
        let (data, est) = toy();
        let err = run_refuter(&data, &est, &Refuter::DataSubset { fraction: 0.01 }, &settings(5), 1.0);
        assert!(matches!(err, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn p_value_edge_cases() {
        assert_eq!(normal_test_p_value(1.0, &[0.5]), None);
        assert_eq!(normal_test_p_value(1.0, &[0.5, 0.5, 0.5]), None);
        let p = normal_test_p_value(0.0, &[-1.0, 0.0, 1.0]).unwrap();
        assert_relative_eq!(p, 0.5, epsilon = 1e-12);
        let far = normal_test_p_value(100.0, &[-1.0, 0.0, 1.0]).unwrap();
        assert!(far < 1e-10);
    }

    #[test]
    fn outcome_accessors_and_serde() {
        let done = RefutationOutcome::Completed(RefutationResult {
            name: "Data Subset".into(),
            estimated_effect: 1.0,
            new_effect: 1.1,
            p_value: None,
        });
        let failed = RefutationOutcome::Failed { name: "Placebo Treatment".into(), error: "boom".into() };
        assert_eq!(done.name(), "Data Subset");
        assert!(done.result().is_some());
        assert_eq!(failed.name(), "Placebo Treatment");
        assert!(failed.result().is_none());

        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["status"], "failed");
        let json = serde_json::to_value(&done).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["new_effect"], 1.1);
    }
}
