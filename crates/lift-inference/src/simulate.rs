//! Synthetic loyalty-program panel generator.
//!
//! Every user is observed for `num_months` months. Roughly half of the users
//! enroll in a uniformly drawn month in `[1, num_months)`; the rest never do.
//! The data-generating process for one user-month is:
//!
//! ```text
//! spend = Poisson(λ) − month · decay + effect · 1{enrolled ∧ month > signup_month}
//! ```
//!
//! The generator is fully deterministic given `config.seed`.

use lift_core::{Error, Observation, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Poisson};

/// Configuration for the synthetic panel generator.
#[derive(Debug, Clone)]
pub struct PanelConfig {
    /// Number of users.
    pub num_users: usize,
    /// Number of observed months (1-indexed). Must be at least 2.
    pub num_months: u32,
    /// Poisson mean of the baseline monthly spend.
    pub base_spend_lambda: f64,
    /// Linear spend decay per month.
    pub month_decay_rate: f64,
    /// Additive spend lift after enrollment.
    pub treatment_effect: f64,
    /// Random seed. `None` draws from OS entropy and is not reproducible.
    pub seed: Option<u64>,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            num_users: 10_000,
            num_months: 12,
            base_spend_lambda: 500.0,
            month_decay_rate: 10.0,
            treatment_effect: 100.0,
            seed: None,
        }
    }
}

impl PanelConfig {
    /// Reject configurations the generator cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.num_users == 0 {
            return Err(Error::InvalidArgument("num_users must be > 0".into()));
        }
        if self.num_months < 2 {
            return Err(Error::InvalidArgument(format!(
                "num_months must be >= 2 (signup months are drawn from [1, num_months)), got {}",
                self.num_months
            )));
        }
        if !self.base_spend_lambda.is_finite() || self.base_spend_lambda <= 0.0 {
            return Err(Error::InvalidArgument(format!(
                "base_spend_lambda must be finite and > 0, got {}",
                self.base_spend_lambda
            )));
        }
        if !self.month_decay_rate.is_finite() {
            return Err(Error::InvalidArgument("month_decay_rate must be finite".into()));
        }
        if !self.treatment_effect.is_finite() {
            return Err(Error::InvalidArgument("treatment_effect must be finite".into()));
        }
        Ok(())
    }
}

/// Generate the raw user × month panel.
///
/// Rows are user-major, month-minor: user 0 months `1..=num_months`, then user 1, ...
pub fn generate_panel(config: &PanelConfig) -> Result<Vec<Observation>> {
    config.validate()?;

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    // Signup months first, then spends, so a given seed yields the same
    // cohort assignment regardless of the spend distribution.
    let signup_months: Vec<u32> = (0..config.num_users)
        .map(|_| {
            let month = rng.random_range(1..config.num_months);
            if rng.random_bool(0.5) { month } else { 0 }
        })
        .collect();

    let poisson = Poisson::new(config.base_spend_lambda).map_err(|e| {
        Error::InvalidArgument(format!("base_spend_lambda={}: {e}", config.base_spend_lambda))
    })?;

    let months = config.num_months as usize;
    let mut panel = Vec::with_capacity(config.num_users * months);
    for (user, &signup_month) in signup_months.iter().enumerate() {
        let treatment = signup_month > 0;
        for month in 1..=config.num_months {
            let mut spend: f64 = poisson.sample(&mut rng);
            spend -= month as f64 * config.month_decay_rate;
            if treatment && month > signup_month {
                spend += config.treatment_effect;
            }
            panel.push(Observation { user_id: user as u64, signup_month, month, spend, treatment });
        }
    }

    tracing::debug!(
        rows = panel.len(),
        enrolled = signup_months.iter().filter(|&&m| m > 0).count(),
        "panel generated"
    );
    Ok(panel)
}
