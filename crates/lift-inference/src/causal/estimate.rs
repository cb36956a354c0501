//! Effect estimators over an identified estimand.
//!
//! Method strings follow the `<identifier>.<estimator>` convention, e.g.
//! `backdoor.propensity_score_matching` or `iv.propensity_score_matching`.
//! The adjustment estimators (matching, weighting, regression) always adjust
//! for the estimand's backdoor set; `iv.instrumental_variable` uses the first
//! observed instrument.

use std::fmt;
use std::str::FromStr;

use lift_core::{ColumnSource, Error, Result};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use super::estimand::Estimand;
use super::propensity::fit_propensity;

/// Which identification strategy a method is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Identifier {
    /// Backdoor adjustment.
    Backdoor,
    /// Instrumental variables.
    Iv,
}

/// Estimation algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Estimator {
    /// 1-nearest-neighbour matching on the propensity score, with replacement.
    PropensityScoreMatching,
    /// Hájek inverse-probability weighting.
    PropensityScoreWeighting,
    /// OLS of outcome on treatment and covariates.
    LinearRegression,
    /// Wald ratio on a single instrument.
    InstrumentalVariable,
}

impl Estimator {
    fn as_str(self) -> &'static str {
        match self {
            Self::PropensityScoreMatching => "propensity_score_matching",
            Self::PropensityScoreWeighting => "propensity_score_weighting",
            Self::LinearRegression => "linear_regression",
            Self::InstrumentalVariable => "instrumental_variable",
        }
    }
}

/// A parsed `<identifier>.<estimator>` method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EstimationMethod {
    /// Identification strategy.
    pub identifier: Identifier,
    /// Estimation algorithm.
    pub estimator: Estimator,
}

impl EstimationMethod {
    /// Build a method, rejecting combinations that make no sense.
    pub fn new(identifier: Identifier, estimator: Estimator) -> Result<Self> {
        if estimator == Estimator::InstrumentalVariable && identifier != Identifier::Iv {
            return Err(Error::InvalidArgument(
                "instrumental_variable estimation requires the 'iv' identifier".into(),
            ));
        }
        Ok(Self { identifier, estimator })
    }
}

impl FromStr for EstimationMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (ident, est) = s.trim().split_once('.').ok_or_else(|| {
            Error::InvalidArgument(format!(
                "estimation method '{s}' must look like '<identifier>.<estimator>'"
            ))
        })?;
        let identifier = match ident {
            "backdoor" => Identifier::Backdoor,
            "iv" => Identifier::Iv,
            other => {
                return Err(Error::InvalidArgument(format!(
                    "unknown identifier '{other}' (expected backdoor or iv)"
                )));
            }
        };
        let estimator = match est {
            "propensity_score_matching" => Estimator::PropensityScoreMatching,
            "propensity_score_weighting" => Estimator::PropensityScoreWeighting,
            "linear_regression" => Estimator::LinearRegression,
            "instrumental_variable" => Estimator::InstrumentalVariable,
            other => return Err(Error::InvalidArgument(format!("unknown estimator '{other}'"))),
        };
        Self::new(identifier, estimator)
    }
}

impl TryFrom<String> for EstimationMethod {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<EstimationMethod> for String {
    fn from(m: EstimationMethod) -> Self {
        m.to_string()
    }
}

impl fmt::Display for EstimationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ident = match self.identifier {
            Identifier::Backdoor => "backdoor",
            Identifier::Iv => "iv",
        };
        write!(f, "{ident}.{}", self.estimator.as_str())
    }
}

/// Population the effect is averaged over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetUnits {
    /// Average treatment effect on the treated.
    Att,
    /// Average treatment effect over everyone.
    Ate,
    /// Average treatment effect on the controls.
    Atc,
}

impl FromStr for TargetUnits {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "att" => Ok(Self::Att),
            "ate" => Ok(Self::Ate),
            "atc" => Ok(Self::Atc),
            other => Err(Error::InvalidArgument(format!(
                "unknown target units '{other}' (expected att, ate or atc)"
            ))),
        }
    }
}

impl fmt::Display for TargetUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Att => "att",
            Self::Ate => "ate",
            Self::Atc => "atc",
        })
    }
}

/// Result of one estimation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CausalEstimate {
    /// Estimated effect.
    pub value: f64,
    /// Method used.
    pub method: EstimationMethod,
    /// Population the effect refers to.
    pub target_units: TargetUnits,
    /// Rows used after dropping undefined values.
    pub n_obs: usize,
    /// Treated rows used.
    pub n_treated: usize,
    /// Control rows used.
    pub n_control: usize,
    /// Covariates actually adjusted for.
    pub covariates: Vec<String>,
}

/// Complete-case numeric inputs of an estimator.
#[derive(Debug, Clone)]
pub(crate) struct EstimationData {
    pub treatment: Vec<bool>,
    pub outcome: Vec<f64>,
    /// Column-major adjustment covariates.
    pub covariates: Vec<Vec<f64>>,
    pub covariate_names: Vec<String>,
    /// Column-major observed instruments.
    pub instruments: Vec<Vec<f64>>,
}

impl EstimationData {
    /// Read the estimand's columns, dropping rows with any undefined value.
    pub fn from_source(data: &dyn ColumnSource, estimand: &Estimand) -> Result<Self> {
        let treatment_raw = data.column(&estimand.treatment)?;
        let outcome_raw = data.column(&estimand.outcome)?;
        let cov_names: Vec<String> = estimand
            .backdoor_variables
            .iter()
            .filter(|v| data.has_column(v))
            .cloned()
            .collect();
        let (cov_names, cov_raw) = defined_columns(data, cov_names, "covariate")?;
        let iv_names: Vec<String> = estimand
            .observed_instruments()
            .into_iter()
            .filter(|v| data.has_column(v))
            .map(str::to_string)
            .collect();
        let (_, iv_raw) = defined_columns(data, iv_names, "instrument")?;

        let n_raw = treatment_raw.len();
        let keep: Vec<usize> = (0..n_raw)
            .filter(|&i| {
                treatment_raw[i].is_some()
                    && outcome_raw[i].is_some_and(f64::is_finite)
                    && cov_raw.iter().chain(iv_raw.iter()).all(|c| c[i].is_some_and(f64::is_finite))
            })
            .collect();
        if keep.is_empty() && n_raw > 0 {
            return Err(Error::InvalidArgument(format!(
                "no row has defined '{}' and '{}' values",
                estimand.treatment, estimand.outcome
            )));
        }
        if keep.len() < n_raw {
            tracing::warn!(dropped = n_raw - keep.len(), kept = keep.len(), "rows with undefined values dropped");
        }

        let mut treatment = Vec::with_capacity(keep.len());
        for &i in &keep {
            match treatment_raw[i] {
                Some(v) if v == 1.0 => treatment.push(true),
                Some(v) if v == 0.0 => treatment.push(false),
                other => {
                    return Err(Error::InvalidArgument(format!(
                        "treatment column '{}' must be binary, found {other:?}",
                        estimand.treatment
                    )));
                }
            }
        }
        let pick = |col: &[Option<f64>]| -> Vec<f64> { keep.iter().map(|&i| col[i].unwrap_or(f64::NAN)).collect() };
        let outcome = pick(&outcome_raw);
        let instruments: Vec<Vec<f64>> = iv_raw.iter().map(|c| pick(c)).collect();

        // Covariates constant within both arms are collinear with treatment.
        let mut covariates = Vec::new();
        let mut covariate_names = Vec::new();
        for (name, raw) in cov_names.into_iter().zip(&cov_raw) {
            let col = pick(raw);
            if constant_within_arms(&treatment, &col) {
                tracing::warn!(covariate = %name, "covariate is constant within treatment arms; excluded from adjustment");
                continue;
            }
            covariates.push(col);
            covariate_names.push(name);
        }

        Ok(Self { treatment, outcome, covariates, covariate_names, instruments })
    }

    pub fn n(&self) -> usize {
        self.treatment.len()
    }

    pub fn arm_sizes(&self) -> (usize, usize) {
        let t = self.treatment.iter().filter(|&&t| t).count();
        (t, self.treatment.len() - t)
    }

    pub fn with_treatment(&self, treatment: Vec<bool>) -> Self {
        Self { treatment, ..self.clone() }
    }

    pub fn with_extra_covariate(&self, name: &str, values: Vec<f64>) -> Self {
        let mut out = self.clone();
        out.covariates.push(values);
        out.covariate_names.push(name.to_string());
        out
    }

    pub fn subset(&self, rows: &[usize]) -> Self {
        let take = |col: &[f64]| -> Vec<f64> { rows.iter().map(|&i| col[i]).collect() };
        Self {
            treatment: rows.iter().map(|&i| self.treatment[i]).collect(),
            outcome: take(&self.outcome),
            covariates: self.covariates.iter().map(|c| take(c)).collect(),
            covariate_names: self.covariate_names.clone(),
            instruments: self.instruments.iter().map(|c| take(c)).collect(),
        }
    }
}

/// Read `names`, skipping columns with no defined value: keeping one would
/// leave no complete cases.
fn defined_columns(
    data: &dyn ColumnSource,
    names: Vec<String>,
    role: &str,
) -> Result<(Vec<String>, Vec<Vec<Option<f64>>>)> {
    let mut kept = (Vec::with_capacity(names.len()), Vec::with_capacity(names.len()));
    for name in names {
        let col = data.column(&name)?;
        if col.iter().any(|v| v.is_some_and(f64::is_finite)) {
            kept.0.push(name);
            kept.1.push(col);
        } else {
            tracing::warn!(role, column = %name, "column is undefined for every row; excluded");
        }
    }
    Ok(kept)
}

fn constant_within_arms(treatment: &[bool], col: &[f64]) -> bool {
    let mut first: [Option<f64>; 2] = [None, None];
    for (&t, &v) in treatment.iter().zip(col) {
        let slot = &mut first[t as usize];
        match *slot {
            None => *slot = Some(v),
            Some(f) if f != v => return false,
            Some(_) => {}
        }
    }
    true
}

/// Ridge penalty of the propensity model.
pub(crate) const DEFAULT_PROPENSITY_RIDGE: f64 = 1.0;

/// Estimate the effect on complete-case data.
pub(crate) fn estimate_on(
    data: &EstimationData,
    method: &EstimationMethod,
    target_units: TargetUnits,
    ridge: f64,
) -> Result<f64> {
    let (n_t, n_c) = data.arm_sizes();
    if n_t == 0 || n_c == 0 {
        return Err(Error::InvalidArgument(format!(
            "both treatment arms must be non-empty (treated={n_t}, control={n_c})"
        )));
    }

    let value = match method.estimator {
        Estimator::PropensityScoreMatching => {
            let ps = fit_propensity(&data.treatment, &data.covariates, ridge)?;
            matching_effect(&data.treatment, &data.outcome, &ps, target_units)
        }
        Estimator::PropensityScoreWeighting => {
            let ps = fit_propensity(&data.treatment, &data.covariates, ridge)?;
            weighting_effect(&data.treatment, &data.outcome, &ps, target_units)
        }
        Estimator::LinearRegression => regression_effect(data)?,
        Estimator::InstrumentalVariable => wald_effect(data)?,
    };

    if !value.is_finite() {
        return Err(Error::Computation(format!("{method} produced a non-finite effect")));
    }
    Ok(value)
}

/// Opposite-arm units collapsed by identical score: `(score, mean outcome)`, sorted.
fn score_groups(scores: impl Iterator<Item = (f64, f64)>) -> Vec<(f64, f64)> {
    let mut pairs: Vec<(f64, f64)> = scores.collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
    let mut groups: Vec<(f64, f64, usize)> = Vec::new();
    for (s, y) in pairs {
        if groups.last().is_some_and(|g| g.0 == s) {
            let last = groups.len() - 1;
            groups[last].1 += y;
            groups[last].2 += 1;
        } else {
            groups.push((s, y, 1));
        }
    }
    groups.into_iter().map(|(s, sum, n)| (s, sum / n as f64)).collect()
}

fn nearest_outcome(groups: &[(f64, f64)], score: f64) -> f64 {
    let k = groups.partition_point(|g| g.0 < score);
    match (k.checked_sub(1).map(|i| groups[i]), groups.get(k)) {
        (Some(lo), Some(hi)) => {
            if score - lo.0 <= hi.0 - score {
                lo.1
            } else {
                hi.1
            }
        }
        (Some(lo), None) => lo.1,
        (None, Some(hi)) => hi.1,
        (None, None) => f64::NAN,
    }
}

fn matching_effect(t: &[bool], y: &[f64], ps: &[f64], target: TargetUnits) -> f64 {
    let idx = || 0..t.len();
    let controls = score_groups(idx().filter(|&i| !t[i]).map(|i| (ps[i], y[i])));
    let treated = score_groups(idx().filter(|&i| t[i]).map(|i| (ps[i], y[i])));

    let att = || {
        let diffs: Vec<f64> =
            idx().filter(|&i| t[i]).map(|i| y[i] - nearest_outcome(&controls, ps[i])).collect();
        diffs.iter().sum::<f64>() / diffs.len() as f64
    };
    let atc = || {
        let diffs: Vec<f64> =
            idx().filter(|&i| !t[i]).map(|i| nearest_outcome(&treated, ps[i]) - y[i]).collect();
        diffs.iter().sum::<f64>() / diffs.len() as f64
    };

    match target {
        TargetUnits::Att => att(),
        TargetUnits::Atc => atc(),
        TargetUnits::Ate => {
            let n_t = t.iter().filter(|&&v| v).count() as f64;
            let n_c = t.len() as f64 - n_t;
            (n_t * att() + n_c * atc()) / (n_t + n_c)
        }
    }
}

fn weighting_effect(t: &[bool], y: &[f64], ps: &[f64], target: TargetUnits) -> f64 {
    let mut s1 = 0.0_f64;
    let mut w1 = 0.0_f64;
    let mut s0 = 0.0_f64;
    let mut w0 = 0.0_f64;
    for i in 0..t.len() {
        let e = ps[i].clamp(0.01, 0.99);
        let (wt, wc) = match target {
            TargetUnits::Ate => (1.0 / e, 1.0 / (1.0 - e)),
            TargetUnits::Att => (1.0, e / (1.0 - e)),
            TargetUnits::Atc => ((1.0 - e) / e, 1.0),
        };
        if t[i] {
            s1 += wt * y[i];
            w1 += wt;
        } else {
            s0 += wc * y[i];
            w0 += wc;
        }
    }
    s1 / w1 - s0 / w0
}

fn regression_effect(data: &EstimationData) -> Result<f64> {
    let n = data.n();
    let d = 2 + data.covariates.len();
    let mut x = Vec::with_capacity(n * d);
    for i in 0..n {
        x.push(1.0);
        x.push(if data.treatment[i] { 1.0 } else { 0.0 });
        for c in &data.covariates {
            x.push(c[i]);
        }
    }
    let x_mat = DMatrix::from_row_slice(n, d, &x);
    let y_vec = DVector::from_column_slice(&data.outcome);
    let xtx = x_mat.transpose() * &x_mat;
    let xty = x_mat.transpose() * &y_vec;
    let beta = xtx
        .lu()
        .solve(&xty)
        .ok_or_else(|| Error::Computation("X'X singular in linear regression".into()))?;
    Ok(beta[1])
}

fn wald_effect(data: &EstimationData) -> Result<f64> {
    let z = data.instruments.first().ok_or_else(|| {
        Error::InvalidArgument("instrumental_variable estimation needs an observed instrument".into())
    })?;
    let n = data.n() as f64;
    let t: Vec<f64> = data.treatment.iter().map(|&v| if v { 1.0 } else { 0.0 }).collect();
    let mean = |v: &[f64]| v.iter().sum::<f64>() / n;
    let (mz, mt, my) = (mean(z), mean(&t), mean(&data.outcome));
    let mut cov_tz = 0.0_f64;
    let mut cov_yz = 0.0_f64;
    for i in 0..z.len() {
        cov_tz += (t[i] - mt) * (z[i] - mz);
        cov_yz += (data.outcome[i] - my) * (z[i] - mz);
    }
    if cov_tz.abs() < 1e-12 * n {
        return Err(Error::Computation("instrument does not predict treatment (zero first stage)".into()));
    }
    Ok(cov_yz / cov_tz)
}
