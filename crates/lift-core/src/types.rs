//! Common data types for lift

use serde::{Deserialize, Serialize};

use crate::traits::ColumnSource;
use crate::{Error, Result};

/// Column name: user identifier.
pub const COL_USER_ID: &str = "user_id";
/// Column name: enrollment month (0 = never enrolled).
pub const COL_SIGNUP_MONTH: &str = "signup_month";
/// Column name: treatment indicator.
pub const COL_TREATMENT: &str = "treatment";
/// Column name: mean spend before the cohort month.
pub const COL_PRE_SPENDS: &str = "pre_spends";
/// Column name: mean spend after the cohort month.
pub const COL_POST_SPENDS: &str = "post_spends";

const COHORT_COLUMNS: [&str; 5] =
    [COL_USER_ID, COL_SIGNUP_MONTH, COL_TREATMENT, COL_PRE_SPENDS, COL_POST_SPENDS];

/// One user-month row of the simulated panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// User identifier, repeated across that user's months.
    pub user_id: u64,
    /// Enrollment month; 0 means the user never enrolled.
    pub signup_month: u32,
    /// Observation month, 1-indexed.
    pub month: u32,
    /// Spend in this month. May be negative after decay.
    pub spend: f64,
    /// `signup_month > 0`.
    pub treatment: bool,
}

/// Pre/post summary for one user of a single-signup-month cohort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortRow {
    /// User identifier.
    pub user_id: u64,
    /// Either 0 or the cohort month.
    pub signup_month: u32,
    /// Treatment indicator.
    pub treatment: bool,
    /// Mean spend over months strictly before the cohort month; `None` if there are none.
    pub pre_spends: Option<f64>,
    /// Mean spend over months strictly after the cohort month; `None` if there are none.
    pub post_spends: Option<f64>,
}

/// Ordered collection of cohort rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CohortTable {
    /// Rows in aggregation order.
    pub rows: Vec<CohortRow>,
}

impl CohortTable {
    /// Wrap rows into a table.
    pub fn new(rows: Vec<CohortRow>) -> Self {
        Self { rows }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `(treated, control)` row counts.
    pub fn arm_sizes(&self) -> (usize, usize) {
        let treated = self.rows.iter().filter(|r| r.treatment).count();
        (treated, self.rows.len() - treated)
    }
}

impl ColumnSource for CohortTable {
    fn n_rows(&self) -> usize {
        self.rows.len()
    }

    fn column_names(&self) -> Vec<String> {
        COHORT_COLUMNS.iter().map(|c| c.to_string()).collect()
    }

    fn has_column(&self, name: &str) -> bool {
        COHORT_COLUMNS.contains(&name)
    }

    fn column(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let extract: fn(&CohortRow) -> Option<f64> = match name {
            COL_USER_ID => |r| Some(r.user_id as f64),
            COL_SIGNUP_MONTH => |r| Some(r.signup_month as f64),
            COL_TREATMENT => |r| Some(if r.treatment { 1.0 } else { 0.0 }),
            COL_PRE_SPENDS => |r| r.pre_spends,
            COL_POST_SPENDS => |r| r.post_spends,
            other => {
                return Err(Error::InvalidArgument(format!(
                    "unknown cohort column '{other}' (expected one of {})",
                    COHORT_COLUMNS.join(", ")
                )));
            }
        };
        Ok(self.rows.iter().map(extract).collect())
    }
}
