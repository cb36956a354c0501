//! Pre/post cohort aggregation.
//!
//! Collapses the panel into one row per user of a single-signup-month
//! cohort: users who enrolled in `target_signup_month` (treated) and users
//! who never enrolled (control). Each row carries the user's mean spend
//! strictly before and strictly after the target month; the target month
//! itself belongs to neither side.

use std::collections::HashMap;

use lift_core::{CohortRow, CohortTable, Error, Observation, Result};

#[derive(Debug, Default, Clone, Copy)]
struct RunningMean {
    sum: f64,
    n: usize,
}

impl RunningMean {
    fn push(&mut self, x: f64) {
        self.sum += x;
        self.n += 1;
    }

    fn mean(self) -> Option<f64> {
        (self.n > 0).then(|| self.sum / self.n as f64)
    }
}

#[derive(Debug)]
struct Group {
    user_id: u64,
    signup_month: u32,
    treatment: bool,
    pre: RunningMean,
    post: RunningMean,
}

/// Aggregate panel observations into a pre/post cohort for one signup month.
///
/// Groups are keyed by `(user_id, signup_month, treatment)` and emitted in
/// order of first appearance, so the output is deterministic for a fixed
/// input order.
pub fn aggregate_cohort(observations: &[Observation], target_signup_month: u32) -> Result<CohortTable> {
    if target_signup_month == 0 {
        return Err(Error::InvalidArgument(
            "target_signup_month must be >= 1 (0 marks never-enrolled users)".into(),
        ));
    }

    let mut index: HashMap<(u64, u32, bool), usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();

    for o in observations {
        if o.signup_month != 0 && o.signup_month != target_signup_month {
            continue;
        }
        let key = (o.user_id, o.signup_month, o.treatment);
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push(Group {
                user_id: o.user_id,
                signup_month: o.signup_month,
                treatment: o.treatment,
                pre: RunningMean::default(),
                post: RunningMean::default(),
            });
            groups.len() - 1
        });
        let g = &mut groups[slot];
        if o.month < target_signup_month {
            g.pre.push(o.spend);
        } else if o.month > target_signup_month {
            g.post.push(o.spend);
        }
    }

    let rows: Vec<CohortRow> = groups
        .into_iter()
        .map(|g| CohortRow {
            user_id: g.user_id,
            signup_month: g.signup_month,
            treatment: g.treatment,
            pre_spends: g.pre.mean(),
            post_spends: g.post.mean(),
        })
        .collect();

    let table = CohortTable::new(rows);
    let (treated, control) = table.arm_sizes();
    tracing::debug!(target_signup_month, treated, control, "cohort aggregated");
    Ok(table)
}
