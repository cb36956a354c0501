//! Graph-based identification of the treatment → outcome effect.
//!
//! Identification proceeds even when the backdoor criterion cannot be
//! satisfied with the observed variables; the estimand records whether it
//! was and the caller decides what to do with a non-identified effect.

use std::fmt;

use lift_core::{ColumnSource, Error, Result};
use serde::{Deserialize, Serialize};

use crate::graph::CausalGraph;

/// Identified causal estimand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Estimand {
    /// Treatment variable.
    pub treatment: String,
    /// Outcome variable.
    pub outcome: String,
    /// Observed parents of the treatment used for adjustment.
    pub backdoor_variables: Vec<String>,
    /// Whether `backdoor_variables` blocks every backdoor path.
    pub backdoor_identified: bool,
    /// Parents of the treatment that reach the outcome only through it.
    pub instrumental_variables: Vec<String>,
    /// Graph variables with no matching data column.
    pub unobserved_variables: Vec<String>,
}

impl Estimand {
    /// Instruments that have a data column.
    pub fn observed_instruments(&self) -> Vec<&str> {
        self.instrumental_variables
            .iter()
            .filter(|v| !self.unobserved_variables.contains(v))
            .map(String::as_str)
            .collect()
    }
}

/// Identify the effect of `treatment` on `outcome` under `graph`.
pub fn identify_effect(
    data: &dyn ColumnSource,
    graph: &CausalGraph,
    treatment: &str,
    outcome: &str,
) -> Result<Estimand> {
    if treatment == outcome {
        return Err(Error::InvalidArgument("treatment and outcome must differ".into()));
    }
    for (role, name) in [("treatment", treatment), ("outcome", outcome)] {
        if !graph.contains(name) {
            return Err(Error::InvalidArgument(format!(
                "{role} '{name}' is not a node of the causal graph"
            )));
        }
        if !data.has_column(name) {
            return Err(Error::InvalidArgument(format!("{role} '{name}' is not a data column")));
        }
    }

    let unobserved_variables: Vec<String> = graph
        .node_names()
        .into_iter()
        .filter(|n| !data.has_column(n))
        .map(str::to_string)
        .collect();

    let descendants = graph.descendants(treatment)?;
    if !descendants.contains(outcome) {
        tracing::warn!(treatment, outcome, "outcome is not a descendant of treatment; effect is zero under the graph");
    }

    let parents = graph.parents(treatment)?;
    let backdoor_variables: Vec<String> = parents
        .iter()
        .filter(|p| data.has_column(p) && !descendants.contains(p.as_str()))
        .cloned()
        .collect();

    let adjust: Vec<&str> = backdoor_variables.iter().map(String::as_str).collect();
    let backdoor_identified =
        graph.without_outgoing(treatment)?.is_d_separated(&[treatment], &[outcome], &adjust)?;
    if !backdoor_identified {
        tracing::warn!(
            treatment,
            outcome,
            adjustment = ?backdoor_variables,
            "backdoor criterion not satisfied by observed variables; proceeding anyway"
        );
    }

    let outcome_ancestors = graph.without_incoming(treatment)?.ancestors(outcome)?;
    let instrumental_variables: Vec<String> = parents
        .iter()
        .filter(|p| !outcome_ancestors.contains(p.as_str()) && !descendants.contains(p.as_str()))
        .cloned()
        .collect();

    let estimand = Estimand {
        treatment: treatment.to_string(),
        outcome: outcome.to_string(),
        backdoor_variables,
        backdoor_identified,
        instrumental_variables,
        unobserved_variables,
    };
    tracing::info!(
        backdoor = ?estimand.backdoor_variables,
        instruments = ?estimand.instrumental_variables,
        identified = estimand.backdoor_identified,
        "effect identified"
    );
    Ok(estimand)
}

impl fmt::Display for Estimand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (t, y) = (&self.treatment, &self.outcome);
        let adj = self.backdoor_variables.join(",");
        writeln!(f, "Estimand type: nonparametric-ate")?;
        writeln!(f)?;
        writeln!(f, "### Estimand : 1")?;
        writeln!(f, "Estimand name: backdoor")?;
        if adj.is_empty() {
            writeln!(f, "Estimand expression: d/d[{t}] E[{y}]")?;
        } else {
            writeln!(f, "Estimand expression: d/d[{t}] E[{y}|{adj}]")?;
        }
        writeln!(
            f,
            "Estimand assumption 1, Unconfoundedness: If U→{{{t}}} and U→{y} then P({y}|{t},{adj},U) = P({y}|{t},{adj})"
        )?;
        writeln!(
            f,
            "Backdoor criterion: {}",
            if self.backdoor_identified { "satisfied" } else { "NOT satisfied" }
        )?;
        writeln!(f)?;
        writeln!(f, "### Estimand : 2")?;
        writeln!(f, "Estimand name: iv")?;
        if self.instrumental_variables.is_empty() {
            writeln!(f, "No instrumental variables found.")?;
        } else {
            let ivs: Vec<String> = self
                .instrumental_variables
                .iter()
                .map(|v| {
                    if self.unobserved_variables.contains(v) {
                        format!("{v} (unobserved)")
                    } else {
                        v.clone()
                    }
                })
                .collect();
            writeln!(f, "Instruments: {}", ivs.join(", "))?;
            writeln!(
                f,
                "Estimand assumption 1, As-if-random: If U→→{y} then ¬(U →→{{{}}})",
                self.instrumental_variables.join(",")
            )?;
            writeln!(
                f,
                "Estimand assumption 2, Exclusion: If we remove {{{}}}→{{{t}}}, then ¬({{{}}}→{y})",
                self.instrumental_variables.join(","),
                self.instrumental_variables.join(",")
            )?;
        }
        if !self.unobserved_variables.is_empty() {
            writeln!(f)?;
            write!(f, "Unobserved variables: {}", self.unobserved_variables.join(", "))?;
        }
        Ok(())
    }
}
