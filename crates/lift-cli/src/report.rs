//! Console report printed to stdout while the analysis runs.

use lift_inference::{CausalEstimate, Estimand, RefutationOutcome};
use std::io::{self, Write};

const RULE_WIDTH: usize = 60;

/// Section header framed by `=` rules.
pub fn section(out: &mut dyn Write, title: &str) -> io::Result<()> {
    let rule = "=".repeat(RULE_WIDTH);
    writeln!(out, "\n{rule}")?;
    writeln!(out, "  {title}")?;
    writeln!(out, "{rule}\n")
}

/// `1234567` → `1,234,567`.
pub fn thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

pub fn data_generation_header(out: &mut dyn Write, n_obs: usize, n_users: usize) -> io::Result<()> {
    writeln!(out, "Generated {} observations for {} users.", thousands(n_obs), thousands(n_users))
}

pub fn cohort_summary(
    out: &mut dyn Write,
    cohort_size: usize,
    signup_month: u32,
    arms: (usize, usize),
) -> io::Result<()> {
    writeln!(out, "Cohort data: {} users (month={signup_month}).", thousands(cohort_size))?;
    writeln!(out, "  Treatment: {}  |  Control: {}", thousands(arms.0), thousands(arms.1))
}

pub fn estimand(out: &mut dyn Write, estimand: &Estimand) -> io::Result<()> {
    writeln!(out, "{estimand}")
}

pub fn estimate(out: &mut dyn Write, estimate: &CausalEstimate, true_effect: f64) -> io::Result<()> {
    writeln!(out, "\nEstimated ATE: {:.4}", estimate.value)?;
    writeln!(out, "(True treatment effect: {true_effect})")
}

pub fn refutations(out: &mut dyn Write, outcomes: &[RefutationOutcome]) -> io::Result<()> {
    for outcome in outcomes {
        writeln!(out, "  {}:", outcome.name())?;
        match outcome {
            RefutationOutcome::Completed(r) => {
                writeln!(out, "    Original effect : {:.4}", r.estimated_effect)?;
                writeln!(out, "    New effect      : {:.4}", r.new_effect)?;
                if let Some(p) = r.p_value {
                    writeln!(out, "    p-value         : {p:.4}")?;
                }
            }
            RefutationOutcome::Failed { error, .. } => {
                writeln!(out, "    Failed          : {error}")?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}
