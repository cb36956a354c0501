//! Simulate → aggregate → identify → estimate → refute on generated panels.

use lift_core::types::COL_SIGNUP_MONTH;
use lift_core::{ColumnSource, Error};
use lift_inference::{
    CausalGraph, CausalPipeline, EstimationMethod, PanelConfig, RefutationOutcome, RefuteOptions,
    Stage, TargetUnits, aggregate_cohort, generate_panel,
};

fn psm() -> EstimationMethod {
    "iv.propensity_score_matching".parse().unwrap()
}

#[test]
fn small_panel_smoke() {
    let cfg = PanelConfig { num_users: 100, num_months: 6, seed: Some(0), ..Default::default() };
    let panel = generate_panel(&cfg).unwrap();
    assert_eq!(panel.len(), 600);

    let cohort = aggregate_cohort(&panel, 3).unwrap();
    assert!(cohort.len() <= 100);
    let months = cohort.column(COL_SIGNUP_MONTH).unwrap();
    assert!(months.iter().all(|m| matches!(m, Some(v) if *v == 0.0 || *v == 3.0)));

    let mut p =
        CausalPipeline::new(cohort, "treatment", "post_spends", CausalGraph::loyalty_program())
            .unwrap();
    let r = p.run(&psm(), TargetUnits::Att, false).unwrap();
    assert_eq!(r.stage, Stage::Estimated);
    assert!(r.ate.is_some_and(f64::is_finite));
}

#[test]
fn recovers_true_effect_and_passes_refutation() {
    let cfg = PanelConfig { num_users: 5_000, seed: Some(42), ..Default::default() };
    let panel = generate_panel(&cfg).unwrap();
    let cohort = aggregate_cohort(&panel, 3).unwrap();
    let (treated, control) = cohort.arm_sizes();
    assert!(treated > 100 && control > 1_000, "treated={treated} control={control}");

    let mut p =
        CausalPipeline::new(cohort, "treatment", "post_spends", CausalGraph::loyalty_program())
            .unwrap();
    let estimand = p.identify().unwrap();
    assert!(estimand.backdoor_identified);

    let est = p.estimate(&psm(), TargetUnits::Att).unwrap();
    assert!((est.value - cfg.treatment_effect).abs() < 5.0, "att={}", est.value);
    assert_eq!(est.covariates, vec!["pre_spends"]);

    let opts = RefuteOptions { num_simulations: 20, seed: Some(7), ..Default::default() };
    let outcomes = p.refute(&opts).unwrap();
    assert_eq!(outcomes.len(), 3);
    for outcome in &outcomes {
        let r = outcome.result().unwrap_or_else(|| panic!("{} failed: {outcome:?}", outcome.name()));
        match r.name.as_str() {
            "Placebo Treatment" => assert!(r.new_effect.abs() < 5.0, "placebo={}", r.new_effect),
            _ => assert!((r.new_effect - est.value).abs() < 5.0, "{}={}", r.name, r.new_effect),
        }
    }
    assert!(matches!(outcomes[0], RefutationOutcome::Completed(_)));
}

#[test]
fn estimators_agree_on_large_panel() {
    let cfg = PanelConfig { num_users: 5_000, seed: Some(9), ..Default::default() };
    let cohort = aggregate_cohort(&generate_panel(&cfg).unwrap(), 4).unwrap();
    let mut p =
        CausalPipeline::new(cohort, "treatment", "post_spends", CausalGraph::loyalty_program())
            .unwrap();
    p.identify().unwrap();
    for method in [
        "backdoor.propensity_score_matching",
        "backdoor.propensity_score_weighting",
        "backdoor.linear_regression",
    ] {
        let m: EstimationMethod = method.parse().unwrap();
        let est = p.estimate(&m, TargetUnits::Ate).unwrap();
        assert!((est.value - 100.0).abs() < 8.0, "{method}: {}", est.value);
    }
}

#[test]
fn stages_must_run_in_order() {
    let cfg = PanelConfig { num_users: 200, num_months: 6, seed: Some(1), ..Default::default() };
    let cohort = aggregate_cohort(&generate_panel(&cfg).unwrap(), 2).unwrap();
    let mut p =
        CausalPipeline::new(cohort, "treatment", "post_spends", CausalGraph::loyalty_program())
            .unwrap();

    assert!(matches!(
        p.estimate(&psm(), TargetUnits::Att),
        Err(Error::OrderingViolation { operation: "estimate", .. })
    ));
    assert!(matches!(
        p.refute(&RefuteOptions::default()),
        Err(Error::OrderingViolation { operation: "refute", .. })
    ));
    assert_eq!(p.stage(), Stage::Uninitialized);
}

#[test]
fn graph_from_dot_matches_builtin() {
    let builtin = CausalGraph::loyalty_program();
    let parsed = CausalGraph::from_dot(&builtin.to_dot()).unwrap();

    let cfg = PanelConfig { num_users: 300, num_months: 8, seed: Some(3), ..Default::default() };
    let cohort = aggregate_cohort(&generate_panel(&cfg).unwrap(), 3).unwrap();

    let mut a = CausalPipeline::new(cohort.clone(), "treatment", "post_spends", builtin).unwrap();
    let mut b = CausalPipeline::new(cohort, "treatment", "post_spends", parsed).unwrap();
    assert_eq!(a.identify().unwrap(), b.identify().unwrap());
}

#[test]
fn first_month_cohort_estimates_without_pre_period() {
    let cfg = PanelConfig { num_users: 2_000, seed: Some(0), ..Default::default() };
    let cohort = aggregate_cohort(&generate_panel(&cfg).unwrap(), 1).unwrap();
    let (treated, control) = cohort.arm_sizes();
    assert!(treated > 0 && control > 0);
    let pre = cohort.column("pre_spends").unwrap();
    assert!(pre.iter().all(Option::is_none));

    let mut p =
        CausalPipeline::new(cohort, "treatment", "post_spends", CausalGraph::loyalty_program())
            .unwrap();
    p.identify().unwrap();
    let est = p.estimate(&psm(), TargetUnits::Att).unwrap();
    assert_eq!((est.n_treated, est.n_control), (treated, control));
    assert!(est.covariates.is_empty());
    assert!((est.value - cfg.treatment_effect).abs() < 10.0, "att={}", est.value);
}
