// tests/scenarios.rs
use approx::assert_abs_diff_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rule_insight::algorithms::induction::Comparator;
use rule_insight::algorithms::metrics::Metrics;
use rule_insight::algorithms::risk::RiskLevel;
use rule_insight::{Domain, Engine, ModelKind, PatternMiner, Result, RuleArtifact, Table, Value};

fn attrition_table() -> Result<Table> {
    let leave_count: Vec<Value> = (0..20i64)
        .map(|i| Value::from(if i % 2 == 0 { 15 + i % 5 } else { 1 + i % 5 }))
        .collect();
    let attrition: Vec<Value> = (0..20)
        .map(|i| Value::from(if i % 2 == 0 { "Yes" } else { "No" }))
        .collect();
    Table::from_columns(vec![("leave_count", leave_count), ("attrition", attrition)])
}

#[test]
fn leave_count_separates_attrition() -> Result<()> {
    let engine = Engine::new(None)?;
    let report = engine.train(&attrition_table()?, "attrition")?;

    assert_eq!(report.model_kind, ModelKind::Classifier);
    assert_eq!((report.train_rows, report.test_rows), (16, 4));

    let RuleArtifact::Classification(rules) = &report.artifact else {
        panic!("expected a classification rule-set, got {:?}", report.artifact);
    };
    assert!(rules
        .rules()
        .iter()
        .any(|r| r.feature == "leave_count" && r.confidence > 0.8));
    // Training values split at 15: every row at or above it left.
    assert!(rules.rules().iter().any(|r| r.comparator == Comparator::AtLeast
        && r.threshold == 15.0
        && r.predicted_class == "Yes"
        && r.confidence == 1.0));

    let Metrics::Classification(metrics) = report.metrics else {
        panic!("expected classification metrics");
    };
    assert!(metrics.accuracy >= 0.5);
    assert_abs_diff_eq!(metrics.accuracy, 1.0);
    assert!(report.sample_predictions.iter().all(|p| p.correct));
    Ok(())
}

#[test]
fn linear_target_is_recovered_exactly() -> Result<()> {
    let x: Vec<Value> = (1..=20).map(|i| Value::from(i as f64)).collect();
    let y: Vec<Value> = (1..=20).map(|i| Value::from(2.0 * i as f64 + 1.0)).collect();
    let table = Table::from_columns(vec![("x", x), ("y", y)])?;

    let report = Engine::new(None)?.train(&table, "y")?;
    assert_eq!(report.model_kind, ModelKind::Regressor);
    let RuleArtifact::Regression(rules) = &report.artifact else {
        panic!("expected regression rules");
    };
    assert_abs_diff_eq!(rules.weight("x"), 2.0, epsilon = 1e-9);

    let Metrics::Regression(metrics) = report.metrics else {
        panic!("expected regression metrics");
    };
    assert_abs_diff_eq!(metrics.r2, 1.0, epsilon = 1e-9);
    assert_abs_diff_eq!(metrics.mae, 0.0, epsilon = 1e-9);
    Ok(())
}

#[test]
fn constant_feature_gets_zero_weight() -> Result<()> {
    let flat: Vec<Value> = (0..20).map(|_| Value::from(3.0)).collect();
    let z: Vec<Value> = (0..20).map(|i| Value::from(i as f64)).collect();
    let y: Vec<Value> = (0..20).map(|i| Value::from(i as f64 * 1.5)).collect();
    let table = Table::from_columns(vec![("flat", flat), ("z", z), ("y", y)])?;

    let report = Engine::new(None)?.train(&table, "y")?;
    let RuleArtifact::Regression(rules) = &report.artifact else {
        panic!("expected regression rules");
    };
    assert_eq!(rules.weight("flat"), 0.0);
    assert!(rules.weight("z") > 0.0);
    Ok(())
}

#[test]
fn high_min_support_prunes_every_association() -> Result<()> {
    let ids: Vec<Value> = (0..10).map(|i| Value::from(format!("id{}", i))).collect();
    let codes: Vec<Value> = (0..10).map(|i| Value::from(format!("code{}", i))).collect();
    let table = Table::from_columns(vec![("id", ids), ("code", codes)])?;

    let mined = PatternMiner::default().extract_rules(&table, Domain::General, None, 0.5, 0.5)?;
    assert!(mined.association_rules.is_empty());
    assert_eq!(mined.summary.total_association_rules, 0);
    Ok(())
}

#[test]
fn finance_budget_templates_raise_cost_risk() -> Result<()> {
    let travel: Vec<Value> = (0..12).map(|i| Value::from(100.0 + 10.0 * i as f64)).collect();
    let office: Vec<Value> = (0..12).map(|i| Value::from(50.0 + 5.0 * i as f64)).collect();
    let table = Table::from_columns(vec![("travel_expense", travel), ("office_cost", office)])?;

    let engine = Engine::new(None)?;
    let mined = engine.extract_rules(&table, Domain::Finance, None)?;
    let templates: Vec<_> = mined.if_then_rules.iter().filter(|r| r.is_template()).collect();
    assert_eq!(templates.len(), 2);
    assert!(templates.iter().all(|r| r.rule.ends_with("THEN budget alert")));

    let risk = engine.analyze_risk(Domain::Finance, &mined);
    assert_eq!(risk.risk_levels.cost, RiskLevel::High);
    assert_eq!(risk.risk_levels.attrition, RiskLevel::NotApplicable);
    Ok(())
}

#[test]
fn repeated_runs_are_identical() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(7);
    let n = 60;
    let a: Vec<Value> = (0..n).map(|_| Value::from(rng.gen_range(0.0..100.0))).collect();
    let b: Vec<Value> = (0..n).map(|_| Value::from(rng.gen_range(-5.0..5.0))).collect();
    let team: Vec<Value> = (0..n)
        .map(|_| Value::from(["red", "green", "blue"][rng.gen_range(0..3)]))
        .collect();
    let score: Vec<Value> = (0..n).map(|_| Value::from(rng.gen_range(0..4) as f64)).collect();
    let table = Table::from_columns(vec![("a", a), ("b", b), ("team", team), ("score", score)])?;

    let engine = Engine::new(None)?;
    let first = engine.train(&table, "score")?;
    let second = engine.train(&table, "score")?;
    assert_eq!(first, second);
    assert_eq!(
        engine.explain_training(&first, &table, "score")?,
        engine.explain_training(&second, &table, "score")?
    );

    let mined = engine.extract_rules(&table, Domain::Sales, Some("score"))?;
    assert_eq!(mined, engine.extract_rules(&table, Domain::Sales, Some("score"))?);
    assert_eq!(
        engine.analyze_risk(Domain::Sales, &mined),
        engine.analyze_risk(Domain::Sales, &mined)
    );
    Ok(())
}

#[test]
fn reports_serialize_without_non_finite_numbers() -> Result<()> {
    let engine = Engine::new(None)?;
    let table = attrition_table()?;
    let report = engine.train(&table, "attrition")?;
    let json = serde_json::to_value(&report)?;
    assert_eq!(json["model_kind"], "rule_based_classifier");
    assert_eq!(json["artifact"]["kind"], "classification");

    let explanation = engine.explain_training(&report, &table, "attrition")?;
    let json = serde_json::to_value(&explanation)?;
    assert!(json["feature_importance"]["leave_count"].is_number());
    Ok(())
}
