// src/engine.rs
use crate::algorithms::{
    Explainer, Explanation, MinedRules, ModelKind, PatternMiner, RiskAggregator, RiskAssessment,
    RuleArtifact, RuleInducer, TrainingReport,
};
use crate::core::{Domain, EngineConfig, FeatureMatrix, InsightError, Result, Table, Value};

/// One entry point over the four engines, sharing a validated configuration.
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    inducer: RuleInducer,
    miner: PatternMiner,
    explainer: Explainer,
    aggregator: RiskAggregator,
}

impl Engine {
    pub fn new(config: Option<EngineConfig>) -> Result<Self> {
        let config = config.unwrap_or_default();
        config.validate()?;
        Ok(Engine {
            inducer: RuleInducer::new(Some(config.induction.clone())),
            miner: PatternMiner::new(Some(config.mining.clone()))
                .with_column_config(config.columns.clone()),
            explainer: Explainer::new(Some(config.explain.clone())),
            aggregator: RiskAggregator::new(),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn train(&self, table: &Table, target_column: &str) -> Result<TrainingReport> {
        self.inducer.train(table, target_column)
    }

    pub fn extract_rules(
        &self,
        table: &Table,
        domain: Domain,
        target_column: Option<&str>,
    ) -> Result<MinedRules> {
        self.miner
            .extract_rules_with_defaults(table, domain, target_column)
    }

    pub fn explain(
        &self,
        artifact: &RuleArtifact,
        features: &FeatureMatrix,
        target: &[Value],
        model_kind: ModelKind,
    ) -> Result<Explanation> {
        self.explainer
            .explain(artifact, features.view(), target, &features.columns, model_kind)
    }

    /// Explains a training report over the first `explain.sample_size` rows of `table`.
    pub fn explain_training(
        &self,
        report: &TrainingReport,
        table: &Table,
        target_column: &str,
    ) -> Result<Explanation> {
        let target_idx = table
            .column_index(target_column)
            .ok_or_else(|| InsightError::MissingColumn(target_column.to_string()))?;
        let sample = table.feature_matrix(&report.feature_columns, Some(self.config.explain.sample_size))?;
        let target: Vec<Value> = table
            .column_values(target_idx)
            .take(sample.nrows())
            .cloned()
            .collect();
        self.explain(&report.artifact, &sample, &target, report.model_kind)
    }

    pub fn analyze_risk(&self, domain: Domain, mined: &MinedRules) -> RiskAssessment {
        self.aggregator.analyze(domain, mined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::{ImportanceSource, RiskLevel};
    use crate::core::ExplainConfig;
    use approx::assert_abs_diff_eq;

    fn hr_table() -> Table {
        let n: i64 = 40;
        let tenure: Vec<Value> = (0..n).map(|i| Value::from((i % 10) as f64)).collect();
        let leave_count: Vec<Value> = (0..n)
            .map(|i| Value::from(if i % 2 == 0 { 12 + i % 4 } else { 2 + i % 3 }))
            .collect();
        let attrition: Vec<Value> = (0..n)
            .map(|i| Value::from(if i % 2 == 0 { "Yes" } else { "No" }))
            .collect();
        Table::from_columns(vec![
            ("tenure", tenure),
            ("leave_count", leave_count),
            ("attrition", attrition),
        ])
        .unwrap()
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = EngineConfig::default();
        config.induction.train_fraction = 1.5;
        assert!(matches!(
            Engine::new(Some(config)),
            Err(InsightError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn end_to_end_on_hr_data() -> Result<()> {
        let engine = Engine::new(None)?;
        let table = hr_table();

        let report = engine.train(&table, "attrition")?;
        assert_eq!(report.model_kind, ModelKind::Classifier);

        let explanation = engine.explain_training(&report, &table, "attrition")?;
        assert_eq!(explanation.importance_source, ImportanceSource::RuleConfidence);
        assert_abs_diff_eq!(explanation.feature_importance.total(), 1.0, epsilon = 1e-9);

        let mined = engine.extract_rules(&table, Domain::Hr, Some("attrition"))?;
        assert!(mined.if_then_rules.iter().any(|r| r.is_template()));

        let risk = engine.analyze_risk(Domain::Hr, &mined);
        assert_eq!(risk.domain, Domain::Hr);
        assert_ne!(risk.risk_levels.attrition, RiskLevel::NotApplicable);
        Ok(())
    }

    #[test]
    fn explain_training_uses_the_configured_sample() -> Result<()> {
        let mut config = EngineConfig::default();
        config.explain = ExplainConfig {
            sample_size: 4,
            ..ExplainConfig::default()
        };
        let engine = Engine::new(Some(config))?;
        let table = hr_table();
        let report = engine.train(&table, "attrition")?;

        // The first four rows have mean tenure 1.5.
        let explanation = engine.explain_training(&report, &table, "attrition")?;
        assert!(explanation
            .insights
            .iter()
            .any(|s| s.starts_with("tenure has high impact. Average value: 1.50")));
        Ok(())
    }

    #[test]
    fn explain_training_needs_the_target() -> Result<()> {
        let engine = Engine::new(None)?;
        let table = hr_table();
        let report = engine.train(&table, "attrition")?;
        assert!(matches!(
            engine.explain_training(&report, &table, "salary"),
            Err(InsightError::MissingColumn(_))
        ));
        Ok(())
    }
}
