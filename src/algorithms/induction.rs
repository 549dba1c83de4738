// src/algorithms/induction.rs

use crate::algorithms::metrics::{
    classification_metrics, distinct_labels, regression_metrics, Metrics,
};
use crate::core::{FeatureMatrix, InductionConfig, InsightError, Result, Table, Value};
use crate::traits::RulePredictor;
use crate::utils::{finite_or_zero, mean, rank_quartiles, sorted, Sanitize, Tally};
use log::{debug, info, warn};
use ndarray::{ArrayView1, ArrayView2};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Class returned when no classification rule matches a row.
pub const UNKNOWN_CLASS: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Comparator {
    #[serde(rename = ">=")]
    AtLeast,
    #[serde(rename = "<")]
    Below,
}

impl Comparator {
    pub fn holds(self, value: f64, threshold: f64) -> bool {
        match self {
            Comparator::AtLeast => value >= threshold,
            Comparator::Below => value < threshold,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Comparator::AtLeast => ">=",
            Comparator::Below => "<",
        }
    }
}

/// One threshold rule: rows on the `comparator` side of `threshold` vote for `predicted_class`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationRule {
    pub feature: String,
    #[serde(skip)]
    pub feature_index: usize,
    pub threshold: f64,
    pub comparator: Comparator,
    pub predicted_class: String,
    /// Share of training rows on this side of the threshold that carry `predicted_class`.
    pub confidence: f64,
}

impl ClassificationRule {
    pub fn matches(&self, value: f64) -> bool {
        self.comparator.holds(value, self.threshold)
    }
}

impl fmt::Display for ClassificationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IF {} {} {} THEN {} (confidence {:.2})",
            self.feature,
            self.comparator.as_str(),
            self.threshold,
            self.predicted_class,
            self.confidence
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationRuleSet {
    feature_columns: Vec<String>,
    rules: Vec<ClassificationRule>,
    classes: Vec<String>,
}

impl ClassificationRuleSet {
    /// Cuts every feature at its rank quartiles and emits the majority class on each side.
    ///
    /// Yields up to six rules per feature, in feature order, `>=` before `<` per cut.
    pub fn induce(
        features: ArrayView2<'_, f64>,
        labels: &[String],
        feature_columns: &[String],
    ) -> Self {
        let mut rules = Vec::new();

        for (feature_index, feature) in feature_columns.iter().enumerate() {
            let column = features.column(feature_index);
            let Some(thresholds) = rank_quartiles(&sorted(column.iter().copied())) else {
                continue;
            };

            for threshold in thresholds {
                let mut above = Tally::new();
                let mut below = Tally::new();
                for (&value, label) in column.iter().zip(labels) {
                    if value >= threshold {
                        above.add(label, 1.0);
                    } else {
                        below.add(label, 1.0);
                    }
                }

                for (side, comparator) in [(above, Comparator::AtLeast), (below, Comparator::Below)] {
                    if let Some((class, count)) = side.leader() {
                        rules.push(ClassificationRule {
                            feature: feature.clone(),
                            feature_index,
                            threshold,
                            comparator,
                            predicted_class: class.to_string(),
                            confidence: count / side.total(),
                        });
                    }
                }
            }
        }

        debug!(
            "induced {} classification rules over {} features",
            rules.len(),
            feature_columns.len()
        );

        ClassificationRuleSet {
            feature_columns: feature_columns.to_vec(),
            rules,
            classes: distinct_labels(labels),
        }
    }

    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    /// Distinct training classes in first-seen order.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn feature_columns(&self) -> &[String] {
        &self.feature_columns
    }
}

impl RulePredictor for ClassificationRuleSet {
    type Output = String;

    fn num_features(&self) -> usize {
        self.feature_columns.len()
    }

    /// Confidence-weighted vote over every matching rule.
    fn predict_row(&self, row: ArrayView1<'_, f64>) -> String {
        let mut votes = Tally::new();
        for rule in &self.rules {
            if let Some(&value) = row.get(rule.feature_index) {
                if rule.matches(value) {
                    votes.add(&rule.predicted_class, rule.confidence);
                }
            }
        }
        votes
            .leader()
            .map_or_else(|| UNKNOWN_CLASS.to_string(), |(class, _)| class.to_string())
    }
}

/// One global linear corrector around the training target mean.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegressionRules {
    #[serde(skip)]
    feature_columns: Vec<String>,
    pub weights: BTreeMap<String, f64>,
    pub feature_means: BTreeMap<String, f64>,
    pub target_mean: f64,
}

impl RegressionRules {
    /// Per-feature slope `cov(x, y) / var(x)` in centred coordinates; 0 for a constant feature.
    pub fn induce(
        features: ArrayView2<'_, f64>,
        targets: &[f64],
        feature_columns: &[String],
    ) -> Self {
        let target_mean = mean(targets);
        let mut weights = BTreeMap::new();
        let mut feature_means = BTreeMap::new();

        for (feature_index, feature) in feature_columns.iter().enumerate() {
            let column = features.column(feature_index);
            let values: Vec<f64> = column.iter().copied().collect();
            let feature_mean = mean(&values);

            let mut covariance = 0.0;
            let mut variance = 0.0;
            for (x, y) in values.iter().zip(targets) {
                let dx = x - feature_mean;
                covariance += dx * (y - target_mean);
                variance += dx * dx;
            }
            let weight = if variance > 0.0 {
                covariance / variance
            } else {
                0.0
            };

            debug!("regression weight for '{}': {}", feature, weight);
            weights.insert(feature.clone(), weight);
            feature_means.insert(feature.clone(), feature_mean);
        }

        RegressionRules {
            feature_columns: feature_columns.to_vec(),
            weights,
            feature_means,
            target_mean,
        }
    }

    pub fn weight(&self, feature: &str) -> f64 {
        self.weights.get(feature).copied().unwrap_or(0.0)
    }

    pub fn feature_columns(&self) -> &[String] {
        &self.feature_columns
    }
}

impl RulePredictor for RegressionRules {
    type Output = f64;

    fn num_features(&self) -> usize {
        self.feature_columns.len()
    }

    fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        self.feature_columns
            .iter()
            .zip(row.iter())
            .fold(self.target_mean, |acc, (feature, &x)| {
                let feature_mean = self.feature_means.get(feature).copied().unwrap_or(0.0);
                acc + self.weight(feature) * (x - feature_mean)
            })
    }
}

/// The induced predictor, tagged by how it was built.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "rules", rename_all = "snake_case")]
pub enum RuleArtifact {
    Classification(ClassificationRuleSet),
    Regression(RegressionRules),
    /// No usable rules; explanations fall back to correlation.
    Unscored,
}

impl RuleArtifact {
    pub fn feature_columns(&self) -> &[String] {
        match self {
            RuleArtifact::Classification(rules) => rules.feature_columns(),
            RuleArtifact::Regression(rules) => rules.feature_columns(),
            RuleArtifact::Unscored => &[],
        }
    }

    /// Scores every row of a table that has the training feature columns.
    pub fn predict(&self, table: &Table) -> Result<Vec<Value>> {
        match self {
            RuleArtifact::Classification(rules) => {
                let features = table.feature_matrix(rules.feature_columns(), None)?;
                Ok(rules
                    .predict(&features)?
                    .into_iter()
                    .map(Value::Text)
                    .collect())
            }
            RuleArtifact::Regression(rules) => {
                let features = table.feature_matrix(rules.feature_columns(), None)?;
                Ok(rules
                    .predict(&features)?
                    .into_iter()
                    .map(Value::Number)
                    .collect())
            }
            RuleArtifact::Unscored => Err(InsightError::InvalidInput(
                "An unscored rule artifact cannot make predictions.".to_string(),
            )),
        }
    }
}

impl Sanitize for RuleArtifact {
    fn sanitize(&mut self) {
        match self {
            RuleArtifact::Classification(set) => {
                for rule in &mut set.rules {
                    rule.threshold.sanitize();
                    rule.confidence.sanitize();
                }
            }
            RuleArtifact::Regression(rules) => {
                rules.weights.sanitize();
                rules.feature_means.sanitize();
                rules.target_mean.sanitize();
            }
            RuleArtifact::Unscored => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ModelKind {
    #[serde(rename = "rule_based_classifier")]
    Classifier,
    #[serde(rename = "rule_based_regressor")]
    Regressor,
}

impl ModelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ModelKind::Classifier => "rule_based_classifier",
            ModelKind::Regressor => "rule_based_regressor",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SamplePrediction {
    /// Position within the held-out rows.
    pub index: usize,
    pub actual: Value,
    pub predicted: Value,
    pub correct: bool,
}

impl Sanitize for SamplePrediction {
    fn sanitize(&mut self) {
        for value in [&mut self.actual, &mut self.predicted] {
            if let Value::Number(n) = value {
                n.sanitize();
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingReport {
    pub artifact: RuleArtifact,
    pub model_kind: ModelKind,
    pub metrics: Metrics,
    pub feature_columns: Vec<String>,
    pub sample_predictions: Vec<SamplePrediction>,
    /// Cells that did not parse as numbers and were replaced with 0.0.
    pub coercion_failures: usize,
    pub train_rows: usize,
    pub test_rows: usize,
}

impl Sanitize for TrainingReport {
    fn sanitize(&mut self) {
        self.artifact.sanitize();
        self.metrics.sanitize();
        self.sample_predictions.sanitize();
    }
}

/// Induces a classification or regression rule-set from a table and scores it on a hold-out.
#[derive(Debug, Clone)]
pub struct RuleInducer {
    config: InductionConfig,
}

impl RuleInducer {
    pub fn new(config: Option<InductionConfig>) -> Self {
        RuleInducer {
            config: config.unwrap_or_default(),
        }
    }

    pub fn config(&self) -> &InductionConfig {
        &self.config
    }

    /// Classification when the target has few distinct labels, absolutely or relative to rows.
    pub fn model_kind_for(&self, labels: &[String]) -> ModelKind {
        if labels.is_empty() {
            return ModelKind::Classifier;
        }
        let distinct = distinct_labels(labels).len();
        let ratio = distinct as f64 / labels.len() as f64;
        if ratio < self.config.classification_unique_ratio
            || distinct <= self.config.classification_max_classes
        {
            ModelKind::Classifier
        } else {
            ModelKind::Regressor
        }
    }

    pub fn train(&self, table: &Table, target_column: &str) -> Result<TrainingReport> {
        let target_idx = table
            .column_index(target_column)
            .ok_or_else(|| InsightError::MissingColumn(target_column.to_string()))?;
        let feature_columns: Vec<String> = table
            .columns()
            .iter()
            .filter(|c| c.as_str() != target_column)
            .cloned()
            .collect();
        if feature_columns.is_empty() {
            return Err(InsightError::InvalidInput(
                "No feature columns available besides the target.".to_string(),
            ));
        }
        if table.is_empty() {
            return Err(InsightError::InvalidInput(
                "Cannot induce rules from an empty dataset.".to_string(),
            ));
        }

        let features = table.feature_matrix(&feature_columns, None)?;
        let targets: Vec<&Value> = table.column_values(target_idx).collect();
        let labels: Vec<String> = targets.iter().map(|v| v.label()).collect();
        let model_kind = self.model_kind_for(&labels);
        let split = ((table.n_rows() as f64 * self.config.train_fraction) as usize).min(table.n_rows());

        info!(
            "training {} on '{}': {} rows ({} train / {} test), {} features",
            model_kind,
            target_column,
            table.n_rows(),
            split,
            table.n_rows() - split,
            feature_columns.len()
        );
        if features.coercion_failures > 0 {
            warn!(
                "{} feature cells did not parse as numbers and were treated as 0.0",
                features.coercion_failures
            );
        }

        let mut report = match model_kind {
            ModelKind::Classifier => self.train_classifier(&features, &targets, &labels, split),
            ModelKind::Regressor => self.train_regressor(&features, &targets, split),
        };
        report.sanitize();
        Ok(report)
    }

    fn train_classifier(
        &self,
        features: &FeatureMatrix,
        targets: &[&Value],
        labels: &[String],
        split: usize,
    ) -> TrainingReport {
        let (train_x, test_x) = features.split_rows(split);
        let rules = ClassificationRuleSet::induce(train_x, &labels[..split], &features.columns);

        let predictions: Vec<String> = test_x.rows().into_iter().map(|row| rules.predict_row(row)).collect();
        let test_labels = &labels[split..];
        let metrics = classification_metrics(test_labels, &predictions);

        let sample_predictions = predictions
            .iter()
            .zip(test_labels)
            .zip(&targets[split..])
            .take(self.config.sample_prediction_count)
            .enumerate()
            .map(|(index, ((predicted, label), actual))| SamplePrediction {
                index,
                actual: (*actual).clone(),
                predicted: Value::Text(predicted.clone()),
                correct: predicted == label,
            })
            .collect();

        TrainingReport {
            artifact: RuleArtifact::Classification(rules),
            model_kind: ModelKind::Classifier,
            metrics: Metrics::Classification(metrics),
            feature_columns: features.columns.clone(),
            sample_predictions,
            coercion_failures: features.coercion_failures,
            train_rows: split,
            test_rows: features.nrows() - split,
        }
    }

    fn train_regressor(
        &self,
        features: &FeatureMatrix,
        targets: &[&Value],
        split: usize,
    ) -> TrainingReport {
        let mut target_failures = 0usize;
        let y: Vec<f64> = targets
            .iter()
            .map(|v| {
                v.as_f64().unwrap_or_else(|| {
                    target_failures += 1;
                    0.0
                })
            })
            .collect();
        if target_failures > 0 {
            warn!(
                "{} target cells did not parse as numbers and were treated as 0.0",
                target_failures
            );
        }

        let (train_x, test_x) = features.split_rows(split);
        let rules = RegressionRules::induce(train_x, &y[..split], &features.columns);

        let predictions: Vec<f64> = test_x.rows().into_iter().map(|row| rules.predict_row(row)).collect();
        let actuals = &y[split..];
        let metrics = regression_metrics(actuals, &predictions);

        let tolerance = self.config.regression_tolerance;
        let sample_predictions = actuals
            .iter()
            .zip(&predictions)
            .take(self.config.sample_prediction_count)
            .enumerate()
            .map(|(index, (&actual, &predicted))| {
                let relative_error = if actual != 0.0 {
                    (actual - predicted).abs() / actual.abs()
                } else {
                    0.0
                };
                SamplePrediction {
                    index,
                    actual: Value::Number(actual),
                    predicted: Value::Number(finite_or_zero(predicted)),
                    correct: relative_error <= tolerance,
                }
            })
            .collect();

        TrainingReport {
            artifact: RuleArtifact::Regression(rules),
            model_kind: ModelKind::Regressor,
            metrics: Metrics::Regression(metrics),
            feature_columns: features.columns.clone(),
            sample_predictions,
            coercion_failures: features.coercion_failures + target_failures,
            train_rows: split,
            test_rows: features.nrows() - split,
        }
    }
}

impl Default for RuleInducer {
    fn default() -> Self {
        RuleInducer::new(None)
    }
}
