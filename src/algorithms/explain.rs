// src/algorithms/explain.rs

use crate::algorithms::induction::{ClassificationRuleSet, ModelKind, RegressionRules, RuleArtifact};
use crate::algorithms::patterns::Impact;
use crate::core::{ExplainConfig, InsightError, Result, Value};
use crate::utils::{mean, sorted, Sanitize};
use log::{debug, info};
use ndarray::ArrayView2;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Normalized importance per feature, kept in feature order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureImportance {
    entries: Vec<(String, f64)>,
}

impl FeatureImportance {
    fn from_raw(feature_columns: &[String], raw: Vec<f64>) -> Self {
        let total: f64 = raw.iter().sum();
        let entries = feature_columns
            .iter()
            .cloned()
            .zip(raw)
            .map(|(name, value)| {
                let weight = if total > 0.0 { value / total } else { value };
                (name, weight)
            })
            .collect();
        FeatureImportance { entries }
    }

    pub fn get(&self, feature: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(name, _)| name == feature)
            .map(|(_, weight)| *weight)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(name, weight)| (name.as_str(), *weight))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, weight)| weight).sum()
    }

    /// Features by descending importance; ties keep feature order.
    pub fn ranked(&self) -> Vec<(&str, f64)> {
        let mut ranked: Vec<(&str, f64)> = self.iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }
}

impl Sanitize for FeatureImportance {
    fn sanitize(&mut self) {
        for (_, weight) in &mut self.entries {
            weight.sanitize();
        }
    }
}

impl Serialize for FeatureImportance {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, weight) in &self.entries {
            map.serialize_entry(name, weight)?;
        }
        map.end()
    }
}

/// Which signal the importance was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportanceSource {
    RuleConfidence,
    RegressionWeight,
    Correlation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactRow {
    pub feature: String,
    pub importance: f64,
    pub impact: Impact,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    pub feature_importance: FeatureImportance,
    pub importance_source: ImportanceSource,
    pub feature_impact_table: Vec<ImpactRow>,
    pub insights: Vec<String>,
}

impl Sanitize for Explanation {
    fn sanitize(&mut self) {
        self.feature_importance.sanitize();
        for row in &mut self.feature_impact_table {
            row.importance.sanitize();
        }
    }
}

/// Turns a rule artifact into feature importance, an impact table and short insights.
#[derive(Debug, Clone)]
pub struct Explainer {
    config: ExplainConfig,
}

impl Explainer {
    pub fn new(config: Option<ExplainConfig>) -> Self {
        Explainer {
            config: config.unwrap_or_default(),
        }
    }

    pub fn config(&self) -> &ExplainConfig {
        &self.config
    }

    pub fn explain(
        &self,
        artifact: &RuleArtifact,
        features: ArrayView2<'_, f64>,
        target: &[Value],
        feature_columns: &[String],
        model_kind: ModelKind,
    ) -> Result<Explanation> {
        if features.ncols() != feature_columns.len() {
            return Err(InsightError::IncompatibleDimensions(format!(
                "Feature matrix has {} columns, but {} feature names were given.",
                features.ncols(),
                feature_columns.len()
            )));
        }
        if target.len() != features.nrows() {
            return Err(InsightError::IncompatibleDimensions(format!(
                "Target has {} values, but the feature matrix has {} rows.",
                target.len(),
                features.nrows()
            )));
        }

        let (feature_importance, importance_source) = match artifact {
            RuleArtifact::Classification(rules) => (
                rule_confidence_importance(rules, feature_columns),
                ImportanceSource::RuleConfidence,
            ),
            RuleArtifact::Regression(rules) => (
                weight_importance(rules, feature_columns),
                ImportanceSource::RegressionWeight,
            ),
            RuleArtifact::Unscored => (
                correlation_importance(features, target, feature_columns),
                ImportanceSource::Correlation,
            ),
        };
        info!(
            "explaining {} features over {} rows from {:?}",
            feature_columns.len(),
            features.nrows(),
            importance_source
        );

        let feature_impact_table = self.impact_table(&feature_importance);
        let insights = self.insights(&feature_importance, features, feature_columns, model_kind);

        let mut explanation = Explanation {
            feature_importance,
            importance_source,
            feature_impact_table,
            insights,
        };
        explanation.sanitize();
        Ok(explanation)
    }

    /// Impact levels are relative to the most important feature.
    pub fn impact_table(&self, importance: &FeatureImportance) -> Vec<ImpactRow> {
        let ranked = importance.ranked();
        let Some(&(_, top)) = ranked.first() else {
            return Vec::new();
        };
        let high = top * self.config.high_ratio;
        let medium = top * self.config.medium_ratio;

        ranked
            .into_iter()
            .map(|(feature, weight)| ImpactRow {
                feature: feature.to_string(),
                importance: weight,
                impact: if weight >= high {
                    Impact::High
                } else if weight >= medium {
                    Impact::Medium
                } else {
                    Impact::Low
                },
            })
            .collect()
    }

    fn insights(
        &self,
        importance: &FeatureImportance,
        features: ArrayView2<'_, f64>,
        feature_columns: &[String],
        model_kind: ModelKind,
    ) -> Vec<String> {
        let top: Vec<&str> = importance
            .ranked()
            .into_iter()
            .take(self.config.top_features)
            .map(|(feature, _)| feature)
            .collect();
        let Some(&leader) = top.first() else {
            return Vec::new();
        };

        let mut insights = vec![format!(
            "Top {} most important features: {}",
            top.len(),
            top.join(", ")
        )];

        for &feature in top.iter().take(self.config.detailed_features) {
            let Some(idx) = feature_columns.iter().position(|c| c == feature) else {
                continue;
            };
            let values: Vec<f64> = features.column(idx).iter().copied().collect();
            if values.is_empty() {
                continue;
            }
            let average = mean(&values);
            let ordered = sorted(values);
            let median = ordered[ordered.len() / 2];
            insights.push(match model_kind {
                ModelKind::Classifier => format!(
                    "{} has high impact. Average value: {:.2}, Median: {:.2}",
                    feature, average, median
                ),
                ModelKind::Regressor => format!(
                    "{} significantly influences predictions. Average value: {:.2}, Median: {:.2}",
                    feature, average, median
                ),
            });
        }

        insights.push(format!(
            "Key insight: {} has the highest impact on predictions. Focus on this feature for better predictions.",
            leader
        ));
        insights
    }
}

impl Default for Explainer {
    fn default() -> Self {
        Explainer::new(None)
    }
}

/// Confidence mass of the rules that mention each feature.
fn rule_confidence_importance(
    rules: &ClassificationRuleSet,
    feature_columns: &[String],
) -> FeatureImportance {
    let mut confidence = vec![0.0; feature_columns.len()];
    for rule in rules.rules() {
        if let Some(idx) = feature_columns.iter().position(|c| *c == rule.feature) {
            confidence[idx] += rule.confidence;
        }
    }
    debug!("rule confidence mass per feature: {:?}", confidence);
    FeatureImportance::from_raw(feature_columns, confidence)
}

fn weight_importance(rules: &RegressionRules, feature_columns: &[String]) -> FeatureImportance {
    let raw = feature_columns
        .iter()
        .map(|f| rules.weights.get(f).map_or(0.0, |w| w.abs()))
        .collect();
    FeatureImportance::from_raw(feature_columns, raw)
}

/// Absolute Pearson correlation with the numeric-coerced target; uniform when no feature correlates.
fn correlation_importance(
    features: ArrayView2<'_, f64>,
    target: &[Value],
    feature_columns: &[String],
) -> FeatureImportance {
    let y: Vec<f64> = target.iter().map(|v| v.as_f64().unwrap_or(0.0)).collect();
    let n = y.len();
    let raw: Vec<f64> = (0..feature_columns.len())
        .map(|idx| {
            if n == 0 {
                return 0.0;
            }
            let x: Vec<f64> = features.column(idx).iter().copied().collect();
            let (x_mean, y_mean) = (mean(&x), mean(&y));
            let mut covariance = 0.0;
            let mut x_var = 0.0;
            let mut y_var = 0.0;
            for (xi, yi) in x.iter().zip(&y) {
                let dx = xi - x_mean;
                let dy = yi - y_mean;
                covariance += dx * dy;
                x_var += dx * dx;
                y_var += dy * dy;
            }
            let count = n as f64;
            let (x_std, y_std) = ((x_var / count).sqrt(), (y_var / count).sqrt());
            if x_std > 0.0 && y_std > 0.0 {
                ((covariance / count) / (x_std * y_std)).abs()
            } else {
                0.0
            }
        })
        .collect();

    if raw.iter().sum::<f64>() > 0.0 {
        FeatureImportance::from_raw(feature_columns, raw)
    } else {
        let uniform = 1.0 / feature_columns.len().max(1) as f64;
        FeatureImportance::from_raw(feature_columns, vec![uniform; feature_columns.len()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn nums(values: &[f64]) -> Vec<Value> {
        values.iter().map(|&v| Value::from(v)).collect()
    }

    #[test]
    fn classification_importance_follows_confidence_mass() -> Result<()> {
        // "signal" separates the classes cleanly; "noise" does not.
        let x = array![[1.0, 5.0], [2.0, 1.0], [3.0, 4.0], [4.0, 2.0]];
        let y = names(&["No", "No", "Yes", "Yes"]);
        let columns = names(&["signal", "noise"]);
        let rules = ClassificationRuleSet::induce(x.view(), &y, &columns);

        let mut mass = [0.0, 0.0];
        for rule in rules.rules() {
            mass[if rule.feature == "signal" { 0 } else { 1 }] += rule.confidence;
        }

        let explanation = Explainer::default().explain(
            &RuleArtifact::Classification(rules),
            x.view(),
            &[Value::from("No"), Value::from("No"), Value::from("Yes"), Value::from("Yes")],
            &columns,
            ModelKind::Classifier,
        )?;
        let importance = &explanation.feature_importance;
        assert_eq!(explanation.importance_source, ImportanceSource::RuleConfidence);
        assert_abs_diff_eq!(importance.total(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(
            importance.get("signal").unwrap_or_default(),
            mass[0] / (mass[0] + mass[1]),
            epsilon = 1e-12
        );
        assert!(importance.get("signal") > importance.get("noise"));
        Ok(())
    }

    #[test]
    fn regression_importance_uses_absolute_weights() -> Result<()> {
        let x = array![[1.0, 3.0], [2.0, 2.0], [3.0, 1.0]];
        let targets = [2.0, 4.0, 6.0];
        let columns = names(&["up", "down"]);
        let rules = RegressionRules::induce(x.view(), &targets, &columns);
        // up: +2, down: -2
        let explanation = Explainer::default().explain(
            &RuleArtifact::Regression(rules),
            x.view(),
            &nums(&targets),
            &columns,
            ModelKind::Regressor,
        )?;
        assert_eq!(explanation.importance_source, ImportanceSource::RegressionWeight);
        assert_abs_diff_eq!(explanation.feature_importance.get("up").unwrap_or_default(), 0.5);
        assert_abs_diff_eq!(explanation.feature_importance.get("down").unwrap_or_default(), 0.5);
        Ok(())
    }

    #[test]
    fn zero_weights_give_all_zero_importance() -> Result<()> {
        let x = array![[1.0], [1.0]];
        let columns = names(&["flat"]);
        let rules = RegressionRules::induce(x.view(), &[1.0, 2.0], &columns);
        let explanation = Explainer::default().explain(
            &RuleArtifact::Regression(rules),
            x.view(),
            &nums(&[1.0, 2.0]),
            &columns,
            ModelKind::Regressor,
        )?;
        assert_eq!(explanation.feature_importance.get("flat"), Some(0.0));
        Ok(())
    }

    #[test]
    fn unscored_artifact_falls_back_to_correlation() -> Result<()> {
        let x = array![[1.0, 1.0], [2.0, 3.0], [3.0, 2.0], [4.0, 4.0]];
        let target = nums(&[10.0, 20.0, 30.0, 40.0]);
        let columns = names(&["perfect", "partial"]);
        let explanation = Explainer::default().explain(
            &RuleArtifact::Unscored,
            x.view(),
            &target,
            &columns,
            ModelKind::Regressor,
        )?;
        let importance = &explanation.feature_importance;
        assert_eq!(explanation.importance_source, ImportanceSource::Correlation);
        assert_abs_diff_eq!(importance.total(), 1.0, epsilon = 1e-12);
        // |r| = 1.0 and 0.8
        assert_abs_diff_eq!(importance.get("perfect").unwrap_or_default(), 1.0 / 1.8, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn uncorrelated_features_share_importance_uniformly() -> Result<()> {
        let x = array![[1.0, 5.0], [2.0, 5.0]];
        // Text target coerces to zeros: no variance.
        let target = vec![Value::from("a"), Value::from("b")];
        let explanation = Explainer::default().explain(
            &RuleArtifact::Unscored,
            x.view(),
            &target,
            &names(&["a", "b"]),
            ModelKind::Classifier,
        )?;
        assert_eq!(explanation.feature_importance.get("a"), Some(0.5));
        assert_eq!(explanation.feature_importance.get("b"), Some(0.5));
        Ok(())
    }

    #[test]
    fn impact_levels_are_relative_to_the_top_feature() {
        let columns = names(&["a", "b", "c", "d"]);
        let importance = FeatureImportance::from_raw(&columns, vec![0.1, 0.5, 0.36, 0.04]);
        let table = Explainer::default().impact_table(&importance);
        let levels: Vec<(&str, Impact)> = table.iter().map(|r| (r.feature.as_str(), r.impact)).collect();
        // max 0.5: high >= 0.35, medium >= 0.15
        assert_eq!(
            levels,
            vec![
                ("b", Impact::High),
                ("c", Impact::High),
                ("a", Impact::Low),
                ("d", Impact::Low),
            ]
        );
    }

    #[test]
    fn insights_name_top_features_and_their_statistics() -> Result<()> {
        let x = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0]];
        let columns = names(&["small", "large"]);
        let rules = RegressionRules::induce(x.view(), &[1.0, 2.0, 3.0], &columns);
        let explanation = Explainer::default().explain(
            &RuleArtifact::Regression(rules),
            x.view(),
            &nums(&[1.0, 2.0, 3.0]),
            &columns,
            ModelKind::Regressor,
        )?;
        let insights = &explanation.insights;
        // small has weight 1.0, large 0.1
        assert_eq!(insights[0], "Top 2 most important features: small, large");
        assert_eq!(
            insights[1],
            "small significantly influences predictions. Average value: 2.00, Median: 2.00"
        );
        assert!(insights.last().is_some_and(|s| s.starts_with("Key insight: small")));
        assert_eq!(insights.len(), 4);
        Ok(())
    }

    #[test]
    fn mismatched_shapes_are_rejected() {
        let x = array![[1.0, 2.0]];
        let err = Explainer::default()
            .explain(&RuleArtifact::Unscored, x.view(), &nums(&[1.0]), &names(&["a"]), ModelKind::Regressor)
            .unwrap_err();
        assert!(matches!(err, InsightError::IncompatibleDimensions(_)));

        let err = Explainer::default()
            .explain(&RuleArtifact::Unscored, x.view(), &[], &names(&["a", "b"]), ModelKind::Regressor)
            .unwrap_err();
        assert!(matches!(err, InsightError::IncompatibleDimensions(_)));
    }

    #[test]
    fn importance_serializes_as_an_ordered_object() -> Result<()> {
        let importance = FeatureImportance::from_raw(&names(&["z", "a"]), vec![3.0, 1.0]);
        assert_eq!(serde_json::to_string(&importance)?, r#"{"z":0.75,"a":0.25}"#);
        Ok(())
    }
}
