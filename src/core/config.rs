// src/core/config.rs
use crate::core::{InsightError, Result};
use serde::{Deserialize, Serialize};

/// How column kinds are inferred from raw cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    /// Number of non-missing cells inspected per column.
    pub sample_size: usize,
    /// Share of sampled cells that must parse as numbers for a numeric column.
    pub numeric_ratio: f64,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        ColumnConfig {
            sample_size: 100,
            numeric_ratio: 0.8,
        }
    }
}

/// Configuration for the rule induction engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InductionConfig {
    /// A target whose distinct/total ratio falls below this is a classification target.
    pub classification_unique_ratio: f64,
    /// A target with at most this many distinct values is a classification target.
    pub classification_max_classes: usize,
    /// Leading share of rows used for training; the rest is held out.
    pub train_fraction: f64,
    /// Number of held-out rows echoed back as sample predictions.
    pub sample_prediction_count: usize,
    /// Relative error under which a regression sample prediction counts as correct.
    pub regression_tolerance: f64,
}

impl Default for InductionConfig {
    fn default() -> Self {
        InductionConfig {
            classification_unique_ratio: 0.1,
            classification_max_classes: 10,
            train_fraction: 0.8,
            sample_prediction_count: 5,
            regression_tolerance: 0.1,
        }
    }
}

/// Fixed confidences attached to domain template rules.
///
/// These are business priors, not values fitted to the data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfidences {
    pub hr: f64,
    pub finance: f64,
    pub sales: f64,
}

impl Default for TemplateConfidences {
    fn default() -> Self {
        TemplateConfidences {
            hr: 0.7,
            finance: 0.6,
            sales: 0.65,
        }
    }
}

/// Configuration for association and if-then mining.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningConfig {
    pub min_support: f64,
    pub min_confidence: f64,
    pub max_association_rules: usize,
    pub max_if_then_rules: usize,
    /// Only the first this-many numeric feature columns yield if-then rules.
    pub max_numeric_features: usize,
    /// Columns with fewer parseable values are not cut into quartiles.
    pub min_numeric_values: usize,
    /// Relative gap between subgroup and overall target mean needed to keep a rule.
    pub medium_gap: f64,
    /// Relative gap above which a kept rule is tagged high impact.
    pub high_gap: f64,
    pub template_confidences: TemplateConfidences,
}

impl Default for MiningConfig {
    fn default() -> Self {
        MiningConfig {
            min_support: 0.1,
            min_confidence: 0.5,
            max_association_rules: 20,
            max_if_then_rules: 15,
            max_numeric_features: 10,
            min_numeric_values: 4,
            medium_gap: 0.1,
            high_gap: 0.2,
            template_confidences: TemplateConfidences::default(),
        }
    }
}

/// Configuration for the explainability engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplainConfig {
    /// Share of the top importance at or above which a feature is High impact.
    pub high_ratio: f64,
    /// Share of the top importance at or above which a feature is Medium impact.
    pub medium_ratio: f64,
    pub top_features: usize,
    pub detailed_features: usize,
    /// Rows taken from the head of a table when explaining a training run.
    pub sample_size: usize,
}

impl Default for ExplainConfig {
    fn default() -> Self {
        ExplainConfig {
            high_ratio: 0.7,
            medium_ratio: 0.3,
            top_features: 5,
            detailed_features: 3,
            sample_size: 100,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub columns: ColumnConfig,
    pub induction: InductionConfig,
    pub mining: MiningConfig,
    pub explain: ExplainConfig,
}

impl EngineConfig {
    /// Parses a (possibly partial) JSON document; absent fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        check_unit("columns.numeric_ratio", self.columns.numeric_ratio)?;
        check_unit(
            "induction.classification_unique_ratio",
            self.induction.classification_unique_ratio,
        )?;
        check_unit("induction.train_fraction", self.induction.train_fraction)?;
        check_non_negative("induction.regression_tolerance", self.induction.regression_tolerance)?;
        check_unit("mining.min_support", self.mining.min_support)?;
        check_unit("mining.min_confidence", self.mining.min_confidence)?;
        check_non_negative("mining.medium_gap", self.mining.medium_gap)?;
        check_non_negative("mining.high_gap", self.mining.high_gap)?;
        check_unit("mining.template_confidences.hr", self.mining.template_confidences.hr)?;
        check_unit(
            "mining.template_confidences.finance",
            self.mining.template_confidences.finance,
        )?;
        check_unit(
            "mining.template_confidences.sales",
            self.mining.template_confidences.sales,
        )?;
        check_unit("explain.high_ratio", self.explain.high_ratio)?;
        check_unit("explain.medium_ratio", self.explain.medium_ratio)?;
        if self.explain.medium_ratio > self.explain.high_ratio {
            return Err(InsightError::invalid_config(
                "explain.medium_ratio",
                "must not exceed explain.high_ratio",
            ));
        }
        if self.columns.sample_size == 0 {
            return Err(InsightError::invalid_config(
                "columns.sample_size",
                "must be at least 1",
            ));
        }
        if self.explain.sample_size == 0 {
            return Err(InsightError::invalid_config(
                "explain.sample_size",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

fn check_unit(field: &str, value: f64) -> Result<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(InsightError::invalid_config(
            field,
            format!("{} must lie in [0, 1]", value),
        ))
    }
}

fn check_non_negative(field: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(InsightError::invalid_config(
            field,
            format!("{} must be a finite, non-negative number", value),
        ))
    }
}
