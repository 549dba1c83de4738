pub mod explain;
pub mod induction;
pub mod metrics;
pub mod patterns;
pub mod risk;

pub use explain::{Explainer, Explanation, FeatureImportance, ImpactRow, ImportanceSource};
pub use induction::{
    ClassificationRule, ClassificationRuleSet, ModelKind, RegressionRules, RuleArtifact,
    RuleInducer, SamplePrediction, TrainingReport, UNKNOWN_CLASS,
};
pub use metrics::{ClassificationMetrics, Metrics, RegressionMetrics};
pub use patterns::{
    AssociationRule, IfThenRule, Impact, MinedRules, PatternMiner, RiskCategory, RuleTags,
};
pub use risk::{ConfidenceLevel, RiskAggregator, RiskAssessment, RiskLevel, RiskLevels};
