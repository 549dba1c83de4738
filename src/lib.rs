// src/lib.rs

//! `rule_insight` induces simple, explainable rule-sets from tabular data.
//!
//! Four engines share one [`Table`] view:
//! - [`RuleInducer`] fits quartile-threshold classification rules or a
//!   covariance-weighted regression rule and scores it on a hold-out split.
//! - [`PatternMiner`] mines association rules over a discretized table and
//!   if-then rules from quartile subgroups and domain templates.
//! - [`Explainer`] turns a rule artifact into normalized feature importance.
//! - [`RiskAggregator`] rolls the mined rules up into ordinal risk levels.
//!
//! [`Engine`] wires them together behind one [`EngineConfig`].
//!
//! ```no_run
//! use rule_insight::{Domain, Engine, Table, Value};
//!
//! # fn main() -> rule_insight::Result<()> {
//! let table = Table::from_columns(vec![
//!     ("leave_count", vec![Value::from(15), Value::from(2), Value::from(17), Value::from(1)]),
//!     ("attrition", vec![Value::from("Yes"), Value::from("No"), Value::from("Yes"), Value::from("No")]),
//! ])?;
//!
//! let engine = Engine::new(None)?;
//! let report = engine.train(&table, "attrition")?;
//! let explanation = engine.explain_training(&report, &table, "attrition")?;
//! let mined = engine.extract_rules(&table, Domain::Hr, Some("attrition"))?;
//! let risk = engine.analyze_risk(Domain::Hr, &mined);
//! println!("{}", serde_json::to_string_pretty(&risk)?);
//! # let _ = explanation;
//! # Ok(())
//! # }
//! ```

pub mod algorithms;
pub mod core;
pub mod engine;
pub mod traits;
pub mod utils;

pub use crate::algorithms::{
    Explainer, Explanation, MinedRules, ModelKind, PatternMiner, RiskAggregator, RiskAssessment,
    RuleArtifact, RuleInducer, TrainingReport,
};
pub use crate::core::{
    Dataset, Domain, EngineConfig, FeatureMatrix, InsightError, Result, Table, Value,
};
pub use crate::engine::Engine;
pub use crate::traits::RulePredictor;
