// src/algorithms/risk.rs

//! Qualitative risk roll-up over mined rules.
//!
//! Works purely on the category and severity tags attached when a rule is
//! mined. Insight and recommendation sentences are fixed lookups keyed by
//! the elevated risk levels and the domain.

use crate::algorithms::patterns::{Impact, MinedRules, RiskCategory, RuleTags};
use crate::core::Domain;
use log::{debug, info};
use serde::Serialize;
use std::fmt;

const STRONGEST_IF_THEN: usize = 3;
const STRONGEST_ASSOCIATION: usize = 2;
const MANY_RULES: usize = 5;

const LOW_CONFIDENCE_NOTE: &str = "The dataset does not strongly match a specific business domain, \
so the risk assessment should be treated as indicative rather than definitive.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
    #[serde(rename = "Not applicable")]
    NotApplicable,
    #[serde(rename = "Not enough information")]
    NotEnoughInformation,
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn is_elevated(self) -> bool {
        matches!(self, RiskLevel::Medium | RiskLevel::High)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::NotApplicable => "Not applicable",
            RiskLevel::NotEnoughInformation => "Not enough information",
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RiskLevels {
    #[serde(rename = "attrition_risk")]
    pub attrition: RiskLevel,
    #[serde(rename = "cost_risk")]
    pub cost: RiskLevel,
    #[serde(rename = "performance_risk")]
    pub performance: RiskLevel,
}

impl RiskLevels {
    pub fn get(&self, category: RiskCategory) -> RiskLevel {
        match category {
            RiskCategory::Attrition => self.attrition,
            RiskCategory::Cost => self.cost,
            RiskCategory::Performance => self.performance,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RuleCounts {
    pub if_then_rules: usize,
    pub association_rules: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub domain: Domain,
    pub risk_levels: RiskLevels,
    pub confidence_level: ConfidenceLevel,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
    /// Set only when the confidence level is low.
    pub limitations: Option<String>,
    pub rule_counts: RuleCounts,
}

/// High and medium severity hits for one category.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Hits {
    high: usize,
    medium: usize,
}

impl Hits {
    fn count<'a>(category: RiskCategory, tags: impl Iterator<Item = &'a RuleTags>) -> Self {
        tags.filter(|t| t.has(category))
            .fold(Hits::default(), |mut hits, t| {
                match t.severity {
                    Some(Impact::High) => hits.high += 1,
                    Some(Impact::Medium) => hits.medium += 1,
                    _ => {}
                }
                hits
            })
    }

    fn is_empty(self) -> bool {
        self.high == 0 && self.medium == 0
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RiskAggregator;

impl RiskAggregator {
    pub fn new() -> Self {
        RiskAggregator
    }

    pub fn analyze(&self, domain: Domain, mined: &MinedRules) -> RiskAssessment {
        let level = |category| {
            let hits = Hits::count(category, mined.tags());
            debug!("{:?} hits: {:?}", category, hits);
            reduce(hits, is_relevant(category, domain))
        };
        let risk_levels = RiskLevels {
            attrition: level(RiskCategory::Attrition),
            cost: level(RiskCategory::Cost),
            performance: level(RiskCategory::Performance),
        };

        let total = mined.total();
        let confidence_level = if domain == Domain::General || total == 0 {
            ConfidenceLevel::Low
        } else if total < MANY_RULES {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::High
        };
        info!(
            "risk for {} over {} rules: attrition={}, cost={}, performance={}, confidence={:?}",
            domain,
            total,
            risk_levels.attrition,
            risk_levels.cost,
            risk_levels.performance,
            confidence_level
        );

        RiskAssessment {
            domain,
            risk_levels,
            confidence_level,
            insights: insights(&risk_levels, mined),
            recommendations: recommendations(domain, &risk_levels),
            limitations: (confidence_level == ConfidenceLevel::Low)
                .then(|| LOW_CONFIDENCE_NOTE.to_string()),
            rule_counts: RuleCounts {
                if_then_rules: mined.if_then_rules.len(),
                association_rules: mined.association_rules.len(),
            },
        }
    }
}

/// Performance applies everywhere; attrition and cost only to some domains.
fn is_relevant(category: RiskCategory, domain: Domain) -> bool {
    match category {
        RiskCategory::Attrition => matches!(domain, Domain::Hr | Domain::Education),
        RiskCategory::Cost => matches!(domain, Domain::Finance | Domain::Sales | Domain::General),
        RiskCategory::Performance => true,
    }
}

fn reduce(hits: Hits, relevant: bool) -> RiskLevel {
    if !relevant && hits.is_empty() {
        return RiskLevel::NotApplicable;
    }
    match (hits.high, hits.medium) {
        (h, _) if h >= 2 => RiskLevel::High,
        (1, _) => RiskLevel::Medium,
        (_, m) if m >= 2 => RiskLevel::Medium,
        (_, 1) => RiskLevel::Low,
        _ => RiskLevel::NotEnoughInformation,
    }
}

fn insights(levels: &RiskLevels, mined: &MinedRules) -> Vec<String> {
    let mut out: Vec<String> = RiskCategory::ALL
        .into_iter()
        .filter(|&c| levels.get(c).is_elevated())
        .map(|c| {
            match c {
                RiskCategory::Attrition => {
                    "Patterns in the data suggest that people-related risk is elevated, \
                     especially for groups with weaker attendance or higher leave usage."
                }
                RiskCategory::Cost => {
                    "Spending and budget-related patterns point to potential cost pressure \
                     in certain segments or time periods."
                }
                RiskCategory::Performance => {
                    "Performance or target-achievement patterns indicate areas where execution \
                     could be strengthened to avoid slippage."
                }
            }
            .to_string()
        })
        .collect();

    if out.is_empty() {
        out.push(
            "The dataset does not show a clear concentration of risk in one specific area; \
             current patterns look relatively balanced, but deeper drill-down may still be useful."
                .to_string(),
        );
    }

    let strongest: Vec<&str> = mined
        .if_then_rules
        .iter()
        .take(STRONGEST_IF_THEN)
        .map(|r| r.rule.trim())
        .chain(
            mined
                .association_rules
                .iter()
                .take(STRONGEST_ASSOCIATION)
                .map(|r| r.rule.trim()),
        )
        .filter(|text| !text.is_empty())
        .collect();
    if !strongest.is_empty() {
        out.push(format!(
            "Some of the strongest patterns behind these insights include: {}.",
            strongest.join("; ")
        ));
    }
    out
}

fn recommendations(domain: Domain, levels: &RiskLevels) -> Vec<String> {
    let mut out: Vec<String> = RiskCategory::ALL
        .into_iter()
        .filter(|&c| levels.get(c).is_elevated())
        .map(|c| {
            match c {
                RiskCategory::Attrition => {
                    "Focus on groups with low attendance or frequent leave and engage them \
                     through manager check-ins, workload review, and clear growth plans."
                }
                RiskCategory::Cost => {
                    "Review high-cost items and cost centers that often trigger rules, and put simple \
                     budget alerts or approval thresholds in place for those areas."
                }
                RiskCategory::Performance => {
                    "Identify teams or segments where targets are frequently missed and provide additional \
                     support, training, or process simplification to close the gap."
                }
            }
            .to_string()
        })
        .collect();

    let domain_advice = match domain {
        Domain::Hr => Some(
            "For HR data, consider combining attendance, tenure, and satisfaction information to \
             prioritise which employees or roles need proactive retention actions.",
        ),
        Domain::Finance => Some(
            "For Finance data, align expense patterns with budget plans at a monthly level so that \
             variances are spotted early rather than at quarter-end.",
        ),
        Domain::Sales => Some(
            "For Sales data, track conversion, pipeline quality, and win/loss patterns regularly \
             to keep performance risk under control.",
        ),
        Domain::Education => Some(
            "For Education data, combine attendance, marks, and course difficulty to identify \
             students who may need early academic support.",
        ),
        Domain::General => None,
    };
    out.extend(domain_advice.map(str::to_string));

    if out.is_empty() {
        out.push(
            "Use the strongest rules as simple business checks, and monitor them periodically to \
             see whether risk is increasing or decreasing over time."
                .to_string(),
        );
    }
    out
}
