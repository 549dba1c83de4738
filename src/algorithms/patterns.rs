// src/algorithms/patterns.rs

//! Association and if-then rule mining over a cleaned table.
//!
//! Association rules pair `column=value` items of a quartile-discretized copy
//! of the table. If-then rules cut each numeric feature at its lower and upper
//! quartile and keep the side whose mean target moves far enough from the
//! overall mean. Domain templates add a few fixed-confidence rules on top.

use crate::core::{ColumnConfig, ColumnKind, Domain, InsightError, MiningConfig, Result, Table, Value};
use crate::utils::{mean, rank_quartiles, sorted, Sanitize};
use log::{debug, info, warn};
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Low,
    Medium,
    High,
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Impact::Low => "Low",
            Impact::Medium => "Medium",
            Impact::High => "High",
        })
    }
}

/// Business risk a mined rule speaks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskCategory {
    Attrition,
    Cost,
    Performance,
}

impl RiskCategory {
    pub const ALL: [RiskCategory; 3] = [
        RiskCategory::Attrition,
        RiskCategory::Cost,
        RiskCategory::Performance,
    ];

    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            RiskCategory::Attrition => &["attrition", "churn", "resignation", "leave"],
            RiskCategory::Cost => &["expense", "cost", "budget", "overrun", "loss", "overspend"],
            RiskCategory::Performance => &[
                "performance",
                "target",
                "efficiency",
                "productivity",
                "score",
                "grade",
            ],
        }
    }
}

/// Category and severity tags derived once, when a rule is built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuleTags {
    pub categories: Vec<RiskCategory>,
    /// `High` when the text says "high" or the impact is high, else `Medium` likewise.
    pub severity: Option<Impact>,
}

impl RuleTags {
    pub fn classify(text: &str, impact: Option<Impact>) -> Self {
        let lower = text.to_lowercase();
        let categories = RiskCategory::ALL
            .into_iter()
            .filter(|c| c.keywords().iter().any(|k| lower.contains(k)))
            .collect();
        let severity = if lower.contains("high") || impact == Some(Impact::High) {
            Some(Impact::High)
        } else if lower.contains("medium") || impact == Some(Impact::Medium) {
            Some(Impact::Medium)
        } else {
            None
        };
        RuleTags {
            categories,
            severity,
        }
    }

    pub fn has(&self, category: RiskCategory) -> bool {
        self.categories.contains(&category)
    }
}

/// A `column=value` item of the discretized table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub column: String,
    pub value: String,
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.column, self.value)
    }
}

impl Serialize for Item {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssociationRule {
    pub rule: String,
    pub support: f64,
    pub confidence: f64,
    pub lift: f64,
    pub antecedent: Item,
    pub consequent: Item,
    pub tags: RuleTags,
}

impl Sanitize for AssociationRule {
    fn sanitize(&mut self) {
        self.support.sanitize();
        self.confidence.sanitize();
        self.lift.sanitize();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Side {
    #[serde(rename = "<")]
    Below,
    #[serde(rename = ">")]
    Above,
}

impl Side {
    pub fn holds(self, value: f64, threshold: f64) -> bool {
        match self {
            Side::Below => value < threshold,
            Side::Above => value > threshold,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Below => "<",
            Side::Above => ">",
        }
    }
}

/// Where an if-then rule came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleOrigin {
    /// Fitted from quartile subgroups of the data.
    Data,
    /// Domain template with a fixed prior confidence, not fitted to the data.
    Template,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IfThenRule {
    pub rule: String,
    pub feature: String,
    pub comparator: Side,
    pub threshold: f64,
    /// Share of rows in the subgroup; absent for templates.
    pub support: Option<f64>,
    pub confidence: f64,
    /// Subgroup mean target over overall mean target; absent for templates.
    pub lift: Option<f64>,
    pub impact: Impact,
    pub origin: RuleOrigin,
    pub tags: RuleTags,
}

impl IfThenRule {
    /// A fixed-confidence rule that is not backed by subgroup statistics.
    pub fn template(
        rule: impl Into<String>,
        feature: impl Into<String>,
        comparator: Side,
        threshold: f64,
        confidence: f64,
        impact: Impact,
    ) -> Self {
        let rule = rule.into();
        let tags = RuleTags::classify(&rule, Some(impact));
        IfThenRule {
            rule,
            feature: feature.into(),
            comparator,
            threshold,
            support: None,
            confidence,
            lift: None,
            impact,
            origin: RuleOrigin::Template,
            tags,
        }
    }

    pub fn is_template(&self) -> bool {
        self.origin == RuleOrigin::Template
    }
}

impl Sanitize for IfThenRule {
    fn sanitize(&mut self) {
        self.threshold.sanitize();
        self.support.sanitize();
        self.confidence.sanitize();
        self.lift.sanitize();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MiningSummary {
    pub total_association_rules: usize,
    pub total_if_then_rules: usize,
    pub domain: Domain,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MinedRules {
    pub association_rules: Vec<AssociationRule>,
    pub if_then_rules: Vec<IfThenRule>,
    pub summary: MiningSummary,
}

impl MinedRules {
    pub fn empty(domain: Domain) -> Self {
        MinedRules {
            association_rules: Vec::new(),
            if_then_rules: Vec::new(),
            summary: MiningSummary {
                total_association_rules: 0,
                total_if_then_rules: 0,
                domain,
            },
        }
    }

    pub fn total(&self) -> usize {
        self.association_rules.len() + self.if_then_rules.len()
    }

    /// Tags of every rule, if-then rules first.
    pub fn tags(&self) -> impl Iterator<Item = &RuleTags> {
        self.if_then_rules
            .iter()
            .map(|r| &r.tags)
            .chain(self.association_rules.iter().map(|r| &r.tags))
    }
}

impl Sanitize for MinedRules {
    fn sanitize(&mut self) {
        self.association_rules.sanitize();
        self.if_then_rules.sanitize();
    }
}

/// Mines association and if-then rules from a table.
#[derive(Debug, Clone)]
pub struct PatternMiner {
    config: MiningConfig,
    columns: ColumnConfig,
}

impl PatternMiner {
    pub fn new(config: Option<MiningConfig>) -> Self {
        PatternMiner {
            config: config.unwrap_or_default(),
            columns: ColumnConfig::default(),
        }
    }

    pub fn with_column_config(mut self, columns: ColumnConfig) -> Self {
        self.columns = columns;
        self
    }

    pub fn config(&self) -> &MiningConfig {
        &self.config
    }

    /// Mines with the configured `min_support` and `min_confidence`.
    pub fn extract_rules_with_defaults(
        &self,
        table: &Table,
        domain: Domain,
        target_column: Option<&str>,
    ) -> Result<MinedRules> {
        self.extract_rules(
            table,
            domain,
            target_column,
            self.config.min_support,
            self.config.min_confidence,
        )
    }

    pub fn extract_rules(
        &self,
        table: &Table,
        domain: Domain,
        target_column: Option<&str>,
        min_support: f64,
        min_confidence: f64,
    ) -> Result<MinedRules> {
        check_fraction("min_support", min_support)?;
        check_fraction("min_confidence", min_confidence)?;

        let association_rules = self.association_rules(table, min_support, min_confidence);

        let target_idx = match target_column {
            Some(name) => {
                let idx = table.column_index(name);
                if idx.is_none() {
                    warn!("target column '{}' not found; skipping data-derived if-then rules", name);
                }
                idx
            }
            None => None,
        };
        let mut if_then_rules = match target_idx {
            Some(idx) => self.data_if_then_rules(table, idx),
            None => Vec::new(),
        };
        if_then_rules.extend(self.template_rules(table, domain));
        if_then_rules.truncate(self.config.max_if_then_rules);

        info!(
            "mined {} association and {} if-then rules from {} rows ({} domain)",
            association_rules.len(),
            if_then_rules.len(),
            table.n_rows(),
            domain
        );

        let mut mined = MinedRules {
            summary: MiningSummary {
                total_association_rules: association_rules.len(),
                total_if_then_rules: if_then_rules.len(),
                domain,
            },
            association_rules,
            if_then_rules,
        };
        mined.sanitize();
        Ok(mined)
    }

    /// Column-major copy of the table with numeric columns replaced by quartile bins.
    ///
    /// Missing cells are `None`. Numeric columns with too few parseable values,
    /// and unparseable cells inside numeric columns, keep their own labels.
    pub fn discretize(&self, table: &Table) -> Vec<Vec<Option<String>>> {
        (0..table.n_cols())
            .map(|col| {
                let cuts = match table.column_kind(col, &self.columns) {
                    ColumnKind::Numeric => {
                        let values = table.numeric_values(col);
                        if values.len() >= self.config.min_numeric_values {
                            rank_quartiles(&sorted(values))
                        } else {
                            None
                        }
                    }
                    ColumnKind::Categorical => None,
                };
                table
                    .column_values(col)
                    .map(|value| match value {
                        Value::Missing => None,
                        _ => Some(match (cuts, value.as_f64()) {
                            (Some(q), Some(x)) => bin_label(x, &q).to_string(),
                            _ => value.label(),
                        }),
                    })
                    .collect()
            })
            .collect()
    }

    fn association_rules(
        &self,
        table: &Table,
        min_support: f64,
        min_confidence: f64,
    ) -> Vec<AssociationRule> {
        let n_rows = table.n_rows();
        if n_rows == 0 {
            return Vec::new();
        }
        let total = n_rows as f64;
        let discretized = self.discretize(table);

        // (item, rows holding it, support) for every frequent item, column by column in first-seen order.
        let mut frequent: Vec<(Item, Vec<usize>, f64)> = Vec::new();
        for (col, cells) in discretized.iter().enumerate() {
            let mut slots: HashMap<&str, usize> = HashMap::new();
            let mut counts: Vec<(&str, usize)> = Vec::new();
            for value in cells.iter().flatten() {
                let slot = *slots.entry(value.as_str()).or_insert_with(|| {
                    counts.push((value.as_str(), 0));
                    counts.len() - 1
                });
                counts[slot].1 += 1;
            }

            let kept: Vec<(&str, f64)> = counts
                .into_iter()
                .map(|(value, count)| (value, count as f64 / total))
                .filter(|&(_, support)| support >= min_support)
                .collect();
            if kept.is_empty() {
                continue;
            }

            let kept_slots: HashMap<&str, usize> = kept
                .iter()
                .enumerate()
                .map(|(slot, &(value, _))| (value, slot))
                .collect();
            let mut rows: Vec<Vec<usize>> = vec![Vec::new(); kept.len()];
            for (row, cell) in cells.iter().enumerate() {
                if let Some(&slot) = cell.as_deref().and_then(|v| kept_slots.get(v)) {
                    rows[slot].push(row);
                }
            }

            for ((value, support), rows) in kept.into_iter().zip(rows) {
                let item = Item {
                    column: table.columns()[col].clone(),
                    value: value.to_string(),
                };
                frequent.push((item, rows, support));
            }
        }
        debug!("{} frequent items at min_support {}", frequent.len(), min_support);

        let mut rules = Vec::new();
        for (i, (antecedent, rows_a, support_a)) in frequent.iter().enumerate() {
            for (j, (consequent, rows_c, support_c)) in frequent.iter().enumerate() {
                if i == j {
                    continue;
                }
                let both = shared_rows(rows_a, rows_c);
                let support = both as f64 / total;
                let confidence = if *support_a > 0.0 {
                    support / support_a
                } else {
                    0.0
                };
                let lift = if *support_c > 0.0 {
                    confidence / support_c
                } else {
                    0.0
                };
                if confidence >= min_confidence && support >= min_support {
                    let rule = format!(
                        "IF {} = {} THEN {} = {}",
                        antecedent.column, antecedent.value, consequent.column, consequent.value
                    );
                    let tags = RuleTags::classify(&rule, None);
                    rules.push(AssociationRule {
                        rule,
                        support,
                        confidence,
                        lift,
                        antecedent: antecedent.clone(),
                        consequent: consequent.clone(),
                        tags,
                    });
                }
            }
        }

        rules.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        rules.truncate(self.config.max_association_rules);
        rules
    }

    fn data_if_then_rules(&self, table: &Table, target_idx: usize) -> Vec<IfThenRule> {
        let target_values = table.numeric_values(target_idx);
        if target_values.is_empty() {
            debug!("target has no numeric values; no data-derived if-then rules");
            return Vec::new();
        }
        let overall = mean(&target_values);
        let target_name = &table.columns()[target_idx];
        let total = table.n_rows() as f64;

        let numeric_features: Vec<usize> = (0..table.n_cols())
            .filter(|&col| col != target_idx)
            .filter(|&col| table.column_kind(col, &self.columns) == ColumnKind::Numeric)
            .take(self.config.max_numeric_features)
            .collect();

        let mut rules = Vec::new();
        for col in numeric_features {
            let values = table.numeric_values(col);
            if values.len() < self.config.min_numeric_values {
                continue;
            }
            let Some([q25, _, q75]) = rank_quartiles(&sorted(values)) else {
                continue;
            };
            let feature = &table.columns()[col];

            for (side, threshold) in [(Side::Below, q25), (Side::Above, q75)] {
                let mut count = 0usize;
                let mut target_sum = 0.0;
                for row in 0..table.n_rows() {
                    let Some(x) = table.value(row, col).and_then(Value::as_f64) else { continue };
                    if side.holds(x, threshold) {
                        count += 1;
                        if let Some(t) = table.value(row, target_idx).and_then(Value::as_f64) {
                            target_sum += t;
                        }
                    }
                }
                if count == 0 {
                    continue;
                }

                let subgroup = target_sum / count as f64;
                let gap = (subgroup - overall).abs();
                let keep = overall == 0.0 || gap > self.config.medium_gap * overall.abs();
                if !keep {
                    continue;
                }
                let impact = if gap > self.config.high_gap * overall.abs() {
                    Impact::High
                } else {
                    Impact::Medium
                };
                let share = count as f64 / total;
                let lift = if overall != 0.0 {
                    (subgroup / overall).max(0.0)
                } else {
                    1.0
                };

                let rule = format_if_then(feature, side, threshold, target_name, subgroup);
                let tags = RuleTags::classify(&rule, Some(impact));
                rules.push(IfThenRule {
                    rule,
                    feature: feature.clone(),
                    comparator: side,
                    threshold,
                    support: Some(share),
                    confidence: share,
                    lift: Some(lift),
                    impact,
                    origin: RuleOrigin::Data,
                    tags,
                });
            }
        }
        rules
    }

    /// Fixed-confidence template rules for the domain; heuristic priors, not fits.
    fn template_rules(&self, table: &Table, domain: Domain) -> Vec<IfThenRule> {
        let Some(template) = DomainTemplate::for_domain(domain, &self.config) else {
            return Vec::new();
        };

        let mut rules = Vec::new();
        for (col, name) in table.columns().iter().enumerate() {
            let lower = name.to_lowercase();
            if !template.keywords.iter().any(|k| lower.contains(k)) {
                continue;
            }
            let values = sorted(table.numeric_values(col));
            if values.len() < self.config.min_numeric_values {
                continue;
            }
            let threshold = values[template.cut.rank(values.len())];
            let text = match domain {
                Domain::Hr => format!("IF {} < {:.1} THEN higher risk category", name, threshold),
                Domain::Finance => format!("IF {} > {:.2} THEN budget alert", name, threshold),
                _ => format!("IF {} > {:.1} THEN higher sales potential", name, threshold),
            };
            rules.push(IfThenRule::template(
                text,
                name.clone(),
                template.side,
                threshold,
                template.confidence,
                template.impact,
            ));
        }
        rules
    }
}

#[derive(Debug, Clone, Copy)]
enum Cut {
    LowerQuartile,
    Median,
    UpperQuartile,
}

impl Cut {
    fn rank(self, n: usize) -> usize {
        match self {
            Cut::LowerQuartile => n / 4,
            Cut::Median => n / 2,
            Cut::UpperQuartile => 3 * n / 4,
        }
    }
}

struct DomainTemplate {
    keywords: &'static [&'static str],
    cut: Cut,
    side: Side,
    confidence: f64,
    impact: Impact,
}

impl DomainTemplate {
    fn for_domain(domain: Domain, config: &MiningConfig) -> Option<Self> {
        let priors = &config.template_confidences;
        match domain {
            Domain::Hr => Some(DomainTemplate {
                keywords: &["age", "tenure"],
                cut: Cut::LowerQuartile,
                side: Side::Below,
                confidence: priors.hr,
                impact: Impact::Medium,
            }),
            Domain::Finance => Some(DomainTemplate {
                keywords: &["expense", "cost"],
                cut: Cut::UpperQuartile,
                side: Side::Above,
                confidence: priors.finance,
                impact: Impact::High,
            }),
            Domain::Sales => Some(DomainTemplate {
                keywords: &["quantity", "order"],
                cut: Cut::Median,
                side: Side::Above,
                confidence: priors.sales,
                impact: Impact::Medium,
            }),
            Domain::Education | Domain::General => None,
        }
    }
}

impl Default for PatternMiner {
    fn default() -> Self {
        PatternMiner::new(None)
    }
}

/// Size of the intersection of two ascending row lists.
fn shared_rows(a: &[usize], b: &[usize]) -> usize {
    let (mut i, mut j, mut shared) = (0, 0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                shared += 1;
                i += 1;
                j += 1;
            }
        }
    }
    shared
}

fn check_fraction(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(InsightError::InvalidInput(format!(
            "{} must lie in [0, 1], got {}",
            name, value
        )))
    }
}

fn bin_label(x: f64, cuts: &[f64; 3]) -> &'static str {
    if x < cuts[0] {
        "Low"
    } else if x < cuts[1] {
        "Medium"
    } else if x < cuts[2] {
        "High"
    } else {
        "VeryHigh"
    }
}

fn format_if_then(feature: &str, side: Side, threshold: f64, target: &str, subgroup_mean: f64) -> String {
    let feature_lower = feature.to_lowercase();
    let threshold = if ["age", "count", "leave"].iter().any(|k| feature_lower.contains(k)) {
        format!("{:.0}", threshold)
    } else {
        format!("{:.2}", threshold)
    };

    let target_lower = target.to_lowercase();
    let outcome = if target_lower.contains("attrition") || target_lower.contains("risk") {
        let level = if subgroup_mean > 0.7 {
            "High"
        } else if subgroup_mean > 0.4 {
            "Medium"
        } else {
            "Low"
        };
        level.to_string()
    } else {
        format!("{:.2}", subgroup_mean)
    };

    format!("IF {} {} {} THEN {} = {}", feature, side.as_str(), threshold, target, outcome)
}
