// src/algorithms/metrics.rs

//! Hold-out metrics for induced rule-sets.
//!
//! Classification labels are compared by their string form.

use crate::utils::{finite_or_zero, Sanitize};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    /// Support-weighted mean of per-class precision.
    pub precision: f64,
    /// Support-weighted mean of per-class recall.
    pub recall: f64,
    /// Harmonic mean of the weighted precision and recall.
    pub f1_score: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RegressionMetrics {
    pub mae: f64,
    pub rmse: f64,
    pub r2: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Metrics {
    Classification(ClassificationMetrics),
    Regression(RegressionMetrics),
}

impl Sanitize for Metrics {
    fn sanitize(&mut self) {
        match self {
            Metrics::Classification(m) => {
                m.accuracy = finite_or_zero(m.accuracy);
                m.precision = finite_or_zero(m.precision);
                m.recall = finite_or_zero(m.recall);
                m.f1_score = finite_or_zero(m.f1_score);
            }
            Metrics::Regression(m) => {
                m.mae = finite_or_zero(m.mae);
                m.rmse = finite_or_zero(m.rmse);
                m.r2 = finite_or_zero(m.r2);
            }
        }
    }
}

#[derive(Default)]
struct ClassCounts {
    tp: usize,
    fp: usize,
    fn_: usize,
    support: usize,
}

pub fn classification_metrics(y_true: &[String], y_pred: &[String]) -> ClassificationMetrics {
    let n = y_true.len().min(y_pred.len());
    if n == 0 {
        return ClassificationMetrics::default();
    }

    let mut counts: BTreeMap<&str, ClassCounts> = BTreeMap::new();
    let mut correct = 0usize;
    for (truth, pred) in y_true.iter().zip(y_pred).take(n) {
        counts.entry(truth.as_str()).or_default().support += 1;
        if truth == pred {
            correct += 1;
            counts.entry(truth.as_str()).or_default().tp += 1;
        } else {
            counts.entry(pred.as_str()).or_default().fp += 1;
            counts.entry(truth.as_str()).or_default().fn_ += 1;
        }
    }

    let total = n as f64;
    let mut precision = 0.0;
    let mut recall = 0.0;
    for c in counts.values() {
        let weight = c.support as f64 / total;
        if c.tp + c.fp > 0 {
            precision += c.tp as f64 / (c.tp + c.fp) as f64 * weight;
        }
        if c.tp + c.fn_ > 0 {
            recall += c.tp as f64 / (c.tp + c.fn_) as f64 * weight;
        }
    }

    let f1_score = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    ClassificationMetrics {
        accuracy: correct as f64 / total,
        precision,
        recall,
        f1_score,
    }
}

pub fn regression_metrics(y_true: &[f64], y_pred: &[f64]) -> RegressionMetrics {
    let n = y_true.len().min(y_pred.len());
    if n == 0 {
        return RegressionMetrics::default();
    }
    let (y_true, y_pred) = (&y_true[..n], &y_pred[..n]);
    let count = n as f64;

    let mae = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).abs())
        .sum::<f64>()
        / count;
    let ss_res: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2)).sum();
    let rmse = (ss_res / count).sqrt();

    let y_mean = y_true.iter().sum::<f64>() / count;
    let ss_tot: f64 = y_true.iter().map(|t| (t - y_mean).powi(2)).sum();
    let r2 = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 };

    RegressionMetrics { mae, rmse, r2 }
}

/// Distinct labels in first-seen order.
pub(crate) fn distinct_labels(labels: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    labels
        .iter()
        .filter(|l| seen.insert(l.as_str()))
        .cloned()
        .collect()
}
