// src/utils.rs

//! Small numeric helpers shared by the engines.

use std::collections::HashMap;

/// Ascending copy of `values`, NaN-safe.
pub fn sorted(values: impl IntoIterator<Item = f64>) -> Vec<f64> {
    let mut out: Vec<f64> = values.into_iter().collect();
    out.sort_by(f64::total_cmp);
    out
}

/// Quartile cut points picked by integer rank (`n/4`, `n/2`, `3n/4`) from sorted values.
///
/// No interpolation: the cut points are always members of the input.
pub fn rank_quartiles(sorted_values: &[f64]) -> Option<[f64; 3]> {
    let n = sorted_values.len();
    if n == 0 {
        return None;
    }
    Some([
        sorted_values[n / 4],
        sorted_values[n / 2],
        sorted_values[3 * n / 4],
    ])
}

/// Arithmetic mean, 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Replaces NaN and infinities with 0.0.
pub fn finite_or_zero(x: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}

/// Output values that must carry only finite numbers across the crate boundary.
pub trait Sanitize {
    fn sanitize(&mut self);
}

impl Sanitize for f64 {
    fn sanitize(&mut self) {
        *self = finite_or_zero(*self);
    }
}

impl<T: Sanitize> Sanitize for Option<T> {
    fn sanitize(&mut self) {
        if let Some(inner) = self {
            inner.sanitize();
        }
    }
}

impl<T: Sanitize> Sanitize for Vec<T> {
    fn sanitize(&mut self) {
        self.iter_mut().for_each(Sanitize::sanitize);
    }
}

impl<K> Sanitize for std::collections::BTreeMap<K, f64> {
    fn sanitize(&mut self) {
        self.values_mut().for_each(Sanitize::sanitize);
    }
}

/// Label tally that remembers first-seen order.
///
/// `leader` returns the first label to reach the maximal amount, which is the
/// tie-break every vote and majority count in the crate relies on.
#[derive(Debug, Clone, Default)]
pub struct Tally {
    slots: HashMap<String, usize>,
    entries: Vec<(String, f64)>,
}

impl Tally {
    pub fn new() -> Self {
        Tally::default()
    }

    pub fn add(&mut self, label: &str, amount: f64) {
        match self.slots.get(label) {
            Some(&slot) => self.entries[slot].1 += amount,
            None => {
                self.slots.insert(label.to_string(), self.entries.len());
                self.entries.push((label.to_string(), amount));
            }
        }
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, amount)| amount).sum()
    }

    pub fn leader(&self) -> Option<(&str, f64)> {
        let mut best: Option<(&str, f64)> = None;
        for (label, amount) in &self.entries {
            match best {
                Some((_, top)) if *amount <= top => {}
                _ => best = Some((label.as_str(), *amount)),
            }
        }
        best
    }
}
