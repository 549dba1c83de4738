// src/core/domain.rs
use serde::{Deserialize, Serialize};
use std::fmt;

/// Business domain a dataset was matched to upstream.
///
/// Only selects keyword lists and template rules; it never changes the maths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Domain {
    #[serde(rename = "HR")]
    Hr,
    Finance,
    Sales,
    Education,
    General,
}

impl Domain {
    /// Case-insensitive lookup. Labels that name no known domain fall back to `General`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "hr" => Domain::Hr,
            "finance" => Domain::Finance,
            "sales" => Domain::Sales,
            "education" => Domain::Education,
            _ => Domain::General,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Hr => "HR",
            Domain::Finance => "Finance",
            Domain::Sales => "Sales",
            Domain::Education => "Education",
            Domain::General => "General",
        }
    }
}

impl Default for Domain {
    fn default() -> Self {
        Domain::General
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_case_insensitive() {
        assert_eq!(Domain::from_label("hr"), Domain::Hr);
        assert_eq!(Domain::from_label(" FINANCE "), Domain::Finance);
        assert_eq!(Domain::from_label("Education"), Domain::Education);
    }

    #[test]
    fn unknown_labels_degrade_to_general() {
        assert_eq!(Domain::from_label("Logistics"), Domain::General);
        assert_eq!(Domain::from_label(""), Domain::General);
    }

    #[test]
    fn display_round_trips_through_from_label() {
        for domain in [Domain::Hr, Domain::Finance, Domain::Sales, Domain::Education, Domain::General] {
            assert_eq!(Domain::from_label(&domain.to_string()), domain);
        }
    }
}
