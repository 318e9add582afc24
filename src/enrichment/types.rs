//! Enrichment value types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::classifiers::geo::GeoLocation;
use crate::classifiers::spam::SpamVerdict;

/// Sentiment of a complaint. `Unknown` means the classifier was unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
    #[default]
    Unknown,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
            Self::Unknown => "unknown",
        }
    }

    /// Normalize a classifier label. Returns `None` for anything outside the
    /// three real sentiments, including the literal "unknown".
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "positive" => Some(Self::Positive),
            "negative" => Some(Self::Negative),
            "neutral" => Some(Self::Neutral),
            _ => None,
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(Self::Unknown),
            other => Self::from_label(other).ok_or_else(|| format!("invalid sentiment: {other}")),
        }
    }
}

/// Topical bucket of a complaint. `Other` is the fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Technical,
    Payment,
    #[default]
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Technical => "technical",
            Self::Payment => "payment",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "technical" => Ok(Self::Technical),
            "payment" => Ok(Self::Payment),
            "other" => Ok(Self::Other),
            other => Err(format!("invalid category: {other}")),
        }
    }
}

/// Everything the orchestrator learned about one complaint text.
///
/// Primary fields always carry a value (possibly the fallback); optional
/// signals are `None` when disabled or when their classifier failed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichmentResult {
    pub sentiment: Sentiment,
    pub category: Category,
    pub spam: Option<SpamVerdict>,
    pub geo: Option<GeoLocation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentiment_labels_normalize() {
        assert_eq!(Sentiment::from_label(" Positive\n"), Some(Sentiment::Positive));
        assert_eq!(Sentiment::from_label("NEGATIVE"), Some(Sentiment::Negative));
        assert_eq!(Sentiment::from_label("unknown"), None);
        assert_eq!(Sentiment::from_label("mixed"), None);
    }

    #[test]
    fn db_strings_parse_back() {
        for s in [
            Sentiment::Positive,
            Sentiment::Negative,
            Sentiment::Neutral,
            Sentiment::Unknown,
        ] {
            assert_eq!(s.as_str().parse::<Sentiment>().unwrap(), s);
        }
        for c in [Category::Technical, Category::Payment, Category::Other] {
            assert_eq!(c.as_str().parse::<Category>().unwrap(), c);
        }
        assert!("техническая".parse::<Category>().is_err());
    }

    #[test]
    fn defaults_are_fallbacks() {
        let result = EnrichmentResult::default();
        assert_eq!(result.sentiment, Sentiment::Unknown);
        assert_eq!(result.category, Category::Other);
        assert!(result.spam.is_none());
        assert!(result.geo.is_none());
    }

    #[test]
    fn serde_uses_lowercase_names() {
        assert_eq!(serde_json::to_string(&Category::Payment).unwrap(), "\"payment\"");
        assert_eq!(serde_json::to_string(&Sentiment::Unknown).unwrap(), "\"unknown\"");
    }
}
