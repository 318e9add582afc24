//! Category mapping — folds free-form classifier labels into buckets.
//!
//! The category classifier answers in prose ("Technical support.",
//! "оплата", "billing issue"). Each bucket has a set of word-boundary rules;
//! a label that hits exactly one bucket lands there. A label that hits none,
//! or more than one, is `other`.
//!
//! | bucket    | words |
//! |-----------|-------|
//! | technical | technical, tech, technique, support, bug, error, outage, connectivity, network, sms, app, login, техническая, технический |
//! | payment   | payment(s), billing, bill, refund, invoice, charge(s), subscription, price, оплата, платеж, платёж |
//! | other     | other, другое, general, misc, miscellaneous |

use regex::Regex;
use tracing::debug;

use super::types::Category;

/// One word-boundary rule pointing at a bucket.
#[derive(Debug, Clone)]
pub struct CategoryRule {
    /// Human-readable pattern description.
    pub pattern: String,
    /// Compiled regex for matching.
    pub regex: Regex,
    pub category: Category,
}

/// Label → bucket mapper.
pub struct CategoryMapper {
    rules: Vec<CategoryRule>,
}

impl CategoryMapper {
    /// Create a mapper with the documented vocabulary.
    pub fn default_rules() -> Self {
        let rules = vec![
            CategoryRule {
                pattern: "technical vocabulary".into(),
                regex: Regex::new(
                    r"(?i)\b(technical|tech|technique|support|bug|error|outage|connectivity|network|sms|app|login)\b",
                )
                .unwrap(),
                category: Category::Technical,
            },
            CategoryRule {
                pattern: "technical (ru)".into(),
                regex: Regex::new(r"(?i)(^|[^\p{L}])техническ(ая|ий|ое|ие)($|[^\p{L}])").unwrap(),
                category: Category::Technical,
            },
            CategoryRule {
                pattern: "payment vocabulary".into(),
                regex: Regex::new(
                    r"(?i)\b(payments?|billing|bill|refund|invoice|charges?|subscription|price)\b",
                )
                .unwrap(),
                category: Category::Payment,
            },
            CategoryRule {
                pattern: "payment (ru)".into(),
                regex: Regex::new(r"(?i)(^|[^\p{L}])(оплата|платеж|платёж)($|[^\p{L}])").unwrap(),
                category: Category::Payment,
            },
            CategoryRule {
                pattern: "explicit other".into(),
                regex: Regex::new(r"(?i)(^|[^\p{L}])(other|другое|general|misc|miscellaneous)($|[^\p{L}])")
                    .unwrap(),
                category: Category::Other,
            },
        ];

        Self { rules }
    }

    /// Map a raw label into a bucket. Ambiguous or unmapped → `Other`.
    pub fn map(&self, label: &str) -> Category {
        let normalized = normalize(label);
        let mut hits: Vec<&CategoryRule> = Vec::new();

        for rule in &self.rules {
            if rule.regex.is_match(&normalized) && !hits.iter().any(|h| h.category == rule.category) {
                hits.push(rule);
            }
        }

        let category = match hits.as_slice() {
            [only] => only.category,
            _ => Category::Other,
        };
        debug!(
            label = %label,
            category = %category,
            matched = ?hits.iter().map(|h| h.pattern.as_str()).collect::<Vec<_>>(),
            "Mapped category label"
        );
        category
    }
}

impl Default for CategoryMapper {
    fn default() -> Self {
        Self::default_rules()
    }
}

/// Lowercase, trim, and replace punctuation with spaces.
fn normalize(label: &str) -> String {
    label
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect()
}
