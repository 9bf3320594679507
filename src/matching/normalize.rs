// src/matching/normalize.rs - Deterministic text canonicalization
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::NormalizationConfig;

/// Trailing legal-form tokens dropped when `strip_legal_suffixes` is on.
static LEGAL_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+(incorporated|inc|corporation|corp|company|co|llc|ltd|limited|lp|llp|plc)\.?$")
        .expect("legal suffix pattern is valid")
});

/// Canonicalizes raw attribute text. Pure and total: absent or empty input
/// yields the empty string.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer {
    config: NormalizationConfig,
}

impl Normalizer {
    pub fn new(config: NormalizationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NormalizationConfig {
        &self.config
    }

    pub fn normalize(&self, raw: Option<&str>) -> String {
        let raw = match raw {
            Some(s) if !s.is_empty() => s,
            _ => return String::new(),
        };

        let mut normalized = if self.config.lowercase {
            raw.to_lowercase()
        } else {
            raw.to_string()
        };

        if self.config.strip_punctuation {
            normalized = normalized
                .chars()
                .filter(|c| c.is_alphanumeric() || c.is_whitespace())
                .collect();
        }

        if self.config.collapse_whitespace {
            normalized = collapse_whitespace(&normalized, self.config.trim);
        } else if self.config.trim {
            normalized = normalized.trim().to_string();
        }

        if self.config.strip_legal_suffixes {
            // "acme co inc" needs two passes
            loop {
                let stripped = LEGAL_SUFFIX.replace(&normalized, "").into_owned();
                if stripped == normalized {
                    break;
                }
                normalized = stripped;
            }
        }

        normalized
    }
}

/// Runs of whitespace become one ASCII space. Leading and trailing runs are
/// dropped when `trim` is set, otherwise kept as a single space.
fn collapse_whitespace(s: &str, trim: bool) -> String {
    let joined = s.split_whitespace().collect::<Vec<_>>().join(" ");
    if trim || joined.is_empty() {
        return joined;
    }
    let mut out = String::with_capacity(joined.len() + 2);
    if s.starts_with(char::is_whitespace) {
        out.push(' ');
    }
    out.push_str(&joined);
    if s.ends_with(char::is_whitespace) {
        out.push(' ');
    }
    out
}
