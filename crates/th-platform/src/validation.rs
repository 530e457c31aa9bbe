//! Request Validation
//!
//! Normalises raw topic listing parameters into a [`TopicQuery`] and checks
//! request bodies. Every violated rule is collected before failing so callers
//! see all problems at once.

use crate::error::{PlatformError, Result};

pub const MAX_PAGE_SIZE: u32 = 10;
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Listing parameters exactly as received. Only the recognised fields are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTopicQuery {
    pub key: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

impl RawTopicQuery {
    /// Build from decoded query pairs. Unknown fields are dropped and empty
    /// values count as absent, so they never clear a value sent earlier.
    /// Otherwise the last occurrence of a field wins.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut raw = Self::default();
        for (name, value) in pairs {
            let value: String = value.into();
            let slot = match name.as_ref() {
                "key" => &mut raw.key,
                "page" => &mut raw.page,
                "pageSize" => &mut raw.page_size,
                _ => continue,
            };
            if !value.is_empty() {
                *slot = Some(value);
            }
        }
        raw
    }
}

/// Validated listing parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicQuery {
    pub key: Option<String>,
    pub page: u32,
    pub page_size: u32,
}

#[derive(Debug, Clone)]
pub struct QueryValidator {
    pub max_page_size: u32,
    pub default_page_size: u32,
}

impl Default for QueryValidator {
    fn default() -> Self {
        Self {
            max_page_size: MAX_PAGE_SIZE,
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Numeric reading of a parameter with loose web-style coercion: blank text
/// is zero, `0x`/`0o`/`0b` prefixes select a radix and `Infinity` is a
/// number. Anything else unparseable is NaN and fails every numeric rule.
fn numeric(raw: &str) -> f64 {
    let text = raw.trim();
    match text {
        "" => return 0.0,
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    let radix = match text.get(..2) {
        Some("0x" | "0X") => Some(16),
        Some("0o" | "0O") => Some(8),
        Some("0b" | "0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        let digits = &text[2..];
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return f64::NAN;
        }
        return digits
            .chars()
            .filter_map(|c| c.to_digit(radix))
            .fold(0.0, |acc, d| acc * f64::from(radix) + f64::from(d));
    }

    // The float parser also takes spellings such as "inf" and "nan"
    if text.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
        return f64::NAN;
    }
    text.parse::<f64>().unwrap_or(f64::NAN)
}

fn is_integer(v: f64) -> bool {
    v.is_finite() && v.fract() == 0.0
}

impl QueryValidator {
    pub fn new(max_page_size: u32) -> Self {
        Self {
            max_page_size,
            default_page_size: max_page_size.min(DEFAULT_PAGE_SIZE),
        }
    }

    pub fn validate(&self, raw: &RawTopicQuery) -> Result<TopicQuery> {
        let mut violations = Vec::new();

        let page = raw.page.as_deref().map(numeric);
        if let Some(v) = page {
            // Zero is the first page
            if v.is_nan() || v < 0.0 {
                violations.push("page must be a positive number".to_string());
            }
            if !is_integer(v) {
                violations.push("page must be an integer number".to_string());
            }
        }

        let page_size = raw.page_size.as_deref().map(numeric);
        if let Some(v) = page_size {
            if v.is_nan() || v <= 0.0 {
                violations.push("pageSize must be a positive number".to_string());
            }
            if !is_integer(v) {
                violations.push("pageSize must be an integer number".to_string());
            }
        }

        if !violations.is_empty() {
            return Err(PlatformError::validation(violations));
        }

        // Float to int casts saturate, so huge pages simply land past the end
        let page = page.map_or(0, |v| v as u32);
        let page_size = match page_size {
            Some(v) if v > f64::from(self.max_page_size) => {
                return Err(PlatformError::PageSizeTooLarge { max: self.max_page_size });
            }
            Some(v) => v as u32,
            None => self.default_page_size,
        };

        Ok(TopicQuery {
            key: raw.key.clone(),
            page,
            page_size,
        })
    }
}

pub fn validate_create_topic(key: &str, name: &str) -> Result<()> {
    let mut violations = Vec::new();
    if key.is_empty() {
        violations.push("key should not be empty".to_string());
    }
    if name.is_empty() {
        violations.push("name should not be empty".to_string());
    }
    into_result(violations)
}

pub fn validate_topic_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(PlatformError::validation(vec!["name should not be empty".to_string()]));
    }
    Ok(())
}

pub fn validate_subscribers(subscribers: &[String]) -> Result<()> {
    let mut violations = Vec::new();
    if subscribers.is_empty() {
        violations.push("subscribers should not be empty".to_string());
    }
    if subscribers.iter().any(|s| s.is_empty()) {
        violations.push("each value in subscribers should not be empty".to_string());
    }
    into_result(violations)
}

fn into_result(violations: Vec<String>) -> Result<()> {
    if violations.is_empty() {
        Ok(())
    } else {
        Err(PlatformError::validation(violations))
    }
}
