use std::sync::LazyLock;

use dyntable_core::CellValue;
use regex::Regex;
use serde_json::Value;

use super::ColumnTypeHandler;
use crate::outcome::ValidationOutcome;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$").expect("static regex")
});
static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://[^\s]+\.[^\s]+$").expect("static regex"));
static COUNTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]{2,3}$").expect("static regex"));
static COLOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#([0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("static regex")
});

/// Free-form text. Anything non-empty is acceptable.
pub struct TextHandler;

impl ColumnTypeHandler for TextHandler {
    fn type_id(&self) -> &str {
        "text"
    }

    fn validate(&self, _value: &CellValue, _options: Option<&Value>) -> ValidationOutcome {
        ValidationOutcome::ok()
    }

    fn default_value(&self, _options: Option<&Value>) -> CellValue {
        CellValue::Text(String::new())
    }
}

/// Multi-line text; identical rules to `text` under its own type id.
pub struct TextareaHandler;

impl ColumnTypeHandler for TextareaHandler {
    fn type_id(&self) -> &str {
        "textarea"
    }

    fn validate(&self, _value: &CellValue, _options: Option<&Value>) -> ValidationOutcome {
        ValidationOutcome::ok()
    }

    fn parse(&self, input: &str, _options: Option<&Value>) -> CellValue {
        // Unlike plain text, leading/trailing newlines are significant.
        CellValue::Text(input.to_string())
    }

    fn default_value(&self, _options: Option<&Value>) -> CellValue {
        CellValue::Text(String::new())
    }
}

/// Email addresses.
pub struct EmailHandler;

impl ColumnTypeHandler for EmailHandler {
    fn type_id(&self) -> &str {
        "email"
    }

    fn validate(&self, value: &CellValue, _options: Option<&Value>) -> ValidationOutcome {
        match value.as_str() {
            Some(text) if EMAIL_RE.is_match(text.trim()) => ValidationOutcome::ok(),
            _ => ValidationOutcome::fail_with_suggestion(
                "Invalid email format",
                "Add @ symbol and domain (e.g. user@example.com)",
            ),
        }
    }

    fn parse(&self, input: &str, _options: Option<&Value>) -> CellValue {
        CellValue::Text(input.trim().to_ascii_lowercase())
    }
}

/// http/https URLs. Parse prepends a scheme when the input looks like a bare
/// host so pasted domains survive.
pub struct UrlHandler;

impl ColumnTypeHandler for UrlHandler {
    fn type_id(&self) -> &str {
        "url"
    }

    fn validate(&self, value: &CellValue, _options: Option<&Value>) -> ValidationOutcome {
        match value.as_str() {
            Some(text) if URL_RE.is_match(text.trim()) => ValidationOutcome::ok(),
            _ => ValidationOutcome::fail_with_suggestion(
                "Invalid URL format",
                "Start with http:// or https://",
            ),
        }
    }

    fn parse(&self, input: &str, _options: Option<&Value>) -> CellValue {
        let trimmed = input.trim();
        if !trimmed.is_empty()
            && !trimmed.starts_with("http://")
            && !trimmed.starts_with("https://")
            && trimmed.contains('.')
            && !trimmed.contains(char::is_whitespace)
        {
            return CellValue::Text(format!("https://{trimmed}"));
        }
        CellValue::Text(trimmed.to_string())
    }
}

/// Phone numbers, stored in E.164 form. The default country is US; other
/// countries can be selected via the `country` option.
pub struct PhoneHandler;

impl PhoneHandler {
    fn digits(input: &str) -> String {
        input.chars().filter(|c| c.is_ascii_digit()).collect()
    }

    fn country(options: Option<&Value>) -> &str {
        options
            .and_then(|opts| opts.get("country"))
            .and_then(|v| v.as_str())
            .unwrap_or("US")
    }

    fn normalize(input: &str, options: Option<&Value>) -> Option<String> {
        let digits = Self::digits(input);
        match Self::country(options) {
            "US" | "CA" => match digits.len() {
                10 => Some(format!("+1{digits}")),
                11 if digits.starts_with('1') => Some(format!("+{digits}")),
                _ => None,
            },
            _ => {
                if input.trim().starts_with('+') && (7..=15).contains(&digits.len()) {
                    Some(format!("+{digits}"))
                } else {
                    None
                }
            }
        }
    }
}

impl ColumnTypeHandler for PhoneHandler {
    fn type_id(&self) -> &str {
        "phone"
    }

    fn validate(&self, value: &CellValue, options: Option<&Value>) -> ValidationOutcome {
        match value.as_str() {
            Some(text) if Self::normalize(text, options).is_some() => ValidationOutcome::ok(),
            _ => ValidationOutcome::fail_with_suggestion(
                "Invalid phone number",
                "Use 10 digits, e.g. 5551234567",
            ),
        }
    }

    fn format(&self, value: &CellValue, options: Option<&Value>) -> String {
        let Some(text) = value.as_str() else {
            return value.to_plain_string();
        };
        match Self::normalize(text, options) {
            Some(normalized) if normalized.starts_with("+1") && normalized.len() == 12 => {
                let national = &normalized[2..];
                format!(
                    "+1 ({}) {}-{}",
                    &national[..3],
                    &national[3..6],
                    &national[6..]
                )
            }
            Some(normalized) => normalized,
            None => text.to_string(),
        }
    }

    fn parse(&self, input: &str, options: Option<&Value>) -> CellValue {
        match Self::normalize(input, options) {
            Some(normalized) => CellValue::Text(normalized),
            None => CellValue::Text(input.trim().to_string()),
        }
    }
}

/// 2–3 letter country codes, stored uppercase.
pub struct CountryHandler;

impl ColumnTypeHandler for CountryHandler {
    fn type_id(&self) -> &str {
        "country"
    }

    fn validate(&self, value: &CellValue, _options: Option<&Value>) -> ValidationOutcome {
        match value.as_str() {
            Some(text) if COUNTRY_RE.is_match(text.trim()) => ValidationOutcome::ok(),
            _ => ValidationOutcome::fail("Country must be a 2-3 letter code"),
        }
    }

    fn format(&self, value: &CellValue, _options: Option<&Value>) -> String {
        match value.as_str() {
            Some(text) => text.trim().to_ascii_uppercase(),
            None => value.to_plain_string(),
        }
    }

    fn parse(&self, input: &str, _options: Option<&Value>) -> CellValue {
        CellValue::Text(input.trim().to_ascii_uppercase())
    }
}

/// Hex colors: `#RGB` or `#RRGGBB`.
pub struct ColorHandler;

impl ColumnTypeHandler for ColorHandler {
    fn type_id(&self) -> &str {
        "color"
    }

    fn validate(&self, value: &CellValue, _options: Option<&Value>) -> ValidationOutcome {
        match value.as_str() {
            Some(text) if COLOR_RE.is_match(text.trim()) => ValidationOutcome::ok(),
            _ => ValidationOutcome::fail_with_suggestion(
                "Invalid color format",
                "Use a hex value like #RRGGBB",
            ),
        }
    }

    fn parse(&self, input: &str, _options: Option<&Value>) -> CellValue {
        let trimmed = input.trim();
        let candidate = if trimmed.starts_with('#') {
            trimmed.to_string()
        } else {
            format!("#{trimmed}")
        };
        if COLOR_RE.is_match(&candidate) {
            CellValue::Text(candidate.to_ascii_lowercase())
        } else {
            CellValue::Text(trimmed.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_failure_carries_a_suggestion() {
        let outcome = EmailHandler.validate(&CellValue::from("not-an-email"), None);
        assert!(!outcome.valid);
        assert_eq!(outcome.error.as_deref(), Some("Invalid email format"));
        assert_eq!(
            outcome.suggestion.as_deref(),
            Some("Add @ symbol and domain (e.g. user@example.com)")
        );
        assert!(EmailHandler.validate(&CellValue::from("user@example.com"), None).valid);
    }

    #[test]
    fn us_phone_parse_and_format() {
        assert_eq!(
            PhoneHandler.parse("5551234567", None),
            CellValue::from("+15551234567")
        );
        assert_eq!(
            PhoneHandler.format(&CellValue::from("+15551234567"), None),
            "+1 (555) 123-4567"
        );
        // Formatting output parses back to the same stored value.
        assert_eq!(
            PhoneHandler.parse("+1 (555) 123-4567", None),
            CellValue::from("+15551234567")
        );
    }

    #[test]
    fn url_parse_fills_in_scheme() {
        assert_eq!(
            UrlHandler.parse("example.com/store", None),
            CellValue::from("https://example.com/store")
        );
        assert!(UrlHandler.validate(&CellValue::from("https://example.com"), None).valid);
        assert!(!UrlHandler.validate(&CellValue::from("nota url"), None).valid);
    }

    #[test]
    fn country_codes_normalize_uppercase() {
        assert_eq!(CountryHandler.parse("br", None), CellValue::from("BR"));
        assert!(CountryHandler.validate(&CellValue::from("USA"), None).valid);
        assert!(!CountryHandler.validate(&CellValue::from("Brazil"), None).valid);
    }

    #[test]
    fn color_parse_restores_the_hash() {
        assert_eq!(ColorHandler.parse("FF8800", None), CellValue::from("#ff8800"));
        assert!(!ColorHandler.validate(&CellValue::from("#12345"), None).valid);
    }
}
