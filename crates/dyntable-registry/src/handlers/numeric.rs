use dyntable_core::CellValue;
use serde_json::Value;

use super::{ColumnTypeHandler, coerce_number};
use crate::outcome::ValidationOutcome;

/// Any finite number.
pub struct NumberHandler;

impl ColumnTypeHandler for NumberHandler {
    fn type_id(&self) -> &str {
        "number"
    }

    fn validate(&self, value: &CellValue, _options: Option<&Value>) -> ValidationOutcome {
        match coerce_number(value) {
            Some(number) if number.is_finite() => ValidationOutcome::ok(),
            _ => ValidationOutcome::fail("Must be a number"),
        }
    }

    fn parse(&self, input: &str, _options: Option<&Value>) -> CellValue {
        match input.trim().parse::<f64>() {
            Ok(number) => CellValue::Number(number),
            Err(_) => CellValue::Text(input.trim().to_string()),
        }
    }

    fn default_value(&self, _options: Option<&Value>) -> CellValue {
        CellValue::Number(0.0)
    }
}

/// Whole numbers only.
pub struct IntegerHandler;

impl ColumnTypeHandler for IntegerHandler {
    fn type_id(&self) -> &str {
        "integer"
    }

    fn validate(&self, value: &CellValue, _options: Option<&Value>) -> ValidationOutcome {
        match coerce_number(value) {
            Some(number) if number.is_finite() && number.fract() == 0.0 => ValidationOutcome::ok(),
            Some(_) => ValidationOutcome::fail("Must be a whole number"),
            None => ValidationOutcome::fail("Must be a number"),
        }
    }

    fn parse(&self, input: &str, _options: Option<&Value>) -> CellValue {
        match input.trim().parse::<f64>() {
            Ok(number) => CellValue::Number(number.trunc()),
            Err(_) => CellValue::Text(input.trim().to_string()),
        }
    }

    fn default_value(&self, _options: Option<&Value>) -> CellValue {
        CellValue::Number(0.0)
    }
}

/// Alias of `number` kept as its own type id for schema fidelity.
pub struct FloatHandler;

impl ColumnTypeHandler for FloatHandler {
    fn type_id(&self) -> &str {
        "float"
    }

    fn validate(&self, value: &CellValue, options: Option<&Value>) -> ValidationOutcome {
        NumberHandler.validate(value, options)
    }

    fn parse(&self, input: &str, options: Option<&Value>) -> CellValue {
        NumberHandler.parse(input, options)
    }

    fn default_value(&self, _options: Option<&Value>) -> CellValue {
        CellValue::Number(0.0)
    }
}

const TRUTHY: &[&str] = &["true", "1", "yes", "on"];
const FALSY: &[&str] = &["false", "0", "no", "off"];

/// Booleans, accepting the usual textual spellings case-insensitively.
pub struct BooleanHandler;

impl BooleanHandler {
    fn interpret(value: &CellValue) -> Option<bool> {
        match value {
            CellValue::Bool(flag) => Some(*flag),
            CellValue::Number(number) if *number == 0.0 => Some(false),
            CellValue::Number(number) if *number == 1.0 => Some(true),
            CellValue::Text(text) => {
                let lowered = text.trim().to_ascii_lowercase();
                if TRUTHY.contains(&lowered.as_str()) {
                    Some(true)
                } else if FALSY.contains(&lowered.as_str()) {
                    Some(false)
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

impl ColumnTypeHandler for BooleanHandler {
    fn type_id(&self) -> &str {
        "boolean"
    }

    fn validate(&self, value: &CellValue, _options: Option<&Value>) -> ValidationOutcome {
        match Self::interpret(value) {
            Some(_) => ValidationOutcome::ok(),
            None => ValidationOutcome::fail("Must be a boolean value (true/false, yes/no, 1/0, on/off)"),
        }
    }

    fn format(&self, value: &CellValue, _options: Option<&Value>) -> String {
        match Self::interpret(value) {
            Some(flag) => flag.to_string(),
            None => value.to_plain_string(),
        }
    }

    fn parse(&self, input: &str, _options: Option<&Value>) -> CellValue {
        match Self::interpret(&CellValue::Text(input.to_string())) {
            Some(flag) => CellValue::Bool(flag),
            None => CellValue::Text(input.trim().to_string()),
        }
    }

    fn default_value(&self, _options: Option<&Value>) -> CellValue {
        CellValue::Bool(false)
    }
}

/// Monetary amounts: numbers carried to at most two decimal places.
pub struct CurrencyHandler;

impl CurrencyHandler {
    fn strip_symbols(input: &str) -> String {
        input
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
            .collect()
    }

    fn symbol(options: Option<&Value>) -> String {
        options
            .and_then(|opts| opts.get("symbol"))
            .and_then(|v| v.as_str())
            .unwrap_or("$")
            .to_string()
    }
}

impl ColumnTypeHandler for CurrencyHandler {
    fn type_id(&self) -> &str {
        "currency"
    }

    fn validate(&self, value: &CellValue, _options: Option<&Value>) -> ValidationOutcome {
        let number = match value {
            CellValue::Number(number) => Some(*number),
            CellValue::Text(text) => Self::strip_symbols(text).parse::<f64>().ok(),
            _ => None,
        };
        match number {
            Some(number) if number.is_finite() => ValidationOutcome::ok(),
            _ => ValidationOutcome::fail("Must be a monetary amount"),
        }
    }

    fn format(&self, value: &CellValue, options: Option<&Value>) -> String {
        let Some(number) = value.as_f64() else {
            return value.to_plain_string();
        };
        format!("{}{:.2}", Self::symbol(options), number)
    }

    fn parse(&self, input: &str, _options: Option<&Value>) -> CellValue {
        match Self::strip_symbols(input).parse::<f64>() {
            // At most two decimals are kept for stored amounts.
            Ok(number) => CellValue::Number((number * 100.0).round() / 100.0),
            Err(_) => CellValue::Text(input.trim().to_string()),
        }
    }

    fn default_value(&self, _options: Option<&Value>) -> CellValue {
        CellValue::Number(0.0)
    }
}

/// Percentages bounded to the 0–100 range.
pub struct PercentageHandler;

impl ColumnTypeHandler for PercentageHandler {
    fn type_id(&self) -> &str {
        "percentage"
    }

    fn validate(&self, value: &CellValue, _options: Option<&Value>) -> ValidationOutcome {
        let number = match value {
            CellValue::Number(number) => Some(*number),
            CellValue::Text(text) => text.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
            _ => None,
        };
        match number {
            Some(number) if (0.0..=100.0).contains(&number) => ValidationOutcome::ok(),
            Some(_) => ValidationOutcome::fail("Percentage must be between 0 and 100"),
            None => ValidationOutcome::fail("Must be a number"),
        }
    }

    fn format(&self, value: &CellValue, _options: Option<&Value>) -> String {
        match value.as_f64() {
            Some(_) => format!("{}%", value.to_plain_string()),
            None => value.to_plain_string(),
        }
    }

    fn parse(&self, input: &str, _options: Option<&Value>) -> CellValue {
        let trimmed = input.trim().trim_end_matches('%').trim();
        match trimmed.parse::<f64>() {
            Ok(number) => CellValue::Number(number),
            Err(_) => CellValue::Text(input.trim().to_string()),
        }
    }

    fn default_value(&self, _options: Option<&Value>) -> CellValue {
        CellValue::Number(0.0)
    }
}

/// Star ratings on a 0–5 scale.
pub struct RatingHandler;

impl ColumnTypeHandler for RatingHandler {
    fn type_id(&self) -> &str {
        "rating"
    }

    fn validate(&self, value: &CellValue, _options: Option<&Value>) -> ValidationOutcome {
        match coerce_number(value) {
            Some(number) if (0.0..=5.0).contains(&number) => ValidationOutcome::ok(),
            Some(_) => ValidationOutcome::fail("Rating must be between 0 and 5"),
            None => ValidationOutcome::fail("Must be a number"),
        }
    }

    fn parse(&self, input: &str, _options: Option<&Value>) -> CellValue {
        match input.trim().parse::<f64>() {
            Ok(number) => CellValue::Number(number),
            Err(_) => CellValue::Text(input.trim().to_string()),
        }
    }

    fn default_value(&self, _options: Option<&Value>) -> CellValue {
        CellValue::Number(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_range_is_enforced() {
        let outcome = PercentageHandler.validate(&CellValue::Number(150.0), None);
        assert!(!outcome.valid);
        assert_eq!(
            outcome.error.as_deref(),
            Some("Percentage must be between 0 and 100")
        );
        assert!(PercentageHandler.validate(&CellValue::Number(100.0), None).valid);
    }

    #[test]
    fn boolean_accepts_common_spellings() {
        for spelling in ["true", "Yes", "ON", "1"] {
            assert_eq!(
                BooleanHandler.parse(spelling, None),
                CellValue::Bool(true),
                "{spelling}"
            );
        }
        for spelling in ["false", "no", "Off", "0"] {
            assert_eq!(BooleanHandler.parse(spelling, None), CellValue::Bool(false));
        }
        assert!(!BooleanHandler.validate(&CellValue::from("maybe"), None).valid);
    }

    #[test]
    fn currency_parse_rounds_to_cents() {
        assert_eq!(
            CurrencyHandler.parse("$1,234.567", None),
            CellValue::Number(1234.57)
        );
        assert_eq!(
            CurrencyHandler.format(&CellValue::Number(1234.5), None),
            "$1234.50"
        );
    }

    #[test]
    fn integer_rejects_fractions() {
        assert!(IntegerHandler.validate(&CellValue::Number(3.0), None).valid);
        assert!(!IntegerHandler.validate(&CellValue::Number(3.5), None).valid);
    }

    #[test]
    fn format_parse_round_trip_is_stable() {
        let stored = PercentageHandler.parse("42.5%", None);
        let shown = PercentageHandler.format(&stored, None);
        assert_eq!(shown, "42.5%");
        assert_eq!(PercentageHandler.parse(&shown, None), stored);
    }
}
