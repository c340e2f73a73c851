use std::sync::Arc;

use dyntable_core::CellValue;
use serde_json::Value;

use crate::outcome::ValidationOutcome;

mod numeric;
mod temporal;
mod textual;

pub use numeric::{
    BooleanHandler, CurrencyHandler, FloatHandler, IntegerHandler, NumberHandler,
    PercentageHandler, RatingHandler,
};
pub use temporal::{DateHandler, DatetimeHandler, TimeHandler};
pub use textual::{
    ColorHandler, CountryHandler, EmailHandler, PhoneHandler, TextHandler, TextareaHandler,
    UrlHandler,
};

/// Per-type validation, formatting, parsing, and default-value rules.
///
/// Implementations must be pure and must never panic or error out of
/// `validate`; an unacceptable value is reported through the outcome.
/// `parse` is lenient: input that cannot be interpreted for the type is
/// stored as text so no user data is ever dropped.
pub trait ColumnTypeHandler: Send + Sync {
    fn type_id(&self) -> &str;

    fn validate(&self, value: &CellValue, options: Option<&Value>) -> ValidationOutcome;

    fn format(&self, value: &CellValue, _options: Option<&Value>) -> String {
        value.to_plain_string()
    }

    fn parse(&self, input: &str, _options: Option<&Value>) -> CellValue {
        CellValue::Text(input.trim().to_string())
    }

    fn default_value(&self, _options: Option<&Value>) -> CellValue {
        CellValue::Null
    }
}

/// Coerce a cell to a number the way the numeric handlers do: native numbers
/// pass through, numeric text parses, everything else is rejected.
pub(crate) fn coerce_number(value: &CellValue) -> Option<f64> {
    match value {
        CellValue::Number(number) => Some(*number),
        CellValue::Text(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// The full built-in handler set, in registry registration order.
pub fn builtin_handlers() -> Vec<Arc<dyn ColumnTypeHandler>> {
    vec![
        Arc::new(TextHandler),
        Arc::new(TextareaHandler),
        Arc::new(NumberHandler),
        Arc::new(IntegerHandler),
        Arc::new(FloatHandler),
        Arc::new(BooleanHandler),
        Arc::new(DateHandler),
        Arc::new(TimeHandler),
        Arc::new(DatetimeHandler),
        Arc::new(EmailHandler),
        Arc::new(UrlHandler),
        Arc::new(PhoneHandler),
        Arc::new(CountryHandler),
        Arc::new(CurrencyHandler),
        Arc::new(PercentageHandler),
        Arc::new(RatingHandler),
        Arc::new(ColorHandler),
    ]
}
