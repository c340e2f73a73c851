//! Module extension point: a phone-number DID type registered at runtime
//! under a namespace, with per-country pattern and format tables.

use std::sync::Arc;

use dyntable_core::CellValue;
use dyntable_registry::{
    ColumnTypeHandler, TypeRegistry, ValidationOutcome, validate_value,
};
use serde_json::Value;

struct CountryRule {
    code: &'static str,
    national_digits: usize,
    trunk_prefix: &'static str,
}

const COUNTRY_RULES: &[CountryRule] = &[
    CountryRule {
        code: "US",
        national_digits: 10,
        trunk_prefix: "1",
    },
    CountryRule {
        code: "GB",
        national_digits: 10,
        trunk_prefix: "44",
    },
];

/// Direct-inward-dial numbers with per-country tables, the reference
/// module-contributed type.
struct DidHandler;

impl DidHandler {
    fn rule(options: Option<&Value>) -> &'static CountryRule {
        let code = options
            .and_then(|opts| opts.get("country"))
            .and_then(|v| v.as_str())
            .unwrap_or("US");
        COUNTRY_RULES
            .iter()
            .find(|rule| rule.code == code)
            .unwrap_or(&COUNTRY_RULES[0])
    }

    fn normalize(input: &str, options: Option<&Value>) -> Option<String> {
        let rule = Self::rule(options);
        let digits: String = input.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.len() == rule.national_digits {
            return Some(format!("+{}{digits}", rule.trunk_prefix));
        }
        if digits.len() == rule.national_digits + rule.trunk_prefix.len()
            && digits.starts_with(rule.trunk_prefix)
        {
            return Some(format!("+{digits}"));
        }
        None
    }
}

impl ColumnTypeHandler for DidHandler {
    fn type_id(&self) -> &str {
        "did"
    }

    fn validate(&self, value: &CellValue, options: Option<&Value>) -> ValidationOutcome {
        match value.as_str() {
            Some(text) if Self::normalize(text, options).is_some() => ValidationOutcome::ok(),
            _ => ValidationOutcome::fail("Invalid DID number"),
        }
    }

    fn parse(&self, input: &str, options: Option<&Value>) -> CellValue {
        match Self::normalize(input, options) {
            Some(normalized) => CellValue::Text(normalized),
            None => CellValue::Text(input.trim().to_string()),
        }
    }
}

#[test]
fn module_types_resolve_namespaced_and_bare() {
    let registry = TypeRegistry::with_builtins();
    registry.register_module("@store/phone", Arc::new(DidHandler));

    // Namespaced id resolves directly.
    let handler = registry.resolve("@store/phone:did");
    assert_eq!(handler.type_id(), "did");

    // The bare alias resolves too, since no built-in claims "did".
    assert!(registry.contains("did"));

    // Value validation sees the module handler through the column type.
    let valid = validate_value(&registry, &CellValue::from("5551234567"), "@store/phone:did");
    assert!(valid.valid);
    let invalid = validate_value(&registry, &CellValue::from("12"), "@store/phone:did");
    assert!(!invalid.valid);
    assert_eq!(invalid.error.as_deref(), Some("Invalid DID number"));
}

#[test]
fn module_registration_does_not_shadow_builtins() {
    let registry = TypeRegistry::with_builtins();
    registry.register_module("@store/phone", Arc::new(DidHandler));

    // The built-in phone type is untouched.
    assert_eq!(registry.resolve("phone").type_id(), "phone");
    // And registration is idempotent for the alias.
    registry.register_module("@store/phone", Arc::new(DidHandler));
    assert_eq!(registry.resolve("did").type_id(), "did");
}

#[test]
fn per_country_tables_change_the_prefix() {
    let options = serde_json::json!({ "country": "GB" });
    let stored = DidHandler.parse("7911123456", Some(&options));
    assert_eq!(stored, CellValue::from("+447911123456"));
}
