//! Parse/format stability: for a representative valid input of every
//! built-in type, formatting the stored value and parsing it back must be
//! idempotent — `format(parse(shown))` reproduces `shown`.

use dyntable_registry::TypeRegistry;

const REPRESENTATIVES: &[(&str, &str)] = &[
    ("text", "hello world"),
    ("textarea", "first line\nsecond line"),
    ("number", "42.5"),
    ("integer", "7"),
    ("float", "3.25"),
    ("boolean", "yes"),
    ("date", "2026-01-31"),
    ("time", "09:30"),
    ("datetime", "2026-01-31 09:30"),
    ("email", "User@Example.com"),
    ("url", "example.com/store"),
    ("phone", "5551234567"),
    ("country", "br"),
    ("currency", "$1,234.50"),
    ("percentage", "42%"),
    ("rating", "4"),
    ("color", "ff8800"),
];

#[test]
fn format_of_parse_is_stable_for_every_builtin() {
    let registry = TypeRegistry::with_builtins();

    for (type_id, input) in REPRESENTATIVES {
        let handler = registry.resolve(type_id);
        assert_eq!(handler.type_id(), *type_id, "missing builtin {type_id}");

        let stored = handler.parse(input, None);
        let shown = handler.format(&stored, None);
        let reparsed = handler.parse(&shown, None);
        assert_eq!(
            handler.format(&reparsed, None),
            shown,
            "format/parse not stable for {type_id} on {input:?}"
        );

        // The representative value is valid for its own type.
        let outcome = handler.validate(&stored, None);
        assert!(outcome.valid, "{type_id} rejected {input:?}: {outcome:?}");
    }
}

#[test]
fn phone_round_trip_matches_the_documented_shapes() {
    let registry = TypeRegistry::with_builtins();
    let phone = registry.resolve("phone");

    let stored = phone.parse("5551234567", None);
    assert_eq!(stored.as_str(), Some("+15551234567"));
    assert_eq!(phone.format(&stored, None), "+1 (555) 123-4567");
}
