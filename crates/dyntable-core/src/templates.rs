use schemars::JsonSchema;
use serde::Serialize;

use crate::enums::TableType;
use crate::value::CellValue;

/// Definition of a column a commerce table type requires.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ColumnTemplate {
    pub name: &'static str,
    pub column_type: &'static str,
    pub is_required: bool,
    pub allow_duplicates: bool,
    pub default_value: CellValue,
}

static SALE_COLUMNS: &[ColumnTemplate] = &[
    ColumnTemplate {
        name: "price",
        column_type: "currency",
        is_required: true,
        allow_duplicates: true,
        default_value: CellValue::Number(0.0),
    },
    ColumnTemplate {
        name: "qty",
        column_type: "integer",
        is_required: true,
        allow_duplicates: true,
        default_value: CellValue::Number(0.0),
    },
];

static RENT_COLUMNS: &[ColumnTemplate] = &[
    ColumnTemplate {
        name: "price",
        column_type: "currency",
        is_required: true,
        allow_duplicates: true,
        default_value: CellValue::Number(0.0),
    },
    ColumnTemplate {
        name: "fee",
        column_type: "currency",
        is_required: false,
        allow_duplicates: true,
        default_value: CellValue::Number(0.0),
    },
    ColumnTemplate {
        name: "used",
        column_type: "boolean",
        is_required: false,
        allow_duplicates: true,
        default_value: CellValue::Bool(false),
    },
    ColumnTemplate {
        name: "available",
        column_type: "boolean",
        is_required: false,
        allow_duplicates: true,
        default_value: CellValue::Bool(true),
    },
];

/// Columns the given table type requires. The templates are fixed; only
/// column *types* are extensible by modules.
pub fn required_columns(table_type: TableType) -> &'static [ColumnTemplate] {
    match table_type {
        TableType::Default => &[],
        TableType::Sale => SALE_COLUMNS,
        TableType::Rent => RENT_COLUMNS,
    }
}

/// Column names whose name/required/duplicates settings are frozen while the
/// table keeps the given type.
pub fn protected_column_names(table_type: TableType) -> &'static [&'static str] {
    match table_type {
        TableType::Default => &[],
        TableType::Sale => &["price", "qty"],
        TableType::Rent => &["price", "fee", "used", "available"],
    }
}

/// Case-insensitive membership test against the protected set.
pub fn is_protected_column(table_type: TableType, column_name: &str) -> bool {
    protected_column_names(table_type)
        .iter()
        .any(|name| name.eq_ignore_ascii_case(column_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tables_protect_nothing() {
        assert!(required_columns(TableType::Default).is_empty());
        assert!(!is_protected_column(TableType::Default, "price"));
    }

    #[test]
    fn protection_follows_table_type() {
        assert!(is_protected_column(TableType::Sale, "price"));
        assert!(is_protected_column(TableType::Sale, "Qty"));
        assert!(!is_protected_column(TableType::Sale, "fee"));
        assert!(is_protected_column(TableType::Rent, "available"));
    }

    #[test]
    fn rent_defaults_describe_a_rentable_item() {
        let used = RENT_COLUMNS.iter().find(|c| c.name == "used").unwrap();
        let available = RENT_COLUMNS.iter().find(|c| c.name == "available").unwrap();
        assert_eq!(used.default_value, CellValue::Bool(false));
        assert_eq!(available.default_value, CellValue::Bool(true));
    }
}
