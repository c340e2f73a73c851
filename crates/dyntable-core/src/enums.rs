use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Read visibility of a table for principals other than the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Private,
    Public,
    Shared,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Private => "private",
            Visibility::Public => "public",
            Visibility::Shared => "shared",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Error> {
        match value {
            "private" => Ok(Visibility::Private),
            "public" => Ok(Visibility::Public),
            "shared" => Ok(Visibility::Shared),
            other => Err(Error::Storage(format!("unknown visibility: {other}"))),
        }
    }
}

/// Commerce semantics attached to a table. Determines the protected and
/// required column sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TableType {
    Default,
    Sale,
    Rent,
}

impl TableType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableType::Default => "default",
            TableType::Sale => "sale",
            TableType::Rent => "rent",
        }
    }

    /// True for table types that maintain a transaction ledger.
    pub fn is_commerce(&self) -> bool {
        matches!(self, TableType::Sale | TableType::Rent)
    }
}

impl fmt::Display for TableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableType {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Error> {
        match value {
            "default" => Ok(TableType::Default),
            "sale" => Ok(TableType::Sale),
            "rent" => Ok(TableType::Rent),
            other => Err(Error::Storage(format!("unknown table type: {other}"))),
        }
    }
}

/// Billing period of a rent table. Only meaningful when the owning table has
/// `TableType::Rent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RentalPeriod {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl RentalPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RentalPeriod::Daily => "daily",
            RentalPeriod::Weekly => "weekly",
            RentalPeriod::Monthly => "monthly",
            RentalPeriod::Yearly => "yearly",
        }
    }
}

impl fmt::Display for RentalPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RentalPeriod {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Error> {
        match value {
            "daily" => Ok(RentalPeriod::Daily),
            "weekly" => Ok(RentalPeriod::Weekly),
            "monthly" => Ok(RentalPeriod::Monthly),
            "yearly" => Ok(RentalPeriod::Yearly),
            other => Err(Error::Storage(format!("unknown rental period: {other}"))),
        }
    }
}

/// Status of a sale ledger entry. The only sale field besides payment method
/// and notes that may change after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    Pending,
    Completed,
    Cancelled,
    Refunded,
}

impl SaleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Pending => "pending",
            SaleStatus::Completed => "completed",
            SaleStatus::Cancelled => "cancelled",
            SaleStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SaleStatus {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Error> {
        match value {
            "pending" => Ok(SaleStatus::Pending),
            "completed" => Ok(SaleStatus::Completed),
            "cancelled" => Ok(SaleStatus::Cancelled),
            "refunded" => Ok(SaleStatus::Refunded),
            other => Err(Error::Storage(format!("unknown sale status: {other}"))),
        }
    }
}

/// Status of a rental ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RentalStatus {
    Active,
    Released,
    Cancelled,
}

impl RentalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RentalStatus::Active => "active",
            RentalStatus::Released => "released",
            RentalStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for RentalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RentalStatus {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Error> {
        match value {
            "active" => Ok(RentalStatus::Active),
            "released" => Ok(RentalStatus::Released),
            "cancelled" => Ok(RentalStatus::Cancelled),
            other => Err(Error::Storage(format!("unknown rental status: {other}"))),
        }
    }
}

/// Kind of event recorded in the inventory audit ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum InventoryAction {
    Add,
    Remove,
    Update,
    Adjust,
    Sale,
    Rent,
    Release,
}

impl InventoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            InventoryAction::Add => "add",
            InventoryAction::Remove => "remove",
            InventoryAction::Update => "update",
            InventoryAction::Adjust => "adjust",
            InventoryAction::Sale => "sale",
            InventoryAction::Rent => "rent",
            InventoryAction::Release => "release",
        }
    }
}

impl fmt::Display for InventoryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InventoryAction {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Error> {
        match value {
            "add" => Ok(InventoryAction::Add),
            "remove" => Ok(InventoryAction::Remove),
            "update" => Ok(InventoryAction::Update),
            "adjust" => Ok(InventoryAction::Adjust),
            "sale" => Ok(InventoryAction::Sale),
            "rent" => Ok(InventoryAction::Rent),
            "release" => Ok(InventoryAction::Release),
            other => Err(Error::Storage(format!("unknown inventory action: {other}"))),
        }
    }
}

/// Ledger family owning a per-year sequence counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SequenceKind {
    Sale,
    Rental,
}

impl SequenceKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            SequenceKind::Sale => "SALE",
            SequenceKind::Rental => "RENT",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SequenceKind::Sale => "sale",
            SequenceKind::Rental => "rental",
        }
    }

    /// Render an allocated counter value as a ledger number, e.g.
    /// `SALE-2026-007`.
    pub fn format_number(&self, year: i32, value: i64) -> String {
        format!("{}-{year}-{value:03}", self.prefix())
    }
}

impl fmt::Display for SequenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SequenceKind {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Error> {
        match value {
            "sale" => Ok(SequenceKind::Sale),
            "rental" => Ok(SequenceKind::Rental),
            other => Err(Error::Storage(format!("unknown sequence kind: {other}"))),
        }
    }
}
