use std::fmt;

use thiserror::Error;

use dyntable_core::{RowData, bool_field};

/// Lifecycle state of a rentable item, derived from the `used`/`available`
/// flags stored in its row data.
///
/// The flags encode exactly three states; `used` is monotonic and flips
/// false→true exactly once, so there is no edge back to `Rentable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    /// `(used: false, available: true)` — never rented, or missing flags.
    Rentable,
    /// `(used: false, available: false)` — currently out on rent.
    Rented,
    /// `(used: true, available: false)` — terminal; cannot be rented again.
    Released,
}

impl ItemState {
    pub fn from_flags(used: bool, available: bool) -> Self {
        match (used, available) {
            (false, true) => ItemState::Rentable,
            (false, false) => ItemState::Rented,
            (true, _) => ItemState::Released,
        }
    }

    /// Derive the state at the boundary. Missing flags read as the initial
    /// rentable state.
    pub fn from_row(data: &RowData) -> Self {
        Self::from_flags(
            bool_field(data, "used", false),
            bool_field(data, "available", true),
        )
    }

    /// The `(used, available)` pair this state writes back to row data.
    pub fn flags(self) -> (bool, bool) {
        match self {
            ItemState::Rentable => (false, true),
            ItemState::Rented => (false, false),
            ItemState::Released => (true, false),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ItemState::Rentable => "rentable",
            ItemState::Rented => "rented",
            ItemState::Released => "released",
        }
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rent/release/sale attempted from a state that forbids it. Each variant
/// carries its own user-facing message so callers can tell the cases apart.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransitionError {
    #[error("item has already been used and cannot be rented again")]
    AlreadyUsed,
    #[error("item is currently rented")]
    CurrentlyRented,
    #[error("item has already been released")]
    AlreadyReleased,
    #[error("item is not currently rented")]
    NotRented,
    #[error("item has no price set")]
    NotPriced,
    #[error("insufficient quantity: requested {requested}, available {available}")]
    InsufficientQuantity { requested: f64, available: f64 },
}

/// Legality predicate for renting, kept next to the transition it gates.
pub fn can_rent_item(used: bool, available: bool) -> bool {
    !used && available
}

/// Legality predicate for releasing.
pub fn can_release_item(used: bool, available: bool) -> bool {
    !used && !available
}

/// The single legal rent edge: `Rentable` → `Rented`.
pub fn rent_transition(state: ItemState) -> Result<ItemState, TransitionError> {
    match state {
        ItemState::Rentable => Ok(ItemState::Rented),
        ItemState::Rented => Err(TransitionError::CurrentlyRented),
        ItemState::Released => Err(TransitionError::AlreadyUsed),
    }
}

/// The single legal release edge: `Rented` → `Released`.
pub fn release_transition(state: ItemState) -> Result<ItemState, TransitionError> {
    match state {
        ItemState::Rented => Ok(ItemState::Released),
        ItemState::Released => Err(TransitionError::AlreadyReleased),
        ItemState::Rentable => Err(TransitionError::NotRented),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_round_trip_through_states() {
        for state in [ItemState::Rentable, ItemState::Rented, ItemState::Released] {
            let (used, available) = state.flags();
            assert_eq!(ItemState::from_flags(used, available), state);
        }
        // The fourth flag combination collapses into Released.
        assert_eq!(ItemState::from_flags(true, true), ItemState::Released);
    }

    #[test]
    fn missing_flags_read_as_rentable() {
        assert_eq!(ItemState::from_row(&RowData::new()), ItemState::Rentable);
    }

    #[test]
    fn predicates_agree_with_transitions() {
        assert!(can_rent_item(false, true));
        assert!(!can_rent_item(false, false));
        assert!(!can_rent_item(true, false));
        assert!(can_release_item(false, false));
        assert!(!can_release_item(false, true));
        assert!(!can_release_item(true, false));
    }

    #[test]
    fn each_state_has_exactly_one_legal_edge() {
        assert_eq!(rent_transition(ItemState::Rentable), Ok(ItemState::Rented));
        assert_eq!(
            rent_transition(ItemState::Rented),
            Err(TransitionError::CurrentlyRented)
        );
        assert_eq!(
            rent_transition(ItemState::Released),
            Err(TransitionError::AlreadyUsed)
        );
        assert_eq!(
            release_transition(ItemState::Rented),
            Ok(ItemState::Released)
        );
        assert_eq!(
            release_transition(ItemState::Released),
            Err(TransitionError::AlreadyReleased)
        );
        assert_eq!(
            release_transition(ItemState::Rentable),
            Err(TransitionError::NotRented)
        );
    }
}
