//! Commerce lifecycle engine for dyntable.
//!
//! Encodes the rent-item state machine explicitly (`Rentable` → `Rented` →
//! `Released`, no way back) and the sale quantity counter, and performs each
//! transition as one store transaction: legality check under a row lock,
//! per-year sequence allocation, ledger entry with a frozen snapshot, row
//! state update, inventory append.

pub mod engine;
pub mod errors;
pub mod state;

pub use engine::{
    Availability, CommerceEngine, RentRequest, RentalUpdate, SaleRequest, SaleUpdate,
};
pub use errors::{CommerceError, Result};
pub use state::{
    ItemState, TransitionError, can_release_item, can_rent_item, release_transition,
    rent_transition,
};
