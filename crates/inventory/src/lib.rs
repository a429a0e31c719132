//! Inventory domain module.
//!
//! This crate contains the per-product stock ledger and its state machine,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no
//! storage). Clock values are always passed in by callers.

pub mod availability;
pub mod movement;
pub mod record;
pub mod reservation;

pub use availability::Availability;
pub use movement::{Movement, MovementType};
pub use record::{ConfirmOutcome, InventoryRecord, ReleaseOutcome, ReserveOutcome};
pub use reservation::{Reservation, ReservationStatus};
