//! Trip domain: participants, expenses, settlement, the local/remote expense
//! merge and the itinerary.
//!
//! Everything here is synchronous and free of I/O. Persistence and the cloud
//! copy live in the `cloud` crate.

pub use error::EngineError;
pub use expense::{
    Expense, ExpenseDraft, ExpenseMode, ExpenseSplit, PERSONAL_PAYER, format_expense_time,
    order_key, split_amounts,
};
pub use invite::InviteCode;
pub use itinerary::{Day, DayItem, Flight, FlightKind, ItemKind, Itinerary, TripConfig};
pub use merge::{MergeOutcome, merge_expenses, merge_expenses_at, normalize_remote};
pub use participants::Participants;
pub use settlement::{
    PersonTotals, SETTLEMENT_THRESHOLD, Settlement, Transfer, owed_by_person, paid_by_person,
    settle, settlement_plan,
};
pub use trip::{CloudLink, TripMeta};

mod error;
pub mod expense;
pub mod invite;
pub mod itinerary;
pub mod merge;
mod participants;
pub mod settlement;
mod trip;

pub type ResultEngine<T> = Result<T, EngineError>;
