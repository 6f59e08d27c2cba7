//! Local persistence and remote synchronization of trips.
//!
//! - [`LocalCache`]: per-trip JSON keys on disk plus the trip index
//! - [`DocumentStore`]: the remote collections, with [`SqlDocumentStore`] as
//!   the shipped implementation
//! - [`TripSession`]: an opened trip, merging remote snapshots through
//!   [`ExpenseMerger`] and pushing local changes through [`SyncScheduler`]

pub use cache::{CacheKind, LocalCache, TripIndex};
pub use collection::{CollectionKind, CollectionPath};
pub use documents::{Document, ExpenseDocument, RemoteTripConfig, TripDocument};
pub use error::CloudError;
pub use gate::{LocalUpdate, LocalUpdateGate, SyncState};
pub use merge::{ExpenseMerger, MergeReport};
pub use remote::{DocumentStore, Snapshot, Subscription, read_days, read_expenses};
pub use scheduler::{DEFAULT_DEBOUNCE, SyncScheduler, UploadOutcome, Uploader};
pub use session::{TripSession, TripState};
pub use store::SqlDocumentStore;
pub use trips::{create_trip, current_trip, delete_trip, join_trip, list_trips, select_trip};

mod cache;
mod collection;
pub mod documents;
mod error;
mod gate;
mod merge;
pub mod remote;
mod scheduler;
mod session;
pub mod store;
mod trips;

pub type ResultCloud<T> = Result<T, CloudError>;
