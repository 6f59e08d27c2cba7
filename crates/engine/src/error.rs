//! The module contains the errors the engine can throw.
//!
//! The errors are:
//!
//! - [`EmptyItem`] thrown when an expense draft has no description.
//! - [`InvalidAmount`] thrown when an amount cannot be used.
//! - [`InvalidDate`] thrown when a trip date cannot be parsed or a day
//!   cannot be removed.
//! - [`InvalidInviteCode`] thrown when an invite code is malformed.
//! - [`InvalidParticipant`] thrown when a participant name cannot be used.
//! - [`KeyNotFound`] thrown when an item is not found.
//! - [`ExistingKey`] thrown when an item is already present.
//!
//!  [`EmptyItem`]: EngineError::EmptyItem
//!  [`InvalidAmount`]: EngineError::InvalidAmount
//!  [`InvalidDate`]: EngineError::InvalidDate
//!  [`InvalidInviteCode`]: EngineError::InvalidInviteCode
//!  [`InvalidParticipant`]: EngineError::InvalidParticipant
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`ExistingKey`]: EngineError::ExistingKey
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Expense item must not be empty")]
    EmptyItem,
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("Invalid invite code: {0}")]
    InvalidInviteCode(String),
    #[error("Invalid participant: {0}")]
    InvalidParticipant(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
}
