//! The module contains the errors the engine can throw.
//!
//! The errors are:
//!
//! - [`InvalidAmount`] and [`InvalidTransaction`] when an input fails
//!   validation; nothing is persisted.
//! - [`Locked`] when a settled transaction is deleted (or its amount edited)
//!   before its owning settlement is removed.
//! - [`KeyNotFound`] when an account or transaction is not in the ledger.
//! - [`Store`] and [`Database`] when the ledger store rejects a write.
//!
//!  [`InvalidAmount`]: EngineError::InvalidAmount
//!  [`InvalidTransaction`]: EngineError::InvalidTransaction
//!  [`Locked`]: EngineError::Locked
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`Store`]: EngineError::Store
//!  [`Database`]: EngineError::Database
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),
    #[error("transaction {0} is locked by a settlement, delete the settlement first")]
    Locked(Uuid),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("Store error: {0}")]
    Store(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    /// `true` for failures raised by the ledger store rather than by the
    /// engine's own checks.
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Database(_))
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidTransaction(a), Self::InvalidTransaction(b)) => a == b,
            (Self::Locked(a), Self::Locked(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::Store(a), Self::Store(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
