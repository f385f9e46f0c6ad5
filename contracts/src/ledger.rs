//! # Ledger Environment Primitives
//!
//! The types the contracts share with their enclosing ledger: identities
//! ([`Address`]), ledger time ([`Timestamp`]), and the outbound transfer
//! boundary ([`TransferSink`]).
//!
//! The execution model is a globally serialized ledger: every mutating
//! operation runs to completion as an indivisible step, and clock readings
//! are supplied by the caller once per operation — the contracts never read
//! a wall clock themselves. The only external call a contract makes is the
//! outbound transfer at the end of a withdrawal execution, and that call
//! goes through the [`TransferSink`] trait so tests can inject failures and
//! reentrant callers without a real payment rail.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::escrow::Escrow;

/// Ledger time in seconds since the Unix epoch. Supplied by the enclosing
/// environment once per mutating operation, never cached across operations.
pub type Timestamp = u64;

// ---------------------------------------------------------------------------
// Addresses
// ---------------------------------------------------------------------------

/// An on-ledger identity: a human party, an escrow instance, the registry,
/// or a withdrawal destination.
///
/// Freshly assigned component addresses are UUIDs; the zero address (the
/// nil UUID) is reserved and never a valid party or destination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Wraps an existing identity string.
    pub fn new(id: impl Into<String>) -> Self {
        Address(id.into())
    }

    /// Assigns a fresh, unique address for a newly created component.
    pub fn generate() -> Self {
        Address(Uuid::new_v4().to_string())
    }

    /// The reserved null identity.
    pub fn zero() -> Self {
        Address(Uuid::nil().to_string())
    }

    /// Returns `true` for the reserved null identity.
    pub fn is_zero(&self) -> bool {
        self.0 == Uuid::nil().to_string()
    }

    /// The identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(id: &str) -> Self {
        Address(id.to_string())
    }
}

// ---------------------------------------------------------------------------
// Outbound Transfers
// ---------------------------------------------------------------------------

/// Failure of an outbound native-currency transfer.
///
/// The one external condition the contracts cannot correct: the escrow
/// responds by rolling back the entire execution step, so the caller can
/// retry later with no cleanup.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("transfer of {amount} to {to} failed: {reason}")]
pub struct TransferError {
    /// The intended recipient.
    pub to: Address,
    /// The amount that failed to move.
    pub amount: u64,
    /// Sink-specific failure description.
    pub reason: String,
}

/// Destination-side of a withdrawal execution.
///
/// The escrow hands itself to the sink alongside the payment instruction.
/// That mirrors the ledger's actual hazard: the transfer is an external
/// call that can transitively re-enter the escrow before the operation
/// finishes. A well-behaved sink ignores the handle; a test sink can use it
/// to re-invoke escrow operations mid-transfer and check what they observe.
pub trait TransferSink {
    /// Delivers `amount` to `to`. An `Err` causes the calling escrow to
    /// roll back the entire execution atomically.
    fn transfer(
        &mut self,
        escrow: &mut Escrow,
        to: &Address,
        amount: u64,
    ) -> Result<(), TransferError>;
}

/// In-memory native-currency account book — the default [`TransferSink`].
///
/// Holds one balance per address. Tests use it to assert balance
/// conservation: funds leaving an escrow land here, to the unit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerBook {
    accounts: HashMap<Address, u64>,
}

impl LedgerBook {
    /// Creates an empty account book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits `amount` to `account`, failing on overflow.
    pub fn credit(&mut self, account: &Address, amount: u64) -> Result<(), TransferError> {
        let balance = self.accounts.entry(account.clone()).or_insert(0);
        *balance = balance.checked_add(amount).ok_or_else(|| TransferError {
            to: account.clone(),
            amount,
            reason: "balance overflow".into(),
        })?;
        Ok(())
    }

    /// Returns the balance of `account`, or 0 if it has never been credited.
    pub fn balance_of(&self, account: &Address) -> u64 {
        self.accounts.get(account).copied().unwrap_or(0)
    }
}

impl TransferSink for LedgerBook {
    fn transfer(
        &mut self,
        _escrow: &mut Escrow,
        to: &Address,
        amount: u64,
    ) -> Result<(), TransferError> {
        self.credit(to, amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_addresses_are_unique() {
        let a = Address::generate();
        let b = Address::generate();
        assert_ne!(a, b);
        assert!(!a.is_zero());
    }

    #[test]
    fn zero_address_is_recognized() {
        assert!(Address::zero().is_zero());
        assert!(!Address::new("alice").is_zero());
    }

    #[test]
    fn address_serializes_as_plain_string() {
        let json = serde_json::to_string(&Address::new("alice")).unwrap();
        assert_eq!(json, "\"alice\"");
    }

    #[test]
    fn book_credits_accumulate() {
        let mut book = LedgerBook::new();
        let carol = Address::new("carol");
        book.credit(&carol, 40).unwrap();
        book.credit(&carol, 2).unwrap();
        assert_eq!(book.balance_of(&carol), 42);
    }

    #[test]
    fn book_unknown_account_is_zero() {
        let book = LedgerBook::new();
        assert_eq!(book.balance_of(&Address::new("nobody")), 0);
    }

    #[test]
    fn book_credit_overflow_rejected() {
        let mut book = LedgerBook::new();
        let carol = Address::new("carol");
        book.credit(&carol, u64::MAX).unwrap();
        assert!(book.credit(&carol, 1).is_err());
    }
}
