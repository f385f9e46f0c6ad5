//! # Pairing Registry Contract
//!
//! The single entry point for forming a union. On each creation request the
//! registry checks that neither party is already in an active pairing,
//! instantiates a fresh [`Escrow`] seeded with the initial deposit, requests
//! a certificate mint from its [`CertificateIssuer`], and appends an
//! immutable record.
//!
//! After creation the registry steps aside: escrow operations are invoked
//! directly against the escrow instance (see [`Registry::escrow_mut`]), and
//! the registry is consulted only for uniqueness checks and listing.
//!
//! ## Record Store
//!
//! The record sequence is append-only and index-stable — records are never
//! mutated or deleted. A side index maps each identity to the record
//! indices it participates in, so [`Registry::is_already_married`] scans
//! only that identity's own pairings, not the whole registry.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use std::collections::HashMap;

use crate::certificate::{CertificateError, CertificateIssuer, TokenId};
use crate::config;
use crate::escrow::{Escrow, EscrowError};
use crate::ledger::{Address, Timestamp};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A party was the null identity.
    #[error("invalid address: the null identity cannot enter a pairing")]
    InvalidAddress,

    /// The caller is neither of the named parties.
    #[error("caller {caller} is neither of the pairing's parties")]
    NotAPartner {
        /// The identity that attempted the creation.
        caller: Address,
    },

    /// The named party already has an active pairing.
    #[error("{party} is already in an active pairing")]
    AlreadyMarried {
        /// The offending party.
        party: Address,
    },

    /// No escrow is registered at the given address.
    #[error("no escrow registered at address {0}")]
    UnknownEscrow(Address),

    /// Escrow creation failed (e.g. equal parties).
    #[error(transparent)]
    Escrow(#[from] EscrowError),

    /// Certificate mint failed.
    #[error(transparent)]
    Certificate(#[from] CertificateError),
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One immutable registry record, appended at pairing creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingRecord {
    /// Address of the pairing's escrow.
    pub escrow_address: Address,
    /// First partner identity.
    pub party_a: Address,
    /// Second partner identity.
    pub party_b: Address,
    /// Free-text label for the first partner.
    pub label_1: String,
    /// Free-text label for the second partner.
    pub label_2: String,
    /// Ledger time of creation.
    pub created_at: Timestamp,
    /// The certificate minted for this pairing.
    pub certificate_id: TokenId,
}

/// Notifications appended by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RegistryEvent {
    /// A new pairing was created and recorded.
    #[serde(rename = "pairing_created")]
    PairingCreated {
        escrow_address: Address,
        party_a: Address,
        party_b: Address,
        index: u64,
        certificate_id: TokenId,
    },
}

/// Receipt returned by a successful [`Registry::create_pairing`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingReceipt {
    /// Address of the newly created escrow.
    pub escrow_address: Address,
    /// Index of the appended record.
    pub index: u64,
    /// Id of the minted certificate.
    pub certificate_id: TokenId,
}

/// The pairing registry — owns the record store, the per-identity index,
/// every escrow it has created, and the certificate issuer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registry {
    /// The registry's own ledger address; the issuer's authorized caller.
    address: Address,
    /// The certificate issuer, constructed alongside the registry.
    issuer: CertificateIssuer,
    /// Strongly-typed handle per escrow, keyed by escrow address.
    escrows: HashMap<Address, Escrow>,
    /// Append-only, index-stable record sequence.
    records: Vec<PairingRecord>,
    /// Identity → record indices it participates in.
    partner_index: HashMap<Address, Vec<usize>>,
    /// Append-only notification log.
    events: Vec<RegistryEvent>,
    /// Timelock forwarded to every escrow at creation.
    timelock_secs: u64,
}

impl Registry {
    /// Creates an empty registry using the system default timelock.
    pub fn new() -> Self {
        Self::with_timelock(config::WITHDRAWAL_TIMELOCK_SECS)
    }

    /// Creates an empty registry with an explicit timelock. The value is
    /// system-level: shared by every escrow this registry ever creates.
    pub fn with_timelock(timelock_secs: u64) -> Self {
        let address = Address::generate();
        Self {
            issuer: CertificateIssuer::new(address.clone()),
            address,
            escrows: HashMap::new(),
            records: Vec::new(),
            partner_index: HashMap::new(),
            events: Vec::new(),
            timelock_secs,
        }
    }

    /// Creates a new pairing: validates uniqueness, instantiates the
    /// escrow seeded with `initial_deposit`, mints the certificate, and
    /// appends the record.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidAddress`] for a null party,
    /// [`RegistryError::NotAPartner`] when the caller is neither party,
    /// [`RegistryError::AlreadyMarried`] naming the offending party, and
    /// propagates [`EscrowError::InvalidDestination`] for equal parties.
    #[allow(clippy::too_many_arguments)]
    pub fn create_pairing(
        &mut self,
        caller: &Address,
        label_1: &str,
        label_2: &str,
        party_a: &Address,
        party_b: &Address,
        initial_deposit: u64,
        now: Timestamp,
    ) -> Result<PairingReceipt, RegistryError> {
        if party_a.is_zero() || party_b.is_zero() {
            return Err(RegistryError::InvalidAddress);
        }
        if caller != party_a && caller != party_b {
            return Err(RegistryError::NotAPartner {
                caller: caller.clone(),
            });
        }
        if self.is_already_married(party_a) {
            return Err(RegistryError::AlreadyMarried {
                party: party_a.clone(),
            });
        }
        if self.is_already_married(party_b) {
            return Err(RegistryError::AlreadyMarried {
                party: party_b.clone(),
            });
        }

        let escrow = Escrow::create(
            party_a.clone(),
            party_b.clone(),
            initial_deposit,
            self.timelock_secs,
        )?;
        let escrow_address = escrow.address().clone();

        let registry_address = self.address.clone();
        let certificate_id = self.issuer.mint(
            &registry_address,
            &escrow_address,
            label_1,
            label_2,
            now,
        )?;

        let index = self.records.len();
        self.records.push(PairingRecord {
            escrow_address: escrow_address.clone(),
            party_a: party_a.clone(),
            party_b: party_b.clone(),
            label_1: label_1.to_string(),
            label_2: label_2.to_string(),
            created_at: now,
            certificate_id,
        });
        self.partner_index
            .entry(party_a.clone())
            .or_default()
            .push(index);
        self.partner_index
            .entry(party_b.clone())
            .or_default()
            .push(index);
        self.escrows.insert(escrow_address.clone(), escrow);

        self.events.push(RegistryEvent::PairingCreated {
            escrow_address: escrow_address.clone(),
            party_a: party_a.clone(),
            party_b: party_b.clone(),
            index: index as u64,
            certificate_id,
        });

        tracing::info!(
            escrow = %escrow_address,
            party_a = %party_a,
            party_b = %party_b,
            index,
            certificate_id,
            "pairing created"
        );

        Ok(PairingReceipt {
            escrow_address,
            index: index as u64,
            certificate_id,
        })
    }

    /// Returns `true` if `identity` participates in any pairing whose
    /// escrow still reports itself active.
    ///
    /// Scans only the identity's own recorded indices — O(that identity's
    /// pairings), not O(registry size).
    pub fn is_already_married(&self, identity: &Address) -> bool {
        let Some(indices) = self.partner_index.get(identity) else {
            return false;
        };
        indices.iter().any(|&index| {
            self.records
                .get(index)
                .and_then(|record| self.escrows.get(&record.escrow_address))
                .is_some_and(Escrow::is_active)
        })
    }

    /// All records, in append order.
    pub fn list_all(&self) -> &[PairingRecord] {
        &self.records
    }

    /// The records `identity` participates in, in append order.
    pub fn list_by_partner(&self, identity: &Address) -> Vec<&PairingRecord> {
        self.partner_index
            .get(identity)
            .map(|indices| {
                indices
                    .iter()
                    .filter_map(|&index| self.records.get(index))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Read access to an escrow instance by address.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownEscrow`] for unregistered addresses.
    pub fn escrow(&self, address: &Address) -> Result<&Escrow, RegistryError> {
        self.escrows
            .get(address)
            .ok_or_else(|| RegistryError::UnknownEscrow(address.clone()))
    }

    /// Mutable access to an escrow instance by address. This is how the
    /// propose/approve/execute/dissolve protocol is invoked — directly
    /// against the escrow, bypassing registry logic.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownEscrow`] for unregistered addresses.
    pub fn escrow_mut(&mut self, address: &Address) -> Result<&mut Escrow, RegistryError> {
        self.escrows
            .get_mut(address)
            .ok_or_else(|| RegistryError::UnknownEscrow(address.clone()))
    }

    /// Read access to the certificate issuer.
    pub fn issuer(&self) -> &CertificateIssuer {
        &self.issuer
    }

    /// The registry's own ledger address.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// The append-only notification log.
    pub fn events(&self) -> &[RegistryEvent] {
        &self.events
    }

    /// Number of records appended so far.
    pub fn record_count(&self) -> usize {
        self.records.len()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
