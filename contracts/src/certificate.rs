//! # Certificate Issuer Contract
//!
//! Mints one soulbound certificate token per pairing. Ownership is assigned
//! exactly once, at mint time, to the pairing's escrow address — after that
//! no transfer, and no approval for transfer, can ever succeed. There is no
//! burn either: a certificate, once issued, exists forever.
//!
//! ## Metadata Model
//!
//! Each token carries a self-contained JSON metadata document, generated at
//! mint time and stored permanently. The document is embedded inline as a
//! `data:application/json;base64,` URI so consumers can decode it without
//! any network fetch. Construction is fully deterministic — the same token
//! id, labels, and union timestamp always produce byte-identical output.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::config;
use crate::ledger::{Address, Timestamp};

/// Sequential certificate token identifier, starting at 0.
pub type TokenId = u64;

/// Marker prefixed to the encoded metadata document.
pub const METADATA_URI_PREFIX: &str = "data:application/json;base64,";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during certificate operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CertificateError {
    /// Only the registry recorded at construction may mint.
    #[error("unauthorized mint: {caller} is not the registry")]
    OnlyRegistry {
        /// The identity that attempted the mint.
        caller: Address,
    },

    /// The referenced token has never been minted.
    #[error("certificate {0} does not exist")]
    UnknownToken(TokenId),

    /// Ownership of a minted certificate can never change.
    #[error("certificate {token} is soulbound: ownership is fixed at mint")]
    Soulbound {
        /// The token whose transfer was attempted.
        token: TokenId,
    },
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// One entry in the metadata attribute list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateAttribute {
    /// Attribute name ("Partner 1", "Partner 2", "Union Date").
    pub trait_type: String,
    /// Attribute value, always a string.
    pub value: String,
}

/// The self-describing metadata document attached to a certificate.
///
/// Field order is fixed by the struct definition, which is what makes the
/// serialized form byte-reproducible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateMetadata {
    /// Display name, carrying the token id.
    pub name: String,
    /// Human-readable description interpolating both partner labels.
    pub description: String,
    /// Shared artwork reference, identical for all tokens.
    pub image: String,
    /// Exactly three entries: both partners and the union date.
    pub attributes: Vec<CertificateAttribute>,
}

impl CertificateMetadata {
    /// Builds the metadata document for a token. Pure function of its
    /// inputs — no clock reads, no random ids.
    pub fn build(token: TokenId, label_1: &str, label_2: &str, union_timestamp: Timestamp) -> Self {
        Self {
            name: format!("VowLock Certificate #{token}"),
            description: format!(
                "This certificate records the union of {label_1} and {label_2}."
            ),
            image: config::CERTIFICATE_IMAGE_URI.to_string(),
            attributes: vec![
                CertificateAttribute {
                    trait_type: "Partner 1".into(),
                    value: label_1.into(),
                },
                CertificateAttribute {
                    trait_type: "Partner 2".into(),
                    value: label_2.into(),
                },
                CertificateAttribute {
                    trait_type: "Union Date".into(),
                    value: union_timestamp.to_string(),
                },
            ],
        }
    }

    /// Encodes the document as an inline `data:` URI.
    pub fn encode(&self) -> String {
        let json = serde_json::to_string(self).expect("certificate metadata always serializes");
        format!("{METADATA_URI_PREFIX}{}", BASE64.encode(json))
    }
}

// ---------------------------------------------------------------------------
// Issuer
// ---------------------------------------------------------------------------

/// The certificate issuer — mints and permanently immobilizes certificate
/// tokens. Constructed once, by the registry, with the registry's own
/// address as the sole authorized mint caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateIssuer {
    /// The only identity allowed to mint.
    registry: Address,
    /// Next id to assign. Doubles as the count of minted tokens.
    next_id: TokenId,
    /// Token ownership, written once per token at mint.
    owners: HashMap<TokenId, Address>,
    /// Encoded metadata documents, written once per token at mint.
    token_uris: HashMap<TokenId, String>,
}

impl CertificateIssuer {
    /// Creates an issuer that accepts mints only from `registry`.
    pub fn new(registry: Address) -> Self {
        Self {
            registry,
            next_id: 0,
            owners: HashMap::new(),
            token_uris: HashMap::new(),
        }
    }

    /// Mints the next certificate, assigning ownership to `owner` (the
    /// pairing's escrow address) and permanently attaching the metadata
    /// document built from the labels and the union timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`CertificateError::OnlyRegistry`] for any caller other
    /// than the registry recorded at construction.
    pub fn mint(
        &mut self,
        caller: &Address,
        owner: &Address,
        label_1: &str,
        label_2: &str,
        union_timestamp: Timestamp,
    ) -> Result<TokenId, CertificateError> {
        if *caller != self.registry {
            return Err(CertificateError::OnlyRegistry {
                caller: caller.clone(),
            });
        }

        let token = self.next_id;
        self.next_id += 1;

        let metadata = CertificateMetadata::build(token, label_1, label_2, union_timestamp);
        self.owners.insert(token, owner.clone());
        self.token_uris.insert(token, metadata.encode());

        tracing::info!(token, owner = %owner, "certificate minted");
        Ok(token)
    }

    /// Any ownership change after mint fails. Always.
    ///
    /// # Errors
    ///
    /// Returns [`CertificateError::UnknownToken`] for unminted ids,
    /// otherwise [`CertificateError::Soulbound`].
    pub fn transfer(&mut self, token: TokenId, _to: &Address) -> Result<(), CertificateError> {
        if !self.owners.contains_key(&token) {
            return Err(CertificateError::UnknownToken(token));
        }
        Err(CertificateError::Soulbound { token })
    }

    /// Approvals for transfer are refused for the same reason transfers
    /// are: there is nothing an operator could ever be allowed to move.
    ///
    /// # Errors
    ///
    /// Returns [`CertificateError::UnknownToken`] for unminted ids,
    /// otherwise [`CertificateError::Soulbound`].
    pub fn approve_transfer(
        &mut self,
        token: TokenId,
        _operator: &Address,
    ) -> Result<(), CertificateError> {
        if !self.owners.contains_key(&token) {
            return Err(CertificateError::UnknownToken(token));
        }
        Err(CertificateError::Soulbound { token })
    }

    /// Returns the permanent owner of a token.
    ///
    /// # Errors
    ///
    /// Returns [`CertificateError::UnknownToken`] for unminted ids.
    pub fn owner_of(&self, token: TokenId) -> Result<&Address, CertificateError> {
        self.owners
            .get(&token)
            .ok_or(CertificateError::UnknownToken(token))
    }

    /// Returns the inline metadata URI attached at mint time.
    ///
    /// # Errors
    ///
    /// Returns [`CertificateError::UnknownToken`] for unminted ids.
    pub fn token_uri(&self, token: TokenId) -> Result<&str, CertificateError> {
        self.token_uris
            .get(&token)
            .map(String::as_str)
            .ok_or(CertificateError::UnknownToken(token))
    }

    /// Number of certificates minted so far.
    pub fn total_minted(&self) -> u64 {
        self.next_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> (CertificateIssuer, Address) {
        let registry = Address::generate();
        (CertificateIssuer::new(registry.clone()), registry)
    }

    #[test]
    fn mint_assigns_sequential_ids_from_zero() {
        let (mut issuer, registry) = issuer();
        let owner = Address::generate();

        let first = issuer.mint(&registry, &owner, "Alice", "Bob", 1_700_000_000).unwrap();
        let second = issuer.mint(&registry, &owner, "Carol", "Dave", 1_700_000_001).unwrap();

        assert_eq!(first, 0);
        assert_eq!(second, 1);
        assert_eq!(issuer.total_minted(), 2);
    }

    #[test]
    fn mint_by_non_registry_rejected() {
        let (mut issuer, _registry) = issuer();
        let result = issuer.mint(&"mallory".into(), &Address::generate(), "A", "B", 0);
        assert!(matches!(result, Err(CertificateError::OnlyRegistry { .. })));
        assert_eq!(issuer.total_minted(), 0);
    }

    #[test]
    fn owner_is_fixed_at_mint() {
        let (mut issuer, registry) = issuer();
        let escrow = Address::generate();
        let token = issuer.mint(&registry, &escrow, "Alice", "Bob", 0).unwrap();
        assert_eq!(issuer.owner_of(token).unwrap(), &escrow);
    }

    #[test]
    fn transfer_always_soulbound() {
        let (mut issuer, registry) = issuer();
        let token = issuer.mint(&registry, &Address::generate(), "Alice", "Bob", 0).unwrap();

        assert_eq!(
            issuer.transfer(token, &"mallory".into()).unwrap_err(),
            CertificateError::Soulbound { token }
        );
        // Even the registry itself cannot move a minted token.
        assert_eq!(
            issuer.transfer(token, &registry).unwrap_err(),
            CertificateError::Soulbound { token }
        );
    }

    #[test]
    fn approval_for_transfer_soulbound() {
        let (mut issuer, registry) = issuer();
        let token = issuer.mint(&registry, &Address::generate(), "Alice", "Bob", 0).unwrap();
        assert_eq!(
            issuer.approve_transfer(token, &"operator".into()).unwrap_err(),
            CertificateError::Soulbound { token }
        );
    }

    #[test]
    fn unknown_token_reported() {
        let (mut issuer, _registry) = issuer();
        assert_eq!(
            issuer.transfer(9, &"x".into()).unwrap_err(),
            CertificateError::UnknownToken(9)
        );
        assert_eq!(issuer.owner_of(9).unwrap_err(), CertificateError::UnknownToken(9));
        assert_eq!(issuer.token_uri(9).unwrap_err(), CertificateError::UnknownToken(9));
    }

    #[test]
    fn metadata_is_byte_reproducible_across_instances() {
        let (mut first, first_registry) = issuer();
        let (mut second, second_registry) = issuer();

        let a = first.mint(&first_registry, &Address::generate(), "Alice", "Bob", 1_700_000_000).unwrap();
        let b = second.mint(&second_registry, &Address::generate(), "Alice", "Bob", 1_700_000_000).unwrap();

        assert_eq!(first.token_uri(a).unwrap(), second.token_uri(b).unwrap());
    }

    #[test]
    fn metadata_decodes_to_expected_document() {
        let metadata = CertificateMetadata::build(0, "Alice", "Bob", 1_700_000_000);
        let uri = metadata.encode();

        let encoded = uri.strip_prefix(METADATA_URI_PREFIX).unwrap();
        let decoded = BASE64.decode(encoded).unwrap();
        let parsed: CertificateMetadata = serde_json::from_slice(&decoded).unwrap();

        assert_eq!(parsed, metadata);
        assert_eq!(parsed.attributes.len(), 3);
        assert_eq!(parsed.attributes[0].trait_type, "Partner 1");
        assert_eq!(parsed.attributes[0].value, "Alice");
        assert_eq!(parsed.attributes[1].value, "Bob");
        assert_eq!(parsed.attributes[2].trait_type, "Union Date");
        assert_eq!(parsed.attributes[2].value, "1700000000");
        assert!(parsed.description.contains("Alice"));
        assert!(parsed.description.contains("Bob"));
        assert_eq!(parsed.image, crate::config::CERTIFICATE_IMAGE_URI);
    }

    #[test]
    fn metadata_differs_when_inputs_differ() {
        let a = CertificateMetadata::build(0, "Alice", "Bob", 1_700_000_000).encode();
        let b = CertificateMetadata::build(0, "Alice", "Bob", 1_700_000_001).encode();
        assert_ne!(a, b);
    }
}
