//! # VowLock On-Ledger Contracts
//!
//! Core logic for the VowLock union registry. Three components make up the
//! system:
//!
//! - **Pairing Registry** — the single entry point for forming a union.
//!   Enforces global uniqueness of active pairings, instantiates one escrow
//!   per pairing, and requests a certificate mint for each.
//! - **Joint Escrow** — a per-pairing account holding a shared balance.
//!   Any movement of funds requires a proposal from one partner, an approval
//!   from the other, and a mandatory timelock before execution.
//! - **Certificate Issuer** — mints one soulbound certificate token per
//!   pairing, with a self-contained inline metadata document that never
//!   changes after mint.
//!
//! ## Design Principles
//!
//! 1. All monetary operations check for overflow — we use `checked_add` and
//!    `checked_sub` everywhere, because wrapping arithmetic and money do not
//!    mix.
//! 2. Every operation is all-or-nothing: it either completes in full or
//!    fails with a structured error and no observable state change.
//! 3. Effects before interactions: the one external call an operation may
//!    make (the outbound transfer in [`escrow::Escrow::execute`]) happens
//!    only after all internal state has reached its terminal form, so a
//!    reentrant call can never observe a half-updated request.
//! 4. Every public type is serializable (serde) for wire transport and
//!    persistent storage.

pub mod certificate;
pub mod config;
pub mod escrow;
pub mod ledger;
pub mod registry;
