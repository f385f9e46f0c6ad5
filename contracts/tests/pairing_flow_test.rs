//! Integration tests for the pairing lifecycle.
//!
//! These tests exercise the full system across module boundaries: registry
//! creation, the joint withdrawal protocol against a live account book,
//! dissolution and remarriage, and the certificate issued per pairing.

use vowlock_contracts::certificate::CertificateError;
use vowlock_contracts::escrow::EscrowError;
use vowlock_contracts::ledger::{Address, LedgerBook};
use vowlock_contracts::registry::{Registry, RegistryError};

const TIMELOCK: u64 = 172_800;
const T0: u64 = 1_700_000_000;

fn addr(id: &str) -> Address {
    Address::new(id)
}

// ---------------------------------------------------------------------------
// The canonical scenario
// ---------------------------------------------------------------------------

/// Create pairing (alice, bob, deposit 100); alice proposes withdraw(40,
/// carol); bob approves; execution fails until the timelock elapses, then
/// succeeds exactly once.
#[test]
fn full_withdrawal_flow() {
    let mut registry = Registry::with_timelock(TIMELOCK);
    let mut book = LedgerBook::new();

    let receipt = registry
        .create_pairing(&addr("alice"), "Alice", "Bob", &addr("alice"), &addr("bob"), 100, T0)
        .unwrap();

    let escrow = registry.escrow_mut(&receipt.escrow_address).unwrap();
    escrow.propose(&addr("alice"), 40, &addr("carol"), T0).unwrap();
    escrow.approve(&addr("bob")).unwrap();

    // One second early: exact remaining wait is reported.
    let early = escrow.execute(T0 + TIMELOCK - 1, &mut book);
    assert_eq!(
        early.unwrap_err(),
        EscrowError::TimelockActive { remaining_secs: 1 }
    );
    assert_eq!(escrow.balance(), 100);
    assert_eq!(book.balance_of(&addr("carol")), 0);

    // At exactly the timelock: funds move, conserved to the unit.
    let executed = escrow.execute(T0 + TIMELOCK, &mut book).unwrap();
    assert_eq!(executed.amount, 40);
    assert_eq!(executed.destination, addr("carol"));
    assert_eq!(escrow.balance(), 60);
    assert_eq!(book.balance_of(&addr("carol")), 40);

    // A second execution never moves funds twice.
    assert_eq!(
        escrow.execute(T0 + TIMELOCK + 1, &mut book).unwrap_err(),
        EscrowError::AlreadyExecuted
    );
    assert_eq!(escrow.balance(), 60);
    assert_eq!(book.balance_of(&addr("carol")), 40);
}

/// Execution is permissionless by design: it carries no caller identity at
/// all, so a third party (the destination, say) can push an approved,
/// matured withdrawal through without either partner staying responsive.
#[test]
fn execution_needs_no_partner() {
    let mut registry = Registry::with_timelock(TIMELOCK);
    let mut book = LedgerBook::new();

    let receipt = registry
        .create_pairing(&addr("bob"), "Alice", "Bob", &addr("alice"), &addr("bob"), 50, T0)
        .unwrap();
    let escrow = registry.escrow_mut(&receipt.escrow_address).unwrap();

    escrow.propose(&addr("bob"), 50, &addr("carol"), T0).unwrap();
    escrow.approve(&addr("alice")).unwrap();

    // Outsiders cannot propose or approve...
    assert!(matches!(
        escrow.propose(&addr("carol"), 1, &addr("carol"), T0),
        Err(EscrowError::NotAPartner { .. })
    ));
    assert!(matches!(
        escrow.approve(&addr("carol")),
        Err(EscrowError::NotAPartner { .. })
    ));

    // ...but execution has no gate beyond the protocol's own preconditions.
    escrow.execute(T0 + TIMELOCK, &mut book).unwrap();
    assert_eq!(book.balance_of(&addr("carol")), 50);
}

// ---------------------------------------------------------------------------
// Self-approval
// ---------------------------------------------------------------------------

#[test]
fn self_approval_impossible_for_either_partner() {
    let mut registry = Registry::with_timelock(TIMELOCK);
    let receipt = registry
        .create_pairing(&addr("alice"), "Alice", "Bob", &addr("alice"), &addr("bob"), 100, T0)
        .unwrap();
    let escrow = registry.escrow_mut(&receipt.escrow_address).unwrap();

    escrow.propose(&addr("alice"), 10, &addr("carol"), T0).unwrap();
    assert_eq!(
        escrow.approve(&addr("alice")).unwrap_err(),
        EscrowError::CannotApproveSelf
    );

    // The rule follows the recorded proposer, not a fixed partner slot.
    escrow.propose(&addr("bob"), 10, &addr("carol"), T0).unwrap();
    assert_eq!(
        escrow.approve(&addr("bob")).unwrap_err(),
        EscrowError::CannotApproveSelf
    );
    escrow.approve(&addr("alice")).unwrap();
}

// ---------------------------------------------------------------------------
// Dissolution and remarriage
// ---------------------------------------------------------------------------

#[test]
fn remarriage_requires_dissolution_first() {
    let mut registry = Registry::with_timelock(TIMELOCK);
    let first = registry
        .create_pairing(&addr("alice"), "Alice", "Bob", &addr("alice"), &addr("bob"), 0, T0)
        .unwrap();

    // Alice tries to pair with Dave while still married to Bob.
    let blocked = registry.create_pairing(
        &addr("alice"),
        "Alice",
        "Dave",
        &addr("alice"),
        &addr("dave"),
        0,
        T0 + 1,
    );
    assert_eq!(
        blocked.unwrap_err(),
        RegistryError::AlreadyMarried {
            party: addr("alice")
        }
    );

    registry
        .escrow_mut(&first.escrow_address)
        .unwrap()
        .dissolve(&addr("alice"))
        .unwrap();

    let second = registry
        .create_pairing(
            &addr("alice"),
            "Alice",
            "Dave",
            &addr("alice"),
            &addr("dave"),
            0,
            T0 + 2,
        )
        .unwrap();
    assert_eq!(second.index, 1);
    assert_eq!(second.certificate_id, 1);

    // Both records remain listed for alice; only one is active.
    assert_eq!(registry.list_by_partner(&addr("alice")).len(), 2);
    assert!(registry.is_already_married(&addr("alice")));
    assert!(!registry.is_already_married(&addr("bob")));
}

#[test]
fn dissolved_escrow_still_releases_funds() {
    let mut registry = Registry::with_timelock(TIMELOCK);
    let mut book = LedgerBook::new();
    let receipt = registry
        .create_pairing(&addr("alice"), "Alice", "Bob", &addr("alice"), &addr("bob"), 80, T0)
        .unwrap();
    let escrow = registry.escrow_mut(&receipt.escrow_address).unwrap();

    escrow.dissolve(&addr("bob")).unwrap();

    // Deposits and the withdrawal protocol keep working after dissolution.
    escrow.deposit(&addr("carol"), 20).unwrap();
    escrow.propose(&addr("alice"), 100, &addr("alice"), T0).unwrap();
    escrow.approve(&addr("bob")).unwrap();
    escrow.execute(T0 + TIMELOCK, &mut book).unwrap();

    assert_eq!(escrow.balance(), 0);
    assert_eq!(book.balance_of(&addr("alice")), 100);
}

// ---------------------------------------------------------------------------
// Certificates
// ---------------------------------------------------------------------------

#[test]
fn each_pairing_gets_a_soulbound_certificate() {
    let mut registry = Registry::with_timelock(TIMELOCK);
    let receipt = registry
        .create_pairing(&addr("alice"), "Alice", "Bob", &addr("alice"), &addr("bob"), 0, T0)
        .unwrap();

    let issuer = registry.issuer();
    assert_eq!(issuer.total_minted(), 1);
    assert_eq!(
        issuer.owner_of(receipt.certificate_id).unwrap(),
        &receipt.escrow_address
    );

    let uri = issuer.token_uri(receipt.certificate_id).unwrap();
    assert!(uri.starts_with("data:application/json;base64,"));

    // The record and the registry agree on the certificate id.
    assert_eq!(registry.list_all()[0].certificate_id, receipt.certificate_id);
}

#[test]
fn certificate_never_leaves_escrow_even_after_dissolution() {
    let mut registry = Registry::with_timelock(TIMELOCK);
    let receipt = registry
        .create_pairing(&addr("alice"), "Alice", "Bob", &addr("alice"), &addr("bob"), 0, T0)
        .unwrap();
    registry
        .escrow_mut(&receipt.escrow_address)
        .unwrap()
        .dissolve(&addr("alice"))
        .unwrap();

    // Dissolution does not unlock the certificate. Nothing does.
    let mut issuer = registry.issuer().clone();
    assert_eq!(
        issuer
            .transfer(receipt.certificate_id, &addr("alice"))
            .unwrap_err(),
        CertificateError::Soulbound {
            token: receipt.certificate_id
        }
    );
}
