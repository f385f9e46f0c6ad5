//! # Joint Escrow Contract
//!
//! One escrow per pairing, created by the registry and never destroyed.
//! The escrow holds a single native-currency balance shared by two fixed
//! partners, and releases funds only through a three-step protocol:
//!
//! 1. **Propose** — one partner names an amount and a destination.
//! 2. **Approve** — the *other* partner co-signs. The proposer is recorded
//!    inside the request, which makes self-approval structurally
//!    impossible rather than a matter of call ordering.
//! 3. **Execute** — anyone may trigger the payout once the timelock has
//!    elapsed. Execution is mechanical: every precondition is already
//!    locked in, so a third party (the destination itself, say) can nudge
//!    the transfer through without either partner staying responsive.
//!
//! Orthogonally, either partner can **dissolve** the pairing at any time.
//! Dissolution is one-way and purely a status flag — the balance stays put
//! and the withdrawal protocol keeps working, so stranded funds can always
//! be recovered.
//!
//! ## Reentrancy
//!
//! The outbound transfer in [`Escrow::execute`] is the only external call
//! in the system. The escrow closes the request, debits the balance, and
//! records the executed notification *before* invoking the sink, so any
//! reentrant call sees a fully-closed request. If the sink fails, the whole
//! step is rolled back and reported as [`EscrowError::TransferFailed`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ledger::{Address, Timestamp, TransferError, TransferSink};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during escrow operations.
///
/// Every variant carries the contextual values the caller needs to correct
/// the input and resubmit — there is no fatal class here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EscrowError {
    /// The caller is not one of the two recorded partners.
    #[error("caller {caller} is not a partner of this escrow")]
    NotAPartner {
        /// The identity that attempted the operation.
        caller: Address,
    },

    /// The destination (or a party, at creation) is invalid: the null
    /// identity, or two equal parties.
    #[error("invalid destination identity")]
    InvalidDestination,

    /// The requested amount is zero or exceeds the current balance.
    #[error("invalid amount: requested {requested}, available {available}")]
    InvalidAmount {
        /// Amount the caller asked for.
        requested: u64,
        /// Balance currently held by the escrow.
        available: u64,
    },

    /// An approved request is still awaiting execution; it cannot be
    /// overwritten by a new proposal.
    #[error("an approved withdrawal is still awaiting execution")]
    RequestPending,

    /// There is no pending withdrawal amount to approve.
    #[error("no withdrawal amount is pending approval")]
    NothingToApprove,

    /// The pending request has already been approved.
    #[error("withdrawal request already approved")]
    AlreadyApproved,

    /// The request has already been executed; funds never move twice.
    #[error("withdrawal request already executed")]
    AlreadyExecuted,

    /// The proposer tried to approve their own request.
    #[error("the proposer cannot approve their own withdrawal request")]
    CannotApproveSelf,

    /// Execution was attempted before the second partner approved.
    #[error("withdrawal request has not been approved")]
    NotApproved,

    /// The mandatory delay since the proposal has not elapsed yet.
    #[error("timelock active: {remaining_secs} seconds remaining")]
    TimelockActive {
        /// Seconds to wait before execution becomes possible.
        remaining_secs: u64,
    },

    /// The balance dropped below the approved amount since the proposal.
    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        /// Amount the approved request asks for.
        requested: u64,
        /// Balance currently held by the escrow.
        available: u64,
    },

    /// The outbound transfer failed; the execution step was rolled back in
    /// full and can be retried with no cleanup.
    #[error("outbound transfer failed: {0}")]
    TransferFailed(TransferError),

    /// The pairing has already been dissolved; the flag is one-way.
    #[error("escrow already dissolved")]
    AlreadyDissolved,

    /// A balance operation would overflow.
    #[error("amount overflow: operation would exceed allowed limits")]
    AmountOverflow,
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The single outstanding withdrawal request of an escrow.
///
/// A value slot, overwritten in place — not a log. After execution the slot
/// is left in its terminal form (`executed`, amount and proposer zeroed) so
/// repeated execution attempts fail loudly instead of paying twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    /// Amount to withdraw, in the smallest denomination.
    pub amount: u64,
    /// Recipient of the funds. Never the null identity.
    pub destination: Address,
    /// The partner who made the proposal. Recorded so approval can be
    /// restricted to the *other* partner.
    pub proposer: Address,
    /// Ledger time of the proposal; the timelock counts from here.
    pub proposed_at: Timestamp,
    /// Set once the non-proposing partner co-signs.
    pub approved: bool,
    /// Set once the funds have left the escrow.
    pub executed: bool,
}

/// Notifications appended by escrow operations — the escrow's only
/// externally observable audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EscrowEvent {
    /// An inbound transfer increased the balance.
    #[serde(rename = "deposited")]
    Deposited { from: Address, amount: u64 },
    /// A partner proposed a withdrawal.
    #[serde(rename = "withdrawal_proposed")]
    WithdrawalProposed {
        proposer: Address,
        amount: u64,
        destination: Address,
    },
    /// The non-proposing partner approved the pending request.
    #[serde(rename = "withdrawal_approved")]
    WithdrawalApproved { approver: Address },
    /// The approved request was executed and funds left the escrow.
    #[serde(rename = "withdrawal_executed")]
    WithdrawalExecuted { amount: u64, destination: Address },
    /// A partner dissolved the pairing.
    #[serde(rename = "dissolved")]
    Dissolved { by: Address },
}

/// Receipt returned by a successful [`Escrow::execute`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutedWithdrawal {
    /// Amount delivered to the destination.
    pub amount: u64,
    /// Where the funds went.
    pub destination: Address,
}

/// A per-pairing escrow account.
///
/// Created once by the registry with two distinct partners fixed forever.
/// The balance increases on any inbound transfer and decreases only through
/// the propose/approve/execute protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Escrow {
    /// The escrow's own ledger address. Also the owner of its certificate.
    address: Address,
    /// First partner, fixed at creation.
    party_a: Address,
    /// Second partner, fixed at creation.
    party_b: Address,
    /// Pairing status. Starts `true`, settable to `false` exactly once.
    active: bool,
    /// Native-currency balance in the smallest denomination.
    balance: u64,
    /// Mandatory proposal-to-execution delay, shared system-wide and
    /// forwarded by the registry at creation.
    timelock_secs: u64,
    /// At most one outstanding withdrawal request.
    pending: Option<WithdrawalRequest>,
    /// Append-only notification log.
    events: Vec<EscrowEvent>,
}

impl Escrow {
    /// Creates a new escrow for two distinct partners, seeded with an
    /// optional initial balance.
    ///
    /// The seed arrives with the creation call itself, not as an inbound
    /// transfer, so no `Deposited` notification is recorded for it.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::InvalidDestination`] if the parties are equal
    /// or either is the null identity.
    pub fn create(
        party_a: Address,
        party_b: Address,
        initial_deposit: u64,
        timelock_secs: u64,
    ) -> Result<Self, EscrowError> {
        if party_a == party_b || party_a.is_zero() || party_b.is_zero() {
            return Err(EscrowError::InvalidDestination);
        }

        Ok(Self {
            address: Address::generate(),
            party_a,
            party_b,
            active: true,
            balance: initial_deposit,
            timelock_secs,
            pending: None,
            events: Vec::new(),
        })
    }

    /// Accepts an inbound transfer from any identity.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::InvalidAmount`] for a zero amount and
    /// [`EscrowError::AmountOverflow`] if the balance would overflow.
    pub fn deposit(&mut self, from: &Address, amount: u64) -> Result<(), EscrowError> {
        if amount == 0 {
            return Err(EscrowError::InvalidAmount {
                requested: 0,
                available: self.balance,
            });
        }

        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(EscrowError::AmountOverflow)?;

        self.events.push(EscrowEvent::Deposited {
            from: from.clone(),
            amount,
        });
        tracing::debug!(escrow = %self.address, from = %from, amount, "deposit received");
        Ok(())
    }

    /// Proposes a withdrawal, overwriting any prior unapproved or already
    /// executed request.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::NotAPartner`] if the caller is neither
    /// partner, [`EscrowError::RequestPending`] while an approved request
    /// awaits execution, [`EscrowError::InvalidAmount`] for a zero amount
    /// or one above the balance, and [`EscrowError::InvalidDestination`]
    /// for the null destination.
    pub fn propose(
        &mut self,
        caller: &Address,
        amount: u64,
        destination: &Address,
        now: Timestamp,
    ) -> Result<(), EscrowError> {
        self.require_partner(caller)?;

        if let Some(req) = &self.pending {
            if req.approved && !req.executed {
                return Err(EscrowError::RequestPending);
            }
        }
        if amount == 0 || amount > self.balance {
            return Err(EscrowError::InvalidAmount {
                requested: amount,
                available: self.balance,
            });
        }
        if destination.is_zero() {
            return Err(EscrowError::InvalidDestination);
        }

        self.pending = Some(WithdrawalRequest {
            amount,
            destination: destination.clone(),
            proposer: caller.clone(),
            proposed_at: now,
            approved: false,
            executed: false,
        });
        self.events.push(EscrowEvent::WithdrawalProposed {
            proposer: caller.clone(),
            amount,
            destination: destination.clone(),
        });
        tracing::debug!(
            escrow = %self.address,
            proposer = %caller,
            amount,
            destination = %destination,
            "withdrawal proposed"
        );
        Ok(())
    }

    /// Approves the pending request on behalf of the non-proposing partner.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::NotAPartner`] for outsiders,
    /// [`EscrowError::NothingToApprove`] if no amount is pending,
    /// [`EscrowError::AlreadyExecuted`] / [`EscrowError::AlreadyApproved`]
    /// for terminal or double approvals, and
    /// [`EscrowError::CannotApproveSelf`] if the caller is the recorded
    /// proposer.
    pub fn approve(&mut self, caller: &Address) -> Result<(), EscrowError> {
        self.require_partner(caller)?;

        let req = match &mut self.pending {
            Some(req) if req.amount > 0 => req,
            _ => return Err(EscrowError::NothingToApprove),
        };
        if req.executed {
            return Err(EscrowError::AlreadyExecuted);
        }
        if req.approved {
            return Err(EscrowError::AlreadyApproved);
        }
        if req.proposer == *caller {
            return Err(EscrowError::CannotApproveSelf);
        }

        req.approved = true;
        self.events.push(EscrowEvent::WithdrawalApproved {
            approver: caller.clone(),
        });
        tracing::debug!(escrow = %self.address, approver = %caller, "withdrawal approved");
        Ok(())
    }

    /// Executes the approved request, delivering the funds through `sink`.
    ///
    /// Deliberately unrestricted: once a request is approved and the
    /// timelock has elapsed, execution is a mechanical step anyone may
    /// trigger.
    ///
    /// All internal state — executed flag, approved flag, amount, proposer,
    /// the balance debit, the executed notification — reaches its terminal
    /// form *before* the sink is invoked. A sink failure rolls every one of
    /// those changes back and surfaces as
    /// [`EscrowError::TransferFailed`].
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::NothingToApprove`] with an empty slot,
    /// [`EscrowError::AlreadyExecuted`], [`EscrowError::NotApproved`],
    /// [`EscrowError::TimelockActive`] with the exact remaining wait, or
    /// [`EscrowError::InsufficientBalance`] if the balance has since
    /// dropped below the approved amount.
    pub fn execute(
        &mut self,
        now: Timestamp,
        sink: &mut dyn TransferSink,
    ) -> Result<ExecutedWithdrawal, EscrowError> {
        let req = self.pending.as_ref().ok_or(EscrowError::NothingToApprove)?;
        if req.executed {
            return Err(EscrowError::AlreadyExecuted);
        }
        if !req.approved {
            return Err(EscrowError::NotApproved);
        }
        let elapsed = now.saturating_sub(req.proposed_at);
        if elapsed < self.timelock_secs {
            return Err(EscrowError::TimelockActive {
                remaining_secs: self.timelock_secs - elapsed,
            });
        }
        if req.amount > self.balance {
            return Err(EscrowError::InsufficientBalance {
                requested: req.amount,
                available: self.balance,
            });
        }

        let amount = req.amount;
        let destination = req.destination.clone();
        let new_balance = self
            .balance
            .checked_sub(amount)
            .ok_or(EscrowError::AmountOverflow)?;

        // Effects before interactions: everything below must be undone as
        // one unit if the sink fails.
        let prior_pending = self.pending.clone();
        let prior_balance = self.balance;
        let prior_events = self.events.len();

        if let Some(req) = self.pending.as_mut() {
            req.executed = true;
            req.approved = false;
            req.amount = 0;
            req.proposer = Address::zero();
        }
        self.balance = new_balance;
        self.events.push(EscrowEvent::WithdrawalExecuted {
            amount,
            destination: destination.clone(),
        });

        match sink.transfer(self, &destination, amount) {
            Ok(()) => {
                tracing::info!(
                    escrow = %self.address,
                    amount,
                    destination = %destination,
                    "withdrawal executed"
                );
                Ok(ExecutedWithdrawal {
                    amount,
                    destination,
                })
            }
            Err(err) => {
                self.pending = prior_pending;
                self.balance = prior_balance;
                self.events.truncate(prior_events);
                tracing::warn!(escrow = %self.address, error = %err, "outbound transfer failed, execution rolled back");
                Err(EscrowError::TransferFailed(err))
            }
        }
    }

    /// Dissolves the pairing. One-way, independent of withdrawal state:
    /// the balance and any pending request are left untouched, so funds
    /// can still be withdrawn afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::NotAPartner`] for outsiders and
    /// [`EscrowError::AlreadyDissolved`] on repeat calls.
    pub fn dissolve(&mut self, caller: &Address) -> Result<(), EscrowError> {
        self.require_partner(caller)?;
        if !self.active {
            return Err(EscrowError::AlreadyDissolved);
        }

        self.active = false;
        self.events.push(EscrowEvent::Dissolved { by: caller.clone() });
        tracing::info!(escrow = %self.address, by = %caller, "pairing dissolved");
        Ok(())
    }

    /// The escrow's own ledger address.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// First partner.
    pub fn party_a(&self) -> &Address {
        &self.party_a
    }

    /// Second partner.
    pub fn party_b(&self) -> &Address {
        &self.party_b
    }

    /// Whether the pairing is still active (not dissolved).
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Current balance.
    pub fn balance(&self) -> u64 {
        self.balance
    }

    /// The outstanding withdrawal request, if any.
    pub fn pending_request(&self) -> Option<&WithdrawalRequest> {
        self.pending.as_ref()
    }

    /// The append-only notification log.
    pub fn events(&self) -> &[EscrowEvent] {
        &self.events
    }

    fn require_partner(&self, caller: &Address) -> Result<(), EscrowError> {
        if *caller != self.party_a && *caller != self.party_b {
            return Err(EscrowError::NotAPartner {
                caller: caller.clone(),
            });
        }
        Ok(())
    }
}
