//! Transaction record and status state machine for the zkBank workflow.

use crate::{PartyAddress, Timestamp, TransactionId, ZkBankError};
use serde::{Deserialize, Serialize};

/// Placeholder values used when a caller omits them, and for demo records.
pub mod defaults {
    /// Default number of distinct signer approvals.
    pub const REQUIRED_SIGNATURES: u32 = 2;

    /// Notary gate is on unless the caller turns it off.
    pub const NOTARY_REQUIRED: bool = true;

    /// Placeholder zero-knowledge proof.
    pub const ZKP_PROOF: &str =
        "0x1234567890abcdef1234567890abcdef1234567890abcdef1234567890abcdef";

    /// Placeholder transaction payload.
    pub const TX_DATA: &str =
        "0xabcdef1234567890abcdef1234567890abcdef1234567890abcdef1234567890";

    /// Initiator address of the demo sample record.
    pub const SAMPLE_INITIATOR: &str =
        "0x3f350562c0151db2394cb9813e987415bca1ef3826287502ce58382f6129f953";

    /// Counterparty address of the demo sample record.
    pub const SAMPLE_COUNTERPARTY: &str =
        "0xf4304fc20db1db265d80c07c06ca955c9b22ec9dc305f34a65666d870cd1e615";

    /// Amount of the demo sample record, in the smallest unit.
    pub const SAMPLE_AMOUNT: u64 = 1_000_000_000;
}

/// Transaction status representing the lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Collecting signer approvals.
    Pending,
    /// Threshold reached, awaiting the notary.
    ReadyForNotary,
    /// Every gate satisfied, awaiting completion.
    ReadyForCompletion,
    /// Terminal.
    Completed,
}

impl TransactionStatus {
    /// Get valid next states from the current state. A state may stay where
    /// it is (e.g. an extra signature past the threshold).
    pub fn valid_transitions(&self) -> &[TransactionStatus] {
        match self {
            TransactionStatus::Pending => &[
                TransactionStatus::Pending,
                TransactionStatus::ReadyForNotary,
                TransactionStatus::ReadyForCompletion,
            ],
            TransactionStatus::ReadyForNotary => &[
                TransactionStatus::ReadyForNotary,
                TransactionStatus::ReadyForCompletion,
            ],
            TransactionStatus::ReadyForCompletion => &[
                TransactionStatus::ReadyForCompletion,
                TransactionStatus::Completed,
            ],
            TransactionStatus::Completed => &[],
        }
    }

    /// Check if transition to given state is valid.
    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        self.valid_transitions().contains(&next)
    }

    /// Wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::ReadyForNotary => "ready_for_notary",
            TransactionStatus::ReadyForCompletion => "ready_for_completion",
            TransactionStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A signer approval attached to a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureEntry {
    pub signer: PartyAddress,
    pub signature: String,
    pub public_key: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: Timestamp,
}

/// The notary's signature, the optional last gate before completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotarySignature {
    pub notary: PartyAddress,
    pub signature: String,
    pub public_key: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: Timestamp,
}

/// Validated terms of a new transaction.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub initiator: PartyAddress,
    pub counterparty: PartyAddress,
    pub amount: u64,
    pub required_signatures: u32,
    pub notary_required: bool,
    pub zkp_proof: String,
    pub tx_data: String,
}

/// A transaction tracked by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// Unique transaction identifier.
    pub id: TransactionId,
    pub initiator: PartyAddress,
    pub counterparty: PartyAddress,
    /// Amount in the smallest currency unit.
    pub amount: u64,
    /// Creation time in Unix milliseconds.
    pub timestamp: i64,
    pub required_signatures: u32,
    pub notary_required: bool,
    pub zkp_proof: String,
    pub tx_data: String,
    /// Signer approvals, in submission order.
    pub signatures: Vec<SignatureEntry>,
    pub notary_signature: Option<NotarySignature>,
    pub completed: bool,
    pub status: TransactionStatus,
    pub created_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Timestamp>,
}

impl TransactionRecord {
    /// Create a new pending record.
    pub fn new(id: TransactionId, terms: NewTransaction, created_at: Timestamp) -> Self {
        Self {
            id,
            initiator: terms.initiator,
            counterparty: terms.counterparty,
            amount: terms.amount,
            timestamp: created_at.timestamp_millis(),
            required_signatures: terms.required_signatures,
            notary_required: terms.notary_required,
            zkp_proof: terms.zkp_proof,
            tx_data: terms.tx_data,
            signatures: Vec::new(),
            notary_signature: None,
            completed: false,
            status: TransactionStatus::Pending,
            created_at,
            completed_at: None,
        }
    }

    /// Number of signer approvals collected.
    pub fn signature_count(&self) -> usize {
        self.signatures.len()
    }

    /// Check if a signer already signed.
    pub fn has_signed(&self, signer: &PartyAddress) -> bool {
        self.signatures.iter().any(|s| &s.signer == signer)
    }

    /// Check if the signer threshold is reached.
    pub fn threshold_met(&self) -> bool {
        self.signature_count() >= self.required_signatures as usize
    }

    /// Check if the notary gate is satisfied (or absent).
    pub fn notary_satisfied(&self) -> bool {
        !self.notary_required || self.notary_signature.is_some()
    }

    /// Status implied by the collected signatures and completion flag.
    pub fn derived_status(&self) -> TransactionStatus {
        if self.completed {
            TransactionStatus::Completed
        } else if !self.threshold_met() {
            TransactionStatus::Pending
        } else if self.notary_satisfied() {
            TransactionStatus::ReadyForCompletion
        } else {
            TransactionStatus::ReadyForNotary
        }
    }

    /// Transition to a new status.
    pub fn transition_to(&mut self, new_status: TransactionStatus) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(new_status) {
            return Err(InvalidTransition {
                from: self.status,
                to: new_status,
            });
        }

        self.status = new_status;
        Ok(())
    }

    /// Append a signer approval and advance the status.
    pub fn add_signature(&mut self, entry: SignatureEntry) -> crate::Result<()> {
        if self.completed {
            return Err(ZkBankError::AlreadyCompleted(self.id.clone()));
        }

        if self.has_signed(&entry.signer) {
            return Err(ZkBankError::DuplicateSigner {
                id: self.id.clone(),
                signer: entry.signer.to_string(),
            });
        }

        self.signatures.push(entry);
        self.transition_to(self.derived_status())?;
        Ok(())
    }

    /// Record the notary signature.
    pub fn add_notary_signature(&mut self, notary: NotarySignature) -> crate::Result<()> {
        if self.completed {
            return Err(ZkBankError::AlreadyCompleted(self.id.clone()));
        }

        if !self.notary_required {
            return Err(ZkBankError::NotaryNotRequired(self.id.clone()));
        }

        if !self.threshold_met() {
            return Err(self.insufficient_signatures());
        }

        if self.notary_signature.is_some() {
            return Err(ZkBankError::NotaryAlreadySet(self.id.clone()));
        }

        self.notary_signature = Some(notary);
        self.transition_to(TransactionStatus::ReadyForCompletion)?;
        Ok(())
    }

    /// Move the transaction to its terminal state.
    pub fn complete(&mut self, at: Timestamp) -> crate::Result<()> {
        if self.completed {
            return Err(ZkBankError::AlreadyCompleted(self.id.clone()));
        }

        if !self.threshold_met() {
            return Err(self.insufficient_signatures());
        }

        if !self.notary_satisfied() {
            return Err(ZkBankError::MissingNotary(self.id.clone()));
        }

        self.transition_to(TransactionStatus::Completed)?;
        self.completed = true;
        self.completed_at = Some(at);
        Ok(())
    }

    /// Workflow progress as a percentage: half for signatures, a quarter
    /// for the notary gate and a quarter for completion.
    pub fn progress(&self) -> u8 {
        let required = self.required_signatures.max(1) as usize;
        let mut progress = (self.signature_count() * 50 / required).min(50);

        if self.notary_satisfied() {
            progress += 25;
        }

        if self.completed {
            progress += 25;
        }

        progress.min(100) as u8
    }

    /// Read-only status projection.
    pub fn status_view(&self) -> StatusView {
        StatusView {
            status: self.status,
            completed: self.completed,
            signatures_count: self.signature_count(),
            required_signatures: self.required_signatures,
            has_notary_signature: self.notary_signature.is_some(),
            progress: self.progress(),
        }
    }

    fn insufficient_signatures(&self) -> ZkBankError {
        ZkBankError::InsufficientSignatures {
            id: self.id.clone(),
            have: self.signature_count(),
            required: self.required_signatures,
        }
    }
}

/// Status projection of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
    pub status: TransactionStatus,
    pub completed: bool,
    pub signatures_count: usize,
    pub required_signatures: u32,
    pub has_notary_signature: bool,
    pub progress: u8,
}

/// Aggregate counters over every record in the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerStats {
    pub total: usize,
    pub pending: usize,
    pub completed: usize,
    pub notarized: usize,
}

impl LedgerStats {
    /// Fold one record into the counters.
    pub fn record(&mut self, record: &TransactionRecord) {
        self.total += 1;
        if record.status == TransactionStatus::Pending {
            self.pending += 1;
        }
        if record.completed {
            self.completed += 1;
        }
        if record.notary_signature.is_some() {
            self.notarized += 1;
        }
    }
}

/// Request to create a transaction. Every field is optional on the wire;
/// the ledger validates and fills defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransaction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initiator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterparty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_signatures: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notary_required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zkp_proof: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_data: Option<String>,
}

impl CreateTransaction {
    /// Request with the three mandatory fields set.
    pub fn new(initiator: impl Into<String>, counterparty: impl Into<String>, amount: u64) -> Self {
        Self {
            initiator: Some(initiator.into()),
            counterparty: Some(counterparty.into()),
            amount: Some(amount),
            ..Default::default()
        }
    }

    /// Set the signer threshold.
    pub fn with_required_signatures(mut self, required: u32) -> Self {
        self.required_signatures = Some(required);
        self
    }

    /// Turn the notary gate on or off.
    pub fn with_notary_required(mut self, required: bool) -> Self {
        self.notary_required = Some(required);
        self
    }
}

/// Signer approval submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignRequest {
    #[serde(default)]
    pub signer: String,
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub public_key: String,
}

/// Notary signature submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotarizeRequest {
    #[serde(default)]
    pub notary: String,
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub public_key: String,
}

/// Error when attempting invalid state transition.
#[derive(Debug, Clone)]
pub struct InvalidTransition {
    pub from: TransactionStatus,
    pub to: TransactionStatus,
}

impl std::fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Invalid state transition from {} to {}",
            self.from, self.to
        )
    }
}

impl std::error::Error for InvalidTransition {}

impl From<InvalidTransition> for ZkBankError {
    fn from(err: InvalidTransition) -> Self {
        ZkBankError::Internal(err.to_string())
    }
}
