//! Transaction ledger: the operations layer over a record store.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use zkbank_common::{
    defaults, now, CreateTransaction, LedgerStats, NewTransaction, NotarizeRequest,
    NotarySignature, PartyAddress, Result, SignRequest, SignatureEntry, StatusView,
    TransactionId, TransactionRecord, ZkBankError,
};
use zkbank_crypto::{PlaceholderGenerator, RandomGenerator};

use crate::config::LedgerConfig;
use crate::store::{InMemoryStore, TransactionStore};

/// The ledger tracks transactions through
/// `pending -> ready_for_notary -> ready_for_completion -> completed`.
pub struct TransactionLedger {
    /// Record storage.
    store: Arc<dyn TransactionStore>,
    /// Source of fresh identifiers.
    generator: Arc<dyn PlaceholderGenerator>,
    /// Configuration.
    config: LedgerConfig,
}

impl TransactionLedger {
    /// Create a ledger over the given store and generator.
    pub fn new(
        store: Arc<dyn TransactionStore>,
        generator: Arc<dyn PlaceholderGenerator>,
        config: LedgerConfig,
    ) -> Self {
        Self {
            store,
            generator,
            config,
        }
    }

    /// Create a ledger backed by a fresh in-memory store and random identifiers.
    pub fn in_memory(config: LedgerConfig) -> Self {
        Self::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(RandomGenerator::new()),
            config,
        )
    }

    /// Get the ledger configuration.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Create a new pending transaction.
    #[instrument(skip(self, request))]
    pub fn create(&self, request: CreateTransaction) -> Result<TransactionRecord> {
        let terms = self.validate_create(request)?;
        let created_at = now();

        for attempt in 1..=self.config.max_id_attempts {
            let id = TransactionId::new(self.generator.transaction_id());
            let record = TransactionRecord::new(id.clone(), terms.clone(), created_at);

            match self.store.insert_if_absent(record.clone()) {
                Ok(()) => {
                    info!(
                        transaction_id = %id,
                        initiator = %record.initiator,
                        counterparty = %record.counterparty,
                        amount = record.amount,
                        required_signatures = record.required_signatures,
                        notary_required = record.notary_required,
                        "Transaction created"
                    );
                    return Ok(record);
                }
                Err(_) => {
                    warn!(transaction_id = %id, attempt, "Transaction identifier collision");
                }
            }
        }

        Err(ZkBankError::Internal(format!(
            "Could not allocate a unique transaction identifier after {} attempts",
            self.config.max_id_attempts
        )))
    }

    /// Create the fixed demo transaction.
    pub fn create_sample(&self) -> Result<TransactionRecord> {
        self.create(
            CreateTransaction::new(
                defaults::SAMPLE_INITIATOR,
                defaults::SAMPLE_COUNTERPARTY,
                defaults::SAMPLE_AMOUNT,
            )
            .with_required_signatures(defaults::REQUIRED_SIGNATURES)
            .with_notary_required(true),
        )
    }

    /// Append a signer approval.
    #[instrument(skip(self, id, request), fields(transaction_id = %id))]
    pub fn add_signature(&self, id: &TransactionId, request: SignRequest) -> Result<TransactionRecord> {
        let signer = required_party(&request.signer, "signer")?;
        required_text(&request.signature, "signature")?;
        required_text(&request.public_key, "publicKey")?;

        let mut entry = Some(SignatureEntry {
            signer: signer.clone(),
            signature: request.signature,
            public_key: request.public_key,
            timestamp: now(),
        });

        let record = self.store.update(id, &mut |record| {
            let entry = entry
                .take()
                .ok_or_else(|| ZkBankError::Internal("signature applied twice".to_string()))?;
            record.add_signature(entry)
        })?;

        info!(
            transaction_id = %id,
            signer = %signer,
            signatures = record.signature_count(),
            required_signatures = record.required_signatures,
            status = %record.status,
            "Signature added"
        );

        Ok(record)
    }

    /// Record the notary signature.
    #[instrument(skip(self, id, request), fields(transaction_id = %id))]
    pub fn add_notary_signature(
        &self,
        id: &TransactionId,
        request: NotarizeRequest,
    ) -> Result<TransactionRecord> {
        let notary = required_party(&request.notary, "notary")?;
        required_text(&request.signature, "signature")?;
        required_text(&request.public_key, "publicKey")?;

        let mut signature = Some(NotarySignature {
            notary: notary.clone(),
            signature: request.signature,
            public_key: request.public_key,
            timestamp: now(),
        });

        let record = self.store.update(id, &mut |record| {
            let signature = signature
                .take()
                .ok_or_else(|| ZkBankError::Internal("notary signature applied twice".to_string()))?;
            record.add_notary_signature(signature)
        })?;

        info!(transaction_id = %id, notary = %notary, status = %record.status, "Notary signature added");

        Ok(record)
    }

    /// Complete a transaction. Terminal.
    #[instrument(skip(self, id), fields(transaction_id = %id))]
    pub fn complete(&self, id: &TransactionId) -> Result<TransactionRecord> {
        let record = self.store.update(id, &mut |record| record.complete(now()))?;

        info!(transaction_id = %id, "Transaction completed");

        Ok(record)
    }

    /// Get a transaction by ID.
    pub fn get(&self, id: &TransactionId) -> Result<TransactionRecord> {
        self.store
            .get(id)
            .ok_or_else(|| ZkBankError::NotFound(id.clone()))
    }

    /// Get every transaction, in insertion order.
    pub fn list(&self) -> Vec<TransactionRecord> {
        self.store.list()
    }

    /// Get the status projection of a transaction.
    pub fn status(&self, id: &TransactionId) -> Result<StatusView> {
        self.get(id).map(|record| record.status_view())
    }

    /// Aggregate counters over all transactions.
    pub fn stats(&self) -> LedgerStats {
        let mut stats = LedgerStats::default();
        for record in self.store.list() {
            stats.record(&record);
        }
        stats
    }

    /// Number of transactions held.
    pub fn count(&self) -> usize {
        self.store.len()
    }

    // --- Private methods ---

    fn validate_create(&self, request: CreateTransaction) -> Result<NewTransaction> {
        let initiator = required_party(request.initiator.as_deref().unwrap_or_default(), "initiator")?;
        let counterparty =
            required_party(request.counterparty.as_deref().unwrap_or_default(), "counterparty")?;

        // Zero is treated the same as an absent amount.
        let amount = match request.amount {
            Some(amount) if amount > 0 => amount,
            _ => return Err(ZkBankError::missing_field("amount")),
        };

        let required_signatures = request
            .required_signatures
            .unwrap_or(self.config.default_required_signatures);
        if required_signatures == 0 {
            return Err(ZkBankError::validation(
                "requiredSignatures must be at least 1",
                "requiredSignatures",
            ));
        }

        Ok(NewTransaction {
            initiator,
            counterparty,
            amount,
            required_signatures,
            notary_required: request
                .notary_required
                .unwrap_or(self.config.default_notary_required),
            zkp_proof: request
                .zkp_proof
                .unwrap_or_else(|| defaults::ZKP_PROOF.to_string()),
            tx_data: request
                .tx_data
                .unwrap_or_else(|| defaults::TX_DATA.to_string()),
        })
    }
}

impl Default for TransactionLedger {
    fn default() -> Self {
        Self::in_memory(LedgerConfig::default())
    }
}

fn required_party(value: &str, field: &str) -> Result<PartyAddress> {
    let address = PartyAddress::new(value);
    if address.is_blank() {
        return Err(ZkBankError::missing_field(field));
    }
    Ok(address)
}

fn required_text(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ZkBankError::missing_field(field));
    }
    Ok(())
}
