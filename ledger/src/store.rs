//! Storage for transaction records.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;

use zkbank_common::{Result, TransactionId, TransactionRecord, ZkBankError};

/// Mutation applied to a record inside the store's critical section.
pub type RecordMutation<'a> = &'a mut dyn FnMut(&mut TransactionRecord) -> Result<()>;

/// Owner of the mapping from identifier to record.
///
/// `update` is the only write path for existing records: implementations
/// must run the mutation while holding exclusive access to that one record,
/// and keep the stored record untouched when the mutation fails.
pub trait TransactionStore: Send + Sync {
    /// Insert a record unless its identifier is taken. On collision the
    /// record is handed back.
    fn insert_if_absent(
        &self,
        record: TransactionRecord,
    ) -> std::result::Result<(), TransactionRecord>;

    /// Get a copy of a record.
    fn get(&self, id: &TransactionId) -> Option<TransactionRecord>;

    /// Apply a mutation to one record and return the updated copy.
    fn update(&self, id: &TransactionId, mutation: RecordMutation<'_>) -> Result<TransactionRecord>;

    /// All records, in insertion order.
    fn list(&self) -> Vec<TransactionRecord>;

    /// Number of records.
    fn len(&self) -> usize;

    /// Check whether the store holds no records.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local store. Records live in a sharded concurrent map; a
/// separate index remembers insertion order for listings.
#[derive(Default)]
pub struct InMemoryStore {
    records: DashMap<TransactionId, TransactionRecord>,
    order: RwLock<Vec<TransactionId>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransactionStore for InMemoryStore {
    fn insert_if_absent(
        &self,
        record: TransactionRecord,
    ) -> std::result::Result<(), TransactionRecord> {
        let id = record.id.clone();

        match self.records.entry(id.clone()) {
            Entry::Occupied(_) => return Err(record),
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
        }

        // Shard lock is released before touching the order index.
        self.order.write().push(id);
        Ok(())
    }

    fn get(&self, id: &TransactionId) -> Option<TransactionRecord> {
        self.records.get(id).map(|r| r.value().clone())
    }

    fn update(&self, id: &TransactionId, mutation: RecordMutation<'_>) -> Result<TransactionRecord> {
        let mut entry = self
            .records
            .get_mut(id)
            .ok_or_else(|| ZkBankError::NotFound(id.clone()))?;

        let mut next = entry.value().clone();
        mutation(&mut next)?;
        *entry.value_mut() = next.clone();

        Ok(next)
    }

    fn list(&self) -> Vec<TransactionRecord> {
        let ids = self.order.read().clone();
        ids.iter().filter_map(|id| self.get(id)).collect()
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zkbank_common::{defaults, now, NewTransaction, PartyAddress, TransactionStatus};

    fn create_test_record(id: &str) -> TransactionRecord {
        let terms = NewTransaction {
            initiator: PartyAddress::new("0xa"),
            counterparty: PartyAddress::new("0xb"),
            amount: 10,
            required_signatures: 1,
            notary_required: false,
            zkp_proof: defaults::ZKP_PROOF.to_string(),
            tx_data: defaults::TX_DATA.to_string(),
        };
        TransactionRecord::new(TransactionId::new(id), terms, now())
    }

    #[test]
    fn test_insert_and_get() {
        let store = InMemoryStore::new();
        assert!(store.is_empty());

        store.insert_if_absent(create_test_record("0x1")).unwrap();

        assert_eq!(store.len(), 1);
        assert!(store.get(&TransactionId::new("0x1")).is_some());
        assert!(store.get(&TransactionId::new("0x2")).is_none());
    }

    #[test]
    fn test_insert_collision_returns_record() {
        let store = InMemoryStore::new();
        store.insert_if_absent(create_test_record("0x1")).unwrap();

        let rejected = store.insert_if_absent(create_test_record("0x1")).unwrap_err();
        assert_eq!(rejected.id.as_str(), "0x1");
        assert_eq!(store.len(), 1);
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn test_list_preserves_insertion_order() {
        let store = InMemoryStore::new();
        for id in ["0xc", "0xa", "0xb"] {
            store.insert_if_absent(create_test_record(id)).unwrap();
        }

        let ids: Vec<String> = store.list().into_iter().map(|r| r.id.to_string()).collect();
        assert_eq!(ids, vec!["0xc", "0xa", "0xb"]);
    }

    #[test]
    fn test_failed_update_leaves_record_untouched() {
        let store = InMemoryStore::new();
        store.insert_if_absent(create_test_record("0x1")).unwrap();
        let id = TransactionId::new("0x1");

        let result = store.update(&id, &mut |record| {
            record.status = TransactionStatus::Completed;
            Err(ZkBankError::Internal("rejected".to_string()))
        });

        assert!(result.is_err());
        assert_eq!(store.get(&id).unwrap().status, TransactionStatus::Pending);
    }

    #[test]
    fn test_update_unknown_id() {
        let store = InMemoryStore::new();
        let result = store.update(&TransactionId::new("0xmissing"), &mut |_| Ok(()));
        assert!(matches!(result, Err(ZkBankError::NotFound(_))));
    }
}
