use crate::domain::attempt::{DecisionAudit, PaymentAttempt, check_decision, check_new_attempt};
use crate::domain::order::{Order, StatusChange};
use crate::domain::ports::{AttemptStore, OrderStore};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for the payment attempt ledger.
pub const CF_ATTEMPTS: &str = "payment_attempts";
/// Column Family for decision audit records.
pub const CF_AUDIT: &str = "decision_audit";
/// Column Family for the current state of each order.
pub const CF_ORDERS: &str = "orders";
/// Column Family with one row per order status transition.
pub const CF_STATUS_HISTORY: &str = "order_status_history";

/// A persistent store implementation using RocksDB.
///
/// Implements both ports. RocksDB offers no compare-and-swap of its own, so
/// every read-modify-write runs under `write_lock`, which also carries the
/// last assigned attempt id.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<u64>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families exist and recovers the
    /// attempt id sequence from the ledger.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = [CF_ATTEMPTS, CF_AUDIT, CF_ORDERS, CF_STATUS_HISTORY]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        let last_id = {
            let cf = column_family(&db, CF_ATTEMPTS)?;
            match db.iterator_cf(cf, IteratorMode::End).next() {
                Some(item) => {
                    let (key, _) = item?;
                    u64_key(&key)?
                }
                None => 0,
            }
        };

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(last_id)),
        })
    }

    fn scan<T: DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = column_family(&self.db, cf_name)?;
        let mut rows = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            rows.push(decode(&value)?);
        }
        Ok(rows)
    }

    fn read<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = column_family(&self.db, cf_name)?;
        match self.db.get_cf(cf, key)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write_order(&self, order: &Order) -> Result<()> {
        let orders = column_family(&self.db, CF_ORDERS)?;
        let history = column_family(&self.db, CF_STATUS_HISTORY)?;
        let mut batch = WriteBatch::default();
        batch.put_cf(orders, order.id.to_be_bytes(), encode(order)?);
        if let Some(change) = order.status_history.last() {
            batch.put_cf(
                history,
                history_key(order.id, order.version),
                encode::<StatusChange>(change)?,
            );
        }
        self.db.write(batch)?;
        Ok(())
    }
}

fn column_family<'a>(db: &'a DB, name: &str) -> Result<&'a ColumnFamily> {
    db.cf_handle(name).ok_or_else(|| {
        PaymentError::InternalError(Box::new(std::io::Error::other(format!(
            "{name} column family not found"
        ))))
    })
}

fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| {
        PaymentError::InternalError(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Serialization error: {}", e),
        )))
    })
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| {
        PaymentError::InternalError(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Deserialization error: {}", e),
        )))
    })
}

fn u64_key(key: &[u8]) -> Result<u64> {
    let bytes: [u8; 8] = key.try_into().map_err(|_| {
        PaymentError::InternalError(Box::new(std::io::Error::other("Malformed attempt key")))
    })?;
    Ok(u64::from_be_bytes(bytes))
}

fn history_key(order_id: u32, version: u64) -> Vec<u8> {
    let mut key = order_id.to_be_bytes().to_vec();
    key.extend_from_slice(&version.to_be_bytes());
    key
}

#[async_trait]
impl AttemptStore for RocksDBStore {
    async fn insert_new(&self, mut attempt: PaymentAttempt) -> Result<PaymentAttempt> {
        let mut last_id = self.write_lock.lock().await;
        let existing: Vec<PaymentAttempt> = self.scan(CF_ATTEMPTS)?;
        check_new_attempt(&existing, attempt.order_id, attempt.method)?;

        attempt.id = *last_id + 1;
        let cf = column_family(&self.db, CF_ATTEMPTS)?;
        self.db.put_cf(cf, attempt.id.to_be_bytes(), encode(&attempt)?)?;
        *last_id = attempt.id;
        Ok(attempt)
    }

    async fn get(&self, attempt_id: u64) -> Result<Option<PaymentAttempt>> {
        self.read(CF_ATTEMPTS, &attempt_id.to_be_bytes())
    }

    async fn all(&self) -> Result<Vec<PaymentAttempt>> {
        self.scan(CF_ATTEMPTS)
    }

    async fn decide(&self, decided: PaymentAttempt, audit: DecisionAudit) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let existing: Vec<PaymentAttempt> = self.scan(CF_ATTEMPTS)?;
        let current = existing
            .iter()
            .find(|a| a.id == decided.id)
            .ok_or(PaymentError::AttemptNotFound(decided.id))?;
        check_decision(&existing, current, &decided)?;

        let attempts = column_family(&self.db, CF_ATTEMPTS)?;
        let audit_cf = column_family(&self.db, CF_AUDIT)?;
        let audit_key = [
            decided.id.to_be_bytes(),
            (audit.decided_at.timestamp_micros() as u64).to_be_bytes(),
        ]
        .concat();

        let mut batch = WriteBatch::default();
        batch.put_cf(attempts, decided.id.to_be_bytes(), encode(&decided)?);
        batch.put_cf(audit_cf, audit_key, encode(&audit)?);
        self.db.write(batch)?;
        Ok(())
    }

    async fn audit_trail(&self, attempt_id: u64) -> Result<Vec<DecisionAudit>> {
        let records: Vec<DecisionAudit> = self.scan(CF_AUDIT)?;
        Ok(records
            .into_iter()
            .filter(|record| record.attempt_id == attempt_id)
            .collect())
    }
}

#[async_trait]
impl OrderStore for RocksDBStore {
    async fn insert(&self, order: Order) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if self
            .read::<Order>(CF_ORDERS, &order.id.to_be_bytes())?
            .is_some()
        {
            return Err(PaymentError::OrderExists(order.id));
        }
        self.write_order(&order)
    }

    async fn get(&self, order_id: u32) -> Result<Option<Order>> {
        self.read(CF_ORDERS, &order_id.to_be_bytes())
    }

    async fn all(&self) -> Result<Vec<Order>> {
        self.scan(CF_ORDERS)
    }

    async fn compare_and_swap(&self, expected_version: u64, updated: Order) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let current: Order = self
            .read(CF_ORDERS, &updated.id.to_be_bytes())?
            .ok_or(PaymentError::OrderNotFound(updated.id))?;
        if current.version != expected_version {
            return Ok(false);
        }
        self.write_order(&updated)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::attempt::AttemptStatus;
    use crate::domain::attempt::fixtures::{attempt, paypal_payload};
    use crate::domain::registry::StatusRegistry;
    use crate::domain::status::OrderStatus;
    use chrono::Utc;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_rocksdb_open_cf() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).expect("Failed to open RocksDB");

        for name in [CF_ATTEMPTS, CF_AUDIT, CF_ORDERS, CF_STATUS_HISTORY] {
            assert!(store.db.cf_handle(name).is_some());
        }
    }

    #[tokio::test]
    async fn test_rocksdb_attempt_ids_survive_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = RocksDBStore::open(dir.path()).unwrap();
            store
                .insert_new(attempt(0, 1, paypal_payload(), AttemptStatus::PendingReview))
                .await
                .unwrap();
        }
        let store = RocksDBStore::open(dir.path()).unwrap();
        let next = store
            .insert_new(attempt(0, 2, paypal_payload(), AttemptStatus::PendingReview))
            .await
            .unwrap();
        assert_eq!(next.id, 2);
        assert_eq!(AttemptStore::all(&store).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_rocksdb_decide_once() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();
        let pending = store
            .insert_new(attempt(0, 1, paypal_payload(), AttemptStatus::PendingReview))
            .await
            .unwrap();
        let approved = pending.approved("admin1", None, Utc::now()).unwrap();
        store
            .decide(approved.clone(), DecisionAudit::between(&pending, &approved))
            .await
            .unwrap();
        let rejected = pending.rejected("admin2", "late", None, Utc::now()).unwrap();
        assert!(matches!(
            store
                .decide(rejected.clone(), DecisionAudit::between(&pending, &rejected))
                .await,
            Err(PaymentError::AlreadyDecided { .. })
        ));
        assert_eq!(store.audit_trail(pending.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rocksdb_order_history_rows() {
        let dir = tempdir().unwrap();
        let registry = StatusRegistry::standard().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();
        let order = Order::new(9, 1, Utc::now());
        OrderStore::insert(&store, order.clone()).await.unwrap();
        let next = order
            .advanced(&registry, OrderStatus::PaymentAuthorized, Utc::now())
            .unwrap();
        assert!(store.compare_and_swap(0, next.clone()).await.unwrap());
        assert!(!store.compare_and_swap(0, next).await.unwrap());

        let rows: Vec<StatusChange> = store.scan(CF_STATUS_HISTORY).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].status, OrderStatus::PaymentAuthorized);
    }
}
