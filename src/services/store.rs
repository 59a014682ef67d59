//! Expense record store backed by a single JSON document
//!
//! Reads take a shared lock on `<file>.lock`; every mutation holds the
//! exclusive lock across load, edit and save, writing through a temp file
//! and an atomic rename.

use chrono::FixedOffset;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::services::migration::{local_offset, migrate_records};
use crate::types::{ExpenseDraft, ExpenseError, ExpenseRecord, Result};

/// Current on-disk store version
pub const STORE_VERSION: u32 = 1;

/// CRUD contract the rest of the app relies on
pub trait RecordStore {
    /// Insert a new record; fails if the id is taken
    fn create(&self, record: ExpenseRecord) -> Result<()>;

    /// Replace the editable fields of a record, keeping its id and createdAt
    fn update(&self, id: &str, draft: ExpenseDraft) -> Result<ExpenseRecord>;

    fn delete(&self, id: &str) -> Result<()>;

    fn get(&self, id: &str) -> Result<Option<ExpenseRecord>>;

    /// All records, newest date first
    fn list(&self) -> Result<Vec<ExpenseRecord>>;

    /// Insert or replace by id. Returns the number of records written.
    fn upsert_many(&self, records: Vec<ExpenseRecord>) -> Result<usize>;

    fn clear(&self) -> Result<()>;

    /// Most recent record, the source for "copy last"
    fn latest(&self) -> Result<Option<ExpenseRecord>> {
        Ok(self.list()?.into_iter().next())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExpenseDocument {
    pub version: u32,
    pub expenses: Vec<ExpenseRecord>,
}

/// Advisory lock on `<path>.lock`, released on drop.
///
/// The data file itself is replaced by rename on every write, so locks are
/// taken on a sidecar that is never renamed.
pub(crate) struct StoreLock {
    file: File,
}

impl StoreLock {
    fn open(path: &Path) -> Result<File> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut name = path.as_os_str().to_owned();
        name.push(".lock");
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(PathBuf::from(name))?;
        Ok(file)
    }

    /// Shared lock for reads
    pub(crate) fn shared(path: &Path) -> Result<Self> {
        let file = Self::open(path)?;
        file.lock_shared()
            .map_err(|e| ExpenseError::Store(format!("Failed to acquire read lock: {}", e)))?;
        Ok(Self { file })
    }

    /// Exclusive lock held across load, modify and save
    pub(crate) fn exclusive(path: &Path) -> Result<Self> {
        let file = Self::open(path)?;
        file.lock_exclusive()
            .map_err(|e| ExpenseError::Store(format!("Failed to acquire write lock: {}", e)))?;
        Ok(Self { file })
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// Read a whole file. `None` if it does not exist. Callers hold a [`StoreLock`].
pub(crate) fn read_existing(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }

    let mut content = String::new();
    std::io::BufReader::new(File::open(path)?).read_to_string(&mut content)?;
    Ok(Some(content))
}

/// Atomic write (temp file + rename). Callers hold an exclusive [`StoreLock`].
pub(crate) fn write_atomic(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("json.tmp");

    {
        let mut file = File::create(&temp_path)
            .map_err(|e| ExpenseError::Store(format!("Failed to create temp file: {}", e)))?;
        file.write_all(content.as_bytes())
            .map_err(|e| ExpenseError::Store(format!("Failed to write temp file: {}", e)))?;
        file.sync_all()
            .map_err(|e| ExpenseError::Store(format!("Failed to sync temp file: {}", e)))?;
    }

    fs::rename(&temp_path, path)
        .map_err(|e| ExpenseError::Store(format!("Failed to rename temp file: {}", e)))?;
    Ok(())
}

/// Newest date first, then newest createdAt, then id for a stable order
fn sort_newest_first(records: &mut [ExpenseRecord]) {
    records.sort_by(|a, b| {
        b.date
            .cmp(&a.date)
            .then_with(|| b.created_at.instant().cmp(&a.created_at.instant()))
            .then_with(|| a.id.cmp(&b.id))
    });
}

pub struct JsonRecordStore {
    path: PathBuf,
    offset: FixedOffset,
}

impl JsonRecordStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            offset: local_offset(),
        }
    }

    /// Store that normalizes legacy timestamps to a fixed offset (for testing)
    pub fn with_offset(path: PathBuf, offset: FixedOffset) -> Self {
        Self { path, offset }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse the document as stored. Callers hold a [`StoreLock`].
    fn load(&self) -> Result<Vec<ExpenseRecord>> {
        let content = match read_existing(&self.path)? {
            Some(content) => content,
            None => return Ok(Vec::new()),
        };

        let doc: ExpenseDocument = serde_json::from_str(&content).map_err(|e| {
            ExpenseError::Parse(format!(
                "Corrupted store file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        if doc.version > STORE_VERSION {
            return Err(ExpenseError::Store(format!(
                "store version {} is newer than supported version {}",
                doc.version, STORE_VERSION
            )));
        }

        tracing::debug!(count = doc.expenses.len(), path = %self.path.display(), "loaded expenses");
        Ok(doc.expenses)
    }

    /// Records for a read. Legacy createdAt values are migrated and the
    /// result persisted under the write lock.
    fn read_records(&self) -> Result<Vec<ExpenseRecord>> {
        {
            let _lock = StoreLock::shared(&self.path)?;
            let records = self.load()?;
            if !records.iter().any(|r| r.created_at.is_legacy()) {
                return Ok(records);
            }
        }

        let _lock = StoreLock::exclusive(&self.path)?;
        let mut records = self.load()?;
        if migrate_records(&mut records, self.offset) > 0 {
            self.save(&records)?;
        }
        Ok(records)
    }

    /// Load under an exclusive lock, apply `edit`, and save when it succeeds.
    fn modify<T, F>(&self, edit: F) -> Result<T>
    where
        F: FnOnce(&mut Vec<ExpenseRecord>) -> Result<T>,
    {
        let _lock = StoreLock::exclusive(&self.path)?;
        let mut records = self.load()?;
        migrate_records(&mut records, self.offset);
        let value = edit(&mut records)?;
        self.save(&records)?;
        Ok(value)
    }

    fn save(&self, records: &[ExpenseRecord]) -> Result<()> {
        // serde_json writes NaN/inf as null, which would not load back
        if let Some(bad) = records.iter().find(|r| !r.amount.is_finite()) {
            return Err(ExpenseError::Store(format!(
                "expense {} has a non-finite amount",
                bad.id
            )));
        }

        let doc = ExpenseDocument {
            version: STORE_VERSION,
            expenses: records.to_vec(),
        };
        let content = serde_json::to_string_pretty(&doc)
            .map_err(|e| ExpenseError::Store(format!("Serialization failed: {}", e)))?;
        write_atomic(&self.path, &content)?;
        tracing::debug!(count = records.len(), "saved expenses");
        Ok(())
    }
}

impl RecordStore for JsonRecordStore {
    fn create(&self, record: ExpenseRecord) -> Result<()> {
        self.modify(|records| {
            if records.iter().any(|r| r.id == record.id) {
                return Err(ExpenseError::Duplicate(format!("expense {}", record.id)));
            }
            tracing::info!(id = %record.id, date = %record.date, "expense created");
            records.push(record);
            Ok(())
        })
    }

    fn update(&self, id: &str, draft: ExpenseDraft) -> Result<ExpenseRecord> {
        let updated = self.modify(|records| {
            let slot = records
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| ExpenseError::NotFound(format!("expense {}", id)))?;
            let updated = draft.into_record(slot.id.clone(), slot.created_at)?;
            *slot = updated.clone();
            Ok(updated)
        })?;
        tracing::info!(id, "expense updated");
        Ok(updated)
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.modify(|records| {
            let before = records.len();
            records.retain(|r| r.id != id);
            if records.len() == before {
                return Err(ExpenseError::NotFound(format!("expense {}", id)));
            }
            Ok(())
        })?;
        tracing::info!(id, "expense deleted");
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<ExpenseRecord>> {
        Ok(self.read_records()?.into_iter().find(|r| r.id == id))
    }

    fn list(&self) -> Result<Vec<ExpenseRecord>> {
        let mut records = self.read_records()?;
        sort_newest_first(&mut records);
        Ok(records)
    }

    fn upsert_many(&self, incoming: Vec<ExpenseRecord>) -> Result<usize> {
        let written = self.modify(|records| {
            let mut written = 0;
            for record in incoming {
                match records.iter_mut().find(|r| r.id == record.id) {
                    Some(existing) => *existing = record,
                    None => records.push(record),
                }
                written += 1;
            }
            migrate_records(records, self.offset);
            Ok(written)
        })?;
        tracing::info!(written, "expenses upserted");
        Ok(written)
    }

    fn clear(&self) -> Result<()> {
        self.modify(|records| {
            records.clear();
            Ok(())
        })?;
        tracing::info!("all expenses cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CreatedAt, ExpenseKind, PaymentMethod, Priority};
    use chrono::{NaiveDate, TimeZone};
    use tempfile::TempDir;

    fn brt() -> FixedOffset {
        FixedOffset::west_opt(3 * 3600).unwrap()
    }

    fn make_record(id: &str, date: &str, hour: u32) -> ExpenseRecord {
        ExpenseRecord {
            id: id.to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            amount: 10.0,
            category: "Alimentação".into(),
            subcategory: "Mercado".into(),
            kind: ExpenseKind::Purchase,
            payment_method: PaymentMethod::Pix,
            card: None,
            installments: 1,
            delivery_provider: None,
            delivery_provider_other: None,
            fuel_price_per_liter: None,
            fuel_type: None,
            priority: Priority::Essential,
            merchant: None,
            description: None,
            created_at: CreatedAt::LocalOffset(
                brt().with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap(),
            ),
        }
    }

    fn create_test_store() -> (JsonRecordStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonRecordStore::with_offset(temp_dir.path().join("expenses.json"), brt());
        (store, temp_dir)
    }

    #[test]
    fn test_missing_file_is_empty_store() {
        let (store, _temp) = create_test_store();
        assert!(store.list().unwrap().is_empty());
        assert!(store.latest().unwrap().is_none());
        assert!(store.get("nope").unwrap().is_none());
    }

    #[test]
    fn test_create_and_get() {
        let (store, _temp) = create_test_store();
        store.create(make_record("a", "2024-03-01", 9)).unwrap();

        let fetched = store.get("a").unwrap().unwrap();
        assert_eq!(fetched, make_record("a", "2024-03-01", 9));
        assert!(store.path().exists());
    }

    #[test]
    fn test_create_duplicate_id_fails() {
        let (store, _temp) = create_test_store();
        store.create(make_record("a", "2024-03-01", 9)).unwrap();
        let err = store.create(make_record("a", "2024-03-02", 9)).unwrap_err();
        assert!(matches!(err, ExpenseError::Duplicate(_)));
    }

    #[test]
    fn test_list_orders_by_date_then_created_at_desc() {
        let (store, _temp) = create_test_store();
        store.create(make_record("old", "2024-02-01", 9)).unwrap();
        store.create(make_record("early", "2024-03-01", 8)).unwrap();
        store.create(make_record("late", "2024-03-01", 20)).unwrap();

        let ids: Vec<String> = store.list().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["late", "early", "old"]);
        assert_eq!(store.latest().unwrap().unwrap().id, "late");
    }

    #[test]
    fn test_update_keeps_id_and_created_at() {
        let (store, _temp) = create_test_store();
        let original = make_record("a", "2024-03-01", 9);
        store.create(original.clone()).unwrap();

        let mut draft = ExpenseDraft::from_record(&original);
        draft.amount = 99.9;
        draft.description = Some("updated".into());
        let updated = store.update("a", draft).unwrap();

        assert_eq!(updated.id, "a");
        assert_eq!(updated.created_at, original.created_at);
        let stored = store.get("a").unwrap().unwrap();
        assert!((stored.amount - 99.9).abs() < f64::EPSILON);
        assert_eq!(stored.description.as_deref(), Some("updated"));
    }

    #[test]
    fn test_update_missing_and_invalid() {
        let (store, _temp) = create_test_store();
        let record = make_record("a", "2024-03-01", 9);
        let err = store
            .update("missing", ExpenseDraft::from_record(&record))
            .unwrap_err();
        assert!(matches!(err, ExpenseError::NotFound(_)));

        store.create(record.clone()).unwrap();
        let mut draft = ExpenseDraft::from_record(&record);
        draft.amount = 0.0;
        assert!(matches!(
            store.update("a", draft),
            Err(ExpenseError::Validation(_))
        ));
        // Unchanged on validation failure
        assert_eq!(store.get("a").unwrap().unwrap(), record);
    }

    #[test]
    fn test_delete() {
        let (store, _temp) = create_test_store();
        store.create(make_record("a", "2024-03-01", 9)).unwrap();
        store.delete("a").unwrap();
        assert!(store.list().unwrap().is_empty());
        assert!(matches!(store.delete("a"), Err(ExpenseError::NotFound(_))));
    }

    #[test]
    fn test_upsert_many_inserts_and_replaces() {
        let (store, _temp) = create_test_store();
        store.create(make_record("a", "2024-03-01", 9)).unwrap();

        let mut replacement = make_record("a", "2024-03-01", 9);
        replacement.amount = 55.0;
        let written = store
            .upsert_many(vec![replacement, make_record("b", "2024-03-02", 9)])
            .unwrap();

        assert_eq!(written, 2);
        let records = store.list().unwrap();
        assert_eq!(records.len(), 2);
        assert!((store.get("a").unwrap().unwrap().amount - 55.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_clear() {
        let (store, _temp) = create_test_store();
        store.create(make_record("a", "2024-03-01", 9)).unwrap();
        store.clear().unwrap();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_load_migrates_legacy_created_at_once() {
        let (store, _temp) = create_test_store();
        let json = r#"{
            "version": 1,
            "expenses": [{
                "id": "legacy",
                "date": "2024-03-01",
                "amount": 12.5,
                "category": "Casa",
                "subcategory": "Luz",
                "paymentMethod": "pix",
                "createdAt": "2024-03-01T15:00:00.000Z"
            }]
        }"#;
        fs::write(store.path(), json).unwrap();

        let record = store.get("legacy").unwrap().unwrap();
        assert_eq!(record.created_at.to_string(), "2024-03-01T12:00:00.000-03:00");

        // Migration was persisted
        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("-03:00"));
        assert!(!raw.contains("15:00:00.000Z"));
    }

    #[test]
    fn test_corrupted_file_is_an_error() {
        let (store, _temp) = create_test_store();
        fs::write(store.path(), "{not json").unwrap();
        assert!(matches!(store.list(), Err(ExpenseError::Parse(_))));
    }

    #[test]
    fn test_newer_version_rejected() {
        let (store, _temp) = create_test_store();
        fs::write(store.path(), r#"{"version": 99, "expenses": []}"#).unwrap();
        assert!(matches!(store.list(), Err(ExpenseError::Store(_))));
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let (store, temp) = create_test_store();
        store.create(make_record("a", "2024-03-01", 9)).unwrap();
        assert!(!temp.path().join("expenses.json.tmp").exists());
    }

    #[test]
    fn test_save_rejects_non_finite_amount() {
        let (store, _temp) = create_test_store();
        store.create(make_record("a", "2024-03-01", 9)).unwrap();

        let mut bad = make_record("b", "2024-03-02", 9);
        bad.amount = f64::NAN;
        assert!(matches!(
            store.upsert_many(vec![bad]),
            Err(ExpenseError::Store(_))
        ));

        // Store still loads and is unchanged
        let ids: Vec<String> = store.list().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[test]
    fn test_concurrent_writers_do_not_lose_records() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("expenses.json");

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let path = path.clone();
                std::thread::spawn(move || {
                    let store = JsonRecordStore::with_offset(path, brt());
                    for i in 0..10 {
                        store
                            .create(make_record(&format!("t{t}-{i}"), "2024-03-01", 9))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let store = JsonRecordStore::with_offset(path, brt());
        assert_eq!(store.list().unwrap().len(), 80);
    }

    #[test]
    fn test_lock_file_is_sidecar() {
        let (store, temp) = create_test_store();
        store.create(make_record("a", "2024-03-01", 9)).unwrap();
        assert!(temp.path().join("expenses.json.lock").exists());
    }
}
