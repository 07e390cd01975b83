//! Patient record repository
//!
//! PII fields (`patient_name`, `registration_no`) are encrypted here, at
//! the storage boundary: rows at rest hold envelopes, rows handed to the
//! service layer are always plaintext.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use crate::crypto::FieldCipher;
use crate::domain::PatientRecord;
use crate::error::{AppError, Result};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordRepository: Send + Sync {
    async fn insert(&self, record: PatientRecord) -> Result<PatientRecord>;
    async fn find_by_id(&self, id: i64) -> Result<Option<PatientRecord>>;
    async fn list(&self) -> Result<Vec<PatientRecord>>;
    async fn update(&self, record: PatientRecord) -> Result<PatientRecord>;
}

/// In-memory record store with field encryption at rest
pub struct InMemoryRecordRepository {
    cipher: FieldCipher,
    next_id: AtomicI64,
    rows: RwLock<HashMap<i64, PatientRecord>>,
}

impl InMemoryRecordRepository {
    pub fn new(cipher: FieldCipher) -> Self {
        Self {
            cipher,
            next_id: AtomicI64::new(1),
            rows: RwLock::new(HashMap::new()),
        }
    }

    fn protect_row(&self, mut record: PatientRecord) -> Result<PatientRecord> {
        record.patient_name = self.cipher.protect(&record.patient_name)?;
        record.registration_no = self.cipher.protect(&record.registration_no)?;
        Ok(record)
    }

    fn reveal_row(&self, mut record: PatientRecord) -> Result<PatientRecord> {
        record.patient_name = self.cipher.reveal(&record.patient_name)?;
        record.registration_no = self.cipher.reveal(&record.registration_no)?;
        Ok(record)
    }
}

#[async_trait]
impl RecordRepository for InMemoryRecordRepository {
    async fn insert(&self, mut record: PatientRecord) -> Result<PatientRecord> {
        let now = Utc::now();
        record.id = self.next_id.fetch_add(1, Ordering::Relaxed);
        record.created_at = now;
        record.updated_at = now;

        let stored = self.protect_row(record)?;
        let revealed = self.reveal_row(stored.clone())?;
        self.rows.write().unwrap().insert(stored.id, stored);
        Ok(revealed)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<PatientRecord>> {
        let row = self.rows.read().unwrap().get(&id).cloned();
        row.map(|r| self.reveal_row(r)).transpose()
    }

    async fn list(&self) -> Result<Vec<PatientRecord>> {
        let rows: Vec<_> = self.rows.read().unwrap().values().cloned().collect();
        let mut revealed: Vec<_> = rows
            .into_iter()
            .map(|r| self.reveal_row(r))
            .collect::<Result<_>>()?;
        revealed.sort_by_key(|r| r.id);
        Ok(revealed)
    }

    async fn update(&self, mut record: PatientRecord) -> Result<PatientRecord> {
        let mut rows = self.rows.write().unwrap();
        let existing = rows
            .get(&record.id)
            .ok_or_else(|| AppError::NotFound("Patient record not found".to_string()))?;

        record.created_at = existing.created_at;
        record.updated_at = Utc::now();

        let stored = self.protect_row(record)?;
        let revealed = self.reveal_row(stored.clone())?;
        rows.insert(stored.id, stored);
        Ok(revealed)
    }
}
