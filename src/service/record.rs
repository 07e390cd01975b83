//! Patient record business logic
//!
//! All reads and writes pass through the caller's [`TenantContext`]:
//! collections are filtered, invisible single fetches report not-found,
//! creates are stamped with the caller's institution, and cross-tenant
//! updates are refused.

use std::sync::Arc;

use chrono::Utc;
use validator::Validate;

use crate::domain::{CreateRecordInput, PatientRecord, UpdateRecordInput};
use crate::error::{AppError, Result};
use crate::repository::RecordRepository;
use crate::tenant::{scope, TenantContext};

pub struct RecordService {
    records: Arc<dyn RecordRepository>,
}

impl RecordService {
    pub fn new(records: Arc<dyn RecordRepository>) -> Self {
        Self { records }
    }

    /// List records visible to the caller
    pub async fn list(&self, ctx: &TenantContext) -> Result<Vec<PatientRecord>> {
        let all = self.records.list().await?;
        Ok(scope::filter_visible(ctx, all))
    }

    /// Fetch one record. An existing record outside the caller's tenants
    /// reports not-found, same as a missing one.
    pub async fn get(&self, ctx: &TenantContext, id: i64) -> Result<PatientRecord> {
        match self.records.find_by_id(id).await? {
            Some(record) if scope::visible(ctx, &record) => Ok(record),
            _ => Err(AppError::NotFound("Patient record not found".to_string())),
        }
    }

    /// Create a record, attributing it to the caller's institution when
    /// none is given
    pub async fn create(
        &self,
        ctx: &TenantContext,
        input: CreateRecordInput,
    ) -> Result<PatientRecord> {
        input.validate()?;

        let now = Utc::now();
        let mut record = PatientRecord {
            id: 0,
            tenant_code: input.tenant_code,
            patient_name: input.patient_name,
            registration_no: input.registration_no,
            note: input.note,
            created_at: now,
            updated_at: now,
        };
        scope::stamp_new(ctx, &mut record);

        self.records.insert(record).await
    }

    /// Update a record the caller's institution owns
    pub async fn update(
        &self,
        ctx: &TenantContext,
        id: i64,
        input: UpdateRecordInput,
    ) -> Result<PatientRecord> {
        input.validate()?;

        let mut record = self.get(ctx, id).await?;
        scope::guard_update(ctx, &record)?;

        if let Some(patient_name) = input.patient_name {
            record.patient_name = patient_name;
        }
        if let Some(registration_no) = input.registration_no {
            record.registration_no = registration_no;
        }
        if let Some(note) = input.note {
            record.note = Some(note);
        }

        self.records.update(record).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{DecryptFallback, EncryptionKey, FieldCipher};
    use crate::repository::InMemoryRecordRepository;

    fn service() -> RecordService {
        let cipher = FieldCipher::new(EncryptionKey::new([0x22u8; 32]), DecryptFallback::Reject);
        RecordService::new(Arc::new(InMemoryRecordRepository::new(cipher)))
    }

    fn staff_ctx() -> TenantContext {
        TenantContext::resolve(Some("H1"), vec!["H1".to_string(), "H2".to_string()])
    }

    fn create_input(name: &str, tenant_code: Option<&str>) -> CreateRecordInput {
        CreateRecordInput {
            patient_name: name.to_string(),
            registration_no: format!("R-{name}"),
            tenant_code: tenant_code.map(String::from),
            note: None,
        }
    }

    async fn seed_three_tenants(service: &RecordService) -> (i64, i64, i64) {
        let admin = TenantContext::admin();
        let a = service
            .create(&admin, create_input("InH1", Some("H1")))
            .await
            .unwrap();
        let b = service
            .create(&admin, create_input("InH2", Some("H2")))
            .await
            .unwrap();
        let c = service
            .create(&admin, create_input("InH3", Some("H3")))
            .await
            .unwrap();
        (a.id, b.id, c.id)
    }

    #[tokio::test]
    async fn test_list_filters_to_membership_tenants() {
        let service = service();
        seed_three_tenants(&service).await;

        let visible = service.list(&staff_ctx()).await.unwrap();
        let codes: Vec<_> = visible
            .iter()
            .map(|r| r.tenant_code.as_deref().unwrap().to_string())
            .collect();

        assert_eq!(codes, vec!["H1", "H2"]);
    }

    #[tokio::test]
    async fn test_list_admin_sees_everything() {
        let service = service();
        seed_three_tenants(&service).await;

        let all = service.list(&TenantContext::admin()).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_get_outside_membership_is_not_found() {
        let service = service();
        let (in_h1, _, in_h3) = seed_three_tenants(&service).await;

        let ctx = staff_ctx();
        assert!(service.get(&ctx, in_h1).await.is_ok());

        let result = service.get(&ctx, in_h3).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_create_stamps_caller_institution() {
        let service = service();

        let created = service
            .create(&staff_ctx(), create_input("NewPatient", None))
            .await
            .unwrap();

        assert_eq!(created.tenant_code.as_deref(), Some("H1"));
    }

    #[tokio::test]
    async fn test_create_keeps_explicit_institution() {
        let service = service();

        let created = service
            .create(&staff_ctx(), create_input("NewPatient", Some("H2")))
            .await
            .unwrap();

        assert_eq!(created.tenant_code.as_deref(), Some("H2"));
    }

    #[tokio::test]
    async fn test_update_cross_tenant_is_forbidden_for_non_admin() {
        let service = service();
        let (_, in_h2, _) = seed_three_tenants(&service).await;

        // H2 is readable for this caller but owned by another institution
        let result = service
            .update(
                &staff_ctx(),
                in_h2,
                UpdateRecordInput {
                    patient_name: Some("Changed".to_string()),
                    registration_no: None,
                    note: None,
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_update_same_tenant_succeeds() {
        let service = service();
        let (in_h1, _, _) = seed_three_tenants(&service).await;

        let updated = service
            .update(
                &staff_ctx(),
                in_h1,
                UpdateRecordInput {
                    patient_name: Some("Renamed".to_string()),
                    registration_no: None,
                    note: Some("allergy noted".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.patient_name, "Renamed");
        assert_eq!(updated.note.as_deref(), Some("allergy noted"));
        assert_eq!(updated.registration_no, "R-InH1");
    }

    #[tokio::test]
    async fn test_update_admin_may_cross_tenants() {
        let service = service();
        let (_, _, in_h3) = seed_three_tenants(&service).await;

        let updated = service
            .update(
                &TenantContext::admin(),
                in_h3,
                UpdateRecordInput {
                    patient_name: Some("AdminEdit".to_string()),
                    registration_no: None,
                    note: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.patient_name, "AdminEdit");
    }

    #[tokio::test]
    async fn test_update_invisible_record_is_not_found_not_forbidden() {
        let service = service();
        let (_, _, in_h3) = seed_three_tenants(&service).await;

        // Existence of the H3 record must not leak through the error kind
        let result = service
            .update(
                &staff_ctx(),
                in_h3,
                UpdateRecordInput {
                    patient_name: Some("Probe".to_string()),
                    registration_no: None,
                    note: None,
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
