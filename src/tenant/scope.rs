//! Tenant scoping rules for persisted entities
//!
//! Every read and write of a tenant-owned entity goes through these
//! helpers. A single fetch outside the caller's tenants must surface as
//! "not found", never "forbidden": a 403 would confirm the entity exists.

use crate::domain::PatientRecord;
use crate::error::{AppError, Result};

use super::TenantContext;

/// Implemented by entities that belong to a tenant
pub trait TenantScoped {
    fn tenant_code(&self) -> Option<&str>;
    fn set_tenant_code(&mut self, code: String);
}

impl TenantScoped for PatientRecord {
    fn tenant_code(&self) -> Option<&str> {
        self.tenant_code.as_deref()
    }

    fn set_tenant_code(&mut self, code: String) {
        self.tenant_code = Some(code);
    }
}

/// Whether the caller may see this entity. Entities without a tenant code
/// are unscoped and visible to any caller.
pub fn visible<T: TenantScoped>(ctx: &TenantContext, entity: &T) -> bool {
    match entity.tenant_code() {
        Some(code) => ctx.allows(code),
        None => true,
    }
}

/// Drop entities the caller may not see from a collection read
pub fn filter_visible<T: TenantScoped>(ctx: &TenantContext, items: Vec<T>) -> Vec<T> {
    if !ctx.is_scoped() {
        return items;
    }
    items.into_iter().filter(|item| visible(ctx, item)).collect()
}

/// Stamp a new entity with the caller's primary tenant when it has none.
/// Admin-created entities keep whatever was (or was not) supplied.
pub fn stamp_new<T: TenantScoped>(ctx: &TenantContext, entity: &mut T) {
    if ctx.is_admin() || entity.tenant_code().is_some() {
        return;
    }
    if let Some(primary) = ctx.primary() {
        entity.set_tenant_code(primary.to_string());
    }
}

/// Reject a non-admin update that would touch another tenant's entity.
/// Cross-tenant mutation is fatal, never redirected.
pub fn guard_update<T: TenantScoped>(ctx: &TenantContext, existing: &T) -> Result<()> {
    if ctx.is_admin() {
        return Ok(());
    }
    if let (Some(code), Some(primary)) = (existing.tenant_code(), ctx.primary()) {
        if code != primary {
            return Err(AppError::Forbidden(
                "Entity belongs to another institution".to_string(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(tenant_code: Option<&str>) -> PatientRecord {
        PatientRecord {
            id: 1,
            tenant_code: tenant_code.map(String::from),
            patient_name: "Yamada Hanako".to_string(),
            registration_no: "R-0042".to_string(),
            note: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn staff_ctx() -> TenantContext {
        TenantContext::resolve(Some("H1"), vec!["H1".to_string(), "H2".to_string()])
    }

    #[test]
    fn test_visible_inside_membership() {
        let ctx = staff_ctx();

        assert!(visible(&ctx, &record(Some("H1"))));
        assert!(visible(&ctx, &record(Some("H2"))));
        assert!(!visible(&ctx, &record(Some("H3"))));
    }

    #[test]
    fn test_unscoped_entity_visible_to_everyone() {
        assert!(visible(&staff_ctx(), &record(None)));
        assert!(visible(&TenantContext::admin(), &record(None)));
    }

    #[test]
    fn test_filter_visible_keeps_membership_tenants() {
        let ctx = staff_ctx();
        let items = vec![
            record(Some("H1")),
            record(Some("H3")),
            record(Some("H2")),
        ];

        let kept = filter_visible(&ctx, items);
        let codes: Vec<_> = kept.iter().map(|r| r.tenant_code.clone()).collect();
        assert_eq!(
            codes,
            vec![Some("H1".to_string()), Some("H2".to_string())]
        );
    }

    #[test]
    fn test_filter_visible_admin_sees_all() {
        let ctx = TenantContext::admin();
        let items = vec![record(Some("H1")), record(Some("H3"))];

        assert_eq!(filter_visible(&ctx, items).len(), 2);
    }

    #[test]
    fn test_stamp_new_fills_missing_code() {
        let ctx = staff_ctx();
        let mut entity = record(None);

        stamp_new(&ctx, &mut entity);
        assert_eq!(entity.tenant_code.as_deref(), Some("H1"));
    }

    #[test]
    fn test_stamp_new_keeps_existing_code() {
        let ctx = staff_ctx();
        let mut entity = record(Some("H2"));

        stamp_new(&ctx, &mut entity);
        assert_eq!(entity.tenant_code.as_deref(), Some("H2"));
    }

    #[test]
    fn test_stamp_new_admin_leaves_entity_alone() {
        let ctx = TenantContext::admin();
        let mut entity = record(None);

        stamp_new(&ctx, &mut entity);
        assert_eq!(entity.tenant_code, None);
    }

    #[test]
    fn test_guard_update_same_tenant_ok() {
        let ctx = staff_ctx();
        assert!(guard_update(&ctx, &record(Some("H1"))).is_ok());
    }

    #[test]
    fn test_guard_update_cross_tenant_forbidden() {
        let ctx = staff_ctx();
        let result = guard_update(&ctx, &record(Some("H3")));

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[test]
    fn test_guard_update_readable_sibling_tenant_still_forbidden() {
        // H2 is readable for this caller, but writes stay with the primary
        let ctx = staff_ctx();
        let result = guard_update(&ctx, &record(Some("H2")));

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[test]
    fn test_guard_update_admin_may_cross_tenants() {
        let ctx = TenantContext::admin();
        assert!(guard_update(&ctx, &record(Some("H3"))).is_ok());
    }

    #[test]
    fn test_guard_update_unscoped_entity_ok() {
        let ctx = staff_ctx();
        assert!(guard_update(&ctx, &record(None)).is_ok());
    }
}
