//! Staff management of catalog entries.

use crate::db::catalog;
use crate::errors::AppError;
use crate::models::{Capabilities, CatalogEntry, CatalogKind};
use crate::services::access::require_staff;
use crate::state::AppState;

fn not_found(kind: CatalogKind, id: &str) -> AppError {
    AppError::NotFound(format!("{} entry {id}", kind.as_str()))
}

pub fn list(state: &AppState, caps: &Capabilities, kind: CatalogKind) -> Result<Vec<CatalogEntry>, AppError> {
    require_staff(caps, "catalog.list", &state.denials)?;
    let db = state.db()?;
    Ok(catalog::list_entries(&db, kind)?)
}

pub fn get(state: &AppState, caps: &Capabilities, kind: CatalogKind, id: &str) -> Result<CatalogEntry, AppError> {
    require_staff(caps, "catalog.read", &state.denials)?;
    let db = state.db()?;
    catalog::get_entry(&db, kind, id)?.ok_or_else(|| not_found(kind, id))
}

pub fn create(
    state: &AppState,
    caps: &Capabilities,
    kind: CatalogKind,
    payload: serde_json::Value,
) -> Result<CatalogEntry, AppError> {
    require_staff(caps, "catalog.create", &state.denials)?;
    let data = kind.normalize(payload).map_err(AppError::InvalidRequest)?;

    let db = state.db()?;
    let entry = catalog::insert_entry(&db, kind, &data)?;
    tracing::info!(kind = kind.as_str(), id = %entry.id, actor = %caps.user_id, "catalog entry created");
    Ok(entry)
}

/// Replace an entry's fields. The payload is validated as a whole record.
pub fn update(
    state: &AppState,
    caps: &Capabilities,
    kind: CatalogKind,
    id: &str,
    payload: serde_json::Value,
) -> Result<CatalogEntry, AppError> {
    require_staff(caps, "catalog.update", &state.denials)?;
    let data = kind.normalize(payload).map_err(AppError::InvalidRequest)?;

    let db = state.db()?;
    if !catalog::update_entry(&db, kind, id, &data)? {
        return Err(not_found(kind, id));
    }
    tracing::info!(kind = kind.as_str(), id = %id, actor = %caps.user_id, "catalog entry updated");
    catalog::get_entry(&db, kind, id)?.ok_or_else(|| not_found(kind, id))
}

pub fn delete(state: &AppState, caps: &Capabilities, kind: CatalogKind, id: &str) -> Result<(), AppError> {
    require_staff(caps, "catalog.delete", &state.denials)?;

    let db = state.db()?;
    if !catalog::delete_entry(&db, kind, id)? {
        return Err(not_found(kind, id));
    }
    tracing::info!(kind = kind.as_str(), id = %id, actor = %caps.user_id, "catalog entry deleted");
    Ok(())
}
