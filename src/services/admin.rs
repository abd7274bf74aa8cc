use std::collections::BTreeMap;

use serde::Serialize;

use crate::db::queries::{self, AuditEntry, BookingFilter, BookingStats, ProfileFilter};
use crate::db::catalog;
use crate::errors::AppError;
use crate::models::{Booking, BookingStatus, Capabilities, CatalogKind, Profile, Role};
use crate::services::access::{require_admin, require_staff};
use crate::state::AppState;

#[derive(Debug, Clone, Default, Serialize)]
pub struct RoleCounts {
    pub admin: i64,
    pub manager: i64,
    pub user: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub bookings: BookingStats,
    pub users: RoleCounts,
    pub catalog: BTreeMap<&'static str, i64>,
}

pub fn dashboard(state: &AppState, caps: &Capabilities) -> Result<DashboardStats, AppError> {
    require_staff(caps, "stats.read", &state.denials)?;

    let db = state.db()?;
    let bookings = queries::booking_stats(&db)?;
    let users = RoleCounts {
        admin: queries::count_profiles_with_role(&db, Role::Admin)?,
        manager: queries::count_profiles_with_role(&db, Role::Manager)?,
        user: queries::count_profiles_with_role(&db, Role::User)?,
    };

    let mut counts = BTreeMap::new();
    for kind in CatalogKind::ALL {
        counts.insert(kind.as_str(), catalog::count_entries(&db, kind)?);
    }

    Ok(DashboardStats {
        bookings,
        users,
        catalog: counts,
    })
}

pub fn list_bookings(
    state: &AppState,
    caps: &Capabilities,
    filter: &BookingFilter,
) -> Result<Vec<Booking>, AppError> {
    require_staff(caps, "bookings.list", &state.denials)?;
    let db = state.db()?;
    Ok(queries::list_bookings(&db, filter)?)
}

pub fn get_booking(state: &AppState, caps: &Capabilities, id: &str) -> Result<Booking, AppError> {
    require_staff(caps, "bookings.read", &state.denials)?;
    let db = state.db()?;
    queries::get_booking_by_id(&db, id)?.ok_or_else(|| {
        tracing::info!(booking_id = %id, "booking not found");
        AppError::NotFound(format!("booking {id}"))
    })
}

pub fn set_booking_status(
    state: &AppState,
    caps: &Capabilities,
    id: &str,
    status: BookingStatus,
) -> Result<Booking, AppError> {
    require_staff(caps, "bookings.status", &state.denials)?;

    let db = state.db()?;
    let previous = queries::get_booking_by_id(&db, id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;

    queries::update_booking_status(&db, id, status)?;
    let detail = format!("{} -> {}", previous.status.as_str(), status.as_str());
    queries::record_audit(&db, &caps.user_id, "booking.status", id, Some(&detail))?;

    tracing::info!(
        booking_id = %id,
        actor = %caps.user_id,
        from = previous.status.as_str(),
        to = status.as_str(),
        "booking status changed by staff"
    );

    queries::get_booking_by_id(&db, id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))
}

pub fn delete_booking(state: &AppState, caps: &Capabilities, id: &str) -> Result<(), AppError> {
    require_staff(caps, "bookings.delete", &state.denials)?;

    let db = state.db()?;
    let Some(booking) = queries::get_booking_by_id(&db, id)? else {
        return Err(AppError::NotFound(format!("booking {id}")));
    };

    queries::delete_booking(&db, id)?;
    let detail = format!(
        "{} for {} ({})",
        booking.service_name,
        booking.customer_email,
        booking.status.as_str()
    );
    queries::record_audit(&db, &caps.user_id, "booking.delete", id, Some(&detail))?;

    tracing::info!(booking_id = %id, actor = %caps.user_id, "booking deleted");
    Ok(())
}

const CSV_HEADER: &str = "date,customer,email,service,amount,status,payment_intent_id";

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn payments_csv(bookings: &[Booking]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for b in bookings {
        let row = [
            b.created_at.format("%Y-%m-%d").to_string(),
            b.customer_name.clone(),
            b.customer_email.clone(),
            b.service_name.clone(),
            b.total_cost.to_string(),
            b.status.as_str().to_string(),
            b.payment_intent_id.clone().unwrap_or_default(),
        ];
        let row: Vec<String> = row.iter().map(|v| csv_field(v)).collect();
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

pub fn export_payments(
    state: &AppState,
    caps: &Capabilities,
    filter: &BookingFilter,
) -> Result<String, AppError> {
    require_staff(caps, "payments.export", &state.denials)?;

    let bookings = {
        let db = state.db()?;
        queries::list_bookings(&db, filter)?
    };
    tracing::info!(actor = %caps.user_id, rows = bookings.len(), "payments exported");
    Ok(payments_csv(&bookings))
}

pub fn list_profiles(
    state: &AppState,
    caps: &Capabilities,
    filter: &ProfileFilter,
) -> Result<Vec<Profile>, AppError> {
    require_staff(caps, "users.list", &state.denials)?;
    let db = state.db()?;
    Ok(queries::list_profiles(&db, filter)?)
}

/// Change a principal's role. The last admin cannot be demoted.
pub fn set_role(
    state: &AppState,
    caps: &Capabilities,
    user_id: &str,
    role: Role,
) -> Result<Profile, AppError> {
    require_admin(caps, "users.role", &state.denials)?;

    let db = state.db()?;
    let profile = queries::get_profile(&db, user_id)?
        .ok_or_else(|| AppError::NotFound(format!("profile {user_id}")))?;

    if profile.role == Role::Admin
        && role != Role::Admin
        && queries::count_profiles_with_role(&db, Role::Admin)? <= 1
    {
        return Err(AppError::InvalidRequest(
            "cannot remove the last admin".to_string(),
        ));
    }

    queries::set_role(&db, user_id, role)?;
    let detail = format!("{} -> {}", profile.role.as_str(), role.as_str());
    queries::record_audit(&db, &caps.user_id, "user.role", user_id, Some(&detail))?;

    tracing::info!(
        user_id = %user_id,
        actor = %caps.user_id,
        from = profile.role.as_str(),
        to = role.as_str(),
        "role changed"
    );

    queries::get_profile(&db, user_id)?
        .ok_or_else(|| AppError::NotFound(format!("profile {user_id}")))
}

pub fn list_audit(state: &AppState, caps: &Capabilities, limit: i64) -> Result<Vec<AuditEntry>, AppError> {
    require_admin(caps, "audit.list", &state.denials)?;
    let db = state.db()?;
    Ok(queries::list_audit(&db, limit)?)
}
