use anyhow::Context;

use crate::config::BootstrapAdmin;
use crate::db::queries;
use crate::models::Role;
use crate::services::identity::IdentityError;
use crate::state::AppState;

const MIN_PASSWORD_CHARS: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    Skipped,
    Provisioned { user_id: String },
}

pub async fn provision_admin(state: &AppState, admin: &BootstrapAdmin) -> anyhow::Result<BootstrapOutcome> {
    let existing_admins = {
        let db = state.db()?;
        queries::count_profiles_with_role(&db, Role::Admin)?
    };
    if existing_admins > 0 {
        tracing::info!(admins = existing_admins, "admin already provisioned, skipping bootstrap");
        return Ok(BootstrapOutcome::Skipped);
    }

    anyhow::ensure!(
        admin.password.chars().count() >= MIN_PASSWORD_CHARS,
        "BOOTSTRAP_ADMIN_PASSWORD must be at least {MIN_PASSWORD_CHARS} characters"
    );

    let user = match state
        .identity
        .sign_up(&admin.email, &admin.password, Some(&admin.full_name))
        .await
    {
        Ok(user) => user,
        // Already registered: prove we hold the password before promoting it.
        Err(IdentityError::Rejected(reason)) => {
            tracing::info!(reason = %reason, "bootstrap sign-up rejected, trying sign-in");
            state
                .identity
                .sign_in(&admin.email, &admin.password)
                .await
                .context("bootstrap admin exists but the configured password was refused")?
                .user
        }
        Err(e) => return Err(e).context("bootstrap admin sign-up failed"),
    };

    {
        let db = state.db()?;
        queries::upsert_admin_profile(&db, &user.id, &admin.email, &admin.full_name)?;
        queries::record_audit(&db, "bootstrap", "user.role", &user.id, Some("provisioned as admin"))?;
    }

    tracing::info!(user_id = %user.id, email = %admin.email, "bootstrap admin provisioned");
    Ok(BootstrapOutcome::Provisioned { user_id: user.id })
}
