use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;

use tourdesk::config::AppConfig;
use tourdesk::db;
use tourdesk::services::access::DenialLog;
use tourdesk::services::ai::openai::OpenAiProvider;
use tourdesk::services::bootstrap::{self, BootstrapOutcome};
use tourdesk::services::identity::supabase::SupabaseAuth;
use tourdesk::services::payments::stripe::StripeGateway;
use tourdesk::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    if config.stripe_secret_key.is_empty() {
        tracing::warn!("STRIPE_SECRET_KEY not set, bookings will fail with a gateway error");
    }
    if config.stripe_webhook_secret.is_empty() {
        tracing::warn!("STRIPE_WEBHOOK_SECRET not set, payment webhook disabled");
    }
    if config.openai_api_key.is_empty() {
        tracing::warn!("OPENAI_API_KEY not set, virtual guide will apologise");
    }
    tracing::info!(
        currency = %config.currency,
        model = %config.openai_model,
        "providers configured"
    );

    let payments = StripeGateway::new(config.stripe_secret_key.clone(), config.stripe_api_base.clone());
    let identity = SupabaseAuth::new(config.auth_url.clone(), config.auth_api_key.clone());
    let llm = OpenAiProvider::new(
        config.openai_api_key.clone(),
        config.openai_api_base.clone(),
        config.openai_model.clone(),
    );

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        payments: Box::new(payments),
        identity: Box::new(identity),
        llm: Box::new(llm),
        denials: DenialLog::new(),
    });

    if let Some(admin) = &config.bootstrap_admin {
        match bootstrap::provision_admin(&state, admin).await? {
            BootstrapOutcome::Provisioned { user_id } => {
                tracing::info!(user_id = %user_id, "admin bootstrap complete, unset BOOTSTRAP_ADMIN_PASSWORD")
            }
            BootstrapOutcome::Skipped => {}
        }
    }

    let app = tourdesk::build_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
