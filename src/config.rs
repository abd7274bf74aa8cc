use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub currency: String,
    pub cors_origin: String,
    pub stripe_secret_key: String,
    pub stripe_api_base: String,
    pub stripe_webhook_secret: String,
    pub auth_url: String,
    pub auth_api_key: String,
    pub openai_api_key: String,
    pub openai_api_base: String,
    pub openai_model: String,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

/// One-time admin provisioning credentials. Only present when both the
/// email and the password are set in the environment.
#[derive(Clone, Debug)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "tourdesk.db".to_string()),
            currency: env::var("CURRENCY")
                .map(|c| c.to_lowercase())
                .unwrap_or_else(|_| "usd".to_string()),
            cors_origin: env::var("CORS_ORIGIN").unwrap_or_else(|_| "*".to_string()),
            stripe_secret_key: env::var("STRIPE_SECRET_KEY").unwrap_or_default(),
            stripe_api_base: env::var("STRIPE_API_BASE")
                .unwrap_or_else(|_| "https://api.stripe.com".to_string()),
            stripe_webhook_secret: env::var("STRIPE_WEBHOOK_SECRET").unwrap_or_default(),
            auth_url: env::var("AUTH_URL").unwrap_or_else(|_| "http://localhost:54321".to_string()),
            auth_api_key: env::var("AUTH_API_KEY").unwrap_or_default(),
            openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            openai_api_base: env::var("OPENAI_API_BASE")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4.1-mini".to_string()),
            bootstrap_admin: bootstrap_admin_from_env(),
        }
    }
}

fn bootstrap_admin_from_env() -> Option<BootstrapAdmin> {
    let email = env::var("BOOTSTRAP_ADMIN_EMAIL").ok().filter(|v| !v.trim().is_empty())?;
    let password = env::var("BOOTSTRAP_ADMIN_PASSWORD").ok().filter(|v| !v.is_empty())?;
    let full_name = env::var("BOOTSTRAP_ADMIN_NAME")
        .unwrap_or_else(|_| "System Administrator".to_string());

    Some(BootstrapAdmin {
        email: email.trim().to_string(),
        password,
        full_name,
    })
}
