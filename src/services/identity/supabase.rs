use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::json;

use super::{AuthSession, IdentityError, IdentityProvider, IdentityUser};

pub struct SupabaseAuth {
    url: String,
    api_key: String,
    client: reqwest::Client,
}

impl SupabaseAuth {
    pub fn new(url: String, api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            url: url.trim_end_matches('/').to_string(),
            api_key,
            client,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.url)
    }

    async fn read_json(
        resp: reqwest::Response,
    ) -> (StatusCode, serde_json::Value) {
        let status = resp.status();
        let data = resp
            .json::<serde_json::Value>()
            .await
            .unwrap_or(serde_json::Value::Null);
        (status, data)
    }
}

fn unavailable(e: reqwest::Error) -> IdentityError {
    IdentityError::Unavailable(e.to_string())
}

fn error_message(data: &serde_json::Value) -> String {
    ["msg", "error_description", "message", "error"]
        .iter()
        .find_map(|key| data.get(*key).and_then(|v| v.as_str()))
        .unwrap_or("request rejected")
        .to_string()
}

fn classify(status: StatusCode, data: &serde_json::Value) -> IdentityError {
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        IdentityError::Unavailable(format!("auth service error ({status})"))
    } else {
        IdentityError::Rejected(error_message(data))
    }
}

fn parse_user(data: &serde_json::Value) -> Option<IdentityUser> {
    Some(IdentityUser {
        id: data.get("id")?.as_str()?.to_string(),
        email: data
            .get("email")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
    })
}

#[async_trait]
impl IdentityProvider for SupabaseAuth {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<IdentityUser, IdentityError> {
        let body = json!({
            "email": email,
            "password": password,
            "data": { "full_name": full_name },
        });

        let resp = self
            .client
            .post(self.endpoint("signup"))
            .header("apikey", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(unavailable)?;
        let (status, data) = Self::read_json(resp).await;

        if !status.is_success() {
            return Err(classify(status, &data));
        }

        // Auto-confirming projects wrap the user in a session.
        let user = data.get("user").filter(|u| !u.is_null()).unwrap_or(&data);
        parse_user(user)
            .ok_or_else(|| IdentityError::Unavailable("sign-up response missing user id".to_string()))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, IdentityError> {
        let resp = self
            .client
            .post(self.endpoint("token?grant_type=password"))
            .header("apikey", &self.api_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(unavailable)?;
        let (status, data) = Self::read_json(resp).await;

        if !status.is_success() {
            return Err(classify(status, &data));
        }

        let access_token = data
            .get("access_token")
            .and_then(|v| v.as_str())
            .ok_or_else(|| IdentityError::Unavailable("sign-in response missing token".to_string()))?
            .to_string();
        let user = data
            .get("user")
            .and_then(parse_user)
            .ok_or_else(|| IdentityError::Unavailable("sign-in response missing user".to_string()))?;

        Ok(AuthSession {
            access_token,
            expires_in: data.get("expires_in").and_then(|v| v.as_i64()).unwrap_or(3600),
            user,
        })
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError> {
        let resp = self
            .client
            .post(self.endpoint("logout"))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(unavailable)?;
        let (status, data) = Self::read_json(resp).await;

        // An already-expired session is as signed out as it gets.
        if status.is_success() || status == StatusCode::UNAUTHORIZED {
            return Ok(());
        }
        Err(classify(status, &data))
    }

    async fn user_for_token(
        &self,
        access_token: &str,
    ) -> Result<Option<IdentityUser>, IdentityError> {
        let resp = self
            .client
            .get(self.endpoint("user"))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(unavailable)?;
        let (status, data) = Self::read_json(resp).await;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(classify(status, &data));
        }
        Ok(parse_user(&data))
    }
}
