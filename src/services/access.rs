use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::errors::AppError;
use crate::models::Capabilities;

const DENIAL_WINDOW: Duration = Duration::from_secs(600);
const DENIAL_WARN_THRESHOLD: u32 = 5;

#[derive(Default)]
pub struct DenialLog {
    entries: Mutex<HashMap<String, (u32, Instant)>>,
}

impl DenialLog {
    pub fn new() -> Self {
        Self::default()
    }

    // returns the principal's count within the window
    pub fn record(&self, user_id: &str) -> u32 {
        let Ok(mut entries) = self.entries.lock() else {
            return 1;
        };
        let now = Instant::now();
        entries.retain(|_, (_, started)| now.duration_since(*started) < DENIAL_WINDOW);

        let entry = entries.entry(user_id.to_string()).or_insert((0, now));
        entry.0 += 1;
        entry.0
    }
}

fn deny(caps: &Capabilities, action: &str, denials: &DenialLog) -> AppError {
    let count = denials.record(&caps.user_id);
    if count >= DENIAL_WARN_THRESHOLD {
        tracing::warn!(
            user_id = %caps.user_id,
            role = caps.role.as_str(),
            action,
            denials = count,
            "repeated authorization denials"
        );
    } else {
        tracing::info!(user_id = %caps.user_id, role = caps.role.as_str(), action, "access denied");
    }
    AppError::Forbidden
}

pub fn require_staff(caps: &Capabilities, action: &str, denials: &DenialLog) -> Result<(), AppError> {
    if caps.can_access {
        Ok(())
    } else {
        Err(deny(caps, action, denials))
    }
}

pub fn require_admin(caps: &Capabilities, action: &str, denials: &DenialLog) -> Result<(), AppError> {
    if caps.is_admin {
        Ok(())
    } else {
        Err(deny(caps, action, denials))
    }
}
