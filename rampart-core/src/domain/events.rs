//! Security events shown on the admin dashboard

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityEventKind {
    Blocked,
    RateLimited,
    BotFlagged,
    KillSwitch,
    CircuitOpen,
    AdminAction,
}

impl SecurityEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityEventKind::Blocked => "blocked",
            SecurityEventKind::RateLimited => "rate_limited",
            SecurityEventKind::BotFlagged => "bot_flagged",
            SecurityEventKind::KillSwitch => "kill_switch",
            SecurityEventKind::CircuitOpen => "circuit_open",
            SecurityEventKind::AdminAction => "admin_action",
        }
    }
}

/// A recorded security-relevant occurrence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityEvent {
    /// Assigned by the event log; increases monotonically
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub kind: SecurityEventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub detail: String,
}

impl SecurityEvent {
    pub fn new(kind: SecurityEventKind, detail: impl Into<String>) -> Self {
        Self {
            id: 0,
            timestamp: Utc::now(),
            kind,
            ip: None,
            path: None,
            detail: detail.into(),
        }
    }

    pub fn with_ip(mut self, ip: Option<&str>) -> Self {
        self.ip = ip.map(str::to_string);
        self
    }

    pub fn with_path(mut self, path: Option<&str>) -> Self {
        self.path = path.map(str::to_string);
        self
    }
}
