//! Admission request and verdict vocabulary

use serde::{Deserialize, Serialize};

use super::bot::BotVerdict;
use super::fingerprint::Fingerprint;

/// Class of route, selecting the rate limit policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteClass {
    /// General API and page traffic
    Api,
    /// Credential endpoints (login, registration, password reset)
    Auth,
    /// Traffic the bot scorer flagged
    Bot,
}

impl RouteClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteClass::Api => "api",
            RouteClass::Auth => "auth",
            RouteClass::Bot => "bot",
        }
    }
}

impl std::fmt::Display for RouteClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a request was not admitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DenyReason {
    #[serde(rename = "killswitch")]
    KillSwitch,
    #[serde(rename = "blocked")]
    Blocked,
    #[serde(rename = "rate_limited")]
    RateLimited,
    #[serde(rename = "circuit_open")]
    CircuitOpen,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::KillSwitch => "killswitch",
            DenyReason::Blocked => "blocked",
            DenyReason::RateLimited => "rate_limited",
            DenyReason::CircuitOpen => "circuit_open",
        }
    }
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Methods that create, update or delete data
pub fn is_mutating(method: &str) -> bool {
    matches!(
        method.to_ascii_uppercase().as_str(),
        "POST" | "PUT" | "PATCH" | "DELETE"
    )
}

/// Input to the admission decision
#[derive(Debug, Clone)]
pub struct AdmissionRequest {
    pub fingerprint: Fingerprint,
    pub route_class: RouteClass,
    pub method: String,
    /// Client address checked against the blocklist
    pub ip: Option<String>,
    pub path: Option<String>,
    pub bot: Option<BotVerdict>,
}

impl AdmissionRequest {
    pub fn new(fingerprint: Fingerprint, route_class: RouteClass, method: impl Into<String>) -> Self {
        Self {
            fingerprint,
            route_class,
            method: method.into(),
            ip: None,
            path: None,
            bot: None,
        }
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Attach the bot verdict; flagged requests move to the bot class
    pub fn with_bot_verdict(mut self, verdict: BotVerdict) -> Self {
        if verdict.is_bot {
            self.route_class = RouteClass::Bot;
        }
        self.bot = Some(verdict);
        self
    }

    pub fn is_mutating(&self) -> bool {
        is_mutating(&self.method)
    }

    pub fn is_flagged_bot(&self) -> bool {
        self.bot.as_ref().is_some_and(|v| v.is_bot)
    }
}
