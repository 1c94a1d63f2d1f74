//! Bot heuristic scoring
//!
//! Each heuristic that fires adds its configured weight to the score and a
//! reason to the verdict. Rules are independent and always accumulate.

use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::config::{BotDetectionConfig, BotWeights};

/// Upper bound of a bot score
pub const MAX_SCORE: u8 = 100;

/// Request attributes inspected by the scorer
#[derive(Debug, Clone, Default)]
pub struct RequestProfile {
    pub method: String,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub accept: Option<String>,
    pub accept_language: Option<String>,
    pub accept_encoding: Option<String>,
    pub ip: Option<IpAddr>,
}

impl RequestProfile {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            ..Self::default()
        }
    }
}

/// Outcome of scoring a single request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotVerdict {
    pub is_bot: bool,
    pub score: u8,
    pub reasons: Vec<String>,
}

impl BotVerdict {
    pub fn human() -> Self {
        Self {
            is_bot: false,
            score: 0,
            reasons: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
struct ScoreAccumulator {
    score: u8,
    reasons: Vec<String>,
}

impl ScoreAccumulator {
    fn push(&mut self, weight: u8, reason: impl Into<String>) {
        self.score = self.score.saturating_add(weight);
        self.reasons.push(reason.into());
    }

    fn finish(self, threshold: u8) -> BotVerdict {
        let score = self.score.min(MAX_SCORE);
        BotVerdict {
            is_bot: score >= threshold,
            score,
            reasons: self.reasons,
        }
    }
}

/// Header-based bot scorer
#[derive(Debug, Clone)]
pub struct BotScorer {
    enabled: bool,
    threshold: u8,
    weights: BotWeights,
    suspicious_agents: Vec<String>,
    min_browser_agent_length: usize,
    datacenter_ranges: Vec<IpNet>,
}

impl BotScorer {
    pub fn new(config: &BotDetectionConfig) -> Self {
        Self {
            enabled: config.enabled,
            threshold: config.threshold,
            weights: config.weights.clone(),
            suspicious_agents: config
                .suspicious_agents
                .iter()
                .map(|a| a.trim().to_lowercase())
                .filter(|a| !a.is_empty())
                .collect(),
            min_browser_agent_length: config.min_browser_agent_length,
            datacenter_ranges: config.datacenter_ranges.clone(),
        }
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Score a request. Pure: no I/O, no state.
    pub fn score(&self, request: &RequestProfile) -> BotVerdict {
        if !self.enabled {
            return BotVerdict::human();
        }

        let w = &self.weights;
        let mut acc = ScoreAccumulator::default();
        let user_agent = present(&request.user_agent).map(str::to_lowercase);

        match &user_agent {
            Some(ua) => {
                if let Some(marker) = self.suspicious_agents.iter().find(|m| ua.contains(m.as_str()))
                {
                    acc.push(
                        w.suspicious_user_agent,
                        format!("suspicious user agent ({})", marker),
                    );
                }
                if !ua.contains("mozilla") && ua.len() < self.min_browser_agent_length {
                    acc.push(w.non_browser_user_agent, "non-browser user agent");
                }
            }
            None => acc.push(w.non_browser_user_agent, "missing user agent"),
        }

        let accept = present(&request.accept);
        if accept.is_none() {
            acc.push(w.missing_accept, "missing accept header");
        }
        if present(&request.accept_language).is_none() {
            acc.push(w.missing_accept_language, "missing accept-language header");
        }
        if present(&request.accept_encoding).is_none() {
            acc.push(w.missing_accept_encoding, "missing accept-encoding header");
        }

        if let Some(ip) = request.ip
            && self.is_datacenter(ip)
        {
            acc.push(w.datacenter_ip, "datacenter ip range");
        }

        let method = request.method.to_ascii_uppercase();
        if method == "POST" && present(&request.referer).is_none() {
            acc.push(w.post_without_referer, "post without referer");
        }
        if method == "GET"
            && let Some(accept) = accept
            && !accept.to_lowercase().contains("text/html")
        {
            acc.push(w.non_html_accept, "non-html accept on get");
        }

        acc.finish(self.threshold)
    }

    fn is_datacenter(&self, ip: IpAddr) -> bool {
        self.datacenter_ranges.iter().any(|net| net.contains(&ip))
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

    fn scorer() -> BotScorer {
        BotScorer::new(&BotDetectionConfig::default())
    }

    fn browser_get() -> RequestProfile {
        RequestProfile {
            method: "GET".to_string(),
            user_agent: Some(CHROME.to_string()),
            referer: Some("https://example.com/".to_string()),
            accept: Some("text/html,application/xhtml+xml,*/*;q=0.8".to_string()),
            accept_language: Some("en-US,en;q=0.9".to_string()),
            accept_encoding: Some("gzip, deflate, br".to_string()),
            ip: Some("203.0.113.7".parse().unwrap()),
        }
    }

    #[test]
    fn test_curl_without_accept_language_is_bot() {
        let request = RequestProfile {
            user_agent: Some("curl/7.68.0".to_string()),
            accept: Some("*/*".to_string()),
            ..RequestProfile::new("GET")
        };
        let verdict = scorer().score(&request);
        assert!(verdict.score >= 50, "score was {}", verdict.score);
        assert!(verdict.is_bot);
        assert!(verdict.reasons.iter().any(|r| r.contains("curl")));
    }

    #[test]
    fn test_browser_with_full_headers_is_human() {
        let verdict = scorer().score(&browser_get());
        assert!(verdict.score < 50);
        assert!(!verdict.is_bot);
        assert!(verdict.reasons.is_empty());
    }

    #[test]
    fn test_reasons_accumulate() {
        let verdict = scorer().score(&RequestProfile::new("POST"));
        // missing UA, accept, accept-language, accept-encoding, referer on POST
        assert_eq!(verdict.reasons.len(), 5);
        assert_eq!(verdict.score, 30 + 15 + 10 + 10 + 15);
    }

    #[test]
    fn test_score_is_capped() {
        let request = RequestProfile {
            user_agent: Some("python-requests/2.31".to_string()),
            ip: Some("104.131.10.10".parse().unwrap()),
            ..RequestProfile::new("POST")
        };
        let verdict = scorer().score(&request);
        assert_eq!(verdict.score, MAX_SCORE);
        assert!(verdict.reasons.iter().any(|r| r == "datacenter ip range"));
    }

    #[test]
    fn test_non_html_accept_on_get() {
        let mut request = browser_get();
        request.accept = Some("application/json".to_string());
        let verdict = scorer().score(&request);
        assert_eq!(verdict.score, 10);
        assert_eq!(verdict.reasons, vec!["non-html accept on get".to_string()]);
    }

    #[test]
    fn test_disabled_scorer_never_flags() {
        let config = BotDetectionConfig {
            enabled: false,
            ..BotDetectionConfig::default()
        };
        let verdict = BotScorer::new(&config).score(&RequestProfile::new("POST"));
        assert_eq!(verdict, BotVerdict::human());
    }

    #[test]
    fn test_weights_are_configurable() {
        let mut config = BotDetectionConfig::default();
        config.weights.missing_accept_language = 60;
        let mut request = browser_get();
        request.accept_language = None;
        let verdict = BotScorer::new(&config).score(&request);
        assert_eq!(verdict.score, 60);
        assert!(verdict.is_bot);
    }
}
