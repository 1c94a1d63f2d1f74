//! Request fingerprints

use serde::{Deserialize, Serialize};

/// Sentinel used when the client address could not be determined
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Identity key for rate limiting, derived from the client IP and optionally
/// the route and resource slug.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Build a fingerprint from request metadata
    ///
    /// Blank components are ignored; a missing IP becomes [`UNKNOWN_CLIENT`].
    pub fn from_parts(ip: Option<&str>, route: Option<&str>, slug: Option<&str>) -> Self {
        let ip = ip
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .unwrap_or(UNKNOWN_CLIENT);

        let mut key = ip.to_string();
        for part in [route, slug].into_iter().flatten() {
            let part = part.trim();
            if !part.is_empty() {
                key.push(':');
                key.push_str(part);
            }
        }
        Self(key)
    }

    /// Fingerprint scoped to the client only
    pub fn for_ip(ip: Option<&str>) -> Self {
        Self::from_parts(ip, None, None)
    }

    /// Fingerprint scoped to a client and route
    pub fn for_route(ip: Option<&str>, route: &str) -> Self {
        Self::from_parts(ip, Some(route), None)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the client address was missing
    pub fn is_unknown(&self) -> bool {
        self.0 == UNKNOWN_CLIENT || self.0.starts_with("unknown:")
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ip_only() {
        assert_eq!(Fingerprint::for_ip(Some("1.2.3.4")).as_str(), "1.2.3.4");
    }

    #[test]
    fn test_route_and_slug_are_appended() {
        let fp = Fingerprint::from_parts(Some("1.2.3.4"), Some("comment"), Some("my-post"));
        assert_eq!(fp.as_str(), "1.2.3.4:comment:my-post");
        assert_eq!(
            Fingerprint::for_route(Some("1.2.3.4"), "login").as_str(),
            "1.2.3.4:login"
        );
    }

    #[test]
    fn test_missing_ip_maps_to_sentinel() {
        assert_eq!(Fingerprint::for_ip(None).as_str(), UNKNOWN_CLIENT);
        assert_eq!(Fingerprint::for_ip(Some("  ")).as_str(), UNKNOWN_CLIENT);
        let fp = Fingerprint::for_route(None, "login");
        assert_eq!(fp.as_str(), "unknown:login");
        assert!(fp.is_unknown());
    }

    #[test]
    fn test_blank_parts_are_skipped() {
        let fp = Fingerprint::from_parts(Some("10.0.0.1"), Some(""), Some("slug"));
        assert_eq!(fp.as_str(), "10.0.0.1:slug");
    }
}
