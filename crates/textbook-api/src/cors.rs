//! Cross-origin policy built from [`CorsConfig`].
//!
//! Origins are matched against three kinds of rule:
//!
//! - `*` allows every origin
//! - `https://*.example.app` allows any subdomain of `example.app` over
//!   `https`
//! - anything else must equal the request's `Origin` exactly
//!
//! Browsers reject `Access-Control-Allow-Origin: *` on credentialed
//! requests, so allowed origins are always mirrored back. Methods and
//! headers are mirrored from the preflight request.

use axum::http::request::Parts;
use axum::http::HeaderValue;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

use crate::config::CorsConfig;

/// One entry of the origin allow-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginRule {
    /// `*`
    Any,
    /// `scheme://*.suffix`
    Subdomain {
        /// Scheme including `://`.
        scheme: String,
        /// Domain suffix including the leading dot.
        suffix: String,
    },
    /// An exact origin.
    Exact(String),
}

impl OriginRule {
    /// Parse one configured origin entry.
    pub fn parse(entry: &str) -> Self {
        let entry = entry.trim().trim_end_matches('/');
        if entry == "*" {
            return Self::Any;
        }
        if let Some((scheme, rest)) = entry.split_once("://")
            && let Some(domain) = rest.strip_prefix("*.")
        {
            return Self::Subdomain {
                scheme: format!("{scheme}://"),
                suffix: format!(".{domain}"),
            };
        }
        Self::Exact(entry.to_owned())
    }

    /// Whether `origin` satisfies this rule.
    pub fn matches(&self, origin: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Subdomain { scheme, suffix } => origin
                .strip_prefix(scheme.as_str())
                .and_then(|host| host.strip_suffix(suffix.as_str()))
                .is_some_and(|sub| !sub.is_empty() && !sub.contains('/')),
            Self::Exact(expected) => origin == expected,
        }
    }
}

/// Parsed origin allow-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginPolicy {
    rules: Vec<OriginRule>,
}

impl OriginPolicy {
    /// Parse every entry of `config.allowed_origins`.
    pub fn from_config(config: &CorsConfig) -> Self {
        Self {
            rules: config
                .allowed_origins
                .iter()
                .map(|entry| OriginRule::parse(entry))
                .collect(),
        }
    }

    /// Whether `*` is present.
    pub fn allows_any(&self) -> bool {
        self.rules.contains(&OriginRule::Any)
    }

    /// Whether `*` is listed together with specific origins, which makes
    /// the specific entries dead configuration.
    pub fn has_wildcard_mix(&self) -> bool {
        self.allows_any() && self.rules.iter().any(|r| *r != OriginRule::Any)
    }

    /// Whether a request from `origin` is allowed.
    pub fn allows(&self, origin: &str) -> bool {
        self.rules.iter().any(|rule| rule.matches(origin))
    }
}

/// Build the CORS layer for the router.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let policy = OriginPolicy::from_config(config);

    let allow_origin = if policy.allows_any() {
        AllowOrigin::mirror_request()
    } else {
        AllowOrigin::predicate(move |origin: &HeaderValue, _: &Parts| {
            origin.to_str().is_ok_and(|o| policy.allows(o))
        })
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(config.allow_credentials)
}
