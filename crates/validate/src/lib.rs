use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

static RESOURCE_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[useandom26T198340PX75pxJACKVERYMINDBUSHWOLFGQZbfghjklqvwyzrict-]{21}$").expect("valid id pattern")
});
static RESOURCE_ALIAS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9.\-_]{4,64}$").expect("valid alias pattern")
});
static HOSTNAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9.\-]{0,62}[a-zA-Z0-9]$").expect("valid hostname pattern")
});

pub const API_KEY_STATUSES: &[&str] = &["enabled", "disabled"];

/// Matches the 21 character ids the API hands out.
pub fn is_resource_id(value: &str) -> bool { RESOURCE_ID.is_match(value) }

pub fn is_resource_alias(value: &str) -> bool { RESOURCE_ALIAS.is_match(value) }

/// DNS name only; the API adds the protocol.
pub fn is_hostname(value: &str) -> bool {
    (4..=253).contains(&value.len()) && HOSTNAME.is_match(value)
}

pub fn is_port(port: u32) -> bool {
    port == 80 || port == 443 || (1024..=65535).contains(&port)
}

/// http(s) URL with a host and without credentials.
pub fn is_url(value: &str) -> bool {
    if !(4..=253).contains(&value.len()) { return false; }
    match url::Url::parse(value) {
        Ok(u) => {
            matches!(u.scheme(), "http" | "https")
                && u.host_str().is_some_and(|h| !h.is_empty())
                && u.username().is_empty()
                && u.password().is_none()
        }
        Err(_) => false,
    }
}

/// A scope target is the wildcard or a resource id.
pub fn is_scope_target(value: &str) -> bool {
    value == "*" || is_resource_id(value)
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{path}: {message}, got \"{value}\"")]
pub struct Violation {
    pub path: String,
    pub message: String,
    pub value: String,
}

/// Violations collected while validating one resource.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics { violations: Vec<Violation> }

impl Diagnostics {
    pub fn new() -> Self { Self::default() }

    pub fn require(&mut self, ok: bool, path: impl Into<String>, value: impl fmt::Display, message: &str) {
        if !ok {
            self.violations.push(Violation { path: path.into(), message: message.to_string(), value: value.to_string() });
        }
    }

    pub fn push(&mut self, violation: Violation) { self.violations.push(violation); }

    pub fn violations(&self) -> &[Violation] { &self.violations }

    /// Fails with `summary` followed by a numbered list of every violation.
    pub fn into_result(self, summary: &str) -> anyhow::Result<()> {
        if self.violations.is_empty() { return Ok(()); }
        let mut out = format!("{summary}\n\nReasons:\n");
        for (i, v) in self.violations.iter().enumerate() {
            out.push_str(&format!("{i}: {v}\n"));
        }
        anyhow::bail!(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_ids() {
        assert!(is_resource_id("Ak3zbsCzWxGqcJ2r0bAQP"));
        assert!(!is_resource_id("Ak3zbsCzWxGqcJ2r0bAQ"));
        assert!(!is_resource_id("Ak3zbsCzWxGqcJ2r0bAQP1"));
        assert!(!is_resource_id("Ak3zbsCzWxGqcJ2r0b_QP"));
    }

    #[test]
    fn aliases() {
        assert!(is_resource_alias("orders-queue"));
        assert!(is_resource_alias("a.b_c"));
        assert!(!is_resource_alias("abc"));
        assert!(!is_resource_alias("with space"));
        assert!(!is_resource_alias(&"a".repeat(65)));
    }

    #[test]
    fn hostnames_and_ports() {
        assert!(is_hostname("www.discue.io"));
        assert!(!is_hostname("https://www.discue.io"));
        assert!(!is_hostname("-discue.io"));
        assert!(is_port(443));
        assert!(is_port(8080));
        assert!(!is_port(22));
        assert!(!is_port(70000));
    }

    #[test]
    fn urls() {
        assert!(is_url("http://www.discue.io/live"));
        assert!(is_url("https://www.discue.io"));
        assert!(!is_url("ftp://www.discue.io"));
        assert!(!is_url("https://a:qb@www.discue.io"));
        assert!(!is_url("/abc"));
    }

    #[test]
    fn scope_targets() {
        assert!(is_scope_target("*"));
        assert!(is_scope_target("Ak3zbsCzWxGqcJ2r0bAQP"));
        assert!(!is_scope_target("all"));
    }

    #[test]
    fn diagnostics_render_every_reason() {
        let mut diags = Diagnostics::new();
        diags.require(true, "alias", "good-alias", "never shown");
        diags.require(false, "alias", "abc", "must match the pattern for name/alias values");
        diags.require(false, "port", 22, "must be 80, 443 or between 1024 and 65535");
        assert_eq!(diags.violations().len(), 2);
        let err = diags.into_result("invalid discue_domain.web").unwrap_err().to_string();
        assert!(err.starts_with("invalid discue_domain.web\n\nReasons:\n"));
        assert!(err.contains("0: alias: must match the pattern for name/alias values, got \"abc\""));
        assert!(err.contains("1: port: must be 80, 443 or between 1024 and 65535, got \"22\""));
    }

    #[test]
    fn empty_diagnostics_pass() {
        assert!(Diagnostics::new().into_result("ok").is_ok());
    }
}
