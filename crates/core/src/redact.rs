// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Redacted copies of secret-bearing values for diagnostic output.
//!
//! Every function here takes its input by reference and returns a new value.
//! Redaction never fails: a value that cannot be sanitized is omitted.

use url::Url;

use crate::build::{Build, EnvVar};
use crate::env::env_name;

/// Replacement user-info for URLs that carried credentials.
pub const REDACTED: &str = "redacted";

/// Whether a variable name refers to proxy configuration (case-insensitive).
pub fn is_proxy_name(name: &str) -> bool {
    name.to_ascii_lowercase().contains("proxy")
}

/// Parse a proxy setting, accepting bare `host:port` forms by retrying with
/// an `http://` prefix.
pub fn parse_proxy_url(proxy: &str) -> Result<Url, url::ParseError> {
    match Url::parse(proxy) {
        Ok(url) if url.scheme().starts_with("http") => Ok(url),
        first => Url::parse(&format!("http://{proxy}")).or(first),
    }
}

/// Strip credentials from a URL-like value.
///
/// Values without `@` cannot carry user-info and pass through unchanged.
/// Returns `None` when credentials may be present but the value does not
/// parse, so callers drop the field instead of logging it.
pub fn safe_for_logging_url(value: &str) -> Option<String> {
    if !value.contains('@') {
        return Some(value.to_string());
    }
    let mut url = parse_proxy_url(value).ok()?;
    if url.username().is_empty() && url.password().is_none() {
        return Some(url.to_string());
    }
    url.set_password(None).ok()?;
    url.set_username(REDACTED).ok()?;
    Some(url.to_string())
}

/// Redacted copy of descriptor env vars; proxy values are sanitized.
pub fn safe_for_logging_env(env: &[EnvVar]) -> Vec<EnvVar> {
    env.iter()
        .filter_map(|var| {
            if !is_proxy_name(&var.name) {
                return Some(var.clone());
            }
            safe_for_logging_url(&var.value).map(|value| EnvVar::new(var.name.clone(), value))
        })
        .collect()
}

/// Redacted copy of a `NAME=value` list; proxy values are sanitized.
pub fn safe_for_logging_env_list(env: &[String]) -> Vec<String> {
    env.iter()
        .filter_map(|entry| {
            let name = env_name(entry);
            if !is_proxy_name(name) || name.len() == entry.len() {
                return Some(entry.clone());
            }
            let value = &entry[name.len() + 1..];
            safe_for_logging_url(value).map(|value| format!("{name}={value}"))
        })
        .collect()
}

/// Source URIs are rewritten when they embed a password, or any user-info
/// over http(s) where a bare username is often a token. scp-style
/// `user@host:path` locations and ssh users carry no secret and are kept.
fn safe_for_logging_source_uri(uri: &str) -> String {
    match Url::parse(uri) {
        Ok(mut url) if url.password().is_some() || carries_http_user(&url) => {
            let _ = url.set_password(None);
            let _ = url.set_username(REDACTED);
            url.to_string()
        }
        _ => uri.to_string(),
    }
}

fn carries_http_user(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https") && !url.username().is_empty()
}

fn safe_for_logging_option(value: &Option<String>) -> Option<String> {
    value.as_deref().and_then(safe_for_logging_url)
}

/// Redacted deep copy of a build descriptor.
pub fn safe_for_logging_build(build: &Build) -> Build {
    let mut copy = build.clone();
    if let Some(git) = copy.spec.source.git.as_mut() {
        git.http_proxy = safe_for_logging_option(&git.http_proxy);
        git.https_proxy = safe_for_logging_option(&git.https_proxy);
        git.uri = safe_for_logging_source_uri(&git.uri);
    }
    if let Some(docker) = copy.spec.strategy.docker_strategy.as_mut() {
        docker.env = safe_for_logging_env(&docker.env);
        docker.build_args = safe_for_logging_env(&docker.build_args);
    }
    if let Some(source) = copy.spec.strategy.source_strategy.as_mut() {
        source.env = safe_for_logging_env(&source.env);
        source.scripts = safe_for_logging_option(&source.scripts);
    }
    copy
}

/// Report a secret only as present or absent.
pub fn presence(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<<empty>>"
    } else {
        "<<non-empty>>"
    }
}

#[cfg(test)]
#[path = "redact_tests.rs"]
mod tests;
