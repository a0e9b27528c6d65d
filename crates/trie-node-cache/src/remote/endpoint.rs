//! Validation of configured Redis endpoints

use crate::error::{CacheError, Result};
use std::collections::HashSet;
use url::Url;

const DEFAULT_REDIS_PORT: u16 = 6379;

/// Normalize the configured endpoints into `redis://host:port[/db]` URLs.
pub(crate) fn parse_endpoints(endpoints: &[String], cluster: bool) -> Result<Vec<String>> {
    if endpoints.is_empty() {
        return Err(CacheError::NoEndpoints);
    }
    if !cluster && endpoints.len() > 1 {
        return Err(CacheError::TooManyEndpoints(endpoints.len()));
    }

    let mut seen = HashSet::new();
    let mut urls = Vec::with_capacity(endpoints.len());

    for endpoint in endpoints {
        let url = parse_endpoint(endpoint)?;

        if cluster {
            if database_index(&url) != 0 {
                return Err(CacheError::ClusterIncompatible(format!(
                    "{} selects a database, cluster mode only serves database 0",
                    redact(endpoint)
                )));
            }
            let node = format!(
                "{}:{}",
                url.host_str().unwrap_or_default(),
                url.port().unwrap_or(DEFAULT_REDIS_PORT)
            );
            if !seen.insert(node.clone()) {
                return Err(CacheError::ClusterIncompatible(format!(
                    "{node} is listed more than once"
                )));
            }
        }

        urls.push(url.to_string());
    }

    Ok(urls)
}

/// Render an endpoint for logs and error messages with any username and
/// password removed.
pub(crate) fn redact(endpoint: &str) -> String {
    let trimmed = endpoint.trim();
    match Url::parse(&with_scheme(trimmed)) {
        Ok(mut url) => {
            if url.username().is_empty() && url.password().is_none() {
                return url.to_string();
            }
            // Both fail only for URLs that cannot carry credentials at all
            if url.set_password(None).is_ok() && url.set_username("").is_ok() {
                url.to_string()
            } else {
                strip_userinfo(trimmed)
            }
        }
        Err(_) => strip_userinfo(trimmed),
    }
}

/// Textual fallback for endpoints `Url` cannot parse
fn strip_userinfo(endpoint: &str) -> String {
    let Some(at) = endpoint.rfind('@') else {
        return endpoint.to_string();
    };
    let scheme = endpoint
        .find("://")
        .filter(|&i| i < at)
        .map(|i| &endpoint[..i + 3])
        .unwrap_or_default();
    format!("{scheme}{}", &endpoint[at + 1..])
}

fn with_scheme(endpoint: &str) -> String {
    if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("redis://{endpoint}")
    }
}

fn parse_endpoint(endpoint: &str) -> Result<Url> {
    let invalid = |reason: &str| CacheError::InvalidEndpoint {
        endpoint: redact(endpoint),
        reason: reason.to_string(),
    };

    let trimmed = endpoint.trim();
    if trimmed.is_empty() {
        return Err(invalid("empty endpoint"));
    }

    let mut url = Url::parse(&with_scheme(trimmed)).map_err(|e| invalid(&e.to_string()))?;

    if url.scheme() != "redis" {
        return Err(invalid("unsupported scheme, expected redis://"));
    }
    match url.host_str() {
        Some(host) if !host.is_empty() => {}
        _ => return Err(invalid("missing host")),
    }
    if url.port().is_none() {
        url.set_port(Some(DEFAULT_REDIS_PORT))
            .map_err(|_| invalid("cannot set port"))?;
    }
    let path = url.path().trim_start_matches('/');
    if !path.is_empty() && path.parse::<u32>().is_err() {
        return Err(invalid("database must be a number"));
    }

    Ok(url)
}

fn database_index(url: &Url) -> u32 {
    url.path().trim_start_matches('/').parse().unwrap_or(0)
}
