use anyhow::Result;
use std::env;
use std::path::PathBuf;

use crate::cli::Cli;
use crate::policy::CachePolicy;
use crate::scan::default_m2_repository;

pub const DISABLE_ENV: &str = "KLASS_CACHE_DISABLE";
pub const ANONYMOUS_ENV: &str = "KLASS_CACHE_ANONYMOUS";

/// Flags win over environment variables, which win over the defaults.
pub fn resolve_policy(cli: &Cli) -> CachePolicy {
    policy_from(cli.no_cache, cli.cache_anonymous, |name| env::var(name).ok())
}

pub fn policy_from(
    no_cache: bool,
    cache_anonymous: bool,
    lookup: impl Fn(&str) -> Option<String>,
) -> CachePolicy {
    let defaults = CachePolicy::default();
    let enabled = if no_cache {
        false
    } else {
        lookup(DISABLE_ENV)
            .map(|v| !is_truthy(&v))
            .unwrap_or(defaults.enabled)
    };
    let cache_anonymous = cache_anonymous
        || lookup(ANONYMOUS_ENV)
            .map(|v| is_truthy(&v))
            .unwrap_or(defaults.cache_anonymous);

    CachePolicy {
        enabled,
        cache_anonymous,
    }
}

pub fn resolve_scan_root(path: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(p) = path {
        return Ok(p);
    }
    default_m2_repository()
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
