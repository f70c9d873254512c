//! Two-tier cache in front of a [`KlassProvider`].
//!
//! Classes defined by the boot or platform loader are cached by type name:
//! those loaders are singletons, so the name alone identifies the class. Every
//! other cacheable definition is cached by a fingerprint of its bytes, which
//! lets independent application loaders that load the same library share one
//! parsed representation.
//!
//! Entries are never evicted. No lock is held while the fallback parses, so
//! two threads missing on the same key may both parse; the last insert wins
//! and either result is valid because providers are deterministic.

use anyhow::Result;
use dashmap::DashMap;
use log::{debug, trace};
use serde::Serialize;
use std::hash::BuildHasher;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::key::{ContentKey, FingerprintState, fingerprint_state};
use crate::klass::{ClassDefinitionInfo, LoaderKind, ParsedClass};
use crate::policy::CachePolicy;
use crate::provider::KlassProvider;
use crate::symbol::Symbol;

pub struct CachedKlassProvider<P, S = FingerprintState> {
    fallback: P,
    policy: CachePolicy,
    fingerprint: S,
    boot: DashMap<Symbol, Arc<ParsedClass>>,
    app: DashMap<ContentKey, Arc<ParsedClass>, S>,
    counters: Counters,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    bypassed: AtomicU64,
    failures: AtomicU64,
}

enum TierKey {
    Boot(Symbol),
    App(ContentKey),
}

impl<P: KlassProvider> CachedKlassProvider<P> {
    pub fn new(fallback: P) -> Self {
        Self::with_policy(fallback, CachePolicy::default())
    }

    pub fn with_policy(fallback: P, policy: CachePolicy) -> Self {
        Self::with_hasher(fallback, policy, fingerprint_state())
    }
}

impl<P, S> CachedKlassProvider<P, S>
where
    P: KlassProvider,
    S: BuildHasher + Clone,
{
    /// Builds a cache whose content fingerprints use `fingerprint` both for
    /// key construction and for app-tier placement.
    pub fn with_hasher(fallback: P, policy: CachePolicy, fingerprint: S) -> Self {
        Self {
            fallback,
            policy,
            app: DashMap::with_hasher(fingerprint.clone()),
            fingerprint,
            boot: DashMap::new(),
            counters: Counters::default(),
        }
    }

    /// Returns the parsed representation for a definition request, parsing
    /// through the fallback only when no cached value exists.
    ///
    /// # Panics
    ///
    /// Panics if `symbol` is present for an anonymous definition or absent for
    /// a named one.
    pub fn resolve(
        &self,
        loader: LoaderKind,
        symbol: Option<&Symbol>,
        bytes: &[u8],
        info: &ClassDefinitionInfo,
    ) -> Result<Arc<ParsedClass>> {
        assert_eq!(
            info.is_anonymous(),
            symbol.is_none(),
            "a type symbol must be given exactly for named definitions"
        );

        if !self.policy.should_cache(info) {
            self.counters.bypassed.fetch_add(1, Ordering::Relaxed);
            return self
                .fallback
                .parser_klass(loader, symbol, bytes, info)
                .inspect_err(|_| {
                    self.counters.failures.fetch_add(1, Ordering::Relaxed);
                });
        }

        let key = self.tier_key(loader, symbol, bytes);
        if let Some(parsed) = self.lookup(&key) {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            trace!("parsed class cache hit: {}", parsed.name());
            return Ok(parsed);
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        trace!("parsed class cache miss: {}", describe(symbol, bytes));
        let parsed = match self.fallback.parser_klass(loader, symbol, bytes, info) {
            Ok(parsed) => parsed,
            Err(err) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                debug!("parse failed for {}: {err:#}", describe(symbol, bytes));
                return Err(err);
            }
        };

        self.store(key, Arc::clone(&parsed));
        Ok(parsed)
    }

    /// Live number of entries across both tiers.
    pub fn cached_count(&self) -> usize {
        self.boot.len() + self.app.len()
    }

    pub fn stats(&self) -> CacheStats {
        let boot_entries = self.boot.len();
        let app_entries = self.app.len();
        CacheStats {
            boot_entries,
            app_entries,
            cached_entries: boot_entries + app_entries,
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            bypassed: self.counters.bypassed.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
        }
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    pub fn fallback(&self) -> &P {
        &self.fallback
    }

    fn tier_key(&self, loader: LoaderKind, symbol: Option<&Symbol>, bytes: &[u8]) -> TierKey {
        match symbol {
            Some(symbol) if loader.is_boot_or_platform() => TierKey::Boot(symbol.clone()),
            _ => TierKey::App(ContentKey::with_hasher(bytes, &self.fingerprint)),
        }
    }

    fn lookup(&self, key: &TierKey) -> Option<Arc<ParsedClass>> {
        match key {
            TierKey::Boot(symbol) => self.boot.get(symbol).map(|e| Arc::clone(e.value())),
            TierKey::App(key) => self.app.get(key).map(|e| Arc::clone(e.value())),
        }
    }

    fn store(&self, key: TierKey, parsed: Arc<ParsedClass>) {
        match key {
            TierKey::Boot(symbol) => {
                self.boot.insert(symbol, parsed);
            }
            TierKey::App(key) => {
                self.app.insert(key, parsed);
            }
        }
    }
}

impl<P, S> KlassProvider for CachedKlassProvider<P, S>
where
    P: KlassProvider,
    S: BuildHasher + Clone + Send + Sync,
{
    fn parser_klass(
        &self,
        loader: LoaderKind,
        symbol: Option<&Symbol>,
        bytes: &[u8],
        info: &ClassDefinitionInfo,
    ) -> Result<Arc<ParsedClass>> {
        self.resolve(loader, symbol, bytes, info)
    }

    fn cached_klass_count(&self) -> usize {
        self.cached_count()
    }
}

fn describe(symbol: Option<&Symbol>, bytes: &[u8]) -> String {
    match symbol {
        Some(symbol) => symbol.to_string(),
        None => format!("<anonymous, {} bytes>", bytes.len()),
    }
}

/// Snapshot of cache occupancy and diagnostic counters.
///
/// Entry counts are read from the tiers at call time; the counters only
/// describe traffic and play no part in lookups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub boot_entries: usize,
    pub app_entries: usize,
    pub cached_entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub bypassed: u64,
    pub failures: u64,
}
