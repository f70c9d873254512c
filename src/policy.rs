use crate::klass::ClassDefinitionInfo;

/// Decides whether a definition request may be served from, and stored in,
/// the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub enabled: bool,
    /// Anonymous definitions are usually generated with per-site unique bytes;
    /// caching them only grows the app tier.
    pub cache_anonymous: bool,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            cache_anonymous: false,
        }
    }
}

impl CachePolicy {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn should_cache(&self, info: &ClassDefinitionInfo) -> bool {
        if !self.enabled || info.suppress_caching || info.patched {
            return false;
        }
        !info.anonymous || self.cache_anonymous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_caches_named_definitions_only() {
        let policy = CachePolicy::default();
        assert!(policy.should_cache(&ClassDefinitionInfo::named()));
        assert!(!policy.should_cache(&ClassDefinitionInfo::anonymous()));
    }

    #[test]
    fn request_flags_override_policy() {
        let policy = CachePolicy {
            enabled: true,
            cache_anonymous: true,
        };
        assert!(policy.should_cache(&ClassDefinitionInfo::anonymous()));
        assert!(!policy.should_cache(&ClassDefinitionInfo::anonymous().with_patches()));
        assert!(!policy.should_cache(&ClassDefinitionInfo::named().without_caching()));
    }

    #[test]
    fn disabled_policy_caches_nothing() {
        let policy = CachePolicy::disabled();
        assert!(!policy.should_cache(&ClassDefinitionInfo::named()));
    }
}
