//! Per-tenant rule set registry
//!
//! Provides [`RuleSetRegistry`], a concurrent map from [`TenantId`] to the
//! tenant's current [`RuleSet`]. A rule set is parsed in full before it is
//! published, so readers see either the previous set or the new one.

use crate::document::ParseOptions;
use crate::error::RuleResult;
use crate::ruleset::RuleSet;
use dashmap::DashMap;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

/// Caller namespace owning one rule set
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TenantId(String);

impl TenantId {
    /// Create tenant id
    ///
    /// # Errors
    /// Returns [`EmptyTenantId`] for an empty or blank string.
    pub fn new(value: impl Into<String>) -> Result<Self, EmptyTenantId> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(EmptyTenantId);
        }
        Ok(Self(value))
    }

    /// Get as str
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TenantId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tenant id was empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("tenant id is empty")]
pub struct EmptyTenantId;

/// Tenant → current rule set
#[derive(Debug, Default)]
pub struct RuleSetRegistry {
    sets: DashMap<TenantId, Arc<RuleSet>>,
}

impl RuleSetRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            sets: DashMap::new(),
        }
    }

    /// Parse a rule document and publish it for a tenant
    ///
    /// Nothing changes when parsing fails.
    ///
    /// # Errors
    /// Returns the parse error; the tenant keeps its previous rule set.
    pub fn load(
        &self,
        tenant: &TenantId,
        bytes: &[u8],
        options: &ParseOptions,
    ) -> RuleResult<Arc<RuleSet>> {
        let rules = match RuleSet::parse(bytes, options) {
            Ok(rules) => Arc::new(rules),
            Err(e) => {
                tracing::warn!(tenant = %tenant, kind = e.kind(), error = %e, "rejected rule document");
                return Err(e);
            }
        };
        let previous = self.publish(tenant.clone(), Arc::clone(&rules));
        tracing::info!(
            tenant = %tenant,
            targets = rules.target_count(),
            replaced = previous.is_some(),
            "published rule set"
        );
        Ok(rules)
    }

    /// Replace a tenant's rule set, returning the previous one
    pub fn publish(&self, tenant: TenantId, rules: Arc<RuleSet>) -> Option<Arc<RuleSet>> {
        self.sets.insert(tenant, rules)
    }

    /// Current rule set of a tenant
    #[must_use]
    pub fn get(&self, tenant: &TenantId) -> Option<Arc<RuleSet>> {
        self.sets.get(tenant).map(|entry| Arc::clone(entry.value()))
    }

    /// Drop a tenant's rule set
    pub fn remove(&self, tenant: &TenantId) -> Option<Arc<RuleSet>> {
        self.sets.remove(tenant).map(|(_, rules)| rules)
    }

    /// Check if tenant has a rule set
    #[inline]
    #[must_use]
    pub fn contains(&self, tenant: &TenantId) -> bool {
        self.sets.contains_key(tenant)
    }

    /// Get number of tenants
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Tenants with a rule set, sorted
    #[must_use]
    pub fn tenants(&self) -> Vec<TenantId> {
        let mut tenants: Vec<TenantId> = self.sets.iter().map(|e| e.key().clone()).collect();
        tenants.sort();
        tenants
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tenant(name: &str) -> TenantId {
        TenantId::new(name).unwrap()
    }

    fn document(tag: &str) -> Vec<u8> {
        serde_json::to_vec(&json!({ "title": [{ "tag": tag }] })).unwrap()
    }

    #[test]
    fn tenant_id_rejects_blank() {
        assert_eq!(TenantId::new(""), Err(EmptyTenantId));
        assert_eq!(TenantId::new("   "), Err(EmptyTenantId));
        assert_eq!(tenant("diku").to_string(), "diku");
    }

    #[test]
    fn load_publishes_and_replaces() {
        let registry = RuleSetRegistry::new();
        let diku = tenant("diku");
        assert!(registry.get(&diku).is_none());

        registry.load(&diku, &document("245"), &ParseOptions::default()).unwrap();
        assert!(registry.contains(&diku));
        assert_eq!(registry.get(&diku).unwrap().tags().into_iter().next(), Some("245"));

        registry.load(&diku, &document("246"), &ParseOptions::default()).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&diku).unwrap().tags().into_iter().next(), Some("246"));
    }

    #[test]
    fn failed_load_keeps_previous_set() {
        let registry = RuleSetRegistry::new();
        let diku = tenant("diku");
        registry.load(&diku, &document("245"), &ParseOptions::default()).unwrap();

        let err = registry.load(&diku, b"{not json", &ParseOptions::default()).unwrap_err();
        assert_eq!(err.kind(), "InvalidRuleSyntax");
        assert_eq!(registry.get(&diku).unwrap().tags().into_iter().next(), Some("245"));
    }

    #[test]
    fn readers_keep_their_snapshot() {
        let registry = RuleSetRegistry::new();
        let diku = tenant("diku");
        registry.load(&diku, &document("245"), &ParseOptions::default()).unwrap();
        let held = registry.get(&diku).unwrap();

        registry.load(&diku, &document("246"), &ParseOptions::default()).unwrap();
        assert_eq!(held.tags().into_iter().next(), Some("245"));
    }

    #[test]
    fn tenants_are_isolated() {
        let registry = RuleSetRegistry::new();
        registry.load(&tenant("b"), &document("245"), &ParseOptions::default()).unwrap();
        registry.load(&tenant("a"), &document("100"), &ParseOptions::default()).unwrap();
        assert_eq!(registry.tenants(), vec![tenant("a"), tenant("b")]);

        assert!(registry.remove(&tenant("a")).is_some());
        assert!(!registry.contains(&tenant("a")));
        assert!(registry.contains(&tenant("b")));
        assert!(!registry.is_empty());
    }

    #[test]
    fn concurrent_readers_see_whole_sets() {
        let registry = Arc::new(RuleSetRegistry::new());
        let diku = tenant("diku");
        registry.load(&diku, &document("245"), &ParseOptions::default()).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let registry = Arc::clone(&registry);
                let diku = diku.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        if i == 0 {
                            registry
                                .load(&diku, &document("246"), &ParseOptions::default())
                                .unwrap();
                        } else {
                            let rules = registry.get(&diku).unwrap();
                            assert_eq!(rules.target_count(), 1);
                            let tag = rules.tags().into_iter().next().unwrap().to_string();
                            assert!(tag == "245" || tag == "246");
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
