// Path: crates/node/src/validator.rs
//! Payload admission for ZKLOGIN tasks.
//!
//! Validators are a pluggable capability: deployments register one
//! implementation per provider name before serving. The resolver binds
//! circuit template ids to a provider; an unbound circuit falls back to
//! the provider named in the request.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Admission check for a decrypted payload.
#[async_trait]
pub trait PayloadValidator: Send + Sync {
    /// `true` admits the payload.
    async fn verify(&self, payload: &str) -> bool;
}

/// Named validators registered at startup.
#[derive(Default)]
pub struct ValidatorRegistry {
    providers: HashMap<String, Arc<dyn PayloadValidator>>,
}

impl ValidatorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a validator under a provider name, replacing any previous
    /// registration of that name.
    pub fn register(&mut self, name: impl Into<String>, validator: Arc<dyn PayloadValidator>) {
        self.providers.insert(name.into(), validator);
    }

    /// Look a provider up by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn PayloadValidator>> {
        self.providers.get(name).cloned()
    }
}

#[derive(Deserialize)]
struct ProviderBinding {
    provider: Option<String>,
}

/// Binds circuit template ids to provider names, loaded from a JSON file of
/// the shape `{"<circuit_id>": {"provider": "<name>"}}`.
pub struct ProviderResolver {
    bindings: HashMap<String, ProviderBinding>,
}

impl ProviderResolver {
    /// Load the binding map. A missing or broken file logs and starts
    /// empty — every circuit then uses the request's provider.
    pub fn load(path: &Path) -> Self {
        let bindings = match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(bindings) => bindings,
                Err(e) => {
                    tracing::error!(target: "validator", path = %path.display(), error = %e, "provider map unparsable");
                    HashMap::new()
                }
            },
            Err(e) => {
                tracing::error!(target: "validator", path = %path.display(), error = %e, "provider map unreadable");
                HashMap::new()
            }
        };
        tracing::info!(target: "validator", count = bindings.len(), "provider bindings loaded");
        Self { bindings }
    }

    /// The provider bound to a circuit id, if any.
    pub fn resolve(&self, circuit_id: &str) -> Option<&str> {
        self.bindings
            .get(circuit_id)
            .and_then(|binding| binding.provider.as_deref())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Admits or rejects everything; handy for pipeline tests.
    pub(crate) struct StaticValidator(pub bool);

    #[async_trait]
    impl PayloadValidator for StaticValidator {
        async fn verify(&self, _payload: &str) -> bool {
            self.0
        }
    }

    #[test]
    fn resolver_binds_circuits_to_providers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resolver.json");
        std::fs::write(
            &path,
            r#"{"20001": {"provider": "google"}, "20002": {}}"#,
        )
        .unwrap();
        let resolver = ProviderResolver::load(&path);
        assert_eq!(resolver.resolve("20001"), Some("google"));
        assert_eq!(resolver.resolve("20002"), None);
        assert_eq!(resolver.resolve("20003"), None);
    }

    #[tokio::test]
    async fn registry_resolves_and_verifies() {
        let mut registry = ValidatorRegistry::new();
        registry.register("google", Arc::new(StaticValidator(true)));
        registry.register("strict", Arc::new(StaticValidator(false)));

        assert!(registry.get("google").unwrap().verify("payload").await);
        assert!(!registry.get("strict").unwrap().verify("payload").await);
        assert!(registry.get("telegram").is_none());
    }
}
