use std::collections::HashMap;
use std::sync::Mutex;

use crate::config::ConfigMap;
use crate::error::{Error, Result};
use crate::provider::Provider;

/// Builds a provider from the free-form `config` map of the config
/// document.
pub type Constructor = fn(&ConfigMap) -> Result<Box<dyn Provider>>;

/// Lookup from a configured provider name to a constructor.
///
/// An explicit object handed to the entry point, not process-global
/// state. Backends register at startup; registration is mutex-guarded
/// so concurrent registration is safe, while resolution happens once,
/// single-threaded.
pub struct ProviderRegistry {
    constructors: Mutex<HashMap<String, Constructor>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            constructors: Mutex::new(HashMap::new()),
        }
    }

    /// Register a constructor under `name`. The last registration for a
    /// name wins.
    pub fn register(&self, name: impl Into<String>, constructor: Constructor) {
        self.constructors
            .lock()
            .unwrap()
            .insert(name.into(), constructor);
    }

    /// Build the provider registered under `name`, handing it `config`.
    ///
    /// An unregistered name is a fatal configuration error; the caller
    /// should not continue without a usable provider.
    pub fn resolve(&self, name: &str, config: &ConfigMap) -> Result<Box<dyn Provider>> {
        let constructor = self.constructors.lock().unwrap().get(name).copied();

        match constructor {
            Some(build) => build(config),
            None => Err(Error::UnknownProvider(name.to_string())),
        }
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::AppliedMigration;
    use async_trait::async_trait;

    use chrono::Utc;

    /// Test double whose applied list carries a single record naming the
    /// constructor that built it.
    struct LabeledProvider {
        label: &'static str,
    }

    #[async_trait]
    impl Provider for LabeledProvider {
        async fn applied_migrations(&self) -> Result<Vec<AppliedMigration>> {
            Ok(vec![AppliedMigration {
                id: 1,
                name: self.label.to_string(),
                applied_at: Utc::now(),
            }])
        }

        async fn apply(&self, _name: &str, _content: &str) -> Result<()> {
            Ok(())
        }

        async fn rollback(&self, _name: &str, _content: &str) -> Result<()> {
            Ok(())
        }
    }

    fn first(_config: &ConfigMap) -> Result<Box<dyn Provider>> {
        Ok(Box::new(LabeledProvider { label: "first" }))
    }

    fn second(_config: &ConfigMap) -> Result<Box<dyn Provider>> {
        Ok(Box::new(LabeledProvider { label: "second" }))
    }

    async fn label_of(provider: &dyn Provider) -> String {
        provider.applied_migrations().await.unwrap()[0].name.clone()
    }

    #[tokio::test]
    async fn test_resolve_registered() {
        let registry = ProviderRegistry::new();
        registry.register("labeled", first);

        let provider = registry.resolve("labeled", &ConfigMap::default()).unwrap();
        assert_eq!(label_of(provider.as_ref()).await, "first");
    }

    #[test]
    fn test_resolve_unknown_is_error() {
        let registry = ProviderRegistry::new();

        let err = registry
            .resolve("nope", &ConfigMap::default())
            .err()
            .expect("resolution should fail");
        match err {
            Error::UnknownProvider(name) => assert_eq!(name, "nope"),
            other => panic!("expected UnknownProvider, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_last_registration_wins() {
        let registry = ProviderRegistry::new();
        registry.register("labeled", first);
        registry.register("labeled", second);

        let provider = registry.resolve("labeled", &ConfigMap::default()).unwrap();
        assert_eq!(label_of(provider.as_ref()).await, "second");
    }

    #[test]
    fn test_concurrent_registration() {
        let registry = ProviderRegistry::new();

        std::thread::scope(|scope| {
            for i in 0..8 {
                let registry = &registry;
                scope.spawn(move || {
                    registry.register(format!("provider-{}", i), first);
                });
            }
        });

        for i in 0..8 {
            let name = format!("provider-{}", i);
            assert!(registry.resolve(&name, &ConfigMap::default()).is_ok());
        }
    }
}
