//! Provider registry and failover order.

use std::sync::Arc;

use tracing::info;

use crate::provider::Provider;

use super::GatewayError;

/// A registered provider.
pub struct ProviderRegistration {
    name: String,
    provider: Arc<dyn Provider>,
    primary: bool,
}

impl ProviderRegistration {
    /// Registration name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Capability handle.
    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    /// Whether this is the designated primary.
    pub fn is_primary(&self) -> bool {
        self.primary
    }
}

/// Ordered routing table.
///
/// Only mutated through `&mut self`, so registration cannot race a send.
#[derive(Default)]
pub(crate) struct Registry {
    /// Providers in registration order
    entries: Vec<ProviderRegistration>,

    /// Index of the designated primary
    primary: Option<usize>,

    /// Failover order: primary first, then the rest in registration order
    order: Vec<usize>,
}

impl Registry {
    /// Register or replace a provider.
    ///
    /// The first provider registered becomes primary, as does any provider
    /// registered with `primary` set. Replacing a provider keeps its
    /// position and its primary designation.
    pub fn register(
        &mut self,
        name: &str,
        provider: Arc<dyn Provider>,
        primary: bool,
    ) -> Result<(), GatewayError> {
        if name.trim().is_empty() {
            return Err(GatewayError::InvalidRegistration(
                "provider name must not be empty".to_string(),
            ));
        }

        let idx = match self.position(name) {
            Some(idx) => {
                self.entries[idx].provider = provider;
                idx
            }
            None => {
                self.entries.push(ProviderRegistration {
                    name: name.to_string(),
                    provider,
                    primary: false,
                });
                self.entries.len() - 1
            }
        };

        if primary || self.primary.is_none() {
            self.designate(idx);
        }
        self.rebuild_order();

        info!(
            provider = %name,
            primary = self.entries[idx].primary,
            total = self.entries.len(),
            "registered provider"
        );
        Ok(())
    }

    /// Make an already registered provider the primary.
    pub fn set_primary(&mut self, name: &str) -> Result<(), GatewayError> {
        let idx = self
            .position(name)
            .ok_or_else(|| GatewayError::UnknownProvider(name.to_string()))?;
        self.designate(idx);
        self.rebuild_order();
        info!(provider = %name, "primary provider changed");
        Ok(())
    }

    fn designate(&mut self, idx: usize) {
        if let Some(old) = self.primary {
            self.entries[old].primary = false;
        }
        self.entries[idx].primary = true;
        self.primary = Some(idx);
    }

    fn rebuild_order(&mut self) {
        self.order = match self.primary {
            Some(p) => std::iter::once(p)
                .chain((0..self.entries.len()).filter(|&i| i != p))
                .collect(),
            None => (0..self.entries.len()).collect(),
        };
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    /// Look up a provider by name.
    pub fn get(&self, name: &str) -> Option<&ProviderRegistration> {
        self.position(name).map(|idx| &self.entries[idx])
    }

    /// Providers in failover order.
    pub fn failover_order(&self) -> impl Iterator<Item = &ProviderRegistration> {
        self.order.iter().map(|&idx| &self.entries[idx])
    }

    /// Primary provider name.
    pub fn primary(&self) -> Option<&str> {
        self.primary.map(|idx| self.entries[idx].name.as_str())
    }

    /// Names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockProvider;

    fn mock() -> Arc<dyn Provider> {
        Arc::new(MockProvider::success())
    }

    fn order(registry: &Registry) -> Vec<&str> {
        registry.failover_order().map(|e| e.name()).collect()
    }

    #[test]
    fn test_first_registered_is_primary() {
        let mut registry = Registry::default();
        registry.register("a", mock(), false).unwrap();
        registry.register("b", mock(), false).unwrap();
        registry.register("c", mock(), false).unwrap();

        assert_eq!(registry.primary(), Some("a"));
        assert_eq!(order(&registry), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_explicit_primary_goes_first() {
        let mut registry = Registry::default();
        registry.register("a", mock(), false).unwrap();
        registry.register("b", mock(), false).unwrap();
        registry.register("c", mock(), true).unwrap();

        assert_eq!(registry.primary(), Some("c"));
        assert_eq!(order(&registry), vec!["c", "a", "b"]);
        assert!(registry.get("c").unwrap().is_primary());
        assert!(!registry.get("a").unwrap().is_primary());
    }

    #[test]
    fn test_reregister_keeps_position_and_primary() {
        let mut registry = Registry::default();
        registry.register("a", mock(), true).unwrap();
        registry.register("b", mock(), false).unwrap();
        registry.register("a", mock(), false).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["a", "b"]);
        assert_eq!(registry.primary(), Some("a"));
    }

    #[test]
    fn test_set_primary_unknown() {
        let mut registry = Registry::default();
        registry.register("a", mock(), false).unwrap();

        let err = registry.set_primary("missing").unwrap_err();
        assert!(matches!(err, GatewayError::UnknownProvider(ref n) if n == "missing"));

        registry.register("b", mock(), false).unwrap();
        registry.set_primary("b").unwrap();
        assert_eq!(order(&registry), vec!["b", "a"]);
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut registry = Registry::default();
        let err = registry.register("  ", mock(), false).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidRegistration(_)));
        assert_eq!(registry.len(), 0);
    }
}
