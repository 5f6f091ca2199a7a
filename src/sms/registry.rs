//! Immutable name → gateway mapping, built once at startup.

use std::collections::HashMap;
use std::sync::Arc;

use super::gateway::Gateway;

/// Registry construction errors.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Two gateways were registered under the same name.
    #[error("gateway '{name}' registered twice")]
    Duplicate {
        /// Conflicting name.
        name: String,
    },
    /// A gateway was registered with an empty name.
    #[error("gateway name must not be empty")]
    EmptyName,
}

/// Gateways keyed by provider name.
///
/// Read-only once built; share it behind an `Arc`.
#[derive(Clone, Default)]
pub struct GatewayRegistry {
    gateways: HashMap<String, Arc<dyn Gateway>>,
}

impl std::fmt::Debug for GatewayRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayRegistry")
            .field("names", &self.names())
            .finish()
    }
}

impl GatewayRegistry {
    /// Start building a registry.
    pub fn builder() -> GatewayRegistryBuilder {
        GatewayRegistryBuilder::default()
    }

    /// Look up a gateway by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Gateway>> {
        self.gateways.get(name).cloned()
    }

    /// Returns true when `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.gateways.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.gateways.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered gateways.
    pub fn len(&self) -> usize {
        self.gateways.len()
    }

    /// Returns true when no gateway is registered.
    pub fn is_empty(&self) -> bool {
        self.gateways.is_empty()
    }
}

/// Collects gateways before freezing them into a [`GatewayRegistry`].
#[derive(Default)]
pub struct GatewayRegistryBuilder {
    gateways: HashMap<String, Arc<dyn Gateway>>,
    error: Option<RegistryError>,
}

impl GatewayRegistryBuilder {
    /// Register `gateway` under `name`.
    ///
    /// The first bad registration is reported by [`Self::build`].
    #[must_use]
    pub fn register(mut self, name: impl Into<String>, gateway: Arc<dyn Gateway>) -> Self {
        if self.error.is_some() {
            return self;
        }
        let name = name.into();
        if name.is_empty() {
            self.error = Some(RegistryError::EmptyName);
        } else if self.gateways.contains_key(&name) {
            self.error = Some(RegistryError::Duplicate { name });
        } else {
            self.gateways.insert(name, gateway);
        }
        self
    }

    /// Freeze the registry.
    ///
    /// # Errors
    ///
    /// Returns the first [`RegistryError`] hit during registration.
    pub fn build(self) -> Result<GatewayRegistry, RegistryError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(GatewayRegistry {
                gateways: self.gateways,
            }),
        }
    }
}
