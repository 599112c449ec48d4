use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attribute key for the logical service name.
pub const SERVICE_NAME: &str = "service.name";

/// Attribute key for the service version.
pub const SERVICE_VERSION: &str = "service.version";

/// Attribute key for the service instance identifier.
pub const SERVICE_INSTANCE_ID: &str = "service.instance.id";

/// Immutable attributes describing the entity producing telemetry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    attributes: BTreeMap<String, String>,
}

impl Resource {
    /// Create a resource carrying only a service name.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self::builder().with_service_name(service_name).build()
    }

    /// Start building a resource.
    pub fn builder() -> ResourceBuilder {
        ResourceBuilder::default()
    }

    /// Get an attribute by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// The `service.name` attribute, if set.
    pub fn service_name(&self) -> Option<&str> {
        self.get(SERVICE_NAME)
    }

    /// Iterate over all attributes in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

/// Builder for [`Resource`].
#[derive(Debug, Clone, Default)]
pub struct ResourceBuilder {
    attributes: BTreeMap<String, String>,
}

impl ResourceBuilder {
    pub fn with_service_name(self, name: impl Into<String>) -> Self {
        self.with_attribute(SERVICE_NAME, name)
    }

    pub fn with_service_version(self, version: impl Into<String>) -> Self {
        self.with_attribute(SERVICE_VERSION, version)
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Add many attributes; existing keys are overwritten.
    pub fn with_attributes<I, K, V>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.attributes
            .extend(attributes.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn build(self) -> Resource {
        Resource {
            attributes: self.attributes,
        }
    }
}
