//! Provider - Trait abstracting a catalog of resource types
//!
//! A Provider knows the resource types of one platform (AWS, ...): their
//! property schemas and whether they accept tags. Synthesis consults it to
//! validate resources and to decide where stack-wide tags land.

use crate::schema::ResourceSchema;

/// Definition of a resource type that a Provider can handle
pub trait ResourceType: Send + Sync {
    /// Resource type name (e.g., "AWS::EC2::VPC")
    fn name(&self) -> &'static str;
}

/// Main Provider trait
pub trait Provider: Send + Sync {
    /// Name of this Provider (e.g., "aws")
    fn name(&self) -> &'static str;

    /// List of resource types this Provider can handle
    fn resource_types(&self) -> Vec<Box<dyn ResourceType>>;

    /// Property schema for a resource type, if known
    fn schema(&self, resource_type: &str) -> Option<&ResourceSchema>;

    /// Whether resources of this type carry a `Tags` property
    fn supports_tags(&self, resource_type: &str) -> bool;

    /// Whether this Provider knows the resource type at all
    fn handles(&self, resource_type: &str) -> bool {
        self.resource_types()
            .iter()
            .any(|t| t.name() == resource_type)
    }
}

/// Provider implementation for Box<dyn Provider>
/// This enables dynamic dispatch for Providers
impl Provider for Box<dyn Provider> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        (**self).resource_types()
    }

    fn schema(&self, resource_type: &str) -> Option<&ResourceSchema> {
        (**self).schema(resource_type)
    }

    fn supports_tags(&self, resource_type: &str) -> bool {
        (**self).supports_tags(resource_type)
    }

    fn handles(&self, resource_type: &str) -> bool {
        (**self).handles(resource_type)
    }
}
