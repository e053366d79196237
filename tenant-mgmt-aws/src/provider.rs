//! AWS Provider implementation
//!
//! Catalog of the CloudFormation resource types the stacks use: schemas for
//! validation and taggability for tag propagation.

use std::collections::HashMap;

use tenant_mgmt_core::provider::{Provider, ResourceType};
use tenant_mgmt_core::schema::ResourceSchema;

use crate::resources::resource_types;
use crate::schemas::{self, AwsSchemaConfig};

/// AWS Provider
pub struct AwsProvider {
    configs: HashMap<&'static str, AwsSchemaConfig>,
}

impl AwsProvider {
    pub fn new() -> Self {
        let configs = schemas::configs()
            .into_iter()
            .map(|c| (c.aws_type_name, c))
            .collect();
        Self { configs }
    }

    /// Get the AwsSchemaConfig for a resource type
    pub fn config(&self, resource_type: &str) -> Option<&AwsSchemaConfig> {
        self.configs.get(resource_type)
    }
}

impl Default for AwsProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider for AwsProvider {
    fn name(&self) -> &'static str {
        "aws"
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        resource_types()
    }

    fn schema(&self, resource_type: &str) -> Option<&ResourceSchema> {
        self.config(resource_type).map(|c| &c.schema)
    }

    fn supports_tags(&self, resource_type: &str) -> bool {
        self.config(resource_type).is_some_and(|c| c.has_tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::*;

    #[test]
    fn every_resource_type_has_a_schema() {
        let provider = AwsProvider::new();
        for t in provider.resource_types() {
            assert!(provider.schema(t.name()).is_some(), "{}", t.name());
        }
        assert_eq!(provider.resource_types().len(), provider.configs.len());
    }

    #[test]
    fn taggability() {
        let provider = AwsProvider::new();
        assert!(provider.supports_tags(EC2_VPC));
        assert!(provider.supports_tags(ECS_SERVICE));
        assert!(!provider.supports_tags(IAM_POLICY));
        assert!(!provider.supports_tags(CLOUDWATCH_DASHBOARD));
        assert!(!provider.supports_tags("AWS::S3::Bucket"));
    }

    #[test]
    fn boxed_provider() {
        let provider: Box<dyn Provider> = Box::new(AwsProvider::new());
        assert_eq!(provider.name(), "aws");
        assert!(provider.handles(SNS_TOPIC));
    }
}
