//! IAM schemas: roles and inline policies

use super::{AwsSchemaConfig, policy_document_type, string_list, tags_type};
use crate::resources::*;
use tenant_mgmt_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

pub fn role_config() -> AwsSchemaConfig {
    AwsSchemaConfig {
        aws_type_name: IAM_ROLE,
        has_tags: true,
        schema: ResourceSchema::new(IAM_ROLE)
            .attribute(
                AttributeSchema::new("AssumeRolePolicyDocument", policy_document_type())
                    .required()
                    .with_description("Trust policy: who may assume the role"),
            )
            .attribute(AttributeSchema::new("Description", AttributeType::String))
            .attribute(AttributeSchema::new("ManagedPolicyArns", string_list()))
            .attribute(AttributeSchema::new("RoleName", AttributeType::String))
            .attribute(AttributeSchema::new("Tags", tags_type())),
    }
}

pub fn policy_config() -> AwsSchemaConfig {
    AwsSchemaConfig {
        aws_type_name: IAM_POLICY,
        has_tags: false,
        schema: ResourceSchema::new(IAM_POLICY)
            .attribute(AttributeSchema::new("PolicyDocument", policy_document_type()).required())
            .attribute(AttributeSchema::new("PolicyName", AttributeType::String).required())
            .attribute(AttributeSchema::new("Roles", string_list())),
    }
}

pub fn configs() -> Vec<AwsSchemaConfig> {
    vec![role_config(), policy_config()]
}
