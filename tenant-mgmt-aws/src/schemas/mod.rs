//! AWS resource schema definitions
//!
//! Only the properties the tenant-mgmt stacks set are described; anything
//! else is reported as an unknown attribute at synthesis time.

pub mod autoscaling;
pub mod cloudwatch;
pub mod ec2;
pub mod ecs;
pub mod elbv2;
pub mod iam;
pub mod logs;
pub mod sns;

use tenant_mgmt_core::resource::Value;
use tenant_mgmt_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

/// AWS schema configuration
///
/// Combines the ResourceSchema with AWS-specific metadata.
pub struct AwsSchemaConfig {
    /// AWS CloudFormation type name (e.g., "AWS::EC2::VPC")
    pub aws_type_name: &'static str,
    /// Whether this resource type uses tags
    pub has_tags: bool,
    /// The resource schema with attribute definitions
    pub schema: ResourceSchema,
}

/// Tags type for AWS resources (CloudFormation `[{Key, Value}]` list)
pub fn tags_type() -> AttributeType {
    AttributeType::list(key_value_type("Key", "Value"))
}

/// Object with exactly two required string fields
pub fn key_value_type(key: &str, value: &str) -> AttributeType {
    AttributeType::Struct(vec![
        AttributeSchema::new(key, AttributeType::String).required(),
        AttributeSchema::new(value, AttributeType::String).required(),
    ])
}

pub fn string_list() -> AttributeType {
    AttributeType::list(AttributeType::String)
}

/// IAM-style JSON document (policy, trust policy)
pub fn policy_document_type() -> AttributeType {
    AttributeType::Custom {
        name: "PolicyDocument".to_string(),
        base: Box::new(AttributeType::Any),
        validate: validate_policy_document,
    }
}

fn validate_policy_document(value: &Value) -> Result<(), String> {
    let Value::Map(doc) = value else {
        return Err("Policy document must be an object".to_string());
    };
    if !doc.contains_key("Version") {
        return Err("Policy document is missing 'Version'".to_string());
    }
    match doc.get("Statement") {
        Some(Value::List(statements)) if !statements.is_empty() => Ok(()),
        _ => Err("Policy document needs at least one statement".to_string()),
    }
}

/// TCP/UDP port number
pub fn port_type() -> AttributeType {
    AttributeType::Custom {
        name: "Port".to_string(),
        base: Box::new(AttributeType::Int),
        validate: |value| match value {
            Value::Int(n) if (0..=65535).contains(n) => Ok(()),
            Value::Int(n) => Err(format!("Port {} is out of range 0-65535", n)),
            _ => Err("Expected integer".to_string()),
        },
    }
}

/// Integer within an inclusive range
macro_rules! int_range_type {
    ($name:expr, $min:expr, $max:expr) => {
        tenant_mgmt_core::schema::AttributeType::Custom {
            name: $name.to_string(),
            base: Box::new(tenant_mgmt_core::schema::AttributeType::Int),
            validate: |value| match value {
                tenant_mgmt_core::resource::Value::Int(n) if ($min..=$max).contains(n) => Ok(()),
                tenant_mgmt_core::resource::Value::Int(n) => Err(format!(
                    "Value {} is out of range {}-{}",
                    n, $min, $max
                )),
                _ => Err("Expected integer".to_string()),
            },
        }
    };
}
pub(crate) use int_range_type;

/// Returns all schema configs
pub fn configs() -> Vec<AwsSchemaConfig> {
    let mut configs = Vec::new();
    configs.extend(ec2::configs());
    configs.extend(ecs::configs());
    configs.extend(elbv2::configs());
    configs.extend(iam::configs());
    configs.extend(logs::configs());
    configs.extend(autoscaling::configs());
    configs.extend(cloudwatch::configs());
    configs.extend(sns::configs());
    configs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_config_matches_its_schema_type() {
        for config in configs() {
            assert_eq!(config.aws_type_name, config.schema.resource_type);
        }
    }

    #[test]
    fn taggable_schemas_declare_tags() {
        for config in configs() {
            assert_eq!(
                config.has_tags,
                config.schema.attributes.contains_key("Tags"),
                "{}",
                config.aws_type_name
            );
        }
    }

    #[test]
    fn policy_document_needs_statements() {
        let t = policy_document_type();
        assert!(t.validate(&Value::map([("Version", "2012-10-17")])).is_err());
        assert!(
            t.validate(&Value::map([
                ("Version", Value::str("2012-10-17")),
                ("Statement", Value::List(vec![Value::map([("Effect", "Allow")])])),
            ]))
            .is_ok()
        );
        assert!(t.validate(&Value::str("{}")).is_err());
    }

    #[test]
    fn tags_are_key_value_pairs() {
        let t = tags_type();
        assert!(
            t.validate(&Value::List(vec![Value::map([("Key", "a"), ("Value", "b")])]))
                .is_ok()
        );
        assert!(t.validate(&Value::List(vec![Value::map([("Key", "a")])])).is_err());
    }

    #[test]
    fn port_range() {
        assert!(port_type().validate(&Value::Int(443)).is_ok());
        assert!(port_type().validate(&Value::Int(70000)).is_err());
    }
}
