//! CloudWatch Logs schemas

use super::{AwsSchemaConfig, tags_type};
use crate::resources::*;
use tenant_mgmt_core::resource::Value;
use tenant_mgmt_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

/// Retention periods CloudWatch Logs accepts, in days
pub const VALID_RETENTION_DAYS: &[i64] = &[
    1, 3, 5, 7, 14, 30, 60, 90, 120, 150, 180, 365, 400, 545, 731, 1096, 1827, 2192, 2557,
    2922, 3288, 3653,
];

fn retention_type() -> AttributeType {
    AttributeType::Custom {
        name: "RetentionInDays".to_string(),
        base: Box::new(AttributeType::Int),
        validate: |value| match value {
            Value::Int(n) if VALID_RETENTION_DAYS.contains(n) => Ok(()),
            Value::Int(n) => Err(format!("{} is not a supported retention period", n)),
            _ => Err("Expected integer".to_string()),
        },
    }
}

pub fn log_group_config() -> AwsSchemaConfig {
    AwsSchemaConfig {
        aws_type_name: LOGS_LOG_GROUP,
        has_tags: true,
        schema: ResourceSchema::new(LOGS_LOG_GROUP)
            .attribute(AttributeSchema::new("LogGroupName", AttributeType::String))
            .attribute(AttributeSchema::new("RetentionInDays", retention_type()))
            .attribute(AttributeSchema::new("Tags", tags_type())),
    }
}

pub fn configs() -> Vec<AwsSchemaConfig> {
    vec![log_group_config()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retention_must_be_a_supported_period() {
        let t = retention_type();
        assert!(t.validate(&Value::Int(30)).is_ok());
        assert!(t.validate(&Value::Int(31)).is_err());
    }
}
