//! CloudWatch schemas: metric alarms and dashboards

use super::{AwsSchemaConfig, key_value_type, string_list};
use crate::resources::*;
use tenant_mgmt_core::resource::Value;
use tenant_mgmt_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

pub const VALID_COMPARISON_OPERATORS: &[&str] = &[
    "GreaterThanOrEqualToThreshold",
    "GreaterThanThreshold",
    "LessThanThreshold",
    "LessThanOrEqualToThreshold",
];

pub const VALID_STATISTICS: &[&str] = &["Average", "Sum", "Minimum", "Maximum", "SampleCount"];

/// Metric periods must be 10, 30 or a multiple of 60 seconds
fn period_type() -> AttributeType {
    AttributeType::Custom {
        name: "Period".to_string(),
        base: Box::new(AttributeType::Int),
        validate: |value| match value {
            Value::Int(10 | 30) => Ok(()),
            Value::Int(n) if *n > 0 && n % 60 == 0 => Ok(()),
            Value::Int(n) => Err(format!("Period {} must be 10, 30 or a multiple of 60", n)),
            _ => Err("Expected integer".to_string()),
        },
    }
}

pub fn alarm_config() -> AwsSchemaConfig {
    AwsSchemaConfig {
        aws_type_name: CLOUDWATCH_ALARM,
        has_tags: false,
        schema: ResourceSchema::new(CLOUDWATCH_ALARM)
            .attribute(AttributeSchema::new("AlarmName", AttributeType::String))
            .attribute(AttributeSchema::new("AlarmDescription", AttributeType::String))
            .attribute(AttributeSchema::new("Namespace", AttributeType::String).required())
            .attribute(AttributeSchema::new("MetricName", AttributeType::String).required())
            .attribute(AttributeSchema::new(
                "Dimensions",
                AttributeType::list(key_value_type("Name", "Value")),
            ))
            .attribute(AttributeSchema::new(
                "Statistic",
                AttributeType::enumeration(VALID_STATISTICS),
            ))
            .attribute(AttributeSchema::new("Period", period_type()))
            .attribute(
                AttributeSchema::new("EvaluationPeriods", types::positive_int()).required(),
            )
            .attribute(AttributeSchema::new("DatapointsToAlarm", types::positive_int()))
            .attribute(AttributeSchema::new("Threshold", AttributeType::Int).required())
            .attribute(
                AttributeSchema::new(
                    "ComparisonOperator",
                    AttributeType::enumeration(VALID_COMPARISON_OPERATORS),
                )
                .required(),
            )
            .attribute(AttributeSchema::new(
                "TreatMissingData",
                AttributeType::enumeration(&["breaching", "notBreaching", "ignore", "missing"]),
            ))
            .attribute(AttributeSchema::new("ActionsEnabled", AttributeType::Bool))
            .attribute(AttributeSchema::new("AlarmActions", string_list()))
            .attribute(AttributeSchema::new("OKActions", string_list())),
    }
}

pub fn dashboard_config() -> AwsSchemaConfig {
    AwsSchemaConfig {
        aws_type_name: CLOUDWATCH_DASHBOARD,
        has_tags: false,
        schema: ResourceSchema::new(CLOUDWATCH_DASHBOARD)
            .attribute(AttributeSchema::new("DashboardName", AttributeType::String))
            .attribute(
                AttributeSchema::new("DashboardBody", AttributeType::String)
                    .required()
                    .with_description("JSON document describing the widgets"),
            ),
    }
}

pub fn configs() -> Vec<AwsSchemaConfig> {
    vec![alarm_config(), dashboard_config()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_rules() {
        let t = period_type();
        assert!(t.validate(&Value::Int(300)).is_ok());
        assert!(t.validate(&Value::Int(30)).is_ok());
        assert!(t.validate(&Value::Int(45)).is_err());
        assert!(t.validate(&Value::Int(0)).is_err());
    }
}
