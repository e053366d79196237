//! Application Auto Scaling schemas

use super::AwsSchemaConfig;
use crate::resources::*;
use tenant_mgmt_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

const VALID_PREDEFINED_METRICS: &[&str] = &[
    "ECSServiceAverageCPUUtilization",
    "ECSServiceAverageMemoryUtilization",
    "ALBRequestCountPerTarget",
];

fn target_tracking_type() -> AttributeType {
    AttributeType::Struct(vec![
        AttributeSchema::new("TargetValue", types::positive_int()).required(),
        AttributeSchema::new("ScaleInCooldown", types::non_negative_int()),
        AttributeSchema::new("ScaleOutCooldown", types::non_negative_int()),
        AttributeSchema::new("DisableScaleIn", AttributeType::Bool),
        AttributeSchema::new(
            "PredefinedMetricSpecification",
            AttributeType::Struct(vec![
                AttributeSchema::new(
                    "PredefinedMetricType",
                    AttributeType::enumeration(VALID_PREDEFINED_METRICS),
                )
                .required(),
            ]),
        ),
    ])
}

pub fn scalable_target_config() -> AwsSchemaConfig {
    AwsSchemaConfig {
        aws_type_name: AUTOSCALING_SCALABLE_TARGET,
        has_tags: false,
        schema: ResourceSchema::new(AUTOSCALING_SCALABLE_TARGET)
            .attribute(AttributeSchema::new("MinCapacity", types::non_negative_int()).required())
            .attribute(AttributeSchema::new("MaxCapacity", types::non_negative_int()).required())
            .attribute(AttributeSchema::new("ResourceId", AttributeType::String).required())
            .attribute(AttributeSchema::new("RoleARN", AttributeType::String))
            .attribute(
                AttributeSchema::new(
                    "ScalableDimension",
                    AttributeType::enumeration(&["ecs:service:DesiredCount"]),
                )
                .required(),
            )
            .attribute(
                AttributeSchema::new("ServiceNamespace", AttributeType::enumeration(&["ecs"]))
                    .required(),
            ),
    }
}

pub fn scaling_policy_config() -> AwsSchemaConfig {
    AwsSchemaConfig {
        aws_type_name: AUTOSCALING_SCALING_POLICY,
        has_tags: false,
        schema: ResourceSchema::new(AUTOSCALING_SCALING_POLICY)
            .attribute(AttributeSchema::new("PolicyName", AttributeType::String).required())
            .attribute(
                AttributeSchema::new(
                    "PolicyType",
                    AttributeType::enumeration(&["TargetTrackingScaling", "StepScaling"]),
                )
                .required(),
            )
            .attribute(AttributeSchema::new("ScalingTargetId", AttributeType::String))
            .attribute(AttributeSchema::new(
                "TargetTrackingScalingPolicyConfiguration",
                target_tracking_type(),
            )),
    }
}

pub fn configs() -> Vec<AwsSchemaConfig> {
    vec![scalable_target_config(), scaling_policy_config()]
}
