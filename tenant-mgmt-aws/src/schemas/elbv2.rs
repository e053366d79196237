//! Elastic Load Balancing v2 schemas: load balancer, listener, target group

use super::{AwsSchemaConfig, int_range_type, key_value_type, port_type, string_list, tags_type};
use crate::resources::*;
use tenant_mgmt_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

const VALID_PROTOCOLS: &[&str] = &["HTTP", "HTTPS", "TCP", "TLS", "UDP", "TCP_UDP"];

fn default_action_type() -> AttributeType {
    AttributeType::Struct(vec![
        AttributeSchema::new(
            "Type",
            AttributeType::enumeration(&["forward", "redirect", "fixed-response"]),
        )
        .required(),
        AttributeSchema::new("TargetGroupArn", AttributeType::String),
    ])
}

fn matcher_type() -> AttributeType {
    AttributeType::Struct(vec![AttributeSchema::new(
        "HttpCode",
        AttributeType::String,
    )])
}

pub fn load_balancer_config() -> AwsSchemaConfig {
    AwsSchemaConfig {
        aws_type_name: ELBV2_LOAD_BALANCER,
        has_tags: true,
        schema: ResourceSchema::new(ELBV2_LOAD_BALANCER)
            .attribute(AttributeSchema::new("Name", AttributeType::String))
            .attribute(AttributeSchema::new(
                "Scheme",
                AttributeType::enumeration(&["internal", "internet-facing"]),
            ))
            .attribute(AttributeSchema::new(
                "Type",
                AttributeType::enumeration(&["application", "network", "gateway"]),
            ))
            .attribute(AttributeSchema::new("Subnets", string_list()))
            .attribute(AttributeSchema::new("SecurityGroups", string_list()))
            .attribute(AttributeSchema::new(
                "LoadBalancerAttributes",
                AttributeType::list(key_value_type("Key", "Value")),
            ))
            .attribute(AttributeSchema::new("Tags", tags_type())),
    }
}

pub fn listener_config() -> AwsSchemaConfig {
    AwsSchemaConfig {
        aws_type_name: ELBV2_LISTENER,
        has_tags: false,
        schema: ResourceSchema::new(ELBV2_LISTENER)
            .attribute(AttributeSchema::new("LoadBalancerArn", AttributeType::String).required())
            .attribute(AttributeSchema::new("Port", port_type()))
            .attribute(AttributeSchema::new(
                "Protocol",
                AttributeType::enumeration(VALID_PROTOCOLS),
            ))
            .attribute(
                AttributeSchema::new("DefaultActions", AttributeType::list(default_action_type()))
                    .required(),
            ),
    }
}

pub fn target_group_config() -> AwsSchemaConfig {
    AwsSchemaConfig {
        aws_type_name: ELBV2_TARGET_GROUP,
        has_tags: true,
        schema: ResourceSchema::new(ELBV2_TARGET_GROUP)
            .attribute(AttributeSchema::new("Name", AttributeType::String))
            .attribute(AttributeSchema::new("Port", port_type()))
            .attribute(AttributeSchema::new(
                "Protocol",
                AttributeType::enumeration(VALID_PROTOCOLS),
            ))
            .attribute(AttributeSchema::new(
                "TargetType",
                AttributeType::enumeration(&["instance", "ip", "lambda", "alb"]),
            ))
            .attribute(AttributeSchema::new("VpcId", AttributeType::String))
            .attribute(AttributeSchema::new("HealthCheckEnabled", AttributeType::Bool))
            .attribute(AttributeSchema::new("HealthCheckPath", AttributeType::String))
            .attribute(AttributeSchema::new(
                "HealthCheckIntervalSeconds",
                int_range_type!("HealthCheckIntervalSeconds", 5, 300),
            ))
            .attribute(AttributeSchema::new(
                "HealthCheckTimeoutSeconds",
                int_range_type!("HealthCheckTimeoutSeconds", 2, 120),
            ))
            .attribute(AttributeSchema::new(
                "HealthyThresholdCount",
                int_range_type!("HealthyThresholdCount", 2, 10),
            ))
            .attribute(AttributeSchema::new(
                "UnhealthyThresholdCount",
                int_range_type!("UnhealthyThresholdCount", 2, 10),
            ))
            .attribute(AttributeSchema::new("Matcher", matcher_type()))
            .attribute(AttributeSchema::new(
                "TargetGroupAttributes",
                AttributeType::list(key_value_type("Key", "Value")),
            ))
            .attribute(AttributeSchema::new("Tags", tags_type())),
    }
}

pub fn configs() -> Vec<AwsSchemaConfig> {
    vec![load_balancer_config(), listener_config(), target_group_config()]
}
