//! ECS schemas: cluster, Fargate task definition, service

use super::{AwsSchemaConfig, int_range_type, key_value_type, port_type, string_list, tags_type};
use crate::resources::*;
use tenant_mgmt_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

fn cluster_setting_type() -> AttributeType {
    AttributeType::Struct(vec![
        AttributeSchema::new("Name", AttributeType::enumeration(&["containerInsights"])).required(),
        AttributeSchema::new(
            "Value",
            AttributeType::enumeration(&["enabled", "disabled", "enhanced"]),
        )
        .required(),
    ])
}

fn port_mapping_type() -> AttributeType {
    AttributeType::Struct(vec![
        AttributeSchema::new("ContainerPort", port_type()).required(),
        AttributeSchema::new("HostPort", port_type()),
        AttributeSchema::new("Protocol", AttributeType::enumeration(&["tcp", "udp"])),
    ])
}

fn log_configuration_type() -> AttributeType {
    AttributeType::Struct(vec![
        AttributeSchema::new(
            "LogDriver",
            AttributeType::enumeration(&["awslogs", "awsfirelens", "splunk"]),
        )
        .required(),
        AttributeSchema::new("Options", AttributeType::Map(Box::new(AttributeType::String))),
    ])
}

fn health_check_type() -> AttributeType {
    AttributeType::Struct(vec![
        AttributeSchema::new("Command", string_list()).required(),
        AttributeSchema::new("Interval", int_range_type!("HealthCheckInterval", 5, 300)),
        AttributeSchema::new("Timeout", int_range_type!("HealthCheckTimeout", 2, 120)),
        AttributeSchema::new("Retries", int_range_type!("HealthCheckRetries", 1, 10)),
        AttributeSchema::new("StartPeriod", int_range_type!("HealthCheckStartPeriod", 0, 300)),
    ])
}

fn container_definition_type() -> AttributeType {
    AttributeType::Struct(vec![
        AttributeSchema::new("Name", AttributeType::String).required(),
        AttributeSchema::new("Image", AttributeType::String).required(),
        AttributeSchema::new("Essential", AttributeType::Bool),
        AttributeSchema::new("PortMappings", AttributeType::list(port_mapping_type())),
        AttributeSchema::new(
            "Environment",
            AttributeType::list(key_value_type("Name", "Value")),
        ),
        AttributeSchema::new("LogConfiguration", log_configuration_type()),
        AttributeSchema::new("HealthCheck", health_check_type()),
    ])
}

fn runtime_platform_type() -> AttributeType {
    AttributeType::Struct(vec![
        AttributeSchema::new(
            "CpuArchitecture",
            AttributeType::enumeration(&["X86_64", "ARM64"]),
        ),
        AttributeSchema::new(
            "OperatingSystemFamily",
            AttributeType::enumeration(&["LINUX", "WINDOWS_SERVER_2022_CORE"]),
        ),
    ])
}

fn network_configuration_type() -> AttributeType {
    AttributeType::Struct(vec![
        AttributeSchema::new(
            "AwsvpcConfiguration",
            AttributeType::Struct(vec![
                AttributeSchema::new(
                    "AssignPublicIp",
                    AttributeType::enumeration(&["ENABLED", "DISABLED"]),
                ),
                AttributeSchema::new("SecurityGroups", string_list()),
                AttributeSchema::new("Subnets", string_list()).required(),
            ]),
        )
        .required(),
    ])
}

fn load_balancer_type() -> AttributeType {
    AttributeType::Struct(vec![
        AttributeSchema::new("ContainerName", AttributeType::String).required(),
        AttributeSchema::new("ContainerPort", port_type()).required(),
        AttributeSchema::new("TargetGroupArn", AttributeType::String).required(),
    ])
}

fn deployment_configuration_type() -> AttributeType {
    AttributeType::Struct(vec![
        AttributeSchema::new("MaximumPercent", types::positive_int()),
        AttributeSchema::new("MinimumHealthyPercent", types::non_negative_int()),
    ])
}

pub fn cluster_config() -> AwsSchemaConfig {
    AwsSchemaConfig {
        aws_type_name: ECS_CLUSTER,
        has_tags: true,
        schema: ResourceSchema::new(ECS_CLUSTER)
            .attribute(AttributeSchema::new("ClusterName", AttributeType::String))
            .attribute(AttributeSchema::new(
                "ClusterSettings",
                AttributeType::list(cluster_setting_type()),
            ))
            .attribute(AttributeSchema::new("Tags", tags_type())),
    }
}

pub fn task_definition_config() -> AwsSchemaConfig {
    AwsSchemaConfig {
        aws_type_name: ECS_TASK_DEFINITION,
        has_tags: true,
        schema: ResourceSchema::new(ECS_TASK_DEFINITION)
            .attribute(AttributeSchema::new("Family", AttributeType::String))
            .attribute(AttributeSchema::new("Cpu", AttributeType::String))
            .attribute(AttributeSchema::new("Memory", AttributeType::String))
            .attribute(AttributeSchema::new(
                "NetworkMode",
                AttributeType::enumeration(&["awsvpc", "bridge", "host", "none"]),
            ))
            .attribute(AttributeSchema::new(
                "RequiresCompatibilities",
                AttributeType::list(AttributeType::enumeration(&["FARGATE", "EC2", "EXTERNAL"])),
            ))
            .attribute(AttributeSchema::new("RuntimePlatform", runtime_platform_type()))
            .attribute(AttributeSchema::new("ExecutionRoleArn", AttributeType::String))
            .attribute(AttributeSchema::new("TaskRoleArn", AttributeType::String))
            .attribute(
                AttributeSchema::new(
                    "ContainerDefinitions",
                    AttributeType::list(container_definition_type()),
                )
                .required(),
            )
            .attribute(AttributeSchema::new("Tags", tags_type())),
    }
}

pub fn service_config() -> AwsSchemaConfig {
    AwsSchemaConfig {
        aws_type_name: ECS_SERVICE,
        has_tags: true,
        schema: ResourceSchema::new(ECS_SERVICE)
            .attribute(AttributeSchema::new("Cluster", AttributeType::String).required())
            .attribute(AttributeSchema::new("ServiceName", AttributeType::String))
            .attribute(AttributeSchema::new("TaskDefinition", AttributeType::String).required())
            .attribute(AttributeSchema::new(
                "LaunchType",
                AttributeType::enumeration(&["FARGATE", "EC2", "EXTERNAL"]),
            ))
            .attribute(AttributeSchema::new("DesiredCount", types::non_negative_int()))
            .attribute(AttributeSchema::new(
                "HealthCheckGracePeriodSeconds",
                types::non_negative_int(),
            ))
            .attribute(AttributeSchema::new(
                "NetworkConfiguration",
                network_configuration_type(),
            ))
            .attribute(AttributeSchema::new(
                "LoadBalancers",
                AttributeType::list(load_balancer_type()),
            ))
            .attribute(AttributeSchema::new(
                "DeploymentConfiguration",
                deployment_configuration_type(),
            ))
            .attribute(AttributeSchema::new("EnableECSManagedTags", AttributeType::Bool))
            .attribute(AttributeSchema::new("Tags", tags_type())),
    }
}

pub fn configs() -> Vec<AwsSchemaConfig> {
    vec![cluster_config(), task_definition_config(), service_config()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tenant_mgmt_core::resource::Value;

    #[test]
    fn container_health_check_bounds() {
        let t = health_check_type();
        let ok = Value::map([
            (
                "Command",
                Value::list(["CMD-SHELL", "curl -f http://localhost/ || exit 1"]),
            ),
            ("Interval", Value::Int(30)),
            ("Timeout", Value::Int(5)),
            ("Retries", Value::Int(3)),
            ("StartPeriod", Value::Int(60)),
        ]);
        assert!(t.validate(&ok).is_ok());

        let bad = Value::map([
            ("Command", Value::list(["CMD", "true"])),
            ("Retries", Value::Int(11)),
        ]);
        assert!(t.validate(&bad).is_err());
    }

    #[test]
    fn service_requires_cluster_and_task_definition() {
        let schema = service_config().schema;
        let errors = schema.validate(&BTreeMap::new()).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn service_rejects_negative_desired_count() {
        let schema = service_config().schema;
        let mut props = BTreeMap::new();
        props.insert("Cluster".to_string(), Value::Ref("Cluster".to_string()));
        props.insert("TaskDefinition".to_string(), Value::Ref("TaskDef".to_string()));
        props.insert("DesiredCount".to_string(), Value::Int(-1));
        assert!(schema.validate(&props).is_err());
    }
}
