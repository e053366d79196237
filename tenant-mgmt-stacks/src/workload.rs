//! Workload - Fargate service behind an internal application load balancer

use tenant_mgmt_aws::arn;
use tenant_mgmt_aws::resources::*;
use tenant_mgmt_core::app::SynthError;
use tenant_mgmt_core::resource::{RemovalPolicy, Resource, ResourceHandle, Value};
use tenant_mgmt_core::stack::{Output, Stack};

use crate::config::{AppConfig, MAX_CAPACITY};
use crate::identity::{Identities, add_task_identities};
use crate::network::{NetworkUnit, allow_all_egress};

pub const CONTAINER_NAME: &str = "App";
pub const CONTAINER_PORT: i64 = 80;
pub const LISTENER_PORT: i64 = 80;
pub const LOG_STREAM_PREFIX: &str = "tenant-mgmt-service";
pub const LOG_RETENTION_DAYS: i64 = 30;
pub const HEALTH_CHECK_GRACE_PERIOD: i64 = 60;
pub const SCALING_TARGET_PERCENT: i64 = 70;
pub const SCALING_COOLDOWN: i64 = 60;

const AUTOSCALING_SERVICE_LINKED_ROLE: &str = "role/aws-service-role/ecs.application-autoscaling.amazonaws.com/AWSServiceRoleForApplicationAutoScaling_ECSService";

pub fn stack_name(env_name: &str) -> String {
    format!("TenantMgmtService-{}", env_name)
}

/// What downstream units need from the workload
#[derive(Debug, Clone)]
pub struct WorkloadUnit {
    pub cluster: ResourceHandle,
    pub service: ResourceHandle,
    pub load_balancer: ResourceHandle,
    pub target_group: ResourceHandle,
    pub identities: Identities,
}

impl WorkloadUnit {
    pub fn cluster_name(&self) -> Value {
        self.cluster.reference()
    }

    pub fn service_name(&self) -> Value {
        self.service.attribute("Name")
    }

    /// "app/<name>/<id>", the form CloudWatch uses as the `LoadBalancer` dimension
    pub fn load_balancer_full_name(&self) -> Value {
        self.load_balancer.attribute("LoadBalancerFullName")
    }
}

fn tcp_ingress(port: i64, source: (&str, Value), description: &str) -> Value {
    Value::map([
        ("IpProtocol", Value::str("tcp")),
        ("FromPort", Value::Int(port)),
        ("ToPort", Value::Int(port)),
        (source.0, source.1),
        ("Description", Value::str(description)),
    ])
}

fn container_definition(config: &AppConfig, stack: &Stack, log_group: &ResourceHandle) -> Value {
    Value::map([
        ("Name", Value::str(CONTAINER_NAME)),
        ("Image", Value::str(&config.container_image)),
        ("Essential", Value::Bool(true)),
        (
            "PortMappings",
            Value::List(vec![Value::map([
                ("ContainerPort", Value::Int(CONTAINER_PORT)),
                ("Protocol", Value::str("tcp")),
            ])]),
        ),
        (
            "LogConfiguration",
            Value::map([
                ("LogDriver", Value::str("awslogs")),
                (
                    "Options",
                    Value::map([
                        ("awslogs-group", log_group.reference()),
                        ("awslogs-stream-prefix", Value::str(LOG_STREAM_PREFIX)),
                        ("awslogs-region", stack.region()),
                    ]),
                ),
            ]),
        ),
        (
            "Environment",
            Value::List(vec![
                Value::map([
                    ("Name", Value::str("ENVIRONMENT")),
                    ("Value", Value::str(&config.env_name)),
                ]),
                Value::map([("Name", Value::str("AWS_REGION")), ("Value", stack.region())]),
            ]),
        ),
        (
            "HealthCheck",
            Value::map([
                (
                    "Command",
                    Value::list(["CMD-SHELL", "curl -f http://localhost/ || exit 1"]),
                ),
                ("Interval", Value::Int(30)),
                ("Timeout", Value::Int(5)),
                ("Retries", Value::Int(3)),
                ("StartPeriod", Value::Int(60)),
            ]),
        ),
    ])
}

fn target_tracking(metric: &str) -> Value {
    Value::map([
        (
            "PredefinedMetricSpecification",
            Value::map([("PredefinedMetricType", metric)]),
        ),
        ("TargetValue", Value::Int(SCALING_TARGET_PERCENT)),
        ("ScaleInCooldown", Value::Int(SCALING_COOLDOWN)),
        ("ScaleOutCooldown", Value::Int(SCALING_COOLDOWN)),
    ])
}

pub fn workload_stack(
    config: &AppConfig,
    network: &NetworkUnit,
) -> Result<(Stack, WorkloadUnit), SynthError> {
    let env = &config.env_name;
    let mut stack = Stack::new(stack_name(env), config.environment())
        .with_description("Tenant management service: Fargate service behind an internal ALB");

    // Security groups
    let service_sg = stack.add(
        Resource::new(EC2_SECURITY_GROUP, "ServiceSecurityGroup")
            .with_property(
                "GroupDescription",
                "Security group for tenant management service",
            )
            .with_property("VpcId", network.vpc_id())
            .with_property(
                "SecurityGroupIngress",
                Value::List(vec![tcp_ingress(
                    80,
                    ("CidrIp", network.vpc_cidr()),
                    "Allow HTTP from within VPC",
                )]),
            )
            .with_property("SecurityGroupEgress", allow_all_egress()),
    )?;

    let lb_sg = stack.add(
        Resource::new(EC2_SECURITY_GROUP, "LoadBalancerSecurityGroup")
            .with_property(
                "GroupDescription",
                "Security group for the internal load balancer",
            )
            .with_property("VpcId", network.vpc_id())
            .with_property(
                "SecurityGroupIngress",
                Value::List(vec![tcp_ingress(
                    LISTENER_PORT,
                    ("CidrIp", network.vpc_cidr()),
                    "Allow HTTP from within VPC",
                )]),
            )
            .with_property("SecurityGroupEgress", allow_all_egress()),
    )?;

    stack.add(
        Resource::new(EC2_SECURITY_GROUP_INGRESS, "ServiceSecurityGroupFromLoadBalancer")
            .with_property("GroupId", service_sg.attribute("GroupId"))
            .with_property("IpProtocol", "tcp")
            .with_property("FromPort", CONTAINER_PORT)
            .with_property("ToPort", CONTAINER_PORT)
            .with_property("SourceSecurityGroupId", lb_sg.attribute("GroupId"))
            .with_property("Description", "Load balancer to target"),
    )?;

    // Cluster, logs and identities
    let cluster = stack.add(Resource::new(ECS_CLUSTER, "Cluster").with_property(
        "ClusterSettings",
        Value::List(vec![Value::map([
            ("Name", "containerInsights"),
            ("Value", "enabled"),
        ])]),
    ))?;

    let log_group = stack.add(
        Resource::new(LOGS_LOG_GROUP, "AppLogs")
            .with_property("LogGroupName", format!("/aws/ecs/tenant-mgmt-{}", env))
            .with_property("RetentionInDays", LOG_RETENTION_DAYS)
            .with_removal_policy(RemovalPolicy::Retain),
    )?;

    let identities = add_task_identities(&mut stack)?;

    let container = container_definition(config, &stack, &log_group);
    let task_definition = stack.add(
        Resource::new(ECS_TASK_DEFINITION, "TaskDef")
            .with_property("Family", format!("tenant-mgmt-service-{}", env))
            .with_property("Cpu", config.cpu.to_string())
            .with_property("Memory", config.memory.to_string())
            .with_property("NetworkMode", "awsvpc")
            .with_property("RequiresCompatibilities", Value::list(["FARGATE"]))
            .with_property(
                "RuntimePlatform",
                Value::map([
                    ("CpuArchitecture", "X86_64"),
                    ("OperatingSystemFamily", "LINUX"),
                ]),
            )
            .with_property(
                "ExecutionRoleArn",
                identities.execution_role.attribute("Arn"),
            )
            .with_property("TaskRoleArn", identities.task_role.attribute("Arn"))
            .with_property("ContainerDefinitions", Value::List(vec![container])),
    )?;

    // Internal load balancer
    let load_balancer = stack.add(
        Resource::new(ELBV2_LOAD_BALANCER, "LoadBalancer")
            .with_property("Scheme", "internal")
            .with_property("Type", "application")
            .with_property("Subnets", network.workload_subnet_ids())
            .with_property(
                "SecurityGroups",
                Value::List(vec![lb_sg.attribute("GroupId")]),
            )
            .with_property(
                "LoadBalancerAttributes",
                Value::List(vec![Value::map([
                    ("Key", "deletion_protection.enabled"),
                    ("Value", "false"),
                ])]),
            ),
    )?;

    let target_group = stack.add(
        Resource::new(ELBV2_TARGET_GROUP, "TargetGroup")
            .with_property("Port", CONTAINER_PORT)
            .with_property("Protocol", "HTTP")
            .with_property("TargetType", "ip")
            .with_property("VpcId", network.vpc_id())
            .with_property("HealthCheckEnabled", true)
            .with_property("HealthCheckPath", "/")
            .with_property("HealthCheckIntervalSeconds", 30i64)
            .with_property("HealthCheckTimeoutSeconds", 5i64)
            .with_property("HealthyThresholdCount", 2i64)
            .with_property("UnhealthyThresholdCount", 3i64),
    )?;

    let listener = stack.add(
        Resource::new(ELBV2_LISTENER, "Listener")
            .with_property("LoadBalancerArn", load_balancer.reference())
            .with_property("Port", LISTENER_PORT)
            .with_property("Protocol", "HTTP")
            .with_property(
                "DefaultActions",
                Value::List(vec![Value::map([
                    ("Type", Value::str("forward")),
                    ("TargetGroupArn", target_group.reference()),
                ])]),
            ),
    )?;

    // Service
    let service = stack.add(
        Resource::new(ECS_SERVICE, "Service")
            .with_property("Cluster", cluster.reference())
            .with_property("LaunchType", "FARGATE")
            .with_property("TaskDefinition", task_definition.reference())
            .with_property("DesiredCount", config.desired_count)
            .with_property("HealthCheckGracePeriodSeconds", HEALTH_CHECK_GRACE_PERIOD)
            .with_property(
                "NetworkConfiguration",
                Value::map([(
                    "AwsvpcConfiguration",
                    Value::map([
                        ("AssignPublicIp", Value::str("DISABLED")),
                        (
                            "SecurityGroups",
                            Value::List(vec![service_sg.attribute("GroupId")]),
                        ),
                        ("Subnets", network.workload_subnet_ids()),
                    ]),
                )]),
            )
            .with_property(
                "LoadBalancers",
                Value::List(vec![Value::map([
                    ("ContainerName", Value::str(CONTAINER_NAME)),
                    ("ContainerPort", Value::Int(CONTAINER_PORT)),
                    ("TargetGroupArn", target_group.reference()),
                ])]),
            )
            .with_property(
                "DeploymentConfiguration",
                Value::map([
                    ("MaximumPercent", Value::Int(200)),
                    ("MinimumHealthyPercent", Value::Int(50)),
                ]),
            )
            .with_property("EnableECSManagedTags", false)
            .depends_on(listener.logical_id())
            .depends_on(identities.task_role_policy.logical_id()),
    )?;

    // Scaling: min = desired, max fixed
    let scalable_target = stack.add(
        Resource::new(AUTOSCALING_SCALABLE_TARGET, "ServiceTaskCountTarget")
            .with_property("MinCapacity", config.desired_count)
            .with_property("MaxCapacity", MAX_CAPACITY)
            .with_property(
                "ResourceId",
                Value::join(
                    "/",
                    vec![
                        Value::str("service"),
                        cluster.reference(),
                        service.attribute("Name"),
                    ],
                ),
            )
            .with_property(
                "RoleARN",
                arn(stack.env(), "iam", AUTOSCALING_SERVICE_LINKED_ROLE, false),
            )
            .with_property("ScalableDimension", "ecs:service:DesiredCount")
            .with_property("ServiceNamespace", "ecs"),
    )?;

    for (id, policy_name, metric) in [
        (
            "ServiceTaskCountTargetCpuScaling",
            format!("tenant-mgmt-cpu-scaling-{}", env),
            "ECSServiceAverageCPUUtilization",
        ),
        (
            "ServiceTaskCountTargetMemoryScaling",
            format!("tenant-mgmt-memory-scaling-{}", env),
            "ECSServiceAverageMemoryUtilization",
        ),
    ] {
        stack.add(
            Resource::new(AUTOSCALING_SCALING_POLICY, id)
                .with_property("PolicyName", policy_name)
                .with_property("PolicyType", "TargetTrackingScaling")
                .with_property("ScalingTargetId", scalable_target.reference())
                .with_property(
                    "TargetTrackingScalingPolicyConfiguration",
                    target_tracking(metric),
                ),
        )?;
    }

    stack.add_tag("Stack", "Service");
    stack.tag_resources([&service], "Service", "tenant-management");

    stack.add_output(
        Output::new("LoadBalancerDNS", load_balancer.attribute("DNSName"))
            .with_description("Internal ALB DNS"),
    )?;
    stack.add_output(
        Output::new("ClusterName", cluster.reference()).with_description("ECS Cluster name"),
    )?;

    Ok((
        stack,
        WorkloadUnit {
            cluster,
            service,
            load_balancer,
            target_group,
            identities,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Context;
    use crate::network::network_stack;
    use tenant_mgmt_core::resource::PseudoParameter;

    fn build(pairs: &[(&str, &str)]) -> (Stack, WorkloadUnit) {
        let mut context = Context::new();
        for (k, v) in pairs {
            context.set(*k, *v);
        }
        let config = AppConfig::resolve(&context, |_| None).unwrap();
        let (_, network) = network_stack(&config).unwrap();
        workload_stack(&config, &network).unwrap()
    }

    #[test]
    fn load_balancer_is_internal() {
        let (stack, _) = build(&[]);
        let lb = stack.resource("LoadBalancer").unwrap();
        assert_eq!(lb.property("Scheme"), Some(&Value::str("internal")));
        assert_eq!(stack.count_of(ELBV2_LOAD_BALANCER), 1);
    }

    #[test]
    fn counts() {
        let (stack, _) = build(&[]);
        assert_eq!(stack.name(), "TenantMgmtService-dev");
        assert_eq!(stack.count_of(IAM_ROLE), 2);
        assert_eq!(stack.count_of(ECS_CLUSTER), 1);
        assert_eq!(stack.count_of(ECS_SERVICE), 1);
        assert_eq!(stack.count_of(ECS_TASK_DEFINITION), 1);
        assert_eq!(stack.count_of(AUTOSCALING_SCALING_POLICY), 2);
    }

    #[test]
    fn scaling_range_starts_at_desired_count() {
        for desired in 1..=MAX_CAPACITY {
            let (stack, _) = build(&[("desiredCount", desired.to_string().as_str())]);
            let target = stack.resource("ServiceTaskCountTarget").unwrap();
            assert_eq!(
                target.property("MinCapacity"),
                Some(&Value::Int(i64::from(desired)))
            );
            assert_eq!(
                target.property("MaxCapacity"),
                Some(&Value::Int(i64::from(MAX_CAPACITY)))
            );
            let service = stack.resource("Service").unwrap();
            assert_eq!(
                service.property("DesiredCount"),
                Some(&Value::Int(i64::from(desired)))
            );
        }
    }

    #[test]
    fn service_ingress_only_from_vpc_cidr() {
        let (stack, _) = build(&[]);
        let sg = stack.resource("ServiceSecurityGroup").unwrap();
        let Some(Value::List(rules)) = sg.property("SecurityGroupIngress") else {
            panic!("expected ingress rules");
        };
        assert_eq!(rules.len(), 1);
        let Value::Map(rule) = &rules[0] else {
            panic!("expected rule map");
        };
        assert_eq!(rule["FromPort"], Value::Int(80));
        assert!(matches!(&rule["CidrIp"], Value::Token(t) if t.attribute.as_deref() == Some("CidrBlock")));
    }

    #[test]
    fn service_is_tagged_and_waits_for_listener() {
        let (stack, unit) = build(&[]);
        let service = stack.resource("Service").unwrap();
        assert_eq!(
            stack.effective_tags(service)["Service"],
            "tenant-management"
        );
        assert!(
            !stack
                .effective_tags(stack.resource("Cluster").unwrap())
                .contains_key("Service")
        );
        assert!(service.depends_on.contains(&"Listener".to_string()));
        assert_eq!(unit.service.logical_id(), "Service");
    }

    #[test]
    fn container_uses_configured_image_and_size() {
        let (stack, _) = build(&[
            ("containerImage", "example.com/app:1"),
            ("cpu", "1024"),
            ("memory", "2048"),
            ("env", "qa"),
        ]);
        let task = stack.resource("TaskDef").unwrap();
        assert_eq!(task.property("Cpu"), Some(&Value::str("1024")));
        assert_eq!(task.property("Memory"), Some(&Value::str("2048")));
        let Some(Value::List(containers)) = task.property("ContainerDefinitions") else {
            panic!("expected container definitions");
        };
        let Value::Map(container) = &containers[0] else {
            panic!("expected container map");
        };
        assert_eq!(container["Image"], Value::str("example.com/app:1"));
        assert_eq!(container["Name"], Value::str(CONTAINER_NAME));
    }

    #[test]
    fn container_health_check_and_environment() {
        let (stack, _) = build(&[("env", "qa")]);
        let task = stack.resource("TaskDef").unwrap();
        let Some(Value::List(containers)) = task.property("ContainerDefinitions") else {
            panic!("expected container definitions");
        };
        let Value::Map(container) = &containers[0] else {
            panic!("expected container map");
        };

        assert_eq!(
            container["HealthCheck"],
            Value::map([
                (
                    "Command",
                    Value::list(["CMD-SHELL", "curl -f http://localhost/ || exit 1"]),
                ),
                ("Interval", Value::Int(30)),
                ("Timeout", Value::Int(5)),
                ("Retries", Value::Int(3)),
                ("StartPeriod", Value::Int(60)),
            ])
        );
        assert_eq!(
            container["Environment"],
            Value::List(vec![
                Value::map([("Name", "ENVIRONMENT"), ("Value", "qa")]),
                Value::map([
                    ("Name", Value::str("AWS_REGION")),
                    ("Value", Value::Pseudo(PseudoParameter::Region)),
                ]),
            ])
        );
    }

    #[test]
    fn target_group_health_check() {
        let (stack, _) = build(&[]);
        let tg = stack.resource("TargetGroup").unwrap();
        assert_eq!(tg.property("TargetType"), Some(&Value::str("ip")));
        assert_eq!(tg.property("HealthCheckPath"), Some(&Value::str("/")));
        assert_eq!(tg.property("HealthCheckIntervalSeconds"), Some(&Value::Int(30)));
        assert_eq!(tg.property("HealthCheckTimeoutSeconds"), Some(&Value::Int(5)));
        assert_eq!(tg.property("HealthyThresholdCount"), Some(&Value::Int(2)));
        assert_eq!(tg.property("UnhealthyThresholdCount"), Some(&Value::Int(3)));
    }

    #[test]
    fn service_has_no_public_ip_and_grace_period() {
        let (stack, _) = build(&[]);
        let service = stack.resource("Service").unwrap();
        assert_eq!(
            service.property("HealthCheckGracePeriodSeconds"),
            Some(&Value::Int(60))
        );
        let Some(Value::Map(network)) = service.property("NetworkConfiguration") else {
            panic!("expected network configuration");
        };
        let Value::Map(awsvpc) = &network["AwsvpcConfiguration"] else {
            panic!("expected awsvpc configuration");
        };
        assert_eq!(awsvpc["AssignPublicIp"], Value::str("DISABLED"));
    }

    #[test]
    fn scaling_policies_track_cpu_and_memory() {
        let (stack, _) = build(&[]);
        for (id, metric) in [
            ("ServiceTaskCountTargetCpuScaling", "ECSServiceAverageCPUUtilization"),
            (
                "ServiceTaskCountTargetMemoryScaling",
                "ECSServiceAverageMemoryUtilization",
            ),
        ] {
            let policy = stack.resource(id).unwrap();
            assert_eq!(
                policy.property("PolicyType"),
                Some(&Value::str("TargetTrackingScaling"))
            );
            let Some(Value::Map(tracking)) =
                policy.property("TargetTrackingScalingPolicyConfiguration")
            else {
                panic!("expected target tracking configuration");
            };
            assert_eq!(tracking["TargetValue"], Value::Int(70));
            assert_eq!(tracking["ScaleInCooldown"], Value::Int(60));
            assert_eq!(tracking["ScaleOutCooldown"], Value::Int(60));
            assert_eq!(
                tracking["PredefinedMetricSpecification"],
                Value::map([("PredefinedMetricType", metric)])
            );
        }
    }

    #[test]
    fn log_group_is_retained() {
        let (stack, _) = build(&[]);
        let logs = stack.resource("AppLogs").unwrap();
        assert_eq!(logs.removal_policy, Some(RemovalPolicy::Retain));
        assert_eq!(logs.property("RetentionInDays"), Some(&Value::Int(30)));
    }
}
