//! Observability - Alarms, alarm topic and dashboard for the workload

use tenant_mgmt_aws::resources::*;
use tenant_mgmt_core::app::SynthError;
use tenant_mgmt_core::resource::{Resource, ResourceHandle, Value};
use tenant_mgmt_core::stack::Stack;
use tenant_mgmt_core::template::json_document;

use crate::config::AppConfig;
use crate::workload::WorkloadUnit;

pub const ALARM_PERIOD_SECONDS: i64 = 300;
const WIDGET_SIZE: i64 = 6;

pub fn stack_name(env_name: &str) -> String {
    format!("TenantMgmtMonitoring-{}", env_name)
}

/// A metric the alarms and dashboard watch
#[derive(Debug, Clone)]
struct Metric {
    namespace: &'static str,
    name: &'static str,
    dimensions: Vec<(&'static str, Value)>,
    statistic: &'static str,
}

impl Metric {
    fn ecs(name: &'static str, workload: &WorkloadUnit) -> Self {
        Self {
            namespace: "AWS/ECS",
            name,
            dimensions: vec![
                ("ClusterName", workload.cluster_name()),
                ("ServiceName", workload.service_name()),
            ],
            statistic: "Average",
        }
    }

    fn alb(name: &'static str, statistic: &'static str, workload: &WorkloadUnit) -> Self {
        Self {
            namespace: "AWS/ApplicationELB",
            name,
            dimensions: vec![("LoadBalancer", workload.load_balancer_full_name())],
            statistic,
        }
    }

    fn dimensions_value(&self) -> Value {
        Value::List(
            self.dimensions
                .iter()
                .map(|(name, value)| {
                    Value::map([("Name", Value::str(*name)), ("Value", value.clone())])
                })
                .collect(),
        )
    }

    /// Dashboard form: `[namespace, name, dim1, value1, ...]`
    fn widget_row(&self) -> Value {
        let mut row = vec![Value::str(self.namespace), Value::str(self.name)];
        for (name, value) in &self.dimensions {
            row.push(Value::str(*name));
            row.push(value.clone());
        }
        Value::List(row)
    }
}

/// Threshold alarm on a single metric
#[derive(Debug, Clone)]
struct AlarmSpec {
    logical_id: &'static str,
    name_prefix: &'static str,
    description: &'static str,
    metric: Metric,
    threshold: i64,
    evaluation_periods: i64,
    datapoints_to_alarm: i64,
}

fn alarm_specs(workload: &WorkloadUnit) -> Vec<AlarmSpec> {
    vec![
        AlarmSpec {
            logical_id: "HighCPUAlarm",
            name_prefix: "tenant-mgmt-high-cpu",
            description: "Tenant management service CPU utilization is high",
            metric: Metric::ecs("CPUUtilization", workload),
            threshold: 80,
            evaluation_periods: 2,
            datapoints_to_alarm: 1,
        },
        AlarmSpec {
            logical_id: "HighMemoryAlarm",
            name_prefix: "tenant-mgmt-high-memory",
            description: "Tenant management service memory utilization is high",
            metric: Metric::ecs("MemoryUtilization", workload),
            threshold: 80,
            evaluation_periods: 2,
            datapoints_to_alarm: 1,
        },
        AlarmSpec {
            logical_id: "HighALBResponseTime",
            name_prefix: "tenant-mgmt-high-alb-response",
            description: "Internal load balancer target response time is above 2 seconds",
            metric: Metric::alb("TargetResponseTime", "Average", workload),
            threshold: 2,
            evaluation_periods: 2,
            datapoints_to_alarm: 1,
        },
        AlarmSpec {
            logical_id: "HTTP5xxAlarm",
            name_prefix: "tenant-mgmt-http-5xx",
            description: "Internal load balancer is returning 5xx errors",
            metric: Metric::alb("HTTPCode_ELB_5XX_Count", "Sum", workload),
            threshold: 10,
            evaluation_periods: 1,
            datapoints_to_alarm: 1,
        },
    ]
}

fn alarm_resource(spec: &AlarmSpec, env_name: &str, topic: &ResourceHandle) -> Resource {
    Resource::new(CLOUDWATCH_ALARM, spec.logical_id)
        .with_property("AlarmName", format!("{}-{}", spec.name_prefix, env_name))
        .with_property("AlarmDescription", spec.description)
        .with_property("Namespace", spec.metric.namespace)
        .with_property("MetricName", spec.metric.name)
        .with_property("Dimensions", spec.metric.dimensions_value())
        .with_property("Statistic", spec.metric.statistic)
        .with_property("Period", ALARM_PERIOD_SECONDS)
        .with_property("EvaluationPeriods", spec.evaluation_periods)
        .with_property("DatapointsToAlarm", spec.datapoints_to_alarm)
        .with_property("Threshold", spec.threshold)
        .with_property("ComparisonOperator", "GreaterThanOrEqualToThreshold")
        .with_property("ActionsEnabled", true)
        .with_property("AlarmActions", Value::List(vec![topic.reference()]))
}

fn widget(x: i64, title: &str, metrics: Vec<Value>, region: &Value) -> Value {
    Value::map([
        ("type", Value::str("metric")),
        ("x", Value::Int(x)),
        ("y", Value::Int(0)),
        ("width", Value::Int(WIDGET_SIZE)),
        ("height", Value::Int(WIDGET_SIZE)),
        (
            "properties",
            Value::map([
                ("view", Value::str("timeSeries")),
                ("title", Value::str(title)),
                ("region", region.clone()),
                ("metrics", Value::List(metrics)),
                ("yAxis", Value::Map(Default::default())),
            ]),
        ),
    ])
}

/// Dashboard body as a JSON document value
pub fn dashboard_body(workload: &WorkloadUnit, region: &Value) -> Value {
    let http = |code: &'static str| Metric::alb(code, "Sum", workload).widget_row();
    let widgets = vec![
        widget(
            0,
            "ECS CPU/Memory Utilization",
            vec![
                Metric::ecs("CPUUtilization", workload).widget_row(),
                Metric::ecs("MemoryUtilization", workload).widget_row(),
            ],
            region,
        ),
        widget(
            WIDGET_SIZE,
            "ALB Metrics",
            vec![
                Metric::alb("TargetResponseTime", "Average", workload).widget_row(),
                Metric::alb("RequestCount", "Sum", workload).widget_row(),
            ],
            region,
        ),
        widget(
            WIDGET_SIZE * 2,
            "HTTP Responses",
            vec![
                http("HTTPCode_Target_2XX_Count"),
                http("HTTPCode_Target_4XX_Count"),
                http("HTTPCode_Target_5XX_Count"),
            ],
            region,
        ),
    ];
    json_document(&Value::map([("widgets", Value::List(widgets))]))
}

/// What the observability unit declared
#[derive(Debug, Clone)]
pub struct ObservabilityUnit {
    pub topic: ResourceHandle,
    pub subscription: Option<ResourceHandle>,
    pub alarms: Vec<ResourceHandle>,
    pub dashboard: ResourceHandle,
}

pub fn observability_stack(
    config: &AppConfig,
    workload: &WorkloadUnit,
) -> Result<(Stack, ObservabilityUnit), SynthError> {
    let env = &config.env_name;
    let mut stack = Stack::new(stack_name(env), config.environment())
        .with_description("Tenant management monitoring: alarms and dashboard");

    let topic = stack.add(
        Resource::new(SNS_TOPIC, "AlarmTopic")
            .with_property("TopicName", format!("tenant-mgmt-alarms-{}", env))
            .with_property("DisplayName", "Tenant management alarms"),
    )?;

    let subscription = match &config.alarm_email {
        Some(email) => Some(
            stack.add(
                Resource::new(SNS_SUBSCRIPTION, "AlarmEmailSubscription")
                    .with_property("TopicArn", topic.reference())
                    .with_property("Protocol", "email")
                    .with_property("Endpoint", email),
            )?,
        ),
        None => None,
    };

    let mut alarms = Vec::new();
    for spec in alarm_specs(workload) {
        alarms.push(stack.add(alarm_resource(&spec, env, &topic))?);
    }

    let body = dashboard_body(workload, &stack.region());
    let dashboard = stack.add(
        Resource::new(CLOUDWATCH_DASHBOARD, "Dashboard")
            .with_property("DashboardName", format!("TenantManagement-{}", env))
            .with_property("DashboardBody", body),
    )?;

    stack.add_tag("Stack", "Monitoring");

    Ok((
        stack,
        ObservabilityUnit {
            topic,
            subscription,
            alarms,
            dashboard,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Context;
    use crate::network::network_stack;
    use crate::workload::workload_stack;

    fn build(pairs: &[(&str, &str)]) -> (Stack, ObservabilityUnit) {
        let mut context = Context::new();
        for (k, v) in pairs {
            context.set(*k, *v);
        }
        let config = AppConfig::resolve(&context, |_| None).unwrap();
        let (_, network) = network_stack(&config).unwrap();
        let (_, workload) = workload_stack(&config, &network).unwrap();
        observability_stack(&config, &workload).unwrap()
    }

    #[test]
    fn declares_alarms_dashboard_and_topic() {
        let (stack, unit) = build(&[]);
        assert_eq!(stack.name(), "TenantMgmtMonitoring-dev");
        assert_eq!(stack.count_of(CLOUDWATCH_ALARM), 4);
        assert_eq!(stack.count_of(CLOUDWATCH_DASHBOARD), 1);
        assert_eq!(stack.count_of(SNS_TOPIC), 1);
        assert_eq!(stack.count_of(SNS_SUBSCRIPTION), 0);
        assert!(unit.subscription.is_none());
    }

    #[test]
    fn email_adds_subscription() {
        let (stack, unit) = build(&[("alarmEmail", "ops@example.com")]);
        assert_eq!(stack.count_of(SNS_SUBSCRIPTION), 1);
        let sub = stack.resource("AlarmEmailSubscription").unwrap();
        assert_eq!(sub.property("Endpoint"), Some(&Value::str("ops@example.com")));
        assert_eq!(sub.property("TopicArn"), Some(&unit.topic.reference()));
    }

    #[test]
    fn every_alarm_notifies_the_topic() {
        let (stack, unit) = build(&[("env", "prod")]);
        for alarm in stack.resources_of_type(CLOUDWATCH_ALARM) {
            assert_eq!(
                alarm.property("AlarmActions"),
                Some(&Value::List(vec![unit.topic.reference()]))
            );
            assert_eq!(
                alarm.property("ComparisonOperator"),
                Some(&Value::str("GreaterThanOrEqualToThreshold"))
            );
            assert_eq!(alarm.property("Period"), Some(&Value::Int(300)));
            let Some(Value::String(name)) = alarm.property("AlarmName") else {
                panic!("expected alarm name");
            };
            assert!(name.ends_with("-prod"));
        }
    }

    #[test]
    fn alarm_thresholds() {
        let (stack, _) = build(&[]);
        let threshold = |id: &str| stack.resource(id).unwrap().property("Threshold").cloned();
        assert_eq!(threshold("HighCPUAlarm"), Some(Value::Int(80)));
        assert_eq!(threshold("HighMemoryAlarm"), Some(Value::Int(80)));
        assert_eq!(threshold("HighALBResponseTime"), Some(Value::Int(2)));
        assert_eq!(threshold("HTTP5xxAlarm"), Some(Value::Int(10)));
    }

    #[test]
    fn alarm_evaluation_windows() {
        let (stack, _) = build(&[]);
        for (id, periods, datapoints, statistic) in [
            ("HighCPUAlarm", 2, 1, "Average"),
            ("HighMemoryAlarm", 2, 1, "Average"),
            ("HighALBResponseTime", 2, 1, "Average"),
            ("HTTP5xxAlarm", 1, 1, "Sum"),
        ] {
            let alarm = stack.resource(id).unwrap();
            assert_eq!(alarm.property("EvaluationPeriods"), Some(&Value::Int(periods)), "{id}");
            assert_eq!(alarm.property("DatapointsToAlarm"), Some(&Value::Int(datapoints)), "{id}");
            assert_eq!(alarm.property("Statistic"), Some(&Value::str(statistic)), "{id}");
            assert_eq!(alarm.property("TreatMissingData"), None, "{id}");
        }
    }

    /// Join parts with every intrinsic replaced by a placeholder
    fn placeholder_text(body: &Value) -> String {
        let Value::Join(_, parts) = body else {
            panic!("expected Fn::Join");
        };
        parts
            .iter()
            .map(|part| match part {
                Value::String(s) => s.clone(),
                _ => "x".to_string(),
            })
            .collect()
    }

    #[test]
    fn dashboard_has_three_titled_widgets() {
        let (stack, _) = build(&[]);
        let body = stack
            .resource("Dashboard")
            .unwrap()
            .property("DashboardBody")
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&placeholder_text(body)).unwrap();
        let widgets = parsed["widgets"].as_array().unwrap();
        let titles: Vec<&str> = widgets
            .iter()
            .map(|w| w["properties"]["title"].as_str().unwrap())
            .collect();
        assert_eq!(
            titles,
            vec!["ECS CPU/Memory Utilization", "ALB Metrics", "HTTP Responses"]
        );
        assert_eq!(widgets[2]["properties"]["metrics"].as_array().unwrap().len(), 3);
        assert_eq!(widgets[0]["properties"]["region"], "x");
    }

    #[test]
    fn dashboard_body_references_workload() {
        let (stack, _) = build(&[]);
        let dashboard = stack.resource("Dashboard").unwrap();
        let body = dashboard.property("DashboardBody").unwrap();
        // Cluster, service and load balancer are only known at deploy time
        assert!(matches!(body, Value::Join(sep, _) if sep.is_empty()));
        let stacks: Vec<&str> = body.tokens().iter().map(|t| t.stack.as_str()).collect();
        assert!(!stacks.is_empty());
        assert!(stacks.iter().all(|s| *s == "TenantMgmtService-dev"));
        assert_eq!(
            dashboard.property("DashboardName"),
            Some(&Value::str("TenantManagement-dev"))
        );
    }
}
