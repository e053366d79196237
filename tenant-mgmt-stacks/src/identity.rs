//! Identity - IAM roles for the Fargate tasks
//!
//! Two roles, both assumable only by ECS tasks: the execution role (image
//! pulls, log delivery) carries just the AWS managed execution policy; the
//! task role gets a least-privilege inline policy whose statements are all
//! pinned to the stack's region.

use std::collections::BTreeMap;

use tenant_mgmt_aws::resources::{IAM_POLICY, IAM_ROLE};
use tenant_mgmt_aws::{arn, managed_policy_arn};
use tenant_mgmt_core::resource::{Resource, ResourceHandle, Value};
use tenant_mgmt_core::stack::{Environment, Stack, StackError};

pub const POLICY_VERSION: &str = "2012-10-17";
pub const ECS_TASKS_PRINCIPAL: &str = "ecs-tasks.amazonaws.com";
pub const EXECUTION_ROLE_POLICY: &str = "service-role/AmazonECSTaskExecutionRolePolicy";

/// One IAM `Allow` statement
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyStatement {
    pub actions: Vec<String>,
    pub resources: Vec<Value>,
    /// Service principal, for trust policies
    pub principal: Option<String>,
    /// operator -> condition key -> value
    pub conditions: BTreeMap<String, BTreeMap<String, Value>>,
}

impl PolicyStatement {
    pub fn allow() -> Self {
        Self {
            actions: Vec::new(),
            resources: Vec::new(),
            principal: None,
            conditions: BTreeMap::new(),
        }
    }

    pub fn with_actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actions.extend(actions.into_iter().map(Into::into));
        self
    }

    pub fn with_resource(mut self, resource: impl Into<Value>) -> Self {
        self.resources.push(resource.into());
        self
    }

    pub fn with_service_principal(mut self, service: impl Into<String>) -> Self {
        self.principal = Some(service.into());
        self
    }

    pub fn with_condition(
        mut self,
        operator: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.conditions
            .entry(operator.into())
            .or_default()
            .insert(key.into(), value.into());
        self
    }

    /// Restrict the statement to requests made in the environment's region
    pub fn region_scoped(self, env: &Environment) -> Self {
        self.with_condition("StringEquals", "aws:RequestedRegion", env.region_value())
    }

    pub fn is_region_scoped(&self) -> bool {
        self.conditions
            .get("StringEquals")
            .is_some_and(|c| c.contains_key("aws:RequestedRegion"))
    }

    pub fn to_value(&self) -> Value {
        let mut statement = BTreeMap::new();
        statement.insert("Effect".to_string(), Value::str("Allow"));
        statement.insert("Action".to_string(), Value::list(self.actions.iter()));
        if !self.resources.is_empty() {
            statement.insert("Resource".to_string(), Value::List(self.resources.clone()));
        }
        if let Some(service) = &self.principal {
            statement.insert(
                "Principal".to_string(),
                Value::map([("Service", service.as_str())]),
            );
        }
        if !self.conditions.is_empty() {
            let conditions = self
                .conditions
                .iter()
                .map(|(op, entries)| (op.clone(), Value::Map(entries.clone())))
                .collect();
            statement.insert("Condition".to_string(), Value::Map(conditions));
        }
        Value::Map(statement)
    }
}

/// Policy document: `{"Version": "2012-10-17", "Statement": [...]}`
pub fn policy_document(statements: &[PolicyStatement]) -> Value {
    Value::map([
        ("Version", Value::str(POLICY_VERSION)),
        (
            "Statement",
            Value::List(statements.iter().map(PolicyStatement::to_value).collect()),
        ),
    ])
}

fn ecs_trust_policy() -> Value {
    policy_document(&[PolicyStatement::allow()
        .with_actions(["sts:AssumeRole"])
        .with_service_principal(ECS_TASKS_PRINCIPAL)])
}

/// Statements of the task role's inline policy
pub fn task_role_statements(env: &Environment) -> Vec<PolicyStatement> {
    let secrets = PolicyStatement::allow()
        .with_actions([
            "secretsmanager:CreateSecret",
            "secretsmanager:GetSecretValue",
            "secretsmanager:PutSecretValue",
            "secretsmanager:UpdateSecret",
            "secretsmanager:DescribeSecret",
            "secretsmanager:TagResource",
        ])
        .with_resource(arn(env, "secretsmanager", "secret:tenant-*", true))
        .with_resource(arn(env, "secretsmanager", "secret:app-*", true))
        .region_scoped(env);

    let parameters = PolicyStatement::allow()
        .with_actions([
            "ssm:PutParameter",
            "ssm:GetParameter",
            "ssm:GetParameters",
            "ssm:GetParametersByPath",
            "ssm:DescribeParameters",
            "ssm:AddTagsToResource",
        ])
        .with_resource(arn(env, "ssm", "parameter/tenant/*", true))
        .with_resource(arn(env, "ssm", "parameter/app/*", true))
        .region_scoped(env);

    let logs = PolicyStatement::allow()
        .with_actions([
            "logs:CreateLogStream",
            "logs:PutLogEvents",
            "logs:CreateLogGroup",
        ])
        .with_resource(arn(env, "logs", "log-group:/aws/ecs/tenant-mgmt-*", true))
        .region_scoped(env);

    vec![secrets, parameters, logs]
}

/// Handles of the identity resources
#[derive(Debug, Clone)]
pub struct Identities {
    pub execution_role: ResourceHandle,
    pub task_role: ResourceHandle,
    pub task_role_policy: ResourceHandle,
}

/// Declare both task roles and the task role's inline policy in `stack`
pub fn add_task_identities(stack: &mut Stack) -> Result<Identities, StackError> {
    let execution_role = stack.add(
        Resource::new(IAM_ROLE, "ExecutionRole")
            .with_property("AssumeRolePolicyDocument", ecs_trust_policy())
            .with_property("Description", "Execution role for tenant management service")
            .with_property(
                "ManagedPolicyArns",
                Value::List(vec![managed_policy_arn(EXECUTION_ROLE_POLICY)]),
            ),
    )?;

    let task_role = stack.add(
        Resource::new(IAM_ROLE, "TaskRole")
            .with_property("AssumeRolePolicyDocument", ecs_trust_policy())
            .with_property("Description", "Task role for tenant management service"),
    )?;

    let statements = task_role_statements(stack.env());
    let task_role_policy = stack.add(
        Resource::new(IAM_POLICY, "TaskRoleDefaultPolicy")
            .with_property("PolicyDocument", policy_document(&statements))
            .with_property("PolicyName", "TaskRoleDefaultPolicy")
            .with_property("Roles", Value::List(vec![task_role.reference()])),
    )?;

    Ok(Identities {
        execution_role,
        task_role,
        task_role_policy,
    })
}
