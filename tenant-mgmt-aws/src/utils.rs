//! Utility functions for regions, ARNs and endpoint service names

use std::sync::LazyLock;

use regex::Regex;
use tenant_mgmt_core::resource::{PseudoParameter, Value};
use tenant_mgmt_core::stack::Environment;

/// Valid AWS regions (in AWS format with hyphens)
pub const VALID_REGIONS: &[&str] = &[
    "af-south-1",
    "ap-east-1",
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-northeast-3",
    "ap-south-1",
    "ap-south-2",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-southeast-3",
    "ap-southeast-4",
    "ca-central-1",
    "ca-west-1",
    "eu-central-1",
    "eu-central-2",
    "eu-north-1",
    "eu-south-1",
    "eu-south-2",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    "il-central-1",
    "me-central-1",
    "me-south-1",
    "sa-east-1",
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
];

static REGION_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-z]{2}(-gov|-iso[a-z]?)?-[a-z]+-\d$").ok());

static ACCOUNT_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\d{12}$").ok());

fn matches(pattern: &LazyLock<Option<Regex>>, s: &str) -> bool {
    pattern.as_ref().is_some_and(|re| re.is_match(s))
}

/// Normalize region value (e.g., "ap_northeast_1" -> "ap-northeast-1")
pub fn normalize_region(s: &str) -> String {
    s.trim().to_ascii_lowercase().replace('_', "-")
}

/// Whether the region is one this tool has been exercised against
pub fn is_known_region(region: &str) -> bool {
    VALID_REGIONS.contains(&region)
}

/// Whether the string has the shape of a region name at all
pub fn is_region_like(region: &str) -> bool {
    matches(&REGION_PATTERN, region)
}

pub fn is_account_id(account: &str) -> bool {
    matches(&ACCOUNT_PATTERN, account)
}

/// Service name of a VPC endpoint (e.g., "com.amazonaws.us-east-1.secretsmanager").
///
/// Literal when the region is known, `Fn::Join` over `AWS::Region` otherwise.
pub fn endpoint_service_name(env: &Environment, service: &str) -> Value {
    Value::join(
        "",
        vec![
            Value::str("com.amazonaws."),
            env.region_value(),
            Value::str(format!(".{}", service)),
        ],
    )
}

/// ARN in the stack's partition, region and account
///
/// `regional = false` leaves the region field empty (IAM, S3).
pub fn arn(env: &Environment, service: &str, resource: &str, regional: bool) -> Value {
    let region = if regional {
        env.region_value()
    } else {
        Value::str("")
    };
    Value::join(
        "",
        vec![
            Value::str("arn:"),
            Value::Pseudo(PseudoParameter::Partition),
            Value::str(format!(":{}:", service)),
            region,
            Value::str(":"),
            env.account_value(),
            Value::str(format!(":{}", resource)),
        ],
    )
}

/// ARN of an AWS managed IAM policy (e.g., "service-role/AmazonECSTaskExecutionRolePolicy")
pub fn managed_policy_arn(name: &str) -> Value {
    Value::join(
        "",
        vec![
            Value::str("arn:"),
            Value::Pseudo(PseudoParameter::Partition),
            Value::str(format!(":iam::aws:policy/{}", name)),
        ],
    )
}
