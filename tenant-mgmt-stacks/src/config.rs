//! Configuration - Context values resolved once at the entry point
//!
//! Context comes from an optional JSON file (`{"context": {...}}`) overlaid
//! with `key=value` assignments. `AppConfig::resolve` applies defaults,
//! validates everything and reads the target account/region from the process
//! environment. Units only ever see the resolved `AppConfig`.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use tenant_mgmt_aws::utils::{is_account_id, is_known_region, is_region_like, normalize_region};
use tenant_mgmt_aws::{TaskSizeError, validate_task_size};
use tenant_mgmt_core::cidr::{CidrError, Ipv4Cidr};
use tenant_mgmt_core::stack::Environment;

/// Default context file, looked up in the working directory
pub const DEFAULT_CONTEXT_FILE: &str = "tenant-mgmt.json";

pub const DEFAULT_ENV: &str = "dev";
pub const DEFAULT_VPC_CIDR: &str = "10.0.0.0/16";
pub const DEFAULT_DESIRED_COUNT: u32 = 2;
pub const DEFAULT_CPU: u32 = 256;
pub const DEFAULT_MEMORY: u32 = 512;
pub const DEFAULT_CONTAINER_IMAGE: &str = "public.ecr.aws/docker/library/nginx:stable";

/// Upper bound of the service's scaling range
pub const MAX_CAPACITY: u32 = 6;

pub const ACCOUNT_ENV_VAR: &str = "CDK_DEFAULT_ACCOUNT";
pub const REGION_ENV_VAR: &str = "CDK_DEFAULT_REGION";

const KNOWN_KEYS: &[&str] = &[
    "env",
    "vpcCidr",
    "desiredCount",
    "cpu",
    "memory",
    "alarmEmail",
    "containerImage",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read context file {path}: {message}")]
    Io { path: String, message: String },

    #[error("Failed to parse context file {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Invalid context assignment '{0}', expected key=value")]
    InvalidAssignment(String),

    #[error("Invalid environment name '{0}': use letters, digits and '-'")]
    InvalidEnvName(String),

    #[error("Invalid VPC CIDR: {0}")]
    InvalidCidr(#[from] CidrError),

    #[error("Context value '{key}' must be a non-negative integer, got '{value}'")]
    InvalidNumber { key: String, value: String },

    #[error("desiredCount {0} is out of range 1-{max}", max = MAX_CAPACITY)]
    DesiredCountOutOfRange(u32),

    #[error(transparent)]
    TaskSize(#[from] TaskSizeError),

    #[error("Invalid alarm email '{0}'")]
    InvalidEmail(String),

    #[error("Invalid account id '{0}': expected 12 digits")]
    InvalidAccount(String),

    #[error("Container image must not be empty")]
    EmptyImage,
}

#[derive(Debug, Deserialize)]
struct ContextFile {
    #[serde(default)]
    context: BTreeMap<String, serde_json::Value>,
}

/// Raw context key/value pairs, later sources overriding earlier ones
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    values: BTreeMap<String, String>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a context document; non-string JSON values keep their JSON text
    pub fn from_json(source: &str, content: &str) -> Result<Self, ConfigError> {
        let file: ContextFile =
            serde_json::from_str(content).map_err(|e| ConfigError::Parse {
                path: source.to_string(),
                message: e.to_string(),
            })?;

        let values = file
            .context
            .into_iter()
            .map(|(k, v)| {
                let v = match v {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (k, v)
            })
            .collect();
        Ok(Self { values })
    }

    /// Load a context file; `None` if it does not exist
    pub fn from_file(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json(&path.display().to_string(), &content).map(Some)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Apply a `key=value` assignment
    pub fn assign(&mut self, assignment: &str) -> Result<(), ConfigError> {
        let (key, value) = assignment
            .split_once('=')
            .filter(|(k, _)| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::InvalidAssignment(assignment.to_string()))?;
        self.set(key.trim(), value.trim());
        Ok(())
    }

    /// Overlay `other` on top of this context
    pub fn merge(&mut self, other: Context) {
        self.values.extend(other.values);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    fn get_u32(&self, key: &str, default: u32) -> Result<u32, ConfigError> {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidNumber {
                key: key.to_string(),
                value: raw.to_string(),
            }),
        }
    }
}

/// Fully resolved and validated configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub env_name: String,
    pub vpc_cidr: Ipv4Cidr,
    pub desired_count: u32,
    pub cpu: u32,
    pub memory: u32,
    pub alarm_email: Option<String>,
    pub container_image: String,
    pub account: Option<String>,
    pub region: Option<String>,
}

impl AppConfig {
    /// Resolve a context against the process environment (`std::env::var`)
    pub fn from_context(context: &Context) -> Result<Self, ConfigError> {
        Self::resolve(context, |key| std::env::var(key).ok())
    }

    /// Resolve a context, reading environment variables through `lookup`
    pub fn resolve(
        context: &Context,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        for key in context.values.keys() {
            if !KNOWN_KEYS.contains(&key.as_str()) {
                log::warn!("ignoring unknown context key '{}'", key);
            }
        }

        let env_name = context.get("env").unwrap_or(DEFAULT_ENV).to_string();
        if !is_valid_env_name(&env_name) {
            return Err(ConfigError::InvalidEnvName(env_name));
        }

        let vpc_cidr: Ipv4Cidr = context
            .get("vpcCidr")
            .unwrap_or(DEFAULT_VPC_CIDR)
            .parse()?;

        let desired_count = context.get_u32("desiredCount", DEFAULT_DESIRED_COUNT)?;
        if !(1..=MAX_CAPACITY).contains(&desired_count) {
            return Err(ConfigError::DesiredCountOutOfRange(desired_count));
        }

        let cpu = context.get_u32("cpu", DEFAULT_CPU)?;
        let memory = context.get_u32("memory", DEFAULT_MEMORY)?;
        validate_task_size(cpu, memory)?;

        let alarm_email = match context.get("alarmEmail") {
            None | Some("") => None,
            Some(email) if is_valid_email(email) => Some(email.to_string()),
            Some(email) => return Err(ConfigError::InvalidEmail(email.to_string())),
        };

        let container_image = context
            .get("containerImage")
            .unwrap_or(DEFAULT_CONTAINER_IMAGE)
            .to_string();
        if container_image.trim().is_empty() {
            return Err(ConfigError::EmptyImage);
        }

        let account = lookup(ACCOUNT_ENV_VAR).filter(|a| !a.is_empty());
        if let Some(account) = &account
            && !is_account_id(account)
        {
            return Err(ConfigError::InvalidAccount(account.clone()));
        }

        let region = lookup(REGION_ENV_VAR)
            .filter(|r| !r.is_empty())
            .map(|r| normalize_region(&r));
        if let Some(region) = &region {
            if !is_region_like(region) {
                log::warn!("'{}' does not look like an AWS region", region);
            } else if !is_known_region(region) {
                log::warn!("region '{}' is not in the list of known regions", region);
            }
        }

        Ok(Self {
            env_name,
            vpc_cidr,
            desired_count,
            cpu,
            memory,
            alarm_email,
            container_image,
            account,
            region,
        })
    }

    /// Target environment shared by every stack
    pub fn environment(&self) -> Environment {
        Environment::new(self.account.clone(), self.region.clone())
    }
}

static ENV_NAME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9-]+$").ok());

static EMAIL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());

fn is_valid_env_name(name: &str) -> bool {
    ENV_NAME.as_ref().is_some_and(|re| re.is_match(name))
}

fn is_valid_email(email: &str) -> bool {
    EMAIL.as_ref().is_some_and(|re| re.is_match(email))
}
