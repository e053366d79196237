//! Tenant Management AWS Provider
//!
//! Catalog of AWS CloudFormation resource types used by the tenant-mgmt stacks.
//!
//! ## Module Structure
//!
//! - `resources` - Resource type names and definitions
//! - `provider` - AwsProvider implementation
//! - `schemas` - Property schemas per service
//! - `fargate` - Fargate CPU/memory combinations
//! - `utils` - Region, ARN and endpoint helpers

pub mod fargate;
pub mod provider;
pub mod resources;
pub mod schemas;
pub mod utils;

// Re-export main types
pub use fargate::{TaskSizeError, validate_task_size};
pub use provider::AwsProvider;
pub use utils::{arn, endpoint_service_name, managed_policy_arn, normalize_region};
