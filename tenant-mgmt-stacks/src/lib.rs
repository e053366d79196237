//! Tenant Management Stacks
//!
//! The four infrastructure units of the tenant management service and the
//! composition that wires them into one application:
//!
//! - Network: isolated VPC, subnets and private service endpoints
//! - Identity: task execution and task roles (declared in the service stack)
//! - Workload: Fargate service behind an internal load balancer
//! - Observability: alarms, alarm topic and dashboard

pub mod config;
pub mod identity;
pub mod network;
pub mod observability;
pub mod workload;

use tenant_mgmt_aws::AwsProvider;
use tenant_mgmt_core::app::{App, SynthError};
use tenant_mgmt_core::assembly::CloudAssembly;

use crate::config::AppConfig;

/// Build every unit and add the stacks in deployment order
pub fn build_app(config: &AppConfig) -> Result<App, SynthError> {
    let (network, net) = network::network_stack(config)?;
    let (service, svc) = workload::workload_stack(config, &net)?;
    let (monitoring, _) = observability::observability_stack(config, &svc)?;

    let mut app = App::new();
    app.add_stack(network)?;
    app.add_stack(service)?;
    app.add_stack(monitoring)?;
    Ok(app)
}

/// Build and synthesize against the AWS resource catalog
pub fn synthesize(config: &AppConfig) -> Result<CloudAssembly, SynthError> {
    let app = build_app(config)?;
    app.synth(&AwsProvider::new())
}
