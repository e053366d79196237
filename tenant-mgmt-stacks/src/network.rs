//! Network - Isolated VPC with private access to AWS services
//!
//! No internet or NAT gateway is created. Workloads reach AWS APIs through an
//! S3 gateway endpoint and interface endpoints placed in the first isolated
//! subnet group.

use tenant_mgmt_aws::endpoint_service_name;
use tenant_mgmt_aws::resources::*;
use tenant_mgmt_core::app::SynthError;
use tenant_mgmt_core::cidr::SubnetAllocator;
use tenant_mgmt_core::resource::{Resource, ResourceHandle, Value};
use tenant_mgmt_core::stack::{Output, Stack};

use crate::config::AppConfig;

pub const MAX_AZS: usize = 2;

/// A named group of isolated subnets, one per availability zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubnetGroup {
    pub name: &'static str,
    pub prefix: u8,
}

pub const SUBNET_GROUPS: &[SubnetGroup] = &[
    SubnetGroup {
        name: "Isolated-1",
        prefix: 24,
    },
    SubnetGroup {
        name: "Isolated-2",
        prefix: 28,
    },
];

/// (logical id prefix, endpoint service suffix)
pub const INTERFACE_ENDPOINTS: &[(&str, &str)] = &[
    ("SecretsManager", "secretsmanager"),
    ("Ssm", "ssm"),
    ("Ecr", "ecr.api"),
    ("EcrDocker", "ecr.dkr"),
    ("CloudWatchLogs", "logs"),
];

pub fn stack_name(env_name: &str) -> String {
    format!("TenantMgmtNetwork-{}", env_name)
}

/// What downstream units need from the network
#[derive(Debug, Clone)]
pub struct NetworkUnit {
    pub vpc: ResourceHandle,
    /// Subnets of each group, in `SUBNET_GROUPS` order
    pub subnet_groups: Vec<(String, Vec<ResourceHandle>)>,
    pub route_tables: Vec<ResourceHandle>,
    pub endpoints: Vec<ResourceHandle>,
}

impl NetworkUnit {
    pub fn vpc_id(&self) -> Value {
        self.vpc.reference()
    }

    pub fn vpc_cidr(&self) -> Value {
        self.vpc.attribute("CidrBlock")
    }

    pub fn subnets(&self, group: &str) -> &[ResourceHandle] {
        self.subnet_groups
            .iter()
            .find(|(name, _)| name == group)
            .map_or(&[], |(_, subnets)| subnets.as_slice())
    }

    /// Subnet ids workloads are placed in
    pub fn workload_subnet_ids(&self) -> Value {
        Value::List(
            self.subnets(SUBNET_GROUPS[0].name)
                .iter()
                .map(ResourceHandle::reference)
                .collect(),
        )
    }
}

fn logical_name(group: &str) -> String {
    group.replace('-', "")
}

pub fn network_stack(config: &AppConfig) -> Result<(Stack, NetworkUnit), SynthError> {
    let name = stack_name(&config.env_name);
    let mut stack = Stack::new(name, config.environment())
        .with_description("Tenant management network: isolated VPC and service endpoints");

    let vpc = stack.add(
        Resource::new(EC2_VPC, "Vpc")
            .with_property("CidrBlock", config.vpc_cidr.to_string())
            .with_property("EnableDnsHostnames", true)
            .with_property("EnableDnsSupport", true)
            .with_property("InstanceTenancy", "default"),
    )?;

    let mut allocator = SubnetAllocator::new(config.vpc_cidr);
    let mut subnet_groups = Vec::new();
    let mut route_tables = Vec::new();
    let mut vpc_scope = vec![vpc.clone()];

    for group in SUBNET_GROUPS {
        let mut subnets = Vec::new();
        for az in 0..MAX_AZS {
            let cidr = allocator.allocate(group.prefix)?;
            let id = format!("Vpc{}Subnet{}", logical_name(group.name), az + 1);
            log::debug!("{} {} -> {}", group.name, az + 1, cidr);

            let subnet = stack.add(
                Resource::new(EC2_SUBNET, id.clone())
                    .with_property("VpcId", vpc.reference())
                    .with_property("CidrBlock", cidr.to_string())
                    .with_property("AvailabilityZone", Value::select(az, Value::GetAzs))
                    .with_property("MapPublicIpOnLaunch", false)
                    .with_tag("SubnetGroup", group.name)
                    .with_tag("SubnetType", "Isolated"),
            )?;

            let route_table = stack.add(
                Resource::new(EC2_ROUTE_TABLE, format!("{}RouteTable", id))
                    .with_property("VpcId", vpc.reference()),
            )?;

            stack.add(
                Resource::new(
                    EC2_SUBNET_ROUTE_TABLE_ASSOCIATION,
                    format!("{}RouteTableAssociation", id),
                )
                .with_property("RouteTableId", route_table.reference())
                .with_property("SubnetId", subnet.reference()),
            )?;

            vpc_scope.push(subnet.clone());
            vpc_scope.push(route_table.clone());
            subnets.push(subnet);
            route_tables.push(route_table);
        }
        subnet_groups.push((group.name.to_string(), subnets));
    }

    let mut endpoints = Vec::new();

    let s3 = stack.add(
        Resource::new(EC2_VPC_ENDPOINT, "VpcS3Endpoint")
            .with_property("ServiceName", endpoint_service_name(stack.env(), "s3"))
            .with_property("VpcEndpointType", "Gateway")
            .with_property("VpcId", vpc.reference())
            .with_property(
                "RouteTableIds",
                Value::List(route_tables.iter().map(ResourceHandle::reference).collect()),
            ),
    )?;
    vpc_scope.push(s3.clone());
    endpoints.push(s3);

    let endpoint_subnets = Value::List(
        subnet_groups[0]
            .1
            .iter()
            .map(ResourceHandle::reference)
            .collect(),
    );

    for (prefix, service) in INTERFACE_ENDPOINTS {
        let id = format!("Vpc{}Endpoint", prefix);

        let security_group = stack.add(
            Resource::new(EC2_SECURITY_GROUP, format!("{}SecurityGroup", id))
                .with_property(
                    "GroupDescription",
                    format!("{}/Vpc/{}Endpoint/SecurityGroup", stack.name(), prefix),
                )
                .with_property("VpcId", vpc.reference())
                .with_property(
                    "SecurityGroupIngress",
                    Value::List(vec![Value::map([
                        ("IpProtocol", Value::str("tcp")),
                        ("FromPort", Value::Int(443)),
                        ("ToPort", Value::Int(443)),
                        ("CidrIp", vpc.attribute("CidrBlock")),
                        (
                            "Description",
                            Value::str("HTTPS from within the VPC"),
                        ),
                    ])]),
                )
                .with_property("SecurityGroupEgress", allow_all_egress()),
        )?;

        let endpoint = stack.add(
            Resource::new(EC2_VPC_ENDPOINT, id)
                .with_property("ServiceName", endpoint_service_name(stack.env(), service))
                .with_property("VpcEndpointType", "Interface")
                .with_property("VpcId", vpc.reference())
                .with_property("PrivateDnsEnabled", true)
                .with_property("SubnetIds", endpoint_subnets.clone())
                .with_property(
                    "SecurityGroupIds",
                    Value::List(vec![security_group.attribute("GroupId")]),
                ),
        )?;

        vpc_scope.push(security_group);
        vpc_scope.push(endpoint.clone());
        endpoints.push(endpoint);
    }

    stack.add_tag("Stack", "Network");
    stack.tag_resources(
        &vpc_scope,
        "Name",
        format!("tenant-mgmt-vpc-{}", config.env_name),
    );

    stack.add_output(Output::new("VpcId", vpc.reference()))?;

    Ok((
        stack,
        NetworkUnit {
            vpc,
            subnet_groups,
            route_tables,
            endpoints,
        },
    ))
}

/// Egress rule allowing all outbound traffic
pub(crate) fn allow_all_egress() -> Value {
    Value::List(vec![Value::map([
        ("IpProtocol", "-1"),
        ("CidrIp", "0.0.0.0/0"),
        ("Description", "Allow all outbound traffic by default"),
    ])])
}
