//! EC2 networking schemas: VPC, subnets, routing, endpoints, security groups
//!
//! Property names follow the CloudFormation AWS::EC2::* resource reference.

use super::{AwsSchemaConfig, int_range_type, port_type, string_list, tags_type};
use crate::resources::*;
use tenant_mgmt_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

const VALID_INSTANCE_TENANCY: &[&str] = &["default", "dedicated", "host"];

const VALID_VPC_ENDPOINT_TYPE: &[&str] = &["Interface", "Gateway", "GatewayLoadBalancer"];

fn ip_protocol_type() -> AttributeType {
    AttributeType::enumeration(&["tcp", "udp", "icmp", "-1"])
}

/// Port range bound; -1 stands for "all" with protocol -1
fn rule_port_type() -> AttributeType {
    int_range_type!("RulePort", -1, 65535)
}

fn ingress_rule_type() -> AttributeType {
    AttributeType::Struct(vec![
        AttributeSchema::new("IpProtocol", ip_protocol_type()).required(),
        AttributeSchema::new("FromPort", rule_port_type()),
        AttributeSchema::new("ToPort", rule_port_type()),
        AttributeSchema::new("CidrIp", types::cidr()),
        AttributeSchema::new("SourceSecurityGroupId", AttributeType::String),
        AttributeSchema::new("Description", AttributeType::String),
    ])
}

fn egress_rule_type() -> AttributeType {
    AttributeType::Struct(vec![
        AttributeSchema::new("IpProtocol", ip_protocol_type()).required(),
        AttributeSchema::new("FromPort", rule_port_type()),
        AttributeSchema::new("ToPort", rule_port_type()),
        AttributeSchema::new("CidrIp", types::cidr()),
        AttributeSchema::new("DestinationSecurityGroupId", AttributeType::String),
        AttributeSchema::new("Description", AttributeType::String),
    ])
}

pub fn vpc_config() -> AwsSchemaConfig {
    AwsSchemaConfig {
        aws_type_name: EC2_VPC,
        has_tags: true,
        schema: ResourceSchema::new(EC2_VPC)
            .with_description("A virtual private cloud")
            .attribute(AttributeSchema::new("CidrBlock", types::cidr()).required())
            .attribute(AttributeSchema::new("EnableDnsHostnames", AttributeType::Bool))
            .attribute(AttributeSchema::new("EnableDnsSupport", AttributeType::Bool))
            .attribute(AttributeSchema::new(
                "InstanceTenancy",
                AttributeType::enumeration(VALID_INSTANCE_TENANCY),
            ))
            .attribute(AttributeSchema::new("Tags", tags_type())),
    }
}

pub fn subnet_config() -> AwsSchemaConfig {
    AwsSchemaConfig {
        aws_type_name: EC2_SUBNET,
        has_tags: true,
        schema: ResourceSchema::new(EC2_SUBNET)
            .attribute(AttributeSchema::new("VpcId", AttributeType::String).required())
            .attribute(AttributeSchema::new("CidrBlock", types::cidr()))
            .attribute(AttributeSchema::new("AvailabilityZone", AttributeType::String))
            .attribute(AttributeSchema::new("MapPublicIpOnLaunch", AttributeType::Bool))
            .attribute(AttributeSchema::new("Tags", tags_type())),
    }
}

pub fn route_table_config() -> AwsSchemaConfig {
    AwsSchemaConfig {
        aws_type_name: EC2_ROUTE_TABLE,
        has_tags: true,
        schema: ResourceSchema::new(EC2_ROUTE_TABLE)
            .attribute(AttributeSchema::new("VpcId", AttributeType::String).required())
            .attribute(AttributeSchema::new("Tags", tags_type())),
    }
}

pub fn subnet_route_table_association_config() -> AwsSchemaConfig {
    AwsSchemaConfig {
        aws_type_name: EC2_SUBNET_ROUTE_TABLE_ASSOCIATION,
        has_tags: false,
        schema: ResourceSchema::new(EC2_SUBNET_ROUTE_TABLE_ASSOCIATION)
            .attribute(AttributeSchema::new("RouteTableId", AttributeType::String).required())
            .attribute(AttributeSchema::new("SubnetId", AttributeType::String).required()),
    }
}

pub fn vpc_endpoint_config() -> AwsSchemaConfig {
    AwsSchemaConfig {
        aws_type_name: EC2_VPC_ENDPOINT,
        has_tags: true,
        schema: ResourceSchema::new(EC2_VPC_ENDPOINT)
            .with_description("A private connection between a VPC and an AWS service")
            .attribute(AttributeSchema::new("ServiceName", AttributeType::String).required())
            .attribute(AttributeSchema::new("VpcId", AttributeType::String).required())
            .attribute(AttributeSchema::new(
                "VpcEndpointType",
                AttributeType::enumeration(VALID_VPC_ENDPOINT_TYPE),
            ))
            .attribute(AttributeSchema::new("PrivateDnsEnabled", AttributeType::Bool))
            .attribute(AttributeSchema::new("RouteTableIds", string_list()))
            .attribute(AttributeSchema::new("SubnetIds", string_list()))
            .attribute(AttributeSchema::new("SecurityGroupIds", string_list()))
            .attribute(AttributeSchema::new("PolicyDocument", AttributeType::Any))
            .attribute(AttributeSchema::new("Tags", tags_type())),
    }
}

pub fn security_group_config() -> AwsSchemaConfig {
    AwsSchemaConfig {
        aws_type_name: EC2_SECURITY_GROUP,
        has_tags: true,
        schema: ResourceSchema::new(EC2_SECURITY_GROUP)
            .attribute(AttributeSchema::new("GroupDescription", AttributeType::String).required())
            .attribute(AttributeSchema::new("GroupName", AttributeType::String))
            .attribute(AttributeSchema::new("VpcId", AttributeType::String))
            .attribute(AttributeSchema::new(
                "SecurityGroupIngress",
                AttributeType::list(ingress_rule_type()),
            ))
            .attribute(AttributeSchema::new(
                "SecurityGroupEgress",
                AttributeType::list(egress_rule_type()),
            ))
            .attribute(AttributeSchema::new("Tags", tags_type())),
    }
}

pub fn security_group_ingress_config() -> AwsSchemaConfig {
    AwsSchemaConfig {
        aws_type_name: EC2_SECURITY_GROUP_INGRESS,
        has_tags: false,
        schema: ResourceSchema::new(EC2_SECURITY_GROUP_INGRESS)
            .attribute(AttributeSchema::new("GroupId", AttributeType::String).required())
            .attribute(AttributeSchema::new("IpProtocol", ip_protocol_type()).required())
            .attribute(AttributeSchema::new("FromPort", port_type()))
            .attribute(AttributeSchema::new("ToPort", port_type()))
            .attribute(AttributeSchema::new("CidrIp", types::cidr()))
            .attribute(AttributeSchema::new("SourceSecurityGroupId", AttributeType::String))
            .attribute(AttributeSchema::new("Description", AttributeType::String)),
    }
}

pub fn configs() -> Vec<AwsSchemaConfig> {
    vec![
        vpc_config(),
        subnet_config(),
        route_table_config(),
        subnet_route_table_association_config(),
        vpc_endpoint_config(),
        security_group_config(),
        security_group_ingress_config(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tenant_mgmt_core::resource::Value;

    #[test]
    fn vpc_requires_valid_cidr() {
        let schema = vpc_config().schema;
        let mut props = BTreeMap::new();
        props.insert("CidrBlock".to_string(), Value::str("10.0.0.0/16"));
        props.insert("EnableDnsSupport".to_string(), Value::Bool(true));
        assert!(schema.validate(&props).is_ok());

        props.insert("CidrBlock".to_string(), Value::str("10.0.0.1/16"));
        assert!(schema.validate(&props).is_err());

        assert!(schema.validate(&BTreeMap::new()).is_err());
    }

    #[test]
    fn endpoint_type_is_an_enum() {
        let schema = vpc_endpoint_config().schema;
        let mut props = BTreeMap::new();
        props.insert("ServiceName".to_string(), Value::str("com.amazonaws.us-east-1.s3"));
        props.insert("VpcId".to_string(), Value::Ref("Vpc".to_string()));
        props.insert("VpcEndpointType".to_string(), Value::str("Gateway"));
        assert!(schema.validate(&props).is_ok());

        props.insert("VpcEndpointType".to_string(), Value::str("Tunnel"));
        assert!(schema.validate(&props).is_err());
    }

    #[test]
    fn security_group_rules_are_checked() {
        let schema = security_group_config().schema;
        let mut props = BTreeMap::new();
        props.insert("GroupDescription".to_string(), Value::str("endpoints"));
        props.insert(
            "SecurityGroupIngress".to_string(),
            Value::List(vec![Value::map([
                ("IpProtocol", Value::str("tcp")),
                ("FromPort", Value::Int(443)),
                ("ToPort", Value::Int(443)),
                ("CidrIp", Value::GetAtt("Vpc".to_string(), "CidrBlock".to_string())),
            ])]),
        );
        props.insert(
            "SecurityGroupEgress".to_string(),
            Value::List(vec![Value::map([
                ("IpProtocol", Value::str("-1")),
                ("CidrIp", Value::str("0.0.0.0/0")),
            ])]),
        );
        assert!(schema.validate(&props).is_ok());

        props.insert(
            "SecurityGroupIngress".to_string(),
            Value::List(vec![Value::map([("IpProtocol", "gre")])]),
        );
        assert!(schema.validate(&props).is_err());
    }
}
