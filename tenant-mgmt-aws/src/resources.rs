//! Resource type definitions for the AWS provider
//!
//! This module defines:
//! - CloudFormation type names used by the stacks
//! - Resource type definitions (implementing ResourceType trait)

use tenant_mgmt_core::provider::ResourceType;

// =============================================================================
// CloudFormation Type Names
// =============================================================================

pub const EC2_VPC: &str = "AWS::EC2::VPC";
pub const EC2_SUBNET: &str = "AWS::EC2::Subnet";
pub const EC2_ROUTE_TABLE: &str = "AWS::EC2::RouteTable";
pub const EC2_SUBNET_ROUTE_TABLE_ASSOCIATION: &str = "AWS::EC2::SubnetRouteTableAssociation";
pub const EC2_VPC_ENDPOINT: &str = "AWS::EC2::VPCEndpoint";
pub const EC2_SECURITY_GROUP: &str = "AWS::EC2::SecurityGroup";
pub const EC2_SECURITY_GROUP_INGRESS: &str = "AWS::EC2::SecurityGroupIngress";

pub const ECS_CLUSTER: &str = "AWS::ECS::Cluster";
pub const ECS_TASK_DEFINITION: &str = "AWS::ECS::TaskDefinition";
pub const ECS_SERVICE: &str = "AWS::ECS::Service";

pub const ELBV2_LOAD_BALANCER: &str = "AWS::ElasticLoadBalancingV2::LoadBalancer";
pub const ELBV2_LISTENER: &str = "AWS::ElasticLoadBalancingV2::Listener";
pub const ELBV2_TARGET_GROUP: &str = "AWS::ElasticLoadBalancingV2::TargetGroup";

pub const IAM_ROLE: &str = "AWS::IAM::Role";
pub const IAM_POLICY: &str = "AWS::IAM::Policy";

pub const LOGS_LOG_GROUP: &str = "AWS::Logs::LogGroup";

pub const AUTOSCALING_SCALABLE_TARGET: &str = "AWS::ApplicationAutoScaling::ScalableTarget";
pub const AUTOSCALING_SCALING_POLICY: &str = "AWS::ApplicationAutoScaling::ScalingPolicy";

pub const CLOUDWATCH_ALARM: &str = "AWS::CloudWatch::Alarm";
pub const CLOUDWATCH_DASHBOARD: &str = "AWS::CloudWatch::Dashboard";

pub const SNS_TOPIC: &str = "AWS::SNS::Topic";
pub const SNS_SUBSCRIPTION: &str = "AWS::SNS::Subscription";

// =============================================================================
// Resource Type Definitions
// =============================================================================

macro_rules! define_resource_type {
    ($name:ident, $type_name:expr) => {
        pub struct $name;
        impl ResourceType for $name {
            fn name(&self) -> &'static str {
                $type_name
            }
        }
    };
}

define_resource_type!(VpcType, EC2_VPC);
define_resource_type!(SubnetType, EC2_SUBNET);
define_resource_type!(RouteTableType, EC2_ROUTE_TABLE);
define_resource_type!(SubnetRouteTableAssociationType, EC2_SUBNET_ROUTE_TABLE_ASSOCIATION);
define_resource_type!(VpcEndpointType, EC2_VPC_ENDPOINT);
define_resource_type!(SecurityGroupType, EC2_SECURITY_GROUP);
define_resource_type!(SecurityGroupIngressType, EC2_SECURITY_GROUP_INGRESS);
define_resource_type!(ClusterType, ECS_CLUSTER);
define_resource_type!(TaskDefinitionType, ECS_TASK_DEFINITION);
define_resource_type!(ServiceType, ECS_SERVICE);
define_resource_type!(LoadBalancerType, ELBV2_LOAD_BALANCER);
define_resource_type!(ListenerType, ELBV2_LISTENER);
define_resource_type!(TargetGroupType, ELBV2_TARGET_GROUP);
define_resource_type!(RoleType, IAM_ROLE);
define_resource_type!(PolicyType, IAM_POLICY);
define_resource_type!(LogGroupType, LOGS_LOG_GROUP);
define_resource_type!(ScalableTargetType, AUTOSCALING_SCALABLE_TARGET);
define_resource_type!(ScalingPolicyType, AUTOSCALING_SCALING_POLICY);
define_resource_type!(AlarmType, CLOUDWATCH_ALARM);
define_resource_type!(DashboardType, CLOUDWATCH_DASHBOARD);
define_resource_type!(TopicType, SNS_TOPIC);
define_resource_type!(SubscriptionType, SNS_SUBSCRIPTION);

/// Returns all resource types supported by this provider
pub fn resource_types() -> Vec<Box<dyn ResourceType>> {
    vec![
        Box::new(VpcType),
        Box::new(SubnetType),
        Box::new(RouteTableType),
        Box::new(SubnetRouteTableAssociationType),
        Box::new(VpcEndpointType),
        Box::new(SecurityGroupType),
        Box::new(SecurityGroupIngressType),
        Box::new(ClusterType),
        Box::new(TaskDefinitionType),
        Box::new(ServiceType),
        Box::new(LoadBalancerType),
        Box::new(ListenerType),
        Box::new(TargetGroupType),
        Box::new(RoleType),
        Box::new(PolicyType),
        Box::new(LogGroupType),
        Box::new(ScalableTargetType),
        Box::new(ScalingPolicyType),
        Box::new(AlarmType),
        Box::new(DashboardType),
        Box::new(TopicType),
        Box::new(SubscriptionType),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names_are_unique() {
        let mut names: Vec<_> = resource_types().iter().map(|t| t.name()).collect();
        let total = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), total);
    }
}
