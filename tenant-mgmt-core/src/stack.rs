//! Stack - A named, independently deployable group of resources

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::resource::{PseudoParameter, Resource, ResourceHandle, Value};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StackError {
    #[error("Stack '{stack}' already declares a resource with logical id '{logical_id}'")]
    DuplicateLogicalId { stack: String, logical_id: String },

    #[error("Stack '{stack}' already declares an output named '{name}'")]
    DuplicateOutput { stack: String, name: String },

    #[error("Invalid logical id '{0}': only ASCII letters and digits are allowed")]
    InvalidLogicalId(String),
}

/// Target account and region of a stack; either may be left to deploy time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    pub account: Option<String>,
    pub region: Option<String>,
}

impl Environment {
    pub fn new(account: Option<String>, region: Option<String>) -> Self {
        Self { account, region }
    }

    /// Region as a template value: literal when known, `AWS::Region` otherwise
    pub fn region_value(&self) -> Value {
        match &self.region {
            Some(region) => Value::str(region),
            None => Value::Pseudo(PseudoParameter::Region),
        }
    }

    /// Account as a template value: literal when known, `AWS::AccountId` otherwise
    pub fn account_value(&self) -> Value {
        match &self.account {
            Some(account) => Value::str(account),
            None => Value::Pseudo(PseudoParameter::AccountId),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "aws://{}/{}",
            self.account.as_deref().unwrap_or("unknown-account"),
            self.region.as_deref().unwrap_or("unknown-region")
        )
    }
}

/// Template output, optionally exported for other stacks
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub name: String,
    pub value: Value,
    pub description: Option<String>,
    pub export_name: Option<String>,
}

impl Output {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
            description: None,
            export_name: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_export_name(mut self, export_name: impl Into<String>) -> Self {
        self.export_name = Some(export_name.into());
        self
    }
}

/// A tag applied to a chosen subset of the stack's resources
#[derive(Debug, Clone, PartialEq)]
struct ScopedTag {
    logical_ids: Vec<String>,
    key: String,
    value: String,
}

/// A named group of resources synthesized into one template
#[derive(Debug, Clone)]
pub struct Stack {
    name: String,
    env: Environment,
    description: Option<String>,
    resources: Vec<Resource>,
    outputs: Vec<Output>,
    tags: BTreeMap<String, String>,
    scoped_tags: Vec<ScopedTag>,
}

impl Stack {
    pub fn new(name: impl Into<String>, env: Environment) -> Self {
        Self {
            name: name.into(),
            env,
            description: None,
            resources: Vec::new(),
            outputs: Vec::new(),
            tags: BTreeMap::new(),
            scoped_tags: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub(crate) fn resources_mut(&mut self) -> &mut [Resource] {
        &mut self.resources
    }

    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    pub(crate) fn outputs_mut(&mut self) -> &mut [Output] {
        &mut self.outputs
    }

    pub fn region(&self) -> Value {
        self.env.region_value()
    }

    /// Declare a resource and get a handle other units can reference
    pub fn add(&mut self, resource: Resource) -> Result<ResourceHandle, StackError> {
        let logical_id = resource.logical_id();
        if logical_id.is_empty() || !logical_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(StackError::InvalidLogicalId(logical_id.to_string()));
        }
        if self.resource(logical_id).is_some() {
            return Err(StackError::DuplicateLogicalId {
                stack: self.name.clone(),
                logical_id: logical_id.to_string(),
            });
        }

        log::debug!(
            "{}: declared {} ({})",
            self.name,
            resource.logical_id(),
            resource.resource_type()
        );

        let handle = ResourceHandle::new(self.name.clone(), resource.id.clone());
        self.resources.push(resource);
        Ok(handle)
    }

    pub fn add_output(&mut self, output: Output) -> Result<(), StackError> {
        if self.outputs.iter().any(|o| o.name == output.name) {
            return Err(StackError::DuplicateOutput {
                stack: self.name.clone(),
                name: output.name,
            });
        }
        self.outputs.push(output);
        Ok(())
    }

    /// Tag every taggable resource in the stack
    pub fn add_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(key.into(), value.into());
    }

    /// Tag only the given resources
    pub fn tag_resources<'a>(
        &mut self,
        handles: impl IntoIterator<Item = &'a ResourceHandle>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.scoped_tags.push(ScopedTag {
            logical_ids: handles
                .into_iter()
                .map(|h| h.logical_id().to_string())
                .collect(),
            key: key.into(),
            value: value.into(),
        });
    }

    pub fn resource(&self, logical_id: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.logical_id() == logical_id)
    }

    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = &'a Resource> + 'a {
        self.resources
            .iter()
            .filter(move |r| r.resource_type() == resource_type)
    }

    pub fn count_of(&self, resource_type: &str) -> usize {
        self.resources_of_type(resource_type).count()
    }

    /// Tags that end up on `resource`: stack tags, then scoped tags, then the
    /// resource's own tags; later layers win on key clashes.
    pub fn effective_tags(&self, resource: &Resource) -> BTreeMap<String, String> {
        let mut tags = self.tags.clone();
        for scoped in &self.scoped_tags {
            if scoped
                .logical_ids
                .iter()
                .any(|id| id == resource.logical_id())
            {
                tags.insert(scoped.key.clone(), scoped.value.clone());
            }
        }
        for (k, v) in &resource.tags {
            tags.insert(k.clone(), v.clone());
        }
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack() -> Stack {
        Stack::new("Network", Environment::default())
    }

    #[test]
    fn add_returns_handle_in_this_stack() {
        let mut s = stack();
        let h = s.add(Resource::new("AWS::EC2::VPC", "Vpc")).unwrap();
        assert_eq!(h.stack, "Network");
        assert_eq!(h.logical_id(), "Vpc");
        assert_eq!(s.count_of("AWS::EC2::VPC"), 1);
    }

    #[test]
    fn duplicate_logical_id_is_rejected() {
        let mut s = stack();
        s.add(Resource::new("AWS::EC2::VPC", "Vpc")).unwrap();
        let err = s.add(Resource::new("AWS::EC2::Subnet", "Vpc")).unwrap_err();
        assert_eq!(
            err,
            StackError::DuplicateLogicalId {
                stack: "Network".to_string(),
                logical_id: "Vpc".to_string()
            }
        );
    }

    #[test]
    fn logical_ids_must_be_alphanumeric() {
        let mut s = stack();
        assert!(matches!(
            s.add(Resource::new("AWS::EC2::VPC", "my-vpc")),
            Err(StackError::InvalidLogicalId(_))
        ));
    }

    #[test]
    fn duplicate_output_is_rejected() {
        let mut s = stack();
        s.add_output(Output::new("VpcId", Value::str("x"))).unwrap();
        assert!(s.add_output(Output::new("VpcId", Value::str("y"))).is_err());
    }

    #[test]
    fn tag_layers_resolve_most_specific_last() {
        let mut s = stack();
        let vpc = s
            .add(Resource::new("AWS::EC2::VPC", "Vpc").with_tag("Owner", "resource"))
            .unwrap();
        let subnet = s.add(Resource::new("AWS::EC2::Subnet", "Subnet")).unwrap();
        s.add_tag("Stack", "Network");
        s.add_tag("Owner", "stack");
        s.tag_resources([&vpc, &subnet], "Name", "tenant-mgmt-vpc-dev");
        s.tag_resources([&subnet], "Owner", "scoped");

        let vpc_tags = s.effective_tags(s.resource("Vpc").unwrap());
        assert_eq!(vpc_tags["Stack"], "Network");
        assert_eq!(vpc_tags["Name"], "tenant-mgmt-vpc-dev");
        assert_eq!(vpc_tags["Owner"], "resource");

        let subnet_tags = s.effective_tags(s.resource("Subnet").unwrap());
        assert_eq!(subnet_tags["Owner"], "scoped");
    }

    #[test]
    fn environment_values() {
        let known = Environment::new(Some("123456789012".into()), Some("eu-west-1".into()));
        assert_eq!(known.region_value(), Value::str("eu-west-1"));
        assert_eq!(known.to_string(), "aws://123456789012/eu-west-1");

        let agnostic = Environment::default();
        assert_eq!(
            agnostic.account_value(),
            Value::Pseudo(PseudoParameter::AccountId)
        );
        assert_eq!(
            agnostic.to_string(),
            "aws://unknown-account/unknown-region"
        );
    }
}
