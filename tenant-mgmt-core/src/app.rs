//! App - Compose stacks and synthesize them into a cloud assembly
//!
//! Synthesis is a pure function of the declared stacks: tokens are resolved
//! into same-stack references or export/import pairs, tags are applied,
//! properties are validated against the provider schemas and every stack is
//! rendered to a template. Nothing here talks to the cloud.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::assembly::{CloudAssembly, StackArtifact};
use crate::cidr::CidrError;
use crate::graph::{Dependency, DependencyGraph};
use crate::provider::Provider;
use crate::resource::{Token, Value};
use crate::schema::TypeError;
use crate::stack::{Output, Stack, StackError};
use crate::template::{TemplateError, render_template};

/// A single schema violation on a resource
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub stack: String,
    pub logical_id: String,
    pub error: TypeError,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}: {}", self.stack, self.logical_id, self.error)
    }
}

fn format_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| format!("  {}", i))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Error)]
pub enum SynthError {
    #[error(transparent)]
    Stack(#[from] StackError),

    #[error(transparent)]
    Cidr(#[from] CidrError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("App already contains a stack named '{0}'")]
    DuplicateStack(String),

    #[error("Stack '{stack}' references unknown stack '{target}'")]
    UnknownStack { stack: String, target: String },

    #[error("Stack '{stack}' references '{logical_id}', which stack '{target}' does not declare")]
    UnknownResource {
        stack: String,
        target: String,
        logical_id: String,
    },

    #[error("{stack}/{logical_id} references '{target}', which is not declared in the stack")]
    UnknownReference {
        stack: String,
        logical_id: String,
        target: String,
    },

    #[error("{stack}/{logical_id} has unsupported resource type '{resource_type}'")]
    UnknownResourceType {
        stack: String,
        logical_id: String,
        resource_type: String,
    },

    #[error("Stacks reference each other in a cycle")]
    DependencyCycle,

    #[error("{} validation error(s):\n{}", .0.len(), format_issues(.0))]
    Validation(Vec<ValidationIssue>),
}

/// Export name and output name for a cross-stack reference
fn export_names(token: &Token) -> (String, String) {
    let output_name = match &token.attribute {
        None => format!("ExportsOutputRef{}", token.logical_id),
        Some(attr) => format!(
            "ExportsOutputFnGetAtt{}{}",
            token.logical_id,
            attr.replace('.', "")
        ),
    };
    let export_name = format!("{}:{}", token.stack, output_name);
    (output_name, export_name)
}

fn local_value(token: &Token) -> Value {
    match &token.attribute {
        None => Value::Ref(token.logical_id.clone()),
        Some(attr) => Value::GetAtt(token.logical_id.clone(), attr.clone()),
    }
}

/// The set of stacks making up one deployment
#[derive(Debug, Clone, Default)]
pub struct App {
    stacks: Vec<Stack>,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_stack(&mut self, stack: Stack) -> Result<(), SynthError> {
        if self.stack(stack.name()).is_some() {
            return Err(SynthError::DuplicateStack(stack.name().to_string()));
        }
        self.stacks.push(stack);
        Ok(())
    }

    pub fn stacks(&self) -> &[Stack] {
        &self.stacks
    }

    pub fn stack(&self, name: &str) -> Option<&Stack> {
        self.stacks.iter().find(|s| s.name() == name)
    }

    /// Resolve, tag, validate and render every stack
    pub fn synth(&self, provider: &dyn Provider) -> Result<CloudAssembly, SynthError> {
        let mut graph = DependencyGraph::new();
        let mut exports: BTreeMap<String, BTreeMap<String, Output>> = BTreeMap::new();
        let mut resolved: Vec<Stack> = Vec::with_capacity(self.stacks.len());

        for stack in &self.stacks {
            let mut stack = stack.clone();
            let consumer = stack.name().to_string();

            let mut resolve = |token: &Token| -> Result<Value, SynthError> {
                let producer =
                    self.stack(&token.stack)
                        .ok_or_else(|| SynthError::UnknownStack {
                            stack: consumer.clone(),
                            target: token.stack.clone(),
                        })?;
                if producer.resource(&token.logical_id).is_none() {
                    return Err(SynthError::UnknownResource {
                        stack: consumer.clone(),
                        target: token.stack.clone(),
                        logical_id: token.logical_id.clone(),
                    });
                }

                if token.stack == consumer {
                    return Ok(local_value(token));
                }

                let (output_name, export_name) = export_names(token);
                exports
                    .entry(token.stack.clone())
                    .or_default()
                    .entry(output_name.clone())
                    .or_insert_with(|| {
                        Output::new(output_name, local_value(token))
                            .with_export_name(export_name.clone())
                    });
                graph.add_edge(
                    consumer.clone(),
                    Dependency {
                        target: token.stack.clone(),
                        export_name: export_name.clone(),
                    },
                );
                Ok(Value::ImportValue(export_name))
            };

            for resource in stack.resources_mut() {
                for value in resource.properties.values_mut() {
                    *value = value.resolve_tokens(&mut resolve)?;
                }
            }
            for output in stack.outputs_mut() {
                output.value = output.value.resolve_tokens(&mut resolve)?;
            }

            resolved.push(stack);
        }

        for stack in &mut resolved {
            if let Some(outputs) = exports.remove(stack.name()) {
                for (_, output) in outputs {
                    stack.add_output(output)?;
                }
            }
        }

        let names: Vec<String> = resolved.iter().map(|s| s.name().to_string()).collect();
        let order = graph
            .topological_order(&names)
            .ok_or(SynthError::DependencyCycle)?;

        let mut issues = Vec::new();
        for stack in &mut resolved {
            check_local_references(stack)?;
            apply_tags(stack, provider);
            issues.extend(validate_stack(stack, provider)?);
        }
        if !issues.is_empty() {
            return Err(SynthError::Validation(issues));
        }

        let mut artifacts = Vec::with_capacity(order.len());
        for name in &order {
            let Some(stack) = resolved.iter().find(|s| s.name() == name) else {
                continue;
            };
            let template = render_template(stack)?;
            log::info!(
                "synthesized {} ({} resources, {} outputs)",
                stack.name(),
                stack.resources().len(),
                stack.outputs().len()
            );
            artifacts.push(StackArtifact {
                name: stack.name().to_string(),
                environment: stack.env().clone(),
                dependencies: graph.dependency_names(name),
                template,
            });
        }

        Ok(CloudAssembly { artifacts })
    }
}

/// Every `Ref`, `Fn::GetAtt` and `DependsOn` must point at a resource in the same stack
fn check_local_references(stack: &Stack) -> Result<(), SynthError> {
    let unknown = |logical_id: &str, target: &str| SynthError::UnknownReference {
        stack: stack.name().to_string(),
        logical_id: logical_id.to_string(),
        target: target.to_string(),
    };

    for resource in stack.resources() {
        for value in resource.properties.values() {
            for target in value.local_references() {
                if stack.resource(target).is_none() {
                    return Err(unknown(resource.logical_id(), target));
                }
            }
        }
        for target in &resource.depends_on {
            if stack.resource(target).is_none() {
                return Err(unknown(resource.logical_id(), target));
            }
        }
    }

    for output in stack.outputs() {
        for target in output.value.local_references() {
            if stack.resource(target).is_none() {
                return Err(unknown(&output.name, target));
            }
        }
    }

    Ok(())
}

/// Write effective tags into the `Tags` property of taggable resources
fn apply_tags(stack: &mut Stack, provider: &dyn Provider) {
    let tag_sets: Vec<_> = stack
        .resources()
        .iter()
        .map(|r| {
            if provider.supports_tags(r.resource_type()) {
                Some(stack.effective_tags(r))
            } else {
                None
            }
        })
        .collect();

    for (resource, tags) in stack.resources_mut().iter_mut().zip(tag_sets) {
        let Some(tags) = tags else {
            if !resource.tags.is_empty() {
                log::warn!(
                    "{} does not support tags; ignoring {} tag(s)",
                    resource.logical_id(),
                    resource.tags.len()
                );
            }
            continue;
        };
        if tags.is_empty() || resource.properties.contains_key("Tags") {
            continue;
        }
        let list = tags
            .into_iter()
            .map(|(k, v)| Value::map([("Key", k), ("Value", v)]))
            .collect::<Vec<_>>();
        resource.properties.insert("Tags".to_string(), Value::List(list));
    }
}

fn validate_stack(
    stack: &Stack,
    provider: &dyn Provider,
) -> Result<Vec<ValidationIssue>, SynthError> {
    let mut issues = Vec::new();
    for resource in stack.resources() {
        let Some(schema) = provider.schema(resource.resource_type()) else {
            return Err(SynthError::UnknownResourceType {
                stack: stack.name().to_string(),
                logical_id: resource.logical_id().to_string(),
                resource_type: resource.resource_type().to_string(),
            });
        };
        if let Err(errors) = schema.validate(&resource.properties) {
            issues.extend(errors.into_iter().map(|error| ValidationIssue {
                stack: stack.name().to_string(),
                logical_id: resource.logical_id().to_string(),
                error,
            }));
        }
    }
    Ok(issues)
}
