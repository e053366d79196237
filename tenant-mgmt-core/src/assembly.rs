//! Assembly - Synthesized templates and the manifest that ties them together
//!
//! The on-disk layout is one `<stack>.template.json` per stack plus a
//! `manifest.json` listing every stack with its environment and dependencies.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::stack::Environment;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const MANIFEST_VERSION: &str = "36.0.0";
pub const STACK_ARTIFACT_TYPE: &str = "aws:cloudformation:stack";

/// Errors that can occur when writing or reading an assembly
#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid template {path}: {message}")]
    InvalidTemplate { path: String, message: String },
}

pub type AssemblyResult<T> = Result<T, AssemblyError>;

/// One synthesized stack
#[derive(Debug, Clone)]
pub struct StackArtifact {
    pub name: String,
    pub environment: Environment,
    /// Stacks that must be deployed before this one
    pub dependencies: Vec<String>,
    pub template: JsonValue,
}

impl StackArtifact {
    pub fn template_file(&self) -> String {
        template_file_name(&self.name)
    }

    /// Resources in the rendered template with the given type
    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = (&'a String, &'a JsonValue)> + 'a {
        self.template["Resources"]
            .as_object()
            .into_iter()
            .flat_map(|m| m.iter())
            .filter(move |(_, r)| r["Type"] == resource_type)
    }

    pub fn resource_count(&self) -> usize {
        self.template["Resources"]
            .as_object()
            .map_or(0, |m| m.len())
    }

    pub fn output(&self, name: &str) -> Option<&JsonValue> {
        self.template["Outputs"].get(name)
    }

    /// Pretty-printed template text, as written to disk
    pub fn template_text(&self) -> AssemblyResult<String> {
        serde_json::to_string_pretty(&self.template)
            .map(|mut s| {
                s.push('\n');
                s
            })
            .map_err(|e| AssemblyError::Serialization(e.to_string()))
    }
}

fn template_file_name(stack: &str) -> String {
    format!("{}.template.json", stack)
}

/// Resource counts across the assembly
#[derive(Debug, Default)]
pub struct AssemblySummary {
    pub stacks: usize,
    pub resources: usize,
    pub outputs: usize,
}

impl std::fmt::Display for AssemblySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Synthesized: {} stacks, {} resources, {} outputs",
            self.stacks, self.resources, self.outputs
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: String,
    pub artifacts: BTreeMap<String, ManifestArtifact>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestArtifact {
    #[serde(rename = "type")]
    pub artifact_type: String,
    pub environment: String,
    pub properties: ArtifactProperties,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactProperties {
    pub template_file: String,
}

/// Stacks in deployment order
#[derive(Debug, Clone, Default)]
pub struct CloudAssembly {
    pub artifacts: Vec<StackArtifact>,
}

impl CloudAssembly {
    pub fn stack(&self, name: &str) -> Option<&StackArtifact> {
        self.artifacts.iter().find(|a| a.name == name)
    }

    pub fn summary(&self) -> AssemblySummary {
        let mut summary = AssemblySummary {
            stacks: self.artifacts.len(),
            ..Default::default()
        };
        for artifact in &self.artifacts {
            summary.resources += artifact.resource_count();
            summary.outputs += artifact.template["Outputs"]
                .as_object()
                .map_or(0, |m| m.len());
        }
        summary
    }

    pub fn manifest(&self) -> Manifest {
        let artifacts = self
            .artifacts
            .iter()
            .map(|a| {
                (
                    a.name.clone(),
                    ManifestArtifact {
                        artifact_type: STACK_ARTIFACT_TYPE.to_string(),
                        environment: a.environment.to_string(),
                        properties: ArtifactProperties {
                            template_file: a.template_file(),
                        },
                        dependencies: a.dependencies.clone(),
                    },
                )
            })
            .collect();
        Manifest {
            version: MANIFEST_VERSION.to_string(),
            artifacts,
        }
    }
}

/// Write every template and the manifest into `dir`, creating it if needed
pub fn write_assembly(assembly: &CloudAssembly, dir: &Path) -> AssemblyResult<()> {
    std::fs::create_dir_all(dir).map_err(|e| {
        AssemblyError::Io(format!("Failed to create {}: {}", dir.display(), e))
    })?;

    for artifact in &assembly.artifacts {
        let path = dir.join(artifact.template_file());
        std::fs::write(&path, artifact.template_text()?).map_err(|e| {
            AssemblyError::Io(format!("Failed to write {}: {}", path.display(), e))
        })?;
        log::debug!("wrote {}", path.display());
    }

    let manifest = serde_json::to_string_pretty(&assembly.manifest())
        .map_err(|e| AssemblyError::Serialization(format!("Failed to serialize manifest: {}", e)))?;
    let path = dir.join(MANIFEST_FILE);
    std::fs::write(&path, manifest)
        .map_err(|e| AssemblyError::Io(format!("Failed to write {}: {}", path.display(), e)))?;

    Ok(())
}

/// Read a previously written template; `None` if the stack was never written
pub fn read_template(dir: &Path, stack: &str) -> AssemblyResult<Option<String>> {
    let path = dir.join(template_file_name(stack));
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(&path)
        .map_err(|e| AssemblyError::Io(format!("Failed to read {}: {}", path.display(), e)))?;

    serde_json::from_str::<JsonValue>(&content).map_err(|e| AssemblyError::InvalidTemplate {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    Ok(Some(content))
}

/// Read the manifest written by `write_assembly`; `None` if there is none
pub fn read_manifest(dir: &Path) -> AssemblyResult<Option<Manifest>> {
    let path = dir.join(MANIFEST_FILE);
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(&path)
        .map_err(|e| AssemblyError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
    let manifest = serde_json::from_str(&content)
        .map_err(|e| AssemblyError::Serialization(format!("Failed to parse manifest: {}", e)))?;

    Ok(Some(manifest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn assembly() -> CloudAssembly {
        CloudAssembly {
            artifacts: vec![
                StackArtifact {
                    name: "Net".to_string(),
                    environment: Environment::default(),
                    dependencies: vec![],
                    template: json!({
                        "Resources": { "Vpc": { "Type": "AWS::EC2::VPC" } },
                        "Outputs": { "VpcId": { "Value": { "Ref": "Vpc" } } }
                    }),
                },
                StackArtifact {
                    name: "Svc".to_string(),
                    environment: Environment::new(
                        Some("123456789012".to_string()),
                        Some("us-east-1".to_string()),
                    ),
                    dependencies: vec!["Net".to_string()],
                    template: json!({
                        "Resources": {
                            "Cluster": { "Type": "AWS::ECS::Cluster" },
                            "Service": { "Type": "AWS::ECS::Service" }
                        }
                    }),
                },
            ],
        }
    }

    #[test]
    fn summary_counts_resources_and_outputs() {
        let summary = assembly().summary();
        assert_eq!(summary.stacks, 2);
        assert_eq!(summary.resources, 3);
        assert_eq!(summary.outputs, 1);
        assert_eq!(
            summary.to_string(),
            "Synthesized: 2 stacks, 3 resources, 1 outputs"
        );
    }

    #[test]
    fn resources_of_type_filters_template() {
        let a = assembly();
        let svc = a.stack("Svc").unwrap();
        let clusters: Vec<_> = svc.resources_of_type("AWS::ECS::Cluster").collect();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].0, "Cluster");
        assert!(a.stack("Net").unwrap().output("VpcId").is_some());
    }

    #[test]
    fn manifest_lists_environment_and_dependencies() {
        let manifest = assembly().manifest();
        let value = serde_json::to_value(&manifest).unwrap();
        assert_eq!(value["version"], MANIFEST_VERSION);
        assert_eq!(
            value["artifacts"]["Svc"],
            json!({
                "type": "aws:cloudformation:stack",
                "environment": "aws://123456789012/us-east-1",
                "properties": { "templateFile": "Svc.template.json" },
                "dependencies": ["Net"]
            })
        );
        assert_eq!(
            value["artifacts"]["Net"]["environment"],
            "aws://unknown-account/unknown-region"
        );
        assert!(value["artifacts"]["Net"].get("dependencies").is_none());
    }

    #[test]
    fn write_then_read_back() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("cdk.out");
        let a = assembly();

        write_assembly(&a, &out).unwrap();

        assert!(out.join("Net.template.json").exists());
        let text = read_template(&out, "Svc").unwrap().unwrap();
        assert_eq!(text, a.stack("Svc").unwrap().template_text().unwrap());

        let manifest = read_manifest(&out).unwrap().unwrap();
        assert_eq!(manifest, a.manifest());
    }

    #[test]
    fn missing_template_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(read_template(dir.path(), "Nope").unwrap().is_none());
        assert!(read_manifest(dir.path()).unwrap().is_none());
    }

    #[test]
    fn corrupt_template_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("Bad.template.json"), "{ not json").unwrap();
        assert!(matches!(
            read_template(dir.path(), "Bad"),
            Err(AssemblyError::InvalidTemplate { .. })
        ));
    }
}
