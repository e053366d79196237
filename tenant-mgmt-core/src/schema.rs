//! Schema - Define type schemas for resources
//!
//! Providers define schemas for each resource type so that property mistakes
//! surface at synthesis time instead of at deploy time.

use std::collections::BTreeMap;
use std::fmt;

use crate::resource::Value;

/// Attribute type
#[derive(Debug, Clone)]
pub enum AttributeType {
    /// String
    String,
    /// Integer
    Int,
    /// Boolean
    Bool,
    /// Enum (list of allowed values)
    Enum(Vec<String>),
    /// Custom type (with validation function)
    Custom {
        name: String,
        base: Box<AttributeType>,
        validate: fn(&Value) -> Result<(), String>,
    },
    /// List
    List(Box<AttributeType>),
    /// Map with free-form keys
    Map(Box<AttributeType>),
    /// Object with a fixed set of fields
    Struct(Vec<AttributeSchema>),
    /// Anything (free-form JSON such as policy documents)
    Any,
}

impl AttributeType {
    pub fn list(inner: AttributeType) -> Self {
        AttributeType::List(Box::new(inner))
    }

    pub fn enumeration(values: &[&str]) -> Self {
        AttributeType::Enum(values.iter().map(|v| v.to_string()).collect())
    }

    /// Check if a value conforms to this type
    pub fn validate(&self, value: &Value) -> Result<(), TypeError> {
        // Intrinsic functions are only resolved at deploy time
        if value.is_function() {
            return Ok(());
        }

        match (self, value) {
            (AttributeType::Any, _) => Ok(()),
            (AttributeType::String, Value::String(_)) => Ok(()),
            (AttributeType::Int, Value::Int(_)) => Ok(()),
            (AttributeType::Bool, Value::Bool(_)) => Ok(()),

            (AttributeType::Enum(variants), Value::String(s)) => {
                if variants.iter().any(|v| v == s) {
                    Ok(())
                } else {
                    Err(TypeError::InvalidEnumVariant {
                        value: s.clone(),
                        expected: variants.clone(),
                    })
                }
            }

            (AttributeType::Custom { validate, base, .. }, v) => {
                base.validate(v)?;
                validate(v).map_err(|msg| TypeError::ValidationFailed { message: msg })
            }

            (AttributeType::List(inner), Value::List(items)) => {
                for (i, item) in items.iter().enumerate() {
                    inner.validate(item).map_err(|e| TypeError::ListItemError {
                        index: i,
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Map(inner), Value::Map(map)) => {
                for (k, v) in map {
                    inner.validate(v).map_err(|e| TypeError::MapValueError {
                        key: k.clone(),
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Struct(fields), Value::Map(map)) => {
                match validate_fields(fields.iter(), map).into_iter().next() {
                    Some(e) => Err(e),
                    None => Ok(()),
                }
            }

            _ => Err(TypeError::TypeMismatch {
                expected: self.type_name(),
                got: value.type_name(),
            }),
        }
    }

    fn type_name(&self) -> String {
        match self {
            AttributeType::String => "String".to_string(),
            AttributeType::Int => "Int".to_string(),
            AttributeType::Bool => "Bool".to_string(),
            AttributeType::Enum(variants) => format!("Enum({})", variants.join(" | ")),
            AttributeType::Custom { name, .. } => name.clone(),
            AttributeType::List(inner) => format!("List<{}>", inner.type_name()),
            AttributeType::Map(inner) => format!("Map<{}>", inner.type_name()),
            AttributeType::Struct(_) => "Struct".to_string(),
            AttributeType::Any => "Any".to_string(),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Type error
#[derive(Debug, Clone, thiserror::Error)]
pub enum TypeError {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Invalid enum variant '{value}', expected one of: {}", expected.join(", "))]
    InvalidEnumVariant {
        value: String,
        expected: Vec<String>,
    },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Required attribute '{name}' is missing")]
    MissingRequired { name: String },

    #[error("Unknown attribute '{name}'")]
    UnknownAttribute { name: String },

    #[error("List item at index {index}: {inner}")]
    ListItemError { index: usize, inner: Box<TypeError> },

    #[error("Map value for key '{key}': {inner}")]
    MapValueError { key: String, inner: Box<TypeError> },
}

impl Value {
    fn type_name(&self) -> String {
        match self {
            Value::String(_) => "String".to_string(),
            Value::Int(_) => "Int".to_string(),
            Value::Bool(_) => "Bool".to_string(),
            Value::List(_) => "List".to_string(),
            Value::Map(_) => "Map".to_string(),
            Value::Ref(id) => format!("Ref({})", id),
            Value::GetAtt(id, attr) => format!("GetAtt({}.{})", id, attr),
            Value::Pseudo(p) => p.as_str().to_string(),
            Value::Join(..) => "Fn::Join".to_string(),
            Value::Select(..) => "Fn::Select".to_string(),
            Value::GetAzs => "Fn::GetAZs".to_string(),
            Value::ImportValue(name) => format!("ImportValue({})", name),
            Value::Token(t) => format!("Token({}/{})", t.stack, t.logical_id),
        }
    }
}

/// Attribute schema
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    /// Property name as it appears in the template (e.g., "CidrBlock")
    pub name: String,
    pub attr_type: AttributeType,
    pub required: bool,
    pub description: Option<String>,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            required: false,
            description: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }
}

fn validate_fields<'a>(
    fields: impl Iterator<Item = &'a AttributeSchema> + Clone,
    values: &BTreeMap<String, Value>,
) -> Vec<TypeError> {
    let mut errors = Vec::new();

    for schema in fields.clone() {
        if schema.required && !values.contains_key(&schema.name) {
            errors.push(TypeError::MissingRequired {
                name: schema.name.clone(),
            });
        }
    }

    for (name, value) in values {
        match fields.clone().find(|f| &f.name == name) {
            Some(schema) => {
                if let Err(e) = schema.attr_type.validate(value) {
                    errors.push(TypeError::MapValueError {
                        key: name.clone(),
                        inner: Box::new(e),
                    });
                }
            }
            None => errors.push(TypeError::UnknownAttribute { name: name.clone() }),
        }
    }

    errors
}

/// Resource schema
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub resource_type: String,
    pub attributes: BTreeMap<String, AttributeSchema>,
    pub description: Option<String>,
}

impl ResourceSchema {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            attributes: BTreeMap::new(),
            description: None,
        }
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Validate resource properties
    pub fn validate(&self, properties: &BTreeMap<String, Value>) -> Result<(), Vec<TypeError>> {
        let errors = validate_fields(self.attributes.values(), properties);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Helper functions for common types
pub mod types {
    use super::*;

    /// Positive integer type
    pub fn positive_int() -> AttributeType {
        AttributeType::Custom {
            name: "PositiveInt".to_string(),
            base: Box::new(AttributeType::Int),
            validate: |value| {
                if let Value::Int(n) = value {
                    if *n > 0 {
                        Ok(())
                    } else {
                        Err("Value must be positive".to_string())
                    }
                } else {
                    Err("Expected integer".to_string())
                }
            },
        }
    }

    /// Non-negative integer type
    pub fn non_negative_int() -> AttributeType {
        AttributeType::Custom {
            name: "NonNegativeInt".to_string(),
            base: Box::new(AttributeType::Int),
            validate: |value| match value {
                Value::Int(n) if *n >= 0 => Ok(()),
                Value::Int(_) => Err("Value must not be negative".to_string()),
                _ => Err("Expected integer".to_string()),
            },
        }
    }

    /// CIDR block type (e.g., "10.0.0.0/16")
    pub fn cidr() -> AttributeType {
        AttributeType::Custom {
            name: "Cidr".to_string(),
            base: Box::new(AttributeType::String),
            validate: |value| {
                if let Value::String(s) = value {
                    validate_cidr(s)
                } else {
                    Err("Expected string".to_string())
                }
            },
        }
    }
}

/// Validate CIDR block format (e.g., "10.0.0.0/16")
pub fn validate_cidr(cidr: &str) -> Result<(), String> {
    cidr.parse::<crate::cidr::Ipv4Cidr>()
        .map(|_| ())
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_string_type() {
        let t = AttributeType::String;
        assert!(t.validate(&Value::String("hello".to_string())).is_ok());
        assert!(t.validate(&Value::Int(42)).is_err());
    }

    #[test]
    fn intrinsic_values_pass_scalar_types() {
        assert!(
            AttributeType::Int
                .validate(&Value::Ref("Param".to_string()))
                .is_ok()
        );
        assert!(
            AttributeType::list(AttributeType::String)
                .validate(&Value::GetAzs)
                .is_ok()
        );
    }

    #[test]
    fn validate_enum_type() {
        let t = AttributeType::enumeration(&["a", "b"]);
        assert!(t.validate(&Value::String("a".to_string())).is_ok());
        assert!(t.validate(&Value::String("c".to_string())).is_err());
    }

    #[test]
    fn validate_positive_int() {
        let t = types::positive_int();
        assert!(t.validate(&Value::Int(1)).is_ok());
        assert!(t.validate(&Value::Int(100)).is_ok());
        assert!(t.validate(&Value::Int(0)).is_err());
        assert!(t.validate(&Value::Int(-1)).is_err());
        assert!(t.validate(&Value::String("1".to_string())).is_err());
    }

    #[test]
    fn validate_resource_schema() {
        let schema = ResourceSchema::new("resource")
            .attribute(AttributeSchema::new("Name", AttributeType::String).required())
            .attribute(AttributeSchema::new("Count", types::positive_int()))
            .attribute(AttributeSchema::new("Enabled", AttributeType::Bool));

        let mut attrs = BTreeMap::new();
        attrs.insert("Name".to_string(), Value::String("my-resource".to_string()));
        attrs.insert("Count".to_string(), Value::Int(5));
        attrs.insert("Enabled".to_string(), Value::Bool(true));

        assert!(schema.validate(&attrs).is_ok());
    }

    #[test]
    fn missing_required_attribute() {
        let schema = ResourceSchema::new("topic")
            .attribute(AttributeSchema::new("TopicName", AttributeType::String).required());

        let errors = schema.validate(&BTreeMap::new()).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], TypeError::MissingRequired { name } if name == "TopicName"));
    }

    #[test]
    fn unknown_attribute_is_reported() {
        let schema = ResourceSchema::new("topic")
            .attribute(AttributeSchema::new("TopicName", AttributeType::String));

        let mut attrs = BTreeMap::new();
        attrs.insert("TopicNmae".to_string(), Value::str("x"));
        let errors = schema.validate(&attrs).unwrap_err();
        assert!(matches!(&errors[0], TypeError::UnknownAttribute { name } if name == "TopicNmae"));
    }

    #[test]
    fn struct_fields_are_checked() {
        let t = AttributeType::Struct(vec![
            AttributeSchema::new("Key", AttributeType::String).required(),
            AttributeSchema::new("Value", AttributeType::String).required(),
        ]);
        assert!(t.validate(&Value::map([("Key", "a"), ("Value", "b")])).is_ok());
        assert!(t.validate(&Value::map([("Key", "a")])).is_err());
        assert!(
            t.validate(&Value::map([("Key", "a"), ("Value", "b"), ("Extra", "c")]))
                .is_err()
        );
    }

    #[test]
    fn validate_cidr_type() {
        let t = types::cidr();

        assert!(t.validate(&Value::String("10.0.0.0/16".to_string())).is_ok());
        assert!(
            t.validate(&Value::String("192.168.1.0/24".to_string()))
                .is_ok()
        );
        assert!(t.validate(&Value::String("0.0.0.0/0".to_string())).is_ok());

        assert!(t.validate(&Value::String("10.0.0.0".to_string())).is_err()); // no prefix
        assert!(t.validate(&Value::String("10.0.0.0/33".to_string())).is_err()); // prefix too large
        assert!(
            t.validate(&Value::String("10.0.0.256/16".to_string()))
                .is_err()
        ); // octet > 255
        assert!(t.validate(&Value::String("invalid".to_string())).is_err());
        assert!(t.validate(&Value::Int(42)).is_err()); // wrong type
    }
}
