//! Template - Render synthesized stacks as CloudFormation JSON

use serde_json::{Map, Value as JsonValue, json};
use thiserror::Error;

use crate::resource::Value;
use crate::stack::Stack;

pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("Unresolved reference to {stack}/{logical_id} left in the template")]
    UnresolvedToken { stack: String, logical_id: String },
}

/// Convert a property value to its CloudFormation JSON form
pub fn value_to_json(value: &Value) -> Result<JsonValue, TemplateError> {
    Ok(match value {
        Value::String(s) => json!(s),
        Value::Int(n) => json!(n),
        Value::Bool(b) => json!(b),
        Value::List(items) => JsonValue::Array(
            items
                .iter()
                .map(value_to_json)
                .collect::<Result<_, _>>()?,
        ),
        Value::Map(map) => {
            let mut obj = Map::new();
            for (k, v) in map {
                obj.insert(k.clone(), value_to_json(v)?);
            }
            JsonValue::Object(obj)
        }
        Value::Ref(id) => json!({ "Ref": id }),
        Value::GetAtt(id, attr) => json!({ "Fn::GetAtt": [id, attr] }),
        Value::Pseudo(p) => json!({ "Ref": p.as_str() }),
        Value::Join(sep, parts) => {
            let parts: Vec<JsonValue> = parts
                .iter()
                .map(value_to_json)
                .collect::<Result<_, _>>()?;
            json!({ "Fn::Join": [sep, parts] })
        }
        Value::Select(index, list) => json!({ "Fn::Select": [index, value_to_json(list)?] }),
        Value::GetAzs => json!({ "Fn::GetAZs": "" }),
        Value::ImportValue(name) => json!({ "Fn::ImportValue": name }),
        Value::Token(t) => {
            return Err(TemplateError::UnresolvedToken {
                stack: t.stack.clone(),
                logical_id: t.logical_id.clone(),
            });
        }
    })
}

/// Serialize a value into a JSON document string.
///
/// Values only known at deploy time are spliced in with `Fn::Join`, so the
/// result is a plain string when the document is fully literal.
pub fn json_document(value: &Value) -> Value {
    let mut parts = Vec::new();
    let mut buf = String::new();
    write_document(value, &mut buf, &mut parts);
    parts.push(Value::String(buf));
    Value::join("", parts)
}

fn write_document(value: &Value, buf: &mut String, parts: &mut Vec<Value>) {
    match value {
        Value::String(s) => buf.push_str(&JsonValue::String(s.clone()).to_string()),
        Value::Int(n) => buf.push_str(&n.to_string()),
        Value::Bool(b) => buf.push_str(if *b { "true" } else { "false" }),
        Value::List(items) => {
            buf.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    buf.push(',');
                }
                write_document(item, buf, parts);
            }
            buf.push(']');
        }
        Value::Map(map) => {
            buf.push('{');
            for (i, (k, v)) in map.iter().enumerate() {
                if i > 0 {
                    buf.push(',');
                }
                buf.push_str(&JsonValue::String(k.clone()).to_string());
                buf.push(':');
                write_document(v, buf, parts);
            }
            buf.push('}');
        }
        intrinsic => {
            buf.push('"');
            parts.push(Value::String(std::mem::take(buf)));
            parts.push(intrinsic.clone());
            buf.push('"');
        }
    }
}

/// Render a stack whose tokens have all been resolved
pub fn render_template(stack: &Stack) -> Result<JsonValue, TemplateError> {
    let mut resources = Map::new();
    for resource in stack.resources() {
        let mut body = Map::new();
        body.insert("Type".to_string(), json!(resource.resource_type()));

        if !resource.properties.is_empty() {
            let mut props = Map::new();
            for (k, v) in &resource.properties {
                props.insert(k.clone(), value_to_json(v)?);
            }
            body.insert("Properties".to_string(), JsonValue::Object(props));
        }

        if !resource.depends_on.is_empty() {
            let mut deps = resource.depends_on.clone();
            deps.sort();
            body.insert("DependsOn".to_string(), json!(deps));
        }

        if let Some(policy) = resource.removal_policy {
            body.insert("DeletionPolicy".to_string(), json!(policy.as_str()));
            body.insert("UpdateReplacePolicy".to_string(), json!(policy.as_str()));
        }

        resources.insert(resource.logical_id().to_string(), JsonValue::Object(body));
    }

    let mut template = Map::new();
    template.insert(
        "AWSTemplateFormatVersion".to_string(),
        json!(TEMPLATE_FORMAT_VERSION),
    );
    if let Some(description) = stack.description() {
        template.insert("Description".to_string(), json!(description));
    }
    template.insert("Resources".to_string(), JsonValue::Object(resources));

    if !stack.outputs().is_empty() {
        let mut outputs = Map::new();
        for output in stack.outputs() {
            let mut body = Map::new();
            if let Some(description) = &output.description {
                body.insert("Description".to_string(), json!(description));
            }
            body.insert("Value".to_string(), value_to_json(&output.value)?);
            if let Some(export_name) = &output.export_name {
                body.insert("Export".to_string(), json!({ "Name": export_name }));
            }
            outputs.insert(output.name.clone(), JsonValue::Object(body));
        }
        template.insert("Outputs".to_string(), JsonValue::Object(outputs));
    }

    Ok(JsonValue::Object(template))
}
