//! Resource - Declarative resource descriptors and their property values

use std::collections::BTreeMap;

/// Unique identifier for a resource inside a stack
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId {
    /// CloudFormation resource type (e.g., "AWS::EC2::VPC")
    pub resource_type: String,
    /// Logical id inside the template (e.g., "Vpc")
    pub name: String,
}

impl ResourceId {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }
}

/// CloudFormation pseudo parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PseudoParameter {
    Region,
    AccountId,
    Partition,
    StackName,
    UrlSuffix,
}

impl PseudoParameter {
    pub fn as_str(&self) -> &'static str {
        match self {
            PseudoParameter::Region => "AWS::Region",
            PseudoParameter::AccountId => "AWS::AccountId",
            PseudoParameter::Partition => "AWS::Partition",
            PseudoParameter::StackName => "AWS::StackName",
            PseudoParameter::UrlSuffix => "AWS::URLSuffix",
        }
    }
}

/// Unresolved reference to a resource (or one of its attributes) in some stack.
///
/// Tokens are what units hand to each other. Synthesis turns a token into a
/// `Ref`/`Fn::GetAtt` when producer and consumer share a stack, and into an
/// export/import pair otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token {
    pub stack: String,
    pub logical_id: String,
    /// `None` means the resource's `Ref` value
    pub attribute: Option<String>,
}

/// Property value of a resource
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int(i64),
    Bool(bool),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// `{"Ref": logical_id}` within the same template
    Ref(String),
    /// `{"Fn::GetAtt": [logical_id, attribute]}` within the same template
    GetAtt(String, String),
    Pseudo(PseudoParameter),
    Join(String, Vec<Value>),
    Select(usize, Box<Value>),
    /// `{"Fn::GetAZs": ""}` for the stack's region
    GetAzs,
    ImportValue(String),
    Token(Token),
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Value::List(items.into_iter().map(Into::into).collect())
    }

    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Build an `Fn::Join`, merging adjacent literal strings.
    ///
    /// Collapses to a plain string when every part is literal.
    pub fn join(separator: impl Into<String>, parts: Vec<Value>) -> Self {
        let separator = separator.into();
        if parts.iter().all(|p| matches!(p, Value::String(_))) {
            let strings: Vec<&str> = parts
                .iter()
                .filter_map(|p| match p {
                    Value::String(s) => Some(s.as_str()),
                    _ => None,
                })
                .collect();
            return Value::String(strings.join(&separator));
        }

        if !separator.is_empty() {
            return Value::Join(separator, parts);
        }

        let mut merged: Vec<Value> = Vec::with_capacity(parts.len());
        for part in parts {
            if let Value::String(s) = &part {
                if s.is_empty() {
                    continue;
                }
                if let Some(Value::String(prev)) = merged.last_mut() {
                    prev.push_str(s);
                    continue;
                }
            }
            merged.push(part);
        }
        Value::Join(separator, merged)
    }

    pub fn select(index: usize, list: Value) -> Self {
        Value::Select(index, Box::new(list))
    }

    /// Returns true if this value (or anything nested in it) is only known at deploy time
    pub fn is_intrinsic(&self) -> bool {
        match self {
            Value::String(_) | Value::Int(_) | Value::Bool(_) => false,
            Value::List(items) => items.iter().any(Value::is_intrinsic),
            Value::Map(map) => map.values().any(Value::is_intrinsic),
            _ => true,
        }
    }

    /// Returns true if the value itself is an intrinsic function or reference
    pub fn is_function(&self) -> bool {
        !matches!(
            self,
            Value::String(_) | Value::Int(_) | Value::Bool(_) | Value::List(_) | Value::Map(_)
        )
    }

    /// Collect every token nested in this value
    pub fn tokens(&self) -> Vec<&Token> {
        let mut out = Vec::new();
        self.collect_tokens(&mut out);
        out
    }

    fn collect_tokens<'a>(&'a self, out: &mut Vec<&'a Token>) {
        match self {
            Value::Token(t) => out.push(t),
            Value::List(items) | Value::Join(_, items) => {
                for item in items {
                    item.collect_tokens(out);
                }
            }
            Value::Map(map) => {
                for v in map.values() {
                    v.collect_tokens(out);
                }
            }
            Value::Select(_, inner) => inner.collect_tokens(out),
            _ => {}
        }
    }

    /// Collect logical ids referenced through `Ref` / `Fn::GetAtt`
    pub fn local_references(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_local_references(&mut out);
        out
    }

    fn collect_local_references<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Value::Ref(id) | Value::GetAtt(id, _) => out.push(id),
            Value::List(items) | Value::Join(_, items) => {
                for item in items {
                    item.collect_local_references(out);
                }
            }
            Value::Map(map) => {
                for v in map.values() {
                    v.collect_local_references(out);
                }
            }
            Value::Select(_, inner) => inner.collect_local_references(out),
            _ => {}
        }
    }

    /// Replace every token with the value returned by `resolve`
    pub fn resolve_tokens<E>(
        &self,
        resolve: &mut impl FnMut(&Token) -> Result<Value, E>,
    ) -> Result<Value, E> {
        Ok(match self {
            Value::Token(t) => resolve(t)?,
            Value::List(items) => Value::List(
                items
                    .iter()
                    .map(|v| v.resolve_tokens(resolve))
                    .collect::<Result<_, _>>()?,
            ),
            Value::Map(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| Ok((k.clone(), v.resolve_tokens(resolve)?)))
                    .collect::<Result<_, E>>()?,
            ),
            Value::Join(sep, items) => Value::Join(
                sep.clone(),
                items
                    .iter()
                    .map(|v| v.resolve_tokens(resolve))
                    .collect::<Result<_, _>>()?,
            ),
            Value::Select(i, inner) => Value::Select(*i, Box::new(inner.resolve_tokens(resolve)?)),
            other => other.clone(),
        })
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::String(s.clone())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<PseudoParameter> for Value {
    fn from(p: PseudoParameter) -> Self {
        Value::Pseudo(p)
    }
}

/// What happens to the physical resource when it leaves the template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalPolicy {
    /// Keep the physical resource when it is removed or replaced
    Retain,
}

impl RemovalPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemovalPolicy::Retain => "Retain",
        }
    }
}

/// Desired state of a single resource
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub id: ResourceId,
    pub properties: BTreeMap<String, Value>,
    /// Tags set directly on this resource
    pub tags: BTreeMap<String, String>,
    /// Logical ids this resource must be created after
    pub depends_on: Vec<String>,
    pub removal_policy: Option<RemovalPolicy>,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ResourceId::new(resource_type, name),
            properties: BTreeMap::new(),
            tags: BTreeMap::new(),
            depends_on: Vec::new(),
            removal_policy: None,
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn depends_on(mut self, logical_id: impl Into<String>) -> Self {
        let logical_id = logical_id.into();
        if !self.depends_on.contains(&logical_id) {
            self.depends_on.push(logical_id);
        }
        self
    }

    pub fn with_removal_policy(mut self, policy: RemovalPolicy) -> Self {
        self.removal_policy = Some(policy);
        self
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn logical_id(&self) -> &str {
        &self.id.name
    }

    pub fn resource_type(&self) -> &str {
        &self.id.resource_type
    }
}

/// A resource as seen from outside the unit that declared it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceHandle {
    pub stack: String,
    pub id: ResourceId,
}

impl ResourceHandle {
    pub fn new(stack: impl Into<String>, id: ResourceId) -> Self {
        Self {
            stack: stack.into(),
            id,
        }
    }

    pub fn logical_id(&self) -> &str {
        &self.id.name
    }

    /// The resource's `Ref` value (usually its physical id or name)
    pub fn reference(&self) -> Value {
        Value::Token(Token {
            stack: self.stack.clone(),
            logical_id: self.id.name.clone(),
            attribute: None,
        })
    }

    pub fn attribute(&self, name: impl Into<String>) -> Value {
        Value::Token(Token {
            stack: self.stack.clone(),
            logical_id: self.id.name.clone(),
            attribute: Some(name.into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_of_literals_collapses_to_string() {
        let v = Value::join("", vec![Value::str("arn:"), Value::str("aws")]);
        assert_eq!(v, Value::str("arn:aws"));
    }

    #[test]
    fn join_merges_adjacent_literals() {
        let v = Value::join(
            "",
            vec![
                Value::str("a"),
                Value::str("b"),
                Value::Pseudo(PseudoParameter::Region),
                Value::str(""),
                Value::str("c"),
            ],
        );
        assert_eq!(
            v,
            Value::Join(
                String::new(),
                vec![
                    Value::str("ab"),
                    Value::Pseudo(PseudoParameter::Region),
                    Value::str("c"),
                ]
            )
        );
    }

    #[test]
    fn tokens_are_collected_from_nested_values() {
        let vpc = ResourceHandle::new("Network", ResourceId::new("AWS::EC2::VPC", "Vpc"));
        let value = Value::map([
            ("VpcId", vpc.reference()),
            ("Cidrs", Value::List(vec![vpc.attribute("CidrBlock")])),
        ]);

        let tokens = value.tokens();
        assert_eq!(tokens.len(), 2);
        assert!(tokens.iter().all(|t| t.logical_id == "Vpc"));
    }

    #[test]
    fn resolve_tokens_replaces_in_place() {
        let vpc = ResourceHandle::new("Network", ResourceId::new("AWS::EC2::VPC", "Vpc"));
        let value = Value::join("", vec![Value::str("vpc/"), vpc.reference()]);

        let resolved = value
            .resolve_tokens(&mut |t| Ok::<_, ()>(Value::Ref(t.logical_id.clone())))
            .unwrap();
        assert_eq!(
            resolved,
            Value::Join(
                String::new(),
                vec![Value::str("vpc/"), Value::Ref("Vpc".to_string())]
            )
        );
        assert_eq!(resolved.local_references(), vec!["Vpc"]);
    }

    #[test]
    fn depends_on_is_deduplicated() {
        let r = Resource::new("AWS::ECS::Service", "Service")
            .depends_on("Listener")
            .depends_on("Listener");
        assert_eq!(r.depends_on, vec!["Listener".to_string()]);
    }

    #[test]
    fn intrinsic_detection() {
        assert!(!Value::str("x").is_intrinsic());
        assert!(Value::list([Value::GetAzs]).is_intrinsic());
        assert!(!Value::list([Value::GetAzs]).is_function());
        assert!(Value::Ref("Vpc".to_string()).is_function());
    }
}
