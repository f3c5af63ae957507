//! Resource - Typed desired-state declarations and recorded state

use std::collections::HashMap;

/// Unique identifier for a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId {
    /// Resource type (e.g., "ec2.subnet", "eks.cluster")
    pub resource_type: String,
    /// Resource name
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

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.resource_type, self.name)
    }
}

/// Attribute value of a resource
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int(i64),
    Bool(bool),
    List(Vec<Value>),
    Map(HashMap<String, Value>),
    /// Reference to another declaration's generated attribute
    /// (binding name, attribute name). Resolved by the execution engine,
    /// never by Puppis itself.
    Ref(String, String),
}

impl Value {
    /// Create a reference to another resource's attribute
    pub fn reference(binding: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::Ref(binding.into(), attribute.into())
    }

    /// Convert to a JSON value. References serialize to their
    /// interpolation form `${binding.attribute}`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Int(n) => serde_json::Value::Number((*n).into()),
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(map) => {
                let mut sorted: Vec<_> = map.iter().collect();
                sorted.sort_by(|a, b| a.0.cmp(b.0));
                serde_json::Value::Object(
                    sorted
                        .into_iter()
                        .map(|(k, v)| (k.clone(), v.to_json()))
                        .collect(),
                )
            }
            Value::Ref(binding, attribute) => {
                serde_json::Value::String(format!("${{{}.{}}}", binding, attribute))
            }
        }
    }

    /// Parse back from JSON. Strings of the interpolation form
    /// `${binding.attribute}` become references again, so a round trip
    /// through a state file preserves reference identity.
    ///
    /// Numbers outside the i64 range (floats included) are an error
    /// rather than a silent zero; a state file carrying one would
    /// otherwise diff against the wrong value.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, ValueError> {
        Ok(match json {
            serde_json::Value::String(s) => match parse_interpolation(s) {
                Some((binding, attribute)) => Value::Ref(binding, attribute),
                None => Value::String(s.clone()),
            },
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(v) => Value::Int(v),
                None => return Err(ValueError::NonIntegerNumber(n.clone())),
            },
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Array(items) => Value::List(
                items
                    .iter()
                    .map(Value::from_json)
                    .collect::<Result<_, _>>()?,
            ),
            serde_json::Value::Object(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| Ok((k.clone(), Value::from_json(v)?)))
                    .collect::<Result<_, ValueError>>()?,
            ),
            serde_json::Value::Null => Value::String(String::new()),
        })
    }
}

/// Errors converting persisted JSON back into attribute values
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValueError {
    #[error("Number {0} has no integer attribute representation")]
    NonIntegerNumber(serde_json::Number),
}

/// Parse `${binding.attribute}` into its parts
fn parse_interpolation(s: &str) -> Option<(String, String)> {
    let inner = s.strip_prefix("${")?.strip_suffix('}')?;
    let (binding, attribute) = inner.split_once('.')?;
    if binding.is_empty() || attribute.is_empty() || attribute.contains("${") {
        return None;
    }
    Some((binding.to_string(), attribute.to_string()))
}

/// A single desired-state declaration
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub id: ResourceId,
    /// Graph-node name other declarations use in `Value::Ref`
    pub binding: String,
    pub attributes: HashMap<String, Value>,
    /// Marks resources whose payload must be redacted in display output
    pub sensitive: bool,
}

impl Resource {
    /// Create a resource whose binding defaults to its name
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: ResourceId::new(resource_type, name.clone()),
            binding: name,
            attributes: HashMap::new(),
            sensitive: false,
        }
    }

    pub fn with_binding(mut self, binding: impl Into<String>) -> Self {
        self.binding = binding.into();
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn with_sensitive(mut self, sensitive: bool) -> Self {
        self.sensitive = sensitive;
        self
    }

    /// Get an attribute value by key
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}

/// Recorded state of a converged resource
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub id: ResourceId,
    /// Engine-assigned identifier (e.g., vpc-xxx)
    pub identifier: Option<String>,
    pub attributes: HashMap<String, Value>,
    /// Whether this state exists
    pub exists: bool,
}

impl State {
    pub fn not_found(id: ResourceId) -> Self {
        Self {
            id,
            identifier: None,
            attributes: HashMap::new(),
            exists: false,
        }
    }

    pub fn existing(id: ResourceId, attributes: HashMap<String, Value>) -> Self {
        Self {
            id,
            identifier: None,
            attributes,
            exists: true,
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }
}
