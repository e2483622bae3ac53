//! Parameter schema synthesis
//!
//! Turns a declared parameter list into the `{type: "function", function:
//! {...}}` object the completion endpoint expects. Parameters without a
//! default are required.

use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("tool name {0:?} must be 1-64 letters, digits, '_' or '-'")]
    InvalidName(String),

    #[error("tool {tool}: parameter {param} declared twice")]
    DuplicateParameter { tool: String, param: String },

    #[error("tool {tool}: parameter {param} has unsupported type {annotation:?}")]
    UnsupportedType {
        tool: String,
        param: String,
        annotation: String,
    },

    #[error("tool {0}: no handler")]
    MissingHandler(String),
}

/// JSON-schema primitive a parameter maps to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    /// Element type when known
    Array(Option<Box<ParamType>>),
    Object,
}

impl ParamType {
    pub fn array_of(item: ParamType) -> Self {
        ParamType::Array(Some(Box::new(item)))
    }

    pub fn json_schema(&self) -> Value {
        match self {
            ParamType::String => json!({"type": "string"}),
            ParamType::Integer => json!({"type": "integer"}),
            ParamType::Number => json!({"type": "number"}),
            ParamType::Boolean => json!({"type": "boolean"}),
            ParamType::Array(None) => json!({"type": "array"}),
            ParamType::Array(Some(item)) => json!({"type": "array", "items": item.json_schema()}),
            ParamType::Object => json!({"type": "object"}),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::String => f.write_str("string"),
            ParamType::Integer => f.write_str("integer"),
            ParamType::Number => f.write_str("number"),
            ParamType::Boolean => f.write_str("boolean"),
            ParamType::Array(None) => f.write_str("array"),
            ParamType::Array(Some(item)) => write!(f, "array<{}>", item),
            ParamType::Object => f.write_str("object"),
        }
    }
}

/// Strip a `list[...]` / `Vec<...>` style wrapper, returning the inner text
fn generic_inner<'a>(annotation: &'a str, heads: &[&str]) -> Option<&'a str> {
    for head in heads {
        for (open, close) in [('[', ']'), ('<', '>')] {
            let rest = annotation.strip_prefix(head).and_then(|r| r.strip_prefix(open));
            if let Some(inner) = rest.and_then(|r| r.strip_suffix(close)) {
                return Some(inner.trim());
            }
        }
    }
    None
}

const LIST_HEADS: &[&str] = &["list", "List", "Vec", "array", "Array", "sequence", "Sequence"];
const MAP_HEADS: &[&str] = &["dict", "Dict", "HashMap", "BTreeMap", "Map", "map", "object"];

impl FromStr for ParamType {
    type Err = String;

    /// Accepts common annotation spellings: `str`, `int`, `float`, `bool`,
    /// `list[T]`, `Vec<T>`, `dict`, `i64`, `f64` and so on.
    fn from_str(annotation: &str) -> Result<Self, Self::Err> {
        let annotation = annotation.trim();

        if let Some(inner) = generic_inner(annotation, LIST_HEADS) {
            return Ok(ParamType::array_of(inner.parse()?));
        }
        if generic_inner(annotation, MAP_HEADS).is_some() {
            return Ok(ParamType::Object);
        }

        match annotation {
            "str" | "string" | "String" | "&str" | "char" => Ok(ParamType::String),
            "int" | "integer" | "i8" | "i16" | "i32" | "i64" | "isize" | "u8" | "u16" | "u32"
            | "u64" | "usize" => Ok(ParamType::Integer),
            "float" | "number" | "f32" | "f64" => Ok(ParamType::Number),
            "bool" | "boolean" => Ok(ParamType::Boolean),
            "list" | "List" | "array" | "Vec" => Ok(ParamType::Array(None)),
            "dict" | "Dict" | "object" | "map" | "Map" => Ok(ParamType::Object),
            other => Err(other.to_string()),
        }
    }
}

/// Where a parameter's type came from
#[derive(Debug, Clone, PartialEq)]
enum TypeSpec {
    Resolved(ParamType),
    Annotation(String),
}

/// One declared parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    ty: TypeSpec,
    pub default: Option<Value>,
    pub description: Option<String>,
}

impl Param {
    pub fn required(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty: TypeSpec::Resolved(ty),
            default: None,
            description: None,
        }
    }

    pub fn optional(name: impl Into<String>, ty: ParamType, default: impl Into<Value>) -> Self {
        Self {
            default: Some(default.into()),
            ..Self::required(name, ty)
        }
    }

    /// Parameter typed by an annotation string, checked when the schema is built
    pub fn annotated(name: impl Into<String>, annotation: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: TypeSpec::Annotation(annotation.into()),
            default: None,
            description: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }

    fn resolve(&self, tool: &str) -> Result<ParamType, SchemaError> {
        match &self.ty {
            TypeSpec::Resolved(ty) => Ok(ty.clone()),
            TypeSpec::Annotation(annotation) => {
                annotation
                    .parse()
                    .map_err(|_| SchemaError::UnsupportedType {
                        tool: tool.to_string(),
                        param: self.name.clone(),
                        annotation: annotation.clone(),
                    })
            }
        }
    }
}

pub fn validate_name(name: &str) -> Result<(), SchemaError> {
    let valid = (1..=64).contains(&name.len())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(SchemaError::InvalidName(name.to_string()))
    }
}

/// `{type: "object", properties, required}` for a parameter list
pub fn parameters_schema(tool: &str, params: &[Param]) -> Result<Value, SchemaError> {
    let mut seen = HashSet::new();
    let mut properties = Map::new();
    let mut required = Vec::new();

    for param in params {
        if !seen.insert(param.name.as_str()) {
            return Err(SchemaError::DuplicateParameter {
                tool: tool.to_string(),
                param: param.name.clone(),
            });
        }

        let mut property = param.resolve(tool)?.json_schema();
        if let Some(description) = &param.description {
            property["description"] = json!(description);
        }
        match &param.default {
            Some(default) => property["default"] = default.clone(),
            None => required.push(json!(param.name)),
        }
        properties.insert(param.name.clone(), property);
    }

    Ok(json!({
        "type": "object",
        "properties": properties,
        "required": required,
    }))
}

/// Full function-calling schema
pub fn function_schema(name: &str, description: &str, params: &[Param]) -> Result<Value, SchemaError> {
    validate_name(name)?;
    Ok(json!({
        "type": "function",
        "function": {
            "name": name,
            "description": description,
            "parameters": parameters_schema(name, params)?,
        }
    }))
}
