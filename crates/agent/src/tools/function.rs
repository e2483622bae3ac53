//! In-process function tools
//!
//! ```ignore
//! let tool = FunctionTool::builder("get_current_weather")
//!     .description("Current weather for a city")
//!     .param("location", "str")
//!     .optional("units", "str", "metric")
//!     .handler(|args| async move { Ok(format!("{:?}", args)) })
//!     .build()?;
//! ```

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;

use super::schema::{self, Param, ParamType, SchemaError};
use super::{Invoke, ToolDescriptor, ToolError};

type Handler =
    Arc<dyn Fn(Map<String, Value>) -> BoxFuture<'static, Result<String, ToolError>> + Send + Sync>;

/// A local async function with declared parameters
pub struct FunctionTool {
    params: Vec<Param>,
    handler: Handler,
}

impl FunctionTool {
    pub fn builder(name: impl Into<String>) -> FunctionToolBuilder {
        FunctionToolBuilder {
            name: name.into(),
            description: String::new(),
            params: Vec::new(),
            handler: None,
        }
    }

    /// Apply defaults and reject calls missing a required argument
    fn complete(&self, mut args: Map<String, Value>) -> Result<Map<String, Value>, ToolError> {
        for param in &self.params {
            if args.contains_key(&param.name) {
                continue;
            }
            match &param.default {
                Some(default) => {
                    args.insert(param.name.clone(), default.clone());
                }
                None => return Err(ToolError::MissingArgument(param.name.clone())),
            }
        }
        Ok(args)
    }
}

#[async_trait]
impl Invoke for FunctionTool {
    async fn invoke(&self, args: Map<String, Value>) -> Result<String, ToolError> {
        let args = self.complete(args)?;
        (self.handler)(args).await
    }
}

pub struct FunctionToolBuilder {
    name: String,
    description: String,
    params: Vec<Param>,
    handler: Option<Handler>,
}

impl FunctionToolBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Required parameter typed by annotation (`"str"`, `"int"`, `"list[str]"`, ...)
    pub fn param(mut self, name: impl Into<String>, annotation: &str) -> Self {
        self.params.push(Param::annotated(name, annotation));
        self
    }

    /// Optional parameter with a default
    pub fn optional(
        mut self,
        name: impl Into<String>,
        annotation: &str,
        default: impl Into<Value>,
    ) -> Self {
        self.params
            .push(Param::annotated(name, annotation).with_default(default));
        self
    }

    /// Required parameter with a typed schema and a description
    pub fn typed(mut self, name: impl Into<String>, ty: ParamType, description: &str) -> Self {
        self.params
            .push(Param::required(name, ty).describe(description));
        self
    }

    pub fn with_param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn handler<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, ToolError>> + Send + 'static,
    {
        self.handler = Some(Arc::new(move |args| Box::pin(handler(args))));
        self
    }

    /// Synthesize the schema. Duplicate parameters, unknown annotations,
    /// bad names and a missing handler are reported here, never at call time.
    pub fn build(self) -> Result<ToolDescriptor, SchemaError> {
        schema::validate_name(&self.name)?;
        let parameters = schema::parameters_schema(&self.name, &self.params)?;
        let handler = self
            .handler
            .ok_or_else(|| SchemaError::MissingHandler(self.name.clone()))?;

        let tool = FunctionTool {
            params: self.params,
            handler,
        };
        Ok(ToolDescriptor::new(
            self.name,
            self.description,
            parameters,
            Arc::new(tool),
        ))
    }
}

/// String argument by name
pub fn string_arg<'a>(args: &'a Map<String, Value>, name: &str) -> Result<&'a str, ToolError> {
    match args.get(name) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(ToolError::InvalidArguments(format!(
            "{} must be a string, got {}",
            name, other
        ))),
        None => Err(ToolError::MissingArgument(name.to_string())),
    }
}
