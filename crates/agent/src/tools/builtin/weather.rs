use tracing::debug;

use super::{client, endpoint_url, HTTP_TIMEOUT, USER_AGENT};
use crate::tools::function::{string_arg, FunctionTool};
use crate::tools::schema::{ParamType, SchemaError};
use crate::tools::{ToolDescriptor, ToolError};

pub fn get_current_weather(base: &str) -> Result<ToolDescriptor, SchemaError> {
    let base = base.to_string();
    FunctionTool::builder("get_current_weather")
        .description(
            "Get the current weather for a location. When a location includes a US state, \
             use the two letter state abbreviation.",
        )
        .typed("location", ParamType::String, "The location to get the weather for")
        .handler(move |args| {
            let base = base.clone();
            async move {
                let location = string_arg(&args, "location")?;
                let mut url = endpoint_url(&base, &[location])?;
                url.set_query(Some("format=%C+%t"));
                debug!("◆ WEATHER LOOKUP: {}", url);

                let response = client()
                    .get(url)
                    .header("User-Agent", USER_AGENT)
                    .timeout(HTTP_TIMEOUT)
                    .send()
                    .await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(ToolError::Failed(format!(
                        "Failed to get weather data, status code: {}",
                        status.as_u16()
                    )));
                }

                let report = response.text().await?;
                Ok(format!("The weather in {} is {}.", location, report.trim()))
            }
        })
        .build()
}
