use tracing::debug;

use super::{client, HTTP_TIMEOUT, USER_AGENT};
use crate::tools::function::{string_arg, FunctionTool};
use crate::tools::schema::{ParamType, SchemaError};
use crate::tools::{ToolDescriptor, ToolError};

const WRAP_WIDTH: usize = 120;

pub fn visit_webpage() -> Result<ToolDescriptor, SchemaError> {
    FunctionTool::builder("visit_webpage")
        .description("Visit a webpage and return its content as markdown-like text")
        .typed("url", ParamType::String, "The URL of the webpage to visit")
        .handler(|args| async move {
            let url = string_arg(&args, "url")?;
            debug!("◆ FETCHING PAGE: {}", url);

            let response = client()
                .get(url)
                .header("User-Agent", USER_AGENT)
                .timeout(HTTP_TIMEOUT)
                .send()
                .await?;
            let status = response.status();
            if !status.is_success() {
                return Err(ToolError::Failed(format!(
                    "Failed to fetch data: {}",
                    status.as_u16()
                )));
            }

            let body = response.bytes().await?;
            html_to_text(&body)
        })
        .build()
}

/// Render HTML as text and squeeze runs of blank lines
pub(crate) fn html_to_text(html: &[u8]) -> Result<String, ToolError> {
    let text = html2text::config::plain()
        .string_from_read(html, WRAP_WIDTH)
        .map_err(|e| ToolError::Failed(format!("could not render page: {}", e)))?;
    Ok(collapse_blank_lines(text.trim()))
}

fn collapse_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut newlines = 0;
    for c in text.chars() {
        if c == '\n' {
            newlines += 1;
            if newlines > 2 {
                continue;
            }
        } else {
            newlines = 0;
        }
        out.push(c);
    }
    out
}
