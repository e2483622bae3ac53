use serde_json::Value;
use tracing::debug;

use super::{client, endpoint_url, HTTP_TIMEOUT, USER_AGENT};
use crate::tools::function::{string_arg, FunctionTool};
use crate::tools::schema::{ParamType, SchemaError};
use crate::tools::{ToolDescriptor, ToolError};

pub fn fetch_stock_price(base: &str) -> Result<ToolDescriptor, SchemaError> {
    let base = base.to_string();
    FunctionTool::builder("fetch_stock_price")
        .description("Takes the ticker symbol for a stock and returns its current price in USD")
        .typed("ticker_symbol", ParamType::String, "Stock ticker symbol, e.g. AAPL")
        .handler(move |args| {
            let base = base.clone();
            async move {
                let ticker = string_arg(&args, "ticker_symbol")?;
                let url = endpoint_url(&base, &["v8", "finance", "chart", ticker])?;
                debug!("◆ QUOTE LOOKUP: {}", url);

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

                let data: Value = response.json().await?;
                match data.pointer("/chart/result/0/meta/regularMarketPrice") {
                    Some(Value::Number(price)) => Ok(price.to_string()),
                    _ => Err(ToolError::Failed(format!("No price found for {}", ticker))),
                }
            }
        })
        .build()
}
