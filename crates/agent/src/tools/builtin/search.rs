use serde_json::Value;
use tracing::debug;

use super::{client, endpoint_url, HTTP_TIMEOUT, USER_AGENT};
use crate::tools::function::{string_arg, FunctionTool};
use crate::tools::schema::{ParamType, SchemaError};
use crate::tools::{ToolDescriptor, ToolError};

const MAX_RESULTS: usize = 5;

/// Top results from the DuckDuckGo instant answer API at `base`
pub fn search_internet(base: &str) -> Result<ToolDescriptor, SchemaError> {
    let base = base.to_string();
    FunctionTool::builder("search_internet")
        .description("Searches the internet for the given query and returns the top search results")
        .typed("query", ParamType::String, "The search query")
        .handler(move |args| {
            let base = base.clone();
            async move {
                let query = string_arg(&args, "query")?;
                let mut url = endpoint_url(&base, &[])?;
                url.query_pairs_mut()
                    .append_pair("q", query)
                    .append_pair("format", "json")
                    .append_pair("no_html", "1")
                    .append_pair("skip_disambig", "1");
                debug!("◆ WEB SEARCH: {}", query);

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
                let results = top_results(&data);
                if results.is_empty() {
                    return Ok(format!("No results found for {}", query));
                }
                Ok(results.join("\n"))
            }
        })
        .build()
}

/// Abstract first, then related topics, flattening topic groups
fn top_results(data: &Value) -> Vec<String> {
    let mut results = Vec::new();

    let summary = data["AbstractText"].as_str().unwrap_or_default();
    if !summary.is_empty() {
        results.push(entry(summary, data["AbstractURL"].as_str()));
    }

    let mut topics: Vec<&Value> = Vec::new();
    for topic in data["RelatedTopics"].as_array().into_iter().flatten() {
        match topic["Topics"].as_array() {
            Some(group) => topics.extend(group),
            None => topics.push(topic),
        }
    }

    for topic in topics {
        if results.len() == MAX_RESULTS {
            break;
        }
        if let Some(text) = topic["Text"].as_str().filter(|t| !t.is_empty()) {
            results.push(entry(text, topic["FirstURL"].as_str()));
        }
    }

    results
}

fn entry(text: &str, url: Option<&str>) -> String {
    match url.filter(|u| !u.is_empty()) {
        Some(url) => format!("- {} ({})", text, url),
        None => format!("- {}", text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_top_results_order_and_limit() {
        let data = json!({
            "AbstractText": "Rust is a systems language.",
            "AbstractURL": "https://en.wikipedia.org/wiki/Rust",
            "RelatedTopics": [
                {"Text": "Cargo", "FirstURL": "https://doc.rust-lang.org/cargo"},
                {"Name": "Tools", "Topics": [
                    {"Text": "rustup", "FirstURL": "https://rustup.rs"},
                    {"Text": "clippy", "FirstURL": ""}
                ]},
                {"Text": "crates.io", "FirstURL": "https://crates.io"},
                {"Text": "docs.rs", "FirstURL": "https://docs.rs"}
            ]
        });

        assert_eq!(
            top_results(&data),
            vec![
                "- Rust is a systems language. (https://en.wikipedia.org/wiki/Rust)",
                "- Cargo (https://doc.rust-lang.org/cargo)",
                "- rustup (https://rustup.rs)",
                "- clippy",
                "- crates.io (https://crates.io)",
            ]
        );
    }

    #[test]
    fn test_top_results_empty() {
        assert!(top_results(&json!({"AbstractText": "", "RelatedTopics": []})).is_empty());
    }
}
