//! Built-in example tools
//!
//! Nothing here is registered implicitly: the host passes the list from
//! [`default_tools`] (or its own selection) to the agent.

mod files;
mod search;
mod stock;
mod time;
mod weather;
mod webpage;

use std::path::Path;
use std::time::Duration;

use super::schema::SchemaError;
use super::ToolDescriptor;

pub use files::{list_files, read_file, write_file};
pub use search::search_internet;
pub use stock::fetch_stock_price;
pub use time::get_current_time;
pub use weather::get_current_weather;
pub use webpage::visit_webpage;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; parley/0.1)";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Remote services the network tools talk to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub weather: String,
    pub stock: String,
    pub search: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            weather: "https://wttr.in".to_string(),
            stock: "https://query1.finance.yahoo.com".to_string(),
            search: "https://api.duckduckgo.com".to_string(),
        }
    }
}

/// Every built-in tool, file tools confined to `files_dir`
pub fn default_tools(files_dir: &Path) -> Result<Vec<ToolDescriptor>, SchemaError> {
    tools_with(files_dir, &Endpoints::default())
}

pub fn tools_with(
    files_dir: &Path,
    endpoints: &Endpoints,
) -> Result<Vec<ToolDescriptor>, SchemaError> {
    Ok(vec![
        get_current_time()?,
        get_current_weather(&endpoints.weather)?,
        fetch_stock_price(&endpoints.stock)?,
        search_internet(&endpoints.search)?,
        visit_webpage()?,
        list_files(files_dir)?,
        read_file(files_dir)?,
        write_file(files_dir)?,
    ])
}

fn client() -> reqwest::Client {
    reqwest::Client::new()
}

/// `base` with `segments` appended as percent-encoded path segments
fn endpoint_url(base: &str, segments: &[&str]) -> Result<reqwest::Url, super::ToolError> {
    let mut url = reqwest::Url::parse(base)
        .map_err(|e| super::ToolError::Failed(format!("bad endpoint {}: {}", base, e)))?;
    url.path_segments_mut()
        .map_err(|_| super::ToolError::Failed(format!("bad endpoint {}", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tool_names() {
        let dir = tempfile::tempdir().unwrap();
        let names: Vec<String> = default_tools(dir.path())
            .unwrap()
            .into_iter()
            .map(|tool| tool.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "get_current_time",
                "get_current_weather",
                "fetch_stock_price",
                "search_internet",
                "visit_webpage",
                "list_files",
                "read_file",
                "write_file",
            ]
        );
    }

    #[test]
    fn test_endpoint_url_encodes_segments() {
        let url = endpoint_url("https://wttr.in", &["New York"]).unwrap();
        assert_eq!(url.as_str(), "https://wttr.in/New%20York");

        let url = endpoint_url("http://127.0.0.1:1234/", &["v8", "finance", "chart", "AAPL"]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:1234/v8/finance/chart/AAPL");
    }
}
