//! Sandboxed file tools
//!
//! All three operate on bare file names inside one directory. Names with
//! path separators or `..` are refused.

use parley_config::paths::is_plain_filename;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::tools::function::{string_arg, FunctionTool};
use crate::tools::schema::{ParamType, SchemaError};
use crate::tools::{ToolDescriptor, ToolError};

fn sandboxed(dir: &Path, filename: &str) -> Result<PathBuf, ToolError> {
    if !is_plain_filename(filename) {
        return Err(ToolError::InvalidArguments(format!(
            "{} is not a plain file name",
            filename
        )));
    }
    Ok(dir.join(filename))
}

pub fn list_files(dir: &Path) -> Result<ToolDescriptor, SchemaError> {
    let dir = Arc::new(dir.to_path_buf());
    FunctionTool::builder("list_files")
        .description("List the files that are available")
        .handler(move |_| {
            let dir = dir.clone();
            async move {
                tokio::fs::create_dir_all(dir.as_path()).await?;
                let mut entries = tokio::fs::read_dir(dir.as_path()).await?;
                let mut names = Vec::new();
                while let Some(entry) = entries.next_entry().await? {
                    if entry.file_type().await?.is_file() {
                        names.push(entry.file_name().to_string_lossy().into_owned());
                    }
                }
                names.sort();

                if names.is_empty() {
                    Ok("No files available".to_string())
                } else {
                    Ok(format!("Files available: {}", names.join(", ")))
                }
            }
        })
        .build()
}

pub fn read_file(dir: &Path) -> Result<ToolDescriptor, SchemaError> {
    let dir = Arc::new(dir.to_path_buf());
    FunctionTool::builder("read_file")
        .description("Read the content of a file")
        .typed("filename", ParamType::String, "The name of the file to read")
        .handler(move |args| {
            let dir = dir.clone();
            async move {
                let path = sandboxed(&dir, string_arg(&args, "filename")?)?;
                debug!("◆ READING {:?}", path);
                Ok(tokio::fs::read_to_string(&path).await?)
            }
        })
        .build()
}

pub fn write_file(dir: &Path) -> Result<ToolDescriptor, SchemaError> {
    let dir = Arc::new(dir.to_path_buf());
    FunctionTool::builder("write_file")
        .description("Write content to a file, replacing it if it exists")
        .typed("filename", ParamType::String, "The name of the file to write to")
        .typed("content", ParamType::String, "The content to write to the file")
        .handler(move |args| {
            let dir = dir.clone();
            async move {
                let filename = string_arg(&args, "filename")?;
                let path = sandboxed(&dir, filename)?;
                let content = string_arg(&args, "content")?;

                tokio::fs::create_dir_all(dir.as_path()).await?;
                debug!("◆ WRITING {:?}", path);
                tokio::fs::write(&path, content).await?;
                Ok(format!("Successfully wrote to {}", filename))
            }
        })
        .build()
}
