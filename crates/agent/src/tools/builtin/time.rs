use chrono::Local;

use crate::tools::function::FunctionTool;
use crate::tools::schema::SchemaError;
use crate::tools::ToolDescriptor;

const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn get_current_time() -> Result<ToolDescriptor, SchemaError> {
    FunctionTool::builder("get_current_time")
        .description("Get the current local date and time as YYYY-MM-DD HH:MM:SS")
        .handler(|_| async { Ok(Local::now().format(FORMAT).to_string()) })
        .build()
}
