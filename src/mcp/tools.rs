//! The fixed tool catalog and its dispatch.
//!
//! Tool failures never surface as transport errors: every outcome becomes a
//! text result, flagged with `is_error` when something went wrong, so the
//! connected client always receives content-or-error.

use std::collections::HashMap;
use std::path::PathBuf;

use rust_mcp_schema::{
    CallToolRequestParams, CallToolResult, ContentBlock, TextContent, Tool, ToolInputSchema,
};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::core::config::Config;
use crate::core::constants::SANDBOX_ECHO_LIMIT;
use crate::core::qwen::QwenClient;
use crate::utils::file_reference;

pub const TOOL_PING: &str = "ping";
pub const TOOL_HELP: &str = "help";
pub const TOOL_ASK_QWEN: &str = "ask-qwen";
pub const TOOL_SANDBOX_TEST: &str = "sandbox-test";

const DESC_PING: &str = "Simple ping tool to test the connection";
const DESC_HELP: &str = "Get help information about available tools";
const DESC_ASK_QWEN: &str = "Ask Qwen model a question or analyze a file/directory";
const DESC_SANDBOX_TEST: &str = "Execute code in a safe sandbox environment";

/// The catalog advertised by `tools/list`.
pub fn tool_definitions() -> Vec<Tool> {
    vec![
        tool(TOOL_PING, DESC_PING, empty_schema()),
        tool(TOOL_HELP, DESC_HELP, empty_schema()),
        tool(TOOL_ASK_QWEN, DESC_ASK_QWEN, ask_qwen_schema()),
        tool(TOOL_SANDBOX_TEST, DESC_SANDBOX_TEST, sandbox_schema()),
    ]
}

fn tool(name: &str, description: &str, input_schema: ToolInputSchema) -> Tool {
    Tool {
        annotations: None,
        description: Some(description.to_string()),
        execution: None,
        icons: Vec::new(),
        input_schema,
        meta: None,
        name: name.to_string(),
        output_schema: None,
        title: None,
    }
}

fn empty_schema() -> ToolInputSchema {
    ToolInputSchema::new(Vec::new(), None, None)
}

fn ask_qwen_schema() -> ToolInputSchema {
    ToolInputSchema::new(
        vec!["prompt".to_string()],
        Some(properties(&[
            (
                "prompt",
                "The question or instruction; @path references are inlined",
            ),
            ("context", "Extra context prepended to the prompt"),
        ])),
        None,
    )
}

fn sandbox_schema() -> ToolInputSchema {
    ToolInputSchema::new(
        vec!["code".to_string()],
        Some(properties(&[
            ("code", "Code to run in the sandbox"),
            ("language", "Language of the submitted code"),
        ])),
        None,
    )
}

fn properties(fields: &[(&str, &str)]) -> HashMap<String, Map<String, Value>> {
    fields
        .iter()
        .map(|(name, description)| {
            let mut schema = Map::new();
            schema.insert("type".to_string(), Value::String("string".to_string()));
            schema.insert(
                "description".to_string(),
                Value::String((*description).to_string()),
            );
            ((*name).to_string(), schema)
        })
        .collect()
}

/// Execute one tool call.
pub async fn call_tool(config: &Config, params: CallToolRequestParams) -> CallToolResult {
    let arguments = params.arguments.clone().unwrap_or_default();
    match params.name.as_str() {
        TOOL_PING => text_result("pong".to_string()),
        TOOL_HELP => text_result(help_text()),
        TOOL_ASK_QWEN => ask_qwen(config, &arguments).await,
        TOOL_SANDBOX_TEST => sandbox_test(&arguments),
        other => error_result(format!("Unknown tool: {other}")),
    }
}

fn help_text() -> String {
    serde_json::to_string_pretty(&json!([
        { "name": TOOL_PING, "description": DESC_PING },
        { "name": TOOL_HELP, "description": DESC_HELP },
        { "name": TOOL_ASK_QWEN, "description": DESC_ASK_QWEN },
        { "name": TOOL_SANDBOX_TEST, "description": DESC_SANDBOX_TEST },
    ]))
    .unwrap_or_default()
}

async fn ask_qwen(config: &Config, arguments: &Map<String, Value>) -> CallToolResult {
    let Some(prompt) = arguments.get("prompt").and_then(Value::as_str) else {
        return error_result("ask-qwen requires a string `prompt` argument".to_string());
    };
    let context = arguments.get("context").and_then(Value::as_str);

    let base_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let resolved_prompt = file_reference::resolve_file_references(prompt, &base_dir);

    let api_key = std::env::var("QWEN_API_KEY").ok();
    let client = QwenClient::new(config.client_config(api_key));
    debug!(
        prompt_len = resolved_prompt.len(),
        has_context = context.is_some(),
        "dispatching ask-qwen"
    );
    let response = client.ask(&resolved_prompt, context).await;

    match response.error {
        None => text_result(response.content),
        Some(error) => error_result(format!("Error communicating with Qwen: {error}")),
    }
}

fn sandbox_test(arguments: &Map<String, Value>) -> CallToolResult {
    let Some(code) = arguments.get("code").and_then(Value::as_str) else {
        return error_result("sandbox-test requires a string `code` argument".to_string());
    };
    let language = arguments
        .get("language")
        .and_then(Value::as_str)
        .unwrap_or("unknown");
    debug!(language, "sandbox execution requested");

    // No execution happens here; the sandbox only echoes what it received.
    let prefix: String = code.chars().take(SANDBOX_ECHO_LIMIT).collect();
    text_result(format!("Code execution result:\n{prefix}..."))
}

fn text_result(text: String) -> CallToolResult {
    CallToolResult {
        content: vec![ContentBlock::TextContent(TextContent::new(
            text, None, None,
        ))],
        is_error: None,
        meta: None,
        structured_content: None,
    }
}

fn error_result(text: String) -> CallToolResult {
    CallToolResult {
        content: vec![ContentBlock::TextContent(TextContent::new(
            text, None, None,
        ))],
        is_error: Some(true),
        meta: None,
        structured_content: None,
    }
}

#[cfg(test)]
mod tests;
