use super::*;
use rust_mcp_schema::CallToolRequestParams;
use serde_json::json;

fn params(name: &str, arguments: Value) -> CallToolRequestParams {
    let mut params = CallToolRequestParams::new(name);
    if let Value::Object(map) = arguments {
        params = params.with_arguments(map);
    }
    params
}

fn result_text(result: &CallToolResult) -> String {
    result
        .content
        .iter()
        .map(|block| match block {
            ContentBlock::TextContent(text) => text.text.clone(),
            _ => String::new(),
        })
        .collect()
}

#[test]
fn catalog_lists_the_four_tools() {
    let names: Vec<String> = tool_definitions()
        .into_iter()
        .map(|tool| tool.name)
        .collect();
    assert_eq!(
        names,
        vec![TOOL_PING, TOOL_HELP, TOOL_ASK_QWEN, TOOL_SANDBOX_TEST]
    );
}

#[tokio::test]
async fn ping_returns_pong() {
    let result = call_tool(&Config::default(), params(TOOL_PING, json!({}))).await;
    assert_eq!(result.is_error, None);
    assert_eq!(result_text(&result), "pong");
}

#[tokio::test]
async fn help_lists_every_tool() {
    let result = call_tool(&Config::default(), params(TOOL_HELP, json!({}))).await;
    let catalog: Value = serde_json::from_str(&result_text(&result)).expect("help is JSON");
    let entries = catalog.as_array().expect("help is an array");
    assert_eq!(entries.len(), 4);
    assert!(entries
        .iter()
        .all(|entry| entry.get("name").is_some() && entry.get("description").is_some()));
}

#[tokio::test]
async fn sandbox_echoes_a_truncated_prefix() {
    let code = "x".repeat(300);
    let result = call_tool(
        &Config::default(),
        params(TOOL_SANDBOX_TEST, json!({ "code": code, "language": "python" })),
    )
    .await;
    assert_eq!(
        result_text(&result),
        format!("Code execution result:\n{}...", "x".repeat(SANDBOX_ECHO_LIMIT))
    );
}

#[tokio::test]
async fn sandbox_requires_code() {
    let result = call_tool(&Config::default(), params(TOOL_SANDBOX_TEST, json!({}))).await;
    assert_eq!(result.is_error, Some(true));
}

#[tokio::test]
async fn unknown_tool_is_flagged_as_an_error() {
    let result = call_tool(&Config::default(), params("bogus", json!({}))).await;
    assert_eq!(result.is_error, Some(true));
    assert!(result_text(&result).contains("Unknown tool: bogus"));
}

#[tokio::test]
async fn ask_qwen_requires_a_prompt() {
    let result = call_tool(&Config::default(), params(TOOL_ASK_QWEN, json!({}))).await;
    assert_eq!(result.is_error, Some(true));
}

#[cfg(unix)]
mod with_stub_cli {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    fn write_stub(dir: &Path, body: &str) -> String {
        let path = dir.join("qwen");
        std::fs::write(&path, format!("#!/bin/sh\n{body}")).expect("write stub");
        let mut perms = std::fs::metadata(&path).expect("stub metadata").permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).expect("mark stub executable");
        path.display().to_string()
    }

    fn stub_config(binary: String) -> Config {
        Config {
            binary: Some(binary),
            model: None,
            timeout_ms: Some(5_000),
            max_attempts: Some(1),
            retry_delay_ms: Some(0),
        }
    }

    #[tokio::test]
    async fn ask_qwen_resolves_references_and_returns_content() {
        let dir = tempfile::tempdir().expect("tempdir");
        // Echo the full prompt back so the resolved text is observable.
        let binary = write_stub(
            dir.path(),
            "case \"$1\" in\n  --version) exit 0;;\n  *) printf '%s' \"$2\";;\nesac",
        );
        let notes = dir.path().join("notes.txt");
        std::fs::write(&notes, "abc").expect("write notes");

        let result = call_tool(
            &stub_config(binary),
            params(
                TOOL_ASK_QWEN,
                json!({ "prompt": format!("Summarize @{}", notes.display()) }),
            ),
        )
        .await;

        assert_eq!(result.is_error, None);
        let text = result_text(&result);
        assert!(text.contains(&format!("Content of {}:", notes.display())), "got: {text}");
        assert!(text.contains("abc"), "got: {text}");
    }

    #[tokio::test]
    async fn ask_qwen_wraps_client_failures() {
        let dir = tempfile::tempdir().expect("tempdir");
        let binary = write_stub(
            dir.path(),
            "case \"$1\" in\n  --version) exit 0;;\n  *) echo 'quota exhausted' >&2; exit 1;;\nesac",
        );

        let result = call_tool(
            &stub_config(binary),
            params(TOOL_ASK_QWEN, json!({ "prompt": "hello" })),
        )
        .await;

        assert_eq!(result.is_error, Some(true));
        let text = result_text(&result);
        assert!(text.starts_with("Error communicating with Qwen:"), "got: {text}");
        assert!(text.contains("quota exhausted"), "got: {text}");
    }
}
