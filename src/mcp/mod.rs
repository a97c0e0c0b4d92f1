//! Model Context Protocol surface: the stdio server loop and the fixed tool
//! catalog it exposes.

pub mod server;
pub mod tools;

pub const SERVER_NAME: &str = "qwen-mcp-server";
pub const SERVER_TITLE: &str = "Qwen MCP Server";
