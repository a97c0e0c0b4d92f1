//! Newline-delimited JSON-RPC server over stdio.
//!
//! Each inbound line is decoded into a typed protocol message and every
//! request is handled on its own task, so a slow tool call never blocks
//! `ping` or `tools/list`. Responses funnel through one mutex-guarded writer
//! so concurrent handlers cannot interleave partial lines. Lines that are
//! not valid JSON are skipped; JSON that carries a request id but no
//! recognizable method gets a JSON-RPC error back.

use std::sync::Arc;

use rust_mcp_schema::schema_utils::{
    ClientJsonrpcRequest, ClientMessage, FromMessage, MessageFromServer, ResultFromServer,
    ServerMessage,
};
use rust_mcp_schema::{
    Implementation, InitializeResult, ListToolsResult, RequestId, RpcError, ServerCapabilities,
    ServerCapabilitiesTools,
};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::core::config::Config;
use crate::mcp::{tools, SERVER_NAME, SERVER_TITLE};

pub struct McpServer {
    config: Arc<Config>,
}

impl McpServer {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Serve on stdin/stdout until stdin closes.
    pub async fn run(self) -> Result<(), String> {
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    pub(crate) async fn serve<R, W>(self, input: R, output: W) -> Result<(), String>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        info!(server = SERVER_NAME, "listening on stdio");
        let writer = Arc::new(Mutex::new(output));
        let mut lines = BufReader::new(input).lines();
        let mut handlers: JoinSet<()> = JoinSet::new();

        while let Ok(Some(line)) = lines.next_line().await {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let value = match serde_json::from_str::<Value>(trimmed) {
                Ok(value) => value,
                Err(err) => {
                    debug!(error = %err, "skipping unparseable input line");
                    continue;
                }
            };
            self.dispatch_value(&writer, &mut handlers, value).await;
        }

        // Let in-flight tool calls finish writing before shutdown.
        while handlers.join_next().await.is_some() {}
        info!("stdin closed, shutting down");
        Ok(())
    }

    async fn dispatch_value<W>(
        &self,
        writer: &Arc<Mutex<W>>,
        handlers: &mut JoinSet<()>,
        value: Value,
    ) where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        match serde_json::from_value::<ClientMessage>(value.clone()) {
            Ok(ClientMessage::Request(request)) => {
                let config = self.config.clone();
                let writer = writer.clone();
                handlers.spawn(async move {
                    handle_request(config, writer, request).await;
                });
            }
            Ok(ClientMessage::Notification(_)) => {
                debug!("client notification received");
            }
            Ok(_) => {
                debug!("ignoring non-request client message");
            }
            Err(err) => {
                // JSON that carries a request id still deserves an answer,
                // even when the method is unknown to the schema.
                if let Some(request_id) = request_id_of(&value) {
                    let method = value
                        .get("method")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown");
                    warn!(method, "unsupported request method");
                    let message = format!("Method not supported: {method}");
                    let error = RpcError::method_not_found().with_message(&message);
                    send_error(writer, request_id, error).await;
                } else {
                    debug!(error = %err, "ignoring unrecognized client message");
                }
            }
        }
    }
}

async fn handle_request<W>(
    config: Arc<Config>,
    writer: Arc<Mutex<W>>,
    request: ClientJsonrpcRequest,
) where
    W: AsyncWrite + Send + Unpin + 'static,
{
    match request {
        ClientJsonrpcRequest::InitializeRequest(request) => {
            debug!(request_id = ?request.id, "initialize requested");
            let result = initialize_result(&request.params.protocol_version);
            send_result(
                &writer,
                request.id,
                ResultFromServer::InitializeResult(result),
            )
            .await;
        }
        ClientJsonrpcRequest::PingRequest(request) => {
            send_result(
                &writer,
                request.id,
                ResultFromServer::Result(rust_mcp_schema::Result::default()),
            )
            .await;
        }
        ClientJsonrpcRequest::ListToolsRequest(request) => {
            let result = ListToolsResult {
                meta: None,
                next_cursor: None,
                tools: tools::tool_definitions(),
            };
            send_result(&writer, request.id, ResultFromServer::ListToolsResult(result)).await;
        }
        ClientJsonrpcRequest::CallToolRequest(request) => {
            debug!(request_id = ?request.id, tool = %request.params.name, "tool call");
            let result = tools::call_tool(&config, request.params).await;
            send_result(&writer, request.id, ResultFromServer::CallToolResult(result)).await;
        }
        other => {
            let request_id = other.request_id().clone();
            let method = other.method().to_string();
            warn!(method = %method, "unsupported request method");
            let message = format!("Method not supported: {method}");
            let error = RpcError::method_not_found().with_message(&message);
            send_error(&writer, request_id, error).await;
        }
    }
}

fn initialize_result(protocol_version: &str) -> InitializeResult {
    InitializeResult {
        capabilities: ServerCapabilities {
            tools: Some(ServerCapabilitiesTools::default()),
            ..ServerCapabilities::default()
        },
        instructions: Some(
            "Bridges MCP tool calls to the locally installed Qwen Code CLI. \
             Use ask-qwen for questions; @path references in the prompt inline file contents."
                .to_string(),
        ),
        meta: None,
        protocol_version: protocol_version.to_string(),
        server_info: Implementation {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            title: Some(SERVER_TITLE.to_string()),
            description: Some("MCP stdio bridge to the Qwen Code CLI".to_string()),
            icons: Vec::new(),
            website_url: None,
        },
    }
}

fn request_id_of(value: &Value) -> Option<RequestId> {
    match value.get("id") {
        Some(Value::Number(number)) => number.as_i64().map(RequestId::Integer),
        Some(Value::String(text)) => Some(RequestId::String(text.clone())),
        _ => None,
    }
}

async fn send_result<W>(writer: &Arc<Mutex<W>>, request_id: RequestId, result: ResultFromServer)
where
    W: AsyncWrite + Send + Unpin,
{
    let message = match ServerMessage::from_message(
        MessageFromServer::ResultFromServer(result),
        Some(request_id.clone()),
    ) {
        Ok(message) => message,
        Err(err) => {
            warn!(request_id = ?request_id, error = %err, "failed to assemble response");
            return;
        }
    };
    write_message(writer, &message).await;
}

async fn send_error<W>(writer: &Arc<Mutex<W>>, request_id: RequestId, error: RpcError)
where
    W: AsyncWrite + Send + Unpin,
{
    let message = match ServerMessage::from_message(
        MessageFromServer::Error(error),
        Some(request_id.clone()),
    ) {
        Ok(message) => message,
        Err(err) => {
            warn!(request_id = ?request_id, error = %err, "failed to assemble error response");
            return;
        }
    };
    write_message(writer, &message).await;
}

async fn write_message<W>(writer: &Arc<Mutex<W>>, message: &ServerMessage)
where
    W: AsyncWrite + Send + Unpin,
{
    let payload = match serde_json::to_string(message) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(error = %err, "failed to serialize response");
            return;
        }
    };
    let mut writer = writer.lock().await;
    if let Err(err) = writer.write_all(payload.as_bytes()).await {
        warn!(error = %err, "failed to write response");
        return;
    }
    if let Err(err) = writer.write_all(b"\n").await {
        warn!(error = %err, "failed to write response newline");
        return;
    }
    if let Err(err) = writer.flush().await {
        warn!(error = %err, "failed to flush response");
    }
}
