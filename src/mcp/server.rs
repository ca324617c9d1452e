//! MCP server implementation for QR code footprint generation.
//!
//! This module implements the MCP server lifecycle:
//!
//! 1. **Initialisation**: Capability negotiation and version agreement
//! 2. **Operation**: Handling tool calls and other requests
//! 3. **Shutdown**: Graceful connection termination
//!
//! # Tools
//!
//! - `generate_qr_footprint`: build a footprint and return or write it as
//!   a KiCad `.kicad_mod` file
//! - `preview_qr_footprint`: build a footprint and return an ASCII rendering
//!
//! Tool arguments are [`QrFootprintParams`] fields layered over the defaults
//! from the configuration file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::footprint::{generate, generate_kicad, QrFootprintParams};
use crate::mcp::protocol::{
    ErrorCode, IncomingMessage, JsonRpcError, JsonRpcErrorData, JsonRpcNotification,
    JsonRpcRequest, JsonRpcResponse, RequestId, MCP_PROTOCOL_VERSION, SERVER_NAME,
};
use crate::mcp::transport::StdioTransport;
use crate::surface::{footprint_name_for, FootprintBody};

/// Tool argument keys that are not footprint parameters.
const TOOL_ONLY_KEYS: [&str; 4] = ["output_path", "footprint_name", "include_primitives", "cell"];

/// Server state in the MCP lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Waiting for initialize request.
    AwaitingInit,
    /// Initialize received, waiting for initialized notification.
    Initialising,
    /// Ready for normal operation.
    Running,
    /// Shutdown in progress.
    ShuttingDown,
}

/// Server capabilities advertised during initialisation.
#[derive(Debug, Clone, Serialize)]
pub struct ServerCapabilities {
    /// Tool-related capabilities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolCapabilities>,
}

impl Default for ServerCapabilities {
    fn default() -> Self {
        Self {
            tools: Some(ToolCapabilities::default()),
        }
    }
}

/// Tool-specific capabilities.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ToolCapabilities {
    /// Whether the tool list can change during the session.
    #[serde(rename = "listChanged", skip_serializing_if = "is_false")]
    pub list_changed: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)] // skip_serializing_if takes fn(&T) -> bool
const fn is_false(b: &bool) -> bool {
    !*b
}

/// Server information for initialisation response.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Client information received during initialisation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    #[serde(default)]
    pub version: Option<String>,
}

/// Parameters for the initialize request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version requested by client.
    pub protocol_version: String,
    /// Client capabilities.
    #[serde(default)]
    pub capabilities: Value,
    /// Client information.
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

/// A tool definition for tools/list response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: Value,
}

/// Parameters for tools/call request.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallParams {
    /// Name of the tool to call.
    pub name: String,
    /// Arguments for the tool.
    #[serde(default)]
    pub arguments: Value,
}

/// Content item in a tool call response.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

/// Result of a tool call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
    /// Whether the tool call resulted in an error.
    #[serde(skip_serializing_if = "is_false")]
    pub is_error: bool,
}

impl ToolCallResult {
    /// Creates a successful text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// Creates an error text result.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: message.into(),
            }],
            is_error: true,
        }
    }

    /// Creates a result holding pretty-printed JSON.
    fn json(value: &Value, is_error: bool) -> Self {
        let text = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
        if is_error {
            Self::error(text)
        } else {
            Self::text(text)
        }
    }

    /// Returns the text of the first content item.
    #[must_use]
    pub fn first_text(&self) -> Option<&str> {
        self.content.first().map(|c| match c {
            ToolContent::Text { text } => text.as_str(),
        })
    }
}

/// The MCP server for QR code footprint generation.
pub struct McpServer {
    /// Current server state.
    state: ServerState,
    /// The transport layer.
    transport: StdioTransport,
    /// Negotiated protocol version (set after initialisation).
    protocol_version: Option<String>,
    /// Parameters used where a tool call leaves a field out.
    defaults: QrFootprintParams,
    /// Default preview resolution in mm per character.
    preview_cell: Option<f64>,
    /// Directories footprints may be written into.
    allowed_paths: Vec<PathBuf>,
}

impl McpServer {
    /// Creates a new MCP server with the given parameter defaults and
    /// allowed output paths.
    #[must_use]
    pub fn new(defaults: QrFootprintParams, allowed_paths: Vec<PathBuf>) -> Self {
        Self {
            state: ServerState::AwaitingInit,
            transport: StdioTransport::new(),
            protocol_version: None,
            defaults,
            preview_cell: None,
            allowed_paths,
        }
    }

    /// Sets the default preview resolution.
    #[must_use]
    pub fn with_preview_cell(mut self, cell: Option<f64>) -> Self {
        self.preview_cell = cell;
        self
    }

    /// Returns the current server state.
    #[must_use]
    pub const fn state(&self) -> ServerState {
        self.state
    }

    /// Returns the negotiated protocol version, once initialised.
    #[must_use]
    pub fn protocol_version(&self) -> Option<&str> {
        self.protocol_version.as_deref()
    }

    /// Validates that a path is within one of the allowed paths.
    ///
    /// Returns `Ok(())` if the path is allowed, or an error message if not.
    fn validate_path(&self, path: &Path) -> Result<(), String> {
        if self.allowed_paths.is_empty() {
            return Ok(());
        }

        // Output files usually do not exist yet, so resolve the parent
        let canonical_path = if path.exists() {
            path.canonicalize()
                .map_err(|e| format!("Failed to resolve path '{}': {e}", path.display()))?
        } else {
            let parent = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let filename = path.file_name().ok_or_else(|| {
                format!("Invalid path '{}': no filename specified", path.display())
            })?;
            let canonical_parent = parent.canonicalize().map_err(|e| {
                format!(
                    "Parent directory '{}' does not exist or is inaccessible: {e}",
                    parent.display()
                )
            })?;
            canonical_parent.join(filename)
        };

        for allowed in &self.allowed_paths {
            let Ok(canonical_allowed) = allowed.canonicalize() else {
                continue;
            };

            if canonical_path.starts_with(&canonical_allowed) {
                return Ok(());
            }
        }

        // Do not echo the resolved path back to the client
        Err("Access denied: path is outside the configured allowed directories".to_string())
    }

    /// Runs the MCP server main loop with graceful shutdown handling.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn run(&mut self) -> std::io::Result<()> {
        self.run_with_shutdown().await
    }

    /// Runs the main loop and handles shutdown.
    #[cfg(unix)]
    async fn run_with_shutdown(&mut self) -> std::io::Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt()).map_err(std::io::Error::other)?;
        let mut sigterm = signal(SignalKind::terminate()).map_err(std::io::Error::other)?;

        loop {
            tokio::select! {
                _ = sigint.recv() => {
                    info!("Received SIGINT, initiating graceful shutdown");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                _ = sigterm.recv() => {
                    info!("Received SIGTERM, initiating graceful shutdown");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                line_result = self.transport.read_line() => {
                    if self.handle_transport_result(line_result).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Runs the main loop and handles shutdown.
    #[cfg(windows)]
    async fn run_with_shutdown(&mut self) -> std::io::Result<()> {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    info!("Received Ctrl+C, initiating graceful shutdown");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                line_result = self.transport.read_line() => {
                    if self.handle_transport_result(line_result).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Handles the result from transport read.
    ///
    /// Returns `true` if the server should shut down.
    async fn handle_transport_result(
        &mut self,
        line_result: std::io::Result<Option<String>>,
    ) -> std::io::Result<bool> {
        let Some(line) = line_result? else {
            self.state = ServerState::ShuttingDown;
            return Ok(true);
        };

        if line.trim().is_empty() {
            return Ok(false);
        }

        self.handle_line(&line).await?;

        Ok(self.state == ServerState::ShuttingDown)
    }

    /// Handles a single line of input.
    async fn handle_line(&mut self, line: &str) -> std::io::Result<()> {
        use crate::mcp::protocol::parse_message;

        match parse_message(line) {
            Ok(msg) => self.handle_message(msg).await,
            Err(error) => self.transport.write_error(&error).await,
        }
    }

    /// Handles a parsed incoming message.
    async fn handle_message(&mut self, msg: IncomingMessage) -> std::io::Result<()> {
        match msg {
            IncomingMessage::Request(req) => {
                let response = self.dispatch(&req);
                match response {
                    Ok(resp) => self.transport.write_response(&resp).await,
                    Err(error) => self.transport.write_error(&error).await,
                }
            }
            IncomingMessage::Notification(ref notif) => {
                self.handle_notification(notif);
                Ok(())
            }
        }
    }

    /// Routes a request to its handler.
    fn dispatch(&mut self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        debug!(id = %req.id, method = %req.method, "Handling request");
        match req.method.as_str() {
            "initialize" => self.handle_initialize(req),
            "tools/list" => self.handle_tools_list(req),
            "tools/call" => self.handle_tools_call(req),
            "ping" => Ok(Self::handle_ping(req)),
            _ => Err(JsonRpcError::method_not_found(req.id.clone(), &req.method)),
        }
    }

    /// Handles an incoming notification.
    fn handle_notification(&mut self, notif: &JsonRpcNotification) {
        if notif.method == "notifications/initialized" && self.state == ServerState::Initialising {
            self.state = ServerState::Running;
        }
    }

    /// Handles the initialize request.
    fn handle_initialize(&mut self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        if self.state != ServerState::AwaitingInit {
            return Err(JsonRpcError::new(
                Some(req.id.clone()),
                JsonRpcErrorData::with_message(
                    ErrorCode::InvalidRequest,
                    "Server already initialised",
                ),
            ));
        }

        let params: InitializeParams = req
            .params
            .as_ref()
            .map(|p| serde_json::from_value(p.clone()))
            .transpose()
            .map_err(|e| {
                JsonRpcError::invalid_params(
                    req.id.clone(),
                    format!("Invalid initialize params: {e}"),
                )
            })?
            .ok_or_else(|| {
                JsonRpcError::invalid_params(req.id.clone(), "Missing initialize params")
            })?;

        if let Some(client) = &params.client_info {
            info!(
                client = %client.name,
                requested_version = %params.protocol_version,
                "Client connected"
            );
        }

        let negotiated_version = MCP_PROTOCOL_VERSION.to_string();

        self.protocol_version = Some(negotiated_version.clone());
        self.state = ServerState::Initialising;

        let result = json!({
            "protocolVersion": negotiated_version,
            "capabilities": ServerCapabilities::default(),
            "serverInfo": ServerInfo::default(),
        });

        Ok(JsonRpcResponse::success(req.id.clone(), result))
    }

    /// Handles the tools/list request.
    fn handle_tools_list(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;

        let result = json!({
            "tools": Self::tool_definitions(),
        });

        Ok(JsonRpcResponse::success(req.id.clone(), result))
    }

    /// Handles the tools/call request.
    fn handle_tools_call(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;

        let params: ToolCallParams = req
            .params
            .as_ref()
            .map(|p| serde_json::from_value(p.clone()))
            .transpose()
            .map_err(|e| {
                JsonRpcError::invalid_params(
                    req.id.clone(),
                    format!("Invalid tool call params: {e}"),
                )
            })?
            .ok_or_else(|| {
                JsonRpcError::invalid_params(req.id.clone(), "Missing tool call params")
            })?;

        let result = self.call_tool(&params.name, &params.arguments);

        let result_value = serde_json::to_value(&result).map_err(|e| {
            tracing::error!(error = %e, "Failed to serialise tool call result");
            JsonRpcError::internal_error(
                req.id.clone(),
                "Internal error: failed to serialise result",
            )
        })?;

        Ok(JsonRpcResponse::success(req.id.clone(), result_value))
    }

    /// Handles the ping request.
    fn handle_ping(req: &JsonRpcRequest) -> JsonRpcResponse {
        JsonRpcResponse::success(req.id.clone(), json!({}))
    }

    /// Ensures the server is in the Running state.
    fn require_running(&self, id: &RequestId) -> Result<(), JsonRpcError> {
        if self.state != ServerState::Running {
            return Err(JsonRpcError::new(
                Some(id.clone()),
                JsonRpcErrorData::with_message(ErrorCode::InvalidRequest, "Server not initialised"),
            ));
        }
        Ok(())
    }

    /// Returns the list of available tools.
    #[must_use]
    pub fn tool_definitions() -> Vec<ToolDefinition> {
        let mut generate_props = footprint_param_schema();
        generate_props.insert(
            "footprint_name".to_string(),
            json!({
                "type": "string",
                "description": "Footprint name. Derived from content when omitted (QR_<content>)"
            }),
        );
        generate_props.insert(
            "output_path".to_string(),
            json!({
                "type": "string",
                "description": "Optional: write the .kicad_mod file here (must be inside an allowed directory). \
                                When omitted the footprint text is returned instead"
            }),
        );
        generate_props.insert(
            "include_primitives".to_string(),
            json!({
                "type": "boolean",
                "description": "Also return every placed primitive as JSON (default false)"
            }),
        );

        let mut preview_props = footprint_param_schema();
        preview_props.insert(
            "cell".to_string(),
            json!({
                "type": "number",
                "description": "Millimetres per character (default: one module)"
            }),
        );

        vec![
            ToolDefinition {
                name: "generate_qr_footprint".to_string(),
                description: Some(
                    "Encode text as a QR or Micro QR code and build a PCB footprint from it. \
                     Modules are drawn as filled squares (or SMD pads) on front copper and/or \
                     silkscreen, with an optional solder mask opening, a courtyard and \
                     value/reference labels. Returns a summary and KiCad .kicad_mod output. \
                     All dimensions are in millimetres (mm). Omitted parameters use the \
                     server's configured defaults."
                        .to_string(),
                ),
                input_schema: json!({
                    "type": "object",
                    "properties": generate_props,
                }),
            },
            ToolDefinition {
                name: "preview_qr_footprint".to_string(),
                description: Some(
                    "Build a QR code footprint and return an ASCII rendering of it for a quick \
                     visual check. Takes the same parameters as generate_qr_footprint. \
                     Legend: # copper, o silkscreen, . mask opening, * courtyard edge."
                        .to_string(),
                ),
                input_schema: json!({
                    "type": "object",
                    "properties": preview_props,
                }),
            },
        ]
    }

    /// Executes a tool by name.
    #[must_use]
    pub fn call_tool(&self, name: &str, arguments: &Value) -> ToolCallResult {
        match name {
            "generate_qr_footprint" => self.call_generate(arguments),
            "preview_qr_footprint" => self.call_preview(arguments),
            _ => ToolCallResult::error(format!("Unknown tool: {name}")),
        }
    }

    // ==================== Tool Handlers ====================

    /// Layers the footprint fields of `arguments` over the server defaults.
    fn params_from_arguments(&self, arguments: &Value) -> Result<QrFootprintParams, String> {
        let overrides = match arguments {
            Value::Null => return Ok(self.defaults.clone()),
            Value::Object(map) => map,
            _ => return Err("Tool arguments must be an object".to_string()),
        };

        let mut merged = match serde_json::to_value(&self.defaults) {
            Ok(Value::Object(map)) => map,
            _ => return Err("Internal error: failed to serialise defaults".to_string()),
        };
        for (key, value) in overrides {
            if !TOOL_ONLY_KEYS.contains(&key.as_str()) {
                merged.insert(key.clone(), value.clone());
            }
        }

        serde_json::from_value(Value::Object(merged)).map_err(|e| format!("Invalid parameters: {e}"))
    }

    /// Generates a footprint and returns or writes it.
    fn call_generate(&self, arguments: &Value) -> ToolCallResult {
        let params = match self.params_from_arguments(arguments) {
            Ok(p) => p,
            Err(e) => return ToolCallResult::error(e),
        };

        let name = arguments
            .get("footprint_name")
            .and_then(Value::as_str)
            .map_or_else(|| footprint_name_for(&params.content), str::to_string);
        let output_path = arguments.get("output_path").and_then(Value::as_str);
        let include_primitives = arguments
            .get("include_primitives")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        // Reject the destination before doing any work
        if let Some(path) = output_path {
            if let Err(e) = self.validate_path(Path::new(path)) {
                return ToolCallResult::error(e);
            }
        }

        let (footprint, report) = match generate_kicad(&params, name) {
            Ok(generated) => generated,
            Err(e) => {
                let result = json!({
                    "status": "error",
                    "error": e.to_string(),
                });
                return ToolCallResult::json(&result, true);
            }
        };

        let mut result = json!({
            "status": "success",
            "footprint_name": footprint.name,
            "description": footprint.description,
            "report": report,
        });

        if let Some(path) = output_path {
            if let Err(e) = footprint.write(path) {
                return ToolCallResult::error(format!("Failed to write footprint: {e}"));
            }
            result["output_path"] = json!(path);
        } else {
            result["kicad_mod"] = json!(footprint.to_sexpr());
        }

        if include_primitives {
            result["primitives"] = json!(footprint.body());
        }

        ToolCallResult::json(&result, false)
    }

    /// Generates a footprint and renders it as ASCII art.
    fn call_preview(&self, arguments: &Value) -> ToolCallResult {
        let params = match self.params_from_arguments(arguments) {
            Ok(p) => p,
            Err(e) => return ToolCallResult::error(e),
        };

        let cell = arguments
            .get("cell")
            .and_then(Value::as_f64)
            .or(self.preview_cell)
            .unwrap_or(params.pixel_size);
        if cell <= 0.0 {
            return ToolCallResult::error("cell must be greater than 0");
        }

        let mut body = FootprintBody::new();
        let report = match generate(&params, &mut body) {
            Ok(report) => report,
            Err(e) => {
                let result = json!({
                    "status": "error",
                    "error": e.to_string(),
                });
                return ToolCallResult::json(&result, true);
            }
        };

        let result = json!({
            "status": "success",
            "report": report,
            "cell_mm": cell,
            "ascii_art": body.render_ascii(cell),
        });

        ToolCallResult::json(&result, false)
    }
}

/// JSON schema properties shared by both tools.
fn footprint_param_schema() -> Map<String, Value> {
    let schema = json!({
        "content": {
            "type": "string",
            "description": "Text to encode. Also used as the footprint value"
        },
        "pixel_size": {
            "type": "number",
            "description": "Edge length of one module in mm"
        },
        "border_auto": {
            "type": "boolean",
            "description": "Use the recommended quiet zone (4 modules for QR, 2 for Micro QR)"
        },
        "border": {
            "type": "integer",
            "minimum": 0,
            "description": "Quiet zone in modules, used when border_auto is false"
        },
        "allow_compact_format": {
            "type": "boolean",
            "description": "Allow Micro QR when the content fits"
        },
        "negative": {
            "type": "boolean",
            "description": "Draw light modules instead of dark ones"
        },
        "use_copper_layer": {
            "type": "boolean",
            "description": "Draw modules on front copper"
        },
        "use_silk_layer": {
            "type": "boolean",
            "description": "Draw modules on front silkscreen"
        },
        "mask_cut_out": {
            "type": "boolean",
            "description": "Open the solder mask over the whole symbol"
        },
        "copper_style": {
            "type": "string",
            "enum": ["polygon", "pad"],
            "description": "Draw copper modules as filled polygons or SMD pads"
        },
        "reference": {
            "type": "string",
            "description": "Reference designator text"
        },
        "text_height": { "type": "number", "description": "Label height in mm" },
        "text_width": { "type": "number", "description": "Label width in mm" },
        "text_thickness": { "type": "number", "description": "Label stroke in mm" }
    });

    match schema {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
