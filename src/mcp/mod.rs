//! Model Context Protocol (MCP) server.
//!
//! Exposes footprint generation as tools to AI assistants. The server talks
//! JSON-RPC 2.0 over stdio: one message per line on stdin, responses on
//! stdout, logs on stderr.
//!
//! ```text
//!   stdin ──▶ StdioTransport ──▶ McpServer ──▶ footprint::generate
//!   stdout ◀──────────────────────────┘
//! ```
//!
//! Targets MCP protocol version 2024-11-05.

pub mod protocol;
pub mod server;
pub mod transport;

pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION};
pub use server::McpServer;
pub use transport::StdioTransport;
