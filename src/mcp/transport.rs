//! stdio transport for the MCP server.
//!
//! - Messages are UTF-8 encoded JSON-RPC, one per line
//! - Messages must not contain embedded newlines
//! - stdin carries requests, stdout carries responses
//! - stderr is left to logging

use std::io;

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::mcp::protocol::{JsonRpcError, JsonRpcResponse};

/// A stdio-based MCP transport.
pub struct StdioTransport {
    /// Buffered reader for stdin.
    reader: BufReader<tokio::io::Stdin>,
    /// Handle for stdout.
    writer: tokio::io::Stdout,
}

impl StdioTransport {
    /// Creates a new stdio transport.
    #[must_use]
    pub fn new() -> Self {
        Self {
            reader: BufReader::new(tokio::io::stdin()),
            writer: tokio::io::stdout(),
        }
    }

    /// Reads the next message line from stdin.
    ///
    /// Returns `None` if stdin is closed (EOF).
    ///
    /// # Errors
    ///
    /// Returns an error if reading from stdin fails.
    pub async fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        Ok(Some(trim_line_ending(line)))
    }

    /// Writes a JSON-RPC response to stdout.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or writing fails.
    pub async fn write_response(&mut self, response: &JsonRpcResponse) -> io::Result<()> {
        self.write_message(response).await
    }

    /// Writes a JSON-RPC error to stdout.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or writing fails.
    pub async fn write_error(&mut self, error: &JsonRpcError) -> io::Result<()> {
        self.write_message(error).await
    }

    /// Serialises `message` and writes it with newline termination.
    async fn write_message<T: Serialize + Sync>(&mut self, message: &T) -> io::Result<()> {
        let json = to_line(message)?;
        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialises a message to a single line of JSON.
fn to_line<T: Serialize>(message: &T) -> io::Result<String> {
    let json =
        serde_json::to_string(message).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    debug_assert!(
        !json.contains('\n'),
        "JSON message must not contain embedded newlines"
    );
    Ok(json)
}

/// Strips a trailing `\n` or `\r\n`.
fn trim_line_ending(mut line: String) -> String {
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::RequestId;

    #[test]
    fn transport_default() {
        let _transport = StdioTransport::default();
    }

    #[test]
    fn trims_crlf() {
        assert_eq!(trim_line_ending("{}\r\n".to_string()), "{}");
        assert_eq!(trim_line_ending("{}\n".to_string()), "{}");
        assert_eq!(trim_line_ending("{}".to_string()), "{}");
    }

    #[tokio::test]
    async fn serialise_response_no_newlines() {
        // Tool results carry multi-line ASCII art; it must be escaped
        let response = JsonRpcResponse::success(
            RequestId::Number(1),
            serde_json::json!({ "render": "##  ##\n  ##  \n" }),
        );

        let json = to_line(&response).unwrap();
        assert!(!json.contains('\n'));
        assert!(json.contains(r"\n"));
    }

    #[tokio::test]
    async fn serialise_error_no_newlines() {
        let error = JsonRpcError::method_not_found(RequestId::Number(1), "test/method");
        let json = to_line(&error).unwrap();
        assert!(!json.contains('\n'));
    }
}
