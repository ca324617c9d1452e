//! qrcode-footprint: QR code PCB footprint generator
//!
//! Turns a text string into a printed-circuit footprint that carries the
//! string as a scannable QR (or Micro QR) code, drawn on front copper and/or
//! silkscreen.
//!
//! # Architecture
//!
//! - **Matrix source** ([`barcode`]): encodes text into a square module grid
//! - **Layout engine** ([`footprint::layout`]): places one square per drawn
//!   module, centred on the origin
//! - **Footprint assembler** ([`footprint::assembler`]): mask opening,
//!   courtyard and labels around the symbol
//! - **Drawing surfaces** ([`surface`]): where the primitives end up, either
//!   an in-memory recorder or a KiCad `.kicad_mod` file
//!
//! Generation is planned up front and then emitted in one pass, so a failed
//! run never leaves a partly drawn footprint behind.
//!
//! # Modules
//!
//! - [`config`]: configuration loading and validation
//! - [`error`]: error types
//! - [`mcp`]: MCP server exposing generation as tools

pub mod barcode;
pub mod config;
pub mod error;
pub mod footprint;
pub mod mcp;
pub mod surface;
