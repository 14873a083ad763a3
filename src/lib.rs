//! crudsync settings server
//!
//! Stores one settings document per user and exposes it, plus per-item
//! MCP server endpoints, over HTTP.

pub mod server;
