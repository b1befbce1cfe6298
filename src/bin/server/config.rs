//! Configuration types for the server and CLI.

/// Configuration for the HTTP server.
#[derive(Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}
