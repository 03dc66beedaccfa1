//! OpenVPN client profile library.
//!
//! Models a user-editable VPN connection profile, validates it, resolves
//! credential material (keystore aliases, PKCS12 archives, passwords) and
//! compiles the profile into the textual configuration consumed by the
//! OpenVPN engine process.

pub mod compile;
pub mod connection;
pub mod credentials;
pub mod embed;
pub mod error;
pub mod keystore;
pub mod pipeline;
pub mod profile;
pub mod store;
pub mod types;
pub mod validate;

// Re-export main types
pub use compile::Compiler;
pub use connection::Connection;
pub use error::{Error, Result};
pub use profile::VpnProfile;
pub use validate::ValidationOutcome;

// Client identification emitted into the generated config.
// The engine reports these to the server via IV_* environment variables.
pub const CLIENT_STRING: &str = env!("CARGO_PKG_NAME");
pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

// Engine contract constants
pub const MGMT_SOCKET_NAME: &str = "mgmtsocket";

// Embedded files above this size are rejected at import time
pub const MAX_EMBED_FILE_SIZE: u64 = 2048 * 1024; // 2048kB

/// Default mssfix value offered when clamping is first enabled.
pub const DEFAULT_MSSFIX_SIZE: u32 = 1280;

/// The engine's own built-in mssfix value; emitting it as a bare directive
/// keeps the generated config byte-stable across engine upgrades.
pub const ENGINE_MSSFIX_DEFAULT: u32 = 1450;

pub const DEFAULT_DNS1: &str = "8.8.8.8";
pub const DEFAULT_DNS2: &str = "8.8.4.4";

// Priority lists emitted when the profile leaves the value unset.
// Order is significant; the engine tries entries front to back.
pub const TLS_VERSIONS: [&str; 4] = ["TLSv1.3", "TLSv1.2", "TLSv1.1", "TLSv1"];
pub const CIPHER_LIST: [&str; 4] = ["AES-256-CBC", "AES-192-CBC", "AES-128-CBC", "BF-CBC"];
pub const AUTH_LIST: [&str; 2] = ["SHA256", "SHA1"];
