//! A single candidate server connection within a profile.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Proxy used to reach the server, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProxyType {
    #[default]
    None,
    Http,
    Socks5,
}

pub const DEFAULT_CONNECT_TIMEOUT: u32 = 120;

/// One server endpoint with its transport and proxy settings.
///
/// Owned exclusively by one profile; cloning a profile deep-copies its
/// connection list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub server_name: String,

    /// Kept as text; user input is validated, not coerced
    #[serde(default = "default_server_port")]
    pub server_port: String,

    #[serde(default = "default_true")]
    pub use_udp: bool,

    /// TCP connect timeout in seconds; 0 means the engine default
    #[serde(default)]
    pub connect_timeout: u32,

    #[serde(default)]
    pub use_custom_config: bool,

    #[serde(default)]
    pub custom_config: String,

    #[serde(default)]
    pub proxy_type: ProxyType,

    #[serde(default)]
    pub proxy_name: String,

    #[serde(default = "default_proxy_port")]
    pub proxy_port: String,

    #[serde(default)]
    pub use_proxy_auth: bool,

    #[serde(default)]
    pub proxy_auth_username: String,

    #[serde(default)]
    pub proxy_auth_password: String,
}

fn default_true() -> bool {
    true
}
fn default_server_port() -> String {
    "1194".to_string()
}
fn default_proxy_port() -> String {
    "1080".to_string()
}

impl Default for Connection {
    fn default() -> Self {
        Self {
            enabled: true,
            server_name: String::new(),
            server_port: default_server_port(),
            use_udp: true,
            connect_timeout: 0,
            use_custom_config: false,
            custom_config: String::new(),
            proxy_type: ProxyType::None,
            proxy_name: String::new(),
            proxy_port: default_proxy_port(),
            use_proxy_auth: false,
            proxy_auth_username: String::new(),
            proxy_auth_password: String::new(),
        }
    }
}

impl Connection {
    /// Effective TCP connect timeout.
    pub fn connect_timeout(&self) -> u32 {
        if self.connect_timeout > 0 {
            self.connect_timeout
        } else {
            DEFAULT_CONNECT_TIMEOUT
        }
    }

    /// Whether this entry is self-consistent enough to produce a connection
    /// block: non-empty server address, parseable ports.
    pub fn check(&self) -> bool {
        if self.server_name.is_empty() || self.server_port.is_empty() {
            return false;
        }
        if self.server_port.parse::<u16>().is_err() {
            return false;
        }

        if self.proxy_type != ProxyType::None {
            if self.proxy_name.is_empty() || self.proxy_port.is_empty() {
                return false;
            }
            if self.proxy_port.parse::<u16>().is_err() {
                return false;
            }
        }

        true
    }

    /// Whether the custom config carries proxy options of its own. The
    /// engine's management channel must not also negotiate a system proxy
    /// for such connections.
    pub fn uses_extra_proxy_options(&self) -> bool {
        self.use_custom_config && self.custom_config.contains("http-proxy-option ")
    }

    /// Whether any proxy is configured for this connection.
    pub fn uses_proxy(&self) -> bool {
        self.proxy_type != ProxyType::None || self.uses_extra_proxy_options()
    }

    /// Render the contents of one `<connection>` block.
    pub fn connection_block(&self) -> Result<String> {
        if !self.check() {
            return Err(Error::illegal("connection block format error"));
        }

        let mut cfg = String::new();

        // IPv6 literals get the 6-suffixed transport
        let ipv6_addr = self.server_name.contains(':');
        cfg.push_str(&format!("remote {} {}", self.server_name, self.server_port));
        if self.use_udp {
            cfg.push_str(if ipv6_addr { " udp6\n" } else { " udp\n" });
        } else {
            cfg.push_str(if ipv6_addr {
                " tcp6-client\n"
            } else {
                " tcp-client\n"
            });
            if self.connect_timeout != 0 {
                cfg.push_str(&format!("connect-timeout {}\n", self.connect_timeout));
            }
        }

        if self.proxy_type == ProxyType::Http {
            cfg.push_str(&format!("http-proxy {} {}\n", self.proxy_name, self.proxy_port));
            if self.use_proxy_auth {
                cfg.push_str(&format!(
                    "<http-proxy-user-pass>\n{}\n{}\n</http-proxy-user-pass>\n",
                    self.proxy_auth_username, self.proxy_auth_password
                ));
            }
        }

        if self.proxy_type == ProxyType::Socks5 {
            cfg.push_str(&format!("socks-proxy {} {}\n", self.proxy_name, self.proxy_port));
        }

        if self.use_custom_config && !self.custom_config.is_empty() {
            cfg.push_str(&self.custom_config);
            cfg.push('\n');
        }

        Ok(cfg.trim().to_string())
    }
}
