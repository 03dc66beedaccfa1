//! The in-memory VPN connection profile.
//!
//! A profile describes everything needed to bring up one tunnel: identity,
//! authentication material, candidate server connections, routing and DNS
//! policy, TLS parameters and advanced overrides. Profiles are mutated
//! freely during editing; consistency is only enforced at validation and
//! compile time.

use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::connection::Connection;
use crate::embed::FileSource;
use crate::{DEFAULT_DNS1, DEFAULT_DNS2};

/// Authentication mode. Each variant carries exactly the fields that mode
/// needs; username/password/protect-password live on the profile since they
/// are shared across modes and may be supplied at connection time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AuthType {
    /// Interactive username/password only
    UserPass,

    /// Username/password plus a PKCS12 archive
    UserPassPkcs12 { pkcs12: FileSource },

    /// PKCS12 archive only
    Pkcs12 { pkcs12: FileSource },

    /// Username/password plus a platform-keystore private key
    UserPassKeystore { alias: String },

    /// Platform-keystore private key only
    Keystore { alias: String },
}

impl AuthType {
    /// Whether this mode asks the user for a username/password.
    pub fn requires_user_password(&self) -> bool {
        matches!(
            self,
            AuthType::UserPass | AuthType::UserPassPkcs12 { .. } | AuthType::UserPassKeystore { .. }
        )
    }

    /// Whether this mode unlocks a PKCS12 archive.
    pub fn uses_pkcs12(&self) -> bool {
        matches!(self, AuthType::Pkcs12 { .. } | AuthType::UserPassPkcs12 { .. })
    }

    /// Whether this mode signs with a platform-keystore key.
    pub fn uses_keystore(&self) -> bool {
        matches!(self, AuthType::Keystore { .. } | AuthType::UserPassKeystore { .. })
    }

    pub fn pkcs12(&self) -> Option<&FileSource> {
        match self {
            AuthType::Pkcs12 { pkcs12 } | AuthType::UserPassPkcs12 { pkcs12 } => Some(pkcs12),
            _ => None,
        }
    }

    pub fn alias(&self) -> Option<&str> {
        match self {
            AuthType::Keystore { alias } | AuthType::UserPassKeystore { alias } => Some(alias),
            _ => None,
        }
    }
}

/// How the server certificate's name is matched against the expected value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum X509VerifyMode {
    /// Deprecated 2.2-era matching; rejected by the validator
    TlsRemote,
    /// Deprecated matching plus the no-remapping compatibility directive
    TlsRemoteCompatNoremapping,
    /// Match the full distinguished name
    Dn,
    /// Match the common-name RDN
    #[default]
    Rdn,
    /// Match a prefix of the common-name RDN
    RdnPrefix,
}

/// Pre-shared tls-auth key material with its key direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsAuth {
    pub file: FileSource,
    /// "0" normal, "1" inverse, "" unspecified
    #[serde(default)]
    pub direction: String,
}

/// One VPN connection profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VpnProfile {
    // Identity
    uuid: Uuid,
    pub name: String,
    version: u32,

    // Authentication
    pub auth: AuthType,
    #[serde(default)]
    pub username: String,
    /// Stored auth password; empty means "ask at connect time"
    #[serde(default)]
    pub password: String,
    /// Stored PKCS12 protection password. `None` means "ask at connect
    /// time"; `Some("")` is a valid empty passphrase.
    #[serde(default)]
    pub protect_password: Option<String>,

    // Certificate material
    #[serde(default)]
    pub ca_file: Option<FileSource>,
    #[serde(default)]
    pub crl_file: Option<FileSource>,
    #[serde(default)]
    pub tls_auth: Option<TlsAuth>,

    // Server endpoints
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub remote_random: bool,
    #[serde(default)]
    pub use_random_hostname: bool,
    #[serde(default)]
    pub use_float: bool,

    // Retry tuning for TCP transports; kept as text, "" falls back to the
    // engine defaults and "-1" means unbounded retries
    #[serde(default = "default_retry_max")]
    pub connect_retry_max: String,
    #[serde(default = "default_retry")]
    pub connect_retry: String,
    #[serde(default = "default_retry_max_time")]
    pub connect_retry_max_time: String,

    // Addressing
    #[serde(default = "default_true")]
    pub use_pull: bool,
    #[serde(default = "default_true")]
    pub nobind: bool,
    #[serde(default)]
    pub ipv4_address: String,
    #[serde(default)]
    pub ipv6_address: String,
    #[serde(default)]
    pub tun_mtu: u32,
    #[serde(default)]
    pub mssfix: u32,
    #[serde(default)]
    pub persist_tun: bool,

    // Routing
    #[serde(default)]
    pub route_nopull: bool,
    #[serde(default)]
    pub allow_local_lan: bool,
    #[serde(default)]
    pub use_default_route: bool,
    #[serde(default)]
    pub custom_routes: String,
    #[serde(default)]
    pub excluded_routes: String,
    #[serde(default)]
    pub use_default_route_v6: bool,
    #[serde(default)]
    pub custom_routes_v6: String,

    // DNS
    #[serde(default)]
    pub override_dns: bool,
    #[serde(default = "default_dns1")]
    pub dns1: String,
    #[serde(default = "default_dns2")]
    pub dns2: String,
    #[serde(default)]
    pub search_domain: String,

    // Server identity verification
    #[serde(default)]
    pub expect_tls_cert: bool,
    #[serde(default)]
    pub check_remote_cn: bool,
    #[serde(default)]
    pub remote_cn: String,
    #[serde(default)]
    pub x509_verify_mode: X509VerifyMode,
    #[serde(default)]
    pub x509_username_field: String,

    // TLS/crypto policy; empty selects the built-in priority lists
    #[serde(default)]
    pub tls_version: String,
    #[serde(default)]
    pub cipher: String,
    #[serde(default)]
    pub auth_digest: String,
    #[serde(default = "default_true")]
    pub use_lzo: bool,

    // Advanced
    #[serde(default)]
    pub use_custom_config: bool,
    #[serde(default)]
    pub custom_config_options: String,
    #[serde(default)]
    pub allowed_apps: HashSet<String>,
    /// When true, `allowed_apps` is a deny list (VPN for everything except
    /// the listed apps); when false it is an allow list
    #[serde(default = "default_true")]
    pub allowed_apps_disallowed: bool,
    #[serde(default = "default_true")]
    pub block_unused_address_families: bool,

    // Bookkeeping
    #[serde(default)]
    pub last_used: u64,
    #[serde(default)]
    pub temporary: bool,
    #[serde(default = "default_true")]
    pub user_editable: bool,
}

fn default_true() -> bool {
    true
}
fn default_retry_max() -> String {
    "-1".to_string()
}
fn default_retry() -> String {
    "2".to_string()
}
fn default_retry_max_time() -> String {
    "300".to_string()
}
fn default_dns1() -> String {
    DEFAULT_DNS1.to_string()
}
fn default_dns2() -> String {
    DEFAULT_DNS2.to_string()
}

impl VpnProfile {
    /// Create a profile with a fresh identity and one default (incomplete)
    /// connection entry.
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            version: 0,
            auth: AuthType::UserPass,
            username: String::new(),
            password: String::new(),
            protect_password: None,
            ca_file: None,
            crl_file: None,
            tls_auth: None,
            connections: vec![Connection::default()],
            remote_random: false,
            use_random_hostname: false,
            use_float: false,
            connect_retry_max: default_retry_max(),
            connect_retry: default_retry(),
            connect_retry_max_time: default_retry_max_time(),
            use_pull: true,
            nobind: true,
            ipv4_address: String::new(),
            ipv6_address: String::new(),
            tun_mtu: 0,
            mssfix: 0,
            persist_tun: false,
            route_nopull: false,
            allow_local_lan: false,
            use_default_route: false,
            custom_routes: String::new(),
            excluded_routes: String::new(),
            use_default_route_v6: false,
            custom_routes_v6: String::new(),
            override_dns: false,
            dns1: default_dns1(),
            dns2: default_dns2(),
            search_domain: String::new(),
            expect_tls_cert: false,
            check_remote_cn: false,
            remote_cn: String::new(),
            x509_verify_mode: X509VerifyMode::default(),
            x509_username_field: String::new(),
            tls_version: String::new(),
            cipher: String::new(),
            auth_digest: String::new(),
            use_lzo: true,
            use_custom_config: false,
            custom_config_options: String::new(),
            allowed_apps: HashSet::new(),
            allowed_apps_disallowed: true,
            block_unused_address_families: true,
            last_used: now_millis(),
            temporary: false,
            user_editable: true,
        }
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn uuid_string(&self) -> String {
        self.uuid.to_string()
    }

    /// Display name; never empty.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "No profile name"
        } else {
            &self.name
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Bump the schema version. The version is strictly monotonic; going
    /// backwards or standing still is a programming error.
    pub fn set_version(&mut self, version: u32) {
        assert!(
            version > self.version,
            "profile version must increase ({} -> {version})",
            self.version
        );
        self.version = version;
    }

    /// Duplicate this profile under a new name with a fresh identity.
    ///
    /// Connections and the allowed-apps set are deep-copied; the copy shares
    /// no mutable state with the original.
    pub fn duplicate<S: Into<String>>(&self, name: S) -> Self {
        let mut copy = self.clone();
        copy.uuid = Uuid::new_v4();
        copy.name = name.into();
        copy
    }

    /// Restore the factory value for the fixed "safe reset" subset of
    /// fields. Authentication, connections and custom options are
    /// deliberately left untouched.
    pub fn reset_to_defaults(&mut self) {
        self.use_pull = true;
        self.use_lzo = true;
        self.tls_auth = None;
        self.expect_tls_cert = false;
        self.check_remote_cn = false;
        self.persist_tun = false;
        self.allow_local_lan = false;
        self.mssfix = 0;
        self.nobind = true;
        self.use_default_route = false;
        self.use_default_route_v6 = false;
    }

    /// First enabled connection, if any.
    pub fn first_enabled_connection(&self) -> Option<&Connection> {
        self.connections.iter().find(|c| c.enabled)
    }

    /// Whether any part of the profile configures its own proxy. When it
    /// does, the compiler must not also ask the management channel for the
    /// system proxy.
    pub fn uses_extra_proxy_options(&self) -> bool {
        if self.use_custom_config && self.custom_config_options.contains("http-proxy-option ") {
            return true;
        }
        self.connections.iter().any(|c| c.uses_proxy())
    }

    /// Record a connection attempt.
    pub fn touch(&mut self) {
        self.last_used = now_millis();
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
