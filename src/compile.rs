//! Profile-to-configuration compiler.
//!
//! Renders a validated, credential-resolved profile into the line-oriented
//! configuration text the engine process consumes. Directive order is
//! significant: the engine applies options as it parses them, and
//! connection blocks must come last so global options apply to all of them.

use std::path::Path;

use tracing::debug;

use crate::credentials;
use crate::embed::{escape, insert_file_data};
use crate::error::{Error, Result};
use crate::keystore::{encode_pem_chain, CaBundleSupplier, Pkcs12Keystore, PlatformKeychain};
use crate::profile::{AuthType, VpnProfile, X509VerifyMode};
use crate::types::{parse_route_list, parse_route_list_v6, CidrIp};
use crate::{
    AUTH_LIST, CIPHER_LIST, CLIENT_STRING, CLIENT_VERSION, ENGINE_MSSFIX_DEFAULT,
    MGMT_SOCKET_NAME, TLS_VERSIONS,
};

/// Compiles profiles against a set of external capabilities.
pub struct Compiler<'a> {
    keychain: &'a dyn PlatformKeychain,
    archive_keystore: &'a dyn Pkcs12Keystore,
    ca_bundle: &'a dyn CaBundleSupplier,
    /// Directory holding the engine's management socket
    runtime_dir: &'a Path,
}

impl<'a> Compiler<'a> {
    pub fn new(
        keychain: &'a dyn PlatformKeychain,
        archive_keystore: &'a dyn Pkcs12Keystore,
        ca_bundle: &'a dyn CaBundleSupplier,
        runtime_dir: &'a Path,
    ) -> Self {
        Self {
            keychain,
            archive_keystore,
            ca_bundle,
            runtime_dir,
        }
    }

    /// Render the profile into config text.
    ///
    /// Deterministic: the same profile and capability state always produce
    /// byte-identical output. The profile is assumed validated; the hard
    /// invariants are still re-checked here.
    pub fn compile(&self, profile: &VpnProfile) -> Result<String> {
        debug!(profile = %profile.uuid(), "compiling profile");
        let mut cfg = String::with_capacity(4096);

        // Fixed engine-contract preamble
        cfg.push_str("# Config for OpenVPN 6.x\n");
        cfg.push_str(&format!("#? uuid {}\n", profile.uuid()));
        cfg.push_str(&format!("#? name {}\n", profile.name));
        cfg.push_str("setenv FORWARD_COMPATIBLE 1\n\n");

        cfg.push_str("# Enables connection to GUI\n");
        cfg.push_str(&format!(
            "management {} unix\n",
            self.runtime_dir.join(MGMT_SOCKET_NAME).display()
        ));
        cfg.push_str("management-client\n");
        cfg.push_str("management-query-passwords\n");
        cfg.push_str("management-hold\n\n");

        cfg.push_str(&format!("setenv IV_PLAT_VER {}\n", std::env::consts::OS));
        cfg.push_str(&format!(
            "setenv IV_GUI_VER {CLIENT_STRING} {CLIENT_VERSION}\n"
        ));
        cfg.push_str("setenv IV_SSO openurl,crtext\n\n");

        cfg.push_str("machine-readable-output\n");
        cfg.push_str("allow-recursive-routing\n");

        // Only tun is supported
        cfg.push_str("dev tun\n");
        cfg.push_str("verb 4\n\n");

        cfg.push_str(if profile.use_pull {
            "client\n"
        } else {
            "tls-client\n"
        });
        cfg.push_str("tls-exit\n");

        // Intermediate certs and extra CA material collect here and are
        // emitted in one <ca> block below
        let mut cabuf = String::new();

        self.emit_auth(profile, &mut cfg, &mut cabuf)?;

        if let Some(ca) = &profile.ca_file {
            if !ca.is_empty() {
                insert_file_data(&mut cabuf, None, Some(ca));
                cabuf.push('\n');
            }
        }
        let bundle = self.ca_bundle.load_ca_bundle()?;
        if !bundle.is_empty() {
            cabuf.push_str(&bundle);
            ensure_newline(&mut cabuf);
        }
        cfg.push_str("<ca>\n");
        cfg.push_str(&cabuf);
        ensure_newline(&mut cfg);
        cfg.push_str("</ca>\n");

        if let Some(crl) = &profile.crl_file {
            if !crl.is_empty() {
                insert_file_data(&mut cfg, Some("crl-verify"), Some(crl));
            }
        }

        if let Some(tls_auth) = &profile.tls_auth {
            insert_file_data(&mut cfg, Some("tls-auth"), Some(&tls_auth.file));
            if !tls_auth.direction.is_empty() {
                cfg.push_str(&format!("key-direction {}\n", tls_auth.direction));
            }
        }

        if profile.tls_version.is_empty() {
            cfg.push_str(&format!("tls-version {}\n", TLS_VERSIONS.join(":")));
        } else {
            cfg.push_str(&format!("tls-version {}\n", profile.tls_version));
        }

        self.emit_identity_verification(profile, &mut cfg);

        if profile.cipher.is_empty() {
            for cipher in CIPHER_LIST {
                cfg.push_str(&format!("cipher {cipher}\n"));
            }
        } else {
            cfg.push_str(&format!("cipher {}\n", profile.cipher));
        }

        if profile.auth_digest.is_empty() {
            for auth in AUTH_LIST {
                cfg.push_str(&format!("auth {auth}\n"));
            }
        } else {
            cfg.push_str(&format!("auth {}\n", profile.auth_digest));
        }

        if profile.use_lzo {
            cfg.push_str("comp-lzo\n");
        }

        if profile.use_random_hostname {
            cfg.push_str("remote-random-hostname\n");
        }
        if profile.use_float {
            cfg.push_str("float\n");
        }
        if profile.persist_tun {
            cfg.push_str("persist-tun\n");
            // persist-tun needs names resolved before the tunnel restarts
            cfg.push_str("preresolve\n");
        }

        if !profile.uses_extra_proxy_options() {
            cfg.push_str("\n# Use system proxy setting\n");
            cfg.push_str("management-query-proxy\n\n");
        }

        if profile.mssfix != 0 {
            if profile.mssfix == ENGINE_MSSFIX_DEFAULT {
                cfg.push_str("mssfix\n");
            } else {
                cfg.push_str(&format!("mssfix {}\n", profile.mssfix));
            }
        }

        if profile.tun_mtu >= 48 && profile.tun_mtu != 1500 {
            cfg.push_str(&format!("tun-mtu {}\n", profile.tun_mtu));
        }

        if profile.nobind {
            cfg.push_str("nobind\n");
        }

        if profile.use_custom_config {
            cfg.push_str("\n# Custom configuration options\n");
            cfg.push_str("# You are on your own here :)\n");
            cfg.push_str(&profile.custom_config_options);
            cfg.push('\n');
        }

        // Connection entries go last so global options apply to all of them
        cfg.push_str("\n# Connection entries\n");
        let mut use_tcp = false;
        let mut connbuf = String::new();
        let mut emitted = 0usize;

        for conn in &profile.connections {
            if conn.enabled && conn.check() {
                if !conn.use_udp {
                    use_tcp = true;
                }
                connbuf.push_str("<connection>\n");
                connbuf.push_str(&conn.connection_block()?);
                connbuf.push_str("\n</connection>\n");
                emitted += 1;
            }
        }

        if emitted == 0 {
            return Err(Error::illegal("no enabled server connection"));
        }

        if profile.remote_random && emitted > 1 {
            cfg.push_str("remote-random\n");
        }

        if use_tcp {
            let retry_max = non_empty_or(&profile.connect_retry_max, "-1");
            if retry_max != "-1" {
                cfg.push_str(&format!("connect-retry-max {retry_max}\n"));
            }
            let retry = non_empty_or(&profile.connect_retry, "2");
            let retry_cap = non_empty_or(&profile.connect_retry_max_time, "300");
            cfg.push_str(&format!("connect-retry {retry} {retry_cap}\n"));
        }

        // Fail fast when DNS resolution fails; the service layer drives
        // reconnects itself
        cfg.push_str("resolv-retry 0\n");
        cfg.push_str(&connbuf);
        cfg.push('\n');

        cfg.push_str("ifconfig-nowarn\n\n");

        if !profile.use_pull {
            if !profile.ipv4_address.is_empty() {
                let cidr = CidrIp::parse(&profile.ipv4_address).ok_or_else(|| {
                    Error::illegal(format!("invalid local address, {}", profile.ipv4_address))
                })?;
                cfg.push_str(&format!("ifconfig {}\n", cidr.ip_and_netmask()));
            }

            if !profile.ipv6_address.is_empty() {
                // Use our own address as gateway since it is ignored anyway
                let fake_gw = profile
                    .ipv6_address
                    .split('/')
                    .next()
                    .unwrap_or(&profile.ipv6_address);
                cfg.push_str(&format!(
                    "ifconfig-ipv6 {} {fake_gw}\n",
                    profile.ipv6_address
                ));
            }
        }

        if profile.use_pull && profile.route_nopull {
            cfg.push_str("route-nopull\n");
        }

        let mut routebuf = String::new();
        if profile.use_default_route {
            routebuf.push_str("route 0.0.0.0 0.0.0.0 vpn_gateway\n");
        } else {
            for route in checked_routes(&profile.custom_routes)? {
                routebuf.push_str(&format!("route {} vpn_gateway\n", route.ip_and_netmask()));
            }
            for route in checked_routes(&profile.excluded_routes)? {
                routebuf.push_str(&format!("route {} net_gateway\n", route.ip_and_netmask()));
            }
        }

        if profile.use_default_route_v6 {
            cfg.push_str("route-ipv6 ::/0\n");
        } else {
            for route in parse_route_list_v6(&profile.custom_routes_v6) {
                routebuf.push_str(&format!("route-ipv6 {route}\n"));
            }
        }
        cfg.push_str(&routebuf);

        if profile.override_dns || !profile.use_pull {
            if !profile.dns1.is_empty() {
                cfg.push_str(&format!("dhcp-option DNS {}\n", profile.dns1));
            }
            if !profile.dns2.is_empty() {
                cfg.push_str(&format!("dhcp-option DNS {}\n", profile.dns2));
            }
            if !profile.search_domain.is_empty() {
                cfg.push_str(&format!("dhcp-option DOMAIN {}\n", profile.search_domain));
            }
        }

        Ok(cfg)
    }

    /// Authentication block. Keystore modes pull the certificate chain from
    /// the platform keychain: the leaf is emitted inline, intermediates are
    /// deferred to the shared CA buffer.
    fn emit_auth(&self, profile: &VpnProfile, cfg: &mut String, cabuf: &mut String) -> Result<()> {
        match &profile.auth {
            AuthType::UserPass => {
                cfg.push_str("auth-user-pass\n");
            }
            AuthType::UserPassPkcs12 { pkcs12 } => {
                cfg.push_str("auth-user-pass\n");
                insert_file_data(cfg, Some("pkcs12"), Some(pkcs12));
            }
            AuthType::Pkcs12 { pkcs12 } => {
                insert_file_data(cfg, Some("pkcs12"), Some(pkcs12));
            }
            AuthType::UserPassKeystore { .. } | AuthType::Keystore { .. } => {
                if profile.auth.requires_user_password() {
                    cfg.push_str("auth-user-pass\n");
                }
                cfg.push_str("management-external-key nopadding\n");

                let chain = credentials::resolve_certificate_chain(
                    profile,
                    profile.protect_password.as_deref(),
                    self.keychain,
                    self.archive_keystore,
                )?
                .unwrap_or_default();
                if chain.is_empty() {
                    return Err(Error::certificate("keystore returned an empty chain"));
                }

                cfg.push_str("<cert>\n");
                cfg.push_str(&chain[0].to_pem());
                ensure_newline(cfg);
                cfg.push_str("</cert>\n");

                if chain.len() > 1 {
                    cabuf.push_str(&encode_pem_chain(&chain[1..]));
                }
            }
        }
        Ok(())
    }

    fn emit_identity_verification(&self, profile: &VpnProfile, cfg: &mut String) {
        if profile.check_remote_cn {
            if profile.remote_cn.is_empty() {
                let server = profile
                    .first_enabled_connection()
                    .map(|c| c.server_name.as_str())
                    .unwrap_or("");
                cfg.push_str(&format!("verify-x509-name {} name\n", escape(server)));
            } else {
                let cn = escape(&profile.remote_cn);
                match profile.x509_verify_mode {
                    X509VerifyMode::TlsRemoteCompatNoremapping => {
                        cfg.push_str("compat-names no-remapping\n");
                        cfg.push_str(&format!("tls-remote {cn}\n"));
                    }
                    X509VerifyMode::TlsRemote => {
                        cfg.push_str(&format!("tls-remote {cn}\n"));
                    }
                    X509VerifyMode::Rdn => {
                        cfg.push_str(&format!("verify-x509-name {cn} name\n"));
                    }
                    X509VerifyMode::RdnPrefix => {
                        cfg.push_str(&format!("verify-x509-name {cn} name-prefix\n"));
                    }
                    X509VerifyMode::Dn => {
                        cfg.push_str(&format!("verify-x509-name {cn}\n"));
                    }
                }
            }

            if !profile.x509_username_field.is_empty() {
                cfg.push_str(&format!(
                    "x509-username-field {}\n",
                    escape(&profile.x509_username_field)
                ));
            }
        }

        if profile.expect_tls_cert {
            cfg.push_str("remote-cert-tls server\n");
        }
    }
}

fn ensure_newline(buf: &mut String) {
    if !buf.is_empty() && !buf.ends_with('\n') && !buf.ends_with('\r') {
        buf.push('\n');
    }
}

fn non_empty_or<'s>(value: &'s str, fallback: &'s str) -> &'s str {
    if value.is_empty() {
        fallback
    } else {
        value
    }
}

/// Route entries are re-validated at compile time; a malformed entry that
/// slipped past validation fails the compile rather than misconfiguring the
/// tunnel.
fn checked_routes(routes: &str) -> Result<Vec<CidrIp>> {
    parse_route_list(routes).map_err(|entry| Error::illegal(format!("invalid route, {entry}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Connection;
    use crate::embed::FileSource;
    use crate::keystore::Certificate;
    use crate::profile::TlsAuth;

    struct NoKeychain;
    impl PlatformKeychain for NoKeychain {
        fn certificate_chain(&self, _alias: &str) -> Result<Vec<Certificate>> {
            Err(Error::certificate("no keychain in tests"))
        }
        fn choose_private_key_alias(&self, _preselect: Option<&str>) -> Option<String> {
            None
        }
    }

    struct FixedKeychain(Vec<Certificate>);
    impl PlatformKeychain for FixedKeychain {
        fn certificate_chain(&self, _alias: &str) -> Result<Vec<Certificate>> {
            Ok(self.0.clone())
        }
        fn choose_private_key_alias(&self, preselect: Option<&str>) -> Option<String> {
            preselect.map(str::to_string)
        }
    }

    struct NoArchive;
    impl Pkcs12Keystore for NoArchive {
        fn open(&self, _archive: &[u8], _password: &str) -> Result<Vec<Certificate>> {
            Err(Error::certificate("no archive keystore in tests"))
        }
    }

    struct EmptyBundle;
    impl CaBundleSupplier for EmptyBundle {
        fn load_ca_bundle(&self) -> std::io::Result<String> {
            Ok(String::new())
        }
    }

    fn compile(profile: &VpnProfile) -> Result<String> {
        let keychain = NoKeychain;
        let archive = NoArchive;
        let bundle = EmptyBundle;
        Compiler::new(&keychain, &archive, &bundle, Path::new("/tmp/ovpn")).compile(profile)
    }

    fn base_profile() -> VpnProfile {
        let mut profile = VpnProfile::new("test");
        profile.connections[0].server_name = "vpn.example.com".to_string();
        profile
    }

    #[test]
    fn password_only_profile_compiles() {
        let cfg = compile(&base_profile()).unwrap();
        assert!(cfg.contains("auth-user-pass\n"));
        assert!(cfg.contains("client\n"));
        assert_eq!(cfg.matches("<connection>").count(), 1);
        assert!(cfg.contains("remote vpn.example.com 1194 udp"));
        assert!(cfg.contains("management /tmp/ovpn/mgmtsocket unix\n"));
        assert!(cfg.contains("resolv-retry 0\n"));
    }

    #[test]
    fn compile_is_deterministic() {
        let profile = base_profile();
        assert_eq!(compile(&profile).unwrap(), compile(&profile).unwrap());
    }

    #[test]
    fn no_enabled_connection_is_compile_error() {
        let mut profile = base_profile();
        profile.connections[0].enabled = false;
        let err = compile(&profile).unwrap_err();
        assert!(matches!(err, Error::IllegalConfiguration(_)));
    }

    #[test]
    fn irrelevant_fields_do_not_change_output() {
        let keychain = FixedKeychain(vec![Certificate::from_der(vec![1, 2, 3])]);
        let archive = NoArchive;
        let bundle = EmptyBundle;
        let compiler = Compiler::new(&keychain, &archive, &bundle, Path::new("/run"));

        let mut profile = base_profile();
        profile.auth = AuthType::Keystore {
            alias: "work".to_string(),
        };
        let before = compiler.compile(&profile).unwrap();
        assert!(!before.contains("auth-user-pass"));

        // Stale credentials from a previous mode must not leak into the text
        profile.username = "alice".to_string();
        profile.password = "hunter2".to_string();
        let after = compiler.compile(&profile).unwrap();
        assert_eq!(before, after);
        assert!(!after.contains("hunter2"));
    }

    #[test]
    fn keystore_chain_is_split_into_cert_and_ca() {
        let keychain = FixedKeychain(vec![
            Certificate::from_der(vec![1]),
            Certificate::from_der(vec![2]),
        ]);
        let archive = NoArchive;
        let bundle = EmptyBundle;
        let compiler = Compiler::new(&keychain, &archive, &bundle, Path::new("/run"));

        let mut profile = base_profile();
        profile.auth = AuthType::Keystore {
            alias: "work".to_string(),
        };
        let cfg = compiler.compile(&profile).unwrap();

        assert!(cfg.contains("management-external-key nopadding\n"));
        let cert_block = &cfg[cfg.find("<cert>").unwrap()..cfg.find("</cert>").unwrap()];
        assert_eq!(cert_block.matches("BEGIN CERTIFICATE").count(), 1);
        let ca_block = &cfg[cfg.find("<ca>").unwrap()..cfg.find("</ca>").unwrap()];
        assert_eq!(ca_block.matches("BEGIN CERTIFICATE").count(), 1);
    }

    #[test]
    fn empty_keystore_chain_is_certificate_error() {
        let keychain = FixedKeychain(vec![]);
        let archive = NoArchive;
        let bundle = EmptyBundle;
        let compiler = Compiler::new(&keychain, &archive, &bundle, Path::new("/run"));

        let mut profile = base_profile();
        profile.auth = AuthType::Keystore {
            alias: "work".to_string(),
        };
        assert!(matches!(
            compiler.compile(&profile).unwrap_err(),
            Error::Certificate(_)
        ));
    }

    #[test]
    fn mssfix_special_cases() {
        let mut profile = base_profile();

        profile.mssfix = 1450;
        let cfg = compile(&profile).unwrap();
        assert!(cfg.contains("\nmssfix\n"));
        assert!(!cfg.contains("mssfix 1450"));

        profile.mssfix = 1280;
        assert!(compile(&profile).unwrap().contains("mssfix 1280\n"));

        profile.mssfix = 0;
        assert!(!compile(&profile).unwrap().contains("mssfix"));
    }

    #[test]
    fn tun_mtu_suppressed_at_default() {
        let mut profile = base_profile();
        profile.tun_mtu = 1500;
        assert!(!compile(&profile).unwrap().contains("tun-mtu"));

        profile.tun_mtu = 1400;
        assert!(compile(&profile).unwrap().contains("tun-mtu 1400\n"));

        profile.tun_mtu = 40; // below the engine minimum
        assert!(!compile(&profile).unwrap().contains("tun-mtu"));
    }

    #[test]
    fn routes_are_normalised() {
        let mut profile = base_profile();
        profile.custom_routes = "10.0.0.0/24".to_string();
        profile.excluded_routes = "192.168.1.0/24".to_string();
        let cfg = compile(&profile).unwrap();
        assert!(cfg.contains("route 10.0.0.0 255.255.255.0 vpn_gateway\n"));
        assert!(cfg.contains("route 192.168.1.0 255.255.255.0 net_gateway\n"));
    }

    #[test]
    fn malformed_route_fails_compile() {
        let mut profile = base_profile();
        profile.custom_routes = "not-a-cidr".to_string();
        assert!(matches!(
            compile(&profile).unwrap_err(),
            Error::IllegalConfiguration(_)
        ));
    }

    #[test]
    fn default_routes() {
        let mut profile = base_profile();
        profile.use_default_route = true;
        profile.use_default_route_v6 = true;
        let cfg = compile(&profile).unwrap();
        assert!(cfg.contains("route 0.0.0.0 0.0.0.0 vpn_gateway\n"));
        assert!(cfg.contains("route-ipv6 ::/0\n"));
    }

    #[test]
    fn dns_only_with_override_or_static_mode() {
        let mut profile = base_profile();
        assert!(!compile(&profile).unwrap().contains("dhcp-option DNS"));

        profile.override_dns = true;
        profile.search_domain = "corp.example.com".to_string();
        let cfg = compile(&profile).unwrap();
        assert!(cfg.contains("dhcp-option DNS 8.8.8.8\n"));
        assert!(cfg.contains("dhcp-option DOMAIN corp.example.com\n"));

        profile.override_dns = false;
        profile.use_pull = false;
        assert!(compile(&profile).unwrap().contains("dhcp-option DNS"));
    }

    #[test]
    fn static_addressing_without_pull() {
        let mut profile = base_profile();
        profile.use_pull = false;
        profile.ipv4_address = "10.8.0.2/24".to_string();
        profile.ipv6_address = "fd00::2/64".to_string();
        let cfg = compile(&profile).unwrap();
        assert!(cfg.contains("tls-client\n"));
        assert!(cfg.contains("ifconfig 10.8.0.2 255.255.255.0\n"));
        assert!(cfg.contains("ifconfig-ipv6 fd00::2/64 fd00::2\n"));

        profile.use_pull = true;
        let cfg = compile(&profile).unwrap();
        assert!(!cfg.contains("ifconfig 10.8.0.2"));
    }

    #[test]
    fn tcp_transport_emits_retry_tuning() {
        let mut profile = base_profile();
        profile.connections[0].use_udp = false;
        let cfg = compile(&profile).unwrap();
        assert!(cfg.contains("connect-retry 2 300\n"));
        // "-1" means unbounded retries: the max directive is suppressed
        assert!(!cfg.contains("connect-retry-max"));

        profile.connect_retry_max = "5".to_string();
        assert!(compile(&profile).unwrap().contains("connect-retry-max 5\n"));
    }

    #[test]
    fn remote_random_needs_multiple_connections() {
        let mut profile = base_profile();
        profile.remote_random = true;
        assert!(!compile(&profile).unwrap().contains("remote-random\n"));

        let mut second = Connection::default();
        second.server_name = "backup.example.com".to_string();
        profile.connections.push(second);
        assert!(compile(&profile).unwrap().contains("remote-random\n"));
    }

    #[test]
    fn disabled_connections_are_skipped() {
        let mut profile = base_profile();
        let mut second = Connection::default();
        second.server_name = "backup.example.com".to_string();
        second.enabled = false;
        profile.connections.push(second);
        let cfg = compile(&profile).unwrap();
        assert_eq!(cfg.matches("<connection>").count(), 1);
        assert!(!cfg.contains("backup.example.com"));
    }

    #[test]
    fn tls_auth_block_and_direction() {
        let mut profile = base_profile();
        profile.tls_auth = Some(TlsAuth {
            file: FileSource::embed("ta-key-data"),
            direction: "1".to_string(),
        });
        let cfg = compile(&profile).unwrap();
        assert!(cfg.contains("<tls-auth>\nta-key-data\n</tls-auth>\n"));
        assert!(cfg.contains("key-direction 1\n"));
    }

    #[test]
    fn verify_name_defaults_to_first_enabled_server() {
        let mut profile = base_profile();
        profile.connections.insert(0, Connection {
            enabled: false,
            server_name: "disabled.example.com".to_string(),
            ..Connection::default()
        });
        profile.check_remote_cn = true;
        let cfg = compile(&profile).unwrap();
        assert!(cfg.contains("verify-x509-name vpn.example.com name\n"));
    }

    #[test]
    fn verify_mode_variants() {
        let mut profile = base_profile();
        profile.check_remote_cn = true;
        profile.remote_cn = "CN=VPN Server".to_string();

        profile.x509_verify_mode = X509VerifyMode::Dn;
        let cfg = compile(&profile).unwrap();
        assert!(cfg.contains("verify-x509-name \"CN=VPN Server\"\n"));

        profile.x509_verify_mode = X509VerifyMode::RdnPrefix;
        let cfg = compile(&profile).unwrap();
        assert!(cfg.contains("verify-x509-name \"CN=VPN Server\" name-prefix\n"));

        profile.x509_verify_mode = X509VerifyMode::TlsRemoteCompatNoremapping;
        let cfg = compile(&profile).unwrap();
        assert!(cfg.contains("compat-names no-remapping\n"));
        assert!(cfg.contains("tls-remote \"CN=VPN Server\"\n"));

        profile.expect_tls_cert = true;
        assert!(compile(&profile).unwrap().contains("remote-cert-tls server\n"));
    }

    #[test]
    fn cipher_priority_list_when_unset() {
        let profile = base_profile();
        let cfg = compile(&profile).unwrap();
        assert!(cfg.contains("cipher AES-256-CBC\ncipher AES-192-CBC\ncipher AES-128-CBC\ncipher BF-CBC\n"));
        assert!(cfg.contains("auth SHA256\nauth SHA1\n"));
        assert!(cfg.contains(&format!("tls-version {}\n", TLS_VERSIONS.join(":"))));

        let mut profile = base_profile();
        profile.cipher = "AES-256-GCM".to_string();
        profile.auth_digest = "SHA512".to_string();
        profile.tls_version = "TLSv1.2".to_string();
        let cfg = compile(&profile).unwrap();
        assert!(cfg.contains("cipher AES-256-GCM\n"));
        assert!(!cfg.contains("BF-CBC"));
        assert!(cfg.contains("auth SHA512\n"));
        assert!(cfg.contains("tls-version TLSv1.2\n"));
    }

    #[test]
    fn system_proxy_suppressed_by_connection_proxy() {
        let mut profile = base_profile();
        assert!(compile(&profile).unwrap().contains("management-query-proxy\n"));

        profile.connections[0].proxy_type = crate::connection::ProxyType::Socks5;
        profile.connections[0].proxy_name = "127.0.0.1".to_string();
        assert!(!compile(&profile).unwrap().contains("management-query-proxy\n"));
    }

    #[test]
    fn custom_config_appended_verbatim() {
        let mut profile = base_profile();
        profile.use_custom_config = true;
        profile.custom_config_options = "reneg-sec 3600".to_string();
        assert!(compile(&profile).unwrap().contains("reneg-sec 3600\n"));

        profile.use_custom_config = false;
        assert!(!compile(&profile).unwrap().contains("reneg-sec"));
    }

    #[test]
    fn ca_sources_concatenate_in_order() {
        struct Bundle;
        impl CaBundleSupplier for Bundle {
            fn load_ca_bundle(&self) -> std::io::Result<String> {
                Ok("# bundled root\n".to_string())
            }
        }
        let keychain = NoKeychain;
        let archive = NoArchive;
        let bundle = Bundle;
        let compiler = Compiler::new(&keychain, &archive, &bundle, Path::new("/run"));

        let mut profile = base_profile();
        profile.ca_file = Some(FileSource::embed("# profile ca"));
        let cfg = compiler.compile(&profile).unwrap();

        let ca_block = &cfg[cfg.find("<ca>").unwrap()..cfg.find("</ca>").unwrap()];
        let profile_at = ca_block.find("# profile ca").unwrap();
        let bundle_at = ca_block.find("# bundled root").unwrap();
        assert!(profile_at < bundle_at);
    }
}
