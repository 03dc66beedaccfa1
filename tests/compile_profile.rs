//! Integration-style test driving the full pipeline: validate a profile,
//! resolve its credentials and compile it into engine config text.

use std::path::Path;
use std::sync::Arc;

use base64::prelude::*;

use openvpn_profile::compile::Compiler;
use openvpn_profile::credentials::NeededSecret;
use openvpn_profile::embed::FileSource;
use openvpn_profile::error::{Error, Result};
use openvpn_profile::keystore::{CaBundleSupplier, Certificate, Pkcs12Keystore, PlatformKeychain};
use openvpn_profile::pipeline::{ConnectAttempt, Prepared};
use openvpn_profile::profile::AuthType;
use openvpn_profile::validate::{self, ValidationOutcome};
use openvpn_profile::VpnProfile;

struct FakeKeychain;
impl PlatformKeychain for FakeKeychain {
    fn certificate_chain(&self, alias: &str) -> Result<Vec<Certificate>> {
        if alias == "work-key" {
            Ok(vec![
                Certificate::from_der(vec![0x30, 0x82, 0x01, 0x0a]),
                Certificate::from_der(vec![0x30, 0x82, 0x02, 0x0b]),
            ])
        } else {
            Err(Error::certificate("alias not found"))
        }
    }
    fn choose_private_key_alias(&self, preselect: Option<&str>) -> Option<String> {
        preselect.map(str::to_string)
    }
}

struct FakeArchive;
impl Pkcs12Keystore for FakeArchive {
    fn open(&self, _archive: &[u8], password: &str) -> Result<Vec<Certificate>> {
        if password.is_empty() {
            Ok(vec![Certificate::from_der(vec![0x30, 0x03])])
        } else {
            Err(Error::credential("mac verify failure"))
        }
    }
}

struct FixedBundle;
impl CaBundleSupplier for FixedBundle {
    fn load_ca_bundle(&self) -> std::io::Result<String> {
        Ok("-----BEGIN CERTIFICATE-----\nZmFrZSByb290\n-----END CERTIFICATE-----\n".to_string())
    }
}

fn userpass_profile() -> VpnProfile {
    let mut profile = VpnProfile::new("test");
    profile.username = "alice".to_string();
    profile.password = "hunter2".to_string();
    profile.connections[0].server_name = "vpn.example.com".to_string();
    profile
}

#[test]
fn password_only_profile_end_to_end() {
    let profile = userpass_profile();
    assert_eq!(validate::check(&profile), ValidationOutcome::Ok);

    let attempt = ConnectAttempt::new(profile);
    assert_eq!(attempt.prepare(), Prepared::Ready);

    let keychain = FakeKeychain;
    let archive = FakeArchive;
    let bundle = FixedBundle;
    let compiler = Compiler::new(&keychain, &archive, &bundle, Path::new("/run/ovpn"));
    let cfg = attempt.compile(&compiler).unwrap();

    assert!(cfg.contains("auth-user-pass\n"));
    assert_eq!(cfg.matches("<connection>").count(), 1);
    assert!(cfg.contains("remote vpn.example.com 1194 udp"));
    // The supplier's bundle lands inside the CA block
    assert!(cfg.contains("ZmFrZSByb290"));
    // Secrets never appear in the generated text
    assert!(!cfg.contains("hunter2"));
}

#[test]
fn keystore_profile_without_alias_fails_before_compile() {
    let mut profile = userpass_profile();
    profile.auth = AuthType::Keystore {
        alias: String::new(),
    };

    let attempt = ConnectAttempt::new(profile);
    assert_eq!(
        attempt.prepare(),
        Prepared::Invalid(ValidationOutcome::NoKeystoreAliasSelected)
    );

    // Even a direct compile call refuses with a typed error
    let keychain = FakeKeychain;
    let archive = FakeArchive;
    let bundle = FixedBundle;
    let compiler = Compiler::new(&keychain, &archive, &bundle, Path::new("/run/ovpn"));
    assert!(attempt.compile(&compiler).is_err());
}

#[test]
fn keystore_profile_end_to_end() {
    let mut profile = VpnProfile::new("work vpn");
    profile.connections[0].server_name = "gw.example.com".to_string();
    profile.auth = AuthType::Keystore {
        alias: "work-key".to_string(),
    };

    let attempt = ConnectAttempt::new(profile);
    assert_eq!(attempt.prepare(), Prepared::Ready);

    let keychain = FakeKeychain;
    let archive = FakeArchive;
    let bundle = FixedBundle;
    let compiler = Compiler::new(&keychain, &archive, &bundle, Path::new("/run/ovpn"));
    let cfg = attempt.compile(&compiler).unwrap();

    assert!(cfg.contains("management-external-key nopadding\n"));
    assert!(!cfg.contains("auth-user-pass\n"));
    // Leaf in the cert block, intermediate collected into the CA block
    let ca_block = &cfg[cfg.find("<ca>").unwrap()..cfg.find("</ca>").unwrap()];
    assert!(ca_block.contains("BEGIN CERTIFICATE"));
}

#[tokio::test]
async fn archive_profile_verifies_empty_passphrase() {
    let mut profile = VpnProfile::new("archive");
    profile.connections[0].server_name = "vpn.example.com".to_string();
    profile.auth = AuthType::Pkcs12 {
        pkcs12: FileSource::embed(BASE64_STANDARD.encode(b"fake-pkcs12")),
    };

    // No protection password anywhere: the pipeline suspends for input
    let mut attempt = ConnectAttempt::new(profile);
    assert_eq!(
        attempt.prepare(),
        Prepared::NeedsInput(NeededSecret::ProtectPassword)
    );

    // The user submits an empty passphrase, which this archive accepts
    attempt.supply_protect_password("");
    assert_eq!(attempt.prepare(), Prepared::Ready);
    attempt
        .verify_protect_password(Arc::new(FakeArchive))
        .await
        .unwrap();

    let chain = attempt
        .resolve_certificate_chain(Arc::new(FakeKeychain), Arc::new(FakeArchive))
        .await
        .unwrap();
    assert!(chain.is_some());
}

#[test]
fn duplicated_profile_validates_independently() {
    let profile = userpass_profile();
    let mut copy = profile.duplicate("copy of test");
    assert_ne!(copy.uuid(), profile.uuid());
    assert_eq!(validate::check(&copy), ValidationOutcome::Ok);

    copy.connections[0].server_name = String::new();
    assert_eq!(validate::check(&copy), ValidationOutcome::ServerAddressError);
    assert_eq!(validate::check(&profile), ValidationOutcome::Ok);
}
