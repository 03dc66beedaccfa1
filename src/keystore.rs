//! External credential and trust capabilities.
//!
//! The platform keychain, the PKCS12 archive opener and the CA trust-bundle
//! supplier are collaborators with their own failure and cancellation
//! semantics; the crate only depends on them through these traits.

use base64::prelude::*;

use crate::error::Result;

/// An X.509 certificate as DER bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    der: Vec<u8>,
}

impl Certificate {
    pub fn from_der<B: Into<Vec<u8>>>(der: B) -> Self {
        Self { der: der.into() }
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// PEM-encode as a CERTIFICATE block with 64-column base64 lines,
    /// terminated by a newline.
    pub fn to_pem(&self) -> String {
        let body = BASE64_STANDARD.encode(&self.der);
        let mut pem = String::with_capacity(body.len() + 64);
        pem.push_str("-----BEGIN CERTIFICATE-----\n");
        let mut rest = body.as_str();
        while !rest.is_empty() {
            let (line, tail) = rest.split_at(rest.len().min(64));
            pem.push_str(line);
            pem.push('\n');
            rest = tail;
        }
        pem.push_str("-----END CERTIFICATE-----\n");
        pem
    }
}

/// PEM-encode a slice of a certificate chain, one block per certificate.
pub fn encode_pem_chain(chain: &[Certificate]) -> String {
    chain.iter().map(Certificate::to_pem).collect()
}

/// Platform keystore holding private keys addressed by alias.
pub trait PlatformKeychain: Send + Sync {
    /// Certificate chain for an alias, leaf first. Access failures and
    /// denied consent surface as certificate errors.
    fn certificate_chain(&self, alias: &str) -> Result<Vec<Certificate>>;

    /// Ask the platform to pick a private key alias, optionally preselecting
    /// one. `None` means the user cancelled.
    fn choose_private_key_alias(&self, preselect: Option<&str>) -> Option<String>;
}

/// Opener for PKCS12 archives.
pub trait Pkcs12Keystore: Send + Sync {
    /// Unlock an archive and return its certificate chain, leaf first.
    /// A wrong password is an error; the password itself is never logged.
    fn open(&self, archive: &[u8], password: &str) -> Result<Vec<Certificate>>;
}

/// Source of extra CA material appended to the compiled config's CA block.
pub trait CaBundleSupplier: Send + Sync {
    /// PEM text of the bundled trust anchors; may be empty.
    fn load_ca_bundle(&self) -> std::io::Result<String>;
}
