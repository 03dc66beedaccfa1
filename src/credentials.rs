//! Credential resolution.
//!
//! Decides whether a connection attempt still needs interactive input,
//! verifies PKCS12 protection passwords and resolves certificate chains
//! from either an embedded archive or the platform keychain.

use std::collections::HashMap;

use base64::prelude::*;
use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::keystore::{Certificate, Pkcs12Keystore, PlatformKeychain};
use crate::profile::VpnProfile;

/// Which secret is still missing before the attempt can proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeededSecret {
    /// The user's auth password (or username)
    AuthPassword,
    /// The PKCS12 protection password
    ProtectPassword,
}

/// Check whether the auth password must still be collected.
///
/// An empty username is never a valid anonymous login, and an empty stored
/// password counts as absent here; contrast with the protection-password
/// check below.
pub fn needs_user_password(profile: &VpnProfile, transient: Option<&str>) -> Option<NeededSecret> {
    if !profile.auth.requires_user_password() {
        return None;
    }
    let transient_empty = transient.map_or(true, str::is_empty);
    if profile.username.is_empty() || (profile.password.is_empty() && transient_empty) {
        return Some(NeededSecret::AuthPassword);
    }
    None
}

/// Check whether the PKCS12 protection password must still be collected.
///
/// Archives may legitimately use an empty passphrase, so an explicitly
/// stored empty string counts as present; only a fully absent password
/// requires input. This asymmetry with `needs_user_password` is deliberate.
pub fn needs_protect_password(
    profile: &VpnProfile,
    transient: Option<&str>,
) -> Option<NeededSecret> {
    if !profile.auth.uses_pkcs12() {
        return None;
    }
    if profile.protect_password.is_none() && transient.is_none() {
        return Some(NeededSecret::ProtectPassword);
    }
    None
}

/// Verify a protection password by attempting to open the archive.
///
/// Non-archive modes trivially succeed; no protection password applies to
/// them. A rejected password is a credential error so the caller can
/// re-prompt; a corrupt archive is a certificate error.
pub fn verify_protect_password(
    profile: &VpnProfile,
    password: &str,
    archive_keystore: &dyn Pkcs12Keystore,
) -> Result<()> {
    let Some(pkcs12) = profile.auth.pkcs12() else {
        return Ok(());
    };

    let archive = decode_archive(pkcs12.embedded_content())?;
    match archive_keystore.open(&archive, password) {
        Ok(_) => {
            debug!(profile = %profile.uuid(), "protection password verified");
            Ok(())
        }
        Err(_) => Err(Error::credential("PKCS12 protection password rejected")),
    }
}

/// Resolve the certificate chain for a profile.
///
/// Archive modes unlock the embedded archive; keystore modes delegate to
/// the platform keychain by alias; password-only mode has no chain.
pub fn resolve_certificate_chain(
    profile: &VpnProfile,
    protect_password: Option<&str>,
    keychain: &dyn PlatformKeychain,
    archive_keystore: &dyn Pkcs12Keystore,
) -> Result<Option<Vec<Certificate>>> {
    if let Some(pkcs12) = profile.auth.pkcs12() {
        let archive = decode_archive(pkcs12.embedded_content())?;
        let password = protect_password
            .or(profile.protect_password.as_deref())
            .unwrap_or("");
        let chain = archive_keystore
            .open(&archive, password)
            .map_err(|e| Error::certificate(format!("cannot open PKCS12 archive: {e}")))?;
        return Ok(Some(chain));
    }

    if let Some(alias) = profile.auth.alias() {
        let chain = keychain
            .certificate_chain(alias)
            .map_err(|e| Error::certificate(format!("keychain access for '{alias}' failed: {e}")))?;
        return Ok(Some(chain));
    }

    Ok(None)
}

fn decode_archive(content: &str) -> Result<Vec<u8>> {
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    BASE64_STANDARD
        .decode(&compact)
        .map_err(|e| Error::certificate(format!("PKCS12 archive is not valid base64: {e}")))
}

/// Transient per-profile secrets for the current connection attempt.
///
/// Held only in process memory and handed out at most once per attempt;
/// nothing here is ever persisted.
#[derive(Debug, Default)]
pub struct PasswordCache {
    entries: HashMap<Uuid, CachedSecrets>,
}

#[derive(Debug, Default)]
struct CachedSecrets {
    auth: Option<String>,
    protect: Option<String>,
}

impl PasswordCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_auth_password(&mut self, uuid: Uuid, password: String) {
        self.entries.entry(uuid).or_default().auth = Some(password);
    }

    pub fn set_protect_password(&mut self, uuid: Uuid, password: String) {
        self.entries.entry(uuid).or_default().protect = Some(password);
    }

    /// Take the cached auth password, consuming it.
    pub fn take_auth_password(&mut self, uuid: Uuid) -> Option<String> {
        self.entries.get_mut(&uuid)?.auth.take()
    }

    /// Take the cached protection password, consuming it.
    pub fn take_protect_password(&mut self, uuid: Uuid) -> Option<String> {
        self.entries.get_mut(&uuid)?.protect.take()
    }

    /// Drop all secrets for one profile, e.g. when its attempt is torn down.
    pub fn clear(&mut self, uuid: Uuid) {
        self.entries.remove(&uuid);
    }
}
