//! The connect-attempt pipeline.
//!
//! One attempt owns its profile snapshot and any transient secrets for the
//! duration of a single connection. The pipeline runs validation first,
//! then pauses for interactive input while secrets are missing, then
//! performs the blocking credential work off the interactive thread, and
//! finally compiles. Cancelling drops the attempt and every secret it held.

use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::debug;

use crate::compile::Compiler;
use crate::credentials::{self, NeededSecret, PasswordCache};
use crate::error::{Error, Result};
use crate::keystore::{Certificate, Pkcs12Keystore, PlatformKeychain};
use crate::profile::VpnProfile;
use crate::validate::{self, ValidationOutcome};

/// Outcome of preparing an attempt: ready to proceed, structurally invalid,
/// or suspended waiting for a secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prepared {
    Ready,
    Invalid(ValidationOutcome),
    NeedsInput(NeededSecret),
}

/// A single connection attempt for one profile.
///
/// Exactly one attempt may be in flight per profile; the attempt owns its
/// profile snapshot, so a concurrent editing session cannot race the
/// compile.
pub struct ConnectAttempt {
    profile: VpnProfile,
    transient_auth: Option<String>,
    transient_protect: Option<String>,
}

impl ConnectAttempt {
    pub fn new(profile: VpnProfile) -> Self {
        Self {
            profile,
            transient_auth: None,
            transient_protect: None,
        }
    }

    /// Start an attempt, consuming any secrets cached for this profile.
    /// The cache entries are taken, not copied; they cannot leak into a
    /// later attempt.
    pub fn with_cached_secrets(profile: VpnProfile, cache: &mut PasswordCache) -> Self {
        let uuid = profile.uuid();
        Self {
            profile,
            transient_auth: cache.take_auth_password(uuid),
            transient_protect: cache.take_protect_password(uuid),
        }
    }

    pub fn profile(&self) -> &VpnProfile {
        &self.profile
    }

    /// Record the interactively entered auth password.
    pub fn supply_auth_password<S: Into<String>>(&mut self, password: S) {
        self.transient_auth = Some(password.into());
    }

    /// Record the interactively entered protection password.
    pub fn supply_protect_password<S: Into<String>>(&mut self, password: S) {
        self.transient_protect = Some(password.into());
    }

    /// Validate and decide whether interactive input is still required.
    ///
    /// Protection-password resolution is evaluated before the
    /// username/password check: entering the keystore may itself require
    /// interactive platform consent, so the keystore path must be settled
    /// first.
    pub fn prepare(&self) -> Prepared {
        let outcome = validate::check(&self.profile);
        if !outcome.is_ok() {
            return Prepared::Invalid(outcome);
        }

        if let Some(needed) =
            credentials::needs_protect_password(&self.profile, self.transient_protect.as_deref())
        {
            return Prepared::NeedsInput(needed);
        }
        if let Some(needed) =
            credentials::needs_user_password(&self.profile, self.transient_auth.as_deref())
        {
            return Prepared::NeedsInput(needed);
        }

        Prepared::Ready
    }

    /// Verify the protection password against the archive.
    ///
    /// The cryptographic work blocks, so it runs on the blocking pool; the
    /// result comes back through a one-shot channel.
    pub async fn verify_protect_password(&self, archive: Arc<dyn Pkcs12Keystore>) -> Result<()> {
        let profile = self.profile.clone();
        let password = self.effective_protect_password().unwrap_or_default();

        let (tx, rx) = oneshot::channel();
        tokio::task::spawn_blocking(move || {
            let result = credentials::verify_protect_password(&profile, &password, archive.as_ref());
            let _ = tx.send(result);
        });
        rx.await
            .map_err(|_| Error::certificate("archive verification task dropped"))?
    }

    /// Resolve the certificate chain off the interactive thread.
    pub async fn resolve_certificate_chain(
        &self,
        keychain: Arc<dyn PlatformKeychain>,
        archive: Arc<dyn Pkcs12Keystore>,
    ) -> Result<Option<Vec<Certificate>>> {
        let profile = self.profile.clone();
        let password = self.effective_protect_password();

        let (tx, rx) = oneshot::channel();
        tokio::task::spawn_blocking(move || {
            let result = credentials::resolve_certificate_chain(
                &profile,
                password.as_deref(),
                keychain.as_ref(),
                archive.as_ref(),
            );
            let _ = tx.send(result);
        });
        rx.await
            .map_err(|_| Error::certificate("keystore task dropped"))?
    }

    /// Compile the fully resolved profile.
    ///
    /// Transient secrets are folded into the compiled snapshot only; the
    /// profile as stored is never mutated.
    pub fn compile(&self, compiler: &Compiler<'_>) -> Result<String> {
        match self.prepare() {
            Prepared::Ready => {}
            Prepared::Invalid(outcome) => return Err(Error::illegal(outcome.to_string())),
            Prepared::NeedsInput(_) => {
                return Err(Error::credential("secret input still required"))
            }
        }

        let mut snapshot = self.profile.clone();
        if snapshot.protect_password.is_none() {
            snapshot.protect_password = self.transient_protect.clone();
        }
        compiler.compile(&snapshot)
    }

    /// Abort the attempt. All transient secrets are dropped with it; a
    /// cancelled attempt never falls back to previously cached material.
    pub fn cancel(self) {
        debug!(profile = %self.profile.uuid(), "connection attempt cancelled");
        drop(self);
    }

    /// Stored password wins; the transient one fills the gap when the user
    /// chose not to save it.
    fn effective_protect_password(&self) -> Option<String> {
        self.profile
            .protect_password
            .clone()
            .or_else(|| self.transient_protect.clone())
    }
}
