//! Profile validation.
//!
//! `check` inspects a profile snapshot and reports the first violated
//! constraint. It runs before every connection attempt; the compiler
//! re-checks the hard invariants defensively.

use std::fmt;

use crate::profile::{VpnProfile, X509VerifyMode};
use crate::types::parse_route_list;

/// Result of validating a profile: `Ok` or the first violation found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationOutcome {
    Ok,
    /// No connection entry is enabled
    NoServerSelected,
    /// The first enabled connection is not self-consistent
    ServerAddressError,
    /// A keystore mode without a selected alias
    NoKeystoreAliasSelected,
    /// An archive mode without an archive reference
    NoPkcs12FileSelected,
    /// The retired legacy remote-match verification mode
    DeprecatedTlsRemote,
    /// A non-empty route list with no parseable entry
    CustomRouteFormatError,
    /// tls-auth enabled without key material
    MissingTlsAuthFile,
}

impl ValidationOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, ValidationOutcome::Ok)
    }
}

impl fmt::Display for ValidationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ValidationOutcome::Ok => "no error found",
            ValidationOutcome::NoServerSelected => "no server connection selected",
            ValidationOutcome::ServerAddressError => "server address or port is invalid",
            ValidationOutcome::NoKeystoreAliasSelected => "no keystore certificate selected",
            ValidationOutcome::NoPkcs12FileSelected => "no PKCS12 file selected",
            ValidationOutcome::DeprecatedTlsRemote => {
                "tls-remote matching is deprecated and no longer supported"
            }
            ValidationOutcome::CustomRouteFormatError => "custom route format error",
            ValidationOutcome::MissingTlsAuthFile => "tls-auth is enabled but no file is set",
        };
        f.write_str(msg)
    }
}

/// Validate a profile. Pure; evaluates constraints in a fixed order and
/// returns the first violation.
pub fn check(profile: &VpnProfile) -> ValidationOutcome {
    match profile.first_enabled_connection() {
        None => return ValidationOutcome::NoServerSelected,
        Some(conn) if !conn.check() => return ValidationOutcome::ServerAddressError,
        Some(_) => {}
    }

    if let Some(alias) = profile.auth.alias() {
        if alias.is_empty() {
            return ValidationOutcome::NoKeystoreAliasSelected;
        }
    }

    if let Some(pkcs12) = profile.auth.pkcs12() {
        if pkcs12.is_empty() {
            return ValidationOutcome::NoPkcs12FileSelected;
        }
    }

    if profile.check_remote_cn && profile.x509_verify_mode == X509VerifyMode::TlsRemote {
        return ValidationOutcome::DeprecatedTlsRemote;
    }

    if !profile.use_default_route {
        // A list with any content at all must yield at least one entry; an
        // all-whitespace list is a format error, not an empty list
        for routes in [&profile.custom_routes, &profile.excluded_routes] {
            if !routes.is_empty() {
                match parse_route_list(routes) {
                    Ok(parsed) if !parsed.is_empty() => {}
                    _ => return ValidationOutcome::CustomRouteFormatError,
                }
            }
        }
    }

    if let Some(tls_auth) = &profile.tls_auth {
        if tls_auth.file.is_empty() {
            return ValidationOutcome::MissingTlsAuthFile;
        }
    }

    ValidationOutcome::Ok
}
