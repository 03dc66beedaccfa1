//! Inline file embedding.
//!
//! A profile references auxiliary files (CA certs, PKCS12 archives, tls-auth
//! keys) either as a filesystem path or with the file content embedded
//! directly in the profile, tagged with a reserved marker. The compiler
//! renders both forms into the config text.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Marker prefix for embedded content.
pub const INLINE_TAG: &str = "[[INLINE]]";
/// Marker prefix for embedded content that also carries a display name.
pub const DISPLAYNAME_TAG: &str = "[[NAME]]";

/// A file reference: plain path or inline-embedded content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct FileSource(String);

impl FileSource {
    /// Reference a file by filesystem path.
    pub fn path<S: Into<String>>(path: S) -> Self {
        Self(path.into())
    }

    /// Embed raw content inline.
    pub fn embed<S: AsRef<str>>(content: S) -> Self {
        Self(format!("{INLINE_TAG}{}", content.as_ref()))
    }

    /// Embed raw content inline, keeping the original file name for display.
    pub fn embed_named(name: &str, content: &str) -> Self {
        Self(format!("{DISPLAYNAME_TAG}{name}{INLINE_TAG}{content}"))
    }

    pub fn is_embedded(&self) -> bool {
        self.0.starts_with(INLINE_TAG) || self.0.starts_with(DISPLAYNAME_TAG)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The embedded content with markers stripped. Returns the raw reference
    /// unchanged when it carries no marker.
    pub fn embedded_content(&self) -> &str {
        match self.0.find(INLINE_TAG) {
            Some(start) => &self.0[start + INLINE_TAG.len()..],
            None => &self.0,
        }
    }

    /// Display name of a named embedded file.
    pub fn display_name(&self) -> Option<&str> {
        let rest = self.0.strip_prefix(DISPLAYNAME_TAG)?;
        let end = rest.find(INLINE_TAG)?;
        Some(&rest[..end])
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.display_name() {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "{}", self.0),
        }
    }
}

/// Render a file reference into config text.
///
/// Embedded content becomes a `<entry>` block (or raw content when no
/// directive name applies, e.g. CA material destined for the shared CA
/// buffer). A path becomes `entry escaped-path`. A missing reference emits a
/// placeholder comment so a mis-saved profile is diagnosable from the
/// generated text.
pub fn insert_file_data(cfg: &mut String, entry: Option<&str>, file: Option<&FileSource>) {
    match file {
        None => {
            cfg.push_str(&format!(
                "# {} file missing in profile\n",
                entry.unwrap_or("referenced")
            ));
        }
        Some(file) if file.is_embedded() => {
            let content = file.embedded_content();
            match entry {
                Some(entry) => {
                    cfg.push_str(&format!("<{entry}>\n{content}\n</{entry}>\n"));
                }
                None => cfg.push_str(content),
            }
        }
        Some(file) => {
            let path = escape(file.as_str());
            match entry {
                Some(entry) => cfg.push_str(&format!("{entry} {path}\n")),
                None => cfg.push_str(&format!("{path}\n")),
            }
        }
    }
}

/// Escape a config argument with the engine's shell-style quoting rules.
///
/// The result is quoted when escaping changed anything, when the argument
/// contains a space, `#` or `;`, or when it is empty.
pub fn escape(unescaped: &str) -> String {
    let escaped = unescaped
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n");

    if escaped == unescaped
        && !escaped.contains(' ')
        && !escaped.contains('#')
        && !escaped.contains(';')
        && !escaped.is_empty()
    {
        unescaped.to_string()
    } else {
        format!("\"{escaped}\"")
    }
}
