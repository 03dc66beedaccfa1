//! Profile persistence.
//!
//! Profiles are stored as one JSON file per identifier. The store is the
//! only shared mutable state in the pipeline; a mutex serializes access so
//! concurrent attempts cannot interleave partial writes.

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::profile::VpnProfile;

/// Directory-backed profile store keyed by profile uuid.
pub struct ProfileStore {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl ProfileStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self {
            dir: dir.into(),
            lock: Mutex::new(()),
        }
    }

    fn profile_path(&self, uuid: Uuid) -> PathBuf {
        self.dir.join(format!("{uuid}.vp.json"))
    }

    /// Save a profile. Temporary profiles are never persisted.
    pub fn save(&self, profile: &VpnProfile) -> Result<()> {
        if profile.temporary {
            debug!(profile = %profile.uuid(), "not persisting temporary profile");
            return Ok(());
        }

        let _guard = self.lock.lock().expect("profile store lock poisoned");
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create profile dir: {}", self.dir.display()))?;

        let content =
            serde_json::to_string_pretty(profile).context("Failed to serialize profile")?;
        let path = self.profile_path(profile.uuid());
        fs::write(&path, content)
            .with_context(|| format!("Failed to write profile: {}", path.display()))?;
        Ok(())
    }

    /// Load a profile by identifier.
    pub fn load(&self, uuid: Uuid) -> Result<VpnProfile> {
        let _guard = self.lock.lock().expect("profile store lock poisoned");
        let path = self.profile_path(uuid);
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read profile: {}", path.display()))?;
        let profile: VpnProfile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse profile: {}", path.display()))?;
        Ok(profile)
    }

    /// Delete a profile by identifier. Deleting a missing profile is not an
    /// error.
    pub fn delete(&self, uuid: Uuid) -> Result<()> {
        let _guard = self.lock.lock().expect("profile store lock poisoned");
        let path = self.profile_path(uuid);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to delete profile: {}", path.display())),
        }
    }

    /// Load every profile in the store. Unreadable entries are skipped with
    /// a warning rather than failing the whole listing.
    pub fn list(&self) -> Result<Vec<VpnProfile>> {
        let _guard = self.lock.lock().expect("profile store lock poisoned");
        let mut profiles = Vec::new();

        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(profiles),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to list profiles: {}", self.dir.display()))
            }
        };

        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match fs::read_to_string(&path)
                .map_err(anyhow::Error::from)
                .and_then(|c| serde_json::from_str::<VpnProfile>(&c).map_err(Into::into))
            {
                Ok(profile) => profiles.push(profile),
                Err(e) => warn!("Skipping unreadable profile {}: {e}", path.display()),
            }
        }

        // Stable order for callers that render lists
        profiles.sort_by(|a, b| a.name.cmp(&b.name).then(a.uuid().cmp(&b.uuid())));
        Ok(profiles)
    }
}
