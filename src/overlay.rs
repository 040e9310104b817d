//! Sandbox identity and overlay storage root (spec §3, §4.6).
//!
//! The spec's data model calls the sandbox identifier a 128-bit value, but
//! its external-interfaces section renders it as a 16-hex-char directory
//! name (64 bits) under `/tmp/.bvisor/<uid>`. We keep the full 128-bit
//! `Uuid` as the canonical identity (so two sandboxes can never collide in
//! memory) and render only its high 64 bits as 16 hex characters for the
//! on-disk path, resolving that inconsistency in favor of "128-bit identity,
//! 64-bit-derived path" rather than truncating the identity itself.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::BootstrapError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SandboxId(uuid::Uuid);

impl SandboxId {
    pub fn new() -> Self {
        SandboxId(uuid::Uuid::new_v4())
    }

    /// 16 lowercase hex characters derived from the high 64 bits of the
    /// underlying UUID - the form spec §6 uses for the overlay directory.
    pub fn short(&self) -> String {
        let bytes = self.0.as_bytes();
        bytes[..8].iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl Default for SandboxId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SandboxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short())
    }
}

/// Root of the overlay storage used by the `cow` and `tmp` backends,
/// scoped to one sandbox instance under `/tmp/.bvisor/<id>/`. The path
/// router blocks guest access to `/tmp/.bvisor` outright so the guest can
/// never read or tamper with its own overlay storage directly.
#[derive(Debug, Clone)]
pub struct OverlayRoot {
    id: SandboxId,
    base: PathBuf,
}

impl OverlayRoot {
    pub fn create(id: SandboxId) -> Result<Self, BootstrapError> {
        let base = PathBuf::from("/tmp/.bvisor").join(id.short());
        std::fs::create_dir_all(base.join("cow")).map_err(BootstrapError::OverlaySetupFailed)?;
        std::fs::create_dir_all(base.join("tmp")).map_err(BootstrapError::OverlaySetupFailed)?;
        Ok(OverlayRoot { id, base })
    }

    pub fn id(&self) -> SandboxId {
        self.id
    }

    /// Where a copy-on-write staged copy of `guest_path` lives.
    pub fn cow_path(&self, guest_path: &str) -> PathBuf {
        self.base.join("cow").join(guest_path.trim_start_matches('/'))
    }

    /// Where a private `/tmp` file lives, keyed only by its own relative
    /// name under `/tmp` - never copy-on-write staged from a host original.
    pub fn tmp_path(&self, guest_path: &str) -> PathBuf {
        let rel = guest_path.trim_start_matches("/tmp").trim_start_matches('/');
        self.base.join("tmp").join(rel)
    }

    pub fn root(&self) -> &Path {
        &self.base
    }

    pub fn remove_all(&self) -> io::Result<()> {
        if self.base.exists() {
            std::fs::remove_dir_all(&self.base)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_is_sixteen_hex_chars() {
        let id = SandboxId::new();
        let s = id.short();
        assert_eq!(s.len(), 16);
        assert!(s.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn distinct_ids_render_distinct_short_forms_with_overwhelming_probability() {
        let a = SandboxId::new();
        let b = SandboxId::new();
        assert_ne!(a, b);
        assert_ne!(a.short(), b.short());
    }

    #[test]
    fn tmp_path_strips_the_tmp_prefix() {
        let root = OverlayRoot {
            id: SandboxId::new(),
            base: PathBuf::from("/tmp/.bvisor/deadbeefdeadbeef"),
        };
        assert_eq!(
            root.tmp_path("/tmp/foo/bar"),
            PathBuf::from("/tmp/.bvisor/deadbeefdeadbeef/tmp/foo/bar")
        );
    }
}
