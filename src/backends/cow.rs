//! Copy-on-write backend - the default for any guest path that isn't
//! `/proc`, `/tmp`, a blocked prefix, or an allowed `/dev` leaf.
//!
//! The first time a guest path is opened for writing, its current host
//! contents (if any) are staged into the sandbox's overlay and all further
//! opens of that path - read or write - are redirected to the staged copy.
//! A read-only open of a path that has never been staged is served
//! straight from the host read-only, so a guest that only ever reads files
//! never pays the copy cost.

use std::ffi::CString;
use std::path::Path;

use nix::fcntl::{open, OFlag};
use nix::sys::stat::Mode;

use super::OpenFile;
use crate::error::BackendError;
use crate::overlay::OverlayRoot;

pub fn open_cow(overlay: &OverlayRoot, guest_path: &str, flags: OFlag) -> Result<OpenFile, BackendError> {
    let staged = overlay.cow_path(guest_path);
    let wants_write = flags.intersects(OFlag::O_WRONLY | OFlag::O_RDWR | OFlag::O_CREAT | OFlag::O_TRUNC);

    if !wants_write && !staged.exists() {
        return open_host_readonly(guest_path, flags);
    }

    if !staged.exists() {
        stage_from_host(guest_path, &staged)?;
    }
    open_staged(&staged, flags)
}

fn open_host_readonly(guest_path: &str, flags: OFlag) -> Result<OpenFile, BackendError> {
    let cpath = CString::new(guest_path).map_err(|_| BackendError::NotFound(guest_path.into()))?;
    let fd = open(&cpath, flags, Mode::empty()).map_err(|e| BackendError::Io {
        path: guest_path.into(),
        source: std::io::Error::from_raw_os_error(e as i32),
    })?;
    Ok(OpenFile::Cow { fd })
}

fn stage_from_host(guest_path: &str, staged: &Path) -> Result<(), BackendError> {
    if let Some(parent) = staged.parent() {
        std::fs::create_dir_all(parent).map_err(|e| BackendError::Io {
            path: staged.display().to_string(),
            source: e,
        })?;
    }
    match std::fs::copy(guest_path, staged) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            // No host original - a write will create one fresh under the overlay.
            Ok(())
        }
        Err(e) => Err(BackendError::Io {
            path: guest_path.into(),
            source: e,
        }),
    }
}

fn open_staged(staged: &Path, flags: OFlag) -> Result<OpenFile, BackendError> {
    let cpath = CString::new(staged.as_os_str().to_string_lossy().as_bytes())
        .map_err(|_| BackendError::NotFound(staged.display().to_string()))?;
    let fd = open(&cpath, flags | OFlag::O_CREAT, Mode::S_IRUSR | Mode::S_IWUSR).map_err(|e| {
        BackendError::Io {
            path: staged.display().to_string(),
            source: std::io::Error::from_raw_os_error(e as i32),
        }
    })?;
    Ok(OpenFile::Cow { fd })
}
