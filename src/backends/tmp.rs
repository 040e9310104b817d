//! `/tmp` backend - a private overlay for the guest's own `/tmp`, with no
//! copy-on-write staging from a host original (real `/tmp` content is never
//! visible to the guest; every `/tmp` path is sandbox-local from the start).

use std::ffi::CString;

use nix::fcntl::{open, OFlag};
use nix::sys::stat::Mode;

use super::OpenFile;
use crate::error::BackendError;
use crate::overlay::OverlayRoot;

pub fn open_tmp(overlay: &OverlayRoot, guest_path: &str, flags: OFlag) -> Result<OpenFile, BackendError> {
    let target = overlay.tmp_path(guest_path);
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(|e| BackendError::Io {
            path: target.display().to_string(),
            source: e,
        })?;
    }
    let cpath = CString::new(target.as_os_str().to_string_lossy().as_bytes())
        .map_err(|_| BackendError::NotFound(target.display().to_string()))?;
    let fd = open(&cpath, flags | OFlag::O_CREAT, Mode::S_IRUSR | Mode::S_IWUSR).map_err(|e| {
        BackendError::Io {
            path: target.display().to_string(),
            source: std::io::Error::from_raw_os_error(e as i32),
        }
    })?;
    Ok(OpenFile::Tmp { fd })
}
