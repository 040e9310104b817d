//! Passthrough backend - opens the real path on the host and hands the raw
//! fd straight to the guest's virtual fd table. Used only for the `/dev`
//! leaves the path router allows through (`null`, `zero`, `random`,
//! `urandom`); every other path either gets blocked or rerouted to cow/tmp.

use std::ffi::CString;

use nix::fcntl::{open, OFlag};
use nix::sys::stat::Mode;

use super::OpenFile;
use crate::error::BackendError;

pub fn open_passthrough(host_path: &str, flags: OFlag) -> Result<OpenFile, BackendError> {
    let cpath = CString::new(host_path).map_err(|_| BackendError::NotFound(host_path.into()))?;
    let fd = open(&cpath, flags, Mode::empty()).map_err(|e| BackendError::Io {
        path: host_path.into(),
        source: std::io::Error::from_raw_os_error(e as i32),
    })?;
    Ok(OpenFile::Passthrough { fd })
}
