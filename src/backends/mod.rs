//! File Backends (spec §4.2) - the tagged-variant set of things an entry in
//! the [`FdTable`](crate::fd_table::FdTable) can actually be. The path
//! router (§4.4) decides *which* variant a fresh `openat` gets; this module
//! implements what each variant does for `read`/`write`/`readv`/`writev`.

mod cow;
mod passthrough;
mod proc_fs;
mod tmp;

pub use cow::open_cow;
pub use passthrough::open_passthrough;
pub use proc_fs::{open_proc, ProcTarget, StatusFields};
pub use tmp::open_tmp;

use std::os::unix::io::RawFd;

use crate::error::BackendError;

/// One open file, however it's actually backed. Cheap to clone: passthrough
/// and cow/tmp variants hold a plain `RawFd` (clone shares the same kernel
/// file description, mirroring what `fork()` does to real fd tables), and
/// `Proc` shares its cursor through an `Rc<RefCell<_>>` so a cloned fd-table
/// entry keeps reading from wherever the original had gotten to.
#[derive(Debug, Clone)]
pub enum OpenFile {
    /// Forwarded straight to the real fd - used for `/dev/{null,zero,random,urandom}`
    /// and for the guest's inherited stdio.
    Passthrough { fd: RawFd },
    /// Copy-on-write staged file under the sandbox's overlay.
    Cow { fd: RawFd },
    /// Private `/tmp` file under the sandbox's overlay, never staged from a
    /// host original.
    Tmp { fd: RawFd },
    /// Synthesized `/proc` entry.
    Proc(proc_fs::ProcFile),
}

impl OpenFile {
    pub fn read(&self, buf: &mut [u8]) -> Result<usize, BackendError> {
        match self {
            OpenFile::Passthrough { fd } | OpenFile::Cow { fd } | OpenFile::Tmp { fd } => {
                read_raw(*fd, buf)
            }
            OpenFile::Proc(file) => Ok(file.read(buf)),
        }
    }

    pub fn write(&self, buf: &[u8]) -> Result<usize, BackendError> {
        match self {
            OpenFile::Passthrough { fd } | OpenFile::Cow { fd } => write_raw(*fd, buf),
            OpenFile::Tmp { fd } => write_raw(*fd, buf),
            OpenFile::Proc(_) => Err(BackendError::ReadOnly("/proc entry".into())),
        }
    }
}

fn read_raw(fd: RawFd, buf: &mut [u8]) -> Result<usize, BackendError> {
    nix::unistd::read(fd, buf).map_err(|e| BackendError::Io {
        path: format!("fd {fd}"),
        source: std::io::Error::from_raw_os_error(e as i32),
    })
}

fn write_raw(fd: RawFd, buf: &[u8]) -> Result<usize, BackendError> {
    nix::unistd::write(fd, buf).map_err(|e| BackendError::Io {
        path: format!("fd {fd}"),
        source: std::io::Error::from_raw_os_error(e as i32),
    })
}
