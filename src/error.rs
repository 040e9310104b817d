//! Error taxonomy for the supervisor, one enum per subsystem contract.
//!
//! Mirrors the taxonomy in spec §7: bootstrap errors are fatal to the
//! sandbox and never cross back to the guest; everything under
//! `DispatchError` has a concrete errno and is surfaced as a synthesized
//! reply instead.

use std::os::unix::io::RawFd;

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("fork failed: {0}")]
    ForkFailed(#[source] nix::Error),

    #[error("bootstrap channel failed: {0}")]
    ChannelFailed(#[source] nix::Error),

    #[error("predicted notifier fd {predicted} but guest reported {actual}")]
    PredictionMismatch { predicted: RawFd, actual: RawFd },

    #[error("descriptor fetch for fd {fd} exhausted after {attempts} attempts")]
    DescriptorFetchExhausted { fd: RawFd, attempts: u32 },

    #[error("failed to open pidfd for guest {pid}: {source}")]
    PidFdOpenFailed {
        pid: i32,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to install syscall filter: {0}")]
    FilterInstallFailed(#[source] std::io::Error),

    #[error("guest aborted before handing off control")]
    GuestAborted,

    #[error("failed to prepare overlay root: {0}")]
    OverlaySetupFailed(#[source] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("invalid guest address 0x{addr:x} in pid {pid}")]
    InvalidAddress { pid: i32, addr: u64 },

    #[error("partial {op} of {requested} bytes at 0x{addr:x} in pid {pid}: got {actual}")]
    PartialTransfer {
        pid: i32,
        addr: u64,
        op: &'static str,
        requested: usize,
        actual: usize,
    },

    #[error("guest process {pid} vanished")]
    ProcessVanished { pid: i32 },
}

/// Kept uninhabited: `route()` is a total, infallible function (spec §4.4).
/// The type exists so handler code that threads path resolution through a
/// `Result` doesn't need to change shape if a future revision of the router
/// can reject a malformed path outright.
#[derive(Debug, thiserror::Error)]
pub enum PathError {}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("path blocked by policy: {0}")]
    Blocked(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("read-only: {0}")]
    ReadOnly(String),

    #[error("not yet implemented: {0}")]
    NotImplemented(&'static str),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("bad guest pointer")]
    FaultedArgument,

    #[error("path is not absolute")]
    NotAbsolute,

    #[error("path is not valid utf-8 or missing its NUL terminator within the bound")]
    MalformedPath,

    #[error("fd table is full")]
    FdTableFull,

    #[error("no open file at fd {0}")]
    NoSuchFd(i32),

    #[error("caller pid {0} is not registered")]
    UnknownCaller(i32),

    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("syscall {0} has no handler yet")]
    Unimplemented(i64),

    #[error("syscall {0} is not supported")]
    Unsupported(i64),
}

impl DispatchError {
    /// Maps a handler failure to the errno synthesized back to the guest.
    /// Total over every variant - a handler must never produce an absent
    /// reply (spec §4.9/§7).
    pub fn errno(&self) -> i32 {
        match self {
            DispatchError::FaultedArgument => libc::EFAULT,
            DispatchError::NotAbsolute => libc::EINVAL,
            DispatchError::MalformedPath => libc::EINVAL,
            DispatchError::FdTableFull => libc::EMFILE,
            DispatchError::NoSuchFd(_) => libc::EBADF,
            DispatchError::UnknownCaller(_) => libc::ESRCH,
            DispatchError::Memory(MemoryError::InvalidAddress { .. }) => libc::EFAULT,
            DispatchError::Memory(MemoryError::PartialTransfer { .. }) => libc::EFAULT,
            DispatchError::Memory(MemoryError::ProcessVanished { .. }) => libc::ESRCH,
            DispatchError::Backend(BackendError::Blocked(_)) => libc::EACCES,
            DispatchError::Backend(BackendError::NotFound(_)) => libc::ENOENT,
            DispatchError::Backend(BackendError::ReadOnly(_)) => libc::EROFS,
            DispatchError::Backend(BackendError::NotImplemented(_)) => libc::ENOSYS,
            DispatchError::Backend(BackendError::Io { .. }) => libc::EIO,
            DispatchError::Unimplemented(_) => libc::ENOSYS,
            DispatchError::Unsupported(_) => libc::ENOSYS,
        }
    }
}
