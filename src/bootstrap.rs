//! Interception Bootstrap (spec §4.1) - forks the guest, installs the
//! seccomp-notify filter in the child, and hands the supervisor a notifier
//! fd it can trust actually belongs to that child.
//!
//! The notifier fd only exists in the child's own fd table right after
//! `seccomp(2)` returns it there; the supervisor needs a copy of it in its
//! own table to issue ioctls against. `pidfd_getfd` does that transfer, but
//! it needs to be told *which* fd number to fetch, and the child hasn't
//! told the parent anything yet at that point. So this predicts the number
//! the child's filter-install will receive: a descriptor freed by the
//! parent just before forking is the lowest free slot in both the parent's
//! and the (still-identical) child's fd table, so the child's very next
//! fd allocation - the filter install - claims exactly that number. The
//! child asserts the prediction held before doing anything else; the
//! parent retries `pidfd_getfd` for a bit since the child may not have
//! reached the install yet.

use std::os::unix::io::RawFd;
use std::time::Duration;

use nix::unistd::{close, dup, fork, ForkResult, Pid};

use crate::error::BootstrapError;
use crate::filter;

const FETCH_ATTEMPTS: u32 = 100;
const FETCH_RETRY_DELAY: Duration = Duration::from_millis(2);

pub struct BootstrappedGuest {
    pub pid: Pid,
    pub notifier_fd: RawFd,
}

/// Forks and runs `guest_entry` in the child after it has installed the
/// syscall filter. `guest_entry` returning is treated as the guest's exit
/// code; it should end by actually execing the sandboxed program.
pub fn spawn<F>(guest_entry: F) -> Result<BootstrappedGuest, BootstrapError>
where
    F: FnOnce() -> i32,
{
    let predicted = predict_next_fd()?;

    match unsafe { fork() }.map_err(BootstrapError::ForkFailed)? {
        ForkResult::Parent { child } => {
            let notifier_fd = fetch_notifier_fd(child, predicted)?;
            Ok(BootstrappedGuest { pid: child, notifier_fd })
        }
        ForkResult::Child => {
            let installed = filter::install().unwrap_or_else(|_| std::process::exit(127));
            if installed != predicted {
                // The prediction held in every supported kernel/fd-table
                // configuration this was written against; if it doesn't,
                // continuing would hand the supervisor a notifier fd for
                // the wrong child (or none at all), so abort loudly instead.
                std::process::exit(126);
            }
            let status = guest_entry();
            std::process::exit(status);
        }
    }
}

/// Frees the lowest-numbered descriptor the next open in this process
/// (and, until fork splits them, the child's identical table) would reuse.
fn predict_next_fd() -> Result<RawFd, BootstrapError> {
    let probe = dup(0).map_err(BootstrapError::ChannelFailed)?;
    close(probe).map_err(BootstrapError::ChannelFailed)?;
    Ok(probe)
}

fn fetch_notifier_fd(child: Pid, predicted: RawFd) -> Result<RawFd, BootstrapError> {
    for attempt in 0..FETCH_ATTEMPTS {
        let pidfd = unsafe { libc::syscall(libc::SYS_pidfd_open, child.as_raw(), 0) };
        if pidfd < 0 {
            std::thread::sleep(FETCH_RETRY_DELAY);
            continue;
        }
        let fd = unsafe { libc::syscall(libc::SYS_pidfd_getfd, pidfd, predicted, 0) };
        unsafe { libc::close(pidfd as i32) };
        if fd >= 0 {
            if attempt > 0 {
                tracing::debug!(attempt, "pidfd_getfd succeeded after retrying");
            }
            return Ok(fd as RawFd);
        }
        std::thread::sleep(FETCH_RETRY_DELAY);
    }
    Err(BootstrapError::DescriptorFetchExhausted {
        fd: predicted,
        attempts: FETCH_ATTEMPTS,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predict_next_fd_does_not_leak_the_probe() {
        let before = predict_next_fd().unwrap();
        let after = predict_next_fd().unwrap();
        assert_eq!(before, after, "the probe fd must be closed so the number is reusable");
    }
}
