//! Standalone proof of the interception bootstrap: forks `/bin/true`,
//! installs the syscall filter in the child, and reports the notifier fd
//! the parent recovered via `pidfd_getfd`. Requires the privilege to
//! install a `SECCOMP_FILTER_FLAG_NEW_LISTENER` filter (typically
//! `CAP_SYS_ADMIN` or an unprivileged-user-namespace-enabled kernel); on a
//! sandboxed CI runner this is expected to print an error rather than a
//! notifier fd, which is itself useful signal about the host's policy.

use bvisor::bootstrap;

fn main() {
    match bootstrap::spawn(|| {
        // Runs inside the forked child, after the filter install succeeded.
        unsafe { libc::_exit(0) };
    }) {
        Ok(guest) => {
            println!("guest pid:    {}", guest.pid);
            println!("notifier fd:  {}", guest.notifier_fd);
            let _ = nix::sys::wait::waitpid(guest.pid, None);
        }
        Err(e) => {
            eprintln!("bootstrap failed (expected without seccomp-notify privileges): {e}");
        }
    }
}
