//! Filter Installer (spec §4.7) - builds the classic BPF program that tells
//! the kernel which syscalls to hand to this supervisor via
//! `SECCOMP_RET_USER_NOTIF`, and installs it with `SECCOMP_FILTER_FLAG_NEW_LISTENER`
//! to get back the notifier fd.
//!
//! Earlier notes toward this design sketched a single catch-all filter that
//! notifies on every syscall and lets the dispatcher's routing table sort
//! things out; this version instead encodes the per-syscall routing
//! decision (block / allow / notify) directly into the BPF program, so the
//! kernel itself already short-circuits syscalls the dispatcher would just
//! allow straight through (spec §4.7's "later implementation may specialize
//! per syscall number").

use std::os::unix::io::RawFd;

use crate::dispatcher::{self, Route};
use crate::error::BootstrapError;
use crate::kernel_abi::*;

/// Builds the BPF program and installs it via `seccomp(2)`, returning the
/// notifier fd the kernel allocates. The caller is responsible for
/// predicting and verifying that fd (spec §4.1) before trusting it.
pub fn install() -> Result<RawFd, BootstrapError> {
    let program = build_program();
    install_program(&program)
}

fn build_program() -> Vec<sock_filter> {
    let mut prog = Vec::new();
    // Load the syscall number into the BPF accumulator.
    prog.push(stmt(BPF_LD | BPF_W | BPF_ABS, SECCOMP_DATA_NR_OFFSET));

    let routes = dispatcher::static_routes();
    for &(nr, route) in routes {
        let ret = match route {
            Route::Block => SECCOMP_RET_ERRNO | (libc::EPERM as u32 & SECCOMP_RET_DATA_MASK),
            Route::Continue => SECCOMP_RET_ALLOW,
            Route::Notify => SECCOMP_RET_USER_NOTIF,
        };
        // jeq nr, then: emit a dedicated return; else: fall through to the
        // next comparison. jt/jf are relative jump counts, not indices, so
        // they're recomputed relative to the two instructions we're about
        // to push (the jeq itself and the return).
        prog.push(jump(BPF_JMP | BPF_JEQ | BPF_K, nr as u32, 0, 1));
        prog.push(stmt(BPF_RET | BPF_K, ret));
    }

    // Default action for anything not explicitly routed: hand it to the
    // supervisor rather than silently allowing an unrecognized syscall.
    prog.push(stmt(BPF_RET | BPF_K, SECCOMP_RET_USER_NOTIF));
    prog
}

fn install_program(program: &[sock_filter]) -> Result<RawFd, BootstrapError> {
    let fprog = sock_fprog {
        len: program.len() as u16,
        filter: program.as_ptr(),
    };
    let ret = unsafe {
        libc::syscall(
            libc::SYS_seccomp,
            SECCOMP_SET_MODE_FILTER,
            SECCOMP_FILTER_FLAG_NEW_LISTENER,
            &fprog as *const sock_fprog,
        )
    };
    if ret < 0 {
        return Err(BootstrapError::FilterInstallFailed(std::io::Error::last_os_error()));
    }
    Ok(ret as RawFd)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_always_starts_by_loading_the_syscall_number() {
        let prog = build_program();
        assert_eq!(prog[0].code, BPF_LD | BPF_W | BPF_ABS);
        assert_eq!(prog[0].k, SECCOMP_DATA_NR_OFFSET);
    }

    #[test]
    fn program_ends_with_a_default_notify() {
        let prog = build_program();
        let last = prog.last().unwrap();
        assert_eq!(last.code, BPF_RET | BPF_K);
        assert_eq!(last.k, SECCOMP_RET_USER_NOTIF);
    }

    #[test]
    fn program_is_nonempty_for_every_static_route() {
        let prog = build_program();
        // one jeq+ret pair per routed syscall, plus the initial load and the
        // trailing default.
        assert_eq!(prog.len(), 1 + dispatcher::static_routes().len() * 2 + 1);
    }
}
