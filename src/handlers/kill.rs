//! `kill` handler (spec §4.9) - translates a namespace-local target pid
//! into the real kernel pid before actually signaling anything, and
//! refuses to signal a target the caller's namespace can't see.

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;

use crate::dispatcher::{DispatchContext, Notification, Reply};
use crate::error::DispatchError;

pub fn handle_kill(ctx: &mut DispatchContext, notif: &Notification) -> Result<Reply, DispatchError> {
    let caller = ctx.registry.get(notif.pid).ok_or(DispatchError::UnknownCaller(notif.pid))?;
    let target_ns_pid = notif.args[0] as i32;
    let raw_signal = notif.args[1] as i32;

    let target_kernel_pid = caller
        .namespace()
        .kernel_pid_of(target_ns_pid)
        .ok_or(DispatchError::UnknownCaller(target_ns_pid))?;
    if !ctx.registry.can_see(notif.pid, target_kernel_pid) {
        return Err(DispatchError::UnknownCaller(target_ns_pid));
    }

    if raw_signal == 0 {
        // A zero signal only probes for existence/permission - nothing to deliver.
        return Ok(Reply::Value(0));
    }
    let signal = Signal::try_from(raw_signal).map_err(|_| DispatchError::Unsupported(libc::SYS_kill))?;
    signal::kill(Pid::from_raw(target_kernel_pid), signal)
        .map_err(|_| DispatchError::UnknownCaller(target_ns_pid))?;
    Ok(Reply::Value(0))
}
