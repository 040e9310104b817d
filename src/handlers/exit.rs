//! `exit_group` and `clone` handlers (spec §4.9) - the two syscalls that
//! change how many guest tasks the supervisor is tracking.

use crate::dispatcher::{DispatchContext, Notification, Reply};
use crate::error::DispatchError;
use crate::process::ProcessState;

pub fn handle_exit_group(ctx: &mut DispatchContext, notif: &Notification) -> Result<Reply, DispatchError> {
    if let Some(process) = ctx.registry.get(notif.pid) {
        process.set_state(ProcessState::Exited(notif.args[0] as i32));
    }
    ctx.registry.remove(notif.pid);
    // The reply must let the kernel actually run exit_group - synthesizing
    // a return here would leave the guest task parked instead of reaped.
    Ok(Reply::ContinueInKernel)
}

/// `clone` itself is allowed to run for real; the supervisor has no child
/// pid to register until the new task's *own* first notification arrives
/// (the dispatcher's lazy-discovery path in `Dispatcher::step`). What this
/// handler does is record which namespace that eventual child belongs in -
/// a fresh one if the guest asked for `CLONE_NEWPID`, otherwise the
/// caller's own.
pub fn handle_clone(ctx: &mut DispatchContext, notif: &Notification) -> Result<Reply, DispatchError> {
    let caller = ctx.registry.get(notif.pid).ok_or(DispatchError::UnknownCaller(notif.pid))?;
    let flags = notif.args[0] as i32;
    let namespace = if flags & libc::CLONE_NEWPID != 0 {
        caller.namespace().child()
    } else {
        caller.namespace()
    };
    ctx.pending_child = Some(crate::dispatcher::PendingChild {
        parent_kernel_pid: notif.pid,
        namespace,
    });
    Ok(Reply::ContinueInKernel)
}
