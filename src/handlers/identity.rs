//! `getpid`/`getppid` handlers (spec §4.9) - always answered from the
//! caller's own namespace view, never the kernel's, so a guest never
//! observes a pid number from outside the namespace it's running in.

use crate::dispatcher::{DispatchContext, Notification, Reply};
use crate::error::DispatchError;

pub fn handle_getpid(ctx: &mut DispatchContext, notif: &Notification) -> Result<Reply, DispatchError> {
    let process = ctx.registry.get(notif.pid).ok_or(DispatchError::UnknownCaller(notif.pid))?;
    Ok(Reply::Value(process.ns_pid() as i64))
}

pub fn handle_getppid(ctx: &mut DispatchContext, notif: &Notification) -> Result<Reply, DispatchError> {
    let process = ctx.registry.get(notif.pid).ok_or(DispatchError::UnknownCaller(notif.pid))?;
    Ok(Reply::Value(process.ns_ppid() as i64))
}
