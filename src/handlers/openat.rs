//! `openat` handler (spec §4.9) - the only syscall that actually consults
//! the path router. Every other filesystem operation works against an fd
//! this handler already resolved and inserted into the caller's table.

use nix::fcntl::OFlag;

use crate::backends::{self, ProcTarget, StatusFields};
use crate::dispatcher::{DispatchContext, Notification, Reply};
use crate::error::{BackendError, DispatchError};
use crate::memory::MemoryBridge;
use crate::path_router::{self, Backend, RouteDecision};
use crate::process::VirtualProcess;

pub fn handle_openat(ctx: &mut DispatchContext, notif: &Notification) -> Result<Reply, DispatchError> {
    let process = ctx.registry.get(notif.pid).ok_or(DispatchError::UnknownCaller(notif.pid))?;

    let bridge = MemoryBridge::new(notif.pid);
    let raw_path = bridge.read_cstring(notif.args[1])?;
    let path = String::from_utf8(raw_path).map_err(|_| DispatchError::MalformedPath)?;
    if !path.starts_with('/') {
        return Err(DispatchError::NotAbsolute);
    }

    let flags = OFlag::from_bits_truncate(notif.args[2] as i32);
    let normalized = path_router::normalize(&path);

    let file = match path_router::route(&normalized) {
        RouteDecision::Blocked => return Err(DispatchError::Backend(BackendError::Blocked(normalized))),
        RouteDecision::Backend(Backend::Passthrough) => backends::open_passthrough(&normalized, flags)?,
        RouteDecision::Backend(Backend::Cow) => backends::open_cow(&ctx.overlay, &normalized, flags)?,
        RouteDecision::Backend(Backend::Tmp) => backends::open_tmp(&ctx.overlay, &normalized, flags)?,
        RouteDecision::Backend(Backend::Proc) => open_proc_path(ctx, &process, &normalized)?,
    };

    let fd = process.fd_table().insert(file)?;
    Ok(Reply::Value(fd as i64))
}

fn open_proc_path(
    ctx: &DispatchContext,
    caller: &VirtualProcess,
    path: &str,
) -> Result<backends::OpenFile, DispatchError> {
    let rest = path.strip_prefix("/proc").unwrap_or("");
    let rest = rest.trim_start_matches('/');
    let mut parts = rest.splitn(2, '/');
    let target_segment = parts.next().unwrap_or("");
    let child = parts.next().unwrap_or("");

    let (target_kind, target_process) = if target_segment == "self" {
        (ProcTarget::SelfStatus, Some(caller.clone()))
    } else if let Ok(ns_pid) = target_segment.parse::<i32>() {
        let kernel_pid = caller
            .namespace()
            .kernel_pid_of(ns_pid)
            .ok_or_else(|| DispatchError::Backend(BackendError::NotFound(path.to_string())))?;
        if !ctx.registry.can_see(caller.kernel_pid(), kernel_pid) {
            return Err(DispatchError::Backend(BackendError::NotFound(path.to_string())));
        }
        let proc = ctx
            .registry
            .get(kernel_pid)
            .ok_or_else(|| DispatchError::Backend(BackendError::NotFound(path.to_string())))?;
        (ProcTarget::PidStatus(ns_pid), Some(proc))
    } else {
        (ProcTarget::Empty, None)
    };

    if target_kind != ProcTarget::Empty && child != "status" && !child.is_empty() {
        return Ok(backends::open_proc(ProcTarget::Empty, None));
    }

    let fields = target_process.map(|p| StatusFields {
        ns_pid: p.ns_pid(),
        ns_ppid: p.ns_ppid(),
        comm: p.comm(),
        state: match p.state() {
            crate::process::ProcessState::Running => 'R',
            crate::process::ProcessState::Exited(_) => 'Z',
        },
    });
    Ok(backends::open_proc(target_kind, fields))
}
