//! Dispatcher (spec §4.7/§4.9) - drains the seccomp notifier fd one
//! notification at a time, routes each to a handler by syscall number, and
//! writes back exactly one reply per notification it accepts.
//!
//! Single-threaded and cooperative: there is never more than one
//! notification in flight, so every handler can mutate the process
//! registry, namespace tree and fd tables directly without locking.

use std::collections::HashMap;
use std::os::unix::io::RawFd;

use crate::error::DispatchError;
use crate::handlers;
use crate::kernel_abi::{self, seccomp_notif, seccomp_notif_resp};
use crate::namespace::Namespace;
use crate::overlay::OverlayRoot;
use crate::process::ProcessRegistry;

/// One decoded seccomp-notify event: which guest task, which syscall, and
/// the six raw argument registers exactly as the kernel delivered them.
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: u64,
    pub pid: i32,
    pub nr: i64,
    pub args: [u64; 6],
}

impl Notification {
    fn from_raw(raw: &seccomp_notif) -> Self {
        Notification {
            id: raw.id,
            pid: raw.pid as i32,
            nr: raw.data.nr as i64,
            args: raw.data.args,
        }
    }
}

/// What a handler wants the guest's interrupted syscall to resolve to.
#[derive(Debug, Clone, Copy)]
pub enum Reply {
    /// Synthesize this return value (errno encoded separately when < 0 is
    /// not itself the convention - see [`Dispatcher::send_reply`]).
    Value(i64),
    /// Let the kernel actually run the syscall, e.g. a `write` to the
    /// guest's real stdout/stderr, or `exit_group`, which must truly
    /// terminate the task rather than be synthesized.
    ContinueInKernel,
}

pub type HandlerFn = fn(&mut DispatchContext, &Notification) -> Result<Reply, DispatchError>;

/// Shared state every handler operates on.
pub struct DispatchContext {
    pub registry: ProcessRegistry,
    pub root_namespace: Namespace,
    pub overlay: OverlayRoot,
    /// Set by the `clone` handler, consumed by the dispatcher's lazy
    /// child-discovery path the first time a notification arrives from a
    /// pid the registry doesn't know yet. There is a real race here: a
    /// guest that calls `clone` twice in a row before either child's first
    /// syscall lands would overwrite this before it's consumed. Accepted
    /// as an open question (see DESIGN.md) rather than solved with a
    /// queue, since the supervisor is single-threaded and the common case
    /// is one outstanding clone at a time.
    pub pending_child: Option<PendingChild>,
}

#[derive(Debug, Clone)]
pub struct PendingChild {
    pub parent_kernel_pid: i32,
    pub namespace: Namespace,
}

/// The BPF-level action for a syscall, decided once at filter-build time
/// (spec §4.7). Everything this supervisor has a handler for is routed to
/// `Notify`; a future syscall with no guest-visible state to virtualize
/// could be added here as `Continue` without ever reaching the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Block,
    Continue,
    Notify,
}

/// The fixed syscall/action table the filter installer compiles into BPF
/// and the dispatcher's routing table is built from. Kept as one flat list
/// so the two stay in lockstep by construction.
pub fn static_routes() -> &'static [(i64, Route)] {
    &[
        (libc::SYS_read, Route::Notify),
        (libc::SYS_write, Route::Notify),
        (libc::SYS_readv, Route::Notify),
        (libc::SYS_writev, Route::Notify),
        (libc::SYS_openat, Route::Notify),
        (libc::SYS_getpid, Route::Notify),
        (libc::SYS_getppid, Route::Notify),
        (libc::SYS_kill, Route::Notify),
        (libc::SYS_exit_group, Route::Notify),
        (libc::SYS_clone, Route::Notify),
    ]
}

fn routing_table() -> HashMap<i64, HandlerFn> {
    let mut table: HashMap<i64, HandlerFn> = HashMap::new();
    table.insert(libc::SYS_read, handlers::rw::handle_read);
    table.insert(libc::SYS_write, handlers::rw::handle_write);
    table.insert(libc::SYS_readv, handlers::rw::handle_readv);
    table.insert(libc::SYS_writev, handlers::rw::handle_writev);
    table.insert(libc::SYS_openat, handlers::openat::handle_openat);
    table.insert(libc::SYS_getpid, handlers::identity::handle_getpid);
    table.insert(libc::SYS_getppid, handlers::identity::handle_getppid);
    table.insert(libc::SYS_kill, handlers::kill::handle_kill);
    table.insert(libc::SYS_exit_group, handlers::exit::handle_exit_group);
    table.insert(libc::SYS_clone, handlers::exit::handle_clone);
    table
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Running,
    Draining,
    Terminated,
}

pub struct Dispatcher {
    notifier_fd: RawFd,
    guest_pid: i32,
    state: State,
    routing: HashMap<i64, HandlerFn>,
    pub context: DispatchContext,
}

impl Dispatcher {
    pub fn new(notifier_fd: RawFd, guest_pid: i32, context: DispatchContext) -> Self {
        Dispatcher {
            notifier_fd,
            guest_pid,
            state: State::Running,
            routing: routing_table(),
            context,
        }
    }

    /// Runs until the guest's initial task has exited and every notification
    /// already received has been answered. `Draining` lets the dispatcher
    /// keep serving syscalls from still-live children even after the
    /// top-level task's `exit_group` has been observed and replied to.
    pub fn run(&mut self) -> std::io::Result<()> {
        while self.state != State::Terminated {
            let raw = match self.recv() {
                Ok(raw) => raw,
                Err(e) if e.raw_os_error() == Some(libc::ENOENT) => continue,
                Err(e) => return Err(e),
            };
            let notif = Notification::from_raw(&raw);
            self.step(&notif)?;
            if self.state == State::Draining && self.context.registry.is_empty() {
                self.state = State::Terminated;
            }
        }
        Ok(())
    }

    fn step(&mut self, notif: &Notification) -> std::io::Result<()> {
        if self.context.registry.get(notif.pid).is_none() {
            self.lazily_register(notif.pid);
        }
        let reply = match self.routing.get(&notif.nr) {
            Some(handler) => handler(&mut self.context, notif),
            None => Err(DispatchError::Unimplemented(notif.nr)),
        };
        if notif.nr == libc::SYS_exit_group && self.context.registry.get(self.guest_pid).is_none() {
            self.state = State::Draining;
        }
        self.send_reply(notif.id, reply)
    }

    /// Registers a task the registry hasn't seen yet, using the namespace
    /// recorded by the most recent `clone` handler if one matches, or
    /// falling back to the guest's root namespace with the initial task as
    /// parent. The fallback only fires for the very first notification
    /// this dispatcher ever receives (the sandbox's own entry task).
    fn lazily_register(&mut self, kernel_pid: i32) {
        use crate::fd_table::FdTable;

        let (ppid, namespace, fd_table) = match self.context.pending_child.take() {
            Some(pending) => {
                let parent_table = self
                    .context
                    .registry
                    .get(pending.parent_kernel_pid)
                    .map(|p| p.fd_table().clone_table())
                    .unwrap_or_default();
                (pending.parent_kernel_pid, pending.namespace, parent_table)
            }
            None => (0, self.context.root_namespace.clone(), FdTable::new()),
        };
        self.context
            .registry
            .register(kernel_pid, ppid, namespace, fd_table, format!("pid-{kernel_pid}"));
    }

    fn send_reply(&self, id: u64, reply: Result<Reply, DispatchError>) -> std::io::Result<()> {
        let mut resp = seccomp_notif_resp::default();
        resp.id = id;
        match reply {
            Ok(Reply::Value(v)) => {
                resp.val = v;
                resp.error = 0;
            }
            Ok(Reply::ContinueInKernel) => {
                resp.flags = 1; // SECCOMP_USER_NOTIF_FLAG_CONTINUE
            }
            Err(e) => {
                resp.val = -1;
                resp.error = e.errno();
            }
        }
        self.send(&mut resp)
    }

    fn recv(&self) -> std::io::Result<seccomp_notif> {
        let mut notif = seccomp_notif::default();
        unsafe { kernel_abi::seccomp_notif_recv(self.notifier_fd, &mut notif) }
            .map_err(|e| std::io::Error::from_raw_os_error(e as i32))?;
        Ok(notif)
    }

    fn send(&self, resp: &mut seccomp_notif_resp) -> std::io::Result<()> {
        unsafe { kernel_abi::seccomp_notif_send(self.notifier_fd, resp) }
            .map_err(|e| std::io::Error::from_raw_os_error(e as i32))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routing_table_covers_every_statically_routed_syscall() {
        let table = routing_table();
        for &(nr, route) in static_routes() {
            if route == Route::Notify {
                assert!(table.contains_key(&nr), "missing handler for syscall {nr}");
            }
        }
    }

    #[test]
    fn static_routes_has_no_duplicate_syscall_numbers() {
        let mut seen = std::collections::HashSet::new();
        for &(nr, _) in static_routes() {
            assert!(seen.insert(nr), "duplicate route for syscall {nr}");
        }
    }
}
