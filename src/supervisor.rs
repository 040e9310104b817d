//! Top-level wiring (spec §6) - the embedding API a host program uses to
//! launch a sandboxed guest and drive it to completion.

use std::ffi::CString;
use std::path::PathBuf;

use nix::unistd::Pid;

use crate::bootstrap;
use crate::dispatcher::{DispatchContext, Dispatcher};
use crate::error::BootstrapError;
use crate::fd_table::FdTable;
use crate::namespace::Namespace;
use crate::overlay::{OverlayRoot, SandboxId};
use crate::process::ProcessRegistry;

/// What to run inside the sandbox.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl SandboxConfig {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        SandboxConfig { program: program.into(), args: Vec::new() }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

/// Owns the sandbox's overlay storage and dispatcher for the lifetime of
/// one guest run. Dropping a `Supervisor` tears down its overlay directory;
/// the guest itself must already have exited by then (`run` only returns
/// once the dispatcher has drained every task it's tracking).
pub struct Supervisor {
    id: SandboxId,
    overlay: OverlayRoot,
    guest_pid: Pid,
    dispatcher: Dispatcher,
}

impl Supervisor {
    /// Forks the guest, installs its filter, and registers its initial
    /// task in a fresh namespace before returning. Call [`Supervisor::run`]
    /// to actually drive the notification loop.
    pub fn launch(config: SandboxConfig) -> Result<Self, BootstrapError> {
        let id = SandboxId::new();
        tracing::info!(sandbox_id = %id, program = %config.program.display(), "launching sandbox");
        let overlay = OverlayRoot::create(id)?;
        let root_namespace = Namespace::root();

        let program = config.program.clone();
        let args = config.args.clone();
        let guest = bootstrap::spawn(move || exec_guest(&program, &args))?;

        tracing::debug!(pid = guest.pid.as_raw(), notifier_fd = guest.notifier_fd, "guest bootstrapped");

        let mut registry = ProcessRegistry::new();
        let comm = config
            .program
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "guest".into());
        registry.register(guest.pid.as_raw(), 0, root_namespace.clone(), FdTable::new(), comm);

        let context = DispatchContext {
            registry,
            root_namespace,
            overlay: overlay.clone(),
            pending_child: None,
        };
        let dispatcher = Dispatcher::new(guest.notifier_fd, guest.pid.as_raw(), context);

        Ok(Supervisor { id, overlay, guest_pid: guest.pid, dispatcher })
    }

    pub fn id(&self) -> SandboxId {
        self.id
    }

    pub fn guest_pid(&self) -> Pid {
        self.guest_pid
    }

    /// Drives the notification loop until the guest's tracked tasks have
    /// all exited.
    pub fn run(&mut self) -> std::io::Result<()> {
        let span = tracing::debug_span!("sandbox", sandbox_id = %self.id);
        let _enter = span.enter();
        self.dispatcher.run()
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        if let Err(e) = self.overlay.remove_all() {
            tracing::warn!(sandbox_id = %self.id, error = %e, "failed to clean up overlay storage");
        }
    }
}

/// Runs inside the forked child, after the filter is installed: execs the
/// configured program. Only returns (with a synthetic exit code) if the
/// exec itself fails.
fn exec_guest(program: &std::path::Path, args: &[String]) -> i32 {
    let program_c = match CString::new(program.as_os_str().to_string_lossy().as_bytes()) {
        Ok(c) => c,
        Err(_) => return 127,
    };
    let mut argv: Vec<CString> = vec![program_c.clone()];
    for arg in args {
        if let Ok(c) = CString::new(arg.as_str()) {
            argv.push(c);
        }
    }
    match nix::unistd::execv(&program_c, &argv) {
        Ok(_) => unreachable!("execv only returns on error"),
        Err(_) => 127,
    }
}
