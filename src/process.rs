//! Virtual process registry (spec §4.1/§4.5) - the supervisor's model of
//! every guest task it knows about, keyed by kernel pid.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::fd_table::FdTable;
use crate::namespace::Namespace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Running,
    Exited(i32),
}

#[derive(Debug)]
struct Inner {
    kernel_pid: i32,
    kernel_ppid: i32,
    namespace: Namespace,
    fd_table: FdTable,
    comm: String,
    state: ProcessState,
}

/// One entry in the registry: a guest task's kernel identity, the
/// namespace it was registered into, its own fd table, and a cached
/// `comm` name so `/proc/<pid>/status` doesn't need to re-read
/// `/proc/<kernel_pid>/comm` on every call.
#[derive(Debug, Clone)]
pub struct VirtualProcess(Rc<RefCell<Inner>>);

impl VirtualProcess {
    pub fn kernel_pid(&self) -> i32 {
        self.0.borrow().kernel_pid
    }

    pub fn kernel_ppid(&self) -> i32 {
        self.0.borrow().kernel_ppid
    }

    pub fn namespace(&self) -> Namespace {
        self.0.borrow().namespace.clone()
    }

    pub fn fd_table(&self) -> FdTable {
        self.0.borrow().fd_table.clone()
    }

    pub fn comm(&self) -> String {
        self.0.borrow().comm.clone()
    }

    pub fn state(&self) -> ProcessState {
        self.0.borrow().state
    }

    pub fn set_state(&self, state: ProcessState) {
        self.0.borrow_mut().state = state;
    }

    pub fn ns_pid(&self) -> i32 {
        let inner = self.0.borrow();
        inner
            .namespace
            .ns_pid_of(inner.kernel_pid)
            .expect("registry only ever hands out VirtualProcess handles for registered pids")
    }

    pub fn ns_ppid(&self) -> i32 {
        let inner = self.0.borrow();
        inner.namespace.ns_pid_of(inner.kernel_ppid).unwrap_or(0)
    }
}

/// Single source of truth mapping kernel pid -> [`VirtualProcess`]. Every
/// guest task the supervisor has seen - via the initial fork or a
/// subsequent `clone` - has exactly one entry here for its lifetime (spec
/// §8 invariant: the registry never holds two entries for the same kernel
/// pid).
#[derive(Debug, Default)]
pub struct ProcessRegistry {
    processes: BTreeMap<i32, VirtualProcess>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a freshly forked/cloned task. `namespace` is the
    /// namespace the task lives in - the same namespace as its parent
    /// unless this is a `CLONE_NEWPID` clone, in which case the caller
    /// passes a fresh child namespace.
    pub fn register(
        &mut self,
        kernel_pid: i32,
        kernel_ppid: i32,
        namespace: Namespace,
        fd_table: FdTable,
        comm: String,
    ) -> VirtualProcess {
        namespace.register(kernel_pid);
        let process = VirtualProcess(Rc::new(RefCell::new(Inner {
            kernel_pid,
            kernel_ppid,
            namespace,
            fd_table,
            comm,
            state: ProcessState::Running,
        })));
        self.processes.insert(kernel_pid, process.clone());
        process
    }

    pub fn get(&self, kernel_pid: i32) -> Option<VirtualProcess> {
        self.processes.get(&kernel_pid).cloned()
    }

    pub fn remove(&mut self, kernel_pid: i32) -> Option<VirtualProcess> {
        self.processes.remove(&kernel_pid)
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// True if `viewer` can see `target` - same rule as a real PID
    /// namespace: a process can see itself and anything in or below its
    /// own namespace.
    pub fn can_see(&self, viewer: i32, target: i32) -> bool {
        match (self.get(viewer), self.get(target)) {
            (Some(viewer), Some(_)) => viewer.namespace().contains(target),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_assigns_ns_pid_starting_at_two() {
        let mut registry = ProcessRegistry::new();
        let root_ns = Namespace::root();
        let p = registry.register(100, 1, root_ns, FdTable::new(), "init".into());
        assert_eq!(p.ns_pid(), 2);
    }

    #[test]
    fn registry_holds_one_entry_per_kernel_pid() {
        let mut registry = ProcessRegistry::new();
        let ns = Namespace::root();
        registry.register(100, 1, ns.clone(), FdTable::new(), "a".into());
        registry.register(100, 1, ns, FdTable::new(), "a-replacement".into());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn can_see_respects_namespace_nesting() {
        let mut registry = ProcessRegistry::new();
        let root_ns = Namespace::root();
        let child_ns = root_ns.child();

        registry.register(100, 1, root_ns, FdTable::new(), "outer".into());
        registry.register(200, 100, child_ns, FdTable::new(), "inner".into());

        assert!(registry.can_see(100, 200), "outer namespace sees into the child");
        assert!(!registry.can_see(200, 100), "inner namespace cannot see its parent");
        assert!(registry.can_see(200, 200));
    }
}
