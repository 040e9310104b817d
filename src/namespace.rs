//! Namespace tree (spec §4.5) - emulated PID namespaces.
//!
//! A `Namespace` is a node in a parent chain rooted at the sandbox's
//! initial namespace. Each namespace hands out its own monotonic
//! namespace-local PIDs starting at 2 (PID 1 is reserved for the
//! namespace's own init-equivalent and is never allocated to a registered
//! process). Registration flattens membership upward: a process that
//! joins namespace N is also visible, under its ns-local id, to every
//! ancestor of N, matching how a real nested PID namespace lets an outer
//! namespace see everything inside it.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

const FIRST_NS_PID: i32 = 2;

#[derive(Debug)]
struct Inner {
    parent: Option<Namespace>,
    next_pid: i32,
    /// ns-local pid -> kernel pid, for everything visible in this namespace
    /// (its own children plus anything registered in a descendant).
    members: BTreeMap<i32, i32>,
}

#[derive(Debug, Clone)]
pub struct Namespace(Rc<RefCell<Inner>>);

impl Namespace {
    /// Creates the sandbox's root namespace - no parent, so registration
    /// stops flattening here.
    pub fn root() -> Self {
        Namespace(Rc::new(RefCell::new(Inner {
            parent: None,
            next_pid: FIRST_NS_PID,
            members: BTreeMap::new(),
        })))
    }

    /// Creates a namespace nested under `self`, as happens when a guest
    /// clones with `CLONE_NEWPID`.
    pub fn child(&self) -> Self {
        Namespace(Rc::new(RefCell::new(Inner {
            parent: Some(self.clone()),
            next_pid: FIRST_NS_PID,
            members: BTreeMap::new(),
        })))
    }

    /// Allocates the next ns-local pid in this namespace and records
    /// `kernel_pid` under it, flattening the mapping up through every
    /// ancestor namespace.
    pub fn register(&self, kernel_pid: i32) -> i32 {
        let ns_pid = {
            let mut inner = self.0.borrow_mut();
            let ns_pid = inner.next_pid;
            inner.next_pid += 1;
            inner.members.insert(ns_pid, kernel_pid);
            ns_pid
        };
        if let Some(parent) = self.0.borrow().parent.clone() {
            parent.register_at(kernel_pid);
        }
        ns_pid
    }

    /// Internal helper: records `kernel_pid` in this namespace (allocating
    /// a fresh ns-local id here too) and keeps walking upward. Used so a
    /// process registered three namespaces deep is visible, under three
    /// different ns-local ids, in every namespace from its own out to the
    /// root.
    fn register_at(&self, kernel_pid: i32) {
        let parent = {
            let mut inner = self.0.borrow_mut();
            let ns_pid = inner.next_pid;
            inner.next_pid += 1;
            inner.members.insert(ns_pid, kernel_pid);
            inner.parent.clone()
        };
        if let Some(parent) = parent {
            parent.register_at(kernel_pid);
        }
    }

    /// True if `kernel_pid` has been registered anywhere at or below this
    /// namespace. Membership only needs a local lookup because
    /// registration already flattened it in here.
    pub fn contains(&self, kernel_pid: i32) -> bool {
        self.0.borrow().members.values().any(|&p| p == kernel_pid)
    }

    /// Namespace-local pid for a kernel pid visible in this namespace.
    pub fn ns_pid_of(&self, kernel_pid: i32) -> Option<i32> {
        self.0
            .borrow()
            .members
            .iter()
            .find(|(_, &k)| k == kernel_pid)
            .map(|(&ns, _)| ns)
    }

    pub fn kernel_pid_of(&self, ns_pid: i32) -> Option<i32> {
        self.0.borrow().members.get(&ns_pid).copied()
    }

    pub fn depth(&self) -> usize {
        match &self.0.borrow().parent {
            Some(p) => 1 + p.depth(),
            None => 0,
        }
    }

    pub fn parent(&self) -> Option<Namespace> {
        self.0.borrow().parent.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_allocates_from_two() {
        let root = Namespace::root();
        assert_eq!(root.register(100), FIRST_NS_PID);
        assert_eq!(root.register(101), FIRST_NS_PID + 1);
    }

    #[test]
    fn child_registration_is_visible_in_ancestors() {
        let root = Namespace::root();
        let child = root.child();
        let grandchild = child.child();

        let ns_pid = grandchild.register(4242);

        assert!(grandchild.contains(4242));
        assert!(child.contains(4242));
        assert!(root.contains(4242));
        assert_eq!(grandchild.kernel_pid_of(ns_pid), Some(4242));
    }

    #[test]
    fn sibling_namespaces_do_not_see_each_other() {
        let root = Namespace::root();
        let a = root.child();
        let b = root.child();

        a.register(7);
        assert!(a.contains(7));
        assert!(!b.contains(7));
        assert!(root.contains(7));
    }

    #[test]
    fn depth_tracks_nesting() {
        let root = Namespace::root();
        assert_eq!(root.depth(), 0);
        let child = root.child();
        assert_eq!(child.depth(), 1);
        assert_eq!(child.child().depth(), 2);
    }
}
