//! Standalone proof of the namespace tree's visibility rules: a process
//! registered three levels deep is visible from every ancestor namespace
//! under a distinct ns-local pid at each level, and never visible from a
//! sibling namespace.

use bvisor::namespace::Namespace;

fn main() {
    let root = Namespace::root();
    let container = root.child();
    let nested = container.child();

    let kernel_pid = 4242;
    let ns_pid = nested.register(kernel_pid);
    println!("registered kernel pid {kernel_pid} as ns-local pid {ns_pid} in the innermost namespace");

    for (name, ns) in [("root", &root), ("container", &container), ("nested", &nested)] {
        let visible = ns.contains(kernel_pid);
        let local = ns.ns_pid_of(kernel_pid);
        println!("{name:<10} contains={visible:<5} ns_pid_of={local:?}");
    }

    let sibling = root.child();
    println!("sibling    contains={}", sibling.contains(kernel_pid));
}
