//! Integration tests for the sandbox end to end.
//!
//! Most of these require the privilege to install a
//! `SECCOMP_FILTER_FLAG_NEW_LISTENER` filter and are marked `#[ignore]`;
//! the rest exercise the pure, privilege-free parts of the supervisor
//! (path routing, namespace visibility, fd table allocation) through the
//! public API so they run in any CI environment.

use bvisor::namespace::Namespace;
use bvisor::path_router::{route, Backend, RouteDecision};
use bvisor::{SandboxConfig, Supervisor};

#[test]
fn blocked_path_never_resolves_to_a_backend() {
    assert_eq!(route("/sys/kernel/debug"), RouteDecision::Blocked);
    assert_eq!(route("/run/secrets/token"), RouteDecision::Blocked);
}

#[test]
fn dev_terminals_use_passthrough_everything_else_under_dev_is_blocked() {
    assert_eq!(route("/dev/urandom"), RouteDecision::Backend(Backend::Passthrough));
    assert_eq!(route("/dev/tty0"), RouteDecision::Blocked);
}

#[test]
fn tmp_round_trips_through_the_tmp_backend() {
    assert_eq!(route("/tmp/work/output.txt"), RouteDecision::Backend(Backend::Tmp));
}

#[test]
fn tmp_overlay_storage_itself_is_unreachable_to_the_guest() {
    assert_eq!(route("/tmp/.bvisor/anything"), RouteDecision::Blocked);
}

#[test]
fn proc_self_and_numeric_pids_both_resolve_to_the_proc_backend() {
    assert_eq!(route("/proc/self/status"), RouteDecision::Backend(Backend::Proc));
    assert_eq!(route("/proc/17/status"), RouteDecision::Backend(Backend::Proc));
}

#[test]
fn getppid_across_a_namespace_boundary_resolves_through_the_parent_chain() {
    let root = Namespace::root();
    let container = root.child();

    let parent_kernel_pid = 100;
    let child_kernel_pid = 200;
    root.register(parent_kernel_pid);
    let child_ns_pid = container.register(child_kernel_pid);

    assert!(container.contains(parent_kernel_pid));
    assert_eq!(container.ns_pid_of(child_kernel_pid), Some(child_ns_pid));
}

#[test]
#[ignore = "requires privilege to install a seccomp-notify filter"]
fn tmp_write_in_one_sandbox_is_invisible_to_another() {
    let mut a = Supervisor::launch(SandboxConfig::new("/bin/sh").arg("-c").arg("echo a > /tmp/probe")).unwrap();
    a.run().unwrap();

    let mut b = Supervisor::launch(SandboxConfig::new("/bin/sh").arg("-c").arg("test ! -f /tmp/probe")).unwrap();
    b.run().unwrap();
}

#[test]
#[ignore = "requires privilege to install a seccomp-notify filter"]
fn stdout_write_reaches_the_real_terminal() {
    let mut sandbox = Supervisor::launch(SandboxConfig::new("/bin/echo").arg("hello from the guest")).unwrap();
    sandbox.run().unwrap();
}

#[test]
#[ignore = "requires privilege to install a seccomp-notify filter"]
fn blocked_path_open_fails_with_eacces_inside_the_guest() {
    let mut sandbox =
        Supervisor::launch(SandboxConfig::new("/bin/sh").arg("-c").arg("test ! -r /sys/kernel/debug")).unwrap();
    sandbox.run().unwrap();
}

#[test]
#[ignore = "requires privilege to install a seccomp-notify filter"]
fn proc_self_status_reflects_the_registered_child_after_a_clone() {
    let mut sandbox = Supervisor::launch(
        SandboxConfig::new("/bin/sh")
            .arg("-c")
            .arg("sh -c 'cat /proc/self/status' && cat /proc/$$/status"),
    )
    .unwrap();
    sandbox.run().unwrap();
}

#[test]
#[ignore = "requires privilege to install a seccomp-notify filter"]
fn sandbox_ids_are_unique_across_concurrent_launches() {
    let sandbox_a = Supervisor::launch(SandboxConfig::new("/bin/true")).unwrap();
    let sandbox_b = Supervisor::launch(SandboxConfig::new("/bin/true")).unwrap();
    assert_ne!(sandbox_a.id(), sandbox_b.id());
}
