//! Standalone proof that the path router's rules hold for a handful of
//! representative guest paths, without forking anything.

use bvisor::path_router::{route, Backend, RouteDecision};

fn show(path: &str) {
    match route(path) {
        RouteDecision::Blocked => println!("{path:<30} -> blocked"),
        RouteDecision::Backend(Backend::Passthrough) => println!("{path:<30} -> passthrough"),
        RouteDecision::Backend(Backend::Cow) => println!("{path:<30} -> cow"),
        RouteDecision::Backend(Backend::Tmp) => println!("{path:<30} -> tmp"),
        RouteDecision::Backend(Backend::Proc) => println!("{path:<30} -> proc"),
    }
}

fn main() {
    for path in [
        "/sys/class/net",
        "/run/lock",
        "/dev/null",
        "/dev/sda",
        "/proc/self/status",
        "/tmp/scratch.txt",
        "/tmp/.bvisor/should-not-be-reachable",
        "/home/guest/notes.txt",
        "/tmp/../etc/passwd",
    ] {
        show(path);
    }
}
