//! Path Router (spec §4.4) - a pure function from an absolute guest path to
//! a backend decision. No process, kernel or filesystem state is consulted
//! here; this is deliberately a plain data transform so it stays
//! unit-testable without forking anything.

/// Which [`crate::backends`] implementation should service an open file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Passthrough,
    Cow,
    Tmp,
    Proc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Blocked,
    Backend(Backend),
}

/// Resolves `.` and `..` lexically against an assumed-absolute path,
/// without touching the filesystem. A path that walks above `/` via `..`
/// simply bottoms out at `/` - there is no parent of the root to escape to.
pub fn normalize(path: &str) -> String {
    let mut stack: Vec<&str> = Vec::new();
    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            other => stack.push(other),
        }
    }
    format!("/{}", stack.join("/"))
}

/// Returns the remainder of `path` after `prefix` if `path` equals `prefix`
/// or `prefix` followed by `/`. `/tmpfoo` must never match `/tmp`.
fn match_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    if path == prefix {
        return Some("");
    }
    let rest = path.strip_prefix(prefix)?;
    rest.strip_prefix('/')
}

/// `route(p)` is deterministic and satisfies `route(normalize(p)) == route(p)`
/// (spec §8 invariant 5) because normalization happens unconditionally here
/// before any rule is matched.
pub fn route(path: &str) -> RouteDecision {
    route_normalized(&normalize(path))
}

fn route_normalized(path: &str) -> RouteDecision {
    if match_prefix(path, "/sys").is_some() {
        return RouteDecision::Blocked;
    }
    if match_prefix(path, "/run").is_some() {
        return RouteDecision::Blocked;
    }
    if let Some(rest) = match_prefix(path, "/dev") {
        return match rest {
            "null" | "zero" | "random" | "urandom" => RouteDecision::Backend(Backend::Passthrough),
            _ => RouteDecision::Blocked,
        };
    }
    if match_prefix(path, "/proc").is_some() {
        return RouteDecision::Backend(Backend::Proc);
    }
    if match_prefix(path, "/tmp").is_some() {
        if match_prefix(path, "/tmp/.bvisor").is_some() {
            return RouteDecision::Blocked;
        }
        return RouteDecision::Backend(Backend::Tmp);
    }
    RouteDecision::Backend(Backend::Cow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_sys_and_run() {
        assert_eq!(route("/sys/class/net"), RouteDecision::Blocked);
        assert_eq!(route("/run/lock"), RouteDecision::Blocked);
        assert_eq!(route("/sys"), RouteDecision::Blocked);
    }

    #[test]
    fn dev_is_blocked_except_the_four_terminals() {
        for leaf in ["null", "zero", "random", "urandom"] {
            assert_eq!(
                route(&format!("/dev/{leaf}")),
                RouteDecision::Backend(Backend::Passthrough)
            );
        }
        assert_eq!(route("/dev/sda"), RouteDecision::Blocked);
        assert_eq!(route("/dev"), RouteDecision::Blocked);
    }

    #[test]
    fn proc_routes_to_proc_backend() {
        assert_eq!(route("/proc/self/status"), RouteDecision::Backend(Backend::Proc));
        assert_eq!(route("/proc"), RouteDecision::Backend(Backend::Proc));
    }

    #[test]
    fn tmp_routes_to_tmp_except_overlay_storage() {
        assert_eq!(route("/tmp/foo"), RouteDecision::Backend(Backend::Tmp));
        assert_eq!(route("/tmp/.bvisor/sb/abc"), RouteDecision::Blocked);
        assert_eq!(route("/tmp/.bvisor"), RouteDecision::Blocked);
    }

    #[test]
    fn prefix_match_requires_boundary() {
        // /tmpfoo must not be treated as under /tmp.
        assert_eq!(route("/tmpfoo"), RouteDecision::Backend(Backend::Cow));
        assert_eq!(route("/devious"), RouteDecision::Backend(Backend::Cow));
    }

    #[test]
    fn default_is_cow() {
        assert_eq!(route("/home/guest/file.txt"), RouteDecision::Backend(Backend::Cow));
    }

    #[test]
    fn dotdot_escaping_tmp_reroutes_through_top_level_rules() {
        assert_eq!(route("/tmp/../sys/x"), RouteDecision::Blocked);
        assert_eq!(route("/tmp/../../etc/passwd"), RouteDecision::Backend(Backend::Cow));
    }

    #[test]
    fn route_is_idempotent_under_normalize() {
        let samples = [
            "/tmp/a/../b",
            "/sys/./class",
            "/proc/1/status",
            "/dev/null",
            "/a/b/c/../../d",
            "/",
        ];
        for s in samples {
            assert_eq!(route(&normalize(s)), route(s));
        }
    }
}
