//! `/proc` backend - a handful of synthesized entries rather than a real
//! filesystem view. Spec §4.2/§8 only require `/proc/self` and
//! `/proc/<pid>` (and their `/status` child) to resolve to something
//! readable; everything else under `/proc` reads as empty rather than
//! failing the open, so a guest that globs `/proc/*` doesn't get spurious
//! errors for directories this supervisor doesn't model.

use std::cell::RefCell;
use std::rc::Rc;

use super::OpenFile;

/// Which `/proc` entry a particular open refers to, resolved once at
/// `openat` time (so `/proc/self/status` and `/proc/<getpid()>/status`
/// opened by the same guest land on the same rendered content).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcTarget {
    SelfStatus,
    PidStatus(i32),
    Empty,
}

/// Guest-process facts needed to render a `/proc/<pid>/status` page. Kept
/// separate from `crate::process::VirtualProcess` so this module doesn't
/// need to depend on the process registry - the caller (the `openat`
/// handler) reads what it needs out of the registry and passes it in.
#[derive(Debug, Clone)]
pub struct StatusFields {
    pub ns_pid: i32,
    pub ns_ppid: i32,
    pub comm: String,
    pub state: char,
}

fn render_status(fields: &StatusFields) -> Vec<u8> {
    format!(
        "Name:\t{}\nState:\t{} (sandboxed)\nPid:\t{}\nPPid:\t{}\n",
        fields.comm, fields.state, fields.ns_pid, fields.ns_ppid
    )
    .into_bytes()
}

#[derive(Debug)]
struct Inner {
    buf: Vec<u8>,
    cursor: usize,
}

/// A synthesized, fixed-size `/proc` file with a read cursor. The cursor
/// lives behind an `Rc<RefCell<_>>` so a cloned fd-table entry (as happens
/// across `clone_table`) keeps advancing the same cursor the original did,
/// rather than silently resetting to the start.
#[derive(Debug, Clone)]
pub struct ProcFile(Rc<RefCell<Inner>>);

impl ProcFile {
    fn new(buf: Vec<u8>) -> Self {
        ProcFile(Rc::new(RefCell::new(Inner { buf, cursor: 0 })))
    }

    pub fn read(&self, out: &mut [u8]) -> usize {
        let mut inner = self.0.borrow_mut();
        let remaining = &inner.buf[inner.cursor.min(inner.buf.len())..];
        let n = remaining.len().min(out.len());
        out[..n].copy_from_slice(&remaining[..n]);
        inner.cursor += n;
        n
    }
}

pub fn open_proc(target: ProcTarget, fields: Option<StatusFields>) -> OpenFile {
    let buf = match (target, fields) {
        (ProcTarget::SelfStatus, Some(f)) | (ProcTarget::PidStatus(_), Some(f)) => render_status(&f),
        _ => Vec::new(),
    };
    OpenFile::Proc(ProcFile::new(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_advances_cursor_and_stops_at_eof() {
        let file = ProcFile::new(b"hello".to_vec());
        let mut buf = [0u8; 3];
        assert_eq!(file.read(&mut buf), 3);
        assert_eq!(&buf, b"hel");
        let mut rest = [0u8; 10];
        assert_eq!(file.read(&mut rest), 2);
        assert_eq!(&rest[..2], b"lo");
        assert_eq!(file.read(&mut rest), 0);
    }

    #[test]
    fn cloned_handle_shares_cursor_position() {
        let file = ProcFile::new(b"abcdef".to_vec());
        let alias = file.clone();
        let mut buf = [0u8; 2];
        file.read(&mut buf);
        let mut buf2 = [0u8; 2];
        alias.read(&mut buf2);
        assert_eq!(&buf2, b"cd");
    }

    #[test]
    fn status_render_includes_pid_and_ppid() {
        let fields = StatusFields {
            ns_pid: 7,
            ns_ppid: 2,
            comm: "guest".into(),
            state: 'R',
        };
        let bytes = render_status(&fields);
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("Pid:\t7"));
        assert!(text.contains("PPid:\t2"));
        assert!(text.contains("Name:\tguest"));
    }
}
