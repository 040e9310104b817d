//! Memory Bridge (spec §4.6) - reads and writes the guest's address space
//! from the supervisor process using `process_vm_readv`/`process_vm_writev`,
//! avoiding the single-step ptrace dance a PEEKDATA-based reader would need.

use nix::sys::uio::{process_vm_readv, process_vm_writev, RemoteIoVec};
use nix::unistd::Pid;

use crate::error::MemoryError;

/// Longest string this bridge will ever materialize from guest memory in
/// one call - paths and similar arguments are truncated to this length
/// rather than read without bound (spec §8 edge case: a path with no NUL
/// within range yields a 256-byte result, never a buffer overrun).
pub const MAX_STRING_LEN: usize = 256;

/// Maximum number of iovecs this bridge will walk for a single
/// `readv`/`writev` - matches the cap the dispatcher's handlers enforce
/// (spec §8 edge case: more than 16 iovecs are rejected rather than
/// partially served).
pub const MAX_IOVECS: usize = 16;

pub struct MemoryBridge {
    pid: Pid,
}

impl MemoryBridge {
    pub fn new(pid: i32) -> Self {
        MemoryBridge { pid: Pid::from_raw(pid) }
    }

    pub fn pid(&self) -> i32 {
        self.pid.as_raw()
    }

    /// Reads exactly `buf.len()` bytes from `addr` in the guest, failing
    /// with [`MemoryError::PartialTransfer`] on any short read rather than
    /// returning however much made it across.
    pub fn read_bytes(&self, addr: u64, buf: &mut [u8]) -> Result<(), MemoryError> {
        if addr == 0 {
            return Err(MemoryError::InvalidAddress { pid: self.pid.as_raw(), addr });
        }
        let remote = [RemoteIoVec { base: addr as usize, len: buf.len() }];
        let mut local = [std::io::IoSliceMut::new(buf)];
        let n = process_vm_readv(self.pid, &mut local, &remote).map_err(|e| {
            map_errno(e, self.pid.as_raw(), addr)
        })?;
        if n != buf.len() {
            return Err(MemoryError::PartialTransfer {
                pid: self.pid.as_raw(),
                addr,
                op: "read",
                requested: buf.len(),
                actual: n,
            });
        }
        Ok(())
    }

    pub fn write_bytes(&self, addr: u64, buf: &[u8]) -> Result<(), MemoryError> {
        if addr == 0 {
            return Err(MemoryError::InvalidAddress { pid: self.pid.as_raw(), addr });
        }
        let remote = [RemoteIoVec { base: addr as usize, len: buf.len() }];
        let local = [std::io::IoSlice::new(buf)];
        let n = process_vm_writev(self.pid, &local, &remote).map_err(|e| {
            map_errno(e, self.pid.as_raw(), addr)
        })?;
        if n != buf.len() {
            return Err(MemoryError::PartialTransfer {
                pid: self.pid.as_raw(),
                addr,
                op: "write",
                requested: buf.len(),
                actual: n,
            });
        }
        Ok(())
    }

    /// Reads a NUL-terminated string, capped at [`MAX_STRING_LEN`] bytes.
    /// If no NUL byte appears within the cap the result is simply the full
    /// `MAX_STRING_LEN` bytes read so far - never an error, and never more
    /// than the cap.
    pub fn read_cstring(&self, addr: u64) -> Result<Vec<u8>, MemoryError> {
        let mut buf = vec![0u8; MAX_STRING_LEN];
        let mut read_so_far = 0usize;
        // process_vm_readv has no short-read-on-NUL behavior of its own, so
        // probe in small chunks and stop at the first NUL we see.
        const CHUNK: usize = 32;
        while read_so_far < MAX_STRING_LEN {
            let want = CHUNK.min(MAX_STRING_LEN - read_so_far);
            let slice = &mut buf[read_so_far..read_so_far + want];
            self.read_bytes(addr + read_so_far as u64, slice)?;
            if let Some(nul_at) = slice.iter().position(|&b| b == 0) {
                buf.truncate(read_so_far + nul_at);
                return Ok(buf);
            }
            read_so_far += want;
        }
        Ok(buf)
    }
}

fn map_errno(e: nix::Error, pid: i32, addr: u64) -> MemoryError {
    if e == nix::Error::ESRCH {
        MemoryError::ProcessVanished { pid }
    } else {
        MemoryError::InvalidAddress { pid, addr }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_address_is_rejected_before_any_syscall() {
        let bridge = MemoryBridge::new(std::process::id() as i32);
        let mut buf = [0u8; 4];
        assert!(matches!(
            bridge.read_bytes(0, &mut buf),
            Err(MemoryError::InvalidAddress { addr: 0, .. })
        ));
    }

    #[test]
    fn read_write_round_trip_within_own_process() {
        let bridge = MemoryBridge::new(std::process::id() as i32);
        let mut local = [0u8; 8];
        let addr = local.as_mut_ptr() as u64;
        bridge.write_bytes(addr, b"abcdefgh").unwrap();
        let mut out = [0u8; 8];
        bridge.read_bytes(addr, &mut out).unwrap();
        assert_eq!(&out, b"abcdefgh");
    }

    #[test]
    fn read_cstring_stops_at_nul_and_never_exceeds_cap() {
        let bridge = MemoryBridge::new(std::process::id() as i32);
        let mut local = [0u8; 300];
        local[10] = 0;
        for b in local.iter_mut().take(10) {
            *b = b'x';
        }
        let addr = local.as_ptr() as u64;
        let s = bridge.read_cstring(addr).unwrap();
        assert_eq!(s.len(), 10);
        assert!(s.iter().all(|&b| b == b'x'));
    }
}
