//! `read`/`write`/`readv`/`writev` handlers (spec §4.9).
//!
//! Fds 0/1/2 are never virtualized - they're the guest's inherited stdio,
//! so these handlers let the kernel run the real syscall on them rather
//! than bouncing the bytes through the memory bridge for no reason.

use crate::dispatcher::{DispatchContext, Notification, Reply};
use crate::error::DispatchError;
use crate::memory::{MemoryBridge, MAX_IOVECS};

#[repr(C)]
#[derive(Clone, Copy)]
struct GuestIoVec {
    base: u64,
    len: u64,
}

pub fn handle_read(ctx: &mut DispatchContext, notif: &Notification) -> Result<Reply, DispatchError> {
    let fd = notif.args[0] as i32;
    if fd < 3 {
        return Ok(Reply::ContinueInKernel);
    }
    let process = ctx.registry.get(notif.pid).ok_or(DispatchError::UnknownCaller(notif.pid))?;
    let file = process.fd_table().get(fd)?;
    let len = notif.args[2] as usize;
    let mut buf = vec![0u8; len];
    let n = file.read(&mut buf)?;
    let bridge = MemoryBridge::new(notif.pid);
    bridge.write_bytes(notif.args[1], &buf[..n])?;
    Ok(Reply::Value(n as i64))
}

pub fn handle_write(ctx: &mut DispatchContext, notif: &Notification) -> Result<Reply, DispatchError> {
    let fd = notif.args[0] as i32;
    if fd < 3 {
        return Ok(Reply::ContinueInKernel);
    }
    let process = ctx.registry.get(notif.pid).ok_or(DispatchError::UnknownCaller(notif.pid))?;
    let file = process.fd_table().get(fd)?;
    let len = notif.args[2] as usize;
    let bridge = MemoryBridge::new(notif.pid);
    let mut buf = vec![0u8; len];
    bridge.read_bytes(notif.args[1], &mut buf)?;
    let n = file.write(&buf)?;
    Ok(Reply::Value(n as i64))
}

pub fn handle_readv(ctx: &mut DispatchContext, notif: &Notification) -> Result<Reply, DispatchError> {
    let fd = notif.args[0] as i32;
    if fd < 3 {
        return Ok(Reply::ContinueInKernel);
    }
    let process = ctx.registry.get(notif.pid).ok_or(DispatchError::UnknownCaller(notif.pid))?;
    let file = process.fd_table().get(fd)?;
    let bridge = MemoryBridge::new(notif.pid);
    let iovecs = read_iovecs(&bridge, notif.args[1], notif.args[2])?;

    let mut total = 0i64;
    for iov in iovecs {
        let mut buf = vec![0u8; iov.len as usize];
        let n = file.read(&mut buf)?;
        bridge.write_bytes(iov.base, &buf[..n])?;
        total += n as i64;
    }
    Ok(Reply::Value(total))
}

pub fn handle_writev(ctx: &mut DispatchContext, notif: &Notification) -> Result<Reply, DispatchError> {
    let fd = notif.args[0] as i32;
    if fd < 3 {
        return Ok(Reply::ContinueInKernel);
    }
    let process = ctx.registry.get(notif.pid).ok_or(DispatchError::UnknownCaller(notif.pid))?;
    let file = process.fd_table().get(fd)?;
    let bridge = MemoryBridge::new(notif.pid);
    let iovecs = read_iovecs(&bridge, notif.args[1], notif.args[2])?;

    let mut total = 0i64;
    for iov in iovecs {
        let mut buf = vec![0u8; iov.len as usize];
        bridge.read_bytes(iov.base, &mut buf)?;
        let n = file.write(&buf)?;
        total += n as i64;
    }
    Ok(Reply::Value(total))
}

fn read_iovecs(bridge: &MemoryBridge, addr: u64, count: u64) -> Result<Vec<GuestIoVec>, DispatchError> {
    if count as usize > MAX_IOVECS {
        return Err(DispatchError::Unsupported(libc::SYS_readv));
    }
    let mut out = Vec::with_capacity(count as usize);
    for i in 0..count {
        let mut raw = [0u8; std::mem::size_of::<GuestIoVec>()];
        bridge.read_bytes(addr + i * raw.len() as u64, &mut raw)?;
        let base = u64::from_ne_bytes(raw[0..8].try_into().unwrap());
        let len = u64::from_ne_bytes(raw[8..16].try_into().unwrap());
        out.push(GuestIoVec { base, len });
    }
    Ok(out)
}
