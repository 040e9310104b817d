//! Per-syscall handlers (spec §4.9). Each module owns one small family of
//! related syscalls and only ever sees a [`DispatchContext`](crate::dispatcher::DispatchContext)
//! and a [`Notification`](crate::dispatcher::Notification) - no handler
//! touches the notifier fd or the seccomp wire format directly.

pub mod exit;
pub mod identity;
pub mod kill;
pub mod openat;
pub mod rw;
