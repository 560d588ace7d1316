//! Masking interrupts around the timed part of a transaction.
//!
//! The decoder does not know how a platform disables interrupts, only that
//! the start pulse and the 40 bit measurements must run without being
//! preempted. The firmware supplies an ISR-level implementation; hosts and
//! platforms with an interrupt-disabling `critical-section` impl can use
//! [`CriticalSectionMask`].

/// Runs a closure with interrupts and preemption disabled on this core.
///
/// Only busy-wait delays may be used inside `f`.
pub trait InterruptMask {
    fn masked<R>(&mut self, f: impl FnOnce() -> R) -> R;
}

impl<T: InterruptMask> InterruptMask for &mut T {
    fn masked<R>(&mut self, f: impl FnOnce() -> R) -> R {
        (**self).masked(f)
    }
}

/// Masks through the global [`critical_section`] implementation.
///
/// It masks exactly as much as the registered implementation does: a
/// mutex-backed impl keeps the window preemptible.
#[derive(Debug, Clone, Copy, Default)]
pub struct CriticalSectionMask;

impl InterruptMask for CriticalSectionMask {
    fn masked<R>(&mut self, f: impl FnOnce() -> R) -> R {
        critical_section::with(|_cs| f())
    }
}
