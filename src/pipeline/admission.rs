//! Admission gate shared by the walk and the workers.
//!
//! The gate is the single synchronization point for "may another file start?".
//! It closes on external cancel or when the run deadline passes; the first reason
//! seen is the one reported.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::RunStatus;

/// Cloneable stop flag. Cancel from any thread (e.g. a Ctrl+C handler).
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

const OPEN: u8 = 0;
const CANCELLED: u8 = 1;
const DEADLINE: u8 = 2;

#[derive(Debug)]
pub struct Admission {
    cancel: CancelToken,
    deadline: Option<Instant>,
    state: AtomicU8,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    not_admitted: AtomicUsize,
}

impl Admission {
    pub fn new(cancel: CancelToken, run_deadline: Option<Duration>) -> Self {
        Self {
            cancel,
            // A deadline past the end of the clock is no deadline.
            deadline: run_deadline.and_then(|d| Instant::now().checked_add(d)),
            state: AtomicU8::new(OPEN),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            not_admitted: AtomicUsize::new(0),
        }
    }

    fn close(&self, reason: u8) {
        let _ = self
            .state
            .compare_exchange(OPEN, reason, Ordering::SeqCst, Ordering::SeqCst);
    }

    /// Close the gate as cancelled (e.g. the sink failed).
    pub fn stop(&self) {
        self.close(CANCELLED);
    }

    /// True while new work may start. Observing cancel or an expired deadline closes the gate.
    pub fn is_open(&self) -> bool {
        if self.state.load(Ordering::SeqCst) != OPEN {
            return false;
        }
        if self.cancel.is_cancelled() {
            self.close(CANCELLED);
            return false;
        }
        if let Some(deadline) = self.deadline
            && Instant::now() >= deadline
        {
            self.close(DEADLINE);
            return false;
        }
        true
    }

    /// Admit one task. Returns a slot held for the duration of the digest, or `None`
    /// (counted as not admitted) once the gate has closed.
    pub fn try_admit(&self) -> Option<InFlight<'_>> {
        if !self.is_open() {
            self.not_admitted.fetch_add(1, Ordering::Relaxed);
            return None;
        }
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::Relaxed);
        Some(InFlight { gate: self })
    }

    pub fn status(&self) -> RunStatus {
        match self.state.load(Ordering::SeqCst) {
            CANCELLED => RunStatus::Cancelled,
            DEADLINE => RunStatus::DeadlineExceeded,
            _ => RunStatus::Completed,
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Relaxed)
    }

    pub fn not_admitted(&self) -> usize {
        self.not_admitted.load(Ordering::Relaxed)
    }
}

/// Held while a digest runs; releases the slot on drop.
pub struct InFlight<'a> {
    gate: &'a Admission,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.gate.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_until_cancelled() {
        let cancel = CancelToken::new();
        let gate = Admission::new(cancel.clone(), None);
        {
            let _a = gate.try_admit().unwrap();
            let _b = gate.try_admit().unwrap();
            assert_eq!(gate.in_flight(), 2);
        }
        assert_eq!(gate.in_flight(), 0);
        assert_eq!(gate.peak(), 2);

        cancel.cancel();
        assert!(gate.try_admit().is_none());
        assert_eq!(gate.not_admitted(), 1);
        assert_eq!(gate.status(), RunStatus::Cancelled);
    }

    #[test]
    fn expired_deadline_closes_gate() {
        let gate = Admission::new(CancelToken::new(), Some(Duration::ZERO));
        assert!(!gate.is_open());
        assert_eq!(gate.status(), RunStatus::DeadlineExceeded);
    }

    #[test]
    fn unreachable_deadline_leaves_gate_open() {
        let gate = Admission::new(CancelToken::new(), Some(Duration::from_secs(u64::MAX)));
        assert!(gate.is_open());
        assert!(gate.try_admit().is_some());
        assert_eq!(gate.status(), RunStatus::Completed);
    }

    #[test]
    fn first_reason_wins() {
        let cancel = CancelToken::new();
        let gate = Admission::new(cancel.clone(), None);
        gate.stop();
        cancel.cancel();
        assert!(!gate.is_open());
        assert_eq!(gate.status(), RunStatus::Cancelled);
    }

    #[test]
    fn open_gate_reports_completed() {
        let gate = Admission::new(CancelToken::new(), Some(Duration::from_secs(3600)));
        assert!(gate.is_open());
        assert_eq!(gate.status(), RunStatus::Completed);
    }
}
