//! Process-wide traversal gate.
//!
//! Every mutating traversal (mark/clean propagation, start/stop, event
//! handling, healing, rehydration) runs while holding the gate. The gate is
//! re-entrant, so a listener callback or a nested property event on the same
//! thread passes straight through. Read-only queries never take it.
//!
//! The gate is process-wide, not per graph, so traversals of unrelated graphs
//! run one at a time. See [`DirtyListener`](valtrack_core::DirtyListener) for what that means
//! for callbacks.

use parking_lot::{ReentrantMutex, ReentrantMutexGuard, const_reentrant_mutex};

static GATE: ReentrantMutex<()> = const_reentrant_mutex(());

/// Guard held for the duration of one traversal.
pub type TraversalGuard = ReentrantMutexGuard<'static, ()>;

/// Enter the gate, blocking while another thread is inside.
pub fn enter() -> TraversalGuard {
    GATE.lock()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_excludes_other_threads() {
        let held = enter();
        let entered = std::thread::scope(|s| {
            s.spawn(|| GATE.try_lock().is_some()).join().expect("thread")
        });
        assert!(!entered);
        drop(held);
    }

    #[test]
    fn gate_is_reentrant() {
        let outer = enter();
        let inner = enter();
        drop(inner);
        drop(outer);
    }
}
