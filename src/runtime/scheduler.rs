//! Update batching.
//!
//! Component re-renders are not run in the call stack of the write that
//! invalidated them. Each update subscriber is enqueued into a pending-job
//! set (deduplicated by subscriber identity) and the whole set is drained
//! in one flush at the next tick boundary. Multiple synchronous mutations
//! of the same component's dependencies therefore collapse into a single
//! re-render.
//!
//! Contract: [`flush_jobs`] drains a snapshot of the set. Jobs enqueued
//! while the flush is running wait for the next flush, so one flush can
//! never starve the caller.

use std::cell::RefCell;

use crate::reactivity::effect::Effect;

thread_local! {
    static QUEUE: RefCell<Vec<Effect>> = const { RefCell::new(Vec::new()) };
}

/// Enqueue an update job. A job already pending is not enqueued twice.
pub fn queue_job(job: Effect) {
    QUEUE.with(|queue| {
        let mut queue = queue.borrow_mut();
        if !queue.iter().any(|pending| pending.same(&job)) {
            queue.push(job);
        }
    });
}

/// Drain and run every currently pending job, in enqueue order.
pub fn flush_jobs() {
    let jobs = QUEUE.with(|queue| queue.take());
    for job in jobs {
        job.run();
    }
}

/// Number of jobs waiting for the next flush.
pub fn pending_jobs() -> usize {
    QUEUE.with(|queue| queue.borrow().len())
}

/// Run `callback` after the pending batch has been flushed. This is the
/// deferred-continuation point: state read inside the callback observes
/// the post-flush world.
pub fn next_tick(callback: impl FnOnce()) {
    flush_jobs();
    callback();
}

/// Drop any pending jobs (for tests).
pub fn reset_scheduler() {
    QUEUE.with(|queue| queue.borrow_mut().clear());
}

// =============================================================================
// Tests
// =============================================================================
