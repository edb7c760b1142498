//! Dependency graph and reactive computations.
//!
//! The graph maps (container, key) pairs to insertion-ordered sets of
//! subscribers. [`track`] records the edge for the currently running
//! computation, [`trigger`] fires every edge registered for a slot, and
//! [`Effect`] is the subscriber itself: a closure that re-runs (or defers
//! to a scheduler) whenever one of its tracked slots changes.
//!
//! # Invariants
//!
//! 1. A subscriber sits in a dependency set if and only if it read that
//!    (container, key) during its most recent run while tracking was active.
//!    Every run starts by detaching the subscriber from all previous sets,
//!    so branches that stop being read stop receiving triggers.
//! 2. Triggers deliver in registration order, over a snapshot of the set,
//!    so re-entrant registration during delivery is neither missed nor
//!    double counted within one trigger.
//! 3. The active-subscriber slot is a stack: a computation run inside
//!    another computation's run restores the outer tracking context.
//! 4. `stop` is idempotent; the stop hook fires exactly once.
//!
//! The registry is process-lifetime and never evicts entries. Wrapper
//! memoization keeps observed containers alive, so registry keys stay
//! stable; long-running applications trade memory growth for identity.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::value::RawMap;

// =============================================================================
// Registry state
// =============================================================================

thread_local! {
    /// container id -> key -> dependency set
    static TARGET_MAP: RefCell<HashMap<usize, HashMap<String, Dep>>> =
        RefCell::new(HashMap::new());

    /// Stack of currently running subscribers. Only the top one tracks.
    static ACTIVE_STACK: RefCell<Vec<Rc<EffectInner>>> = RefCell::new(Vec::new());
}

/// One dependency set: the subscribers of a single (container, key) slot.
pub(crate) type Dep = Rc<RefCell<DepSet>>;

#[derive(Default)]
pub(crate) struct DepSet {
    subscribers: Vec<Rc<EffectInner>>,
}

/// A fresh private dependency set, for slots that live outside the
/// container registry (reference cells, derived values).
pub(crate) fn new_dep() -> Dep {
    Rc::new(RefCell::new(DepSet::default()))
}

// =============================================================================
// Effect
// =============================================================================

pub(crate) struct EffectInner {
    fun: RefCell<Box<dyn FnMut()>>,
    scheduler: Option<Rc<dyn Fn()>>,
    on_stop: RefCell<Option<Box<dyn FnOnce()>>>,
    active: Cell<bool>,
    /// Back-references into every dependency set this effect sits in,
    /// needed for clean unsubscription.
    deps: RefCell<Vec<Dep>>,
}

/// A reactive computation.
///
/// Runs once on creation. While active, any trigger of a tracked
/// dependency re-runs it, or invokes its scheduler instead when one was
/// supplied. Cloning is cheap and shares the same computation.
#[derive(Clone)]
pub struct Effect {
    inner: Rc<EffectInner>,
}

impl Effect {
    /// Create and immediately run a computation.
    pub fn new(fun: impl FnMut() + 'static) -> Effect {
        Effect::build(Box::new(fun), None)
    }

    /// Create a computation whose triggers invoke `scheduler` instead of
    /// re-running the closure directly.
    pub fn with_scheduler(fun: impl FnMut() + 'static, scheduler: impl Fn() + 'static) -> Effect {
        Effect::build(Box::new(fun), Some(Rc::new(scheduler)))
    }

    fn build(fun: Box<dyn FnMut()>, scheduler: Option<Rc<dyn Fn()>>) -> Effect {
        let effect = Effect {
            inner: Rc::new(EffectInner {
                fun: RefCell::new(fun),
                scheduler,
                on_stop: RefCell::new(None),
                active: Cell::new(true),
                deps: RefCell::new(Vec::new()),
            }),
        };
        run_effect(&effect.inner);
        effect
    }

    /// Register a hook that fires once when the effect is stopped.
    pub fn set_on_stop(&self, hook: impl FnOnce() + 'static) {
        *self.inner.on_stop.borrow_mut() = Some(Box::new(hook));
    }

    /// Re-run the computation now, bypassing any scheduler.
    pub fn run(&self) {
        run_effect(&self.inner);
    }

    /// Stop the computation. Idempotent.
    ///
    /// Detaches every dependency back-reference and fires the stop hook.
    /// A stopped effect still runs when called directly, but without
    /// tracking, and it no longer receives triggers.
    pub fn stop(&self) {
        if !self.inner.active.get() {
            return;
        }
        self.inner.active.set(false);
        cleanup_effect(&self.inner);
        if let Some(hook) = self.inner.on_stop.borrow_mut().take() {
            hook();
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.get()
    }

    /// Identity check, used by the scheduler to deduplicate jobs.
    pub(crate) fn same(&self, other: &Effect) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Create and immediately run a reactive computation.
pub fn effect(fun: impl FnMut() + 'static) -> Effect {
    Effect::new(fun)
}

/// Stop a reactive computation. Idempotent.
pub fn stop(effect: &Effect) {
    effect.stop();
}

fn run_effect(inner: &Rc<EffectInner>) {
    if !inner.active.get() {
        (inner.fun.borrow_mut())();
        return;
    }

    // Re-track from scratch: only reads performed by this run survive.
    cleanup_effect(inner);

    ACTIVE_STACK.with(|stack| stack.borrow_mut().push(inner.clone()));
    (inner.fun.borrow_mut())();
    ACTIVE_STACK.with(|stack| {
        stack.borrow_mut().pop();
    });
}

fn cleanup_effect(inner: &Rc<EffectInner>) {
    let deps = inner.deps.borrow_mut().split_off(0);
    for dep in deps {
        dep.borrow_mut()
            .subscribers
            .retain(|subscriber| !Rc::ptr_eq(subscriber, inner));
    }
}

// =============================================================================
// Track / trigger
// =============================================================================

/// Record a read of (container, key) for the currently running subscriber.
/// No-op when nothing is tracking.
pub(crate) fn track(target: &RawMap, key: &str) {
    let tracking = ACTIVE_STACK.with(|stack| !stack.borrow().is_empty());
    if !tracking {
        return;
    }
    let dep = TARGET_MAP.with(|map| {
        map.borrow_mut()
            .entry(target.id())
            .or_default()
            .entry(key.to_string())
            .or_insert_with(new_dep)
            .clone()
    });
    track_dep(&dep);
}

/// Fire every subscriber registered for (container, key).
/// No-op when no dependency set exists for the slot.
pub(crate) fn trigger(target: &RawMap, key: &str) {
    let dep = TARGET_MAP.with(|map| {
        map.borrow()
            .get(&target.id())
            .and_then(|keys| keys.get(key))
            .cloned()
    });
    if let Some(dep) = dep {
        trigger_dep(&dep);
    }
}

/// Register the active subscriber into a dependency set, recording the
/// reverse edge for later unsubscription.
pub(crate) fn track_dep(dep: &Dep) {
    let Some(active) = ACTIVE_STACK.with(|stack| stack.borrow().last().cloned()) else {
        return;
    };

    let mut set = dep.borrow_mut();
    if !set.subscribers.iter().any(|s| Rc::ptr_eq(s, &active)) {
        set.subscribers.push(active.clone());
    }
    drop(set);

    let mut deps = active.deps.borrow_mut();
    if !deps.iter().any(|d| Rc::ptr_eq(d, dep)) {
        deps.push(dep.clone());
    }
}

/// Fire a dependency set: scheduler when present, direct re-run otherwise.
/// Iterates a snapshot so mid-delivery registration changes wait for the
/// next trigger.
pub(crate) fn trigger_dep(dep: &Dep) {
    let subscribers = dep.borrow().subscribers.clone();
    for subscriber in subscribers {
        match subscriber.scheduler.clone() {
            Some(scheduler) => scheduler(),
            None => run_effect(&subscriber),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
