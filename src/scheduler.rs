//! System scheduler (C8): fixed phase order, topological sort within a
//! phase, cycle breaking, and dispatch.
//!
//! Grounded in the teacher's `GameSet` enum and its single
//! `configure_sets(...).chain()` call in `src/lib.rs` — a hand-written total
//! order over a flat system set. Design Notes calls for the reflection-based
//! version of that idea to become a compile-time registry: systems declare a
//! `SystemDescriptor` naming their phase/order/before/after, and the
//! scheduler sorts a vector of descriptors once at startup instead of
//! discovering systems dynamically.

use std::collections::{HashMap, HashSet};

/// A system a host registers with the scheduler (spec.md §4.8): `initialize`
/// runs once before the first tick, `update` runs every tick in resolved
/// order, `shutdown` runs once when the host is done with the scheduler.
pub trait System {
    fn initialize(&mut self) {}
    fn update(&mut self, dt: f32);
    fn shutdown(&mut self) {}
}

/// The nine fixed phase groups from spec.md §3, in invocation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    Initialization,
    TimeUpdate,
    EarlyUpdate,
    PreUpdate,
    FixedUpdate,
    Update,
    PreLateUpdate,
    LateUpdate,
    PostLateUpdate,
}

impl Phase {
    pub const ALL: [Phase; 9] = [
        Phase::Initialization,
        Phase::TimeUpdate,
        Phase::EarlyUpdate,
        Phase::PreUpdate,
        Phase::FixedUpdate,
        Phase::Update,
        Phase::PreLateUpdate,
        Phase::LateUpdate,
        Phase::PostLateUpdate,
    ];
}

/// A unique system identifier, assigned by registration order within a
/// `Scheduler`. Stands in for the "type" identity Design Notes describes
/// resolving `before`/`after` edges against.
pub type SystemId = usize;

/// Static registration data for one system.
#[derive(Debug, Clone)]
pub struct SystemDescriptor {
    pub name: &'static str,
    pub phase: Phase,
    /// Deterministic tie-breaker when `before`/`after` don't otherwise order
    /// two systems.
    pub order: i32,
    pub before: Vec<&'static str>,
    pub after: Vec<&'static str>,
}

impl SystemDescriptor {
    #[must_use]
    pub const fn new(name: &'static str, phase: Phase) -> Self {
        Self {
            name,
            phase,
            order: 0,
            before: Vec::new(),
            after: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    #[must_use]
    pub fn before(mut self, name: &'static str) -> Self {
        self.before.push(name);
        self
    }

    #[must_use]
    pub fn after(mut self, name: &'static str) -> Self {
        self.after.push(name);
        self
    }
}

/// Collects `SystemDescriptor`s plus their `System` objects and resolves a
/// deterministic run order.
#[derive(Default)]
pub struct Scheduler {
    descriptors: Vec<SystemDescriptor>,
    systems: Vec<Box<dyn System>>,
    initialized: bool,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("descriptors", &self.descriptors)
            .field("initialized", &self.initialized)
            .finish()
    }
}

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: SystemDescriptor, system: Box<dyn System>) -> SystemId {
        self.descriptors.push(descriptor);
        self.systems.push(system);
        self.descriptors.len() - 1
    }

    /// Resolve the full run order: phase-grouped, each group topologically
    /// sorted by `before`/`after`, ties broken by `order` then registration
    /// index for determinism. Returns `SystemId`s in run order.
    ///
    /// Cycles are broken by dropping the edge that would close the cycle
    /// and logging a warning once, per spec.md §4.8/§7.
    #[must_use]
    pub fn resolve(&self) -> Vec<SystemId> {
        let name_to_id: HashMap<&str, SystemId> = self
            .descriptors
            .iter()
            .enumerate()
            .map(|(id, d)| (d.name, id))
            .collect();

        let mut order = Vec::with_capacity(self.descriptors.len());
        for phase in Phase::ALL {
            let group: Vec<SystemId> = self
                .descriptors
                .iter()
                .enumerate()
                .filter(|(_, d)| d.phase == phase)
                .map(|(id, _)| id)
                .collect();
            order.extend(self.topo_sort_group(&group, &name_to_id));
        }
        order
    }

    fn topo_sort_group(
        &self,
        group: &[SystemId],
        name_to_id: &HashMap<&str, SystemId>,
    ) -> Vec<SystemId> {
        let in_group: HashSet<SystemId> = group.iter().copied().collect();

        // edges[a] = set of b such that a must run before b.
        let mut edges: HashMap<SystemId, HashSet<SystemId>> =
            group.iter().map(|&id| (id, HashSet::new())).collect();
        let mut in_degree: HashMap<SystemId, usize> = group.iter().map(|&id| (id, 0)).collect();

        let mut add_edge = |edges: &mut HashMap<SystemId, HashSet<SystemId>>,
                             in_degree: &mut HashMap<SystemId, usize>,
                             from: SystemId,
                             to: SystemId| {
            if from == to || !in_group.contains(&from) || !in_group.contains(&to) {
                return;
            }
            if edges.get_mut(&from).unwrap().insert(to) {
                *in_degree.get_mut(&to).unwrap() += 1;
            }
        };

        for &id in group {
            let descriptor = &self.descriptors[id];
            for before_name in &descriptor.before {
                if let Some(&target) = name_to_id.get(before_name) {
                    add_edge(&mut edges, &mut in_degree, id, target);
                }
            }
            for after_name in &descriptor.after {
                if let Some(&source) = name_to_id.get(after_name) {
                    add_edge(&mut edges, &mut in_degree, source, id);
                }
            }
        }

        // Kahn's algorithm; ready set ordered by (order, registration index)
        // for a stable, deterministic result.
        let mut result = Vec::with_capacity(group.len());
        let mut remaining_in_degree = in_degree.clone();
        loop {
            let mut ready: Vec<SystemId> = remaining_in_degree
                .iter()
                .filter(|&(id, &deg)| deg == 0 && !result.contains(id))
                .map(|(&id, _)| id)
                .collect();
            if ready.is_empty() {
                break;
            }
            ready.sort_by_key(|&id| (self.descriptors[id].order, id));
            let next = ready[0];
            result.push(next);
            remaining_in_degree.insert(next, usize::MAX); // mark done
            for &succ in &edges[&next] {
                if let Some(deg) = remaining_in_degree.get_mut(&succ) {
                    if *deg != usize::MAX {
                        *deg = deg.saturating_sub(1);
                    }
                }
            }
        }

        if result.len() < group.len() {
            log::warn!(
                "system scheduler: cycle detected among {} system(s) in one phase group; \
                 breaking by falling back to order/registration-index sort",
                group.len() - result.len()
            );
            let mut leftover: Vec<SystemId> =
                group.iter().copied().filter(|id| !result.contains(id)).collect();
            leftover.sort_by_key(|&id| (self.descriptors[id].order, id));
            result.extend(leftover);
        }

        result
    }

    /// Invoke every registered system's `update(dt)` in the order `resolve`
    /// computes: phases in the fixed spec.md §3 order, topologically sorted
    /// within each phase. Lazily runs `initialize` on every system, in that
    /// same order, the first time `run` is called.
    pub fn run(&mut self, dt: f32) {
        let order = self.resolve();
        if !self.initialized {
            self.initialized = true;
            for &id in &order {
                self.systems[id].initialize();
            }
        }
        for &id in &order {
            self.systems[id].update(dt);
        }
    }

    /// Invoke every registered system's `shutdown`, in resolved order.
    pub fn shutdown(&mut self) {
        let order = self.resolve();
        for &id in &order {
            self.systems[id].shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct NoopSystem;
    impl System for NoopSystem {
        fn update(&mut self, _dt: f32) {}
    }

    fn noop() -> Box<dyn System> {
        Box::new(NoopSystem)
    }

    /// Records its name and the `dt` it was called with, plus whether
    /// `initialize`/`shutdown` ran, into a shared log.
    struct RecordingSystem {
        name: &'static str,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl System for RecordingSystem {
        fn initialize(&mut self) {
            self.log.borrow_mut().push(format!("init:{}", self.name));
        }

        fn update(&mut self, dt: f32) {
            self.log.borrow_mut().push(format!("update:{}:{dt}", self.name));
        }

        fn shutdown(&mut self) {
            self.log.borrow_mut().push(format!("shutdown:{}", self.name));
        }
    }

    #[test]
    fn single_phase_respects_before_after() {
        let mut scheduler = Scheduler::new();
        scheduler.register(SystemDescriptor::new("c", Phase::Update).after("b"), noop());
        scheduler.register(SystemDescriptor::new("b", Phase::Update).after("a"), noop());
        scheduler.register(SystemDescriptor::new("a", Phase::Update), noop());

        let order = scheduler.resolve();
        let names: Vec<&str> = order.iter().map(|&id| scheduler.descriptors[id].name).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn phases_run_in_fixed_order_regardless_of_registration() {
        let mut scheduler = Scheduler::new();
        scheduler.register(SystemDescriptor::new("late", Phase::LateUpdate), noop());
        scheduler.register(SystemDescriptor::new("early", Phase::EarlyUpdate), noop());
        scheduler.register(SystemDescriptor::new("init", Phase::Initialization), noop());

        let order = scheduler.resolve();
        let names: Vec<&str> = order.iter().map(|&id| scheduler.descriptors[id].name).collect();
        assert_eq!(names, vec!["init", "early", "late"]);
    }

    #[test]
    fn order_hint_breaks_ties_deterministically() {
        let mut scheduler = Scheduler::new();
        scheduler.register(SystemDescriptor::new("b", Phase::Update).with_order(5), noop());
        scheduler.register(SystemDescriptor::new("a", Phase::Update).with_order(1), noop());

        let order = scheduler.resolve();
        let names: Vec<&str> = order.iter().map(|&id| scheduler.descriptors[id].name).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn cyclic_dependency_is_broken_not_fatal() {
        let mut scheduler = Scheduler::new();
        scheduler.register(SystemDescriptor::new("a", Phase::Update).after("b"), noop());
        scheduler.register(SystemDescriptor::new("b", Phase::Update).after("a"), noop());

        let order = scheduler.resolve();
        // Both systems still appear exactly once; no panic, no deadlock.
        assert_eq!(order.len(), 2);
    }

    #[test]
    fn run_invokes_update_in_phase_order_with_the_hosts_dt() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut scheduler = Scheduler::new();
        scheduler.register(
            SystemDescriptor::new("late", Phase::LateUpdate),
            Box::new(RecordingSystem { name: "late", log: log.clone() }),
        );
        scheduler.register(
            SystemDescriptor::new("early", Phase::EarlyUpdate),
            Box::new(RecordingSystem { name: "early", log: log.clone() }),
        );

        scheduler.run(0.016);

        let calls: Vec<String> = log
            .borrow()
            .iter()
            .filter(|entry| entry.starts_with("update"))
            .cloned()
            .collect();
        assert_eq!(calls, vec!["update:early:0.016", "update:late:0.016"]);
    }

    #[test]
    fn initialize_runs_once_before_the_first_update_only() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut scheduler = Scheduler::new();
        scheduler.register(
            SystemDescriptor::new("a", Phase::Update),
            Box::new(RecordingSystem { name: "a", log: log.clone() }),
        );

        scheduler.run(0.01);
        scheduler.run(0.01);

        let inits = log.borrow().iter().filter(|e| e.starts_with("init")).count();
        assert_eq!(inits, 1);
    }

    #[test]
    fn shutdown_invokes_every_system_in_resolved_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut scheduler = Scheduler::new();
        scheduler.register(
            SystemDescriptor::new("late", Phase::LateUpdate),
            Box::new(RecordingSystem { name: "late", log: log.clone() }),
        );
        scheduler.register(
            SystemDescriptor::new("early", Phase::EarlyUpdate),
            Box::new(RecordingSystem { name: "early", log: log.clone() }),
        );

        scheduler.shutdown();

        assert_eq!(*log.borrow(), vec!["shutdown:early", "shutdown:late"]);
    }
}
