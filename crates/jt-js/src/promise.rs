//! Promise chain: an arena of continuation nodes and the propagation walk.
//!
//! Nodes live in a slab and are linked forward only. Settling a node runs at
//! most one continuation on it and then hands the result to the next node,
//! so one settlement travels the whole chain in a single walk.

use slab::Slab;

/// Handle to a node in its [`PromiseChain`]. Handles to freed nodes stay
/// stale even after the slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    key: usize,
    generation: u64,
}

/// Host-typed outcome flowing along a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement<V> {
    Success(V),
    Failure(V),
}

impl<V> Settlement<V> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn into_value(self) -> V {
        match self {
            Self::Success(value) | Self::Failure(value) => value,
        }
    }
}

#[derive(Debug)]
struct ChainNode<F> {
    generation: u64,
    on_success: Option<F>,
    on_failure: Option<F>,
    next: Option<NodeId>,
    warm_up: Option<String>,
    /// A settlement for this node has been queued.
    settling: bool,
}

/// Result of `then`/`catch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attached {
    pub next: NodeId,
    /// Warm-up timer handed to `next`; the caller postpones it.
    pub warm_up: Option<String>,
}

/// What settling one node asks the caller to do.
#[derive(Debug, PartialEq, Eq)]
pub enum Step<F> {
    /// Run `continuation` and pass its outcome to `next`.
    Invoke { continuation: F, next: Option<NodeId> },
    /// No matching continuation: pass the settlement on unchanged.
    Forward(NodeId),
    /// No matching continuation and no next node.
    End,
    AlreadySettled,
}

/// Live nodes only. A node is freed as soon as it settles; its forward link
/// is handed back in the returned [`Step`], so nothing points at it anymore.
#[derive(Debug)]
pub struct PromiseChain<F> {
    nodes: Slab<ChainNode<F>>,
    next_generation: u64,
}

impl<F> Default for PromiseChain<F> {
    fn default() -> Self {
        Self {
            nodes: Slab::new(),
            next_generation: 0,
        }
    }
}

impl<F> PromiseChain<F> {
    pub fn create(&mut self) -> NodeId {
        let generation = self.next_generation;
        self.next_generation += 1;
        let key = self.nodes.insert(ChainNode {
            generation,
            on_success: None,
            on_failure: None,
            next: None,
            warm_up: None,
            settling: false,
        });
        NodeId { key, generation }
    }

    /// Nodes that have not settled yet.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn entry(&self, node: NodeId) -> Option<&ChainNode<F>> {
        self.nodes
            .get(node.key)
            .filter(|entry| entry.generation == node.generation)
    }

    fn entry_mut(&mut self, node: NodeId) -> Option<&mut ChainNode<F>> {
        self.nodes
            .get_mut(node.key)
            .filter(|entry| entry.generation == node.generation)
    }

    /// Claims the right to settle `node`. False when it already settled or a
    /// settlement is already queued for it.
    pub fn begin_settlement(&mut self, node: NodeId) -> bool {
        match self.entry_mut(node) {
            Some(entry) if !entry.settling => {
                entry.settling = true;
                true
            }
            _ => false,
        }
    }

    /// Records continuations and returns the next node.
    ///
    /// Each slot keeps its first continuation. The forward link is created
    /// on the first call and shared by later ones. A pending warm-up timer
    /// moves to the next node. `None` when `node` has already settled.
    pub fn attach(
        &mut self,
        node: NodeId,
        on_success: Option<F>,
        on_failure: Option<F>,
    ) -> Option<Attached> {
        let existing = self.entry(node)?.next;
        let next = match existing {
            Some(next) => next,
            None => {
                let next = self.create();
                self.entry_mut(node)?.next = Some(next);
                next
            }
        };

        let entry = self.entry_mut(node)?;
        if entry.on_success.is_none() {
            entry.on_success = on_success;
        }
        if entry.on_failure.is_none() {
            entry.on_failure = on_failure;
        }

        let warm_up = entry.warm_up.take();
        if let (Some(timer), Some(next_entry)) = (&warm_up, self.entry_mut(next)) {
            next_entry.warm_up = Some(timer.clone());
        }
        Some(Attached { next, warm_up })
    }

    /// Last live node reachable from `node`.
    pub fn tail(&self, node: NodeId) -> NodeId {
        let mut current = node;
        while let Some(next) = self.entry(current).and_then(|entry| entry.next) {
            current = next;
        }
        current
    }

    /// Gives the warm-up timer to the tail of `node`'s chain.
    pub fn hold_warm_up(&mut self, node: NodeId, timer: String) {
        let tail = self.tail(node);
        if let Some(entry) = self.entry_mut(tail) {
            entry.warm_up = Some(timer);
        }
    }

    /// Frees `node` and hands back the continuation matching `success`.
    pub fn settle(&mut self, node: NodeId, success: bool) -> Step<F> {
        if self.entry(node).is_none() {
            return Step::AlreadySettled;
        }
        let Some(entry) = self.nodes.try_remove(node.key) else {
            return Step::AlreadySettled;
        };

        let continuation = if success {
            entry.on_success
        } else {
            entry.on_failure
        };
        match (continuation, entry.next) {
            (Some(continuation), next) => Step::Invoke { continuation, next },
            (None, Some(next)) => Step::Forward(next),
            (None, None) => Step::End,
        }
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }
}

/// Walks one settlement down the chain starting at `start`.
///
/// `step` settles a node (normally [`PromiseChain::settle`] behind a short
/// borrow) and `invoke` runs a continuation; the two are separate so no
/// borrow of the chain is held while script code runs. Returns the
/// settlement that ran past the last node, if any.
pub fn propagate<F, V>(
    start: NodeId,
    settlement: Settlement<V>,
    mut step: impl FnMut(NodeId, bool) -> Step<F>,
    mut invoke: impl FnMut(F, Settlement<V>) -> Settlement<V>,
) -> Option<Settlement<V>> {
    let mut node = start;
    let mut settlement = settlement;
    loop {
        match step(node, settlement.is_success()) {
            Step::AlreadySettled => return None,
            Step::End => return Some(settlement),
            Step::Forward(next) => node = next,
            Step::Invoke { continuation, next } => {
                settlement = invoke(continuation, settlement);
                match next {
                    Some(next) => node = next,
                    None => return Some(settlement),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::NodeId;
    use super::PromiseChain;
    use super::Settlement;
    use super::Step;
    use super::propagate;
    use proptest::prelude::*;

    /// Test continuation: `Ok` maps the value, `Err` turns it into an error value.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Cont {
        Add(i64),
        Fail,
        Recover,
    }

    fn run(chain: &mut PromiseChain<Cont>, node: NodeId, settlement: Settlement<i64>) -> (Vec<Cont>, Option<Settlement<i64>>) {
        let mut calls = Vec::new();
        let dropped = propagate(
            node,
            settlement,
            |node, success| chain.settle(node, success),
            |continuation, settlement| {
                calls.push(continuation);
                let value = settlement.into_value();
                match continuation {
                    Cont::Add(delta) => Settlement::Success(value + delta),
                    Cont::Fail => Settlement::Failure(value),
                    Cont::Recover => Settlement::Success(-value),
                }
            },
        );
        (calls, dropped)
    }

    fn attach(chain: &mut PromiseChain<Cont>, node: NodeId, ok: Option<Cont>, err: Option<Cont>) -> NodeId {
        match chain.attach(node, ok, err) {
            Some(attached) => attached.next,
            None => panic!("node {node:?} missing"),
        }
    }

    #[test]
    fn success_runs_then_and_skips_catch() {
        let mut chain = PromiseChain::default();
        let root = chain.create();
        let second = attach(&mut chain, root, Some(Cont::Add(1)), None);
        let third = attach(&mut chain, second, None, Some(Cont::Recover));
        let _tail = attach(&mut chain, third, Some(Cont::Add(10)), None);

        let (calls, dropped) = run(&mut chain, root, Settlement::Success(1));
        assert_eq!(calls, vec![Cont::Add(1), Cont::Add(10)]);
        assert_eq!(dropped, Some(Settlement::Success(12)));
    }

    #[test]
    fn failure_skips_thens_until_a_catch() {
        let mut chain = PromiseChain::default();
        let root = chain.create();
        let second = attach(&mut chain, root, Some(Cont::Add(1)), None);
        let third = attach(&mut chain, second, Some(Cont::Add(2)), None);
        let fourth = attach(&mut chain, third, None, Some(Cont::Recover));
        let _tail = attach(&mut chain, fourth, Some(Cont::Add(100)), None);

        let (calls, dropped) = run(&mut chain, root, Settlement::Failure(5));
        assert_eq!(calls, vec![Cont::Recover, Cont::Add(100)]);
        assert_eq!(dropped, Some(Settlement::Success(95)));
    }

    #[test]
    fn error_flagged_result_goes_to_the_next_failure_path() {
        let mut chain = PromiseChain::default();
        let root = chain.create();
        let second = attach(&mut chain, root, Some(Cont::Fail), None);
        let third = attach(&mut chain, second, Some(Cont::Add(1)), Some(Cont::Recover));
        let _tail = attach(&mut chain, third, None, None);

        let (calls, _) = run(&mut chain, root, Settlement::Success(7));
        assert_eq!(calls, vec![Cont::Fail, Cont::Recover]);
    }

    #[test]
    fn unobserved_failure_is_dropped_at_chain_end() {
        let mut chain = PromiseChain::default();
        let root = chain.create();

        let (calls, dropped) = run(&mut chain, root, Settlement::Failure(3));
        assert!(calls.is_empty());
        assert_eq!(dropped, Some(Settlement::Failure(3)));
    }

    #[test]
    fn second_settlement_is_ignored() {
        let mut chain = PromiseChain::default();
        let root = chain.create();
        let _next = attach(&mut chain, root, Some(Cont::Add(1)), Some(Cont::Recover));

        let (first, _) = run(&mut chain, root, Settlement::Success(1));
        let (second, dropped) = run(&mut chain, root, Settlement::Failure(1));
        assert_eq!(first, vec![Cont::Add(1)]);
        assert!(second.is_empty());
        assert_eq!(dropped, None);
        assert_eq!(chain.settle(root, true), Step::AlreadySettled);
    }

    #[test]
    fn first_continuation_wins_and_next_node_is_shared() {
        let mut chain = PromiseChain::default();
        let root = chain.create();
        let first = attach(&mut chain, root, Some(Cont::Add(1)), None);
        let again = attach(&mut chain, root, Some(Cont::Add(50)), Some(Cont::Recover));
        assert_eq!(first, again);

        let (calls, _) = run(&mut chain, root, Settlement::Success(0));
        assert_eq!(calls, vec![Cont::Add(1)]);
    }

    #[test]
    fn warm_up_timer_moves_to_the_new_tail() {
        let mut chain = PromiseChain::<Cont>::default();
        let root = chain.create();
        chain.hold_warm_up(root, "warm".to_owned());

        let attached = match chain.attach(root, Some(Cont::Add(1)), None) {
            Some(value) => value,
            None => panic!("root missing"),
        };
        assert_eq!(attached.warm_up.as_deref(), Some("warm"));

        let again = match chain.attach(root, None, Some(Cont::Recover)) {
            Some(value) => value,
            None => panic!("root missing"),
        };
        assert_eq!(again.warm_up, None);

        let moved = match chain.attach(attached.next, None, None) {
            Some(value) => value,
            None => panic!("next node missing"),
        };
        assert_eq!(moved.warm_up.as_deref(), Some("warm"));
    }

    #[test]
    fn settled_nodes_are_freed_and_the_arena_stays_flat() {
        let mut chain = PromiseChain::default();
        for round in 0..50 {
            let root = chain.create();
            let second = attach(&mut chain, root, Some(Cont::Add(1)), None);
            let _tail = attach(&mut chain, second, None, Some(Cont::Recover));
            assert_eq!(chain.len(), 3);

            let (calls, _) = run(&mut chain, root, Settlement::Success(round));
            assert_eq!(calls, vec![Cont::Add(1)]);
            assert!(chain.is_empty());
        }
    }

    #[test]
    fn stale_handles_never_reach_a_reused_slot() {
        let mut chain = PromiseChain::default();
        let old = chain.create();
        let _ = run(&mut chain, old, Settlement::Success(0));

        let fresh = chain.create();
        assert_ne!(old, fresh);
        assert_eq!(chain.attach(old, Some(Cont::Add(1)), None), None);
        assert_eq!(chain.settle(old, true), Step::AlreadySettled);

        let _next = attach(&mut chain, fresh, Some(Cont::Add(2)), None);
        let (calls, _) = run(&mut chain, fresh, Settlement::Success(0));
        assert_eq!(calls, vec![Cont::Add(2)]);
    }

    #[test]
    fn only_one_settlement_can_be_queued() {
        let mut chain = PromiseChain::<Cont>::default();
        let root = chain.create();
        assert!(chain.begin_settlement(root));
        assert!(!chain.begin_settlement(root));

        let _ = chain.settle(root, true);
        assert!(!chain.begin_settlement(root));
    }

    proptest! {
        #[test]
        fn plain_values_reach_the_first_matching_continuation(
            kinds in proptest::collection::vec(0_u8..3, 1..24),
            success in any::<bool>(),
            value in -1_000_i64..1_000,
        ) {
            let mut chain = PromiseChain::default();
            let root = chain.create();
            let mut node = root;
            for kind in &kinds {
                let (ok, err) = match kind {
                    0 => (Some(Cont::Add(0)), None),
                    1 => (None, Some(Cont::Recover)),
                    _ => (None, None),
                };
                node = attach(&mut chain, node, ok, err);
            }

            let (calls, _) = run(
                &mut chain,
                root,
                if success { Settlement::Success(value) } else { Settlement::Failure(value) },
            );
            let wanted = if success { 0 } else { 1 };
            match kinds.iter().position(|kind| *kind == wanted) {
                Some(_) => prop_assert!(!calls.is_empty()),
                None => prop_assert!(calls.is_empty()),
            }
            prop_assert_eq!(
                calls.first().copied(),
                kinds.iter().find(|kind| **kind == wanted).map(|_| {
                    if success { Cont::Add(0) } else { Cont::Recover }
                })
            );
        }
    }
}
