use std::collections::{BTreeMap, BTreeSet};

use bit_set::BitSet;
use itertools::Itertools;

use crate::{
    alphabet::{CharAlphabet, EPSILON},
    math::Set,
};

/// States are identified by their index into the arena owned by the containing [`Nfa`].
/// Cyclic epsilon edges (as produced for `*` and `+`) are therefore plain index lists
/// with no ownership concerns.
pub type StateId = usize;

/// A single state of an [`Nfa`]: a mapping from input symbol to the set of target states
/// plus a separate set of epsilon targets. Both use ordered collections so that iteration
/// order, and with it serialization, is stable.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct NfaState {
    transitions: BTreeMap<char, BTreeSet<StateId>>,
    epsilon: BTreeSet<StateId>,
}

/// A nondeterministic finite automaton with epsilon transitions. The automaton owns all
/// of its states in an arena; a symbol may lead to zero, one or many successor states.
/// Epsilon-free deterministic automata are represented by the same type, they simply have
/// no epsilon edges and at most one target per symbol.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Nfa {
    states: Vec<NfaState>,
    initial: StateId,
    finals: Set<StateId>,
}

impl Nfa {
    /// Creates an empty automaton. At least one state must be added before the automaton
    /// is usable; the initial state defaults to the first one added.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a fresh state without any edges, returning its index.
    pub fn add_state(&mut self) -> StateId {
        let id = self.states.len();
        self.states.push(NfaState::default());
        id
    }

    /// Adds a transition from `source` to `target` on `sym`. Epsilon edges go through
    /// [`Self::add_epsilon`] instead.
    ///
    /// # Panics
    /// Panics if `sym` is [`EPSILON`] or either state does not exist in the arena.
    pub fn add_transition(&mut self, source: StateId, sym: char, target: StateId) {
        assert!(sym != EPSILON, "epsilon edges have their own storage");
        assert!(
            source < self.states.len() && target < self.states.len(),
            "source {source} or target {target} state does not exist"
        );
        self.states[source]
            .transitions
            .entry(sym)
            .or_default()
            .insert(target);
    }

    /// Adds an epsilon edge from `source` to `target`.
    ///
    /// # Panics
    /// Panics if either state does not exist in the arena.
    pub fn add_epsilon(&mut self, source: StateId, target: StateId) {
        assert!(
            source < self.states.len() && target < self.states.len(),
            "source {source} or target {target} state does not exist"
        );
        self.states[source].epsilon.insert(target);
    }

    /// Designates `state` as the initial state.
    pub fn set_initial(&mut self, state: StateId) {
        assert!(state < self.states.len());
        self.initial = state;
    }

    /// Marks `state` as final/accepting.
    pub fn mark_final(&mut self, state: StateId) {
        assert!(state < self.states.len());
        self.finals.insert(state);
    }

    /// Returns the index of the initial state.
    pub fn initial(&self) -> StateId {
        self.initial
    }

    /// Checks whether `state` is final.
    pub fn is_final(&self, state: StateId) -> bool {
        self.finals.contains(&state)
    }

    /// Iterates over all final states in ascending order.
    pub fn finals(&self) -> impl Iterator<Item = StateId> + '_ {
        self.finals.iter().copied().sorted()
    }

    /// Returns the number of states in the arena, reachable or not.
    pub fn size(&self) -> usize {
        self.states.len()
    }

    /// Computes the alphabet as the union of all symbols appearing on any transition.
    /// Epsilon is never part of the alphabet.
    pub fn alphabet(&self) -> CharAlphabet {
        CharAlphabet::new(
            self.states
                .iter()
                .flat_map(|state| state.transitions.keys().copied()),
        )
    }

    /// Iterates over the symbol transitions leaving `state`, in ascending symbol order.
    pub fn transitions_from(
        &self,
        state: StateId,
    ) -> impl Iterator<Item = (char, &BTreeSet<StateId>)> + '_ {
        self.states[state]
            .transitions
            .iter()
            .map(|(&sym, targets)| (sym, targets))
    }

    /// Returns the set of states reached from `state` on `sym`, which may be empty.
    pub fn targets(&self, state: StateId, sym: char) -> impl Iterator<Item = StateId> + '_ {
        self.states[state]
            .transitions
            .get(&sym)
            .into_iter()
            .flat_map(|targets| targets.iter().copied())
    }

    /// Iterates over the epsilon targets of `state`.
    pub fn epsilon_targets(&self, state: StateId) -> impl Iterator<Item = StateId> + '_ {
        self.states[state].epsilon.iter().copied()
    }

    /// True if no state has an outgoing epsilon edge.
    pub fn is_epsilon_free(&self) -> bool {
        self.states.iter().all(|state| state.epsilon.is_empty())
    }

    /// True if the automaton is epsilon-free and no symbol leads to more than one target.
    pub fn is_deterministic(&self) -> bool {
        self.is_epsilon_free()
            && self
                .states
                .iter()
                .all(|state| state.transitions.values().all(|targets| targets.len() <= 1))
    }

    /// Computes the epsilon closure of `state`: every state reachable by following only
    /// epsilon edges, including `state` itself. Exhaustive depth-first traversal.
    pub fn epsilon_closure(&self, state: StateId) -> BTreeSet<StateId> {
        self.epsilon_closure_of([state])
    }

    /// Computes the union of the epsilon closures of all given states.
    pub fn epsilon_closure_of<I: IntoIterator<Item = StateId>>(
        &self,
        states: I,
    ) -> BTreeSet<StateId> {
        let mut seen = BitSet::with_capacity(self.states.len());
        let mut stack: Vec<StateId> = states.into_iter().collect();
        let mut closure = BTreeSet::new();

        while let Some(q) = stack.pop() {
            if !seen.insert(q) {
                continue;
            }
            closure.insert(q);
            stack.extend(self.epsilon_targets(q));
        }

        closure
    }

    /// Returns the states reachable from the initial state in depth-first preorder; the
    /// initial state always comes first. Traversal follows symbol edges in ascending
    /// symbol order before epsilon edges, so the order is stable for a fixed automaton.
    pub fn reachable_states(&self) -> Vec<StateId> {
        if self.states.is_empty() {
            return Vec::new();
        }
        let mut seen = BitSet::with_capacity(self.states.len());
        let mut order = Vec::new();
        let mut stack = vec![self.initial];

        while let Some(q) = stack.pop() {
            if !seen.insert(q) {
                continue;
            }
            order.push(q);
            let successors = self
                .transitions_from(q)
                .flat_map(|(_, targets)| targets.iter().copied())
                .chain(self.epsilon_targets(q))
                .filter(|p| !seen.contains(*p))
                .unique()
                .collect_vec();
            // pushed in reverse so the smallest successor is popped first
            stack.extend(successors.into_iter().rev());
        }

        order
    }

    /// Runs `word` through the automaton by epsilon-closure simulation and returns true
    /// iff a final state is reachable on it.
    pub fn accepts(&self, word: &str) -> bool {
        if self.states.is_empty() {
            return false;
        }
        let mut current = self.epsilon_closure(self.initial);
        for sym in word.chars() {
            let moved = current
                .iter()
                .flat_map(|&q| self.targets(q, sym))
                .collect_vec();
            current = self.epsilon_closure_of(moved);
            if current.is_empty() {
                return false;
            }
        }
        current.iter().any(|q| self.is_final(*q))
    }

    /// Returns a string representation of the transition table, mainly for debugging.
    pub fn build_transition_table(&self) -> String {
        let alphabet = self.alphabet();
        let mut builder = tabled::builder::Builder::default();
        builder.push_record(
            std::iter::once("state".to_string())
                .chain(alphabet.universe().map(|sym| sym.to_string()))
                .chain(std::iter::once(EPSILON.to_string())),
        );
        for q in 0..self.states.len() {
            let mut row = vec![format!(
                "{}{}{}",
                if q == self.initial { "->" } else { "" },
                q,
                if self.is_final(q) { "*" } else { "" }
            )];
            for sym in alphabet.universe() {
                row.push(self.targets(q, sym).map(|p| p.to_string()).join(","));
            }
            row.push(self.epsilon_targets(q).map(|p| p.to_string()).join(","));
            builder.push_record(row);
        }
        builder
            .build()
            .with(tabled::settings::Style::rounded())
            .to_string()
    }
}

impl std::fmt::Debug for Nfa {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.build_transition_table())
    }
}

/// Helper struct for constructing automata from a list of edges, mostly in tests. States
/// are allocated densely up to the largest index that appears in any edge or marker.
///
/// # Example
/// ```
/// use fsmkit::nfa::NfaBuilder;
///
/// let nfa = NfaBuilder::default()
///     .with_transitions([(0, 'a', 0), (0, 'a', 1), (1, 'b', 1)])
///     .with_finals([1])
///     .into_nfa(0);
/// assert!(nfa.accepts("aab"));
/// ```
#[derive(Default)]
pub struct NfaBuilder {
    edges: Vec<(StateId, char, StateId)>,
    epsilons: Vec<(StateId, StateId)>,
    finals: Vec<StateId>,
}

impl NfaBuilder {
    /// Adds a list of symbol transitions given as `(source, symbol, target)` triples.
    pub fn with_transitions<I: IntoIterator<Item = (StateId, char, StateId)>>(
        mut self,
        iter: I,
    ) -> Self {
        self.edges.extend(iter);
        self
    }

    /// Adds a list of epsilon edges given as `(source, target)` pairs.
    pub fn with_epsilons<I: IntoIterator<Item = (StateId, StateId)>>(mut self, iter: I) -> Self {
        self.epsilons.extend(iter);
        self
    }

    /// Marks the given states as final.
    pub fn with_finals<I: IntoIterator<Item = StateId>>(mut self, iter: I) -> Self {
        self.finals.extend(iter);
        self
    }

    /// Builds the automaton with `initial` as initial state.
    pub fn into_nfa(self, initial: StateId) -> Nfa {
        let max_id = self
            .edges
            .iter()
            .flat_map(|&(q, _, p)| [q, p])
            .chain(self.epsilons.iter().flat_map(|&(q, p)| [q, p]))
            .chain(self.finals.iter().copied())
            .chain(std::iter::once(initial))
            .max()
            .unwrap_or(0);

        let mut nfa = Nfa::new();
        for _ in 0..=max_id {
            nfa.add_state();
        }
        for (q, sym, p) in self.edges {
            nfa.add_transition(q, sym, p);
        }
        for (q, p) in self.epsilons {
            nfa.add_epsilon(q, p);
        }
        for q in self.finals {
            nfa.mark_final(q);
        }
        nfa.set_initial(initial);
        nfa
    }
}

#[cfg(test)]
mod tests {
    use super::NfaBuilder;

    #[test]
    fn epsilon_closure_follows_chains_and_cycles() {
        let nfa = NfaBuilder::default()
            .with_transitions([(2, 'a', 3)])
            .with_epsilons([(0, 1), (1, 2), (2, 0), (3, 3)])
            .into_nfa(0);

        assert_eq!(nfa.epsilon_closure(0), [0, 1, 2].into_iter().collect());
        assert_eq!(nfa.epsilon_closure(3), [3].into_iter().collect());
    }

    #[test]
    fn acceptance_by_closure_simulation() {
        // accepts a(a|b)* with an epsilon detour
        let nfa = NfaBuilder::default()
            .with_transitions([(0, 'a', 1), (2, 'a', 2), (2, 'b', 2)])
            .with_epsilons([(1, 2)])
            .with_finals([2])
            .into_nfa(0);

        assert!(nfa.accepts("a"));
        assert!(nfa.accepts("abba"));
        assert!(!nfa.accepts(""));
        assert!(!nfa.accepts("ba"));
    }

    #[test]
    fn reachability_starts_at_the_initial_state() {
        let nfa = NfaBuilder::default()
            .with_transitions([(0, 'a', 2), (2, 'b', 0), (3, 'a', 0)])
            .with_epsilons([(2, 4)])
            .into_nfa(0);

        // state 1 is allocated but unreachable, state 3 only reaches *into* the rest
        assert_eq!(nfa.reachable_states(), vec![0, 2, 4]);
    }

    #[test]
    fn determinism_checks() {
        let det = NfaBuilder::default()
            .with_transitions([(0, 'a', 1), (1, 'a', 1)])
            .into_nfa(0);
        assert!(det.is_deterministic());
        assert!(det.is_epsilon_free());

        let nondet = NfaBuilder::default()
            .with_transitions([(0, 'a', 1), (0, 'a', 0)])
            .into_nfa(0);
        assert!(!nondet.is_deterministic());
    }
}
