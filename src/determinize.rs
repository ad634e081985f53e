use std::collections::{BTreeSet, VecDeque};

use tracing::{debug, trace};

use crate::{
    math::Map,
    nfa::{Nfa, StateId},
};

/// Applies the epsilon-closure subset construction to `nfa`, producing an equivalent
/// deterministic, epsilon-free automaton.
///
/// Every state of the result corresponds to a set of original states. The initial member
/// set is the epsilon closure of the original initial state; successor member sets are
/// the closure-extended transition targets, unioned over all members. Member sets are
/// canonicalized as ordered sets and deduplicated by set equality, so the worklist
/// terminates after at most power-set many states — in practice far fewer. A subset
/// state is final iff its member set contains a final original state.
pub fn determinize(nfa: &Nfa) -> Nfa {
    let alphabet = nfa.alphabet();
    let mut result = Nfa::new();
    let mut known: Map<BTreeSet<StateId>, StateId> = Map::default();
    let mut worklist = VecDeque::new();

    let initial_members = nfa.epsilon_closure(nfa.initial());
    let initial = result.add_state();
    result.set_initial(initial);
    known.insert(initial_members.clone(), initial);
    worklist.push_back((initial, initial_members));

    while let Some((id, members)) = worklist.pop_front() {
        trace!("expanding subset state {id} with members {members:?}");
        if members.iter().any(|&q| nfa.is_final(q)) {
            result.mark_final(id);
        }

        for sym in alphabet.universe() {
            let moved: Vec<StateId> = members.iter().flat_map(|&q| nfa.targets(q, sym)).collect();
            let successor_members = nfa.epsilon_closure_of(moved);
            if successor_members.is_empty() {
                continue;
            }
            let successor = match known.get(&successor_members) {
                Some(&existing) => existing,
                None => {
                    let fresh = result.add_state();
                    known.insert(successor_members.clone(), fresh);
                    worklist.push_back((fresh, successor_members));
                    fresh
                }
            };
            result.add_transition(id, sym, successor);
        }
    }

    debug!(
        "subset construction: {} states in, {} states out",
        nfa.size(),
        result.size()
    );
    result
}
