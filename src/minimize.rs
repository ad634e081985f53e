//! Minimization of deterministic Moore and Mealy machines by partition refinement
//! (Moore's algorithm).
//!
//! The pipeline is the same for both machine kinds: discard states unreachable from the
//! initial state, group the remainder by output signature, then repeatedly split classes
//! by the classes their successors fall into until a fixed point is reached. By the
//! Myhill-Nerode theorem the fixed point is the coarsest partition in which no symbol
//! sequence distinguishes two states of the same class, so collapsing each class to a
//! single state yields the minimal equivalent machine.

use bit_set::BitSet;
use std::collections::BTreeSet;

use tracing::{debug, trace};

use crate::{
    machine::{MealyMachine, MooreMachine},
    math::{Map, Partition},
};

impl MooreMachine {
    /// Returns the minimal machine producing the same output sequence as `self` for
    /// every input word. `self` must be deterministic; partial transition functions are
    /// allowed and missing transitions distinguish states like any other observation.
    pub fn minimize(&self) -> MooreMachine {
        let order = reachable_in_order(self.size(), self.initial(), self.symbols().len(), |q, pos| {
            self.successor(q, pos)
        });
        let remap = remap_table(self.size(), &order);
        let succ = |q: usize, pos: usize| self.successor(order[q], pos).and_then(|p| remap[p]);

        let seed = partition_by_signature(order.iter().map(|&q| self.output(q).to_string()));
        let partition = refine_to_fixed_point(seed, self.symbols().len(), &succ);
        let classes = sorted_classes(&partition);
        let class_of = |q: usize| classes.iter().position(|class| class.contains(&q)).unwrap();

        let mut names = Vec::new();
        let mut outputs = Vec::new();
        let mut transitions = Vec::new();
        for (i, class) in classes.iter().enumerate() {
            // any member works, the smallest one keeps the output reproducible
            let representative = *class.first().unwrap();
            names.push(format!("S{i}"));
            outputs.push(self.output(order[representative]).to_string());
            transitions.push(
                (0..self.symbols().len())
                    .map(|pos| succ(representative, pos).map(class_of))
                    .collect(),
            );
        }
        let initial = class_of(remap[self.initial()].expect("initial state is reachable"));

        debug!(
            "moore minimization: {} states in, {} states out",
            self.size(),
            classes.len()
        );
        MooreMachine::from_parts(self.symbols().to_vec(), names, initial, outputs, transitions)
    }
}

impl MealyMachine {
    /// Returns the minimal machine producing the same output sequence as `self` for
    /// every input word, see [`MooreMachine::minimize`]. The output signature of a state
    /// is the tuple of transition outputs across all symbols in fixed alphabet order.
    pub fn minimize(&self) -> MealyMachine {
        let order = reachable_in_order(self.size(), self.initial(), self.symbols().len(), |q, pos| {
            self.successor(q, pos).map(|(target, _)| *target)
        });
        let remap = remap_table(self.size(), &order);
        let succ = |q: usize, pos: usize| {
            self.successor(order[q], pos)
                .and_then(|(target, _)| remap[*target])
        };

        let seed = partition_by_signature(order.iter().map(|&q| {
            (0..self.symbols().len())
                .map(|pos| self.successor(q, pos).map(|(_, output)| output.clone()))
                .collect::<Vec<_>>()
        }));
        let partition = refine_to_fixed_point(seed, self.symbols().len(), &succ);
        let classes = sorted_classes(&partition);
        let class_of = |q: usize| classes.iter().position(|class| class.contains(&q)).unwrap();

        let mut names = Vec::new();
        let mut transitions = Vec::new();
        for (i, class) in classes.iter().enumerate() {
            let representative = *class.first().unwrap();
            names.push(format!("S{i}"));
            transitions.push(
                (0..self.symbols().len())
                    .map(|pos| {
                        self.successor(order[representative], pos)
                            .map(|(target, output)| {
                                let target = remap[*target].expect("target is reachable");
                                (class_of(target), output.clone())
                            })
                    })
                    .collect(),
            );
        }
        let initial = class_of(remap[self.initial()].expect("initial state is reachable"));

        debug!(
            "mealy minimization: {} states in, {} states out",
            self.size(),
            classes.len()
        );
        MealyMachine::from_parts(self.symbols().to_vec(), names, initial, transitions)
    }
}

/// Collects the states reachable from `initial`, preserving their relative arena order.
fn reachable_in_order(
    size: usize,
    initial: usize,
    n_symbols: usize,
    succ: impl Fn(usize, usize) -> Option<usize>,
) -> Vec<usize> {
    let mut seen = BitSet::with_capacity(size);
    let mut stack = vec![initial];
    while let Some(q) = stack.pop() {
        if !seen.insert(q) {
            continue;
        }
        for pos in 0..n_symbols {
            if let Some(p) = succ(q, pos) {
                if !seen.contains(p) {
                    stack.push(p);
                }
            }
        }
    }
    (0..size).filter(|q| seen.contains(*q)).collect()
}

/// Inverse of a pruning order: maps old state indices to their position among the
/// surviving states.
fn remap_table(size: usize, order: &[usize]) -> Vec<Option<usize>> {
    let mut remap = vec![None; size];
    for (new, &old) in order.iter().enumerate() {
        remap[old] = Some(new);
    }
    remap
}

/// Builds the initial partition: states with identical output signatures share a class.
/// Classes appear in order of the first state that exhibits their signature.
fn partition_by_signature<K: std::hash::Hash + Eq>(
    signatures: impl Iterator<Item = K>,
) -> Partition<usize> {
    let mut class_index: Map<K, usize> = Map::default();
    let mut classes: Vec<Vec<usize>> = Vec::new();
    for (state, signature) in signatures.enumerate() {
        let next = classes.len();
        let class = *class_index.entry(signature).or_insert(next);
        if class == next {
            classes.push(Vec::new());
        }
        classes[class].push(state);
    }
    Partition::new(classes)
}

/// Refines `partition` until splitting no longer changes it. In each round a class is
/// split into subclasses keyed by the vector of successor classes under the current
/// partition, one entry per symbol; a missing successor is its own key component.
fn refine_to_fixed_point(
    mut partition: Partition<usize>,
    n_symbols: usize,
    succ: impl Fn(usize, usize) -> Option<usize>,
) -> Partition<usize> {
    loop {
        let mut subclasses: Vec<Vec<usize>> = Vec::new();
        for class in &partition {
            let mut keyed: Map<Vec<Option<usize>>, usize> = Map::default();
            for &state in class {
                let key: Vec<Option<usize>> = (0..n_symbols)
                    .map(|pos| succ(state, pos).map(|target| {
                        partition
                            .class_of(&target)
                            .expect("every successor belongs to some class")
                    }))
                    .collect();
                let next = subclasses.len();
                let subclass = *keyed.entry(key).or_insert(next);
                if subclass == next {
                    subclasses.push(Vec::new());
                }
                subclasses[subclass].push(state);
            }
        }
        let refined = Partition::new(subclasses);
        trace!("refinement round produced {} classes", refined.size());
        if refined == partition {
            return partition;
        }
        partition = refined;
    }
}

/// Orders the classes of a finished partition by their smallest member, which is the
/// first appearance in pruned state order.
fn sorted_classes(partition: &Partition<usize>) -> Vec<&BTreeSet<usize>> {
    let mut classes: Vec<&BTreeSet<usize>> = partition.iter().collect();
    classes.sort_by_key(|class| *class.first().unwrap());
    classes
}

#[cfg(test)]
mod tests {
    use crate::machine::{MealyMachine, MooreMachine};

    /// The DFA from the Wikipedia article on DFA minimization, phrased as a Moore
    /// machine with acceptance outputs. Its six states collapse into three classes.
    fn wiki_moore() -> MooreMachine {
        MooreMachine::parse(
            "\
;0;0;1;1;1;0
;a;b;c;d;e;f
x;b;a;e;e;e;f
y;c;d;f;f;f;f
",
        )
        .unwrap()
    }

    #[test]
    fn moore_minimization_collapses_equivalent_states() {
        let minimal = wiki_moore().minimize();
        assert_eq!(minimal.size(), 3);
        // behavior is unchanged
        for word in ["", "x", "y", "xy", "yy", "xxy", "yxyx"] {
            assert_eq!(
                wiki_moore().output_sequence(word),
                minimal.output_sequence(word),
                "word {word:?}"
            );
        }
    }

    #[test]
    fn minimization_is_idempotent() {
        let once = wiki_moore().minimize();
        let twice = once.minimize();
        assert_eq!(once.render(), twice.render());
    }

    #[test]
    fn unreachable_states_are_pruned() {
        // q3 is not reachable from q0 and must not survive
        let machine = MooreMachine::parse(
            "\
;a;a;b;b
;q0;q1;q2;q3
0;q1;q0;q2;q2
1;q2;q2;q2;q0
",
        )
        .unwrap();
        let minimal = machine.minimize();
        assert!(minimal.size() < 4);
        for word in ["", "0", "01", "110", "0011"] {
            assert_eq!(
                machine.output_sequence(word),
                minimal.output_sequence(word),
                "word {word:?}"
            );
        }
    }

    #[test]
    fn indistinguishable_states_collapse_to_two() {
        // q1 and q2 have the same outputs and the same targets, so exactly two
        // states remain
        let machine = MooreMachine::parse(
            "\
;a;b;b
;q0;q1;q2
0;q1;q1;q1
1;q2;q2;q2
",
        )
        .unwrap();
        assert_eq!(machine.minimize().size(), 2);
    }

    #[test_log::test]
    fn mealy_minimization_preserves_outputs() {
        // q1 and q2 are behaviorally identical
        let machine = MealyMachine::parse(
            "\
;q0;q1;q2
a;q1/0;q2/1;q1/1
b;q2/0;q0/0;q0/0
",
        )
        .unwrap();
        let minimal = machine.minimize();
        assert_eq!(minimal.size(), 2);
        for word in ["", "a", "ab", "ba", "aab", "abba", "bbaa"] {
            assert_eq!(
                machine.output_sequence(word),
                minimal.output_sequence(word),
                "word {word:?}"
            );
        }
    }

    #[test]
    fn partial_machines_survive_minimization() {
        let machine = MealyMachine::parse(
            "\
;q0;q1;q2
a;q1/x;;q0/x
b;q2/y;q0/y;
",
        )
        .unwrap();
        let minimal = machine.minimize();
        for word in ["", "a", "b", "ab", "ba", "aa", "bb", "aba"] {
            assert_eq!(
                machine.output_sequence(word),
                minimal.output_sequence(word),
                "word {word:?}"
            );
        }
    }
}
