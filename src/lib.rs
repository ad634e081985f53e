//! Toolchain for building and reducing finite automata from symbolic descriptions.
//!
//! The crate implements a straight pipeline over one shared automaton model and one
//! tabular exchange format. A regular expression is parsed into a syntax tree and
//! compiled into an epsilon-NFA by Thompson's construction; the subset construction over
//! epsilon closures turns any such automaton into an equivalent deterministic,
//! epsilon-free one; and deterministic Moore or Mealy machines are reduced to their
//! minimal equivalents by iterative partition refinement. Every stage reads and writes
//! the same semicolon-delimited table format, so each stage's output is valid input to
//! the next.
//!
//! Automata own their states in an arena indexed by [`nfa::StateId`], which keeps the
//! cyclic epsilon edges of `*` and `+` loops free of any ownership concerns. All
//! structures are built once and read-only afterwards; no stage mutates its input.
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// The prelude makes using this crate easier: `use fsmkit::prelude::*;` brings the
/// pipeline stages and the automaton model into scope.
pub mod prelude {
    pub use super::{
        alphabet::{CharAlphabet, EPSILON},
        determinize::determinize,
        machine::{MealyMachine, MooreMachine},
        math,
        nfa::{Nfa, NfaBuilder, StateId},
        regex::{Ast, RegexParseError},
        table::{parse_nfa, read_nfa_file, render_nfa, write_nfa_file, TableError},
        thompson,
    };
}

/// Definitions of mathematical objects used throughout the crate, most importantly the
/// [`math::Partition`] refined by the minimizer.
pub mod math;

/// Alphabets of single-character symbols and the reserved epsilon pseudo-symbol.
pub mod alphabet;

/// Regular expression syntax trees and the recursive-descent parser producing them.
pub mod regex;

/// The arena-backed automaton model shared by all pipeline stages.
pub mod nfa;

/// Thompson's construction from syntax tree to epsilon-NFA.
pub mod thompson;

/// The tabular text format used to exchange automata between stages.
pub mod table;

/// Epsilon-closure subset construction.
pub mod determinize;

/// Deterministic Moore and Mealy machines and their tables.
pub mod machine;

/// Minimization of Moore and Mealy machines by partition refinement.
pub mod minimize;

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    /// Runs the whole pipeline on a pattern: regex to epsilon-NFA to table, table to
    /// DFA to table, DFA table reinterpreted as a Moore machine (the `F` marker row is
    /// a degenerate output row) and minimized.
    fn pipeline(pattern: &str) -> (Nfa, MooreMachine) {
        let nfa = thompson::build(&crate::regex::parse(pattern).unwrap());
        let nfa = parse_nfa(&render_nfa(&nfa)).unwrap();
        let dfa = determinize(&nfa);
        let machine = MooreMachine::parse(&render_nfa(&dfa)).unwrap();
        (nfa, machine.minimize())
    }

    #[test_log::test]
    fn end_to_end_pipeline() {
        let (nfa, minimal) = pipeline("a(b|c)*");
        // the minimal DFA for a(b|c)* has two live states
        assert_eq!(minimal.size(), 2);
        for word in ["", "a", "ab", "abc", "abbcb", "b", "ba", "ac"] {
            let accepted = minimal
                .output_sequence(word)
                .is_some_and(|outputs| outputs.last().map(String::as_str) == Some("F"));
            assert_eq!(nfa.accepts(word), accepted, "word {word:?}");
        }
    }
}
