use tracing::trace;

use crate::{
    alphabet::EPSILON,
    nfa::{Nfa, StateId},
    regex::Ast,
};

/// A two-pointer handle on a sub-automaton inside the arena under construction. Each
/// construction step allocates fresh states and only ever attaches epsilon edges to the
/// states of previously returned fragments, which keeps concatenation and alternation
/// associative.
#[derive(Debug, Clone, Copy)]
struct Fragment {
    start: StateId,
    accept: StateId,
}

/// Compiles `ast` into an epsilon-NFA by Thompson's construction. The resulting automaton
/// accepts exactly the language denoted by the tree and has a single final state; its
/// state count is linear in the size of the expression.
pub fn build(ast: &Ast) -> Nfa {
    let mut nfa = Nfa::new();
    let fragment = compile(&mut nfa, ast);
    nfa.set_initial(fragment.start);
    nfa.mark_final(fragment.accept);
    trace!(
        "thompson construction produced {} states for {ast}",
        nfa.size()
    );
    nfa
}

fn compile(nfa: &mut Nfa, ast: &Ast) -> Fragment {
    match ast {
        Ast::Literal(sym) => {
            let start = nfa.add_state();
            let accept = nfa.add_state();
            if *sym == EPSILON {
                nfa.add_epsilon(start, accept);
            } else {
                nfa.add_transition(start, *sym, accept);
            }
            Fragment { start, accept }
        }
        Ast::Concat(left, right) => {
            let left = compile(nfa, left);
            let right = compile(nfa, right);
            nfa.add_epsilon(left.accept, right.start);
            Fragment {
                start: left.start,
                accept: right.accept,
            }
        }
        Ast::Alternate(left, right) => {
            let start = nfa.add_state();
            let accept = nfa.add_state();
            let left = compile(nfa, left);
            let right = compile(nfa, right);
            nfa.add_epsilon(start, left.start);
            nfa.add_epsilon(start, right.start);
            nfa.add_epsilon(left.accept, accept);
            nfa.add_epsilon(right.accept, accept);
            Fragment { start, accept }
        }
        Ast::Star(inner) => {
            let start = nfa.add_state();
            let accept = nfa.add_state();
            let inner = compile(nfa, inner);
            nfa.add_epsilon(start, inner.start);
            // zero-match path
            nfa.add_epsilon(start, accept);
            nfa.add_epsilon(inner.accept, inner.start);
            nfa.add_epsilon(inner.accept, accept);
            Fragment { start, accept }
        }
        Ast::Plus(inner) => {
            let start = nfa.add_state();
            let accept = nfa.add_state();
            let inner = compile(nfa, inner);
            // no skip edge, at least one traversal of the body is forced
            nfa.add_epsilon(start, inner.start);
            nfa.add_epsilon(inner.accept, inner.start);
            nfa.add_epsilon(inner.accept, accept);
            Fragment { start, accept }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::build;
    use crate::regex::parse;

    fn built(pattern: &str) -> crate::nfa::Nfa {
        build(&parse(pattern).unwrap())
    }

    /// Enumerates every word over `alphabet` up to the given length.
    fn words(alphabet: &[char], max_len: usize) -> Vec<String> {
        let mut all = vec![String::new()];
        let mut layer = vec![String::new()];
        for _ in 0..max_len {
            layer = layer
                .iter()
                .flat_map(|w| {
                    alphabet.iter().map(move |&c| {
                        let mut next = w.clone();
                        next.push(c);
                        next
                    })
                })
                .collect();
            all.extend(layer.iter().cloned());
        }
        all
    }

    #[test]
    fn literal_and_concat() {
        let nfa = built("ab");
        assert!(nfa.accepts("ab"));
        assert!(!nfa.accepts("a"));
        assert!(!nfa.accepts("abb"));
        assert!(!nfa.accepts(""));
    }

    #[test]
    fn star_allows_zero_matches_plus_does_not() {
        let star = built("a*");
        assert!(star.accepts(""));
        assert!(star.accepts("aaa"));
        assert!(!star.accepts("ab"));

        let plus = built("a+");
        assert!(!plus.accepts(""));
        assert!(plus.accepts("a"));
        assert!(plus.accepts("aaaa"));
    }

    #[test]
    fn epsilon_literal_matches_empty_word() {
        let nfa = built("ε|a");
        assert!(nfa.accepts(""));
        assert!(nfa.accepts("a"));
        assert!(!nfa.accepts("aa"));
    }

    #[test]
    fn exhaustive_check_against_reference_language() {
        // a(b|c)* accepts exactly the words starting with a single a followed by
        // any mix of b and c
        let nfa = built("a(b|c)*");
        for word in words(&['a', 'b', 'c'], 5) {
            let expected = word.starts_with('a')
                && word.chars().skip(1).all(|c| c == 'b' || c == 'c');
            assert_eq!(nfa.accepts(&word), expected, "word {word:?}");
        }
        assert!(!nfa.accepts(""));
    }

    #[test]
    fn state_count_is_linear() {
        // every operator adds at most two states on top of its operands
        let nfa = built("(a|b)*c+");
        assert!(nfa.size() <= 2 * "(a|b)*c+".len());
    }
}
