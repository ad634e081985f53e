//! The semicolon-delimited tabular exchange format shared by all pipeline stages.
//!
//! A table starts with a marker row (`F` for final states, or output labels for Moore
//! machines), followed by the state-name row and one row per input symbol. The first
//! cell of a symbol row holds the symbol, the remaining cells hold the transition
//! targets aligned to the state columns. The initial state is always the first named
//! column.

use std::path::Path;

use itertools::Itertools;
use thiserror::Error;
use tracing::debug;

use crate::{
    alphabet::EPSILON,
    math::Map,
    nfa::{Nfa, StateId},
};

/// Represents the types of errors that can occur when reading or writing a table.
#[derive(Debug, Error)]
pub enum TableError {
    /// The table does not have both header rows.
    #[error("table is missing its header rows")]
    MissingHeader,
    /// The state-name row declares no states, so there is no initial state.
    #[error("table declares no states")]
    MissingInitialState,
    /// No column carries the final-state marker.
    #[error("no state is marked as final")]
    MissingFinalMarker,
    /// A row label that should be a single input symbol is something else.
    #[error("malformed symbol `{0}` in row label")]
    MalformedSymbol(String),
    /// A transition cell references a state that the name row does not declare.
    #[error("transition references undeclared state `{0}`")]
    UnknownState(String),
    /// A transition cell could not be parsed, e.g. a Mealy cell without `/`.
    #[error("malformed transition cell `{0}`")]
    MalformedCell(String),
    /// The underlying file could not be read or written.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Splits raw table text into rows of cells. Empty lines and a trailing `\r` (the
/// original tooling wrote CRLF) are tolerated.
pub(crate) fn rows(text: &str) -> Vec<Vec<&str>> {
    text.lines()
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.is_empty())
        .map(|line| line.split(';').map(str::trim).collect())
        .collect()
}

/// Parses the label cell of a symbol row into a single character.
pub(crate) fn symbol_label(cell: &str) -> Result<char, TableError> {
    let mut chars = cell.chars();
    match (chars.next(), chars.next()) {
        (Some(sym), None) => Ok(sym),
        _ => Err(TableError::MalformedSymbol(cell.to_string())),
    }
}

/// Serializes `nfa` into the tabular format. Reachable states are canonically renamed
/// `S0, S1, ...` in depth-first order from the initial state, so the initial state is
/// always the first column; unreachable states are never emitted. Symbol rows come in
/// ascending order with the epsilon row last, if there are any epsilon edges.
pub fn render_nfa(nfa: &Nfa) -> String {
    let order = nfa.reachable_states();
    let position: Map<StateId, usize> = order.iter().enumerate().map(|(i, &q)| (q, i)).collect();
    let name = |q: StateId| format!("S{}", position[&q]);

    let mut lines = Vec::new();
    lines.push(
        std::iter::once("")
            .chain(
                order
                    .iter()
                    .map(|&q| if nfa.is_final(q) { "F" } else { "" }),
            )
            .join(";"),
    );
    lines.push(
        std::iter::once(String::new())
            .chain(order.iter().map(|&q| name(q)))
            .join(";"),
    );

    for sym in nfa.alphabet().universe() {
        let cells = order
            .iter()
            .map(|&q| nfa.targets(q, sym).map(name).join(","));
        lines.push(std::iter::once(sym.to_string()).chain(cells).join(";"));
    }

    if !nfa.is_epsilon_free() {
        let cells = order
            .iter()
            .map(|&q| nfa.epsilon_targets(q).map(name).join(","));
        lines.push(std::iter::once(EPSILON.to_string()).chain(cells).join(";"));
    }

    lines.push(String::new());
    lines.join("\n")
}

/// Parses an automaton from tabular text. The first named column becomes the initial
/// state; every column marked `F` becomes final. Fails if the header rows are missing,
/// no state is declared or marked final, or a cell references an undeclared state.
pub fn parse_nfa(text: &str) -> Result<Nfa, TableError> {
    let rows = rows(text);
    if rows.len() < 2 {
        return Err(TableError::MissingHeader);
    }
    let markers = &rows[0][1..];
    let names = rows[1]
        .get(1..)
        .filter(|names| !names.is_empty() && !names[0].is_empty())
        .ok_or(TableError::MissingInitialState)?;

    let mut nfa = Nfa::new();
    let mut index: Map<&str, StateId> = Map::default();
    for &name in names.iter() {
        index.insert(name, nfa.add_state());
    }
    nfa.set_initial(index[names[0]]);

    let mut any_final = false;
    for (column, marker) in markers.iter().enumerate() {
        if *marker == "F" {
            let name = names
                .get(column)
                .ok_or_else(|| TableError::MalformedCell("F".to_string()))?;
            nfa.mark_final(index[name]);
            any_final = true;
        }
    }
    if !any_final {
        return Err(TableError::MissingFinalMarker);
    }

    for row in &rows[2..] {
        let sym = symbol_label(row[0])?;
        for (column, cell) in row[1..].iter().enumerate() {
            let Some(&source) = names.get(column).and_then(|name| index.get(name)) else {
                return Err(TableError::MalformedCell((*cell).to_string()));
            };
            for target in cell.split(',').filter(|target| !target.is_empty()) {
                let &target = index
                    .get(target)
                    .ok_or_else(|| TableError::UnknownState(target.to_string()))?;
                if sym == EPSILON {
                    nfa.add_epsilon(source, target);
                } else {
                    nfa.add_transition(source, sym, target);
                }
            }
        }
    }

    Ok(nfa)
}

/// Reads an automaton table from the file at `path`.
pub fn read_nfa_file<P: AsRef<Path>>(path: P) -> Result<Nfa, TableError> {
    let text = std::fs::read_to_string(path.as_ref())?;
    let nfa = parse_nfa(&text)?;
    debug!(
        "read automaton with {} states from {}",
        nfa.size(),
        path.as_ref().display()
    );
    Ok(nfa)
}

/// Serializes `nfa` and writes it to the file at `path`. The table is rendered in full
/// before anything touches the filesystem, so a failure leaves no partial file behind.
pub fn write_nfa_file<P: AsRef<Path>>(path: P, nfa: &Nfa) -> Result<(), TableError> {
    let rendered = render_nfa(nfa);
    std::fs::write(path.as_ref(), rendered)?;
    debug!("wrote automaton table to {}", path.as_ref().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{parse_nfa, render_nfa, TableError};
    use crate::nfa::NfaBuilder;

    #[test]
    fn rendered_table_starts_with_the_initial_state() {
        let nfa = NfaBuilder::default()
            .with_transitions([(1, 'a', 0), (0, 'b', 1)])
            .with_finals([0])
            .into_nfa(1);
        let table = render_nfa(&nfa);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], ";;F");
        assert_eq!(lines[1], ";S0;S1");
        // column S0 is the original state 1, the initial state
        assert_eq!(lines[2], "a;S1;");
        assert_eq!(lines[3], "b;;S0");
    }

    #[test]
    fn unreachable_states_are_not_emitted() {
        let nfa = NfaBuilder::default()
            .with_transitions([(0, 'a', 1), (2, 'a', 0)])
            .with_finals([1])
            .into_nfa(0);
        let table = render_nfa(&nfa);
        assert_eq!(table.lines().nth(1), Some(";S0;S1"));
    }

    #[test]
    fn parse_then_render_preserves_language() {
        let nfa = NfaBuilder::default()
            .with_transitions([(0, 'a', 0), (0, 'a', 1), (1, 'b', 2)])
            .with_epsilons([(1, 0)])
            .with_finals([2])
            .into_nfa(0);
        let reread = parse_nfa(&render_nfa(&nfa)).unwrap();
        for word in ["ab", "aab", "aaab", "b", "", "ba", "abb"] {
            assert_eq!(nfa.accepts(word), reread.accepts(word), "word {word:?}");
        }
    }

    #[test]
    fn missing_final_marker_is_rejected() {
        let text = ";;\n;S0;S1\na;S1;S0\n";
        assert!(matches!(
            parse_nfa(text),
            Err(TableError::MissingFinalMarker)
        ));
    }

    #[test]
    fn undeclared_target_is_rejected() {
        let text = ";F\n;S0\na;S7\n";
        assert!(matches!(parse_nfa(text), Err(TableError::UnknownState(name)) if name == "S7"));
    }

    #[test]
    fn header_must_be_present() {
        assert!(matches!(parse_nfa(""), Err(TableError::MissingHeader)));
        assert!(matches!(
            parse_nfa(";F\n"),
            Err(TableError::MissingHeader)
        ));
    }
}
