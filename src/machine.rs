//! Deterministic Moore and Mealy machines and their tabular representation.
//!
//! Both machine kinds keep their states in an arena indexed by position, carry the
//! alphabet in the order the symbol rows appeared in (this order is the fixed order used
//! for output signatures during minimization) and allow cells to be empty, i.e. partial
//! transition functions. Determinism — at most one target per state and symbol — is
//! structural here, it is not re-validated.

use std::path::Path;

use itertools::Itertools;
use tracing::debug;

use crate::table::{self, symbol_label, TableError};

/// A Moore machine: every state carries a single output label, transitions are plain
/// state-to-state edges.
///
/// Table layout: output row, state-name row, one row per input symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MooreMachine {
    symbols: Vec<char>,
    names: Vec<String>,
    initial: usize,
    outputs: Vec<String>,
    /// transition targets, indexed by state then by symbol position
    transitions: Vec<Vec<Option<usize>>>,
}

/// A Mealy machine: outputs sit on the transitions, so each cell of the table holds
/// `target/output`.
///
/// Table layout: state-name row, one row per input symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MealyMachine {
    symbols: Vec<char>,
    names: Vec<String>,
    initial: usize,
    /// target and emitted output, indexed by state then by symbol position
    transitions: Vec<Vec<Option<(usize, String)>>>,
}

impl MooreMachine {
    /// Assembles a machine from parts. Mostly used by the minimizer's rebuild step and
    /// by tests.
    pub fn from_parts(
        symbols: Vec<char>,
        names: Vec<String>,
        initial: usize,
        outputs: Vec<String>,
        transitions: Vec<Vec<Option<usize>>>,
    ) -> Self {
        assert_eq!(names.len(), outputs.len());
        assert_eq!(names.len(), transitions.len());
        assert!(initial < names.len() || names.is_empty());
        Self {
            symbols,
            names,
            initial,
            outputs,
            transitions,
        }
    }

    /// Number of states.
    pub fn size(&self) -> usize {
        self.names.len()
    }

    /// Index of the initial state.
    pub fn initial(&self) -> usize {
        self.initial
    }

    /// The input symbols in fixed (input row) order.
    pub fn symbols(&self) -> &[char] {
        &self.symbols
    }

    /// The state names in arena order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The output label of `state`.
    pub fn output(&self, state: usize) -> &str {
        &self.outputs[state]
    }

    /// The transition target for `state` on the symbol at `symbol_pos`, if any.
    pub fn successor(&self, state: usize, symbol_pos: usize) -> Option<usize> {
        self.transitions[state][symbol_pos]
    }

    /// Runs `word` from the initial state and collects the visited states' outputs,
    /// starting with the initial state's own output. `None` if the run gets stuck on a
    /// missing transition or unknown symbol.
    pub fn output_sequence(&self, word: &str) -> Option<Vec<String>> {
        let mut state = self.initial;
        let mut outputs = vec![self.outputs[state].clone()];
        for sym in word.chars() {
            let pos = self.symbols.iter().position(|&s| s == sym)?;
            state = self.successor(state, pos)?;
            outputs.push(self.outputs[state].clone());
        }
        Some(outputs)
    }

    /// Parses a Moore table: output row, state-name row, then symbol rows.
    pub fn parse(text: &str) -> Result<Self, TableError> {
        let rows = table::rows(text);
        if rows.len() < 2 {
            return Err(TableError::MissingHeader);
        }
        let outputs = &rows[0][1..];
        let names = rows[1]
            .get(1..)
            .filter(|names| !names.is_empty() && !names[0].is_empty())
            .ok_or(TableError::MissingInitialState)?;
        if outputs.len() != names.len() {
            return Err(TableError::MalformedCell(outputs.iter().join(";")));
        }

        let mut machine = Self {
            symbols: Vec::new(),
            names: names.iter().map(|name| name.to_string()).collect(),
            initial: 0,
            outputs: outputs.iter().map(|output| output.to_string()).collect(),
            transitions: vec![Vec::new(); names.len()],
        };

        for row in &rows[2..] {
            machine.symbols.push(symbol_label(row[0])?);
            for (state, columns) in machine.transitions.iter_mut().enumerate() {
                let cell = row.get(state + 1).copied().unwrap_or("");
                if cell.is_empty() {
                    columns.push(None);
                } else {
                    let target = names
                        .iter()
                        .position(|&name| name == cell)
                        .ok_or_else(|| TableError::UnknownState(cell.to_string()))?;
                    columns.push(Some(target));
                }
            }
        }
        Ok(machine)
    }

    /// Renders the machine as a table, with the initial state's column first.
    pub fn render(&self) -> String {
        let order = column_order(self.initial, self.size());
        let mut lines = Vec::new();
        lines.push(
            std::iter::once("")
                .chain(order.iter().map(|&q| self.outputs[q].as_str()))
                .join(";"),
        );
        lines.push(
            std::iter::once("")
                .chain(order.iter().map(|&q| self.names[q].as_str()))
                .join(";"),
        );
        for (pos, sym) in self.symbols.iter().enumerate() {
            let cells = order.iter().map(|&q| {
                self.successor(q, pos)
                    .map(|p| self.names[p].as_str())
                    .unwrap_or("")
            });
            lines.push(std::iter::once(sym.to_string()).chain(cells.map(String::from)).join(";"));
        }
        lines.push(String::new());
        lines.join("\n")
    }

    /// Reads a Moore table from the file at `path`.
    pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Self, TableError> {
        let machine = Self::parse(&std::fs::read_to_string(path.as_ref())?)?;
        debug!(
            "read moore machine with {} states from {}",
            machine.size(),
            path.as_ref().display()
        );
        Ok(machine)
    }

    /// Renders the machine and writes it to `path` in one go.
    pub fn write_file<P: AsRef<Path>>(&self, path: P) -> Result<(), TableError> {
        let rendered = self.render();
        std::fs::write(path, rendered)?;
        Ok(())
    }
}

impl MealyMachine {
    /// Assembles a machine from parts, see [`MooreMachine::from_parts`].
    pub fn from_parts(
        symbols: Vec<char>,
        names: Vec<String>,
        initial: usize,
        transitions: Vec<Vec<Option<(usize, String)>>>,
    ) -> Self {
        assert_eq!(names.len(), transitions.len());
        assert!(initial < names.len() || names.is_empty());
        Self {
            symbols,
            names,
            initial,
            transitions,
        }
    }

    /// Number of states.
    pub fn size(&self) -> usize {
        self.names.len()
    }

    /// Index of the initial state.
    pub fn initial(&self) -> usize {
        self.initial
    }

    /// The input symbols in fixed (input row) order.
    pub fn symbols(&self) -> &[char] {
        &self.symbols
    }

    /// The state names in arena order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The transition for `state` on the symbol at `symbol_pos`: target and output.
    pub fn successor(&self, state: usize, symbol_pos: usize) -> Option<&(usize, String)> {
        self.transitions[state][symbol_pos].as_ref()
    }

    /// Runs `word` from the initial state and collects the outputs emitted along the
    /// taken transitions. `None` if the run gets stuck.
    pub fn output_sequence(&self, word: &str) -> Option<Vec<String>> {
        let mut state = self.initial;
        let mut outputs = Vec::new();
        for sym in word.chars() {
            let pos = self.symbols.iter().position(|&s| s == sym)?;
            let (target, output) = self.successor(state, pos)?;
            outputs.push(output.clone());
            state = *target;
        }
        Some(outputs)
    }

    /// Parses a Mealy table: state-name row, then symbol rows of `target/output` cells.
    pub fn parse(text: &str) -> Result<Self, TableError> {
        let rows = table::rows(text);
        if rows.is_empty() {
            return Err(TableError::MissingHeader);
        }
        let names = rows[0]
            .get(1..)
            .filter(|names| !names.is_empty() && !names[0].is_empty())
            .ok_or(TableError::MissingInitialState)?;

        let mut machine = Self {
            symbols: Vec::new(),
            names: names.iter().map(|name| name.to_string()).collect(),
            initial: 0,
            transitions: vec![Vec::new(); names.len()],
        };

        for row in &rows[1..] {
            machine.symbols.push(symbol_label(row[0])?);
            for (state, columns) in machine.transitions.iter_mut().enumerate() {
                let cell = row.get(state + 1).copied().unwrap_or("");
                if cell.is_empty() {
                    columns.push(None);
                    continue;
                }
                let (target, output) = cell
                    .split_once('/')
                    .ok_or_else(|| TableError::MalformedCell(cell.to_string()))?;
                let target = names
                    .iter()
                    .position(|&name| name == target)
                    .ok_or_else(|| TableError::UnknownState(target.to_string()))?;
                columns.push(Some((target, output.to_string())));
            }
        }
        Ok(machine)
    }

    /// Renders the machine as a table, with the initial state's column first.
    pub fn render(&self) -> String {
        let order = column_order(self.initial, self.size());
        let mut lines = Vec::new();
        lines.push(
            std::iter::once("")
                .chain(order.iter().map(|&q| self.names[q].as_str()))
                .join(";"),
        );
        for (pos, sym) in self.symbols.iter().enumerate() {
            let cells = order.iter().map(|&q| match self.successor(q, pos) {
                Some((target, output)) => format!("{}/{}", self.names[*target], output),
                None => String::new(),
            });
            lines.push(std::iter::once(sym.to_string()).chain(cells).join(";"));
        }
        lines.push(String::new());
        lines.join("\n")
    }

    /// Reads a Mealy table from the file at `path`.
    pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Self, TableError> {
        let machine = Self::parse(&std::fs::read_to_string(path.as_ref())?)?;
        debug!(
            "read mealy machine with {} states from {}",
            machine.size(),
            path.as_ref().display()
        );
        Ok(machine)
    }

    /// Renders the machine and writes it to `path` in one go.
    pub fn write_file<P: AsRef<Path>>(&self, path: P) -> Result<(), TableError> {
        let rendered = self.render();
        std::fs::write(path, rendered)?;
        Ok(())
    }
}

/// Column order for rendering: the initial state first, everything else in arena order.
fn column_order(initial: usize, size: usize) -> Vec<usize> {
    std::iter::once(initial)
        .chain((0..size).filter(move |&q| q != initial))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{MealyMachine, MooreMachine};
    use crate::table::TableError;

    const MOORE: &str = "\
;x;y;y
;q0;q1;q2
0;q1;q2;q1
1;q0;q1;q2
";

    const MEALY: &str = "\
;q0;q1
a;q1/0;q0/1
b;q0/0;
";

    #[test]
    fn moore_parse_and_render_round_trip() {
        let machine = MooreMachine::parse(MOORE).unwrap();
        assert_eq!(machine.size(), 3);
        assert_eq!(machine.symbols(), ['0', '1'].as_slice());
        assert_eq!(machine.output(0), "x");
        assert_eq!(machine.successor(0, 0), Some(1));
        assert_eq!(MooreMachine::parse(&machine.render()).unwrap(), machine);
    }

    #[test]
    fn moore_output_sequence() {
        let machine = MooreMachine::parse(MOORE).unwrap();
        assert_eq!(
            machine.output_sequence("01").unwrap(),
            vec!["x", "y", "y"]
        );
        assert_eq!(machine.output_sequence("").unwrap(), vec!["x"]);
        assert_eq!(machine.output_sequence("2"), None);
    }

    #[test]
    fn mealy_parse_handles_partial_cells() {
        let machine = MealyMachine::parse(MEALY).unwrap();
        assert_eq!(machine.size(), 2);
        assert_eq!(machine.successor(0, 0), Some(&(1, "0".to_string())));
        assert_eq!(machine.successor(1, 1), None);
        assert_eq!(machine.output_sequence("aa").unwrap(), vec!["0", "1"]);
        assert_eq!(machine.output_sequence("ab"), None);
    }

    #[test]
    fn mealy_render_puts_the_initial_state_first() {
        let machine = MealyMachine::from_parts(
            vec!['a'],
            vec!["p".to_string(), "r".to_string()],
            1,
            vec![
                vec![Some((1, "0".to_string()))],
                vec![Some((0, "1".to_string()))],
            ],
        );
        let rendered = machine.render();
        assert_eq!(rendered.lines().next(), Some(";r;p"));
        assert_eq!(rendered.lines().nth(1), Some("a;p/1;r/0"));
    }

    #[test]
    fn malformed_mealy_cell_is_rejected() {
        let text = ";q0\na;q0\n";
        assert!(matches!(
            MealyMachine::parse(text),
            Err(TableError::MalformedCell(cell)) if cell == "q0"
        ));
    }

    #[test]
    fn moore_with_unknown_target_is_rejected() {
        let text = ";x\n;q0\n0;q9\n";
        assert!(matches!(
            MooreMachine::parse(text),
            Err(TableError::UnknownState(name)) if name == "q9"
        ));
    }
}
