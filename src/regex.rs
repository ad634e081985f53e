use thiserror::Error;

/// Node of a regular expression syntax tree. The tree is owned, built once by [`parse`]
/// and consumed by the Thompson construction.
///
/// Precedence from highest to lowest: the postfix operators `*` and `+` bind to the
/// immediately preceding primary, adjacent factors are implicitly concatenated, and `|`
/// separates the two lowest-precedence terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ast {
    /// A single literal symbol. [`EPSILON`](crate::alphabet::EPSILON) is valid here and
    /// denotes the empty-string match.
    Literal(char),
    /// Sequential composition of the two operands.
    Concat(Box<Ast>, Box<Ast>),
    /// Alternation (`|`) between the two operands.
    Alternate(Box<Ast>, Box<Ast>),
    /// Zero or more repetitions of the operand.
    Star(Box<Ast>),
    /// One or more repetitions of the operand.
    Plus(Box<Ast>),
}

/// Represents the types of errors that can occur when parsing a regular expression.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum RegexParseError {
    /// A parenthesized group was opened but never closed, or a stray `)` appeared.
    #[error("mismatched parentheses")]
    MismatchedParentheses,
    /// A token appeared in a position where no token of its kind is valid, for example
    /// a bare `*` at the start of an expression.
    #[error("unexpected token `{0}`")]
    UnexpectedToken(char),
    /// The expression ended where a primary was still expected.
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    /// The expression ended directly after an escape character.
    #[error("dangling escape at end of expression")]
    DanglingEscape,
}

/// Parses `input` into an [`Ast`] by recursive descent. The scan is a flat left-to-right
/// pass over the characters; only the escape case consumes a second token.
pub fn parse(input: &str) -> Result<Ast, RegexParseError> {
    let mut parser = Parser {
        tokens: input.chars().collect(),
        pos: 0,
    };
    let ast = parser.expression()?;
    match parser.peek() {
        None => Ok(ast),
        Some(')') => Err(RegexParseError::MismatchedParentheses),
        Some(token) => Err(RegexParseError::UnexpectedToken(token)),
    }
}

fn is_literal(token: char) -> bool {
    !matches!(token, '*' | '+' | '(' | ')' | '|' | '\\')
}

struct Parser {
    tokens: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.tokens.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// expression := term (`|` term)*
    fn expression(&mut self) -> Result<Ast, RegexParseError> {
        let mut node = self.term()?;
        while self.peek() == Some('|') {
            self.advance();
            let right = self.term()?;
            node = Ast::Alternate(Box::new(node), Box::new(right));
        }
        Ok(node)
    }

    /// term := factor factor*, concatenation is implicit.
    fn term(&mut self) -> Result<Ast, RegexParseError> {
        let mut node = self.factor()?;
        while matches!(self.peek(), Some(token) if is_literal(token) || token == '(' || token == '\\')
        {
            let right = self.factor()?;
            node = Ast::Concat(Box::new(node), Box::new(right));
        }
        Ok(node)
    }

    /// factor := primary (`*` | `+`)*
    fn factor(&mut self) -> Result<Ast, RegexParseError> {
        let mut node = self.primary()?;
        while let Some(op) = self.peek() {
            match op {
                '*' => node = Ast::Star(Box::new(node)),
                '+' => node = Ast::Plus(Box::new(node)),
                _ => break,
            }
            self.advance();
        }
        Ok(node)
    }

    /// primary := literal | `\` any | `(` expression `)`
    fn primary(&mut self) -> Result<Ast, RegexParseError> {
        match self.advance() {
            None => Err(RegexParseError::UnexpectedEnd),
            Some('\\') => match self.advance() {
                // An escaped character is always a literal, operator or not.
                Some(escaped) => Ok(Ast::Literal(escaped)),
                None => Err(RegexParseError::DanglingEscape),
            },
            Some('(') => {
                let node = self.expression()?;
                if self.advance() != Some(')') {
                    return Err(RegexParseError::MismatchedParentheses);
                }
                Ok(node)
            }
            Some(token) if is_literal(token) => Ok(Ast::Literal(token)),
            Some(token) => Err(RegexParseError::UnexpectedToken(token)),
        }
    }
}

impl std::fmt::Display for Ast {
    /// Renders the tree back into a regular expression denoting the same language.
    /// Sub-expressions are parenthesized where precedence requires it and operator
    /// characters used as literals are re-escaped.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ast::Literal(sym) if is_literal(*sym) => write!(f, "{sym}"),
            Ast::Literal(sym) => write!(f, "\\{sym}"),
            Ast::Concat(left, right) => {
                for operand in [left, right] {
                    if matches!(**operand, Ast::Alternate(_, _)) {
                        write!(f, "({operand})")?;
                    } else {
                        write!(f, "{operand}")?;
                    }
                }
                Ok(())
            }
            Ast::Alternate(left, right) => write!(f, "{left}|{right}"),
            Ast::Star(inner) | Ast::Plus(inner) => {
                let op = if matches!(self, Ast::Star(_)) { '*' } else { '+' };
                if matches!(**inner, Ast::Literal(_)) {
                    write!(f, "{inner}{op}")
                } else {
                    write!(f, "({inner}){op}")
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{parse, Ast, RegexParseError};
    use crate::alphabet::EPSILON;

    fn lit(sym: char) -> Box<Ast> {
        Box::new(Ast::Literal(sym))
    }

    #[test]
    fn parse_respects_precedence() {
        // a|bc* parses as a | (b (c*))
        let ast = parse("a|bc*").unwrap();
        assert_eq!(
            ast,
            Ast::Alternate(
                lit('a'),
                Box::new(Ast::Concat(lit('b'), Box::new(Ast::Star(lit('c')))))
            )
        );
    }

    #[test]
    fn parse_groups_and_plus() {
        let ast = parse("(a|b)+").unwrap();
        assert_eq!(ast, Ast::Plus(Box::new(Ast::Alternate(lit('a'), lit('b')))));
    }

    #[test]
    fn parse_epsilon_literal() {
        assert_eq!(parse("ε").unwrap(), Ast::Literal(EPSILON));
    }

    #[test]
    fn parse_escapes_make_operators_literal() {
        assert_eq!(
            parse(r"\*\\").unwrap(),
            Ast::Concat(lit('*'), lit('\\'))
        );
        assert_eq!(parse(r"\a").unwrap(), Ast::Literal('a'));
    }

    #[test]
    fn parse_rejects_malformed_input() {
        assert_eq!(
            parse("(ab"),
            Err(RegexParseError::MismatchedParentheses)
        );
        assert_eq!(parse("a)b"), Err(RegexParseError::MismatchedParentheses));
        assert_eq!(parse("*a"), Err(RegexParseError::UnexpectedToken('*')));
        assert_eq!(parse("a|"), Err(RegexParseError::UnexpectedEnd));
        assert_eq!(parse(""), Err(RegexParseError::UnexpectedEnd));
        assert_eq!(parse(r"ab\"), Err(RegexParseError::DanglingEscape));
    }

    #[test]
    fn display_round_trips_through_parser() {
        for pattern in ["a|bc*", "(a|b)+c", r"\*a", "a(b|c)*", "ε|ab"] {
            let ast = parse(pattern).unwrap();
            let rendered = ast.to_string();
            assert_eq!(parse(&rendered).unwrap(), ast, "pattern {pattern} rendered as {rendered}");
        }
    }
}
