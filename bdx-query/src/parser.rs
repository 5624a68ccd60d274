//! Recursive-descent parser for the bdx query grammar (see crate docs).

use crate::ast::{QueryNode, Value};
use crate::errors::{ParseError, Result};
use crate::lexer::{self, TokKind, Token};
use bdx_schema::Field;

pub fn parse(input: &str) -> Result<QueryNode> {
    let tokens = lexer::lex(input)?;
    let mut p = Parser { tokens, pos: 0 };
    if p.tokens.is_empty() {
        return Err(ParseError::new(0, "empty query"));
    }
    let node = p.parse_or()?;
    if p.pos != p.tokens.len() {
        let tok = &p.tokens[p.pos];
        return Err(ParseError::new(
            tok.start,
            format!("unexpected trailing input near '{}'", describe(tok)),
        ));
    }
    Ok(node)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens[self.pos].clone();
        self.pos += 1;
        t
    }

    fn peek_is_keyword(&self, kw: &str) -> bool {
        matches!(self.peek().map(|t| &t.kind), Some(TokKind::Word(w)) if w == kw)
    }

    fn at_rparen_or_end(&self) -> bool {
        matches!(self.peek().map(|t| &t.kind), None | Some(TokKind::RParen))
    }

    fn parse_or(&mut self) -> Result<QueryNode> {
        let mut parts = vec![self.parse_and()?];
        while self.peek_is_keyword("OR") {
            self.advance();
            parts.push(self.parse_and()?);
        }
        Ok(if parts.len() == 1 {
            parts.pop().unwrap()
        } else {
            QueryNode::Or(parts)
        })
    }

    fn parse_and(&mut self) -> Result<QueryNode> {
        let mut parts = vec![self.parse_unary()?];
        loop {
            if self.peek_is_keyword("OR") || self.at_rparen_or_end() {
                break;
            }
            if self.peek_is_keyword("AND") {
                self.advance();
            }
            parts.push(self.parse_unary()?);
        }
        Ok(if parts.len() == 1 {
            parts.pop().unwrap()
        } else {
            QueryNode::And(parts)
        })
    }

    fn parse_unary(&mut self) -> Result<QueryNode> {
        if self.peek_is_keyword("NOT") {
            self.advance();
            return Ok(QueryNode::Not(Box::new(self.parse_unary()?)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<QueryNode> {
        let tok = match self.peek() {
            Some(t) => t.clone(),
            None => return Err(ParseError::new(0, "unexpected end of query")),
        };

        match &tok.kind {
            TokKind::LParen => {
                self.advance();
                let node = self.parse_or()?;
                match self.peek() {
                    Some(t) if t.kind == TokKind::RParen => {
                        self.advance();
                        Ok(node)
                    }
                    Some(t) => Err(ParseError::new(t.start, "expected ')'")),
                    None => Err(ParseError::new(tok.end, "expected ')', found end of query")),
                }
            }
            TokKind::Word(w) => {
                let adjacent_colon = self
                    .peek_at(1)
                    .map(|c| c.kind == TokKind::Colon && c.start == tok.end && !c.preceded_by_space)
                    .unwrap_or(false);
                if adjacent_colon {
                    let field = Field::parse(w).ok_or_else(|| {
                        ParseError::new(tok.start, format!("unknown field prefix '{w}'"))
                    })?;
                    self.advance(); // word
                    self.advance(); // colon
                    let value = self.parse_value()?;
                    return Ok(QueryNode::FieldExpr { field, value });
                }
                let value = self.parse_value()?;
                Ok(QueryNode::Term(value))
            }
            TokKind::Quoted(_) => {
                let value = self.parse_value()?;
                Ok(QueryNode::Term(value))
            }
            TokKind::RParen => Err(ParseError::new(tok.start, "unexpected ')'")),
            TokKind::Colon => Err(ParseError::new(tok.start, "unexpected ':'")),
        }
    }

    fn parse_value(&mut self) -> Result<Value> {
        let tok = match self.peek() {
            Some(t) => t.clone(),
            None => return Err(ParseError::new(0, "expected a value")),
        };
        match tok.kind {
            TokKind::Quoted(s) => {
                self.advance();
                Ok(Value::Quoted(s))
            }
            TokKind::Word(w) => {
                self.advance();
                if let Some(range) = try_parse_range(&w) {
                    return Ok(range);
                }
                if let Some(stripped) = w.strip_suffix('*') {
                    if stripped.contains('*') {
                        return Err(ParseError::new(
                            tok.start,
                            "wildcards are prefix-only ('foo*'); suffix or infix '*' is not allowed",
                        ));
                    }
                    return Ok(Value::Bare {
                        text: stripped.to_string(),
                        wildcard: true,
                    });
                }
                if w.contains('*') {
                    return Err(ParseError::new(
                        tok.start,
                        "wildcards are prefix-only ('foo*'); suffix or infix '*' is not allowed",
                    ));
                }
                Ok(Value::Bare {
                    text: w,
                    wildcard: false,
                })
            }
            _ => Err(ParseError::new(tok.start, "expected a value")),
        }
    }
}

fn describe(tok: &Token) -> String {
    match &tok.kind {
        TokKind::LParen => "(".into(),
        TokKind::RParen => ")".into(),
        TokKind::Colon => ":".into(),
        TokKind::Word(w) => w.clone(),
        TokKind::Quoted(s) => format!("\"{s}\""),
    }
}

/// Recognize `NUM..NUM`, `NUM..`, or `..NUM`. `NUM` is decimal or `0x`-hex.
/// Returns `None` when `w` doesn't look like a range at all (it is then
/// tried as a bare/wildcard term instead).
fn try_parse_range(w: &str) -> Option<Value> {
    let idx = w.find("..")?;
    let (left, right) = (&w[..idx], &w[idx + 2..]);
    if left.is_empty() && right.is_empty() {
        return None;
    }
    if left.is_empty() {
        return parse_num(right).map(|hi| Value::Range(None, Some(hi)));
    }
    if right.is_empty() {
        return parse_num(left).map(|lo| Value::Range(Some(lo), None));
    }
    match (parse_num(left), parse_num(right)) {
        (Some(lo), Some(hi)) => Some(Value::Range(Some(lo), Some(hi))),
        _ => None,
    }
}

fn parse_num(s: &str) -> Option<u64> {
    if s.is_empty() {
        return None;
    }
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok()
    } else {
        s.parse::<u64>().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bdx_schema::Field;

    #[test]
    fn parses_bare_and() {
        let node = parse("a b").unwrap();
        assert_eq!(
            node,
            QueryNode::And(vec![
                QueryNode::Term(Value::Bare {
                    text: "a".into(),
                    wildcard: false
                }),
                QueryNode::Term(Value::Bare {
                    text: "b".into(),
                    wildcard: false
                }),
            ])
        );
    }

    #[test]
    fn parses_explicit_and_or_not() {
        let node = parse("a AND b OR NOT c").unwrap();
        match node {
            QueryNode::Or(parts) => {
                assert_eq!(parts.len(), 2);
                assert!(matches!(parts[1], QueryNode::Not(_)));
            }
            other => panic!("expected Or, got {other:?}"),
        }
    }

    #[test]
    fn lowercase_and_is_not_a_keyword() {
        let node = parse("a and b").unwrap();
        // "and" is a bare term, so this is an implicit AND of three terms.
        assert!(matches!(node, QueryNode::And(parts) if parts.len() == 3));
    }

    #[test]
    fn parses_field_expr() {
        let node = parse("fullname:bar").unwrap();
        assert_eq!(
            node,
            QueryNode::FieldExpr {
                field: Field::FullName,
                value: Value::Bare {
                    text: "bar".into(),
                    wildcard: false
                }
            }
        );
    }

    #[test]
    fn rejects_unknown_field() {
        let err = parse("bogus:foo").unwrap_err();
        assert!(err.message.contains("unknown field"));
    }

    #[test]
    fn parses_range_values() {
        assert_eq!(
            parse("size:100..200").unwrap(),
            QueryNode::FieldExpr {
                field: Field::Size,
                value: Value::Range(Some(100), Some(200))
            }
        );
        assert_eq!(
            parse("size:..100").unwrap(),
            QueryNode::FieldExpr {
                field: Field::Size,
                value: Value::Range(None, Some(100))
            }
        );
        assert_eq!(
            parse("address:0x1000..").unwrap(),
            QueryNode::FieldExpr {
                field: Field::Address,
                value: Value::Range(Some(0x1000), None)
            }
        );
    }

    #[test]
    fn rejects_infix_wildcard() {
        assert!(parse("fo*o").is_err());
    }

    #[test]
    fn parses_parens() {
        let node = parse("(a OR b) c").unwrap();
        assert!(matches!(node, QueryNode::And(_)));
    }

    #[test]
    fn parses_quoted_literal_as_term() {
        let node = parse(r#"path:"/build/foo.o""#).unwrap();
        assert_eq!(
            node,
            QueryNode::FieldExpr {
                field: Field::Path,
                value: Value::Quoted("/build/foo.o".into())
            }
        );
    }
}
