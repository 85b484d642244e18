//! A recursive-descent parser compiling filter programs directly into
//! composed [`Filter`]s; there is no intermediate syntax tree.
//!
//! Precedence, lowest first: `|`, `,`, `+`/`-`, `*`/`/`/`%`, unary `-`,
//! postfix selectors, primaries. Object field values parse at pipe level
//! with top-level commas excluded, so a comma inside `{...}` always
//! separates fields.

use std::collections::BTreeMap;
use std::{iter::Peekable, vec::IntoIter};

use crate::{
    errors::SiftError,
    filter::{binary, compose, concat, identity, literal, nary, ternary, Filter},
    lexer::lex,
    ops,
    token::{Position, Token, TokenKind},
    value,
};

use TokenKind::*;

const EOF_TOKEN: Token = Token {
    kind: Eof,
    pos: Position { line: 0, column: 0 },
};

type Tokens = Peekable<IntoIter<Token>>;

/// Compiles a filter program. `name` identifies the source in error
/// messages, rendered as `name:line:column: message`. An empty program
/// compiles to the identity filter.
pub fn compile(name: &str, source: &str) -> Result<Filter, SiftError> {
    let tokens = lex(source).map_err(|e| e.with_name(name))?;
    Parser::new(tokens).parse().map_err(|e| e.with_name(name))
}

struct Parser {
    tokens: Tokens,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens: tokens.into_iter().peekable(),
        }
    }

    fn parse(mut self) -> Result<Filter, SiftError> {
        if self.peek().kind == Eof {
            return Ok(identity());
        }
        let filter = self.parse_expr()?;
        let token = self.advance();
        if token.kind == Eof {
            Ok(filter)
        } else {
            Err(SiftError::syntax(
                format!("expected end of input, found {}", token.kind),
                token.pos,
            ))
        }
    }

    fn peek(&mut self) -> &Token {
        self.tokens.peek().unwrap_or(&EOF_TOKEN)
    }

    fn advance(&mut self) -> Token {
        self.tokens.next().unwrap_or(EOF_TOKEN)
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, SiftError> {
        let token = self.advance();
        if token.kind == kind {
            Ok(token)
        } else {
            Err(SiftError::syntax(
                format!("expected {}, found {}", kind, token.kind),
                token.pos,
            ))
        }
    }

    // Expr := Comma ( '|' Comma )*
    fn parse_expr(&mut self) -> Result<Filter, SiftError> {
        let mut filter = self.parse_comma()?;
        while self.peek().kind == Pipe {
            self.advance();
            filter = compose(filter, self.parse_comma()?);
        }
        Ok(filter)
    }

    fn parse_comma(&mut self) -> Result<Filter, SiftError> {
        let mut filter = self.parse_add_sub()?;
        while self.peek().kind == Comma {
            self.advance();
            filter = concat(filter, self.parse_add_sub()?);
        }
        Ok(filter)
    }

    fn parse_add_sub(&mut self) -> Result<Filter, SiftError> {
        let mut filter = self.parse_mul_div()?;
        loop {
            match self.peek().kind {
                Plus => {
                    self.advance();
                    filter = binary(filter, self.parse_mul_div()?, ops::add);
                }
                Minus => {
                    self.advance();
                    filter = binary(filter, self.parse_mul_div()?, ops::subtract);
                }
                _ => return Ok(filter),
            }
        }
    }

    fn parse_mul_div(&mut self) -> Result<Filter, SiftError> {
        let mut filter = self.parse_unary()?;
        loop {
            match self.peek().kind {
                Star => {
                    self.advance();
                    filter = binary(filter, self.parse_unary()?, ops::multiply);
                }
                Slash => {
                    self.advance();
                    filter = binary(filter, self.parse_unary()?, ops::divide);
                }
                Percent => {
                    self.advance();
                    filter = binary(filter, self.parse_unary()?, ops::modulo);
                }
                _ => return Ok(filter),
            }
        }
    }

    fn parse_unary(&mut self) -> Result<Filter, SiftError> {
        if self.peek().kind == Minus {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(compose(operand, ops::negate()));
        }
        let primary = self.parse_primary()?;
        self.parse_postfix(primary, false)
    }

    // Trailing selectors and index brackets. `dot_ok` permits a bare '.'
    // (the identity filter) at the start of a primary; everywhere else a
    // '.' must be followed by a field name.
    fn parse_postfix(&mut self, mut filter: Filter, mut dot_ok: bool) -> Result<Filter, SiftError> {
        loop {
            match self.peek().kind {
                Dot => {
                    self.advance();
                    match self.peek().kind.clone() {
                        Ident { value } | Str { value } => {
                            self.advance();
                            let required = if self.peek().kind == Question {
                                self.advance();
                                false
                            } else {
                                true
                            };
                            filter = compose(filter, ops::attr(value.into(), required));
                        }
                        kind => {
                            if !dot_ok {
                                let pos = self.peek().pos;
                                return Err(SiftError::syntax(
                                    format!("expected a field name after '.', found {kind}"),
                                    pos,
                                ));
                            }
                        }
                    }
                }
                LBracket => {
                    filter = self.parse_index(filter)?;
                }
                _ => return Ok(filter),
            }
            dot_ok = false;
        }
    }

    // IndexTail: iterate, index or slice; see the module docs for forms.
    fn parse_index(&mut self, base: Filter) -> Result<Filter, SiftError> {
        self.advance(); // '['
        if self.peek().kind == RBracket {
            self.advance();
            let required = if self.peek().kind == Question {
                self.advance();
                false
            } else {
                true
            };
            return Ok(compose(base, ops::iterate(required)));
        }
        if self.peek().kind == Colon {
            self.advance();
            let end = self.parse_expr()?;
            self.expect(RBracket)?;
            return Ok(binary(base, end, |v, end| ops::slice(v, None, Some(end))));
        }
        let index = self.parse_expr()?;
        if self.peek().kind == Colon {
            self.advance();
            let begin = index;
            if self.peek().kind == RBracket {
                self.advance();
                return Ok(binary(base, begin, |v, begin| {
                    ops::slice(v, Some(begin), None)
                }));
            }
            let end = self.parse_expr()?;
            self.expect(RBracket)?;
            return Ok(ternary(base, begin, end, |v, begin, end| {
                ops::slice(v, Some(begin), Some(end))
            }));
        }
        self.expect(RBracket)?;
        Ok(binary(base, index, ops::index))
    }

    fn parse_primary(&mut self) -> Result<Filter, SiftError> {
        match self.peek().kind.clone() {
            Null => {
                self.advance();
                Ok(literal(value::null()))
            }
            True => {
                self.advance();
                Ok(literal(value::boolean(true)))
            }
            False => {
                self.advance();
                Ok(literal(value::boolean(false)))
            }
            Number { value } => {
                let token = self.advance();
                let mut n: f64 = value.parse().map_err(|_| {
                    SiftError::syntax(format!("invalid number {value}"), token.pos)
                })?;
                if n.is_infinite() {
                    // out-of-range literals clamp to the largest finite double
                    n = if n > 0.0 { f64::MAX } else { f64::MIN };
                }
                Ok(literal(value::number(n)))
            }
            Str { value } => {
                self.advance();
                Ok(literal(value::text(String::from(value))))
            }
            DotDot => {
                self.advance();
                Ok(ops::walk())
            }
            Dot => self.parse_postfix(identity(), true),
            LBracket => self.parse_array_construct(),
            LBrace => self.parse_object_construct(),
            LParen => {
                self.advance();
                let filter = self.parse_expr()?;
                self.expect(RParen)?;
                Ok(filter)
            }
            kind => {
                let pos = self.peek().pos;
                Err(SiftError::syntax(
                    format!("expected expression, found {kind}"),
                    pos,
                ))
            }
        }
    }

    // '[' Expr ( ',' Expr )* ','? ']' — each element's outputs are
    // concatenated in order into a single new array per input.
    fn parse_array_construct(&mut self) -> Result<Filter, SiftError> {
        self.advance(); // '['
        let mut elements: Vec<Filter> = Vec::new();
        while self.peek().kind != RBracket {
            elements.push(self.parse_expr()?);
            match self.peek().kind.clone() {
                Comma => {
                    self.advance();
                }
                RBracket => {}
                kind => {
                    let pos = self.peek().pos;
                    return Err(SiftError::syntax(
                        format!("expected ',' or ']', found {kind}"),
                        pos,
                    ));
                }
            }
        }
        self.advance(); // ']'
        Ok(Filter::new(move |v| {
            let mut outs = Vec::new();
            for element in &elements {
                outs.extend(element(v)?);
            }
            Ok(vec![value::array(outs)])
        }))
    }

    // '{' ( Field ( ',' Field )* ','? )? '}' where Field is a name,
    // string or parenthesized expression key, ':', and a pipe-level
    // value. Fields multiply out by Cartesian product, one object per
    // combination, keys bound left to right.
    fn parse_object_construct(&mut self) -> Result<Filter, SiftError> {
        self.advance(); // '{'
        let mut fields: Vec<Filter> = Vec::new(); // alternating key, value
        while self.peek().kind != RBrace {
            match self.peek().kind.clone() {
                Ident { value } | Str { value } => {
                    self.advance();
                    fields.push(literal(value::text(String::from(value))));
                }
                LParen => {
                    self.advance();
                    fields.push(self.parse_expr()?);
                    self.expect(RParen)?;
                }
                kind => {
                    let pos = self.peek().pos;
                    return Err(SiftError::syntax(
                        format!("expected attribute name or '}}', found {kind}"),
                        pos,
                    ));
                }
            }
            self.expect(Colon)?;
            fields.push(self.parse_object_value()?);
            match self.peek().kind.clone() {
                Comma => {
                    self.advance();
                }
                RBrace => {}
                kind => {
                    let pos = self.peek().pos;
                    return Err(SiftError::syntax(
                        format!("expected ',' or '}}', found {kind}"),
                        pos,
                    ));
                }
            }
        }
        self.advance(); // '}'
        if fields.is_empty() {
            return Ok(literal(value::object(BTreeMap::new())));
        }
        Ok(nary(fields, |combo| {
            let mut attrs = BTreeMap::new();
            for pair in combo.chunks(2) {
                let name = pair[0].as_text().ok_or_else(|| {
                    SiftError::typ(format!("cannot use {} as object key", pair[0].kind()))
                })?;
                attrs.insert(name.to_string(), pair[1].clone());
            }
            Ok(vec![value::object(attrs)])
        }))
    }

    // Pipe-level expression with top-level commas excluded.
    fn parse_object_value(&mut self) -> Result<Filter, SiftError> {
        let mut filter = self.parse_add_sub()?;
        while self.peek().kind == Pipe {
            self.advance();
            filter = compose(filter, self.parse_add_sub()?);
        }
        Ok(filter)
    }
}
