use crate::{
    errors::SiftError,
    token::{Position, Token, TokenKind},
};

use std::str::CharIndices;

/// A filter program tokenizer.
///
/// The lexer walks the source a character at a time, tracking both the byte
/// offset (for slicing literals) and a 1-based line/column (for error
/// reporting). String literals are decoded here: the emitted token holds
/// the unescaped text, not the source slice.
struct Lexer<'q> {
    src: &'q str,
    chars: CharIndices<'q>,

    ch: Option<char>,
    offset: usize,
    line: u32,
    column: u32,
}

impl<'q> Lexer<'q> {
    fn new(src: &'q str) -> Self {
        let mut lexer = Self {
            src,
            chars: src.char_indices(),
            ch: None,
            offset: 0,
            line: 1,
            column: 0,
        };
        lexer.next();
        if lexer.ch == Some('\u{FEFF}') {
            lexer.next(); // ignore BOM at beginning of input
        }
        lexer
    }

    fn next(&mut self) {
        if self.ch == Some('\n') {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        match self.chars.next() {
            Some((offset, ch)) => {
                self.offset = offset;
                self.ch = Some(ch);
            }
            None => {
                self.offset = self.src.len();
                self.ch = None;
            }
        }
    }

    fn position(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
        }
    }

    fn accept(&mut self, want: char) -> bool {
        if self.ch == Some(want) {
            self.next();
            true
        } else {
            false
        }
    }

    fn accept_if(&mut self, pred: impl FnOnce(char) -> bool) -> bool {
        if self.ch.is_some_and(pred) {
            self.next();
            true
        } else {
            false
        }
    }

    fn accept_run(&mut self, pred: impl Fn(char) -> bool) -> bool {
        let mut accepted = false;
        while self.ch.is_some_and(&pred) {
            self.next();
            accepted = true;
        }
        accepted
    }

    fn scan(&mut self) -> Result<Token, SiftError> {
        loop {
            self.accept_run(is_whitespace_char);
            if self.ch == Some('#') {
                // line comment
                while !matches!(self.ch, Some('\n') | None) {
                    self.next();
                }
                continue;
            }
            break;
        }

        let pos = self.position();
        let start = self.offset;
        let ch = match self.ch {
            Some(ch) => ch,
            None => return Ok(Token::new(TokenKind::Eof, pos)),
        };

        if is_letter(ch) || ch == '_' {
            self.accept_run(|c| is_letter(c) || is_digit(c) || c == '_');
            let kind = match &self.src[start..self.offset] {
                "null" => TokenKind::Null,
                "true" => TokenKind::True,
                "false" => TokenKind::False,
                lit => TokenKind::Ident { value: lit.into() },
            };
            return Ok(Token::new(kind, pos));
        }

        if ch.is_ascii_digit() {
            return self.scan_number(start, pos);
        }

        if ch == '\'' || ch == '"' {
            return self.scan_string(ch, pos);
        }

        self.next(); // always make progress
        let kind = match ch {
            '.' => {
                if self.ch.is_some_and(|c| c.is_ascii_digit()) {
                    return self.scan_number(start, pos);
                } else if self.accept('.') {
                    TokenKind::DotDot
                } else {
                    TokenKind::Dot
                }
            }
            ',' => TokenKind::Comma,
            '?' => TokenKind::Question,
            ':' => TokenKind::Colon,
            '|' => TokenKind::Pipe,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '\u{FEFF}' => {
                return Err(SiftError::scan(
                    String::from("illegal byte order mark"),
                    pos,
                ))
            }
            '\0' => return Err(SiftError::scan(String::from("illegal character NUL"), pos)),
            _ => {
                return Err(SiftError::scan(
                    format!("illegal character {ch:?}"),
                    pos,
                ))
            }
        };
        Ok(Token::new(kind, pos))
    }

    // Called with either an integer digit as the current character, or with
    // a leading dot consumed and a fraction digit current. At least one
    // digit is therefore always present.
    fn scan_number(&mut self, start: usize, pos: Position) -> Result<Token, SiftError> {
        self.accept_run(|c| c.is_ascii_digit());
        if self.accept('.') {
            self.accept_run(|c| c.is_ascii_digit());
        }
        if self.ch == Some('e') || self.ch == Some('E') {
            self.next();
            self.accept_if(|c| c == '+' || c == '-');
            if !self.accept_run(|c| c.is_ascii_digit()) {
                return Err(SiftError::scan(String::from("invalid number"), pos));
            }
        }
        Ok(Token::new(
            TokenKind::Number {
                value: self.src[start..self.offset].into(),
            },
            pos,
        ))
    }

    fn scan_string(&mut self, quote: char, pos: Position) -> Result<Token, SiftError> {
        self.next(); // opening quote
        let mut value = String::new();
        loop {
            match self.ch {
                None | Some('\n') => {
                    return Err(SiftError::scan(
                        String::from("string literal not terminated"),
                        pos,
                    ));
                }
                Some('\\') => value.push(self.scan_escape()?),
                Some(ch) if ch == quote => {
                    self.next();
                    break;
                }
                Some(ch) => {
                    value.push(ch);
                    self.next();
                }
            }
        }
        Ok(Token::new(
            TokenKind::Str {
                value: value.into(),
            },
            pos,
        ))
    }

    fn scan_escape(&mut self) -> Result<char, SiftError> {
        self.next(); // consume backslash
        let pos = self.position();
        let ch = match self.ch {
            Some(ch) => ch,
            None => return Err(SiftError::scan(String::from("invalid escape"), pos)),
        };
        let decoded = match ch {
            '\'' | '"' | '\\' => {
                self.next();
                ch
            }
            'n' => {
                self.next();
                '\n'
            }
            'r' => {
                self.next();
                '\r'
            }
            'v' => {
                self.next();
                '\x0B'
            }
            't' => {
                self.next();
                '\t'
            }
            'b' => {
                self.next();
                '\x08'
            }
            'f' => {
                self.next();
                '\x0C'
            }
            '0'..='7' => {
                // up to three octal digits, stopping early on a non-octal
                // digit or once another digit would exceed 0xFF
                let mut code: u32 = 0;
                for _ in 0..3 {
                    let digit = match self.ch.and_then(|c| c.to_digit(8)) {
                        Some(digit) if code * 8 + digit <= 0xFF => digit,
                        _ => break,
                    };
                    code = code * 8 + digit;
                    self.next();
                }
                char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)
            }
            'u' => {
                self.next();
                self.scan_hex_digits(4)?
            }
            'x' => {
                self.next();
                self.scan_hex_digits(2)?
            }
            _ => {
                return Err(SiftError::scan(format!("invalid escape: {ch}"), pos));
            }
        };
        Ok(decoded)
    }

    fn scan_hex_digits(&mut self, count: u32) -> Result<char, SiftError> {
        let mut code: u32 = 0;
        for _ in 0..count {
            let pos = self.position();
            let digit = self
                .ch
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| SiftError::scan(String::from("invalid escape"), pos))?;
            code = code * 16 + digit;
            self.next();
        }
        Ok(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER))
    }
}

/// Scans an entire filter program, returning its tokens. The vector always
/// ends with a [`TokenKind::Eof`] token carrying the end-of-input
/// position.
pub fn lex(source: &str) -> Result<Vec<Token>, SiftError> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.scan()?;
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

fn is_letter(ch: char) -> bool {
    ch.is_alphabetic()
}

fn is_digit(ch: char) -> bool {
    ch.is_numeric()
}

fn is_whitespace_char(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '\r')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(line: u32, column: u32) -> Position {
        Position { line, column }
    }

    fn ident(value: &str) -> TokenKind {
        TokenKind::Ident {
            value: value.into(),
        }
    }

    fn number(value: &str) -> TokenKind {
        TokenKind::Number {
            value: value.into(),
        }
    }

    fn string(value: &str) -> TokenKind {
        TokenKind::Str {
            value: value.into(),
        }
    }

    #[test]
    fn field_chain() {
        let tokens = lex(".x.y").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::new(TokenKind::Dot, at(1, 1)),
                Token::new(ident("x"), at(1, 2)),
                Token::new(TokenKind::Dot, at(1, 3)),
                Token::new(ident("y"), at(1, 4)),
                Token::new(TokenKind::Eof, at(1, 5)),
            ]
        );
    }

    #[test]
    fn quoted_field() {
        let tokens = lex(".[\"a b\"]").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::new(TokenKind::Dot, at(1, 1)),
                Token::new(TokenKind::LBracket, at(1, 2)),
                Token::new(string("a b"), at(1, 3)),
                Token::new(TokenKind::RBracket, at(1, 8)),
                Token::new(TokenKind::Eof, at(1, 9)),
            ]
        );
    }

    #[test]
    fn pipes_and_commas() {
        let tokens = lex("1, 2 | 3").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::new(number("1"), at(1, 1)),
                Token::new(TokenKind::Comma, at(1, 2)),
                Token::new(number("2"), at(1, 4)),
                Token::new(TokenKind::Pipe, at(1, 6)),
                Token::new(number("3"), at(1, 8)),
                Token::new(TokenKind::Eof, at(1, 9)),
            ]
        );
    }

    #[test]
    fn keywords() {
        let tokens = lex("null true false").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::new(TokenKind::Null, at(1, 1)),
                Token::new(TokenKind::True, at(1, 6)),
                Token::new(TokenKind::False, at(1, 11)),
                Token::new(TokenKind::Eof, at(1, 16)),
            ]
        );
    }

    #[test]
    fn comments_and_newlines() {
        let tokens = lex("# first\n. # trailing\n# last").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::new(TokenKind::Dot, at(2, 1)),
                Token::new(TokenKind::Eof, at(3, 7)),
            ]
        );
    }

    #[test]
    fn dots() {
        let tokens = lex("...").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::new(TokenKind::DotDot, at(1, 1)),
                Token::new(TokenKind::Dot, at(1, 3)),
                Token::new(TokenKind::Eof, at(1, 4)),
            ]
        );
    }

    #[test]
    fn identifiers() {
        for (text, ok) in [
            ("x", true),
            ("xyz", true),
            ("x00", true),
            ("_", true),
            ("_0", true),
            ("_a", true),
            ("𝔣𝔞𝔫𝔠𝔶123", true),
            ("☃", false),
        ] {
            let result = lex(text);
            if ok {
                let tokens = result.unwrap();
                assert_eq!(tokens[0].kind, ident(text), "{text}");
            } else {
                assert!(
                    !result.is_ok_and(|tokens| tokens[0].kind == ident(text)),
                    "{text} lexed as an identifier"
                );
            }
        }
    }

    #[test]
    fn numbers() {
        for text in [
            "0",
            "12345678901234567890",
            ".12",
            "12.",
            "12.34",
            "1e23",
            "1E23",
            "1e+1",
            "1e-1",
            "1.2e3",
            ".12e3",
        ] {
            let tokens = lex(text).unwrap();
            assert_eq!(tokens[0].kind, number(text), "{text}");
            assert_eq!(tokens.len(), 2, "{text}");
        }
    }

    #[test]
    fn bad_numbers() {
        for text in ["1e", "1e+", "12.e", ".5e-"] {
            let err = lex(text).unwrap_err();
            assert_eq!(err.msg, "invalid number", "{text}");
            assert_eq!(err.pos, Some(at(1, 1)), "{text}");
        }
    }

    #[test]
    fn strings() {
        for (text, want) in [
            (r#""""#, ""),
            (r#""abc""#, "abc"),
            ("'abc'", "abc"),
            (r#""'""#, "'"),
            (r#"'"'"#, "\""),
            (r#""\"\'\\x""#, "\"'\\x"),
            (r#""\n\r\v\t\b\f""#, "\n\r\x0B\t\x08\x0C"),
            (r#""\0 \62 \141 \377 \600 \29""#, "\x00 2 a ÿ 00 \x029"),
            (r#""\u12345""#, "\u{1234}5"),
            (r#""\x5A\x5a5a""#, "ZZ5a"),
        ] {
            let tokens = lex(text).unwrap();
            assert_eq!(tokens[0].kind, string(want), "{text}");
        }
    }

    #[test]
    fn bad_escapes() {
        for text in [r#""\y""#, r#""\N""#, r#""\U1234""#, r#""\u12""#, r#""\x5""#] {
            assert!(lex(text).is_err(), "{text}");
        }
    }

    #[test]
    fn unterminated_string() {
        let err = lex("\"abc").unwrap_err();
        assert_eq!(err.msg, "string literal not terminated");
        assert_eq!(err.pos, Some(at(1, 1)));

        let err = lex("\"ab\ncd\"").unwrap_err();
        assert_eq!(err.msg, "string literal not terminated");
    }

    #[test]
    fn illegal_characters() {
        let err = lex("☃").unwrap_err();
        assert_eq!(err.msg, "illegal character '☃'");
        assert_eq!(err.pos, Some(at(1, 1)));

        let err = lex(".\0").unwrap_err();
        assert_eq!(err.msg, "illegal character NUL");
        assert_eq!(err.pos, Some(at(1, 2)));
    }

    #[test]
    fn byte_order_mark() {
        // tolerated as the very first character only
        let tokens = lex("\u{FEFF}.").unwrap();
        assert_eq!(tokens[0], Token::new(TokenKind::Dot, at(1, 2)));

        let err = lex(".\u{FEFF}").unwrap_err();
        assert_eq!(err.msg, "illegal byte order mark");
        assert_eq!(err.pos, Some(at(1, 2)));
    }

    #[test]
    fn leading_dot_number() {
        let tokens = lex(".5").unwrap();
        assert_eq!(tokens[0], Token::new(number(".5"), at(1, 1)));
    }
}
