//! The AVR assembler's lexer. Character-level scanning is the one
//! explicit non-goal of the core (§1): this module is the external
//! collaborator that turns source text into the `Token`/`TokenKind`
//! shape §4.3.1 specifies, nothing more.

use crate::diagnostic::Diagnostic;
use crate::span::Span;
use crate::symtab::Interner;
use crate::token::{Token, TokenKind};

pub struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    line: u32,
    file_id: u16,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str, file_id: u16) -> Self {
        Self { src: src.as_bytes(), pos: 0, line: 1, file_id }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn span(&self, start: usize) -> Span {
        Span::new(self.file_id, self.line, start as u32, self.pos as u32)
    }

    /// Tokenize the whole source, collecting lex errors rather than
    /// aborting on the first one (matching §7's per-file error counter).
    pub fn lex(mut self, interner: &mut Interner) -> (Vec<Token>, Vec<Diagnostic>) {
        let mut tokens = Vec::new();
        let mut diags = Vec::new();

        loop {
            match self.next_token(interner) {
                Ok(Some(tok)) => {
                    let is_end = tok.is_end();
                    tokens.push(tok);
                    if is_end {
                        break;
                    }
                }
                Ok(None) => continue,
                Err(d) => diags.push(d),
            }
        }
        (tokens, diags)
    }

    fn next_token(&mut self, interner: &mut Interner) -> Result<Option<Token>, Diagnostic> {
        let Some(c) = self.peek() else {
            let span = self.span(self.pos);
            return Ok(Some(Token::new(TokenKind::End, interner.intern(""), span)));
        };

        match c {
            b' ' | b'\t' | b'\r' => {
                self.bump();
                Ok(None)
            }
            b'\n' => {
                let start = self.pos;
                self.bump();
                let span = self.span(start);
                self.line += 1;
                Ok(Some(Token::new(TokenKind::Newline, interner.intern("\n"), span)))
            }
            b';' => {
                while let Some(c) = self.peek() {
                    if c == b'\n' {
                        break;
                    }
                    self.bump();
                }
                Ok(None)
            }
            b'"' => self.lex_string(interner).map(Some),
            b'0'..=b'9' => self.lex_number(interner).map(Some),
            b'a'..=b'z' | b'A'..=b'Z' | b'_' | b'.' => Ok(Some(self.lex_name(interner))),
            b':' | b',' | b'(' | b')' | b'+' | b'-' | b'=' => {
                let start = self.pos;
                self.bump();
                let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap();
                let span = self.span(start);
                Ok(Some(Token::new(TokenKind::Symbol, interner.intern(text), span)))
            }
            other => {
                let start = self.pos;
                self.bump();
                let span = self.span(start);
                Err(Diagnostic::error(
                    format!("unexpected character '{}'", other as char),
                    span,
                ))
            }
        }
    }

    fn lex_name(&mut self, interner: &mut Interner) -> Token {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == b'_' || c == b'.' {
                self.bump();
            } else {
                break;
            }
        }
        let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap().to_ascii_lowercase();
        let span = self.span(start);
        Token::new(TokenKind::Name, interner.intern(&text), span)
    }

    /// Local-label references fold a trailing `b`/`f` onto a digit run
    /// into one `Name` token (e.g. `"1b"`); a bare digit run is an
    /// `Integer`, whether or not it is immediately followed by `:`.
    fn lex_number(&mut self, interner: &mut Interner) -> Result<Token, Diagnostic> {
        let start = self.pos;
        if self.peek() == Some(b'0') && matches!(self.peek_at(1), Some(b'x') | Some(b'X')) {
            self.bump();
            self.bump();
            while let Some(c) = self.peek() {
                if c.is_ascii_hexdigit() {
                    self.bump();
                } else {
                    break;
                }
            }
        } else {
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    self.bump();
                } else {
                    break;
                }
            }
        }

        let suffix_start = self.pos;
        if matches!(self.peek(), Some(b'b') | Some(b'f') | Some(b'B') | Some(b'F'))
            && !matches!(self.peek_at(1), Some(c) if c.is_ascii_alphanumeric() || c == b'_')
        {
            self.bump();
            let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap().to_ascii_lowercase();
            let span = self.span(start);
            return Ok(Token::new(TokenKind::Name, interner.intern(&text), span));
        }
        let _ = suffix_start;

        let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap();
        let span = self.span(start);
        Ok(Token::new(TokenKind::Integer, interner.intern(text), span))
    }

    fn lex_string(&mut self, interner: &mut Interner) -> Result<Token, Diagnostic> {
        let start = self.pos;
        self.bump(); // opening quote
        let mut value = String::new();
        loop {
            match self.bump() {
                Some(b'"') => break,
                Some(b'\\') => match self.bump() {
                    Some(b'n') => value.push('\n'),
                    Some(b't') => value.push('\t'),
                    Some(b'\\') => value.push('\\'),
                    Some(b'"') => value.push('"'),
                    Some(other) => value.push(other as char),
                    None => {
                        return Err(Diagnostic::error(
                            "unterminated string literal".to_string(),
                            self.span(start),
                        ))
                    }
                },
                Some(b'\n') | None => {
                    return Err(Diagnostic::error(
                        "unterminated string literal".to_string(),
                        self.span(start),
                    ))
                }
                Some(c) => value.push(c as char),
            }
        }
        let span = self.span(start);
        Ok(Token::new(TokenKind::String, interner.intern(&value), span))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut interner = Interner::new();
        let (tokens, diags) = Lexer::new(src, 0).lex(&mut interner);
        assert!(diags.is_empty(), "unexpected lex errors: {diags:?}");
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_a_simple_instruction_line() {
        let mut interner = Interner::new();
        let (tokens, diags) = Lexer::new("\tldi r16, 255\n", 0).lex(&mut interner);
        assert!(diags.is_empty());
        let texts: Vec<&str> = tokens.iter().map(|t| interner.resolve(t.text)).collect();
        assert_eq!(
            texts,
            vec!["ldi", "r16", ",", "255", "\n", ""]
        );
    }

    #[test]
    fn folds_trailing_b_into_local_label_reference() {
        let mut interner = Interner::new();
        let (tokens, _) = Lexer::new("rjmp 1b\n", 0).lex(&mut interner);
        let texts: Vec<&str> = tokens.iter().map(|t| interner.resolve(t.text)).collect();
        assert!(texts.contains(&"1b"));
    }

    #[test]
    fn bare_digit_run_before_colon_is_still_integer() {
        let mut interner = Interner::new();
        let (tokens, _) = Lexer::new("1: nop\n", 0).lex(&mut interner);
        assert_eq!(tokens[0].kind, TokenKind::Integer);
        assert_eq!(interner.resolve(tokens[0].text), "1");
    }

    #[test]
    fn string_literals_are_unquoted() {
        let mut interner = Interner::new();
        let (tokens, _) = Lexer::new("\"hi\"\n", 0).lex(&mut interner);
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(interner.resolve(tokens[0].text), "hi");
    }

    #[test]
    fn unterminated_string_is_a_lex_error() {
        let mut interner = Interner::new();
        let (_, diags) = Lexer::new("\"oops\n", 0).lex(&mut interner);
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn ends_with_end_token() {
        assert_eq!(*kinds("nop\n").last().unwrap(), TokenKind::End);
    }

    #[test]
    fn hex_literals_are_lexed_whole() {
        let mut interner = Interner::new();
        let (tokens, _) = Lexer::new("0x1234\n", 0).lex(&mut interner);
        assert_eq!(tokens[0].kind, TokenKind::Integer);
        assert_eq!(interner.resolve(tokens[0].text), "0x1234");
    }
}
