//! Macro expansion (§4.8, "macro expansion is implemented as a
//! `prescope` operation rather than a separate phase" — grounded in
//! `avrasm_hll.c`'s substitution step). Operates directly on the token
//! stream, before the parser ever sees it: a `macro NAME a, b ... endm`
//! block is recorded and stripped; later invocations splice the body
//! back in with `a`/`b` replaced by the call's argument tokens.

use std::collections::HashMap;

use crate::diagnostic::Diagnostic;
use crate::symtab::{Interner, Sym};
use crate::token::{Token, TokenKind};

struct MacroDef {
    params: Vec<Sym>,
    body: Vec<Token>,
}

/// Strip `macro`/`endm` blocks from `tokens`, recording their bodies,
/// then replay the remaining stream substituting any call to a
/// recorded macro name with its (parameter-substituted) body.
pub fn expand_macros(tokens: Vec<Token>, interner: &mut Interner) -> (Vec<Token>, Vec<Diagnostic>) {
    let macro_kw = interner.intern("macro");
    let endm_kw = interner.intern("endm");
    let mut diags = Vec::new();
    let mut macros: HashMap<Sym, MacroDef> = HashMap::new();
    let mut rest = Vec::new();

    let mut i = 0;
    while i < tokens.len() {
        let tok = tokens[i];
        if tok.kind == TokenKind::Name && tok.text == macro_kw {
            let Some(name_tok) = tokens.get(i + 1).copied() else {
                diags.push(Diagnostic::error("macro without a name".to_string(), tok.span));
                break;
            };
            let mut j = i + 2;
            let mut params = Vec::new();
            while j < tokens.len() && tokens[j].kind != TokenKind::Newline {
                if tokens[j].kind == TokenKind::Name {
                    params.push(tokens[j].text);
                }
                j += 1;
            }
            j += 1; // past the newline ending the macro header
            let body_start = j;
            while j < tokens.len() && !(tokens[j].kind == TokenKind::Name && tokens[j].text == endm_kw) {
                j += 1;
            }
            if j >= tokens.len() {
                diags.push(Diagnostic::error(
                    "macro missing matching endm".to_string(),
                    name_tok.span,
                ));
                break;
            }
            let body = tokens[body_start..j].to_vec();
            macros.insert(name_tok.text, MacroDef { params, body });
            // skip past the endm and its trailing newline, if any
            i = j + 1;
            if tokens.get(i).map(|t| t.kind) == Some(TokenKind::Newline) {
                i += 1;
            }
            continue;
        }
        rest.push(tok);
        i += 1;
    }

    if macros.is_empty() {
        return (rest, diags);
    }

    let expanded = expand_calls(&rest, &macros, interner);
    (expanded, diags)
}

fn expand_calls(tokens: &[Token], macros: &HashMap<Sym, MacroDef>, interner: &mut Interner) -> Vec<Token> {
    let mut out = Vec::new();
    let mut i = 0;
    let comma = interner.intern(",");
    while i < tokens.len() {
        let tok = tokens[i];
        if tok.kind == TokenKind::Name {
            if let Some(def) = macros.get(&tok.text) {
                let mut j = i + 1;
                let mut args: Vec<Vec<Token>> = Vec::new();
                let mut current = Vec::new();
                while j < tokens.len() && tokens[j].kind != TokenKind::Newline && !tokens[j].is_end() {
                    if tokens[j].kind == TokenKind::Symbol && tokens[j].text == comma {
                        args.push(std::mem::take(&mut current));
                    } else {
                        current.push(tokens[j]);
                    }
                    j += 1;
                }
                if !current.is_empty() || !args.is_empty() {
                    args.push(current);
                }
                let mut bindings: HashMap<Sym, &[Token]> = HashMap::new();
                for (param, arg) in def.params.iter().zip(args.iter()) {
                    bindings.insert(*param, arg.as_slice());
                }
                for body_tok in &def.body {
                    if let Some(replacement) = bindings.get(&body_tok.text) {
                        out.extend_from_slice(replacement);
                    } else {
                        out.push(*body_tok);
                    }
                }
                i = j;
                continue;
            }
        }
        out.push(tok);
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avr::lexer::Lexer;

    fn token_texts(tokens: &[Token], interner: &Interner) -> Vec<String> {
        tokens
            .iter()
            .filter(|t| t.kind != TokenKind::Newline && !t.is_end())
            .map(|t| interner.resolve(t.text).to_string())
            .collect()
    }

    #[test]
    fn strips_macro_definition_from_output() {
        let mut interner = Interner::new();
        let src = "macro blink\n\tnop\nendm\nblink\n";
        let (tokens, _) = Lexer::new(src, 0).lex(&mut interner);
        let (expanded, diags) = expand_macros(tokens, &mut interner);
        assert!(diags.is_empty());
        assert_eq!(token_texts(&expanded, &interner), vec!["nop"]);
    }

    #[test]
    fn substitutes_macro_parameters() {
        let mut interner = Interner::new();
        let src = "macro setreg dst, val\n\tldi dst, val\nendm\nsetreg r16, 5\n";
        let (tokens, _) = Lexer::new(src, 0).lex(&mut interner);
        let (expanded, _) = expand_macros(tokens, &mut interner);
        assert_eq!(token_texts(&expanded, &interner), vec!["ldi", "r16", ",", "5"]);
    }
}
