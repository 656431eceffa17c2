//! The AVR assembler's parser (§4.3-§4.8). Character-level lexing is
//! out of scope for the core, but so is driving a generic grammar
//! through `dfa::Engine`/`reduce::Vm` here: this grammar is a flat,
//! line-oriented one (one statement per line, no nested expressions
//! beyond `low()`/`high()`), so it gets a direct recursive-descent
//! parser instead, the way a front-end with a simple-enough grammar
//! would skip the DFA machinery and hand-write its own `ParseState`.
//!
//! Macro expansion already happened in [`crate::avr::prescope`]; this
//! parser never sees a `macro`/`endm` block.

use std::collections::HashMap;

use crate::avr::tags::Tags;
use crate::diagnostic::Diagnostic;
use crate::span::{Origin, Span};
use crate::symtab::{Interner, Name, Namelist, Namespace, Sym};
use crate::token::{Token, TokenKind};
use crate::tree::{Literal, NodeId, Tree};

pub struct ParseResult {
    pub tree: Tree,
    pub program: NodeId,
    pub diagnostics: Vec<Diagnostic>,
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    interner: &'a mut Interner,
    tags: Tags,
    tree: Tree,
    diags: Vec<Diagnostic>,
    /// `equ`/`def` bindings, in the `Equ`/`Register` namespaces. AVR
    /// assembly has no nested lexical scoping, so this is the namelist's
    /// degenerate single-scope case: one `mark()` up front, no `descend()`
    /// ever — the mark/descope discipline still holds, it just never
    /// needs to unwind.
    names: Namelist,
    local_counters: HashMap<Sym, u32>,
    kw_equ: Sym,
    kw_def: Sym,
    kw_low: Sym,
    kw_high: Sym,
}

pub fn parse(tokens: Vec<Token>, interner: &mut Interner) -> ParseResult {
    let tags = Tags::new(interner);
    let mut names = Namelist::new();
    names.mark();
    let mut parser = Parser {
        tokens,
        pos: 0,
        kw_equ: interner.intern("equ"),
        kw_def: interner.intern("def"),
        kw_low: interner.intern("low"),
        kw_high: interner.intern("high"),
        interner,
        tags,
        tree: Tree::new(),
        diags: Vec::new(),
        names,
        local_counters: HashMap::new(),
    };
    let program = parser.parse_program();
    ParseResult {
        tree: parser.tree,
        program,
        diagnostics: parser.diags,
    }
}

impl<'a> Parser<'a> {
    fn cur(&self) -> Token {
        self.tokens[self.pos]
    }

    fn cur_text(&self) -> &str {
        self.interner.resolve(self.cur().text)
    }

    fn at_end(&self) -> bool {
        self.cur().is_end()
    }

    fn advance(&mut self) -> Token {
        let tok = self.cur();
        if !self.at_end() {
            self.pos += 1;
        }
        tok
    }

    fn check_symbol(&self, text: &str) -> bool {
        self.cur().kind == TokenKind::Symbol && self.cur_text() == text
    }

    fn check_name(&self, sym: Sym) -> bool {
        self.cur().kind == TokenKind::Name && self.cur().text == sym
    }

    fn eat_symbol(&mut self, text: &str) -> Result<Span, Diagnostic> {
        if self.check_symbol(text) {
            Ok(self.advance().span)
        } else {
            Err(Diagnostic::error(
                format!("expected '{text}', found '{}'", self.cur_text()),
                self.cur().span,
            ))
        }
    }

    /// Skip tokens up to (and including) the next line terminator, for
    /// error recovery.
    fn skip_to_eol(&mut self) {
        while !self.at_end() && self.cur().kind != TokenKind::Newline {
            self.advance();
        }
        if self.cur().kind == TokenKind::Newline {
            self.advance();
        }
    }

    fn skip_blank_lines(&mut self) {
        while self.cur().kind == TokenKind::Newline {
            self.advance();
        }
    }

    fn parse_program(&mut self) -> NodeId {
        let start_org = self.cur().span.origin();
        let mut items = Vec::new();
        loop {
            self.skip_blank_lines();
            if self.at_end() {
                break;
            }
            match self.parse_statement() {
                Ok(nodes) => items.extend(nodes.into_iter().map(Some)),
                Err(d) => {
                    self.diags.push(d);
                    self.skip_to_eol();
                }
            }
        }
        self.tree.alloc_with(self.tags.program, start_org, items, None)
    }

    /// One logical line, which may contain a label declaration followed
    /// by a directive or instruction. Returns every node produced.
    fn parse_statement(&mut self) -> Result<Vec<NodeId>, Diagnostic> {
        let mut nodes = Vec::new();
        loop {
            if self.at_end() || self.cur().kind == TokenKind::Newline {
                break;
            }
            if self.at_label_decl() {
                nodes.push(self.parse_label_decl()?);
                continue;
            }
            nodes.push(self.parse_directive_or_instr()?);
            break;
        }
        if self.cur().kind == TokenKind::Newline {
            self.advance();
        }
        Ok(nodes)
    }

    fn at_label_decl(&self) -> bool {
        let tok = self.cur();
        let is_name_or_int = matches!(tok.kind, TokenKind::Name | TokenKind::Integer);
        is_name_or_int
            && self.tokens.get(self.pos + 1).map(|t| t.kind == TokenKind::Symbol
                && self.interner.resolve(t.text) == ":")
                .unwrap_or(false)
    }

    fn parse_label_decl(&mut self) -> Result<NodeId, Diagnostic> {
        let tok = self.advance();
        self.eat_symbol(":")?;
        let org = tok.span.origin();
        if tok.kind == TokenKind::Integer {
            let count = self.local_counters.entry(tok.text).or_insert(0);
            *count += 1;
            let digits = self.interner.resolve(tok.text).to_string();
            let synth = self.interner.intern(&format!("{digits}${count}"));
            Ok(self.tree.alloc_with(self.tags.llabel, org, Vec::new(), Some(Literal::Sym(synth))))
        } else {
            Ok(self.tree.alloc_with(self.tags.glabel, org, Vec::new(), Some(Literal::Sym(tok.text))))
        }
    }

    fn parse_directive_or_instr(&mut self) -> Result<NodeId, Diagnostic> {
        let tok = self.cur();
        if tok.kind != TokenKind::Name {
            return Err(Diagnostic::error(
                format!("expected a directive or instruction, found '{}'", self.cur_text()),
                tok.span,
            ));
        }
        let text = self.cur_text().to_string();
        match text.as_str() {
            ".mcu" => self.parse_mcu(),
            ".text" => Ok(self.leaf_directive(self.tags.seg_text)),
            ".data" => Ok(self.leaf_directive(self.tags.seg_data)),
            ".eeprom" => Ok(self.leaf_directive(self.tags.seg_eeprom)),
            ".org" => self.parse_unary_directive(self.tags.org),
            ".space" => self.parse_unary_directive(self.tags.space),
            ".space16" => self.parse_unary_directive(self.tags.space16),
            ".const" => self.parse_const_directive(self.tags.konst),
            ".const16" => self.parse_const_directive(self.tags.konst16),
            _ => {
                if self.check_name(self.kw_def) {
                    self.parse_def()
                } else if self.tokens.get(self.pos + 1).map(|t| t.kind == TokenKind::Name && t.text == self.kw_equ).unwrap_or(false) {
                    self.parse_equ_keyword_form()
                } else if self.tokens.get(self.pos + 1).map(|t| t.kind == TokenKind::Symbol && self.interner.resolve(t.text) == "=").unwrap_or(false) {
                    self.parse_equ_eq_form()
                } else {
                    self.parse_instruction()
                }
            }
        }
    }

    fn leaf_directive(&mut self, tag: Sym) -> NodeId {
        let org = self.advance().span.origin();
        self.tree.alloc(tag, org)
    }

    fn parse_mcu(&mut self) -> Result<NodeId, Diagnostic> {
        let org = self.advance().span.origin();
        let tok = self.cur();
        if tok.kind != TokenKind::String {
            return Err(Diagnostic::error("expected a quoted MCU name".to_string(), tok.span));
        }
        self.advance();
        let name = self.interner.resolve(tok.text).to_string();
        Ok(self.tree.alloc_with(self.tags.mcu, org, Vec::new(), Some(Literal::Str(name))))
    }

    fn parse_unary_directive(&mut self, tag: Sym) -> Result<NodeId, Diagnostic> {
        let org = self.advance().span.origin();
        let expr = self.parse_expr()?;
        Ok(self.tree.alloc_with(tag, org, vec![Some(expr)], None))
    }

    fn parse_const_directive(&mut self, tag: Sym) -> Result<NodeId, Diagnostic> {
        let org = self.advance().span.origin();
        if self.cur().kind == TokenKind::String {
            let tok = self.advance();
            let text = self.interner.resolve(tok.text).to_string();
            let string_node = self.tree.alloc_with(self.tags.string, tok.span.origin(), Vec::new(), Some(Literal::Str(text)));
            return Ok(self.tree.alloc_with(tag, org, vec![Some(string_node)], None));
        }
        let mut items = vec![Some(self.parse_expr()?)];
        while self.check_symbol(",") {
            self.advance();
            items.push(Some(self.parse_expr()?));
        }
        let list = self.tree.alloc_with(self.tags.list, org, items, None);
        Ok(self.tree.alloc_with(tag, org, vec![Some(list)], None))
    }

    /// `NAME equ EXPR`
    fn parse_equ_keyword_form(&mut self) -> Result<NodeId, Diagnostic> {
        let name_tok = self.advance();
        self.advance(); // 'equ'
        let org = name_tok.span.origin();
        let expr = self.parse_expr()?;
        self.finish_equ(name_tok, org, expr)
    }

    /// `NAME = EXPR`
    fn parse_equ_eq_form(&mut self) -> Result<NodeId, Diagnostic> {
        let name_tok = self.advance();
        self.advance(); // '='
        let org = name_tok.span.origin();
        let expr = self.parse_expr()?;
        self.finish_equ(name_tok, org, expr)
    }

    fn finish_equ(&mut self, name_tok: Token, org: Origin, expr: NodeId) -> Result<NodeId, Diagnostic> {
        self.eval_const_expr(expr).map_err(|msg| Diagnostic::error(msg, name_tok.span))?;
        let node = self.tree.alloc_with(self.tags.equ, org, vec![Some(expr)], Some(Literal::Sym(name_tok.text)));
        self.names.declare(Name { sym: name_tok.text, namespace: Namespace::Equ, decl: node });
        Ok(node)
    }

    /// `def ALIAS = Rn` or `def ALIAS = OTHERALIAS`
    fn parse_def(&mut self) -> Result<NodeId, Diagnostic> {
        let org = self.advance().span.origin();
        let name_tok = self.cur();
        if name_tok.kind != TokenKind::Name {
            return Err(Diagnostic::error("expected an alias name after def".to_string(), name_tok.span));
        }
        self.advance();
        self.eat_symbol("=")?;
        let reg_tok = self.cur();
        let reg = if let Some(r) = parse_register(self.interner.resolve(reg_tok.text)) {
            self.advance();
            r
        } else if reg_tok.kind == TokenKind::Name {
            self.advance();
            self.lookup_def(reg_tok.text).ok_or_else(|| {
                Diagnostic::error(
                    format!("'{}' is not a register or a previously defined alias", self.interner.resolve(reg_tok.text)),
                    reg_tok.span,
                )
            })?
        } else {
            return Err(Diagnostic::error("expected a register after def".to_string(), reg_tok.span));
        };
        let reg_node = self.tree.alloc_with(self.tags.reg, org, Vec::new(), Some(Literal::Int(reg as i64)));
        let def_node = self.tree.alloc_with(self.tags.def, org, vec![Some(reg_node)], Some(Literal::Sym(name_tok.text)));
        self.names.declare(Name { sym: name_tok.text, namespace: Namespace::Register, decl: def_node });
        Ok(def_node)
    }

    fn parse_instruction(&mut self) -> Result<NodeId, Diagnostic> {
        let tok = self.advance();
        let org = tok.span.origin();
        let mut operands = Vec::new();
        if self.cur().kind != TokenKind::Newline && !self.at_end() {
            operands.push(Some(self.parse_operand()?));
            while self.check_symbol(",") {
                self.advance();
                operands.push(Some(self.parse_operand()?));
            }
        }
        Ok(self.tree.alloc_with(self.tags.instr, org, operands, Some(Literal::Sym(tok.text))))
    }

    fn parse_operand(&mut self) -> Result<NodeId, Diagnostic> {
        let org = self.cur().span.origin();

        if self.check_symbol("-") {
            if let Some(idx_tag) = self.index_register_tag_predec() {
                self.advance(); // '-'
                self.advance(); // x/y/z
                return Ok(self.tree.alloc(idx_tag, org));
            }
        }

        if let Some(reg_letter) = self.index_register_letter() {
            self.advance();
            if self.check_symbol("+") {
                self.advance();
                if self.cur().kind == TokenKind::Integer {
                    let disp_tok = self.advance();
                    let disp = parse_integer(self.interner.resolve(disp_tok.text)) as u8;
                    let tag = match reg_letter {
                        'y' => self.tags.idx_y_disp,
                        'z' => self.tags.idx_z_disp,
                        _ => {
                            return Err(Diagnostic::error(
                                "only Y and Z support a displacement".to_string(),
                                disp_tok.span,
                            ))
                        }
                    };
                    return Ok(self.tree.alloc_with(tag, org, Vec::new(), Some(Literal::Int(disp as i64))));
                }
                let tag = match reg_letter {
                    'x' => self.tags.idx_x_postinc,
                    'y' => self.tags.idx_y_postinc,
                    'z' => self.tags.idx_z_postinc,
                    _ => unreachable!(),
                };
                return Ok(self.tree.alloc(tag, org));
            }
            let tag = match reg_letter {
                'x' => self.tags.idx_x,
                'y' => self.tags.idx_y,
                'z' => self.tags.idx_z,
                _ => unreachable!(),
            };
            return Ok(self.tree.alloc(tag, org));
        }

        if let Some(reg) = self.try_register() {
            let tok = self.advance();
            let _ = tok;
            return Ok(self.tree.alloc_with(self.tags.reg, org, Vec::new(), Some(Literal::Int(reg as i64))));
        }

        self.parse_expr()
    }

    fn index_register_letter(&self) -> Option<char> {
        let tok = self.cur();
        if tok.kind != TokenKind::Name {
            return None;
        }
        match self.interner.resolve(tok.text) {
            "x" => Some('x'),
            "y" => Some('y'),
            "z" => Some('z'),
            _ => None,
        }
    }

    fn index_register_tag_predec(&self) -> Option<Sym> {
        let next = self.tokens.get(self.pos + 1)?;
        if next.kind != TokenKind::Name {
            return None;
        }
        match self.interner.resolve(next.text) {
            "x" => Some(self.tags.idx_x_predec),
            "y" => Some(self.tags.idx_y_predec),
            "z" => Some(self.tags.idx_z_predec),
            _ => None,
        }
    }

    fn try_register(&self) -> Option<u8> {
        let tok = self.cur();
        if tok.kind != TokenKind::Name {
            return None;
        }
        parse_register(self.interner.resolve(tok.text))
    }

    fn parse_expr(&mut self) -> Result<NodeId, Diagnostic> {
        let tok = self.cur();
        let org = tok.span.origin();

        if self.check_symbol("-") {
            self.advance();
            let inner = self.cur();
            if inner.kind != TokenKind::Integer {
                return Err(Diagnostic::error("expected an integer after unary '-'".to_string(), inner.span));
            }
            self.advance();
            let value = -parse_integer(self.interner.resolve(inner.text));
            return Ok(self.tree.alloc_with(self.tags.integer, org, Vec::new(), Some(Literal::Int(value))));
        }

        if tok.kind == TokenKind::Name && (tok.text == self.kw_low || tok.text == self.kw_high) {
            let is_low = tok.text == self.kw_low;
            self.advance();
            self.eat_symbol("(")?;
            let inner = self.parse_expr()?;
            self.eat_symbol(")")?;
            let tag = if is_low { self.tags.low } else { self.tags.high };
            return Ok(self.tree.alloc_with(tag, org, vec![Some(inner)], None));
        }

        if tok.kind == TokenKind::Integer {
            self.advance();
            let value = parse_integer(self.interner.resolve(tok.text));
            return Ok(self.tree.alloc_with(self.tags.integer, org, Vec::new(), Some(Literal::Int(value))));
        }

        if tok.kind == TokenKind::Name {
            self.advance();
            if let Some(value) = self.lookup_equ(tok.text) {
                return Ok(self.tree.alloc_with(self.tags.integer, org, Vec::new(), Some(Literal::Int(value))));
            }
            if let Some(reg) = self.lookup_def(tok.text) {
                return Ok(self.tree.alloc_with(self.tags.reg, org, Vec::new(), Some(Literal::Int(reg as i64))));
            }
            if let Some(target) = self.local_label_target(tok.text) {
                return Ok(self.tree.alloc_with(self.tags.labelref, org, Vec::new(), Some(Literal::Sym(target))));
            }
            return Ok(self.tree.alloc_with(self.tags.labelref, org, Vec::new(), Some(Literal::Sym(tok.text))));
        }

        Err(Diagnostic::error(format!("unexpected token '{}'", self.cur_text()), tok.span))
    }

    /// Resolve a lexer-folded local-label reference (`"1b"`/`"1f"`, text
    /// already lowercased) to the synthesized name it actually points
    /// at: `b` is the most recent `N:` declaration seen so far, `f` is
    /// the next one that hasn't been declared yet. Returns `None` for
    /// any other name, which the caller treats as an ordinary label.
    fn local_label_target(&mut self, text: Sym) -> Option<Sym> {
        let s = self.interner.resolve(text);
        let (digits, backward) = match s.strip_suffix('b') {
            Some(d) => (d, true),
            None => (s.strip_suffix('f')?, false),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let digits = digits.to_string();
        let digit_sym = self.interner.intern(&digits);
        let seen = self.local_counters.get(&digit_sym).copied().unwrap_or(0);
        let count = if backward { seen } else { seen + 1 };
        if count == 0 {
            return None;
        }
        Some(self.interner.intern(&format!("{digits}${count}")))
    }

    /// Look up an `equ` binding and evaluate its right-hand side.
    fn lookup_equ(&self, sym: Sym) -> Option<i64> {
        let decl = self.names.lookup(sym, Namespace::Equ)?.decl;
        let expr = self.tree.subnode(decl, 0)?;
        self.eval_const_expr(expr).ok()
    }

    /// Look up a `def` register alias.
    fn lookup_def(&self, sym: Sym) -> Option<u8> {
        let decl = self.names.lookup(sym, Namespace::Register)?.decl;
        let reg_node = self.tree.subnode(decl, 0)?;
        match self.tree.node(reg_node).literal {
            Some(Literal::Int(v)) => Some(v as u8),
            _ => None,
        }
    }

    /// Evaluate an expression built from integer literals, `low`/`high`,
    /// and already-defined `equ` names — the only things a valid `equ`
    /// or `def` right-hand side may reference, since labels aren't
    /// resolvable yet at parse time.
    fn eval_const_expr(&self, node: NodeId) -> Result<i64, String> {
        let n = self.tree.node(node);
        if n.tag == self.tags.integer {
            return Ok(match n.literal {
                Some(Literal::Int(v)) => v,
                _ => 0,
            });
        }
        if n.tag == self.tags.low || n.tag == self.tags.high {
            let inner = self.tree.subnode(node, 0).expect("low/high has one operand");
            let value = self.eval_const_expr(inner)?;
            return Ok(if n.tag == self.tags.low { value & 0xFF } else { (value >> 8) & 0xFF });
        }
        if n.tag == self.tags.labelref {
            let name = match n.literal {
                Some(Literal::Sym(s)) => s,
                _ => unreachable!(),
            };
            return self
                .lookup_equ(name)
                .ok_or_else(|| format!("'{}' must be a previously defined constant", self.interner.resolve(name)));
        }
        Err("expected a constant expression".to_string())
    }
}

fn parse_register(text: &str) -> Option<u8> {
    let rest = text.strip_prefix('r')?;
    if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let n: u32 = rest.parse().ok()?;
    if n <= 31 {
        Some(n as u8)
    } else {
        None
    }
}

fn parse_integer(text: &str) -> i64 {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).unwrap_or(0)
    } else {
        text.parse().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avr::lexer::Lexer;

    fn parse_src(src: &str) -> (ParseResult, Interner) {
        let mut interner = Interner::new();
        let (tokens, lex_diags) = Lexer::new(src, 0).lex(&mut interner);
        assert!(lex_diags.is_empty(), "lex errors: {lex_diags:?}");
        let result = parse(tokens, &mut interner);
        (result, interner)
    }

    #[test]
    fn parses_mcu_directive() {
        let (result, _) = parse_src(".mcu \"atmega328\"\n");
        assert!(result.diagnostics.is_empty());
        let program = result.tree.node(result.program);
        assert_eq!(program.subnodes.len(), 1);
    }

    #[test]
    fn parses_global_label_and_instruction_on_one_line() {
        let (result, _) = parse_src("loop: nop\n");
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        let program = result.tree.node(result.program);
        assert_eq!(program.subnodes.len(), 2);
    }

    #[test]
    fn local_labels_get_unique_synthesized_names() {
        let (result, interner) = parse_src("1: nop\nrjmp 1b\n1: nop\n");
        // both declarations produced distinct synthesized names
        let names: Vec<Sym> = result
            .tree
            .node(result.program)
            .subnodes
            .iter()
            .filter_map(|n| n.map(|id| result.tree.node(id)))
            .filter_map(|n| match n.literal {
                Some(Literal::Sym(s)) if interner.resolve(s).starts_with("1$") => Some(s),
                _ => None,
            })
            .collect();
        assert_eq!(names.len(), 2);
        assert_ne!(names[0], names[1]);
    }

    #[test]
    fn forward_local_label_reference_targets_the_next_declaration() {
        let (result, interner) = parse_src("rjmp 1f\nnop\n1: nop\n");
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        let rjmp = result.tree.node(result.program).subnodes[0].unwrap();
        let operand = result.tree.subnode(rjmp, 0).unwrap();
        let Some(Literal::Sym(target)) = result.tree.node(operand).literal else { panic!("expected labelref") };
        let decl = result.tree.node(result.program).subnodes.last().unwrap().unwrap();
        let Some(Literal::Sym(declared)) = result.tree.node(decl).literal else { panic!("expected llabel") };
        assert_eq!(interner.resolve(target), interner.resolve(declared));
    }

    #[test]
    fn equ_is_resolved_eagerly() {
        let (result, _) = parse_src("FOO equ 0x20\nldi r16, FOO\n");
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        let instr = result
            .tree
            .node(result.program)
            .subnodes
            .last()
            .unwrap()
            .unwrap();
        let operand = result.tree.subnode(instr, 1).unwrap();
        assert_eq!(result.tree.node(operand).literal, Some(Literal::Int(0x20)));
    }

    #[test]
    fn def_resolves_register_alias() {
        let (result, _) = parse_src("def temp = r16\nmov r0, temp\n");
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        let instr = result.tree.node(result.program).subnodes.last().unwrap().unwrap();
        let operand = result.tree.subnode(instr, 1).unwrap();
        assert_eq!(result.tree.node(operand).literal, Some(Literal::Int(16)));
    }

    #[test]
    fn low_high_wrap_an_expression() {
        let (result, _) = parse_src("ldi r16, low(300)\n");
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    }

    #[test]
    fn index_addressing_modes_parse() {
        let (result, _) = parse_src("ld r0, x\nld r1, x+\nst -x, r2\nld r3, y+5\n");
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        assert_eq!(result.tree.node(result.program).subnodes.len(), 4);
    }

    #[test]
    fn unterminated_macro_is_handled_upstream_not_here() {
        // sanity: a stray, unknown directive is reported and recovered from
        let (result, _) = parse_src(".bogus 1\nnop\n");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.tree.node(result.program).subnodes.len(), 1);
    }
}
