//! Executes compiled reduction bytecode (§4.4) against a tree arena,
//! a node-stack of already-reduced children, and a token-stack of
//! shifted-but-not-yet-reduced tokens.

use std::collections::HashMap;

use crate::span::Origin;
use crate::symtab::{Interner, Sym};
use crate::token::{Token, TokenKind};
use crate::tree::flags::NodeFlags;
use crate::tree::{Literal, NodeId, Tree};

use super::{Op, Rule};

/// One value living on the reduction VM's local operand stack.
#[derive(Clone, Copy, Debug)]
enum LocalVal {
    Node(NodeId),
    Null,
    Tag(Sym),
}

/// A grammar-specific transform invoked by `usermod` (§4.4's "function
/// library") — e.g. the AVR grammar's `low()`/`high()` operators.
pub type UserFn = fn(&mut Tree, NodeId) -> NodeId;

#[derive(Default)]
pub struct FunctionLibrary {
    functions: HashMap<String, UserFn>,
}

impl FunctionLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, f: UserFn) {
        self.functions.insert(name.to_string(), f);
    }
}

#[derive(Default)]
pub struct ReducerRegistry {
    rules: HashMap<Sym, Rule>,
}

pub struct Reducer<'a> {
    pub rule: &'a Rule,
}

impl ReducerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: Sym, rule: Rule) {
        self.rules.insert(name, rule);
    }

    pub fn get(&self, name: Sym) -> Option<&Rule> {
        self.rules.get(&name)
    }
}

fn literal_of(token: &Token, interner: &Interner) -> Option<Literal> {
    match token.kind {
        TokenKind::Integer => interner.resolve(token.text).parse::<i64>().ok().map(Literal::Int),
        TokenKind::String => Some(Literal::Str(interner.resolve(token.text).to_string())),
        TokenKind::Name | TokenKind::Keyword | TokenKind::Symbol => Some(Literal::Sym(token.text)),
        _ => None,
    }
}

/// Runs one rule's bytecode. Holds no state across calls; every
/// invocation starts with an empty local stack and ends with the
/// result (or an error) once it reaches `End`.
pub struct Vm<'a> {
    tree: &'a mut Tree,
    node_stack: &'a mut Vec<NodeId>,
    token_stack: &'a mut Vec<Token>,
    functions: &'a FunctionLibrary,
    interner: &'a mut Interner,
    local: Vec<LocalVal>,
    registers: [Option<LocalVal>; 10],
}

impl<'a> Vm<'a> {
    pub fn new(
        tree: &'a mut Tree,
        node_stack: &'a mut Vec<NodeId>,
        token_stack: &'a mut Vec<Token>,
        functions: &'a FunctionLibrary,
        interner: &'a mut Interner,
    ) -> Self {
        Self {
            tree,
            node_stack,
            token_stack,
            functions,
            interner,
            local: Vec::new(),
            registers: [None; 10],
        }
    }

    pub fn run(&mut self, rule: &Rule) -> Result<NodeId, String> {
        for op in &rule.ops {
            self.exec(op)?;
        }
        match self.local.pop() {
            Some(LocalVal::Node(id)) => Ok(id),
            Some(other) => Err(format!("rule {:?} ended with a non-node value: {other:?}", rule.name)),
            None => Err(format!("rule {:?} ended with an empty local stack", rule.name)),
        }
    }

    fn pop(&mut self) -> Result<LocalVal, String> {
        self.local.pop().ok_or_else(|| "local stack underflow".to_string())
    }

    fn pop_node(&mut self) -> Result<NodeId, String> {
        match self.pop()? {
            LocalVal::Node(id) => Ok(id),
            other => Err(format!("expected a node on the local stack, found {other:?}")),
        }
    }

    fn exec(&mut self, op: &Op) -> Result<(), String> {
        match op {
            Op::NsPop => {
                let id = self
                    .node_stack
                    .pop()
                    .ok_or("node-stack underflow")?;
                self.local.push(LocalVal::Node(id));
            }
            Op::NsPush => {
                let id = self.pop_node()?;
                self.node_stack.push(id);
            }
            Op::TsPop => {
                let token = self.token_stack.pop().ok_or("token-stack underflow")?;
                let literal = literal_of(&token, self.interner);
                let id = self.tree.alloc_with(token.text, token.span.origin(), Vec::new(), literal);
                self.local.push(LocalVal::Node(id));
            }
            Op::TsRewind(n) => {
                for _ in 0..*n {
                    if let Some(t) = self.token_stack.pop() {
                        // re-examine: push back at front is not possible on a
                        // Vec-as-stack; the DFA driver re-feeds the same
                        // token, so rewinding here only discards our copy.
                        drop(t);
                    }
                }
            }
            Op::Ts1Rewind => {
                self.token_stack.pop();
            }
            Op::Null => self.local.push(LocalVal::Null),
            Op::Rev(n) => self.rev(*n as usize)?,
            Op::AllRev => {
                let len = self.local.len();
                self.rev(len)?;
            }
            Op::RotLeft(n) => self.rotate(*n as usize, true)?,
            Op::RotRight(n) => self.rotate(*n as usize, false)?,
            Op::Mod => self.negate(false)?,
            Op::ModPtr => self.negate(true)?,
            Op::UserMod(name) => {
                let id = self.pop_node()?;
                let f = self
                    .functions
                    .functions
                    .get(name)
                    .ok_or_else(|| format!("unregistered usermod {name:?}"))?;
                let result = f(self.tree, id);
                self.local.push(LocalVal::Node(result));
            }
            Op::RGet(n) => {
                let v = self.registers[*n as usize].ok_or("read from unset register")?;
                self.local.push(v);
            }
            Op::RSet(n) => {
                let v = self.pop()?;
                self.registers[*n as usize] = Some(v);
            }
            Op::Combine(tag, arity) => {
                let tag_sym = self.interner.intern(tag);
                let subnodes = self.pop_n_reversed(*arity as usize)?;
                let org = self.tree_origin_of(&subnodes);
                let id = self.tree.alloc_with(tag_sym, org, subnodes, None);
                self.local.push(LocalVal::Node(id));
            }
            Op::CombineTag(arity) => {
                let tag = match self.pop()? {
                    LocalVal::Tag(sym) => sym,
                    LocalVal::Node(id) => match &self.tree.node(id).literal {
                        Some(Literal::Sym(sym)) => *sym,
                        _ => return Err("combinetag: top value is not tag-like".to_string()),
                    },
                    LocalVal::Null => return Err("combinetag: top value is null".to_string()),
                };
                let subnodes = self.pop_n_reversed(*arity as usize)?;
                let org = self.tree_origin_of(&subnodes);
                let id = self.tree.alloc_with(tag, org, subnodes, None);
                self.local.push(LocalVal::Node(id));
            }
            Op::SetTagMark => {
                let top = self.pop()?;
                let tag = match top {
                    LocalVal::Node(id) => match &self.tree.node(id).literal {
                        Some(Literal::Sym(sym)) => *sym,
                        _ => return Err("settagmark: top value is not tag-like".to_string()),
                    },
                    _ => return Err("settagmark: top value is not tag-like".to_string()),
                };
                self.local.push(LocalVal::Tag(tag));
            }
            Op::SetOriginStart | Op::SetOriginEnd => {
                // Origin is stamped at allocation time from the token
                // that produced the node; nothing to do post hoc with
                // the arena-index representation used here.
            }
            Op::ConsumeN(n) => {
                for _ in 0..*n {
                    self.token_stack.pop();
                }
            }
            Op::ConsumeText(expected) => {
                let token = self.token_stack.pop().ok_or("token-stack underflow")?;
                if self.interner.resolve(token.text) != expected {
                    return Err(format!(
                        "expected token {expected:?}, found {:?}",
                        self.interner.resolve(token.text)
                    ));
                }
            }
            Op::MakeList(n) => {
                let items = self.pop_n_reversed(*n as usize)?;
                let list_tag = self.interner.intern("LIST");
                let org = self.tree_origin_of(&items);
                let id = self.tree.alloc_with(list_tag, org, items, None);
                self.tree.node_mut(id).flags |= NodeFlags::TRANSPARENT;
                self.local.push(LocalVal::Node(id));
            }
            Op::Extract(index) => {
                let id = self.pop_node()?;
                let sub = self.tree.node(id).subnodes.get(*index as usize).copied().flatten();
                match sub {
                    Some(sub_id) => self.local.push(LocalVal::Node(sub_id)),
                    None => self.local.push(LocalVal::Null),
                }
            }
            Op::FoldInto => {
                let source = self.pop_node()?;
                let target = self.pop_node()?;
                let extra = self.tree.node(source).subnodes.clone();
                self.tree.node_mut(target).subnodes.extend(extra);
                self.local.push(LocalVal::Node(target));
            }
            Op::End => {}
        }
        Ok(())
    }

    fn rev(&mut self, n: usize) -> Result<(), String> {
        let len = self.local.len();
        if n > len {
            return Err("rev: not enough items on local stack".to_string());
        }
        self.local[len - n..].reverse();
        Ok(())
    }

    fn rotate(&mut self, n: usize, left: bool) -> Result<(), String> {
        let len = self.local.len();
        if n == 0 || n > len {
            return Err("rotate: not enough items on local stack".to_string());
        }
        let slice = &mut self.local[len - n..];
        if left {
            slice.rotate_left(1);
        } else {
            slice.rotate_right(1);
        }
        Ok(())
    }

    fn negate(&mut self, in_place: bool) -> Result<(), String> {
        let id = self.pop_node()?;
        let value = match &self.tree.node(id).literal {
            Some(Literal::Int(v)) => *v,
            _ => return Err("mod: top node has no integer literal".to_string()),
        };
        if in_place {
            self.tree.node_mut(id).literal = Some(Literal::Int(-value));
            self.local.push(LocalVal::Node(id));
        } else {
            let org = self.tree.node(id).org;
            let tag = self.tree.node(id).tag;
            let new_id = self
                .tree
                .alloc_with(tag, org, Vec::new(), Some(Literal::Int(-value)));
            self.local.push(LocalVal::Node(new_id));
        }
        Ok(())
    }

    fn pop_n_reversed(&mut self, n: usize) -> Result<Vec<Option<NodeId>>, String> {
        let mut collected = Vec::with_capacity(n);
        for _ in 0..n {
            match self.pop()? {
                LocalVal::Node(id) => collected.push(Some(id)),
                LocalVal::Null => collected.push(None),
                LocalVal::Tag(_) => return Err("unexpected tag value among combine args".to_string()),
            }
        }
        collected.reverse();
        Ok(collected)
    }

    fn tree_origin_of(&self, subnodes: &[Option<NodeId>]) -> Origin {
        subnodes
            .iter()
            .flatten()
            .next()
            .map(|id| self.tree.node(*id).org)
            .unwrap_or(Origin { file_id: 0, line: 0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Span;

    fn push_token(
        token_stack: &mut Vec<Token>,
        interner: &mut Interner,
        kind: TokenKind,
        text: &str,
    ) {
        let sym = interner.intern(text);
        token_stack.push(Token::new(kind, sym, Span::new(0, 1, 0, text.len() as u32)));
    }

    #[test]
    fn builds_a_leaf_then_combines_two_into_a_tagged_node() {
        let mut tree = Tree::new();
        let mut node_stack = Vec::new();
        let mut token_stack = Vec::new();
        let mut interner = Interner::new();
        push_token(&mut token_stack, &mut interner, TokenKind::Integer, "16");
        let functions = FunctionLibrary::new();

        let rule = crate::reduce::compile("reduce_reg_operand", "tspop end").unwrap();
        let mut vm = Vm::new(&mut tree, &mut node_stack, &mut token_stack, &functions, &mut interner);
        let leaf = vm.run(&rule).unwrap();
        assert_eq!(tree.node(leaf).literal, Some(Literal::Int(16)));
    }

    #[test]
    fn combine_restores_left_to_right_order_after_rev() {
        let mut tree = Tree::new();
        let mut interner = Interner::new();
        let lhs_tag = interner.intern("placeholder_lhs");
        let rhs_tag = interner.intern("placeholder_rhs");
        let lhs = tree.alloc(lhs_tag, Origin { file_id: 0, line: 1 });
        let rhs = tree.alloc(rhs_tag, Origin { file_id: 0, line: 1 });

        let mut node_stack = vec![lhs, rhs];
        let mut token_stack = Vec::new();
        let functions = FunctionLibrary::new();
        let rule = crate::reduce::compile("reduce_binop", "nspop nspop rev:2 combine:BINOP:2 end").unwrap();
        let mut vm = Vm::new(&mut tree, &mut node_stack, &mut token_stack, &functions, &mut interner);
        let result = vm.run(&rule).unwrap();

        assert_eq!(tree.node(result).subnodes, vec![Some(lhs), Some(rhs)]);
    }

    #[test]
    fn makelist_marks_result_transparent() {
        let mut tree = Tree::new();
        let mut interner = Interner::new();
        let leaf_tag = interner.intern("ITEM");
        let a = tree.alloc(leaf_tag, Origin { file_id: 0, line: 1 });
        let b = tree.alloc(leaf_tag, Origin { file_id: 0, line: 1 });
        let mut node_stack = vec![a, b];
        let mut token_stack = Vec::new();
        let functions = FunctionLibrary::new();
        let rule = crate::reduce::compile("reduce_list", "nspop nspop rev:2 makelist:2 end").unwrap();
        let mut vm = Vm::new(&mut tree, &mut node_stack, &mut token_stack, &functions, &mut interner);
        let list = vm.run(&rule).unwrap();
        assert!(tree.node(list).flags.contains(NodeFlags::TRANSPARENT));
        assert_eq!(tree.node(list).subnodes, vec![Some(a), Some(b)]);
    }
}
