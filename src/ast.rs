//! Abstract syntax tree shared by all surface syntaxes
//!
//! Nodes live in an arena ([`Ast`]) and refer to each other with [`NodeId`]s. Every node stores
//! its children in a small ordered list of `(Title, NodeId)` slots; a title that occurs more than
//! once forms an ordered collection. All mutation goes through [`Ast::set_child`],
//! [`Ast::append_child`], [`Ast::remove`] and [`Ast::replace_with`], which keep parent links
//! consistent:
//!
//! - a node has at most one parent
//! - setting a child detaches both the previous occupant and the new child's old parent link
//! - removing a node clears its parent link (the node stays allocated, just unreachable)

pub mod kind;
pub mod nodes;
pub mod title;
pub mod walk;

use std::fmt::Write as _;

use base::span::TextRange;
use itertools::Itertools;
use la_arena::{Arena, Idx};
use smallvec::SmallVec;

pub use self::{
    kind::NodeKind,
    nodes::{AstNode, AstNodeCollection},
    title::Title,
    walk::{Preorder, WalkEvent},
};

use self::kind::{AstToken, Literal, LiteralValue};
use crate::syntax::token::TokenKind;

pub type NodeId = Idx<NodeData>;

pub type Slots = SmallVec<[(Title, NodeId); 4]>;

/// Node in the [`Ast`] arena
#[derive(Debug, Clone, PartialEq)]
pub struct NodeData {
    pub kind: NodeKind,
    /// Source range, or the default range for synthesized nodes
    pub range: TextRange,
    parent: Option<NodeId>,
    slots: Slots,
}

/// Arena of AST nodes
#[derive(Debug, Clone, Default)]
pub struct Ast {
    nodes: Arena<NodeData>,
}

/// Allocation and accessors
impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, kind: NodeKind) -> NodeId {
        self.alloc_at(kind, TextRange::default())
    }

    pub fn alloc_at(&mut self, kind: NodeKind, range: TextRange) -> NodeId {
        self.nodes.alloc(NodeData {
            kind,
            range,
            parent: None,
            slots: Slots::new(),
        })
    }

    /// Number of allocated nodes, including detached ones
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 0
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id].kind
    }

    pub fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.nodes[id].kind
    }

    pub fn range(&self, id: NodeId) -> TextRange {
        self.nodes[id].range
    }

    pub fn set_range(&mut self, id: NodeId, range: TextRange) {
        self.nodes[id].range = range;
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    /// All slots in insertion order, syntax slots included
    pub fn slots(&self, id: NodeId) -> &[(Title, NodeId)] {
        &self.nodes[id].slots
    }

    /// GetChildByTitle: the first child under the title
    pub fn child(&self, id: NodeId, title: Title) -> Option<NodeId> {
        self.nodes[id]
            .slots
            .iter()
            .find(|(t, _)| *t == title)
            .map(|(_, c)| *c)
    }

    /// Children under the title in order
    pub fn children(&self, id: NodeId, title: Title) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[id]
            .slots
            .iter()
            .filter(move |(t, _)| *t == title)
            .map(|(_, c)| *c)
    }

    pub fn collection(&self, owner: NodeId, title: Title) -> AstNodeCollection {
        AstNodeCollection::new(owner, title)
    }

    /// Title under which the node is stored in its parent
    pub fn title_in_parent(&self, id: NodeId) -> Option<Title> {
        let parent = self.parent(id)?;
        self.nodes[parent]
            .slots
            .iter()
            .find(|(_, c)| *c == id)
            .map(|(t, _)| *t)
    }

    /// Parent, grandparent, ..
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |x| self.parent(*x))
    }

    pub fn preorder(&self, root: NodeId) -> Preorder<'_> {
        Preorder::new(self, root)
    }

    /// Descendants including the root, in preorder
    pub fn descendants(&self, root: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.preorder(root).filter_map(|ev| match ev {
            WalkEvent::Enter(id) => Some(id),
            WalkEvent::Leave(_) => None,
        })
    }
}

/// Mutation
impl Ast {
    /// SetChildByTitle. Returns the previous occupant, which is detached.
    pub fn set_child(&mut self, owner: NodeId, title: Title, child: Option<NodeId>) -> Option<NodeId> {
        let prev_pos = self.nodes[owner].slots.iter().position(|(t, _)| *t == title);

        let Some(child) = child else {
            let pos = prev_pos?;
            let (_, prev) = self.nodes[owner].slots.remove(pos);
            self.nodes[prev].parent = None;
            return Some(prev);
        };

        self.assert_no_cycle(owner, child);
        if prev_pos.map(|pos| self.nodes[owner].slots[pos].1) == Some(child) {
            return None;
        }

        self.detach(child);
        // detaching may have shifted the slots of `owner`
        let prev_pos = self.nodes[owner].slots.iter().position(|(t, _)| *t == title);

        self.nodes[child].parent = Some(owner);
        match prev_pos {
            Some(pos) => {
                let prev = std::mem::replace(&mut self.nodes[owner].slots[pos].1, child);
                self.nodes[prev].parent = None;
                Some(prev)
            }
            None => {
                self.nodes[owner].slots.push((title, child));
                None
            }
        }
    }

    /// Appends to the ordered collection under the title
    pub fn append_child(&mut self, owner: NodeId, title: Title, child: NodeId) {
        self.assert_no_cycle(owner, child);
        self.detach(child);
        self.nodes[child].parent = Some(owner);
        self.nodes[owner].slots.push((title, child));
    }

    pub fn extend_children(
        &mut self,
        owner: NodeId,
        title: Title,
        children: impl IntoIterator<Item = NodeId>,
    ) {
        for child in children {
            self.append_child(owner, title, child);
        }
    }

    /// Inserts into the collection under the title before its `index`-th element
    pub fn insert_child(&mut self, owner: NodeId, title: Title, index: usize, child: NodeId) {
        self.assert_no_cycle(owner, child);
        self.detach(child);

        let slots = &self.nodes[owner].slots;
        let pos = slots
            .iter()
            .positions(|(t, _)| *t == title)
            .nth(index)
            .unwrap_or(slots.len());

        self.nodes[child].parent = Some(owner);
        self.nodes[owner].slots.insert(pos, (title, child));
    }

    /// Detaches the node from its parent. It stays allocated.
    pub fn remove(&mut self, id: NodeId) {
        self.detach(id);
    }

    /// Puts `new` in the place of `old` (same title and position). Returns false if `old` has no
    /// parent.
    pub fn replace_with(&mut self, old: NodeId, new: NodeId) -> bool {
        if old == new {
            return self.parent(old).is_some();
        }

        let Some(parent) = self.parent(old) else {
            return false;
        };

        self.assert_no_cycle(parent, new);
        self.detach(new);

        let Some(pos) = self.nodes[parent].slots.iter().position(|(_, c)| *c == old) else {
            return false;
        };
        self.nodes[parent].slots[pos].1 = new;
        self.nodes[new].parent = Some(parent);
        self.nodes[old].parent = None;
        true
    }

    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id].parent.take() {
            self.nodes[parent].slots.retain(|(_, c)| *c != id);
        }
    }

    fn assert_no_cycle(&self, owner: NodeId, child: NodeId) {
        assert!(
            owner != child && !self.ancestors(owner).any(|a| a == child),
            "attaching a node under itself"
        );
    }
}

/// Structural match
impl Ast {
    /// Structural equality of two subtrees, possibly from different arenas
    ///
    /// Compares kind payloads ([`NodeKind::matches`]) and, per semantic title, the ordered
    /// children. Syntax slots, source ranges and parent links are ignored.
    pub fn match_nodes(&self, a: NodeId, other: &Ast, b: NodeId) -> bool {
        if !self.kind(a).matches(other.kind(b)) {
            return false;
        }

        let titles = self.nodes[a]
            .slots
            .iter()
            .chain(other.nodes[b].slots.iter())
            .map(|(t, _)| *t)
            .filter(|t| !t.is_syntax())
            .unique();

        for title in titles {
            let xs: SmallVec<[NodeId; 4]> = self.children(a, title).collect();
            let ys: SmallVec<[NodeId; 4]> = other.children(b, title).collect();
            if xs.len() != ys.len() {
                return false;
            }
            if !xs.iter().zip(ys.iter()).all(|(x, y)| self.match_nodes(*x, other, *y)) {
                return false;
            }
        }

        true
    }

    /// Match where both sides may be absent
    pub fn match_or_null(&self, a: Option<NodeId>, other: &Ast, b: Option<NodeId>) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some(a), Some(b)) => self.match_nodes(a, other, b),
            _ => false,
        }
    }
}

/// Construction helpers
impl Ast {
    pub fn identifier(&mut self, name: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Identifier(name.into()))
    }

    pub fn token(&mut self, kind: TokenKind, text: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Token(AstToken {
            kind,
            text: text.into(),
        }))
    }

    /// `name` as an expression
    pub fn identifier_expression(&mut self, name: impl Into<String>) -> NodeId {
        let ident = self.identifier(name);
        let expr = self.alloc(NodeKind::IdentifierExpression);
        self.set_child(expr, Title::Identifier, Some(ident));
        expr
    }

    pub fn literal(&mut self, value: LiteralValue) -> NodeId {
        self.alloc(NodeKind::PrimitiveExpression(Literal::new(value)))
    }

    /// Name stored under [`Title::Identifier`]
    pub fn name_of(&self, id: NodeId) -> Option<&str> {
        let ident = self.child(id, Title::Identifier)?;
        match self.kind(ident) {
            NodeKind::Identifier(name) => Some(name.as_str()),
            _ => None,
        }
    }

    /// Deep-copies a subtree of another arena into this one. The copy has no parent.
    pub fn import(&mut self, other: &Ast, id: NodeId) -> NodeId {
        let data = other.data(id);
        let copy = self.alloc_at(data.kind.clone(), data.range);
        for (title, child) in data.slots.iter() {
            let child = self.import(other, *child);
            self.append_child(copy, *title, child);
        }
        copy
    }
}

/// Debug outline
impl Ast {
    /// Indented outline of the semantic slots, one node per line
    pub fn dump(&self, root: NodeId) -> String {
        let mut out = String::new();
        self.dump_rec(&mut out, root, None, 0);
        out
    }

    fn dump_rec(&self, out: &mut String, id: NodeId, title: Option<Title>, depth: usize) {
        let indent = "  ".repeat(depth);
        let kind = self::describe(self.kind(id));
        // `String` as `fmt::Write` never fails
        let _ = match title {
            Some(title) => writeln!(out, "{indent}{title:?}: {kind}"),
            None => writeln!(out, "{indent}{kind}"),
        };

        for (title, child) in self.slots(id).iter() {
            if !title.is_syntax() {
                self.dump_rec(out, *child, Some(*title), depth + 1);
            }
        }
    }
}

fn describe(kind: &NodeKind) -> String {
    match kind {
        NodeKind::Identifier(name) => format!("Identifier {name:?}"),
        NodeKind::PrimitiveExpression(lit) => format!("PrimitiveExpression {}", lit.value),
        NodeKind::Token(tk) => format!("Token {:?}", tk.text),
        NodeKind::Comment(c) => format!("Comment {:?}", c.text),
        NodeKind::Modifier(m) => format!("Modifier {m:?}"),
        NodeKind::PrimitiveType(ty) => format!("PrimitiveType {ty:?}"),
        _ => format!("{kind:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::kind::BinaryOperator;
    use super::*;

    fn int(ast: &mut Ast, value: u64) -> NodeId {
        ast.literal(LiteralValue::Integer {
            value,
            suffix: Default::default(),
        })
    }

    #[test]
    fn set_child_keeps_parent_links() {
        let mut ast = Ast::new();
        let bin = ast.alloc(NodeKind::BinaryOperatorExpression(BinaryOperator::Add));
        let one = int(&mut ast, 1);
        let two = int(&mut ast, 2);

        assert_eq!(ast.set_child(bin, Title::Left, Some(one)), None);
        assert_eq!(ast.parent(one), Some(bin));

        assert_eq!(ast.set_child(bin, Title::Left, Some(two)), Some(one));
        assert_eq!(ast.parent(one), None);
        assert_eq!(ast.parent(two), Some(bin));
        assert_eq!(ast.child(bin, Title::Left), Some(two));

        // moving a child detaches it from its old slot
        assert_eq!(ast.set_child(bin, Title::Right, Some(two)), None);
        assert_eq!(ast.child(bin, Title::Left), None);
        assert_eq!(ast.title_in_parent(two), Some(Title::Right));

        assert_eq!(ast.set_child(bin, Title::Right, None), Some(two));
        assert_eq!(ast.parent(two), None);
    }

    #[test]
    fn collections_keep_order() {
        let mut ast = Ast::new();
        let block = ast.alloc(NodeKind::BlockStatement);
        let xs: Vec<_> = (0..3).map(|i| int(&mut ast, i)).collect();
        ast.extend_children(block, Title::Statements, xs.iter().copied());
        assert_eq!(ast.children(block, Title::Statements).collect::<Vec<_>>(), xs);

        let x = int(&mut ast, 9);
        ast.insert_child(block, Title::Statements, 1, x);
        assert_eq!(
            ast.children(block, Title::Statements).collect::<Vec<_>>(),
            [xs[0], x, xs[1], xs[2]]
        );

        ast.remove(xs[1]);
        assert_eq!(ast.parent(xs[1]), None);
        assert_eq!(ast.children(block, Title::Statements).count(), 3);
    }

    #[test]
    fn replace_in_place() {
        let mut ast = Ast::new();
        let block = ast.alloc(NodeKind::BlockStatement);
        let xs: Vec<_> = (0..3).map(|i| int(&mut ast, i)).collect();
        ast.extend_children(block, Title::Statements, xs.iter().copied());

        let y = int(&mut ast, 7);
        assert!(ast.replace_with(xs[1], y));
        assert_eq!(
            ast.children(block, Title::Statements).collect::<Vec<_>>(),
            [xs[0], y, xs[2]]
        );
        assert_eq!(ast.parent(xs[1]), None);
        assert!(!ast.replace_with(xs[1], y));
    }

    #[test]
    #[should_panic]
    fn cycles_are_rejected() {
        let mut ast = Ast::new();
        let a = ast.alloc(NodeKind::BlockStatement);
        let b = ast.alloc(NodeKind::BlockStatement);
        ast.append_child(a, Title::Statements, b);
        ast.append_child(b, Title::Statements, a);
    }

    #[test]
    fn match_ignores_syntax_slots_and_arenas() {
        let mut a = Ast::new();
        let ea = a.identifier_expression("x");
        let lp = a.token(TokenKind::LParen, "(");
        a.set_child(ea, Title::LeftParenthesis, Some(lp));

        let mut b = Ast::new();
        let eb = b.identifier_expression("x");
        let ec = b.identifier_expression("y");

        assert!(a.match_nodes(ea, &b, eb));
        assert!(b.match_nodes(eb, &a, ea));
        assert!(!a.match_nodes(ea, &b, ec));
        assert!(a.match_or_null(None, &b, None));
        assert!(!a.match_or_null(Some(ea), &b, None));

        let imported = b.import(&a, ea);
        assert!(b.match_nodes(imported, &a, ea));
        assert_eq!(b.parent(imported), None);
    }
}
