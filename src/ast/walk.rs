//! Tree traversal

use crate::ast::{Ast, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WalkEvent {
    Enter(NodeId),
    Leave(NodeId),
}

/// Preorder traversal over all slots (syntax slots included)
#[derive(Debug, Clone)]
pub struct Preorder<'a> {
    ast: &'a Ast,
    stack: Vec<WalkEvent>,
}

impl<'a> Preorder<'a> {
    pub fn new(ast: &'a Ast, root: NodeId) -> Self {
        Self {
            ast,
            stack: vec![WalkEvent::Enter(root)],
        }
    }
}

impl<'a> Iterator for Preorder<'a> {
    type Item = WalkEvent;

    fn next(&mut self) -> Option<WalkEvent> {
        let ev = self.stack.pop()?;
        if let WalkEvent::Enter(id) = ev {
            self.stack.push(WalkEvent::Leave(id));
            self.stack.extend(
                self.ast
                    .slots(id)
                    .iter()
                    .rev()
                    .map(|(_, child)| WalkEvent::Enter(*child)),
            );
        }
        Some(ev)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{NodeKind, Title};

    #[test]
    fn enter_leave_order() {
        let mut ast = Ast::new();
        let block = ast.alloc(NodeKind::BlockStatement);
        let a = ast.alloc(NodeKind::EmptyStatement);
        let b = ast.alloc(NodeKind::EmptyStatement);
        ast.extend_children(block, Title::Statements, [a, b]);

        let events: Vec<_> = ast.preorder(block).collect();
        assert_eq!(
            events,
            [
                WalkEvent::Enter(block),
                WalkEvent::Enter(a),
                WalkEvent::Leave(a),
                WalkEvent::Enter(b),
                WalkEvent::Leave(b),
                WalkEvent::Leave(block),
            ]
        );
    }
}
