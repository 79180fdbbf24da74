use std::ops::Index;
use std::sync::{Arc, Weak};

use super::function::{FuncRef, Function};
use super::inst::Instruction;
use crate::visitor::IrVisitor;

/// A shared reference to a [`BasicBlock`]
///
/// Blocks live behind `Arc` so their identity stays stable while functions
/// and programs are assembled around them.
pub type BlockRef = Arc<BasicBlock>;

/// A basic block: a labelled, non-empty sequence of instructions whose last
/// element is a terminator (ret, jump, or branch)
///
/// Construction copies the given instructions and re-parents each copy to
/// the new block. A block built on its own has no parent function until a
/// [`Function`] is built from it (which re-parents the block's contents
/// into a fresh block).
#[derive(Debug)]
pub struct BasicBlock {
    label: String,
    body: Vec<Instruction>,
    parent: Weak<Function>,
}

impl BasicBlock {
    /// Creates a block from a label and instruction sequence; panics on an
    /// empty label or body
    pub fn new(label: impl Into<String>, body: Vec<Instruction>) -> BlockRef {
        Self::with_parent(label.into(), &body, Weak::new())
    }

    /// Creates a block whose parent link points at `parent`, re-parenting
    /// every instruction to the new block
    pub(crate) fn with_parent(
        label: String,
        body: &[Instruction],
        parent: Weak<Function>,
    ) -> BlockRef {
        assert!(!label.is_empty(), "label must be non-empty");
        assert!(!body.is_empty(), "body must be non-empty");

        Arc::new_cyclic(|block| BasicBlock {
            label,
            body: body
                .iter()
                .map(|inst| inst.reparented(block.clone()))
                .collect(),
            parent,
        })
    }

    /// The block's label
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The block's instructions, in execution order
    pub fn body(&self) -> &[Instruction] {
        &self.body
    }

    /// The containing function, if this block has been placed in one
    pub fn parent(&self) -> Option<FuncRef> {
        self.parent.upgrade()
    }

    /// Walks this block: the block callback, every instruction in order,
    /// then the post callback
    pub fn visit<'ir>(&'ir self, visitor: &mut dyn IrVisitor<'ir>) {
        visitor.visit_basic_block(self);

        for inst in &self.body {
            inst.visit(visitor);
        }

        visitor.visit_basic_block_post(self);
    }
}

impl Index<usize> for BasicBlock {
    type Output = Instruction;

    fn index(&self, index: usize) -> &Instruction {
        match self.body.get(index) {
            Some(inst) => inst,
            None => panic!("instruction index out of bounds: {index}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::inst::{Aop, ArithInst, JumpInst, RetInst};
    use crate::ir::types::Type;
    use crate::ir::value::Variable;

    fn arith() -> Instruction {
        ArithInst {
            lhs: Variable::new("x", Type::int()),
            op1: 1.into(),
            op2: 2.into(),
            op: Aop::Add,
        }
        .into()
    }

    #[test]
    fn test_instructions_are_reparented() {
        let block = BasicBlock::new("entry", vec![arith(), RetInst { retval: 0.into() }.into()]);

        for (position, inst) in block.body().iter().enumerate() {
            let parent = inst.parent().expect("instruction should be parented");
            assert!(Arc::ptr_eq(&parent, &block));
            assert_eq!(inst.index(), position as isize);
        }
    }

    #[test]
    fn test_indexing() {
        let block = BasicBlock::new("entry", vec![arith(), JumpInst { label: "exit".into() }.into()]);
        assert_eq!(block[1].as_jump().label, "exit");
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_out_of_bounds_indexing_panics() {
        let block = BasicBlock::new("entry", vec![RetInst { retval: 0.into() }.into()]);
        let _ = &block[3];
    }

    #[test]
    #[should_panic(expected = "label must be non-empty")]
    fn test_empty_label_panics() {
        BasicBlock::new("", vec![RetInst { retval: 0.into() }.into()]);
    }

    #[test]
    #[should_panic(expected = "body must be non-empty")]
    fn test_empty_body_panics() {
        BasicBlock::new("entry", vec![]);
    }
}
