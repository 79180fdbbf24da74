use std::collections::BTreeMap;
use std::ops::Index;
use std::sync::Arc;

use super::block::{BasicBlock, BlockRef};
use super::types::Type;
use super::value::VarRef;
use crate::visitor::IrVisitor;

/// A shared reference to a [`Function`]
pub type FuncRef = Arc<Function>;

/// A function: a name, return type, parameter list, and a label-keyed map
/// of basic blocks
///
/// The block map is ordered by label, which the pretty-printer and the
/// traversal rely on. Every well-formed function contains a block labelled
/// `entry`; the verifier enforces this.
#[derive(Debug)]
pub struct Function {
    name: String,
    return_type: Type,
    parameters: Vec<VarRef>,
    body: BTreeMap<String, BlockRef>,
}

impl Function {
    /// Creates a function from its parts, re-parenting every block (and the
    /// blocks' instructions) to the new function
    ///
    /// Panics on an empty name or body, or on duplicate block labels.
    pub fn new(
        name: impl Into<String>,
        return_type: Type,
        parameters: Vec<VarRef>,
        body: Vec<BlockRef>,
    ) -> FuncRef {
        let name = name.into();
        assert!(!name.is_empty(), "name must be non-empty");
        assert!(!body.is_empty(), "body must be non-empty");

        Arc::new_cyclic(|func| {
            let mut blocks = BTreeMap::new();
            for block in body {
                let label = block.label().to_string();
                let replaced = blocks.insert(
                    label.clone(),
                    BasicBlock::with_parent(label, block.body(), func.clone()),
                );
                assert!(
                    replaced.is_none(),
                    "cannot have duplicate basic block labels"
                );
            }

            Function {
                name,
                return_type,
                parameters,
                body: blocks,
            }
        })
    }

    /// The function's name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The function's return type
    pub fn return_type(&self) -> &Type {
        &self.return_type
    }

    /// The function's parameters, in declaration order
    pub fn parameters(&self) -> &[VarRef] {
        &self.parameters
    }

    /// The function's basic blocks, keyed and ordered by label
    pub fn body(&self) -> &BTreeMap<String, BlockRef> {
        &self.body
    }

    /// Walks this function: the function callback, every block in label
    /// order, then the post callback
    pub fn visit<'ir>(&'ir self, visitor: &mut dyn IrVisitor<'ir>) {
        visitor.visit_function(self);

        for block in self.body.values() {
            block.visit(visitor);
        }

        visitor.visit_function_post(self);
    }
}

impl Index<&str> for Function {
    type Output = BasicBlock;

    fn index(&self, label: &str) -> &BasicBlock {
        match self.body.get(label) {
            Some(block) => block,
            None => panic!("unknown basic block label: {label}"),
        }
    }
}
