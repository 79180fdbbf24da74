use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::ir::{
    AddrOfInst, ArithInst, BasicBlock, BranchInst, CallInst, CmpInst, CopyInst, GepInst,
    ICallInst, Instruction, LoadInst, Operand, PhiInst, Program, RetInst, SelectInst, StoreInst,
    VarRef,
};
use crate::visitor::IrVisitor;

/// The position of an instruction within its function: the containing
/// block's label and the instruction's index within the block
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstSite {
    /// Label of the containing basic block
    pub block: String,
    /// Position within the block's body
    pub index: usize,
}

impl fmt::Display for InstSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.block, self.index)
    }
}

/// The set of variable objects each instruction reads
///
/// Instructions that read no variables have no entry.
pub type Solution = HashMap<InstSite, HashSet<VarRef>>;

/// A trivial analysis that maps each instruction of a function to the set
/// of variables the instruction reads
///
/// This is the seed example for writing analyses against the visitor: the
/// generic callback tracks the current instruction site and the kind
/// callbacks record the operands that count as reads.
pub struct InstToVars<'p> {
    program: &'p Program,
}

impl<'p> InstToVars<'p> {
    /// Creates the analysis over `program`
    pub fn new(program: &'p Program) -> InstToVars<'p> {
        InstToVars { program }
    }

    /// Analyzes the named function and returns its solution; panics if the
    /// function does not exist
    pub fn analyze(&self, function_name: &str) -> Solution {
        let function = &self.program[function_name];

        let mut visitor = ReadSets::default();
        function.visit(&mut visitor);
        visitor.solution
    }
}

/// Visitor collecting, per instruction site, the variables read there.
#[derive(Default)]
struct ReadSets {
    solution: Solution,
    block_label: String,
    next_index: usize,
    site: Option<InstSite>,
}

impl ReadSets {
    fn read_var(&mut self, var: &VarRef) {
        if let Some(site) = &self.site {
            self.solution
                .entry(site.clone())
                .or_default()
                .insert(var.clone());
        }
    }

    fn read_operand(&mut self, op: &Operand) {
        if let Operand::Var(var) = op {
            self.read_var(var);
        }
    }
}

impl<'ir> IrVisitor<'ir> for ReadSets {
    fn visit_basic_block(&mut self, block: &'ir BasicBlock) {
        self.block_label = block.label().to_string();
        self.next_index = 0;
    }

    fn visit_inst(&mut self, _inst: &'ir Instruction) {
        self.site = Some(InstSite {
            block: self.block_label.clone(),
            index: self.next_index,
        });
        self.next_index += 1;
    }

    fn visit_arith(&mut self, inst: &'ir ArithInst) {
        self.read_operand(&inst.op1);
        self.read_operand(&inst.op2);
    }

    fn visit_cmp(&mut self, inst: &'ir CmpInst) {
        self.read_operand(&inst.op1);
        self.read_operand(&inst.op2);
    }

    fn visit_phi(&mut self, inst: &'ir PhiInst) {
        for op in &inst.ops {
            self.read_operand(op);
        }
    }

    fn visit_copy(&mut self, inst: &'ir CopyInst) {
        self.read_operand(&inst.rhs);
    }

    // alloc and jump read nothing.

    fn visit_addrof(&mut self, inst: &'ir AddrOfInst) {
        self.read_var(&inst.rhs);
    }

    fn visit_load(&mut self, inst: &'ir LoadInst) {
        self.read_var(&inst.src);
    }

    fn visit_store(&mut self, inst: &'ir StoreInst) {
        self.read_var(&inst.dst);
        self.read_operand(&inst.value);
    }

    fn visit_gep(&mut self, inst: &'ir GepInst) {
        self.read_var(&inst.src_ptr);
        self.read_operand(&inst.index);
    }

    fn visit_select(&mut self, inst: &'ir SelectInst) {
        self.read_operand(&inst.condition);
        self.read_operand(&inst.true_op);
        self.read_operand(&inst.false_op);
    }

    fn visit_call(&mut self, inst: &'ir CallInst) {
        for arg in &inst.args {
            self.read_operand(arg);
        }
    }

    fn visit_icall(&mut self, inst: &'ir ICallInst) {
        for arg in &inst.args {
            self.read_operand(arg);
        }
    }

    fn visit_ret(&mut self, inst: &'ir RetInst) {
        self.read_operand(&inst.retval);
    }

    fn visit_branch(&mut self, inst: &'ir BranchInst) {
        self.read_operand(&inst.condition);
    }
}
