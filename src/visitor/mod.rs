//! Traversal framework for the IR
//!
//! A traversal walks a program from the most general component to the most
//! specific: program → struct types → functions → basic blocks →
//! instructions → specific instruction kind. The `*_post` callbacks fire
//! after a component's children have all been visited. Every analysis in
//! this crate (the pretty-printer and verifier included) is written against
//! [`IrVisitor`].

use std::io::Write;

use crate::ir::{
    AddrOfInst, AllocInst, ArithInst, BasicBlock, BranchInst, CallInst, CmpInst, CopyInst,
    Function, GepInst, ICallInst, Instruction, JumpInst, LoadInst, PhiInst, Program, RetInst,
    SelectInst, StoreInst, StructFields,
};

/// Callbacks for an IR traversal
///
/// Every method has a default empty body, so a visitor only implements the
/// callbacks it cares about. For each instruction the traversal invokes
/// [`visit_inst`](IrVisitor::visit_inst), then the kind-specific callback,
/// then [`visit_inst_post`](IrVisitor::visit_inst_post).
///
/// The `'ir` lifetime ties the callback arguments to the program being
/// walked, so a visitor may retain references to what it has seen.
pub trait IrVisitor<'ir> {
    /// Called first for the whole program
    fn visit_program(&mut self, _program: &'ir Program) {}
    /// Called after every component of the program has been visited
    fn visit_program_post(&mut self, _program: &'ir Program) {}
    /// Called once per struct type, in name order
    fn visit_struct_type(&mut self, _name: &'ir str, _fields: &'ir StructFields) {}
    /// Called for each function before its blocks, in name order
    fn visit_function(&mut self, _function: &'ir Function) {}
    /// Called after all of a function's blocks have been visited
    fn visit_function_post(&mut self, _function: &'ir Function) {}
    /// Called for each basic block before its instructions, in label order
    fn visit_basic_block(&mut self, _block: &'ir BasicBlock) {}
    /// Called after all of a block's instructions have been visited
    fn visit_basic_block_post(&mut self, _block: &'ir BasicBlock) {}
    /// Called for each instruction before its kind-specific callback
    fn visit_inst(&mut self, _inst: &'ir Instruction) {}
    /// Called for each instruction after its kind-specific callback
    fn visit_inst_post(&mut self, _inst: &'ir Instruction) {}

    /// Called for each arith instruction
    fn visit_arith(&mut self, _inst: &'ir ArithInst) {}
    /// Called for each cmp instruction
    fn visit_cmp(&mut self, _inst: &'ir CmpInst) {}
    /// Called for each phi instruction
    fn visit_phi(&mut self, _inst: &'ir PhiInst) {}
    /// Called for each copy instruction
    fn visit_copy(&mut self, _inst: &'ir CopyInst) {}
    /// Called for each alloc instruction
    fn visit_alloc(&mut self, _inst: &'ir AllocInst) {}
    /// Called for each addrof instruction
    fn visit_addrof(&mut self, _inst: &'ir AddrOfInst) {}
    /// Called for each load instruction
    fn visit_load(&mut self, _inst: &'ir LoadInst) {}
    /// Called for each store instruction
    fn visit_store(&mut self, _inst: &'ir StoreInst) {}
    /// Called for each gep instruction
    fn visit_gep(&mut self, _inst: &'ir GepInst) {}
    /// Called for each select instruction
    fn visit_select(&mut self, _inst: &'ir SelectInst) {}
    /// Called for each call instruction
    fn visit_call(&mut self, _inst: &'ir CallInst) {}
    /// Called for each icall instruction
    fn visit_icall(&mut self, _inst: &'ir ICallInst) {}
    /// Called for each ret instruction
    fn visit_ret(&mut self, _inst: &'ir RetInst) {}
    /// Called for each jump instruction
    fn visit_jump(&mut self, _inst: &'ir JumpInst) {}
    /// Called for each branch instruction
    fn visit_branch(&mut self, _inst: &'ir BranchInst) {}
}

/// A wrapper around some visitor that prints enter/exit markers around
/// every delegated callback
///
/// Useful for seeing exactly which callbacks fire, and in which order, when
/// debugging an analysis. Holds no state beyond the wrapped visitor and the
/// output sink.
pub struct DebugVisitor<'a, 'ir> {
    visitor: &'a mut dyn IrVisitor<'ir>,
    out: &'a mut dyn Write,
}

impl<'a, 'ir> DebugVisitor<'a, 'ir> {
    /// Wraps `visitor`, tracing every call to `out`
    pub fn new(visitor: &'a mut dyn IrVisitor<'ir>, out: &'a mut dyn Write) -> Self {
        DebugVisitor { visitor, out }
    }

    fn trace(&mut self, direction: &str, callback: &str) {
        let _ = writeln!(self.out, "{direction} {callback}");
    }
}

macro_rules! traced {
    ($method:ident, $arg:ty) => {
        fn $method(&mut self, arg: $arg) {
            self.trace("entering", stringify!($method));
            self.visitor.$method(arg);
            self.trace("exiting", stringify!($method));
        }
    };
}

impl<'a, 'ir> IrVisitor<'ir> for DebugVisitor<'a, 'ir> {
    traced!(visit_program, &'ir Program);
    traced!(visit_program_post, &'ir Program);
    traced!(visit_function, &'ir Function);
    traced!(visit_function_post, &'ir Function);
    traced!(visit_basic_block, &'ir BasicBlock);
    traced!(visit_basic_block_post, &'ir BasicBlock);
    traced!(visit_inst, &'ir Instruction);
    traced!(visit_inst_post, &'ir Instruction);
    traced!(visit_arith, &'ir ArithInst);
    traced!(visit_cmp, &'ir CmpInst);
    traced!(visit_phi, &'ir PhiInst);
    traced!(visit_copy, &'ir CopyInst);
    traced!(visit_alloc, &'ir AllocInst);
    traced!(visit_addrof, &'ir AddrOfInst);
    traced!(visit_load, &'ir LoadInst);
    traced!(visit_store, &'ir StoreInst);
    traced!(visit_gep, &'ir GepInst);
    traced!(visit_select, &'ir SelectInst);
    traced!(visit_call, &'ir CallInst);
    traced!(visit_icall, &'ir ICallInst);
    traced!(visit_ret, &'ir RetInst);
    traced!(visit_jump, &'ir JumpInst);
    traced!(visit_branch, &'ir BranchInst);

    fn visit_struct_type(&mut self, name: &'ir str, fields: &'ir StructFields) {
        self.trace("entering", "visit_struct_type");
        self.visitor.visit_struct_type(name, fields);
        self.trace("exiting", "visit_struct_type");
    }
}
