//! The IR data model
//!
//! A strongly-typed, in-memory representation of the intermediate
//! language: a recursive type algebra, shared-identity variables, fifteen
//! instruction kinds, and the containment hierarchy program → function →
//! basic block → instruction with consistent parent back-links.

mod block;
mod builder;
mod function;
mod inst;
mod program;
mod types;
mod value;

pub use block::{BasicBlock, BlockRef};
pub use builder::Builder;
pub use function::{FuncRef, Function};
pub use inst::{
    AddrOfInst, AllocInst, Aop, ArithInst, BranchInst, CallInst, CmpInst, CopyInst, GepInst,
    ICallInst, InstKind, Instruction, JumpInst, LoadInst, Opcode, PhiInst, RetInst, Rop,
    SelectInst, StoreInst,
};
pub use program::{Program, StructFields};
pub use types::{Type, TypeBase};
pub use value::{Operand, VarRef, Variable};
