use std::sync::Weak;

use serde::{Deserialize, Serialize};

use super::block::{BasicBlock, BlockRef};
use super::value::{Operand, VarRef};
use crate::visitor::IrVisitor;

/// Arithmetic operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Aop {
    /// Addition (`add`)
    Add,
    /// Subtraction (`sub`)
    Sub,
    /// Multiplication (`mul`)
    Mul,
    /// Division (`div`)
    Div,
}

impl Aop {
    /// The operation's keyword spelling in the textual IR
    pub fn keyword(self) -> &'static str {
        match self {
            Aop::Add => "add",
            Aop::Sub => "sub",
            Aop::Mul => "mul",
            Aop::Div => "div",
        }
    }

    /// Parses a keyword spelling back into an operation
    pub fn from_keyword(keyword: &str) -> Option<Aop> {
        match keyword {
            "add" => Some(Aop::Add),
            "sub" => Some(Aop::Sub),
            "mul" => Some(Aop::Mul),
            "div" => Some(Aop::Div),
            _ => None,
        }
    }
}

/// Relational operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rop {
    /// Equal (`eq`)
    Eq,
    /// Not equal (`neq`)
    Neq,
    /// Less than (`lt`)
    Lt,
    /// Greater than (`gt`)
    Gt,
    /// Less than or equal (`lte`)
    Lte,
    /// Greater than or equal (`gte`)
    Gte,
}

impl Rop {
    /// The operation's keyword spelling in the textual IR
    pub fn keyword(self) -> &'static str {
        match self {
            Rop::Eq => "eq",
            Rop::Neq => "neq",
            Rop::Lt => "lt",
            Rop::Gt => "gt",
            Rop::Lte => "lte",
            Rop::Gte => "gte",
        }
    }

    /// Parses a keyword spelling back into an operation
    pub fn from_keyword(keyword: &str) -> Option<Rop> {
        match keyword {
            "eq" => Some(Rop::Eq),
            "neq" => Some(Rop::Neq),
            "lt" => Some(Rop::Lt),
            "gt" => Some(Rop::Gt),
            "lte" => Some(Rop::Lte),
            "gte" => Some(Rop::Gte),
            _ => None,
        }
    }
}

/// Arithmetic: `lhs = op1 ⊕ op2`
#[derive(Debug, Clone)]
pub struct ArithInst {
    /// The assigned variable
    pub lhs: VarRef,
    /// Left operand
    pub op1: Operand,
    /// Right operand
    pub op2: Operand,
    /// The arithmetic operation
    pub op: Aop,
}

/// Comparison: `lhs` is 1 if the relation holds, 0 otherwise
#[derive(Debug, Clone)]
pub struct CmpInst {
    /// The assigned variable
    pub lhs: VarRef,
    /// Left operand
    pub op1: Operand,
    /// Right operand
    pub op2: Operand,
    /// The relational operation
    pub op: Rop,
}

/// SSA merge: `lhs` is a copy of one operand, selected by the predecessor
/// block execution came from
#[derive(Debug, Clone)]
pub struct PhiInst {
    /// The assigned variable
    pub lhs: VarRef,
    /// One operand per predecessor
    pub ops: Vec<Operand>,
}

/// Copy: `lhs = rhs`
#[derive(Debug, Clone)]
pub struct CopyInst {
    /// The assigned variable
    pub lhs: VarRef,
    /// The copied operand
    pub rhs: Operand,
}

/// Memory allocation: `lhs` receives the address of freshly allocated
/// memory of type `lhs.ty().deref()`; the amount allocated is unspecified
/// (it may be an array)
#[derive(Debug, Clone)]
pub struct AllocInst {
    /// The assigned pointer variable
    pub lhs: VarRef,
}

/// Address-of: `lhs = &rhs`
#[derive(Debug, Clone)]
pub struct AddrOfInst {
    /// The assigned pointer variable
    pub lhs: VarRef,
    /// The variable whose address is taken
    pub rhs: VarRef,
}

/// Load: `lhs = *src`
#[derive(Debug, Clone)]
pub struct LoadInst {
    /// The assigned variable
    pub lhs: VarRef,
    /// The pointer loaded through
    pub src: VarRef,
}

/// Store: `*dst = value`
#[derive(Debug, Clone)]
pub struct StoreInst {
    /// The pointer stored through
    pub dst: VarRef,
    /// The stored operand
    pub value: Operand,
}

/// Get-element-pointer: advance `src_ptr` by `index` elements, then (if
/// `field_name` is non-empty and the element type is a struct) to the named
/// field
#[derive(Debug, Clone)]
pub struct GepInst {
    /// The assigned pointer variable
    pub lhs: VarRef,
    /// The base pointer
    pub src_ptr: VarRef,
    /// Element index
    pub index: Operand,
    /// Field to advance to; empty for plain element arithmetic
    pub field_name: String,
}

/// Ternary select: `lhs = condition ? true_op : false_op`
#[derive(Debug, Clone)]
pub struct SelectInst {
    /// The assigned variable
    pub lhs: VarRef,
    /// The integer condition
    pub condition: Operand,
    /// Value when the condition is non-zero
    pub true_op: Operand,
    /// Value when the condition is zero
    pub false_op: Operand,
}

/// Direct call: `lhs = callee(args)`
#[derive(Debug, Clone)]
pub struct CallInst {
    /// The assigned variable
    pub lhs: VarRef,
    /// Name of the called function; may be externally defined
    pub callee: String,
    /// Call arguments
    pub args: Vec<Operand>,
}

/// Indirect call through a function pointer: `lhs = (*func_ptr)(args)`
#[derive(Debug, Clone)]
pub struct ICallInst {
    /// The assigned variable
    pub lhs: VarRef,
    /// The function pointer called through
    pub func_ptr: VarRef,
    /// Call arguments
    pub args: Vec<Operand>,
}

/// Return from the enclosing function
#[derive(Debug, Clone)]
pub struct RetInst {
    /// The returned operand
    pub retval: Operand,
}

/// Unconditional jump to a basic block of the enclosing function
#[derive(Debug, Clone)]
pub struct JumpInst {
    /// The target block label
    pub label: String,
}

/// Conditional branch to one of two basic blocks of the enclosing function
#[derive(Debug, Clone)]
pub struct BranchInst {
    /// The integer condition
    pub condition: Operand,
    /// Target when the condition is non-zero
    pub label_true: String,
    /// Target when the condition is zero
    pub label_false: String,
}

/// The discriminant of an [`Instruction`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    /// Arithmetic
    Arith,
    /// Comparison
    Cmp,
    /// SSA merge
    Phi,
    /// Copy
    Copy,
    /// Memory allocation
    Alloc,
    /// Address-of
    AddrOf,
    /// Load through a pointer
    Load,
    /// Store through a pointer
    Store,
    /// Get-element-pointer
    Gep,
    /// Ternary select
    Select,
    /// Direct call
    Call,
    /// Indirect call
    ICall,
    /// Return
    Ret,
    /// Unconditional jump
    Jump,
    /// Conditional branch
    Branch,
}

impl Opcode {
    /// Whether instructions with this opcode terminate a basic block
    pub fn is_terminator(self) -> bool {
        matches!(self, Opcode::Ret | Opcode::Jump | Opcode::Branch)
    }
}

/// The sum of the fifteen instruction kinds
#[derive(Debug, Clone)]
pub enum InstKind {
    /// Arithmetic
    Arith(ArithInst),
    /// Comparison
    Cmp(CmpInst),
    /// SSA merge
    Phi(PhiInst),
    /// Copy
    Copy(CopyInst),
    /// Memory allocation
    Alloc(AllocInst),
    /// Address-of
    AddrOf(AddrOfInst),
    /// Load
    Load(LoadInst),
    /// Store
    Store(StoreInst),
    /// Get-element-pointer
    Gep(GepInst),
    /// Ternary select
    Select(SelectInst),
    /// Direct call
    Call(CallInst),
    /// Indirect call
    ICall(ICallInst),
    /// Return
    Ret(RetInst),
    /// Unconditional jump
    Jump(JumpInst),
    /// Conditional branch
    Branch(BranchInst),
}

/// A program instruction: one of the fifteen kinds plus an optional link to
/// the basic block that contains it
///
/// An instruction built directly (or parsed on its own) is unattached:
/// `parent()` is `None` and `index()` is −1. Placing it into a basic block
/// re-parents a copy; the original stays unattached.
#[derive(Debug, Clone)]
pub struct Instruction {
    kind: InstKind,
    parent: Weak<BasicBlock>,
}

impl Instruction {
    /// Creates an unattached instruction
    pub fn new(kind: InstKind) -> Instruction {
        Instruction {
            kind,
            parent: Weak::new(),
        }
    }

    /// Copies this instruction with a new parent block
    pub(crate) fn reparented(&self, parent: Weak<BasicBlock>) -> Instruction {
        Instruction {
            kind: self.kind.clone(),
            parent,
        }
    }

    /// The instruction's kind, for pattern-matching dispatch
    pub fn kind(&self) -> &InstKind {
        &self.kind
    }

    /// The instruction's opcode
    pub fn opcode(&self) -> Opcode {
        match self.kind {
            InstKind::Arith(_) => Opcode::Arith,
            InstKind::Cmp(_) => Opcode::Cmp,
            InstKind::Phi(_) => Opcode::Phi,
            InstKind::Copy(_) => Opcode::Copy,
            InstKind::Alloc(_) => Opcode::Alloc,
            InstKind::AddrOf(_) => Opcode::AddrOf,
            InstKind::Load(_) => Opcode::Load,
            InstKind::Store(_) => Opcode::Store,
            InstKind::Gep(_) => Opcode::Gep,
            InstKind::Select(_) => Opcode::Select,
            InstKind::Call(_) => Opcode::Call,
            InstKind::ICall(_) => Opcode::ICall,
            InstKind::Ret(_) => Opcode::Ret,
            InstKind::Jump(_) => Opcode::Jump,
            InstKind::Branch(_) => Opcode::Branch,
        }
    }

    /// The containing basic block, if the instruction has been placed
    pub fn parent(&self) -> Option<BlockRef> {
        self.parent.upgrade()
    }

    /// The instruction's position within its containing basic block, or −1
    /// if it is unattached
    pub fn index(&self) -> isize {
        let Some(block) = self.parent.upgrade() else {
            return -1;
        };
        block
            .body()
            .iter()
            .position(|inst| std::ptr::eq(inst, self))
            .map_or(-1, |index| index as isize)
    }

    /// Walks this instruction: the generic callback, then the kind-specific
    /// one, then the generic post callback
    pub fn visit<'ir>(&'ir self, visitor: &mut dyn IrVisitor<'ir>) {
        visitor.visit_inst(self);

        match &self.kind {
            InstKind::Arith(inst) => visitor.visit_arith(inst),
            InstKind::Cmp(inst) => visitor.visit_cmp(inst),
            InstKind::Phi(inst) => visitor.visit_phi(inst),
            InstKind::Copy(inst) => visitor.visit_copy(inst),
            InstKind::Alloc(inst) => visitor.visit_alloc(inst),
            InstKind::AddrOf(inst) => visitor.visit_addrof(inst),
            InstKind::Load(inst) => visitor.visit_load(inst),
            InstKind::Store(inst) => visitor.visit_store(inst),
            InstKind::Gep(inst) => visitor.visit_gep(inst),
            InstKind::Select(inst) => visitor.visit_select(inst),
            InstKind::Call(inst) => visitor.visit_call(inst),
            InstKind::ICall(inst) => visitor.visit_icall(inst),
            InstKind::Ret(inst) => visitor.visit_ret(inst),
            InstKind::Jump(inst) => visitor.visit_jump(inst),
            InstKind::Branch(inst) => visitor.visit_branch(inst),
        }

        visitor.visit_inst_post(self);
    }

    /// The held arith instruction; panics on any other kind
    pub fn as_arith(&self) -> &ArithInst {
        match &self.kind {
            InstKind::Arith(inst) => inst,
            _ => panic!("instruction is not an arith instruction"),
        }
    }

    /// The held cmp instruction; panics on any other kind
    pub fn as_cmp(&self) -> &CmpInst {
        match &self.kind {
            InstKind::Cmp(inst) => inst,
            _ => panic!("instruction is not a cmp instruction"),
        }
    }

    /// The held phi instruction; panics on any other kind
    pub fn as_phi(&self) -> &PhiInst {
        match &self.kind {
            InstKind::Phi(inst) => inst,
            _ => panic!("instruction is not a phi instruction"),
        }
    }

    /// The held copy instruction; panics on any other kind
    pub fn as_copy(&self) -> &CopyInst {
        match &self.kind {
            InstKind::Copy(inst) => inst,
            _ => panic!("instruction is not a copy instruction"),
        }
    }

    /// The held alloc instruction; panics on any other kind
    pub fn as_alloc(&self) -> &AllocInst {
        match &self.kind {
            InstKind::Alloc(inst) => inst,
            _ => panic!("instruction is not an alloc instruction"),
        }
    }

    /// The held addrof instruction; panics on any other kind
    pub fn as_addrof(&self) -> &AddrOfInst {
        match &self.kind {
            InstKind::AddrOf(inst) => inst,
            _ => panic!("instruction is not an addrof instruction"),
        }
    }

    /// The held load instruction; panics on any other kind
    pub fn as_load(&self) -> &LoadInst {
        match &self.kind {
            InstKind::Load(inst) => inst,
            _ => panic!("instruction is not a load instruction"),
        }
    }

    /// The held store instruction; panics on any other kind
    pub fn as_store(&self) -> &StoreInst {
        match &self.kind {
            InstKind::Store(inst) => inst,
            _ => panic!("instruction is not a store instruction"),
        }
    }

    /// The held gep instruction; panics on any other kind
    pub fn as_gep(&self) -> &GepInst {
        match &self.kind {
            InstKind::Gep(inst) => inst,
            _ => panic!("instruction is not a gep instruction"),
        }
    }

    /// The held select instruction; panics on any other kind
    pub fn as_select(&self) -> &SelectInst {
        match &self.kind {
            InstKind::Select(inst) => inst,
            _ => panic!("instruction is not a select instruction"),
        }
    }

    /// The held call instruction; panics on any other kind
    pub fn as_call(&self) -> &CallInst {
        match &self.kind {
            InstKind::Call(inst) => inst,
            _ => panic!("instruction is not a call instruction"),
        }
    }

    /// The held icall instruction; panics on any other kind
    pub fn as_icall(&self) -> &ICallInst {
        match &self.kind {
            InstKind::ICall(inst) => inst,
            _ => panic!("instruction is not an icall instruction"),
        }
    }

    /// The held ret instruction; panics on any other kind
    pub fn as_ret(&self) -> &RetInst {
        match &self.kind {
            InstKind::Ret(inst) => inst,
            _ => panic!("instruction is not a ret instruction"),
        }
    }

    /// The held jump instruction; panics on any other kind
    pub fn as_jump(&self) -> &JumpInst {
        match &self.kind {
            InstKind::Jump(inst) => inst,
            _ => panic!("instruction is not a jump instruction"),
        }
    }

    /// The held branch instruction; panics on any other kind
    pub fn as_branch(&self) -> &BranchInst {
        match &self.kind {
            InstKind::Branch(inst) => inst,
            _ => panic!("instruction is not a branch instruction"),
        }
    }
}

impl From<ArithInst> for Instruction {
    fn from(inst: ArithInst) -> Instruction {
        Instruction::new(InstKind::Arith(inst))
    }
}

impl From<CmpInst> for Instruction {
    fn from(inst: CmpInst) -> Instruction {
        Instruction::new(InstKind::Cmp(inst))
    }
}

impl From<PhiInst> for Instruction {
    fn from(inst: PhiInst) -> Instruction {
        Instruction::new(InstKind::Phi(inst))
    }
}

impl From<CopyInst> for Instruction {
    fn from(inst: CopyInst) -> Instruction {
        Instruction::new(InstKind::Copy(inst))
    }
}

impl From<AllocInst> for Instruction {
    fn from(inst: AllocInst) -> Instruction {
        Instruction::new(InstKind::Alloc(inst))
    }
}

impl From<AddrOfInst> for Instruction {
    fn from(inst: AddrOfInst) -> Instruction {
        Instruction::new(InstKind::AddrOf(inst))
    }
}

impl From<LoadInst> for Instruction {
    fn from(inst: LoadInst) -> Instruction {
        Instruction::new(InstKind::Load(inst))
    }
}

impl From<StoreInst> for Instruction {
    fn from(inst: StoreInst) -> Instruction {
        Instruction::new(InstKind::Store(inst))
    }
}

impl From<GepInst> for Instruction {
    fn from(inst: GepInst) -> Instruction {
        Instruction::new(InstKind::Gep(inst))
    }
}

impl From<SelectInst> for Instruction {
    fn from(inst: SelectInst) -> Instruction {
        Instruction::new(InstKind::Select(inst))
    }
}

impl From<CallInst> for Instruction {
    fn from(inst: CallInst) -> Instruction {
        Instruction::new(InstKind::Call(inst))
    }
}

impl From<ICallInst> for Instruction {
    fn from(inst: ICallInst) -> Instruction {
        Instruction::new(InstKind::ICall(inst))
    }
}

impl From<RetInst> for Instruction {
    fn from(inst: RetInst) -> Instruction {
        Instruction::new(InstKind::Ret(inst))
    }
}

impl From<JumpInst> for Instruction {
    fn from(inst: JumpInst) -> Instruction {
        Instruction::new(InstKind::Jump(inst))
    }
}

impl From<BranchInst> for Instruction {
    fn from(inst: BranchInst) -> Instruction {
        Instruction::new(InstKind::Branch(inst))
    }
}
