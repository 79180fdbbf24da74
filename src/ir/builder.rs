use std::collections::BTreeMap;

use super::block::{BasicBlock, BlockRef};
use super::function::{FuncRef, Function};
use super::inst::Instruction;
use super::program::{Program, StructFields};
use super::types::Type;
use super::value::VarRef;
use crate::error::Result;

/// A chainable builder for assembling programs piece by piece
///
/// Struct types, functions, basic blocks, and instructions are added in
/// order; starting a new function (or finalizing the program) finalizes
/// whatever block and function are in progress. Misuse — adding parts
/// outside their container, or finalizing with nothing started — panics.
/// [`finalize_program`](Builder::finalize_program) constructs a
/// [`Program`], which runs verification.
///
/// ```
/// use lir::ir::{Builder, CopyInst, RetInst, Type, Variable};
///
/// # fn main() -> lir::Result<()> {
/// let x = Variable::new("x", Type::int());
/// let program = Builder::new()
///     .start_function("main", Type::int())
///     .start_basic_block("entry")
///     .add_instruction(CopyInst { lhs: x.clone(), rhs: 1.into() })
///     .add_instruction(RetInst { retval: x.into() })
///     .finalize_program()?;
/// assert!(program.functions().contains_key("main"));
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct Builder {
    struct_types: BTreeMap<String, StructFields>,
    functions: Vec<FuncRef>,
    curr_function: Option<PendingFunction>,
    curr_block: Option<PendingBlock>,
}

struct PendingFunction {
    name: String,
    return_type: Type,
    parameters: Vec<VarRef>,
    body: Vec<BlockRef>,
}

struct PendingBlock {
    label: String,
    body: Vec<Instruction>,
}

impl Builder {
    /// Creates an empty builder
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Adds a struct type to the program; panics on a duplicate name or
    /// empty field map
    pub fn add_struct_type(mut self, name: impl Into<String>, fields: StructFields) -> Builder {
        let name = name.into();
        assert!(
            !self.struct_types.contains_key(&name),
            "Struct type name already exists: {name}"
        );
        assert!(!fields.is_empty(), "Structs must have at least one field");
        self.struct_types.insert(name, fields);
        self
    }

    /// Starts a new function, finalizing any function in progress
    pub fn start_function(mut self, name: impl Into<String>, return_type: Type) -> Builder {
        let name = name.into();
        assert!(!name.is_empty(), "Function name must be non-empty");

        if self.curr_block.is_some() {
            self.finalize_block();
            self.finalize_function();
        }

        self.curr_function = Some(PendingFunction {
            name,
            return_type,
            parameters: Vec::new(),
            body: Vec::new(),
        });
        self
    }

    /// Adds a parameter to the function in progress; panics outside a
    /// function
    pub fn add_parameter(mut self, param: VarRef) -> Builder {
        match self.curr_function.as_mut() {
            Some(function) => function.parameters.push(param),
            None => panic!("Cannot add a parameter outside of a function: {param}"),
        }
        self
    }

    /// Starts a new basic block in the function in progress, finalizing any
    /// block in progress; panics outside a function or on an empty label
    pub fn start_basic_block(mut self, label: impl Into<String>) -> Builder {
        let label = label.into();
        assert!(!label.is_empty(), "Basic block label must be non-empty");
        assert!(
            self.curr_function.is_some(),
            "Can't start a basic block outside of a function: {label}"
        );

        if self.curr_block.is_some() {
            self.finalize_block();
        }

        self.curr_block = Some(PendingBlock {
            label,
            body: Vec::new(),
        });
        self
    }

    /// Adds an instruction to the block in progress; panics outside a block
    pub fn add_instruction(mut self, inst: impl Into<Instruction>) -> Builder {
        let inst = inst.into();
        match self.curr_block.as_mut() {
            Some(block) => block.body.push(inst),
            None => panic!(
                "Cannot add an instruction outside a basic block: {}",
                inst.to_string().trim_end()
            ),
        }
        self
    }

    /// Finalizes everything in progress and builds the verified program
    pub fn finalize_program(mut self) -> Result<Program> {
        self.finalize_block();
        self.finalize_function();
        Program::new(self.struct_types, self.functions)
    }

    fn finalize_block(&mut self) {
        let Some(block) = self.curr_block.take() else {
            panic!("Cannot finalize a nonexistent basic block");
        };
        let Some(function) = self.curr_function.as_mut() else {
            panic!("Cannot finalize a basic block outside of a function");
        };
        function.body.push(BasicBlock::new(block.label, block.body));
    }

    fn finalize_function(&mut self) {
        let Some(function) = self.curr_function.take() else {
            panic!("Cannot finalize a nonexistent function");
        };
        self.functions.push(Function::new(
            function.name,
            function.return_type,
            function.parameters,
            function.body,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{AllocInst, Aop, ArithInst, JumpInst, RetInst, Variable};

    #[test]
    fn test_builds_a_multi_function_program() {
        let x = Variable::new("x", Type::int());
        let p = Variable::new("p", Type::int().ptr_to());

        let mut fields = StructFields::new();
        fields.insert("value".to_string(), Type::int());

        let program = Builder::new()
            .add_struct_type("box", fields)
            .start_function("helper", Type::int())
            .start_basic_block("entry")
            .add_instruction(RetInst { retval: 7.into() })
            .start_function("main", Type::int())
            .start_basic_block("entry")
            .add_instruction(ArithInst {
                lhs: x.clone(),
                op1: 1.into(),
                op2: 2.into(),
                op: Aop::Add,
            })
            .add_instruction(AllocInst { lhs: p })
            .add_instruction(JumpInst {
                label: "exit".to_string(),
            })
            .start_basic_block("exit")
            .add_instruction(RetInst { retval: x.into() })
            .finalize_program()
            .unwrap();

        assert_eq!(program.functions().len(), 2);
        assert_eq!(program.struct_types().len(), 1);
        assert_eq!(program["main"].body().len(), 2);
        assert_eq!(program["helper"]["entry"].body().len(), 1);
    }

    #[test]
    #[should_panic(expected = "Cannot add a parameter outside of a function")]
    fn test_parameter_outside_function_panics() {
        Builder::new().add_parameter(Variable::new("x", Type::int()));
    }

    #[test]
    #[should_panic(expected = "Can't start a basic block outside of a function")]
    fn test_block_outside_function_panics() {
        Builder::new().start_basic_block("entry");
    }

    #[test]
    #[should_panic(expected = "Cannot add an instruction outside a basic block")]
    fn test_instruction_outside_block_panics() {
        Builder::new()
            .start_function("main", Type::int())
            .add_instruction(RetInst { retval: 0.into() });
    }

    #[test]
    #[should_panic(expected = "Cannot finalize a nonexistent basic block")]
    fn test_finalize_with_nothing_started_panics() {
        let _ = Builder::new().finalize_program();
    }

    #[test]
    #[should_panic(expected = "Struct type name already exists")]
    fn test_duplicate_struct_panics() {
        let mut fields = StructFields::new();
        fields.insert("f".to_string(), Type::int());
        Builder::new()
            .add_struct_type("s", fields.clone())
            .add_struct_type("s", fields);
    }

    #[test]
    fn test_finalize_runs_verification() {
        // The block never terminates, so the program must not come back.
        let x = Variable::new("x", Type::int());
        let err = Builder::new()
            .start_function("main", Type::int())
            .start_basic_block("entry")
            .add_instruction(ArithInst {
                lhs: x,
                op1: 1.into(),
                op2: 2.into(),
                op: Aop::Add,
            })
            .finalize_program()
            .unwrap_err();

        assert!(err
            .to_string()
            .contains("does not end in a terminator instruction"));
    }
}
