use std::collections::BTreeMap;
use std::ops::Index;

use super::function::{FuncRef, Function};
use super::types::Type;
use super::value::VarRef;
use crate::error::{Error, Result};
use crate::verifier;
use crate::visitor::IrVisitor;

/// The fields of one struct type, keyed and ordered by field name
pub type StructFields = BTreeMap<String, Type>;

/// A whole program: named struct types and named functions
///
/// Construction runs the verifier; a [`Program`] value therefore always
/// satisfies every well-formedness invariant, and callers never see a
/// partially built program. Struct and function maps are ordered by name,
/// which printing and traversal rely on.
#[derive(Debug, Clone)]
pub struct Program {
    struct_types: BTreeMap<String, StructFields>,
    functions: BTreeMap<String, FuncRef>,
    func_ptrs: BTreeMap<String, VarRef>,
}

impl Program {
    /// Creates and verifies a program from a struct table and a function
    /// list
    ///
    /// Fails with [`Error::DuplicateFunction`] when two functions share a
    /// name and with [`Error::Malformed`] (carrying the full report) when
    /// verification finds anything wrong.
    pub fn new(
        struct_types: BTreeMap<String, StructFields>,
        functions: Vec<FuncRef>,
    ) -> Result<Program> {
        let mut function_map = BTreeMap::new();
        for function in functions {
            let name = function.name().to_string();
            if function_map.insert(name.clone(), function).is_some() {
                return Err(Error::DuplicateFunction(name));
            }
        }

        let mut program = Program {
            struct_types,
            functions: function_map,
            func_ptrs: BTreeMap::new(),
        };

        let (report, func_ptrs) = verifier::verify(&program);
        if !report.is_empty() {
            return Err(Error::Malformed(report));
        }

        program.func_ptrs = func_ptrs;
        Ok(program)
    }

    /// The program's struct types: name → (field name → field type)
    pub fn struct_types(&self) -> &BTreeMap<String, StructFields> {
        &self.struct_types
    }

    /// The program's functions, keyed and ordered by name
    pub fn functions(&self) -> &BTreeMap<String, FuncRef> {
        &self.functions
    }

    /// Global function-pointer variables (`@name`), for exactly those
    /// functions whose address is taken somewhere in the program
    pub fn func_ptrs(&self) -> &BTreeMap<String, VarRef> {
        &self.func_ptrs
    }

    /// Walks the program: the program callback, every struct type in name
    /// order, every function in name order, then the post callback
    pub fn visit<'ir>(&'ir self, visitor: &mut dyn IrVisitor<'ir>) {
        visitor.visit_program(self);

        for (name, fields) in &self.struct_types {
            visitor.visit_struct_type(name, fields);
        }

        for function in self.functions.values() {
            function.visit(visitor);
        }

        visitor.visit_program_post(self);
    }
}

impl Index<&str> for Program {
    type Output = Function;

    fn index(&self, name: &str) -> &Function {
        match self.functions.get(name) {
            Some(function) => function,
            None => panic!("unknown function name: {name}"),
        }
    }
}
