//! Well-formedness verification for programs
//!
//! A single traversal that checks every structural and typing invariant,
//! accumulating one line of error text per offense instead of stopping at
//! the first. [`crate::ir::Program`] construction runs this pass and
//! aborts with the full report when anything is wrong, so an existing
//! program is always well-formed.

use std::collections::{BTreeMap, HashSet};

use crate::ir::{
    AddrOfInst, AllocInst, ArithInst, BasicBlock, BranchInst, CallInst, CmpInst, CopyInst,
    Function, GepInst, ICallInst, Instruction, JumpInst, LoadInst, Operand, PhiInst, Program,
    RetInst, SelectInst, StoreInst, StructFields, Type, TypeBase, VarRef,
};
use crate::visitor::IrVisitor;

/// Runs the verifier over `program`
///
/// Returns the accumulated error report (empty when the program is
/// well-formed) and the global function-pointer map collected along the
/// way, which the program caches on success.
pub(crate) fn verify(program: &Program) -> (String, BTreeMap<String, VarRef>) {
    let mut verifier = Verifier {
        program,
        errors: Vec::new(),
        curr_function: None,
        curr_block: None,
        curr_inst: None,
        block_id: String::new(),
        missing_structs: HashSet::new(),
        func_ptrs: BTreeMap::new(),
    };

    program.visit(&mut verifier);

    (verifier.errors.join("\n"), verifier.func_ptrs)
}

struct Verifier<'ir> {
    program: &'ir Program,
    errors: Vec<String>,
    curr_function: Option<&'ir Function>,
    curr_block: Option<&'ir BasicBlock>,
    curr_inst: Option<&'ir Instruction>,
    // "function::label" of the block being visited, for block-level errors.
    block_id: String,
    // Missing struct names already reported, so each is reported once.
    missing_structs: HashSet<String>,
    func_ptrs: BTreeMap<String, VarRef>,
}

impl<'ir> Verifier<'ir> {
    fn error(&mut self, message: String) {
        self.errors.push(message);
    }

    /// The textual form of the instruction currently being checked
    fn inst_text(&self) -> String {
        self.curr_inst
            .map(|inst| inst.to_string().trim_end().to_string())
            .unwrap_or_default()
    }

    fn curr_function_name(&self) -> &str {
        self.curr_function.map_or("", |function| function.name())
    }

    fn report_if_missing_struct(&mut self, ty: &Type) {
        if let TypeBase::Struct(name) = ty.base() {
            if !self.program.struct_types().contains_key(name)
                && self.missing_structs.insert(name.clone())
            {
                self.error(format!("Type uses nonexistent struct: {name}"));
            }
        }
    }

    /// Top-level values (held in a variable rather than in memory) can only
    /// be integers or pointers.
    fn report_if_not_toplevel(&mut self, ty: &Type) {
        if !ty.is_int() && !ty.is_ptr() {
            self.error(format!("Top-level types must be int or pointer: {ty}"));
        }
    }

    /// `@`-variables are assigned by the runtime and never written.
    fn report_if_unassignable(&mut self, var: &VarRef) {
        if var.is_global() {
            self.error(
                "Variables starting with '@' are special and cannot be assigned to or stored into"
                    .to_string(),
            );
        }
    }

    /// Checks that a global variable is used properly and remembers global
    /// function pointers. One function name must map to one variable object
    /// across the whole program.
    fn check_global_var(&mut self, var: &VarRef) {
        if !var.is_global() || var.name() == "@nullptr" {
            return;
        }
        let fun_name = var.name()[1..].to_string();

        if !self.program.functions().contains_key(&fun_name) {
            self.error(format!(
                "Global function pointer doesn't point to a real function: {var}"
            ));
        }

        match self.func_ptrs.get(&fun_name) {
            Some(existing) if existing != var => {
                let existing = existing.clone();
                self.error(format!(
                    "Global function pointers for same function but different variable objects: \
                     {var} and {existing}"
                ));
            }
            Some(_) => {}
            None => {
                self.func_ptrs.insert(fun_name, var.clone());
            }
        }
    }

    fn check_global(&mut self, op: &Operand) {
        if let Operand::Var(var) = op {
            self.check_global_var(var);
        }
    }
}

impl<'ir> IrVisitor<'ir> for Verifier<'ir> {
    fn visit_program(&mut self, program: &'ir Program) {
        if !program.functions().contains_key("main") {
            self.error("Program does not have a main function.".to_string());
        }

        for (name, function) in program.functions() {
            if name != function.name() {
                self.error(format!(
                    "Mismatched function names: {} mapped to {}",
                    name,
                    function.name()
                ));
            }
        }
    }

    fn visit_struct_type(&mut self, name: &'ir str, fields: &'ir StructFields) {
        if name.contains('.') {
            self.error(format!("struct type name can't contain '.': {name}"));
        }
        if fields.is_empty() {
            self.error(format!("Struct type can't have empty fields: {name}"));
        }
        for (field, ty) in fields {
            if field.is_empty() {
                self.error(format!("Struct field names must be non-empty: {name}.{field}"));
            }
            if field.contains('.') {
                self.error(format!("struct field name can't contain '.': {name}.{field}"));
            }
            self.report_if_missing_struct(ty);
        }
    }

    fn visit_function(&mut self, function: &'ir Function) {
        self.curr_function = Some(function);

        if !function.body().contains_key("entry") {
            self.error(format!(
                "Function must have a basic block named 'entry': {}",
                function.name()
            ));
        }

        for (label, block) in function.body() {
            if label != block.label() {
                self.error(format!(
                    "Mismatched basic block labels: {} mapped to {}",
                    label,
                    block.label()
                ));
            }
        }

        let mut params: HashSet<VarRef> = HashSet::new();
        for param in function.parameters() {
            if !params.insert(param.clone()) {
                self.error(format!(
                    "Duplicate parameter variables for function {}",
                    function.name()
                ));
            }

            if param.is_global() {
                self.error(format!(
                    "Cannot use global variable as parameter in function {}",
                    function.name()
                ));
            }

            self.report_if_missing_struct(param.ty());
            self.report_if_not_toplevel(param.ty());
        }

        self.report_if_not_toplevel(function.return_type());
    }

    fn visit_basic_block(&mut self, block: &'ir BasicBlock) {
        self.curr_block = Some(block);
        self.block_id = format!("{}::{}", self.curr_function_name(), block.label());

        let body = block.body();
        if !body[body.len() - 1].opcode().is_terminator() {
            let id = self.block_id.clone();
            self.error(format!(
                "Basic block does not end in a terminator instruction: {id}"
            ));
        }

        for inst in &body[..body.len() - 1] {
            if inst.opcode().is_terminator() {
                let id = self.block_id.clone();
                self.error(format!(
                    "Basic block contains a terminator instruction before its end: {id}"
                ));
                break;
            }
        }

        match block.parent() {
            None => {
                let id = self.block_id.clone();
                self.error(format!("Basic block's parent pointer isn't set: {id}"));
            }
            Some(parent) => {
                let matches_function = self
                    .curr_function
                    .is_some_and(|function| std::ptr::eq(parent.as_ref(), function));
                if !matches_function {
                    let id = self.block_id.clone();
                    self.error(format!(
                        "Basic block's parent doesn't match containing function: {id}"
                    ));
                }
            }
        }
    }

    fn visit_inst(&mut self, inst: &'ir Instruction) {
        self.curr_inst = Some(inst);

        match inst.parent() {
            None => self.error("Instruction's parent pointer isn't set".to_string()),
            Some(parent) => {
                let matches_block = self
                    .curr_block
                    .is_some_and(|block| std::ptr::eq(parent.as_ref(), block));
                if !matches_block {
                    let label = self.curr_block.map_or("", |block| block.label()).to_string();
                    self.error(format!(
                        "Instruction's parent pointer doesn't match containing basic block: {label}"
                    ));
                }
            }
        }
    }

    fn visit_arith(&mut self, inst: &'ir ArithInst) {
        self.report_if_missing_struct(inst.lhs.ty());
        self.report_if_missing_struct(inst.op1.ty());
        self.report_if_missing_struct(inst.op2.ty());

        self.check_global_var(&inst.lhs);
        self.check_global(&inst.op1);
        self.check_global(&inst.op2);

        if !inst.lhs.ty().is_int() {
            let text = self.inst_text();
            self.error(format!(
                "Type error: result of arithmetic must be an int: {text}"
            ));
        }

        for op in [&inst.op1, &inst.op2] {
            if !op.ty().is_int() {
                let text = self.inst_text();
                self.error(format!(
                    "Type error: operand of arithmetic must be an int: {text}"
                ));
            }
        }
    }

    fn visit_cmp(&mut self, inst: &'ir CmpInst) {
        self.report_if_missing_struct(inst.lhs.ty());
        self.report_if_missing_struct(inst.op1.ty());
        self.report_if_missing_struct(inst.op2.ty());

        self.check_global_var(&inst.lhs);
        self.check_global(&inst.op1);
        self.check_global(&inst.op2);

        if !inst.lhs.ty().is_int() {
            let text = self.inst_text();
            self.error(format!(
                "Type error: result of comparison must be an int: {text}"
            ));
        }

        for op in [&inst.op1, &inst.op2] {
            if !op.ty().is_int() && !op.ty().is_ptr() {
                let text = self.inst_text();
                self.error(format!(
                    "Type error: operand of comparison must be an int or pointer: {text}"
                ));
            }
        }
    }

    fn visit_phi(&mut self, inst: &'ir PhiInst) {
        self.report_if_missing_struct(inst.lhs.ty());
        self.check_global_var(&inst.lhs);

        for op in &inst.ops {
            self.report_if_missing_struct(op.ty());
            self.check_global(op);

            if op.ty() != inst.lhs.ty() {
                let text = self.inst_text();
                self.error(format!(
                    "Type error: operand type doesn't match left-hand side: {text}"
                ));
            }
        }

        self.report_if_not_toplevel(inst.lhs.ty());
        self.report_if_unassignable(&inst.lhs);
    }

    fn visit_copy(&mut self, inst: &'ir CopyInst) {
        self.report_if_missing_struct(inst.lhs.ty());
        self.report_if_missing_struct(inst.rhs.ty());

        self.check_global_var(&inst.lhs);
        self.check_global(&inst.rhs);

        if inst.rhs.ty() != inst.lhs.ty() {
            let text = self.inst_text();
            self.error(format!(
                "Type error: operand type doesn't match left-hand side: {text}"
            ));
        }

        self.report_if_not_toplevel(inst.lhs.ty());
        self.report_if_unassignable(&inst.lhs);
    }

    fn visit_alloc(&mut self, inst: &'ir AllocInst) {
        self.report_if_missing_struct(inst.lhs.ty());
        self.check_global_var(&inst.lhs);

        if !inst.lhs.ty().is_ptr() {
            let text = self.inst_text();
            self.error(format!(
                "Type error: result of alloc must be a pointer: {text}"
            ));
        }

        self.report_if_unassignable(&inst.lhs);
    }

    fn visit_addrof(&mut self, inst: &'ir AddrOfInst) {
        self.report_if_missing_struct(inst.lhs.ty());
        self.report_if_missing_struct(inst.rhs.ty());

        self.check_global_var(&inst.lhs);
        self.check_global_var(&inst.rhs);

        if !inst.lhs.ty().is_ptr() || inst.lhs.ty().deref() != *inst.rhs.ty() {
            let text = self.inst_text();
            self.error(format!(
                "Type error: result of addrof must be a pointer to operand type: {text}"
            ));
        }

        self.report_if_unassignable(&inst.lhs);
    }

    fn visit_load(&mut self, inst: &'ir LoadInst) {
        self.report_if_missing_struct(inst.lhs.ty());
        self.report_if_missing_struct(inst.src.ty());

        self.check_global_var(&inst.lhs);
        self.check_global_var(&inst.src);

        if inst.lhs.ty().ptr_to() != *inst.src.ty() {
            let text = self.inst_text();
            self.error(format!(
                "Type error: source of load must be a pointer to type of result: {text}"
            ));
        }

        self.report_if_not_toplevel(inst.lhs.ty());
        self.report_if_unassignable(&inst.lhs);
    }

    fn visit_store(&mut self, inst: &'ir StoreInst) {
        self.report_if_missing_struct(inst.dst.ty());
        self.report_if_missing_struct(inst.value.ty());

        self.check_global_var(&inst.dst);
        self.check_global(&inst.value);

        if inst.value.ty().ptr_to() != *inst.dst.ty() {
            let text = self.inst_text();
            self.error(format!(
                "Type error: destination of store must be a pointer to type of stored value: {text}"
            ));
        }

        self.report_if_unassignable(&inst.dst);
    }

    fn visit_gep(&mut self, inst: &'ir GepInst) {
        self.report_if_missing_struct(inst.lhs.ty());
        self.report_if_missing_struct(inst.src_ptr.ty());
        self.report_if_missing_struct(inst.index.ty());

        self.check_global_var(&inst.lhs);
        self.check_global_var(&inst.src_ptr);
        self.check_global(&inst.index);

        if !inst.index.ty().is_int() {
            self.error("Index must be an integer".to_string());
        }

        if inst.field_name.is_empty() {
            if !inst.src_ptr.ty().is_ptr() {
                let text = self.inst_text();
                self.error(format!("Type error: source must be a pointer: {text}"));
            }

            if inst.lhs.ty() != inst.src_ptr.ty() {
                let text = self.inst_text();
                self.error(format!(
                    "Type error: type of source pointer must match left-hand side: {text}"
                ));
            }

            return;
        }

        if !inst.src_ptr.ty().is_struct_ptr() {
            let text = self.inst_text();
            self.error(format!(
                "Type error: source must be a pointer to a struct: {text}"
            ));
            return;
        }

        // An undefined struct was already reported above; nothing more can
        // be checked against its fields.
        let struct_name = inst.src_ptr.ty().struct_name();
        let Some(fields) = self.program.struct_types().get(struct_name) else {
            return;
        };

        match fields.get(&inst.field_name) {
            None => {
                let text = self.inst_text();
                self.error(format!(
                    "Type error: mismatch between struct type and field name: {text}"
                ));
            }
            Some(field_ty) => {
                if !inst.lhs.ty().is_ptr() || inst.lhs.ty().deref() != *field_ty {
                    let text = self.inst_text();
                    self.error(format!(
                        "Type error: result type must be a pointer to type of field: {text}"
                    ));
                }
            }
        }

        self.report_if_unassignable(&inst.lhs);
    }

    fn visit_select(&mut self, inst: &'ir SelectInst) {
        self.report_if_missing_struct(inst.lhs.ty());
        self.report_if_missing_struct(inst.condition.ty());
        self.report_if_missing_struct(inst.true_op.ty());
        self.report_if_missing_struct(inst.false_op.ty());
        self.report_if_unassignable(&inst.lhs);

        self.check_global_var(&inst.lhs);
        self.check_global(&inst.condition);
        self.check_global(&inst.true_op);
        self.check_global(&inst.false_op);

        if !inst.condition.ty().is_int() {
            let text = self.inst_text();
            self.error(format!("Type error: select condition must be an int: {text}"));
        }
        if inst.lhs.ty() != inst.true_op.ty() || inst.lhs.ty() != inst.false_op.ty() {
            let text = self.inst_text();
            self.error(format!(
                "Type error: type of select operands and left-hand side must match: {text}"
            ));
        }

        self.report_if_not_toplevel(inst.lhs.ty());
    }

    fn visit_call(&mut self, inst: &'ir CallInst) {
        // The callee is allowed to be externally defined (e.g. 'input',
        // 'output', 'malloc'), in which case nothing can be checked.
        self.report_if_missing_struct(inst.lhs.ty());
        self.report_if_unassignable(&inst.lhs);

        self.check_global_var(&inst.lhs);

        let Some(callee) = self.program.functions().get(&inst.callee) else {
            return;
        };
        let callee = callee.clone();

        if callee.parameters().len() != inst.args.len() {
            let text = self.inst_text();
            self.error(format!(
                "Type error: incorrect number of call arguments: {text}"
            ));
        }

        for (position, arg) in inst.args.iter().enumerate() {
            self.check_global(arg);

            let Some(param) = callee.parameters().get(position) else {
                break;
            };
            if arg.ty() != param.ty() {
                let text = self.inst_text();
                self.error(format!(
                    "Type error: type of argument doesn't match type of parameter: {text}"
                ));
            }
        }

        if inst.lhs.ty() != callee.return_type() {
            let text = self.inst_text();
            self.error(format!(
                "Type error: function return type doesn't match left-hand side: {text}"
            ));
        }
    }

    fn visit_icall(&mut self, inst: &'ir ICallInst) {
        self.report_if_missing_struct(inst.lhs.ty());
        self.report_if_missing_struct(inst.func_ptr.ty());
        self.report_if_unassignable(&inst.lhs);

        self.check_global_var(&inst.lhs);
        self.check_global_var(&inst.func_ptr);

        if !inst.func_ptr.ty().is_function_ptr() {
            let text = self.inst_text();
            self.error(format!(
                "Type error: calling a non-function pointer: {text}"
            ));
            return;
        }

        // Return type followed by parameter types.
        let types = inst.func_ptr.ty().func_types().to_vec();

        if inst.args.len() != types.len() - 1 {
            let text = self.inst_text();
            self.error(format!(
                "Type error: incorrect number of call arguments: {text}"
            ));
        }

        for (position, arg) in inst.args.iter().enumerate() {
            self.check_global(arg);

            let Some(param_ty) = types.get(position + 1) else {
                break;
            };
            if arg.ty() != param_ty {
                let text = self.inst_text();
                self.error(format!(
                    "Type error: type of argument doesn't match type of parameter: {text}"
                ));
            }
        }

        if *inst.lhs.ty() != types[0] {
            let text = self.inst_text();
            self.error(format!(
                "Type error: function return type doesn't match left-hand side: {text}"
            ));
        }

        self.report_if_not_toplevel(inst.lhs.ty());
    }

    fn visit_ret(&mut self, inst: &'ir RetInst) {
        self.report_if_missing_struct(inst.retval.ty());
        self.check_global(&inst.retval);

        let return_type = self.curr_function.map(|function| function.return_type().clone());
        if let Some(return_type) = return_type {
            if *inst.retval.ty() != return_type {
                let text = self.inst_text();
                self.error(format!(
                    "Type error: operand type does not match function return type: {text}"
                ));
            }
        }
    }

    fn visit_jump(&mut self, inst: &'ir JumpInst) {
        let defined = self
            .curr_function
            .is_some_and(|function| function.body().contains_key(&inst.label));
        if !defined {
            let id = self.block_id.clone();
            let label = &inst.label;
            self.error(format!(
                "Basic block '{id}' jumps to nonexistent basic block '{label}'"
            ));
        }
    }

    fn visit_branch(&mut self, inst: &'ir BranchInst) {
        self.report_if_missing_struct(inst.condition.ty());
        self.check_global(&inst.condition);

        for label in [&inst.label_true, &inst.label_false] {
            let defined = self
                .curr_function
                .is_some_and(|function| function.body().contains_key(label));
            if !defined {
                let id = self.block_id.clone();
                self.error(format!(
                    "Basic block '{id}' branches to nonexistent basic block '{label}'"
                ));
            }
        }
    }
}
