//! Pretty-printing for the IR
//!
//! [`IrPrinter`] is a visitor that renders any IR component into the
//! canonical textual form the parser reads back: struct types first, then
//! functions, everything in name/label order, instructions indented by two
//! spaces. The `Display` implementations for [`Instruction`],
//! [`BasicBlock`], [`Function`], and [`Program`] drive a printer over the
//! component, so `to_string` and `format!` produce exactly this form.

use std::fmt;

use crate::ir::{
    AddrOfInst, AllocInst, ArithInst, BasicBlock, BranchInst, CallInst, CmpInst, CopyInst,
    Function, GepInst, ICallInst, Instruction, JumpInst, LoadInst, Operand, PhiInst, Program,
    RetInst, SelectInst, StoreInst,
};
use crate::visitor::IrVisitor;

/// A visitor that accumulates the textual form of everything it visits
pub struct IrPrinter {
    out: String,
    // Empty while printing bare instructions; set to two spaces once a
    // basic block is entered so instruction lines are indented.
    indent: &'static str,
}

impl IrPrinter {
    /// Creates an empty printer
    pub fn new() -> IrPrinter {
        IrPrinter {
            out: String::new(),
            indent: "",
        }
    }

    /// Returns everything printed so far
    pub fn finish(self) -> String {
        self.out
    }

    fn join(operands: &[Operand]) -> String {
        let parts: Vec<String> = operands.iter().map(Operand::to_string).collect();
        parts.join(", ")
    }
}

impl Default for IrPrinter {
    fn default() -> IrPrinter {
        IrPrinter::new()
    }
}

impl<'ir> IrVisitor<'ir> for IrPrinter {
    fn visit_program(&mut self, program: &'ir Program) {
        for (name, fields) in program.struct_types() {
            self.out.push_str(&format!("struct {name} {{\n"));
            for (field, ty) in fields {
                self.out.push_str(&format!("  {field}: {ty}\n"));
            }
            self.out.push_str("}\n\n");
        }
    }

    fn visit_function(&mut self, function: &'ir Function) {
        let params: Vec<String> = function
            .parameters()
            .iter()
            .map(|param| param.to_string())
            .collect();
        self.out.push_str(&format!(
            "function {}({}) -> {} {{",
            function.name(),
            params.join(", "),
            function.return_type()
        ));
    }

    fn visit_function_post(&mut self, _function: &'ir Function) {
        self.out.push_str("}\n\n");
    }

    fn visit_basic_block(&mut self, block: &'ir BasicBlock) {
        self.out.push_str(&format!("\n{}:\n", block.label()));
        self.indent = "  ";
    }

    fn visit_arith(&mut self, inst: &'ir ArithInst) {
        self.out.push_str(&format!(
            "{}{} = $arith {} {} {}\n",
            self.indent,
            inst.lhs,
            inst.op.keyword(),
            inst.op1,
            inst.op2
        ));
    }

    fn visit_cmp(&mut self, inst: &'ir CmpInst) {
        self.out.push_str(&format!(
            "{}{} = $cmp {} {} {}\n",
            self.indent,
            inst.lhs,
            inst.op.keyword(),
            inst.op1,
            inst.op2
        ));
    }

    fn visit_phi(&mut self, inst: &'ir PhiInst) {
        self.out.push_str(&format!(
            "{}{} = $phi({})\n",
            self.indent,
            inst.lhs,
            Self::join(&inst.ops)
        ));
    }

    fn visit_copy(&mut self, inst: &'ir CopyInst) {
        self.out
            .push_str(&format!("{}{} = $copy {}\n", self.indent, inst.lhs, inst.rhs));
    }

    fn visit_alloc(&mut self, inst: &'ir AllocInst) {
        self.out
            .push_str(&format!("{}{} = $alloc\n", self.indent, inst.lhs));
    }

    fn visit_addrof(&mut self, inst: &'ir AddrOfInst) {
        self.out.push_str(&format!(
            "{}{} = $addrof {}\n",
            self.indent, inst.lhs, inst.rhs
        ));
    }

    fn visit_load(&mut self, inst: &'ir LoadInst) {
        self.out.push_str(&format!(
            "{}{} = $load {}\n",
            self.indent, inst.lhs, inst.src
        ));
    }

    fn visit_store(&mut self, inst: &'ir StoreInst) {
        self.out.push_str(&format!(
            "{}$store {} {}\n",
            self.indent, inst.dst, inst.value
        ));
    }

    fn visit_gep(&mut self, inst: &'ir GepInst) {
        self.out.push_str(&format!(
            "{}{} = $gep {} {}",
            self.indent, inst.lhs, inst.src_ptr, inst.index
        ));
        if !inst.field_name.is_empty() {
            self.out.push_str(&format!(" {}", inst.field_name));
        }
        self.out.push('\n');
    }

    fn visit_select(&mut self, inst: &'ir SelectInst) {
        self.out.push_str(&format!(
            "{}{} = $select {} {} {}\n",
            self.indent, inst.lhs, inst.condition, inst.true_op, inst.false_op
        ));
    }

    fn visit_call(&mut self, inst: &'ir CallInst) {
        self.out.push_str(&format!(
            "{}{} = $call {}({})\n",
            self.indent,
            inst.lhs,
            inst.callee,
            Self::join(&inst.args)
        ));
    }

    fn visit_icall(&mut self, inst: &'ir ICallInst) {
        self.out.push_str(&format!(
            "{}{} = $icall {}({})\n",
            self.indent,
            inst.lhs,
            inst.func_ptr,
            Self::join(&inst.args)
        ));
    }

    fn visit_ret(&mut self, inst: &'ir RetInst) {
        self.out
            .push_str(&format!("{}$ret {}\n", self.indent, inst.retval));
    }

    fn visit_jump(&mut self, inst: &'ir JumpInst) {
        self.out
            .push_str(&format!("{}$jump {}\n", self.indent, inst.label));
    }

    fn visit_branch(&mut self, inst: &'ir BranchInst) {
        self.out.push_str(&format!(
            "{}$branch {} {} {}\n",
            self.indent, inst.condition, inst.label_true, inst.label_false
        ));
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut printer = IrPrinter::new();
        self.visit(&mut printer);
        f.write_str(&printer.finish())
    }
}

impl fmt::Display for BasicBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut printer = IrPrinter::new();
        self.visit(&mut printer);
        f.write_str(&printer.finish())
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut printer = IrPrinter::new();
        self.visit(&mut printer);
        f.write_str(&printer.finish())
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut printer = IrPrinter::new();
        self.visit(&mut printer);
        f.write_str(&printer.finish())
    }
}

#[cfg(test)]
mod tests {
    use crate::ir::*;
    use std::collections::BTreeMap;

    /// The fixed instruction fixtures the printing tests are built from.
    struct Fixtures {
        var: VarRef,
        varp: VarRef,
        fun: VarRef,
    }

    impl Fixtures {
        fn new() -> Fixtures {
            Fixtures {
                var: Variable::new("foo", Type::int()),
                varp: Variable::new("foop", Type::int().ptr_to()),
                fun: Variable::new("fun", Type::function(vec![Type::int()]).ptr_to()),
            }
        }

        fn inst(&self, code: &str) -> Instruction {
            match code {
                "arith" => ArithInst {
                    lhs: self.var.clone(),
                    op1: 42.into(),
                    op2: 42.into(),
                    op: Aop::Add,
                }
                .into(),
                "cmp" => CmpInst {
                    lhs: self.var.clone(),
                    op1: 42.into(),
                    op2: 42.into(),
                    op: Rop::Eq,
                }
                .into(),
                "phi" => PhiInst {
                    lhs: self.var.clone(),
                    ops: vec![42.into(), 42.into()],
                }
                .into(),
                "copy" => CopyInst {
                    lhs: self.var.clone(),
                    rhs: 42.into(),
                }
                .into(),
                "alloc" => AllocInst {
                    lhs: self.varp.clone(),
                }
                .into(),
                "addrof" => AddrOfInst {
                    lhs: self.varp.clone(),
                    rhs: self.var.clone(),
                }
                .into(),
                "load" => LoadInst {
                    lhs: self.var.clone(),
                    src: self.varp.clone(),
                }
                .into(),
                "store" => StoreInst {
                    dst: self.varp.clone(),
                    value: 42.into(),
                }
                .into(),
                "gep" => GepInst {
                    lhs: self.varp.clone(),
                    src_ptr: Variable::new("bar", Type::named_struct("foo").ptr_to()),
                    index: 0.into(),
                    field_name: "field".to_string(),
                }
                .into(),
                "select" => SelectInst {
                    lhs: self.var.clone(),
                    condition: 42.into(),
                    true_op: 42.into(),
                    false_op: 42.into(),
                }
                .into(),
                "call" => CallInst {
                    lhs: self.var.clone(),
                    callee: "foo".to_string(),
                    args: vec![],
                }
                .into(),
                "icall" => ICallInst {
                    lhs: self.var.clone(),
                    func_ptr: self.fun.clone(),
                    args: vec![],
                }
                .into(),
                "ret" => RetInst { retval: 42.into() }.into(),
                "jump" => JumpInst {
                    label: "foo".to_string(),
                }
                .into(),
                "branch" => BranchInst {
                    condition: 42.into(),
                    label_true: "foo".to_string(),
                    label_false: "bar".to_string(),
                }
                .into(),
                _ => panic!("unknown instruction code: {code}"),
            }
        }

        fn block(&self, label: &str, codes: &[&str]) -> BlockRef {
            BasicBlock::new(label, codes.iter().map(|code| self.inst(code)).collect())
        }
    }

    #[test]
    fn test_program_to_string_is_deterministic() {
        let fx = Fixtures::new();

        let mut struct_types = BTreeMap::new();
        let mut foo_fields = BTreeMap::new();
        foo_fields.insert("field".to_string(), Type::int());
        foo_fields.insert("field2".to_string(), Type::int().ptr_to());
        struct_types.insert("foo".to_string(), foo_fields);
        let mut bar_fields = BTreeMap::new();
        bar_fields.insert("field".to_string(), Type::named_struct("foo").ptr_to());
        struct_types.insert("bar".to_string(), bar_fields);

        let fun1 = Function::new(
            "foo",
            Type::int(),
            vec![],
            vec![
                fx.block("entry", &["arith", "cmp", "phi", "copy", "alloc", "load", "jump"]),
                fx.block("foo", &["addrof", "store", "gep", "select", "call", "icall", "ret"]),
            ],
        );
        let fun2 = Function::new(
            "main",
            Type::int(),
            vec![],
            vec![
                fx.block("entry", &["arith", "cmp", "phi", "copy", "alloc", "load", "branch"]),
                fx.block("foo", &["store", "gep", "select", "call", "icall", "jump"]),
                fx.block("bar", &["store", "gep", "select", "call", "icall", "ret"]),
            ],
        );

        let program = Program::new(struct_types, vec![fun1, fun2]).unwrap();

        assert_eq!(
            program.to_string(),
            "struct bar {
  field: foo*
}

struct foo {
  field: int
  field2: int*
}

function foo() -> int {
entry:
  foo:int = $arith add 42 42
  foo:int = $cmp eq 42 42
  foo:int = $phi(42, 42)
  foo:int = $copy 42
  foop:int* = $alloc
  foo:int = $load foop:int*
  $jump foo

foo:
  foop:int* = $addrof foo:int
  $store foop:int* 42
  foop:int* = $gep bar:foo* 0 field
  foo:int = $select 42 42 42
  foo:int = $call foo()
  foo:int = $icall fun:int[]*()
  $ret 42
}

function main() -> int {
bar:
  $store foop:int* 42
  foop:int* = $gep bar:foo* 0 field
  foo:int = $select 42 42 42
  foo:int = $call foo()
  foo:int = $icall fun:int[]*()
  $ret 42

entry:
  foo:int = $arith add 42 42
  foo:int = $cmp eq 42 42
  foo:int = $phi(42, 42)
  foo:int = $copy 42
  foop:int* = $alloc
  foo:int = $load foop:int*
  $branch 42 foo bar

foo:
  $store foop:int* 42
  foop:int* = $gep bar:foo* 0 field
  foo:int = $select 42 42 42
  foo:int = $call foo()
  foo:int = $icall fun:int[]*()
  $jump foo
}

"
        );
    }

    #[test]
    fn test_standalone_instruction_has_no_indent() {
        let fx = Fixtures::new();
        assert_eq!(fx.inst("ret").to_string(), "$ret 42\n");
        assert_eq!(
            fx.inst("gep").to_string(),
            "foop:int* = $gep bar:foo* 0 field\n"
        );
    }

    #[test]
    fn test_standalone_block_indents_instructions() {
        let fx = Fixtures::new();
        let block = fx.block("bb", &["copy", "ret"]);
        assert_eq!(block.to_string(), "\nbb:\n  foo:int = $copy 42\n  $ret 42\n");
    }
}
