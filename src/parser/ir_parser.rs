use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::ir::{
    AddrOfInst, AllocInst, Aop, ArithInst, BasicBlock, BlockRef, BranchInst, CallInst, CmpInst,
    CopyInst, FuncRef, Function, GepInst, ICallInst, Instruction, JumpInst, LoadInst, Operand,
    PhiInst, Program, RetInst, Rop, SelectInst, StoreInst, StructFields, Type, VarRef, Variable,
};
use crate::lexer::Tokenizer;

/// Whitespace characters of the textual IR
const WHITESPACE: &[char] = &[' ', '\n'];

/// Delimiters of the textual IR
const DELIMITERS: &[&str] = &[":", ",", "=", "->", "*", "[", "]", "{", "}", "(", ")"];

/// Reserved opcode words
///
/// `$copy` is deliberately not reserved; the grammar never needs to reject
/// it as an ordinary token.
const RESERVED: &[&str] = &[
    "$arith", "$cmp", "$phi", "$alloc", "$addrof", "$load", "$store", "$gep", "$select", "$call",
    "$icall", "$ret", "$jump", "$branch",
];

/// Reads a type at the tokenizer's current position
pub(crate) fn read_type(tk: &mut Tokenizer) -> Result<Type> {
    let base = tk.consume_token()?;
    let mut ty = if base == "int" {
        Type::int()
    } else {
        Type::named_struct(base)
    };
    while tk.try_consume("*") {
        ty = ty.ptr_to();
    }

    // A bracket list makes the type so far the return type of a function
    // type, followed by its parameter types.
    if tk.try_consume("[") {
        let mut types = vec![ty];
        while !tk.try_consume("]") {
            types.push(read_type(tk)?);
            if !tk.peek("]") {
                tk.consume(",")?;
            }
        }
        ty = Type::function(types);
        while tk.try_consume("*") {
            ty = ty.ptr_to();
        }
    }

    Ok(ty)
}

/// A parser for the textual IR, at any granularity from a single
/// instruction up to a whole program
///
/// One parser holds the variable-identity tables: within one function the
/// same local name always yields the same [`VarRef`] (and a second
/// occurrence with a different type is an error); `@name` globals share
/// identity across the whole parse, keyed by name; `@nullptr` globals share
/// identity keyed by their type. Separate parsers never share variable
/// objects, even over identical input.
pub struct IrParser {
    tk: Tokenizer,
    /// Function-local variables, cleared between functions
    vars: HashMap<String, VarRef>,
    /// Global function-pointer variables, by name
    func_vars: HashMap<String, VarRef>,
    /// Global null-pointer variables, by type
    null_vars: HashMap<Type, VarRef>,
}

impl IrParser {
    /// Creates a parser over `input`
    pub fn new(input: &str) -> IrParser {
        IrParser {
            tk: Tokenizer::new(input, WHITESPACE, DELIMITERS, RESERVED),
            vars: HashMap::new(),
            func_vars: HashMap::new(),
            null_vars: HashMap::new(),
        }
    }

    /// Reads a `name:type` variable, folding repeated occurrences onto one
    /// object per the identity rules
    fn read_var(&mut self) -> Result<VarRef> {
        let name = self.tk.consume_token()?;
        self.tk.consume(":")?;
        let ty = read_type(&mut self.tk)?;

        if name == "@nullptr" {
            if !self.null_vars.contains_key(&ty) {
                self.null_vars
                    .insert(ty.clone(), Variable::new(name, ty.clone()));
            }
            return Ok(self.null_vars[&ty].clone());
        }

        if name.starts_with('@') {
            return match self.func_vars.get(&name) {
                Some(existing) => {
                    if *existing.ty() != ty {
                        return Err(Error::Parse(format!(
                            "Global function pointers with same name but different types: \
                             {name} with types {} and {ty}",
                            existing.ty()
                        )));
                    }
                    Ok(existing.clone())
                }
                None => {
                    let var = Variable::new(name.clone(), ty);
                    self.func_vars.insert(name, var.clone());
                    Ok(var)
                }
            };
        }

        match self.vars.get(&name) {
            Some(existing) => {
                if *existing.ty() != ty {
                    return Err(Error::Parse(format!(
                        "Local variables with same name but different types: \
                         {name} with types {} and {ty}",
                        existing.ty()
                    )));
                }
                Ok(existing.clone())
            }
            None => {
                let var = Variable::new(name.clone(), ty);
                self.vars.insert(name, var.clone());
                Ok(var)
            }
        }
    }

    /// Reads an operand: an integer constant or a variable
    fn read_operand(&mut self) -> Result<Operand> {
        let token = self.tk.consume_token()?;
        if token.chars().all(|c| c == '-' || c.is_ascii_digit()) {
            let value: i64 = token
                .parse()
                .map_err(|_| self.tk.syntax_error(format!("invalid integer constant: {token}")))?;
            Ok(Operand::Const(value))
        } else {
            self.tk.put_back(token);
            Ok(Operand::Var(self.read_var()?))
        }
    }

    /// Reads a comma-delimited operand list inside parentheses
    fn read_args(&mut self) -> Result<Vec<Operand>> {
        let mut args = Vec::new();
        self.tk.consume("(")?;
        while !self.tk.try_consume(")") {
            args.push(self.read_operand()?);
            if !self.tk.peek(")") {
                self.tk.consume(",")?;
            }
        }
        Ok(args)
    }

    /// Reads a single instruction
    pub fn read_instruction(&mut self) -> Result<Instruction> {
        // The four opcodes with no assignment come first.
        if self.tk.try_consume("$store") {
            return Ok(StoreInst {
                dst: self.read_var()?,
                value: self.read_operand()?,
            }
            .into());
        }
        if self.tk.try_consume("$jump") {
            return Ok(JumpInst {
                label: self.tk.consume_token()?,
            }
            .into());
        }
        if self.tk.try_consume("$branch") {
            return Ok(BranchInst {
                condition: self.read_operand()?,
                label_true: self.tk.consume_token()?,
                label_false: self.tk.consume_token()?,
            }
            .into());
        }
        if self.tk.try_consume("$ret") {
            return Ok(RetInst {
                retval: self.read_operand()?,
            }
            .into());
        }

        // Everything else is "lhs = $opcode ...".
        let lhs = self.read_var()?;
        self.tk.consume("=")?;

        if self.tk.try_consume("$arith") {
            let keyword = self.tk.consume_token()?;
            let op = Aop::from_keyword(&keyword).ok_or_else(|| {
                self.tk
                    .syntax_error(format!("unknown arithmetic operation: {keyword}"))
            })?;
            return Ok(ArithInst {
                lhs,
                op1: self.read_operand()?,
                op2: self.read_operand()?,
                op,
            }
            .into());
        }
        if self.tk.try_consume("$cmp") {
            let keyword = self.tk.consume_token()?;
            let op = Rop::from_keyword(&keyword).ok_or_else(|| {
                self.tk
                    .syntax_error(format!("unknown comparison operation: {keyword}"))
            })?;
            return Ok(CmpInst {
                lhs,
                op1: self.read_operand()?,
                op2: self.read_operand()?,
                op,
            }
            .into());
        }
        if self.tk.try_consume("$phi") {
            return Ok(PhiInst {
                lhs,
                ops: self.read_args()?,
            }
            .into());
        }
        if self.tk.try_consume("$copy") {
            return Ok(CopyInst {
                lhs,
                rhs: self.read_operand()?,
            }
            .into());
        }
        if self.tk.try_consume("$alloc") {
            return Ok(AllocInst { lhs }.into());
        }
        if self.tk.try_consume("$addrof") {
            return Ok(AddrOfInst {
                lhs,
                rhs: self.read_var()?,
            }
            .into());
        }
        if self.tk.try_consume("$load") {
            return Ok(LoadInst {
                lhs,
                src: self.read_var()?,
            }
            .into());
        }
        if self.tk.try_consume("$gep") {
            let src_ptr = self.read_var()?;
            let index = self.read_operand()?;

            // The field name is optional: a following token is the field
            // exactly when it exists, is an ordinary token, and is not the
            // start of a typed variable (which would mean it belongs to the
            // next instruction).
            let mut field_name = String::new();
            if !self.tk.end_of_input()
                && !self.tk.is_next_reserved()
                && self.tk.peek_ahead(1) != ":"
            {
                field_name = self.tk.consume_token()?;
            }

            return Ok(GepInst {
                lhs,
                src_ptr,
                index,
                field_name,
            }
            .into());
        }
        if self.tk.try_consume("$select") {
            return Ok(SelectInst {
                lhs,
                condition: self.read_operand()?,
                true_op: self.read_operand()?,
                false_op: self.read_operand()?,
            }
            .into());
        }
        if self.tk.try_consume("$call") {
            return Ok(CallInst {
                lhs,
                callee: self.tk.consume_token()?,
                args: self.read_args()?,
            }
            .into());
        }
        if self.tk.try_consume("$icall") {
            return Ok(ICallInst {
                lhs,
                func_ptr: self.read_var()?,
                args: self.read_args()?,
            }
            .into());
        }

        let next = self.tk.peek_ahead(0);
        Err(self.tk.syntax_error(format!("unknown opcode: {next}")))
    }

    /// Reads a basic block: a label, a colon, then instructions up to and
    /// including the first terminator
    pub fn read_basic_block(&mut self) -> Result<BlockRef> {
        let label = self.tk.consume_token()?;
        self.tk.consume(":")?;

        let mut body = Vec::new();
        loop {
            let inst = self.read_instruction()?;
            let terminates = inst.opcode().is_terminator();
            body.push(inst);
            if terminates {
                break;
            }
        }

        Ok(BasicBlock::new(label, body))
    }

    /// Reads a `function NAME(params?) -> TYPE { block+ }` definition
    pub fn read_function(&mut self) -> Result<FuncRef> {
        // Local variables from other functions are out of scope.
        self.vars.clear();

        self.tk.consume("function")?;
        let name = self.tk.consume_token()?;

        let mut parameters = Vec::new();
        self.tk.consume("(")?;
        while !self.tk.try_consume(")") {
            let param_name = self.tk.consume_token()?;
            self.tk.consume(":")?;
            let param = Variable::new(param_name.clone(), read_type(&mut self.tk)?);
            parameters.push(param.clone());
            self.vars.insert(param_name, param);
            if !self.tk.peek(")") {
                self.tk.consume(",")?;
            }
        }

        self.tk.consume("->")?;
        let return_type = read_type(&mut self.tk)?;

        let mut body: Vec<BlockRef> = Vec::new();
        self.tk.consume("{")?;
        while !self.tk.try_consume("}") {
            let block = self.read_basic_block()?;
            if body.iter().any(|b| b.label() == block.label()) {
                return Err(Error::Parse(format!(
                    "cannot have duplicate basic block labels: {}::{}",
                    name,
                    block.label()
                )));
            }
            body.push(block);
        }
        if body.is_empty() {
            return Err(Error::Parse(format!(
                "Function must have at least one basic block: {name}"
            )));
        }

        Ok(Function::new(name, return_type, parameters, body))
    }

    /// Reads a whole program: struct definitions followed by function
    /// definitions, then verifies it
    pub fn read_program(&mut self) -> Result<Program> {
        let mut struct_types: BTreeMap<String, StructFields> = BTreeMap::new();

        while self.tk.try_consume("struct") {
            let name = self.tk.consume_token()?;
            if struct_types.contains_key(&name) {
                return Err(Error::Parse(format!("Two structs with same name: {name}")));
            }

            let mut fields = StructFields::new();
            self.tk.consume("{")?;
            while !self.tk.try_consume("}") {
                let field = self.tk.consume_token()?;
                if fields.contains_key(&field) {
                    return Err(Error::Parse(format!(
                        "Two fields of same struct with same name: {field}"
                    )));
                }
                self.tk.consume(":")?;
                fields.insert(field, read_type(&mut self.tk)?);
            }
            struct_types.insert(name, fields);
        }

        let mut functions = Vec::new();
        while !self.tk.end_of_input() {
            functions.push(self.read_function()?);
        }

        Program::new(struct_types, functions)
    }
}

impl Instruction {
    /// Reads an instruction from its textual form
    ///
    /// Separate calls always produce distinct variable objects, even over
    /// identical input; parse related text with one parse when identity
    /// matters. The result is unattached: its parent is `None` and its
    /// index is −1.
    pub fn from_string(input: &str) -> Result<Instruction> {
        IrParser::new(input).read_instruction()
    }
}

impl BasicBlock {
    /// Reads a basic block from its textual form
    ///
    /// Separate calls always produce distinct variable objects, even over
    /// identical input.
    pub fn from_string(input: &str) -> Result<BlockRef> {
        IrParser::new(input).read_basic_block()
    }
}

impl Function {
    /// Reads a function from its textual form
    ///
    /// Separate calls always produce distinct variable objects (including
    /// for globals like `@name` and `@nullptr`), even over identical input.
    pub fn from_string(input: &str) -> Result<FuncRef> {
        IrParser::new(input).read_function()
    }
}

impl Program {
    /// Reads and verifies a program from its textual form
    pub fn from_string(input: &str) -> Result<Program> {
        IrParser::new(input).read_program()
    }
}

impl FromStr for Type {
    type Err = Error;

    fn from_str(s: &str) -> Result<Type> {
        let mut tk = Tokenizer::new(s, &[], &["[", "]", ",", "*"], &[]);
        read_type(&mut tk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_round_trip() {
        let text = "foo**[int,int*,bar*[int,int]*]*";
        assert_eq!(text.parse::<Type>().unwrap().to_string(), text);
    }

    #[test]
    fn test_simple_types() {
        assert_eq!("int".parse::<Type>().unwrap(), Type::int());
        assert_eq!("int*".parse::<Type>().unwrap(), Type::int().ptr_to());
        assert_eq!("foo".parse::<Type>().unwrap(), Type::named_struct("foo"));
        assert_eq!(
            "int[]*".parse::<Type>().unwrap(),
            Type::function(vec![Type::int()]).ptr_to()
        );
    }

    #[test]
    fn test_gep_with_field() {
        let inst = Instruction::from_string("x:int* = $gep y:int* z:int foo").unwrap();
        assert_eq!(inst.as_gep().field_name, "foo");
        assert_eq!(inst.to_string(), "x:int* = $gep y:int* z:int foo\n");
    }

    #[test]
    fn test_gep_without_field() {
        let inst = Instruction::from_string("x:int* = $gep y:int* 42").unwrap();
        assert_eq!(inst.as_gep().field_name, "");
        assert_eq!(inst.to_string(), "x:int* = $gep y:int* 42\n");
    }

    #[test]
    fn test_gep_field_detection_inside_block() {
        // The token after the index is only a field name when it is not the
        // lhs of the next instruction and not an opcode.
        let text = "
bb:
  x:int* = $gep y:int* z:int foo
  a:int* = $gep b:int* 42
  p:int = $copy 42
  $ret 0
";
        let block = BasicBlock::from_string(text).unwrap();
        assert_eq!(block.to_string(), text);

        let text = "
bb:
  x:int* = $gep y:int* z:int foo
  a:int* = $gep b:int* 42
  $ret 0
";
        let block = BasicBlock::from_string(text).unwrap();
        assert_eq!(block.to_string(), text);
    }

    #[test]
    fn test_local_variable_identity() {
        let block = BasicBlock::from_string(
            "bb:\n  x:int = $copy 1\n  y:int = $arith add x:int x:int\n  $ret x:int",
        )
        .unwrap();

        let copy_lhs = block.body()[0].as_copy().lhs.clone();
        let arith = block.body()[1].as_arith();
        assert_eq!(*arith.op1.as_var(), copy_lhs);
        assert_eq!(*arith.op2.as_var(), copy_lhs);
        assert_eq!(*block.body()[2].as_ret().retval.as_var(), copy_lhs);
    }

    #[test]
    fn test_conflicting_variable_types_fail() {
        let err =
            BasicBlock::from_string("bb:\n  x:int = $copy 1\n  x:int* = $alloc\n  $ret 0")
                .unwrap_err();
        assert!(err
            .to_string()
            .contains("same name but different types"));
    }

    #[test]
    fn test_unknown_opcode_fails() {
        let err = Instruction::from_string("x:int = $frobnicate 1 2").unwrap_err();
        assert!(err.to_string().contains("unknown opcode"));
    }

    #[test]
    fn test_unknown_arith_operation_fails() {
        let err = Instruction::from_string("x:int = $arith mod 1 2").unwrap_err();
        assert!(err.to_string().contains("unknown arithmetic operation"));
    }

    #[test]
    fn test_negative_constants() {
        let inst = Instruction::from_string("x:int = $copy -17").unwrap();
        assert_eq!(inst.as_copy().rhs.as_const(), -17);
    }

    #[test]
    fn test_standalone_instruction_is_unattached() {
        let inst = Instruction::from_string("$ret 0").unwrap();
        assert!(inst.parent().is_none());
        assert_eq!(inst.index(), -1);
    }

    #[test]
    fn test_duplicate_struct_names_fail() {
        let err = Program::from_string(
            "struct a { f:int }\nstruct a { g:int }\n\
             function main() -> int {\nentry:\n  $ret 0\n}",
        )
        .unwrap_err();
        assert!(err.to_string().contains("Two structs with same name"));
    }

    #[test]
    fn test_duplicate_field_names_fail() {
        let err = Program::from_string(
            "struct a { f:int f:int* }\n\
             function main() -> int {\nentry:\n  $ret 0\n}",
        )
        .unwrap_err();
        assert!(err
            .to_string()
            .contains("Two fields of same struct with same name"));
    }

    #[test]
    fn test_duplicate_block_labels_fail() {
        let err = Program::from_string(
            "function main() -> int {\nentry:\n  $jump entry\nentry:\n  $ret 0\n}",
        )
        .unwrap_err();
        assert!(err
            .to_string()
            .contains("duplicate basic block labels"));
    }

    #[test]
    fn test_duplicate_function_names_fail() {
        let err = Program::from_string(
            "function main() -> int {\nentry:\n  $ret 0\n}\n\
             function main() -> int {\nentry:\n  $ret 0\n}",
        )
        .unwrap_err();
        assert!(matches!(err, Error::DuplicateFunction(name) if name == "main"));
    }

    #[test]
    fn test_syntax_error_carries_line_number() {
        let err = Program::from_string(
            "function main() -> int {\nentry:\n  x:int = $copy 1 =\n  $ret 0\n}",
        )
        .unwrap_err();
        let text = err.to_string();
        assert!(text.starts_with("Syntax error on line"), "got: {text}");
    }
}
