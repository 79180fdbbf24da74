//! # lir - A Small IR Core for Program Analysis
//!
//! An in-memory representation of a small, LLVM-inspired intermediate
//! language, together with the textual parser, pretty-printer,
//! well-formedness verifier, and traversal framework that surround it.
//! Programs are constructed from parsed `.ir` text or programmatically
//! through a builder, and dataflow or pointer analyses are written against
//! the traversal framework.
//!
//! ## Quick Start
//!
//! Parse a program from its textual form:
//!
//! ```rust
//! use lir::Program;
//!
//! # fn main() -> lir::Result<()> {
//! let program = Program::from_string(
//!     r#"
//!     function main() -> int {
//!       entry:
//!         x:int = $copy 6
//!         y:int = $arith mul x:int 7
//!         $ret y:int
//!     }
//!     "#,
//! )?;
//!
//! assert!(program.functions().contains_key("main"));
//! # Ok(())
//! # }
//! ```
//!
//! A program that exists is always well-formed: construction runs the
//! verifier and fails (with every accumulated error) otherwise.
//!
//! ```rust
//! use lir::Program;
//!
//! // The jump target does not exist and the function is not 'main'.
//! let err = Program::from_string(
//!     "function f() -> int {\nentry:\n  $jump nowhere\n}",
//! )
//! .unwrap_err();
//! assert!(err.to_string().contains("Malformed program"));
//! assert!(err.to_string().contains("nonexistent basic block 'nowhere'"));
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Source text → Tokenizer → IrParser → Program ─┬→ IrPrinter (textual form)
//!                                               ├→ verifier (at construction)
//!                                               └→ IrVisitor (analyses)
//! ```
//!
//! ### Main Components
//!
//! - [`Tokenizer`] - Configurable lexing with line tracking
//! - [`IrParser`] - Text → fully linked IR, with variable identity folding
//! - [`ir`] - The data model: types, variables, instructions, blocks,
//!   functions, programs, and the [`ir::Builder`]
//! - [`IrPrinter`] - Deterministic textual form; `Display` for every IR level
//! - [`IrVisitor`] - Pre/post traversal with a callback per instruction kind
//! - [`InstToVars`] - Example analysis: which variables each instruction reads
//!
//! ## Writing an Analysis
//!
//! ```rust
//! use lir::{InstToVars, Program};
//!
//! # fn main() -> lir::Result<()> {
//! let program = Program::from_string(
//!     r#"
//!     function main() -> int {
//!       entry:
//!         x:int = $copy 6
//!         y:int = $arith div x:int 2
//!         $ret y:int
//!     }
//!     "#,
//! )?;
//!
//! let solution = InstToVars::new(&program).analyze("main");
//! let reads: Vec<String> = solution
//!     .iter()
//!     .map(|(site, vars)| format!("{site} reads {} variable(s)", vars.len()))
//!     .collect();
//! assert_eq!(reads.len(), 2); // the $arith and the $ret
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency
//!
//! The core is single-threaded by design: programs are immutable after
//! construction and hold their shared pieces behind reference counts, so
//! read-only analyses may walk the same program from several threads
//! without any locking.

pub mod analysis;
pub mod error;
pub mod ir;
pub mod lexer;
pub mod parser;
pub mod printer;
mod verifier;
pub mod visitor;

pub use analysis::{InstSite, InstToVars};
pub use error::{Error, Result};
pub use ir::{
    BasicBlock, BlockRef, Builder, FuncRef, Function, InstKind, Instruction, Opcode, Operand,
    Program, Type, VarRef, Variable,
};
pub use lexer::Tokenizer;
pub use parser::IrParser;
pub use printer::IrPrinter;
pub use visitor::{DebugVisitor, IrVisitor};
