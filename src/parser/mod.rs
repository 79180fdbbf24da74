//! Parsing the textual IR
//!
//! Turns IR text into fully linked programs, functions, basic blocks, or
//! single instructions, reusing one variable object for every textual
//! occurrence of the same name in scope.

mod ir_parser;

pub use ir_parser::IrParser;
