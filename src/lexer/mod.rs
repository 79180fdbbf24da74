//! Lexical analysis for the IR
//!
//! Converts source text into a forward-consumable token stream with line
//! tracking, driven by configurable whitespace, delimiter, reserved-word,
//! and raw-region sets.

mod tokenizer;

pub use tokenizer::Tokenizer;
