//! Parser for the circuit description language

pub mod ast;
mod grammar;
pub mod layout;
pub mod lexer;

pub use ast::*;
pub use grammar::parse;
