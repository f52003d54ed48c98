//! Lexer module for tokenizing C declarations

mod scanner;
mod token;

pub use scanner::Lexer;
pub use token::{Token, TokenKind};
