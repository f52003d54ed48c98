//! C declaration front-end
//!
//! Builds a [`TypeContext`] from declaration source: typedefs, tagged
//! types, variables and function prototypes. This is how contexts are
//! populated for the command-line tool and for tests.
//!
//! The front-end:
//! - Lexes declaration source into tokens
//! - Parses declarations and type names
//! - Interns every type it sees into the context

pub mod lexer;
mod parser;

use std::fs;
use std::path::Path;

use crate::common::FrontendResult;
use crate::types::{TargetLayout, TypeContext, TypeId};

pub use lexer::{Lexer, Token, TokenKind};
pub use parser::Parser;

/// Options for building a context from source
#[derive(Debug, Clone, Default)]
pub struct FrontendConfig {
    /// Layout model the declarations are laid out for
    pub target: TargetLayout,
    /// Print the token stream to stderr before parsing
    pub dump_tokens: bool,
}

/// Parse file-scope declarations into `ctx`
pub fn parse_declarations(source: &str, ctx: &mut TypeContext) -> FrontendResult<()> {
    Parser::new(source, ctx)?.parse_declarations()
}

/// Parse an abstract type name such as `int (*)[4]` against `ctx`
pub fn parse_type_name(source: &str, ctx: &mut TypeContext) -> FrontendResult<TypeId> {
    Parser::new(source, ctx)?.parse_type_name()
}

/// One token per line, for debugging
pub fn dump_tokens(source: &str) -> FrontendResult<String> {
    let tokens = Lexer::new(source).tokenize_all()?;
    let mut output = String::new();
    for token in &tokens {
        output.push_str(&format!("{:?}\n", token));
    }
    Ok(output)
}

/// Read a declaration file
pub fn read_source(path: &Path) -> FrontendResult<String> {
    Ok(fs::read_to_string(path)?)
}

/// Build a fresh context named `name` from declaration source
pub fn build_context(
    name: &str,
    source: &str,
    config: &FrontendConfig,
) -> FrontendResult<TypeContext> {
    if config.dump_tokens {
        eprintln!("=== Tokens: {} ===", name);
        eprint!("{}", dump_tokens(source)?);
        eprintln!("=== End Tokens ===\n");
    }

    let mut ctx = TypeContext::new(name, config.target.clone());
    parse_declarations(source, &mut ctx)?;
    tracing::debug!(
        context = name,
        target = config.target.name,
        types = ctx.len(),
        values = ctx.values().len(),
        "context built"
    );
    Ok(ctx)
}
