//! File-scope name tables

use std::collections::HashMap;

use super::kind::{Name, TypeId};

/// What an ordinary identifier refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// Index into the context's value declarations
    Value(usize),
    Typedef(TypeId),
    EnumConstant { value: i128, ty: TypeId },
}

/// Ordinary identifiers and tag names of one translation unit.
///
/// C keeps tags (`struct foo`) in a namespace separate from everything
/// else, so they get their own table.
#[derive(Debug, Default)]
pub struct Scope {
    symbols: HashMap<Name, SymbolKind>,
    tags: HashMap<Name, TypeId>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name`; fails if it is already bound
    pub fn define(&mut self, name: Name, kind: SymbolKind) -> Result<(), SymbolKind> {
        if let Some(existing) = self.symbols.get(&name) {
            return Err(*existing);
        }
        self.symbols.insert(name, kind);
        Ok(())
    }

    pub fn lookup(&self, name: Name) -> Option<SymbolKind> {
        self.symbols.get(&name).copied()
    }

    /// Bind a tag name; fails with the existing type if already bound
    pub fn define_tag(&mut self, name: Name, ty: TypeId) -> Result<(), TypeId> {
        if let Some(existing) = self.tags.get(&name) {
            return Err(*existing);
        }
        self.tags.insert(name, ty);
        Ok(())
    }

    pub fn lookup_tag(&self, name: Name) -> Option<TypeId> {
        self.tags.get(&name).copied()
    }
}
