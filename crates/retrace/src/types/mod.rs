//! Source-level type model
//!
//! A [`TypeContext`] owns the type graph of one translation unit. Nodes are
//! addressed by [`TypeId`] and carry their canonical (sugar-free) node, so
//! canonicalization is a lookup.

mod context;
mod describe;
mod kind;
mod layout;
mod scope;

pub use context::{
    EnumDecl, EnumDefinition, Enumerator, Field, RecordDecl, RecordDefinition, TypeContext,
    TypeError, TypeNode, ValueDecl,
};
pub use kind::{
    BuiltinKind, CallConv, EnumId, FunctionExt, Name, Qualifiers, RecordId, TagKind, TypeClass,
    TypeId, TypeKind, VectorKind,
};
pub use layout::{TargetLayout, TypeInfo};
