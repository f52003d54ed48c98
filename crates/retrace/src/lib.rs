//! Retrace - type matching and state decoding for record/replay traces
//!
//! A recording stores raw bytes of program state together with the types
//! that describe them. This library answers two questions about such
//! recordings: does a type from one translation unit mean the same thing
//! as a type from another, and what do these bytes look like as a value of
//! a given type.
//!
//! ## Architecture
//!
//! - **Types** (`types/`): per-translation-unit type graphs ([`TypeContext`])
//! - **Matcher** (`matcher/`): cross-context structural type equivalence
//! - **Decode** (`decode/`): host-layout bytes to text
//! - **Value** (`value/`): raw generic-value codec for runtime values
//! - **Frontend** (`frontend/`): builds type contexts from C declarations
//! - **Common** (`common/`): spans, errors and diagnostics
//!
//! Byte order conversion lives in the `retrace-endian` crate.

pub mod common;
pub mod decode;
pub mod frontend;
pub mod matcher;
pub mod types;
pub mod value;

pub use common::{DiagnosticReporter, FrontendError, FrontendResult, Span};
pub use decode::{
    DecodedValue, Degraded, decode, decode_to_string, decode_value, render_declaration, render_typed,
};
pub use frontend::{FrontendConfig, build_context, parse_declarations, parse_type_name};
pub use matcher::{TypeRef, match_impl, types_match};
pub use types::{TargetLayout, TypeContext, TypeId};
pub use value::{ApInt, GenericValue, RawType, RawValueError};
