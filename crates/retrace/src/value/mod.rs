//! Runtime value representations and the raw little-endian codec

mod apint;
mod generic;
pub(crate) mod limbs;

pub use apint::ApInt;
pub use generic::{
    decode_little_endian, encode_little_endian, print_generic_value, read_generic_value,
    write_generic_value, GenericValue, RawType, RawValueError, RawValueResult,
};
