//! # retrace-endian - byte order conversion for traced values
//!
//! Trace files and captured memory spans are written in a fixed byte order,
//! while the replaying host may use another. This crate provides the
//! conversions between host order and a declared order.
//!
//! ## Features
//!
//! - **Conversion**: [`little`], [`big`] and [`convert`] move a value between
//!   host order and a declared order. Each conversion is its own inverse.
//! - **Storage**: [`StoreAs`] keeps a value in a fixed order in memory and
//!   converts on every read and write.
//!
//! ## Quick Start
//!
//! ```
//! use retrace_endian::{big, little, Little};
//!
//! let stored: Little<u32> = Little::new(0x1234_5678);
//! assert_eq!(stored.get(), 0x1234_5678);
//! assert_eq!(little(little(7u16)), 7);
//! assert_eq!(big(big(0xABCDu16)), 0xABCD);
//! ```

#![cfg_attr(not(test), no_std)]

mod order;
mod store;

pub use order::{big, convert, is_little_endian_host, little, Endianness, SwapBytes};
pub use store::{Big, BigOrder, ByteOrder, Little, LittleOrder, StoreAs};
