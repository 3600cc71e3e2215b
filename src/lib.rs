// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # dbghistory
//!
//! Debug value history calculation for compiled machine functions.
//!
//! Optimized code moves source variables between registers, stack slots and
//! constants. Debug values in the instruction stream record each move; this
//! crate turns them into per-variable instruction ranges, the input a debug
//! info emitter needs to produce location lists.
//!
//! ## Features
//!
//! - **Register aliasing** - Writes to any overlapping register end a range
//!   (`mov rax` ends a variable held in `eax`)
//! - **Prologue and epilogue awareness** - Frame setup and teardown do not
//!   invalidate registers that are stable across the function body
//! - **Block boundaries** - Register-held locations do not leak into
//!   successor blocks
//! - **Parallel batches** - Many functions at once via `rayon`
//!
//! ## Quick Start
//!
//! ```rust
//! use dbghistory::prelude::*;
//!
//! let info = X86RegisterInfo::new();
//! let (eax, ebx) = (X86Register::Eax.register(), X86Register::Ebx.register());
//!
//! let mut builder = FunctionBuilder::new("sum");
//! let total = builder.variable("total");
//! builder.block();
//! builder.dbg_value(total, VariableLocation::Register(eax))?;
//! builder.def("add", &[ebx])?;
//! builder.def("xor", &[eax])?;
//! builder.ret()?;
//! let func = builder.finish();
//!
//! let history = calculate_history(&func, &info)?;
//! print!("{}", history.display(&info));
//! # Ok::<(), dbghistory::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`machine`] - Functions, blocks, instructions and the register alias oracle
//! - [`debuginfo`] - The history calculation and its result map
//! - [`utils`] - Shared data structures
//!
//! ## Logging
//!
//! The calculation emits `tracing` events: a `debug` span per function,
//! `debug` events for coalesced debug values and the collected register
//! sets, and `trace` events for every clobbered range. Install any
//! `tracing` subscriber to see them.

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit- and integration-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use dbghistory::prelude::*;
///
/// let info = AliasTable::new(2, &[]);
/// let func = FunctionBuilder::new("empty").finish();
/// let history = calculate_history(&func, &info)?;
/// assert!(history.is_empty());
/// # Ok::<(), dbghistory::Error>(())
/// ```
pub mod prelude;

/// Machine function representation.
///
/// Blocks of instructions in layout order, debug values binding variables
/// to locations, and the [`machine::RegisterInfo`] alias oracle with a
/// table-driven and an x86 implementation.
pub mod machine;

/// Debug value history calculation.
///
/// See [`debuginfo::calculate_history`] for the main entry point and
/// [`debuginfo::DbgValueHistory`] for the result.
pub mod debuginfo;

/// Shared data structures.
pub mod utils;

/// `dbghistory` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `dbghistory` Error type
///
/// Returned when a function handed to the calculation is structurally
/// invalid. Broken invariants during the scan itself are bugs and panic.
///
/// # Examples
///
/// ```rust
/// use dbghistory::{debuginfo::calculate_history, machine::*, Error};
///
/// let info = AliasTable::new(2, &[]);
/// let mut builder = FunctionBuilder::new("f");
/// builder.block();
/// builder.def("mov", &[Register::new(7)])?;
/// let func = builder.finish();
///
/// match calculate_history(&func, &info) {
///     Err(Error::RegisterOutOfRange { register, .. }) => assert_eq!(register, Register::new(7)),
///     other => panic!("unexpected {other:?}"),
/// }
/// # Ok::<(), dbghistory::Error>(())
/// ```
pub use error::Error;
