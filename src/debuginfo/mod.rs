//! Debug value history calculation.
//!
//! Given a [`MachineFunction`](crate::machine::MachineFunction) whose
//! instruction stream carries debug values, this module computes for every
//! source variable the instruction ranges over which each of its locations
//! is valid. A location held in a register stops being valid when the
//! register (or any register overlapping it) is overwritten, or at the end
//! of a block when control may enter the successor with different register
//! contents.
//!
//! # Key Components
//!
//! - [`calculate_history`] / [`HistoryCalculator`] - Entry points running the scan
//! - [`DbgValueHistory`] - The result: per-variable lists of [`InstrRange`]s
//! - [`RegDescribedVars`] - Register to variable index kept during the scan
//! - [`changing`] - Registers the function body writes, minus prologue and epilogue
//!
//! # Example
//!
//! ```rust
//! use dbghistory::prelude::*;
//!
//! let info = X86RegisterInfo::new();
//! let eax = X86Register::Eax.register();
//!
//! let mut builder = FunctionBuilder::new("main");
//! let x = builder.variable("x");
//! builder.block();
//! builder.dbg_value(x, VariableLocation::Register(eax))?;
//! let clobber = builder.def("mov", &[X86Register::Rax.register()])?;
//! let func = builder.finish();
//!
//! let history = calculate_history(&func, &info)?;
//! assert_eq!(history.ranges(x)[0].end(), Some(clobber));
//! # Ok::<(), dbghistory::Error>(())
//! ```

mod calculator;
pub mod changing;
mod history;
mod regvars;

pub use calculator::{calculate_history, BlockBoundary, HistoryCalculator, HistoryOptions};
pub use history::{DbgValueHistory, HistoryDisplay, InstrRange};
pub use regvars::RegDescribedVars;
