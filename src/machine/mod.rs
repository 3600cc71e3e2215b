//! Machine-level representation consumed by the history calculation.
//!
//! This module models just enough of a compiled function for debug value
//! tracking: blocks of instructions in layout order, register operands with
//! def/use information, debug values that bind source variables to
//! locations, prologue/epilogue/return markers and source positions. The
//! register alias oracle is the [`RegisterInfo`] trait.
//!
//! # Components
//!
//! - [`Register`], [`RegisterSet`] - Register ids and dense register sets
//! - [`RegisterInfo`] / [`AliasTable`] - Alias oracle interface and its table-driven form
//! - [`X86RegisterInfo`] - Alias oracle for the x86/x64 general purpose registers
//! - [`MachineInstr`] - Instructions, operands and variable locations
//! - [`MachineFunction`] / [`FunctionBuilder`] - Arena owning blocks and instructions

mod function;
mod instruction;
mod register;
mod x86;

pub use function::{DebugVariable, FunctionBuilder, FunctionDisplay, MachineBlock, MachineFunction};
pub use instruction::{
    DebugLoc, InstrFlags, InstrId, InstrKind, MachineInstr, Operand, VarId, VariableLocation,
};
pub use register::{AliasTable, Register, RegisterInfo, RegisterSet, RegisterSetIter};
pub use x86::{X86Register, X86RegisterInfo};
