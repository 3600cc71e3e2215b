//! # dbghistory Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the dbghistory library. Import this module to get quick access to everything needed
//! to build a machine function and compute its debug value history.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all dbghistory operations
pub use crate::Error;

/// The result type used throughout dbghistory
pub use crate::Result;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// History calculation with default options, or configurable per target
pub use crate::debuginfo::{calculate_history, HistoryCalculator};

/// Calculation options
pub use crate::debuginfo::{BlockBoundary, HistoryOptions};

// ================================================================================================
// Results
// ================================================================================================

/// The computed history and its ranges
pub use crate::debuginfo::{DbgValueHistory, InstrRange};

// ================================================================================================
// Machine Representation
// ================================================================================================

/// Functions, blocks and their builder
pub use crate::machine::{DebugVariable, FunctionBuilder, MachineBlock, MachineFunction};

/// Instructions and their parts
pub use crate::machine::{
    DebugLoc, InstrFlags, InstrId, InstrKind, MachineInstr, Operand, VarId, VariableLocation,
};

// ================================================================================================
// Registers
// ================================================================================================

/// Register ids, sets and the alias oracle
pub use crate::machine::{AliasTable, Register, RegisterInfo, RegisterSet};

/// x86/x64 register file
pub use crate::machine::{X86Register, X86RegisterInfo};
