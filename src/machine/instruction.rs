//! Machine instructions as seen by the debug value history calculation.
//!
//! An instruction is either an ordinary operation, whose register operands
//! may define (overwrite) registers, or a debug value. A debug value does not
//! execute; it declares that from this point on a source variable can be
//! found at a given [`VariableLocation`].
//!
//! # Key Types
//!
//! - [`MachineInstr`] - A single instruction with flags and debug location
//! - [`InstrKind`] - Debug value or ordinary operation
//! - [`Operand`] - Register or immediate operand of an operation
//! - [`VariableLocation`] - Where a debug value says a variable lives
//! - [`InstrFlags`] - Prologue, epilogue, return and call markers
//! - [`DebugLoc`] - Source position token attached to an instruction

use std::fmt;

use bitflags::bitflags;

use crate::machine::Register;

/// Handle of an instruction inside its [`crate::machine::MachineFunction`].
///
/// Ids are handed out in layout order, so comparing two ids of the same
/// function compares their position in the instruction stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstrId(u32);

impl InstrId {
    /// Creates an id from its arena index.
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the arena index of this instruction.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for InstrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "I{}", self.0)
    }
}

/// Handle of a source-level debug variable.
///
/// Only identity matters; the numeric value is an index into the owning
/// function's variable table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(u32);

impl VarId {
    /// Creates an id from its variable table index.
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the variable table index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V{}", self.0)
    }
}

/// Source position attached to an instruction.
///
/// Instructions without a position carry `None`; two instructions share a
/// position only if both are `Some` and equal, or both are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DebugLoc {
    /// Source line.
    pub line: u32,
    /// Source column.
    pub column: u32,
    /// Lexical scope the position belongs to.
    pub scope: u32,
}

impl DebugLoc {
    /// Creates a position in the outermost scope.
    #[must_use]
    pub const fn new(line: u32, column: u32) -> Self {
        Self {
            line,
            column,
            scope: 0,
        }
    }

    /// Returns the same position in a different lexical scope.
    #[must_use]
    pub const fn in_scope(self, scope: u32) -> Self {
        Self { scope, ..self }
    }
}

impl fmt::Display for DebugLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}@{}", self.line, self.column, self.scope)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Instruction property flags
    ///
    /// `FRAME_SETUP` and `RETURN` drive the history calculation. `FRAME_DESTROY`
    /// and `CALL` only annotate the instruction; the epilogue of a block is
    /// found from debug locations (see [`crate::debuginfo::changing`]) and the
    /// registers a call clobbers are its implicit defs.
    pub struct InstrFlags: u8 {
        /// Part of the fixed function prologue
        const FRAME_SETUP = 0x01;
        /// Emitted as part of frame teardown (informational)
        const FRAME_DESTROY = 0x02;
        /// Returns from the function
        const RETURN = 0x04;
        /// Calls another function (informational)
        const CALL = 0x08;
    }
}

/// Operand of an ordinary instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    /// A register read or written by the instruction.
    Reg {
        /// The register.
        reg: Register,
        /// `true` if the instruction writes the register.
        is_def: bool,
        /// `true` if the operand is not encoded but implied by the opcode.
        is_implicit: bool,
    },
    /// An immediate value.
    Imm(i64),
}

impl Operand {
    /// An explicit register definition.
    #[must_use]
    pub const fn def(reg: Register) -> Self {
        Operand::Reg {
            reg,
            is_def: true,
            is_implicit: false,
        }
    }

    /// An implicit register definition, e.g. a register clobbered by a call.
    #[must_use]
    pub const fn implicit_def(reg: Register) -> Self {
        Operand::Reg {
            reg,
            is_def: true,
            is_implicit: true,
        }
    }

    /// An explicit register read.
    #[must_use]
    pub const fn read(reg: Register) -> Self {
        Operand::Reg {
            reg,
            is_def: false,
            is_implicit: false,
        }
    }

    /// Returns the register written by this operand, if any.
    #[must_use]
    pub const fn defined_register(&self) -> Option<Register> {
        match *self {
            Operand::Reg {
                reg, is_def: true, ..
            } => Some(reg),
            _ => None,
        }
    }

    /// Returns the register named by this operand, read or written.
    #[must_use]
    pub const fn register(&self) -> Option<Register> {
        match *self {
            Operand::Reg { reg, .. } => Some(reg),
            Operand::Imm(_) => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Reg {
                reg,
                is_def,
                is_implicit,
            } => {
                if *is_implicit {
                    write!(f, "implicit ")?;
                }
                if *is_def {
                    write!(f, "def ")?;
                }
                write!(f, "{reg}")
            }
            Operand::Imm(value) => write!(f, "#{value}"),
        }
    }
}

/// Where a debug value declares its variable to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableLocation {
    /// The value is held in a register.
    Register(Register),
    /// The value is in memory at `base + offset`.
    Indirect {
        /// Register holding the address.
        base: Register,
        /// Byte offset from the base register.
        offset: i64,
    },
    /// The value is in a frame slot.
    StackSlot(i32),
    /// The variable has a known constant value.
    Constant(i64),
    /// The location is unknown from here on, e.g. the value was optimized out.
    Undefined,
}

impl VariableLocation {
    /// Returns the register this location depends on.
    ///
    /// Both direct and indirect register locations are described by their
    /// register: overwriting it invalidates the location either way.
    #[must_use]
    pub const fn register(&self) -> Option<Register> {
        match *self {
            VariableLocation::Register(reg) | VariableLocation::Indirect { base: reg, .. } => {
                Some(reg)
            }
            _ => None,
        }
    }
}

impl fmt::Display for VariableLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableLocation::Register(reg) => write!(f, "{reg}"),
            VariableLocation::Indirect { base, offset } => write!(f, "[{base}{offset:+}]"),
            VariableLocation::StackSlot(slot) => write!(f, "stack.{slot}"),
            VariableLocation::Constant(value) => write!(f, "#{value}"),
            VariableLocation::Undefined => write!(f, "undef"),
        }
    }
}

/// What an instruction does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstrKind {
    /// Declares that `var` is at `location` from here on.
    DebugValue {
        /// The described variable.
        var: VarId,
        /// Its new location.
        location: VariableLocation,
    },
    /// An ordinary machine operation.
    Op {
        /// Register and immediate operands.
        operands: Vec<Operand>,
    },
}

/// A machine instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineInstr {
    /// Handle of this instruction in its function.
    pub id: InstrId,
    /// Human-readable mnemonic (e.g., "mov", "ret", "DBG_VALUE").
    pub mnemonic: String,
    /// Operation or debug value payload.
    pub kind: InstrKind,
    /// Property flags.
    pub flags: InstrFlags,
    /// Source position, if known.
    pub debug_loc: Option<DebugLoc>,
}

impl MachineInstr {
    /// Returns `true` if this instruction declares a variable location.
    #[must_use]
    pub const fn is_debug_value(&self) -> bool {
        matches!(self.kind, InstrKind::DebugValue { .. })
    }

    /// Returns `true` if this instruction returns from the function.
    #[must_use]
    pub fn is_return(&self) -> bool {
        self.flags.contains(InstrFlags::RETURN)
    }

    /// Returns `true` if this instruction is part of the function prologue.
    #[must_use]
    pub fn is_frame_setup(&self) -> bool {
        self.flags.contains(InstrFlags::FRAME_SETUP)
    }

    /// Returns the operands of an ordinary instruction; debug values have none.
    #[must_use]
    pub fn operands(&self) -> &[Operand] {
        match &self.kind {
            InstrKind::Op { operands } => operands,
            InstrKind::DebugValue { .. } => &[],
        }
    }

    /// Iterates the registers written by this instruction, as encoded in its
    /// operands (without alias expansion).
    pub fn defs(&self) -> impl Iterator<Item = Register> + '_ {
        self.operands().iter().filter_map(Operand::defined_register)
    }

    /// Returns the variable and location of a debug value.
    #[must_use]
    pub const fn debug_value(&self) -> Option<(VarId, VariableLocation)> {
        match self.kind {
            InstrKind::DebugValue { var, location } => Some((var, location)),
            InstrKind::Op { .. } => None,
        }
    }

    /// Returns the variable described by a debug value.
    #[must_use]
    pub const fn debug_variable(&self) -> Option<VarId> {
        match self.kind {
            InstrKind::DebugValue { var, .. } => Some(var),
            InstrKind::Op { .. } => None,
        }
    }

    /// Returns the register a debug value describes its variable with.
    ///
    /// `None` for ordinary instructions and for debug values whose location
    /// does not depend on a register.
    #[must_use]
    pub const fn described_register(&self) -> Option<Register> {
        match self.kind {
            InstrKind::DebugValue { location, .. } => location.register(),
            InstrKind::Op { .. } => None,
        }
    }

    /// Returns `true` if both instructions are debug values for the same
    /// variable with the same location description.
    #[must_use]
    pub fn is_identical_to(&self, other: &MachineInstr) -> bool {
        match (self.debug_value(), other.debug_value()) {
            (Some(lhs), Some(rhs)) => lhs == rhs,
            _ => false,
        }
    }
}

impl fmt::Display for MachineInstr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.id, self.mnemonic)?;
        match &self.kind {
            InstrKind::DebugValue { var, location } => write!(f, " {location}, {var}")?,
            InstrKind::Op { operands } => {
                for (idx, operand) in operands.iter().enumerate() {
                    let sep = if idx == 0 { " " } else { ", " };
                    write!(f, "{sep}{operand}")?;
                }
            }
        }
        if let Some(loc) = self.debug_loc {
            write!(f, " !{loc}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instr(kind: InstrKind) -> MachineInstr {
        MachineInstr {
            id: InstrId::new(0),
            mnemonic: "test".to_string(),
            kind,
            flags: InstrFlags::empty(),
            debug_loc: None,
        }
    }

    fn dbg(var: u32, location: VariableLocation) -> MachineInstr {
        instr(InstrKind::DebugValue {
            var: VarId::new(var),
            location,
        })
    }

    #[test]
    fn test_defs_skip_reads_and_immediates() {
        let mi = instr(InstrKind::Op {
            operands: vec![
                Operand::def(Register::new(1)),
                Operand::read(Register::new(2)),
                Operand::Imm(4),
                Operand::implicit_def(Register::new(3)),
            ],
        });
        assert_eq!(
            mi.defs().collect::<Vec<_>>(),
            vec![Register::new(1), Register::new(3)]
        );
        assert!(!mi.is_debug_value());
        assert_eq!(mi.described_register(), None);
    }

    #[test]
    fn test_described_register() {
        let reg = dbg(0, VariableLocation::Register(Register::new(5)));
        assert_eq!(reg.described_register(), Some(Register::new(5)));

        let indirect = dbg(
            0,
            VariableLocation::Indirect {
                base: Register::new(6),
                offset: -8,
            },
        );
        assert_eq!(indirect.described_register(), Some(Register::new(6)));

        assert_eq!(dbg(0, VariableLocation::StackSlot(2)).described_register(), None);
        assert_eq!(dbg(0, VariableLocation::Constant(7)).described_register(), None);
        assert_eq!(dbg(0, VariableLocation::Undefined).described_register(), None);
    }

    #[test]
    fn test_identical_debug_values() {
        let a = dbg(1, VariableLocation::Register(Register::new(2)));
        let mut b = dbg(1, VariableLocation::Register(Register::new(2)));
        b.id = InstrId::new(7);
        b.debug_loc = Some(DebugLoc::new(3, 1));
        assert!(a.is_identical_to(&b));

        assert!(!a.is_identical_to(&dbg(2, VariableLocation::Register(Register::new(2)))));
        assert!(!a.is_identical_to(&dbg(1, VariableLocation::Register(Register::new(3)))));
        assert!(!a.is_identical_to(&instr(InstrKind::Op { operands: vec![] })));
    }

    #[test]
    fn test_flags() {
        let mut mi = instr(InstrKind::Op { operands: vec![] });
        assert!(!mi.is_return());
        mi.flags = InstrFlags::RETURN | InstrFlags::FRAME_DESTROY;
        assert!(mi.is_return());
        assert!(!mi.is_frame_setup());
    }

    #[test]
    fn test_display() {
        let mut mi = instr(InstrKind::Op {
            operands: vec![Operand::def(Register::new(1)), Operand::Imm(42)],
        });
        mi.mnemonic = "mov".to_string();
        mi.debug_loc = Some(DebugLoc::new(10, 2));
        assert_eq!(mi.to_string(), "I0: mov def r1, #42 !10:2@0");

        let dv = dbg(
            3,
            VariableLocation::Indirect {
                base: Register::new(4),
                offset: 16,
            },
        );
        assert_eq!(dv.to_string(), "I0: test [r4+16], V3");
    }
}
