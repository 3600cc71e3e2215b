//! Machine functions, their blocks and the builder that creates them.
//!
//! A [`MachineFunction`] owns every instruction in a single arena. Blocks are
//! ordered lists of [`InstrId`]s in layout order (not CFG order); since ids
//! are allocated while the function is built front to back, the id order is
//! also the scan order of the whole function.
//!
//! # Example
//!
//! ```rust
//! use dbghistory::machine::{DebugLoc, FunctionBuilder, Register, VariableLocation};
//!
//! let r1 = Register::new(1);
//! let mut builder = FunctionBuilder::new("square");
//! let x = builder.variable("x");
//!
//! builder.block();
//! builder.at(DebugLoc::new(1, 1));
//! builder.dbg_value(x, VariableLocation::Register(r1))?;
//! builder.def("mul", &[r1])?;
//! builder.ret()?;
//!
//! let func = builder.finish();
//! assert_eq!(func.block_count(), 1);
//! assert_eq!(func.instruction_count(), 3);
//! # Ok::<(), dbghistory::Error>(())
//! ```

use std::fmt;

use crate::{
    machine::{
        DebugLoc, InstrFlags, InstrId, InstrKind, MachineInstr, Operand, Register, RegisterInfo,
        VarId, VariableLocation,
    },
    Error, Result,
};

/// A source-level variable tracked by debug values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugVariable {
    /// Handle of the variable.
    pub id: VarId,
    /// Source name.
    pub name: String,
}

/// A basic block: instructions in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MachineBlock {
    instrs: Vec<InstrId>,
}

impl MachineBlock {
    /// Returns the instructions of this block in order.
    #[must_use]
    pub fn instructions(&self) -> &[InstrId] {
        &self.instrs
    }

    /// Returns `true` if the block holds no instruction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }

    /// Number of instructions in the block.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instrs.len()
    }

    /// Returns the last instruction of the block.
    #[must_use]
    pub fn last(&self) -> Option<InstrId> {
        self.instrs.last().copied()
    }
}

/// A compiled function: blocks of machine instructions plus the debug
/// variables they describe.
#[derive(Debug, Clone)]
pub struct MachineFunction {
    name: String,
    instrs: Vec<MachineInstr>,
    blocks: Vec<MachineBlock>,
    variables: Vec<DebugVariable>,
}

impl MachineFunction {
    /// Returns the function name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the blocks in layout order.
    #[must_use]
    pub fn blocks(&self) -> &[MachineBlock] {
        &self.blocks
    }

    /// Returns the block at `index`.
    #[must_use]
    pub fn block(&self, index: usize) -> Option<&MachineBlock> {
        self.blocks.get(index)
    }

    /// Number of blocks.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Returns `true` if `index` is the last block in layout order.
    #[must_use]
    pub fn is_last_block(&self, index: usize) -> bool {
        index + 1 == self.blocks.len()
    }

    /// Returns the instruction behind `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this function.
    #[must_use]
    pub fn instr(&self, id: InstrId) -> &MachineInstr {
        &self.instrs[id.index()]
    }

    /// Returns the instruction behind `id`, or `None` for a foreign id.
    #[must_use]
    pub fn get_instr(&self, id: InstrId) -> Option<&MachineInstr> {
        self.instrs.get(id.index())
    }

    /// Number of instructions across all blocks.
    #[must_use]
    pub fn instruction_count(&self) -> usize {
        self.instrs.len()
    }

    /// Iterates the instructions of block `index` in order.
    pub fn block_instrs(&self, index: usize) -> impl Iterator<Item = &MachineInstr> + '_ {
        self.blocks
            .get(index)
            .map(MachineBlock::instructions)
            .unwrap_or_default()
            .iter()
            .map(|&id| self.instr(id))
    }

    /// Iterates all instructions with their block index, in scan order.
    pub fn iter_instructions(&self) -> impl Iterator<Item = (usize, &MachineInstr)> + '_ {
        self.blocks.iter().enumerate().flat_map(move |(idx, block)| {
            block.instrs.iter().map(move |&id| (idx, self.instr(id)))
        })
    }

    /// Returns the last instruction of block `index` that is not a debug value.
    #[must_use]
    pub fn last_non_debug_instr(&self, index: usize) -> Option<InstrId> {
        self.blocks
            .get(index)?
            .instrs
            .iter()
            .rev()
            .copied()
            .find(|&id| !self.instr(id).is_debug_value())
    }

    /// Returns the debug variables of this function.
    #[must_use]
    pub fn variables(&self) -> &[DebugVariable] {
        &self.variables
    }

    /// Returns the variable behind `id`.
    #[must_use]
    pub fn variable(&self, id: VarId) -> Option<&DebugVariable> {
        self.variables.get(id.index())
    }

    /// Checks that every register is known to `info` and every debug value
    /// describes a declared variable. The alias lists of `info` are checked
    /// as well: every alias must itself be below `info.num_regs()`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RegisterOutOfRange`] or [`Error::UnknownVariable`] for
    /// the first offending instruction, and [`Error::Malformed`] if an
    /// instruction id does not match its arena slot.
    pub fn verify(&self, info: &dyn RegisterInfo) -> Result<()> {
        let num_regs = info.num_regs();
        let check_reg = |register: Register| {
            if register.index() < num_regs {
                Ok(())
            } else {
                Err(Error::RegisterOutOfRange { register, num_regs })
            }
        };

        for id in 0..num_regs {
            let reg = Register::new(u16::try_from(id).map_err(|_| {
                malformed_error!("Target describes {} registers, more than fit a u16", num_regs)
            })?);
            for &alias in info.aliases(reg) {
                check_reg(alias)?;
            }
        }

        for (slot, instr) in self.instrs.iter().enumerate() {
            if instr.id.index() != slot {
                return Err(malformed_error!(
                    "Instruction {} stored in slot {} of function {}",
                    instr.id,
                    slot,
                    self.name
                ));
            }

            match &instr.kind {
                InstrKind::DebugValue { var, location } => {
                    if self.variable(*var).is_none() {
                        return Err(Error::UnknownVariable(*var));
                    }
                    if let Some(reg) = location.register() {
                        check_reg(reg)?;
                    }
                }
                InstrKind::Op { operands } => {
                    for reg in operands.iter().filter_map(Operand::register) {
                        check_reg(reg)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Renders the function with register names from `info`.
    #[must_use]
    pub fn display<'a>(&'a self, info: &'a dyn RegisterInfo) -> FunctionDisplay<'a> {
        FunctionDisplay { func: self, info }
    }
}

/// Printable view of a [`MachineFunction`], see [`MachineFunction::display`].
pub struct FunctionDisplay<'a> {
    func: &'a MachineFunction,
    info: &'a dyn RegisterInfo,
}

impl fmt::Display for FunctionDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "function {}:", self.func.name)?;
        for (idx, block) in self.func.blocks.iter().enumerate() {
            writeln!(f, "bb.{idx}:")?;
            for &id in &block.instrs {
                let instr = self.func.instr(id);
                write!(f, "  {id}: {}", instr.mnemonic)?;
                match &instr.kind {
                    InstrKind::DebugValue { var, location } => {
                        let name = self.func.variable(*var).map_or("?", |v| v.name.as_str());
                        match *location {
                            VariableLocation::Register(reg) => {
                                write!(f, " {}", self.info.name(reg))?;
                            }
                            VariableLocation::Indirect { base, offset } => {
                                write!(f, " [{}{offset:+}]", self.info.name(base))?;
                            }
                            _ => write!(f, " {location}")?,
                        }
                        write!(f, ", \"{name}\"")?;
                    }
                    InstrKind::Op { operands } => {
                        for (pos, operand) in operands.iter().enumerate() {
                            let sep = if pos == 0 { " " } else { ", " };
                            match operand {
                                Operand::Reg { reg, is_def, .. } => {
                                    let def = if *is_def { "def " } else { "" };
                                    write!(f, "{sep}{def}{}", self.info.name(*reg))?;
                                }
                                Operand::Imm(value) => write!(f, "{sep}#{value}")?,
                            }
                        }
                    }
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

/// Incrementally builds a [`MachineFunction`].
///
/// Instructions are appended to the most recently started block and take the
/// debug location set by [`at`](Self::at).
#[derive(Debug)]
pub struct FunctionBuilder {
    func: MachineFunction,
    current_loc: Option<DebugLoc>,
}

impl FunctionBuilder {
    /// Starts an empty function named `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            func: MachineFunction {
                name: name.into(),
                instrs: Vec::new(),
                blocks: Vec::new(),
                variables: Vec::new(),
            },
            current_loc: None,
        }
    }

    /// Declares a debug variable.
    pub fn variable(&mut self, name: impl Into<String>) -> VarId {
        let id = VarId::new(self.func.variables.len() as u32);
        self.func.variables.push(DebugVariable {
            id,
            name: name.into(),
        });
        id
    }

    /// Starts a new block and returns its index.
    pub fn block(&mut self) -> usize {
        self.func.blocks.push(MachineBlock::default());
        self.func.blocks.len() - 1
    }

    /// Sets the debug location for the following instructions.
    pub fn at(&mut self, loc: DebugLoc) -> &mut Self {
        self.current_loc = Some(loc);
        self
    }

    /// Following instructions carry no debug location.
    pub fn clear_loc(&mut self) -> &mut Self {
        self.current_loc = None;
        self
    }

    /// Appends an instruction with explicit kind and flags.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoBlock`] if no block was started and
    /// [`Error::UnknownVariable`] for a debug value of an undeclared variable.
    pub fn instr(
        &mut self,
        mnemonic: impl Into<String>,
        kind: InstrKind,
        flags: InstrFlags,
    ) -> Result<InstrId> {
        if let InstrKind::DebugValue { var, .. } = kind {
            if self.func.variable(var).is_none() {
                return Err(Error::UnknownVariable(var));
            }
        }

        let id = InstrId::new(self.func.instrs.len() as u32);
        let block = self.func.blocks.last_mut().ok_or(Error::NoBlock)?;
        block.instrs.push(id);
        self.func.instrs.push(MachineInstr {
            id,
            mnemonic: mnemonic.into(),
            kind,
            flags,
            debug_loc: self.current_loc,
        });
        Ok(id)
    }

    /// Appends an ordinary instruction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoBlock`] if no block was started.
    pub fn op(&mut self, mnemonic: impl Into<String>, operands: &[Operand]) -> Result<InstrId> {
        self.instr(
            mnemonic,
            InstrKind::Op {
                operands: operands.to_vec(),
            },
            InstrFlags::empty(),
        )
    }

    /// Appends an instruction writing each register in `regs`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoBlock`] if no block was started.
    pub fn def(&mut self, mnemonic: impl Into<String>, regs: &[Register]) -> Result<InstrId> {
        let operands: Vec<Operand> = regs.iter().copied().map(Operand::def).collect();
        self.op(mnemonic, &operands)
    }

    /// Appends a prologue instruction writing each register in `regs`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoBlock`] if no block was started.
    pub fn frame_setup(
        &mut self,
        mnemonic: impl Into<String>,
        regs: &[Register],
    ) -> Result<InstrId> {
        let operands = regs.iter().copied().map(Operand::def).collect();
        self.instr(
            mnemonic,
            InstrKind::Op { operands },
            InstrFlags::FRAME_SETUP,
        )
    }

    /// Appends a frame teardown instruction writing each register in `regs`.
    ///
    /// The [`InstrFlags::FRAME_DESTROY`] flag is a marker only. Whether the
    /// instruction belongs to the epilogue, and so does not make its
    /// registers changing, depends on it sharing the debug location of the
    /// block's trailing return, see [`crate::debuginfo::changing`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoBlock`] if no block was started.
    pub fn frame_destroy(
        &mut self,
        mnemonic: impl Into<String>,
        regs: &[Register],
    ) -> Result<InstrId> {
        let operands = regs.iter().copied().map(Operand::def).collect();
        self.instr(
            mnemonic,
            InstrKind::Op { operands },
            InstrFlags::FRAME_DESTROY,
        )
    }

    /// Appends a call that clobbers `clobbers`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoBlock`] if no block was started.
    pub fn call(&mut self, callee: &str, clobbers: &[Register]) -> Result<InstrId> {
        let operands = clobbers.iter().copied().map(Operand::implicit_def).collect();
        self.instr(
            format!("call {callee}"),
            InstrKind::Op { operands },
            InstrFlags::CALL,
        )
    }

    /// Appends a return instruction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoBlock`] if no block was started.
    pub fn ret(&mut self) -> Result<InstrId> {
        self.instr(
            "ret",
            InstrKind::Op {
                operands: Vec::new(),
            },
            InstrFlags::RETURN,
        )
    }

    /// Appends a debug value declaring `var` to be at `location`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoBlock`] if no block was started and
    /// [`Error::UnknownVariable`] if `var` was not declared with
    /// [`variable`](Self::variable).
    pub fn dbg_value(&mut self, var: VarId, location: VariableLocation) -> Result<InstrId> {
        self.instr(
            "DBG_VALUE",
            InstrKind::DebugValue { var, location },
            InstrFlags::empty(),
        )
    }

    /// Finishes the function.
    #[must_use]
    pub fn finish(self) -> MachineFunction {
        self.func
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::AliasTable;

    fn r(id: u16) -> Register {
        Register::new(id)
    }

    #[test]
    fn test_builder_requires_block() {
        let mut builder = FunctionBuilder::new("f");
        assert!(matches!(builder.ret(), Err(Error::NoBlock)));
    }

    #[test]
    fn test_builder_rejects_unknown_variable() {
        let mut builder = FunctionBuilder::new("f");
        builder.block();
        let result = builder.dbg_value(VarId::new(3), VariableLocation::Undefined);
        assert!(matches!(result, Err(Error::UnknownVariable(v)) if v == VarId::new(3)));
    }

    #[test]
    fn test_layout_and_ids() -> Result<()> {
        let mut builder = FunctionBuilder::new("f");
        let x = builder.variable("x");
        builder.block();
        let i0 = builder.dbg_value(x, VariableLocation::Register(r(1)))?;
        let i1 = builder.def("mov", &[r(1)])?;
        builder.block();
        builder.block();
        let i2 = builder.ret()?;
        let func = builder.finish();

        assert_eq!(func.name(), "f");
        assert_eq!(func.block_count(), 3);
        assert!(func.block(1).is_some_and(MachineBlock::is_empty));
        assert!(func.is_last_block(2));
        assert!(!func.is_last_block(1));
        assert!(i0 < i1 && i1 < i2);
        assert_eq!(func.block(0).and_then(MachineBlock::last), Some(i1));

        let order: Vec<_> = func.iter_instructions().map(|(b, mi)| (b, mi.id)).collect();
        assert_eq!(order, vec![(0, i0), (0, i1), (2, i2)]);
        assert_eq!(func.block_instrs(5).count(), 0);
        Ok(())
    }

    #[test]
    fn test_last_non_debug_instr() -> Result<()> {
        let mut builder = FunctionBuilder::new("f");
        let x = builder.variable("x");
        builder.block();
        let ret = builder.ret()?;
        builder.dbg_value(x, VariableLocation::Constant(1))?;
        builder.block();
        builder.dbg_value(x, VariableLocation::Constant(2))?;
        let func = builder.finish();

        assert_eq!(func.last_non_debug_instr(0), Some(ret));
        assert_eq!(func.last_non_debug_instr(1), None);
        assert_eq!(func.last_non_debug_instr(9), None);
        Ok(())
    }

    #[test]
    fn test_debug_loc_follows_builder() -> Result<()> {
        let mut builder = FunctionBuilder::new("f");
        builder.block();
        let a = builder.op("nop", &[])?;
        builder.at(DebugLoc::new(4, 2));
        let b = builder.op("nop", &[])?;
        builder.clear_loc();
        let c = builder.op("nop", &[])?;
        let func = builder.finish();

        assert_eq!(func.instr(a).debug_loc, None);
        assert_eq!(func.instr(b).debug_loc, Some(DebugLoc::new(4, 2)));
        assert_eq!(func.instr(c).debug_loc, None);
        Ok(())
    }

    #[test]
    fn test_verify_register_range() -> Result<()> {
        let mut builder = FunctionBuilder::new("f");
        let x = builder.variable("x");
        builder.block();
        builder.dbg_value(x, VariableLocation::Register(r(3)))?;
        builder.def("mov", &[r(7)])?;
        let func = builder.finish();

        assert!(func.verify(&AliasTable::new(8, &[])).is_ok());
        let err = func.verify(&AliasTable::new(4, &[]));
        assert!(matches!(
            err,
            Err(Error::RegisterOutOfRange { register, num_regs: 4 }) if register == r(7)
        ));
        Ok(())
    }

    /// Claims two registers but lets `r1` alias a third one.
    struct LeakyAliases([Register; 2]);

    impl RegisterInfo for LeakyAliases {
        fn num_regs(&self) -> usize {
            2
        }

        fn aliases(&self, reg: Register) -> &[Register] {
            if reg == r(1) {
                &self.0
            } else {
                &[]
            }
        }
    }

    #[test]
    fn test_verify_rejects_alias_out_of_range() -> Result<()> {
        let info = LeakyAliases([r(1), r(2)]);
        let mut builder = FunctionBuilder::new("f");
        builder.block();
        builder.def("mov", &[r(1)])?;
        let func = builder.finish();

        assert!(matches!(
            func.verify(&info),
            Err(Error::RegisterOutOfRange { register, num_regs: 2 }) if register == r(2)
        ));
        Ok(())
    }

    #[test]
    fn test_display_uses_register_names() -> Result<()> {
        let info = AliasTable::new(2, &[]).with_names(["sp", "acc"]);
        let mut builder = FunctionBuilder::new("f");
        let x = builder.variable("x");
        builder.block();
        builder.dbg_value(x, VariableLocation::Register(r(1)))?;
        builder.frame_setup("sub", &[r(0)])?;
        let func = builder.finish();

        let text = func.display(&info).to_string();
        assert_eq!(
            text,
            "function f:\nbb.0:\n  I0: DBG_VALUE acc, \"x\"\n  I1: sub def sp\n"
        );
        Ok(())
    }
}
