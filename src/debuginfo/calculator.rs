//! The debug value history calculation.
//!
//! A single forward scan over the blocks of a function in layout order:
//!
//! - An ordinary instruction ends the ranges of all variables described by a
//!   changing register it (or one of the register's aliases) overwrites.
//! - A debug value moves its variable to a new location: the variable is
//!   unlinked from its previous register, a range is started (or an
//!   identical open one continued), and the new register is linked.
//! - At the end of every block except the last, ranges of variables still
//!   described by a changing register are ended at the block's last
//!   instruction. Ranges left open in the last block run to the end of the
//!   function.
//!
//! # Example
//!
//! ```rust
//! use dbghistory::debuginfo::calculate_history;
//! use dbghistory::machine::{AliasTable, FunctionBuilder, Register, VariableLocation};
//!
//! let info = AliasTable::new(4, &[]);
//! let (r1, r2) = (Register::new(1), Register::new(2));
//!
//! let mut builder = FunctionBuilder::new("f");
//! let v = builder.variable("v");
//! builder.block();
//! let i0 = builder.dbg_value(v, VariableLocation::Register(r1))?;
//! let i1 = builder.def("mov", &[r1])?;
//! builder.block();
//! let i2 = builder.dbg_value(v, VariableLocation::Register(r2))?;
//! let func = builder.finish();
//!
//! let history = calculate_history(&func, &info)?;
//! let ranges = history.ranges(v);
//! assert_eq!((ranges[0].start(), ranges[0].end()), (i0, Some(i1)));
//! assert_eq!((ranges[1].start(), ranges[1].end()), (i2, None));
//! # Ok::<(), dbghistory::Error>(())
//! ```

use rayon::prelude::*;

use crate::{
    debuginfo::{
        changing::{collect_changing_registers, collect_clobbered_registers},
        DbgValueHistory, RegDescribedVars,
    },
    machine::{
        InstrId, MachineFunction, MachineInstr, Register, RegisterInfo, RegisterSet, VarId,
    },
    Result,
};

/// Which ranges are ended at the end of a block that is not the last one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BlockBoundary {
    /// Only ranges described by a changing register end at block boundaries.
    /// Ranges of stack slot, constant and undefined locations run on into
    /// the following blocks.
    #[default]
    RegisterDescribed,
    /// Additionally end every open range whose location is not described by
    /// a register, so no range crosses a block boundary except those held
    /// in registers that never change.
    AllLocations,
}

/// Configuration of the history calculation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryOptions {
    /// Ignore writes by prologue instructions when collecting changing
    /// registers (default: true).
    pub exclude_frame_setup: bool,

    /// Ignore writes by epilogue instructions when collecting changing
    /// registers (default: true). The epilogue is the run of instructions
    /// before a block's trailing return that share its debug location;
    /// [`InstrFlags::FRAME_DESTROY`](crate::machine::InstrFlags) is not
    /// consulted.
    pub exclude_epilogue: bool,

    /// Block boundary policy (default: [`BlockBoundary::RegisterDescribed`]).
    pub block_boundary: BlockBoundary,
}

impl Default for HistoryOptions {
    fn default() -> Self {
        Self {
            exclude_frame_setup: true,
            exclude_epilogue: true,
            block_boundary: BlockBoundary::default(),
        }
    }
}

/// Computes the debug value history of `func` with default options.
///
/// # Errors
///
/// Returns an error if `func` names registers unknown to `info` or debug
/// variables it does not declare, see [`MachineFunction::verify`].
///
/// # Panics
///
/// Panics if the scan finds the history and register index out of sync,
/// which indicates a malformed instruction stream.
pub fn calculate_history<'f>(
    func: &'f MachineFunction,
    info: &dyn RegisterInfo,
) -> Result<DbgValueHistory<'f>> {
    HistoryCalculator::new(info).calculate(func)
}

/// Debug value history calculation for one target.
///
/// The calculator itself is immutable; all scan state lives in the call to
/// [`calculate`](Self::calculate), so one calculator can serve many
/// functions, also from several threads.
pub struct HistoryCalculator<'i> {
    info: &'i dyn RegisterInfo,
    options: HistoryOptions,
}

impl<'i> HistoryCalculator<'i> {
    /// Creates a calculator with default options.
    #[must_use]
    pub fn new(info: &'i dyn RegisterInfo) -> Self {
        Self {
            info,
            options: HistoryOptions::default(),
        }
    }

    /// Replaces the options.
    #[must_use]
    pub fn with_options(mut self, options: HistoryOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the active options.
    #[must_use]
    pub const fn options(&self) -> &HistoryOptions {
        &self.options
    }

    /// Returns the registers of `func` that change in the function body.
    #[must_use]
    pub fn changing_registers(&self, func: &MachineFunction) -> RegisterSet {
        collect_changing_registers(func, self.info, &self.options)
    }

    /// Computes the debug value history of `func`.
    ///
    /// # Errors
    ///
    /// Returns an error if `func` fails [`MachineFunction::verify`].
    ///
    /// # Panics
    ///
    /// Panics on a malformed instruction stream, see [`calculate_history`].
    pub fn calculate<'f>(&self, func: &'f MachineFunction) -> Result<DbgValueHistory<'f>> {
        func.verify(self.info)?;

        let _span = tracing::debug_span!("dbg_value_history", function = func.name()).entered();
        let changing = self.changing_registers(func);
        let mut tracker = Tracker::new(func);
        let mut clobbered = RegisterSet::new(self.info);

        for block in 0..func.block_count() {
            for instr in func.block_instrs(block) {
                match instr.debug_value() {
                    Some((var, _)) => tracker.describe(var, instr),
                    None => {
                        clobbered.clear();
                        collect_clobbered_registers(instr, self.info, &mut clobbered);
                        for reg in &clobbered {
                            if changing.contains(reg) {
                                tracker.clobber(reg, instr.id);
                            }
                        }
                    }
                }
            }

            if func.is_last_block(block) {
                continue;
            }
            let Some(last) = func.block(block).and_then(|b| b.last()) else {
                continue;
            };
            for reg in &changing {
                tracker.clobber(reg, last);
            }
            if self.options.block_boundary == BlockBoundary::AllLocations {
                tracker.end_non_register_ranges(last);
            }
        }

        let history = tracker.finish();
        tracing::debug!(variables = history.len(), "computed debug value history");
        Ok(history)
    }

    /// Computes the histories of many functions in parallel.
    ///
    /// Results are returned in the order of `funcs`.
    ///
    /// # Errors
    ///
    /// Returns an error if any function fails [`MachineFunction::verify`].
    pub fn calculate_all<'f>(
        &self,
        funcs: &'f [MachineFunction],
    ) -> Result<Vec<DbgValueHistory<'f>>> {
        funcs.par_iter().map(|func| self.calculate(func)).collect()
    }
}

/// Scan state: the history under construction and the register index that
/// mirrors which open ranges are register-described.
///
/// Every variable whose latest range is open and described by register `R`
/// is listed under `R` in the index, and nowhere else.
struct Tracker<'f> {
    history: DbgValueHistory<'f>,
    reg_vars: RegDescribedVars,
}

impl<'f> Tracker<'f> {
    fn new(func: &'f MachineFunction) -> Self {
        Self {
            history: DbgValueHistory::new(func),
            reg_vars: RegDescribedVars::new(),
        }
    }

    /// Applies the debug value `instr` for `var`.
    fn describe(&mut self, var: VarId, instr: &MachineInstr) {
        if let Some(prev) = self.history.register_for(var) {
            self.reg_vars.remove(prev, var);
        }

        self.history.start_range(var, instr.id);

        if let Some(reg) = instr.described_register() {
            self.reg_vars.add(reg, var);
        }
    }

    /// Ends the ranges of every variable described by `reg` at `instr`.
    fn clobber(&mut self, reg: Register, instr: InstrId) {
        let Some(vars) = self.reg_vars.take(reg) else {
            return;
        };
        for var in vars {
            tracing::trace!("{instr} clobbers {reg} describing {var}");
            self.history.end_range(var, instr);
        }
    }

    /// Ends the open ranges that no register describes at `instr`.
    fn end_non_register_ranges(&mut self, instr: InstrId) {
        for var in self.history.open_non_register_vars() {
            self.history.end_range(var, instr);
        }
    }

    fn finish(self) -> DbgValueHistory<'f> {
        self.history
    }
}
