//! Collection of registers that change inside the function body.
//!
//! Registers written only while the frame is set up or torn down hold the
//! same value for the whole body (think of the frame pointer). Debug values
//! described by such a register must not be ended by those writes, so the
//! history scan only treats writes to *changing* registers as clobbers.
//!
//! # Epilogue Detection
//!
//! Epilogues are recognised by source position alone, never by instruction
//! flags. A block ending in a return is assumed to carry an epilogue made of
//! the instructions directly preceding the return that share its source
//! position:
//!
//! ```text
//! I0: add  def r1      !3:1
//! I1: pop  def r6      !9:1   <- first epilogue instruction
//! I2: ret              !9:1
//! ```

use crate::{
    debuginfo::HistoryOptions,
    machine::{InstrId, MachineFunction, MachineInstr, RegisterInfo, RegisterSet},
};

/// Returns the first instruction of the epilogue of block `block`, if any.
///
/// The epilogue is the contiguous run of instructions ending at the block's
/// last non-debug instruction that carry the same debug location as it. A
/// block without a trailing return has no epilogue. When every instruction
/// up to the return shares that location, the whole block is the epilogue.
#[must_use]
pub fn first_epilogue_instr(func: &MachineFunction, block: usize) -> Option<InstrId> {
    let last = func.last_non_debug_instr(block)?;
    let ret = func.instr(last);
    if !ret.is_return() {
        return None;
    }

    let instrs = func.block(block)?.instructions();
    let ret_pos = instrs.iter().position(|&id| id == last)?;

    let mut first = last;
    for &id in instrs[..ret_pos].iter().rev() {
        if func.instr(id).debug_loc != ret.debug_loc {
            return Some(first);
        }
        first = id;
    }
    instrs.first().copied()
}

/// Adds every register written by `instr`, together with all of its
/// aliases, to `regs`.
pub fn collect_clobbered_registers(
    instr: &MachineInstr,
    info: &dyn RegisterInfo,
    regs: &mut RegisterSet,
) {
    for reg in instr.defs() {
        regs.insert_with_aliases(reg, info);
    }
}

/// Collects the registers written by instructions outside the prologue and
/// epilogue of `func`, including all their aliases.
#[must_use]
pub fn collect_changing_registers(
    func: &MachineFunction,
    info: &dyn RegisterInfo,
    options: &HistoryOptions,
) -> RegisterSet {
    let mut regs = RegisterSet::new(info);

    for block in 0..func.block_count() {
        let epilogue = if options.exclude_epilogue {
            first_epilogue_instr(func, block)
        } else {
            None
        };

        let mut in_epilogue = false;
        for instr in func.block_instrs(block) {
            in_epilogue |= Some(instr.id) == epilogue;
            if in_epilogue || (options.exclude_frame_setup && instr.is_frame_setup()) {
                continue;
            }
            collect_clobbered_registers(instr, info, &mut regs);
        }
    }

    tracing::debug!(
        function = func.name(),
        changing = regs.len(),
        "collected changing registers"
    );
    regs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        machine::{AliasTable, DebugLoc, FunctionBuilder, InstrFlags, Register, VariableLocation},
        Result,
    };

    fn r(id: u16) -> Register {
        Register::new(id)
    }

    #[test]
    fn test_no_epilogue_without_return() -> Result<()> {
        let mut builder = FunctionBuilder::new("f");
        builder.block();
        builder.def("mov", &[r(1)])?;
        builder.block();
        let func = builder.finish();

        assert_eq!(first_epilogue_instr(&func, 0), None);
        assert_eq!(first_epilogue_instr(&func, 1), None);
        Ok(())
    }

    #[test]
    fn test_epilogue_is_run_sharing_return_loc() -> Result<()> {
        let mut builder = FunctionBuilder::new("f");
        builder.block();
        builder.at(DebugLoc::new(9, 1));
        builder.def("mov", &[r(1)])?;
        builder.at(DebugLoc::new(3, 1));
        builder.def("add", &[r(1)])?;
        builder.at(DebugLoc::new(9, 1));
        let pop = builder.frame_destroy("pop", &[r(6)])?;
        builder.def("add", &[r(7)])?;
        builder.ret()?;
        let func = builder.finish();

        assert_eq!(first_epilogue_instr(&func, 0), Some(pop));
        Ok(())
    }

    #[test]
    fn test_whole_block_epilogue() -> Result<()> {
        let mut builder = FunctionBuilder::new("f");
        let x = builder.variable("x");
        builder.block();
        builder.at(DebugLoc::new(2, 1));
        let first = builder.def("pop", &[r(6)])?;
        builder.ret()?;
        builder.dbg_value(x, VariableLocation::Undefined)?;
        let func = builder.finish();

        assert_eq!(first_epilogue_instr(&func, 0), Some(first));
        Ok(())
    }

    #[test]
    fn test_epilogue_of_lone_return() -> Result<()> {
        let mut builder = FunctionBuilder::new("f");
        builder.block();
        builder.at(DebugLoc::new(1, 1));
        builder.def("mov", &[r(1)])?;
        builder.at(DebugLoc::new(2, 1));
        let ret = builder.ret()?;
        let func = builder.finish();

        assert_eq!(first_epilogue_instr(&func, 0), Some(ret));
        Ok(())
    }

    #[test]
    fn test_frame_destroy_flag_does_not_make_epilogue() -> Result<()> {
        let info = AliasTable::new(8, &[]);
        let mut builder = FunctionBuilder::new("f");
        builder.block();
        builder.at(DebugLoc::new(5, 1));
        let pop = builder.frame_destroy("pop", &[r(6)])?;
        builder.at(DebugLoc::new(7, 1));
        let ret = builder.ret()?;
        let func = builder.finish();

        assert_eq!(first_epilogue_instr(&func, 0), Some(ret));
        assert!(func.instr(pop).flags.contains(InstrFlags::FRAME_DESTROY));

        let regs = collect_changing_registers(&func, &info, &HistoryOptions::default());
        assert!(regs.contains(r(6)));
        Ok(())
    }

    #[test]
    fn test_changing_registers_skip_prologue_and_epilogue() -> Result<()> {
        let info = AliasTable::new(8, &[(1, 2)]);
        let mut builder = FunctionBuilder::new("f");
        builder.block();
        builder.at(DebugLoc::new(1, 1));
        builder.frame_setup("push", &[r(6)])?;
        builder.def("mov", &[r(2)])?;
        builder.at(DebugLoc::new(5, 1));
        builder.def("pop", &[r(5)])?;
        builder.ret()?;
        let func = builder.finish();

        let regs = collect_changing_registers(&func, &info, &HistoryOptions::default());
        assert_eq!(regs.iter().collect::<Vec<_>>(), vec![r(1), r(2)]);

        let all = HistoryOptions {
            exclude_frame_setup: false,
            exclude_epilogue: false,
            ..HistoryOptions::default()
        };
        let regs = collect_changing_registers(&func, &info, &all);
        assert_eq!(regs.iter().collect::<Vec<_>>(), vec![r(1), r(2), r(5), r(6)]);
        Ok(())
    }

    #[test]
    fn test_clobbered_registers_expand_aliases() -> Result<()> {
        let info = AliasTable::new(4, &[(0, 1), (0, 2)]);
        let mut builder = FunctionBuilder::new("f");
        builder.block();
        let id = builder.def("mov", &[r(1), r(1)])?;
        let func = builder.finish();

        let mut regs = RegisterSet::new(&info);
        collect_clobbered_registers(func.instr(id), &info, &mut regs);
        assert_eq!(regs.iter().collect::<Vec<_>>(), vec![r(0), r(1)]);
        Ok(())
    }
}
