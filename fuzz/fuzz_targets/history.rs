#![no_main]

use dbghistory::prelude::*;
use libfuzzer_sys::fuzz_target;

// Each byte pair is one instruction: the high bits of the first byte pick
// the kind or starts a new block, the rest pick registers, variables and
// source lines.
fuzz_target!(|data: &[u8]| {
    let info = X86RegisterInfo::new();
    let num_regs = info.num_regs() as u8;

    let mut builder = FunctionBuilder::new("fuzz");
    let vars: Vec<VarId> = (0..4).map(|n| builder.variable(format!("v{n}"))).collect();
    builder.block();

    for pair in data.chunks_exact(2) {
        let (op, arg) = (pair[0], pair[1]);
        if op >> 4 >= 12 {
            builder.block();
            continue;
        }
        let reg = Register::new(u16::from(arg % num_regs));
        let var = vars[usize::from(arg >> 6)];
        builder.at(DebugLoc::new(u32::from(op & 0x0f), 0));

        let _ = match op >> 4 {
            0..=3 => builder.def("mov", &[reg]),
            4 => builder.dbg_value(var, VariableLocation::Register(reg)),
            5 => builder.dbg_value(
                var,
                VariableLocation::Indirect {
                    base: reg,
                    offset: i64::from(arg),
                },
            ),
            6 => builder.dbg_value(var, VariableLocation::StackSlot(i32::from(arg))),
            7 => builder.dbg_value(var, VariableLocation::Undefined),
            8 => builder.frame_setup("push", &[reg]),
            9 => builder.frame_destroy("pop", &[reg]),
            10 => builder.call("callee", &[reg]),
            _ => builder.ret(),
        };
    }
    let func = builder.finish();

    for block_boundary in [BlockBoundary::RegisterDescribed, BlockBoundary::AllLocations] {
        let calculator = HistoryCalculator::new(&info).with_options(HistoryOptions {
            block_boundary,
            ..HistoryOptions::default()
        });
        let history = calculator.calculate(&func).unwrap();
        history.verify().unwrap();
    }
});
