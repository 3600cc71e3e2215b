//! Sample functions shared by the unit tests.

use crate::machine::{
    AliasTable, DebugLoc, FunctionBuilder, InstrId, MachineFunction, Register, VarId,
    VariableLocation, X86Register,
};

/// A small target: `r0` is the full register made of the halves `r1` and
/// `r2`, `r3`..`r7` are independent.
pub fn toy_target() -> AliasTable {
    AliasTable::new(8, &[(0, 1), (0, 2)])
        .with_names(["r0", "r0.lo", "r0.hi", "r3", "r4", "r5", "r6", "r7"])
}

/// A sample function together with the handles the tests look at.
pub struct Sample {
    pub func: MachineFunction,
    pub vars: Vec<VarId>,
    pub ids: Vec<InstrId>,
}

/// `B0 = [DBG v=r1, mov r1]`, `B1 = [DBG v=r2]`
pub fn two_block_sample() -> Sample {
    let mut builder = FunctionBuilder::new("two_blocks");
    let v = builder.variable("v");
    builder.block();
    let i0 = builder
        .dbg_value(v, VariableLocation::Register(Register::new(1)))
        .unwrap();
    let i1 = builder.def("mov", &[Register::new(1)]).unwrap();
    builder.block();
    let i2 = builder
        .dbg_value(v, VariableLocation::Register(Register::new(2)))
        .unwrap();

    Sample {
        func: builder.finish(),
        vars: vec![v],
        ids: vec![i0, i1, i2],
    }
}

/// A frame-pointer based x64 function.
///
/// ```text
/// B0: I0 push rsp     (prologue)
///     I1 mov  rbp     (prologue)
///     I2 DBG  x=[rbp-8]
///     I3 DBG  y=edi
///     I4 mov  eax
///     I5 add  rdi
/// B1: I6 DBG  y=eax
///     I7 call helper  (clobbers rax, rcx, rdx)
///     I8 pop  rbp     (epilogue)
///     I9 ret
/// ```
pub fn x86_frame_sample() -> Sample {
    use X86Register::{Eax, Edi, Rax, Rbp, Rcx, Rdi, Rdx, Rsp};

    let mut builder = FunctionBuilder::new("frame");
    let x = builder.variable("x");
    let y = builder.variable("y");
    let mut ids = Vec::new();

    builder.block();
    builder.at(DebugLoc::new(1, 1));
    ids.push(builder.frame_setup("push", &[Rsp.register()]).unwrap());
    ids.push(builder.frame_setup("mov", &[Rbp.register()]).unwrap());
    builder.at(DebugLoc::new(2, 5));
    ids.push(
        builder
            .dbg_value(
                x,
                VariableLocation::Indirect {
                    base: Rbp.register(),
                    offset: -8,
                },
            )
            .unwrap(),
    );
    ids.push(
        builder
            .dbg_value(y, VariableLocation::Register(Edi.register()))
            .unwrap(),
    );
    builder.at(DebugLoc::new(3, 5));
    ids.push(builder.def("mov", &[Eax.register()]).unwrap());
    ids.push(builder.def("add", &[Rdi.register()]).unwrap());

    builder.block();
    builder.at(DebugLoc::new(4, 5));
    ids.push(
        builder
            .dbg_value(y, VariableLocation::Register(Eax.register()))
            .unwrap(),
    );
    ids.push(
        builder
            .call("helper", &[Rax.register(), Rcx.register(), Rdx.register()])
            .unwrap(),
    );
    builder.at(DebugLoc::new(5, 1));
    ids.push(builder.frame_destroy("pop", &[Rbp.register()]).unwrap());
    ids.push(builder.ret().unwrap());

    Sample {
        func: builder.finish(),
        vars: vec![x, y],
        ids,
    }
}
