//! x86/x64 general purpose register file.
//!
//! Provides a ready-made [`RegisterInfo`] for the x86 family so histories can
//! be computed for real machine code without hand-writing alias tables.
//!
//! # Overlap Rules
//!
//! All views of the same architectural register overlap each other
//! (`AL`, `AX`, `EAX` and `RAX` share storage). The legacy high-byte
//! registers are the exception: `AH` overlaps `AX`/`EAX`/`RAX` but not `AL`,
//! since the two bytes are disjoint. The REX views (`R8D`/`R8W`/`R8B` through
//! `R15B`, and `SPL`, `BPL`, `SIL`, `DIL`) follow the same rule.
//!
//! # Example
//!
//! ```rust
//! use dbghistory::machine::{RegisterInfo, X86Register, X86RegisterInfo};
//!
//! let info = X86RegisterInfo::new();
//! let al = X86Register::Al.register();
//! let aliases = info.aliases(al);
//!
//! assert!(aliases.contains(&X86Register::Rax.register()));
//! assert!(!aliases.contains(&X86Register::Ah.register()));
//! assert_eq!(info.name(al), "al");
//! ```

use std::borrow::Cow;

use strum::{EnumCount, EnumIter, IntoEnumIterator, IntoStaticStr};

use crate::machine::{AliasTable, Register, RegisterInfo};

/// x86/x64 general-purpose register.
///
/// The declaration order defines the [`Register`] number of each variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum X86Register {
    /// 64-bit accumulator register (RAX)
    Rax,
    /// 64-bit counter register (RCX)
    Rcx,
    /// 64-bit data register (RDX)
    Rdx,
    /// 64-bit base register (RBX)
    Rbx,
    /// 64-bit stack pointer (RSP)
    Rsp,
    /// 64-bit base pointer (RBP)
    Rbp,
    /// 64-bit source index (RSI)
    Rsi,
    /// 64-bit destination index (RDI)
    Rdi,
    /// 64-bit extended register R8
    R8,
    /// 64-bit extended register R9
    R9,
    /// 64-bit extended register R10
    R10,
    /// 64-bit extended register R11
    R11,
    /// 64-bit extended register R12
    R12,
    /// 64-bit extended register R13
    R13,
    /// 64-bit extended register R14
    R14,
    /// 64-bit extended register R15
    R15,

    /// 32-bit accumulator register (EAX)
    Eax,
    /// 32-bit counter register (ECX)
    Ecx,
    /// 32-bit data register (EDX)
    Edx,
    /// 32-bit base register (EBX)
    Ebx,
    /// 32-bit stack pointer (ESP)
    Esp,
    /// 32-bit base pointer (EBP)
    Ebp,
    /// 32-bit source index (ESI)
    Esi,
    /// 32-bit destination index (EDI)
    Edi,

    /// 16-bit accumulator register (AX)
    Ax,
    /// 16-bit counter register (CX)
    Cx,
    /// 16-bit data register (DX)
    Dx,
    /// 16-bit base register (BX)
    Bx,
    /// 16-bit stack pointer (SP)
    Sp,
    /// 16-bit base pointer (BP)
    Bp,
    /// 16-bit source index (SI)
    Si,
    /// 16-bit destination index (DI)
    Di,

    /// 8-bit low accumulator (AL)
    Al,
    /// 8-bit low counter (CL)
    Cl,
    /// 8-bit low data (DL)
    Dl,
    /// 8-bit low base (BL)
    Bl,
    /// 8-bit high accumulator (AH)
    Ah,
    /// 8-bit high counter (CH)
    Ch,
    /// 8-bit high data (DH)
    Dh,
    /// 8-bit high base (BH)
    Bh,

    /// 32-bit low half of R8 (R8D)
    R8d,
    /// 32-bit low half of R9 (R9D)
    R9d,
    /// 32-bit low half of R10 (R10D)
    R10d,
    /// 32-bit low half of R11 (R11D)
    R11d,
    /// 32-bit low half of R12 (R12D)
    R12d,
    /// 32-bit low half of R13 (R13D)
    R13d,
    /// 32-bit low half of R14 (R14D)
    R14d,
    /// 32-bit low half of R15 (R15D)
    R15d,

    /// 16-bit low word of R8 (R8W)
    R8w,
    /// 16-bit low word of R9 (R9W)
    R9w,
    /// 16-bit low word of R10 (R10W)
    R10w,
    /// 16-bit low word of R11 (R11W)
    R11w,
    /// 16-bit low word of R12 (R12W)
    R12w,
    /// 16-bit low word of R13 (R13W)
    R13w,
    /// 16-bit low word of R14 (R14W)
    R14w,
    /// 16-bit low word of R15 (R15W)
    R15w,

    /// 8-bit low byte of R8 (R8B)
    R8b,
    /// 8-bit low byte of R9 (R9B)
    R9b,
    /// 8-bit low byte of R10 (R10B)
    R10b,
    /// 8-bit low byte of R11 (R11B)
    R11b,
    /// 8-bit low byte of R12 (R12B)
    R12b,
    /// 8-bit low byte of R13 (R13B)
    R13b,
    /// 8-bit low byte of R14 (R14B)
    R14b,
    /// 8-bit low byte of R15 (R15B)
    R15b,

    /// 8-bit low byte of the stack pointer (SPL)
    Spl,
    /// 8-bit low byte of the base pointer (BPL)
    Bpl,
    /// 8-bit low byte of the source index (SIL)
    Sil,
    /// 8-bit low byte of the destination index (DIL)
    Dil,
}

impl X86Register {
    /// Returns the register number used in machine instructions.
    #[must_use]
    pub const fn register(self) -> Register {
        Register::new(self as u16)
    }

    /// Maps a register number back to the x86 register, if it is one.
    #[must_use]
    pub fn from_register(reg: Register) -> Option<Self> {
        Self::iter().nth(reg.index())
    }

    /// Returns the size of this register in bytes.
    #[must_use]
    pub fn size(self) -> u8 {
        match self {
            X86Register::Al
            | X86Register::Cl
            | X86Register::Dl
            | X86Register::Bl
            | X86Register::Ah
            | X86Register::Ch
            | X86Register::Dh
            | X86Register::Bh
            | X86Register::R8b
            | X86Register::R9b
            | X86Register::R10b
            | X86Register::R11b
            | X86Register::R12b
            | X86Register::R13b
            | X86Register::R14b
            | X86Register::R15b
            | X86Register::Spl
            | X86Register::Bpl
            | X86Register::Sil
            | X86Register::Dil => 1,
            X86Register::Ax
            | X86Register::Cx
            | X86Register::Dx
            | X86Register::Bx
            | X86Register::Sp
            | X86Register::Bp
            | X86Register::Si
            | X86Register::Di
            | X86Register::R8w
            | X86Register::R9w
            | X86Register::R10w
            | X86Register::R11w
            | X86Register::R12w
            | X86Register::R13w
            | X86Register::R14w
            | X86Register::R15w => 2,
            X86Register::Eax
            | X86Register::Ecx
            | X86Register::Edx
            | X86Register::Ebx
            | X86Register::Esp
            | X86Register::Ebp
            | X86Register::Esi
            | X86Register::Edi
            | X86Register::R8d
            | X86Register::R9d
            | X86Register::R10d
            | X86Register::R11d
            | X86Register::R12d
            | X86Register::R13d
            | X86Register::R14d
            | X86Register::R15d => 4,
            _ => 8,
        }
    }

    /// Returns the number of the architectural register this is a view of.
    /// `AL`, `AH`, `AX`, `EAX` and `RAX` all map to 0.
    #[must_use]
    pub fn base_index(self) -> u8 {
        match self {
            X86Register::Al
            | X86Register::Ah
            | X86Register::Ax
            | X86Register::Eax
            | X86Register::Rax => 0,
            X86Register::Cl
            | X86Register::Ch
            | X86Register::Cx
            | X86Register::Ecx
            | X86Register::Rcx => 1,
            X86Register::Dl
            | X86Register::Dh
            | X86Register::Dx
            | X86Register::Edx
            | X86Register::Rdx => 2,
            X86Register::Bl
            | X86Register::Bh
            | X86Register::Bx
            | X86Register::Ebx
            | X86Register::Rbx => 3,
            X86Register::Spl | X86Register::Sp | X86Register::Esp | X86Register::Rsp => 4,
            X86Register::Bpl | X86Register::Bp | X86Register::Ebp | X86Register::Rbp => 5,
            X86Register::Sil | X86Register::Si | X86Register::Esi | X86Register::Rsi => 6,
            X86Register::Dil | X86Register::Di | X86Register::Edi | X86Register::Rdi => 7,
            X86Register::R8b
            | X86Register::R8w
            | X86Register::R8d
            | X86Register::R8 => 8,
            X86Register::R9b
            | X86Register::R9w
            | X86Register::R9d
            | X86Register::R9 => 9,
            X86Register::R10b
            | X86Register::R10w
            | X86Register::R10d
            | X86Register::R10 => 10,
            X86Register::R11b
            | X86Register::R11w
            | X86Register::R11d
            | X86Register::R11 => 11,
            X86Register::R12b
            | X86Register::R12w
            | X86Register::R12d
            | X86Register::R12 => 12,
            X86Register::R13b
            | X86Register::R13w
            | X86Register::R13d
            | X86Register::R13 => 13,
            X86Register::R14b
            | X86Register::R14w
            | X86Register::R14d
            | X86Register::R14 => 14,
            X86Register::R15b
            | X86Register::R15w
            | X86Register::R15d
            | X86Register::R15 => 15,
        }
    }

    /// Returns `true` for the legacy high-byte registers (`AH`, `CH`, `DH`, `BH`).
    #[must_use]
    pub fn is_high_byte(self) -> bool {
        matches!(
            self,
            X86Register::Ah | X86Register::Ch | X86Register::Dh | X86Register::Bh
        )
    }

    /// Returns `true` if this register shares any storage with `other`.
    #[must_use]
    pub fn overlaps(self, other: Self) -> bool {
        if self.base_index() != other.base_index() {
            return false;
        }
        // AL and AH are the two disjoint bytes of AX
        !(self.size() == 1 && other.size() == 1 && self.is_high_byte() != other.is_high_byte())
    }

    /// Returns `true` if this is the stack pointer register.
    #[must_use]
    pub fn is_stack_pointer(self) -> bool {
        self.base_index() == 4
    }
}

/// [`RegisterInfo`] for the x86/x64 general purpose registers.
#[derive(Debug, Clone)]
pub struct X86RegisterInfo {
    table: AliasTable,
}

impl X86RegisterInfo {
    /// Builds the alias table for all [`X86Register`] variants.
    #[must_use]
    pub fn new() -> Self {
        let mut pairs = Vec::new();
        for a in X86Register::iter() {
            for b in X86Register::iter() {
                if (a as u16) < (b as u16) && a.overlaps(b) {
                    pairs.push((a as u16, b as u16));
                }
            }
        }
        Self {
            table: AliasTable::new(X86Register::COUNT, &pairs),
        }
    }
}

impl Default for X86RegisterInfo {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterInfo for X86RegisterInfo {
    fn num_regs(&self) -> usize {
        X86Register::COUNT
    }

    fn aliases(&self, reg: Register) -> &[Register] {
        self.table.aliases(reg)
    }

    fn name(&self, reg: Register) -> Cow<'_, str> {
        match X86Register::from_register(reg) {
            Some(x86) => {
                let name: &'static str = x86.into();
                Cow::Borrowed(name)
            }
            None => Cow::Owned(reg.to_string()),
        }
    }
}
