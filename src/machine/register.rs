//! Physical registers and the register alias oracle.
//!
//! A [`Register`] is a plain target register number. Whether two registers
//! share storage (a sub-register and its super-register, or two names for
//! the same unit) is answered by a [`RegisterInfo`] implementation. The
//! history calculation never interprets register numbers itself, it only
//! asks the oracle for the overlap set of every register an instruction
//! defines.
//!
//! [`AliasTable`] is a generic oracle built from explicit overlap pairs.
//! Targets with a fixed register file (see [`crate::machine::X86RegisterInfo`])
//! build one of these up front.

use std::{borrow::Cow, fmt};

use crate::utils::{BitSet, BitSetIter};

/// A physical register id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Register(u16);

impl Register {
    /// Creates a register from its target number.
    #[must_use]
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    /// Returns the target number of this register.
    #[must_use]
    pub const fn id(self) -> u16 {
        self.0
    }

    /// Returns the register number as an index into register-sized tables.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Target register description consulted during history calculation.
///
/// Implementations are pure queries without interior state, and must be
/// [`Sync`] so a single instance can serve a parallel batch of functions.
pub trait RegisterInfo: Sync {
    /// Number of registers; every valid [`Register`] has `index() < num_regs()`.
    fn num_regs(&self) -> usize;

    /// Returns every register that physically overlaps `reg`, including `reg`
    /// itself. Registers outside `0..num_regs()` have no aliases.
    ///
    /// Every returned register must be below `num_regs()`.
    /// [`MachineFunction::verify`](crate::machine::MachineFunction::verify)
    /// rejects an oracle that breaks this with
    /// [`Error::RegisterOutOfRange`](crate::Error::RegisterOutOfRange).
    fn aliases(&self, reg: Register) -> &[Register];

    /// Human readable register name.
    fn name(&self, reg: Register) -> Cow<'_, str> {
        Cow::Owned(reg.to_string())
    }
}

/// A register alias oracle backed by precomputed overlap lists.
///
/// # Example
///
/// ```rust
/// use dbghistory::machine::{AliasTable, Register, RegisterInfo};
///
/// // r0 is the full register, r1 and r2 its two disjoint halves
/// let table = AliasTable::new(3, &[(0, 1), (0, 2)]);
/// assert_eq!(table.aliases(Register::new(1)), &[Register::new(0), Register::new(1)]);
/// assert_eq!(table.aliases(Register::new(0)).len(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct AliasTable {
    /// Sorted overlap list per register, always containing the register itself.
    aliases: Vec<Vec<Register>>,
    /// Optional register names, indexed by register number.
    names: Vec<String>,
}

impl AliasTable {
    /// Builds a table for `num_regs` registers where each `(a, b)` pair overlaps.
    ///
    /// The overlap relation is made reflexive and symmetric.
    ///
    /// # Panics
    ///
    /// Panics if a pair names a register outside `0..num_regs`.
    #[must_use]
    pub fn new(num_regs: usize, overlaps: &[(u16, u16)]) -> Self {
        let mut sets: Vec<BitSet> = (0..num_regs)
            .map(|reg| {
                let mut set = BitSet::new(num_regs);
                set.insert(reg);
                set
            })
            .collect();

        for &(a, b) in overlaps {
            sets[a as usize].insert(b as usize);
            sets[b as usize].insert(a as usize);
        }

        let aliases = sets
            .iter()
            .map(|set| set.iter().map(|reg| Register::new(reg as u16)).collect())
            .collect();

        Self {
            aliases,
            names: Vec::new(),
        }
    }

    /// Attaches register names, indexed by register number.
    #[must_use]
    pub fn with_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names = names.into_iter().map(Into::into).collect();
        self
    }
}

impl RegisterInfo for AliasTable {
    fn num_regs(&self) -> usize {
        self.aliases.len()
    }

    fn aliases(&self, reg: Register) -> &[Register] {
        self.aliases.get(reg.index()).map_or(&[], Vec::as_slice)
    }

    fn name(&self, reg: Register) -> Cow<'_, str> {
        match self.names.get(reg.index()) {
            Some(name) => Cow::Borrowed(name.as_str()),
            None => Cow::Owned(reg.to_string()),
        }
    }
}

/// A set of registers of one target.
///
/// Inserting the same register twice leaves a single entry.
#[derive(Clone, PartialEq, Eq)]
pub struct RegisterSet {
    bits: BitSet,
}

impl RegisterSet {
    /// Creates an empty set sized for the registers of `info`.
    #[must_use]
    pub fn new(info: &dyn RegisterInfo) -> Self {
        Self::with_capacity(info.num_regs())
    }

    /// Creates an empty set holding register numbers in `0..num_regs`.
    #[must_use]
    pub fn with_capacity(num_regs: usize) -> Self {
        Self {
            bits: BitSet::new(num_regs),
        }
    }

    /// Adds `reg`, returning `true` if it was not yet present.
    ///
    /// # Panics
    ///
    /// Panics if `reg` is outside the set's capacity.
    pub fn insert(&mut self, reg: Register) -> bool {
        self.bits.insert(reg.index())
    }

    /// Adds `reg` together with every register overlapping it.
    ///
    /// # Panics
    ///
    /// Panics if `info` reports an alias outside the set's capacity.
    pub fn insert_with_aliases(&mut self, reg: Register, info: &dyn RegisterInfo) {
        for &alias in info.aliases(reg) {
            self.insert(alias);
        }
    }

    /// Returns `true` if `reg` is in the set.
    #[must_use]
    pub fn contains(&self, reg: Register) -> bool {
        self.bits.contains(reg.index())
    }

    /// Number of registers in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bits.count()
    }

    /// Returns `true` if the set holds no register.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Removes every register.
    pub fn clear(&mut self) {
        self.bits.clear();
    }

    /// Iterates the registers in ascending number order.
    pub fn iter(&self) -> RegisterSetIter<'_> {
        RegisterSetIter {
            inner: self.bits.iter(),
        }
    }
}

impl fmt::Debug for RegisterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<'a> IntoIterator for &'a RegisterSet {
    type Item = Register;
    type IntoIter = RegisterSetIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the registers of a [`RegisterSet`].
pub struct RegisterSetIter<'a> {
    inner: BitSetIter<'a>,
}

impl Iterator for RegisterSetIter<'_> {
    type Item = Register;

    fn next(&mut self) -> Option<Register> {
        self.inner.next().map(|idx| Register::new(idx as u16))
    }
}
