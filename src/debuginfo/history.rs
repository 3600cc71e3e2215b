//! The debug value history map.
//!
//! For every debug variable the map stores the instruction ranges during
//! which one of its debug values is in effect. A range starts at a debug
//! value for the variable and ends at the instruction that invalidates the
//! location, or stays open when the location is valid up to the end of the
//! function.
//!
//! The map borrows the [`MachineFunction`] it describes: ranges refer to
//! instructions by [`InstrId`] and those ids only mean something while the
//! function's instruction arena is alive.

use std::{collections::HashMap, fmt};

use crate::{
    machine::{InstrId, MachineFunction, Register, RegisterInfo, VarId, VariableLocation},
    Result,
};

/// A range of instructions during which a variable's debug value holds.
///
/// The end normally follows the start. A block ending in a debug value
/// closes that value's range at the debug value itself, leaving an empty
/// range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstrRange {
    start: InstrId,
    end: Option<InstrId>,
}

impl InstrRange {
    /// The debug value opening this range.
    #[must_use]
    pub const fn start(&self) -> InstrId {
        self.start
    }

    /// The instruction closing this range, `None` while the range is open.
    #[must_use]
    pub const fn end(&self) -> Option<InstrId> {
        self.end
    }

    /// Returns `true` if no instruction closed the range.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.end.is_none()
    }
}

/// History of variable locations over one function.
///
/// Variables are kept in the order in which their first debug value was
/// seen; the ranges of each variable are in scan order.
#[derive(Debug, Clone)]
pub struct DbgValueHistory<'f> {
    func: &'f MachineFunction,
    ranges: HashMap<VarId, Vec<InstrRange>>,
    order: Vec<VarId>,
}

impl<'f> DbgValueHistory<'f> {
    /// Creates an empty history for `func`.
    #[must_use]
    pub fn new(func: &'f MachineFunction) -> Self {
        Self {
            func,
            ranges: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Returns the function this history describes.
    #[must_use]
    pub const fn function(&self) -> &'f MachineFunction {
        self.func
    }

    /// Starts a range for `var` at the debug value `instr`.
    ///
    /// If the latest range of `var` is still open and was started by an
    /// identical debug value, that range simply continues and nothing is
    /// appended. A still open range with a different location is superseded:
    /// it ends at `instr`, where the new range begins. Returns `true` if a new
    /// range was appended.
    ///
    /// # Panics
    ///
    /// Panics if `instr` is not a debug value describing `var`.
    pub fn start_range(&mut self, var: VarId, instr: InstrId) -> bool {
        let func = self.func;
        let mi = func.instr(instr);
        assert_eq!(
            mi.debug_variable(),
            Some(var),
            "range for {var} must start at a debug value of {var}, got {mi}"
        );

        if !self.ranges.contains_key(&var) {
            self.order.push(var);
        }
        let ranges = self.ranges.entry(var).or_default();

        if let Some(last) = ranges.last_mut() {
            if last.is_open() {
                if func.instr(last.start).is_identical_to(mi) {
                    tracing::debug!(
                        "coalescing identical debug values for {var}: {} and {}",
                        last.start,
                        instr
                    );
                    return false;
                }
                last.end = Some(instr);
            }
        }

        ranges.push(InstrRange {
            start: instr,
            end: None,
        });
        true
    }

    /// Closes the open range of `var` at `instr`.
    ///
    /// # Panics
    ///
    /// Panics if `var` has no open range.
    pub fn end_range(&mut self, var: VarId, instr: InstrId) {
        let last = self.ranges.get_mut(&var).and_then(|ranges| ranges.last_mut());
        match last {
            Some(range) if range.is_open() => range.end = Some(instr),
            _ => panic!("closing a range of {var} at {instr} without an open range"),
        }
    }

    /// Returns the register describing `var` right now.
    ///
    /// `None` if the variable has no range, its latest range is closed, or
    /// the debug value opening it does not describe a register location.
    #[must_use]
    pub fn register_for(&self, var: VarId) -> Option<Register> {
        let last = self.ranges.get(&var)?.last()?;
        if !last.is_open() {
            return None;
        }
        self.func.instr(last.start).described_register()
    }

    /// Returns the location declared by the debug value opening `range`.
    #[must_use]
    pub fn location(&self, range: &InstrRange) -> Option<VariableLocation> {
        self.func.instr(range.start).debug_value().map(|(_, loc)| loc)
    }

    /// Returns the ranges of `var` in scan order; empty if `var` never had one.
    #[must_use]
    pub fn ranges(&self, var: VarId) -> &[InstrRange] {
        self.ranges.get(&var).map_or(&[], Vec::as_slice)
    }

    /// Iterates the variables with their ranges, in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (VarId, &[InstrRange])> + '_ {
        self.order.iter().map(|&var| (var, self.ranges(var)))
    }

    /// Variables whose latest range is open and not register-described.
    pub(crate) fn open_non_register_vars(&self) -> Vec<VarId> {
        self.order
            .iter()
            .copied()
            .filter(|&var| {
                self.ranges(var).last().is_some_and(|last| {
                    last.is_open() && self.func.instr(last.start).described_register().is_none()
                })
            })
            .collect()
    }

    /// Number of variables with at least one range.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if no variable has a range.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Removes all ranges.
    pub fn clear(&mut self) {
        self.ranges.clear();
        self.order.clear();
    }

    /// Checks the structural guarantees of a finished history.
    ///
    /// Every range must start at a debug value of its variable, an end must
    /// be an instruction of the function and not come before its start, ranges must be in scan order and only the
    /// last range of a variable may be open.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] describing the first violation.
    pub fn verify(&self) -> Result<()> {
        for (var, ranges) in self.iter() {
            let mut previous: Option<InstrId> = None;
            for (idx, range) in ranges.iter().enumerate() {
                let start = self.func.get_instr(range.start).ok_or_else(|| {
                    malformed_error!("Range of {} starts at unknown {}", var, range.start)
                })?;
                if start.debug_variable() != Some(var) {
                    return Err(malformed_error!(
                        "Range of {} starts at {} which is not one of its debug values",
                        var,
                        range.start
                    ));
                }
                if let Some(prev) = previous {
                    if range.start <= prev {
                        return Err(malformed_error!(
                            "Ranges of {} out of order: {} after {}",
                            var,
                            range.start,
                            prev
                        ));
                    }
                }
                if let Some(end) = range.end {
                    if self.func.get_instr(end).is_none() {
                        return Err(malformed_error!(
                            "Range of {} ends at unknown {}",
                            var,
                            end
                        ));
                    }
                }
                match range.end {
                    Some(end) if end < range.start => {
                        return Err(malformed_error!(
                            "Range of {} ends at {} before it starts at {}",
                            var,
                            end,
                            range.start
                        ));
                    }
                    None if idx + 1 != ranges.len() => {
                        return Err(malformed_error!(
                            "Range of {} starting at {} is open but not the last one",
                            var,
                            range.start
                        ));
                    }
                    _ => {}
                }
                previous = Some(range.start);
            }
        }
        Ok(())
    }

    /// Renders the history with register names from `info`.
    #[must_use]
    pub fn display<'a>(&'a self, info: &'a dyn RegisterInfo) -> HistoryDisplay<'a, 'f> {
        HistoryDisplay {
            history: self,
            info,
        }
    }
}

/// Printable view of a [`DbgValueHistory`], see [`DbgValueHistory::display`].
pub struct HistoryDisplay<'a, 'f> {
    history: &'a DbgValueHistory<'f>,
    info: &'a dyn RegisterInfo,
}

impl fmt::Display for HistoryDisplay<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let func = self.history.func;
        for (var, ranges) in self.history.iter() {
            match func.variable(var) {
                Some(variable) => writeln!(f, "{var} \"{}\":", variable.name)?,
                None => writeln!(f, "{var}:")?,
            }
            for range in ranges {
                write!(f, "  [{}, ", range.start)?;
                match range.end {
                    Some(end) => write!(f, "{end}")?,
                    None => write!(f, "end")?,
                }
                write!(f, ") ")?;
                match self.history.location(range) {
                    Some(VariableLocation::Register(reg)) => {
                        writeln!(f, "{}", self.info.name(reg))?;
                    }
                    Some(VariableLocation::Indirect { base, offset }) => {
                        writeln!(f, "[{}{offset:+}]", self.info.name(base))?;
                    }
                    Some(location) => writeln!(f, "{location}")?,
                    None => writeln!(f, "?")?,
                }
            }
        }
        Ok(())
    }
}
