//! Register to variable index used while scanning a function.
//!
//! Maps every register that currently describes at least one variable to
//! those variables. Entries are removed as soon as they become empty, so a
//! register with an entry always describes something.

use std::collections::HashMap;

use crate::machine::{Register, VarId};

/// Which variables each register currently describes.
#[derive(Debug, Clone, Default)]
pub struct RegDescribedVars {
    map: HashMap<Register, Vec<VarId>>,
}

impl RegDescribedVars {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `var` is now described by `reg`.
    ///
    /// # Panics
    ///
    /// Panics if `var` is already recorded under `reg`.
    pub fn add(&mut self, reg: Register, var: VarId) {
        let vars = self.map.entry(reg).or_default();
        assert!(
            !vars.contains(&var),
            "{var} is already described by register {reg}"
        );
        vars.push(var);
    }

    /// Records that `var` is no longer described by `reg`.
    ///
    /// # Panics
    ///
    /// Panics if `reg` has no entry or `var` is not part of it.
    pub fn remove(&mut self, reg: Register, var: VarId) {
        let Some(vars) = self.map.get_mut(&reg) else {
            panic!("register {reg} describes no variable, cannot remove {var}");
        };
        let Some(pos) = vars.iter().position(|&v| v == var) else {
            panic!("{var} is not described by register {reg}");
        };
        vars.remove(pos);
        if vars.is_empty() {
            self.map.remove(&reg);
        }
    }

    /// Removes the entry of `reg`, returning the variables it described.
    pub fn take(&mut self, reg: Register) -> Option<Vec<VarId>> {
        self.map.remove(&reg)
    }

    /// Returns the variables described by `reg`.
    #[must_use]
    pub fn vars(&self, reg: Register) -> &[VarId] {
        self.map.get(&reg).map_or(&[], Vec::as_slice)
    }

    /// Returns `true` if no register describes a variable.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Number of registers that describe at least one variable.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_remove_drops_empty_entry() {
        let mut index = RegDescribedVars::new();
        let reg = Register::new(3);

        index.add(reg, VarId::new(0));
        index.add(reg, VarId::new(1));
        assert_eq!(index.vars(reg), &[VarId::new(0), VarId::new(1)]);

        index.remove(reg, VarId::new(0));
        assert_eq!(index.vars(reg), &[VarId::new(1)]);
        assert_eq!(index.len(), 1);

        index.remove(reg, VarId::new(1));
        assert!(index.is_empty());
        assert!(index.take(reg).is_none());
    }

    #[test]
    fn test_take() {
        let mut index = RegDescribedVars::new();
        index.add(Register::new(1), VarId::new(4));
        index.add(Register::new(2), VarId::new(5));

        assert_eq!(index.take(Register::new(1)), Some(vec![VarId::new(4)]));
        assert_eq!(index.len(), 1);
        assert!(index.vars(Register::new(1)).is_empty());
    }

    #[test]
    #[should_panic(expected = "already described")]
    fn test_add_twice_panics() {
        let mut index = RegDescribedVars::new();
        index.add(Register::new(1), VarId::new(0));
        index.add(Register::new(1), VarId::new(0));
    }

    #[test]
    #[should_panic(expected = "describes no variable")]
    fn test_remove_without_entry_panics() {
        let mut index = RegDescribedVars::new();
        index.remove(Register::new(1), VarId::new(0));
    }

    #[test]
    #[should_panic(expected = "is not described by")]
    fn test_remove_unknown_variable_panics() {
        let mut index = RegDescribedVars::new();
        index.add(Register::new(1), VarId::new(0));
        index.remove(Register::new(1), VarId::new(1));
    }
}
