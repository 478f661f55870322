//! Tables of compiled units. Functions keep their declaration order and branches keep their
//! first-use order, the linker lays the code out following both.

use std::collections::HashMap;

use crate::{
    error::{CompileError, Result},
    instruction::{BranchRef, Fragment, Opcode},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    pub arity: usize,
    pub body: Fragment,
}

/// The program root, it's always laid out at address zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub arity: usize,
    pub body: Fragment,
}

#[derive(Debug, Clone, Default)]
pub struct FunctionTable {
    functions: Vec<Function>,
    positions: im::HashMap<String, usize>,
}

impl FunctionTable {
    /// Reserves `name` with its arity so the body can refer to it before it's compiled.
    pub fn declare(&mut self, name: &str, arity: usize) -> Result<()> {
        if self.positions.contains_key(name) {
            return Err(CompileError::DuplicateFunction(name.to_string()));
        }

        self.positions.insert(name.to_string(), self.functions.len());
        self.functions.push(Function {
            name: name.to_string(),
            arity,
            body: Fragment::new(),
        });

        Ok(())
    }

    pub fn define(&mut self, name: &str, body: Fragment) -> Result<()> {
        let index = *self
            .positions
            .get(name)
            .ok_or_else(|| CompileError::UnresolvedFunction(name.to_string()))?;

        self.functions[index].body = body;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Function> {
        self.positions.get(name).map(|&index| &self.functions[index])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Function> {
        self.functions.iter()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

/// Compiled conditional arms. Arms with exactly the same code share one entry.
#[derive(Debug, Clone, Default)]
pub struct BranchTable {
    branches: Vec<Fragment>,
    cache: HashMap<Fragment, BranchRef>,
}

impl BranchTable {
    /// Terminates `fragment` with a `JOIN` and returns the index it lives at.
    pub fn register(&mut self, mut fragment: Fragment) -> BranchRef {
        fragment.instruction(Opcode::Join);

        if let Some(&branch) = self.cache.get(&fragment) {
            tracing::trace!(branch = branch.0, "reusing identical branch");
            return branch;
        }

        let branch = BranchRef(self.branches.len());
        self.cache.insert(fragment.clone(), branch);
        self.branches.push(fragment);

        tracing::trace!(branch = branch.0, "registered branch");
        branch
    }

    pub fn get(&self, branch: BranchRef) -> Option<&Fragment> {
        self.branches.get(branch.0)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Fragment> {
        self.branches.iter()
    }

    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::Instruction;

    fn constant(value: i64) -> Fragment {
        let mut fragment = Fragment::new();
        fragment.instruction(Instruction::ldc(value));
        fragment
    }

    #[test]
    fn functions_keep_declaration_order() {
        let mut table = FunctionTable::default();
        table.declare("b", 1).unwrap();
        table.declare("a", 0).unwrap();

        let names: Vec<_> = table.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(table.get("b").unwrap().arity, 1);
    }

    #[test]
    fn functions_are_declared_once() {
        let mut table = FunctionTable::default();
        table.declare("f", 2).unwrap();

        assert_eq!(
            table.declare("f", 1),
            Err(CompileError::DuplicateFunction("f".into()))
        );
    }

    #[test]
    fn defining_fills_the_declared_body() {
        let mut table = FunctionTable::default();
        table.declare("f", 0).unwrap();
        table.define("f", constant(3)).unwrap();

        assert_eq!(table.get("f").unwrap().body.instruction_count(), 1);
        assert!(table.define("g", constant(3)).unwrap_err().is_internal());
    }

    #[test]
    fn branches_end_with_join() {
        let mut table = BranchTable::default();
        let branch = table.register(constant(1));

        assert_eq!(
            table.get(branch).unwrap().opcodes(),
            vec![Opcode::Ldc, Opcode::Join]
        );
    }

    #[test]
    fn identical_branches_are_shared() {
        let mut table = BranchTable::default();
        let first = table.register(constant(1));
        let second = table.register(constant(2));
        let third = table.register(constant(1));

        assert_eq!(first, BranchRef(0));
        assert_eq!(second, BranchRef(1));
        assert_eq!(third, first);
        assert_eq!(table.len(), 2);
    }
}
