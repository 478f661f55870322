//! Address resolution. Units are laid out in a fixed order, the entry at address zero, then every
//! function in declaration order, then every branch in first-use order.
//!
//! Linking needs two passes: the first one counts instructions to give each unit its absolute
//! position, the second one replaces the symbolic references with those positions. Any unit may
//! refer to a unit laid out after it, so no reference can be resolved before every position is
//! known.

use std::fmt::Display;

use im::HashMap;

use crate::{
    error::{CompileError, Result},
    instruction::{BranchRef, Fragment, Instruction, Item, Opcode, Operand},
    table::{BranchTable, Entry, FunctionTable},
};

/// Absolute positions of every unit, computed by the first pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layout {
    pub functions: HashMap<String, usize>,
    pub branches: Vec<usize>,
    pub size: usize,
}

impl Layout {
    pub fn assign(entry: &Entry, functions: &FunctionTable, branches: &BranchTable) -> Self {
        let mut layout = Layout {
            size: entry.body.instruction_count(),
            ..Default::default()
        };

        for function in functions.iter() {
            layout.functions.insert(function.name.clone(), layout.size);
            layout.size += function.body.instruction_count();
        }

        for branch in branches.iter() {
            layout.branches.push(layout.size);
            layout.size += branch.instruction_count();
        }

        layout
    }

    pub fn function(&self, name: &str) -> Result<usize> {
        self.functions
            .get(name)
            .copied()
            .ok_or_else(|| CompileError::UnresolvedFunction(name.to_string()))
    }

    pub fn branch(&self, branch: BranchRef) -> Result<usize> {
        self.branches
            .get(branch.0)
            .copied()
            .ok_or(CompileError::UnresolvedBranch(branch.0))
    }

    fn expand_operand(&self, operand: &Operand) -> Result<String> {
        Ok(match operand {
            Operand::Int(value) => value.to_string(),
            Operand::Index(index) => index.to_string(),
            Operand::Function(name) => self.function(name)?.to_string(),
            Operand::Branch(branch) => self.branch(*branch)?.to_string(),
        })
    }

    fn expand(&self, instruction: &Instruction) -> Result<Line> {
        let operands = instruction
            .operands
            .iter()
            .map(|operand| self.expand_operand(operand))
            .collect::<Result<_>>()?;

        Ok(Line::Instruction {
            opcode: instruction.opcode,
            operands,
            annotation: instruction.annotation.clone(),
        })
    }

    fn expand_body(&self, body: &Fragment, lines: &mut Vec<Line>) -> Result<()> {
        for item in body.items() {
            lines.push(match item {
                Item::Instruction(instruction) => self.expand(instruction)?,
                Item::Comment(text) => Line::Comment(text.clone()),
            });
        }

        Ok(())
    }
}

/// A line of the final listing, with every address resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Instruction {
        opcode: Opcode,
        operands: Vec<String>,
        annotation: Option<String>,
    },
    Comment(String),
}

impl Display for Line {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Line::Instruction {
                opcode,
                operands,
                annotation,
            } => {
                write!(f, "  {opcode}")?;
                for operand in operands {
                    write!(f, " {operand}")?;
                }
                if let Some(annotation) = annotation {
                    write!(f, " ; {annotation}")?;
                }
                Ok(())
            }
            Line::Comment(text) => write!(f, "; {text}"),
        }
    }
}

/// The linked program, ready to be printed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub lines: Vec<Line>,
    pub layout: Layout,
}

impl Listing {
    pub fn instruction_count(&self) -> usize {
        self.instructions().count()
    }

    pub fn instructions(&self) -> impl Iterator<Item = &Line> {
        self.lines
            .iter()
            .filter(|line| matches!(line, Line::Instruction { .. }))
    }
}

impl Display for Listing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

pub fn link(entry: &Entry, functions: &FunctionTable, branches: &BranchTable) -> Result<Listing> {
    let layout = Layout::assign(entry, functions, branches);

    tracing::debug!(
        functions = functions.len(),
        branches = branches.len(),
        size = layout.size,
        "assigned positions"
    );

    let mut lines = Vec::new();

    layout.expand_body(&entry.body, &mut lines)?;

    for function in functions.iter() {
        tracing::trace!(name = %function.name, at = ?layout.functions.get(&function.name), "function");
        layout.expand_body(&function.body, &mut lines)?;
    }

    for (index, branch) in branches.iter().enumerate() {
        tracing::trace!(branch = index, at = ?layout.branches.get(index), "branch");
        layout.expand_body(branch, &mut lines)?;
    }

    Ok(Listing { lines, layout })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment<I: IntoIterator<Item = Instruction>>(instructions: I) -> Fragment {
        instructions.into_iter().map(Item::Instruction).collect()
    }

    fn entry(body: Fragment) -> Entry {
        Entry { arity: 0, body }
    }

    #[test]
    fn entry_starts_at_zero_then_functions_then_branches() {
        let mut functions = FunctionTable::default();
        functions.declare("f", 0).unwrap();
        functions
            .define("f", fragment([Instruction::ldc(1), Instruction::new(Opcode::Rtn)]))
            .unwrap();

        let mut branches = BranchTable::default();
        branches.register(fragment([Instruction::ldc(2)]));

        let main = entry(fragment([
            Instruction::ldf("f"),
            Instruction::ap(0),
            Instruction::new(Opcode::Rtn),
        ]));

        let layout = Layout::assign(&main, &functions, &branches);

        assert_eq!(layout.function("f"), Ok(3));
        assert_eq!(layout.branch(BranchRef(0)), Ok(5));
        assert_eq!(layout.size, 7);
    }

    #[test]
    fn forward_references_resolve() {
        let mut functions = FunctionTable::default();
        functions.declare("first", 0).unwrap();
        functions.declare("second", 0).unwrap();
        functions
            .define(
                "first",
                fragment([Instruction::ldf("second"), Instruction::ap(0), Instruction::new(Opcode::Rtn)]),
            )
            .unwrap();
        functions
            .define("second", fragment([Instruction::ldc(7), Instruction::new(Opcode::Rtn)]))
            .unwrap();

        let main = entry(fragment([Instruction::new(Opcode::Rtn)]));
        let listing = link(&main, &functions, &BranchTable::default()).unwrap();

        assert_eq!(listing.lines[1].to_string(), "  LDF 4");
    }

    #[test]
    fn comments_are_passed_through_without_address() {
        let mut body = Fragment::new();
        body.comment("entry := () 1");
        body.instruction(Instruction::ldc(1));
        body.instruction(Opcode::Rtn);

        let mut functions = FunctionTable::default();
        functions.declare("f", 0).unwrap();

        let listing = link(&entry(body), &functions, &BranchTable::default()).unwrap();

        assert_eq!(listing.lines[0], Line::Comment("entry := () 1".into()));
        assert_eq!(listing.instruction_count(), 2);
        assert_eq!(listing.layout.function("f"), Ok(2));
    }

    #[test]
    fn renders_annotations_after_operands() {
        let line = Line::Instruction {
            opcode: Opcode::Ld,
            operands: vec!["1".into(), "0".into()],
            annotation: Some("x".into()),
        };

        assert_eq!(line.to_string(), "  LD 1 0 ; x");
        assert_eq!(Line::Comment("f := (x) x".into()).to_string(), "; f := (x) x");
    }

    #[test]
    fn missing_units_are_internal_errors() {
        let main = entry(fragment([Instruction::ldf("nowhere")]));
        let error = link(&main, &FunctionTable::default(), &BranchTable::default()).unwrap_err();

        assert_eq!(error, CompileError::UnresolvedFunction("nowhere".into()));
        assert!(error.is_internal());

        let main = entry(fragment([Instruction::sel(BranchRef(0), BranchRef(1))]));
        let error = link(&main, &FunctionTable::default(), &BranchTable::default()).unwrap_err();

        assert_eq!(error, CompileError::UnresolvedBranch(0));
    }
}
