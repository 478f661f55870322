//! The symbolic instruction stream. Functions and branches are referenced by identity here, the
//! [crate::linker] replaces them with absolute addresses once every unit has a position.

use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Ldc,  // load constant
    Ld,   // load variable at (depth, index)
    Ldf,  // load function as a closure
    Ap,   // apply closure to n arguments
    Rtn,  // return from a function
    Sel,  // select one of two branches
    Join, // resume after a branch
    Add,
    Sub,
    Mul,
    Div,
    Ceq,  // ==
    Cgt,  // >
    Cgte, // >=
    Cons,
    Car,
    Cdr,
}

impl Opcode {
    pub fn mnemonic(self) -> &'static str {
        use Opcode::*;

        match self {
            Ldc => "LDC",
            Ld => "LD",
            Ldf => "LDF",
            Ap => "AP",
            Rtn => "RTN",
            Sel => "SEL",
            Join => "JOIN",
            Add => "ADD",
            Sub => "SUB",
            Mul => "MUL",
            Div => "DIV",
            Ceq => "CEQ",
            Cgt => "CGT",
            Cgte => "CGTE",
            Cons => "CONS",
            Car => "CAR",
            Cdr => "CDR",
        }
    }
}

impl Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Index of a compiled conditional arm in the branch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BranchRef(pub usize);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operand {
    Int(i64),
    Index(usize),
    Function(String),
    Branch(BranchRef),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operands: Vec<Operand>,
    /// Trailing `; text` on the rendered line, usually the source name of a variable or callee.
    pub annotation: Option<String>,
}

impl Instruction {
    pub fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            operands: Vec::new(),
            annotation: None,
        }
    }

    pub fn with(mut self, operand: Operand) -> Self {
        self.operands.push(operand);
        self
    }

    pub fn annotate(mut self, text: impl Into<String>) -> Self {
        self.annotation = Some(text.into());
        self
    }

    pub fn ldc(value: i64) -> Self {
        Self::new(Opcode::Ldc).with(Operand::Int(value))
    }

    pub fn ld(depth: usize, index: usize) -> Self {
        Self::new(Opcode::Ld)
            .with(Operand::Index(depth))
            .with(Operand::Index(index))
    }

    pub fn ldf(function: impl Into<String>) -> Self {
        Self::new(Opcode::Ldf).with(Operand::Function(function.into()))
    }

    pub fn ap(arguments: usize) -> Self {
        Self::new(Opcode::Ap).with(Operand::Index(arguments))
    }

    pub fn sel(then_branch: BranchRef, else_branch: BranchRef) -> Self {
        Self::new(Opcode::Sel)
            .with(Operand::Branch(then_branch))
            .with(Operand::Branch(else_branch))
    }
}

impl From<Opcode> for Instruction {
    fn from(opcode: Opcode) -> Self {
        Instruction::new(opcode)
    }
}

/// An entry of the stream, only instructions take an address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Item {
    Instruction(Instruction),
    Comment(String),
}

/// A piece of compiled code, the body of a function, of a branch or of the entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Fragment(Vec<Item>);

impl Fragment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instruction(&mut self, instruction: impl Into<Instruction>) {
        self.0.push(Item::Instruction(instruction.into()));
    }

    pub fn comment(&mut self, text: impl Into<String>) {
        self.0.push(Item::Comment(text.into()));
    }

    pub fn append(&mut self, mut other: Fragment) {
        self.0.append(&mut other.0);
    }

    /// Number of addressable entries, comments don't count.
    pub fn instruction_count(&self) -> usize {
        self.instructions().count()
    }

    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.0.iter().filter_map(|item| match item {
            Item::Instruction(instruction) => Some(instruction),
            Item::Comment(_) => None,
        })
    }

    pub fn opcodes(&self) -> Vec<Opcode> {
        self.instructions().map(|i| i.opcode).collect()
    }

    pub fn items(&self) -> &[Item] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Item> for Fragment {
    fn from_iter<T: IntoIterator<Item = Item>>(iter: T) -> Self {
        Fragment(iter.into_iter().collect())
    }
}
