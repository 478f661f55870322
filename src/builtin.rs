//! Built-in functions. Each one has an arity contract and expands its unevaluated arguments into
//! code, either by emitting instructions directly or by rewriting itself into other built-ins.

use crate::{
    compiler::Compiler,
    error::{CompileError, Result},
    instruction::{BranchRef, Fragment, Instruction, Opcode},
    scope::Scope,
    Term,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Fixed(usize),
    Variadic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Add, // +
    Sub, // -
    Mul, // *
    Div, // /
    Gt,  // >
    Gte, // >=
    Lt,  // <
    Lte, // <=
    Eq,  // =
    Not,
    If,
    List,
    Cons,
    Car,
    Cdr,
    Nth,
    And,
    Or,
}

impl Builtin {
    pub const ALL: [Builtin; 18] = [
        Builtin::Add,
        Builtin::Sub,
        Builtin::Mul,
        Builtin::Div,
        Builtin::Gt,
        Builtin::Gte,
        Builtin::Lt,
        Builtin::Lte,
        Builtin::Eq,
        Builtin::Not,
        Builtin::If,
        Builtin::List,
        Builtin::Cons,
        Builtin::Car,
        Builtin::Cdr,
        Builtin::Nth,
        Builtin::And,
        Builtin::Or,
    ];

    pub fn from_name(name: &str) -> Option<Builtin> {
        Builtin::ALL.into_iter().find(|builtin| builtin.name() == name)
    }

    pub fn name(self) -> &'static str {
        use Builtin::*;

        match self {
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Gt => ">",
            Gte => ">=",
            Lt => "<",
            Lte => "<=",
            Eq => "=",
            Not => "not",
            If => "if",
            List => "list",
            Cons => "cons",
            Car => "car",
            Cdr => "cdr",
            Nth => "nth",
            And => "and",
            Or => "or",
        }
    }

    pub fn arity(self) -> Arity {
        use Builtin::*;

        match self {
            Not | Car | Cdr => Arity::Fixed(1),
            If => Arity::Fixed(3),
            List | And | Or => Arity::Variadic,
            Add | Sub | Mul | Div | Gt | Gte | Lt | Lte | Eq | Cons | Nth => Arity::Fixed(2),
        }
    }

    pub fn check_arity(self, got: usize) -> Result<()> {
        match self.arity() {
            Arity::Fixed(expected) if expected != got => Err(CompileError::BuiltinArity {
                name: self.name(),
                expected,
                got,
            }),
            _ => Ok(()),
        }
    }

    /// Expands a call to the built-in into `ctx`. The arity must be checked beforehand.
    pub fn expand(self, args: &[Term], ctx: &mut Context<'_, '_>) -> Result<()> {
        use Builtin::*;

        match self {
            Add => ctx.binary(args, Opcode::Add),
            Sub => ctx.binary(args, Opcode::Sub),
            Mul => ctx.binary(args, Opcode::Mul),
            Div => ctx.binary(args, Opcode::Div),
            Gt => ctx.binary(args, Opcode::Cgt),
            Gte => ctx.binary(args, Opcode::Cgte),
            Eq => ctx.binary(args, Opcode::Ceq),
            Lt => ctx.push(&Term::call("not", [Term::call(">=", args.to_vec())])),
            Lte => ctx.push(&Term::call("not", [Term::call(">", args.to_vec())])),
            Not => ctx.push(&Term::call("=", [args[0].clone(), Term::Int(0)])),
            If => {
                ctx.push(&args[0])?;
                let then_branch = ctx.branch(&args[1])?;
                let else_branch = ctx.branch(&args[2])?;
                ctx.instruction(Instruction::sel(then_branch, else_branch));
                Ok(())
            }
            List => {
                if args.is_empty() {
                    return Err(CompileError::malformed(
                        "list",
                        "expected at least one argument",
                    ));
                }

                ctx.push_all(args)?;

                // The zero becomes the tail of the last cell.
                ctx.instruction(Instruction::ldc(0));

                for _ in args {
                    ctx.instruction(Opcode::Cons);
                }

                Ok(())
            }
            Cons => ctx.binary(args, Opcode::Cons),
            Car => ctx.unary(args, Opcode::Car),
            Cdr => ctx.unary(args, Opcode::Cdr),
            Nth => {
                let count = match args[1] {
                    Term::Int(count) if count >= 0 => count,
                    ref other => {
                        return Err(CompileError::malformed(
                            "nth",
                            format!("expected a non-negative integer literal but got {other}"),
                        ))
                    }
                };

                ctx.push(&args[0])?;

                for _ in 0..count {
                    ctx.instruction(Opcode::Cdr);
                }

                ctx.instruction(Opcode::Car);
                Ok(())
            }
            And => {
                let expr = args.iter().rev().fold(Term::Int(1), |rest, arg| {
                    Term::call("if", [arg.clone(), rest, Term::Int(0)])
                });
                ctx.push(&expr)
            }
            Or => {
                let expr = args.iter().rev().fold(Term::Int(0), |rest, arg| {
                    Term::call("if", [arg.clone(), Term::Int(1), rest])
                });
                ctx.push(&expr)
            }
        }
    }
}

/// The builder handed to a built-in expansion. It compiles sub-expressions in the scope of the
/// call and accumulates the resulting code.
pub struct Context<'c, 's> {
    compiler: &'c mut Compiler,
    scope: &'c Scope<'s>,
    fragment: Fragment,
}

impl<'c, 's> Context<'c, 's> {
    pub fn new(compiler: &'c mut Compiler, scope: &'c Scope<'s>) -> Self {
        Self {
            compiler,
            scope,
            fragment: Fragment::new(),
        }
    }

    /// Compiles `term` and appends its code.
    pub fn push(&mut self, term: &Term) -> Result<()> {
        let code = self.compiler.compile_value(self.scope, term)?;
        self.fragment.append(code);
        Ok(())
    }

    pub fn push_all(&mut self, terms: &[Term]) -> Result<()> {
        terms.iter().try_for_each(|term| self.push(term))
    }

    /// Compiles `term` into its own branch and returns the reference to it.
    pub fn branch(&mut self, term: &Term) -> Result<BranchRef> {
        self.compiler.compile_branch(self.scope, term)
    }

    pub fn instruction(&mut self, instruction: impl Into<Instruction>) {
        self.fragment.instruction(instruction);
    }

    pub fn comment(&mut self, text: impl Into<String>) {
        self.fragment.comment(text);
    }

    pub fn finish(self) -> Fragment {
        self.fragment
    }

    fn unary(&mut self, args: &[Term], opcode: Opcode) -> Result<()> {
        self.push(&args[0])?;
        self.instruction(opcode);
        Ok(())
    }

    fn binary(&mut self, args: &[Term], opcode: Opcode) -> Result<()> {
        self.push_all(&args[..2])?;
        self.instruction(opcode);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_is_found_by_name() {
        for builtin in Builtin::ALL {
            assert_eq!(Builtin::from_name(builtin.name()), Some(builtin));
        }

        assert_eq!(Builtin::from_name("defn"), None);
        assert_eq!(Builtin::from_name("let"), None);
    }

    #[test]
    fn fixed_arity_is_enforced() {
        assert_eq!(
            Builtin::If.check_arity(2),
            Err(CompileError::BuiltinArity {
                name: "if",
                expected: 3,
                got: 2
            })
        );
        assert!(Builtin::Not.check_arity(1).is_ok());
        assert!(Builtin::And.check_arity(0).is_ok());
        assert!(Builtin::List.check_arity(7).is_ok());
    }
}
