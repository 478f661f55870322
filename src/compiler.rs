//! The compiler walks the program once, compiling every definition into the function table, every
//! conditional arm into the branch table and the `defentry` form into the entry. Nothing gets an
//! address here, that's the job of [crate::linker].

use crate::{
    builtin::{Builtin, Context},
    error::{CompileError, Result},
    instruction::{BranchRef, Fragment, Instruction, Opcode},
    linker::{self, Listing},
    scope::Scope,
    table::{BranchTable, Entry, FunctionTable},
    Term,
};

/// Prefix of the functions synthesized for `let` forms.
pub const LET_PREFIX: &str = "__let";

/// Forms with their own evaluation rules, they never go through the arity check of built-ins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialForm {
    Defn,     // (defn name (a b) body...)
    Defentry, // (defentry (a b) body...)
    Let,      // (let (a 1 b 2) body...)
}

impl SpecialForm {
    pub fn from_name(name: &str) -> Option<SpecialForm> {
        match name {
            "defn" => Some(SpecialForm::Defn),
            "defentry" => Some(SpecialForm::Defentry),
            "let" => Some(SpecialForm::Let),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SpecialForm::Defn => "defn",
            SpecialForm::Defentry => "defentry",
            SpecialForm::Let => "let",
        }
    }
}

/// What the head of a call resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callee {
    Special(SpecialForm),
    Builtin(Builtin),
    Function { name: String, arity: usize },
}

#[derive(Debug, Clone, Default)]
pub struct Compiler {
    functions: FunctionTable,
    branches: BranchTable,
    entry: Option<Entry>,
    lets: usize,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn functions(&self) -> &FunctionTable {
        &self.functions
    }

    pub fn branches(&self) -> &BranchTable {
        &self.branches
    }

    pub fn entry(&self) -> Option<&Entry> {
        self.entry.as_ref()
    }

    /// Number of instructions across every compiled unit.
    pub fn instruction_count(&self) -> usize {
        let entry = self.entry.iter().map(|e| e.body.instruction_count());
        let functions = self.functions.iter().map(|f| f.body.instruction_count());
        let branches = self.branches.iter().map(Fragment::instruction_count);

        entry.chain(functions).chain(branches).sum()
    }

    /// Compiles a sequence of top-level definitions into the tables.
    pub fn evaluate(&mut self, terms: &[Term]) -> Result<()> {
        terms.iter().try_for_each(|term| self.evaluate_definition(term))
    }

    /// Links the tables into the final listing.
    pub fn compile(&self) -> Result<Listing> {
        let entry = self.entry.as_ref().ok_or(CompileError::MissingEntry)?;
        linker::link(entry, &self.functions, &self.branches)
    }

    fn evaluate_definition(&mut self, term: &Term) -> Result<()> {
        let form = term
            .split()
            .and_then(|(head, args)| Some((head.as_identifier()?, args)))
            .and_then(|(head, args)| Some((SpecialForm::from_name(head)?, args)));

        match form {
            Some((SpecialForm::Defn, args)) => self.compile_defn(args),
            Some((SpecialForm::Defentry, args)) => self.compile_defentry(args),
            _ => Err(CompileError::malformed(
                "top level",
                format!("expected a defn or defentry form but got {term}"),
            )),
        }
    }

    /// Resolves the head of a call: special forms first, then built-ins, then declared functions.
    pub fn resolve_callee(&self, name: &str) -> Result<Callee> {
        if let Some(form) = SpecialForm::from_name(name) {
            return Ok(Callee::Special(form));
        }

        if let Some(builtin) = Builtin::from_name(name) {
            return Ok(Callee::Builtin(builtin));
        }

        if let Some(function) = self.functions.get(name) {
            return Ok(Callee::Function {
                name: function.name.clone(),
                arity: function.arity,
            });
        }

        Err(CompileError::UnknownCallee(name.to_string()))
    }

    pub fn compile_value(&mut self, scope: &Scope<'_>, term: &Term) -> Result<Fragment> {
        let mut fragment = Fragment::new();

        match term {
            Term::Int(value) => fragment.instruction(Instruction::ldc(*value)),
            Term::Identifier(name) => {
                if let Some(address) = scope.lookup(name) {
                    fragment.instruction(Instruction::ld(address.depth, address.index).annotate(name));
                } else if self.functions.get(name).is_some() {
                    fragment.instruction(Instruction::ldf(name.as_str()).annotate(name));
                } else {
                    return Err(CompileError::UndefinedName(name.clone()));
                }
            }
            Term::List(list) => return self.compile_call(scope, list),
        }

        Ok(fragment)
    }

    /// Compiles `term` as a conditional arm, in the scope of the conditional itself.
    pub fn compile_branch(&mut self, scope: &Scope<'_>, term: &Term) -> Result<BranchRef> {
        let fragment = self.compile_value(scope, term)?;
        Ok(self.branches.register(fragment))
    }

    fn compile_sequence(&mut self, scope: &Scope<'_>, terms: &[Term]) -> Result<Fragment> {
        let mut fragment = Fragment::new();

        for term in terms {
            fragment.append(self.compile_value(scope, term)?);
        }

        Ok(fragment)
    }

    fn compile_call(&mut self, scope: &Scope<'_>, list: &[Term]) -> Result<Fragment> {
        let (head, args) = list.split_first().ok_or(CompileError::EmptyCall)?;
        let name = head
            .as_identifier()
            .ok_or_else(|| CompileError::InvalidCallee(head.to_string()))?;

        match self.resolve_callee(name)? {
            Callee::Special(SpecialForm::Let) => self.compile_let(scope, args),
            Callee::Special(form) => Err(CompileError::malformed(
                form.name(),
                "definitions are only allowed at the top level",
            )),
            Callee::Builtin(builtin) => {
                builtin.check_arity(args.len())?;

                let mut ctx = Context::new(self, scope);
                builtin.expand(args, &mut ctx)?;
                Ok(ctx.finish())
            }
            Callee::Function { name, arity } => {
                if arity != args.len() {
                    return Err(CompileError::FunctionArity {
                        name,
                        expected: arity,
                        got: args.len(),
                    });
                }

                self.compile_apply(scope, &name, args)
            }
        }
    }

    /// Pushes the arguments, then applies the closure of function `name` to them.
    fn compile_apply(&mut self, scope: &Scope<'_>, name: &str, args: &[Term]) -> Result<Fragment> {
        let mut fragment = self.compile_sequence(scope, args)?;
        fragment.instruction(Instruction::ldf(name));
        fragment.instruction(Instruction::ap(args.len()).annotate(name));
        Ok(fragment)
    }

    /// Compiles a function body in a new frame made of `parameters`. The code starts with a
    /// comment of the source form and ends with a return.
    fn compile_function(
        &mut self,
        name: &str,
        parameters: &[String],
        body: &[Term],
        parent: Option<&Scope<'_>>,
    ) -> Result<Fragment> {
        let scope = Scope::new(parameters.iter().cloned(), parent);

        let mut fragment = Fragment::new();
        fragment.comment(format!(
            "{name} := ({}) {}",
            parameters.join(" "),
            body.iter().map(Term::to_string).collect::<Vec<_>>().join(" ")
        ));
        fragment.append(self.compile_sequence(&scope, body)?);
        fragment.instruction(Opcode::Rtn);

        Ok(fragment)
    }

    fn compile_defn(&mut self, args: &[Term]) -> Result<()> {
        let [name, parameters, body @ ..] = args else {
            return Err(CompileError::malformed(
                "defn",
                "expected a name, a parameter list and a body",
            ));
        };

        let name = name
            .as_identifier()
            .ok_or_else(|| CompileError::malformed("defn", format!("expected a name but got {name}")))?;

        if is_reserved(name) {
            return Err(CompileError::ReservedName(name.to_string()));
        }

        let parameters = parameter_list("defn", parameters)?;
        expect_body("defn", body)?;

        // Declared before the body so the function can call itself.
        self.functions.declare(name, parameters.len())?;
        let code = self.compile_function(name, &parameters, body, None)?;
        self.functions.define(name, code)?;

        tracing::debug!(name = %name, arity = parameters.len(), "declared function");
        Ok(())
    }

    fn compile_defentry(&mut self, args: &[Term]) -> Result<()> {
        let [parameters, body @ ..] = args else {
            return Err(CompileError::malformed(
                "defentry",
                "expected a parameter list and a body",
            ));
        };

        if self.entry.is_some() {
            return Err(CompileError::DuplicateEntry);
        }

        let parameters = parameter_list("defentry", parameters)?;
        expect_body("defentry", body)?;

        let code = self.compile_function("entry", &parameters, body, None)?;
        self.entry = Some(Entry {
            arity: parameters.len(),
            body: code,
        });

        tracing::debug!(arity = parameters.len(), "declared entry");
        Ok(())
    }

    /// `(let (a 1 b 2) body...)` becomes a fresh function of `a` and `b` declared in the current
    /// scope, applied to `1` and `2` right away.
    fn compile_let(&mut self, scope: &Scope<'_>, args: &[Term]) -> Result<Fragment> {
        let [bindings, body @ ..] = args else {
            return Err(CompileError::malformed("let", "expected a binding list and a body"));
        };

        let bindings = bindings.as_list().ok_or_else(|| {
            CompileError::malformed("let", format!("expected a binding list but got {bindings}"))
        })?;

        if bindings.len() % 2 != 0 {
            return Err(CompileError::malformed("let", "bindings must be even"));
        }

        expect_body("let", body)?;

        let names: Vec<Term> = bindings.iter().step_by(2).cloned().collect();
        let values: Vec<Term> = bindings.iter().skip(1).step_by(2).cloned().collect();
        let parameters = parameter_list("let", &Term::List(names))?;

        self.lets += 1;
        let name = format!("{LET_PREFIX}{}", self.lets);

        self.functions.declare(&name, parameters.len())?;
        let code = self.compile_function(&name, &parameters, body, Some(scope))?;
        self.functions.define(&name, code)?;

        tracing::debug!(name = %name, arity = parameters.len(), "desugared let");
        self.compile_apply(scope, &name, &values)
    }
}

fn is_reserved(name: &str) -> bool {
    SpecialForm::from_name(name).is_some()
        || Builtin::from_name(name).is_some()
        || name.starts_with(LET_PREFIX)
}

fn parameter_list(form: &'static str, term: &Term) -> Result<Vec<String>> {
    let terms = term.as_list().ok_or_else(|| {
        CompileError::malformed(form, format!("expected a parameter list but got {term}"))
    })?;

    let mut parameters: Vec<String> = Vec::with_capacity(terms.len());

    for term in terms {
        let name = term.as_identifier().ok_or_else(|| {
            CompileError::malformed(form, format!("expected a parameter name but got {term}"))
        })?;

        if parameters.iter().any(|p| p == name) {
            return Err(CompileError::malformed(
                form,
                format!("parameter '{name}' is bound twice"),
            ));
        }

        parameters.push(name.to_string());
    }

    Ok(parameters)
}

fn expect_body(form: &'static str, body: &[Term]) -> Result<()> {
    if body.is_empty() {
        Err(CompileError::malformed(form, "expected a body"))
    } else {
        Ok(())
    }
}
