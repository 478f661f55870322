//! A compiler from a tiny lisp into the linear instruction listing of the GCC, a SECD-style
//! machine with closures. The pipeline is [parser::parse] to read the source into [Term]s,
//! [compiler::Compiler::evaluate] to build the function, branch and entry tables, and
//! [compiler::Compiler::compile] to link everything into a [linker::Listing].

use std::fmt::Display;

pub mod builtin;
pub mod compiler;
pub mod error;
pub mod instruction;
pub mod linker;
pub mod parser;
pub mod scope;
pub mod table;

pub use error::{CompileError, Error, ReadError};

/// Term is a recursive data structure that represents a list of terms, an identifier or an
/// integer.
///
/// It's the whole of our Abstract-Syntax-Tree (AST), the special forms are recognized by the
/// compiler directly from the shape of the lists.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    List(Vec<Term>),    // (a b c)
    Identifier(String), // bla
    Int(i64),           // 123
}

impl Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Term::List(terms) => {
                write!(f, "(")?;
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{term}")?;
                }
                write!(f, ")")
            }
            Term::Identifier(s) => write!(f, "{s}"),
            Term::Int(n) => write!(f, "{n}"),
        }
    }
}

impl From<Vec<Term>> for Term {
    fn from(terms: Vec<Term>) -> Self {
        Term::List(terms)
    }
}

impl From<i64> for Term {
    fn from(value: i64) -> Self {
        Term::Int(value)
    }
}

impl Term {
    pub fn identifier(name: impl Into<String>) -> Term {
        Term::Identifier(name.into())
    }

    /// Builds the application `(head args...)`, used by the built-ins that rewrite themselves
    /// into other forms.
    pub fn call<I: IntoIterator<Item = Term>>(head: &str, args: I) -> Term {
        let mut terms = vec![Term::identifier(head)];
        terms.extend(args);
        Term::List(terms)
    }

    pub fn as_identifier(&self) -> Option<&str> {
        match self {
            Term::Identifier(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Term]> {
        match self {
            Term::List(terms) => Some(terms),
            _ => None,
        }
    }

    pub fn split(&self) -> Option<(&Term, &[Term])> {
        self.as_list()?.split_first()
    }

    pub fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Term::Identifier(x) if x == keyword)
    }
}

/// Reads and compiles a whole program in one go.
pub fn compile(source: &str) -> Result<linker::Listing, Error> {
    let terms = parser::parse(source)?;

    let mut compiler = compiler::Compiler::new();
    compiler.evaluate(&terms)?;

    Ok(compiler.compile()?)
}
