//! Definitions of errors that can occur while reading or compiling a program. None of them are
//! recoverable, the first one aborts the whole compilation.

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

/// Errors produced by the reader, they carry the span of the offending text so it can be shown
/// in the source.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    #[error("unexpected end of input, unclosed parenthesis")]
    #[diagnostic(code(gccl::read::eof))]
    UnexpectedEof {
        #[label("this parenthesis is never closed")]
        span: SourceSpan,
    },

    #[error("unmatched parenthesis")]
    #[diagnostic(code(gccl::read::unmatched))]
    UnmatchedParen {
        #[label("no list to close here")]
        span: SourceSpan,
    },

    #[error("integer literal '{literal}' does not fit in 64 bits")]
    #[diagnostic(code(gccl::read::overflow))]
    IntegerOverflow {
        literal: String,
        #[label("too large")]
        span: SourceSpan,
    },
}

/// Errors produced while compiling a program.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("no such variable in scope: {0}")]
    #[diagnostic(code(gccl::scope))]
    UndefinedName(String),

    #[error("no such variable or built-in: {0}")]
    #[diagnostic(code(gccl::unknown_callee))]
    UnknownCallee(String),

    #[error("{name}: built-in function expected {expected} arguments but got {got}")]
    #[diagnostic(code(gccl::arity::builtin))]
    BuiltinArity {
        name: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("{name}: defined function expected {expected} arguments but got {got}")]
    #[diagnostic(code(gccl::arity::function))]
    FunctionArity {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("{form}: {reason}")]
    #[diagnostic(code(gccl::malformed))]
    Malformed { form: &'static str, reason: String },

    #[error("cannot call '{0}', the head of a call must be a name")]
    #[diagnostic(code(gccl::invalid_callee))]
    InvalidCallee(String),

    #[error("cannot compile an empty call '()'")]
    #[diagnostic(code(gccl::empty_call))]
    EmptyCall,

    #[error("function '{0}' is already defined")]
    #[diagnostic(code(gccl::duplicate::function))]
    DuplicateFunction(String),

    #[error("the program entry is already defined")]
    #[diagnostic(code(gccl::duplicate::entry))]
    DuplicateEntry,

    #[error("'{0}' is a reserved name")]
    #[diagnostic(code(gccl::reserved))]
    ReservedName(String),

    #[error("no program entry defined")]
    #[diagnostic(code(gccl::missing_entry), help("add a (defentry (args...) body...) form"))]
    MissingEntry,

    #[error("internal: no such function at link time: {0}")]
    #[diagnostic(code(gccl::internal::function))]
    UnresolvedFunction(String),

    #[error("internal: no such branch at link time: {0}")]
    #[diagnostic(code(gccl::internal::branch))]
    UnresolvedBranch(usize),
}

impl CompileError {
    pub fn malformed(form: &'static str, reason: impl Into<String>) -> Self {
        CompileError::Malformed {
            form,
            reason: reason.into(),
        }
    }

    /// Link time errors mean the tables were built inconsistently, they are never caused by the
    /// user program itself.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            CompileError::UnresolvedFunction(_) | CompileError::UnresolvedBranch(_)
        )
    }
}

#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Compile(#[from] CompileError),
}

pub type Result<T, E = CompileError> = std::result::Result<T, E>;
