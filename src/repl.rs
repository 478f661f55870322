use std::path::PathBuf;

use gccl::{compiler::Compiler, linker::Listing, parser::parse, Error};
use miette::{IntoDiagnostic, Report};
use rustyline::{
    error::ReadlineError, history::DefaultHistory, validate::MatchingBracketValidator, Completer,
    Editor, Helper, Highlighter, Hinter, Validator,
};

#[derive(Completer, Helper, Highlighter, Hinter, Validator)]
struct InputValidator {
    #[rustyline(Validator)]
    brackets: MatchingBracketValidator,
}

fn get_history_path() -> Option<PathBuf> {
    let home_env = std::env::var("HOME").ok()?;
    let path = format!("{home_env}/.gccl.history");
    Some(PathBuf::from(path))
}

/// Evaluates one submission on top of the definitions made so far. A failed submission leaves
/// `compiler` untouched.
pub fn submit(compiler: &mut Compiler, input: &str) -> Result<Option<Listing>, Error> {
    let terms = parse(input)?;

    let mut next = compiler.clone();
    next.evaluate(&terms)?;

    let listing = match next.entry() {
        Some(_) => Some(next.compile()?),
        None => None,
    };

    *compiler = next;
    Ok(listing)
}

pub fn run() -> miette::Result<()> {
    let mut rl: Editor<InputValidator, DefaultHistory> = Editor::new().into_diagnostic()?;
    let path = get_history_path();
    let h = InputValidator {
        brackets: MatchingBracketValidator::new(),
    };

    rl.set_helper(Some(h));

    if let Some(path) = path.clone() {
        if rl.load_history(&path).is_err() {
            println!("No previous history.");
        }
    }

    let mut compiler = Compiler::new();

    loop {
        match rl.readline("> ") {
            Ok(line) => {
                rl.add_history_entry(line.as_str()).into_diagnostic()?;

                match submit(&mut compiler, &line) {
                    Ok(Some(listing)) => print!("{listing}"),
                    Ok(None) => println!("ok"),
                    Err(error) => println!("{:?}", Report::new(error).with_source_code(line)),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("Interrupted");
                break;
            }
            Err(ReadlineError::Eof) => {
                break;
            }
            Err(err) => {
                println!("Error: {err:?}");
                break;
            }
        }
    }

    if let Some(path) = path {
        let _ = rl.append_history(&path);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definitions_accumulate_until_an_entry_exists() {
        let mut compiler = Compiler::new();

        assert!(submit(&mut compiler, "(defn inc (x) (+ x 1))").unwrap().is_none());

        let listing = submit(&mut compiler, "(defentry () (inc 41))").unwrap().unwrap();
        assert_eq!(listing.layout.function("inc"), Ok(4));
    }

    #[test]
    fn failed_submissions_are_rolled_back() {
        let mut compiler = Compiler::new();

        assert!(submit(&mut compiler, "(defn f (x) (g x))").is_err());
        assert!(compiler.functions().is_empty());

        assert!(submit(&mut compiler, "(defn f (x) x)").unwrap().is_none());
        assert!(submit(&mut compiler, "(defn g (x) (f").is_err());
        assert_eq!(compiler.functions().len(), 1);
    }
}
