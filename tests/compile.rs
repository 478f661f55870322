use gccl::{
    compiler::Compiler,
    instruction::Opcode,
    linker::{Line, Listing},
    parser::parse,
    CompileError, Error,
};

const PROGRAMS: &[&str] = &[
    "(defentry () 1)",
    "(defentry (a b) (if (< a b) (list a b) (cons b a)))",
    "(defn sum (xs) (if (= xs 0) 0 (+ (car xs) (sum (cdr xs)))))
     (defentry () (sum (list 1 2 3)))",
    "(defn f (x) (let (y (* x 2) z 3) (or (> y z) (and (= x 0) (not y)))))
     (defentry (w) (f (nth w 1)))",
];

fn evaluate(source: &str) -> Compiler {
    let mut compiler = Compiler::new();
    compiler.evaluate(&parse(source).unwrap()).unwrap();
    compiler
}

/// Opcodes and resolved operands of every instruction, without comments and annotations.
fn code(listing: &Listing) -> Vec<(Opcode, Vec<String>)> {
    listing
        .instructions()
        .map(|line| match line {
            Line::Instruction {
                opcode, operands, ..
            } => (*opcode, operands.clone()),
            Line::Comment(_) => unreachable!(),
        })
        .collect()
}

#[test]
fn linking_keeps_the_instruction_count() {
    for source in PROGRAMS {
        let compiler = evaluate(source);
        let listing = compiler.compile().unwrap();

        assert_eq!(listing.instruction_count(), compiler.instruction_count());
        assert_eq!(listing.layout.size, compiler.instruction_count());
    }
}

#[test]
fn compilation_is_deterministic() {
    for source in PROGRAMS {
        let first = gccl::compile(source).unwrap().to_string();
        let second = gccl::compile(source).unwrap().to_string();

        assert_eq!(first, second);
    }
}

#[test]
fn if_selects_between_registered_branches() {
    let listing = gccl::compile("(defentry (a) (if a (+ a 1) (- a 1)))").unwrap();
    let code = code(&listing);

    let sel = code
        .iter()
        .position(|(opcode, _)| *opcode == Opcode::Sel)
        .unwrap();
    let (_, operands) = &code[sel];

    assert_eq!(operands.len(), 2);

    let starts = &listing.layout.branches;
    for operand in operands {
        let address: usize = operand.parse().unwrap();

        assert_ne!(address, sel);
        assert!(starts.contains(&address));
    }

    // Every branch runs until its JOIN, right before the next branch or the end.
    for (i, start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(listing.layout.size);
        assert_eq!(code[end - 1].0, Opcode::Join, "branch starting at {start}");
    }
}

#[test]
fn list_builds_a_chain_ending_in_zero() {
    let listing = gccl::compile("(defentry () (list 1 2 3))").unwrap();

    assert_eq!(
        code(&listing),
        vec![
            (Opcode::Ldc, vec!["1".to_string()]),
            (Opcode::Ldc, vec!["2".to_string()]),
            (Opcode::Ldc, vec!["3".to_string()]),
            (Opcode::Ldc, vec!["0".to_string()]),
            (Opcode::Cons, vec![]),
            (Opcode::Cons, vec![]),
            (Opcode::Cons, vec![]),
            (Opcode::Rtn, vec![]),
        ]
    );
}

#[test]
fn let_is_an_immediately_applied_function() {
    let with_let = gccl::compile("(defentry () (let (x 1 y 2) (+ x y)))").unwrap();
    let with_defn = gccl::compile("(defn g (x y) (+ x y)) (defentry () (g 1 2))").unwrap();

    assert_eq!(code(&with_let), code(&with_defn));
}

#[test]
fn lexical_depth_counts_enclosing_frames() {
    let compiler = evaluate("(defentry (a) (let (b 1) (let (c 2) (+ a (+ b c)))))");
    let inner = compiler.functions().get("__let2").unwrap();

    let loads: Vec<_> = inner
        .body
        .instructions()
        .filter(|i| i.opcode == Opcode::Ld)
        .map(|i| (i.annotation.clone().unwrap(), i.operands.clone()))
        .collect();

    use gccl::instruction::Operand::Index;
    assert_eq!(
        loads,
        vec![
            ("a".to_string(), vec![Index(2), Index(0)]),
            ("b".to_string(), vec![Index(1), Index(0)]),
            ("c".to_string(), vec![Index(0), Index(0)]),
        ]
    );
}

#[test]
fn less_than_is_not_greater_or_equal() {
    let pairs = [("a", "b"), ("1", "a"), ("(car a)", "(+ a 1)")];

    for (left, right) in pairs {
        let lt = gccl::compile(&format!("(defentry (a) (< {left} {right}))")).unwrap();
        let not = gccl::compile(&format!("(defentry (a) (not (>= {left} {right})))")).unwrap();

        assert_eq!(code(&lt), code(&not));
    }
}

#[test]
fn arity_mismatch_names_the_function() {
    let error = gccl::compile("(defn f (a b) (+ a b)) (defentry () (f 1))").unwrap_err();

    assert_eq!(
        error,
        Error::Compile(CompileError::FunctionArity {
            name: "f".into(),
            expected: 2,
            got: 1
        })
    );
    assert_eq!(
        error.to_string(),
        "f: defined function expected 2 arguments but got 1"
    );
}

#[test]
fn programs_without_entry_fail() {
    let error = gccl::compile("(defn main () 1)").unwrap_err();

    assert_eq!(error, Error::Compile(CompileError::MissingEntry));
}

#[test]
fn read_errors_surface_before_compiling() {
    assert!(matches!(
        gccl::compile("(defentry () (+ 1 2)"),
        Err(Error::Read(_))
    ));
}
