use minipy::ast::{BinaryOperator, CompareOperator, Expr, StmtKind, Target};

fn parse_ok(source: &str) -> minipy::Module {
    minipy::parse(source).expect("parse failed")
}

fn parse_err(source: &str) -> minipy::ParseError {
    minipy::parse(source).expect_err("expected a syntax error")
}

#[test]
fn empty_source_is_an_empty_module() {
    assert!(parse_ok("").is_empty());
    assert!(parse_ok("\n\n").is_empty());
}

#[test]
fn statement_lines_follow_the_source() {
    let module = parse_ok("\nx = 1\n\nprint(x)\n");
    let lines: Vec<usize> = module.body.iter().map(|s| s.line).collect();
    assert_eq!(lines, vec![2, 4]);
}

#[test]
fn operator_precedence() {
    let module = parse_ok("1 + 2 * 3");
    let StmtKind::Expr(Expr::Binary { operator, right, .. }) = &module.body[0].kind else {
        panic!("expected binary expression");
    };
    assert_eq!(*operator, BinaryOperator::Addition);
    assert!(matches!(
        **right,
        Expr::Binary {
            operator: BinaryOperator::Multiplication,
            ..
        }
    ));
}

#[test]
fn power_binds_tighter_than_unary_minus() {
    let module = parse_ok("-2 ** 2");
    assert!(matches!(
        &module.body[0].kind,
        StmtKind::Expr(Expr::Unary { .. })
    ));
}

#[test]
fn comparison_chain_is_one_node() {
    let module = parse_ok("1 < x <= 3");
    let StmtKind::Expr(Expr::Compare { comparisons, .. }) = &module.body[0].kind else {
        panic!("expected comparison");
    };
    let ops: Vec<CompareOperator> = comparisons.iter().map(|(op, _)| *op).collect();
    assert_eq!(ops, vec![CompareOperator::Less, CompareOperator::LessOrEqual]);
}

#[test]
fn not_in_and_is_not() {
    let module = parse_ok("a not in b\nc is not None");
    let ops: Vec<CompareOperator> = module
        .body
        .iter()
        .map(|s| match &s.kind {
            StmtKind::Expr(Expr::Compare { comparisons, .. }) => comparisons[0].0,
            other => panic!("unexpected {:?}", other),
        })
        .collect();
    assert_eq!(ops, vec![CompareOperator::NotIn, CompareOperator::IsNot]);
}

#[test]
fn tuple_unpacking_and_chained_assignment() {
    let module = parse_ok("a, b = 1, 2\nx = y = 0");
    let StmtKind::Assign { targets, .. } = &module.body[0].kind else {
        panic!("expected assignment");
    };
    assert!(matches!(&targets[0], Target::Tuple(items) if items.len() == 2));

    let StmtKind::Assign { targets, .. } = &module.body[1].kind else {
        panic!("expected assignment");
    };
    assert_eq!(targets.len(), 2);
}

#[test]
fn compound_statements() {
    let source = "\
def fib(n, memo=None):
    if n < 2:
        return n
    elif n == 2:
        return 1
    else:
        return fib(n - 1) + fib(n - 2)

for i, v in enumerate([1, 2]):
    while False:
        break
    else:
        pass
";
    let module = parse_ok(source);
    assert_eq!(module.body.len(), 2);
    let StmtKind::FunctionDef(def) = &module.body[0].kind else {
        panic!("expected def");
    };
    assert_eq!(def.name, "fib");
    assert_eq!(def.params.len(), 2);
    assert!(def.params[1].default.is_some());
    assert!(matches!(&module.body[1].kind, StmtKind::For { .. }));
}

#[test]
fn one_line_suites_and_semicolons() {
    let module = parse_ok("if x: y = 1; z = 2\n");
    let StmtKind::If { body, .. } = &module.body[0].kind else {
        panic!("expected if");
    };
    assert_eq!(body.len(), 2);
}

#[test]
fn slices_and_keyword_arguments() {
    parse_ok("xs[1:]\nxs[::2]\nxs[:-1]\nsorted(xs, key=lambda p: p[1], reverse=True)");
}

#[test]
fn broken_def_points_at_the_parenthesis() {
    let err = parse_err("\ndef (:\n    pass\n");
    assert_eq!(err.line, 2);
    assert_eq!(err.column, 5);
    assert!(err.message.contains("function name"));
}

#[test]
fn missing_indented_block() {
    let err = parse_err("if True:\npass\n");
    assert!(err.message.contains("indented block"));
}

#[test]
fn unexpected_indent_at_top_level() {
    let err = parse_err("x = 1\n    y = 2\n");
    assert!(err.message.contains("unexpected indent"));
    assert_eq!(err.line, 2);
}

#[test]
fn unsupported_statements_are_syntax_errors() {
    assert!(parse_err("import os").message.contains("import"));
    assert!(parse_err("class A:\n    pass").message.contains("class"));
    assert!(parse_err("[x for x in y]").message.contains("comprehensions"));
}

#[test]
fn cannot_assign_to_a_call() {
    let err = parse_err("f() = 1");
    assert!(err.message.contains("function call"));
}

#[test]
fn control_flow_outside_its_construct() {
    assert!(parse_err("break").message.contains("outside loop"));
    assert!(parse_err("return 1").message.contains("outside function"));
    assert!(parse_err("while True:\n    def f():\n        break\n").message.contains("outside loop"));
    parse_ok("for x in y:\n    if x:\n        continue\n");
}

#[test]
fn integer_literals_beyond_i64() {
    let module = parse_ok("x = 123456789012345678901234567890");
    let StmtKind::Assign { value, .. } = &module.body[0].kind else {
        panic!("expected assignment");
    };
    assert!(matches!(
        value,
        Expr::LongInt { digits, radix: 10 } if digits == "123456789012345678901234567890"
    ));
}

#[test]
fn shift_operators_are_reported_by_name() {
    let err = parse_err("print(1 << 70)");
    assert_eq!(err.message, "bitwise operator '<<' is not supported");
    assert_eq!(err.column, 9);
}

#[test]
fn misplaced_comparison_names_the_operator() {
    let err = parse_err("x = < 1");
    assert_eq!(err.message, "invalid syntax: unexpected '<'");
}

#[test]
fn deeply_nested_parentheses() {
    let source = format!("x = {}1{}", "(".repeat(1000), ")".repeat(1000));
    let err = parse_err(&source);
    assert_eq!(err.message, "too many nested parentheses");
    assert_eq!(err.line, 1);
    let source = format!("x = {}1{}", "[".repeat(150), "]".repeat(150));
    parse_ok(&source);
}

#[test]
fn deeply_nested_unary_operators() {
    let source = format!("x = {}1", "-".repeat(1000));
    let err = parse_err(&source);
    assert_eq!(err.message, "expression is too deeply nested");
}

#[test]
fn long_operator_chains_are_bounded() {
    let terms = |n: usize| vec!["1"; n].join(" + ");
    parse_ok(&format!("x = {}", terms(150)));
    let err = parse_err(&format!("x = {}", terms(1000)));
    assert_eq!(err.message, "expression is too deeply nested");
}
