use std::rc::Rc;

use interpreter::{
    CodeObject, ErrorKind, ExecError, Namespace, RuntimeValue, STACK_SIZE, compile, exec,
};
use minipy::ast::{Expr, Stmt, StmtKind, UnaryOperator};
use minipy::Module;

fn run(source: &str) -> String {
    let code = compile(source, "test.md:1").expect("compile failed");
    let mut namespace = Namespace::new();
    let mut output = Vec::new();
    exec(&code, &mut namespace, &mut output).expect("execution failed");
    String::from_utf8(output).unwrap()
}

fn run_trimmed(source: &str) -> String {
    run(source).trim().to_string()
}

fn run_err(source: &str) -> ExecError {
    let code = compile(source, "test.md:1").expect("compile failed");
    let mut namespace = Namespace::new();
    let mut output = Vec::new();
    exec(&code, &mut namespace, &mut output).expect_err("expected a runtime error")
}

/// Deep recursion needs more native stack than a test thread has.
fn on_large_stack<T: Send + 'static>(task: impl FnOnce() -> T + Send + 'static) -> T {
    std::thread::Builder::new()
        .stack_size(STACK_SIZE)
        .spawn(task)
        .expect("spawn failed")
        .join()
        .expect("thread panicked")
}

#[test]
fn arithmetic() {
    assert_eq!(run_trimmed("print(2 + 3 * 4)"), "14");
    assert_eq!(run_trimmed("print(7 // 2, 7 % 3, 2 ** 10)"), "3 1 1024");
    assert_eq!(run_trimmed("print(10 / 5, 1 / 2)"), "2.0 0.5");
    assert_eq!(run_trimmed("print(-7 // 2, -2 ** 2)"), "-4 -4");
    assert_eq!(run_trimmed("print(0.1 + 0.2)"), "0.30000000000000004");
    assert_eq!(run_trimmed("print(round(2.5), round(3.5))"), "2 4");
}

#[test]
fn literals_and_repr() {
    assert_eq!(run_trimmed("print(None, True, (1,), [])"), "None True (1,) []");
    assert_eq!(
        run_trimmed("print({'a': 1, 'b': [1, 2]})"),
        "{'a': 1, 'b': [1, 2]}"
    );
    assert_eq!(run_trimmed("print(repr('x'), dict(a=1))"), "'x' {'a': 1}");
    assert_eq!(run_trimmed("print('a' + 'b' * 3)"), "abbb");
}

#[test]
fn print_keywords() {
    assert_eq!(run("print(1, 2, sep='-', end='!\\n')"), "1-2!\n");
    assert_eq!(run("print()"), "\n");
}

#[test]
fn comparisons() {
    assert_eq!(run_trimmed("print(1 < 2 < 3, 3 > 2 > 2)"), "True False");
    let src = "a = [1]\nb = a\nprint(a is b, a == [1], a is [1], 1 in a, 'ell' in 'hello')";
    assert_eq!(run_trimmed(src), "True True False True True");
    assert_eq!(run_trimmed("print(1 == 1.0, None is None, 2 not in [1])"), "True True True");
}

#[test]
fn boolean_operators_return_operands() {
    assert_eq!(run_trimmed("print(0 or 'x', 1 and [], not 0)"), "x [] True");
}

#[test]
fn functions_with_defaults_and_keywords() {
    let src = "\
def greet(name, greeting='Hello'):
    return greeting + ', ' + name + '!'

print(greet('World'))
print(greet('Rust', greeting='Hi'))
";
    assert_eq!(run(src), "Hello, World!\nHi, Rust!\n");
}

#[test]
fn closures_see_later_bindings() {
    let src = "\
def make_counter():
    count = [0]
    def increment():
        count[0] += 1
        return count[0]
    return increment

c = make_counter()
c()
print(c())

def outer(n):
    def fact(k):
        return 1 if k <= 1 else k * fact(k - 1)
    return fact(n)

print(outer(5))
";
    assert_eq!(run(src), "2\n120\n");
}

#[test]
fn global_declaration() {
    let src = "\
total = 0
def add(n):
    global total
    total += n
add(3); add(4)
print(total)
";
    assert_eq!(run_trimmed(src), "7");
}

#[test]
fn sequence_repetition() {
    assert_eq!(
        run_trimmed("print([0] * 3, (1, 2) * 2, 2 * 'ab', [1] * 0)"),
        "[0, 0, 0] (1, 2, 1, 2) abab []"
    );
    let src = "grid = [[0] * 2] * 2\ngrid[0][0] = 1\nprint(grid)";
    assert_eq!(run_trimmed(src), "[[1, 0], [1, 0]]");
}

#[test]
fn integers_have_arbitrary_precision() {
    assert_eq!(run_trimmed("print(2 ** 100)"), "1267650600228229401496703205376");
    assert_eq!(run_trimmed("print(9223372036854775807 + 1)"), "9223372036854775808");
    assert_eq!(run_trimmed("print(-2 ** 63 - 1)"), "-9223372036854775809");
    let src = "\
def factorial(n):
    result = 1
    for i in range(2, n + 1):
        result *= i
    return result
print(factorial(30))
";
    assert_eq!(run_trimmed(src), "265252859812191058636308480000000");
}

#[test]
fn big_integers_mix_with_the_rest_of_the_language() {
    let src = "\
big = 123456789012345678901234567890
print(big % 1000, big // 10 ** 27, 2 ** 64 // 2 ** 32)
print(10 ** 20 / 10 ** 18, float(2 ** 70), abs(-2 ** 70))
print(int('99999999999999999999') + 1, '%d' % 2 ** 70, '{:,}'.format(10 ** 21))
print(isinstance(big, int), 2 ** 64 > 2 ** 63, {2 ** 70: 'a'}[2 ** 70], 2 ** 64 == 2.0 ** 64)
print(sum([2 ** 62, 2 ** 62, 2 ** 62]), max(1, 2 ** 80), 2 ** 70 - 2 ** 70)
";
    assert_eq!(
        run(src),
        "\
890 123 4294967296
100.0 1.1805916207174113e+21 1180591620717411303424
100000000000000000000 1180591620717411303424 1,000,000,000,000,000,000,000
True True a True
13835058055282163712 1208925819614629174706176 0
"
    );
}

#[test]
fn recursion() {
    let src = "\
def fib(n):
    if n < 2:
        return n
    return fib(n - 1) + fib(n - 2)
print(fib(15))
";
    assert_eq!(run_trimmed(src), "610");
}

#[test]
fn recursion_well_past_a_hundred_calls() {
    let src = "\
def depth(n):
    if n == 0:
        return 0
    return 1 + depth(n - 1)
print(depth(900))
";
    let output = on_large_stack(move || run_trimmed(src));
    assert_eq!(output, "900");
}

#[test]
fn runaway_recursion_is_a_recursion_error() {
    let err = on_large_stack(|| run_err("def f(n):\n    return f(n + 1)\nf(0)\n"));
    assert_eq!(err.error.kind, ErrorKind::RecursionError);
    assert_eq!(err.error.message, "maximum recursion depth exceeded");
    assert_eq!(err.line, 3);
}

#[test]
fn loops_with_break_continue_and_else() {
    let src = "\
for i in range(5):
    if i == 1:
        continue
    if i == 3:
        break
    print(i)
else:
    print('no break')

n = 0
while n < 3:
    n += 1
else:
    print('done', n)
";
    assert_eq!(run(src), "0\n2\ndone 3\n");
}

#[test]
fn unpacking() {
    assert_eq!(run_trimmed("a, b = 1, 2\na, b = b, a\nprint(a, b)"), "2 1");
    assert_eq!(
        run_trimmed("for k, v in {'x': 1}.items():\n    print(k, v)"),
        "x 1"
    );
    let err = run_err("a, b = [1, 2, 3]");
    assert_eq!(err.error.kind, ErrorKind::ValueError);
    assert!(err.error.message.contains("too many values"));
}

#[test]
fn strings_and_formatting() {
    let src = "s = 'hello world'\nprint(s[::-1], s[:5].upper(), s.split())";
    assert_eq!(run_trimmed(src), "dlrow olleh HELLO ['hello', 'world']");
    assert_eq!(run_trimmed("print(', '.join(['a', 'b']))"), "a, b");
    assert_eq!(run_trimmed("print('{} + {} = {}'.format(1, 2, 3))"), "1 + 2 = 3");
    assert_eq!(
        run_trimmed("print('%s has %d items' % ('cart', 3))"),
        "cart has 3 items"
    );
}

#[test]
fn sorting_and_extrema() {
    let src = "pairs = [('b', 2), ('a', 3), ('c', 1)]\nprint(sorted(pairs, key=lambda p: p[1]))";
    assert_eq!(run_trimmed(src), "[('c', 1), ('b', 2), ('a', 3)]");
    assert_eq!(run_trimmed("print(sorted([3, 1, 2], reverse=True))"), "[3, 2, 1]");
    assert_eq!(run_trimmed("print(max([1, 5, 3]), min(4, 2, 8))"), "5 2");
    assert_eq!(run_trimmed("print(max(['aa', 'b'], key=len))"), "aa");
    assert_eq!(run_trimmed("xs = [3, 1, 2]\nxs.sort()\nprint(xs)"), "[1, 2, 3]");
}

#[test]
fn builtin_functions() {
    assert_eq!(
        run_trimmed("print(len('héllo'), list(range(0, 10, 3)), sum([1, 2, 3]))"),
        "5 [0, 3, 6, 9] 6"
    );
    assert_eq!(
        run_trimmed("print(list(enumerate('ab')), list(zip([1, 2], 'xyz')))"),
        "[(0, 'a'), (1, 'b')] [(1, 'x'), (2, 'y')]"
    );
    assert_eq!(
        run_trimmed("print(int('42') + 1, float('1.5'), str(3) + '!')"),
        "43 1.5 3!"
    );
    assert_eq!(
        run_trimmed("print(isinstance(True, int), isinstance('s', (int, str)))"),
        "True True"
    );
    assert_eq!(run_trimmed("print(abs(-3), bool([]), tuple(reversed([1, 2])))"), "3 False (2, 1)");
}

#[test]
fn containers_are_shared_references() {
    assert_eq!(run_trimmed("xs = []\nys = xs\nxs += [1]\nprint(ys)"), "[1]");
    let src = "d = {'a': 1}\nd.setdefault('b', []).append(2)\nprint(d, d.get('z', 0), list(d.keys()))";
    assert_eq!(run_trimmed(src), "{'a': 1, 'b': [2]} 0 ['a', 'b']");
}

#[test]
fn exception_values() {
    let src = "e = ValueError('x')\nprint(repr(e), isinstance(e, Exception))";
    assert_eq!(run_trimmed(src), "ValueError('x') True");
}

// ---- Errors ----

#[test]
fn zero_division_reports_line_and_location() {
    let err = run_err("x = 1\ny = x / 0\n");
    assert_eq!(err.error.kind, ErrorKind::ZeroDivisionError);
    assert_eq!(err.error.line, Some(2));
    assert_eq!(err.to_string(), "test.md:1: ZeroDivisionError: division by zero");
}

#[test]
fn undefined_name() {
    let err = run_err("print(undefined_name)");
    assert_eq!(err.error.kind, ErrorKind::NameError);
    assert_eq!(err.error.message, "name 'undefined_name' is not defined");
    let err = run_err("x = 1\ndel x\nprint(x)");
    assert_eq!(err.error.kind, ErrorKind::NameError);
    assert_eq!(err.error.line, Some(3));
}

#[test]
fn local_read_before_assignment() {
    let src = "\
x = 1
def f():
    print(x)
    x = 2
f()
";
    let err = run_err(src);
    assert_eq!(err.error.kind, ErrorKind::UnboundLocalError);
    assert_eq!(err.error.line, Some(3));
}

#[test]
fn errors_inside_functions_report_the_innermost_line() {
    let err = run_err("def f():\n    return 1 / 0\nf()\n");
    assert_eq!(err.error.line, Some(2));
    assert_eq!(err.line, 3);
}

#[test]
fn assert_and_raise() {
    let err = run_err("assert 1 + 1 == 3, 'math is broken'");
    assert_eq!(err.error.kind, ErrorKind::AssertionError);
    assert_eq!(err.error.message, "math is broken");

    let err = run_err("raise ValueError('bad input')");
    assert_eq!(err.error.to_string(), "ValueError: bad input");

    let err = run_err("d = {}\nd['missing']");
    assert_eq!(err.error.to_string(), "KeyError: 'missing'");
}

#[test]
fn type_and_index_errors() {
    let err = run_err("'a' + 1");
    assert_eq!(
        err.error.message,
        "unsupported operand type(s) for +: 'str' and 'int'"
    );
    let err = run_err("[1][5]");
    assert_eq!(err.error.to_string(), "IndexError: list index out of range");
    let err = run_err("len(5)");
    assert_eq!(err.error.kind, ErrorKind::TypeError);
}

#[test]
fn call_signature_errors() {
    let err = run_err("def f(a):\n    pass\nf(1, 2)");
    assert!(err.error.message.contains("takes 1 positional argument but 2 were given"));
    let err = run_err("def f(a):\n    pass\nf(b=1)");
    assert!(err.error.message.contains("unexpected keyword argument 'b'"));
}

#[test]
fn deeply_nested_lists_raise_instead_of_overflowing() {
    let src = "\
a = []
b = []
for i in range(3000):
    a = [a]
    b = [b]
";
    let err = on_large_stack(move || run_err(&format!("{}print(str(a))\n", src)));
    assert_eq!(err.error.kind, ErrorKind::RecursionError);
    assert_eq!(err.line, 6);
    let err = on_large_stack(move || run_err(&format!("{}print(a == b)\n", src)));
    assert_eq!(err.error.kind, ErrorKind::RecursionError);
    let output = on_large_stack(move || run_trimmed(&format!("{}print(len(a), a is b)\n", src)));
    assert_eq!(output, "1 False");
}

#[test]
fn deeply_nested_source_is_a_syntax_error() {
    let source = format!("x = {}1{}", "(".repeat(1000), ")".repeat(1000));
    let err = compile(&source, "test.md:1").unwrap_err();
    assert_eq!(err.error.message, "too many nested parentheses");
    let source = format!("x = {}1", "-".repeat(1000));
    assert!(compile(&source, "test.md:1").is_err());
}

#[test]
fn evaluation_depth_is_bounded() {
    // Deeper than the parser allows, so the tree is built by hand.
    let err = on_large_stack(|| {
        let mut expr = Expr::Int(1);
        for _ in 0..10_000 {
            expr = Expr::Unary {
                operator: UnaryOperator::Negation,
                operand: Box::new(expr),
            };
        }
        let code = CodeObject {
            location: "test.md:1".to_string(),
            module: Rc::new(Module {
                body: vec![Stmt {
                    kind: StmtKind::Expr(expr),
                    line: 1,
                }],
            }),
        };
        let mut namespace = Namespace::new();
        exec(&code, &mut namespace, &mut Vec::new()).expect_err("expected a runtime error")
    });
    assert_eq!(err.error.kind, ErrorKind::RecursionError);
}

// ---- Namespaces ----

#[test]
fn exec_injects_builtins_once() {
    let code = compile("x = 41", "test.md:1").unwrap();
    let mut namespace = Namespace::new();
    let mut output = Vec::new();
    exec(&code, &mut namespace, &mut output).unwrap();
    assert!(matches!(
        namespace.get("__builtins__"),
        Some(RuntimeValue::Builtins(_))
    ));
    assert_eq!(namespace.names().collect::<Vec<_>>(), vec!["__builtins__", "x"]);
}

#[test]
fn namespace_carries_state_between_code_objects() {
    let first = compile("x = 41\ndef double(n):\n    return n * 2\n", "doc.md:3").unwrap();
    let second = compile("print(double(x + 1) // 2)", "doc.md:9").unwrap();
    let mut namespace = Namespace::new();
    let mut output = Vec::new();
    exec(&first, &mut namespace, &mut output).unwrap();
    namespace.remove("__builtins__");
    exec(&second, &mut namespace, &mut output).unwrap();
    assert_eq!(String::from_utf8(output).unwrap(), "42\n");
}

#[test]
fn compile_errors_keep_the_location() {
    let err = compile("def (:\n    pass\n", "doc.rst:3").unwrap_err();
    assert!(err.to_string().starts_with("doc.rst:3: SyntaxError:"));
    assert_eq!(err.error.line, 1);
}
