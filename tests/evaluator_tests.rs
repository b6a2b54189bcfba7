use crust::{CrustError, Environment, ErrorKind, Interpreter, InterpreterConfig, Span, Value};
use pretty_assertions::assert_eq;

fn eval(source: &str) -> Value {
    Interpreter::new()
        .run(source)
        .unwrap_or_else(|error| panic!("`{}` failed: {}", source, error))
}

fn eval_err(source: &str) -> CrustError {
    match Interpreter::new().run(source) {
        Ok(value) => panic!("`{}` should fail but produced {}", source, value),
        Err(error) => error,
    }
}

fn number(n: f64) -> Value {
    Value::Number(n)
}

fn string(s: &str) -> Value {
    Value::string(s)
}

#[test]
fn arithmetic_precedence() {
    assert_eq!(eval("(100 / 2) + 100 * 2 + (2 + 4)"), number(256.0));
    assert_eq!(eval("2 ** 3"), number(8.0));
    assert_eq!(eval("4 // 3"), number(1.0));
    assert_eq!(eval("7 % 4"), number(3.0));
    assert_eq!(eval("-7 // 2"), number(-4.0));
    assert_eq!(eval("10 - 2 - 3"), number(5.0));
}

#[test]
fn unary_operators() {
    assert_eq!(eval("!0"), Value::Boolean(false));
    assert_eq!(eval("!''"), Value::Boolean(false));
    assert_eq!(eval("!5"), Value::Boolean(true));
    assert_eq!(eval("!'a'"), Value::Boolean(true));
    assert_eq!(eval("!true"), Value::Boolean(false));
    assert_eq!(eval("+(-52)"), number(52.0));
    assert_eq!(eval("fn two() { return 2 } set n = -two() n"), number(-2.0));
    assert_eq!(eval("fn two() { return 2 }; -two()"), number(-2.0));
    assert_eq!(eval_err("-'a'").kind, ErrorKind::RuntimeError);
}

#[test]
fn string_operators() {
    assert_eq!(eval("\"!\" * 3"), string("!!!"));
    assert_eq!(eval("3 * 'ab'"), string("ababab"));
    assert_eq!(eval("\"Hello \" + \"World\""), string("Hello World"));
    assert_eq!(eval("'apple' < 'banana'"), Value::Boolean(true));
    assert_eq!(eval_err("'a' + 1").kind, ErrorKind::RuntimeError);
    assert_eq!(eval_err("'a' * -1").kind, ErrorKind::RuntimeError);
}

#[test]
fn unmatched_operand_types_yield_null() {
    assert_eq!(eval("null == null"), Value::Null);
    assert_eq!(eval("true + 1"), Value::Null);
    assert_eq!(eval("[1] + [2]"), Value::Null);
}

#[test]
fn logical_operators_need_booleans() {
    assert_eq!(eval("true && false || true"), Value::Boolean(true));
    assert_eq!(eval_err("1 && 2").kind, ErrorKind::RuntimeError);
    // Both operands are always evaluated.
    assert_eq!(eval_err("false && 1 / 0 == 1").kind, ErrorKind::DivisionByZeroError);
}

#[test]
fn constants_cannot_be_reassigned() {
    let error = eval_err("keep x = 1 x = 2");
    assert_eq!(error.kind, ErrorKind::RuntimeError);
    assert!(error.message.contains("constant"), "{}", error.message);

    assert_eq!(eval_err("keep x = 1 x += 1").kind, ErrorKind::RuntimeError);
    assert_eq!(eval_err("true = false").kind, ErrorKind::RuntimeError);
    assert_eq!(eval("set x = 1 x = 2 x"), number(2.0));
}

#[test]
fn declarations() {
    assert_eq!(eval("set x x"), Value::Null);
    assert_eq!(eval_err("set x = 1 set x = 2").kind, ErrorKind::RuntimeError);
    assert_eq!(eval_err("missing").kind, ErrorKind::RuntimeError);
    assert_eq!(eval_err("missing = 1").kind, ErrorKind::RuntimeError);
}

#[test]
fn closures_capture_the_defining_scope() {
    let source = "
        fn makeAdder(n) {
            fn add(x) { return x + n }
            return add
        }
        set addTwo = makeAdder(2)
        set n = 100
        addTwo(5)
    ";
    assert_eq!(eval(source), number(7.0));

    let counter = "
        fn counter() {
            set n = 0
            fn next() { n += 1 return n }
            return next
        }
        set c = counter()
        c() c() c()
    ";
    assert_eq!(eval(counter), number(3.0));

    // Free variables are not looked up in the caller.
    let dynamic = "
        fn f() { return y }
        fn g() { set y = 1 return f() }
        g()
    ";
    assert_eq!(eval_err(dynamic).kind, ErrorKind::RuntimeError);
}

#[test]
fn recursion() {
    let source = "
        fn fib(n) {
            if n < 2 { return n }
            return fib(n - 1) + fib(n - 2)
        }
        fib(10)
    ";
    assert_eq!(eval(source), number(55.0));
}

#[test]
fn call_arity_is_permissive() {
    assert_eq!(eval("fn f(a, b) { return b } f(1)"), Value::Null);
    assert_eq!(eval("fn f(a, b) { return b } f(1, 2, 3)"), number(2.0));
    assert_eq!(eval("fn f() { 5 } f()"), number(5.0));
    assert_eq!(eval_err("set x = 1 x()").kind, ErrorKind::RuntimeError);
}

#[test]
fn while_loop_with_continue_and_break() {
    let source = "
        set x = 0
        set y = null
        while x <= 5 {
            x = x + 1
            if x == 2 { y = 5 continue } elif x == 4 { break }
        }
        x - y
    ";
    assert_eq!(eval(source), number(-1.0));
}

#[test]
fn for_loop_binds_its_own_variable() {
    let source = "
        set x = 0
        set y = null
        for x in range(1, 5) {
            x = x + 1
            if x == 2 { y = 5 continue } elif x == 4 { break }
        }
        x - y
    ";
    assert_eq!(eval(source), number(-5.0));
}

#[test]
fn for_loop_over_strings_and_objects() {
    assert_eq!(eval("set out = '' for c in 'abc' { out = c + out } out"), string("cba"));
    assert_eq!(
        eval("set o = { b: 2, a: 1 } set keys = '' for k in o { keys += k } keys"),
        string("ab")
    );
    assert_eq!(eval_err("for i in 5 { }").kind, ErrorKind::RuntimeError);
}

#[test]
fn nested_loops_break_only_the_inner_one() {
    let source = "
        set count = 0
        for i in range(0, 3) {
            for j in range(0, 10) {
                if j == 2 { break }
                count += 1
            }
        }
        count
    ";
    assert_eq!(eval(source), number(6.0));
}

#[test]
fn elif_selects_one_branch() {
    assert_eq!(
        eval("set x=0; if false {x=100} elif true {x=200} else {x=300} x"),
        number(200.0)
    );
    assert_eq!(
        eval("set x=0; if false {x=100} elif false {x=200} else {x=300} x"),
        number(300.0)
    );
}

#[test]
fn conditions_must_be_booleans() {
    assert_eq!(eval_err("if 1 { 2 }").kind, ErrorKind::RuntimeError);
    assert_eq!(eval_err("while 'x' { }").kind, ErrorKind::RuntimeError);
}

#[test]
fn return_unwinds_loops_and_the_program() {
    let source = "
        fn find() {
            for i in range(0, 10) {
                if i == 3 { return i }
            }
            return -1
        }
        find()
    ";
    assert_eq!(eval(source), number(3.0));
    assert_eq!(eval("set x = 1 return x + 1 x = 100"), number(2.0));
    assert_eq!(eval("fn f() { return } f()"), Value::Null);
}

#[test]
fn loop_control_outside_a_loop_is_an_error() {
    assert_eq!(eval_err("break").kind, ErrorKind::RuntimeError);
    assert_eq!(eval_err("continue").kind, ErrorKind::RuntimeError);
    assert_eq!(
        eval_err("fn f() { break } while true { f() }").kind,
        ErrorKind::RuntimeError
    );
}

#[test]
fn try_catch_isolates_failures() {
    assert_eq!(eval("set x = 0 try { Int('a') } catch (e) { x = 10 } x"), number(10.0));
    assert_eq!(eval("set x = 0 try { Int('a') } catch { x = 10 } x"), number(10.0));
    assert_eq!(
        eval("set k = null try { Int('a') } catch (e) { k = e.kind } k"),
        string("TypeError")
    );
    assert_eq!(
        eval("try { 1 / 0 } catch (e) { e == 'DivisionByZeroError' }"),
        Value::Boolean(true)
    );
    assert_eq!(
        eval("try { throw('bad input', 'ValueError') } catch (e) { e.kind + ': ' + e.message }"),
        string("ValueError: bad input")
    );
    assert_eq!(eval("try { throw('x') } catch (e) { typeof(e) }"), string("error"));
    // The caught error is a constant.
    assert_eq!(eval_err("try { throw('x') } catch (e) { e = 1 }").kind, ErrorKind::RuntimeError);
}

#[test]
fn try_does_not_intercept_loop_control() {
    let source = "
        set i = 0
        while true {
            i += 1
            try { break } catch { i = 100 }
        }
        i
    ";
    assert_eq!(eval(source), number(1.0));
}

#[test]
fn uncaught_errors_keep_their_kind() {
    assert_eq!(eval_err("1 / 0").kind, ErrorKind::DivisionByZeroError);
    assert_eq!(eval_err("5 % 0").kind, ErrorKind::DivisionByZeroError);
    assert_eq!(eval_err("5 // 0").kind, ErrorKind::DivisionByZeroError);
    assert_eq!(eval_err("throw('boom', 'Oops')").kind, ErrorKind::Custom("Oops".to_string()));
    assert_eq!(eval_err("throw('boom')").kind, ErrorKind::RuntimeError);
}

#[test]
fn block_shadowing() {
    assert_eq!(eval("set x = 1 { set x = 2 } x"), number(1.0));
    assert_eq!(eval("set x = 1 { x = 2 } x"), number(2.0));
    assert_eq!(eval_err("{ set inner = 1 } inner").kind, ErrorKind::RuntimeError);
}

#[test]
fn arrays() {
    assert_eq!(eval("set a = [1, 2] a[1] = 10 String(a)"), string("[1, 10]"));
    assert_eq!(eval("set a = [1, 2] a[0] += 5 a[0]"), number(6.0));
    assert_eq!(eval_err("set a = [1, 2] a[2]").kind, ErrorKind::IndexOutOfBoundsError);
    assert_eq!(eval_err("set a = [1, 2] a[-1]").kind, ErrorKind::IndexOutOfBoundsError);
    assert_eq!(eval_err("set a = [1, 2] a[0.5]").kind, ErrorKind::IndexOutOfBoundsError);
    assert_eq!(eval_err("set a = [1, 2] a[5] = 1").kind, ErrorKind::IndexOutOfBoundsError);
    assert_eq!(eval_err("set a = [1] a['x']").kind, ErrorKind::RuntimeError);
    // Arrays are shared, not copied.
    assert_eq!(eval("set a = [1] set b = a push(b, 2) len(a)"), number(2.0));
}

#[test]
fn objects() {
    assert_eq!(eval("set o = { a: 1 } o.b"), Value::Null);
    assert_eq!(eval("set o = { a: 1 } o.a += 2 o.a"), number(3.0));
    assert_eq!(eval("set o = {} o['k'] = 'v' o.k"), string("v"));
    assert_eq!(eval("set a = 1 set o = { a } o.a"), number(1.0));
    assert_eq!(eval("set o = { inner: { x: [1, 2] } } o.inner.x[1]"), number(2.0));
    assert_eq!(
        eval("set o = { b: 'x', a: 1 } String(o)"),
        string("{ a: 1, b: \"x\" }")
    );
    assert_eq!(eval_err("null.x").kind, ErrorKind::RuntimeError);
    assert_eq!(eval_err("set o = {} o[1]").kind, ErrorKind::RuntimeError);
}

#[test]
fn standard_library() {
    assert_eq!(eval("Int('100a')"), number(100.0));
    assert_eq!(eval("Float('2.5kg')"), number(2.5));
    assert_eq!(eval("String(12)"), string("12"));
    assert_eq!(eval("len('héllo')"), number(5.0));
    assert_eq!(eval("typeof(1)"), string("number"));
    assert_eq!(eval("typeof(typeof)"), string("native-function"));
    assert_eq!(eval("fn f() {} typeof(f)"), string("function"));
    assert_eq!(eval("set a = [1, 2, 3] reverse(a) pop(a)"), number(1.0));
    assert_eq!(eval("set a = [2] unshift(a, 1) shift(a)"), number(1.0));
    assert_eq!(eval("set a = [1, 2, 3] remove(a, 1) String(a)"), string("[1, 3]"));
    assert_eq!(eval("Math.max(1, 5, 3)"), number(5.0));
    assert_eq!(eval("Math.floor(2.7)"), number(2.0));
    assert_eq!(eval("Math.PI > 3"), Value::Boolean(true));
    assert_eq!(eval_err("pop([])").kind, ErrorKind::IndexOutOfBoundsError);
    assert_eq!(eval_err("push(1, 2)").kind, ErrorKind::TypeError);
}

#[test]
fn call_depth_is_limited() {
    let config = InterpreterConfig { max_call_depth: 32 };
    let mut interpreter = Interpreter::new().with_config(config);

    let error = interpreter
        .run("fn spin(n) { return spin(n + 1) } spin(0)")
        .unwrap_err();
    assert_eq!(error.kind, ErrorKind::RuntimeError);
    assert!(error.message.contains("Maximum call depth"), "{}", error.message);

    // The interpreter is still usable, and the error can be caught.
    let caught = interpreter
        .run("try { spin(0) } catch (e) { e.kind }")
        .unwrap();
    assert_eq!(caught, string("RuntimeError"));
}

#[test]
fn state_persists_across_runs() {
    let mut interpreter = Interpreter::new();
    interpreter.run("set x = 1 fn double(n) { return n * 2 }").unwrap();
    assert_eq!(interpreter.run("x + 1").unwrap(), number(2.0));

    let double = interpreter.run("double").unwrap();
    assert_eq!(interpreter.call_value(&double, &[number(21.0)]).unwrap(), number(42.0));
}

#[test]
fn finished_scopes_are_released() {
    let mut interpreter = Interpreter::new();
    let total = interpreter
        .run("set total = 0 for i in range(0, 50) { set sq = i * i total += sq } total")
        .unwrap();
    assert_eq!(total, number(40425.0));
    assert_eq!(interpreter.environment().scope_count(), 1);

    interpreter
        .run("fn counter() { set n = 0 fn next() { n += 1 return n } return next } set c = counter()")
        .unwrap();
    assert!(interpreter.environment().scope_count() > 1);
    assert_eq!(interpreter.run("c() c()").unwrap(), number(2.0));
}

#[test]
fn functions_declared_in_repeated_scopes_do_not_accumulate() {
    let mut interpreter = Interpreter::new();
    let count = interpreter
        .run("set n = 0 while n < 10000 { fn helper() { return 1 } n += helper() } n")
        .unwrap();
    assert_eq!(count, number(10000.0));
    assert!(interpreter.environment().scope_count() < 100);

    let mut interpreter = Interpreter::new();
    interpreter
        .run("fn outer() { fn inner() { return 1 } return inner() } set i = 0 while i < 10000 { i += outer() }")
        .unwrap();
    assert!(interpreter.environment().scope_count() < 100);
}

#[test]
fn reachable_closures_survive_collection() {
    let mut interpreter = Interpreter::new();
    let value = interpreter
        .run(
            "set getters = [] \
             for i in range(0, 200) { set j = i fn get() { return j } push(getters, get) } \
             getters[42]() + getters[199]()",
        )
        .unwrap();
    assert_eq!(value, number(241.0));
    assert!(interpreter.environment().scope_count() > 200);

    interpreter.run("getters = null").unwrap();
    interpreter.environment_mut().collect();
    assert_eq!(interpreter.environment().scope_count(), 1);
}

#[test]
fn recursion_up_to_the_default_limit_completes() {
    let value = eval("fn r(n) { if n == 0 { return 0 } return 1 + r(n - 1) } r(199)");
    assert_eq!(value, number(199.0));

    let config = InterpreterConfig { max_call_depth: 5000 };
    let value = Interpreter::new()
        .with_config(config)
        .run("fn r(n) { if n == 0 { return 0 } return 1 + r(n - 1) } r(4000)")
        .unwrap();
    assert_eq!(value, number(4000.0));
}

#[test]
fn deeply_nested_source_does_not_overflow() {
    let source = format!("{}1{}", "(".repeat(5000), ")".repeat(5000));
    assert_eq!(eval(&source), number(1.0));

    let source = format!("{}3", "- ".repeat(2000));
    assert_eq!(eval(&source), number(3.0));
}

#[test]
fn oversized_string_repetition_is_catchable() {
    assert_eq!(eval("'ab' * 3"), string("ababab"));
    assert_eq!(eval("2.5 * 'x'"), string("xx"));

    let error = eval_err("'ab' * (10 ** 19)");
    assert_eq!(error.kind, ErrorKind::RuntimeError);
    assert!(error.message.contains("maximum string length"), "{}", error.message);

    assert_eq!(
        eval("try { set s = 'ab' * (10 ** 19) } catch (e) { e.kind }"),
        string("RuntimeError")
    );
}

#[test]
fn self_containing_collections_display() {
    assert_eq!(eval("set a = [1] push(a, a) String(a)"), string("[1, [...]]"));
    assert_eq!(eval("set o = { k: 1 } o.me = o String(o)"), string("{ k: 1, me: {...} }"));
    assert_eq!(
        eval("set a = [] set o = { items: a } push(a, o) String(o)"),
        string("{ items: [{...}] }")
    );
    assert_eq!(eval("set inner = [1] String([inner, inner])"), string("[[1], [1]]"));
}

#[test]
fn for_in_sees_elements_pushed_by_the_body() {
    assert_eq!(
        eval("set a = [1, 2, 3] set n = 0 for x in a { if n < 2 { push(a, 10) } n += 1 } n"),
        number(5.0)
    );
    assert_eq!(
        eval("set a = [1, 2, 3, 4] set seen = 0 for x in a { pop(a) seen += 1 } seen"),
        number(2.0)
    );
}

#[test]
fn prefix_operators_apply_to_member_chains() {
    assert_eq!(eval("set o = { f: true } !o.f"), Value::Boolean(false));
    assert_eq!(eval("fn two() { return 2 } set n = -two() n"), number(-2.0));
}

#[test]
fn number_formatting_natives() {
    assert_eq!(eval("fixed(3.14159, 2)"), string("3.14"));
    assert_eq!(eval("fixed(7)"), string("7"));
    assert_eq!(eval("parseInt('42') + parseFloat('0.5')"), number(42.5));
    assert_eq!(eval_err("fixed('1')").kind, ErrorKind::TypeError);
}

#[test]
fn embedders_seed_the_root_scope() {
    let remember = Value::native("remember", |arguments, environment, scope| {
        let value = arguments.first().cloned().unwrap_or(Value::Null);
        environment.declare(scope, "remembered", value, false)
    });
    let refuse = Value::native("refuse", |_, _, _| Err(CrustError::type_error("refused by the host")));
    let environment = Environment::with_bindings(vec![
        ("remember".to_string(), remember),
        ("refuse".to_string(), refuse),
    ])
    .unwrap();
    let mut interpreter = Interpreter::with_environment(environment);

    assert_eq!(interpreter.run("remember(7) remembered + 1").unwrap(), number(8.0));
    assert_eq!(
        interpreter.run("remember = 1").unwrap_err().kind,
        ErrorKind::RuntimeError
    );
    assert_eq!(
        interpreter.run("try { refuse() } catch (e) { e.message }").unwrap(),
        string("refused by the host")
    );
    assert_eq!(
        interpreter.run("try { refuse() } catch (e) { e.kind }").unwrap(),
        string("TypeError")
    );

    let global = interpreter.global_scope();
    interpreter
        .environment_mut()
        .declare(global, "limit", number(3.0), true)
        .unwrap();
    assert_eq!(interpreter.run("limit * 2").unwrap(), number(6.0));
    assert!(interpreter.run("limit = 4").is_err());
    assert_eq!(interpreter.environment().get(global, "remembered").unwrap(), number(7.0));

    // Only what the embedder installed is visible.
    assert!(interpreter.run("output(1)").is_err());
}

#[test]
fn runtime_errors_point_at_the_source() {
    let error = eval_err("set x = 1\nundefinedVar");
    assert_eq!(error.span, Some(Span::new(10, 22)));
    assert!(error.help.is_some());
}
