use loom::{CompileOptions, compile};

fn build(source: &str) -> String {
    compile(source, 0, &CompileOptions::default())
        .expect("compile failed")
        .code
}

#[test]
fn plain_code_passes_through() {
    let source = "const a = 1;\nfunction f(x) { return x * 2; }\nif (a < 2) { f(a); }\n";
    assert_eq!(build(source), source);
}

#[test]
fn comparison_is_not_a_tag() {
    assert_eq!(build("while (i <n) i++;"), "while (i <n) i++;");
    assert_eq!(build("x = a<b;"), "x = a<b;");
}

#[test]
fn multiplication_and_exponent_stay_literal() {
    assert_eq!(build("y = 2 * 3;"), "y = 2 * 3;");
    assert_eq!(build("y = a ** b;"), "y = a ** b;");
    assert_eq!(build("y = (a) * b;"), "y = (a) * b;");
}

#[test]
fn markers_inside_strings_and_comments_are_ignored() {
    let source = "s = \"*x\"; // ^y and &z\nt = '<div>';";
    assert_eq!(build(source), source);
}

#[test]
fn tracked_read() {
    assert_eq!(build("let a = *x + 1;"), "let a = __tracker.a(x) + 1;");
}

#[test]
fn safe_tracked_read() {
    assert_eq!(build("let a = *?x;"), "let a = __tracker.b(x);");
}

#[test]
fn chained_read_subscribes_to_the_root() {
    assert_eq!(
        build("let a = *x.y;"),
        "let a = __tracker.c(x, (__tracker, __value) => __value.y);"
    );
    assert_eq!(
        build("let a = *?x.y;"),
        "let a = __tracker.d(x, (__tracker, __value) => __value.y);"
    );
}

#[test]
fn member_read() {
    assert_eq!(build("f(obj.*prop);"), "f(__tracker.a(obj.prop));");
    assert_eq!(build("f(obj.*[key]);"), "f(__tracker.a(obj[key]));");
}

#[test]
fn spread_of_a_read() {
    assert_eq!(build("f(...*list);"), "f(...__tracker.a(list));");
}

#[test]
fn untracked_reads() {
    assert_eq!(build("let a = ^x;"), "let a = x.value;");
    assert_eq!(build("let a = ^?x;"), "let a = __rt.value(x);");
}

#[test]
fn context_shorthands() {
    assert_eq!(build("let c = $$context;"), "let c = __context;");
    assert_eq!(
        build("$$on(el, \"click\", f);"),
        "__rt.on(__context, el, \"click\", f);"
    );
    assert_eq!(build("$$rollback();"), "__rt.rollback(__context);");
}

#[test]
fn unknown_double_dollar_is_kept() {
    assert_eq!(build("$$foo(1);"), "$$foo(1);");
}

#[test]
fn computed_variable() {
    assert_eq!(build("const c = &x;"), "const c = __rt.cofv(__context, x);");
}

#[test]
fn computed_expression() {
    assert_eq!(
        build("const c = &(*a + 1);"),
        "const c = __rt.coff(__context, __tracker => (__tracker.a(a) + 1));"
    );
}

#[test]
fn computed_function() {
    assert_eq!(
        build("const f = &function(a){ return *a; };"),
        "const f = __rt.coff(__context, function(__tracker, a){ return __tracker.a(a); });"
    );
}

#[test]
fn computed_arrow() {
    assert_eq!(
        build("const f = &(a) => *a;"),
        "const f = __rt.coff(__context, (__tracker, a) => __tracker.a(a));"
    );
}

#[test]
fn modifiers_before_computed_values() {
    assert_eq!(
        build("const f = async &function(){ await g(); };"),
        "const f = __rt.coff(__context, async function(__tracker){ await g(); });"
    );
    assert_eq!(
        build("const c = defer &(*a);"),
        "const c = __rt.cofd(__context, __tracker => (__tracker.a(a)));"
    );
}

#[test]
fn logical_and_is_not_a_marker() {
    assert_eq!(build("ok = a && b;"), "ok = a && b;");
    assert_eq!(build("bits = a & b;"), "bits = a & b;");
}

#[test]
fn legacy_dialect_functions() {
    let options = CompileOptions {
        dialect: loom::Dialect::Legacy,
        ..CompileOptions::default()
    };
    let output = compile("const c = &(*a);", 0, &options).expect("compile failed");
    assert_eq!(
        output.code,
        "const c = __rt.coff(__context, function(__tracker){return (__tracker.a(a))}.bind(this));"
    );
}

#[test]
fn custom_runtime_names() {
    let options = CompileOptions {
        runtime: "Sactory".to_string(),
        context: "ctx".to_string(),
        ..CompileOptions::default()
    };
    let output = compile("$$on(x, f);", 0, &options).expect("compile failed");
    assert_eq!(output.code, "Sactory.on(ctx, x, f);");
}
