use loom::{CompileOptions, Dialect, compile};

fn build(source: &str) -> String {
    compile(source, 0, &CompileOptions::default())
        .expect("compile failed")
        .code
}

fn build_legacy(source: &str) -> String {
    let options = CompileOptions {
        dialect: Dialect::Legacy,
        ..CompileOptions::default()
    };
    compile(source, 0, &options).expect("compile failed").code
}

/// Wrap the content in a list with statement tracking on.
fn in_list(content: &str) -> String {
    format!("<ul #logic>{}</ul>", content)
}

#[test]
fn static_condition_stays_plain() {
    let code = build(&in_list("\nif (show) {\n<li>yes</li>\n}\n"));
    assert!(code.contains("\nif (show) {\n__rt.element(__context, \"li\""), "{}", code);
    assert!(code.contains(");\n}\n"), "{}", code);
    assert!(!code.contains("bindFlow"), "{}", code);
}

#[test]
fn keywords_without_logic_are_text() {
    let code = build("<p>if (x) { y }</p>");
    assert!(code.contains("[__rt.text, `if (x) { y }`]"), "{}", code);
}

#[test]
fn keyword_must_start_a_line() {
    let code = build(&in_list("a if (x) {b}"));
    assert!(code.contains("`a if (x) {b}`"), "{}", code);
}

#[test]
fn keyword_prefix_of_a_word_is_text() {
    let code = build(&in_list("\niffy (x) {b}"));
    assert!(code.contains("iffy (x) {b}"), "{}", code);
}

#[test]
fn reactive_condition_becomes_bind_flow_if_else() {
    let code = build(&in_list("\nif (*show) {\n<li>yes</li>\n}\n"));
    assert!(
        code.contains("\n__rt.bindFlowIfElse(__context, __tracker => __tracker.a(show) ? 0 : -1, __context => {\n"),
        "{}",
        code
    );
    assert!(code.contains("\n});\n"), "{}", code);
}

#[test]
fn reactive_if_else_chain() {
    let code = build(&in_list("\nif (*a) {\nx\n} else if (b) {\ny\n} else {\nz\n}\n"));
    assert!(
        code.contains("__rt.bindFlowIfElse(__context, __tracker => __tracker.a(a) ? 0 : b ? 1 : 2, __context => {"),
        "{}",
        code
    );
    assert_eq!(code.matches("__context => {").count(), 4, "{}", code);
    assert!(!code.contains("else"), "{}", code);
}

#[test]
fn static_if_else_chain_is_kept() {
    let code = build(&in_list("\nif (a) {\nx\n} else {\ny\n}\n"));
    assert!(code.contains("if (a) {"), "{}", code);
    assert!(code.contains("} else {"), "{}", code);
}

#[test]
fn inline_body_closes_at_line_end() {
    let code = build(&in_list("\nif (a) <li/>\nafter"));
    assert!(code.contains("if (a) {__rt.element(__context, \"li\", {});}"), "{}", code);
    assert!(code.contains("[__rt.text, `\nafter`]"), "{}", code);
}

#[test]
fn foreach_array() {
    let code = build(&in_list("\nforeach (items as item) {\n<li>${item}</li>\n}\n"));
    assert!(code.contains("__rt.forEachArray(items, (item) => {"), "{}", code);
    assert!(code.contains("\n});\n"), "{}", code);
}

#[test]
fn foreach_object() {
    let code = build(&in_list("\nforeach (obj as key: value) {\n${key}\n}\n"));
    assert!(code.contains("__rt.forEachObject(obj, (value, key) => {"), "{}", code);
}

#[test]
fn foreach_ranges() {
    let code = build(&in_list("\nforeach (from 1 to 4 as i) {\n${i}\n}\n"));
    assert!(code.contains("__rt.range(1, 4, (i) => {"), "{}", code);
    let code = build(&in_list("\nforeach (to n as i) {\n${i}\n}\n"));
    assert!(code.contains("__rt.range(0, n, (i) => {"), "{}", code);
}

#[test]
fn reactive_foreach_of_a_bare_read() {
    let code = build(&in_list("\nforeach (*items as item) {\n${item}\n}\n"));
    assert!(
        code.contains("__rt.bindFlowEach(__context, items, (__context, item) => {"),
        "{}",
        code
    );
}

#[test]
fn reactive_foreach_of_an_expression() {
    let code = build(&in_list("\nforeach (*a.concat(b) as item) {\n${item}\n}\n"));
    assert!(
        code.contains("__rt.bindFlowEach(__context, __rt.coff(__context, __tracker => __tracker.c(a, "),
        "{}",
        code
    );
}

#[test]
fn reactive_object_iteration() {
    let code = build(&in_list("\nforeach (*obj as k: v) {\n${k}\n}\n"));
    assert!(
        code.contains("__rt.bindFlowEachObject(__context, obj, (__context, v, k) => {"),
        "{}",
        code
    );
}

#[test]
fn reactive_loop_becomes_bind_flow() {
    let code = build(&in_list("\nfor (let i = 0; i < *n; i++) {\n${i}\n}\n"));
    assert!(
        code.contains("__rt.bindFlow(__context, __tracker => __context => {for (let i = 0; i < __tracker.a(n); i++) {"),
        "{}",
        code
    );
    assert!(code.contains("\n}});\n"), "{}", code);
}

#[test]
fn declarations_are_code() {
    let code = build(&in_list("\nconst total = *a + 1;\n${total}\n"));
    assert!(code.contains("\nconst total = __tracker.a(a) + 1;"), "{}", code);
    assert!(code.contains("[__rt.text, `\n${total}\n`]"), "{}", code);
}

#[test]
fn escaped_keyword_is_text() {
    let code = build(&in_list("\n\\if (x) {y}"));
    assert!(code.contains("if (x) {y}"), "{}", code);
    assert!(!code.contains("\\if"), "{}", code);
}

#[test]
fn stray_brace_is_text() {
    let output = compile(&in_list("a } b"), 0, &CompileOptions::default()).expect("compile failed");
    assert!(output.code.contains("`a } b`"), "{}", output.code);
    assert!(output.warnings.is_empty());
}

#[test]
fn stray_brace_warning_on_request() {
    let options = CompileOptions {
        warn_fallbacks: true,
        ..CompileOptions::default()
    };
    let output = compile(&in_list("a } b"), 0, &options).expect("compile failed");
    assert_eq!(output.warnings.len(), 1);
    assert!(output.warnings[0].is_warning());
}

#[test]
fn unclosed_block_is_an_error() {
    let errors = compile(&in_list("\nif (x) {\ny\n"), 0, &CompileOptions::default()).unwrap_err();
    assert_eq!(errors.len(), 1, "{:?}", errors);
    assert_eq!(errors[0].message, "`if` block is never closed");
}

#[test]
fn unclosed_block_in_nested_elements_is_reported_once() {
    let source = format!("<div><section>{}</section></div>", in_list("\nif (a) {\nx"));
    let errors = compile(&source, 0, &CompileOptions::default()).unwrap_err();
    assert_eq!(errors.len(), 1, "{:?}", errors);
}

#[test]
fn legacy_if_else_arms() {
    let code = build_legacy(&in_list("\nif (*a) {\nx\n} else {\ny\n}\n"));
    assert!(
        code.contains("__rt.bindFlowIfElse(__context, function(__tracker){return __tracker.a(a) ? 0 : 1}.bind(this), function(__context) {"),
        "{}",
        code
    );
    assert!(code.contains("}.bind(this) , function(__context) {"), "{}", code);
    assert!(code.contains("}.bind(this));"), "{}", code);
}

#[test]
fn legacy_foreach_callback() {
    let code = build_legacy(&in_list("\nforeach (items as item) {\n${item}\n}\n"));
    assert!(code.contains("__rt.forEachArray(items, function(item) {"), "{}", code);
    assert!(code.contains("}.bind(this));"), "{}", code);
}
