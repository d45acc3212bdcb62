use loom::{CompileOptions, ErrorKind, Format, compile};

fn build(source: &str) -> String {
    compile(source, 0, &CompileOptions::default())
        .expect("compile failed")
        .code
}

fn build_css(css: &str) -> String {
    build(&format!("<style>{}</style>", css))
}

#[test]
fn static_sheet_is_rendered_at_compile_time() {
    assert_eq!(
        build_css(".a { color: red; }"),
        "__rt.element(__context, \"style\", {}, __context => {__rt.css(__context, \".a{color:red;}\");})"
    );
}

#[test]
fn nested_selectors_are_combined() {
    assert_eq!(
        build_css(".a { color: red; .b { margin: 0; } &:hover { color: blue; } }"),
        "__rt.element(__context, \"style\", {}, __context => {\
         __rt.css(__context, \".a{color:red;}.a .b{margin:0;}.a:hover{color:blue;}\");})"
    );
    assert_eq!(
        build_css(".a { &:hover { color: red; } }"),
        "__rt.element(__context, \"style\", {}, __context => {__rt.css(__context, \".a:hover{color:red;}\");})"
    );
}

#[test]
fn folded_sheet_after_text() {
    assert_eq!(
        build("<div>x<style>.a { color: red; }</style></div>"),
        "__rt.element(__context, \"div\", {}, __context => {__rt.chain(__context, [__rt.text, `x`]);\
         __rt.element(__context, \"style\", {}, __context => {__rt.css(__context, \".a{color:red;}\");});})"
    );
}

#[test]
fn last_declaration_may_omit_the_semicolon() {
    let code = build_css(".a { color: red }");
    assert!(code.contains("\".a{color:red;}\""), "{}", code);
}

#[test]
fn indented_format() {
    let options = CompileOptions {
        style_format: Format::Indented,
        ..CompileOptions::default()
    };
    let output = compile("<style>.a { color: red; }</style>", 0, &options).expect("compile failed");
    assert!(
        output.code.contains(r#"__rt.css(__context, ".a {\n  color: red;\n}\n");"#),
        "{}",
        output.code
    );
}

#[test]
fn region_selector_wraps_the_sheet() {
    let code = build("<style #scope=\".card\">.a { color: red; }</style>");
    assert!(code.contains("\".card .a{color:red;}\""), "{}", code);
}

#[test]
fn at_rules() {
    let code = build_css("@media (max-width: 10px) { .a { color: red; } }");
    assert!(
        code.contains("\"@media (max-width: 10px){.a{color:red;}}\""),
        "{}",
        code
    );
    let code = build_css("@import url(a.css);");
    assert!(code.contains("\"@import url(a.css);\""), "{}", code);
}

#[test]
fn comments_are_dropped_from_folded_sheets() {
    let code = build_css("/* note */.a { color: red; }");
    assert!(code.contains("\".a{color:red;}\""), "{}", code);
    assert!(!code.contains("note"), "{}", code);
}

#[test]
fn static_unit_arithmetic_is_folded() {
    let code = build_css(".a { width: 10px + 5px; }");
    assert!(code.contains("\".a{width:15px;}\""), "{}", code);
}

#[test]
fn division_by_zero_is_left_to_the_runtime() {
    let code = build_css(".a { width: 10px / 0; }");
    assert!(code.contains("__rt.cu(__value => __value(\"10px\") / 0)"), "{}", code);
    assert!(!code.contains("__rt.css("), "{}", code);
    assert!(!code.contains("inf"), "{}", code);
}

#[test]
fn plain_values_are_not_arithmetic() {
    let code = build_css(".a { margin: 1px -2px; font: 12px/1.5 serif; }");
    assert!(
        code.contains("\".a{margin:1px -2px;font:12px/1.5 serif;}\""),
        "{}",
        code
    );
}

#[test]
fn runtime_values_build_the_sheet_at_runtime() {
    let code = build_css(".a { color: ${c}; }");
    assert_eq!(
        code,
        "__rt.element(__context, \"style\", {}, __context => {\
         __rt.cabs(__context, null, __s0 => {const __s1 = __s0.select(`.a`); __s1.value(`color`, `${c}`); });})"
    );
}

#[test]
fn reactive_values_rebuild_the_sheet() {
    let code = build_css(".a { width: ${*w}px; }");
    assert!(
        code.contains(
            "__rt.cabs(__context, null, __rt.coff(__context, __tracker => __s0 => {\
             const __s1 = __s0.select(`.a`); __s1.value(`width`, `${__tracker.a(w)}px`); }));"
        ),
        "{}",
        code
    );
}

#[test]
fn runtime_arithmetic_uses_unit_helper() {
    let code = build_css(".a { width: ${w} + 10px; }");
    assert!(
        code.contains("__s1.value(`width`, __rt.cu(__value => __value(w) + __value(\"10px\")));"),
        "{}",
        code
    );
}

#[test]
fn incompatible_units_are_an_error() {
    let errors = compile("<style>.a { width: 10px + 2em; }</style>", 0, &CompileOptions::default())
        .unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ErrorKind::UnitMismatch);
}

#[test]
fn spread_statement() {
    let code = build_css(".a { ${...extra}; }");
    assert!(code.contains("__s1.spread(extra);"), "{}", code);
}

#[test]
fn scoped_sheet() {
    let code = build("<style #scoped>.a { color: red; }</style>");
    assert!(code.contains("__rt.cabs(__context, true, __s0 => {"), "{}", code);
    assert!(code.contains("});__rt.scope(__context);}"), "{}", code);
}

#[test]
fn control_flow_in_sheets() {
    let code = build_css("\nif (*dark) {\n.a { color: black; }\n}\n");
    assert!(
        code.contains("__rt.cabs(__context, null, __rt.coff(__context, __tracker => __s0 => {\nif (__tracker.a(dark)) {\nconst __s1 = __s0.select(`.a`);"),
        "{}",
        code
    );
    assert!(code.contains("\n}));"), "{}", code);
}

#[test]
fn runtime_selector() {
    let code = build_css("${sel} { color: red; }");
    assert!(code.contains("const __s1 = __s0.select(`${sel}`);"), "{}", code);
}

#[test]
fn unclosed_statement_is_an_error() {
    let errors = compile("<style>color: red</style>", 0, &CompileOptions::default()).unwrap_err();
    assert_eq!(errors[0].kind, ErrorKind::MalformedConstruct);
    assert_eq!(errors[0].message, "style statement `color: red` is not closed");
}

#[test]
fn unclosed_selector_is_an_error() {
    let errors = compile("<style>.a { color: red;</style>", 0, &CompileOptions::default()).unwrap_err();
    assert!(
        errors.iter().any(|e| e.message == "block is never closed"),
        "{:?}",
        errors
    );
}
