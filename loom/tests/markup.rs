use loom::{CompileOptions, compile};

fn build(source: &str) -> String {
    compile(source, 0, &CompileOptions::default())
        .expect("compile failed")
        .code
}

#[test]
fn element_with_text() {
    assert_eq!(
        build("<div>Hello</div>"),
        "__rt.element(__context, \"div\", {}, __context => {__rt.chain(__context, [__rt.text, `Hello`]);})"
    );
}

#[test]
fn element_in_expression_position() {
    assert_eq!(
        build("const el = <br/>;"),
        "const el = __rt.element(__context, \"br\", {});"
    );
}

#[test]
fn nested_elements_keep_whitespace_outside_chains() {
    assert_eq!(
        build("<div> <b>x</b> </div>"),
        "__rt.element(__context, \"div\", {}, __context => { \
         __rt.element(__context, \"b\", {}, __context => {__rt.chain(__context, [__rt.text, `x`]);}); })"
    );
}

#[test]
fn untrimmed_whitespace_is_text() {
    let code = build("<p #trimmed=false> </p>");
    assert!(code.contains("[__rt.text, ` `]"), "{}", code);
}

#[test]
fn attributes() {
    assert_eq!(
        build("<a href=\"/x\" hidden target=_blank></a>"),
        "__rt.element(__context, \"a\", {\"href\": \"/x\", \"hidden\": \"\", \"target\": \"_blank\"}, __context => {})"
    );
}

#[test]
fn reactive_attribute_is_computed() {
    let code = build("<a class={*c}></a>");
    assert!(
        code.contains("{\"class\": __rt.coff(__context, __tracker => __tracker.a(c))}"),
        "{}",
        code
    );
}

#[test]
fn text_expression() {
    let code = build("<p>${n} items</p>");
    assert!(code.contains("[__rt.text, `${n} items`]"), "{}", code);
}

#[test]
fn reactive_text_expression_wraps_the_joined_value() {
    let code = build("<p>${*n} items</p>");
    assert!(
        code.contains("[__rt.text, __rt.coff(__context, __tracker => `${__tracker.a(n)} items`)]"),
        "{}",
        code
    );
}

#[test]
fn other_markers() {
    let code = build("<p>%{a}@{b}</p>");
    assert!(
        code.contains("[__rt.text, `${__rt.stringify(a)}${__rt.quote(b)}`]"),
        "{}",
        code
    );
    let code = build("<p>a#{html}b</p>");
    assert!(
        code.contains("__rt.chain(__context, [__rt.text, `a`], [__rt.html, html], [__rt.text, `b`]);"),
        "{}",
        code
    );
}

#[test]
fn escaped_marker_is_text() {
    let code = build("<p>\\${a}</p>");
    assert!(code.contains("[__rt.text, `\\${a}`]"), "{}", code);
}

#[test]
fn template_characters_are_escaped() {
    let code = build("<p>a`b</p>");
    assert!(code.contains("[__rt.text, `a\\`b`]"), "{}", code);
}

#[test]
fn entities_are_decoded() {
    let code = build("<p>a &amp; b</p>");
    assert!(code.contains("[__rt.text, `a & b`]"), "{}", code);
}

#[test]
fn legacy_dialect() {
    assert_eq!(
        build("<p #dialect=\"legacy\">a${b}</p>"),
        "__rt.element(__context, \"p\", {}, function(__context){\
         __rt.chain(__context, [__rt.text, \"\" + \"a\" + (b)]);}.bind(this))"
    );
}

#[test]
fn dialect_is_inherited() {
    let code = build("<div #dialect=legacy><p>x</p></div>");
    assert!(code.contains("\"p\", {}, function(__context){"), "{}", code);
    assert!(!code.contains("=>"), "{}", code);
}

#[test]
fn comments_become_chain_entries() {
    assert_eq!(
        build("<div><!-- note ${x} --></div>"),
        "__rt.element(__context, \"div\", {}, __context => {__rt.chain(__context, [__rt.comment, ` note ${x} `]);})"
    );
    assert_eq!(build("<!-- a -->"), "__rt.chain(__context, [__rt.comment, ` a `]);");
}

#[test]
fn script_content_is_text() {
    assert_eq!(
        build("<script>var x = ${a} < 2;</script>"),
        "__rt.element(__context, \"script\", {}, __context => {__rt.chain(__context, [__rt.text, `var x = ${a} < 2;`]);})"
    );
}

#[test]
fn script_reads_are_untracked() {
    let code = build("<script>f(${*a});</script>");
    assert!(code.contains("`f(${a.value});`"), "{}", code);
}

#[test]
fn scoped_script() {
    let code = build("<script #scoped>run(this)</script>");
    assert!(code.contains("{\"class\": \"script0\"}"), "{}", code);
    assert!(
        code.contains("`!function(){run(this)}.call(document.querySelector(\".script0\").parentNode)`"),
        "{}",
        code
    );
}

#[test]
fn explicit_mode() {
    let code = build("<pre #mode=\"css\">a { b: ${c}; }</pre>");
    assert!(code.contains("[__rt.text, `a { b: ${c}; }`]"), "{}", code);
}

#[test]
fn root_mode_option() {
    let options = CompileOptions {
        root_mode: "html".to_string(),
        ..CompileOptions::default()
    };
    let output = compile("Hi ${name}", 0, &options).expect("compile failed");
    assert_eq!(output.code, "__rt.chain(__context, [__rt.text, `Hi ${name}`]);");
}
