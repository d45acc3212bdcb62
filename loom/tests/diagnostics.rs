use loom::{CompileError, CompileOptions, ErrorKind, compile};

fn errors(source: &str) -> Vec<CompileError> {
    match compile(source, 0, &CompileOptions::default()) {
        Ok(output) => panic!("expected errors, got {:?}", output.code),
        Err(errors) => errors,
    }
}

fn warnings(source: &str) -> Vec<CompileError> {
    compile(source, 0, &CompileOptions::default())
        .expect("compile failed")
        .warnings
}

#[test]
fn element_never_closed() {
    let errors = errors("<div>hi");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ErrorKind::MalformedConstruct);
    assert_eq!(errors[0].message, "`<div>` is never closed");
    assert_eq!(errors[0].span, 0..4);
}

#[test]
fn start_tag_never_closed() {
    let errors = errors("<div class=\"a\"");
    assert_eq!(errors[0].message, "start tag `<div` is never closed");
}

#[test]
fn mismatched_closing_tag() {
    let errors = errors("<a></b>");
    assert_eq!(errors[0].message, "`</b>` does not close `<a>`");
    assert_eq!(errors[0].span, 3..7);
    assert!(!errors[0].notes.is_empty());
}

#[test]
fn closing_tag_without_element() {
    let errors = errors("</x>");
    assert_eq!(errors[0].message, "`</x>` closes nothing");
}

#[test]
fn unknown_region_attribute() {
    let errors = errors("<div #foo></div>");
    assert_eq!(errors[0].kind, ErrorKind::Config);
    assert_eq!(errors[0].message, "unknown region attribute `#foo`");
    assert_eq!(errors[0].span, 5..9);
    assert!(errors[0].notes[0].contains("#logic"));
}

#[test]
fn invalid_region_attribute_value() {
    let errors = errors("<div #logic=maybe></div>");
    assert_eq!(errors[0].message, "invalid value for `#logic`: expected a boolean");
}

#[test]
fn unknown_mode() {
    let errors = errors("<div #mode=\"nope\"></div>");
    assert_eq!(errors[0].kind, ErrorKind::Config);
    assert_eq!(errors[0].message, "unknown mode `nope`");
    assert!(errors[0].notes[0].contains("html"));
    assert!(!errors[0].notes[0].contains("__comment"));
}

#[test]
fn unknown_root_mode() {
    let options = CompileOptions {
        root_mode: "nope".to_string(),
        ..CompileOptions::default()
    };
    let errors = compile("x", 0, &options).unwrap_err();
    assert_eq!(errors[0].kind, ErrorKind::Config);
}

#[test]
fn unterminated_expression() {
    let errors = errors("<p>${a</p>");
    assert_eq!(errors[0].kind, ErrorKind::MalformedConstruct);
}

#[test]
fn comment_never_closed() {
    let errors = errors("<div><!-- a</div>");
    assert_eq!(errors[0].message, "comment is never closed");
}

#[test]
fn unused_region_attribute_warns() {
    let warnings = warnings("<div #scope=\".x\"></div>");
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].is_warning());
    assert_eq!(warnings[0].message, "`#scope` has no effect in `html` regions");
}

#[test]
fn region_attribute_on_empty_element_warns() {
    let warnings = warnings("<br #scope=.x/>");
    assert_eq!(warnings[0].message, "`#scope` has no effect on an element without content");
}

#[test]
fn inherited_attributes_do_not_warn() {
    assert!(warnings("<style #logic>.a { color: red; }</style>").is_empty());
    assert!(warnings("<div #mode=\"html\"></div>").is_empty());
}

#[test]
fn errors_convert_to_diagnostics() {
    let errors = errors("<div>hi");
    let diagnostic = errors[0].to_diagnostic();
    assert_eq!(diagnostic.message, "`<div>` is never closed");
    assert_eq!(diagnostic.labels[0].range, 0..4);
    assert_eq!(diagnostic.notes, vec!["input ended inside this region".to_string()]);
}
