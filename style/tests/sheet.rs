use loom_style::{Calc, CalcOp, Format, Quantity, Sheet, UnitError};

fn px(value: f64) -> Calc {
    Calc::Literal(Quantity {
        value,
        unit: Some("px"),
    })
}

fn binary(op: CalcOp, left: Calc, right: Calc) -> Calc {
    Calc::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

#[test]
fn substitution_marker_replaces_parent() {
    let mut sheet = Sheet::new();
    let top = sheet.scope(None);
    let a = sheet.select(&top, ".a");
    let hover = sheet.select(&a, "&:hover");
    sheet.value(&hover, "color", "red");
    assert_eq!(sheet.to_css(Format::Compact), ".a:hover{color:red;}");
    assert_eq!(sheet.to_css(Format::Indented), ".a:hover {\n  color: red;\n}\n");
}

#[test]
fn nested_selector_uses_descendant_combinator() {
    let mut sheet = Sheet::new();
    let top = sheet.scope(None);
    let a = sheet.select(&top, ".a");
    sheet.value(&a, "margin", "0");
    let b = sheet.select(&a, ".b");
    sheet.value(&b, "color", "red");
    assert_eq!(sheet.to_css(Format::Compact), ".a{margin:0;}.a .b{color:red;}");
}

#[test]
fn selector_lists_multiply() {
    let mut sheet = Sheet::new();
    let top = sheet.scope(None);
    let parents = sheet.select(&top, ".a, .b");
    let child = sheet.select(&parents, "span");
    sheet.value(&child, "color", "blue");
    assert_eq!(sheet.to_css(Format::Compact), ".a span, .b span{color:blue;}");
}

#[test]
fn media_query_wraps_current_selectors() {
    let mut sheet = Sheet::new();
    let top = sheet.scope(Some(".root"));
    let media = sheet.select(&top, "@media (max-width: 10px)");
    sheet.value(&media, "display", "none");
    assert_eq!(
        sheet.to_css(Format::Compact),
        "@media (max-width: 10px){.root{display:none;}}"
    );
}

#[test]
fn keyframes_selectors_are_absolute() {
    let mut sheet = Sheet::new();
    let top = sheet.scope(Some(".root"));
    let frames = sheet.select(&top, "@keyframes spin");
    let from = sheet.select(&frames, "from");
    sheet.value(&from, "opacity", "0");
    let css = sheet.to_css(Format::Compact);
    assert!(css.contains("from{opacity:0;}"), "{}", css);
    assert!(!css.contains(".root from"), "{}", css);
}

#[test]
fn statements_and_multi_key_values() {
    let mut sheet = Sheet::new();
    let top = sheet.scope(None);
    sheet.stat("@import url(a.css)");
    let a = sheet.select(&top, ".a");
    sheet.value(&a, "color", "red");
    sheet.value(&a, "top, left", "0");
    assert_eq!(
        sheet.to_css(Format::Compact),
        "@import url(a.css);.a{color:red;top:0;left:0;}"
    );
}

#[test]
fn empty_rules_are_omitted() {
    let mut sheet = Sheet::new();
    let top = sheet.scope(None);
    sheet.select(&top, ".empty");
    assert_eq!(sheet.to_css(Format::Compact), "");
}

#[test]
fn quantity_parsing() {
    assert_eq!(Quantity::parse("10px"), Some(Quantity { value: 10.0, unit: Some("px") }));
    assert_eq!(Quantity::parse("1.5rem").and_then(|q| q.unit), Some("rem"));
    assert_eq!(Quantity::parse("2vmin").and_then(|q| q.unit), Some("vmin"));
    assert_eq!(Quantity::parse("-3").map(|q| q.value), Some(-3.0));
    assert_eq!(Quantity::parse("red"), None);
    assert_eq!(Quantity::parse("10ms"), None);
}

#[test]
fn matching_units_evaluate() {
    let calc = binary(CalcOp::Add, px(10.0), px(5.0));
    assert_eq!(calc.evaluate().unwrap().unwrap().to_string(), "15px");

    let scaled = binary(CalcOp::Mul, Calc::Literal(Quantity::number(2.0)), px(0.5));
    assert_eq!(scaled.evaluate().unwrap().unwrap().to_string(), "1px");
}

#[test]
fn mismatched_units_are_rejected() {
    let em = Calc::Literal(Quantity {
        value: 5.0,
        unit: Some("em"),
    });
    let calc = binary(CalcOp::Add, px(10.0), em);
    assert_eq!(
        calc.check_units(),
        Err(UnitError {
            expected: "px",
            found: "em"
        })
    );
    assert!(calc.evaluate().is_err());
}

#[test]
fn dynamic_operands_render_through_unwrap() {
    let calc = binary(CalcOp::Add, Calc::Dynamic("w".into()), px(10.0));
    assert!(calc.has_dynamic());
    assert_eq!(calc.evaluate(), Ok(None));
    assert_eq!(calc.render("v"), "v(w) + v(\"10px\")");
}

#[test]
fn results_are_rounded() {
    let third = binary(
        CalcOp::Div,
        px(1.0),
        Calc::Literal(Quantity::number(3.0)),
    );
    assert_eq!(third.evaluate().unwrap().unwrap().to_string(), "0.3333px");
}

#[test]
fn division_by_zero_does_not_fold() {
    let calc = binary(CalcOp::Div, px(10.0), Calc::Literal(Quantity::number(0.0)));
    assert_eq!(calc.check_units(), Ok(()));
    assert_eq!(calc.evaluate(), Ok(None));
    let rem = binary(CalcOp::Rem, px(10.0), Calc::Literal(Quantity::number(0.0)));
    assert_eq!(rem.evaluate(), Ok(None));
}
