use loom::emitter::Emitter;
use loom::scanner::{ScanOptions, Scanner};
use loom::{CompileOptions, ErrorKind};

#[test]
fn find_skips_strings_and_comments() {
    let mut scanner = Scanner::new("a = \"}\" /* } */ + '}' }tail", 0);
    let found = scanner.find(&['}'], false, true).expect("find failed");
    assert_eq!(found.pre, "a = \"}\" /* } */ + '}' ");
    assert_eq!(found.matched, Some('}'));
    assert_eq!(scanner.rest(), "tail");
}

#[test]
fn find_in_text_sees_everything() {
    let mut scanner = Scanner::new("say \"<b>\"", 0);
    scanner.options = ScanOptions::TEXT;
    let found = scanner.find(&['<'], false, false).expect("find failed");
    assert_eq!(found.pre, "say \"");
    assert_eq!(scanner.peek(), Some('<'));
}

#[test]
fn find_without_match_reads_to_end() {
    let mut scanner = Scanner::new("abc", 0);
    let found = scanner.find(&['<'], false, true).expect("find failed");
    assert_eq!(found.pre, "abc");
    assert_eq!(found.matched, None);
    assert!(scanner.eof());
}

#[test]
fn fragment_offsets_are_absolute() {
    let mut scanner = Scanner::fragment("xy", 10, 0);
    scanner.read();
    assert_eq!(scanner.position(), 11);
}

#[test]
fn enclosed_content_is_balanced() {
    let mut scanner = Scanner::new("(a, [b], \")\") rest", 0);
    let group = scanner.skip_enclosed_content().expect("skip failed");
    assert_eq!(group, "(a, [b], \")\")");
    assert_eq!(scanner.rest(), " rest");
}

#[test]
fn unterminated_string_is_an_error() {
    let mut scanner = Scanner::new("\"abc", 0);
    let err = scanner.skip_string().unwrap_err();
    assert_eq!(err.kind, ErrorKind::MalformedConstruct);
    assert_eq!(err.message, "unterminated string literal");
    assert_eq!(err.span, 0..1);
}

#[test]
fn unterminated_block_comment_is_an_error() {
    let mut scanner = Scanner::new("a /* b", 0);
    let err = scanner.find(&[';'], false, true).unwrap_err();
    assert_eq!(err.message, "unterminated block comment");
    assert_eq!(err.span, 2..4);
}

#[test]
fn single_expression_follows_member_chains() {
    let mut scanner = Scanner::new("a.b?.c[0](x) + 1", 0);
    let operand = scanner.read_single_expression(true).expect("read failed");
    assert_eq!(operand, "a.b?.c[0](x)");
    assert_eq!(scanner.rest(), " + 1");
}

#[test]
fn identifiers() {
    let mut scanner = Scanner::new("$item_1-rest", 0);
    assert_eq!(scanner.read_identifier().as_deref(), Some("$item_1"));
    assert_eq!(scanner.read_identifier(), None);
}

#[test]
fn slots_are_patched_in_place() {
    let mut emitter = Emitter::new(&CompileOptions::default());
    emitter.add("a(");
    let slot = emitter.add_slot("x");
    emitter.add(");");
    emitter.set(slot, "y");
    emitter.append(slot, "z");
    emitter.prepend(slot, "w");
    assert_eq!(emitter.finish(), "a(wyz);");
}

#[test]
fn ended_regions_freeze_their_slots() {
    let mut emitter = Emitter::new(&CompileOptions::default());
    let mark = emitter.mark();
    let slot = emitter.add_slot("old");
    emitter.end_region(mark, 0).expect("region failed");
    emitter.set(slot, "new");
    assert_eq!(emitter.finish(), "old");
}

#[test]
fn pending_slots_must_be_filled() {
    let mut emitter = Emitter::new(&CompileOptions::default());
    let mark = emitter.mark();
    emitter.add_pending_slot(3..5, "`if` block is never closed");
    let errors = emitter.end_region(mark, 0).unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "`if` block is never closed");
    assert_eq!(errors[0].span, 3..5);
}

#[test]
fn replace_since_drops_later_output() {
    let mut emitter = Emitter::new(&CompileOptions::default());
    emitter.add("keep;");
    let mark = emitter.mark();
    emitter.add_slot("gone");
    emitter.add("gone");
    emitter.replace_since(mark, "folded");
    assert_eq!(emitter.finish(), "keep;folded");
}

#[test]
fn context_follows_function_scopes() {
    let mut emitter = Emitter::new(&CompileOptions::default());
    assert_eq!(emitter.context(), "__context");
    emitter.start_function("item");
    emitter.start_scope();
    assert_eq!(emitter.context(), "__context");
    emitter.end_scope();
    emitter.end_scope();
    emitter.start_function("__context, i");
    assert_eq!(emitter.context(), "__context");
    assert_eq!(emitter.next_var_name(), "__s0");
    assert_eq!(emitter.next_var_name(), "__s1");
}

#[test]
fn text_before_a_mark_survives_replacement() {
    let mut emitter = Emitter::new(&CompileOptions::default());
    emitter.add("head(");
    let mark = emitter.mark();
    emitter.add("prefix(");
    emitter.add_slot("");
    emitter.replace_since(mark, "body;");
    assert_eq!(emitter.finish(), "head(body;");
}

#[test]
fn nested_regions_report_a_pending_slot_once() {
    let mut emitter = Emitter::new(&CompileOptions::default());
    let outer = emitter.mark();
    emitter.add("a");
    let inner = emitter.mark();
    emitter.add_pending_slot(0..1, "never closed");
    assert_eq!(emitter.end_region(inner, 0).unwrap_err().len(), 1);
    assert!(emitter.end_region(outer, 0).is_ok());
}
