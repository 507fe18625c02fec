//! Throw/recover control flow: labelled failures substitute a recovery
//! expression, searched newest frame first.

use pegvm::{parse, ErrorKind, Expr, Grammar, Rule, Value};

#[test]
fn test_throw_runs_recovery_expression() {
    // S <- A / B
    // A <- "[" recover(X, {inner}, "]")
    // X <- %{inner}
    let grammar = Grammar::new(vec![
        Rule::new(
            "S",
            Expr::choice(vec![Expr::rule_ref("A"), Expr::rule_ref("B")]),
        ),
        Rule::new(
            "A",
            Expr::seq(vec![
                Expr::lit("["),
                Expr::recover(Expr::rule_ref("X"), Expr::lit("]"), &["inner"]),
            ]),
        ),
        Rule::new("X", Expr::throw("inner")),
        Rule::new("B", Expr::lit("nope")),
    ]);
    let value = parse("", b"[]", &grammar, []).unwrap();
    let list = value.as_list().unwrap();
    assert_eq!(list[0], Value::Bytes(b"[".to_vec()));
    // the recovery expression's value substitutes for the thrown region
    assert_eq!(list[1], Value::Bytes(b"]".to_vec()));
}

#[test]
fn test_throw_searches_frames_newest_first() {
    // inner frame registers a different label; the outer frame resolves x
    let grammar = Grammar::new(vec![Rule::new(
        "S",
        Expr::recover(
            Expr::recover(Expr::throw("x"), Expr::lit("i"), &["y"]),
            Expr::lit("o"),
            &["x"],
        ),
    )]);
    let value = parse("", b"o", &grammar, []).unwrap();
    assert_eq!(value, Value::Bytes(b"o".to_vec()));
}

#[test]
fn test_throw_prefers_innermost_matching_frame() {
    let grammar = Grammar::new(vec![Rule::new(
        "S",
        Expr::recover(
            Expr::recover(Expr::throw("x"), Expr::lit("i"), &["x"]),
            Expr::lit("o"),
            &["x"],
        ),
    )]);
    let value = parse("", b"i", &grammar, []).unwrap();
    assert_eq!(value, Value::Bytes(b"i".to_vec()));
}

#[test]
fn test_throw_falls_outward_when_recovery_fails() {
    // innermost recovery expression does not match the input; the next
    // frame out carrying the label is tried
    let grammar = Grammar::new(vec![Rule::new(
        "S",
        Expr::recover(
            Expr::recover(Expr::throw("x"), Expr::lit("i"), &["x"]),
            Expr::lit("o"),
            &["x"],
        ),
    )]);
    let value = parse("", b"o", &grammar, []).unwrap();
    assert_eq!(value, Value::Bytes(b"o".to_vec()));
}

#[test]
fn test_throw_without_frame_fails() {
    let grammar = Grammar::new(vec![Rule::new("S", Expr::throw("nobody"))]);
    let errs = parse("", b"x", &grammar, []).unwrap_err();
    assert!(matches!(
        errs.first().unwrap().kind(),
        ErrorKind::NoMatch(_)
    ));
}

#[test]
fn test_recovery_frame_removed_after_exit() {
    // the throw in B runs after A's recovery frame is popped; nothing
    // resolves it, so the second alternative fails
    let grammar = Grammar::new(vec![
        Rule::new(
            "S",
            Expr::choice(vec![
                Expr::seq(vec![
                    Expr::recover(Expr::lit("a"), Expr::lit("r"), &["x"]),
                    Expr::rule_ref("B"),
                ]),
                Expr::lit("ab"),
            ]),
        ),
        Rule::new("B", Expr::throw("x")),
    ]);
    // alternative 1: "a" matches, recovery frame popped, throw in B fails.
    // alternative 2 matches the whole input instead.
    let value = parse("", b"ab", &grammar, []).unwrap();
    assert_eq!(value, Value::Bytes(b"ab".to_vec()));
}

#[test]
fn test_multiple_labels_share_one_recovery() {
    let grammar = Grammar::new(vec![
        Rule::new(
            "S",
            Expr::recover(
                Expr::choice(vec![Expr::rule_ref("T1"), Expr::rule_ref("T2")]),
                Expr::lit("r"),
                &["first", "second"],
            ),
        ),
        Rule::new("T1", Expr::seq(vec![Expr::lit("1"), Expr::throw("first")])),
        Rule::new("T2", Expr::seq(vec![Expr::lit("2"), Expr::throw("second")])),
    ]);
    let value = parse("", b"2r", &grammar, []).unwrap();
    let list = value.as_list().unwrap();
    assert_eq!(list[1], Value::Bytes(b"r".to_vec()));
}
