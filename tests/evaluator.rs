use echo::{
    coerce::{self, Strength},
    diagnostics::{Diagnostic, DiagnosticKind},
    evaluate,
    frame::FrameId,
    mode::{Field, ModeId, REF_SIZE},
    render::render_typed,
    tree::SourceListing,
    value::Value,
    Evaluation, Runtime,
};

const CAPACITY: usize = 64;

/// One frame binding `x = 5`, `y := 2.5`, `p := NIL`, a row `weights`,
/// a structure `tally` and a routine `f`.
fn fixture() -> (Runtime, FrameId) {
    let mut rt = Runtime::new(SourceListing::new("test", "x\ny\n"));
    let root = rt.tree.root();
    let node = rt.tree.add(root, 1, true, 0);
    let scope = rt.open_scope(None);

    let ref_int = rt.modes.ref_to(ModeId::INT);
    let row = rt.modes.row_of(1, ModeId::REAL);
    let count = rt.symbol("count");
    let sum = rt.symbol("sum");
    let tally = rt.modes.struct_of(vec![
        Field {
            name: count,
            mode: ModeId::INT,
        },
        Field {
            name: sum,
            mode: ModeId::REAL,
        },
    ]);
    let routine = rt.modes.proc_of(vec![ModeId::INT], ModeId::INT);

    rt.declare(scope, "x", ModeId::INT);
    rt.declare_variable(scope, "y", ModeId::REAL);
    rt.declare_variable(scope, "p", ref_int);
    rt.declare_variable(scope, "weights", row);
    rt.declare_variable(scope, "tally", tally);
    rt.declare(scope, "f", routine);
    rt.declare_variable(scope, "unset", ModeId::INT);

    let frame = rt.open_frame(scope, node).expect("open frame");
    rt.initialise(frame, "x", Value::Int(5)).expect("initialise x");
    rt.assign(frame, "y", Value::Real(2.5)).expect("assign y");
    rt.assign(frame, "p", Value::Ref(None)).expect("assign p");
    let weights = rt.new_row(
        row,
        &[(1, 3)],
        &[Value::Real(0.5), Value::Real(1.5), Value::Real(2.5)],
    )
    .expect("allocate weights");
    rt.assign(frame, "weights", weights).expect("assign weights");
    rt.assign(
        frame,
        "tally",
        Value::Struct(vec![Value::Int(3), Value::Real(4.5)]),
    )
    .expect("assign tally");
    let f = rt.routine("f");
    rt.initialise(frame, "f", f).expect("initialise f");
    (rt, frame)
}

/// `x = 5`, `n := 9`, `q := n`, `tally := (3)` and `r := tally`, for
/// dereferencing names of every depth.
fn names() -> (Runtime, FrameId) {
    let mut rt = Runtime::new(SourceListing::new("test", "n\n"));
    let root = rt.tree.root();
    let node = rt.tree.add(root, 1, true, 0);
    let scope = rt.open_scope(None);
    let count = rt.symbol("count");
    let tally = rt.modes.struct_of(vec![Field {
        name: count,
        mode: ModeId::INT,
    }]);
    let ref_int = rt.modes.ref_to(ModeId::INT);
    let ref_tally = rt.modes.ref_to(tally);

    rt.declare(scope, "x", ModeId::INT);
    rt.declare_variable(scope, "n", ModeId::INT);
    rt.declare_variable(scope, "q", ref_int);
    rt.declare_variable(scope, "tally", tally);
    rt.declare_variable(scope, "r", ref_tally);

    let frame = rt.open_frame(scope, node).expect("open frame");
    rt.initialise(frame, "x", Value::Int(5)).expect("initialise x");
    rt.assign(frame, "n", Value::Int(9)).expect("assign n");
    rt.assign(frame, "tally", Value::Struct(vec![Value::Int(3)]))
        .expect("assign tally");
    for text in ["q := n", "r := tally"] {
        evaluate(&mut rt, Some(frame), text, CAPACITY)
            .unwrap_or_else(|err| panic!("`{text}` should evaluate: {err}"));
    }
    (rt, frame)
}

/// Pushes the value bound to `name` in `frame` and returns its mode.
fn push_name(rt: &mut Runtime, frame: FrameId, name: &str) -> ModeId {
    let symbol = rt.symbol(name);
    let (address, mode) = rt.local(frame, symbol).expect("declared in frame");
    let bytes = rt
        .memory
        .read(address, rt.modes.size(mode))
        .expect("in range")
        .to_vec();
    rt.stack.push(&bytes).expect("room on the stack");
    mode
}

fn eval(text: &str) -> Evaluation {
    let (mut rt, frame) = fixture();
    evaluate(&mut rt, Some(frame), text, CAPACITY)
        .unwrap_or_else(|err| panic!("`{text}` should evaluate: {err}"))
}

fn eval_error(text: &str) -> Diagnostic {
    let (mut rt, frame) = fixture();
    match evaluate(&mut rt, Some(frame), text, CAPACITY) {
        Ok(evaluation) => panic!("expected error for `{text}`, got {evaluation:?}"),
        Err(err) => err,
    }
}

fn typed(text: &str) -> String {
    let (mut rt, frame) = fixture();
    let evaluation = evaluate(&mut rt, Some(frame), text, CAPACITY)
        .unwrap_or_else(|err| panic!("`{text}` should evaluate: {err}"));
    render_typed(&rt, evaluation.mode, &evaluation.value).expect("render")
}

fn expect_int(text: &str) -> i64 {
    match eval(text) {
        Evaluation {
            mode: ModeId::INT,
            value: Value::Int(n),
        } => n,
        other => panic!("expected INT from `{text}`, found {other:?}"),
    }
}

fn expect_real(text: &str) -> f64 {
    match eval(text) {
        Evaluation {
            mode: ModeId::REAL,
            value: Value::Real(x),
        } => x,
        other => panic!("expected REAL from `{text}`, found {other:?}"),
    }
}

fn expect_bool(text: &str) -> bool {
    match eval(text) {
        Evaluation {
            mode: ModeId::BOOL,
            value: Value::Bool(b),
        } => b,
        other => panic!("expected BOOL from `{text}`, found {other:?}"),
    }
}

#[test]
fn identifiers_print_with_their_mode() {
    assert_eq!(typed("x"), "(INT) 5");
    assert_eq!(typed("x + 1"), "(INT) 6");
    assert_eq!(typed("y"), "(REAL) 2.5");
}

#[test]
fn priorities_order_dyadic_formulas() {
    assert_eq!(expect_int("1 + 2 * 3"), 7);
    assert_eq!(expect_int("(1 + 2) * 3"), 9);
    assert_eq!(expect_int("2 ** 3 ** 2"), 64);
    assert_eq!(expect_int("10 - 4 - 3"), 3);
    assert_eq!(expect_int("-7 MOD 3"), 2);
    assert_eq!(expect_int("7 % 2"), 3);
    assert!(expect_bool("x > 3 AND y < 3.0"));
    assert!(expect_bool("1 + 1 = 2 OR FALSE"));
}

#[test]
fn monadic_operators_bind_tighter_than_dyadic_ones() {
    assert_eq!(expect_int("-x + 1"), -4);
    assert_eq!(expect_int("ABS -3"), 3);
    assert!(expect_bool("NOT ODD 4"));
    assert_eq!(expect_int("ROUND 2.6"), 3);
    assert_eq!(expect_int("ENTIER -0.5"), -1);
}

#[test]
fn mixed_operands_widen_to_real() {
    assert_eq!(expect_real("x + 0.5"), 5.5);
    assert_eq!(expect_real("x / 2"), 2.5);
    assert_eq!(expect_real("y * x"), 12.5);
}

#[test]
fn casts_are_strong_contexts() {
    assert_eq!(typed("REAL (x)"), "(REAL) 5.0");
    assert_eq!(typed("LONG INT (x)"), "(LONG INT) 5");
    let err = eval_error("INT (y)");
    assert_eq!(err.kind, DiagnosticKind::Semantic);
    assert!(err.message.contains("cannot coerce"), "{err}");
}

#[test]
fn assignment_yields_the_destination() {
    let (mut rt, frame) = fixture();
    let assigned = evaluate(&mut rt, Some(frame), "y := x", CAPACITY).expect("assign");
    assert_eq!(assigned.value, Value::Real(5.0));
    let read = evaluate(&mut rt, Some(frame), "y", CAPACITY).expect("read back");
    assert_eq!(read.value, Value::Real(5.0));
}

#[test]
fn assigning_operators_update_in_place() {
    let (mut rt, frame) = fixture();
    evaluate(&mut rt, Some(frame), "y +:= 1.5", CAPACITY).expect("update y");
    evaluate(&mut rt, Some(frame), "count OF tally +:= x", CAPACITY).expect("update count");
    let y = evaluate(&mut rt, Some(frame), "y", CAPACITY).expect("read y");
    let count = evaluate(&mut rt, Some(frame), "count OF tally", CAPACITY).expect("read count");
    assert_eq!(y.value, Value::Real(4.0));
    assert_eq!(count.value, Value::Int(8));
}

#[test]
fn assignment_to_a_value_is_refused() {
    let err = eval_error("x := 3");
    assert_eq!(err.kind, DiagnosticKind::Semantic);
    assert!(err.message.contains("must be a name"), "{err}");
}

#[test]
fn selection_and_slicing() {
    assert_eq!(expect_int("count OF tally"), 3);
    assert_eq!(expect_real("sum OF tally"), 4.5);
    assert_eq!(expect_real("weights[2]"), 1.5);
    assert_eq!(expect_int("UPB weights"), 3);
    assert_eq!(typed("weights"), "([] REAL) [1:3] (0.5, 1.5, 2.5)");
    assert_eq!(typed("tally"), "(STRUCT (INT count, REAL sum)) (count = 3, sum = 4.5)");
}

#[test]
fn slicing_out_of_bounds_is_an_access_error() {
    let err = eval_error("weights[4]");
    assert_eq!(err.kind, DiagnosticKind::RuntimeAccess);
    assert!(err.message.contains("out of bounds"), "{err}");
}

#[test]
fn unknown_fields_are_semantic_errors() {
    let err = eval_error("total OF tally");
    assert_eq!(err.kind, DiagnosticKind::Semantic);
}

#[test]
fn denotations() {
    assert_eq!(typed("\"a\""), "(CHAR) \"a\"");
    assert_eq!(typed("\"ab\" + \"c\""), "(STRING) \"abc\"");
    assert_eq!(typed("16rff"), "(BITS) 16rff");
    assert_eq!(typed("2r101 OR 16r10"), "(BITS) 16r15");
    assert_eq!(typed("TRUE"), "(BOOL) TRUE");
    assert_eq!(typed("1.5e1"), "(REAL) 15.0");
    assert!(expect_bool("\"abc\" < \"abd\""));
}

#[test]
fn standard_environment_procedures() {
    assert_eq!(expect_real("sqrt(16.0)"), 4.0);
    assert_eq!(expect_real("sqrt(16)"), 4.0);
    assert_eq!(expect_int("max int"), i64::MAX);
    assert!(expect_real("pi") > 3.14);
    let err = eval_error("sqrt(1.0, 2.0)");
    assert_eq!(err.kind, DiagnosticKind::Semantic);
    let err = eval_error("sqrt(-1.0)");
    assert_eq!(err.kind, DiagnosticKind::RuntimeAccess);
}

#[test]
fn routines_of_the_program_cannot_be_called() {
    let err = eval_error("f(1)");
    assert_eq!(err.kind, DiagnosticKind::Semantic);
    assert!(err.message.contains("cannot call routine `f`"), "{err}");
    assert_eq!(typed("f"), "(PROC (INT) INT) routine `f`");
}

#[test]
fn identity_relations() {
    assert!(expect_bool("p IS NIL"));
    assert!(!expect_bool("p ISNT NIL"));
    assert!(expect_bool("y :=: y"));
    assert!(expect_bool("y :/=: REF REAL (NIL)"));
}

#[test]
fn dereferencing_nil_is_an_access_error() {
    let (mut rt, frame) = fixture();
    let before = rt.stack.pointer();
    let err = evaluate(&mut rt, Some(frame), "p", CAPACITY).expect_err("NIL dereference");
    assert_eq!(err.kind, DiagnosticKind::RuntimeAccess);
    assert!(err.message.contains("NIL"), "{err}");
    assert_eq!(rt.stack.pointer(), before);
}

#[test]
fn uninitialised_operands_are_reported() {
    let err = eval_error("unset + 1");
    assert_eq!(err.kind, DiagnosticKind::RuntimeAccess);
    assert_eq!(typed("unset"), "(INT) uninitialised");
}

#[test]
fn malformed_input_is_diagnosed() {
    assert_eq!(eval_error("1 +").kind, DiagnosticKind::Syntax);
    assert_eq!(eval_error("(1 + 2").kind, DiagnosticKind::Syntax);
    assert_eq!(eval_error("1 2").kind, DiagnosticKind::Syntax);
    assert_eq!(eval_error("1 $ 2").kind, DiagnosticKind::Lexical);
    assert_eq!(eval_error("\"open").kind, DiagnosticKind::Lexical);
    assert_eq!(eval_error("nowhere").kind, DiagnosticKind::Semantic);
    assert_eq!(eval_error("TRUE + 1").kind, DiagnosticKind::Semantic);
    assert_eq!(eval_error("1 % 0").kind, DiagnosticKind::RuntimeAccess);
}

#[test]
fn errors_carry_the_offending_span() {
    let err = eval_error("x + nowhere");
    let rendered = err.render_with_source("x + nowhere");
    assert!(rendered.contains("    ^^^^^^^"), "{rendered}");
}

#[test]
fn deep_nesting_exhausts_the_type_stack() {
    let (mut rt, frame) = fixture();
    let err = evaluate(&mut rt, Some(frame), "((((((1))))))", 4).expect_err("too deep");
    assert_eq!(err.kind, DiagnosticKind::Resource);
}

#[test]
fn evaluation_inhibits_collection_only_while_running() {
    let (mut rt, frame) = fixture();
    evaluate(&mut rt, Some(frame), "\"long string\" + \"s\"", CAPACITY).expect("strings");
    assert!(rt.memory.may_collect());
}

#[test]
fn inner_frames_shadow_outer_ones() {
    let (mut rt, outer) = fixture();
    let root = rt.tree.root();
    let node = rt.tree.add(root, 2, true, 1);
    let scope = rt.open_scope(None);
    rt.declare(scope, "x", ModeId::INT);
    let inner = rt.call_frame(scope, node, "g").expect("call frame");
    rt.initialise(inner, "x", Value::Int(42)).expect("initialise inner x");

    let shadowed = evaluate(&mut rt, Some(inner), "x", CAPACITY).expect("inner x");
    assert_eq!(shadowed.value, Value::Int(42));
    let reached = evaluate(&mut rt, Some(inner), "y", CAPACITY).expect("outer y");
    assert_eq!(reached.value, Value::Real(2.5));
    let outer_x = evaluate(&mut rt, Some(outer), "x", CAPACITY).expect("outer x");
    assert_eq!(outer_x.value, Value::Int(5));
}

#[test]
fn standard_environment_is_reachable_without_frames() {
    let mut rt = Runtime::new(SourceListing::default());
    let evaluation = evaluate(&mut rt, None, "ABS -2 + small real * 0", CAPACITY).expect("no frames");
    assert_eq!(evaluation.value, Value::Real(2.0));
}

#[test]
fn unions_and_strings_render_with_their_modes() {
    let mut rt = Runtime::new(SourceListing::new("test", "u\n"));
    let root = rt.tree.root();
    let node = rt.tree.add(root, 1, true, 0);
    let scope = rt.open_scope(None);
    let union = rt.modes.union_of(vec![ModeId::INT, ModeId::REAL]);
    assert!(rt.modes.is_union(union));
    assert_eq!(rt.modes.union_members(union), [ModeId::INT, ModeId::REAL]);
    rt.declare(scope, "u", union);
    rt.declare_variable(scope, "name", ModeId::STRING);

    let frame = rt.open_frame(scope, node).expect("open frame");
    let member = Value::Union {
        mode: ModeId::INT,
        value: Box::new(Value::Int(3)),
    };
    rt.initialise(frame, "u", member).expect("initialise u");
    let text = rt.new_string("echo").expect("allocate name");
    rt.assign(frame, "name", text).expect("assign name");

    let show = |rt: &mut Runtime, text: &str| {
        let evaluation = evaluate(rt, Some(frame), text, CAPACITY)
            .unwrap_or_else(|err| panic!("`{text}` should evaluate: {err}"));
        render_typed(rt, evaluation.mode, &evaluation.value).expect("render")
    };
    assert_eq!(show(&mut rt, "u"), "(UNION (INT, REAL)) (INT) 3");
    assert_eq!(show(&mut rt, "name + \"!\""), "(STRING) \"echo!\"");
}

#[test]
fn shifts_saturate_instead_of_overflowing() {
    assert_eq!(typed("16r1 SHL 3"), "(BITS) 16r8");
    assert_eq!(typed("16r8 SHR 3"), "(BITS) 16r1");
    assert_eq!(typed("16r1 SHR (-maxint - 1)"), "(BITS) 16r0");
    assert_eq!(typed("16r1 SHL 64"), "(BITS) 16r0");
}

#[test]
fn integer_division_separates_overflow_from_zero_divisors() {
    let err = eval_error("(-maxint - 1) % -1");
    assert_eq!(err.kind, DiagnosticKind::RuntimeAccess);
    assert_eq!(err.message, "integer overflow");
    let err = eval_error("7 MOD 0");
    assert_eq!(err.message, "division by zero");
    assert_eq!(expect_int("-7 % 2"), -3);
}

#[test]
fn rounding_refuses_reals_beyond_max_int() {
    let err = eval_error("ROUND 9223372036854775808.0");
    assert_eq!(err.kind, DiagnosticKind::RuntimeAccess);
    assert_eq!(expect_int("ENTIER 9.2e18"), 9_200_000_000_000_000_000);
}

#[test]
fn long_selection_chains_exhaust_the_type_stack() {
    let text = format!("{}tally", "count OF ".repeat(20_000));
    let err = eval_error(&text);
    assert_eq!(err.kind, DiagnosticKind::Resource);
}

#[test]
fn dereferencing_leaves_plain_values_alone() {
    for strength in [Strength::Weak, Strength::Strong] {
        let (mut rt, frame) = names();
        let mode = push_name(&mut rt, frame, "x");
        let before = rt.stack.contents().to_vec();
        assert_eq!(coerce::deref(&mut rt, mode, strength), Ok(ModeId::INT));
        assert_eq!(rt.stack.contents(), before);
    }
}

#[test]
fn dereferencing_strips_every_name_of_a_plain_value() {
    for strength in [Strength::Weak, Strength::Strong] {
        let (mut rt, frame) = names();
        let mode = push_name(&mut rt, frame, "q");
        assert_eq!(rt.describe(mode), "REF REF INT");
        assert_eq!(coerce::deref(&mut rt, mode, strength), Ok(ModeId::INT));
        assert_eq!(rt.stack.contents(), Value::Int(9).encode(&rt.modes, ModeId::INT));
    }
}

#[test]
fn weak_dereferencing_stops_at_a_name_of_a_structure() {
    let (mut rt, frame) = names();
    let mode = push_name(&mut rt, frame, "tally");
    let before = rt.stack.contents().to_vec();
    assert_eq!(coerce::deref(&mut rt, mode, Strength::Weak), Ok(mode));
    assert_eq!(rt.stack.contents(), before);

    let (mut rt, frame) = names();
    let mode = push_name(&mut rt, frame, "r");
    assert_eq!(rt.describe(mode), "REF REF STRUCT (INT count)");
    let weak = coerce::deref(&mut rt, mode, Strength::Weak).expect("weak");
    assert_eq!(rt.describe(weak), "REF STRUCT (INT count)");
    assert_eq!(rt.stack.pointer(), REF_SIZE);

    let strong = coerce::deref(&mut rt, weak, Strength::Strong).expect("strong");
    assert_eq!(rt.describe(strong), "STRUCT (INT count)");
    let bytes = rt.stack.contents().to_vec();
    assert_eq!(
        Value::decode(&rt.modes, strong, &bytes),
        Value::Struct(vec![Value::Int(3)])
    );
}
