use echo::{
    breakpoints::{BreakpointManager, ClearScope},
    diagnostics::DiagnosticKind,
    frame::FrameId,
    mode::ModeId,
    tree::{Mask, NodeId, SourceListing},
    value::Value,
    Runtime,
};

const CAPACITY: usize = 64;

struct Program {
    rt: Runtime,
    frame: FrameId,
    at_twelve: [NodeId; 2],
    at_five: NodeId,
    nested: NodeId,
}

/// Two interruptible units on line 12, one on line 5, a procedure body on
/// line 9 and nothing interruptible on line 7.
fn program(x: i64) -> Program {
    let text: String = (1..=14).map(|n| format!("line {n}\n")).collect();
    let mut rt = Runtime::new(SourceListing::new("test", &text));
    let root = rt.tree.root();
    let block = rt.tree.add(root, 1, false, 0);
    let at_five = rt.tree.add(block, 5, true, 0);
    rt.tree.add(block, 7, false, 0);
    let nested = rt.tree.add(block, 9, true, 1);
    let first = rt.tree.add(block, 12, true, 0);
    let second = rt.tree.add(first, 12, true, 0);

    let scope = rt.open_scope(None);
    rt.declare_variable(scope, "x", ModeId::INT);
    let frame = rt.open_frame(scope, block).expect("open frame");
    rt.assign(frame, "x", Value::Int(x)).expect("assign x");
    Program {
        rt,
        frame,
        at_twelve: [first, second],
        at_five,
        nested,
    }
}

#[test]
fn setting_a_breakpoint_marks_every_unit_on_the_line() {
    let mut p = program(0);
    let mut manager = BreakpointManager::new();
    let marked = manager.set(&mut p.rt.tree, 12, None).expect("set");
    assert_eq!(marked, 2);
    for node in p.at_twelve {
        assert!(p.rt.tree.mask(node).contains(Mask::BREAKPOINT));
    }
    assert!(p.rt.tree.mask(p.at_five).is_empty());
}

#[test]
fn lines_without_interruptible_units_are_refused() {
    let mut p = program(0);
    let mut manager = BreakpointManager::new();
    for line in [7, 99] {
        let err = manager.set(&mut p.rt.tree, line, None).expect_err("no unit");
        assert_eq!(err.kind, DiagnosticKind::Semantic);
    }
    assert!(manager.entries(&p.rt.tree).is_empty());
}

#[test]
fn setting_again_replaces_the_guard() {
    let mut p = program(0);
    let mut manager = BreakpointManager::new();
    manager
        .set(&mut p.rt.tree, 12, Some("x > 1".into()))
        .expect("first");
    manager
        .set(&mut p.rt.tree, 12, Some("x > 3".into()))
        .expect("second");
    let entries = manager.entries(&p.rt.tree);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].0, 12);
    assert_eq!(entries[0].2.as_deref(), Some("x > 3"));
    for node in p.at_twelve {
        assert_eq!(p.rt.tree.guard(node), Some("x > 3"));
    }
}

#[test]
fn clearing_a_line_frees_its_guard() {
    let mut p = program(0);
    let mut manager = BreakpointManager::new();
    manager
        .set(&mut p.rt.tree, 12, Some("x > 3".into()))
        .expect("set");
    manager.set(&mut p.rt.tree, 5, None).expect("set");
    manager.clear_line(&mut p.rt.tree, 12).expect("clear");
    for node in p.at_twelve {
        assert!(p.rt.tree.mask(node).is_empty());
        assert_eq!(p.rt.tree.guard(node), None);
    }
    assert!(p.rt.tree.mask(p.at_five).contains(Mask::BREAKPOINT));
}

#[test]
fn guards_decide_whether_to_stop() {
    let mut manager = BreakpointManager::new();

    let mut low = program(2);
    manager
        .set(&mut low.rt.tree, 12, Some("x > 3".into()))
        .expect("set");
    let node = low.at_twelve[0];
    let stop = manager.evaluate_guard(&mut low.rt, Some(low.frame), node, CAPACITY);
    assert_eq!(stop, Ok(false));

    let mut high = program(4);
    manager
        .set(&mut high.rt.tree, 12, Some("x > 3".into()))
        .expect("set");
    let node = high.at_twelve[0];
    let stop = manager.evaluate_guard(&mut high.rt, Some(high.frame), node, CAPACITY);
    assert_eq!(stop, Ok(true));
}

#[test]
fn unguarded_breakpoints_always_stop() {
    let mut p = program(0);
    let mut manager = BreakpointManager::new();
    manager.set(&mut p.rt.tree, 5, None).expect("set");
    let stop = manager.evaluate_guard(&mut p.rt, Some(p.frame), p.at_five, CAPACITY);
    assert_eq!(stop, Ok(true));
}

#[test]
fn broken_guards_are_deleted() {
    for guard in ["y > 3", "x + 1", "x >"] {
        let mut p = program(0);
        let mut manager = BreakpointManager::new();
        manager
            .set(&mut p.rt.tree, 12, Some(guard.into()))
            .expect("set");
        let node = p.at_twelve[1];
        let err = manager
            .evaluate_guard(&mut p.rt, Some(p.frame), node, CAPACITY)
            .expect_err("guard fails");
        assert_eq!(err.kind, DiagnosticKind::Guard);
        assert_eq!(err.notes.len(), 1, "{err}");
        for node in p.at_twelve {
            assert_eq!(p.rt.tree.guard(node), None);
            assert!(p.rt.tree.mask(node).contains(Mask::BREAKPOINT));
        }
    }
}

#[test]
fn a_new_watch_replaces_the_old_one() {
    let mut p = program(5);
    let mut manager = BreakpointManager::new();
    assert_eq!(manager.set_watch(&p.rt.tree, "x > 3".into()), None);
    assert_eq!(
        manager.set_watch(&p.rt.tree, "x > 9".into()),
        Some("x > 3".to_string())
    );
    assert_eq!(manager.watch(), Some("x > 9"));
    assert!(p.rt.tree.mask(p.at_five).contains(Mask::WATCH));
    let fired = manager.evaluate_watch(&mut p.rt, Some(p.frame), CAPACITY);
    assert_eq!(fired, Ok(false));
}

#[test]
fn a_broken_watch_is_removed() {
    let mut p = program(5);
    let mut manager = BreakpointManager::new();
    manager.set_watch(&p.rt.tree, "missing".into());
    let err = manager
        .evaluate_watch(&mut p.rt, Some(p.frame), CAPACITY)
        .expect_err("watch fails");
    assert_eq!(err.kind, DiagnosticKind::Guard);
    assert_eq!(manager.watch(), None);
    assert!(!p.rt.tree.mask(p.at_five).contains(Mask::WATCH));
}

#[test]
fn clear_scopes() {
    let mut p = program(0);
    let mut manager = BreakpointManager::new();
    manager.set(&mut p.rt.tree, 5, None).expect("set");
    manager.set_watch(&p.rt.tree, "x = 1".into());

    manager.clear(&mut p.rt.tree, ClearScope::Watch);
    assert_eq!(manager.watch(), None);
    assert!(p.rt.tree.mask(p.at_five).contains(Mask::BREAKPOINT));

    manager.set_watch(&p.rt.tree, "x = 1".into());
    manager.clear(&mut p.rt.tree, ClearScope::Breakpoints);
    assert!(manager.entries(&p.rt.tree).is_empty());
    assert_eq!(manager.watch(), Some("x = 1"));

    manager.clear(&mut p.rt.tree, ClearScope::All);
    assert_eq!(manager.watch(), None);
    assert!(p.rt.tree.mask(p.at_five).is_empty());
}

#[test]
fn stepping_temporaries_respect_the_depth() {
    let p = program(0);
    let mut manager = BreakpointManager::new();
    manager.set_temporary_everywhere(&p.rt.tree, Some(0));
    assert!(p.rt.tree.mask(p.nested).contains(Mask::TEMPORARY));
    assert!(!manager.accept_temporary(&p.rt.tree, 1));
    assert!(p.rt.tree.mask(p.nested).contains(Mask::TEMPORARY));
    assert!(manager.accept_temporary(&p.rt.tree, 0));
    assert!(!p.rt.tree.mask(p.nested).contains(Mask::TEMPORARY));
    assert!(!p.rt.tree.mask(p.at_five).contains(Mask::TEMPORARY));
}

#[test]
fn temporary_breakpoints_clear_themselves_when_they_fire() {
    let p = program(0);
    let mut manager = BreakpointManager::new();
    manager.set_temporary(&p.rt.tree, 12).expect("until");
    assert_eq!(
        manager.entries(&p.rt.tree),
        vec![(12, Mask::TEMPORARY, None)]
    );
    assert!(manager.accept_temporary(&p.rt.tree, 3));
    assert!(manager.entries(&p.rt.tree).is_empty());
}

#[test]
fn pending_stops_prefer_interrupts() {
    let mut p = program(0);
    let mut manager = BreakpointManager::new();
    manager.set(&mut p.rt.tree, 5, None).expect("set");
    manager.set_trace(&p.rt.tree, true);
    assert_eq!(
        p.rt.pending_stop(p.at_five),
        Some(echo::StopReason::Breakpoint)
    );
    echo::session::request_interrupt(&p.rt.tree);
    assert_eq!(
        p.rt.pending_stop(p.at_five),
        Some(echo::StopReason::Interrupt)
    );
    echo::clear_interrupts(&p.rt.tree);
    manager.clear(&mut p.rt.tree, ClearScope::All);
    assert_eq!(p.rt.pending_stop(p.at_five), Some(echo::StopReason::Trace));
    manager.set_trace(&p.rt.tree, false);
    assert_eq!(p.rt.pending_stop(p.at_five), None);
}
