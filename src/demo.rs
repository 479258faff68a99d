//! A small program image and a host that runs it unit by unit, entering the
//! monitor whenever a unit's breakpoint bits ask for it.

use tracing::{debug, warn};

use crate::{
    diagnostics::{Diagnostic, MonitorError, Result},
    evaluator::{evaluate, Evaluation},
    frame::FrameId,
    mode::{Field, ModeId},
    render::render,
    repl::Console,
    runtime::Runtime,
    scope::ScopeId,
    session::{Monitor, SessionResult, StopReason, ABORT_STATUS},
    tree::{NodeId, SourceListing},
    value::Value,
};

pub const WEIGHTS: [f64; 4] = [0.5, 1.5, 2.5, 3.5];

fn source_text(iterations: i64) -> String {
    format!(
        "BEGIN
   INT x := 0;
   PROC fact = (INT n) INT:
      IF n <= 1 THEN 1 ELSE n * fact (n - 1) FI;
   [1:4] REAL weights := (0.5, 1.5, 2.5, 3.5);
   STRUCT (INT count, REAL sum) tally := (0, 0.0);
   FOR i TO {iterations} DO
      x := fact (i);
      count OF tally +:= 1;
      sum OF tally +:= weights[1 + (i - 1) MOD 4] * x
   OD;
   print ((x, sum OF tally))
END
"
    )
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Aborted(i32),
}

struct Layout {
    main: ScopeId,
    body: ScopeId,
    fact: ScopeId,
    begin: NodeId,
    init_x: NodeId,
    declare_fact: NodeId,
    fact_body: NodeId,
    init_weights: NodeId,
    init_tally: NodeId,
    loop_head: NodeId,
    call: NodeId,
    count: NodeId,
    sum: NodeId,
    print: NodeId,
}

pub struct Demo {
    pub rt: Runtime,
    layout: Layout,
    iterations: i64,
    weights_mode: ModeId,
    tally_mode: ModeId,
}

impl Demo {
    pub fn new(iterations: i64) -> Self {
        let mut rt = Runtime::new(SourceListing::new("demo", &source_text(iterations)));

        let root = rt.tree.root();
        let begin = rt.tree.add(root, 1, false, 0);
        let init_x = rt.tree.add(begin, 2, true, 0);
        let declare_fact = rt.tree.add(begin, 3, true, 0);
        let fact_body = rt.tree.add(declare_fact, 4, true, 1);
        let init_weights = rt.tree.add(begin, 5, true, 0);
        let init_tally = rt.tree.add(begin, 6, true, 0);
        let loop_head = rt.tree.add(begin, 7, true, 0);
        let call = rt.tree.add(loop_head, 8, true, 0);
        let count = rt.tree.add(loop_head, 9, true, 0);
        let sum = rt.tree.add(loop_head, 10, true, 0);
        let print = rt.tree.add(begin, 12, true, 0);

        let main = rt.open_scope(None);
        let weights_mode = rt.modes.row_of(1, ModeId::REAL);
        let count_field = rt.symbol("count");
        let sum_field = rt.symbol("sum");
        let tally_mode = rt.modes.struct_of(vec![
            Field {
                name: count_field,
                mode: ModeId::INT,
            },
            Field {
                name: sum_field,
                mode: ModeId::REAL,
            },
        ]);
        let fact_mode = rt.modes.proc_of(vec![ModeId::INT], ModeId::INT);
        rt.declare_variable(main, "x", ModeId::INT);
        rt.declare(main, "fact", fact_mode);
        rt.declare_variable(main, "weights", weights_mode);
        rt.declare_variable(main, "tally", tally_mode);

        let fact = rt.open_scope(Some(main));
        rt.declare(fact, "n", ModeId::INT);
        let body = rt.open_scope(Some(main));
        rt.declare(body, "i", ModeId::INT);

        Self {
            rt,
            layout: Layout {
                main,
                body,
                fact,
                begin,
                init_x,
                declare_fact,
                fact_body,
                init_weights,
                init_tally,
                loop_head,
                call,
                count,
                sum,
                print,
            },
            iterations,
            weights_mode,
            tally_mode,
        }
    }

    /// Runs the program to completion or until the monitor aborts it.
    pub fn run(&mut self, monitor: &mut Monitor, console: &mut dyn Console) -> Result<Outcome> {
        let mut execution = Execution {
            rt: &mut self.rt,
            layout: &self.layout,
            monitor,
            console,
            node: self.layout.begin,
        };
        let outcome = execution.program(self.iterations, self.weights_mode, self.tally_mode);
        match outcome {
            Ok(()) => Ok(Outcome::Completed),
            Err(Halt::Abort(status)) => Ok(Outcome::Aborted(status)),
            Err(Halt::Failed(err)) => Err(err),
        }
    }
}

enum Halt {
    Abort(i32),
    Failed(MonitorError),
}

impl From<MonitorError> for Halt {
    fn from(err: MonitorError) -> Self {
        Halt::Failed(err)
    }
}

type Step<T> = std::result::Result<T, Halt>;

struct Execution<'a> {
    rt: &'a mut Runtime,
    layout: &'a Layout,
    monitor: &'a mut Monitor,
    console: &'a mut dyn Console,
    /// The unit being executed, for runtime error stops.
    node: NodeId,
}

impl Execution<'_> {
    fn program(&mut self, iterations: i64, weights_mode: ModeId, tally_mode: ModeId) -> Step<()> {
        let layout = self.layout;
        let opened = self.rt.open_frame(layout.main, layout.begin);
        let frame = self.checked(opened)?;

        self.visit(frame, layout.init_x)?;
        self.execute(frame, "x := 0")?;

        self.visit(frame, layout.declare_fact)?;
        let fact = self.rt.routine("fact");
        let stored = self.rt.initialise(frame, "fact", fact);
        self.checked(stored)?;

        self.visit(frame, layout.init_weights)?;
        let weights: Vec<Value> = WEIGHTS.iter().map(|w| Value::Real(*w)).collect();
        let allocated = self.rt.new_row(weights_mode, &[(1, 4)], &weights);
        let weights = self.checked(allocated)?;
        let stored = self.rt.assign(frame, "weights", weights);
        self.checked(stored)?;

        self.visit(frame, layout.init_tally)?;
        let tally = Value::Struct(vec![Value::Int(0), Value::Real(0.0)]);
        let stored = self.rt.assign(frame, "tally", tally);
        self.checked(stored)?;
        debug!(mode = %self.rt.describe(tally_mode), "tally initialised");

        for i in 1..=iterations {
            self.visit(frame, layout.loop_head)?;
            let opened = self.rt.open_frame(layout.body, layout.loop_head);
            let body = self.checked(opened)?;
            let stored = self.rt.initialise(body, "i", Value::Int(i));
            self.checked(stored)?;

            self.visit(body, layout.call)?;
            let result = self.fact(body, i)?;
            self.execute(body, &format!("x := {result}"))?;

            self.visit(body, layout.count)?;
            self.execute(body, "count OF tally +:= 1")?;

            self.visit(body, layout.sum)?;
            self.execute(body, "sum OF tally +:= weights[1 + (i - 1) MOD 4] * x")?;

            self.rt.close_frame();
        }

        self.visit(frame, layout.print)?;
        let x = self.execute(frame, "x")?;
        let sum = self.execute(frame, "sum OF tally")?;
        let x = render(self.rt, x.mode, &x.value);
        let x = self.checked(x)?;
        let sum = render(self.rt, sum.mode, &sum.value);
        let sum = self.checked(sum)?;
        let line = format!("{x} {sum}");
        self.console.write_line(&line)?;

        self.rt.close_frame();
        Ok(())
    }

    /// `fact (n)` called from `caller`.
    fn fact(&mut self, caller: FrameId, n: i64) -> Step<i64> {
        let layout = self.layout;
        let opened = self.rt.call_frame(layout.fact, layout.fact_body, "fact");
        let frame = self.checked(opened)?;
        let stored = self.rt.initialise(frame, "n", Value::Int(n));
        self.checked(stored)?;
        self.visit(frame, layout.fact_body)?;
        let base = self.execute(frame, "n <= 1")?;
        let result = if base.value == Value::Bool(true) {
            1
        } else {
            let inner = self.fact(frame, n - 1)?;
            self.node = layout.fact_body;
            match self.execute(frame, &format!("n * {inner}"))?.value {
                Value::Int(product) => product,
                _ => return self.fail(Diagnostic::access("fact yields no INT")),
            }
        };
        self.rt.close_frame();
        self.node = self
            .rt
            .frames
            .get(caller)
            .map_or(layout.begin, |frame| frame.node);
        Ok(result)
    }

    /// Records that `frame` reached `node` and stops there if asked to.
    fn visit(&mut self, frame: FrameId, node: NodeId) -> Step<()> {
        self.rt.move_to(frame, node);
        self.node = node;
        let Some(reason) = self.rt.pending_stop(node) else {
            return Ok(());
        };
        match self.monitor.enter(self.rt, self.console, reason, node)? {
            SessionResult::Resume => Ok(()),
            SessionResult::Abort(status) => Err(Halt::Abort(status)),
        }
    }

    fn execute(&mut self, frame: FrameId, unit: &str) -> Step<Evaluation> {
        let capacity = self.monitor.config.type_stack_capacity;
        let outcome = evaluate(self.rt, Some(frame), unit, capacity);
        self.checked(outcome)
    }

    fn checked<T>(&mut self, outcome: std::result::Result<T, Diagnostic>) -> Step<T> {
        outcome.or_else(|diagnostic| self.fail(diagnostic))
    }

    /// A runtime error: the monitor is entered and execution cannot go on.
    fn fail<T>(&mut self, diagnostic: Diagnostic) -> Step<T> {
        warn!(line = self.rt.tree.line(self.node), %diagnostic, "runtime error");
        let reason = StopReason::RuntimeError(diagnostic);
        match self.monitor.enter(self.rt, self.console, reason, self.node)? {
            SessionResult::Abort(status) => Err(Halt::Abort(status)),
            SessionResult::Resume => Err(Halt::Abort(ABORT_STATUS)),
        }
    }
}
