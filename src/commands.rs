//! The monitor's command language: `command-name [argument]`.

use tracing::debug;

use crate::{
    breakpoints::ClearScope,
    diagnostics::{Diagnostic, MonitorError, Result},
    evaluator::evaluate,
    frame::FrameId,
    lexer::{Scanner, TokenKind},
    render::{render_dereferenced, render_typed},
    runtime::{fold, Runtime},
    scope::Storage,
    session::{MonitorSession, ABORT_STATUS},
    tree::Mask,
};

/// What the command loop does after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Stay,
    Resume,
    Abort(i32),
}

type Action = fn(&mut MonitorSession<'_>, &str) -> Result<Flow>;

struct Command {
    /// Capital letters form the shortest accepted abbreviation.
    name: &'static str,
    usage: &'static str,
    synopsis: &'static str,
    action: Action,
}

/// Searched in order; the first match wins.
const COMMANDS: &[Command] = &[
    Command {
        name: "Breakpoint",
        usage: "breakpoint [N [if EXPR | clear]]",
        synopsis: "set, clear or list breakpoints; `breakpoint watch EXPR`",
        action: breakpoint,
    },
    Command {
        name: "Calls",
        usage: "calls [N]",
        synopsis: "print the N innermost frames of the call chain",
        action: calls,
    },
    Command {
        name: "CONTinue",
        usage: "continue",
        synopsis: "resume execution",
        action: resume,
    },
    Command {
        name: "RESET",
        usage: "reset",
        synopsis: "make the innermost frame current again",
        action: reset,
    },
    Command {
        name: "RESume",
        usage: "resume",
        synopsis: "resume execution",
        action: resume,
    },
    Command {
        name: "EValuate",
        usage: "evaluate EXPR",
        synopsis: "evaluate a unit in the current frame",
        action: evaluate_command,
    },
    Command {
        name: "X",
        usage: "x EXPR",
        synopsis: "same as evaluate",
        action: evaluate_command,
    },
    Command {
        name: "EXAmine",
        usage: "examine NAME",
        synopsis: "print NAME in every active frame that declares it",
        action: examine,
    },
    Command {
        name: "EXIt",
        usage: "exit",
        synopsis: "terminate the program",
        action: quit,
    },
    Command {
        name: "Quit",
        usage: "quit",
        synopsis: "terminate the program",
        action: quit,
    },
    Command {
        name: "Frame",
        usage: "frame [N]",
        synopsis: "dump frame N and make it current",
        action: frame,
    },
    Command {
        name: "FINish",
        usage: "finish",
        synopsis: "resume until the current procedure returns",
        action: finish,
    },
    Command {
        name: "OUT",
        usage: "out",
        synopsis: "same as finish",
        action: finish,
    },
    Command {
        name: "HEap",
        usage: "heap [BYTES]",
        synopsis: "list live heap handles up to a byte budget",
        action: heap,
    },
    Command {
        name: "Help",
        usage: "help",
        synopsis: "list commands",
        action: help,
    },
    Command {
        name: "List",
        usage: "list [N [M]]",
        synopsis: "print source lines",
        action: list,
    },
    Command {
        name: "LInk",
        usage: "link [N]",
        synopsis: "print the N innermost frames of the static chain",
        action: link,
    },
    Command {
        name: "Next",
        usage: "next",
        synopsis: "resume until the next unit at this call depth or outer",
        action: next,
    },
    Command {
        name: "Prompt",
        usage: "prompt \"TEXT\"",
        synopsis: "set the prompt",
        action: prompt,
    },
    Command {
        name: "Step",
        usage: "step",
        synopsis: "resume until the next unit at any depth",
        action: step,
    },
    Command {
        name: "SIzes",
        usage: "sizes",
        synopsis: "print memory usage",
        action: sizes,
    },
    Command {
        name: "TRace",
        usage: "trace [on|off]",
        synopsis: "print every unit as it executes",
        action: trace,
    },
    Command {
        name: "Until",
        usage: "until N",
        synopsis: "resume until line N",
        action: until,
    },
    Command {
        name: "Where",
        usage: "where",
        synopsis: "print the current source position",
        action: where_command,
    },
];

/// Runs one command line. Diagnostics are reported on the console and leave
/// the session as it was; only console failures propagate.
pub fn dispatch(session: &mut MonitorSession<'_>, line: &str) -> Result<Flow> {
    let (word, args) = split_word(line.trim());
    if word.is_empty() {
        return Ok(Flow::Stay);
    }
    let Some(command) = find(word) else {
        let diagnostic = Diagnostic::semantic(format!("unrecognised command `{word}`"))
            .with_note("`help` lists the commands");
        session.console.write_line(&diagnostic.to_string())?;
        return Ok(Flow::Stay);
    };
    debug!(command = command.name, args, "dispatch");
    match (command.action)(session, args) {
        Err(MonitorError::Diagnostic(diagnostic)) => {
            session
                .console
                .write_line(&diagnostic.render_with_source(args))?;
            Ok(Flow::Stay)
        }
        other => other,
    }
}

fn find(word: &str) -> Option<&'static Command> {
    let word = word.to_uppercase();
    COMMANDS.iter().find(|command| {
        let shortest: String = command
            .name
            .chars()
            .take_while(char::is_ascii_uppercase)
            .collect();
        word.starts_with(&shortest) && command.name.to_uppercase().starts_with(&word)
    })
}

/// Splits off the first whitespace-delimited word.
fn split_word(text: &str) -> (&str, &str) {
    match text.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (text, ""),
    }
}

fn number(text: &str, what: &str) -> std::result::Result<usize, Diagnostic> {
    text.parse()
        .map_err(|_| Diagnostic::syntax(format!("expected {what}, found `{text}`")))
}

fn optional_number(text: &str, what: &str) -> std::result::Result<Option<usize>, Diagnostic> {
    if text.is_empty() {
        Ok(None)
    } else {
        number(text, what).map(Some)
    }
}

fn say(session: &mut MonitorSession<'_>, text: impl AsRef<str>) -> Result<Flow> {
    session.console.write_line(text.as_ref())?;
    Ok(Flow::Stay)
}

fn breakpoint(session: &mut MonitorSession<'_>, args: &str) -> Result<Flow> {
    let (word, rest) = split_word(args);
    match word {
        "" | "list" => list_breakpoints(session),
        "clear" => {
            let scope = match rest {
                "" | "all" => ClearScope::All,
                "breakpoints" => ClearScope::Breakpoints,
                "watch" => ClearScope::Watch,
                other => {
                    return Err(Diagnostic::syntax(format!(
                        "expected `all`, `breakpoints` or `watch`, found `{other}`"
                    ))
                    .into())
                }
            };
            session.breakpoints.clear(&mut session.rt.tree, scope);
            say(session, "cleared")
        }
        "watch" => {
            if rest.is_empty() {
                return Err(Diagnostic::syntax("watch expects an expression").into());
            }
            let previous = session
                .breakpoints
                .set_watch(&session.rt.tree, rest.to_string());
            if let Some(previous) = previous {
                say(session, format!("watch `{previous}` replaced"))?;
            }
            say(session, format!("watch `{rest}` set"))
        }
        line => {
            let line = number(line, "a line number")?;
            let (word, guard) = split_word(rest);
            match word {
                "" => {
                    session.breakpoints.set(&mut session.rt.tree, line, None)?;
                    say(session, format!("breakpoint set at line {line}"))
                }
                "clear" => {
                    session.breakpoints.clear_line(&mut session.rt.tree, line)?;
                    say(session, format!("breakpoint at line {line} cleared"))
                }
                "if" if !guard.is_empty() => {
                    session
                        .breakpoints
                        .set(&mut session.rt.tree, line, Some(guard.to_string()))?;
                    say(session, format!("breakpoint set at line {line} if {guard}"))
                }
                "if" => Err(Diagnostic::syntax("`if` expects a guard expression").into()),
                other => Err(Diagnostic::syntax(format!(
                    "expected `if` or `clear` after the line number, found `{other}`"
                ))
                .into()),
            }
        }
    }
}

fn list_breakpoints(session: &mut MonitorSession<'_>) -> Result<Flow> {
    let mut lines = Vec::new();
    for (line, mask, guard) in session.breakpoints.entries(&session.rt.tree) {
        let kind = if mask.contains(Mask::BREAKPOINT) {
            "breakpoint"
        } else {
            "temporary breakpoint"
        };
        match guard {
            Some(guard) => lines.push(format!("line {line}: {kind} if {guard}")),
            None => lines.push(format!("line {line}: {kind}")),
        }
    }
    if let Some(watch) = session.breakpoints.watch() {
        lines.push(format!("watch: {watch}"));
    }
    if lines.is_empty() {
        return say(session, "no breakpoints");
    }
    say(session, lines.join("\n"))
}

fn calls(session: &mut MonitorSession<'_>, args: &str) -> Result<Flow> {
    let limit = optional_number(args, "a frame count")?.unwrap_or(usize::MAX);
    let Some(top) = session.rt.frames.top() else {
        return say(session, "no active frames");
    };
    let rt = &*session.rt;
    let lines: Vec<String> = rt
        .frames
        .dynamic_chain(top)
        .filter(|(_, frame)| frame.routine.is_some())
        .take(limit)
        .map(|(id, _)| describe_frame(rt, id))
        .collect();
    if lines.is_empty() {
        return say(session, "no procedure calls are active");
    }
    say(session, lines.join("\n"))
}

fn link(session: &mut MonitorSession<'_>, args: &str) -> Result<Flow> {
    let limit = optional_number(args, "a frame count")?.unwrap_or(usize::MAX);
    let Some(current) = session.current_frame else {
        return say(session, "no active frames");
    };
    let rt = &*session.rt;
    let lines: Vec<String> = rt
        .frames
        .static_chain(current)
        .take(limit)
        .map(|(id, _)| describe_frame(rt, id))
        .collect();
    say(session, lines.join("\n"))
}

fn describe_frame(rt: &Runtime, id: FrameId) -> String {
    let Some(frame) = rt.frames.get(id) else {
        return format!("frame {}: gone", id.number());
    };
    let what = match frame.routine {
        Some(routine) => format!("routine `{}`", rt.symbols.name(routine)),
        None => "block".to_string(),
    };
    format!("frame {}: {what} at line {}", id.number(), rt.tree.line(frame.node))
}

fn resume(_: &mut MonitorSession<'_>, _: &str) -> Result<Flow> {
    Ok(Flow::Resume)
}

fn evaluate_command(session: &mut MonitorSession<'_>, args: &str) -> Result<Flow> {
    if args.is_empty() {
        return Err(Diagnostic::syntax("expected an expression").into());
    }
    let capacity = session.config.type_stack_capacity;
    let evaluation = evaluate(session.rt, session.current_frame, args, capacity)?;
    let text = render_typed(session.rt, evaluation.mode, &evaluation.value)?;
    say(session, text)
}

fn examine(session: &mut MonitorSession<'_>, args: &str) -> Result<Flow> {
    if args.is_empty() {
        return Err(Diagnostic::syntax("expected an identifier").into());
    }
    let symbol = session
        .rt
        .symbols
        .lookup(&fold(args))
        .ok_or_else(|| Diagnostic::semantic(format!("`{args}` is not declared")))?;
    let Some(top) = session.rt.frames.top() else {
        return say(session, "no active frames");
    };
    let mut lines = Vec::new();
    let chain: Vec<FrameId> = session.rt.frames.dynamic_chain(top).map(|(id, _)| id).collect();
    for id in chain {
        if let Some((address, mode)) = session.rt.local(id, symbol) {
            let value = session.rt.read_value(address, mode)?;
            let text = render_dereferenced(session.rt, mode, &value)?;
            lines.push(format!(
                "frame {}: {} {args} = {text}",
                id.number(),
                session.rt.describe(mode)
            ));
        }
    }
    if lines.is_empty() {
        return say(session, format!("`{args}` is not bound in any active frame"));
    }
    say(session, lines.join("\n"))
}

fn quit(session: &mut MonitorSession<'_>, _: &str) -> Result<Flow> {
    let answer = session.console.read_line("terminate the program? (y/n) ")?;
    match answer.as_deref().map(str::trim) {
        Some(answer) if answer.starts_with(['y', 'Y']) => Ok(Flow::Abort(ABORT_STATUS)),
        _ => Ok(Flow::Stay),
    }
}

fn frame(session: &mut MonitorSession<'_>, args: &str) -> Result<Flow> {
    let id = match optional_number(args, "a frame number")? {
        Some(number) => session
            .rt
            .frames
            .by_number(number)
            .ok_or_else(|| Diagnostic::semantic(format!("there is no frame {number}")))?,
        None => match session.current_frame {
            Some(id) => id,
            None => return say(session, "no active frames"),
        },
    };
    session.current_frame = Some(id);
    let mut lines = vec![describe_frame(session.rt, id)];
    let rt = &*session.rt;
    if let Some(frame) = rt.frames.get(id) {
        for tag in rt.scopes.get(frame.scope).identifiers() {
            let Storage::Frame(offset) = tag.storage else {
                continue;
            };
            let value = rt.read_value(frame.address.offset_by(offset), tag.mode)?;
            lines.push(format!(
                "  {} {} = {}",
                rt.describe(tag.mode),
                rt.symbols.name(tag.name),
                render_dereferenced(rt, tag.mode, &value)?
            ));
        }
        for tag in rt.scopes.get(frame.scope).labels() {
            if let Storage::Label(node) = tag.storage {
                lines.push(format!(
                    "  label {} at line {}",
                    rt.symbols.name(tag.name),
                    rt.tree.line(node)
                ));
            }
        }
    }
    say(session, lines.join("\n"))
}

fn finish(session: &mut MonitorSession<'_>, _: &str) -> Result<Flow> {
    let depth = session.proc_level().saturating_sub(1);
    session
        .breakpoints
        .set_temporary_everywhere(&session.rt.tree, Some(depth));
    Ok(Flow::Resume)
}

fn heap(session: &mut MonitorSession<'_>, args: &str) -> Result<Flow> {
    let budget = optional_number(args, "a byte count")?.unwrap_or(session.config.heap_budget);
    let rt = &*session.rt;
    let handles = rt.memory.handles();
    let mut lines = Vec::new();
    let mut shown = 0;
    let mut bytes = 0;
    for handle in handles {
        if bytes + handle.size > budget {
            break;
        }
        bytes += handle.size;
        shown += 1;
        lines.push(format!(
            "{:<12} {:>6} bytes  {}",
            handle.address.to_string(),
            handle.size,
            rt.describe(handle.mode)
        ));
    }
    if shown < handles.len() {
        lines.push(format!("... {} more handle(s)", handles.len() - shown));
    }
    lines.push(format!(
        "{} handle(s), {} bytes in use",
        handles.len(),
        rt.memory.heap_in_use()
    ));
    say(session, lines.join("\n"))
}

fn help(session: &mut MonitorSession<'_>, _: &str) -> Result<Flow> {
    let lines: Vec<String> = COMMANDS
        .iter()
        .map(|command| format!("{:<34} {}", command.usage, command.synopsis))
        .collect();
    say(session, lines.join("\n"))
}

fn list(session: &mut MonitorSession<'_>, args: &str) -> Result<Flow> {
    let (first, rest) = split_word(args);
    let window = session.config.list_window.max(1);
    let (from, to) = match (optional_number(first, "a line number")?, rest) {
        (None, _) => centred(session.current_line(), window),
        (Some(line), "") => centred(line, window),
        (Some(from), to) => (from, number(to, "a line number")?),
    };
    let to = to.min(session.rt.source.len());
    if from == 0 || from > to {
        return Err(Diagnostic::semantic("no source lines in that range").into());
    }
    let current = session.current_line();
    let marked: Vec<usize> = session
        .breakpoints
        .entries(&session.rt.tree)
        .into_iter()
        .map(|(line, _, _)| line)
        .collect();
    let mut lines = Vec::new();
    for number in from..=to {
        let text = session.rt.source.line(number).unwrap_or_default();
        let marker = if number == current {
            '>'
        } else if marked.contains(&number) {
            '*'
        } else {
            ' '
        };
        lines.push(format!("{number:>5}{marker} {text}"));
    }
    say(session, lines.join("\n"))
}

fn centred(line: usize, window: usize) -> (usize, usize) {
    let from = line.saturating_sub(window / 2).max(1);
    (from, from + window - 1)
}

fn next(session: &mut MonitorSession<'_>, _: &str) -> Result<Flow> {
    let depth = session.proc_level();
    session
        .breakpoints
        .set_temporary_everywhere(&session.rt.tree, Some(depth));
    Ok(Flow::Resume)
}

fn prompt(session: &mut MonitorSession<'_>, args: &str) -> Result<Flow> {
    let tokens = Scanner::new(args).tokenize()?;
    match tokens.as_slice() {
        [text, end] if text.kind == TokenKind::StringDenotation && end.kind == TokenKind::Eof => {
            session.config.prompt = text.lexeme.clone();
            Ok(Flow::Stay)
        }
        _ => Err(Diagnostic::syntax("prompt expects a string denotation").into()),
    }
}

fn reset(session: &mut MonitorSession<'_>, _: &str) -> Result<Flow> {
    session.current_frame = session.rt.frames.top();
    match session.current_frame {
        Some(id) => say(session, format!("current frame is {}", id.number())),
        None => say(session, "no active frames"),
    }
}

fn sizes(session: &mut MonitorSession<'_>, _: &str) -> Result<Flow> {
    let rt = &*session.rt;
    let text = [
        format!("frames:      {}", rt.frames.len()),
        format!("stack:       {} bytes", rt.memory.stack_in_use()),
        format!(
            "heap:        {} bytes in {} handle(s)",
            rt.memory.heap_in_use(),
            rt.memory.handles().len()
        ),
        format!(
            "value stack: {} of {} bytes",
            rt.stack.pointer(),
            rt.stack.capacity()
        ),
    ]
    .join("\n");
    say(session, text)
}

fn step(session: &mut MonitorSession<'_>, _: &str) -> Result<Flow> {
    session
        .breakpoints
        .set_temporary_everywhere(&session.rt.tree, None);
    Ok(Flow::Resume)
}

fn trace(session: &mut MonitorSession<'_>, args: &str) -> Result<Flow> {
    let on = match args {
        "" | "on" => true,
        "off" => false,
        other => {
            return Err(Diagnostic::syntax(format!("expected `on` or `off`, found `{other}`")).into())
        }
    };
    session.breakpoints.set_trace(&session.rt.tree, on);
    say(session, if on { "trace on" } else { "trace off" })
}

fn until(session: &mut MonitorSession<'_>, args: &str) -> Result<Flow> {
    let line = number(args, "a line number")?;
    session.breakpoints.set_temporary(&session.rt.tree, line)?;
    Ok(Flow::Resume)
}

fn where_command(session: &mut MonitorSession<'_>, _: &str) -> Result<Flow> {
    let line = session.current_line();
    let mut text = format!("line {line} of {}", session.rt.source.name());
    if let Some(id) = session.current_frame {
        text.push_str(&format!(", frame {}", id.number()));
    }
    if let Some(source) = session.rt.source.line(line) {
        text.push_str(&format!("\n{line:>5}  {source}"));
    }
    say(session, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(word: &str) -> Option<&'static str> {
        find(word).map(|command| command.name)
    }

    #[test]
    fn abbreviations_need_the_leading_capitals() {
        assert_eq!(name("c"), Some("Calls"));
        assert_eq!(name("cont"), Some("CONTinue"));
        assert_eq!(name("CONTINUE"), Some("CONTinue"));
        assert_eq!(name("co"), None);
        assert_eq!(name("res"), Some("RESume"));
        assert_eq!(name("reset"), Some("RESET"));
        assert_eq!(name("h"), Some("Help"));
        assert_eq!(name("he"), Some("HEap"));
        assert_eq!(name("si"), Some("SIzes"));
        assert_eq!(name("x"), Some("X"));
        assert_eq!(name("exa"), Some("EXAmine"));
        assert_eq!(name("ex"), None);
    }

    #[test]
    fn words_longer_than_the_name_do_not_match() {
        assert_eq!(name("stepper"), None);
        assert_eq!(name("frobnicate"), None);
    }

    #[test]
    fn split_word_trims_the_rest() {
        assert_eq!(split_word("b 12  if x > 3"), ("b", "12  if x > 3"));
        assert_eq!(split_word("where"), ("where", ""));
    }

    #[test]
    fn centred_window_starts_at_line_one() {
        assert_eq!(centred(2, 10), (1, 10));
        assert_eq!(centred(20, 10), (15, 24));
    }
}
