//! Name lookup for the evaluator: identifiers along the call chain, operators,
//! priorities and mode indicants in the standard environment.

use crate::{
    diagnostics::Diagnostic,
    frame::FrameId,
    memory::Address,
    mode::ModeId,
    runtime::Runtime,
    scope::Storage,
    stdlib::NativeId,
    symbol::Symbol,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// Storage inside an active frame.
    Local {
        frame: FrameId,
        address: Address,
        mode: ModeId,
    },
    /// A procedure of the standard environment.
    Native { id: NativeId, mode: ModeId },
}

/// Looks `name` up in the frames of the call chain starting at `frame`,
/// searching only the scope each frame was opened for, then in the standard
/// environment.
pub fn resolve_identifier(
    rt: &Runtime,
    name: Symbol,
    frame: Option<FrameId>,
) -> Result<Binding, Diagnostic> {
    if let Some(start) = frame {
        for (id, _) in rt.frames.dynamic_chain(start) {
            if let Some((address, mode)) = rt.local(id, name) {
                return Ok(Binding::Local {
                    frame: id,
                    address,
                    mode,
                });
            }
        }
    }
    let global = rt.scopes.get(rt.standard_environ());
    match global.find_identifier(name) {
        Some(tag) => match tag.storage {
            Storage::Native(id) => Ok(Binding::Native { id, mode: tag.mode }),
            _ => Err(undeclared(rt, name)),
        },
        None => Err(undeclared(rt, name)),
    }
}

fn undeclared(rt: &Runtime, name: Symbol) -> Diagnostic {
    Diagnostic::semantic(format!("`{}` is not declared", rt.symbols.name(name)))
}

/// An operator declaration matched against operand modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorMatch {
    pub id: NativeId,
    pub params: Vec<ModeId>,
    pub result: ModeId,
    /// Dereferences to apply to each operand before the call.
    pub left_derefs: usize,
    pub right_derefs: usize,
}

/// Finds the operator `name` for the given operand modes. An exact match is
/// tried first, then the left operand dereferenced one level at a time, then
/// the right.
pub fn resolve_operator(
    rt: &Runtime,
    name: &str,
    left: ModeId,
    right: Option<ModeId>,
) -> Result<OperatorMatch, Diagnostic> {
    let left_chain = deref_chain(rt, left);
    let right_chain = right.map(|right| deref_chain(rt, right)).unwrap_or_default();
    let right_steps = right_chain.len().saturating_sub(1);

    let Some(symbol) = rt.symbols.lookup(name) else {
        return Err(Diagnostic::semantic(format!("`{name}` is not an operator")));
    };
    let operators = rt.scopes.get(rt.standard_environ()).operators();

    for total in 0..left_chain.len() + right_steps {
        for left_derefs in (0..=total).rev() {
            let right_derefs = total - left_derefs;
            let Some(&left_mode) = left_chain.get(left_derefs) else {
                continue;
            };
            let operands: Vec<ModeId> = match right {
                Some(_) => match right_chain.get(right_derefs) {
                    Some(&right_mode) => vec![left_mode, right_mode],
                    None => continue,
                },
                None if right_derefs == 0 => vec![left_mode],
                None => continue,
            };
            for tag in operators.iter().filter(|tag| tag.name == symbol) {
                let Storage::Native(id) = tag.storage else {
                    continue;
                };
                let Some((params, result)) = rt.modes.proc_signature(tag.mode) else {
                    continue;
                };
                let fits = params.len() == operands.len()
                    && params
                        .iter()
                        .zip(&operands)
                        .all(|(param, operand)| rt.modes.accepts(*param, *operand));
                if fits {
                    return Ok(OperatorMatch {
                        id,
                        params: params.to_vec(),
                        result,
                        left_derefs,
                        right_derefs,
                    });
                }
            }
        }
    }

    let operands = match right {
        Some(right) => format!("{} {name} {}", rt.describe(left), rt.describe(right)),
        None => format!("{name} {}", rt.describe(left)),
    };
    let mut diagnostic = Diagnostic::semantic(format!("no operator `{name}` for {operands}"));
    for (index, mode) in left_chain.iter().enumerate().skip(1) {
        diagnostic = diagnostic.with_note(format!(
            "also tried the left operand as {} ({index} dereference(s))",
            rt.describe(*mode)
        ));
    }
    for (index, mode) in right_chain.iter().enumerate().skip(1) {
        diagnostic = diagnostic.with_note(format!(
            "also tried the right operand as {} ({index} dereference(s))",
            rt.describe(*mode)
        ));
    }
    Err(diagnostic)
}

/// `mode`, `deref mode`, ... down to the first non-reference mode.
fn deref_chain(rt: &Runtime, mode: ModeId) -> Vec<ModeId> {
    let mut chain = vec![mode];
    let mut current = mode;
    while let Some(target) = rt.modes.deref(current) {
        chain.push(target);
        current = target;
    }
    chain
}

/// Priority of a dyadic operator, if `name` is declared as one.
pub fn priority(rt: &Runtime, name: &str) -> Option<u8> {
    let symbol = rt.symbols.lookup(name)?;
    rt.scopes.get(rt.standard_environ()).find_priority(symbol)
}

/// Mode indicant `name`, searched along the lexical chain of `frame`'s scope.
pub fn resolve_indicant(rt: &Runtime, name: &str, frame: Option<FrameId>) -> Option<ModeId> {
    let symbol = rt.symbols.lookup(name)?;
    let scope = frame
        .and_then(|id| rt.frames.get(id))
        .map_or(rt.standard_environ(), |frame| frame.scope);
    rt.scopes
        .chain(scope)
        .find_map(|scope| scope.find_indicant(symbol))
}
