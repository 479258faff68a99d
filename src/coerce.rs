//! Coercions applied to the value on top of the value stack.
//!
//! Each function takes the mode of the top value and returns the mode of the
//! value that replaces it; the caller keeps its type stack in step.

use crate::{
    diagnostics::Diagnostic,
    mode::{ModeId, REF_SIZE},
    runtime::Runtime,
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strength {
    /// Stops at a name of a structured or row value.
    Weak,
    /// Strips every reference.
    Strong,
}

pub fn deref(rt: &mut Runtime, mut mode: ModeId, strength: Strength) -> Result<ModeId, Diagnostic> {
    while let Some(target) = rt.modes.deref(mode) {
        if strength == Strength::Weak && rt.modes.is_stowed(target) {
            break;
        }
        mode = deref_once(rt, mode)?;
    }
    Ok(mode)
}

/// Replaces the reference on top of the stack by the value it refers to.
pub fn deref_once(rt: &mut Runtime, mode: ModeId) -> Result<ModeId, Diagnostic> {
    let target = rt
        .modes
        .deref(mode)
        .ok_or_else(|| Diagnostic::semantic(format!("{} is not a name", rt.describe(mode))))?;
    let bytes = rt.stack.pop(REF_SIZE)?;
    match Value::decode(&rt.modes, mode, &bytes) {
        Value::Ref(Some(address)) => {
            let value = rt.memory.read(address, rt.modes.size(target))?.to_vec();
            rt.stack.push(&value)?;
            Ok(target)
        }
        Value::Ref(None) => Err(Diagnostic::access(format!(
            "attempt to dereference NIL of mode {}",
            rt.describe(mode)
        ))),
        _ => Err(Diagnostic::access(format!(
            "attempt to dereference an uninitialised name of mode {}",
            rt.describe(mode)
        ))),
    }
}

/// Strong coercion of the top value to `target`: dereferencing, `NIL` to any
/// name, widening and voiding.
pub fn coerce(rt: &mut Runtime, mut mode: ModeId, target: ModeId) -> Result<ModeId, Diagnostic> {
    if mode == target || rt.modes.accepts(target, mode) {
        return Ok(mode);
    }
    if target == ModeId::VOID {
        rt.stack.pop(rt.modes.size(mode))?;
        return Ok(ModeId::VOID);
    }
    if mode == ModeId::NIL && rt.modes.is_ref(target) {
        return Ok(target);
    }
    let target_depth = rt.modes.ref_depth(target);
    while rt.modes.ref_depth(mode) > target_depth {
        mode = deref_once(rt, mode)?;
        if mode == target || rt.modes.accepts(target, mode) {
            return Ok(mode);
        }
    }
    if widen(rt, mode, target)? {
        return Ok(target);
    }
    Err(Diagnostic::semantic(format!(
        "cannot coerce {} to {}",
        rt.describe(mode),
        rt.describe(target)
    )))
}

fn widen(rt: &mut Runtime, mode: ModeId, target: ModeId) -> Result<bool, Diagnostic> {
    let widenable = matches!(
        (mode, target),
        (ModeId::INT, ModeId::REAL)
            | (ModeId::INT, ModeId::LONG_INT)
            | (ModeId::INT, ModeId::LONG_REAL)
            | (ModeId::REAL, ModeId::LONG_REAL)
            | (ModeId::LONG_INT, ModeId::LONG_REAL)
    );
    if !widenable {
        return Ok(false);
    }
    let bytes = rt.stack.pop(rt.modes.size(mode))?;
    let value = Value::decode(&rt.modes, mode, &bytes);
    let widened = match (&value, target) {
        (Value::Undefined, _) => Value::Undefined,
        (Value::Int(n), ModeId::LONG_INT) => Value::LongInt(*n as i128),
        (_, ModeId::REAL) => value.as_real().map_or(Value::Undefined, Value::Real),
        _ => value.as_real().map_or(Value::Undefined, Value::LongReal),
    };
    rt.stack.push(&widened.encode(&rt.modes, target))?;
    Ok(true)
}
