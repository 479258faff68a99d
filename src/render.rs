//! Value-to-text rendering keyed by mode.

use crate::{
    diagnostics::Diagnostic,
    memory::{Address, RowDescriptor},
    mode::{Mode, ModeId},
    runtime::Runtime,
    value::{read_string, Procedure, Value},
};

/// Guards against reference cycles when following names for display.
const MAX_FOLLOW: usize = 16;

pub fn render(rt: &Runtime, mode: ModeId, value: &Value) -> Result<String, Diagnostic> {
    if !value.is_defined() && !matches!(value, Value::Struct(_)) {
        return Ok("uninitialised".to_string());
    }
    if mode == ModeId::STRING {
        if let Value::Row(descriptor) = value {
            return Ok(quote(&read_string(&rt.memory, *descriptor)?));
        }
    }
    let text = match (rt.modes.get(mode), value) {
        (_, Value::Void) => "EMPTY".to_string(),
        (_, Value::Int(n)) => n.to_string(),
        (_, Value::LongInt(n)) => n.to_string(),
        (_, Value::Real(x) | Value::LongReal(x)) => format!("{x:?}"),
        (_, Value::Bool(true)) => "TRUE".to_string(),
        (_, Value::Bool(false)) => "FALSE".to_string(),
        (_, Value::Char(c)) => quote(&c.to_string()),
        (_, Value::Bits(bits)) => format!("16r{bits:x}"),
        (_, Value::Ref(None) | Value::Row(None)) => "NIL".to_string(),
        (_, Value::Ref(Some(address))) => format!("REF {address}"),
        (Mode::Row { element, .. }, Value::Row(Some(descriptor))) => {
            render_row(rt, *element, *descriptor)?
        }
        (Mode::Struct(fields), Value::Struct(values)) => {
            let mut parts = Vec::with_capacity(fields.len());
            for (field, value) in fields.iter().zip(values) {
                parts.push(format!(
                    "{} = {}",
                    rt.symbols.name(field.name),
                    render(rt, field.mode, value)?
                ));
            }
            format!("({})", parts.join(", "))
        }
        (_, Value::Union { mode: member, value }) => {
            format!("({}) {}", rt.describe(*member), render(rt, *member, value)?)
        }
        (_, Value::Proc(Procedure::Native(id))) => {
            let name = rt.natives.get(*id).map_or("?", |native| native.name.as_str());
            format!("native procedure `{name}`")
        }
        (_, Value::Proc(Procedure::Routine(index))) => {
            format!("routine `{}`", rt.routine_name(*index).unwrap_or("?"))
        }
        _ => "?".to_string(),
    };
    Ok(text)
}

fn render_row(rt: &Runtime, element: ModeId, descriptor: Address) -> Result<String, Diagnostic> {
    let row = RowDescriptor::read(&rt.memory, descriptor)?;
    let size = rt.modes.size(element);
    let bounds: Vec<String> = row
        .dimensions
        .iter()
        .map(|dim| format!("{}:{}", dim.lower, dim.upper))
        .collect();
    let mut items = Vec::with_capacity(row.element_count());
    let mut subscripts: Vec<i64> = row.dimensions.iter().map(|dim| dim.lower).collect();
    for _ in 0..row.element_count() {
        let flat = row.index_of(&subscripts)?;
        let value = rt.read_value(row.elements.offset_by(flat * size), element)?;
        items.push(render(rt, element, &value)?);
        // Row-major odometer over the subscripts.
        for (position, dim) in row.dimensions.iter().enumerate().rev() {
            if subscripts[position] < dim.upper {
                subscripts[position] += 1;
                break;
            }
            subscripts[position] = dim.lower;
        }
    }
    Ok(format!("[{}] ({})", bounds.join(", "), items.join(", ")))
}

/// Follows a chain of names down to the value at its end.
pub fn render_dereferenced(rt: &Runtime, mode: ModeId, value: &Value) -> Result<String, Diagnostic> {
    let (mut mode, mut value) = (mode, value.clone());
    for _ in 0..MAX_FOLLOW {
        let (Some(target), Value::Ref(Some(address))) = (rt.modes.deref(mode), &value) else {
            break;
        };
        value = rt.read_value(*address, target)?;
        mode = target;
    }
    render(rt, mode, &value)
}

/// `(MODE) value`, the form in which evaluation results are printed.
pub fn render_typed(rt: &Runtime, mode: ModeId, value: &Value) -> Result<String, Diagnostic> {
    Ok(format!("({}) {}", rt.describe(mode), render(rt, mode, value)?))
}

fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}
