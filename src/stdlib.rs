//! The standard environment: native procedures, operators and their priorities.

use std::{cmp::Ordering, f64::consts::PI, fmt, rc::Rc};

use crate::{
    diagnostics::Diagnostic,
    memory::{status, Address, Memory, RowDescriptor},
    mode::{ModeId, INT_SIZE, REAL_SIZE},
    runtime::Runtime,
    value::{alloc_string, read_string, Value},
};

/// Index of a procedure in the native registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeId(u32);

impl NativeId {
    pub fn index(self) -> u32 {
        self.0
    }

    pub(crate) fn from_index(index: u32) -> Self {
        Self(index)
    }
}

pub type NativeCallback = Rc<dyn Fn(&mut Memory, &[Value]) -> Result<Value, Diagnostic>>;

#[derive(Clone)]
pub struct NativeProcedure {
    pub name: String,
    callback: NativeCallback,
}

impl NativeProcedure {
    pub fn call(&self, memory: &mut Memory, args: &[Value]) -> Result<Value, Diagnostic> {
        (self.callback)(memory, args)
    }
}

impl fmt::Debug for NativeProcedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native {}>", self.name)
    }
}

/// Registry of native procedures, looked up by [`NativeId`].
#[derive(Debug, Default)]
pub struct Natives {
    procedures: Vec<NativeProcedure>,
}

impl Natives {
    pub fn register<F>(&mut self, name: &str, callback: F) -> NativeId
    where
        F: Fn(&mut Memory, &[Value]) -> Result<Value, Diagnostic> + 'static,
    {
        self.procedures.push(NativeProcedure {
            name: name.to_string(),
            callback: Rc::new(callback),
        });
        NativeId(self.procedures.len() as u32 - 1)
    }

    pub fn get(&self, id: NativeId) -> Option<&NativeProcedure> {
        self.procedures.get(id.0 as usize)
    }
}

pub const MAX_PRIORITY: u8 = 9;

const PRIORITIES: &[(&str, u8)] = &[
    ("+:=", 1),
    ("-:=", 1),
    ("*:=", 1),
    ("/:=", 1),
    ("OR", 2),
    ("AND", 3),
    ("XOR", 3),
    ("=", 4),
    ("/=", 4),
    ("<", 5),
    ("<=", 5),
    (">", 5),
    (">=", 5),
    ("+", 6),
    ("-", 6),
    ("*", 7),
    ("/", 7),
    ("%", 7),
    ("MOD", 7),
    ("**", 8),
    ("SHL", 8),
    ("SHR", 8),
];

pub fn install(rt: &mut Runtime) {
    use ModeId as M;

    for (name, priority) in PRIORITIES {
        rt.define_priority(name, *priority);
    }

    install_arithmetic(rt);
    install_comparisons(rt);

    for (name, f) in [("AND", bool_and as fn(bool, bool) -> bool), ("OR", bool_or), ("XOR", bool_xor)] {
        operator(rt, name, &[M::BOOL, M::BOOL], M::BOOL, move |_: &mut Memory, args: &[Value]| {
            match args {
                [Value::Bool(a), Value::Bool(b)] => Ok(Value::Bool(f(*a, *b))),
                _ => Err(operand_error(name)),
            }
        });
    }
    for (name, f) in [("AND", bits_and as fn(u64, u64) -> u64), ("OR", bits_or), ("XOR", bits_xor)] {
        operator(rt, name, &[M::BITS, M::BITS], M::BITS, move |_: &mut Memory, args: &[Value]| {
            match args {
                [Value::Bits(a), Value::Bits(b)] => Ok(Value::Bits(f(*a, *b))),
                _ => Err(operand_error(name)),
            }
        });
    }
    operator(rt, "SHL", &[M::BITS, M::INT], M::BITS, |_: &mut Memory, args: &[Value]| match args {
        [Value::Bits(bits), Value::Int(n)] => Ok(Value::Bits(shift(*bits, *n))),
        _ => Err(operand_error("SHL")),
    });
    operator(rt, "SHR", &[M::BITS, M::INT], M::BITS, |_: &mut Memory, args: &[Value]| match args {
        [Value::Bits(bits), Value::Int(n)] => {
            Ok(Value::Bits(n.checked_neg().map_or(0, |by| shift(*bits, by))))
        }
        _ => Err(operand_error("SHR")),
    });

    install_monadic(rt);
    install_strings(rt);
    install_assigning(rt);
    install_identifiers(rt);
}

fn operator<F>(rt: &mut Runtime, name: &str, params: &[ModeId], result: ModeId, callback: F)
where
    F: Fn(&mut Memory, &[Value]) -> Result<Value, Diagnostic> + 'static,
{
    let mode = rt.modes.proc_of(params.to_vec(), result);
    rt.define_operator(name, mode, callback);
}

fn procedure<F>(rt: &mut Runtime, name: &str, params: &[ModeId], result: ModeId, callback: F)
where
    F: Fn(&mut Memory, &[Value]) -> Result<Value, Diagnostic> + 'static,
{
    let mode = rt.modes.proc_of(params.to_vec(), result);
    rt.define_native(name, mode, callback);
}

fn install_arithmetic(rt: &mut Runtime) {
    use ModeId as M;

    let integer: [(&'static str, fn(i64, i64) -> Option<i64>, bool); 5] = [
        ("+", i64::checked_add, false),
        ("-", i64::checked_sub, false),
        ("*", i64::checked_mul, false),
        ("%", i64::checked_div, true),
        ("MOD", i64::checked_rem_euclid, true),
    ];
    for (name, f, divides) in integer {
        operator(rt, name, &[M::INT, M::INT], M::INT, move |_: &mut Memory, args: &[Value]| {
            match args {
                [Value::Int(_), Value::Int(0)] if divides => {
                    Err(Diagnostic::access("division by zero"))
                }
                [Value::Int(a), Value::Int(b)] => f(*a, *b)
                    .map(Value::Int)
                    .ok_or_else(|| Diagnostic::access("integer overflow")),
                _ => Err(operand_error(name)),
            }
        });
    }

    let long: [(&'static str, fn(i128, i128) -> Option<i128>); 3] = [
        ("+", i128::checked_add),
        ("-", i128::checked_sub),
        ("*", i128::checked_mul),
    ];
    for (name, f) in long {
        operator(
            rt,
            name,
            &[M::LONG_INT, M::LONG_INT],
            M::LONG_INT,
            move |_: &mut Memory, args: &[Value]| match args {
                [a, b] => match (a.as_long_int(), b.as_long_int()) {
                    (Some(a), Some(b)) => f(a, b)
                        .map(Value::LongInt)
                        .ok_or_else(|| Diagnostic::access("long integer overflow")),
                    _ => Err(operand_error(name)),
                },
                _ => Err(operand_error(name)),
            },
        );
    }

    let real: [(&'static str, fn(f64, f64) -> f64); 3] = [
        ("+", |a, b| a + b),
        ("-", |a, b| a - b),
        ("*", |a, b| a * b),
    ];
    let mixed = [
        [M::REAL, M::REAL],
        [M::INT, M::REAL],
        [M::REAL, M::INT],
    ];
    for (name, f) in real {
        for params in mixed {
            operator(rt, name, &params, M::REAL, real_dyadic(name, f, Value::Real));
        }
        operator(
            rt,
            name,
            &[M::LONG_REAL, M::LONG_REAL],
            M::LONG_REAL,
            real_dyadic(name, f, Value::LongReal),
        );
    }
    for params in [[M::INT, M::INT], [M::REAL, M::REAL], [M::INT, M::REAL], [M::REAL, M::INT]] {
        operator(rt, "/", &params, M::REAL, |_: &mut Memory, args: &[Value]| {
            match (args.first().and_then(Value::as_real), args.get(1).and_then(Value::as_real)) {
                (Some(_), Some(b)) if b == 0.0 => Err(Diagnostic::access("division by zero")),
                (Some(a), Some(b)) => Ok(Value::Real(a / b)),
                _ => Err(operand_error("/")),
            }
        });
    }

    operator(rt, "**", &[M::INT, M::INT], M::INT, |_: &mut Memory, args: &[Value]| match args {
        [Value::Int(base), Value::Int(exponent)] => u32::try_from(*exponent)
            .ok()
            .and_then(|exponent| base.checked_pow(exponent))
            .map(Value::Int)
            .ok_or_else(|| Diagnostic::access("integer exponentiation out of range")),
        _ => Err(operand_error("**")),
    });
    operator(rt, "**", &[M::REAL, M::INT], M::REAL, |_: &mut Memory, args: &[Value]| match args {
        [Value::Real(base), Value::Int(exponent)] => {
            let exponent = i32::try_from(*exponent)
                .map_err(|_| Diagnostic::access("exponent out of range"))?;
            Ok(Value::Real(base.powi(exponent)))
        }
        _ => Err(operand_error("**")),
    });
}

fn real_dyadic(
    name: &'static str,
    f: fn(f64, f64) -> f64,
    wrap: fn(f64) -> Value,
) -> impl Fn(&mut Memory, &[Value]) -> Result<Value, Diagnostic> {
    move |_: &mut Memory, args: &[Value]| match args {
        [a, b] => match (a.as_real(), b.as_real()) {
            (Some(a), Some(b)) => Ok(wrap(f(a, b))),
            _ => Err(operand_error(name)),
        },
        _ => Err(operand_error(name)),
    }
}

fn install_comparisons(rt: &mut Runtime) {
    use ModeId as M;

    let ordered: [(&'static str, fn(Ordering) -> bool); 6] = [
        ("=", Ordering::is_eq),
        ("/=", Ordering::is_ne),
        ("<", Ordering::is_lt),
        ("<=", Ordering::is_le),
        (">", Ordering::is_gt),
        (">=", Ordering::is_ge),
    ];
    let ordered_modes = [
        [M::INT, M::INT],
        [M::REAL, M::REAL],
        [M::INT, M::REAL],
        [M::REAL, M::INT],
        [M::LONG_INT, M::LONG_INT],
        [M::LONG_REAL, M::LONG_REAL],
        [M::CHAR, M::CHAR],
        [M::STRING, M::STRING],
    ];
    for (name, test) in ordered {
        for params in ordered_modes {
            operator(rt, name, &params, M::BOOL, compare(name, test));
        }
    }
    for &(name, test) in &ordered[..2] {
        for params in [[M::BOOL, M::BOOL], [M::BITS, M::BITS]] {
            operator(rt, name, &params, M::BOOL, compare(name, test));
        }
    }
}

fn compare(
    name: &'static str,
    test: fn(Ordering) -> bool,
) -> impl Fn(&mut Memory, &[Value]) -> Result<Value, Diagnostic> {
    move |memory: &mut Memory, args: &[Value]| {
        let [a, b] = args else {
            return Err(operand_error(name));
        };
        let ordering = match (a, b) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::LongInt(a), Value::LongInt(b)) => Some(a.cmp(b)),
            (Value::Char(a), Value::Char(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Bits(a), Value::Bits(b)) => Some(a.cmp(b)),
            (Value::Row(a), Value::Row(b)) => {
                Some(read_string(memory, *a)?.cmp(&read_string(memory, *b)?))
            }
            _ => match (a.as_real(), b.as_real()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => None,
            },
        };
        ordering
            .map(|ordering| Value::Bool(test(ordering)))
            .ok_or_else(|| operand_error(name))
    }
}

fn install_monadic(rt: &mut Runtime) {
    use ModeId as M;

    operator(rt, "-", &[M::INT], M::INT, |_: &mut Memory, args: &[Value]| match args {
        [Value::Int(n)] => n
            .checked_neg()
            .map(Value::Int)
            .ok_or_else(|| Diagnostic::access("integer overflow")),
        _ => Err(operand_error("-")),
    });
    operator(rt, "-", &[M::REAL], M::REAL, |_: &mut Memory, args: &[Value]| match args {
        [Value::Real(x)] => Ok(Value::Real(-x)),
        _ => Err(operand_error("-")),
    });
    operator(rt, "-", &[M::LONG_INT], M::LONG_INT, |_: &mut Memory, args: &[Value]| match args {
        [Value::LongInt(n)] => n
            .checked_neg()
            .map(Value::LongInt)
            .ok_or_else(|| Diagnostic::access("long integer overflow")),
        _ => Err(operand_error("-")),
    });
    operator(rt, "-", &[M::LONG_REAL], M::LONG_REAL, |_: &mut Memory, args: &[Value]| match args {
        [Value::LongReal(x)] => Ok(Value::LongReal(-x)),
        _ => Err(operand_error("-")),
    });
    for mode in [M::INT, M::REAL] {
        operator(rt, "+", &[mode], mode, |_: &mut Memory, args: &[Value]| match args {
            [value] => Ok(value.clone()),
            _ => Err(operand_error("+")),
        });
    }

    operator(rt, "ABS", &[M::INT], M::INT, |_: &mut Memory, args: &[Value]| match args {
        [Value::Int(n)] => n
            .checked_abs()
            .map(Value::Int)
            .ok_or_else(|| Diagnostic::access("integer overflow")),
        _ => Err(operand_error("ABS")),
    });
    operator(rt, "ABS", &[M::REAL], M::REAL, |_: &mut Memory, args: &[Value]| match args {
        [Value::Real(x)] => Ok(Value::Real(x.abs())),
        _ => Err(operand_error("ABS")),
    });
    operator(rt, "ABS", &[M::CHAR], M::INT, |_: &mut Memory, args: &[Value]| match args {
        [Value::Char(c)] => Ok(Value::Int(*c as i64)),
        _ => Err(operand_error("ABS")),
    });
    operator(rt, "ABS", &[M::BOOL], M::INT, |_: &mut Memory, args: &[Value]| match args {
        [Value::Bool(b)] => Ok(Value::Int(i64::from(*b))),
        _ => Err(operand_error("ABS")),
    });
    operator(rt, "ABS", &[M::BITS], M::INT, |_: &mut Memory, args: &[Value]| match args {
        [Value::Bits(bits)] => Ok(Value::Int(*bits as i64)),
        _ => Err(operand_error("ABS")),
    });
    operator(rt, "BIN", &[M::INT], M::BITS, |_: &mut Memory, args: &[Value]| match args {
        [Value::Int(n)] if *n >= 0 => Ok(Value::Bits(*n as u64)),
        [Value::Int(_)] => Err(Diagnostic::access("BIN of a negative integer")),
        _ => Err(operand_error("BIN")),
    });
    operator(rt, "NOT", &[M::BOOL], M::BOOL, |_: &mut Memory, args: &[Value]| match args {
        [Value::Bool(b)] => Ok(Value::Bool(!b)),
        _ => Err(operand_error("NOT")),
    });
    operator(rt, "NOT", &[M::BITS], M::BITS, |_: &mut Memory, args: &[Value]| match args {
        [Value::Bits(bits)] => Ok(Value::Bits(!bits)),
        _ => Err(operand_error("NOT")),
    });
    operator(rt, "ODD", &[M::INT], M::BOOL, |_: &mut Memory, args: &[Value]| match args {
        [Value::Int(n)] => Ok(Value::Bool(n % 2 != 0)),
        _ => Err(operand_error("ODD")),
    });
    operator(rt, "SIGN", &[M::INT], M::INT, |_: &mut Memory, args: &[Value]| match args {
        [Value::Int(n)] => Ok(Value::Int(n.signum())),
        _ => Err(operand_error("SIGN")),
    });
    operator(rt, "SIGN", &[M::REAL], M::INT, |_: &mut Memory, args: &[Value]| match args {
        [Value::Real(x)] if *x == 0.0 => Ok(Value::Int(0)),
        [Value::Real(x)] => Ok(Value::Int(x.signum() as i64)),
        _ => Err(operand_error("SIGN")),
    });
    operator(rt, "ENTIER", &[M::REAL], M::INT, |_: &mut Memory, args: &[Value]| match args {
        [Value::Real(x)] => real_to_int(x.floor()),
        _ => Err(operand_error("ENTIER")),
    });
    operator(rt, "ROUND", &[M::REAL], M::INT, |_: &mut Memory, args: &[Value]| match args {
        [Value::Real(x)] => real_to_int(x.round()),
        _ => Err(operand_error("ROUND")),
    });
    operator(rt, "LENG", &[M::INT], M::LONG_INT, |_: &mut Memory, args: &[Value]| match args {
        [Value::Int(n)] => Ok(Value::LongInt(*n as i128)),
        _ => Err(operand_error("LENG")),
    });
    operator(rt, "LENG", &[M::REAL], M::LONG_REAL, |_: &mut Memory, args: &[Value]| match args {
        [Value::Real(x)] => Ok(Value::LongReal(*x)),
        _ => Err(operand_error("LENG")),
    });
    operator(rt, "SHORTEN", &[M::LONG_INT], M::INT, |_: &mut Memory, args: &[Value]| match args {
        [Value::LongInt(n)] => i64::try_from(*n)
            .map(Value::Int)
            .map_err(|_| Diagnostic::access("SHORTEN of a value beyond max int")),
        _ => Err(operand_error("SHORTEN")),
    });
    operator(rt, "SHORTEN", &[M::LONG_REAL], M::REAL, |_: &mut Memory, args: &[Value]| match args {
        [Value::LongReal(x)] => Ok(Value::Real(*x)),
        _ => Err(operand_error("SHORTEN")),
    });
    operator(rt, "REPR", &[M::INT], M::CHAR, |_: &mut Memory, args: &[Value]| match args {
        [Value::Int(n)] => u32::try_from(*n)
            .ok()
            .and_then(char::from_u32)
            .map(Value::Char)
            .ok_or_else(|| Diagnostic::access(format!("REPR {n} is not a character"))),
        _ => Err(operand_error("REPR")),
    });

    let bounds: [(&'static str, fn(&RowDescriptor) -> i64); 3] = [
        ("LWB", |row| row.dimensions.first().map_or(1, |dim| dim.lower)),
        ("UPB", |row| row.dimensions.first().map_or(0, |dim| dim.upper)),
        ("ELEMS", |row| row.element_count() as i64),
    ];
    for (name, f) in bounds {
        operator(rt, name, &[M::ROWS], M::INT, move |memory: &mut Memory, args: &[Value]| {
            match args {
                [Value::Row(Some(address))] => Ok(Value::Int(f(&RowDescriptor::read(memory, *address)?))),
                [Value::Row(None)] => Ok(Value::Int(0)),
                _ => Err(operand_error(name)),
            }
        });
    }
}

fn install_strings(rt: &mut Runtime) {
    use ModeId as M;

    for params in [
        [M::STRING, M::STRING],
        [M::STRING, M::CHAR],
        [M::CHAR, M::STRING],
        [M::CHAR, M::CHAR],
    ] {
        operator(rt, "+", &params, M::STRING, |memory: &mut Memory, args: &[Value]| {
            let mut text = String::new();
            for arg in args {
                match arg {
                    Value::Row(descriptor) => text.push_str(&read_string(memory, *descriptor)?),
                    Value::Char(c) => text.push(*c),
                    _ => return Err(operand_error("+")),
                }
            }
            Ok(Value::Row(Some(alloc_string(memory, &text)?)))
        });
    }
}

/// `+:=` and friends: update the referenced value in place and yield the reference.
fn install_assigning(rt: &mut Runtime) {
    use ModeId as M;

    let ref_int = rt.modes.ref_to(M::INT);
    let ref_real = rt.modes.ref_to(M::REAL);

    let integer: [(&'static str, fn(i64, i64) -> Option<i64>); 3] = [
        ("+:=", i64::checked_add),
        ("-:=", i64::checked_sub),
        ("*:=", i64::checked_mul),
    ];
    for (name, f) in integer {
        operator(rt, name, &[ref_int, M::INT], ref_int, move |memory: &mut Memory, args: &[Value]| {
            match args {
                [Value::Ref(Some(address)), Value::Int(b)] => {
                    let a = i64::from_le_bytes(load_scalar(memory, *address, INT_SIZE)?);
                    let result = f(a, *b).ok_or_else(|| Diagnostic::access("integer overflow"))?;
                    store_scalar(memory, *address, result.to_le_bytes())?;
                    Ok(Value::Ref(Some(*address)))
                }
                [Value::Ref(None), _] => Err(Diagnostic::access("assignment through NIL")),
                _ => Err(operand_error(name)),
            }
        });
    }

    let real: [(&'static str, fn(f64, f64) -> f64); 4] = [
        ("+:=", |a, b| a + b),
        ("-:=", |a, b| a - b),
        ("*:=", |a, b| a * b),
        ("/:=", |a, b| a / b),
    ];
    for (name, f) in real {
        operator(rt, name, &[ref_real, M::REAL], ref_real, move |memory: &mut Memory, args: &[Value]| {
            match args {
                [Value::Ref(Some(address)), Value::Real(b)] => {
                    let a = f64::from_le_bytes(load_scalar(memory, *address, REAL_SIZE)?);
                    store_scalar(memory, *address, f(a, *b).to_le_bytes())?;
                    Ok(Value::Ref(Some(*address)))
                }
                [Value::Ref(None), _] => Err(Diagnostic::access("assignment through NIL")),
                _ => Err(operand_error(name)),
            }
        });
    }
}

fn install_identifiers(rt: &mut Runtime) {
    use ModeId as M;

    procedure(rt, "pi", &[], M::REAL, |_: &mut Memory, _: &[Value]| Ok(Value::Real(PI)));
    procedure(rt, "maxint", &[], M::INT, |_: &mut Memory, _: &[Value]| Ok(Value::Int(i64::MAX)));
    procedure(rt, "longmaxint", &[], M::LONG_INT, |_: &mut Memory, _: &[Value]| {
        Ok(Value::LongInt(i128::MAX))
    });
    procedure(rt, "maxreal", &[], M::REAL, |_: &mut Memory, _: &[Value]| Ok(Value::Real(f64::MAX)));
    procedure(rt, "smallreal", &[], M::REAL, |_: &mut Memory, _: &[Value]| {
        Ok(Value::Real(f64::EPSILON))
    });
    procedure(rt, "heaphandles", &[], M::INT, |memory: &mut Memory, _: &[Value]| {
        Ok(Value::Int(memory.handles().len() as i64))
    });

    let functions: [(&'static str, fn(f64) -> Option<f64>); 7] = [
        ("sqrt", |x| (x >= 0.0).then(|| x.sqrt())),
        ("exp", |x| Some(x.exp())),
        ("ln", |x| (x > 0.0).then(|| x.ln())),
        ("sin", |x| Some(x.sin())),
        ("cos", |x| Some(x.cos())),
        ("tan", |x| Some(x.tan())),
        ("arctan", |x| Some(x.atan())),
    ];
    for (name, f) in functions {
        procedure(rt, name, &[M::REAL], M::REAL, move |_: &mut Memory, args: &[Value]| {
            match args {
                [Value::Real(x)] => f(*x)
                    .map(Value::Real)
                    .ok_or_else(|| Diagnostic::access(format!("argument {x} is outside the domain of {name}"))),
                _ => Err(operand_error(name)),
            }
        });
    }
}

fn load_scalar(memory: &Memory, address: Address, size: usize) -> Result<[u8; 8], Diagnostic> {
    let bytes = memory.read(address, size)?;
    if bytes[0] & status::INIT == 0 {
        return Err(Diagnostic::access("value is uninitialised"));
    }
    let mut word = [0u8; 8];
    word.copy_from_slice(&bytes[1..9]);
    Ok(word)
}

fn store_scalar(memory: &mut Memory, address: Address, word: [u8; 8]) -> Result<(), Diagnostic> {
    let mut bytes = Vec::with_capacity(9);
    bytes.push(status::INIT);
    bytes.extend_from_slice(&word);
    memory.write(address, &bytes)
}

fn real_to_int(x: f64) -> Result<Value, Diagnostic> {
    if x.is_finite() && x >= i64::MIN as f64 && x < i64::MAX as f64 {
        Ok(Value::Int(x as i64))
    } else {
        Err(Diagnostic::access(format!("{x} is beyond max int")))
    }
}

fn shift(bits: u64, by: i64) -> u64 {
    match by {
        n if n >= 64 || n <= -64 => 0,
        n if n >= 0 => bits << n,
        n => bits >> -n,
    }
}

fn bool_and(a: bool, b: bool) -> bool {
    a && b
}

fn bool_or(a: bool, b: bool) -> bool {
    a || b
}

fn bool_xor(a: bool, b: bool) -> bool {
    a != b
}

fn bits_and(a: u64, b: u64) -> u64 {
    a & b
}

fn bits_or(a: u64, b: u64) -> u64 {
    a | b
}

fn bits_xor(a: u64, b: u64) -> u64 {
    a ^ b
}

fn operand_error(name: &str) -> Diagnostic {
    Diagnostic::semantic(format!("operands do not suit operator `{name}`"))
}
