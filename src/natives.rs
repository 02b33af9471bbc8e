//! Built‑in global functions.

use std::time::{SystemTime, SystemTimeError, UNIX_EPOCH};

use log::debug;

use crate::environment::Environment;
use crate::value::{NativeFn, Value};

/// `(name, arity, implementation)` for every built‑in.
pub const NATIVES: &[(&str, usize, NativeFn)] = &[
    ("clock", 0, clock),
    ("len", 1, len),
    ("str", 1, to_str),
    ("push", 2, push),
    ("type_of", 1, type_of),
];

/// Names visible as globals before any program runs.
pub fn names() -> impl Iterator<Item = &'static str> {
    NATIVES.iter().map(|(name, _, _)| *name)
}

/// Define every built‑in in `globals`.
pub fn install(globals: &mut Environment) {
    for &(name, arity, func) in NATIVES {
        debug!("Defining native function '{}'", name);

        globals.define(name, Value::NativeFunction { name, arity, func });
    }
}

fn clock(_args: &[Value]) -> Result<Value, String> {
    let timestamp: f64 = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e: SystemTimeError| format!("Clock error: {}", e))?
        .as_secs_f64();

    Ok(Value::Number(timestamp))
}

fn len(args: &[Value]) -> Result<Value, String> {
    let n: usize = match &args[0] {
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items.borrow().len(),
        Value::Map(entries) => entries.borrow().len(),
        other => return Err(format!("len() expects a string, array or map, got {}", other.type_name())),
    };

    Ok(Value::Number(n as f64))
}

fn to_str(args: &[Value]) -> Result<Value, String> {
    Ok(Value::String(args[0].to_string()))
}

fn push(args: &[Value]) -> Result<Value, String> {
    match &args[0] {
        Value::Array(items) => {
            items.borrow_mut().push(args[1].clone());
            Ok(Value::Number(items.borrow().len() as f64))
        }
        other => Err(format!("push() expects an array, got {}", other.type_name())),
    }
}

fn type_of(args: &[Value]) -> Result<Value, String> {
    Ok(Value::String(args[0].type_name().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_appends_and_reports_length() {
        let items = Value::array(vec![Value::Number(1.0)]);

        let result = push(&[items.clone(), Value::Bool(true)]);

        assert_eq!(result, Ok(Value::Number(2.0)));
        assert_eq!(items.to_string(), "[1, true]");
    }

    #[test]
    fn len_counts_characters_not_bytes() {
        let result = len(&[Value::String("héllo".to_string())]);
        assert_eq!(result, Ok(Value::Number(5.0)));
    }

    #[test]
    fn len_rejects_numbers() {
        assert!(len(&[Value::Number(3.0)]).is_err());
    }
}
