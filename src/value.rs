use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::class::{ClassObject, Function, Instance};

/// Signature of a built‑in function. The error string becomes a `TypeError`.
pub type NativeFn = fn(&[Value]) -> Result<Value, String>;

#[derive(Debug, Clone)]
pub enum Value {
    NativeFunction {
        name: &'static str,
        arity: usize,
        func: NativeFn,
    },
    Function(Rc<Function>),
    Class(Rc<ClassObject>),
    Instance(Rc<Instance>),
    Array(Rc<RefCell<Vec<Value>>>),
    Map(Rc<RefCell<BTreeMap<String, Value>>>),
    Number(f64),
    String(String),
    Bool(bool),
    Nil,
}

impl Value {
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn map(entries: BTreeMap<String, Value>) -> Self {
        Value::Map(Rc::new(RefCell::new(entries)))
    }

    /// Name of the value's kind, used in diagnostics and `type_of`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::NativeFunction { .. } | Value::Function(_) => "function",
            Value::Class(_) => "class",
            Value::Instance(_) => "instance",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Bool(_) => "bool",
            Value::Nil => "nil",
        }
    }

    /// Equality as seen by `==`: scalars by value, everything that lives
    /// on the heap by identity.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Nil, Value::Nil) => true,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b),
            (Value::NativeFunction { name: a, .. }, Value::NativeFunction { name: b, .. }) => a == b,
            _ => false,
        }
    }

    /// Operand form for string concatenation; `None` for kinds that do not
    /// concatenate implicitly.
    pub fn concat_text(&self) -> Option<String> {
        match self {
            Value::String(s) => Some(s.clone()),
            Value::Number(_) | Value::Bool(_) | Value::Nil => Some(self.to_string()),
            _ => None,
        }
    }

    /// Display form used inside containers: strings are quoted.
    /// `open` holds the containers currently being written; meeting one of
    /// them again prints `[...]` or `{...}` instead of recursing.
    fn write_nested(&self, f: &mut fmt::Formatter<'_>, open: &mut Vec<*const ()>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            other => other.write_value(f, open),
        }
    }

    fn write_value(&self, f: &mut fmt::Formatter<'_>, open: &mut Vec<*const ()>) -> fmt::Result {
        match self {
            Value::Array(items) => {
                let id: *const () = Rc::as_ptr(items).cast();
                if open.contains(&id) {
                    return f.write_str("[...]");
                }

                open.push(id);
                f.write_str("[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    item.write_nested(f, open)?;
                }
                open.pop();
                f.write_str("]")
            }

            Value::Map(entries) => {
                let id: *const () = Rc::as_ptr(entries).cast();
                if open.contains(&id) {
                    return f.write_str("{...}");
                }

                open.push(id);
                f.write_str("{")?;
                for (i, (key, value)) in entries.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{:?}: ", key)?;
                    value.write_nested(f, open)?;
                }
                open.pop();
                f.write_str("}")
            }

            other => write!(f, "{}", other),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

/// Formats a number the way `print` shows it: integral values without a
/// fractional part (`8`, not `8.0`).
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        let mut buf: itoa::Buffer = itoa::Buffer::new();
        let digits: &str = buf.format(n as i64);

        if n == 0.0 && n.is_sign_negative() {
            "-0".to_string()
        } else {
            digits.to_string()
        }
    } else {
        n.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::NativeFunction { name, .. } => write!(f, "<native fn {}>", name),

            Value::Function(function) => write!(f, "<fn {}>", function.name()),

            Value::Class(class) => write!(f, "<class {}>", class.name),

            Value::Instance(instance) => write!(f, "<{} instance>", instance.class.name),

            Value::Array(_) | Value::Map(_) => self.write_value(f, &mut Vec::new()),

            Value::Number(n) => f.write_str(&format_number(*n)),

            Value::String(s) => write!(f, "{}", s),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Nil => write!(f, "nil"),
        }
    }
}
