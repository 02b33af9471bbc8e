//! Tree‑walking evaluator.
//!
//! Statements return a [`Flow`] describing how control leaves them; errors
//! travel separately through [`Result`], so an early `return` is never
//! mistaken for a failure.
//!
//! Variable references the resolver bound to a local are read at a fixed
//! scope distance; everything else is a global.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::mem;
use std::rc::Rc;

use log::{debug, info};

use crate::class::{ClassObject, Function, Instance, Member};
use crate::config::Config;
use crate::environment::{assign_at, get_at, Env, Environment};
use crate::error::{ReplitError, Result, RuntimeErrorKind};
use crate::expr::{BinaryOp, Expr, ExprId, Identifier, LiteralValue, LogicalOp, UnaryOp};
use crate::natives;
use crate::output::{Output, OutputSink};
use crate::stmt::{ClassDecl, Stmt, Visibility, CONSTRUCTOR};
use crate::token::Position;
use crate::value::Value;

/// How control leaves a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

pub struct Interpreter<S: OutputSink = Output> {
    globals: Env,
    environment: Env,
    locals: HashMap<ExprId, usize>,
    /// Class whose code is executing; the subject of access checks.
    current_class: Option<Rc<ClassObject>>,
    call_depth: usize,
    config: Config,
    sink: S,
}

impl Interpreter<Output> {
    /// Interpreter capturing its output in memory.
    pub fn new() -> Self {
        Self::with_sink(Output::new(), Config::default())
    }
}

impl Default for Interpreter<Output> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: OutputSink> Interpreter<S> {
    pub fn with_sink(sink: S, config: Config) -> Self {
        info!("Initializing Interpreter");

        let mut globals: Environment = Environment::new();
        natives::install(&mut globals);

        let globals: Env = Rc::new(RefCell::new(globals));

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            current_class: None,
            call_depth: 0,
            config,
            sink,
        }
    }

    /// Record the scope depths found by the resolver.
    pub fn resolve(&mut self, locals: HashMap<ExprId, usize>) {
        debug!("Recording {} resolved local(s)", locals.len());
        self.locals.extend(locals);
    }

    pub fn globals(&self) -> &Env {
        &self.globals
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Runs a program.  Execution resumes at the global scope even when a
    /// previous run stopped on an error.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        debug!("Interpreting {} statements", statements.len());

        self.environment = Rc::clone(&self.globals);
        self.current_class = None;
        self.call_depth = 0;

        for stmt in statements {
            self.execute(stmt)?;
        }

        info!("Interpretation completed successfully");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────────

    pub fn execute(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(Flow::Normal)
            }

            Stmt::Print { values, .. } => {
                let mut parts: Vec<String> = Vec::with_capacity(values.len());
                for expr in values {
                    parts.push(self.evaluate(expr)?.to_string());
                }

                let line: String = parts.join(" ");
                debug!("Printing: {}", line);
                self.sink.emit(&line)?;

                Ok(Flow::Normal)
            }

            Stmt::Var {
                name, initializer, ..
            } => {
                let value: Value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Defining variable '{}' = {}", name.name, value);
                self.environment.borrow_mut().define(&name.name, value);

                Ok(Flow::Normal)
            }

            Stmt::Block(statements) => {
                let env: Env = Environment::child(&self.environment);
                self.execute_block(statements, env)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let value: Value = self.evaluate(condition)?;

                if self.condition(&value, condition.position())? {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While { condition, body } => {
                loop {
                    let value: Value = self.evaluate(condition)?;
                    if !self.condition(&value, condition.position())? {
                        break;
                    }

                    match self.execute(body)? {
                        Flow::Break => break,
                        Flow::Normal | Flow::Continue => {}
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }

                Ok(Flow::Normal)
            }

            Stmt::For {
                initializer,
                condition,
                increment,
                body,
            } => {
                let env: Env = Environment::child(&self.environment);

                self.with_environment(env, |this| {
                    if let Some(init) = initializer {
                        this.execute(init)?;
                    }

                    loop {
                        if let Some(condition) = condition {
                            let value: Value = this.evaluate(condition)?;
                            if !this.condition(&value, condition.position())? {
                                break;
                            }
                        }

                        match this.execute(body)? {
                            Flow::Break => break,
                            Flow::Normal | Flow::Continue => {}
                            flow @ Flow::Return(_) => return Ok(flow),
                        }

                        if let Some(increment) = increment {
                            this.evaluate(increment)?;
                        }
                    }

                    Ok(Flow::Normal)
                })
            }

            Stmt::Function(decl) => {
                debug!("Defining function '{}'", decl.name.name);

                let function: Function = Function::new(
                    Rc::clone(decl),
                    Rc::clone(&self.environment),
                    self.current_class.as_ref().map(Rc::downgrade),
                );

                self.environment
                    .borrow_mut()
                    .define(&decl.name.name, Value::Function(Rc::new(function)));

                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                Ok(Flow::Return(value))
            }

            Stmt::Break(_) => Ok(Flow::Break),

            Stmt::Continue(_) => Ok(Flow::Continue),

            Stmt::Class(decl) => {
                self.declare_class(decl)?;
                Ok(Flow::Normal)
            }
        }
    }

    /// Run `statements` in `env`, restoring the current scope afterwards
    /// even if a statement fails.
    pub fn execute_block(&mut self, statements: &[Stmt], env: Env) -> Result<Flow> {
        self.with_environment(env, |this| {
            for stmt in statements {
                match this.execute(stmt)? {
                    Flow::Normal => {}
                    flow => return Ok(flow),
                }
            }

            Ok(Flow::Normal)
        })
    }

    fn with_environment<T>(
        &mut self,
        env: Env,
        body: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let previous: Env = mem::replace(&mut self.environment, env);
        let result: Result<T> = body(self);
        self.environment = previous;
        result
    }

    fn declare_class(&mut self, decl: &Rc<ClassDecl>) -> Result<()> {
        debug!("Declaring class '{}'", decl.name.name);

        let superclass: Option<Rc<ClassObject>> = match &decl.superclass {
            Some(parent) => match self.look_up_variable(parent.id, &parent.name)? {
                Value::Class(class) => Some(class),
                other => {
                    return Err(ReplitError::runtime(
                        RuntimeErrorKind::Type,
                        parent.name.position,
                        format!("Superclass must be a class, got {}", other.type_name()),
                    ));
                }
            },
            None => None,
        };

        let method_scope: Env = match &superclass {
            Some(parent) => {
                let env: Env = Environment::child(&self.environment);
                env.borrow_mut()
                    .define("super", Value::Class(Rc::clone(parent)));
                env
            }
            None => Rc::clone(&self.environment),
        };

        let class: Rc<ClassObject> = ClassObject::new(
            Rc::clone(decl),
            superclass,
            Rc::clone(&self.environment),
            method_scope,
        );

        self.environment
            .borrow_mut()
            .define(&decl.name.name, Value::Class(class));

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────────

    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal { value, .. } => Ok(match value {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::Bool(b) => Value::Bool(*b),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary {
                operator,
                right,
                position,
            } => {
                let value: Value = self.evaluate(right)?;

                match operator {
                    UnaryOp::Negate => match value {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        other => Err(type_error(
                            *position,
                            format!("Operand of '-' must be a number, got {}", other.type_name()),
                        )),
                    },
                    UnaryOp::Not => Ok(Value::Bool(!self.condition(&value, *position)?)),
                }
            }

            Expr::Binary {
                left,
                operator,
                right,
                position,
            } => {
                let left: Value = self.evaluate(left)?;
                let right: Value = self.evaluate(right)?;

                binary(*operator, left, right, *position)
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let value: Value = self.evaluate(left)?;
                let truthy: bool = self.condition(&value, left.position())?;

                let short_circuits: bool = match operator {
                    LogicalOp::Or => truthy,
                    LogicalOp::And => !truthy,
                };

                if short_circuits {
                    Ok(value)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(*id, name),

            Expr::Assign { id, name, value } => {
                let value: Value = self.evaluate(value)?;

                let assigned: bool = match self.locals.get(id) {
                    Some(depth) => assign_at(&self.environment, *depth, &name.name, value.clone()),
                    None => self
                        .globals
                        .borrow_mut()
                        .assign_here(&name.name, value.clone()),
                };

                if !assigned {
                    return Err(undefined_variable(name));
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                position,
                arguments,
            } => {
                let callee: Value = self.evaluate(callee)?;

                let mut args: Vec<Value> = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    args.push(self.evaluate(arg)?);
                }

                self.call(callee, args, *position)
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => self.get_property(&instance, name),
                other => Err(type_error(
                    name.position,
                    format!(
                        "Only instances have properties, tried to read '{}' on {}",
                        name.name,
                        other.type_name()
                    ),
                )),
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let instance: Rc<Instance> = match self.evaluate(object)? {
                    Value::Instance(instance) => instance,
                    other => {
                        return Err(type_error(
                            name.position,
                            format!("Only instances have fields, got {}", other.type_name()),
                        ));
                    }
                };

                let value: Value = self.evaluate(value)?;

                if let Some(member) = instance.class.field(&name.name) {
                    self.check_access(member, &name.name, "field", name.position)?;
                }

                instance.set(&name.name, value.clone());
                Ok(value)
            }

            Expr::Index {
                object,
                index,
                position,
            } => {
                let object: Value = self.evaluate(object)?;
                let index: Value = self.evaluate(index)?;

                read_index(&object, &index, *position)
            }

            Expr::SetIndex {
                object,
                index,
                value,
                position,
            } => {
                let object: Value = self.evaluate(object)?;
                let index: Value = self.evaluate(index)?;
                let value: Value = self.evaluate(value)?;

                write_index(&object, &index, value.clone(), *position)?;
                Ok(value)
            }

            Expr::Array { elements, .. } => {
                let mut items: Vec<Value> = Vec::with_capacity(elements.len());
                for element in elements {
                    items.push(self.evaluate(element)?);
                }

                Ok(Value::array(items))
            }

            Expr::Map { entries, .. } => {
                let mut map: BTreeMap<String, Value> = BTreeMap::new();

                for (key, value) in entries {
                    let key_value: Value = self.evaluate(key)?;
                    let key: String = match key_value {
                        Value::String(s) => s,
                        other => {
                            return Err(type_error(
                                key.position(),
                                format!("Map keys must be strings, got {}", other.type_name()),
                            ));
                        }
                    };

                    let value: Value = self.evaluate(value)?;
                    map.insert(key, value);
                }

                Ok(Value::map(map))
            }

            Expr::This { id, position } => self
                .locals
                .get(id)
                .and_then(|depth| get_at(&self.environment, *depth, "this"))
                .ok_or_else(|| {
                    ReplitError::runtime(
                        RuntimeErrorKind::Reference,
                        *position,
                        "'this' is not bound here",
                    )
                }),

            Expr::Super {
                id,
                position,
                method,
            } => self.super_method(*id, *position, method),

            Expr::Lambda(decl) => {
                let function: Function = Function::new(
                    Rc::clone(decl),
                    Rc::clone(&self.environment),
                    self.current_class.as_ref().map(Rc::downgrade),
                );

                Ok(Value::Function(Rc::new(function)))
            }
        }
    }

    /// Conditions accept booleans and `nil`.
    fn condition(&self, value: &Value, position: Position) -> Result<bool> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::Nil => Ok(false),
            other => Err(type_error(
                position,
                format!("Condition must be a boolean, got {}", other.type_name()),
            )),
        }
    }

    fn look_up_variable(&self, id: ExprId, name: &Identifier) -> Result<Value> {
        let found: Option<Value> = match self.locals.get(&id) {
            Some(depth) => get_at(&self.environment, *depth, &name.name),
            None => self.globals.borrow().get_here(&name.name),
        };

        found.ok_or_else(|| undefined_variable(name))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Calls
    // ─────────────────────────────────────────────────────────────────────────

    fn call(&mut self, callee: Value, args: Vec<Value>, position: Position) -> Result<Value> {
        match callee {
            Value::NativeFunction { name, arity, func } => {
                check_arity(arity, args.len(), position)?;

                debug!("Calling native function '{}'", name);
                func(&args).map_err(|message| type_error(position, message))
            }

            Value::Function(function) => self.call_function(&function, args, position),

            Value::Class(class) => self.instantiate(&class, args, position),

            other => Err(type_error(
                position,
                format!("Can only call functions and classes, got {}", other.type_name()),
            )),
        }
    }

    /// Calls a user function: parameters live in a fresh scope whose parent
    /// is the function's closure.
    pub fn call_function(
        &mut self,
        function: &Rc<Function>,
        args: Vec<Value>,
        position: Position,
    ) -> Result<Value> {
        check_arity(function.arity(), args.len(), position)?;

        if self.call_depth >= self.config.max_call_depth {
            return Err(ReplitError::runtime(
                RuntimeErrorKind::StackOverflow,
                position,
                format!(
                    "Maximum call depth of {} exceeded in '{}'",
                    self.config.max_call_depth,
                    function.name()
                ),
            ));
        }

        debug!("Calling '{}' with {} argument(s)", function.name(), args.len());

        let env: Env = Environment::child(&function.closure);
        {
            let mut scope = env.borrow_mut();
            for (param, arg) in function.decl.params.iter().zip(args) {
                scope.define(&param.name.name, arg);
            }
        }

        self.call_depth += 1;
        let previous_class: Option<Rc<ClassObject>> =
            mem::replace(&mut self.current_class, function.class_context());

        let result: Result<Flow> = self.execute_block(&function.decl.body, env);

        self.current_class = previous_class;
        self.call_depth -= 1;

        let flow: Flow = result?;

        if function.is_initializer {
            return Ok(function
                .closure
                .borrow()
                .get_here("this")
                .unwrap_or(Value::Nil));
        }

        match flow {
            Flow::Return(value) => Ok(value),
            _ => Ok(Value::Nil),
        }
    }

    /// `Class(args)`: fields first (root ancestor down), then `init`.
    fn instantiate(
        &mut self,
        class: &Rc<ClassObject>,
        args: Vec<Value>,
        position: Position,
    ) -> Result<Value> {
        debug!("Instantiating class '{}'", class.name);

        check_arity(class.arity(), args.len(), position)?;

        let init = class.find_method(CONSTRUCTOR).cloned();
        if let Some(init) = &init {
            self.check_access(&init.member, CONSTRUCTOR, "constructor", position)?;
        }

        let instance: Rc<Instance> = Rc::new(Instance::new(Rc::clone(class)));

        for ancestor in class.lineage() {
            self.initialize_fields(&ancestor, &instance)?;
        }

        if let Some(init) = init {
            let bound: Rc<Function> = Rc::new(init.function.bind(Rc::clone(&instance)));
            self.call_function(&bound, args, position)?;
        }

        Ok(Value::Instance(instance))
    }

    fn initialize_fields(&mut self, class: &Rc<ClassObject>, instance: &Rc<Instance>) -> Result<()> {
        let previous_class: Option<Rc<ClassObject>> =
            mem::replace(&mut self.current_class, Some(Rc::clone(class)));

        let result: Result<()> = self.with_environment(Rc::clone(&class.closure), |this| {
            for field in &class.decl.fields {
                let value: Value = match &field.initializer {
                    Some(expr) => this.evaluate(expr)?,
                    None => Value::Nil,
                };

                instance.set(&field.name.name, value);
            }

            Ok(())
        });

        self.current_class = previous_class;
        result
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Members
    // ─────────────────────────────────────────────────────────────────────────

    /// Fields shadow methods; methods come back bound to `instance`.
    fn get_property(&self, instance: &Rc<Instance>, name: &Identifier) -> Result<Value> {
        if let Some(value) = instance.get(&name.name) {
            if let Some(member) = instance.class.field(&name.name) {
                self.check_access(member, &name.name, "field", name.position)?;
            }
            return Ok(value);
        }

        if let Some(method) = instance.class.find_method(&name.name) {
            self.check_access(&method.member, &name.name, "method", name.position)?;

            let bound: Function = method.function.bind(Rc::clone(instance));
            return Ok(Value::Function(Rc::new(bound)));
        }

        Err(ReplitError::runtime(
            RuntimeErrorKind::Reference,
            name.position,
            format!(
                "Undefined property '{}' on {} instance",
                name.name, instance.class.name
            ),
        ))
    }

    /// `super.method`: looked up from the superclass of the class whose
    /// method contains the expression, bound to the current `this`.
    fn super_method(&self, id: ExprId, position: Position, method: &Identifier) -> Result<Value> {
        let unbound = || {
            ReplitError::runtime(
                RuntimeErrorKind::Reference,
                position,
                "'super' is not bound here",
            )
        };

        let depth: usize = *self.locals.get(&id).ok_or_else(unbound)?;

        let superclass: Rc<ClassObject> = match get_at(&self.environment, depth, "super") {
            Some(Value::Class(class)) => class,
            _ => return Err(unbound()),
        };

        // `this` lives in the scope just inside the one holding `super`
        let instance: Rc<Instance> = match depth
            .checked_sub(1)
            .and_then(|d| get_at(&self.environment, d, "this"))
        {
            Some(Value::Instance(instance)) => instance,
            _ => return Err(unbound()),
        };

        let found = superclass.find_method(&method.name).ok_or_else(|| {
            ReplitError::runtime(
                RuntimeErrorKind::Reference,
                method.position,
                format!(
                    "Undefined method '{}' on superclass {}",
                    method.name, superclass.name
                ),
            )
        })?;

        self.check_access(&found.member, &method.name, "method", method.position)?;

        Ok(Value::Function(Rc::new(found.function.bind(instance))))
    }

    /// Private members are reachable from their declaring class only,
    /// protected ones from it and its subclasses.
    fn check_access(&self, member: &Member, name: &str, what: &str, position: Position) -> Result<()> {
        if member.visibility == Visibility::Public {
            return Ok(());
        }

        let owner: Option<Rc<ClassObject>> = member.owner.upgrade();

        let allowed: bool = match (&self.current_class, &owner) {
            (Some(current), Some(owner)) => match member.visibility {
                Visibility::Private => Rc::ptr_eq(current, owner),
                _ => current.is_subclass_of(owner),
            },
            _ => false,
        };

        if allowed {
            return Ok(());
        }

        let owner_name: &str = owner.as_deref().map_or("<unknown>", |class| class.name.as_str());

        Err(ReplitError::runtime(
            RuntimeErrorKind::Access,
            position,
            format!(
                "Cannot access {} {} '{}' of class {}",
                member.visibility, what, name, owner_name
            ),
        ))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Operators
// ─────────────────────────────────────────────────────────────────────────────

fn binary(operator: BinaryOp, left: Value, right: Value, position: Position) -> Result<Value> {
    match operator {
        BinaryOp::Equal => return Ok(Value::Bool(left.equals(&right))),
        BinaryOp::NotEqual => return Ok(Value::Bool(!left.equals(&right))),
        _ => {}
    }

    match (&left, &right) {
        (Value::Number(a), Value::Number(b)) => {
            let (a, b) = (*a, *b);

            let value: Value = match operator {
                BinaryOp::Add => Value::Number(a + b),
                BinaryOp::Subtract => Value::Number(a - b),
                BinaryOp::Multiply => Value::Number(a * b),
                BinaryOp::Divide | BinaryOp::Remainder if b == 0.0 => {
                    return Err(ReplitError::runtime(
                        RuntimeErrorKind::Arithmetic,
                        position,
                        "Division by zero",
                    ));
                }
                BinaryOp::Divide => Value::Number(a / b),
                BinaryOp::Remainder => Value::Number(a % b),
                BinaryOp::Less => Value::Bool(a < b),
                BinaryOp::LessEqual => Value::Bool(a <= b),
                BinaryOp::Greater => Value::Bool(a > b),
                BinaryOp::GreaterEqual => Value::Bool(a >= b),
                BinaryOp::Equal => Value::Bool(a == b),
                BinaryOp::NotEqual => Value::Bool(a != b),
            };

            Ok(value)
        }

        (Value::String(a), Value::String(b)) if operator != BinaryOp::Add => match operator {
            BinaryOp::Less => Ok(Value::Bool(a < b)),
            BinaryOp::LessEqual => Ok(Value::Bool(a <= b)),
            BinaryOp::Greater => Ok(Value::Bool(a > b)),
            BinaryOp::GreaterEqual => Ok(Value::Bool(a >= b)),
            _ => Err(operand_error(operator, &left, &right, position)),
        },

        (Value::String(_), _) | (_, Value::String(_)) if operator == BinaryOp::Add => {
            match (left.concat_text(), right.concat_text()) {
                (Some(mut a), Some(b)) => {
                    a.push_str(&b);
                    Ok(Value::String(a))
                }
                _ => Err(operand_error(operator, &left, &right, position)),
            }
        }

        _ => Err(operand_error(operator, &left, &right, position)),
    }
}

fn operand_error(operator: BinaryOp, left: &Value, right: &Value, position: Position) -> ReplitError {
    let expected: &str = match operator {
        BinaryOp::Add => "two numbers, or a string and a printable value",
        BinaryOp::Less | BinaryOp::LessEqual | BinaryOp::Greater | BinaryOp::GreaterEqual => {
            "two numbers or two strings"
        }
        _ => "two numbers",
    };

    type_error(
        position,
        format!(
            "Operands of '{}' must be {}, got {} and {}",
            operator,
            expected,
            left.type_name(),
            right.type_name()
        ),
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Indexing
// ─────────────────────────────────────────────────────────────────────────────

fn array_slot(index: &Value, len: usize, position: Position) -> Result<usize> {
    let n: f64 = match index {
        Value::Number(n) => *n,
        other => {
            return Err(type_error(
                position,
                format!("Array index must be a number, got {}", other.type_name()),
            ));
        }
    };

    if n.fract() != 0.0 || n < 0.0 || n >= len as f64 {
        return Err(ReplitError::runtime(
            RuntimeErrorKind::Reference,
            position,
            format!("Index {} out of bounds for length {}", Value::Number(n), len),
        ));
    }

    Ok(n as usize)
}

fn map_key(index: &Value, position: Position) -> Result<&str> {
    match index {
        Value::String(key) => Ok(key),
        other => Err(type_error(
            position,
            format!("Map keys must be strings, got {}", other.type_name()),
        )),
    }
}

fn read_index(object: &Value, index: &Value, position: Position) -> Result<Value> {
    match object {
        Value::Array(items) => {
            let items = items.borrow();
            let slot: usize = array_slot(index, items.len(), position)?;
            Ok(items[slot].clone())
        }

        Value::Map(entries) => {
            let key: &str = map_key(index, position)?;
            entries.borrow().get(key).cloned().ok_or_else(|| {
                ReplitError::runtime(
                    RuntimeErrorKind::Reference,
                    position,
                    format!("Undefined key {:?}", key),
                )
            })
        }

        Value::String(s) => {
            let len: usize = s.chars().count();
            let slot: usize = array_slot(index, len, position)?;
            Ok(Value::String(
                s.chars().nth(slot).map(String::from).unwrap_or_default(),
            ))
        }

        other => Err(type_error(
            position,
            format!("Only arrays, maps and strings can be indexed, got {}", other.type_name()),
        )),
    }
}

fn write_index(object: &Value, index: &Value, value: Value, position: Position) -> Result<()> {
    match object {
        Value::Array(items) => {
            let mut items = items.borrow_mut();
            let slot: usize = array_slot(index, items.len(), position)?;
            items[slot] = value;
            Ok(())
        }

        Value::Map(entries) => {
            let key: &str = map_key(index, position)?;
            entries.borrow_mut().insert(key.to_string(), value);
            Ok(())
        }

        other => Err(type_error(
            position,
            format!("Only arrays and maps support index assignment, got {}", other.type_name()),
        )),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Error helpers
// ─────────────────────────────────────────────────────────────────────────────

fn type_error<S: Into<String>>(position: Position, message: S) -> ReplitError {
    ReplitError::runtime(RuntimeErrorKind::Type, position, message)
}

fn undefined_variable(name: &Identifier) -> ReplitError {
    ReplitError::runtime(
        RuntimeErrorKind::Reference,
        name.position,
        format!("Undefined variable '{}'", name.name),
    )
}

fn check_arity(expected: usize, got: usize, position: Position) -> Result<()> {
    if expected == got {
        return Ok(());
    }

    Err(ReplitError::runtime(
        RuntimeErrorKind::Arity,
        position,
        format!("Expected {} argument(s) but got {}", expected, got),
    ))
}
