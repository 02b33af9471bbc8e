//! Static resolver pass for the **Replit language**.
//!
//! This resolver does four things in one AST walk:
//! 1. Build lexical scopes (stack of `HashMap<String,bool>` tracking declared/defined).
//! 2. Report static errors (undeclared names, redeclaration, forward‑read in
//!    initializer, misplaced `return`/`break`/`continue`/`this`/`super`).
//! 3. Check class graphs: no inheritance cycles, every `override` has an
//!    ancestor method to replace.
//! 4. Record, for *each* variable/`this`/`super` occurrence that binds to a
//!    local, the number of scopes between use and declaration.
//!
//! Resolution is transactional: the resolver works on a copy of the engine's
//! [`StaticGlobals`] and hands back an updated copy, so a program that fails
//! to resolve leaves no trace.

use std::collections::{HashMap, HashSet};

use log::{debug, info};

use crate::error::{ReplitError, Result};
use crate::expr::{Expr, ExprId, Identifier};
use crate::natives;
use crate::stmt::{ClassDecl, FunctionDecl, MethodModifier, Stmt, CONSTRUCTOR};
use crate::token::Position;

/// What kind of function body are we in?  Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Method,
    Initializer,
}

/// Are we inside a class body?  Used to validate `this` and `super`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

/// Statically known shape of a class: enough to check `override`
/// annotations and inheritance cycles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ClassShape {
    superclass: Option<String>,
    methods: HashSet<String>,
}

/// Globals declared so far, natives included.  Persists across the
/// programs run by one engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticGlobals {
    names: HashSet<String>,
    classes: HashMap<String, ClassShape>,
}

impl Default for StaticGlobals {
    fn default() -> Self {
        Self {
            names: natives::names().map(str::to_string).collect(),
            classes: HashMap::new(),
        }
    }
}

impl StaticGlobals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }
}

/// Output of a successful resolve pass.
#[derive(Debug)]
pub struct Resolution {
    /// Scope depth of every local variable reference.
    pub locals: HashMap<ExprId, usize>,

    /// Global table to commit once the program is accepted.
    pub globals: StaticGlobals,
}

pub struct Resolver {
    globals: StaticGlobals,
    /// Top‑level names of the program being resolved; function bodies may
    /// refer to them before their declaration runs.
    hoisted: HashSet<String>,
    scopes: Vec<HashMap<String, bool>>, // false=declared, true=defined
    /// Shapes of classes declared in each entry of `scopes`.
    local_classes: Vec<HashMap<String, ClassShape>>,
    locals: HashMap<ExprId, usize>,
    current_function: FunctionType,
    current_class: ClassType,
    loop_depth: usize,
}

impl Resolver {
    /// Create a resolver seeded with the globals committed so far.
    pub fn new(globals: &StaticGlobals) -> Self {
        info!("Resolver instantiated");

        Resolver {
            globals: globals.clone(),
            hoisted: HashSet::new(),
            scopes: Vec::new(),
            local_classes: Vec::new(),
            locals: HashMap::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            loop_depth: 0,
        }
    }

    /// Walk all top‑level statements.
    pub fn resolve(mut self, statements: &[Stmt]) -> Result<Resolution> {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        for stmt in statements {
            match stmt {
                Stmt::Var { name, .. } => self.hoisted.insert(name.name.clone()),
                Stmt::Function(decl) => self.hoisted.insert(decl.name.name.clone()),
                Stmt::Class(decl) => self.hoisted.insert(decl.name.name.clone()),
                _ => false,
            };
        }

        for stmt in statements {
            self.resolve_stmt(stmt)?;
        }

        info!("Resolved {} local binding(s)", self.locals.len());

        Ok(Resolution {
            locals: self.locals,
            globals: self.globals,
        })
    }

    /// Resolve a lone expression evaluated at top level.
    pub fn resolve_expression(mut self, expr: &Expr) -> Result<Resolution> {
        self.resolve_expr(expr)?;

        Ok(Resolution {
            locals: self.locals,
            globals: self.globals,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Class(decl) => self.resolve_class(decl)?,

            Stmt::Block(statements) => {
                self.begin_scope();
                let result: Result<()> = self.resolve_stmts(statements);
                self.end_scope();
                result?;
            }

            Stmt::Var {
                name, initializer, ..
            } if self.scopes.is_empty() => {
                // a global becomes visible once its initializer has run
                if let Some(expr) = initializer {
                    self.resolve_expr(expr)?;
                }
                self.declare(name)?;
            }

            Stmt::Var {
                name, initializer, ..
            } => {
                // declare → resolve initializer → define
                self.declare(name)?;
                if let Some(expr) = initializer {
                    self.resolve_expr(expr)?;
                }
                self.define(name);
            }

            Stmt::Function(decl) => {
                // the name is visible inside its own body
                self.declare(&decl.name)?;
                self.define(&decl.name);
                self.resolve_function(decl, FunctionType::Function)?;
            }

            Stmt::Expression(expr) => self.resolve_expr(expr)?,

            Stmt::Print { values, .. } => {
                for value in values {
                    self.resolve_expr(value)?;
                }
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition)?;
                self.resolve_stmt(then_branch)?;
                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb)?;
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition)?;
                self.resolve_loop_body(body)?;
            }

            Stmt::For {
                initializer,
                condition,
                increment,
                body,
            } => {
                // one scope holds the loop variable for every iteration
                self.begin_scope();
                let result: Result<()> = self.resolve_for(
                    initializer.as_deref(),
                    condition.as_ref(),
                    increment.as_ref(),
                    body,
                );
                self.end_scope();
                result?;
            }

            Stmt::Return { keyword, value } => {
                match self.current_function {
                    FunctionType::None => {
                        return Err(ReplitError::resolve(
                            *keyword,
                            "Can't return from top-level code",
                        ));
                    }
                    FunctionType::Initializer if value.is_some() => {
                        return Err(ReplitError::resolve(
                            *keyword,
                            "Can't return a value from an initializer",
                        ));
                    }
                    _ => {}
                }

                if let Some(expr) = value {
                    self.resolve_expr(expr)?;
                }
            }

            Stmt::Break(keyword) => {
                if self.loop_depth == 0 {
                    return Err(ReplitError::resolve(*keyword, "Can't use 'break' outside of a loop"));
                }
            }

            Stmt::Continue(keyword) => {
                if self.loop_depth == 0 {
                    return Err(ReplitError::resolve(
                        *keyword,
                        "Can't use 'continue' outside of a loop",
                    ));
                }
            }
        }

        Ok(())
    }

    fn resolve_stmts(&mut self, statements: &[Stmt]) -> Result<()> {
        for stmt in statements {
            self.resolve_stmt(stmt)?;
        }
        Ok(())
    }

    fn resolve_for(
        &mut self,
        initializer: Option<&Stmt>,
        condition: Option<&Expr>,
        increment: Option<&Expr>,
        body: &Stmt,
    ) -> Result<()> {
        if let Some(init) = initializer {
            self.resolve_stmt(init)?;
        }
        if let Some(cond) = condition {
            self.resolve_expr(cond)?;
        }
        if let Some(inc) = increment {
            self.resolve_expr(inc)?;
        }

        self.resolve_loop_body(body)
    }

    fn resolve_loop_body(&mut self, body: &Stmt) -> Result<()> {
        self.loop_depth += 1;
        let result: Result<()> = self.resolve_stmt(body);
        self.loop_depth -= 1;
        result
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Classes
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_class(&mut self, decl: &ClassDecl) -> Result<()> {
        let name: &Identifier = &decl.name;
        debug!("Resolving class '{}'", name.name);

        let mut methods: HashSet<String> = HashSet::new();
        for method in &decl.methods {
            if !methods.insert(method.function.name.name.clone()) {
                return Err(ReplitError::resolve(
                    method.function.name.position,
                    format!(
                        "Method '{}' is declared twice in class '{}'",
                        method.function.name.name, name.name
                    ),
                ));
            }
        }

        let mut fields: HashSet<&str> = HashSet::new();
        for field in &decl.fields {
            if !fields.insert(&field.name.name) {
                return Err(ReplitError::resolve(
                    field.name.position,
                    format!(
                        "Field '{}' is declared twice in class '{}'",
                        field.name.name, name.name
                    ),
                ));
            }
        }

        if let Some(parent) = &decl.superclass {
            if parent.name.name == name.name {
                return Err(ReplitError::resolve(
                    parent.name.position,
                    "A class can't inherit from itself",
                ));
            }

            self.resolve_name(parent.id, &parent.name)?;
        }

        self.declare(name)?;
        self.define(name);

        let shape: ClassShape = ClassShape {
            superclass: decl.superclass.as_ref().map(|p| p.name.name.clone()),
            methods,
        };
        self.record_class(&name.name, shape);
        self.check_inheritance(decl)?;

        // field initializers run in the scope the class is declared in
        for field in &decl.fields {
            if let Some(init) = &field.initializer {
                self.resolve_expr(init)?;
            }
        }

        let enclosing_class: ClassType = self.current_class;
        self.current_class = if decl.superclass.is_some() {
            ClassType::Subclass
        } else {
            ClassType::Class
        };

        let result: Result<()> = self.resolve_methods(decl);

        self.current_class = enclosing_class;
        result
    }

    fn resolve_methods(&mut self, decl: &ClassDecl) -> Result<()> {
        if decl.superclass.is_some() {
            self.begin_scope();
            self.define_name("super");
        }

        self.begin_scope();
        self.define_name("this");

        let mut result: Result<()> = Ok(());

        for method in &decl.methods {
            let kind: FunctionType = if method.function.name.name == CONSTRUCTOR {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };

            result = self.resolve_function(&method.function, kind);
            if result.is_err() {
                break;
            }
        }

        self.end_scope();
        if decl.superclass.is_some() {
            self.end_scope();
        }

        result
    }

    /// Remember a class shape: globally at top level, locally otherwise.
    fn record_class(&mut self, name: &str, shape: ClassShape) {
        match self.local_classes.last_mut() {
            Some(classes) => {
                classes.insert(name.to_string(), shape);
            }
            None => {
                self.globals.classes.insert(name.to_string(), shape);
            }
        }
    }

    /// Shape of the class `name` refers to here. A nearer non-class
    /// declaration of the same name hides any outer class.
    fn shape(&self, name: &str) -> Option<&ClassShape> {
        for (scope, classes) in self.scopes.iter().zip(&self.local_classes).rev() {
            if let Some(shape) = classes.get(name) {
                return Some(shape);
            }
            if scope.contains_key(name) {
                return None;
            }
        }

        self.globals.classes.get(name)
    }

    /// Reject inheritance cycles and `override`s with nothing to replace.
    fn check_inheritance(&self, decl: &ClassDecl) -> Result<()> {
        let mut ancestors: Vec<&ClassShape> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::from([decl.name.name.as_str()]);
        let mut next: Option<&str> = decl.superclass.as_ref().map(|p| p.name.name.as_str());

        while let Some(parent) = next {
            if !seen.insert(parent) {
                let position: Position = decl
                    .superclass
                    .as_ref()
                    .map_or(decl.name.position, |p| p.name.position);

                return Err(ReplitError::resolve(
                    position,
                    format!("Inheritance cycle involving class '{}'", decl.name.name),
                ));
            }

            match self.shape(parent) {
                Some(shape) => {
                    ancestors.push(shape);
                    next = shape.superclass.as_deref();
                }
                // not statically a class; checked again at runtime
                None => return Ok(()),
            }
        }

        for method in &decl.methods {
            if method.modifier != MethodModifier::Override {
                continue;
            }

            let method_name: &str = &method.function.name.name;

            if !ancestors.iter().any(|shape| shape.methods.contains(method_name)) {
                return Err(ReplitError::resolve(
                    method.function.name.position,
                    format!(
                        "Method '{}' is marked override but no ancestor of class '{}' declares it",
                        method_name, decl.name.name
                    ),
                ));
            }
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr) -> Result<()> {
        match expr {
            Expr::Literal { .. } => {}

            Expr::Grouping(inner) => self.resolve_expr(inner)?,

            Expr::Unary { right, .. } => self.resolve_expr(right)?,

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left)?;
                self.resolve_expr(right)?;
            }

            Expr::Variable { id, name } => {
                // cannot read in own initializer
                if let Some(scope) = self.scopes.last() {
                    if scope.get(&name.name) == Some(&false) {
                        return Err(ReplitError::resolve(
                            name.position,
                            format!("Can't read local variable '{}' in its own initializer", name.name),
                        ));
                    }
                }

                self.resolve_name(*id, name)?;
            }

            Expr::Assign { id, name, value } => {
                // first resolve RHS, then bind LHS
                self.resolve_expr(value)?;
                self.resolve_name(*id, name)?;
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee)?;
                for arg in arguments {
                    self.resolve_expr(arg)?;
                }
            }

            Expr::Get { object, .. } => self.resolve_expr(object)?,

            Expr::Set { object, value, .. } => {
                self.resolve_expr(object)?;
                self.resolve_expr(value)?;
            }

            Expr::Index { object, index, .. } => {
                self.resolve_expr(object)?;
                self.resolve_expr(index)?;
            }

            Expr::SetIndex {
                object,
                index,
                value,
                ..
            } => {
                self.resolve_expr(object)?;
                self.resolve_expr(index)?;
                self.resolve_expr(value)?;
            }

            Expr::Array { elements, .. } => {
                for element in elements {
                    self.resolve_expr(element)?;
                }
            }

            Expr::Map { entries, .. } => {
                for (key, value) in entries {
                    self.resolve_expr(key)?;
                    self.resolve_expr(value)?;
                }
            }

            Expr::This { id, position } => {
                if self.current_class == ClassType::None {
                    return Err(ReplitError::resolve(
                        *position,
                        "Can't use 'this' outside of a class method",
                    ));
                }

                self.resolve_local(*id, "this");
            }

            Expr::Super { id, position, .. } => match self.current_class {
                ClassType::None => {
                    return Err(ReplitError::resolve(
                        *position,
                        "Can't use 'super' outside of a class method",
                    ));
                }
                ClassType::Class => {
                    return Err(ReplitError::resolve(
                        *position,
                        "Can't use 'super' in a class with no superclass",
                    ));
                }
                ClassType::Subclass => {
                    self.resolve_local(*id, "super");
                }
            },

            Expr::Lambda(decl) => self.resolve_function(decl, FunctionType::Function)?,
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function's parameters + body.
    fn resolve_function(&mut self, decl: &FunctionDecl, kind: FunctionType) -> Result<()> {
        let enclosing_function: FunctionType = self.current_function;
        let enclosing_loops: usize = self.loop_depth;
        self.current_function = kind;
        self.loop_depth = 0;

        self.begin_scope();

        let mut result: Result<()> = Ok(());
        for param in &decl.params {
            result = self.declare(&param.name);
            if result.is_err() {
                break;
            }
            self.define(&param.name);
        }

        if result.is_ok() {
            result = self.resolve_stmts(&decl.body);
        }

        self.end_scope();

        self.current_function = enclosing_function;
        self.loop_depth = enclosing_loops;
        result
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
        self.local_classes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
        self.local_classes.pop();
    }

    fn declare(&mut self, name: &Identifier) -> Result<()> {
        match self.scopes.last_mut() {
            Some(scope) => {
                if scope.contains_key(&name.name) {
                    return Err(ReplitError::resolve(
                        name.position,
                        format!("Already a variable named '{}' in this scope", name.name),
                    ));
                }
                scope.insert(name.name.clone(), false);
            }
            // globals may be redeclared
            None => {
                self.globals.names.insert(name.name.clone());
            }
        }

        Ok(())
    }

    fn define(&mut self, name: &Identifier) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.name.clone(), true);
        }
    }

    fn define_name(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), true);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding‑distance helpers
    // ─────────────────────────────────────────────────────────────────────────

    /// Bind a variable occurrence to a local scope, or check that the
    /// global it names is visible from here.
    fn resolve_name(&mut self, id: ExprId, name: &Identifier) -> Result<()> {
        if self.resolve_local(id, &name.name) {
            return Ok(());
        }

        let visible: bool = self.globals.contains(&name.name)
            || (self.current_function != FunctionType::None && self.hoisted.contains(&name.name));

        if visible {
            debug!("Resolved '{}' as global", name.name);
            Ok(())
        } else {
            Err(ReplitError::resolve(
                name.position,
                format!("Undefined variable '{}'", name.name),
            ))
        }
    }

    /// Record the depth of the innermost scope declaring `name`.
    fn resolve_local(&mut self, id: ExprId, name: &str) -> bool {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(name) {
                debug!("Resolved '{}' at depth {}", name, depth);
                self.locals.insert(id, depth);
                return true;
            }
        }

        false
    }
}
