//! Runtime object model: user functions, classes and their instances.
//!
//! A class owns a flattened method table: the superclass table is copied at
//! declaration time and the class's own methods are inserted on top, so an
//! override replaces the ancestor's slot and dispatch is a single lookup.
//! Methods point back to their declaring class weakly, which keeps the
//! class ↔ method relation free of reference cycles.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::ptr;
use std::rc::{Rc, Weak};

use log::debug;

use crate::environment::{Env, Environment};
use crate::stmt::{ClassDecl, FunctionDecl, Visibility, CONSTRUCTOR};
use crate::value::Value;

/// A user function or method together with its captured scope.
pub struct Function {
    pub decl: Rc<FunctionDecl>,
    pub closure: Env,
    pub is_initializer: bool,
    /// Class whose code created this function; drives access checks.
    pub context: Option<Weak<ClassObject>>,
}

impl Function {
    pub fn new(decl: Rc<FunctionDecl>, closure: Env, context: Option<Weak<ClassObject>>) -> Self {
        Self {
            decl,
            closure,
            is_initializer: false,
            context,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.decl.name.name
    }

    #[inline]
    pub fn arity(&self) -> usize {
        self.decl.arity()
    }

    pub fn class_context(&self) -> Option<Rc<ClassObject>> {
        self.context.as_ref().and_then(Weak::upgrade)
    }

    /// A copy of this method whose scope binds `this` to `instance`.
    pub fn bind(&self, instance: Rc<Instance>) -> Function {
        let env: Env = Environment::child(&self.closure);
        env.borrow_mut().define("this", Value::Instance(instance));

        Function {
            decl: Rc::clone(&self.decl),
            closure: env,
            is_initializer: self.is_initializer,
            context: self.context.clone(),
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}/{}>", self.name(), self.arity())
    }
}

/// Visibility of a class member and the class that declared it.
#[derive(Debug, Clone)]
pub struct Member {
    pub visibility: Visibility,
    pub owner: Weak<ClassObject>,
}

#[derive(Debug, Clone)]
pub struct Method {
    pub function: Rc<Function>,
    pub member: Member,
}

pub struct ClassObject {
    pub name: String,
    pub decl: Rc<ClassDecl>,
    pub superclass: Option<Rc<ClassObject>>,
    /// Scope the class was declared in; field initializers run here.
    pub closure: Env,
    methods: HashMap<String, Method>,
    fields: HashMap<String, Member>,
}

impl ClassObject {
    /// Build a class from its declaration. `method_scope` is the scope the
    /// methods close over (it holds `super` when there is a superclass).
    pub fn new(
        decl: Rc<ClassDecl>,
        superclass: Option<Rc<ClassObject>>,
        closure: Env,
        method_scope: Env,
    ) -> Rc<ClassObject> {
        Rc::new_cyclic(|me: &Weak<ClassObject>| {
            let mut methods: HashMap<String, Method> = superclass
                .as_ref()
                .map(|parent| parent.methods.clone())
                .unwrap_or_default();

            let mut fields: HashMap<String, Member> = superclass
                .as_ref()
                .map(|parent| parent.fields.clone())
                .unwrap_or_default();

            for method in &decl.methods {
                let name: &str = &method.function.name.name;

                let mut function: Function = Function::new(
                    Rc::clone(&method.function),
                    Rc::clone(&method_scope),
                    Some(me.clone()),
                );
                function.is_initializer = name == CONSTRUCTOR;

                if methods.contains_key(name) {
                    debug!("Class '{}' replaces inherited slot '{}'", decl.name.name, name);
                }

                methods.insert(
                    name.to_string(),
                    Method {
                        function: Rc::new(function),
                        member: Member {
                            visibility: method.visibility,
                            owner: me.clone(),
                        },
                    },
                );
            }

            for field in &decl.fields {
                fields.insert(
                    field.name.name.clone(),
                    Member {
                        visibility: field.visibility,
                        owner: me.clone(),
                    },
                );
            }

            ClassObject {
                name: decl.name.name.clone(),
                decl: Rc::clone(&decl),
                superclass,
                closure,
                methods,
                fields,
            }
        })
    }

    /// Dispatch‑table lookup, inherited methods included.
    pub fn find_method(&self, name: &str) -> Option<&Method> {
        self.methods.get(name)
    }

    /// Declared field metadata, inherited fields included.
    pub fn field(&self, name: &str) -> Option<&Member> {
        self.fields.get(name)
    }

    /// `true` when `self` is `other` or inherits from it.
    pub fn is_subclass_of(&self, other: &ClassObject) -> bool {
        let mut current: Option<&ClassObject> = Some(self);

        while let Some(class) = current {
            if ptr::eq(class, other) {
                return true;
            }
            current = class.superclass.as_deref();
        }

        false
    }

    /// The inheritance chain, root ancestor first.
    pub fn lineage(self: &Rc<Self>) -> Vec<Rc<ClassObject>> {
        let mut chain: Vec<Rc<ClassObject>> = Vec::new();
        let mut current: Option<Rc<ClassObject>> = Some(Rc::clone(self));

        while let Some(class) = current {
            current = class.superclass.clone();
            chain.push(class);
        }

        chain.reverse();
        chain
    }

    /// Arity of the constructor call `Class(...)`.
    pub fn arity(&self) -> usize {
        self.find_method(CONSTRUCTOR)
            .map_or(0, |init| init.function.arity())
    }
}

impl fmt::Debug for ClassObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<class {}>", self.name)
    }
}

pub struct Instance {
    pub class: Rc<ClassObject>,
    fields: RefCell<HashMap<String, Value>>,
}

impl Instance {
    pub fn new(class: Rc<ClassObject>) -> Self {
        Self {
            class,
            fields: RefCell::new(HashMap::new()),
        }
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.fields.borrow().get(name).cloned()
    }

    pub fn set(&self, name: &str, value: Value) {
        self.fields.borrow_mut().insert(name.to_string(), value);
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} instance>", self.class.name)
    }
}
