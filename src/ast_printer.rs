use crate::expr::{Expr, LiteralValue};
use crate::stmt::{FunctionDecl, MethodModifier, Stmt};

/// Renders AST nodes as parenthesised prefix expressions, e.g.
/// `1 + 2 * 3` → `(+ 1.0 (* 2.0 3.0))`.
pub struct Ast;

impl Ast {
    pub fn print(&self, expr: &Expr) -> String {
        match expr {
            Expr::Literal { value, .. } => match value {
                LiteralValue::Number(n) => {
                    if n.fract() == 0.0 {
                        format!("{:.1}", n)
                    } else {
                        n.to_string()
                    }
                }

                LiteralValue::Str(s) => s.to_string(),

                LiteralValue::Bool(b) => b.to_string(),

                LiteralValue::Nil => "nil".to_string(),
            },

            Expr::Unary {
                operator, right, ..
            } => format!("({} {})", operator, self.print(right)),

            Expr::Binary {
                left,
                operator,
                right,
                ..
            } => format!("({} {} {})", operator, self.print(left), self.print(right)),

            Expr::Logical {
                left,
                operator,
                right,
            } => format!("({} {} {})", operator, self.print(left), self.print(right)),

            Expr::Grouping(inner) => format!("(group {})", self.print(inner)),

            Expr::Variable { name, .. } => name.name.clone(),

            Expr::Assign { name, value, .. } => {
                format!("(= {} {})", name.name, self.print(value))
            }

            Expr::Call {
                callee, arguments, ..
            } => format!("(call {}{})", self.print(callee), self.list(arguments)),

            Expr::Get { object, name } => format!("(. {} {})", self.print(object), name.name),

            Expr::Set {
                object,
                name,
                value,
            } => format!(
                "(= (. {} {}) {})",
                self.print(object),
                name.name,
                self.print(value)
            ),

            Expr::Index { object, index, .. } => {
                format!("([] {} {})", self.print(object), self.print(index))
            }

            Expr::SetIndex {
                object,
                index,
                value,
                ..
            } => format!(
                "(= ([] {} {}) {})",
                self.print(object),
                self.print(index),
                self.print(value)
            ),

            Expr::Array { elements, .. } => format!("(array{})", self.list(elements)),

            Expr::Map { entries, .. } => {
                let mut out: String = String::from("(map");
                for (key, value) in entries {
                    out.push_str(&format!(" ({} {})", self.print(key), self.print(value)));
                }
                out.push(')');
                out
            }

            Expr::This { .. } => "this".to_string(),

            Expr::Super { method, .. } => format!("(super {})", method.name),

            Expr::Lambda(decl) => self.function("lambda", decl),
        }
    }

    pub fn print_stmt(&self, stmt: &Stmt) -> String {
        match stmt {
            Stmt::Expression(expr) => format!("(; {})", self.print(expr)),

            Stmt::Print { values, .. } => format!("(print{})", self.list(values)),

            Stmt::Var {
                name, initializer, ..
            } => match initializer {
                Some(init) => format!("(var {} {})", name.name, self.print(init)),
                None => format!("(var {})", name.name),
            },

            Stmt::Block(statements) => format!("(block{})", self.stmts(statements)),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => match else_branch {
                Some(else_branch) => format!(
                    "(if {} {} {})",
                    self.print(condition),
                    self.print_stmt(then_branch),
                    self.print_stmt(else_branch)
                ),
                None => format!(
                    "(if {} {})",
                    self.print(condition),
                    self.print_stmt(then_branch)
                ),
            },

            Stmt::While { condition, body } => format!(
                "(while {} {})",
                self.print(condition),
                self.print_stmt(body)
            ),

            Stmt::For {
                initializer,
                condition,
                increment,
                body,
            } => format!(
                "(for {} {} {} {})",
                initializer
                    .as_deref()
                    .map_or_else(|| "_".to_string(), |s| self.print_stmt(s)),
                condition
                    .as_ref()
                    .map_or_else(|| "_".to_string(), |e| self.print(e)),
                increment
                    .as_ref()
                    .map_or_else(|| "_".to_string(), |e| self.print(e)),
                self.print_stmt(body)
            ),

            Stmt::Function(decl) => self.function("fn", decl),

            Stmt::Return { value, .. } => match value {
                Some(value) => format!("(return {})", self.print(value)),
                None => "(return)".to_string(),
            },

            Stmt::Break(_) => "(break)".to_string(),

            Stmt::Continue(_) => "(continue)".to_string(),

            Stmt::Class(class) => {
                let mut out: String = format!("(class {}", class.name.name);

                if let Some(parent) = &class.superclass {
                    out.push_str(&format!(" < {}", parent.name.name));
                }

                for field in &class.fields {
                    out.push_str(&format!(" ({} var {}", field.visibility, field.name.name));
                    if let Some(init) = &field.initializer {
                        out.push(' ');
                        out.push_str(&self.print(init));
                    }
                    out.push(')');
                }

                for method in &class.methods {
                    let tag: String = match method.modifier {
                        MethodModifier::None => method.visibility.to_string(),
                        MethodModifier::Virtual => format!("{} virtual", method.visibility),
                        MethodModifier::Override => format!("{} override", method.visibility),
                    };
                    out.push_str(&format!(" ({} {})", tag, self.function("fn", &method.function)));
                }

                out.push(')');
                out
            }
        }
    }

    fn function(&self, tag: &str, decl: &FunctionDecl) -> String {
        let params: Vec<&str> = decl.params.iter().map(|p| p.name.name.as_str()).collect();

        format!(
            "({} {} ({}){})",
            tag,
            decl.name.name,
            params.join(" "),
            self.stmts(&decl.body)
        )
    }

    fn list(&self, exprs: &[Expr]) -> String {
        exprs.iter().map(|e| format!(" {}", self.print(e))).collect()
    }

    fn stmts(&self, stmts: &[Stmt]) -> String {
        stmts
            .iter()
            .map(|s| format!(" {}", self.print_stmt(s)))
            .collect()
    }
}
