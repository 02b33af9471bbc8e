/*!
Recursive‑descent parser producing an owned AST.

Time & Space
------------
Each token is consumed once via `advance()`, so parsing is Θ(n) in the number
of tokens. Error recovery (`synchronize`) discards at most the tokens up to the
next statement boundary. Call‑stack depth grows with syntactic nesting.

### Logging Policy

| Location                     | Level  | Purpose                                   |
|------------------------------|--------|-------------------------------------------|
| `Parser::new`, `parse`       | `info` | Lifecycle milestones.                     |
| `declaration`, class members | `debug`| High‑level descent into grammar branches. |
| Error paths (`error_at`)     | `debug`| Context before returning structured error.|

Grammar (EBNF, condensed)
-------------------------

```text
program        → declaration* EOF ;
declaration    → classDecl | funDecl | varDecl | statement ;
classDecl      → "class" IDENT ( "extends" IDENT )? "{" member* "}" ;
member         → access? ( field | ( "virtual" | "override" )? "fn" function ) ;
access         → "public" | "protected" | "private" ;
field          → ( "var" | "let" ) IDENT ( ":" type )? ( "=" expression )? ";" ;
funDecl        → "fn" function ;
function       → IDENT "(" parameters? ")" body ;
body           → block | "->" type block | "->" expression ";"? ;
parameters     → IDENT ( ":" type )? ( "," IDENT ( ":" type )? )* ;
type           → IDENT ( "<" type ( "," type )* ">" )? ;
varDecl        → ( "var" | "let" ) IDENT ( ":" type )? ( "=" expression )? ";" ;
statement      → exprStmt | printStmt | ifStmt | whileStmt | forStmt
               | returnStmt | "break" ";" | "continue" ";" | block ;
printStmt      → "print" expression ( "," expression )* ";" ;
forStmt        → "for" "(" ( varDecl | exprStmt | ";" ) expression? ";" expression? ")" statement ;
block          → "{" declaration* "}" ;
expression     → assignment ;
assignment     → ( call "." IDENT | call "[" expression "]" | IDENT )
                 ( "=" | "+=" | "-=" | "*=" | "/=" ) assignment
               | logic_or ;
logic_or       → logic_and ( ( "or" | "||" ) logic_and )* ;
logic_and      → equality ( ( "and" | "&&" ) equality )* ;
equality       → comparison ( ( "!=" | "==" ) comparison )* ;
comparison     → term ( ( ">" | ">=" | "<" | "<=" ) term )* ;
term           → factor ( ( "-" | "+" ) factor )* ;
factor         → unary ( ( "/" | "*" | "%" ) unary )* ;
unary          → ( "!" | "-" ) unary | call ;
call           → primary ( "(" arguments? ")" | "." IDENT | "[" expression "]" )* ;
primary        → NUMBER | STRING | "true" | "false" | "nil" | IDENT | "this"
               | "super" "." IDENT | "(" expression ")" | "[" elements? "]"
               | "{" entries? "}" | "fn" "(" parameters? ")" body ;
```
*/

use std::rc::Rc;

use crate::error::{ReplitError, Result};
use crate::expr::{BinaryOp, Expr, ExprId, Identifier, LiteralValue, LogicalOp, UnaryOp};
use crate::stmt::{
    ClassDecl, FieldDecl, FunctionDecl, MethodDecl, MethodModifier, Param, Stmt, SuperclassRef,
    TypeName, Visibility,
};
use crate::token::{Position, Token, TokenType};

use log::{debug, info};

const MAX_ARGUMENTS: usize = 255;

/// Top‑level parser over an immutable slice of tokens.
pub struct Parser<'a> {
    tokens: &'a [Token<'a>],
    current: usize,
    next_id: usize,
}

impl<'a> Parser<'a> {
    /// Construct a new parser.  `tokens` must end with an `EOF` token, as
    /// produced by [`crate::scanner::Scanner`].
    pub fn new(tokens: &'a [Token<'a>]) -> Self {
        info!("Parser created with {} tokens", tokens.len());

        Self {
            tokens,
            current: 0,
            next_id: 0,
        }
    }

    /// Start numbering expression ids at `first`.  An engine that parses
    /// several programs keeps ids unique this way.
    pub fn with_first_id(mut self, first: usize) -> Self {
        self.next_id = first;
        self
    }

    /// The id the next parsed variable reference would receive.
    pub fn next_id(&self) -> usize {
        self.next_id
    }

    // ───────────────────────── public API ─────────────────────────

    /// Parse an entire program, stopping at the first syntax error.
    pub fn parse(&mut self) -> Result<Vec<Stmt>> {
        info!("Beginning parse phase");

        let mut statements: Vec<Stmt> = Vec::new();

        while !self.is_at_end() {
            statements.push(self.declaration()?);
        }

        info!("Parsed {} top-level statement(s)", statements.len());

        Ok(statements)
    }

    /// Parse an entire program, recovering at statement boundaries so that
    /// every top‑level syntax error is reported.
    pub fn parse_with_recovery(&mut self) -> (Vec<Stmt>, Vec<ReplitError>) {
        info!("Beginning parse phase with recovery");

        let mut statements: Vec<Stmt> = Vec::new();
        let mut errors: Vec<ReplitError> = Vec::new();

        while !self.is_at_end() {
            match self.declaration() {
                Ok(stmt) => statements.push(stmt),
                Err(e) => {
                    errors.push(e);
                    self.synchronize();
                }
            }
        }

        (statements, errors)
    }

    /// Parse a single expression (an optional trailing `;` is accepted).
    pub fn parse_expression(&mut self) -> Result<Expr> {
        let expr: Expr = self.expression()?;

        self.matches(TokenType::SEMICOLON);

        if !self.is_at_end() {
            return Err(self.error_at(self.peek(), "Expected end of expression"));
        }

        Ok(expr)
    }

    // ──────────────────────── declaration rules ───────────────────

    fn declaration(&mut self) -> Result<Stmt> {
        debug!("Entering declaration at {}", self.peek().position());

        if self.matches(TokenType::CLASS) {
            self.class_declaration()
        } else if self.check(TokenType::FN) && self.check_next(TokenType::IDENTIFIER) {
            self.advance();
            Ok(Stmt::Function(Rc::new(self.function("function")?)))
        } else if self.matches(TokenType::VAR) {
            self.var_declaration()
        } else {
            self.statement()
        }
    }

    fn class_declaration(&mut self) -> Result<Stmt> {
        let name: Identifier = self.identifier("Expected class name")?;

        let superclass: Option<SuperclassRef> = if self.matches(TokenType::EXTENDS) {
            let parent: Identifier = self.identifier("Expected superclass name after 'extends'")?;
            Some(SuperclassRef {
                id: self.fresh_id(),
                name: parent,
            })
        } else {
            None
        };

        self.consume(TokenType::LEFT_BRACE, "Expected '{' before class body")?;

        let mut fields: Vec<FieldDecl> = Vec::new();
        let mut methods: Vec<MethodDecl> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            let (visibility, modifier) = self.member_modifiers()?;

            if self.matches(TokenType::VAR) {
                if modifier != MethodModifier::None {
                    return Err(self.error_at(
                        self.previous(),
                        "'virtual' and 'override' apply to methods only",
                    ));
                }

                debug!("Parsing field in class '{}'", name.name);

                fields.push(self.field(visibility)?);
            } else if self.matches(TokenType::FN) {
                debug!("Parsing method in class '{}'", name.name);

                methods.push(MethodDecl {
                    visibility,
                    modifier,
                    function: Rc::new(self.function("method")?),
                });
            } else {
                return Err(self.error_at(self.peek(), "Expected field or method declaration"));
            }
        }

        self.consume(TokenType::RIGHT_BRACE, "Expected '}' after class body")?;

        Ok(Stmt::Class(Rc::new(ClassDecl {
            name,
            superclass,
            fields,
            methods,
        })))
    }

    /// `access? ("virtual" | "override")?` in either order, each at most once.
    fn member_modifiers(&mut self) -> Result<(Visibility, MethodModifier)> {
        let mut visibility: Option<Visibility> = None;
        let mut modifier: Option<MethodModifier> = None;

        loop {
            let access: Option<Visibility> = if self.matches(TokenType::PUBLIC) {
                Some(Visibility::Public)
            } else if self.matches(TokenType::PROTECTED) {
                Some(Visibility::Protected)
            } else if self.matches(TokenType::PRIVATE) {
                Some(Visibility::Private)
            } else {
                None
            };

            if let Some(access) = access {
                if visibility.replace(access).is_some() {
                    return Err(self.error_at(self.previous(), "Only one access modifier is allowed"));
                }
                continue;
            }

            let dispatch: Option<MethodModifier> = if self.matches(TokenType::VIRTUAL) {
                Some(MethodModifier::Virtual)
            } else if self.matches(TokenType::OVERRIDE) {
                Some(MethodModifier::Override)
            } else {
                None
            };

            match dispatch {
                Some(dispatch) => {
                    if modifier.replace(dispatch).is_some() {
                        return Err(self.error_at(
                            self.previous(),
                            "A method takes at most one of 'virtual' or 'override'",
                        ));
                    }
                }
                None => break,
            }
        }

        Ok((visibility.unwrap_or_default(), modifier.unwrap_or_default()))
    }

    fn field(&mut self, visibility: Visibility) -> Result<FieldDecl> {
        let name: Identifier = self.identifier("Expected field name")?;
        let ty: Option<TypeName> = self.type_annotation()?;

        let initializer: Option<Expr> = if self.matches(TokenType::EQUAL) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenType::SEMICOLON, "Expected ';' after field declaration")?;

        Ok(FieldDecl {
            name,
            visibility,
            ty,
            initializer,
        })
    }

    /// `IDENT "(" parameters? ")" body`, the `fn` keyword already consumed.
    fn function(&mut self, kind: &str) -> Result<FunctionDecl> {
        let name: Identifier = self.identifier(&format!("Expected {} name", kind))?;

        self.consume(
            TokenType::LEFT_PAREN,
            &format!("Expected '(' after {} name", kind),
        )?;

        self.function_rest(name)
    }

    /// Parameters and body, shared by named functions and lambdas.
    fn function_rest(&mut self, name: Identifier) -> Result<FunctionDecl> {
        let mut params: Vec<Param> = Vec::new();

        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                if params.len() >= MAX_ARGUMENTS {
                    return Err(self.error_at(self.peek(), "Cannot have more than 255 parameters"));
                }

                let param: Identifier = self.identifier("Expected parameter name")?;
                let ty: Option<TypeName> = self.type_annotation()?;

                params.push(Param { name: param, ty });

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after parameters")?;

        let (return_type, body) = self.function_body()?;

        Ok(FunctionDecl {
            name,
            params,
            return_type,
            body,
        })
    }

    fn function_body(&mut self) -> Result<(Option<TypeName>, Vec<Stmt>)> {
        if self.matches(TokenType::ARROW) {
            let arrow: Position = self.previous().position();

            // `-> Type {` is a return annotation; anything else is an
            // expression body.  Backtrack if the annotation guess fails.
            if self.check(TokenType::IDENTIFIER) {
                let checkpoint: usize = self.current;

                if let Ok(ty) = self.type_name() {
                    if self.matches(TokenType::LEFT_BRACE) {
                        return Ok((Some(ty), self.block()?));
                    }
                }

                self.current = checkpoint;
            }

            let value: Expr = self.expression()?;
            self.matches(TokenType::SEMICOLON);

            return Ok((
                None,
                vec![Stmt::Return {
                    keyword: arrow,
                    value: Some(value),
                }],
            ));
        }

        self.consume(TokenType::LEFT_BRACE, "Expected '{' before function body")?;

        Ok((None, self.block()?))
    }

    fn var_declaration(&mut self) -> Result<Stmt> {
        let name: Identifier = self.identifier("Expected variable name")?;
        let ty: Option<TypeName> = self.type_annotation()?;

        let initializer: Option<Expr> = if self.matches(TokenType::EQUAL) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            TokenType::SEMICOLON,
            "Expected ';' after variable declaration",
        )?;

        Ok(Stmt::Var {
            name,
            ty,
            initializer,
        })
    }

    fn type_annotation(&mut self) -> Result<Option<TypeName>> {
        if self.matches(TokenType::COLON) {
            Ok(Some(self.type_name()?))
        } else {
            Ok(None)
        }
    }

    fn type_name(&mut self) -> Result<TypeName> {
        let name: &Token<'a> = self.consume(TokenType::IDENTIFIER, "Expected type name")?;
        let mut arguments: Vec<TypeName> = Vec::new();

        if self.matches(TokenType::LESS) {
            loop {
                arguments.push(self.type_name()?);

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }

            self.consume(TokenType::GREATER, "Expected '>' after type arguments")?;
        }

        Ok(TypeName {
            name: name.lexeme.to_string(),
            arguments,
        })
    }

    // ───────────────────────── statement rules ────────────────────

    fn statement(&mut self) -> Result<Stmt> {
        if self.matches(TokenType::FOR) {
            self.for_statement()
        } else if self.matches(TokenType::IF) {
            self.if_statement()
        } else if self.matches(TokenType::WHILE) {
            self.while_statement()
        } else if self.matches(TokenType::RETURN) {
            self.return_statement()
        } else if self.matches(TokenType::BREAK) {
            let keyword: Position = self.previous().position();
            self.consume(TokenType::SEMICOLON, "Expected ';' after 'break'")?;
            Ok(Stmt::Break(keyword))
        } else if self.matches(TokenType::CONTINUE) {
            let keyword: Position = self.previous().position();
            self.consume(TokenType::SEMICOLON, "Expected ';' after 'continue'")?;
            Ok(Stmt::Continue(keyword))
        } else if self.matches(TokenType::LEFT_BRACE) {
            Ok(Stmt::Block(self.block()?))
        } else if self.matches(TokenType::PRINT) {
            self.print_statement()
        } else {
            self.expression_statement()
        }
    }

    fn for_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LEFT_PAREN, "Expected '(' after 'for'")?;

        let initializer: Option<Box<Stmt>> = if self.matches(TokenType::SEMICOLON) {
            None
        } else if self.matches(TokenType::VAR) {
            Some(Box::new(self.var_declaration()?))
        } else {
            Some(Box::new(self.expression_statement()?))
        };

        let condition: Option<Expr> = if !self.check(TokenType::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenType::SEMICOLON, "Expected ';' after loop condition")?;

        let increment: Option<Expr> = if !self.check(TokenType::RIGHT_PAREN) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after for clauses")?;

        let body: Box<Stmt> = Box::new(self.statement()?);

        Ok(Stmt::For {
            initializer,
            condition,
            increment,
            body,
        })
    }

    fn print_statement(&mut self) -> Result<Stmt> {
        let keyword: Position = self.previous().position();
        let mut values: Vec<Expr> = vec![self.expression()?];

        while self.matches(TokenType::COMMA) {
            values.push(self.expression()?);
        }

        self.consume(TokenType::SEMICOLON, "Expected ';' after value")?;

        Ok(Stmt::Print { keyword, values })
    }

    fn expression_statement(&mut self) -> Result<Stmt> {
        let expr: Expr = self.expression()?;
        self.consume(TokenType::SEMICOLON, "Expected ';' after expression")?;
        Ok(Stmt::Expression(expr))
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LEFT_PAREN, "Expected '(' after 'if'")?;
        let condition: Expr = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after condition")?;

        let then_branch: Box<Stmt> = Box::new(self.statement()?);
        let else_branch: Option<Box<Stmt>> = if self.matches(TokenType::ELSE) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn while_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LEFT_PAREN, "Expected '(' after 'while'")?;
        let condition: Expr = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after condition")?;
        let body: Box<Stmt> = Box::new(self.statement()?);

        Ok(Stmt::While { condition, body })
    }

    fn return_statement(&mut self) -> Result<Stmt> {
        let keyword: Position = self.previous().position();
        let value: Option<Expr> = if !self.check(TokenType::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenType::SEMICOLON, "Expected ';' after return value")?;
        Ok(Stmt::Return { keyword, value })
    }

    fn block(&mut self) -> Result<Vec<Stmt>> {
        let mut statements: Vec<Stmt> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            statements.push(self.declaration()?);
        }

        self.consume(TokenType::RIGHT_BRACE, "Expected '}' after block")?;
        Ok(statements)
    }

    // ─────────────────────── expression rules ─────────────────────

    fn expression(&mut self) -> Result<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr> {
        let expr: Expr = self.logical_or()?;

        let compound: Option<BinaryOp> = if self.matches(TokenType::EQUAL) {
            None
        } else if self.matches(TokenType::PLUS_EQUAL) {
            Some(BinaryOp::Add)
        } else if self.matches(TokenType::MINUS_EQUAL) {
            Some(BinaryOp::Subtract)
        } else if self.matches(TokenType::STAR_EQUAL) {
            Some(BinaryOp::Multiply)
        } else if self.matches(TokenType::SLASH_EQUAL) {
            Some(BinaryOp::Divide)
        } else {
            return Ok(expr);
        };

        let equals: &Token<'a> = self.previous();
        let mut value: Expr = self.assignment()?;

        // `target op= value` → `target = target op value`
        if let Some(operator) = compound {
            value = Expr::Binary {
                left: Box::new(expr.clone()),
                operator,
                right: Box::new(value),
                position: equals.position(),
            };
        }

        match expr {
            Expr::Variable { name, .. } => Ok(Expr::Assign {
                id: self.fresh_id(),
                name,
                value: Box::new(value),
            }),

            Expr::Get { object, name } => Ok(Expr::Set {
                object,
                name,
                value: Box::new(value),
            }),

            Expr::Index {
                object,
                index,
                position,
            } => Ok(Expr::SetIndex {
                object,
                index,
                value: Box::new(value),
                position,
            }),

            _ => Err(self.error_at(equals, "Invalid assignment target")),
        }
    }

    fn logical_or(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.logical_and()?;

        while self.matches(TokenType::OR) {
            let right: Expr = self.logical_and()?;

            expr = Expr::Logical {
                left: Box::new(expr),
                operator: LogicalOp::Or,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn logical_and(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.equality()?;

        while self.matches(TokenType::AND) {
            let right: Expr = self.equality()?;

            expr = Expr::Logical {
                left: Box::new(expr),
                operator: LogicalOp::And,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    /// One left‑associative precedence level: `next ( op next )*`.
    fn binary_level(
        &mut self,
        operators: &[(TokenType, BinaryOp)],
        next: fn(&mut Self) -> Result<Expr>,
    ) -> Result<Expr> {
        let mut expr: Expr = next(self)?;

        'outer: loop {
            for (token_type, operator) in operators {
                if self.matches(token_type.clone()) {
                    let position: Position = self.previous().position();
                    let right: Expr = next(self)?;

                    expr = Expr::Binary {
                        left: Box::new(expr),
                        operator: *operator,
                        right: Box::new(right),
                        position,
                    };

                    continue 'outer;
                }
            }

            break;
        }

        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr> {
        self.binary_level(
            &[
                (TokenType::BANG_EQUAL, BinaryOp::NotEqual),
                (TokenType::EQUAL_EQUAL, BinaryOp::Equal),
            ],
            Self::comparison,
        )
    }

    fn comparison(&mut self) -> Result<Expr> {
        self.binary_level(
            &[
                (TokenType::GREATER, BinaryOp::Greater),
                (TokenType::GREATER_EQUAL, BinaryOp::GreaterEqual),
                (TokenType::LESS, BinaryOp::Less),
                (TokenType::LESS_EQUAL, BinaryOp::LessEqual),
            ],
            Self::term,
        )
    }

    fn term(&mut self) -> Result<Expr> {
        self.binary_level(
            &[
                (TokenType::MINUS, BinaryOp::Subtract),
                (TokenType::PLUS, BinaryOp::Add),
            ],
            Self::factor,
        )
    }

    fn factor(&mut self) -> Result<Expr> {
        self.binary_level(
            &[
                (TokenType::STAR, BinaryOp::Multiply),
                (TokenType::SLASH, BinaryOp::Divide),
                (TokenType::PERCENT, BinaryOp::Remainder),
            ],
            Self::unary,
        )
    }

    fn unary(&mut self) -> Result<Expr> {
        let operator: Option<UnaryOp> = if self.matches(TokenType::BANG) {
            Some(UnaryOp::Not)
        } else if self.matches(TokenType::MINUS) {
            Some(UnaryOp::Negate)
        } else {
            None
        };

        if let Some(operator) = operator {
            let position: Position = self.previous().position();
            let right: Expr = self.unary()?;

            return Ok(Expr::Unary {
                operator,
                right: Box::new(right),
                position,
            });
        }

        self.call()
    }

    fn call(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.primary()?;

        loop {
            if self.matches(TokenType::LEFT_PAREN) {
                expr = self.finish_call(expr)?;
            } else if self.matches(TokenType::DOT) {
                let name: Identifier = self.identifier("Expected property name after '.'")?;

                expr = Expr::Get {
                    object: Box::new(expr),
                    name,
                };
            } else if self.matches(TokenType::LEFT_BRACKET) {
                let position: Position = self.previous().position();
                let index: Expr = self.expression()?;

                self.consume(TokenType::RIGHT_BRACKET, "Expected ']' after index")?;

                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                    position,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr> {
        let position: Position = self.previous().position();
        let mut arguments: Vec<Expr> = Vec::new();

        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                if arguments.len() >= MAX_ARGUMENTS {
                    return Err(self.error_at(self.peek(), "Cannot have more than 255 arguments"));
                }

                arguments.push(self.expression()?);

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after arguments")?;

        Ok(Expr::Call {
            callee: Box::new(callee),
            position,
            arguments,
        })
    }

    fn primary(&mut self) -> Result<Expr> {
        let position: Position = self.peek().position();

        let value: Option<LiteralValue> = match &self.peek().token_type {
            TokenType::FALSE => Some(LiteralValue::Bool(false)),
            TokenType::TRUE => Some(LiteralValue::Bool(true)),
            TokenType::NIL => Some(LiteralValue::Nil),
            TokenType::NUMBER(n) => Some(LiteralValue::Number(*n)),
            TokenType::STRING(s) => Some(LiteralValue::Str(s.clone())),
            _ => None,
        };

        if let Some(value) = value {
            self.advance();
            return Ok(Expr::Literal { value, position });
        }

        if self.matches(TokenType::IDENTIFIER) {
            let token: &Token<'a> = self.previous();
            return Ok(Expr::Variable {
                id: self.fresh_id(),
                name: Identifier::new(token.lexeme, token.position()),
            });
        }

        if self.matches(TokenType::THIS) {
            let position: Position = self.previous().position();
            return Ok(Expr::This {
                id: self.fresh_id(),
                position,
            });
        }

        if self.matches(TokenType::SUPER) {
            let position: Position = self.previous().position();
            self.consume(TokenType::DOT, "Expected '.' after 'super'")?;
            let method: Identifier = self.identifier("Expected superclass method name")?;

            return Ok(Expr::Super {
                id: self.fresh_id(),
                position,
                method,
            });
        }

        if self.matches(TokenType::LEFT_PAREN) {
            let expr: Expr = self.expression()?;
            self.consume(TokenType::RIGHT_PAREN, "Expected ')' after expression")?;
            return Ok(Expr::Grouping(Box::new(expr)));
        }

        if self.matches(TokenType::LEFT_BRACKET) {
            return self.array_literal();
        }

        if self.matches(TokenType::LEFT_BRACE) {
            return self.map_literal();
        }

        if self.matches(TokenType::FN) {
            let position: Position = self.previous().position();
            self.consume(TokenType::LEFT_PAREN, "Expected '(' after 'fn'")?;
            let decl: FunctionDecl = self.function_rest(Identifier::new("<lambda>", position))?;
            return Ok(Expr::Lambda(Rc::new(decl)));
        }

        Err(self.error_at(self.peek(), "Expected expression"))
    }

    fn array_literal(&mut self) -> Result<Expr> {
        let position: Position = self.previous().position();
        let mut elements: Vec<Expr> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACKET) {
            elements.push(self.expression()?);

            if !self.matches(TokenType::COMMA) {
                break;
            }
        }

        self.consume(TokenType::RIGHT_BRACKET, "Expected ']' after array elements")?;

        Ok(Expr::Array { elements, position })
    }

    fn map_literal(&mut self) -> Result<Expr> {
        let position: Position = self.previous().position();
        let mut entries: Vec<(Expr, Expr)> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) {
            let key: Expr = self.expression()?;
            self.consume(TokenType::COLON, "Expected ':' after map key")?;
            let value: Expr = self.expression()?;

            entries.push((key, value));

            if !self.matches(TokenType::COMMA) {
                break;
            }
        }

        self.consume(TokenType::RIGHT_BRACE, "Expected '}' after map entries")?;

        Ok(Expr::Map { entries, position })
    }

    // ────────────────────── utility helpers ───────────────────────

    #[inline]
    fn fresh_id(&mut self) -> ExprId {
        let id: ExprId = ExprId(self.next_id);
        self.next_id += 1;
        id
    }

    fn identifier(&mut self, message: &str) -> Result<Identifier> {
        let token: &Token<'a> = self.consume(TokenType::IDENTIFIER, message)?;
        Ok(Identifier::new(token.lexeme, token.position()))
    }

    /// Build a parse error pointing at `token`.
    fn error_at(&self, token: &Token<'a>, message: &str) -> ReplitError {
        let location: String = if matches!(token.token_type, TokenType::EOF) {
            "at end".to_string()
        } else {
            format!("at '{}'", token.lexeme)
        };

        debug!("Parse error {} ({}): {}", location, token.position(), message);

        ReplitError::parse(token.position(), format!("{}: {}", location, message))
    }

    #[inline(always)]
    fn matches(&mut self, ttype: TokenType) -> bool {
        if self.check(ttype) {
            self.advance();
            return true;
        }

        false
    }

    #[inline(always)]
    fn consume(&mut self, ttype: TokenType, message: &str) -> Result<&'a Token<'a>> {
        if self.check(ttype) {
            return Ok(self.advance());
        }

        Err(self.error_at(self.peek(), message))
    }

    #[inline(always)]
    fn check(&self, ttype: TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }

        self.peek().token_type == ttype
    }

    #[inline(always)]
    fn check_next(&self, ttype: TokenType) -> bool {
        self.tokens
            .get(self.current + 1)
            .is_some_and(|t| t.token_type == ttype)
    }

    #[inline(always)]
    fn advance(&mut self) -> &'a Token<'a> {
        if !self.is_at_end() {
            self.current += 1;
        }

        self.previous()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        matches!(self.peek().token_type, TokenType::EOF)
    }

    #[inline(always)]
    fn peek(&self) -> &'a Token<'a> {
        // a token slice without EOF is treated as ending at its last token
        let index: usize = self.current.min(self.tokens.len().saturating_sub(1));
        &self.tokens[index]
    }

    #[inline(always)]
    fn previous(&self) -> &'a Token<'a> {
        &self.tokens[self.current.saturating_sub(1)]
    }

    /// Discards tokens until it thinks it is at a statement boundary.
    fn synchronize(&mut self) {
        self.advance(); // skip the token that caused the error

        while !self.is_at_end() {
            if matches!(self.previous().token_type, TokenType::SEMICOLON) {
                return;
            }

            match self.peek().token_type {
                TokenType::CLASS
                | TokenType::FN
                | TokenType::VAR
                | TokenType::FOR
                | TokenType::IF
                | TokenType::WHILE
                | TokenType::PRINT
                | TokenType::RETURN => return,
                _ => {}
            }

            self.advance();
        }
    }
}
