#[cfg(test)]
mod parser_tests {
    use replit_lang as replit;

    use replit::ast_printer::Ast;
    use replit::error::{ErrorCategory, ReplitError};
    use replit::expr::Expr;
    use replit::parser::Parser;
    use replit::scanner::tokenize;
    use replit::stmt::{MethodModifier, Stmt, Visibility};

    fn parse(source: &str) -> Result<Vec<Stmt>, ReplitError> {
        let tokens = tokenize(source)?;
        Parser::new(&tokens).parse()
    }

    fn print_expr(source: &str) -> String {
        let tokens = tokenize(source).unwrap();
        let expr: Expr = Parser::new(&tokens).parse_expression().unwrap();
        Ast.print(&expr)
    }

    fn print_program(source: &str) -> Vec<String> {
        parse(source)
            .unwrap()
            .iter()
            .map(|stmt| Ast.print_stmt(stmt))
            .collect()
    }

    #[test]
    fn test_precedence() {
        assert_eq!(print_expr("1 + 2 * 3"), "(+ 1.0 (* 2.0 3.0))");
        assert_eq!(print_expr("(1 + 2) * 3"), "(* (group (+ 1.0 2.0)) 3.0)");
        assert_eq!(print_expr("-a % b"), "(% (- a) b)");
        assert_eq!(
            print_expr("a or b and c == d"),
            "(or a (and b (== c d)))"
        );
        assert_eq!(print_expr("a && b || !c"), "(or (and a b) (! c))");
    }

    #[test]
    fn test_left_associativity() {
        assert_eq!(print_expr("1 - 2 - 3"), "(- (- 1.0 2.0) 3.0)");
        assert_eq!(print_expr("a < b < c"), "(< (< a b) c)");
    }

    #[test]
    fn test_assignment_is_right_associative() {
        assert_eq!(print_expr("a = b = 1"), "(= a (= b 1.0))");
    }

    #[test]
    fn test_compound_assignment_desugars() {
        assert_eq!(print_expr("x += 2"), "(= x (+ x 2.0))");
        assert_eq!(print_expr("p.n *= 3"), "(= (. p n) (* (. p n) 3.0))");
        assert_eq!(
            print_expr("xs[0] -= 1"),
            "(= ([] xs 0.0) (- ([] xs 0.0) 1.0))"
        );
    }

    #[test]
    fn test_calls_properties_and_indexing() {
        assert_eq!(
            print_expr("a.b(1, 2)[0].c"),
            "(. ([] (call (. a b) 1.0 2.0) 0.0) c)"
        );
        assert_eq!(print_expr("super.greet"), "(super greet)");
    }

    #[test]
    fn test_collection_literals() {
        assert_eq!(print_expr("[1, \"a\", nil]"), "(array 1.0 a nil)");
        assert_eq!(print_expr("{\"k\": 1, \"j\": true}"), "(map (k 1.0) (j true))");
        assert_eq!(print_expr("[]"), "(array)");
    }

    #[test]
    fn test_print_with_several_operands() {
        assert_eq!(print_program("print a, 1;"), vec!["(print a 1.0)"]);
    }

    #[test]
    fn test_type_annotations_are_accepted() {
        let program = print_program(
            "var count: int = 0;\n\
             let items: Array<Item> = [];\n\
             fn scale(x: float, k: float) -> float { return x * k; }",
        );

        assert_eq!(program[0], "(var count 0.0)");
        assert_eq!(program[1], "(var items (array))");
        assert_eq!(program[2], "(fn scale (x k) (return (* x k)))");
    }

    #[test]
    fn test_expression_bodied_function() {
        assert_eq!(
            print_program("fn double(x) -> x * 2"),
            vec!["(fn double (x) (return (* x 2.0)))"]
        );
        assert_eq!(
            print_program("fn name() -> \"A\";"),
            vec!["(fn name () (return A))"]
        );
    }

    #[test]
    fn test_lambda_expression() {
        assert_eq!(
            print_expr("fn (a) { return a; }"),
            "(lambda <lambda> (a) (return a))"
        );
    }

    #[test]
    fn test_control_flow_statements() {
        let program = print_program(
            "for (var i = 0; i < 3; i = i + 1) { if (i == 1) continue; else break; }\n\
             while (true) {}",
        );

        assert_eq!(
            program[0],
            "(for (var i 0.0) (< i 3.0) (= i (+ i 1.0)) (block (if (== i 1.0) (continue) (break))))"
        );
        assert_eq!(program[1], "(while true (block))");
    }

    #[test]
    fn test_class_declaration() {
        let stmts = parse(
            "class B extends A {\n\
                 private var secret = 1;\n\
                 protected let shared;\n\
                 override public fn f() -> \"B\"\n\
                 virtual fn g() {}\n\
                 fn init(x) { this.x = x; }\n\
             }",
        )
        .unwrap();

        let Stmt::Class(class) = &stmts[0] else {
            panic!("expected class, got {:?}", stmts[0]);
        };

        assert_eq!(class.name.name, "B");
        assert_eq!(class.superclass.as_ref().unwrap().name.name, "A");

        assert_eq!(class.fields.len(), 2);
        assert_eq!(class.fields[0].visibility, Visibility::Private);
        assert_eq!(class.fields[1].visibility, Visibility::Protected);
        assert!(class.fields[1].initializer.is_none());

        assert_eq!(class.methods.len(), 3);
        assert_eq!(class.methods[0].visibility, Visibility::Public);
        assert_eq!(class.methods[0].modifier, MethodModifier::Override);
        assert_eq!(class.methods[1].modifier, MethodModifier::Virtual);
        assert_eq!(class.methods[2].function.name.name, "init");
        assert_eq!(class.methods[2].function.arity(), 1);

        assert_eq!(
            Ast.print_stmt(&stmts[0]),
            "(class B < A (private var secret 1.0) (protected var shared) \
             (public override (fn f () (return B))) (public virtual (fn g ())) \
             (public (fn init (x) (; (= (. this x) x)))))"
        );
    }

    #[test]
    fn test_duplicate_access_modifier_is_rejected() {
        let err = parse("class A { public private fn f() {} }").unwrap_err();

        assert_eq!(err.category(), ErrorCategory::Parse);
        assert!(err.message().contains("Only one access modifier"));
    }

    #[test]
    fn test_virtual_field_is_rejected() {
        let err = parse("class A { virtual var x; }").unwrap_err();
        assert!(err.message().contains("methods only"));
    }

    #[test]
    fn test_error_reports_offending_token() {
        let err = parse("var x = ;").unwrap_err();

        assert_eq!(err.category(), ErrorCategory::Parse);
        assert_eq!(err.message(), "at ';': Expected expression");
        assert_eq!(err.position().map(|p| p.column), Some(9));
    }

    #[test]
    fn test_error_at_end() {
        let err = parse("print 1").unwrap_err();
        assert_eq!(err.message(), "at end: Expected ';' after value");
    }

    #[test]
    fn test_invalid_assignment_target() {
        let err = parse("1 + 2 = 3;").unwrap_err();
        assert!(err.message().contains("Invalid assignment target"));
    }

    #[test]
    fn test_recovery_reports_every_statement_error() {
        let tokens = tokenize("var = 1;\nprint 2;\nvar y = ;\nprint 3;").unwrap();
        let (statements, errors) = Parser::new(&tokens).parse_with_recovery();

        assert_eq!(errors.len(), 2);
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn test_expression_ids_are_unique() {
        let tokens = tokenize("a; b; a = b;").unwrap();
        let mut parser = Parser::new(&tokens).with_first_id(10);
        parser.parse().unwrap();

        // a, b, then a, b and the assignment itself
        assert_eq!(parser.next_id(), 15);
    }
}
