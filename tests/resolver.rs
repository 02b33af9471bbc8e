#[cfg(test)]
mod resolver_tests {
    use replit_lang as replit;

    use replit::error::{ErrorCategory, ReplitError};
    use replit::parser::Parser;
    use replit::resolver::{Resolution, Resolver, StaticGlobals};
    use replit::scanner::tokenize;

    fn resolve(source: &str) -> Result<Resolution, ReplitError> {
        let tokens = tokenize(source)?;
        let statements = Parser::new(&tokens).parse()?;
        Resolver::new(&StaticGlobals::new()).resolve(&statements)
    }

    fn resolve_err(source: &str) -> ReplitError {
        let err = resolve(source).expect_err("expected a resolve error");
        assert_eq!(err.category(), ErrorCategory::Resolve, "got {}", err);
        err
    }

    #[test]
    fn test_undeclared_global_is_rejected() {
        let err = resolve_err("print x;");
        assert!(err.message().contains("Undefined variable 'x'"));
    }

    #[test]
    fn test_global_must_be_declared_before_top_level_use() {
        resolve_err("print later; var later = 1;");
        resolve_err("var a = a;");
    }

    #[test]
    fn test_functions_may_use_later_globals() {
        assert!(resolve(
            "fn is_even(n) { if (n == 0) return true; return is_odd(n - 1); }\n\
             fn is_odd(n) { if (n == 0) return false; return is_even(n - 1); }"
        )
        .is_ok());
    }

    #[test]
    fn test_natives_are_predeclared() {
        assert!(resolve("print clock(); print len([1]);").is_ok());
    }

    #[test]
    fn test_local_depths() {
        let resolution = resolve("{ var a = 1; { var b = a; print b; } }").unwrap();

        let mut depths: Vec<usize> = resolution.locals.values().copied().collect();
        depths.sort_unstable();

        // `a` one scope out, `b` in the same scope
        assert_eq!(depths, vec![0, 1]);
    }

    #[test]
    fn test_globals_are_not_recorded_as_locals() {
        let resolution = resolve("var g = 1; fn f() { return g; }").unwrap();

        assert!(resolution.locals.is_empty());
        assert!(resolution.globals.contains("g"));
        assert!(resolution.globals.contains("f"));
    }

    #[test]
    fn test_redeclaration_in_local_scope() {
        let err = resolve_err("{ var a = 1; var a = 2; }");
        assert!(err.message().contains("Already a variable named 'a'"));

        resolve_err("fn f(a, a) {}");
        // globals may be redeclared
        assert!(resolve("var a = 1; var a = 2;").is_ok());
    }

    #[test]
    fn test_read_in_own_initializer() {
        let err = resolve_err("var a = 1; { var a = a; }");
        assert!(err.message().contains("own initializer"));
    }

    #[test]
    fn test_return_outside_function() {
        resolve_err("return 1;");
    }

    #[test]
    fn test_return_value_from_initializer() {
        let err = resolve_err("class A { fn init() { return 1; } }");
        assert!(err.message().contains("initializer"));

        assert!(resolve("class A { fn init() { return; } }").is_ok());
    }

    #[test]
    fn test_break_and_continue_need_a_loop() {
        resolve_err("break;");
        resolve_err("while (true) { fn f() { continue; } }");
        assert!(resolve("while (true) { if (true) break; else continue; }").is_ok());
    }

    #[test]
    fn test_this_outside_class() {
        resolve_err("print this;");
        resolve_err("fn f() { return this; }");
    }

    #[test]
    fn test_super_misuse() {
        let err = resolve_err("fn f() { return super.g; }");
        assert!(err.message().contains("outside of a class"));

        let err = resolve_err("class A { fn f() { return super.f(); } }");
        assert!(err.message().contains("no superclass"));
    }

    #[test]
    fn test_class_cannot_extend_itself() {
        let err = resolve_err("class A extends A {}");
        assert!(err.message().contains("inherit from itself"));
    }

    #[test]
    fn test_inheritance_cycle_across_runs() {
        let tokens = tokenize("class A {} class B extends A {}").unwrap();
        let statements = Parser::new(&tokens).parse().unwrap();
        let first = Resolver::new(&StaticGlobals::new()).resolve(&statements).unwrap();

        let tokens = tokenize("class A extends B {}").unwrap();
        let statements = Parser::new(&tokens).parse().unwrap();
        let err = Resolver::new(&first.globals)
            .resolve(&statements)
            .unwrap_err();

        assert!(err.message().contains("Inheritance cycle"));
    }

    #[test]
    fn test_override_requires_ancestor_method() {
        let err = resolve_err("class A {} class B extends A { override fn f() {} }");
        assert!(err.message().contains("marked override"));

        resolve_err("class A { override fn f() {} }");

        assert!(resolve(
            "class A { virtual fn f() {} }\n\
             class B extends A {}\n\
             class C extends B { override fn f() {} }"
        )
        .is_ok());
    }

    #[test]
    fn test_local_class_does_not_leak_out_of_its_scope() {
        assert!(resolve(
            "class Base { virtual fn f() {} }\n\
             fn make() { class Base {} return Base; }\n\
             class Derived extends Base { override fn f() {} }"
        )
        .is_ok());

        assert!(resolve(
            "class A { virtual fn f() {} }\n\
             { class A {} }\n\
             class B extends A { override fn f() {} }"
        )
        .is_ok());

        let err = resolve_err(
            "class A { virtual fn f() {} }\n\
             fn make() { class A {} class B extends A { override fn f() {} } return B; }",
        );
        assert!(err.message().contains("marked override"));
    }

    #[test]
    fn test_duplicate_members() {
        resolve_err("class A { fn f() {} fn f() {} }");
        resolve_err("class A { var x; var x; }");
    }

    #[test]
    fn test_failed_resolution_commits_nothing() {
        let globals = StaticGlobals::new();

        let tokens = tokenize("var fresh = 1; print missing;").unwrap();
        let statements = Parser::new(&tokens).parse().unwrap();
        assert!(Resolver::new(&globals).resolve(&statements).is_err());

        assert!(!globals.contains("fresh"));
    }
}
