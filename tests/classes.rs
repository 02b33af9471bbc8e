#[cfg(test)]
mod classes_tests {
    use replit_lang as replit;

    use replit::engine::{run, ErrorReport};
    use replit::error::RuntimeErrorKind;

    fn run_ok(source: &str) -> Vec<String> {
        match run(source) {
            Ok(output) => output.lines().to_vec(),
            Err(report) => panic!("program failed: {}", report),
        }
    }

    fn run_err(source: &str) -> ErrorReport {
        run(source).expect_err("expected the program to fail")
    }

    #[test]
    fn test_override_dispatch_and_super() {
        let program = "class A {\n\
                           virtual fn f() -> \"A\"\n\
                           fn g() { return this.f(); }\n\
                       }\n\
                       class B extends A {\n\
                           override fn f() -> \"B\"\n\
                           fn parent() { return super.f(); }\n\
                       }\n\
                       var b = B();\n\
                       print b.f(), b.g(), b.parent();\n\
                       print A().g();";

        assert_eq!(run_ok(program), vec!["B B A", "A"]);
    }

    #[test]
    fn test_dispatch_through_three_levels() {
        let program = "class A { virtual fn name() -> \"A\" fn hello() { return \"I am \" + this.name(); } }\n\
                       class B extends A { override fn name() -> \"B\" }\n\
                       class C extends B {}\n\
                       print C().hello();";

        assert_eq!(run_ok(program), vec!["I am B"]);
    }

    #[test]
    fn test_super_call_uses_parent_private_helper() {
        let program = "class A {\n\
                           private fn secret() -> \"s\"\n\
                           fn tell() { return this.secret(); }\n\
                       }\n\
                       class B extends A {\n\
                           override fn tell() { return \"B\" + super.tell(); }\n\
                       }\n\
                       print B().tell();";

        assert_eq!(run_ok(program), vec!["Bs"]);
    }

    #[test]
    fn test_private_method_outside_class() {
        let report = run_err(
            "class A {\n\
                 private fn secret() -> 1\n\
                 fn reveal() { return this.secret(); }\n\
             }\n\
             var a = A();\n\
             print a.reveal();\n\
             a.secret();",
        );

        assert_eq!(report.error.runtime_kind(), Some(RuntimeErrorKind::Access));
        assert_eq!(report.output.lines(), ["1".to_string()]);
        assert!(report.error.message().contains("private method 'secret'"));
    }

    #[test]
    fn test_private_method_from_subclass() {
        let report = run_err(
            "class A { private fn secret() -> 1 }\n\
             class B extends A { fn peek() { return this.secret(); } }\n\
             B().peek();",
        );

        assert_eq!(report.error.runtime_kind(), Some(RuntimeErrorKind::Access));
    }

    #[test]
    fn test_protected_method() {
        let report = run_err(
            "class A { protected fn shared() -> \"p\" }\n\
             class B extends A { fn use_it() { return this.shared(); } }\n\
             print B().use_it();\n\
             A().shared();",
        );

        assert_eq!(report.output.lines(), ["p".to_string()]);
        assert_eq!(report.error.runtime_kind(), Some(RuntimeErrorKind::Access));
    }

    #[test]
    fn test_private_field() {
        let program = "class Account {\n\
                           private var balance = 42;\n\
                           fn peek() -> this.balance\n\
                       }\n\
                       var a = Account();\n\
                       print a.peek();\n";

        assert_eq!(run_ok(program), vec!["42"]);

        let report = run_err(&format!("{}print a.balance;", program));
        assert_eq!(report.error.runtime_kind(), Some(RuntimeErrorKind::Access));

        let report = run_err(&format!("{}a.balance = 0;", program));
        assert_eq!(report.error.runtime_kind(), Some(RuntimeErrorKind::Access));
    }

    #[test]
    fn test_protected_field_from_subclass() {
        let program = "class Unit { protected var hp = 10; }\n\
                       class Knight extends Unit { fn hit() { this.hp -= 3; return this.hp; } }\n\
                       print Knight().hit();";

        assert_eq!(run_ok(program), vec!["7"]);
    }

    #[test]
    fn test_field_initializers_run_ancestor_first() {
        let program = "var order = [];\n\
                       fn note(s) { push(order, s); return s; }\n\
                       class A { var a = note(\"A\"); var shared = \"from A\"; }\n\
                       class B extends A { var b = note(\"B\"); var shared = \"from B\"; }\n\
                       var b = B();\n\
                       print order;\n\
                       print b.a, b.b, b.shared;";

        assert_eq!(
            run_ok(program),
            vec![r#"["A", "B"]"#, "A B from B"]
        );
    }

    #[test]
    fn test_fields_default_to_nil_and_exist_before_init() {
        let program = "class P {\n\
                           var x;\n\
                           var y = 0;\n\
                           fn init() { print this.x, this.y; this.x = 1; }\n\
                       }\n\
                       print P().x;";

        assert_eq!(run_ok(program), vec!["nil 0", "1"]);
    }

    #[test]
    fn test_init_arity() {
        let program = "class Point { fn init(x, y) { this.x = x; this.y = y; } }\n\
                       var p = Point(1, 2);\n\
                       print p.x + p.y;\n";

        assert_eq!(run_ok(program), vec!["3"]);

        let report = run_err(&format!("{}Point(1);", program));
        assert_eq!(report.error.runtime_kind(), Some(RuntimeErrorKind::Arity));

        let report = run_err("class Empty {} Empty(1);");
        assert_eq!(report.error.runtime_kind(), Some(RuntimeErrorKind::Arity));
    }

    #[test]
    fn test_init_is_inherited() {
        let program = "class A { fn init(n) { this.n = n; } }\n\
                       class B extends A {}\n\
                       print B(5).n;";

        assert_eq!(run_ok(program), vec!["5"]);
    }

    #[test]
    fn test_init_returns_the_instance() {
        let program = "class C {\n\
                           fn init(stop) { this.v = 1; if (stop) return; this.v = 2; }\n\
                       }\n\
                       var c = C(true);\n\
                       print c.v;\n\
                       print c.init(false) == c, c.v;";

        assert_eq!(run_ok(program), vec!["1", "true 2"]);
    }

    #[test]
    fn test_private_constructor() {
        let report = run_err("class S { private fn init() {} } S();");
        assert_eq!(report.error.runtime_kind(), Some(RuntimeErrorKind::Access));
    }

    #[test]
    fn test_bound_method_remembers_this() {
        let program = "class Counter {\n\
                           var n = 0;\n\
                           fn inc() { this.n += 1; return this.n; }\n\
                       }\n\
                       var c = Counter();\n\
                       var inc = c.inc;\n\
                       inc();\n\
                       print inc(), c.n;";

        assert_eq!(run_ok(program), vec!["2 2"]);
    }

    #[test]
    fn test_fields_shadow_methods() {
        let program = "class A { fn f() -> \"method\" }\n\
                       var a = A();\n\
                       print a.f();\n\
                       a.f = fn () { return \"field\"; };\n\
                       print a.f();";

        assert_eq!(run_ok(program), vec!["method", "field"]);
    }

    #[test]
    fn test_display_of_classes_and_instances() {
        let program = "class A { fn f() {} }\n\
                       var a = A();\n\
                       print A, a, a.f, type_of(a), type_of(A);";

        assert_eq!(
            run_ok(program),
            vec!["<class A> <A instance> <fn f> instance class"]
        );
    }

    #[test]
    fn test_undefined_property() {
        let report = run_err("class A {} print A().missing;");

        assert_eq!(report.error.runtime_kind(), Some(RuntimeErrorKind::Reference));
        assert!(report.error.message().contains("Undefined property 'missing'"));
    }

    #[test]
    fn test_property_on_non_instance() {
        let report = run_err("var n = 3; print n.size;");
        assert_eq!(report.error.runtime_kind(), Some(RuntimeErrorKind::Type));
    }

    #[test]
    fn test_superclass_must_be_a_class() {
        let report = run_err("var NotAClass = 1; class A extends NotAClass {}");
        assert_eq!(report.error.runtime_kind(), Some(RuntimeErrorKind::Type));
    }

    #[test]
    fn test_methods_close_over_declaring_scope() {
        let program = "fn make() {\n\
                           var greeting = \"hi\";\n\
                           class Greeter { fn greet(name) -> greeting + \" \" + name }\n\
                           return Greeter;\n\
                       }\n\
                       var G = make();\n\
                       print G().greet(\"bob\");";

        assert_eq!(run_ok(program), vec!["hi bob"]);
    }
}
