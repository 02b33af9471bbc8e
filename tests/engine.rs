#[cfg(test)]
mod engine_tests {
    use replit_lang as replit;

    use replit::config::Config;
    use replit::engine::Engine;
    use replit::error::{ErrorCategory, RuntimeErrorKind};
    use replit::output::WriterSink;
    use replit::value::Value;

    fn lines(engine: &mut Engine, source: &str) -> Vec<String> {
        match engine.run(source) {
            Ok(output) => output.lines().to_vec(),
            Err(report) => panic!("program failed: {}", report),
        }
    }

    #[test]
    fn test_globals_persist_between_runs() {
        let mut engine = Engine::new();

        lines(&mut engine, "var total = 1; fn bump() { total += 1; return total; }");
        assert_eq!(lines(&mut engine, "print bump();"), vec!["2"]);
        assert_eq!(lines(&mut engine, "print bump(), total;"), vec!["3 3"]);
    }

    #[test]
    fn test_classes_persist_between_runs() {
        let mut engine = Engine::new();

        lines(&mut engine, "class Animal { virtual fn sound() -> \"...\" }");
        lines(
            &mut engine,
            "class Dog extends Animal { override fn sound() -> \"woof\" }",
        );

        assert_eq!(
            lines(&mut engine, "print Animal().sound(), Dog().sound();"),
            vec!["... woof"]
        );
    }

    #[test]
    fn test_locals_from_separate_runs_do_not_collide() {
        let mut engine = Engine::new();

        assert_eq!(lines(&mut engine, "{ var a = 1; { print a; } }"), vec!["1"]);
        assert_eq!(
            lines(&mut engine, "fn f(x) { var y = x * 2; return y; } print f(4);"),
            vec!["8"]
        );
        assert_eq!(lines(&mut engine, "{ var b = 2; print b; }"), vec!["2"]);
    }

    #[test]
    fn test_static_error_runs_nothing_and_commits_nothing() {
        let mut engine = Engine::new();

        let report = engine
            .run("var fresh = 1; print \"hidden\"; print missing;")
            .unwrap_err();
        assert_eq!(report.category(), ErrorCategory::Resolve);
        assert!(report.output.is_empty());

        let report = engine.run("print fresh;").unwrap_err();
        assert_eq!(report.category(), ErrorCategory::Resolve);
    }

    #[test]
    fn test_runtime_error_keeps_definitions() {
        let mut engine = Engine::new();

        let report = engine.run("var kept = 5; print kept; print 1 / 0;").unwrap_err();
        assert_eq!(report.error.runtime_kind(), Some(RuntimeErrorKind::Arithmetic));
        assert_eq!(report.output.lines(), ["5".to_string()]);

        assert_eq!(lines(&mut engine, "print kept;"), vec!["5"]);
    }

    #[test]
    fn test_error_inside_call_restores_global_scope() {
        let mut engine = Engine::new();

        lines(&mut engine, "var g = \"global\";");
        engine
            .run("fn fail() { var g = \"local\"; return 1 / 0; } fail();")
            .unwrap_err();

        assert_eq!(lines(&mut engine, "print g;"), vec!["global"]);
    }

    #[test]
    fn test_lex_and_parse_errors_are_static() {
        let mut engine = Engine::new();

        let report = engine.run("print 1; print @;").unwrap_err();
        assert_eq!(report.category(), ErrorCategory::Lex);
        assert!(report.error.is_static());
        assert!(report.output.is_empty());

        let report = engine.run("print 1; var = 2;").unwrap_err();
        assert_eq!(report.category(), ErrorCategory::Parse);
        assert!(report.output.is_empty());
    }

    #[test]
    fn test_evaluate_expression() {
        let mut engine = Engine::new();

        engine.execute("var a = 20;").unwrap();

        assert_eq!(engine.evaluate("a * 2 + 2").unwrap(), Value::Number(42.0));
        assert_eq!(
            engine.evaluate("\"n = \" + a").unwrap(),
            Value::String("n = 20".to_string())
        );

        let err = engine.evaluate("nope").unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Resolve);
    }

    #[test]
    fn test_evaluate_calls_functions_with_locals() {
        let mut engine = Engine::new();

        engine
            .execute("fn twice(f, x) { var once = f(x); return f(once); }")
            .unwrap();

        assert_eq!(
            engine.evaluate("twice(fn (n) { return n + 3; }, 1)").unwrap(),
            Value::Number(7.0)
        );
    }

    #[test]
    fn test_writer_sink_streams_lines() {
        let mut engine = Engine::with_sink(WriterSink::new(Vec::new()), Config::default());

        engine.execute("print \"a\"; print 1, 2;").unwrap();
        assert!(engine.execute("print \"b\"; print nil + [];").is_err());

        let bytes: Vec<u8> = engine.into_sink().into_inner();
        assert_eq!(String::from_utf8(bytes).unwrap(), "a\n1 2\nb\n");
    }

    #[test]
    fn test_output_display_joins_lines() {
        let output = replit::run("print 1; print \"two\";").unwrap();
        assert_eq!(output.to_string(), "1\ntwo\n");
    }

    #[test]
    fn test_config_from_json() {
        let config = Config::from_json_str(r#"{ "max_call_depth": 4 }"#).unwrap();
        let mut engine = Engine::with_config(config);

        let program = "fn depth(n) { if (n == 0) return 0; return depth(n - 1) + 1; }";
        lines(&mut engine, program);

        assert_eq!(lines(&mut engine, "print depth(3);"), vec!["3"]);

        let report = engine.run("print depth(10);").unwrap_err();
        assert_eq!(
            report.error.runtime_kind(),
            Some(RuntimeErrorKind::StackOverflow)
        );
    }
}
