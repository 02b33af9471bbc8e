#[cfg(test)]
mod scanner_tests {
    use replit_lang as replit;

    use replit::error::{ErrorCategory, ReplitError};
    use replit::scanner::*;
    use replit::token::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source);
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*})[];:%",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::LEFT_BRACKET, "["),
                (TokenType::RIGHT_BRACKET, "]"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::COLON, ":"),
                (TokenType::PERCENT, "%"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_two_char_operators() {
        assert_token_sequence(
            "== != <= >= -> += -= *= /= && ||",
            &[
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::ARROW, "->"),
                (TokenType::PLUS_EQUAL, "+="),
                (TokenType::MINUS_EQUAL, "-="),
                (TokenType::STAR_EQUAL, "*="),
                (TokenType::SLASH_EQUAL, "/="),
                (TokenType::AND, "&&"),
                (TokenType::OR, "||"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_keywords_and_identifiers() {
        assert_token_sequence(
            "class Dog extends Animal { private virtual override protected public } let letter",
            &[
                (TokenType::CLASS, "class"),
                (TokenType::IDENTIFIER, "Dog"),
                (TokenType::EXTENDS, "extends"),
                (TokenType::IDENTIFIER, "Animal"),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::PRIVATE, "private"),
                (TokenType::VIRTUAL, "virtual"),
                (TokenType::OVERRIDE, "override"),
                (TokenType::PROTECTED, "protected"),
                (TokenType::PUBLIC, "public"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::VAR, "let"),
                (TokenType::IDENTIFIER, "letter"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_04_comments_are_skipped() {
        assert_token_sequence(
            "a // line comment\n/* block\ncomment */ b / c",
            &[
                (TokenType::IDENTIFIER, "a"),
                (TokenType::IDENTIFIER, "b"),
                (TokenType::SLASH, "/"),
                (TokenType::IDENTIFIER, "c"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_number_literals() {
        let tokens = tokenize("42 2.75 7.").unwrap();

        assert!(matches!(tokens[0].token_type, TokenType::NUMBER(n) if n == 42.0));
        assert!(matches!(tokens[1].token_type, TokenType::NUMBER(n) if n == 2.75));
        // a trailing dot is not part of the number
        assert!(matches!(tokens[2].token_type, TokenType::NUMBER(n) if n == 7.0));
        assert_eq!(tokens[3].token_type, TokenType::DOT);

        assert_eq!(tokens[0].to_string(), "NUMBER 42 42.0");
        assert_eq!(tokens[1].to_string(), "NUMBER 2.75 2.75");
    }

    #[test]
    fn test_string_escapes() {
        let tokens = tokenize(r#""tab\there \"quoted\" \\ done\n""#).unwrap();

        match &tokens[0].token_type {
            TokenType::STRING(s) => assert_eq!(s, "tab\there \"quoted\" \\ done\n"),
            other => panic!("expected string, got {:?}", other),
        }
    }

    #[test]
    fn test_positions_track_lines_and_columns() {
        let tokens = tokenize("var x = 1;\n  print x;").unwrap();

        assert_eq!(tokens[0].position(), Position::new(1, 1));
        assert_eq!(tokens[1].position(), Position::new(1, 5));
        assert_eq!(tokens[5].position(), Position::new(2, 3)); // print
        assert_eq!(tokens[6].position(), Position::new(2, 9)); // x
    }

    #[test]
    fn test_block_comment_advances_lines() {
        let tokens = tokenize("/* one\ntwo\nthree */ x").unwrap();
        assert_eq!(tokens[0].position(), Position::new(3, 10));
    }

    #[test]
    fn test_unexpected_chars_token_sequence() {
        let source = ",.$(#";
        let scanner = Scanner::new(source);

        let results: Vec<_> = scanner.collect();

        // 0: COMMA ','
        // 1: DOT '.'
        // 2: Error for '$'
        // 3: LEFT_PAREN '('
        // 4: Error for '#'
        // 5: EOF
        assert_eq!(results.len(), 6, "Expected 6 items in result");

        assert_token_matches(&results[0], TokenType::COMMA, ",");
        assert_token_matches(&results[1], TokenType::DOT, ".");
        assert_token_matches(&results[3], TokenType::LEFT_PAREN, "(");
        assert_token_matches(&results[5], TokenType::EOF, "");

        let error_count = results.iter().filter(|r| r.is_err()).count();
        assert_eq!(error_count, 2, "Expected 2 error messages");

        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert_eq!(err.category(), ErrorCategory::Lex);
            assert!(
                err.to_string().contains("Unexpected character"),
                "Error message should contain 'Unexpected character', got: {}",
                err
            );
        }

        fn assert_token_matches(
            result: &Result<Token, ReplitError>,
            expected_type: TokenType,
            expected_lexeme: &str,
        ) {
            match result {
                Ok(token) => {
                    assert_eq!(
                        token.token_type, expected_type,
                        "Expected token type {:?}, got {:?}",
                        expected_type, token.token_type
                    );
                    assert_eq!(
                        token.lexeme, expected_lexeme,
                        "Expected lexeme '{}', got '{}'",
                        expected_lexeme, token.lexeme
                    );
                }
                Err(e) => panic!("Expected token but got error: {}", e),
            }
        }
    }

    #[test]
    fn test_non_ascii_is_reported_once() {
        let results: Vec<_> = Scanner::new("a é b").collect();

        assert_eq!(results.iter().filter(|r| r.is_err()).count(), 1);
        assert_eq!(results.len(), 4); // a, error, b, EOF
    }

    #[test]
    fn test_unterminated_string_has_position() {
        let err = tokenize("print \"oops").unwrap_err();

        assert_eq!(err.category(), ErrorCategory::Lex);
        assert_eq!(err.position(), Some(Position::new(1, 7)));
        assert!(err.message().contains("Unterminated string"));
    }

    #[test]
    fn test_unterminated_block_comment() {
        let err = tokenize("x /* never closed").unwrap_err();
        assert!(err.message().contains("Unterminated block comment"));
    }

    #[test]
    fn test_invalid_escape() {
        let err = tokenize(r#""bad \q escape""#).unwrap_err();
        assert!(err.message().contains("Invalid escape sequence"));
    }

    #[test]
    fn test_single_eof_and_fused() {
        let mut scanner = Scanner::new("x");

        assert!(scanner.next().is_some()); // x
        assert!(matches!(scanner.next(), Some(Ok(t)) if t.token_type == TokenType::EOF));
        assert!(scanner.next().is_none());
        assert!(scanner.next().is_none());
    }

    #[test]
    fn test_reset_restarts_from_beginning() {
        let mut scanner = Scanner::new("a b");
        let first: Vec<_> = scanner.by_ref().filter_map(Result::ok).collect();

        scanner.reset();
        let second: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(first, second);
        assert_eq!(second.len(), 3);
    }
}
