#[cfg(test)]
mod parser_tests {
    use rox::ast::{ExprKind, LiteralValue, Stmt};
    use rox::error::LoxError;
    use rox::parse_source;
    use rox::token::TokenType;

    fn parse_ok(source: &str) -> Vec<Stmt> {
        match parse_source(source) {
            Ok(program) => program,
            Err(errors) => panic!(
                "unexpected parse errors: {:?}",
                errors.iter().map(|e| e.to_string()).collect::<Vec<_>>()
            ),
        }
    }

    fn parse_errors(source: &str) -> Vec<String> {
        match parse_source(source) {
            Ok(_) => panic!("expected parse errors for {:?}", source),
            Err(errors) => errors.iter().map(|e| e.to_string()).collect(),
        }
    }

    #[test]
    fn test_precedence_of_factor_over_term() {
        let program = parse_ok("print 1 + 2 * 3;");

        let Stmt::Print { expression, .. } = &program[0] else {
            panic!("expected print statement");
        };

        let ExprKind::Binary {
            left,
            operator,
            right,
        } = &expression.kind
        else {
            panic!("expected binary expression");
        };

        assert_eq!(operator.token_type, TokenType::PLUS);
        assert!(matches!(left.kind, ExprKind::Literal(LiteralValue::Number(n)) if n == 1.0));
        assert!(matches!(
            &right.kind,
            ExprKind::Binary { operator, .. } if operator.token_type == TokenType::STAR
        ));
    }

    #[test]
    fn test_assignment_is_right_associative() {
        let program = parse_ok("a = b = 3;");

        let Stmt::Expression(expr) = &program[0] else {
            panic!("expected expression statement");
        };

        let ExprKind::Assign { name, value } = &expr.kind else {
            panic!("expected assignment");
        };

        assert_eq!(name.lexeme, "a");
        assert!(matches!(&value.kind, ExprKind::Assign { name, .. } if name.lexeme == "b"));
    }

    #[test]
    fn test_property_assignment_becomes_set() {
        let program = parse_ok("a.b.c = 1;");

        let Stmt::Expression(expr) = &program[0] else {
            panic!("expected expression statement");
        };

        let ExprKind::Set { object, name, .. } = &expr.kind else {
            panic!("expected set expression");
        };

        assert_eq!(name.lexeme, "c");
        assert!(matches!(&object.kind, ExprKind::Get { name, .. } if name.lexeme == "b"));
    }

    #[test]
    fn test_for_desugars_into_while() {
        let program = parse_ok("for (var i = 0; i < 3; i = i + 1) print i;");

        assert_eq!(program.len(), 1);

        let Stmt::Block(outer) = &program[0] else {
            panic!("expected outer block");
        };

        assert!(matches!(&outer[0], Stmt::Var { name, .. } if name.lexeme == "i"));

        let Stmt::While { body, .. } = &outer[1] else {
            panic!("expected while loop");
        };

        let Stmt::Block(inner) = body.as_ref() else {
            panic!("expected body block with increment");
        };

        assert!(matches!(inner[0], Stmt::Print { .. }));
        assert!(matches!(
            &inner[1],
            Stmt::Expression(e) if matches!(e.kind, ExprKind::Assign { .. })
        ));
    }

    #[test]
    fn test_for_without_clauses_loops_on_true() {
        let program = parse_ok("for (;;) print 1;");

        let Stmt::While { condition, body } = &program[0] else {
            panic!("expected bare while loop");
        };

        assert!(matches!(condition.kind, ExprKind::Literal(LiteralValue::True)));
        assert!(matches!(body.as_ref(), Stmt::Print { .. }));
    }

    #[test]
    fn test_class_with_superclass_and_methods() {
        let program = parse_ok(
            "class B < A { init(x) { this.x = x; } speak() { return super.speak(); } }",
        );

        let Stmt::Class {
            name,
            superclass,
            methods,
        } = &program[0]
        else {
            panic!("expected class declaration");
        };

        assert_eq!(name.lexeme, "B");
        assert!(matches!(
            superclass.as_ref().map(|e| &e.kind),
            Some(ExprKind::Variable(t)) if t.lexeme == "A"
        ));

        let names: Vec<&str> = methods.iter().map(|m| m.name.lexeme.as_str()).collect();
        assert_eq!(names, vec!["init", "speak"]);
        assert_eq!(methods[0].params.len(), 1);
    }

    #[test]
    fn test_expression_ids_are_unique() {
        let first = parse_ok("a;");
        let second = parse_ok("a;");

        let (Stmt::Expression(a), Stmt::Expression(b)) = (&first[0], &second[0]) else {
            panic!("expected expression statements");
        };

        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_invalid_assignment_target() {
        let errors = parse_errors("1 + 2 = 3;");

        assert_eq!(
            errors,
            vec!["[line 1] Error at '=': Invalid assignment target.".to_string()]
        );
    }

    #[test]
    fn test_missing_semicolon_at_end() {
        let errors = parse_errors("print 1");

        assert_eq!(
            errors,
            vec!["[line 1] Error at end: Expect ';' after value.".to_string()]
        );
    }

    #[test]
    fn test_recovers_and_reports_every_error() {
        let errors = parse_errors("var = 1;\nprint 2;\nvar x = ;\nprint (3;");

        assert_eq!(
            errors,
            vec![
                "[line 1] Error at '=': Expect variable name.".to_string(),
                "[line 3] Error at ';': Expect expression.".to_string(),
                "[line 4] Error at ';': Expect ')' after expression.".to_string(),
            ]
        );
    }

    #[test]
    fn test_lex_and_parse_errors_reported_together() {
        let Err(errors) = parse_source("var a = @;") else {
            panic!("expected errors");
        };

        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[0], LoxError::Lex { .. }));
        assert!(matches!(errors[1], LoxError::Parse { .. }));
    }

    #[test]
    fn test_too_many_arguments() {
        let args: Vec<String> = (0..256).map(|i| i.to_string()).collect();
        let source = format!("f({});", args.join(", "));

        let errors = parse_errors(&source);

        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Can't have more than 255 arguments."));
    }
}
