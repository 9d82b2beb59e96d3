mod common;

#[cfg(test)]
mod resolver_tests {
    use crate::common;

    use rox::error::{LoxError, ResolveErrorKind};
    use rox::parse_source;
    use rox::resolver::Resolver;
    use rox::Interpreter;

    fn resolve_kind(source: &str) -> ResolveErrorKind {
        let program = parse_source(source).unwrap_or_else(|_| panic!("parse failed"));
        let mut interpreter = Interpreter::new();

        match Resolver::new(&mut interpreter).resolve(&program) {
            Err(e) => e.kind,
            Ok(()) => panic!("expected a resolve error for {:?}", source),
        }
    }

    #[test]
    fn test_local_read_in_own_initializer() {
        assert_eq!(
            resolve_kind("{ var a = 1; { var a = a; } }"),
            ResolveErrorKind::InitializerSelfReference
        );
    }

    #[test]
    fn test_global_read_in_own_initializer_is_allowed() {
        let (output, result) = common::run("var a = 1; var a = a + 1; print a;");

        assert!(result.is_ok());
        assert_eq!(output, "2\n");
    }

    #[test]
    fn test_return_at_top_level() {
        assert_eq!(
            resolve_kind("return 1;"),
            ResolveErrorKind::ReturnOutsideFunction
        );
    }

    #[test]
    fn test_return_value_from_initializer() {
        assert_eq!(
            resolve_kind("class A { init() { return 1; } }"),
            ResolveErrorKind::ReturnValueFromInitializer
        );
    }

    #[test]
    fn test_bare_return_from_initializer_is_allowed() {
        let output =
            common::run_ok("class A { init() { this.x = 1; return; this.x = 2; } } print A().x;");

        assert_eq!(output, "1\n");
    }

    #[test]
    fn test_this_outside_class() {
        assert_eq!(resolve_kind("print this;"), ResolveErrorKind::ThisOutsideClass);
        assert_eq!(
            resolve_kind("fun f() { return this; }"),
            ResolveErrorKind::ThisOutsideClass
        );
    }

    #[test]
    fn test_super_outside_class() {
        assert_eq!(
            resolve_kind("fun f() { super.g(); }"),
            ResolveErrorKind::SuperOutsideClass
        );
    }

    #[test]
    fn test_super_without_superclass() {
        assert_eq!(
            resolve_kind("class A { f() { super.f(); } }"),
            ResolveErrorKind::SuperWithoutSuperclass
        );
    }

    #[test]
    fn test_class_inheriting_from_itself() {
        assert_eq!(resolve_kind("class A < A {}"), ResolveErrorKind::SelfInheritance);
    }

    #[test]
    fn test_redeclaration_in_local_scope_is_allowed() {
        let output = common::run_ok("{ var a = 1; var a = 2; print a; }");

        assert_eq!(output, "2\n");
    }

    #[test]
    fn test_resolve_error_stops_whole_program() {
        let (output, result) = common::run("print 1; return 2;");

        assert_eq!(output, "");

        let errors = result.expect_err("expected a resolve error");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].is_static());
        assert_eq!(
            errors[0].to_string(),
            "[line 1] Error at 'return': Can't return from top-level code."
        );
        assert!(matches!(errors[0], LoxError::Resolve(_)));
    }

    #[test]
    fn test_closure_binds_to_declaration_scope() {
        // The closure keeps seeing the global, not the later local shadow.
        let output = common::run_ok(
            r#"
            var a = "global";
            {
                fun show() { print a; }
                show();
                var a = "block";
                show();
            }
            "#,
        );

        assert_eq!(output, "global\nglobal\n");
    }
}
