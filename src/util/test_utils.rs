use crate::{
    analyzer, compiler, lexer, parser,
    token::Spanned,
    util::fmt::tree,
};

pub fn format_errors<E: std::fmt::Display>(e: &[Spanned<E>]) -> Vec<String> {
    e.iter().map(|e| format!("{e:#}")).collect()
}

/// Each variant contains the input.
pub enum Test {
    ParserProgram(&'static str),
    ParserExpr(&'static str),
    AnalyzerProgram(&'static str),
    AnalyzerExpr(&'static str),
    EmitterProgram(&'static str),
}

pub enum Assertion {
    TreeOk(&'static str),
    ExpectedErrors(&'static [&'static str]),
}

/// Runs the stages `test` asks for, returning the printed result (a tree or
/// IR text) and the formatted errors. Stages past a failing one don't run.
#[track_caller]
pub fn run_pipeline(test: Test) -> (String, Vec<String>) {
    let lex = |input: &str| lexer::lex_in_new(input).expect("test input must lex");

    match test {
        Test::ParserProgram(input) => match parser::parse_program(&lex(input)) {
            Ok(prog) => (tree::print_program_string(&prog), vec![]),
            Err(error) => (String::new(), format_errors(&[error])),
        },
        Test::ParserExpr(input) => match parser::parse_expr(&lex(input)) {
            Ok(expr) => (tree::print_expr_string(&expr), vec![]),
            Err(error) => (String::new(), format_errors(&[error])),
        },
        Test::AnalyzerProgram(input) => {
            let prog = match parser::parse_program(&lex(input)) {
                Ok(prog) => prog,
                Err(error) => return (String::new(), format_errors(&[error])),
            };
            match analyzer::check(prog) {
                Ok(prog) => (tree::print_program_string(&prog), vec![]),
                Err(error) => (String::new(), format_errors(&[error])),
            }
        }
        Test::AnalyzerExpr(input) => {
            let expr = match parser::parse_expr(&lex(input)) {
                Ok(expr) => expr,
                Err(error) => return (String::new(), format_errors(&[error])),
            };
            match analyzer::check_expr(expr) {
                Ok(expr) => (tree::print_expr_string(&expr), vec![]),
                Err(error) => (String::new(), format_errors(&[error])),
            }
        }
        Test::EmitterProgram(input) => match compiler::compile_to_ir(input) {
            Ok(ir) => (ir, vec![]),
            Err(error) => (String::new(), vec![format!("{error:#}")]),
        },
    }
}

#[track_caller]
pub fn run_assertion(assertion: Assertion, formatted_actual: &str, formatted_actual_errors: &[String]) {
    match assertion {
        Assertion::TreeOk(expected_tree) => {
            let expected_errors: &[&str] = &[];
            ::pretty_assertions::assert_eq!(formatted_actual_errors, expected_errors);
            ::pretty_assertions::assert_eq!(formatted_actual.trim(), expected_tree.trim());
        }
        Assertion::ExpectedErrors(expected_errors) => {
            ::pretty_assertions::assert_eq!(formatted_actual_errors, expected_errors)
        }
    }
}

macro_rules! tree_tests {
    (
        use $test_kind:ident;

        $(
            fn $test_name:ident() {
                let $source_kind:ident = $source:expr;
                $($assertions_tt:tt)*
            }
        )*
    ) => {
        $(
            #[test]
            fn $test_name() {
                let test: crate::util::test_utils::Test =
                    tree_tests!(@@get_test($test_kind, $source_kind), $source);
                let (formatted_actual, formatted_actual_errors) =
                    crate::util::test_utils::run_pipeline(test);
                let ctx = (&formatted_actual, &formatted_actual_errors);
                tree_tests!(@@expand_assertions, ctx, [$($assertions_tt)*]);
            }
        )*
    };

    (@@expand_assertions, $ctx:expr, []) => {};
    (@@expand_assertions, $ctx:expr, [
        let $assertion:ident = $assertion_expected:expr;
        $($rest_assertions_tt:tt)*
    ]) => {
        crate::util::test_utils::run_assertion(
            tree_tests!(@@assertion, $assertion, $assertion_expected),
            $ctx.0,
            $ctx.1,
        );
        tree_tests!(@@expand_assertions, $ctx, [$($rest_assertions_tt)*]);
    };

    (@@assertion, tree_ok, $expected:expr) => {
        crate::util::test_utils::Assertion::TreeOk(::indoc::indoc! { $expected })
    };
    (@@assertion, ir_ok, $expected:expr) => {
        crate::util::test_utils::Assertion::TreeOk(::indoc::indoc! { $expected })
    };
    (@@assertion, expected_errors, $expected:expr) => {
        crate::util::test_utils::Assertion::ExpectedErrors($expected)
    };

    (@@get_test(parser, program), $source:expr) => {
        crate::util::test_utils::Test::ParserProgram($source)
    };
    (@@get_test(parser, expr), $source:expr) => {
        crate::util::test_utils::Test::ParserExpr($source)
    };
    (@@get_test(analyzer, program), $source:expr) => {
        crate::util::test_utils::Test::AnalyzerProgram($source)
    };
    (@@get_test(analyzer, expr), $source:expr) => {
        crate::util::test_utils::Test::AnalyzerExpr($source)
    };
    (@@get_test(emitter, program), $source:expr) => {
        crate::util::test_utils::Test::EmitterProgram($source)
    };
}
pub(crate) use tree_tests;
