use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use yulstack_core::ast::{
    Assignment, Case, ExpressionStatement, ForLoop, FunctionDefinition, Identifier, If, Literal,
    Switch, TypedName, VariableDeclaration,
};
use yulstack_core::{
    language_to_dialect, AsmAnalyzer, Block, Dialect, DiagnosticKind, ErrorReporter, EvmVersion,
    Expression, Language, SourceLocation, Statement,
};

fn untyped() -> Dialect {
    language_to_dialect(Language::StrictAssembly, EvmVersion::default())
}

fn typed() -> Dialect {
    language_to_dialect(Language::Yul, EvmVersion::default())
}

fn expr_stmt(expression: Expression) -> Statement {
    Statement::Expression(ExpressionStatement {
        location: SourceLocation::unknown(),
        expression,
    })
}

fn let_stmt(names: &[(&str, &str)], value: Option<Expression>) -> Statement {
    Statement::VariableDeclaration(VariableDeclaration {
        location: SourceLocation::unknown(),
        variables: names.iter().map(|(n, t)| TypedName::new(*n, *t)).collect(),
        value,
    })
}

fn number(value: &str, ty: &str) -> Expression {
    Expression::Literal(Literal::number(value, ty))
}

fn function(name: &str, params: &[&str], rets: &[&str], body: Vec<Statement>) -> Statement {
    Statement::FunctionDefinition(FunctionDefinition {
        location: SourceLocation::unknown(),
        name: name.to_string(),
        parameters: params.iter().map(|p| TypedName::new(*p, "")).collect(),
        return_variables: rets.iter().map(|r| TypedName::new(*r, "")).collect(),
        body: Block::new(body),
    })
}

fn analyze(code: &Block, dialect: Dialect, data: &[&str]) -> (bool, ErrorReporter) {
    let data_names: BTreeSet<String> = data.iter().map(|d| d.to_string()).collect();
    let mut reporter = ErrorReporter::new();
    let ok = AsmAnalyzer::new()
        .analyze(code, dialect, &data_names, &mut reporter)
        .is_some();
    (ok, reporter)
}

fn kinds(reporter: &ErrorReporter) -> Vec<DiagnosticKind> {
    reporter.diagnostics().iter().map(|d| d.kind).collect()
}

#[test]
fn functions_are_hoisted_within_their_block() {
    let code = Block::new(vec![
        expr_stmt(Expression::call(
            "sstore",
            vec![number("0", ""), Expression::call("id", vec![number("7", "")])],
        )),
        function(
            "id",
            &["x"],
            &["r"],
            vec![Statement::Assignment(Assignment {
                location: SourceLocation::unknown(),
                variable_names: vec![Identifier::new("r")],
                value: Expression::identifier("x"),
            })],
        ),
    ]);

    let (ok, reporter) = analyze(&code, untyped(), &[]);
    assert!(ok, "{:?}", reporter.diagnostics());
}

#[test]
fn function_bodies_cannot_see_outer_variables() {
    let code = Block::new(vec![
        let_stmt(&[("outer", "")], Some(number("1", ""))),
        function(
            "f",
            &[],
            &[],
            vec![expr_stmt(Expression::call(
                "pop",
                vec![Expression::identifier("outer")],
            ))],
        ),
    ]);

    let (ok, reporter) = analyze(&code, untyped(), &[]);
    assert!(!ok);
    assert_eq!(kinds(&reporter), vec![DiagnosticKind::DeclarationError]);
}

#[test]
fn shadowing_and_builtin_names_are_rejected() {
    let code = Block::new(vec![
        let_stmt(&[("x", "")], None),
        Statement::Block(Block::new(vec![let_stmt(&[("x", "")], None)])),
        let_stmt(&[("add", "")], None),
    ]);

    let (ok, reporter) = analyze(&code, untyped(), &[]);
    assert!(!ok);
    assert_eq!(
        kinds(&reporter),
        vec![DiagnosticKind::DeclarationError, DiagnosticKind::DeclarationError]
    );
}

#[test]
fn expression_statements_must_not_return_values() {
    let code = Block::new(vec![expr_stmt(Expression::call("calldatasize", vec![]))]);
    let (ok, reporter) = analyze(&code, untyped(), &[]);
    assert!(!ok);
    assert_eq!(kinds(&reporter), vec![DiagnosticKind::TypeError]);
}

#[test]
fn declaration_arity_must_match() {
    let code = Block::new(vec![let_stmt(
        &[("a", ""), ("b", "")],
        Some(Expression::call("calldatasize", vec![])),
    )]);
    let (ok, reporter) = analyze(&code, untyped(), &[]);
    assert!(!ok);
    assert_eq!(kinds(&reporter), vec![DiagnosticKind::DeclarationError]);
}

#[test]
fn datasize_requires_a_known_data_name() {
    let code = Block::new(vec![
        let_stmt(
            &[("size", "")],
            Some(Expression::call(
                "datasize",
                vec![Expression::Literal(Literal::string("Runtime", ""))],
            )),
        ),
        let_stmt(
            &[("other", "")],
            Some(Expression::call(
                "dataoffset",
                vec![Expression::Literal(Literal::string("Missing", ""))],
            )),
        ),
        let_stmt(
            &[("dynamic", "")],
            Some(Expression::call("datasize", vec![Expression::identifier("size")])),
        ),
    ]);

    let (ok, reporter) = analyze(&code, untyped(), &["Root", "Runtime"]);
    assert!(!ok);
    assert_eq!(
        kinds(&reporter),
        vec![DiagnosticKind::TypeError, DiagnosticKind::TypeError]
    );
}

#[test]
fn data_references_are_recorded() {
    let code = Block::new(vec![let_stmt(
        &[("size", "")],
        Some(Expression::call(
            "datasize",
            vec![Expression::Literal(Literal::string("Runtime", ""))],
        )),
    )]);
    let data_names: BTreeSet<String> = ["Root".to_string(), "Runtime".to_string()].into();
    let mut reporter = ErrorReporter::new();
    let info = AsmAnalyzer::new()
        .analyze(&code, untyped(), &data_names, &mut reporter)
        .unwrap();
    assert_eq!(info.data_references.iter().collect::<Vec<_>>(), vec!["Runtime"]);
}

#[test]
fn loop_and_function_keywords_need_context() {
    let for_loop = Statement::ForLoop(ForLoop {
        location: SourceLocation::unknown(),
        pre: Block::new(vec![let_stmt(&[("i", "")], Some(number("0", "")))]),
        condition: Expression::call("lt", vec![Expression::identifier("i"), number("10", "")]),
        post: Block::new(vec![Statement::Break(SourceLocation::unknown())]),
        body: Block::new(vec![
            Statement::Continue(SourceLocation::unknown()),
            Statement::Break(SourceLocation::unknown()),
        ]),
    });
    let code = Block::new(vec![
        for_loop,
        function("f", &[], &[], vec![Statement::Leave(SourceLocation::unknown())]),
    ]);

    let (ok, reporter) = analyze(&code, untyped(), &[]);
    assert!(!ok);
    assert_eq!(kinds(&reporter), vec![DiagnosticKind::SyntaxError]);
}

#[test]
fn switch_rules() {
    let case = |value: Option<&str>| Case {
        location: SourceLocation::unknown(),
        value: value.map(|v| Literal::number(v, "")),
        body: Block::default(),
    };
    let code = Block::new(vec![
        Statement::Switch(Switch {
            location: SourceLocation::unknown(),
            expression: Expression::call("calldatasize", vec![]),
            cases: vec![case(Some("1")), case(Some("0x01")), case(None), case(None)],
        }),
        Statement::Switch(Switch {
            location: SourceLocation::unknown(),
            expression: number("0", ""),
            cases: vec![case(None)],
        }),
    ]);

    let (ok, reporter) = analyze(&code, untyped(), &[]);
    assert!(!ok);
    assert_eq!(
        kinds(&reporter),
        vec![
            DiagnosticKind::DeclarationError,
            DiagnosticKind::DeclarationError,
            DiagnosticKind::Warning,
        ]
    );
}

#[test]
fn typed_conditions_must_be_bool() {
    let if_with = |condition: Expression| {
        Statement::If(If {
            location: SourceLocation::unknown(),
            condition,
            body: Block::default(),
        })
    };
    let code = Block::new(vec![
        if_with(Expression::call(
            "lt",
            vec![number("1", "u256"), number("2", "u256")],
        )),
        if_with(number("1", "u256")),
        if_with(Expression::Literal(Literal::boolean(true, "bool"))),
    ]);

    let (ok, reporter) = analyze(&code, typed(), &[]);
    assert!(!ok);
    assert_eq!(kinds(&reporter), vec![DiagnosticKind::TypeError]);
}

#[test]
fn typed_argument_mismatch() {
    let code = Block::new(vec![
        let_stmt(&[("flag", "bool")], Some(Expression::Literal(Literal::boolean(false, "bool")))),
        expr_stmt(Expression::call(
            "sstore",
            vec![number("0", "u256"), Expression::identifier("flag")],
        )),
        let_stmt(&[("v", "u128")], None),
    ]);

    let (ok, reporter) = analyze(&code, typed(), &[]);
    assert!(!ok);
    assert_eq!(
        kinds(&reporter),
        vec![DiagnosticKind::TypeError, DiagnosticKind::TypeError]
    );
}

#[test]
fn warnings_alone_do_not_fail_analysis() {
    let code = Block::new(vec![Statement::Switch(Switch {
        location: SourceLocation::unknown(),
        expression: number("0", ""),
        cases: vec![Case {
            location: SourceLocation::unknown(),
            value: None,
            body: Block::default(),
        }],
    })]);

    let (ok, reporter) = analyze(&code, untyped(), &[]);
    assert!(ok);
    assert_eq!(kinds(&reporter), vec![DiagnosticKind::Warning]);
}
