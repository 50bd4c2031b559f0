use super::info::{AnalysisInfo, FunctionSignature};
use super::scope::{Lookup, ScopeStack, Symbol};
use crate::ast::{
    Assignment, Block, Expression, ForLoop, FunctionCall, FunctionDefinition, Identifier, Literal,
    LiteralKind, Statement, Switch, VariableDeclaration,
};
use crate::diagnostics::ErrorReporter;
use crate::dialect::Dialect;
use crate::source_location::SourceLocation;
use num_bigint::BigUint;
use num_traits::Num;
use std::collections::{BTreeSet, HashSet};

/// Reference semantic analyzer.
///
/// Recursion follows block nesting, which the parser bounds by [`crate::ast::MAX_BLOCK_DEPTH`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AsmAnalyzer;

impl AsmAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Returns `None` if any error was reported for `code`; warnings do not fail the analysis.
    pub fn analyze(
        &self,
        code: &Block,
        dialect: Dialect,
        data_names: &BTreeSet<String>,
        reporter: &mut ErrorReporter,
    ) -> Option<AnalysisInfo> {
        let errors_before = reporter.error_count();
        let mut run = AnalysisRun {
            dialect,
            data_names,
            reporter,
            scopes: ScopeStack::new(),
            info: AnalysisInfo::default(),
            in_function: false,
            in_loop_body: false,
        };
        run.block(code);

        let AnalysisRun { info, reporter, .. } = run;
        (reporter.error_count() == errors_before).then_some(info)
    }
}

/// Numeric value of a literal as the EVM sees it. Strings are left-aligned in a 32 byte word.
pub fn literal_value(literal: &Literal) -> Option<BigUint> {
    match literal.kind {
        LiteralKind::Number => match literal.value.strip_prefix("0x") {
            Some(digits) => BigUint::from_str_radix(digits, 16).ok(),
            None => BigUint::from_str_radix(&literal.value, 10).ok(),
        },
        LiteralKind::Boolean => Some(BigUint::from(u8::from(literal.value == "true"))),
        LiteralKind::String => {
            let mut bytes = literal.value.as_bytes().to_vec();
            if bytes.len() > 32 {
                return None;
            }
            bytes.resize(32, 0);
            Some(BigUint::from_bytes_be(&bytes))
        }
    }
}

struct AnalysisRun<'a> {
    dialect: Dialect,
    data_names: &'a BTreeSet<String>,
    reporter: &'a mut ErrorReporter,
    scopes: ScopeStack,
    info: AnalysisInfo,
    in_function: bool,
    in_loop_body: bool,
}

impl<'a> AnalysisRun<'a> {
    fn enter_scope(&mut self, function_boundary: bool) {
        self.scopes.push(function_boundary);
        self.info.max_scope_depth = self.info.max_scope_depth.max(self.scopes.depth());
    }

    fn block(&mut self, block: &Block) {
        self.enter_scope(false);
        self.register_functions(block);
        for statement in &block.statements {
            self.statement(statement);
        }
        self.scopes.pop();
    }

    /// Functions are visible in their whole block, including before their definition.
    fn register_functions(&mut self, block: &Block) {
        for definition in block.function_definitions() {
            for variable in definition
                .parameters
                .iter()
                .chain(&definition.return_variables)
            {
                self.check_type(&variable.ty, &variable.location);
            }
            let signature = FunctionSignature {
                name: definition.name.clone(),
                parameters: definition.parameters.iter().map(|p| p.ty.clone()).collect(),
                returns: definition
                    .return_variables
                    .iter()
                    .map(|r| r.ty.clone())
                    .collect(),
            };
            if self.declare(
                &definition.name,
                Symbol::Function(signature.clone()),
                &definition.location,
            ) {
                self.info.functions.push(signature);
            }
        }
    }

    fn declare(&mut self, name: &str, symbol: Symbol, location: &SourceLocation) -> bool {
        if self.dialect.builtin(name).is_some() {
            self.reporter.declaration_error(
                location.clone(),
                format!("Cannot use builtin function name \"{}\" as identifier name.", name),
            );
            return false;
        }
        if self.scopes.is_declared(name) {
            self.reporter.declaration_error(
                location.clone(),
                format!("Identifier \"{}\" already declared in an enclosing scope.", name),
            );
            return false;
        }
        self.scopes.insert(name, symbol);
        true
    }

    fn statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Expression(statement) => {
                if let Some(types) = self.expression(&statement.expression) {
                    if !types.is_empty() {
                        self.reporter.type_error(
                            statement.location.clone(),
                            format!(
                                "Top-level expressions are not supposed to return values (this expression returns {} value{}). Use ``pop()`` or assign them.",
                                types.len(),
                                if types.len() == 1 { "" } else { "s" }
                            ),
                        );
                    }
                }
            }
            Statement::Assignment(assignment) => self.assignment(assignment),
            Statement::VariableDeclaration(declaration) => self.variable_declaration(declaration),
            Statement::FunctionDefinition(definition) => self.function_definition(definition),
            Statement::If(statement) => {
                self.condition(&statement.condition);
                self.block(&statement.body);
            }
            Statement::Switch(switch) => self.switch(switch),
            Statement::ForLoop(for_loop) => self.for_loop(for_loop),
            Statement::Break(location) => self.loop_keyword("break", location),
            Statement::Continue(location) => self.loop_keyword("continue", location),
            Statement::Leave(location) => {
                if !self.in_function {
                    self.reporter.syntax_error(
                        location.clone(),
                        "Keyword \"leave\" can only be used inside a function.",
                    );
                }
            }
            Statement::Block(block) => self.block(block),
        }
    }

    fn loop_keyword(&mut self, keyword: &str, location: &SourceLocation) {
        if !self.in_loop_body {
            self.reporter.syntax_error(
                location.clone(),
                format!("Keyword \"{}\" needs to be inside a for-loop body.", keyword),
            );
        }
    }

    fn assignment(&mut self, assignment: &Assignment) {
        let mut seen = HashSet::new();
        let mut expected = Vec::with_capacity(assignment.variable_names.len());
        for variable in &assignment.variable_names {
            if !seen.insert(variable.name.as_str()) {
                self.reporter.declaration_error(
                    variable.location.clone(),
                    format!(
                        "Variable \"{}\" occurs multiple times on the left-hand side of the assignment.",
                        variable.name
                    ),
                );
            }
            expected.push(self.assigned_variable_type(variable));
        }

        let Some(given) = self.expression(&assignment.value) else {
            return;
        };
        if given.len() != expected.len() {
            self.reporter.declaration_error(
                assignment.location.clone(),
                format!(
                    "Variable count for assignment does not match number of values ({} vs. {}).",
                    expected.len(),
                    given.len()
                ),
            );
            return;
        }
        for ((expected, given), variable) in expected.iter().zip(&given).zip(&assignment.variable_names)
        {
            if let Some(expected) = expected {
                if expected != given {
                    self.reporter.type_error(
                        variable.location.clone(),
                        format!(
                            "Assigning a value of type \"{}\" to a variable of type \"{}\".",
                            given, expected
                        ),
                    );
                }
            }
        }
    }

    fn assigned_variable_type(&mut self, variable: &Identifier) -> Option<String> {
        match self.scopes.lookup(&variable.name) {
            Lookup::Visible(Symbol::Variable { ty }) => Some(ty),
            Lookup::Visible(Symbol::Function(_)) => {
                self.reporter.type_error(
                    variable.location.clone(),
                    format!("Assignment requires a variable, \"{}\" is a function.", variable.name),
                );
                None
            }
            Lookup::OutsideFunction => {
                self.reporter.declaration_error(
                    variable.location.clone(),
                    format!(
                        "Variable \"{}\" is not accessible from within this function.",
                        variable.name
                    ),
                );
                None
            }
            Lookup::Missing => {
                self.reporter.declaration_error(
                    variable.location.clone(),
                    format!("Variable \"{}\" not found.", variable.name),
                );
                None
            }
        }
    }

    fn variable_declaration(&mut self, declaration: &VariableDeclaration) {
        for variable in &declaration.variables {
            self.check_type(&variable.ty, &variable.location);
        }

        if let Some(value) = &declaration.value {
            if let Some(given) = self.expression(value) {
                if given.len() != declaration.variables.len() {
                    self.reporter.declaration_error(
                        declaration.location.clone(),
                        format!(
                            "Variable count mismatch for declaration of \"{}\": {} variables and {} values.",
                            declaration
                                .variables
                                .iter()
                                .map(|v| v.name.as_str())
                                .collect::<Vec<_>>()
                                .join(", "),
                            declaration.variables.len(),
                            given.len()
                        ),
                    );
                } else {
                    for (variable, given) in declaration.variables.iter().zip(&given) {
                        if &variable.ty != given {
                            self.reporter.type_error(
                                variable.location.clone(),
                                format!(
                                    "Assigning value of type \"{}\" to variable of type \"{}\".",
                                    given, variable.ty
                                ),
                            );
                        }
                    }
                }
            }
        }

        for variable in &declaration.variables {
            let symbol = Symbol::Variable {
                ty: variable.ty.clone(),
            };
            if self.declare(&variable.name, symbol, &variable.location) {
                self.info.variable_count += 1;
            }
        }
    }

    fn function_definition(&mut self, definition: &FunctionDefinition) {
        self.enter_scope(true);
        for variable in definition
            .parameters
            .iter()
            .chain(&definition.return_variables)
        {
            let symbol = Symbol::Variable {
                ty: variable.ty.clone(),
            };
            if self.declare(&variable.name, symbol, &variable.location) {
                self.info.variable_count += 1;
            }
        }

        let outer = (self.in_function, self.in_loop_body);
        self.in_function = true;
        self.in_loop_body = false;
        self.block(&definition.body);
        (self.in_function, self.in_loop_body) = outer;

        self.scopes.pop();
    }

    fn condition(&mut self, condition: &Expression) {
        if let Some(ty) = self.single_value(condition) {
            let bool_type = self.dialect.bool_type();
            if ty != bool_type {
                self.reporter.type_error(
                    condition.location().clone(),
                    format!(
                        "Expected a value of boolean type \"{}\" but got \"{}\".",
                        bool_type, ty
                    ),
                );
            }
        }
    }

    fn switch(&mut self, switch: &Switch) {
        let ty = self.single_value(&switch.expression);

        if switch.cases.len() == 1 && switch.cases[0].value.is_none() {
            self.reporter.warning(
                switch.location.clone(),
                "\"switch\" statement with only a default case.",
            );
        }

        let mut seen = BTreeSet::new();
        let mut defaults = 0;
        for case in &switch.cases {
            match &case.value {
                Some(literal) => {
                    if let Some(case_ty) = self.literal(literal) {
                        if let Some(ty) = &ty {
                            if &case_ty != ty {
                                self.reporter.type_error(
                                    literal.location.clone(),
                                    format!(
                                        "Expected a value of type \"{}\" but got \"{}\".",
                                        ty, case_ty
                                    ),
                                );
                            }
                        }
                        if let Some(value) = literal_value(literal) {
                            if !seen.insert(value) {
                                self.reporter.declaration_error(
                                    case.location.clone(),
                                    format!("Duplicate case \"{}\" defined.", literal.value),
                                );
                            }
                        }
                    }
                }
                None => {
                    defaults += 1;
                    if defaults > 1 {
                        self.reporter.declaration_error(
                            case.location.clone(),
                            "Only one default case allowed.",
                        );
                    }
                }
            }
            self.block(&case.body);
        }
    }

    /// The scope of `pre` stays open for the condition, the body and `post`.
    fn for_loop(&mut self, for_loop: &ForLoop) {
        self.enter_scope(false);
        self.register_functions(&for_loop.pre);

        let outer_loop = self.in_loop_body;
        self.in_loop_body = false;
        for statement in &for_loop.pre.statements {
            self.statement(statement);
        }
        self.condition(&for_loop.condition);

        self.in_loop_body = true;
        self.block(&for_loop.body);
        self.in_loop_body = false;
        self.block(&for_loop.post);
        self.in_loop_body = outer_loop;

        self.scopes.pop();
    }

    fn expression(&mut self, expression: &Expression) -> Option<Vec<String>> {
        match expression {
            Expression::Literal(literal) => self.literal(literal).map(|ty| vec![ty]),
            Expression::Identifier(identifier) => match self.scopes.lookup(&identifier.name) {
                Lookup::Visible(Symbol::Variable { ty }) => Some(vec![ty]),
                Lookup::Visible(Symbol::Function(_)) => {
                    self.reporter.type_error(
                        identifier.location.clone(),
                        format!(
                            "Function \"{}\" used without being called.",
                            identifier.name
                        ),
                    );
                    None
                }
                Lookup::OutsideFunction => {
                    self.reporter.declaration_error(
                        identifier.location.clone(),
                        format!(
                            "Identifier \"{}\" is not accessible from within this function.",
                            identifier.name
                        ),
                    );
                    None
                }
                Lookup::Missing => {
                    let message = if self.dialect.builtin(&identifier.name).is_some() {
                        format!("Builtin function \"{}\" must be called.", identifier.name)
                    } else {
                        format!("Identifier \"{}\" not found.", identifier.name)
                    };
                    self.reporter
                        .declaration_error(identifier.location.clone(), message);
                    None
                }
            },
            Expression::FunctionCall(call) => self.function_call(call),
        }
    }

    fn function_call(&mut self, call: &FunctionCall) -> Option<Vec<String>> {
        let name = &call.function_name.name;
        let builtin = self.dialect.builtin(name);
        let (parameters, returns) = match builtin {
            Some(builtin) => (builtin.parameters.clone(), builtin.returns.clone()),
            None => match self.scopes.lookup(name) {
                Lookup::Visible(Symbol::Function(signature)) => {
                    (signature.parameters, signature.returns)
                }
                Lookup::Visible(Symbol::Variable { .. }) | Lookup::OutsideFunction => {
                    self.reporter.type_error(
                        call.function_name.location.clone(),
                        "Attempt to call variable instead of function.",
                    );
                    self.skip_arguments(call);
                    return None;
                }
                Lookup::Missing => {
                    self.reporter.declaration_error(
                        call.function_name.location.clone(),
                        format!("Function \"{}\" not found.", name),
                    );
                    self.skip_arguments(call);
                    return None;
                }
            },
        };

        let mut valid = true;
        if call.arguments.len() != parameters.len() {
            self.reporter.type_error(
                call.function_name.location.clone(),
                format!(
                    "Function \"{}\" expects {} arguments but got {}.",
                    name,
                    parameters.len(),
                    call.arguments.len()
                ),
            );
            valid = false;
        }

        for (index, argument) in call.arguments.iter().enumerate() {
            if let Some(kind) = builtin.and_then(|b| b.requires_literal(index)) {
                match argument {
                    Expression::Literal(literal) if literal.kind == kind => {
                        if builtin.map_or(false, |b| b.references_data) {
                            if self.data_names.contains(&literal.value) {
                                self.info.data_references.insert(literal.value.clone());
                            } else {
                                self.reporter.type_error(
                                    literal.location.clone(),
                                    format!("Unknown data object \"{}\".", literal.value),
                                );
                                valid = false;
                            }
                        }
                        if kind == LiteralKind::Number && self.literal(literal).is_none() {
                            valid = false;
                        }
                    }
                    _ => {
                        self.reporter.type_error(
                            argument.location().clone(),
                            format!(
                                "Function \"{}\" expects a {} literal as argument {}.",
                                name,
                                literal_kind_name(kind),
                                index + 1
                            ),
                        );
                        valid = false;
                    }
                }
                continue;
            }

            match self.single_value(argument) {
                Some(ty) => {
                    if let Some(expected) = parameters.get(index) {
                        if &ty != expected {
                            self.reporter.type_error(
                                argument.location().clone(),
                                format!(
                                    "Expected a value of type \"{}\" but got \"{}\".",
                                    expected, ty
                                ),
                            );
                            valid = false;
                        }
                    }
                }
                None => valid = false,
            }
        }

        valid.then_some(returns)
    }

    fn skip_arguments(&mut self, call: &FunctionCall) {
        for argument in &call.arguments {
            self.expression(argument);
        }
    }

    fn single_value(&mut self, expression: &Expression) -> Option<String> {
        let types = self.expression(expression)?;
        if types.len() != 1 {
            self.reporter.type_error(
                expression.location().clone(),
                format!(
                    "Expected expression to evaluate to one value, but got {} values instead.",
                    types.len()
                ),
            );
            return None;
        }
        types.into_iter().next()
    }

    fn literal(&mut self, literal: &Literal) -> Option<String> {
        if !self.check_type(&literal.ty, &literal.location) {
            return None;
        }
        match literal.kind {
            LiteralKind::Number => {
                if literal_value(literal).map_or(true, |value| value.bits() > 256) {
                    self.reporter.type_error(
                        literal.location.clone(),
                        format!("Number literal \"{}\" is invalid or too large (> 256 bits).", literal.value),
                    );
                    return None;
                }
            }
            LiteralKind::String => {
                if literal.value.len() > 32 {
                    self.reporter.type_error(
                        literal.location.clone(),
                        format!("String literal too long ({} > 32).", literal.value.len()),
                    );
                    return None;
                }
            }
            LiteralKind::Boolean => {
                if literal.ty != self.dialect.bool_type() {
                    self.reporter.type_error(
                        literal.location.clone(),
                        format!(
                            "Invalid type \"{}\" for literal \"{}\".",
                            literal.ty, literal.value
                        ),
                    );
                    return None;
                }
            }
        }
        Some(literal.ty.clone())
    }

    fn check_type(&mut self, ty: &str, location: &SourceLocation) -> bool {
        if self.dialect.is_valid_type(ty) {
            return true;
        }
        self.reporter.type_error(
            location.clone(),
            format!(
                "\"{}\" is not a valid type (user defined types are not yet supported).",
                ty
            ),
        );
        false
    }
}

fn literal_kind_name(kind: LiteralKind) -> &'static str {
    match kind {
        LiteralKind::Number => "number",
        LiteralKind::String => "string",
        LiteralKind::Boolean => "boolean",
    }
}
