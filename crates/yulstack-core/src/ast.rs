/*! Yul code AST.
 *
 * Types are plain strings so that every dialect can bring its own type names. An empty type
 * string is the untyped case used by the EVM assembly dialects.
 */

use crate::source_location::SourceLocation;

/// Parser-enforced bound on nested blocks and call expressions. Every recursive walk over the
/// AST relies on it.
pub const MAX_BLOCK_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedName {
    pub location: SourceLocation,
    pub name: String,
    pub ty: String,
}

impl TypedName {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            location: SourceLocation::unknown(),
            name: name.into(),
            ty: ty.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    Number,
    String,
    Boolean,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literal {
    pub location: SourceLocation,
    pub kind: LiteralKind,
    /// Numbers keep their source spelling, strings hold the unescaped text.
    pub value: String,
    pub ty: String,
}

impl Literal {
    pub fn number(value: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            location: SourceLocation::unknown(),
            kind: LiteralKind::Number,
            value: value.into(),
            ty: ty.into(),
        }
    }

    pub fn string(value: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            location: SourceLocation::unknown(),
            kind: LiteralKind::String,
            value: value.into(),
            ty: ty.into(),
        }
    }

    pub fn boolean(value: bool, ty: impl Into<String>) -> Self {
        Self {
            location: SourceLocation::unknown(),
            kind: LiteralKind::Boolean,
            value: value.to_string(),
            ty: ty.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    pub location: SourceLocation,
    pub name: String,
}

impl Identifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            location: SourceLocation::unknown(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionCall {
    pub location: SourceLocation,
    pub function_name: Identifier,
    pub arguments: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    FunctionCall(FunctionCall),
    Identifier(Identifier),
    Literal(Literal),
}

impl Expression {
    pub fn location(&self) -> &SourceLocation {
        match self {
            Expression::FunctionCall(call) => &call.location,
            Expression::Identifier(identifier) => &identifier.location,
            Expression::Literal(literal) => &literal.location,
        }
    }

    pub fn call(name: impl Into<String>, arguments: Vec<Expression>) -> Self {
        Expression::FunctionCall(FunctionCall {
            location: SourceLocation::unknown(),
            function_name: Identifier::new(name),
            arguments,
        })
    }

    pub fn identifier(name: impl Into<String>) -> Self {
        Expression::Identifier(Identifier::new(name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressionStatement {
    pub location: SourceLocation,
    pub expression: Expression,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub location: SourceLocation,
    pub variable_names: Vec<Identifier>,
    pub value: Expression,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableDeclaration {
    pub location: SourceLocation,
    pub variables: Vec<TypedName>,
    pub value: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDefinition {
    pub location: SourceLocation,
    pub name: String,
    pub parameters: Vec<TypedName>,
    pub return_variables: Vec<TypedName>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct If {
    pub location: SourceLocation,
    pub condition: Expression,
    pub body: Block,
}

/// A `case` with `value == None` is the `default` branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Case {
    pub location: SourceLocation,
    pub value: Option<Literal>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Switch {
    pub location: SourceLocation,
    pub expression: Expression,
    pub cases: Vec<Case>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForLoop {
    pub location: SourceLocation,
    pub pre: Block,
    pub condition: Expression,
    pub post: Block,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Expression(ExpressionStatement),
    Assignment(Assignment),
    VariableDeclaration(VariableDeclaration),
    FunctionDefinition(FunctionDefinition),
    If(If),
    Switch(Switch),
    ForLoop(ForLoop),
    Break(SourceLocation),
    Continue(SourceLocation),
    Leave(SourceLocation),
    Block(Block),
}

impl Statement {
    pub fn location(&self) -> &SourceLocation {
        match self {
            Statement::Expression(s) => &s.location,
            Statement::Assignment(s) => &s.location,
            Statement::VariableDeclaration(s) => &s.location,
            Statement::FunctionDefinition(s) => &s.location,
            Statement::If(s) => &s.location,
            Statement::Switch(s) => &s.location,
            Statement::ForLoop(s) => &s.location,
            Statement::Break(location)
            | Statement::Continue(location)
            | Statement::Leave(location) => location,
            Statement::Block(block) => &block.location,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Block {
    pub location: SourceLocation,
    pub statements: Vec<Statement>,
}

impl Block {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self {
            location: SourceLocation::unknown(),
            statements,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn function_definitions(&self) -> impl Iterator<Item = &FunctionDefinition> {
        self.statements.iter().filter_map(|statement| match statement {
            Statement::FunctionDefinition(definition) => Some(definition),
            _ => None,
        })
    }
}
