use crate::Rule;
use pest::iterators::{Pair, Pairs};
use std::sync::Arc;
use thiserror::Error;
use yulstack_core::ast::{
    Assignment, Block, Case, Expression, ExpressionStatement, ForLoop, FunctionCall,
    FunctionDefinition, Identifier, If, Literal, LiteralKind, Statement, Switch, TypedName,
    VariableDeclaration,
};
use yulstack_core::object::MAX_OBJECT_DEPTH;
use yulstack_core::{Data, Dialect, NodeId, Object, ObjectTree, SourceLocation};

/// A problem found while turning the parse tree into objects. Reported as a parser error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct BuildError {
    pub location: SourceLocation,
    pub message: String,
}

pub type BuildResult<T> = Result<T, BuildError>;

fn is_keyword(rule: Rule) -> bool {
    matches!(
        rule,
        Rule::kw_function
            | Rule::kw_let
            | Rule::kw_if
            | Rule::kw_switch
            | Rule::kw_case
            | Rule::kw_default
            | Rule::kw_for
            | Rule::kw_break
            | Rule::kw_continue
            | Rule::kw_leave
    )
}

fn significant<'i>(pair: Pair<'i, Rule>) -> impl Iterator<Item = Pair<'i, Rule>> {
    pair.into_inner().filter(|p| !is_keyword(p.as_rule()))
}

pub struct TreeBuilder {
    source_name: Arc<str>,
    dialect: Dialect,
}

impl TreeBuilder {
    pub fn new(source_name: Arc<str>, dialect: Dialect) -> Self {
        Self {
            source_name,
            dialect,
        }
    }

    fn location(&self, pair: &Pair<'_, Rule>) -> SourceLocation {
        let span = pair.as_span();
        SourceLocation::new(
            span.start() as i32,
            span.end() as i32,
            Some(self.source_name.clone()),
        )
    }

    fn error(&self, pair: &Pair<'_, Rule>, message: impl Into<String>) -> BuildError {
        BuildError {
            location: self.location(pair),
            message: message.into(),
        }
    }

    fn expect<'i>(
        &self,
        parent: &Pair<'i, Rule>,
        next: Option<Pair<'i, Rule>>,
        what: &str,
    ) -> BuildResult<Pair<'i, Rule>> {
        next.ok_or_else(|| self.error(parent, format!("Expected {}.", what)))
    }

    /// Builds the tree from the pairs of the `source` rule.
    pub fn build(&self, pairs: Pairs<'_, Rule>) -> BuildResult<ObjectTree> {
        let Some(top) = pairs
            .flat_map(|source| source.into_inner())
            .find(|pair| pair.as_rule() != Rule::EOI)
        else {
            return Err(BuildError {
                location: SourceLocation::unknown(),
                message: "Expected an object or a code block.".to_string(),
            });
        };

        match top.as_rule() {
            Rule::block => {
                let code = self.block(top)?;
                Ok(ObjectTree::new(Object::with_code("object", code)))
            }
            Rule::object => self.object_tree(top),
            _ => Err(self.error(&top, "Expected an object or a code block.")),
        }
    }

    fn object_tree(&self, root: Pair<'_, Rule>) -> BuildResult<ObjectTree> {
        let (object, children) = self.object(root)?;
        let mut tree = ObjectTree::new(object);

        let mut pending: Vec<(NodeId, Pair<'_, Rule>)> = children
            .into_iter()
            .rev()
            .map(|child| (tree.root(), child))
            .collect();

        while let Some((parent, child)) = pending.pop() {
            match child.as_rule() {
                Rule::data => {
                    let data = self.data(child.clone())?;
                    self.check_child_name(&tree, parent, &data.name, &child)?;
                    tree.add_data(parent, data)
                        .map_err(|err| self.error(&child, err.to_string()))?;
                }
                Rule::object => {
                    if tree.depth(parent) + 1 > MAX_OBJECT_DEPTH {
                        return Err(self.error(&child, "Object nesting is too deep."));
                    }
                    let (object, grandchildren) = self.object(child.clone())?;
                    self.check_child_name(&tree, parent, &object.name, &child)?;
                    let id = tree
                        .add_object(parent, object)
                        .map_err(|err| self.error(&child, err.to_string()))?;
                    pending.extend(grandchildren.into_iter().rev().map(|g| (id, g)));
                }
                _ => return Err(self.error(&child, "Expected an object or data entry.")),
            }
        }

        Ok(tree)
    }

    fn check_child_name(
        &self,
        tree: &ObjectTree,
        parent: NodeId,
        name: &str,
        pair: &Pair<'_, Rule>,
    ) -> BuildResult<()> {
        let Some(parent_object) = tree.object(parent) else {
            return Ok(());
        };
        if parent_object.name == name {
            return Err(self.error(
                pair,
                "Object name cannot be the same as the name of the containing object.",
            ));
        }
        let taken = parent_object
            .children()
            .iter()
            .filter_map(|id| tree.node(*id))
            .any(|node| node.name() == name);
        if taken {
            return Err(self.error(
                pair,
                format!(
                    "Object name \"{}\" already exists inside the containing object.",
                    name
                ),
            ));
        }
        Ok(())
    }

    /// The object itself plus the still unbuilt pairs of its children.
    fn object<'i>(&self, pair: Pair<'i, Rule>) -> BuildResult<(Object, Vec<Pair<'i, Rule>>)> {
        let mut inner = pair.clone().into_inner();
        let name = self.string_value(self.expect(&pair, inner.next(), "an object name")?)?;
        if name.is_empty() {
            return Err(self.error(&pair, "Object name cannot be empty."));
        }
        let code_pair = self.expect(&pair, inner.next(), "a code block")?;
        let block = self.expect(&code_pair, code_pair.clone().into_inner().next(), "a block")?;
        let code = self.block(block)?;
        Ok((Object::with_code(name, code), inner.collect()))
    }

    fn data(&self, pair: Pair<'_, Rule>) -> BuildResult<Data> {
        let mut inner = pair.clone().into_inner();
        let name = self.string_value(self.expect(&pair, inner.next(), "a data name")?)?;
        let value = self.expect(&pair, inner.next(), "a data value")?;
        let bytes = match value.as_rule() {
            Rule::hex_literal => {
                let digits = value
                    .clone()
                    .into_inner()
                    .next()
                    .map(|content| content.as_str())
                    .unwrap_or_default();
                hex::decode(digits)
                    .map_err(|err| self.error(&value, format!("Invalid hex data: {}.", err)))?
            }
            _ => self.string_value(value)?.into_bytes(),
        };
        Ok(Data::new(name, bytes))
    }

    pub fn block(&self, pair: Pair<'_, Rule>) -> BuildResult<Block> {
        let location = self.location(&pair);
        let statements = pair
            .into_inner()
            .map(|statement| self.statement(statement))
            .collect::<BuildResult<Vec<_>>>()?;
        Ok(Block {
            location,
            statements,
        })
    }

    fn statement(&self, pair: Pair<'_, Rule>) -> BuildResult<Statement> {
        let location = self.location(&pair);
        let statement = match pair.as_rule() {
            Rule::block => Statement::Block(self.block(pair)?),
            Rule::function_definition => Statement::FunctionDefinition(self.function(pair)?),
            Rule::variable_declaration => {
                let mut variables = Vec::new();
                let mut value = None;
                for part in significant(pair) {
                    match part.as_rule() {
                        Rule::typed_name => variables.push(self.typed_name(part)?),
                        _ => value = Some(self.expression(part)?),
                    }
                }
                Statement::VariableDeclaration(VariableDeclaration {
                    location,
                    variables,
                    value,
                })
            }
            Rule::assignment => {
                let mut parts: Vec<_> = pair.clone().into_inner().collect();
                let value = self.expect(&pair, parts.pop(), "a value")?;
                Statement::Assignment(Assignment {
                    location,
                    variable_names: parts.iter().map(|p| self.identifier(p)).collect(),
                    value: self.expression(value)?,
                })
            }
            Rule::expression_statement => {
                let call = self.expect(&pair, pair.clone().into_inner().next(), "a call")?;
                Statement::Expression(ExpressionStatement {
                    location,
                    expression: Expression::FunctionCall(self.function_call(call)?),
                })
            }
            Rule::if_statement => {
                let mut inner = significant(pair.clone());
                let condition = self.expect(&pair, inner.next(), "a condition")?;
                let body = self.expect(&pair, inner.next(), "a block")?;
                Statement::If(If {
                    location,
                    condition: self.expression(condition)?,
                    body: self.block(body)?,
                })
            }
            Rule::switch_statement => Statement::Switch(self.switch(pair)?),
            Rule::for_loop => {
                let mut inner = significant(pair.clone());
                let pre = self.expect(&pair, inner.next(), "an initializer block")?;
                let condition = self.expect(&pair, inner.next(), "a condition")?;
                let post = self.expect(&pair, inner.next(), "a post block")?;
                let body = self.expect(&pair, inner.next(), "a body")?;
                Statement::ForLoop(ForLoop {
                    location,
                    pre: self.block(pre)?,
                    condition: self.expression(condition)?,
                    post: self.block(post)?,
                    body: self.block(body)?,
                })
            }
            Rule::break_statement => Statement::Break(location),
            Rule::continue_statement => Statement::Continue(location),
            Rule::leave_statement => Statement::Leave(location),
            _ => return Err(self.error(&pair, "Expected a statement.")),
        };
        Ok(statement)
    }

    fn function(&self, pair: Pair<'_, Rule>) -> BuildResult<FunctionDefinition> {
        let location = self.location(&pair);
        let mut inner = significant(pair.clone());
        let name = self.identifier(&self.expect(&pair, inner.next(), "a function name")?);

        let mut parameters = Vec::new();
        let mut return_variables = Vec::new();
        let mut body = None;
        for part in inner {
            match part.as_rule() {
                Rule::parameter_list => {
                    parameters = part
                        .into_inner()
                        .map(|p| self.typed_name(p))
                        .collect::<BuildResult<_>>()?
                }
                Rule::return_list => {
                    return_variables = part
                        .into_inner()
                        .map(|p| self.typed_name(p))
                        .collect::<BuildResult<_>>()?
                }
                _ => body = Some(self.block(part)?),
            }
        }

        Ok(FunctionDefinition {
            location,
            name: name.name,
            parameters,
            return_variables,
            body: body.ok_or_else(|| self.error(&pair, "Expected a function body."))?,
        })
    }

    fn switch(&self, pair: Pair<'_, Rule>) -> BuildResult<Switch> {
        let location = self.location(&pair);
        let mut inner = significant(pair.clone());
        let expression = self.expression(self.expect(&pair, inner.next(), "an expression")?)?;

        let mut cases = Vec::new();
        for clause in inner {
            let case_location = self.location(&clause);
            let mut parts = significant(clause.clone());
            let value = match clause.as_rule() {
                Rule::case_clause => {
                    let literal = self.expect(&clause, parts.next(), "a case value")?;
                    Some(self.literal(literal)?)
                }
                _ => None,
            };
            let body = self.expect(&clause, parts.next(), "a block")?;
            cases.push(Case {
                location: case_location,
                value,
                body: self.block(body)?,
            });
        }

        Ok(Switch {
            location,
            expression,
            cases,
        })
    }

    fn expression(&self, pair: Pair<'_, Rule>) -> BuildResult<Expression> {
        let pair = match pair.as_rule() {
            Rule::expression => self.expect(&pair, pair.clone().into_inner().next(), "an expression")?,
            _ => pair,
        };
        match pair.as_rule() {
            Rule::function_call => Ok(Expression::FunctionCall(self.function_call(pair)?)),
            Rule::identifier => Ok(Expression::Identifier(self.identifier(&pair))),
            Rule::literal => Ok(Expression::Literal(self.literal(pair)?)),
            _ => Err(self.error(&pair, "Expected an expression.")),
        }
    }

    fn function_call(&self, pair: Pair<'_, Rule>) -> BuildResult<FunctionCall> {
        let location = self.location(&pair);
        let mut inner = pair.clone().into_inner();
        let function_name = self.identifier(&self.expect(&pair, inner.next(), "a function name")?);
        let arguments = inner
            .map(|argument| self.expression(argument))
            .collect::<BuildResult<Vec<_>>>()?;
        Ok(FunctionCall {
            location,
            function_name,
            arguments,
        })
    }

    fn identifier(&self, pair: &Pair<'_, Rule>) -> Identifier {
        Identifier {
            location: self.location(pair),
            name: pair.as_str().to_string(),
        }
    }

    fn type_annotation(&self, pair: Option<Pair<'_, Rule>>) -> Option<String> {
        pair.and_then(|annotation| annotation.into_inner().next())
            .map(|ty| ty.as_str().to_string())
    }

    fn typed_name(&self, pair: Pair<'_, Rule>) -> BuildResult<TypedName> {
        let location = self.location(&pair);
        let mut inner = pair.clone().into_inner();
        let name = self.expect(&pair, inner.next(), "a name")?;
        let ty = self
            .type_annotation(inner.next())
            .unwrap_or_else(|| self.dialect.default_type().to_string());
        Ok(TypedName {
            location,
            name: name.as_str().to_string(),
            ty,
        })
    }

    fn literal(&self, pair: Pair<'_, Rule>) -> BuildResult<Literal> {
        let location = self.location(&pair);
        let mut inner = pair.clone().into_inner();
        let value = self.expect(&pair, inner.next(), "a literal")?;
        let annotated = self.type_annotation(inner.next());

        let (kind, text) = match value.as_rule() {
            Rule::number_literal => (LiteralKind::Number, value.as_str().to_string()),
            Rule::bool_literal => (LiteralKind::Boolean, value.as_str().to_string()),
            _ => (LiteralKind::String, self.string_value(value)?),
        };
        let ty = annotated.unwrap_or_else(|| match kind {
            LiteralKind::Boolean => self.dialect.bool_type().to_string(),
            _ => self.dialect.default_type().to_string(),
        });

        Ok(Literal {
            location,
            kind,
            value: text,
            ty,
        })
    }

    fn string_value(&self, pair: Pair<'_, Rule>) -> BuildResult<String> {
        let raw = pair
            .clone()
            .into_inner()
            .next()
            .map(|content| content.as_str())
            .unwrap_or_default();
        unescape(raw).map_err(|message| self.error(&pair, message))
    }
}

fn unescape(raw: &str) -> Result<String, String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('x') => {
                let digits: String = chars.by_ref().take(2).collect();
                let byte = u8::from_str_radix(&digits, 16)
                    .map_err(|_| format!("Invalid escape sequence \"\\x{}\".", digits))?;
                out.push(char::from(byte));
            }
            Some('u') => {
                let digits: String = chars.by_ref().take(4).collect();
                let ch = u32::from_str_radix(&digits, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| format!("Invalid escape sequence \"\\u{}\".", digits))?;
                out.push(ch);
            }
            Some(other) => return Err(format!("Invalid escape sequence \"\\{}\".", other)),
            None => return Err("Unterminated escape sequence.".to_string()),
        }
    }
    Ok(out)
}
