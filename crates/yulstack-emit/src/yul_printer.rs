use crate::config::{PrinterConfig, TypeAnnotations};
use crate::emitter::{EmitContext, EmitHelper, EmitResult, Emitter};
use anyhow::bail;
use std::io::Write;
use yulstack_core::ast::{
    Block, Expression, ForLoop, FunctionDefinition, Literal, LiteralKind, Statement, Switch,
    TypedName,
};
use yulstack_core::object::{NodeId, ObjectNode, MAX_OBJECT_DEPTH};
use yulstack_core::{Dialect, ObjectTree};

/// Blocks whose single-line body is shorter than this are printed on one line.
const INLINE_BLOCK_WIDTH: usize = 30;
/// Same for the header of a `for` loop.
const INLINE_FOR_HEADER_WIDTH: usize = 60;

/// Prints Yul code and objects back to source form.
#[derive(Debug, Clone)]
pub struct YulPrinter {
    dialect: Dialect,
    config: PrinterConfig,
}

impl YulPrinter {
    pub fn new(dialect: Dialect) -> Self {
        Self::with_config(dialect, PrinterConfig::default())
    }

    pub fn with_config(dialect: Dialect, config: PrinterConfig) -> Self {
        Self { dialect, config }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn block(&self, block: &Block) -> String {
        if block.is_empty() {
            return "{ }".to_string();
        }
        let body = block
            .statements
            .iter()
            .map(|statement| self.statement(statement))
            .collect::<Vec<_>>()
            .join("\n");
        if body.len() < INLINE_BLOCK_WIDTH && !body.contains('\n') {
            format!("{{ {} }}", body)
        } else {
            format!("{{\n{}\n}}", self.indent(&body))
        }
    }

    pub fn statement(&self, statement: &Statement) -> String {
        match statement {
            Statement::Expression(statement) => self.expression(&statement.expression),
            Statement::Assignment(assignment) => {
                let names = assignment
                    .variable_names
                    .iter()
                    .map(|identifier| identifier.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{} := {}", names, self.expression(&assignment.value))
            }
            Statement::VariableDeclaration(declaration) => {
                let mut out = format!("let {}", self.typed_names(&declaration.variables));
                if let Some(value) = &declaration.value {
                    out.push_str(" := ");
                    out.push_str(&self.expression(value));
                }
                out
            }
            Statement::FunctionDefinition(definition) => self.function_definition(definition),
            Statement::If(statement) => {
                let body = self.block(&statement.body);
                let delimiter = if body.contains('\n') { '\n' } else { ' ' };
                format!("if {}{}{}", self.expression(&statement.condition), delimiter, body)
            }
            Statement::Switch(switch) => self.switch(switch),
            Statement::ForLoop(for_loop) => self.for_loop(for_loop),
            Statement::Break(_) => "break".to_string(),
            Statement::Continue(_) => "continue".to_string(),
            Statement::Leave(_) => "leave".to_string(),
            Statement::Block(block) => self.block(block),
        }
    }

    pub fn expression(&self, expression: &Expression) -> String {
        match expression {
            Expression::FunctionCall(call) => {
                let arguments = call
                    .arguments
                    .iter()
                    .map(|argument| self.expression(argument))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{}({})", call.function_name.name, arguments)
            }
            Expression::Identifier(identifier) => identifier.name.clone(),
            Expression::Literal(literal) => self.literal(literal),
        }
    }

    pub fn literal(&self, literal: &Literal) -> String {
        let value = match literal.kind {
            LiteralKind::Number | LiteralKind::Boolean => literal.value.clone(),
            LiteralKind::String => quote(&literal.value),
        };
        value + &self.type_suffix(&literal.ty, literal.kind == LiteralKind::Boolean)
    }

    fn function_definition(&self, definition: &FunctionDefinition) -> String {
        let mut out = format!(
            "function {}({})",
            definition.name,
            self.typed_names(&definition.parameters)
        );
        if !definition.return_variables.is_empty() {
            out.push_str(" -> ");
            out.push_str(&self.typed_names(&definition.return_variables));
        }
        out.push('\n');
        out.push_str(&self.block(&definition.body));
        out
    }

    fn switch(&self, switch: &Switch) -> String {
        let mut out = format!("switch {}", self.expression(&switch.expression));
        for case in &switch.cases {
            match &case.value {
                Some(value) => out.push_str(&format!("\ncase {} ", self.literal(value))),
                None => out.push_str("\ndefault "),
            }
            out.push_str(&self.block(&case.body));
        }
        out
    }

    fn for_loop(&self, for_loop: &ForLoop) -> String {
        let pre = self.block(&for_loop.pre);
        let condition = self.expression(&for_loop.condition);
        let post = self.block(&for_loop.post);
        let delimiter = if pre.len() + condition.len() + post.len() < INLINE_FOR_HEADER_WIDTH
            && !pre.contains('\n')
            && !post.contains('\n')
        {
            ' '
        } else {
            '\n'
        };
        format!(
            "for {pre}{d}{condition}{d}{post}\n{body}",
            d = delimiter,
            body = self.block(&for_loop.body)
        )
    }

    fn typed_names(&self, names: &[TypedName]) -> String {
        names
            .iter()
            .map(|name| format!("{}{}", name.name, self.type_suffix(&name.ty, false)))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn type_suffix(&self, ty: &str, boolean_literal: bool) -> String {
        let omit = match self.config.type_annotations {
            TypeAnnotations::Never => true,
            TypeAnnotations::Always => ty.is_empty(),
            TypeAnnotations::NonDefault => {
                ty.is_empty()
                    || ty == self.dialect.default_type()
                    || (boolean_literal && ty == self.dialect.bool_type())
            }
        };
        if omit {
            String::new()
        } else {
            format!(":{}", ty)
        }
    }

    fn indent(&self, text: &str) -> String {
        let unit = self.config.indent_style.unit();
        text.lines()
            .map(|line| {
                if line.is_empty() {
                    String::new()
                } else {
                    format!("{}{}", unit, line)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn emit_node<W: Write>(
        &self,
        tree: &ObjectTree,
        id: NodeId,
        depth: usize,
        writer: &mut W,
        context: &EmitContext,
    ) -> EmitResult {
        if depth > MAX_OBJECT_DEPTH {
            bail!("object nesting exceeds {} levels", MAX_OBJECT_DEPTH);
        }
        match tree.node(id) {
            Some(ObjectNode::Object(object)) => {
                let header = format!("{} {}", context.keyword("object"), quote(&object.name));
                EmitHelper::write_block(writer, context, &header, |writer, context| {
                    if let Some(code) = object.code() {
                        let code = format!("{} {}", context.keyword("code"), self.block(code));
                        EmitHelper::write_lines(writer, context, &code)?;
                    }
                    for child in object.children() {
                        self.emit_node(tree, *child, depth + 1, writer, context)?;
                    }
                    Ok(())
                })
            }
            Some(ObjectNode::Data(data)) => {
                let line = format!(
                    "{} {} hex\"{}\"",
                    context.keyword("data"),
                    quote(&data.name),
                    hex::encode(&data.bytes)
                );
                EmitHelper::write_lines(writer, context, &line)
            }
            None => bail!("unknown object node {}", id),
        }
    }
}

impl Emitter for YulPrinter {
    type Item = ObjectTree;

    fn emit<W: Write>(
        &self,
        tree: &ObjectTree,
        writer: &mut W,
        context: &EmitContext,
    ) -> EmitResult {
        self.emit_node(tree, tree.root(), 0, writer, context)
    }

    fn context(&self) -> EmitContext {
        EmitContext::new(&self.config)
    }
}

/// Quotes `text` as a Yul string literal the parser reads back unchanged.
pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || ((c as u32) >= 0x7f && (c as u32) <= 0xff) => {
                out.push_str(&format!("\\x{:02x}", c as u32))
            }
            c if (c as u32) > 0xff && (c as u32) <= 0xffff => {
                out.push_str(&format!("\\u{:04x}", c as u32))
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
