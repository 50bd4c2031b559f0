use crate::config::PrinterConfig;
use anyhow::Result;
use colored::Colorize;
use std::io::Write;

pub type EmitResult = Result<()>;

/// Indentation and color state for one emitter run.
#[derive(Debug, Clone)]
pub struct EmitContext {
    pub depth: usize,
    pub unit: String,
    pub use_colors: bool,
}

impl EmitContext {
    pub fn new(config: &PrinterConfig) -> Self {
        Self {
            depth: 0,
            unit: config.indent_style.unit(),
            use_colors: config.use_colors,
        }
    }

    /// The same context one level deeper.
    pub fn nested(&self) -> Self {
        Self {
            depth: self.depth + 1,
            ..self.clone()
        }
    }

    pub fn prefix(&self) -> String {
        self.unit.repeat(self.depth)
    }

    /// An object-notation keyword (`object`, `code`, `data`), highlighted when colors are on.
    pub fn keyword(&self, word: &str) -> String {
        if self.use_colors {
            word.bright_blue().bold().to_string()
        } else {
            word.to_string()
        }
    }
}

impl Default for EmitContext {
    fn default() -> Self {
        Self::new(&PrinterConfig::default())
    }
}

pub trait Emitter {
    type Item;

    fn emit<W: Write>(
        &self,
        item: &Self::Item,
        writer: &mut W,
        context: &EmitContext,
    ) -> EmitResult;

    fn context(&self) -> EmitContext {
        EmitContext::default()
    }

    fn emit_to_string(&self, item: &Self::Item) -> Result<String> {
        let mut buffer = Vec::new();
        self.emit(item, &mut buffer, &self.context())?;
        Ok(String::from_utf8(buffer)?)
    }
}

pub struct EmitHelper;

impl EmitHelper {
    /// Writes `text` at the context's depth, one output line per input line. Empty lines
    /// get no indentation.
    pub fn write_lines<W: Write>(writer: &mut W, context: &EmitContext, text: &str) -> EmitResult {
        let prefix = context.prefix();
        for line in text.lines() {
            if line.is_empty() {
                writeln!(writer)?;
            } else {
                writeln!(writer, "{}{}", prefix, line)?;
            }
        }
        Ok(())
    }

    /// `header {`, then `body` one level deeper, then the closing brace.
    pub fn write_block<W: Write, F>(
        writer: &mut W,
        context: &EmitContext,
        header: &str,
        body: F,
    ) -> EmitResult
    where
        F: FnOnce(&mut W, &EmitContext) -> EmitResult,
    {
        let prefix = context.prefix();
        writeln!(writer, "{}{} {{", prefix, header)?;
        body(writer, &context.nested())?;
        writeln!(writer, "{}}}", prefix)?;
        Ok(())
    }
}
