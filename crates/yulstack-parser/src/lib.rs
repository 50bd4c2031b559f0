/*! Parse Yul object notation into an object tree.
 *
 * The grammar accepts a single `object "Name" { code { ... } ... }` with nested objects and data
 * entries, or a bare `{ ... }` block that becomes an object named `object`. Syntax problems are
 * reported as `ParserError` diagnostics; the parser never panics on user input.
 */

use pest::error::InputLocation;
use pest::Parser;
use pest_derive::Parser;
use yulstack_core::ast::MAX_BLOCK_DEPTH;
use yulstack_core::{CharStream, Dialect, ErrorReporter, ObjectTree, SourceLocation};

pub mod builder;

pub use builder::{BuildError, TreeBuilder};

#[derive(Parser)]
#[grammar = "grammar.pest"]
pub struct YulGrammar;

pub type ParseResult<T> = Result<T, Box<pest::error::Error<Rule>>>;

pub fn parse(input: &str) -> ParseResult<pest::iterators::Pairs<'_, Rule>> {
    YulGrammar::parse(Rule::source, input).map_err(Box::new)
}

pub fn check(input: &str) -> bool {
    nesting_overflow(input).is_none() && parse(input).is_ok()
}

/// Reference parser for Yul objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct YulObjectParser;

impl YulObjectParser {
    pub fn new() -> Self {
        Self
    }

    /// Returns `None` after reporting at least one parser error.
    pub fn parse(
        &self,
        stream: &CharStream,
        dialect: Dialect,
        reporter: &mut ErrorReporter,
    ) -> Option<ObjectTree> {
        let location = |start: usize, end: usize| {
            SourceLocation::new(start as i32, end as i32, Some(stream.shared_name()))
        };

        if let Some(offset) = nesting_overflow(stream.source()) {
            reporter.parser_error(
                location(offset, offset + 1),
                format!("Nesting depth exceeds the limit of {}.", MAX_BLOCK_DEPTH),
            );
            return None;
        }

        let pairs = match parse(stream.source()) {
            Ok(pairs) => pairs,
            Err(err) => {
                let (start, end) = match err.location {
                    InputLocation::Pos(pos) => (pos, pos),
                    InputLocation::Span(span) => span,
                };
                let err = (*err).renamed_rules(rule_name);
                reporter.parser_error(location(start, end), err.variant.message().to_string());
                return None;
            }
        };

        match TreeBuilder::new(stream.shared_name(), dialect).build(pairs) {
            Ok(tree) => Some(tree),
            Err(err) => {
                reporter.parser_error(err.location, err.message);
                None
            }
        }
    }
}

fn rule_name(rule: &Rule) -> String {
    match rule {
        Rule::EOI => "end of input".to_string(),
        Rule::block => "`{`".to_string(),
        Rule::code => "`code`".to_string(),
        Rule::object => "`object`".to_string(),
        Rule::data => "`data`".to_string(),
        Rule::string_literal => "string literal".to_string(),
        Rule::hex_literal => "hex literal".to_string(),
        Rule::number_literal => "number literal".to_string(),
        Rule::bool_literal => "boolean literal".to_string(),
        Rule::type_annotation => "type annotation".to_string(),
        other => format!("{:?}", other).replace('_', " "),
    }
}

/// Byte offset of the first `{` or `(` that nests deeper than `MAX_BLOCK_DEPTH`, ignoring
/// strings and comments.
fn nesting_overflow(source: &str) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut depth = 0usize;
    let mut pos = 0;
    while pos < bytes.len() {
        match bytes[pos] {
            b'"' => {
                pos += 1;
                while pos < bytes.len() && bytes[pos] != b'"' && bytes[pos] != b'\n' {
                    if bytes[pos] == b'\\' {
                        pos += 1;
                    }
                    pos += 1;
                }
            }
            b'/' if bytes.get(pos + 1) == Some(&b'/') => {
                while pos < bytes.len() && bytes[pos] != b'\n' {
                    pos += 1;
                }
            }
            b'/' if bytes.get(pos + 1) == Some(&b'*') => {
                pos += 2;
                while pos < bytes.len() && !bytes[pos..].starts_with(b"*/") {
                    pos += 1;
                }
                pos += 1;
            }
            b'{' | b'(' => {
                depth += 1;
                if depth > MAX_BLOCK_DEPTH {
                    return Some(pos);
                }
            }
            b'}' | b')' => depth = depth.saturating_sub(1),
            _ => {}
        }
        pos += 1;
    }
    None
}
