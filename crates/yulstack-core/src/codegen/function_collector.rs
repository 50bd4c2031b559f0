use std::collections::BTreeMap;
use thiserror::Error;

/// Marker of a source location annotation inside generated Yul.
pub const SOURCE_LOCATION_TAG: &str = "/// @src";

/// Bound on helpers requested from inside other helpers' generators.
pub const MAX_GENERATION_DEPTH: usize = 256;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollectorError {
    #[error("Helper function name must not be empty")]
    EmptyName,
    #[error("Generator for {0} produced no code")]
    EmptyFunction(String),
    #[error("Generated code does not define function {0}")]
    MisnamedFunction(String),
    #[error("Helper function {0} was read while still being generated")]
    ReadWhilePending(String),
    #[error("Helper functions still being generated at drain time: {}", .0.join(", "))]
    PendingAtDrain(Vec<String>),
    #[error("Helper generation for {0} exceeds the maximum nesting depth")]
    GenerationTooDeep(String),
    #[error("Generator for {name} failed: {message}")]
    Generator { name: String, message: String },
}

pub type Result<T> = std::result::Result<T, CollectorError>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum FunctionState {
    Pending,
    Ready(String),
}

/// Registry of generated helper functions, keyed by name.
///
/// Each name is generated at most once. A generator may request further helpers, including
/// the one it is generating: a name that is still pending is returned without generating it
/// again.
#[derive(Debug, Default)]
pub struct MultiUseFunctionCollector {
    functions: BTreeMap<String, FunctionState>,
    depth: usize,
}

impl MultiUseFunctionCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Text of a finished helper. `Ok(None)` if the name was never requested.
    pub fn get(&self, name: &str) -> Result<Option<&str>> {
        match self.functions.get(name) {
            None => Ok(None),
            Some(FunctionState::Pending) => Err(CollectorError::ReadWhilePending(name.to_string())),
            Some(FunctionState::Ready(code)) => Ok(Some(code)),
        }
    }

    /// Requests a helper whose generator returns the complete definition, which must contain
    /// `function <name>(`.
    pub fn create_function<F, E>(
        &mut self,
        name: &str,
        generator: F,
    ) -> std::result::Result<String, E>
    where
        F: FnOnce(&mut Self) -> std::result::Result<String, E>,
        E: From<CollectorError>,
    {
        if self.contains(name) {
            return Ok(name.to_string());
        }

        let code = self.generate(name, generator)?;
        if code.is_empty() {
            self.functions.remove(name);
            return Err(CollectorError::EmptyFunction(name.to_string()).into());
        }
        if !code.contains(&format!("function {}(", name)) {
            self.functions.remove(name);
            return Err(CollectorError::MisnamedFunction(name.to_string()).into());
        }

        self.functions.insert(name.to_string(), FunctionState::Ready(code));
        Ok(name.to_string())
    }

    /// Requests a helper whose generator fills in the parameter and return variable names and
    /// returns only the body.
    pub fn create_function_with_params<F, E>(
        &mut self,
        name: &str,
        generator: F,
    ) -> std::result::Result<String, E>
    where
        F: FnOnce(&mut Self, &mut Vec<String>, &mut Vec<String>) -> std::result::Result<String, E>,
        E: From<CollectorError>,
    {
        if name.is_empty() {
            return Err(CollectorError::EmptyName.into());
        }
        if self.contains(name) {
            return Ok(name.to_string());
        }

        let mut arguments = Vec::new();
        let mut returns = Vec::new();
        let body = self.generate(name, |collector| {
            generator(collector, &mut arguments, &mut returns)
        })?;
        if body.is_empty() {
            self.functions.remove(name);
            return Err(CollectorError::EmptyFunction(name.to_string()).into());
        }

        let mut code = format!("function {}({})", name, arguments.join(", "));
        if !returns.is_empty() {
            code.push_str(" -> ");
            code.push_str(&returns.join(", "));
        }
        code.push_str(&format!(" {{\n\t{}\n}}\n", body));

        self.functions
            .insert(name.to_string(), FunctionState::Ready(code));
        Ok(name.to_string())
    }

    fn generate<F, E>(&mut self, name: &str, generator: F) -> std::result::Result<String, E>
    where
        F: FnOnce(&mut Self) -> std::result::Result<String, E>,
        E: From<CollectorError>,
    {
        if self.depth >= MAX_GENERATION_DEPTH {
            return Err(CollectorError::GenerationTooDeep(name.to_string()).into());
        }

        self.functions
            .insert(name.to_string(), FunctionState::Pending);
        self.depth += 1;
        let result = generator(self);
        self.depth -= 1;

        if result.is_err() {
            self.functions.remove(name);
        }
        result
    }

    /// Concatenates every helper in name order and empties the registry.
    ///
    /// Definitions without a source location annotation get `source_location_comment` on its
    /// own line above their header, indented like the header.
    pub fn requested_functions(&mut self, source_location_comment: &str) -> Result<String> {
        let pending: Vec<String> = self
            .functions
            .iter()
            .filter(|(_, state)| matches!(state, FunctionState::Pending))
            .map(|(name, _)| name.clone())
            .collect();
        if !pending.is_empty() {
            return Err(CollectorError::PendingAtDrain(pending));
        }

        let mut out = String::new();
        for (name, state) in std::mem::take(&mut self.functions) {
            let FunctionState::Ready(code) = state else {
                continue;
            };
            if code.contains(SOURCE_LOCATION_TAG) || source_location_comment.is_empty() {
                out.push_str(&code);
                continue;
            }
            match code.find(&format!("function {}(", name)) {
                Some(header) => {
                    let tabs = code[..header].rfind('\n').map_or(0, |pos| header - pos - 1);
                    out.push_str(&code[..header]);
                    out.push_str(source_location_comment);
                    out.push('\n');
                    out.push_str(&"\t".repeat(tabs));
                    out.push_str(&code[header..]);
                }
                None => out.push_str(&code),
            }
        }
        Ok(out)
    }
}
