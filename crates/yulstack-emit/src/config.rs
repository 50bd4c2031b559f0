use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrinterConfig {
    pub use_colors: bool,
    pub indent_style: IndentStyle,
    pub type_annotations: TypeAnnotations,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            use_colors: false,
            indent_style: IndentStyle::Spaces(4),
            type_annotations: TypeAnnotations::NonDefault,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum IndentStyle {
    Spaces(usize),
    Tabs,
}

impl IndentStyle {
    pub fn unit(&self) -> String {
        match self {
            IndentStyle::Spaces(n) => " ".repeat(*n),
            IndentStyle::Tabs => "\t".to_string(),
        }
    }
}

/// Which `:type` suffixes the printer writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeAnnotations {
    Never,
    /// Everything except the dialect's default type (and `bool` on boolean literals).
    NonDefault,
    Always,
}
