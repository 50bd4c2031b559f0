/*! Interfaces between the stack and the EVM backend.
 *
 * The backend lowers an object tree into a `LinkableAssembly`: a linear list of items per
 * object plus one sub-assembly per nested object. Linking an assembly yields a
 * `LinkerObject`. The stack packs the linked bytes, the textual listing and the compressed
 * source map into a `MachineAssemblyObject`.
 */

use crate::source_location::SourceLocation;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum JumpType {
    #[default]
    Ordinary,
    IntoFunction,
    OutOfFunction,
}

impl JumpType {
    pub fn marker(&self) -> char {
        match self {
            JumpType::Ordinary => '-',
            JumpType::IntoFunction => 'i',
            JumpType::OutOfFunction => 'o',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AssemblyItemKind {
    Operation(String),
    Push(Vec<u8>),
    Tag(usize),
    PushTag(usize),
    PushSubSize(usize),
    PushSubOffset(usize),
    PushImmutable(String),
    AssignImmutable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssemblyItem {
    pub kind: AssemblyItemKind,
    pub location: SourceLocation,
    pub jump_type: JumpType,
    pub modifier_depth: usize,
}

impl AssemblyItem {
    pub fn new(kind: AssemblyItemKind, location: SourceLocation) -> Self {
        Self {
            kind,
            location,
            jump_type: JumpType::Ordinary,
            modifier_depth: 0,
        }
    }

    pub fn with_jump_type(mut self, jump_type: JumpType) -> Self {
        self.jump_type = jump_type;
        self
    }
}

impl fmt::Display for AssemblyItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            AssemblyItemKind::Operation(name) => write!(f, "{}", name)?,
            AssemblyItemKind::Push(bytes) => write!(f, "0x{}", hex::encode(bytes))?,
            AssemblyItemKind::Tag(tag) => write!(f, "tag_{}:", tag)?,
            AssemblyItemKind::PushTag(tag) => write!(f, "tag_{}", tag)?,
            AssemblyItemKind::PushSubSize(sub) => write!(f, "dataSize(sub_{})", sub)?,
            AssemblyItemKind::PushSubOffset(sub) => write!(f, "dataOffset(sub_{})", sub)?,
            AssemblyItemKind::PushImmutable(name) => write!(f, "immutable(\"{}\")", name)?,
            AssemblyItemKind::AssignImmutable(name) => {
                write!(f, "assignImmutable(\"{}\")", name)?
            }
        }
        match self.jump_type {
            JumpType::Ordinary => Ok(()),
            JumpType::IntoFunction => f.write_str("\t// in"),
            JumpType::OutOfFunction => f.write_str("\t// out"),
        }
    }
}

/// Linked bytecode of one assembly.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct LinkerObject {
    #[serde(serialize_with = "serialize_hex")]
    pub bytecode: Vec<u8>,
    /// Library placeholders by byte offset.
    pub link_references: BTreeMap<usize, String>,
    /// Deploy-time placeholders that still await their value, by immutable name.
    pub immutable_references: BTreeMap<String, Vec<usize>>,
}

impl LinkerObject {
    pub fn from_bytecode(bytecode: impl Into<Vec<u8>>) -> Self {
        Self {
            bytecode: bytecode.into(),
            ..Self::default()
        }
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytecode)
    }

    pub fn has_unresolved_immutables(&self) -> bool {
        !self.immutable_references.is_empty()
    }
}

fn serialize_hex<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}

/// A lowered object, ready to be linked.
pub trait LinkableAssembly {
    fn name(&self) -> &str;

    fn items(&self) -> &[AssemblyItem];

    fn assemble(&self) -> LinkerObject;

    fn sub_count(&self) -> usize;

    fn sub(&self, index: usize) -> Option<&dyn LinkableAssembly>;

    fn assembly_string(&self) -> String {
        let mut out = String::new();
        for item in self.items() {
            match item.kind {
                AssemblyItemKind::Tag(_) => out.push_str(&format!("{}\n", item)),
                _ => out.push_str(&format!("    {}\n", item)),
            }
        }
        for index in 0..self.sub_count() {
            if let Some(sub) = self.sub(index) {
                out.push_str(&format!("\nsub_{}: assembly {{\n", index));
                for line in sub.assembly_string().lines() {
                    out.push_str("    ");
                    out.push_str(line);
                    out.push('\n');
                }
                out.push_str("}\n");
            }
        }
        out
    }
}

/// Output of assembling one object.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct MachineAssemblyObject {
    pub assembly: Option<String>,
    pub bytecode: Option<LinkerObject>,
    pub source_mappings: Option<String>,
}

impl MachineAssemblyObject {
    pub fn is_empty(&self) -> bool {
        self.assembly.is_none() && self.bytecode.is_none() && self.source_mappings.is_none()
    }
}

/// Compressed source map: one `start:length:source:jump:modifierDepth` entry per item,
/// separated by `;`. A field equal to the previous item's is left empty and trailing
/// unchanged fields are dropped.
pub fn compute_source_mapping(
    items: &[AssemblyItem],
    source_indices: &BTreeMap<String, usize>,
) -> String {
    let mut out = String::new();

    let mut prev_start: i64 = -1;
    let mut prev_length: i64 = -1;
    let mut prev_source: i64 = -1;
    let mut prev_jump: Option<char> = None;
    let mut prev_modifier_depth: Option<usize> = None;

    for (position, item) in items.iter().enumerate() {
        let location = &item.location;
        let start = i64::from(location.start);
        let length = location.len().map_or(-1, i64::from);
        let source = location
            .source_name
            .as_deref()
            .and_then(|name| source_indices.get(name))
            .map_or(-1, |index| *index as i64);
        let jump = item.jump_type.marker();
        let modifier_depth = item.modifier_depth;

        let mut components = 5;
        if Some(modifier_depth) == prev_modifier_depth {
            components -= 1;
            if Some(jump) == prev_jump {
                components -= 1;
                if source == prev_source {
                    components -= 1;
                    if length == prev_length {
                        components -= 1;
                        if start == prev_start {
                            components -= 1;
                        }
                    }
                }
            }
        }

        if position > 0 {
            out.push(';');
        }
        if components > 0 && start != prev_start {
            out.push_str(&start.to_string());
        }
        if components > 1 {
            out.push(':');
            if length != prev_length {
                out.push_str(&length.to_string());
            }
        }
        if components > 2 {
            out.push(':');
            if source != prev_source {
                out.push_str(&source.to_string());
            }
        }
        if components > 3 {
            out.push(':');
            if Some(jump) != prev_jump {
                out.push(jump);
            }
        }
        if components > 4 {
            out.push(':');
            if Some(modifier_depth) != prev_modifier_depth {
                out.push_str(&modifier_depth.to_string());
            }
        }

        prev_start = start;
        prev_length = length;
        prev_source = source;
        prev_jump = Some(jump);
        prev_modifier_depth = Some(modifier_depth);
    }

    out
}
