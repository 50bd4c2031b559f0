/*! Dialects: which builtins and types a language variant offers on a given target.
 *
 * The set of dialects is closed. EVM dialects depend on the EVM version and are built lazily,
 * once per version, into process-wide tables; the Wasm dialect has a single shared instance.
 */

use crate::{ast::LiteralKind, CoreError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Language {
    Assembly,
    StrictAssembly,
    Yul,
    Ewasm,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Assembly => "assembly",
            Language::StrictAssembly => "strict-assembly",
            Language::Yul => "yul",
            Language::Ewasm => "ewasm",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "assembly" => Ok(Language::Assembly),
            "strict-assembly" | "strictassembly" => Ok(Language::StrictAssembly),
            "yul" => Ok(Language::Yul),
            "ewasm" => Ok(Language::Ewasm),
            _ => Err(CoreError::UnknownLanguage(s.to_string())),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum EvmVersion {
    Homestead,
    TangerineWhistle,
    SpuriousDragon,
    Byzantium,
    Constantinople,
    Petersburg,
    Istanbul,
    Berlin,
    #[default]
    London,
}

impl EvmVersion {
    pub const COUNT: usize = 9;

    pub const ALL: [EvmVersion; Self::COUNT] = [
        EvmVersion::Homestead,
        EvmVersion::TangerineWhistle,
        EvmVersion::SpuriousDragon,
        EvmVersion::Byzantium,
        EvmVersion::Constantinople,
        EvmVersion::Petersburg,
        EvmVersion::Istanbul,
        EvmVersion::Berlin,
        EvmVersion::London,
    ];

    fn index(self) -> usize {
        self as usize
    }

    pub fn name(&self) -> &'static str {
        match self {
            EvmVersion::Homestead => "homestead",
            EvmVersion::TangerineWhistle => "tangerineWhistle",
            EvmVersion::SpuriousDragon => "spuriousDragon",
            EvmVersion::Byzantium => "byzantium",
            EvmVersion::Constantinople => "constantinople",
            EvmVersion::Petersburg => "petersburg",
            EvmVersion::Istanbul => "istanbul",
            EvmVersion::Berlin => "berlin",
            EvmVersion::London => "london",
        }
    }

    pub fn supports_returndata(&self) -> bool {
        *self >= EvmVersion::Byzantium
    }

    pub fn has_static_call(&self) -> bool {
        *self >= EvmVersion::Byzantium
    }

    pub fn has_bitwise_shifting(&self) -> bool {
        *self >= EvmVersion::Constantinople
    }

    pub fn has_create2(&self) -> bool {
        *self >= EvmVersion::Constantinople
    }

    pub fn has_ext_code_hash(&self) -> bool {
        *self >= EvmVersion::Constantinople
    }

    pub fn has_chain_id(&self) -> bool {
        *self >= EvmVersion::Istanbul
    }

    pub fn has_self_balance(&self) -> bool {
        *self >= EvmVersion::Istanbul
    }

    pub fn has_base_fee(&self) -> bool {
        *self >= EvmVersion::London
    }
}

impl fmt::Display for EvmVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EvmVersion {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EvmVersion::ALL
            .into_iter()
            .find(|version| version.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| CoreError::UnknownEvmVersion(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinFunction {
    pub name: String,
    pub parameters: Vec<String>,
    pub returns: Vec<String>,
    /// `Some(kind)` marks an argument that must be a literal of that kind.
    pub literal_arguments: Vec<Option<LiteralKind>>,
    /// The string literal argument names an object or data entry.
    pub references_data: bool,
    pub side_effect_free: bool,
}

impl BuiltinFunction {
    fn new(name: &str, parameters: usize, returns: usize, ty: &str, side_effect_free: bool) -> Self {
        Self {
            name: name.to_string(),
            parameters: vec![ty.to_string(); parameters],
            returns: vec![ty.to_string(); returns],
            literal_arguments: vec![None; parameters],
            references_data: false,
            side_effect_free,
        }
    }

    fn with_literal(mut self, index: usize, kind: LiteralKind) -> Self {
        self.literal_arguments[index] = Some(kind);
        self
    }

    fn referencing_data(mut self) -> Self {
        self.references_data = true;
        self
    }

    fn typed(mut self, parameters: &[&str], returns: &[&str]) -> Self {
        self.parameters = parameters.iter().map(|ty| ty.to_string()).collect();
        self.returns = returns.iter().map(|ty| ty.to_string()).collect();
        self.literal_arguments.resize(self.parameters.len(), None);
        self
    }

    pub fn requires_literal(&self, index: usize) -> Option<LiteralKind> {
        self.literal_arguments.get(index).copied().flatten()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinTable {
    default_type: String,
    bool_type: String,
    types: BTreeSet<String>,
    functions: BTreeMap<String, BuiltinFunction>,
}

impl BuiltinTable {
    fn new(default_type: &str, bool_type: &str, types: &[&str]) -> Self {
        Self {
            default_type: default_type.to_string(),
            bool_type: bool_type.to_string(),
            types: types.iter().map(|ty| ty.to_string()).collect(),
            functions: BTreeMap::new(),
        }
    }

    fn insert(&mut self, function: BuiltinFunction) {
        self.functions.insert(function.name.clone(), function);
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut BuiltinFunction> {
        self.functions.get_mut(name)
    }
}

/// (name, arguments, returns, first version, side-effect free)
const EVM_OPCODES: &[(&str, usize, usize, EvmVersion, bool)] = &[
    ("stop", 0, 0, EvmVersion::Homestead, false),
    ("add", 2, 1, EvmVersion::Homestead, true),
    ("sub", 2, 1, EvmVersion::Homestead, true),
    ("mul", 2, 1, EvmVersion::Homestead, true),
    ("div", 2, 1, EvmVersion::Homestead, true),
    ("sdiv", 2, 1, EvmVersion::Homestead, true),
    ("mod", 2, 1, EvmVersion::Homestead, true),
    ("smod", 2, 1, EvmVersion::Homestead, true),
    ("exp", 2, 1, EvmVersion::Homestead, true),
    ("not", 1, 1, EvmVersion::Homestead, true),
    ("lt", 2, 1, EvmVersion::Homestead, true),
    ("gt", 2, 1, EvmVersion::Homestead, true),
    ("slt", 2, 1, EvmVersion::Homestead, true),
    ("sgt", 2, 1, EvmVersion::Homestead, true),
    ("eq", 2, 1, EvmVersion::Homestead, true),
    ("iszero", 1, 1, EvmVersion::Homestead, true),
    ("and", 2, 1, EvmVersion::Homestead, true),
    ("or", 2, 1, EvmVersion::Homestead, true),
    ("xor", 2, 1, EvmVersion::Homestead, true),
    ("byte", 2, 1, EvmVersion::Homestead, true),
    ("shl", 2, 1, EvmVersion::Constantinople, true),
    ("shr", 2, 1, EvmVersion::Constantinople, true),
    ("sar", 2, 1, EvmVersion::Constantinople, true),
    ("addmod", 3, 1, EvmVersion::Homestead, true),
    ("mulmod", 3, 1, EvmVersion::Homestead, true),
    ("signextend", 2, 1, EvmVersion::Homestead, true),
    ("keccak256", 2, 1, EvmVersion::Homestead, false),
    ("pop", 1, 0, EvmVersion::Homestead, true),
    ("mload", 1, 1, EvmVersion::Homestead, false),
    ("mstore", 2, 0, EvmVersion::Homestead, false),
    ("mstore8", 2, 0, EvmVersion::Homestead, false),
    ("sload", 1, 1, EvmVersion::Homestead, false),
    ("sstore", 2, 0, EvmVersion::Homestead, false),
    ("msize", 0, 1, EvmVersion::Homestead, false),
    ("gas", 0, 1, EvmVersion::Homestead, false),
    ("address", 0, 1, EvmVersion::Homestead, true),
    ("balance", 1, 1, EvmVersion::Homestead, false),
    ("selfbalance", 0, 1, EvmVersion::Istanbul, false),
    ("caller", 0, 1, EvmVersion::Homestead, true),
    ("callvalue", 0, 1, EvmVersion::Homestead, true),
    ("calldataload", 1, 1, EvmVersion::Homestead, true),
    ("calldatasize", 0, 1, EvmVersion::Homestead, true),
    ("calldatacopy", 3, 0, EvmVersion::Homestead, false),
    ("codesize", 0, 1, EvmVersion::Homestead, true),
    ("codecopy", 3, 0, EvmVersion::Homestead, false),
    ("extcodesize", 1, 1, EvmVersion::Homestead, false),
    ("extcodecopy", 4, 0, EvmVersion::Homestead, false),
    ("extcodehash", 1, 1, EvmVersion::Constantinople, false),
    ("returndatasize", 0, 1, EvmVersion::Byzantium, false),
    ("returndatacopy", 3, 0, EvmVersion::Byzantium, false),
    ("create", 3, 1, EvmVersion::Homestead, false),
    ("create2", 4, 1, EvmVersion::Constantinople, false),
    ("call", 7, 1, EvmVersion::Homestead, false),
    ("callcode", 7, 1, EvmVersion::Homestead, false),
    ("delegatecall", 6, 1, EvmVersion::Homestead, false),
    ("staticcall", 6, 1, EvmVersion::Byzantium, false),
    ("return", 2, 0, EvmVersion::Homestead, false),
    ("revert", 2, 0, EvmVersion::Byzantium, false),
    ("selfdestruct", 1, 0, EvmVersion::Homestead, false),
    ("invalid", 0, 0, EvmVersion::Homestead, false),
    ("log0", 2, 0, EvmVersion::Homestead, false),
    ("log1", 3, 0, EvmVersion::Homestead, false),
    ("log2", 4, 0, EvmVersion::Homestead, false),
    ("log3", 5, 0, EvmVersion::Homestead, false),
    ("log4", 6, 0, EvmVersion::Homestead, false),
    ("chainid", 0, 1, EvmVersion::Istanbul, true),
    ("basefee", 0, 1, EvmVersion::London, true),
    ("origin", 0, 1, EvmVersion::Homestead, true),
    ("gasprice", 0, 1, EvmVersion::Homestead, true),
    ("blockhash", 1, 1, EvmVersion::Homestead, false),
    ("coinbase", 0, 1, EvmVersion::Homestead, true),
    ("timestamp", 0, 1, EvmVersion::Homestead, true),
    ("number", 0, 1, EvmVersion::Homestead, true),
    ("difficulty", 0, 1, EvmVersion::Homestead, true),
    ("gaslimit", 0, 1, EvmVersion::Homestead, true),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvmDialect {
    version: EvmVersion,
    typed: bool,
    table: BuiltinTable,
}

static STRICT_ASSEMBLY_DIALECTS: [OnceLock<EvmDialect>; EvmVersion::COUNT] =
    [const { OnceLock::new() }; EvmVersion::COUNT];
static TYPED_DIALECTS: [OnceLock<EvmDialect>; EvmVersion::COUNT] =
    [const { OnceLock::new() }; EvmVersion::COUNT];

impl EvmDialect {
    /// Untyped EVM dialect with the object access builtins (`datasize`, `setimmutable`, ...).
    pub fn strict_assembly_for_objects(version: EvmVersion) -> &'static EvmDialect {
        STRICT_ASSEMBLY_DIALECTS[version.index()].get_or_init(|| Self::build(version, false))
    }

    pub fn typed(version: EvmVersion) -> &'static EvmDialect {
        TYPED_DIALECTS[version.index()].get_or_init(|| Self::build(version, true))
    }

    fn build(version: EvmVersion, typed: bool) -> Self {
        let ty = if typed { "u256" } else { "" };
        let mut table = if typed {
            BuiltinTable::new("u256", "bool", &["bool", "u256"])
        } else {
            BuiltinTable::new("", "", &[""])
        };

        for &(name, args, rets, since, side_effect_free) in EVM_OPCODES {
            if version >= since {
                table.insert(BuiltinFunction::new(name, args, rets, ty, side_effect_free));
            }
        }

        table.insert(
            BuiltinFunction::new("datasize", 1, 1, ty, true)
                .with_literal(0, LiteralKind::String)
                .referencing_data(),
        );
        table.insert(
            BuiltinFunction::new("dataoffset", 1, 1, ty, true)
                .with_literal(0, LiteralKind::String)
                .referencing_data(),
        );
        table.insert(BuiltinFunction::new("datacopy", 3, 0, ty, false));
        table.insert(
            BuiltinFunction::new("setimmutable", 3, 0, ty, false)
                .with_literal(1, LiteralKind::String),
        );
        table.insert(
            BuiltinFunction::new("loadimmutable", 1, 1, ty, true)
                .with_literal(0, LiteralKind::String),
        );
        table.insert(
            BuiltinFunction::new("linkersymbol", 1, 1, ty, true)
                .with_literal(0, LiteralKind::String),
        );
        table.insert(
            BuiltinFunction::new("memoryguard", 1, 1, ty, true)
                .with_literal(0, LiteralKind::Number),
        );

        if typed {
            for name in ["lt", "gt", "slt", "sgt", "eq"] {
                if let Some(function) = table.get_mut(name) {
                    function.returns = vec!["bool".to_string()];
                }
            }
            if let Some(function) = table.get_mut("iszero") {
                function.returns = vec!["bool".to_string()];
            }
            table.insert(BuiltinFunction::new("popbool", 1, 0, "bool", true));
            table.insert(
                BuiltinFunction::new("bool_to_u256", 1, 1, "u256", true)
                    .typed(&["bool"], &["u256"]),
            );
            table.insert(
                BuiltinFunction::new("u256_to_bool", 1, 1, "u256", true)
                    .typed(&["u256"], &["bool"]),
            );
        }

        Self {
            version,
            typed,
            table,
        }
    }

    pub fn version(&self) -> EvmVersion {
        self.version
    }

    pub fn is_typed(&self) -> bool {
        self.typed
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WasmDialect {
    table: BuiltinTable,
}

static WASM_DIALECT: OnceLock<WasmDialect> = OnceLock::new();

impl WasmDialect {
    pub fn instance() -> &'static WasmDialect {
        WASM_DIALECT.get_or_init(Self::build)
    }

    fn build() -> Self {
        let mut table = BuiltinTable::new("i64", "i32", &["i32", "i64"]);

        for ty in ["i32", "i64"] {
            for op in ["add", "sub", "mul", "div_u", "rem_u", "and", "or", "xor", "shl", "shr_u"] {
                table.insert(
                    BuiltinFunction::new(&format!("{ty}.{op}"), 2, 1, ty, true)
                        .typed(&[ty, ty], &[ty]),
                );
            }
            for op in ["eq", "ne", "lt_u", "gt_u", "le_u", "ge_u"] {
                table.insert(
                    BuiltinFunction::new(&format!("{ty}.{op}"), 2, 1, ty, true)
                        .typed(&[ty, ty], &["i32"]),
                );
            }
            table.insert(
                BuiltinFunction::new(&format!("{ty}.eqz"), 1, 1, ty, true)
                    .typed(&[ty], &["i32"]),
            );
            for op in ["clz", "ctz", "popcnt"] {
                table.insert(
                    BuiltinFunction::new(&format!("{ty}.{op}"), 1, 1, ty, true)
                        .typed(&[ty], &[ty]),
                );
            }
            table.insert(
                BuiltinFunction::new(&format!("{ty}.load"), 1, 1, ty, false)
                    .typed(&["i64"], &[ty]),
            );
            table.insert(
                BuiltinFunction::new(&format!("{ty}.store"), 2, 0, ty, false)
                    .typed(&["i64", ty], &[]),
            );
        }

        table.insert(BuiltinFunction::new("i64.store8", 2, 0, "i64", false));
        table.insert(
            BuiltinFunction::new("i32.wrap_i64", 1, 1, "i64", true).typed(&["i64"], &["i32"]),
        );
        table.insert(
            BuiltinFunction::new("i64.extend_i32_u", 1, 1, "i32", true)
                .typed(&["i32"], &["i64"]),
        );
        table.insert(BuiltinFunction::new("unreachable", 0, 0, "i64", false));
        table.insert(BuiltinFunction::new("nop", 0, 0, "i64", true));
        table.insert(BuiltinFunction::new("drop", 1, 0, "i64", true));
        table.insert(BuiltinFunction::new("memory.size", 0, 1, "i64", false));
        table.insert(BuiltinFunction::new("memory.grow", 1, 1, "i64", false));
        table.insert(
            BuiltinFunction::new("datasize", 1, 1, "i64", true)
                .with_literal(0, LiteralKind::String)
                .referencing_data(),
        );
        table.insert(
            BuiltinFunction::new("dataoffset", 1, 1, "i64", true)
                .with_literal(0, LiteralKind::String)
                .referencing_data(),
        );
        table.insert(BuiltinFunction::new("datacopy", 3, 0, "i64", false));

        Self { table }
    }
}

/// Semantics descriptor for one language variant.
#[derive(Debug, Clone, Copy)]
pub enum Dialect {
    StrictAssembly(&'static EvmDialect),
    Typed(&'static EvmDialect),
    Wasm(&'static WasmDialect),
}

impl Dialect {
    fn table(&self) -> &'static BuiltinTable {
        match self {
            Dialect::StrictAssembly(dialect) | Dialect::Typed(dialect) => &dialect.table,
            Dialect::Wasm(dialect) => &dialect.table,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Dialect::StrictAssembly(_) => "evm",
            Dialect::Typed(_) => "evmTyped",
            Dialect::Wasm(_) => "ewasm",
        }
    }

    pub fn default_type(&self) -> &'static str {
        &self.table().default_type
    }

    pub fn bool_type(&self) -> &'static str {
        &self.table().bool_type
    }

    pub fn types(&self) -> &'static BTreeSet<String> {
        &self.table().types
    }

    pub fn is_valid_type(&self, ty: &str) -> bool {
        self.table().types.contains(ty)
    }

    pub fn builtin(&self, name: &str) -> Option<&'static BuiltinFunction> {
        self.table().functions.get(name)
    }

    pub fn builtins(&self) -> impl Iterator<Item = &'static BuiltinFunction> {
        self.table().functions.values()
    }

    pub fn is_evm_family(&self) -> bool {
        self.as_evm().is_some()
    }

    pub fn as_evm(&self) -> Option<&'static EvmDialect> {
        match self {
            Dialect::StrictAssembly(dialect) | Dialect::Typed(dialect) => Some(dialect),
            Dialect::Wasm(_) => None,
        }
    }
}

impl PartialEq for Dialect {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Dialect::StrictAssembly(a), Dialect::StrictAssembly(b))
            | (Dialect::Typed(a), Dialect::Typed(b)) => std::ptr::eq(*a, *b),
            (Dialect::Wasm(a), Dialect::Wasm(b)) => std::ptr::eq(*a, *b),
            _ => false,
        }
    }
}

impl Eq for Dialect {}

pub fn language_to_dialect(language: Language, version: EvmVersion) -> Dialect {
    match language {
        Language::Assembly | Language::StrictAssembly => {
            Dialect::StrictAssembly(EvmDialect::strict_assembly_for_objects(version))
        }
        Language::Yul => Dialect::Typed(EvmDialect::typed(version)),
        Language::Ewasm => Dialect::Wasm(WasmDialect::instance()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_instances_are_memoized_per_version() {
        let a = language_to_dialect(Language::StrictAssembly, EvmVersion::Berlin);
        let b = language_to_dialect(Language::Assembly, EvmVersion::Berlin);
        let c = language_to_dialect(Language::StrictAssembly, EvmVersion::London);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(
            language_to_dialect(Language::Ewasm, EvmVersion::Homestead),
            language_to_dialect(Language::Ewasm, EvmVersion::London)
        );
    }

    #[test]
    fn test_opcodes_are_version_gated() {
        let homestead = language_to_dialect(Language::StrictAssembly, EvmVersion::Homestead);
        let london = language_to_dialect(Language::StrictAssembly, EvmVersion::London);
        assert!(homestead.builtin("shl").is_none());
        assert!(homestead.builtin("chainid").is_none());
        assert!(london.builtin("shl").is_some());
        assert!(london.builtin("basefee").is_some());
        assert!(homestead.builtin("datasize").is_some());
    }

    #[test]
    fn test_typed_dialect_comparisons_return_bool() {
        let typed = language_to_dialect(Language::Yul, EvmVersion::default());
        assert_eq!(typed.default_type(), "u256");
        assert_eq!(typed.builtin("lt").unwrap().returns, vec!["bool"]);
        assert_eq!(typed.builtin("add").unwrap().returns, vec!["u256"]);
        assert_eq!(typed.builtin("bool_to_u256").unwrap().parameters, vec!["bool"]);
        assert!(typed.is_evm_family());
    }

    #[test]
    fn test_wasm_dialect_is_not_evm_family() {
        let wasm = language_to_dialect(Language::Ewasm, EvmVersion::default());
        assert!(!wasm.is_evm_family());
        assert_eq!(wasm.default_type(), "i64");
        assert_eq!(wasm.builtin("i64.eqz").unwrap().returns, vec!["i32"]);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("strict-assembly".parse::<Language>(), Ok(Language::StrictAssembly));
        assert_eq!("tangerinewhistle".parse::<EvmVersion>(), Ok(EvmVersion::TangerineWhistle));
        assert!("shanghai".parse::<EvmVersion>().is_err());
    }
}
