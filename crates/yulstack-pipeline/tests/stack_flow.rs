use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use yulstack_core::ast::{ExpressionStatement, Statement};
use yulstack_core::{
    AssemblyItem, AssemblyItemKind, Block, Dialect, EvmVersion, Expression, Language,
    LinkableAssembly, LinkerObject, ObjectTree, OptimiserSettings,
};
use yulstack_pipeline::{
    AssemblyStack, BoxError, EvmObjectCompiler, Machine, OptimiserRun, OptimiserSuite, Stage,
    StackError, Translator, WasmObjectCompiler,
};

const FACTORY: &str = r#"
object "Factory" {
    code {
        datacopy(0, dataoffset("Factory_deployed"), datasize("Factory_deployed"))
        return(0, datasize("Factory_deployed"))
    }
    object "Factory_deployed" {
        code { sstore(0, datasize("Child")) }
        object "Child" { code { } }
    }
}
"#;

const TWO_SUBS: &str = r#"
object "Root" {
    code { }
    object "A" { code { } }
    object "B" { code { } }
}
"#;

struct MockAssembly {
    name: String,
    items: Vec<AssemblyItem>,
    immutables: Vec<String>,
    subs: Vec<MockAssembly>,
}

impl MockAssembly {
    fn from_tree(tree: &ObjectTree, id: yulstack_core::NodeId) -> Self {
        let object = tree.object(id).unwrap();
        let location = object.code().unwrap().location.clone();
        Self {
            name: object.name.clone(),
            items: vec![AssemblyItem::new(
                AssemblyItemKind::Operation("STOP".to_string()),
                location,
            )],
            immutables: Vec::new(),
            subs: tree
                .sub_objects(id)
                .into_iter()
                .map(|sub| MockAssembly::from_tree(tree, sub))
                .collect(),
        }
    }
}

impl LinkableAssembly for MockAssembly {
    fn name(&self) -> &str {
        &self.name
    }

    fn items(&self) -> &[AssemblyItem] {
        &self.items
    }

    fn assemble(&self) -> LinkerObject {
        let mut object = LinkerObject::from_bytecode(self.name.as_bytes().to_vec());
        for immutable in &self.immutables {
            object.immutable_references.insert(immutable.clone(), vec![0]);
        }
        object
    }

    fn sub_count(&self) -> usize {
        self.subs.len()
    }

    fn sub(&self, index: usize) -> Option<&dyn LinkableAssembly> {
        self.subs.get(index).map(|sub| sub as &dyn LinkableAssembly)
    }
}

#[derive(Default)]
struct MockEvmCompiler {
    leftover_immutable: Option<String>,
    optimize_flags: Rc<RefCell<Vec<bool>>>,
}

impl EvmObjectCompiler for MockEvmCompiler {
    fn compile(
        &self,
        tree: &ObjectTree,
        dialect: Dialect,
        optimize: bool,
    ) -> Result<Box<dyn LinkableAssembly>, BoxError> {
        assert!(dialect.is_evm_family());
        self.optimize_flags.borrow_mut().push(optimize);
        let mut assembly = MockAssembly::from_tree(tree, tree.root());
        assembly.immutables.extend(self.leftover_immutable.clone());
        Ok(Box::new(assembly))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct OptimiserCall {
    object: String,
    is_creation: bool,
    expected_executions: Option<usize>,
    has_meter: bool,
}

#[derive(Default)]
struct RecordingOptimiser {
    calls: Rc<RefCell<Vec<OptimiserCall>>>,
    break_code: bool,
}

impl OptimiserSuite for RecordingOptimiser {
    fn run(&self, run: OptimiserRun<'_>) -> Result<(), BoxError> {
        self.calls.borrow_mut().push(OptimiserCall {
            object: run.object.name.clone(),
            is_creation: run.is_creation,
            expected_executions: run.expected_executions,
            has_meter: run.meter.is_some(),
        });
        if self.break_code {
            run.object
                .set_code(Block::new(vec![Statement::Expression(ExpressionStatement {
                    location: Default::default(),
                    expression: Expression::call("no_such_function", vec![]),
                })]));
        }
        Ok(())
    }
}

struct CloningTranslator;

impl Translator for CloningTranslator {
    fn translate(&self, tree: &ObjectTree, _: Dialect) -> Result<ObjectTree, BoxError> {
        Ok(tree.clone())
    }
}

struct FailingTranslator;

impl Translator for FailingTranslator {
    fn translate(&self, _: &ObjectTree, _: Dialect) -> Result<ObjectTree, BoxError> {
        Err("unsupported builtin".into())
    }
}

struct MockWasmCompiler;

impl WasmObjectCompiler for MockWasmCompiler {
    fn compile(&self, tree: &ObjectTree, _: Dialect) -> Result<(String, Vec<u8>), BoxError> {
        Ok((
            format!("(module ;; {}\n)", tree.root_object().name),
            b"\0asm".to_vec(),
        ))
    }
}

fn stack(language: Language) -> AssemblyStack {
    AssemblyStack::new(language, EvmVersion::default(), OptimiserSettings::minimal())
        .with_evm_compiler(Box::new(MockEvmCompiler::default()))
}

fn analyzed(source: &str) -> AssemblyStack {
    let mut stack = stack(Language::StrictAssembly);
    assert!(
        stack.parse_and_analyze("input.yul", source).unwrap(),
        "{:?}",
        stack.errors()
    );
    stack
}

#[test]
fn parse_and_analyze_accepts_valid_objects() {
    let stack = analyzed(FACTORY);
    assert!(stack.errors().is_empty());
    let tree = stack.parser_result().unwrap();
    assert!(tree.is_fully_analyzed());
    assert_eq!(stack.char_stream().unwrap().name(), "input.yul");
}

#[test]
fn parser_errors_skip_analysis() {
    let mut stack = stack(Language::StrictAssembly);
    assert!(!stack.parse_and_analyze("input.yul", "{ let x := ").unwrap());
    assert_eq!(stack.errors().len(), 1);
    assert!(!stack.analysis_successful());
    assert!(matches!(
        stack.parser_result(),
        Err(StackError::AnalysisRequired)
    ));
}

#[test]
fn analysis_visits_every_object() {
    let source = r#"
object "Root" {
    code { pop(a) }
    object "Left" { code { pop(b) } }
    object "Right" { code { pop(c) } }
}
"#;
    let mut stack = stack(Language::StrictAssembly);
    assert!(!stack.parse_and_analyze("input.yul", source).unwrap());
    assert_eq!(stack.reporter().error_count(), 3);
}

#[test]
fn reparsing_resets_diagnostics() {
    let mut stack = stack(Language::StrictAssembly);
    assert!(!stack.parse_and_analyze("bad.yul", "{ pop(x) }").unwrap());
    assert!(!stack.errors().is_empty());

    assert!(stack.parse_and_analyze("good.yul", "{ }").unwrap());
    assert!(stack.errors().is_empty());
    assert_eq!(stack.char_stream().unwrap().name(), "good.yul");
}

#[test]
fn optimize_is_a_noop_when_disabled() {
    let direct = analyzed(FACTORY);
    let mut optimized = analyzed(FACTORY);
    assert!(!optimized.settings().run_yul_optimiser);
    optimized.optimize().unwrap();

    assert!(optimized.analysis_successful());
    assert_eq!(optimized.print().unwrap(), direct.print().unwrap());
    assert_eq!(
        optimized.assemble_with_deployed(None).unwrap(),
        direct.assemble_with_deployed(None).unwrap()
    );
}

#[test]
fn optimize_visits_children_first() {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let mut stack = AssemblyStack::new(
        Language::StrictAssembly,
        EvmVersion::default(),
        OptimiserSettings::standard(),
    )
    .with_optimiser(Box::new(RecordingOptimiser {
        calls: Rc::clone(&calls),
        break_code: false,
    }));
    assert!(stack.parse_and_analyze("input.yul", FACTORY).unwrap());

    stack.optimize().unwrap();
    assert!(stack.analysis_successful());

    let call = |object: &str, is_creation: bool, expected_executions: Option<usize>| {
        OptimiserCall {
            object: object.to_string(),
            is_creation,
            expected_executions,
            has_meter: true,
        }
    };
    assert_eq!(
        *calls.borrow(),
        vec![
            call("Child", false, Some(200)),
            call("Factory_deployed", false, Some(200)),
            call("Factory", true, None),
        ]
    );
}

#[test]
fn optimize_requires_analysis() {
    let mut stack = AssemblyStack::new(
        Language::StrictAssembly,
        EvmVersion::default(),
        OptimiserSettings::standard(),
    )
    .with_optimiser(Box::new(RecordingOptimiser::default()));
    assert!(matches!(stack.optimize(), Err(StackError::AnalysisRequired)));
}

#[test]
fn optimize_without_suite_is_fatal() {
    let mut stack = AssemblyStack::new(
        Language::StrictAssembly,
        EvmVersion::default(),
        OptimiserSettings::standard(),
    );
    assert!(stack.parse_and_analyze("input.yul", "{ }").unwrap());
    assert!(matches!(
        stack.optimize(),
        Err(StackError::MissingCollaborator(Stage::Optimize))
    ));
    assert!(stack.analysis_successful());
}

#[test]
fn broken_optimiser_output_is_fatal() {
    let mut stack = AssemblyStack::new(
        Language::StrictAssembly,
        EvmVersion::default(),
        OptimiserSettings::standard(),
    )
    .with_optimiser(Box::new(RecordingOptimiser {
        calls: Rc::default(),
        break_code: true,
    }));
    assert!(stack.parse_and_analyze("input.yul", "{ }").unwrap());
    assert!(matches!(
        stack.optimize(),
        Err(StackError::OptimizedCodeInvalid)
    ));
    assert!(!stack.analysis_successful());
}

#[test]
fn translate_to_same_language_is_a_noop() {
    let mut stack = analyzed("{ }");
    stack.translate(Language::StrictAssembly).unwrap();
    assert_eq!(stack.language(), Language::StrictAssembly);
}

#[test]
fn unsupported_translation_keeps_language() {
    let mut stack = AssemblyStack::new(Language::Yul, EvmVersion::default(), Default::default())
        .with_translator(Box::new(CloningTranslator));
    assert!(stack.parse_and_analyze("input.yul", "{ }").unwrap());

    let err = stack.translate(Language::Ewasm).unwrap_err();
    assert!(matches!(
        err,
        StackError::InvalidLanguageCombination {
            current: Language::Yul,
            target: Language::Ewasm
        }
    ));
    assert_eq!(stack.language(), Language::Yul);
}

#[test]
fn translator_failures_are_wrapped() {
    let mut stack = analyzed("{ }").with_translator(Box::new(FailingTranslator));
    let err = stack.translate(Language::Ewasm).unwrap_err();
    assert!(matches!(
        err,
        StackError::Backend {
            stage: Stage::Translate,
            ..
        }
    ));
    assert_eq!(err.to_string(), "translate failed: unsupported builtin");
    assert_eq!(stack.language(), Language::StrictAssembly);
}

#[test]
fn ewasm_flow() {
    let mut stack = analyzed(FACTORY)
        .with_translator(Box::new(CloningTranslator))
        .with_wasm_compiler(Box::new(MockWasmCompiler));

    assert!(matches!(
        stack.assemble(Machine::Ewasm),
        Err(StackError::MachineLanguageMismatch { .. })
    ));

    stack.translate(Language::Ewasm).unwrap();
    assert_eq!(stack.language(), Language::Ewasm);
    assert!(matches!(
        stack.compile_evm(false),
        Err(StackError::InvalidLanguage(Language::Ewasm))
    ));

    let artifact = stack.assemble(Machine::Ewasm).unwrap();
    assert_eq!(artifact.assembly.as_deref(), Some("(module ;; Factory\n)"));
    assert_eq!(artifact.bytecode.unwrap().bytecode, b"\0asm".to_vec());
    assert_eq!(artifact.source_mappings, None);
}

#[test]
fn single_sub_assembly_is_deployed() {
    let stack = analyzed(FACTORY);
    let (creation, deployed) = stack.assemble_with_deployed(None).unwrap();

    assert_eq!(creation.bytecode.unwrap().bytecode, b"Factory".to_vec());
    assert_eq!(deployed.bytecode.unwrap().bytecode, b"Factory_deployed".to_vec());

    let tree = stack.parser_result().unwrap();
    let deployed_code = tree
        .object(tree.sub_objects(tree.root())[0])
        .and_then(|object| object.code())
        .unwrap();
    let start = deployed_code.location.start;
    let length = deployed_code.location.len().unwrap();
    assert_eq!(
        deployed.source_mappings,
        Some(format!("{}:{}:0:-:0", start, length))
    );
    assert_eq!(
        &FACTORY[start as usize..deployed_code.location.end as usize],
        "{ sstore(0, datasize(\"Child\")) }"
    );
}

#[test]
fn deployed_object_by_name() {
    let stack = analyzed(TWO_SUBS);
    let (_, deployed) = stack.assemble_with_deployed(Some("B")).unwrap();
    assert_eq!(deployed.bytecode.unwrap().bytecode, b"B".to_vec());

    assert!(matches!(
        stack.assemble_with_deployed(Some("C")),
        Err(StackError::DeployedObjectNotFound(name)) if name == "C"
    ));
}

#[test]
fn several_subs_without_name_deploy_nothing() {
    let stack = analyzed(TWO_SUBS);
    let (creation, deployed) = stack.assemble_with_deployed(None).unwrap();
    assert!(!creation.is_empty());
    assert!(deployed.is_empty());
}

#[test]
fn no_subs_without_name_deploy_nothing() {
    let stack = analyzed(r#"object "Solo" { code { } data "D" hex"00" }"#);
    let (creation, deployed) = stack.assemble_with_deployed(None).unwrap();
    assert_eq!(creation.bytecode.unwrap().bytecode, b"Solo".to_vec());
    assert!(deployed.is_empty());
}

#[test]
fn assemble_evm_returns_creation_object() {
    let stack = analyzed(TWO_SUBS);
    let artifact = stack.assemble(Machine::Evm).unwrap();
    assert_eq!(artifact.bytecode.unwrap().to_hex(), hex::encode("Root"));
    assert!(artifact.assembly.unwrap().contains("sub_1: assembly {"));
}

#[test]
fn stack_allocation_flag_reaches_backend() {
    let flags = Rc::new(RefCell::new(Vec::new()));
    let mut stack = AssemblyStack::new(
        Language::StrictAssembly,
        EvmVersion::default(),
        OptimiserSettings::none(),
    )
    .with_evm_compiler(Box::new(MockEvmCompiler {
        leftover_immutable: None,
        optimize_flags: Rc::clone(&flags),
    }));
    assert!(stack.parse_and_analyze("input.yul", "{ }").unwrap());
    stack.assemble(Machine::Evm).unwrap();
    assert_eq!(*flags.borrow(), vec![false]);
}

#[test]
fn leftover_immutables_are_fatal() {
    let mut stack = AssemblyStack::new(
        Language::StrictAssembly,
        EvmVersion::default(),
        OptimiserSettings::minimal(),
    )
    .with_evm_compiler(Box::new(MockEvmCompiler {
        leftover_immutable: Some("owner".to_string()),
        optimize_flags: Rc::default(),
    }));
    assert!(stack.parse_and_analyze("input.yul", "{ }").unwrap());
    assert!(matches!(
        stack.assemble(Machine::Evm),
        Err(StackError::LeftoverImmutables(names)) if names == vec!["owner".to_string()]
    ));
}

#[test]
fn assemble_requires_analysis_and_backend() {
    let mut stack = stack(Language::StrictAssembly);
    assert!(matches!(
        stack.assemble(Machine::Evm),
        Err(StackError::AnalysisRequired)
    ));

    let mut bare = AssemblyStack::new(
        Language::StrictAssembly,
        EvmVersion::default(),
        OptimiserSettings::default(),
    );
    assert!(bare.parse_and_analyze("input.yul", "{ }").unwrap());
    assert!(matches!(
        bare.assemble(Machine::Evm),
        Err(StackError::MissingCollaborator(Stage::EvmCodegen))
    ));

    assert!(!stack.parse_and_analyze("input.yul", "{ pop(x) }").unwrap());
    assert!(matches!(
        stack.assemble(Machine::Evm),
        Err(StackError::AnalysisRequired)
    ));
}

#[test]
fn print_round_trips() {
    let first = analyzed("{ let x := 1 sstore(x, 2) }");
    let printed = first.print().unwrap();
    assert_eq!(
        printed,
        "object \"object\" {\n    code {\n        let x := 1\n        sstore(x, 2)\n    }\n}\n"
    );

    let mut again = stack(Language::StrictAssembly);
    assert!(again.parse_and_analyze("printed.yul", &printed).unwrap());
    assert_eq!(again.print().unwrap(), printed);
}

#[test]
fn print_does_not_require_successful_analysis() {
    let mut stack = stack(Language::StrictAssembly);
    assert!(!stack.parse_and_analyze("input.yul", "{ pop(x) }").unwrap());
    assert!(!stack.analysis_successful());
    assert_eq!(
        stack.print().unwrap(),
        "object \"object\" {\n    code { pop(x) }\n}\n"
    );
}

#[test]
fn accessors_before_parsing() {
    let stack = stack(Language::Yul);
    assert!(matches!(stack.char_stream(), Err(StackError::NoSource)));
    assert!(matches!(stack.print(), Err(StackError::MissingParserResult)));
    assert_eq!(stack.language(), Language::Yul);
    assert_eq!(stack.evm_version(), EvmVersion::London);
    assert_eq!(stack.settings(), &OptimiserSettings::minimal());
}

#[test]
fn source_map_uses_index_zero_for_the_job_source() {
    let stack = analyzed("{ }");
    let (creation, _) = stack.assemble_with_deployed(None).unwrap();
    let indices = BTreeMap::from([("input.yul".to_string(), 0usize)]);
    let expected = yulstack_core::compute_source_mapping(
        &[AssemblyItem::new(
            AssemblyItemKind::Operation("STOP".to_string()),
            stack.parser_result().unwrap().root_object().code().unwrap().location.clone(),
        )],
        &indices,
    );
    assert_eq!(creation.source_mappings, Some(expected));
    assert_eq!(creation.source_mappings.as_deref(), Some("0:3:0:-:0"));
}
