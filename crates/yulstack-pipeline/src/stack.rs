use crate::collaborators::{
    Analyzer, EvmObjectCompiler, ObjectParser, OptimiserRun, OptimiserSuite, Translator,
    WasmObjectCompiler,
};
use crate::error::{Result, Stage, StackError};
use crate::gas_meter::GasMeter;
use std::collections::BTreeMap;
use tracing::{debug, trace};
use yulstack_core::{
    language_to_dialect, AsmAnalyzer, CharStream, Diagnostic, Dialect, ErrorReporter, EvmVersion,
    Language, LinkableAssembly, LinkerObject, MachineAssemblyObject, ObjectTree,
    OptimiserSettings,
};
use yulstack_emit::{Emitter, YulPrinter};
use yulstack_parser::YulObjectParser;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Machine {
    Evm,
    Ewasm,
}

/// One compilation job, from source text to machine artifacts.
pub struct AssemblyStack {
    language: Language,
    evm_version: EvmVersion,
    settings: OptimiserSettings,
    char_stream: Option<CharStream>,
    parser_result: Option<ObjectTree>,
    reporter: ErrorReporter,
    analysis_successful: bool,
    parser: Box<dyn ObjectParser>,
    analyzer: Box<dyn Analyzer>,
    optimiser: Option<Box<dyn OptimiserSuite>>,
    translator: Option<Box<dyn Translator>>,
    evm_compiler: Option<Box<dyn EvmObjectCompiler>>,
    wasm_compiler: Option<Box<dyn WasmObjectCompiler>>,
}

impl AssemblyStack {
    pub fn new(language: Language, evm_version: EvmVersion, settings: OptimiserSettings) -> Self {
        Self {
            language,
            evm_version,
            settings,
            char_stream: None,
            parser_result: None,
            reporter: ErrorReporter::new(),
            analysis_successful: false,
            parser: Box::new(YulObjectParser::new()),
            analyzer: Box::new(AsmAnalyzer::new()),
            optimiser: None,
            translator: None,
            evm_compiler: None,
            wasm_compiler: None,
        }
    }

    pub fn with_parser(mut self, parser: Box<dyn ObjectParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_analyzer(mut self, analyzer: Box<dyn Analyzer>) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn with_optimiser(mut self, optimiser: Box<dyn OptimiserSuite>) -> Self {
        self.optimiser = Some(optimiser);
        self
    }

    pub fn with_translator(mut self, translator: Box<dyn Translator>) -> Self {
        self.translator = Some(translator);
        self
    }

    pub fn with_evm_compiler(mut self, compiler: Box<dyn EvmObjectCompiler>) -> Self {
        self.evm_compiler = Some(compiler);
        self
    }

    pub fn with_wasm_compiler(mut self, compiler: Box<dyn WasmObjectCompiler>) -> Self {
        self.wasm_compiler = Some(compiler);
        self
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn evm_version(&self) -> EvmVersion {
        self.evm_version
    }

    pub fn settings(&self) -> &OptimiserSettings {
        &self.settings
    }

    pub fn errors(&self) -> &[Diagnostic] {
        self.reporter.diagnostics()
    }

    pub fn reporter(&self) -> &ErrorReporter {
        &self.reporter
    }

    pub fn analysis_successful(&self) -> bool {
        self.analysis_successful
    }

    pub fn char_stream(&self) -> Result<&CharStream> {
        self.char_stream.as_ref().ok_or(StackError::NoSource)
    }

    /// The analyzed tree.
    pub fn parser_result(&self) -> Result<&ObjectTree> {
        if !self.analysis_successful {
            return Err(StackError::AnalysisRequired);
        }
        let tree = self.tree()?;
        if tree.root_object().code().is_none() {
            return Err(StackError::MissingCode(tree.root_object().name.clone()));
        }
        Ok(tree)
    }

    fn dialect(&self) -> Dialect {
        language_to_dialect(self.language, self.evm_version)
    }

    fn tree(&self) -> Result<&ObjectTree> {
        self.parser_result
            .as_ref()
            .ok_or(StackError::MissingParserResult)
    }

    /// Parses `source` and analyzes every object in it.
    ///
    /// Returns `Ok(false)` if the source has problems; they are available from `errors()`.
    pub fn parse_and_analyze(&mut self, source_name: &str, source: &str) -> Result<bool> {
        debug!(source_name, language = %self.language, "parsing");
        self.reporter.clear();
        self.analysis_successful = false;

        let stream = CharStream::new(source, source_name);
        let dialect = self.dialect();
        let tree = self.parser.parse(&stream, dialect, &mut self.reporter);
        self.char_stream = Some(stream);
        self.parser_result = tree;

        if !self.reporter.is_empty() {
            debug!(diagnostics = self.reporter.len(), "parsing reported problems");
            return Ok(false);
        }
        let tree = self.tree()?;
        if tree.root_object().code().is_none() {
            return Err(StackError::MissingCode(tree.root_object().name.clone()));
        }

        self.analyze_parsed()
    }

    /// Analyzes every object, even after one of them failed, so the diagnostics are complete.
    fn analyze_parsed(&mut self) -> Result<bool> {
        let dialect = self.dialect();
        let tree = self
            .parser_result
            .as_mut()
            .ok_or(StackError::MissingParserResult)?;

        let mut success = true;
        for id in tree.object_ids() {
            let data_names = tree.qualified_data_names(id);
            let object = tree
                .object_mut(id)
                .ok_or(yulstack_core::CoreError::InvalidNode(id))?;
            object.clear_analysis_info();
            let code = object
                .code()
                .ok_or_else(|| StackError::MissingCode(object.name.clone()))?;

            let info = self
                .analyzer
                .analyze(code, dialect, &data_names, &mut self.reporter);
            trace!(object = %object.name, ok = info.is_some(), "analyzed");
            match info {
                Some(info) => object.set_analysis_info(info)?,
                None => success = false,
            }
        }

        self.analysis_successful = success;
        debug!(success, "analysis finished");
        Ok(success)
    }

    /// Runs the optimiser suite over every object, children before their parent, then
    /// re-analyzes the result. Does nothing unless the settings enable the optimiser.
    pub fn optimize(&mut self) -> Result<()> {
        if !self.settings.run_yul_optimiser {
            return Ok(());
        }
        if !self.analysis_successful {
            return Err(StackError::AnalysisRequired);
        }
        let optimiser = self
            .optimiser
            .as_deref()
            .ok_or(StackError::MissingCollaborator(Stage::Optimize))?;
        debug!(steps = ?self.settings.yul_optimiser_steps, "optimizing");

        self.analysis_successful = false;
        let dialect = language_to_dialect(self.language, self.evm_version);
        let settings = &self.settings;
        let tree = self
            .parser_result
            .as_mut()
            .ok_or(StackError::MissingParserResult)?;
        let root = tree.root();

        for id in tree.post_order_object_ids() {
            let is_creation = id == root;
            let data_names = tree.qualified_data_names(id);
            let object = tree
                .object_mut(id)
                .ok_or(yulstack_core::CoreError::InvalidNode(id))?;
            if object.code().is_none() {
                return Err(StackError::MissingCode(object.name.clone()));
            }
            if !object.is_analyzed() {
                return Err(StackError::MissingAnalysisInfo(object.name.clone()));
            }

            let meter = dialect.as_evm().map(|evm| {
                GasMeter::new(
                    evm,
                    is_creation,
                    settings.expected_executions_per_deployment,
                )
            });
            trace!(object = %object.name, is_creation, "optimizing object");
            optimiser
                .run(OptimiserRun {
                    dialect,
                    meter: meter.as_ref(),
                    object: &mut *object,
                    data_names: &data_names,
                    is_creation,
                    optimize_stack_allocation: settings.optimize_stack_allocation,
                    steps: &settings.yul_optimiser_steps,
                    expected_executions: (!is_creation)
                        .then_some(settings.expected_executions_per_deployment),
                })
                .map_err(StackError::backend(Stage::Optimize))?;
            object.clear_analysis_info();
        }

        if !self.analyze_parsed()? {
            return Err(StackError::OptimizedCodeInvalid);
        }
        Ok(())
    }

    /// Converts the tree to `target`. Only strict assembly to Ewasm is supported.
    pub fn translate(&mut self, target: Language) -> Result<()> {
        if self.language == target {
            return Ok(());
        }
        if self.language != Language::StrictAssembly || target != Language::Ewasm {
            return Err(StackError::InvalidLanguageCombination {
                current: self.language,
                target,
            });
        }
        let translator = self
            .translator
            .as_deref()
            .ok_or(StackError::MissingCollaborator(Stage::Translate))?;
        debug!(from = %self.language, to = %target, "translating");

        let translated = translator
            .translate(self.parser_result()?, self.dialect())
            .map_err(StackError::backend(Stage::Translate))?;
        self.parser_result = Some(translated);
        self.language = target;
        Ok(())
    }

    /// Lowers the whole tree with the EVM object compiler.
    pub fn compile_evm(&self, optimize: bool) -> Result<Box<dyn LinkableAssembly>> {
        if self.language == Language::Ewasm {
            return Err(StackError::InvalidLanguage(self.language));
        }
        let compiler = self
            .evm_compiler
            .as_deref()
            .ok_or(StackError::MissingCollaborator(Stage::EvmCodegen))?;
        debug!(optimize, evm_version = %self.evm_version.name(), "compiling to EVM");
        compiler
            .compile(self.tree()?, self.dialect(), optimize)
            .map_err(StackError::backend(Stage::EvmCodegen))
    }

    pub fn assemble(&self, machine: Machine) -> Result<MachineAssemblyObject> {
        self.check_assemble_ready()?;
        match machine {
            Machine::Evm => Ok(self.assemble_with_deployed(None)?.0),
            Machine::Ewasm => {
                if self.language != Language::Ewasm {
                    return Err(StackError::MachineLanguageMismatch {
                        machine,
                        language: self.language,
                    });
                }
                let compiler = self
                    .wasm_compiler
                    .as_deref()
                    .ok_or(StackError::MissingCollaborator(Stage::WasmCodegen))?;
                debug!("compiling to Ewasm");
                let (text, bytecode) = compiler
                    .compile(self.tree()?, self.dialect())
                    .map_err(StackError::backend(Stage::WasmCodegen))?;
                Ok(MachineAssemblyObject {
                    assembly: Some(text),
                    bytecode: Some(LinkerObject::from_bytecode(bytecode)),
                    source_mappings: None,
                })
            }
        }
    }

    /// Assembles the creation object and, if one can be picked, the deployed object.
    ///
    /// With `deploy_name` the sub-assembly of that name is deployed. Without it a single
    /// sub-assembly is taken as the deployed object; with several, the deployed artifact is
    /// left empty.
    pub fn assemble_with_deployed(
        &self,
        deploy_name: Option<&str>,
    ) -> Result<(MachineAssemblyObject, MachineAssemblyObject)> {
        self.check_assemble_ready()?;
        let assembly = self.compile_evm(self.settings.optimize_stack_allocation)?;
        let source_indices = BTreeMap::from([(self.source_name().to_string(), 0)]);

        let creation = machine_object(assembly.as_ref(), &source_indices);
        if let Some(bytecode) = &creation.bytecode {
            if bytecode.has_unresolved_immutables() {
                return Err(StackError::LeftoverImmutables(
                    bytecode.immutable_references.keys().cloned().collect(),
                ));
            }
        }

        let sub_index = match deploy_name {
            Some(name) => Some(
                (0..assembly.sub_count())
                    .find(|index| assembly.sub(*index).is_some_and(|sub| sub.name() == name))
                    .ok_or_else(|| StackError::DeployedObjectNotFound(name.to_string()))?,
            ),
            None if assembly.sub_count() == 1 => Some(0),
            None => None,
        };
        let deployed = sub_index
            .and_then(|index| assembly.sub(index))
            .map(|sub| machine_object(sub, &source_indices))
            .unwrap_or_default();
        debug!(
            sub_count = assembly.sub_count(),
            deployed = ?sub_index,
            "assembled"
        );

        Ok((creation, deployed))
    }

    /// The tree as Yul source, followed by a newline.
    ///
    /// Only a parsed tree with root code is required. Analysis need not have succeeded, so a
    /// tree that failed analysis still prints as parsed.
    pub fn print(&self) -> Result<String> {
        let tree = self.tree()?;
        if tree.root_object().code().is_none() {
            return Err(StackError::MissingCode(tree.root_object().name.clone()));
        }
        YulPrinter::new(self.dialect())
            .emit_to_string(tree)
            .map_err(|err| StackError::Backend {
                stage: Stage::Print,
                source: err.into(),
            })
    }

    fn check_assemble_ready(&self) -> Result<()> {
        let root = self.parser_result()?.root_object();
        if !root.is_analyzed() {
            return Err(StackError::MissingAnalysisInfo(root.name.clone()));
        }
        Ok(())
    }

    fn source_name(&self) -> &str {
        self.char_stream.as_ref().map_or("", CharStream::name)
    }
}

fn machine_object(
    assembly: &dyn LinkableAssembly,
    source_indices: &BTreeMap<String, usize>,
) -> MachineAssemblyObject {
    MachineAssemblyObject {
        assembly: Some(assembly.assembly_string()),
        bytecode: Some(assembly.assemble()),
        source_mappings: Some(yulstack_core::compute_source_mapping(
            assembly.items(),
            source_indices,
        )),
    }
}
