use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use yulstack_core::{EvmVersion, Language, OptimiserSettings};
use yulstack_pipeline::AssemblyStack;

#[derive(Parser)]
#[command(name = "yulstack")]
#[command(about = "Parse, analyze and print Yul objects")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and analyze a source file and report its diagnostics.
    Check {
        #[command(flatten)]
        job: JobArgs,

        /// Print diagnostics as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print the analyzed object tree back as Yul.
    Print {
        #[command(flatten)]
        job: JobArgs,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct JobArgs {
    input: PathBuf,

    #[arg(long, value_enum, default_value = "strict-assembly")]
    language: LanguageArg,

    #[arg(long, default_value = "london", value_parser = parse_evm_version)]
    evm_version: EvmVersion,

    /// Optimiser settings as a JSON file.
    #[arg(long)]
    settings: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LanguageArg {
    Assembly,
    StrictAssembly,
    Yul,
    Ewasm,
}

impl From<LanguageArg> for Language {
    fn from(language: LanguageArg) -> Self {
        match language {
            LanguageArg::Assembly => Language::Assembly,
            LanguageArg::StrictAssembly => Language::StrictAssembly,
            LanguageArg::Yul => Language::Yul,
            LanguageArg::Ewasm => Language::Ewasm,
        }
    }
}

fn parse_evm_version(value: &str) -> Result<EvmVersion, String> {
    value.parse().map_err(|err: yulstack_core::CoreError| err.to_string())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { job, json } => cmd_check(job, json),
        Commands::Print { job, output } => cmd_print(job, output),
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_settings(path: Option<&Path>) -> Result<OptimiserSettings> {
    let Some(path) = path else {
        return Ok(OptimiserSettings::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings from {}", path.display()))?;
    Ok(OptimiserSettings::from_json(&json)?)
}

/// Builds the stack for `job` and runs parsing and analysis.
fn run_job(job: &JobArgs) -> Result<(AssemblyStack, bool)> {
    init_logging(job.verbose);

    let settings = load_settings(job.settings.as_deref())?;
    let source = std::fs::read_to_string(&job.input)
        .with_context(|| format!("Failed to read {}", job.input.display()))?;
    tracing::debug!(?settings, "loaded settings");

    let mut stack = AssemblyStack::new(job.language.into(), job.evm_version, settings);
    let source_name = job.input.display().to_string();
    let ok = stack.parse_and_analyze(&source_name, &source)?;
    Ok((stack, ok))
}

fn render_diagnostics(stack: &AssemblyStack) {
    let renderer = yulstack_emit::DiagnosticRenderer::new(true);
    eprint!("{}", renderer.render(stack.errors(), stack.char_stream().ok()));
}

fn cmd_check(job: JobArgs, json: bool) -> Result<()> {
    use colored::*;

    let (stack, ok) = run_job(&job)?;

    if json {
        println!("{}", serde_json::to_string_pretty(stack.errors())?);
    } else {
        render_diagnostics(&stack);
    }

    if ok {
        if !json {
            println!("{}", " VALID".bright_green().bold());
            if job.verbose {
                let tree = stack.parser_result()?;
                println!("   {} object(s) analyzed", tree.objects().count());
            }
        }
        Ok(())
    } else {
        if !json {
            println!("{}", " INVALID".bright_red().bold());
        }
        Err(anyhow::anyhow!("Analysis failed"))
    }
}

fn cmd_print(job: JobArgs, output: Option<PathBuf>) -> Result<()> {
    use colored::*;

    let (stack, ok) = run_job(&job)?;
    render_diagnostics(&stack);
    if !ok {
        anyhow::bail!("Analysis failed");
    }

    let printed = stack.print()?;
    match output {
        Some(path) => {
            std::fs::write(&path, printed)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!(
                "{} {}",
                " Written to".bright_green(),
                path.display()
            );
        }
        None => print!("{}", printed),
    }
    Ok(())
}
