mod config;
mod test_runner;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};

use loom::{CompileError, CompileOptions, Dialect, Format, ModeRegistry};

use config::Config;

const SUBCOMMANDS: &[&str] = &["build", "check", "modes", "test", "help"];

#[derive(Parser)]
#[command(name = "loom", version, about = "Mixed-syntax template compiler")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a template to JavaScript
    Build(BuildArgs),

    /// Compile without writing output (exit 0 if valid)
    Check(CompileArgs),

    /// List the registered modes
    Modes,

    /// Run .test.loom fixture files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct BuildArgs {
    #[command(flatten)]
    compile: CompileArgs,

    /// Write the output here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(clap::Args)]
struct CompileArgs {
    /// Template source file
    file: PathBuf,

    /// Mode of the top-level region
    #[arg(short, long)]
    mode: Option<String>,

    /// Emit `function(){}` callbacks and string concatenation
    #[arg(long)]
    legacy: bool,

    /// Render compile-time stylesheets one declaration per line
    #[arg(long)]
    pretty_css: bool,

    /// Name of the runtime object
    #[arg(long)]
    runtime: Option<String>,

    /// Warn about text kept literal by fallbacks
    #[arg(long)]
    strict_warnings: bool,

    /// Configuration file (defaults to loom.toml next to the source)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.loom file or directory containing them
    path: String,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() {
    // `loom file.loom` is `loom build file.loom`.
    let mut args: Vec<String> = std::env::args().collect();
    if let Some(pos) = args.iter().skip(1).position(|a| !a.starts_with('-')) {
        if !SUBCOMMANDS.contains(&args[pos + 1].as_str()) {
            args.insert(pos + 1, "build".to_string());
        }
    }

    let cli = Cli::parse_from(&args);
    let color_choice = if cli.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    match cli.command {
        Command::Build(build_args) => {
            let code = compile_file(&build_args.compile, color_choice);
            let written = match &build_args.output {
                Some(path) => std::fs::write(path, &code)
                    .map_err(|e| format!("cannot write '{}': {}", path.display(), e)),
                None => {
                    println!("{}", code);
                    Ok(())
                }
            };
            if let Err(message) = written {
                eprintln!("error: {}", message);
                process::exit(1);
            }
        }
        Command::Check(check_args) => {
            compile_file(&check_args, color_choice);
            eprintln!("ok: {} compiled successfully", check_args.file.display());
        }
        Command::Modes => list_modes(),
        Command::Test(test_args) => {
            let path = Path::new(&test_args.path);
            if test_args.list_categories {
                test_runner::list_categories(path);
                return;
            }
            let exit_code = test_runner::run_tests(path, cli.no_color, &test_args.category);
            process::exit(exit_code);
        }
    }
}

/// Resolve options from the config file and flags.
fn compile_options(args: &CompileArgs) -> Result<CompileOptions, String> {
    let mut options = CompileOptions::default();
    let config_path = args.config.clone().or_else(|| Config::discover(&args.file));
    if let Some(path) = config_path {
        Config::load(&path)?.apply(&mut options)?;
    }
    if let Some(mode) = &args.mode {
        options.root_mode = mode.clone();
    }
    if args.legacy {
        options.dialect = Dialect::Legacy;
    }
    if args.pretty_css {
        options.style_format = Format::Indented;
    }
    if let Some(runtime) = &args.runtime {
        options.runtime = runtime.clone();
    }
    if args.strict_warnings {
        options.warn_fallbacks = true;
    }
    Ok(options)
}

/// Compile `args.file`, rendering diagnostics. Exits on failure.
fn compile_file(args: &CompileArgs, color_choice: ColorChoice) -> String {
    let options = match compile_options(args) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("error: {}", message);
            process::exit(1);
        }
    };

    let source = match std::fs::read_to_string(&args.file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", args.file.display(), e);
            process::exit(1);
        }
    };

    let mut files = SimpleFiles::new();
    let file_id = files.add(args.file.display().to_string(), source.clone());

    let writer = StandardStream::stderr(color_choice);
    let config = term::Config::default();
    match loom::compile(&source, file_id, &options) {
        Ok(output) => {
            emit_diagnostics(&writer, &config, &files, &output.warnings);
            output.code
        }
        Err(errors) => {
            emit_diagnostics(&writer, &config, &files, &errors);
            process::exit(1);
        }
    }
}

fn emit_diagnostics(
    writer: &StandardStream,
    config: &term::Config,
    files: &SimpleFiles<String, String>,
    diagnostics: &[CompileError],
) {
    for diagnostic in diagnostics {
        let _ = term::emit_to_write_style(&mut writer.lock(), config, files, &diagnostic.to_diagnostic());
    }
}

fn list_modes() {
    let registry = ModeRegistry::standard();
    let default = registry.default_mode();
    for (id, spec) in registry.iter() {
        if spec.name().starts_with("__") {
            continue;
        }
        let marker = if Some(id) == default { " (default)" } else { "" };
        println!("{}{}", spec.aliases.join(", "), marker);
        println!("    {}", spec.description);
        if let Some(tag) = spec.tag {
            println!("    content of <{}>", tag);
        }
    }
}
