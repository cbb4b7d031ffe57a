//! `obt` - render and check onebot-template files from the command line.
//!
//! ```text
//! obt render reply.tpl --context data.json
//! obt render - --context-json '{"name": "Izumi"}' < reply.tpl
//! obt check templates/*.tpl
//! ```

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use onebot_template::{onebot, Context, Template, TemplateBuilder};
use tracing_subscriber::EnvFilter;

/// Render and check OneBot message templates.
#[derive(Debug, Parser)]
#[command(name = "obt")]
#[command(version)]
#[command(about = "Render and check OneBot message templates")]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Render a template and print the result
    Render(RenderArgs),
    /// Compile templates and report syntax errors
    Check(CheckArgs),
}

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Template file, or `-` for stdin
    pub template: PathBuf,

    /// JSON file holding the context object
    #[arg(long, value_name = "FILE", conflicts_with = "context_json")]
    pub context: Option<PathBuf>,

    /// Context object given inline as JSON
    #[arg(long, value_name = "JSON")]
    pub context_json: Option<String>,

    /// Filter applied to variables that name none
    #[arg(long, value_name = "NAME")]
    pub default_filter: Option<String>,

    /// Do not register the built-in filters (raw, escape_message, image)
    #[arg(long)]
    pub no_builtin_filters: bool,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Template files, `-` for stdin
    #[arg(required = true)]
    pub templates: Vec<PathBuf>,
}

/// Installs the stderr log subscriber.
pub fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Runs a parsed command, writing its output to `out`.
pub fn run(cli: &Cli, out: &mut impl Write) -> Result<()> {
    match &cli.command {
        Command::Render(args) => {
            let rendered = render(args)?;
            out.write_all(rendered.as_bytes())?;
        }
        Command::Check(args) => check(args, out)?,
    }
    out.flush()?;
    Ok(())
}

fn builder(args: &RenderArgs) -> TemplateBuilder {
    let builder = if args.no_builtin_filters {
        TemplateBuilder::new()
    } else {
        onebot()
    };
    match &args.default_filter {
        Some(name) => builder.default_filter(name),
        None => builder,
    }
}

/// Renders the template named by `args`.
pub fn render(args: &RenderArgs) -> Result<String> {
    let source = read_source(&args.template)?;
    let template = builder(args)
        .build(&source)
        .with_context(|| format!("failed to compile {}", args.template.display()))?;
    let context = load_context(args)?;

    tracing::debug!(template = %args.template.display(), vars = context.len(), "rendering");
    template
        .render(&context)
        .with_context(|| format!("failed to render {}", args.template.display()))
}

fn load_context(args: &RenderArgs) -> Result<Context> {
    let json = match (&args.context, &args.context_json) {
        (Some(path), _) => fs::read_to_string(path)
            .with_context(|| format!("failed to read context file {}", path.display()))?,
        (None, Some(json)) => json.clone(),
        (None, None) => return Ok(Context::new()),
    };
    let value: serde_json::Value =
        serde_json::from_str(&json).context("context is not valid JSON")?;
    Context::from_serialize(&value).context("context must be a JSON object")
}

/// Compiles every template, reporting each result on its own line.
///
/// Fails after all templates were checked if any of them did not compile.
pub fn check(args: &CheckArgs, out: &mut impl Write) -> Result<()> {
    let mut failed = 0;
    for path in &args.templates {
        let compiled = read_source(path).and_then(|source| Template::new(&source).map_err(Into::into));
        match compiled {
            Ok(template) => {
                writeln!(out, "ok    {} ({} nodes)", path.display(), template.program().len())?
            }
            Err(err) => {
                failed += 1;
                writeln!(out, "error {}: {:#}", path.display(), err)?;
            }
        }
    }
    if failed > 0 {
        bail!("{} of {} templates failed to compile", failed, args.templates.len());
    }
    Ok(())
}

fn read_source(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut source = String::new();
        io::stdin()
            .read_to_string(&mut source)
            .context("failed to read template from stdin")?;
        return Ok(source);
    }
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}
