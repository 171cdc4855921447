// SPDX-License-Identifier: MIT OR Apache-2.0
//! `ordoplay_script` - compile and check visual script graphs from the command line.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ordoplay_script_editor::{ScriptSession, ScriptSettings};
use ordoplay_script_graph::{
    check_round_trip, AssetStore, FileAssetStore, Graph, GraphSummary, MemoryAssetStore, TypeDatabase,
};
use ordoplay_script_translator::{build_all, CompilerBackend, ExternalCompiler, NoopBackend, ScriptCompiler};
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "ordoplay_script")]
#[command(about = "Compile OrdoPlay visual script graphs to C#", long_about = None)]
struct Cli {
    /// Settings file (defaults to script_settings.ron next to the graphs)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Type database in RON, merged over the built-in types
    #[arg(long, global = true)]
    types: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile one graph
    Compile {
        /// Graph asset
        graph: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compile every graph of a project, continuing past failures
    BuildAll {
        /// Project directory
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Directory receiving one source file per graph
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Save, reload and compare a graph's structure
    Check {
        /// Graph asset
        graph: PathBuf,
    },
}

fn main() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("ordoplay_script=info".parse()?)
        .add_directive("ordoplay_script_editor=info".parse()?)
        .add_directive("ordoplay_script_translator=info".parse()?);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let database = load_types(cli.types.as_deref())?;

    match cli.command {
        Commands::Compile { graph, output } => {
            let settings = load_settings(cli.settings.as_deref(), parent_dir(&graph))?;
            compile(&graph, output.as_deref(), database, settings)
        }
        Commands::BuildAll { dir, output, json } => {
            let settings = load_settings(cli.settings.as_deref(), &dir)?;
            build(&dir, output.as_deref(), json, &database, &settings)
        }
        Commands::Check { graph } => check(&graph),
    }
}

fn parent_dir(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new("."))
}

fn load_types(path: Option<&Path>) -> Result<TypeDatabase> {
    let mut database = TypeDatabase::standard();
    if let Some(path) = path {
        let source = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let extra = TypeDatabase::from_ron(&source).with_context(|| format!("Invalid type database {}", path.display()))?;
        database.merge(extra);
        tracing::info!(path = %path.display(), "Loaded type database");
    }
    Ok(database)
}

fn load_settings(path: Option<&Path>, project_dir: &Path) -> Result<ScriptSettings> {
    let settings = match path {
        Some(path) => ScriptSettings::load(path),
        None => ScriptSettings::load_or_default(project_dir),
    };
    settings.context("Failed to load script settings")
}

fn compiler_backend(settings: &ScriptSettings) -> Box<dyn CompilerBackend> {
    match &settings.compiler {
        Some(compiler) => Box::new(ExternalCompiler::new(compiler.program.clone(), compiler.args.clone())),
        None => Box::new(NoopBackend),
    }
}

fn load_graph(path: &Path) -> Result<Graph> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Not a graph file: {}", path.display()))?;
    FileAssetStore::new(parent_dir(path))
        .load(file_name)
        .with_context(|| format!("Failed to load {}", path.display()))
}

fn compile(path: &Path, output: Option<&Path>, database: TypeDatabase, settings: ScriptSettings) -> Result<()> {
    let graph = load_graph(path)?;
    let backend = compiler_backend(&settings);
    let mut session = ScriptSession::new(graph, database, settings);
    let result = session.compile(backend.as_ref());

    if !result.is_success() {
        for error in &result.errors {
            match error.source_node {
                Some(node) => eprintln!("error [{}]: {}", node.0, error.message),
                None => eprintln!("error: {}", error.message),
            }
        }
        bail!("{} failed with {} error(s)", path.display(), result.errors.len());
    }

    match output {
        Some(output) => {
            std::fs::write(output, &result.source.text)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            tracing::info!(output = %output.display(), "Wrote {}", result.unit.class.name);
        }
        None => print!("{}", result.source.text),
    }
    Ok(())
}

fn build(
    dir: &Path,
    output: Option<&Path>,
    json: bool,
    database: &TypeDatabase,
    settings: &ScriptSettings,
) -> Result<()> {
    let store = FileAssetStore::new(dir.join(&settings.asset_dir)).with_extension(settings.graph_extension.clone());
    let paths = store.list().context("Failed to list graph assets")?;
    let backend = compiler_backend(settings);
    let mut compiler = ScriptCompiler::new(database, backend.as_ref());
    let report = build_all(&store, &paths, &mut compiler, &settings.translation_options());

    if let Some(output) = output {
        std::fs::create_dir_all(output).with_context(|| format!("Failed to create {}", output.display()))?;
        for compiled in &report.compiled {
            let file = output.join(format!("{}.cs", compiled.class_name));
            std::fs::write(&file, &compiled.source).with_context(|| format!("Failed to write {}", file.display()))?;
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for failed in &report.failed {
            eprintln!("{}:", failed.path);
            for error in &failed.errors {
                eprintln!("  {error}");
            }
        }
        println!("{} compiled, {} failed", report.compiled.len(), report.failed.len());
    }

    if !report.is_success() {
        bail!("{} graph(s) failed", report.failed.len());
    }
    Ok(())
}

fn check(path: &Path) -> Result<()> {
    let graph = load_graph(path)?;
    let summary = GraphSummary::of(&graph);
    let mut scratch = MemoryAssetStore::new();
    if !check_round_trip(&mut scratch, "check", &graph)? {
        bail!("{} does not survive a save and reload", path.display());
    }
    println!(
        "{}: {} nodes, {} edges, {} variables",
        summary.name,
        summary.node_count(),
        summary.edge_count(),
        summary.variable_count
    );
    Ok(())
}
