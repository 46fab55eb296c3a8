//! chaseward CLI: compile knowledge bases for reasoners and answer-set solvers.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::Result;

use chaseward::config::ChasewardConfig;
use chaseward::knowledge_base::KnowledgeBase;
use chaseward::reasoner::{Reasoner, RecordingBackend};
use chaseward::solver::{self, SolverKind};

#[derive(Parser)]
#[command(
    name = "chaseward",
    version,
    about = "Knowledge-base compiler for existential rules"
)]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the program a solver would receive.
    Render {
        /// Knowledge base as a JSON statement list.
        #[arg(long)]
        kb: PathBuf,

        #[arg(long, value_enum, default_value = "clingo")]
        solver: SolverKind,
    },

    /// Run an answer-set solver on a knowledge base.
    Solve {
        /// Knowledge base as a JSON statement list.
        #[arg(long)]
        kb: PathBuf,

        #[arg(long, value_enum, default_value = "clingo")]
        solver: SolverKind,

        /// Stop the solver after this many seconds.
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Show how the knowledge base is split into EDB and IDB predicates.
    Classify {
        /// Knowledge base as a JSON statement list.
        #[arg(long)]
        kb: PathBuf,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ChasewardConfig::load(path)?,
        None => ChasewardConfig::default(),
    };

    match cli.command {
        Commands::Render { kb, solver } => {
            let kb = load_kb(&kb)?;
            print!("{}", solver::render_program(solver, &kb));
        }

        Commands::Solve {
            kb,
            solver,
            timeout,
        } => {
            let kb = load_kb(&kb)?;
            let mut solver_config = config.solver(solver).clone();
            if let Some(seconds) = timeout {
                if seconds == 0 {
                    miette::bail!("--timeout must be strictly positive");
                }
                solver_config.timeout_seconds = Some(seconds);
            }

            let run = solver::run_solver(solver, &solver_config, &kb)?;
            for line in &run.output {
                println!("{line}");
            }
            if run.timed_out {
                println!("{solver} was stopped after its timeout.");
            }
            println!("... finished in {}ms.", run.elapsed.as_millis());
        }

        Commands::Classify { kb } => {
            let kb = load_kb(&kb)?;
            let mut reasoner = Reasoner::with_config(
                kb.into_shared(),
                Box::new(RecordingBackend::new()),
                &config.reasoner,
            )?;
            reasoner.load()?;

            println!("EDB predicates:");
            for predicate in reasoner.edb_predicates() {
                println!("  {predicate}");
            }
            println!("IDB predicates:");
            for predicate in reasoner.idb_predicates() {
                println!("  {predicate}");
            }
            println!("Aliased EDB predicates:");
            for predicate in reasoner.aliased_edb_predicates() {
                println!("  {predicate}");
            }
            println!("Aliases:");
            for (declaration, alias) in reasoner.load_index().aliases_for_edb_predicates() {
                println!("  {alias} <- {declaration}");
            }
            println!("Rules:");
            for rule in reasoner.rules() {
                println!("  {rule}");
            }

            let sources = reasoner.data_source_configuration()?;
            if !sources.is_empty() {
                println!("Data source configuration:");
                print!("{sources}");
            }
            reasoner.close();
        }
    }

    Ok(())
}

fn load_kb(path: &Path) -> Result<KnowledgeBase> {
    let kb = KnowledgeBase::load_json(path)?;
    tracing::debug!(path = %path.display(), statements = kb.len(), "loaded knowledge base");
    Ok(kb)
}
