//! labreview CLI, the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "labreview",
    version,
    about = "Simulated lab-report grading dashboard"
)]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the courses in the catalog
    Courses,

    /// Validate a course catalog TOML file
    Validate {
        /// Path to the catalog file
        #[arg(long)]
        catalog: PathBuf,
    },

    /// Create a starter config and an example catalog
    Init,

    /// Manage review prompts
    #[command(subcommand)]
    Prompt(PromptCommand),

    /// Run a simulated batch review
    Run {
        /// Course to review
        #[arg(long)]
        course: String,

        /// Experiments to include (repeatable, default: all)
        #[arg(long = "experiment")]
        experiments: Vec<String>,

        /// Review at most this many reports per experiment
        #[arg(long)]
        limit: Option<usize>,

        /// Milliseconds between reports (overrides config)
        #[arg(long)]
        tick_ms: Option<u64>,

        /// Run even if selected experiments have no prompt
        #[arg(long)]
        allow_unconfigured: bool,

        /// Show the detail view of one student (id or name) after the run
        #[arg(long)]
        student: Option<String>,

        /// Output directory for run reports
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output format: json, html, md, all
        #[arg(long, default_value = "json")]
        format: String,
    },

    /// Inspect and manage finished runs
    #[command(subcommand)]
    Records(RecordsCommand),
}

#[derive(Subcommand)]
pub enum PromptCommand {
    /// Set the prompt of one experiment
    Set {
        #[arg(long)]
        course: String,
        #[arg(long)]
        experiment: String,
        /// Report type: word or dify (default: the experiment's main type)
        #[arg(long = "type")]
        report_type: Option<String>,
        /// Prompt text
        #[arg(long, conflicts_with = "file")]
        text: Option<String>,
        /// Read the prompt from a file
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Show the prompt of one experiment
    Show {
        #[arg(long)]
        course: String,
        #[arg(long)]
        experiment: String,
    },

    /// Apply a built-in template, or list templates when --name is omitted
    Template {
        #[arg(long)]
        course: Option<String>,
        /// Experiment to configure (default: every experiment of the course)
        #[arg(long)]
        experiment: Option<String>,
        /// Report type: word or dify
        #[arg(long = "type", default_value = "word")]
        report_type: String,
        /// Template name
        #[arg(long)]
        name: Option<String>,
    },

    /// Show which experiments of a course have prompts
    Status {
        #[arg(long)]
        course: String,
    },
}

#[derive(Subcommand)]
pub enum RecordsCommand {
    /// List finished runs, most recent first
    List {
        /// Show at most this many runs
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show one run as markdown
    Show { id: String },

    /// Delete one run
    Delete { id: String },

    /// Delete every stored run
    Clear,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("labreview=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config;

    let result = match cli.command {
        Commands::Courses => commands::courses::execute(config),
        Commands::Validate { catalog } => commands::validate::execute(catalog),
        Commands::Init => commands::init::execute(),
        Commands::Prompt(cmd) => commands::prompt::execute(cmd, config).await,
        Commands::Run {
            course,
            experiments,
            limit,
            tick_ms,
            allow_unconfigured,
            student,
            output,
            format,
        } => {
            commands::run::execute(
                course,
                experiments,
                limit,
                tick_ms,
                allow_unconfigured,
                student,
                output,
                format,
                config,
            )
            .await
        }
        Commands::Records(cmd) => commands::records::execute(cmd, config).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
