use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hookflow")]
#[command(author, version, about = "Run hookflow flows against synthetic requests")]
pub struct Cli {
    #[arg(long, global = true, help = "Path to Hookflow.toml (default: nearest ancestor)")]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Execute a flow file and print the response")]
    Run {
        #[arg(help = "Flow definition (JSON node tree)")]
        flow: PathBuf,

        #[arg(short = 'X', long, default_value = "GET", help = "Request method")]
        method: String,

        #[arg(long, default_value = "/", help = "Request path")]
        path: String,

        #[arg(
            short,
            long = "query",
            value_name = "KEY=VALUE",
            help = "Query parameter (repeatable)"
        )]
        query: Vec<String>,

        #[arg(
            short = 'H',
            long = "header",
            value_name = "KEY=VALUE",
            help = "Request header (repeatable)"
        )]
        header: Vec<String>,

        #[arg(short, long, help = "Request body as JSON")]
        body: Option<String>,

        #[arg(long, help = "Print the final execution context")]
        dump_context: bool,
    },

    #[command(about = "Interpolate a template against a JSON context")]
    Template {
        #[arg(help = "Template text, e.g. 'Hello {params.name}!'")]
        template: String,

        #[arg(short, long, help = "Context variables as a JSON object")]
        context: Option<String>,
    },

    #[command(about = "Evaluate an expression")]
    Eval {
        #[arg(help = "Expression to evaluate, e.g. '12 < 18 && true'")]
        expression: String,
    },

    #[command(about = "List the built-in helpers")]
    Helpers,

    #[command(about = "List the registered block types")]
    Blocks,
}
