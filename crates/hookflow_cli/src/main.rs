mod args;
mod runner;

use clap::Parser;
use tokio::runtime::Builder;
use tracing_subscriber::EnvFilter;

use args::{Cli, Commands};
use runner::RunRequest;

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        "hookflow=debug,hookflow_eval=debug,hookflow_core=debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let runtime = match Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: failed to build Tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    let config = cli.config;
    let verbose = cli.verbose;
    let result = runtime.block_on(async {
        match cli.command {
            Commands::Run {
                flow,
                method,
                path,
                query,
                header,
                body,
                dump_context,
            } => {
                let request = RunRequest {
                    method,
                    path,
                    query,
                    headers: header,
                    body,
                };
                runner::run_flow(&flow, config.as_deref(), request, dump_context, verbose).await
            }
            Commands::Template { template, context } => {
                runner::render_template(&template, context.as_deref())
            }
            Commands::Eval { expression } => runner::eval_expression(&expression),
            Commands::Helpers => runner::list_helpers(),
            Commands::Blocks => runner::list_blocks(config.as_deref()),
        }
    });

    if let Err(e) = result {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}
