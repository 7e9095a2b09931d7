//! Command-line front end over a YAML workflow snapshot.

pub mod commands;
pub mod output;
pub mod types;

use anyhow::Result;
use chrono::Utc;
use console::style;

use crate::domain::models::EngineConfig;
pub use commands::Workspace;
pub use types::{Cli, Commands};

/// Run the parsed command against the snapshot named on the command line.
pub async fn run(cli: &Cli, config: EngineConfig) -> Result<()> {
    let now = cli.at.unwrap_or_else(Utc::now);
    let mut workspace = Workspace::open(&cli.snapshot, config)?;

    match &cli.command {
        Commands::Status => {
            let status = commands::status::execute(&workspace, now).await?;
            output::output(&status, cli.json);
        }
        Commands::Advance { operator, write } => {
            let mut advanced = commands::advance::execute(&mut workspace, operator, now).await?;
            if *write && !advanced.advanced.is_empty() {
                workspace.save(&cli.snapshot).await?;
                advanced.written = true;
            }
            output::output(&advanced, cli.json);
        }
        Commands::Perform {
            phase,
            phase_type,
            operator,
            write,
        } => {
            let mut performed =
                commands::perform::execute(&mut workspace, *phase, *phase_type, operator, now).await?;
            if *write && performed.performed.is_some() {
                workspace.save(&cli.snapshot).await?;
                performed.written = true;
            }
            output::output(&performed, cli.json);
        }
    }
    Ok(())
}

/// Print the error chain and exit with a failure code.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let causes: Vec<String> = err.chain().skip(1).map(ToString::to_string).collect();
        let body = serde_json::json!({
            "error": err.to_string(),
            "causes": causes,
        });
        eprintln!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("{} {err}", style("error:").red().bold());
        for cause in err.chain().skip(1) {
            eprintln!("  {} {cause}", style("caused by:").dim());
        }
    }
    std::process::exit(1)
}
