//! CLI type definitions

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

use crate::domain::models::PhaseType;

#[derive(Parser, Debug)]
#[command(name = "review-phases")]
#[command(about = "Drive the phases of a contest review project", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Configuration file (defaults to .review-phases/config.yaml)
    #[arg(short, long, global = true, env = "REVIEW_PHASES_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Evaluate readiness at this instant instead of now (RFC 3339)
    #[arg(long, global = true)]
    pub at: Option<DateTime<Utc>>,

    /// Workflow snapshot (YAML)
    pub snapshot: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show every phase with its status and whether it can transition
    Status,

    /// Open or close every phase that is ready
    Advance {
        /// Operator recorded on every change
        #[arg(short, long)]
        operator: String,

        /// Write the updated snapshot back to the file
        #[arg(short, long)]
        write: bool,
    },

    /// Open or close a single phase, refusing it unless it has the given type
    Perform {
        /// Phase id
        phase: Uuid,

        /// Phase type the phase must have, e.g. "Appeals Response"
        #[arg(short = 't', long = "type", value_parser = parse_phase_type)]
        phase_type: PhaseType,

        /// Operator recorded on the change
        #[arg(short, long)]
        operator: String,

        /// Write the updated snapshot back to the file
        #[arg(short, long)]
        write: bool,
    },
}

fn parse_phase_type(value: &str) -> Result<PhaseType, String> {
    PhaseType::from_str(value).ok_or_else(|| format!("unknown phase type '{value}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_status() {
        let cli = Cli::try_parse_from(["review-phases", "project.yaml", "status"]).unwrap();
        assert_eq!(cli.snapshot, PathBuf::from("project.yaml"));
        assert!(matches!(cli.command, Commands::Status));
        assert!(!cli.json);
        assert!(cli.at.is_none());
    }

    #[test]
    fn test_parse_advance_with_globals() {
        let cli = Cli::try_parse_from([
            "review-phases",
            "--json",
            "--at",
            "2024-06-04T09:00:00Z",
            "project.yaml",
            "advance",
            "--operator",
            "ops",
            "--write",
        ])
        .unwrap();
        assert!(cli.json);
        assert_eq!(cli.at.map(|t| t.to_rfc3339()), Some("2024-06-04T09:00:00+00:00".to_string()));
        match cli.command {
            Commands::Advance { operator, write } => {
                assert_eq!(operator, "ops");
                assert!(write);
            }
            _ => panic!("expected advance"),
        }
    }

    #[test]
    fn test_parse_perform_with_phase_type() {
        let phase = Uuid::new_v4();
        let phase_arg = phase.to_string();
        let cli = Cli::try_parse_from([
            "review-phases",
            "project.yaml",
            "perform",
            phase_arg.as_str(),
            "--type",
            "appeals response",
            "-o",
            "ops",
        ])
        .unwrap();
        match cli.command {
            Commands::Perform {
                phase: parsed,
                phase_type,
                operator,
                write,
            } => {
                assert_eq!(parsed, phase);
                assert_eq!(phase_type, PhaseType::AppealsResponse);
                assert_eq!(operator, "ops");
                assert!(!write);
            }
            _ => panic!("expected perform"),
        }
    }

    #[test]
    fn test_perform_rejects_unknown_phase_type() {
        let phase = Uuid::new_v4().to_string();
        let result = Cli::try_parse_from([
            "review-phases",
            "project.yaml",
            "perform",
            phase.as_str(),
            "--type",
            "Registrar",
            "--operator",
            "ops",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_advance_requires_operator() {
        assert!(Cli::try_parse_from(["review-phases", "project.yaml", "advance"]).is_err());
    }
}
