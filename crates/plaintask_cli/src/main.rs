//! Command-line front end for plaintask.
//!
//! # Responsibility
//! - Resolve configuration from flags and environment.
//! - Run one use-case per invocation and print a deterministic result.

use clap::{Parser, Subcommand};
use log::error;
use plaintask_core::config::{DATA_DIR_VAR, LOG_DIR_VAR, LOG_LEVEL_VAR, PROJECTS_PATH_VAR};
use plaintask_core::{CoreConfig, ProjectService, ProjectStatus};
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Parser)]
#[command(name = "plaintask")]
#[command(version)]
#[command(about = "Keep a plain-text projects file and its metadata in sync")]
struct Cli {
    #[arg(long, help = "Projects file. Falls back to $PROJECTS_PATH.")]
    projects: Option<String>,

    #[arg(long, help = "Directory for JSON containers. Falls back to $PLAINTASK_DATA_DIR.")]
    data_dir: Option<String>,

    #[arg(long, help = "trace|debug|info|warn|error. Falls back to $PLAINTASK_LOG_LEVEL.")]
    log_level: Option<String>,

    #[arg(long, help = "Write rotated logs here instead of stderr.")]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Reconcile the projects file with stored metadata.")]
    Sync,
    #[command(about = "List projects by order.")]
    List {
        #[arg(long, help = "Only projects carrying this tag.")]
        tag: Option<String>,
        #[arg(long, help = "Print JSON instead of titles.")]
        json: bool,
    },
    #[command(about = "Append a project to the projects file.")]
    Add {
        title: String,
        #[arg(long = "tag", help = "Tag to attach; repeatable.")]
        tags: Vec<String>,
    },
    #[command(about = "Show tag counts, busiest first.")]
    Tags,
    #[command(about = "Print the projects file verbatim.")]
    Raw,
    #[command(about = "Record a completion of a periodic project.")]
    Done {
        id: String,
        #[arg(long, help = "Completion time in epoch milliseconds. Defaults to now.")]
        date: Option<i64>,
    },
    #[command(about = "List completion records.")]
    Records {
        #[arg(long, help = "Only records of this project.")]
        project: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("event=cli_run module=cli status=error error={}", message);
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let config = resolve_config(&cli).map_err(|err| err.to_string())?;
    match &config.log_dir {
        Some(dir) => plaintask_core::init_logging(config.log_level, &dir.to_string_lossy())?,
        None => plaintask_core::init_stderr_logging(config.log_level)?,
    }

    let service = ProjectService::open(&config).map_err(|err| err.to_string())?;
    match cli.command {
        Command::Sync => {
            let report = service.sync().map_err(|err| err.to_string())?;
            println!(
                "removed={} updated={} created={} duplicates={}",
                report.removed, report.updated, report.created, report.duplicates
            );
        }
        Command::List { tag, json } => {
            let projects = service.list_projects(tag.as_deref());
            if json {
                let text =
                    serde_json::to_string_pretty(&projects).map_err(|err| err.to_string())?;
                println!("{text}");
            } else {
                for project in projects {
                    println!(
                        "{:>4}  {}  {}",
                        project.order,
                        status_mark(project.status()),
                        project.title
                    );
                }
            }
        }
        Command::Add { title, tags } => {
            let tags: Vec<&str> = tags.iter().map(String::as_str).collect();
            let project = service
                .create_project(&title, &tags)
                .map_err(|err| err.to_string())?;
            println!("{}", project.id);
        }
        Command::Tags => {
            let counts = service.tag_counts();
            for tag in counts.sorted_by_pending() {
                let pending = counts.pending.get(&tag).copied().unwrap_or(0);
                let overall = counts.overall.get(&tag).copied().unwrap_or(0);
                println!("{tag}  pending={pending} total={overall}");
            }
        }
        Command::Raw => print!("{}", service.raw_content()),
        Command::Done { id, date } => {
            let date = match date {
                Some(date) => date,
                None => now_epoch_ms()?,
            };
            let record = service
                .complete_periodic(&id, date)
                .map_err(|err| err.to_string())?;
            println!("{}", record.id);
        }
        Command::Records { project } => {
            for record in service.records(project.as_deref()) {
                println!("{}  {}  {}", record.date, record.project_id, record.id);
            }
        }
    }
    Ok(())
}

/// Flags win over environment variables.
fn resolve_config(cli: &Cli) -> Result<CoreConfig, plaintask_core::ConfigError> {
    CoreConfig::from_lookup(|name| {
        let flag = match name {
            PROJECTS_PATH_VAR => cli.projects.clone(),
            DATA_DIR_VAR => cli.data_dir.clone(),
            LOG_LEVEL_VAR => cli.log_level.clone(),
            LOG_DIR_VAR => cli.log_dir.clone(),
            _ => None,
        };
        flag.or_else(|| std::env::var(name).ok())
    })
}

fn status_mark(status: ProjectStatus) -> &'static str {
    match status {
        ProjectStatus::Pending => "[ ]",
        ProjectStatus::Done => "[x]",
        ProjectStatus::Incubated => "[?]",
    }
}

fn now_epoch_ms() -> Result<i64, String> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|err| format!("system clock before unix epoch: {err}"))?;
    i64::try_from(elapsed.as_millis()).map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::Parser;

    #[test]
    fn parses_list_with_tag_and_json() {
        let cli = Cli::parse_from([
            "plaintask",
            "--projects",
            "/tmp/p.md",
            "list",
            "--tag",
            "#home",
            "--json",
        ]);
        assert_eq!(cli.projects.as_deref(), Some("/tmp/p.md"));
        match cli.command {
            Command::List { tag, json } => {
                assert_eq!(tag.as_deref(), Some("#home"));
                assert!(json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_repeated_tags_on_add() {
        let cli = Cli::parse_from([
            "plaintask", "add", "Buy milk", "--tag", "errand", "--tag", "home",
        ]);
        match cli.command {
            Command::Add { title, tags } => {
                assert_eq!(title, "Buy milk");
                assert_eq!(tags, vec!["errand", "home"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
