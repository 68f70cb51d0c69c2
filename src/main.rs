//! Capstan CLI - a kanban board and ticket tracker for the command line.

use capstan::access::Principal;
use capstan::action_log;
use capstan::cli::{
    Cli, ColumnCommands, Commands, ConfigCommands, FeatureCommands, ProjectCommands, SystemCommands,
    TaskCommands, TicketCommands,
};
use capstan::commands::{self, Output, TaskCreateOpts, TicketCreateOpts};
use capstan::models::{FeatureStatus, Priority, TaskPatch, TaskStatus, TicketStatus, TicketType};
use capstan::storage::find_git_root;
use capstan::storage::workflow::TicketPatch;
use capstan::Error;
use chrono::NaiveDate;
use clap::Parser;
use std::env;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;

fn main() {
    let cli = Cli::parse();
    let human = cli.human_readable;

    // Determine repo path: --repo flag > CAPSTAN_REPO env > git root > cwd
    let repo_path = resolve_repo_path(cli.repo_path.clone(), human);

    let principal = Principal::new(cli.actor.clone(), cli.role);
    let actor = format!("{}:{}", principal.name, principal.role);

    // Serialize command for logging
    let (cmd_name, args_json) = serialize_command(&cli.command);

    let start = Instant::now();
    let result = run_command(cli.command, &repo_path, &principal, human);
    let duration = start.elapsed().as_millis() as u64;

    let (success, error) = match &result {
        Ok(_) => (true, None),
        Err(e) => (false, Some(e.to_string())),
    };

    // Best-effort; never fails the command
    action_log::log_action(&repo_path, &cmd_name, args_json, &actor, success, error, duration);

    if let Err(e) = result {
        if human {
            eprintln!("Error: {}", e);
        } else {
            eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
        }
        process::exit(1);
    }
}

/// Resolve the repository path based on explicit flag, environment variable,
/// or auto-detection.
///
/// Priority: --repo flag > CAPSTAN_REPO env var > git root detection > cwd.
/// An explicit path is used literally, without git root detection, so a
/// subdirectory of a repository can be targeted on purpose.
fn resolve_repo_path(explicit_path: Option<PathBuf>, human: bool) -> PathBuf {
    match explicit_path {
        Some(path) => {
            if !path.exists() {
                if human {
                    eprintln!("Error: Specified repo path does not exist: {}", path.display());
                } else {
                    eprintln!(
                        "{}",
                        serde_json::json!({
                            "error": format!("Specified repo path does not exist: {}", path.display())
                        })
                    );
                }
                process::exit(1);
            }
            path
        }
        None => {
            let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            find_git_root(&cwd).unwrap_or(cwd)
        }
    }
}

fn parse_due_date(s: &str) -> Result<NaiveDate, Error> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| Error::InvalidInput(format!("Invalid date (expected YYYY-MM-DD): {}", s)))
}

fn run_command(
    command: Option<Commands>,
    repo_path: &Path,
    principal: &Principal,
    human: bool,
) -> Result<(), Error> {
    match command {
        Some(Commands::System { command }) => match command {
            SystemCommands::Init => {
                let result = commands::system_init(repo_path)?;
                output(&result, human);
            }
        },

        Some(Commands::Version) => {
            output(&commands::version(), human);
        }

        Some(Commands::Config { command }) => match command {
            ConfigCommands::Get { key } => {
                let result = commands::config_get(repo_path, &key)?;
                output(&result, human);
            }
            ConfigCommands::Set { key, value } => {
                let result = commands::config_set(repo_path, &key, &value)?;
                output(&result, human);
            }
            ConfigCommands::List => {
                let result = commands::config_list(repo_path)?;
                output(&result, human);
            }
        },

        Some(Commands::Log { limit }) => {
            output(&commands::log_show(limit), human);
        }

        Some(Commands::Project { command }) => match command {
            ProjectCommands::Create { name, code, description } => {
                let result = commands::project_create(
                    repo_path,
                    principal,
                    &name,
                    &code,
                    description.as_deref(),
                )?;
                output(&result, human);
            }
            ProjectCommands::List => {
                let result = commands::project_list(repo_path)?;
                output(&result, human);
            }
            ProjectCommands::Show { id } => {
                let result = commands::project_show(repo_path, &id)?;
                output(&result, human);
            }
            ProjectCommands::Delete { id } => {
                let result = commands::project_delete(repo_path, principal, &id)?;
                output(&result, human);
            }
        },

        Some(Commands::Board { project }) => {
            let result = commands::board_show(repo_path, &project)?;
            output(&result, human);
        }

        Some(Commands::Column { command }) => match command {
            ColumnCommands::Create { project, name } => {
                let result = commands::column_create(repo_path, principal, &project, &name)?;
                output(&result, human);
            }
            ColumnCommands::List { project } => {
                let result = commands::board_show(repo_path, &project)?;
                output(&result, human);
            }
            ColumnCommands::Rename { id, name } => {
                let result = commands::column_rename(repo_path, principal, &id, &name)?;
                output(&result, human);
            }
            ColumnCommands::Activate { id } => {
                let result = commands::column_set_active(repo_path, principal, &id, true)?;
                output(&result, human);
            }
            ColumnCommands::Deactivate { id } => {
                let result = commands::column_set_active(repo_path, principal, &id, false)?;
                output(&result, human);
            }
            ColumnCommands::Reorder { project, ids } => {
                let result = commands::column_reorder(repo_path, principal, &project, &ids)?;
                output(&result, human);
            }
            ColumnCommands::Delete { id, force } => {
                let result = commands::column_delete(repo_path, principal, &id, force)?;
                output(&result, human);
            }
        },

        Some(Commands::Task { command }) => match command {
            TaskCommands::Create {
                project,
                column,
                title,
                description,
                priority,
                points,
                due,
            } => {
                let opts = TaskCreateOpts {
                    description,
                    priority: priority.as_deref().map(Priority::parse).transpose()?,
                    story_points: points,
                    due_date: due.as_deref().map(parse_due_date).transpose()?,
                };
                let result =
                    commands::task_create(repo_path, principal, &project, &column, &title, opts)?;
                output(&result, human);
            }
            TaskCommands::List { column, project } => {
                let result = commands::task_list(repo_path, column.as_deref(), project.as_deref())?;
                output(&result, human);
            }
            TaskCommands::Show { id } => {
                let result = commands::task_show(repo_path, &id)?;
                output(&result, human);
            }
            TaskCommands::Update {
                id,
                title,
                description,
                reporter,
                priority,
                points,
                due,
                clear_due,
                status,
            } => {
                let due_date = if clear_due {
                    Some(None)
                } else {
                    due.as_deref().map(parse_due_date).transpose()?.map(Some)
                };
                let patch = TaskPatch {
                    title,
                    description,
                    reporter,
                    priority: priority.as_deref().map(Priority::parse).transpose()?,
                    story_points: points,
                    due_date,
                    status: status.as_deref().map(TaskStatus::parse).transpose()?,
                };
                let result = commands::task_update(repo_path, principal, &id, patch)?;
                output(&result, human);
            }
            TaskCommands::Move { id, column, position } => {
                let result = commands::task_move(repo_path, principal, &id, &column, position)?;
                output(&result, human);
            }
            TaskCommands::Reorder { column, ids } => {
                let result = commands::task_reorder(repo_path, principal, &column, &ids)?;
                output(&result, human);
            }
            TaskCommands::Delete { id, force } => {
                let result = commands::task_delete(repo_path, principal, &id, force)?;
                output(&result, human);
            }
            TaskCommands::Restore { id } => {
                let result = commands::task_restore(repo_path, principal, &id)?;
                output(&result, human);
            }
        },

        Some(Commands::Ticket { command }) => match command {
            TicketCommands::Create {
                project,
                title,
                description,
                ticket_type,
                category,
                system,
            } => {
                let opts = TicketCreateOpts {
                    description,
                    system,
                    ticket_type: ticket_type.as_deref().map(TicketType::parse).transpose()?,
                    category,
                };
                let result =
                    commands::ticket_create(repo_path, principal, &project, &title, opts)?;
                output(&result, human);
            }
            TicketCommands::List { project } => {
                let result = commands::ticket_list(repo_path, project.as_deref())?;
                output(&result, human);
            }
            TicketCommands::Show { id } => {
                let result = commands::ticket_show(repo_path, &id)?;
                output(&result, human);
            }
            TicketCommands::Update {
                id,
                title,
                description,
                category,
                ticket_type,
                status,
            } => {
                let patch = TicketPatch {
                    title,
                    description,
                    category,
                    ticket_type: ticket_type.as_deref().map(TicketType::parse).transpose()?,
                    status: status.as_deref().map(TicketStatus::parse).transpose()?,
                };
                let result = commands::ticket_update(repo_path, principal, &id, patch)?;
                output(&result, human);
            }
            TicketCommands::Assign { id, to, clear } => {
                let assignee = if clear { None } else { to };
                let result =
                    commands::ticket_assign(repo_path, principal, &id, assignee.as_deref())?;
                output(&result, human);
            }
            TicketCommands::Approve { id } => {
                let result = commands::ticket_approve(repo_path, principal, &id)?;
                output(&result, human);
            }
            TicketCommands::Promote { id } => {
                let result = commands::ticket_promote(repo_path, principal, &id)?;
                output(&result, human);
            }
            TicketCommands::SpawnTask { id, column, title } => {
                let result = commands::ticket_spawn_task(
                    repo_path,
                    principal,
                    &id,
                    &column,
                    title.as_deref(),
                )?;
                output(&result, human);
            }
            TicketCommands::Delete { id, force } => {
                let result = commands::ticket_delete(repo_path, principal, &id, force)?;
                output(&result, human);
            }
            TicketCommands::Restore { id } => {
                let result = commands::ticket_restore(repo_path, principal, &id)?;
                output(&result, human);
            }
        },

        Some(Commands::Feature { command }) => match command {
            FeatureCommands::List { project } => {
                let result = commands::feature_list(repo_path, project.as_deref())?;
                output(&result, human);
            }
            FeatureCommands::Show { id } => {
                let result = commands::feature_show(repo_path, &id)?;
                output(&result, human);
            }
            FeatureCommands::SetStatus { id, status } => {
                let status = FeatureStatus::parse(&status)?;
                let result = commands::feature_set_status(repo_path, principal, &id, status)?;
                output(&result, human);
            }
            FeatureCommands::SpawnTask { id, column, title } => {
                let result = commands::feature_spawn_task(
                    repo_path,
                    principal,
                    &id,
                    &column,
                    title.as_deref(),
                )?;
                output(&result, human);
            }
        },

        None => {
            eprintln!("No command specified. Use --help for usage information.");
            process::exit(1);
        }
    }

    Ok(())
}

fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}

fn serialize_command(command: &Option<Commands>) -> (String, serde_json::Value) {
    match command {
        Some(Commands::System { command }) => match command {
            SystemCommands::Init => ("system init".to_string(), serde_json::json!({})),
        },

        Some(Commands::Version) => ("version".to_string(), serde_json::json!({})),

        Some(Commands::Config { command }) => match command {
            ConfigCommands::Get { key } => {
                ("config get".to_string(), serde_json::json!({ "key": key }))
            }
            ConfigCommands::Set { key, value } => (
                "config set".to_string(),
                serde_json::json!({ "key": key, "value": value }),
            ),
            ConfigCommands::List => ("config list".to_string(), serde_json::json!({})),
        },

        Some(Commands::Log { limit }) => {
            ("log".to_string(), serde_json::json!({ "limit": limit }))
        }

        Some(Commands::Project { command }) => match command {
            ProjectCommands::Create { name, code, description } => (
                "project create".to_string(),
                serde_json::json!({ "name": name, "code": code, "description": description }),
            ),
            ProjectCommands::List => ("project list".to_string(), serde_json::json!({})),
            ProjectCommands::Show { id } => {
                ("project show".to_string(), serde_json::json!({ "id": id }))
            }
            ProjectCommands::Delete { id } => {
                ("project delete".to_string(), serde_json::json!({ "id": id }))
            }
        },

        Some(Commands::Board { project }) => {
            ("board".to_string(), serde_json::json!({ "project": project }))
        }

        Some(Commands::Column { command }) => match command {
            ColumnCommands::Create { project, name } => (
                "column create".to_string(),
                serde_json::json!({ "project": project, "name": name }),
            ),
            ColumnCommands::List { project } => (
                "column list".to_string(),
                serde_json::json!({ "project": project }),
            ),
            ColumnCommands::Rename { id, name } => (
                "column rename".to_string(),
                serde_json::json!({ "id": id, "name": name }),
            ),
            ColumnCommands::Activate { id } => {
                ("column activate".to_string(), serde_json::json!({ "id": id }))
            }
            ColumnCommands::Deactivate { id } => {
                ("column deactivate".to_string(), serde_json::json!({ "id": id }))
            }
            ColumnCommands::Reorder { project, ids } => (
                "column reorder".to_string(),
                serde_json::json!({ "project": project, "ids": ids }),
            ),
            ColumnCommands::Delete { id, force } => (
                "column delete".to_string(),
                serde_json::json!({ "id": id, "force": force }),
            ),
        },

        Some(Commands::Task { command }) => match command {
            TaskCommands::Create {
                project,
                column,
                title,
                description,
                priority,
                points,
                due,
            } => (
                "task create".to_string(),
                serde_json::json!({
                    "project": project, "column": column, "title": title,
                    "description": description, "priority": priority,
                    "points": points, "due": due
                }),
            ),
            TaskCommands::List { column, project } => (
                "task list".to_string(),
                serde_json::json!({ "column": column, "project": project }),
            ),
            TaskCommands::Show { id } => {
                ("task show".to_string(), serde_json::json!({ "id": id }))
            }
            TaskCommands::Update {
                id,
                title,
                description,
                reporter,
                priority,
                points,
                due,
                clear_due,
                status,
            } => (
                "task update".to_string(),
                serde_json::json!({
                    "id": id, "title": title, "description": description,
                    "reporter": reporter, "priority": priority, "points": points,
                    "due": due, "clear_due": clear_due, "status": status
                }),
            ),
            TaskCommands::Move { id, column, position } => (
                "task move".to_string(),
                serde_json::json!({ "id": id, "column": column, "position": position }),
            ),
            TaskCommands::Reorder { column, ids } => (
                "task reorder".to_string(),
                serde_json::json!({ "column": column, "ids": ids }),
            ),
            TaskCommands::Delete { id, force } => (
                "task delete".to_string(),
                serde_json::json!({ "id": id, "force": force }),
            ),
            TaskCommands::Restore { id } => {
                ("task restore".to_string(), serde_json::json!({ "id": id }))
            }
        },

        Some(Commands::Ticket { command }) => match command {
            TicketCommands::Create {
                project,
                title,
                description,
                ticket_type,
                category,
                system,
            } => (
                "ticket create".to_string(),
                serde_json::json!({
                    "project": project, "title": title, "description": description,
                    "type": ticket_type, "category": category, "system": system
                }),
            ),
            TicketCommands::List { project } => (
                "ticket list".to_string(),
                serde_json::json!({ "project": project }),
            ),
            TicketCommands::Show { id } => {
                ("ticket show".to_string(), serde_json::json!({ "id": id }))
            }
            TicketCommands::Update {
                id,
                title,
                description,
                category,
                ticket_type,
                status,
            } => (
                "ticket update".to_string(),
                serde_json::json!({
                    "id": id, "title": title, "description": description,
                    "category": category, "type": ticket_type, "status": status
                }),
            ),
            TicketCommands::Assign { id, to, clear } => (
                "ticket assign".to_string(),
                serde_json::json!({ "id": id, "to": to, "clear": clear }),
            ),
            TicketCommands::Approve { id } => {
                ("ticket approve".to_string(), serde_json::json!({ "id": id }))
            }
            TicketCommands::Promote { id } => {
                ("ticket promote".to_string(), serde_json::json!({ "id": id }))
            }
            TicketCommands::SpawnTask { id, column, title } => (
                "ticket spawn-task".to_string(),
                serde_json::json!({ "id": id, "column": column, "title": title }),
            ),
            TicketCommands::Delete { id, force } => (
                "ticket delete".to_string(),
                serde_json::json!({ "id": id, "force": force }),
            ),
            TicketCommands::Restore { id } => {
                ("ticket restore".to_string(), serde_json::json!({ "id": id }))
            }
        },

        Some(Commands::Feature { command }) => match command {
            FeatureCommands::List { project } => (
                "feature list".to_string(),
                serde_json::json!({ "project": project }),
            ),
            FeatureCommands::Show { id } => {
                ("feature show".to_string(), serde_json::json!({ "id": id }))
            }
            FeatureCommands::SetStatus { id, status } => (
                "feature set-status".to_string(),
                serde_json::json!({ "id": id, "status": status }),
            ),
            FeatureCommands::SpawnTask { id, column, title } => (
                "feature spawn-task".to_string(),
                serde_json::json!({ "id": id, "column": column, "title": title }),
            ),
        },

        None => ("none".to_string(), serde_json::json!({})),
    }
}
