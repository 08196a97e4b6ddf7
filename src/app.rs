//! Line-oriented front end.
//!
//! Reads one command per line from stdin and drives the task cache with it.
//! Rendering is plain text; everything interesting happens in [`TaskService`].

use anyhow::{Context, Result};
use std::str::FromStr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::auth::{Identity, IdentityProvider, StaticSession};
use crate::backend::factory::{create_gateway, ConfiguredGateway};
use crate::config::Config;
use crate::constants::{
    ERROR_TASK_CREATE_FAILED, ERROR_TASK_NOT_FOUND, ERROR_UNKNOWN_COMMAND, INFO_OFFLINE, INFO_ONLINE, INFO_SIGNED_OUT,
    SUCCESS_TASK_CREATED, SUCCESS_TASK_DELETED, SUCCESS_TASK_TOGGLED, SUCCESS_TASK_UPDATED,
};
use crate::entities::{CompactTask, Complexity, SyncStatus, Task, TaskWithSyncStatus, Urgency};
use crate::sync::{SessionBinding, TaskService, WriteReceipt};
use crate::utils::{datetime, task_filters};

const HELP: &str = "\
Commands:
  add <title> [c=low|medium|high] [u=low|medium|high]
  toggle <id>            flip completion
  update <id> <complexity> <urgency>
  rm <id>                delete
  list [urgency|complexity]
  filter urgency|complexity <level>
  offline | online       switch gateway connectivity
  status                 session, connectivity and sync summary
  export                 print tasks in compact JSON
  signin <user> | signout
  help | quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Urgency,
    Complexity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterSpec {
    Urgency(Urgency),
    Complexity(Complexity),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add {
        title: String,
        complexity: Complexity,
        urgency: Urgency,
    },
    Toggle(String),
    Update {
        id: String,
        complexity: Complexity,
        urgency: Urgency,
    },
    Remove(String),
    List(Option<SortKey>),
    Filter(FilterSpec),
    Offline,
    Online,
    Status,
    Export,
    SignIn(String),
    SignOut,
    Help,
    Quit,
}

fn required<'a>(arg: Option<&'a str>, what: &str) -> Result<&'a str> {
    arg.ok_or_else(|| anyhow::anyhow!("missing {what}"))
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let verb = words.next().unwrap_or_default().to_ascii_lowercase();

        let command = match verb.as_str() {
            "add" => {
                let mut complexity = Complexity::default();
                let mut urgency = Urgency::default();
                let mut title = Vec::new();
                for word in words {
                    if let Some(level) = word.strip_prefix("c=") {
                        complexity = level.parse()?;
                    } else if let Some(level) = word.strip_prefix("u=") {
                        urgency = level.parse()?;
                    } else {
                        title.push(word);
                    }
                }
                if title.is_empty() {
                    anyhow::bail!("task title cannot be empty");
                }
                Command::Add {
                    title: title.join(" "),
                    complexity,
                    urgency,
                }
            }
            "toggle" | "done" => Command::Toggle(required(words.next(), "task id")?.to_string()),
            "update" => Command::Update {
                id: required(words.next(), "task id")?.to_string(),
                complexity: required(words.next(), "complexity")?.parse()?,
                urgency: required(words.next(), "urgency")?.parse()?,
            },
            "rm" | "remove" | "delete" => Command::Remove(required(words.next(), "task id")?.to_string()),
            "list" | "ls" => match words.next() {
                None => Command::List(None),
                Some("urgency") => Command::List(Some(SortKey::Urgency)),
                Some("complexity") => Command::List(Some(SortKey::Complexity)),
                Some(other) => anyhow::bail!("cannot sort by '{other}'"),
            },
            "filter" => {
                let key = required(words.next(), "filter key")?;
                let level = required(words.next(), "level")?;
                match key {
                    "urgency" => Command::Filter(FilterSpec::Urgency(level.parse()?)),
                    "complexity" => Command::Filter(FilterSpec::Complexity(level.parse()?)),
                    other => anyhow::bail!("cannot filter by '{other}'"),
                }
            }
            "offline" => Command::Offline,
            "online" => Command::Online,
            "status" => Command::Status,
            "export" => Command::Export,
            "signin" => Command::SignIn(required(words.next(), "user id")?.to_string()),
            "signout" => Command::SignOut,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            _ => anyhow::bail!("{}", ERROR_UNKNOWN_COMMAND),
        };
        Ok(command)
    }
}

/// Resolve a full id or a unique id prefix against the cached list.
pub fn resolve_id(tasks: &[TaskWithSyncStatus], needle: &str) -> Option<String> {
    if let Some(exact) = tasks.iter().find(|t| t.id() == needle) {
        return Some(exact.id().to_string());
    }
    let mut matches = tasks.iter().filter(|t| t.id().starts_with(needle));
    match (matches.next(), matches.next()) {
        (Some(only), None) => Some(only.id().to_string()),
        _ => None,
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// One line per task: completion box, short id, title, levels, age, sync marker.
pub fn render_task(task: &TaskWithSyncStatus, date_format: &str) -> String {
    let check = if task.is_completed { "x" } else { " " };
    let sync = match task.sync_status {
        SyncStatus::Synced => "",
        SyncStatus::Pending => "  ⏳ pending",
        SyncStatus::Error => "  ⚠ retry pending",
    };
    format!(
        "[{}] {:<8}  {}  (complexity: {}, urgency: {}, {}){}",
        check,
        short_id(task.id()),
        task.title,
        task.complexity,
        task.urgency,
        datetime::format_created_now(task.created_at, date_format),
        sync
    )
}

fn print_tasks(tasks: &[TaskWithSyncStatus], config: &Config) {
    let (active, completed) = task_filters::split_by_completion(tasks);
    if active.is_empty() && completed.is_empty() {
        println!("(no tasks)");
    }
    for task in &active {
        println!("{}", render_task(task, &config.display.date_format));
    }
    if config.display.show_completed && !completed.is_empty() {
        println!("-- completed --");
        for task in &completed {
            println!("{}", render_task(task, &config.display.date_format));
        }
    }
    let summary = task_filters::summarize_sync(tasks);
    if !summary.is_settled() {
        println!("({} pending, {} failed)", summary.pending, summary.error);
    }
}

/// One-line summary of who is signed in, gateway state and sync progress.
pub fn status_line(user: Option<Identity>, gateway: &ConfiguredGateway, tasks: &[TaskWithSyncStatus]) -> String {
    let who = match user {
        Some(Identity { uid, email: Some(email) }) => format!("{uid} <{email}>"),
        Some(Identity { uid, email: None }) => uid,
        None => "signed out".to_string(),
    };
    let link = match (gateway.is_connected(), gateway.is_online()) {
        (false, _) => "not connected",
        (true, true) => "online",
        (true, false) => "offline",
    };
    let summary = task_filters::summarize_sync(tasks);
    format!(
        "{who} | {link} | {} task(s): {} synced, {} pending, {} failed",
        tasks.len(),
        summary.synced,
        summary.pending,
        summary.error
    )
}

fn report(message: &str, receipt: &WriteReceipt) {
    println!("{} (remote: {:?})", message, receipt.remote_outcome());
}

/// Run the command loop until `quit` or end of input.
pub async fn run_app(config: Config) -> Result<()> {
    let gateway = create_gateway(&config.gateway)?;
    let session = Arc::new(StaticSession::new());
    let service = TaskService::from_config(&config, gateway.as_gateway(), session.clone());
    let _binding = SessionBinding::bind(service.clone(), session.as_ref());

    if !config.session.user_id.is_empty() {
        let mut identity = Identity::new(config.session.user_id.clone());
        if !config.session.email.is_empty() {
            identity = identity.with_email(config.session.email.clone());
        }
        session.sign_in(identity);
        service.initialize().await;
    }

    println!("Daily Organizer. Type 'help' for commands.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }
        execute(command, &service, &session, &gateway, &config).await?;
    }

    service.destroy();
    Ok(())
}

async fn execute(
    command: Command,
    service: &TaskService,
    session: &StaticSession,
    gateway: &ConfiguredGateway,
    config: &Config,
) -> Result<()> {
    let tasks = service.get_tasks();
    match command {
        Command::Add {
            title,
            complexity,
            urgency,
        } => match service.add_task(Task::new(title, complexity, urgency)) {
            Ok(receipt) => report(SUCCESS_TASK_CREATED, &receipt),
            Err(e) => {
                log::warn!("add_task failed: {e}");
                println!("{ERROR_TASK_CREATE_FAILED} ({e})");
            }
        },
        Command::Toggle(id) => match resolve_id(&tasks, &id) {
            Some(id) => report(SUCCESS_TASK_TOGGLED, &service.toggle_task_complete(&id)),
            None => println!("{ERROR_TASK_NOT_FOUND}"),
        },
        Command::Update {
            id,
            complexity,
            urgency,
        } => match resolve_id(&tasks, &id).and_then(|id| service.get_task_by_id(&id)) {
            Some(current) => {
                let mut task = current.task;
                task.complexity = complexity;
                task.urgency = urgency;
                report(SUCCESS_TASK_UPDATED, &service.update_task(task));
            }
            None => println!("{ERROR_TASK_NOT_FOUND}"),
        },
        Command::Remove(id) => match resolve_id(&tasks, &id) {
            Some(id) => report(SUCCESS_TASK_DELETED, &service.remove_task(&id)),
            None => println!("{ERROR_TASK_NOT_FOUND}"),
        },
        Command::List(None) => print_tasks(&tasks, config),
        Command::List(Some(SortKey::Urgency)) => print_tasks(&task_filters::sort_by_urgency(&tasks), config),
        Command::List(Some(SortKey::Complexity)) => print_tasks(&task_filters::sort_by_complexity(&tasks), config),
        Command::Filter(FilterSpec::Urgency(level)) => {
            print_tasks(&task_filters::filter_by_urgency(&tasks, level), config)
        }
        Command::Filter(FilterSpec::Complexity(level)) => {
            print_tasks(&task_filters::filter_by_complexity(&tasks, level), config)
        }
        Command::Offline => {
            gateway.set_online(false);
            println!("{INFO_OFFLINE}");
        }
        Command::Online => {
            gateway.set_online(true);
            println!("{INFO_ONLINE}");
        }
        Command::Status => println!("{}", status_line(session.current_user(), gateway, &tasks)),
        Command::Export => {
            let compact: Vec<CompactTask> = tasks.iter().map(|t| CompactTask::from(&t.task)).collect();
            println!("{}", serde_json::to_string_pretty(&compact)?);
        }
        Command::SignIn(uid) => {
            session.sign_in(Identity::new(uid));
            service.initialize().await;
        }
        Command::SignOut => {
            if session.current_user().is_some() {
                session.sign_out();
                println!("{INFO_SIGNED_OUT}");
            }
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }

    // Let snapshot deliveries triggered by this command land before the next prompt.
    tokio::task::yield_now().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_add_with_level_flags() {
        let command: Command = "add Buy milk c=low u=high".parse().unwrap();
        assert_eq!(
            command,
            Command::Add {
                title: "Buy milk".to_string(),
                complexity: Complexity::Low,
                urgency: Urgency::High,
            }
        );
    }

    #[test]
    fn add_defaults_to_medium_levels() {
        let command: Command = "add Read".parse().unwrap();
        assert_eq!(
            command,
            Command::Add {
                title: "Read".to_string(),
                complexity: Complexity::Medium,
                urgency: Urgency::Medium,
            }
        );
    }

    #[test]
    fn rejects_empty_title_and_unknown_verbs() {
        assert!("add c=low".parse::<Command>().is_err());
        assert!("frobnicate".parse::<Command>().is_err());
        assert!("filter urgency extreme".parse::<Command>().is_err());
    }

    #[test]
    fn resolves_unique_prefixes_only() {
        let tasks: Vec<TaskWithSyncStatus> = [
            Task::with_id("abc123", "a", Complexity::Low, Urgency::Low),
            Task::with_id("abd456", "b", Complexity::Low, Urgency::Low),
        ]
        .into_iter()
        .map(TaskWithSyncStatus::from)
        .collect();

        assert_eq!(resolve_id(&tasks, "abc"), Some("abc123".to_string()));
        assert_eq!(resolve_id(&tasks, "ab"), None);
        assert_eq!(resolve_id(&tasks, "abd456"), Some("abd456".to_string()));
        assert_eq!(resolve_id(&tasks, "zz"), None);
    }

    #[tokio::test]
    async fn status_reports_connectivity_and_sync() {
        let gateway = create_gateway(&crate::config::GatewayConfig::default()).unwrap();
        let mut pending = TaskWithSyncStatus::from(Task::with_id("1", "a", Complexity::Low, Urgency::Low));
        pending.sync_status = SyncStatus::Pending;

        assert_eq!(
            status_line(None, &gateway, std::slice::from_ref(&pending)),
            "signed out | not connected | 1 task(s): 0 synced, 1 pending, 0 failed"
        );

        gateway.as_gateway().connect().await.unwrap();
        gateway.set_online(false);
        let user = Identity::new("u1").with_email("u1@example.com");
        assert_eq!(
            status_line(Some(user), &gateway, &[]),
            "u1 <u1@example.com> | offline | 0 task(s): 0 synced, 0 pending, 0 failed"
        );
        assert_eq!("status".parse::<Command>().unwrap(), Command::Status);
    }

    #[test]
    fn render_marks_completed_and_failed_tasks() {
        let mut task = TaskWithSyncStatus::from(Task::with_id("1", "Buy milk", Complexity::Low, Urgency::High));
        task.task.is_completed = true;
        task.sync_status = SyncStatus::Error;
        let line = render_task(&task, datetime::DEFAULT_DATE_FORMAT);
        assert!(line.starts_with("[x] 1"));
        assert!(line.contains("retry pending"));
        assert!(line.contains("today"));
    }
}
