use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    load_settings, ControllerSnapshot, DeleteOutcome, FilterConfig, ListController, SortConfig,
    TodoDraft,
};
use shared::domain::{Priority, Todo, TodoId};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Browse and edit the shared todo list")]
struct Cli {
    /// Overrides the configured API root, e.g. http://127.0.0.1:5000/api
    #[arg(long, env = "TODO_API_URL")]
    api_url: Option<String>,
    #[arg(long, env = "TODO_API_TOKEN", hide_env_values = true)]
    token: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    List {
        #[arg(long)]
        priority: Option<Priority>,
        #[arg(long)]
        tag: Option<String>,
        /// Username of a mentioned user.
        #[arg(long)]
        mention: Option<String>,
        #[arg(long)]
        completed: Option<bool>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        limit: Option<u32>,
        /// createdAt-desc or createdAt-asc
        #[arg(long, default_value = "createdAt-desc", value_parser = parse_sort)]
        sort: SortConfig,
    },
    Stats,
    Create {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "low")]
        priority: Priority,
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long = "mention")]
        mentions: Vec<String>,
    },
    /// Marks a todo completed, or reopens it.
    Complete { id: String },
    Delete {
        id: String,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    History,
    Users,
}

fn parse_sort(token: &str) -> Result<SortConfig, String> {
    SortConfig::parse_token(token).ok_or_else(|| format!("unknown sort '{token}'"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings().context("loading todo settings")?;
    if let Some(api_url) = cli.api_url {
        settings.api_url = api_url;
    }
    if let Some(token) = cli.token.filter(|t| !t.trim().is_empty()) {
        settings.api_token = Some(token);
    }
    if let Command::List {
        limit: Some(limit), ..
    } = &cli.command
    {
        settings.page_size = *limit;
    }
    settings.validate().context("validating todo settings")?;

    let controller = ListController::connect(&settings).context("building the todo client")?;

    match cli.command {
        Command::List {
            priority,
            tag,
            mention,
            completed,
            search,
            page,
            sort,
            ..
        } => {
            if sort != SortConfig::default() {
                controller.set_sort(sort).await;
            }
            controller
                .replace_filters(FilterConfig {
                    priority,
                    tag: tag.filter(|t| !t.trim().is_empty()),
                    mention: mention.filter(|m| !m.trim().is_empty()),
                    completed,
                    search: search.filter(|s| !s.trim().is_empty()),
                })
                .await;
            if page > 1 {
                controller.set_page(page).await;
            }
            print_list(&controller.snapshot().await);
        }
        Command::Stats => {
            let _ = controller.refresh_stats().await;
            match controller.snapshot().await.stats {
                Some(stats) => {
                    println!("total      {}", stats.total_todos);
                    println!("completed  {}", stats.completed_todos);
                    println!("pending    {}", stats.pending_todos);
                    println!("high       {}", stats.high_priority);
                    println!("medium     {}", stats.medium_priority);
                    println!("low        {}", stats.low_priority);
                    println!("done       {}%", stats.completion_rate());
                }
                None => println!("stats unavailable"),
            }
        }
        Command::Create {
            title,
            description,
            priority,
            tags,
            mentions,
        } => {
            let mut draft = TodoDraft::new();
            draft.title = title;
            draft.description = description;
            draft.priority = priority;
            for tag in &tags {
                draft.add_tag(tag);
            }
            for username in &mentions {
                draft.toggle_mention(username);
            }
            let request = draft.into_create_request()?;
            match controller.create_todo(request).await {
                Ok(todo) => println!("created {}", todo.id),
                Err(err) => eprintln!("{}", err.user_message()),
            }
        }
        Command::Complete { id } => {
            let id = TodoId::from(id);
            if !locate(&controller, &id).await {
                eprintln!("todo {id} not found");
                return Ok(());
            }
            match controller.toggle_completed(&id).await {
                Ok(todo) if todo.completed => println!("completed {id}"),
                Ok(_) => println!("reopened {id}"),
                Err(err) => eprintln!("{}", err.user_message()),
            }
        }
        Command::Delete { id, yes } => {
            let id = TodoId::from(id);
            let outcome = if yes {
                controller.delete_todo(&id, &|_: &str| true).await
            } else {
                controller.delete_todo(&id, &ask_on_stdin).await
            };
            match outcome {
                Ok(DeleteOutcome::Deleted) => println!("deleted {id}"),
                Ok(DeleteOutcome::Declined) => println!("kept {id}"),
                Err(err) => eprintln!("{}", err.user_message()),
            }
        }
        Command::History => {
            controller.toggle_history().await;
            let snapshot = controller.snapshot().await;
            if snapshot.history.is_empty() {
                println!("no completed todos");
            }
            for todo in &snapshot.history {
                let done = todo
                    .completed_at
                    .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                println!("{done:16}  {}", todo_line(todo));
            }
        }
        Command::Users => {
            let _ = controller.load_users().await;
            for option in controller.mention_options().await {
                println!("{:20} {}", option.value, option.label);
            }
        }
    }

    Ok(())
}

/// Pages through the list until `id` is cached by the controller.
async fn locate(controller: &ListController, id: &TodoId) -> bool {
    if controller.refresh_list().await.is_err() {
        return false;
    }
    loop {
        if controller.snapshot().await.todos.iter().any(|t| &t.id == id) {
            return true;
        }
        if !controller.next_page().await {
            return false;
        }
    }
}

fn ask_on_stdin(message: &str) -> bool {
    print!("{message} [y/N] ");
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn print_list(snapshot: &ControllerSnapshot) {
    if let Some(error) = &snapshot.error {
        eprintln!("{error}");
    }
    if snapshot.todos.is_empty() {
        println!("no todos");
    }
    for todo in &snapshot.todos {
        println!("{}", todo_line(todo));
    }
    let controls = &snapshot.page_controls;
    if controls.visible {
        println!(
            "page {} of {} ({} per page)",
            controls.current, snapshot.pagination.total_pages, snapshot.pagination.limit
        );
    }
}

fn todo_line(todo: &Todo) -> String {
    let mut line = format!(
        "[{}] {}  {:6}  {}",
        if todo.completed { "x" } else { " " },
        todo.id,
        todo.priority.as_str(),
        todo.title
    );
    for tag in &todo.tags {
        line.push_str(&format!(" #{tag}"));
    }
    for mention in &todo.mentions {
        line.push_str(&format!(" @{}", mention.username));
    }
    line
}
