mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use kanban_core::sync::{AddCardOptions, SyncDirection};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "kanban",
    about = "Markdown-backed kanban boards: edit cards, sync the board JSON, precompile snapshots",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from kanban.yaml or .git/)
    #[arg(long, global = true, env = "KANBAN_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a board with its columns
    Init {
        #[arg(long)]
        board: String,
        #[arg(long)]
        title: String,
        /// Comma-separated columns, each `id` or `id:Title`
        #[arg(long, default_value = "todo:To Do,doing:In Progress,done:Done")]
        columns: String,
        #[arg(long)]
        description: Option<String>,
    },

    /// Add a card to a column
    Add {
        #[arg(long)]
        board: String,
        #[arg(long)]
        column: String,
        #[arg(long)]
        title: String,
        /// Card id (default: derived from the title)
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Repeatable
        #[arg(long = "label")]
        labels: Vec<String>,
    },

    /// Move a card to another column
    Move {
        #[arg(long)]
        board: String,
        #[arg(long)]
        card: String,
        #[arg(long)]
        to: String,
    },

    /// Reconcile markdown cards and the board JSON
    Sync {
        #[arg(long)]
        board: String,
        /// json-to-md or md-to-json
        #[arg(long, default_value = "md-to-json")]
        direction: SyncDirection,
    },

    /// List boards, or the cards of one board
    List {
        #[arg(long)]
        board: Option<String>,
        #[arg(long, requires = "board")]
        column: Option<String>,
    },

    /// Show one card with its history
    Show {
        #[arg(long)]
        board: String,
        #[arg(long)]
        card: String,
    },

    /// Edit a card's title, description or labels
    Edit {
        #[arg(long)]
        board: String,
        #[arg(long)]
        card: String,
        #[arg(long)]
        title: Option<String>,
        /// Empty string clears the description
        #[arg(long)]
        description: Option<String>,
        /// Comma-separated; replaces the current labels
        #[arg(long)]
        labels: Option<String>,
    },

    /// Archive a card
    Archive {
        #[arg(long)]
        board: String,
        #[arg(long)]
        card: String,
        #[arg(long)]
        reason: Option<String>,
    },

    /// Validate every board and emit the snapshot
    Precompile {
        /// Treat per-file problems as errors (also `strict: true` in kanban.yaml)
        #[arg(long)]
        strict: bool,
        /// Validate and report without writing
        #[arg(long)]
        check: bool,
    },

    /// Search a board's precompiled snapshot
    Search {
        #[arg(long)]
        board: String,
        /// Matched against title and description; empty lists everything
        query: Vec<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());
    let json = cli.json;

    let result = match cli.command {
        Commands::Init {
            board,
            title,
            columns,
            description,
        } => cmd::board::init(&root, &board, &title, &columns, description, json),
        Commands::Add {
            board,
            column,
            title,
            id,
            description,
            labels,
        } => {
            let options = AddCardOptions {
                id,
                description,
                labels,
            };
            cmd::card::add(&root, &board, &column, &title, options, json)
        }
        Commands::Move { board, card, to } => cmd::card::move_card(&root, &board, &card, &to, json),
        Commands::Sync { board, direction } => cmd::board::sync(&root, &board, direction, json),
        Commands::List { board, column } => match board {
            Some(board) => cmd::board::list_cards(&root, &board, column.as_deref(), json),
            None => cmd::board::list_boards(&root, json),
        },
        Commands::Show { board, card } => cmd::card::show(&root, &board, &card, json),
        Commands::Edit {
            board,
            card,
            title,
            description,
            labels,
        } => cmd::card::edit(&root, &board, &card, title, description, labels, json),
        Commands::Archive {
            board,
            card,
            reason,
        } => cmd::card::archive(&root, &board, &card, reason, json),
        Commands::Precompile { strict, check } => cmd::precompile::run(&root, strict, check, json),
        Commands::Search { board, query } => cmd::search::run(&root, &board, &query.join(" "), json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
