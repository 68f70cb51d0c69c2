//! CLI argument definitions for Capstan.

use crate::access::Role;
use clap::{Parser, Subcommand};

/// Capstan - a kanban board and ticket tracker for the command line.
///
/// Start with `cap system init`, then `cap project create` to get a board
/// with its default columns.
#[derive(Parser, Debug)]
#[command(name = "cap")]
#[command(author, version, about = "A kanban board and ticket tracker", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Run as if cap was started in <path> instead of the current directory.
    /// The path must exist. Bypasses git root detection - uses the path literally.
    /// Can also be set via CAPSTAN_REPO environment variable.
    #[arg(short = 'C', long = "repo", global = true, env = "CAPSTAN_REPO")]
    pub repo_path: Option<std::path::PathBuf>,

    /// Name of the acting user, recorded on created entities and in the log.
    /// Can also be set via CAPSTAN_ACTOR environment variable.
    #[arg(long = "actor", global = true, env = "CAPSTAN_ACTOR", default_value = "local")]
    pub actor: String,

    /// Role of the acting user, which decides what the command may do
    #[arg(long = "role", global = true, value_enum, default_value_t = Role::Admin)]
    pub role: Role,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Project management commands
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Show a project's board with its columns
    Board {
        /// Project ID (e.g., prj-a1b2)
        project: String,
    },

    /// Column management commands
    Column {
        #[command(subcommand)]
        command: ColumnCommands,
    },

    /// Task management commands
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },

    /// Ticket tracking commands
    Ticket {
        #[command(subcommand)]
        command: TicketCommands,
    },

    /// Feature management commands (planned work promoted from tickets)
    Feature {
        #[command(subcommand)]
        command: FeatureCommands,
    },

    /// Show the audit trail of commands
    Log {
        /// Only show the most recent N entries
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// System administration commands
    System {
        #[command(subcommand)]
        command: SystemCommands,
    },

    /// Show version and build information
    Version,
}

/// Project subcommands
#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// Create a new project (also creates its board with default columns)
    Create {
        /// Project name
        name: String,

        /// Short unique project code (e.g., CRM)
        #[arg(short, long)]
        code: String,

        /// Project description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// List projects
    List,

    /// Show project details
    Show {
        /// Project ID
        id: String,
    },

    /// Delete a project and everything under it (board, columns, tasks, tickets)
    Delete {
        /// Project ID
        id: String,
    },
}

/// Column subcommands
#[derive(Subcommand, Debug)]
pub enum ColumnCommands {
    /// Create a new column at the end of a project's board
    Create {
        /// Project ID
        project: String,

        /// Column name (unique within the board)
        name: String,
    },

    /// List a project's columns in board order
    List {
        /// Project ID
        project: String,
    },

    /// Rename a column
    Rename {
        /// Column ID
        id: String,

        /// New name
        name: String,
    },

    /// Mark a column active
    Activate {
        /// Column ID
        id: String,
    },

    /// Mark a column inactive (hidden from the board, tasks stay put)
    Deactivate {
        /// Column ID
        id: String,
    },

    /// Reorder a board's columns; unmentioned columns keep their relative
    /// order after the listed ones
    Reorder {
        /// Project ID
        project: String,

        /// Column IDs in the desired order
        ids: Vec<String>,
    },

    /// Delete a column (refuses when it still holds tasks unless --force)
    Delete {
        /// Column ID
        id: String,

        /// Delete the column together with all its tasks
        #[arg(long)]
        force: bool,
    },
}

/// Task subcommands
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a new task at the end of a column
    Create {
        /// Project ID
        project: String,

        /// Column ID
        column: String,

        /// Task title
        title: String,

        /// Task description
        #[arg(short, long)]
        description: Option<String>,

        /// Priority (low, medium, high, urgent)
        #[arg(short, long)]
        priority: Option<String>,

        /// Story points estimate
        #[arg(long)]
        points: Option<i64>,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
    },

    /// List tasks in a column or across a project's board
    List {
        /// Column ID
        #[arg(long)]
        column: Option<String>,

        /// Project ID (lists the whole board in column order)
        #[arg(long)]
        project: Option<String>,
    },

    /// Show task details
    Show {
        /// Task ID
        id: String,
    },

    /// Update a task's fields (position and column change via move/reorder)
    Update {
        /// Task ID
        id: String,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New description
        #[arg(long)]
        description: Option<String>,

        /// New reporter
        #[arg(long)]
        reporter: Option<String>,

        /// New priority (low, medium, high, urgent)
        #[arg(long)]
        priority: Option<String>,

        /// New story points estimate
        #[arg(long)]
        points: Option<i64>,

        /// New due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,

        /// Clear the due date
        #[arg(long, conflicts_with = "due")]
        clear_due: bool,

        /// New status (pending, in_progress, done)
        #[arg(long)]
        status: Option<String>,
    },

    /// Move a task to a column, optionally at a specific slot
    Move {
        /// Task ID
        id: String,

        /// Target column ID (may be the task's current column)
        column: String,

        /// Target slot, 1-based; clamped to the column's occupied range.
        /// Appends at the end when omitted.
        #[arg(short, long)]
        position: Option<i64>,
    },

    /// Reorder tasks within a column; unmentioned tasks keep their relative
    /// order after the listed ones
    Reorder {
        /// Column ID
        column: String,

        /// Task IDs in the desired order
        ids: Vec<String>,
    },

    /// Delete a task (soft by default; --force removes the row permanently)
    Delete {
        /// Task ID
        id: String,

        /// Permanently remove instead of soft-deleting
        #[arg(long)]
        force: bool,
    },

    /// Restore a soft-deleted task at the end of its column
    Restore {
        /// Task ID
        id: String,
    },
}

/// Ticket subcommands
#[derive(Subcommand, Debug)]
pub enum TicketCommands {
    /// Open a new ticket
    Create {
        /// Project ID
        project: String,

        /// Ticket title
        title: String,

        /// Ticket description
        #[arg(short, long)]
        description: Option<String>,

        /// Ticket type (feature, bug, support)
        #[arg(short = 't', long = "type")]
        ticket_type: Option<String>,

        /// Category label
        #[arg(short, long)]
        category: Option<String>,

        /// Affected system
        #[arg(long)]
        system: Option<String>,
    },

    /// List tickets
    List {
        /// Filter by project ID
        #[arg(long)]
        project: Option<String>,
    },

    /// Show ticket details
    Show {
        /// Ticket ID
        id: String,
    },

    /// Update a ticket's fields
    Update {
        /// Ticket ID
        id: String,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New description
        #[arg(long)]
        description: Option<String>,

        /// New category
        #[arg(long)]
        category: Option<String>,

        /// New ticket type (feature, bug, support)
        #[arg(long = "type")]
        ticket_type: Option<String>,

        /// New status (open, in_progress, approved, rejected, closed)
        #[arg(long)]
        status: Option<String>,
    },

    /// Assign a ticket to a user (or clear the assignment)
    Assign {
        /// Ticket ID
        id: String,

        /// Assignee name
        #[arg(long)]
        to: Option<String>,

        /// Clear the assignment
        #[arg(long, conflicts_with = "to")]
        clear: bool,
    },

    /// Approve a ticket
    Approve {
        /// Ticket ID
        id: String,
    },

    /// Promote a ticket into a feature (once per ticket)
    Promote {
        /// Ticket ID
        id: String,
    },

    /// Spawn a task from a ticket into a column
    SpawnTask {
        /// Ticket ID
        id: String,

        /// Target column ID
        column: String,

        /// Task title (defaults to the ticket's title)
        #[arg(long)]
        title: Option<String>,
    },

    /// Delete a ticket (soft by default; --force removes the row permanently)
    Delete {
        /// Ticket ID
        id: String,

        /// Permanently remove instead of soft-deleting
        #[arg(long)]
        force: bool,
    },

    /// Restore a soft-deleted ticket
    Restore {
        /// Ticket ID
        id: String,
    },
}

/// Feature subcommands
#[derive(Subcommand, Debug)]
pub enum FeatureCommands {
    /// List features
    List {
        /// Filter by project ID
        #[arg(long)]
        project: Option<String>,
    },

    /// Show feature details
    Show {
        /// Feature ID
        id: String,
    },

    /// Set a feature's status (planned, in_progress, completed)
    SetStatus {
        /// Feature ID
        id: String,

        /// New status
        status: String,
    },

    /// Spawn a task from a feature into a column
    SpawnTask {
        /// Feature ID
        id: String,

        /// Target column ID
        column: String,

        /// Task title (defaults to the feature's title)
        #[arg(long)]
        title: Option<String>,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,

        /// Configuration value
        value: String,
    },

    /// List all configuration values
    List,
}

/// System subcommands
#[derive(Subcommand, Debug)]
pub enum SystemCommands {
    /// Initialize capstan storage for this repository
    Init,
}
