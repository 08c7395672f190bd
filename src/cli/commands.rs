use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "ql", about = concat!("questlog v", env!("CARGO_PKG_VERSION"), " - quests by category, with an archive"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Use the store in this directory instead of searching upward
    #[arg(short = 'C', long = "store-dir", global = true)]
    pub store_dir: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a .questlog store in the current directory
    Init(InitArgs),
    /// Add a quest to a category (created if new)
    Add(AddArgs),
    /// List active quests by category
    List(ListArgs),
    /// List archived (completed) quests by category
    History(ListArgs),
    /// Complete a quest and move it to the archive
    Done(DoneArgs),
    /// Show one quest, active or archived
    Show(ShowArgs),
    /// List categories with quest counts
    Categories,
    /// View or change settings
    Settings(SettingsCmd),
    /// View or manage the recovery log
    Recovery(RecoveryCmd),
}

#[derive(Args)]
pub struct InitArgs {
    /// Rewrite the config of an existing store (quest data is kept)
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct AddArgs {
    /// Category name, e.g. "Home Quests"
    pub category: String,
    /// What needs doing
    pub description: String,
}

#[derive(Args, Default)]
pub struct ListArgs {
    /// Only show the category with this name
    #[arg(long)]
    pub category: Option<String>,
}

#[derive(Args)]
pub struct DoneArgs {
    /// Quest ID
    pub id: String,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Quest ID
    pub id: String,
}

#[derive(Args)]
pub struct SettingsCmd {
    #[command(subcommand)]
    pub action: Option<SettingsAction>,
}

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Print one setting
    Get(SettingsGetArgs),
    /// Change one setting
    Set(SettingsSetArgs),
}

#[derive(Args)]
pub struct SettingsGetArgs {
    /// Setting key, e.g. ui.show_ids
    pub key: String,
}

#[derive(Args)]
pub struct SettingsSetArgs {
    /// Setting key, e.g. ui.show_ids
    pub key: String,
    /// New value
    pub value: String,
}

#[derive(Args)]
pub struct RecoveryCmd {
    #[command(subcommand)]
    pub action: Option<RecoveryAction>,
    /// Show at most this many entries (most recent first)
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Subcommand)]
pub enum RecoveryAction {
    /// Remove old entries from the recovery log
    Prune(RecoveryPruneArgs),
}

#[derive(Args)]
pub struct RecoveryPruneArgs {
    /// Remove every entry, not just those older than 30 days
    #[arg(long)]
    pub all: bool,
}
