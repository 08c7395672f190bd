mod init;
pub use init::cmd_init;

use std::path::PathBuf;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io;
use crate::io::recovery;
use crate::io::store_dir::{self, OpenStore, StoreDirError};
use crate::model::quest::categories;
use crate::ops::quest_ops;

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Per-invocation state handed to every handler
pub struct Context {
    pub json: bool,
    /// The resolved `.questlog/` directory
    pub store_dir: PathBuf,
}

impl Context {
    /// Resolve the store from `-C` or by searching upward from the current
    /// directory.
    pub fn resolve(json: bool, store_dir: Option<&str>) -> Result<Self, StoreDirError> {
        let store_dir = match store_dir {
            Some(dir) => store_dir::resolve_store(&PathBuf::from(dir))?,
            None => store_dir::discover_store(&std::env::current_dir()?)?,
        };
        Ok(Context { json, store_dir })
    }

    fn open(&self) -> Result<OpenStore, StoreDirError> {
        store_dir::open_store(&self.store_dir)
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let Cli {
        command,
        json,
        store_dir,
    } = cli;

    // Init runs before there is a store to resolve
    let command = match command {
        Some(Commands::Init(args)) => return cmd_init(args, store_dir.as_deref()),
        other => other,
    };

    let ctx = Context::resolve(json, store_dir.as_deref())?;
    log::debug!("using store {}", ctx.store_dir.display());

    match command {
        // The bare command opens on the active page
        None => cmd_list(&ctx, ListArgs::default(), Page::Active),
        Some(cmd) => match cmd {
            Commands::Init(_) => Ok(()),
            Commands::Add(args) => cmd_add(&ctx, args),
            Commands::List(args) => cmd_list(&ctx, args, Page::Active),
            Commands::History(args) => cmd_list(&ctx, args, Page::History),
            Commands::Done(args) => cmd_done(&ctx, args),
            Commands::Show(args) => cmd_show(&ctx, args),
            Commands::Categories => cmd_categories(&ctx),
            Commands::Settings(args) => cmd_settings(&ctx, args),
            Commands::Recovery(args) => cmd_recovery(&ctx, args),
        },
    }
}

fn require_non_empty(what: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{} cannot be empty", what))
    } else {
        Ok(())
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Quest commands
// ---------------------------------------------------------------------------

fn cmd_add(ctx: &Context, args: AddArgs) -> CmdResult {
    require_non_empty("category", &args.category)
        .and_then(|_| require_non_empty("description", &args.description))
        .map_err(|e| format!("{}: {}", Page::Add.title(), e))?;

    let mut open = ctx.open()?;
    let added = open.quests.add_quest(&args.category, &args.description)?;

    if ctx.json {
        return print_json(&added);
    }
    println!("{}", added.quest.id);
    Ok(())
}

fn cmd_list(ctx: &Context, args: ListArgs, page: Page) -> CmdResult {
    let open = ctx.open()?;
    let mut map = match page {
        Page::History => open.quests.get_archived_quests_data()?,
        _ => open.quests.get_quests_data()?,
    };

    if let Some(ref name) = args.category {
        let filtered = quest_ops::filter_by_category(&map, name);
        if filtered.is_empty() {
            let known: Vec<_> = categories(&map).into_iter().map(|c| c.name).collect();
            return Err(
                format!("category not found: {} (known: {})", name, known.join(", ")).into(),
            );
        }
        map = filtered;
    }

    if ctx.json {
        return print_json(&map_to_json(&map));
    }
    for line in format_listing(page, &map, &open.config.ui) {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_done(ctx: &Context, args: DoneArgs) -> CmdResult {
    require_non_empty("quest id", &args.id)?;

    let mut open = ctx.open()?;
    let archived = open
        .quests
        .move_quest_to_archive(&args.id)?
        .ok_or_else(|| format!("quest not found: {}", args.id))?;

    if ctx.json {
        return print_json(&archived);
    }
    println!(
        "{}  ({})",
        format_quest_line(&archived.quest, true),
        archived.category_name
    );
    Ok(())
}

fn cmd_show(ctx: &Context, args: ShowArgs) -> CmdResult {
    let open = ctx.open()?;
    let found = open
        .quests
        .find_quest(&args.id)?
        .ok_or_else(|| format!("quest not found: {}", args.id))?;

    if ctx.json {
        return print_json(&located_to_json(&found));
    }
    for line in format_quest_detail(&found) {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_categories(ctx: &Context) -> CmdResult {
    let open = ctx.open()?;
    let active = open.quests.get_quests_data()?;
    let archive = open.quests.get_archived_quests_data()?;
    let rows = quest_ops::summarize_categories(&active, &archive);

    if ctx.json {
        return print_json(&rows);
    }
    if rows.is_empty() {
        println!("No categories.");
        return Ok(());
    }
    for row in &rows {
        println!("{}", format_category_summary(row));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

fn cmd_settings(ctx: &Context, args: SettingsCmd) -> CmdResult {
    match args.action {
        None => cmd_settings_show(ctx),
        Some(SettingsAction::Get(a)) => {
            let (config, _) = config_io::read_config(&ctx.store_dir)?;
            println!("{}", config_io::get_setting(&config, &a.key)?);
            Ok(())
        }
        Some(SettingsAction::Set(a)) => {
            let (_, mut doc) = config_io::read_config(&ctx.store_dir)?;
            config_io::set_setting(&mut doc, &a.key, &a.value)?;
            config_io::write_config(&ctx.store_dir, &doc)?;
            log::info!("setting {} changed to {}", a.key, a.value);
            println!("{} = {}", a.key, a.value);
            Ok(())
        }
    }
}

fn cmd_settings_show(ctx: &Context) -> CmdResult {
    let (config, _) = config_io::read_config(&ctx.store_dir)?;

    let mut values = Vec::new();
    for key in config_io::SETTING_KEYS {
        values.push((*key, config_io::get_setting(&config, key)?));
    }

    if ctx.json {
        let map: serde_json::Map<String, serde_json::Value> = values
            .into_iter()
            .map(|(k, v)| (k.to_string(), serde_json::Value::String(v)))
            .collect();
        return print_json(&map);
    }

    println!("# {}", Page::Settings.title());
    println!();
    println!("store: {}", ctx.store_dir.display());
    for (key, value) in &values {
        println!("{} = {}", key, value);
    }
    println!(
        "seed: {}",
        config
            .seed
            .iter()
            .map(|s| format!("{} ({})", s.name, s.id))
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Recovery log
// ---------------------------------------------------------------------------

fn cmd_recovery(ctx: &Context, args: RecoveryCmd) -> CmdResult {
    if let Some(RecoveryAction::Prune(prune)) = args.action {
        let removed = recovery::prune_recovery(&ctx.store_dir, None, prune.all)?;
        println!("Pruned {} recovery entries", removed);
        return Ok(());
    }

    let entries = recovery::read_recovery_entries(&ctx.store_dir, args.limit);
    if ctx.json {
        let items: Vec<_> = entries.iter().map(|e| e.to_json()).collect();
        return print_json(&items);
    }
    if entries.is_empty() {
        println!("Recovery log is empty.");
        return Ok(());
    }
    for entry in &entries {
        print!("{}", entry.to_markdown());
    }
    Ok(())
}
