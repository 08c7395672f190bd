use std::path::PathBuf;

use crate::cli::commands::InitArgs;
use crate::io::store_dir;

/// Create a store in `-C <dir>` or the current directory.
pub fn cmd_init(args: InitArgs, root: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let root = match root {
        Some(dir) => PathBuf::from(dir),
        None => std::env::current_dir()?,
    };

    if !args.force
        && let Some(parent) = root.parent()
        && let Ok(existing) = store_dir::discover_store(parent)
    {
        eprintln!("Note: a parent store exists at {}/", existing.display());
        eprintln!("Creating a new store in {}/", root.join(store_dir::STORE_DIR_NAME).display());
    }

    let dir = store_dir::init_store(&root, args.force)?;
    println!("Initialized questlog store at {}", dir.display());
    Ok(())
}
