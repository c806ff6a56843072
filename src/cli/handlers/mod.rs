mod boxes;

use std::collections::HashSet;
use std::path::PathBuf;

use regex::Regex;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io;
use crate::io::lock::FileLock;
use crate::io::session_io::{self, SessionIoError};
use crate::model::config::Config;
use crate::model::item::ItemId;
use crate::model::registry::ContainerId;
use crate::model::session::Session;
use crate::ops::import::{ImportDecision, ImportOutcome};
use crate::ops::{check, placement, search};
use crate::parse::{serialize_boxes, serialize_session};

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Where a command runs: the working directory, its config and the
/// session file.
struct Workspace {
    config: Config,
    session_path: PathBuf,
    dir: PathBuf,
}

impl Workspace {
    fn load(&self) -> Result<Session, SessionIoError> {
        session_io::load_session(&self.session_path, &self.config)
    }

    fn save(&self, session: &Session) -> Result<(), SessionIoError> {
        session_io::save_session(&self.session_path, session)
    }

    /// Resolve a user-supplied path against the working directory
    fn resolve(&self, path: &str) -> PathBuf {
        self.dir.join(path)
    }

    /// Load, apply one change, save. The lock is held throughout.
    fn modify<T>(
        &self,
        change: impl FnOnce(&mut Session) -> Result<T, Box<dyn std::error::Error>>,
    ) -> Result<T, Box<dyn std::error::Error>> {
        let _lock = FileLock::acquire_default(&self.session_path)?;
        let mut session = self.load()?;
        let out = change(&mut session)?;
        self.save(&session)?;
        Ok(out)
    }
}

fn workspace(cli: &Cli) -> Result<Workspace, Box<dyn std::error::Error>> {
    let dir = match cli.dir {
        Some(ref dir) => std::fs::canonicalize(dir)
            .map_err(|e| format!("cannot resolve -C path '{}': {}", dir, e))?,
        None => std::env::current_dir()?,
    };
    let config = config_io::read_config(&dir)?;
    let session_path = dir.join(cli.session.as_deref().unwrap_or(&config.files.session));
    tracing::debug!(session = %session_path.display(), "workspace resolved");
    Ok(Workspace {
        config,
        session_path,
        dir,
    })
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let ws = workspace(&cli)?;
    let json = cli.json;

    match cli.command {
        // Read commands
        Commands::List => cmd_list(&ws, json),
        Commands::Show(args) => cmd_show(&ws, args, json),
        Commands::Search(args) => cmd_search(&ws, args, json),
        Commands::Check => cmd_check(&ws, json),
        Commands::Export(args) => cmd_export(&ws, args),

        // Write commands
        Commands::Import(args) => cmd_import(&ws, args, json),
        Commands::Put(args) => cmd_put(&ws, args, json),
        Commands::Return(args) => cmd_return(&ws, args, json),
        Commands::Box(args) => boxes::cmd_box(&ws, args, json),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Read command handlers
// ---------------------------------------------------------------------------

fn cmd_list(ws: &Workspace, json: bool) -> CmdResult {
    let session = ws.load()?;
    if json {
        return print_json(&list_to_json(&session));
    }
    for line in format_listing(&session) {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_show(ws: &Workspace, args: ShowArgs, json: bool) -> CmdResult {
    let session = ws.load()?;
    let item = session
        .item(&ItemId::from(args.id.as_str()))
        .ok_or_else(|| format!("item not found: {}", args.id))?;
    if json {
        return print_json(&item_to_json(&session, item));
    }
    for line in format_item_detail(&session, item) {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_search(ws: &Workspace, args: SearchArgs, json: bool) -> CmdResult {
    let session = ws.load()?;
    let re = Regex::new(&args.pattern)?;
    let hits = search::search_items(&session, &re);

    // One line per item, however many of its fields matched
    let mut seen = HashSet::new();
    let mut results: Vec<SearchHitJson> = Vec::new();
    for hit in &hits {
        if seen.insert(&hit.item_id) {
            if let Some(item) = session.item(&hit.item_id) {
                results.push(SearchHitJson {
                    item: item_to_json(&session, item),
                    fields: vec![hit.field],
                });
            }
        } else if let Some(last) = results.last_mut() {
            last.fields.push(hit.field);
        }
    }

    if json {
        return print_json(&results);
    }
    for result in &results {
        let location = result.item.container.as_deref().unwrap_or("backlog");
        println!(
            "[{}] {}  {}",
            location, result.item.id, result.item.displayed_text
        );
    }
    Ok(())
}

fn cmd_check(ws: &Workspace, json: bool) -> CmdResult {
    let session = ws.load()?;
    let result = check::check_session(&session);

    if json {
        return print_json(&result);
    }
    if !result.errors.is_empty() {
        println!("Errors:");
        for err in &result.errors {
            match err {
                check::CheckError::DuplicateRank { rank, item_ids } => {
                    println!("  rank {} is shared by: {}", rank, item_ids.join(", "));
                }
                check::CheckError::BacklogOutOfOrder {
                    item_id,
                    rank,
                    previous,
                } => {
                    println!(
                        "  {} (rank {}) follows rank {} in the backlog",
                        item_id, rank, previous
                    );
                }
                check::CheckError::UnplacedItem { item_id } => {
                    println!("  {} is neither in the backlog nor in a box", item_id);
                }
                check::CheckError::MultipleLocations { item_id, locations } => {
                    println!("  {} appears in: {}", item_id, locations.join(", "));
                }
                check::CheckError::MembershipMismatch {
                    item_id,
                    recorded,
                    found_in,
                } => {
                    println!(
                        "  {} records box {} but was found in {}",
                        item_id,
                        recorded.as_deref().unwrap_or("none"),
                        found_in.as_deref().unwrap_or("the backlog")
                    );
                }
                check::CheckError::DanglingReference { item_id, location } => {
                    println!("  {} lists unknown item {}", location, item_id);
                }
                check::CheckError::HeaderInBox { item_id, box_id } => {
                    println!("  category header {} is in box {}", item_id, box_id);
                }
                check::CheckError::UncategorizedItem { item_id } => {
                    println!("  {} is ranked before every category header", item_id);
                }
            }
        }
    }
    if result.valid {
        println!("✓ session is valid");
    } else {
        println!("✗ session has errors");
    }
    Ok(())
}

fn cmd_export(ws: &Workspace, args: ExportArgs) -> CmdResult {
    let default = match args.format {
        ExportFormat::Json => &ws.config.files.json_export,
        ExportFormat::Text => &ws.config.files.text_export,
    };
    let target = args.output.as_deref().unwrap_or(default);

    if target == "-" {
        let session = ws.load()?;
        match args.format {
            ExportFormat::Json => print!("{}", serialize_session(&session)?),
            ExportFormat::Text => print!("{}", serialize_boxes(&session)),
        }
        return Ok(());
    }

    // The target may be the session file itself
    let path = ws.resolve(target);
    {
        let _lock = FileLock::acquire_default(&ws.session_path)?;
        let session = ws.load()?;
        match args.format {
            ExportFormat::Json => session_io::save_session(&path, &session)?,
            ExportFormat::Text => session_io::write_text_export(&path, &session)?,
        }
    }
    println!("{}", path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Write command handlers
// ---------------------------------------------------------------------------

fn cmd_import(ws: &Workspace, args: ImportArgs, json: bool) -> CmdResult {
    let decision = if args.replace {
        Some(ImportDecision::Replace)
    } else if args.merge {
        Some(ImportDecision::Merge)
    } else {
        None
    };
    let source = ws.resolve(&args.file);

    let _lock = FileLock::acquire_default(&ws.session_path)?;
    let mut session = ws.load()?;
    let outcome = session_io::import_file(&mut session, &ws.session_path, &source, decision)?;

    if let ImportOutcome::Conflict(ref conflict) = outcome {
        if json {
            print_json(&import_to_json(&outcome))?;
        }
        let hint = if conflict.mergeable {
            "--replace or --merge"
        } else {
            "--replace"
        };
        return Err(format!("{}; rerun with {}", format_import_outcome(&outcome), hint).into());
    }

    if matches!(
        outcome,
        ImportOutcome::Loaded { .. } | ImportOutcome::Merged(_)
    ) {
        ws.save(&session)?;
    }

    if json {
        print_json(&import_to_json(&outcome))
    } else {
        println!("{}", format_import_outcome(&outcome));
        Ok(())
    }
}

fn cmd_put(ws: &Workspace, args: PutArgs, json: bool) -> CmdResult {
    let item = ItemId::from(args.item.as_str());
    let container = ContainerId::from(args.box_id.as_str());
    let placement = ws.modify(|session| Ok(placement::move_to_container(session, &item, &container)?))?;

    if json {
        print_json(&placement_to_json(&placement, Some(&container)))
    } else {
        println!("{} -> {}", item, container);
        Ok(())
    }
}

fn cmd_return(ws: &Workspace, args: ReturnArgs, json: bool) -> CmdResult {
    let item = ItemId::from(args.item.as_str());
    let placement = ws.modify(|session| Ok(placement::return_to_backlog(session, &item)?))?;

    if json {
        print_json(&placement_to_json(&placement, None))
    } else {
        println!("{} -> backlog", item);
        Ok(())
    }
}

fn placement_to_json(placement: &placement::Placement, to: Option<&ContainerId>) -> PlacementJson {
    PlacementJson {
        item: placement.item.to_string(),
        container: to.map(|c| c.to_string()),
        resized: placement.resized.iter().map(|c| c.to_string()).collect(),
    }
}
