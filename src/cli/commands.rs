use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::model::registry::Position;

#[derive(Parser)]
#[command(name = "bx", about = concat!("[#] boxsort v", env!("CARGO_PKG_VERSION"), " - sort cards into boxes"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a different working directory
    #[arg(short = 'C', long = "dir", global = true)]
    pub dir: Option<String>,

    /// Session file (default from boxsort.toml, else boxsort.json)
    #[arg(short, long, global = true)]
    pub session: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load a delimited-text or JSON file into the session
    Import(ImportArgs),
    /// Show the backlog by category, then every box
    List,
    /// Show item details
    Show(ShowArgs),
    /// Box management
    Box(BoxCmd),
    /// Put an item into a box
    Put(PutArgs),
    /// Take an item out of its box, back into the backlog
    Return(ReturnArgs),
    /// Write the session as JSON or the boxes as delimited text
    Export(ExportArgs),
    /// Search items by regex
    Search(SearchArgs),
    /// Validate session integrity
    Check,
}

#[derive(Args)]
pub struct ImportArgs {
    /// File to import
    pub file: String,
    /// Discard the current session
    #[arg(long, conflicts_with = "merge")]
    pub replace: bool,
    /// Append the file's items to the current single-category backlog
    #[arg(long)]
    pub merge: bool,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Item ID
    pub id: String,
}

// ---------------------------------------------------------------------------
// Boxes
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct BoxCmd {
    #[command(subcommand)]
    pub action: BoxAction,
}

#[derive(Subcommand)]
pub enum BoxAction {
    /// Create an empty box
    New(BoxNewArgs),
    /// Change a box title (may be empty)
    Rename(BoxRenameArgs),
    /// Set a box position
    Move(BoxMoveArgs),
    /// List boxes
    List,
}

#[derive(Args)]
pub struct BoxNewArgs {
    /// Box title (default from boxsort.toml)
    #[arg(long)]
    pub title: Option<String>,
    /// Position as X,Y (default: next to the last box)
    #[arg(long, value_parser = parse_position, allow_hyphen_values = true)]
    pub at: Option<Position>,
}

#[derive(Args)]
pub struct BoxRenameArgs {
    /// Box ID
    pub id: String,
    /// New title
    pub title: String,
}

#[derive(Args)]
pub struct BoxMoveArgs {
    /// Box ID
    pub id: String,
    #[arg(allow_negative_numbers = true)]
    pub x: f64,
    #[arg(allow_negative_numbers = true)]
    pub y: f64,
}

// ---------------------------------------------------------------------------
// Placement
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct PutArgs {
    /// Item ID
    pub item: String,
    /// Box ID
    pub box_id: String,
}

#[derive(Args)]
pub struct ReturnArgs {
    /// Item ID
    pub item: String,
}

// ---------------------------------------------------------------------------
// Export / search
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Json,
    Text,
}

#[derive(Args)]
pub struct ExportArgs {
    /// Output format
    #[arg(long, value_enum, default_value_t = ExportFormat::Text)]
    pub format: ExportFormat,
    /// Output path, or - for stdout (default from boxsort.toml)
    #[arg(short, long)]
    pub output: Option<String>,
}

#[derive(Args)]
pub struct SearchArgs {
    /// Regex pattern to search for
    pub pattern: String,
}

/// Parse `X,Y` into a position
pub fn parse_position(s: &str) -> Result<Position, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got '{}'", s))?;
    let coord = |v: &str| {
        v.trim()
            .parse::<f64>()
            .map_err(|_| format!("invalid coordinate '{}'", v.trim()))
    };
    Ok(Position {
        x: coord(x)?,
        y: coord(y)?,
    })
}
