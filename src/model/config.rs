use serde::{Deserialize, Serialize};

use super::registry::Position;

/// Configuration from boxsort.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub boxes: BoxesConfig,
    #[serde(default)]
    pub files: FilesConfig,
}

/// Defaults for newly created boxes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxesConfig {
    #[serde(default = "default_title")]
    pub default_title: String,
    /// Where the first box goes
    #[serde(default = "default_origin")]
    pub origin: Position,
    /// Offset of each new box from the previously created one
    #[serde(default = "default_step")]
    pub step: Position,
}

impl Default for BoxesConfig {
    fn default() -> Self {
        BoxesConfig {
            default_title: default_title(),
            origin: default_origin(),
            step: default_step(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilesConfig {
    /// Session file read and written by every command
    #[serde(default = "default_session_file")]
    pub session: String,
    /// Target of `bx export --format text`
    #[serde(default = "default_text_export")]
    pub text_export: String,
    /// Target of `bx export --format json`
    #[serde(default = "default_json_export")]
    pub json_export: String,
}

impl Default for FilesConfig {
    fn default() -> Self {
        FilesConfig {
            session: default_session_file(),
            text_export: default_text_export(),
            json_export: default_json_export(),
        }
    }
}

fn default_title() -> String {
    "Title".to_string()
}

fn default_origin() -> Position {
    Position { x: 40.0, y: 40.0 }
}

fn default_step() -> Position {
    Position { x: 24.0, y: 24.0 }
}

fn default_session_file() -> String {
    "boxsort.json".to_string()
}

fn default_text_export() -> String {
    "SortedItems.txt".to_string()
}

fn default_json_export() -> String {
    "SortedItems.json".to_string()
}
