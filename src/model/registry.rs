use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::config::BoxesConfig;
use super::item::{ItemId, format_id, max_id_number};

/// Prefix for generated container ids (`B-001`, ...)
pub const CONTAINER_ID_PREFIX: &str = "B";

/// Opaque container identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(pub String);

impl ContainerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContainerId {
    fn from(s: &str) -> Self {
        ContainerId(s.to_string())
    }
}

/// 2-D placement of a box. Owned by whatever draws the boxes; this crate
/// only stores and persists it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn offset(self, by: Position) -> Position {
        Position {
            x: self.x + by.x,
            y: self.y + by.y,
        }
    }
}

/// A user-created box
#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    pub id: ContainerId,
    pub title: String,
    pub position: Position,
    /// Members in drop order. Only the placement engine mutates this.
    pub(crate) members: Vec<ItemId>,
}

impl Container {
    pub fn members(&self) -> &[ItemId] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Error type for registry operations
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("box not found: {0}")]
    NotFound(ContainerId),
    #[error("duplicate box id: {0}")]
    DuplicateId(ContainerId),
}

/// All boxes of a session, in creation order
#[derive(Debug, Clone, Default)]
pub struct Registry {
    containers: IndexMap<ContainerId, Container>,
    defaults: BoxesConfig,
    last_id: usize,
}

impl Registry {
    pub fn new(defaults: BoxesConfig) -> Self {
        Registry {
            containers: IndexMap::new(),
            defaults,
            last_id: 0,
        }
    }

    /// Create an empty box. Without a position it is placed one step away
    /// from the most recently created box.
    pub fn create(&mut self, title: Option<String>, position: Option<Position>) -> &Container {
        let position = position.unwrap_or_else(|| self.next_position());
        self.last_id += 1;
        let id = ContainerId(format_id(CONTAINER_ID_PREFIX, self.last_id));
        let container = Container {
            id: id.clone(),
            title: title.unwrap_or_else(|| self.defaults.default_title.clone()),
            position,
            members: Vec::new(),
        };
        let (idx, _) = self.containers.insert_full(id, container);
        &self.containers[idx]
    }

    /// Insert a box with a preserved id (structured import).
    pub fn restore(&mut self, container: Container) -> Result<(), RegistryError> {
        if self.containers.contains_key(&container.id) {
            return Err(RegistryError::DuplicateId(container.id));
        }
        let prefix_dash = format!("{}-", CONTAINER_ID_PREFIX);
        self.last_id = self
            .last_id
            .max(max_id_number(std::iter::once(container.id.as_str()), &prefix_dash));
        self.containers.insert(container.id.clone(), container);
        Ok(())
    }

    pub fn rename(&mut self, id: &ContainerId, title: impl Into<String>) -> Result<(), RegistryError> {
        let container = self
            .containers
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))?;
        container.title = title.into();
        Ok(())
    }

    pub fn reposition(&mut self, id: &ContainerId, position: Position) -> Result<(), RegistryError> {
        let container = self
            .containers
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))?;
        container.position = position;
        Ok(())
    }

    pub fn get(&self, id: &ContainerId) -> Option<&Container> {
        self.containers.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &ContainerId) -> Option<&mut Container> {
        self.containers.get_mut(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Container> {
        self.containers.values()
    }

    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    pub fn defaults(&self) -> &BoxesConfig {
        &self.defaults
    }

    fn next_position(&self) -> Position {
        match self.containers.last() {
            Some((_, last)) => last.position.offset(self.defaults.step),
            None => self.defaults.origin,
        }
    }
}
