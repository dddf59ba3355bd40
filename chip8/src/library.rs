use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// A catalog entry; `filename` is relative to the catalog file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Game {
    pub name: String,
    pub filename: String,
}

/// # Library
/// A JSON catalog of games, e.g.
/// ```json
/// [{ "name": "Pong", "filename": "PONG" }]
/// ```
pub struct Library {
    root: PathBuf,
    games: Vec<Game>,
}

impl Library {
    pub fn open(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("failed to read game library {}", path.display()))?;
        let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Library::parse(root, &json)
            .with_context(|| format!("failed to parse game library {}", path.display()))
    }

    fn parse(root: PathBuf, json: &str) -> Result<Self> {
        let games = serde_json::from_str(json)?;
        Ok(Library { root, games })
    }

    pub fn games(&self) -> &[Game] {
        &self.games
    }

    /// Looks a game up by name, ignoring case
    pub fn find(&self, name: &str) -> Option<&Game> {
        self.games
            .iter()
            .find(|game| game.name.eq_ignore_ascii_case(name))
    }

    pub fn rom_path(&self, game: &Game) -> PathBuf {
        self.root.join(&game.filename)
    }

    pub fn load(&self, game: &Game) -> Result<Vec<u8>> {
        let path = self.rom_path(game);
        fs::read(&path).with_context(|| format!("failed to read {} from {}", game.name, path.display()))
    }
}
