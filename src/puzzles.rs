//! Puzzle bank, read once at startup.

use std::path::Path;

use crate::types::Puzzle;

/// Ordered, index-addressable puzzle list. The index is a puzzle's id for
/// the lifetime of the process.
#[derive(Debug, Clone)]
pub struct PuzzleBank {
    puzzles: Vec<Puzzle>,
}

impl PuzzleBank {
    pub fn new(puzzles: Vec<Puzzle>) -> Self {
        if puzzles.is_empty() {
            return Self::fallback();
        }
        Self { puzzles }
    }

    /// Load puzzles from a JSON array of {title, surface, bottom}.
    /// Any failure falls back to the built-in puzzle.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Failed to read puzzles from {}: {}", path.display(), e);
                return Self::fallback();
            }
        };

        match serde_json::from_str::<Vec<Puzzle>>(&content) {
            Ok(puzzles) if !puzzles.is_empty() => {
                tracing::info!("Loaded {} puzzles from {}", puzzles.len(), path.display());
                Self { puzzles }
            }
            Ok(_) => {
                tracing::warn!("{} contains no puzzles", path.display());
                Self::fallback()
            }
            Err(e) => {
                tracing::warn!("Failed to parse puzzles from {}: {}", path.display(), e);
                Self::fallback()
            }
        }
    }

    /// Bank holding only the built-in default puzzle
    pub fn fallback() -> Self {
        Self {
            puzzles: vec![Puzzle {
                title: "The Mysterious Fruit".to_string(),
                surface: "Someone carrying a fruit walked past a bridge and dropped it \
                          into the river. Everyone nearby started screaming and ran away."
                    .to_string(),
                bottom: "It happened in a superstitious village whose people believed that \
                         disaster would strike if the sacred fruit ever touched river water."
                    .to_string(),
            }],
        }
    }

    pub fn get(&self, index: usize) -> Option<&Puzzle> {
        self.puzzles.get(index)
    }

    pub fn len(&self) -> usize {
        self.puzzles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.puzzles.is_empty()
    }

    /// (index, title) pairs for the puzzle picker
    pub fn titles(&self) -> Vec<(usize, String)> {
        self.puzzles
            .iter()
            .enumerate()
            .map(|(i, p)| (i, p.title.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"title":"A","surface":"sa","bottom":"ba"}},{{"title":"B","surface":"sb","bottom":"bb"}}]"#
        )
        .unwrap();

        let bank = PuzzleBank::load(file.path());
        assert_eq!(bank.len(), 2);
        assert_eq!(bank.get(1).unwrap().surface, "sb");
        assert_eq!(
            bank.titles(),
            vec![(0, "A".to_string()), (1, "B".to_string())]
        );
    }

    #[test]
    fn test_missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let bank = PuzzleBank::load(dir.path().join("nope.json"));
        assert_eq!(bank.len(), 1);
        assert_eq!(bank.get(0).unwrap().title, "The Mysterious Fruit");
    }

    #[test]
    fn test_garbage_and_empty_fall_back() {
        let mut garbage = tempfile::NamedTempFile::new().unwrap();
        write!(garbage, "not json").unwrap();
        assert_eq!(PuzzleBank::load(garbage.path()).len(), 1);

        let mut empty = tempfile::NamedTempFile::new().unwrap();
        write!(empty, "[]").unwrap();
        assert_eq!(PuzzleBank::load(empty.path()).len(), 1);
    }
}
