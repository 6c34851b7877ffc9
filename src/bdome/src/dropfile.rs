//! Recorded daily drop files.
//!
//! A drop file holds one day of prizes for one challenger:
//!
//! ```text
//! $arena: Central Arena
//! $challenger: Flaming Meerca
//! $difficulty: Mighty
//! # anything after a hash is ignored
//! Har Codestone | 2
//! nothing | 1
//! ```
//!
//! Lines are tried against three recognisers in order: `$key: value`
//! metadata, `#` comments, then `name | quantity` items.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::arena::{Arena, ChallengerKey, DropMetadata, UnknownArena};
use crate::constants::BATTLEDOME_DROPS_PER_DAY;
use crate::drops::{Drops, DropsError, NormalisedDrops};

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}:{line}: invalid quantity \"{value}\" for \"{item}\"")]
    InvalidQuantity {
        path: PathBuf,
        line: usize,
        item: String,
        value: String,
    },

    #[error("{path}:{line}: unrecognised line \"{text}\"")]
    UnrecognisedLine {
        path: PathBuf,
        line: usize,
        text: String,
    },

    #[error("{path}:{line}: {source}")]
    Arena {
        path: PathBuf,
        line: usize,
        #[source]
        source: UnknownArena,
    },

    #[error("{path}: no $arena line")]
    MissingArena { path: PathBuf },

    #[error("{path}: {source}")]
    Drops {
        path: PathBuf,
        #[source]
        source: DropsError,
    },
}

/// One classified line of a drop file
#[derive(Debug, PartialEq)]
enum DropLine<'a> {
    Blank,
    Metadata { key: String, value: &'a str },
    Comment,
    Item { name: &'a str, quantity: &'a str },
    Unrecognised,
}

impl<'a> DropLine<'a> {
    fn classify(raw: &'a str) -> Self {
        let line = raw.trim();
        if line.is_empty() {
            return Self::Blank;
        }

        if line.starts_with('$') {
            if let Some((key, value)) = line.split_once(':') {
                return Self::Metadata {
                    key: key.trim().to_lowercase(),
                    value: value.trim(),
                };
            }
        }

        if line.starts_with('#') {
            return Self::Comment;
        }

        match line.split_once('|') {
            Some((name, quantity)) => Self::Item {
                name: name.trim(),
                quantity: quantity.trim(),
            },
            None => Self::Unrecognised,
        }
    }
}

/// Parse one drop file. The file's basename becomes the drops' source.
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Drops, ParseError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let source = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    parse_str(&content, &source, path)
}

/// Parse drop-file text. `path` is only used in error messages.
pub fn parse_str(content: &str, source: &str, path: &Path) -> Result<Drops, ParseError> {
    let mut arena: Option<Arena> = None;
    let mut challenger = String::new();
    let mut difficulty = String::new();
    let mut items: Vec<(String, u64)> = Vec::new();

    for (index, raw) in content.lines().enumerate() {
        let line_no = index + 1;
        match DropLine::classify(raw) {
            DropLine::Blank | DropLine::Comment => {}
            DropLine::Metadata { key, value } => match key.as_str() {
                "$arena" => {
                    let parsed = value.parse::<Arena>().map_err(|source| ParseError::Arena {
                        path: path.to_path_buf(),
                        line: line_no,
                        source,
                    })?;
                    arena = Some(parsed);
                }
                "$challenger" => challenger = value.to_string(),
                "$difficulty" => difficulty = value.to_string(),
                other => {
                    warn!(
                        "{}:{}: ignoring unknown metadata key {}",
                        path.display(),
                        line_no,
                        other
                    );
                }
            },
            DropLine::Item { name, quantity } => {
                let parsed: u64 = quantity.parse().map_err(|_| ParseError::InvalidQuantity {
                    path: path.to_path_buf(),
                    line: line_no,
                    item: name.to_string(),
                    value: quantity.to_string(),
                })?;
                items.push((name.to_string(), parsed));
            }
            DropLine::Unrecognised => {
                return Err(ParseError::UnrecognisedLine {
                    path: path.to_path_buf(),
                    line: line_no,
                    text: raw.trim().to_string(),
                });
            }
        }
    }

    let arena = arena.ok_or_else(|| ParseError::MissingArena {
        path: path.to_path_buf(),
    })?;

    let mut drops = Drops::new(DropMetadata::new(source, arena, challenger, difficulty));
    for (name, quantity) in items {
        drops.push(name, quantity);
    }

    let total = drops.total_quantity();
    if total != u64::from(BATTLEDOME_DROPS_PER_DAY) {
        warn!(
            "{} contains {} drops instead of {}",
            path.display(),
            total,
            BATTLEDOME_DROPS_PER_DAY
        );
    }

    Ok(drops)
}

/// Every recorded drop file in a directory, in file-name order
#[derive(Debug, Clone, Default)]
pub struct DropDataSet {
    files: Vec<Drops>,
}

impl DropDataSet {
    /// Parse every `.txt` file under `dir`. One bad file fails the load.
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self, ParseError> {
        let dir = dir.as_ref();
        let mut files = Vec::new();

        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|e| ParseError::Io {
                path: dir.to_path_buf(),
                source: e.into(),
            })?;
            let path = entry.path();
            let is_drop_file = entry.file_type().is_file()
                && path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("txt"));
            if !is_drop_file {
                continue;
            }

            debug!("Parsing drop file {}", path.display());
            files.push(parse_file(path)?);
        }

        Ok(Self { files })
    }

    pub fn from_drops(files: Vec<Drops>) -> Self {
        Self { files }
    }

    pub fn files(&self) -> &[Drops] {
        &self.files
    }

    /// The last `n` files by name among those `keep` accepts; all of them
    /// when `n` is 0
    pub fn latest<F>(&self, n: usize, mut keep: F) -> Vec<&Drops>
    where
        F: FnMut(&Drops) -> bool,
    {
        let kept: Vec<&Drops> = self.files.iter().filter(|drops| keep(*drops)).collect();
        let start = if n == 0 { 0 } else { kept.len().saturating_sub(n) };
        kept[start..].to_vec()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Arenas with at least one recorded file
    pub fn arenas(&self) -> BTreeSet<Arena> {
        self.files.iter().map(|d| d.metadata.arena).collect()
    }

    /// Union of every file recorded in `arena`; empty when none were
    pub fn by_arena(&self, arena: Arena) -> Result<NormalisedDrops, DropsError> {
        self.union_where(arena, |drops| drops.metadata.arena == arena)
    }

    /// Union of every file recorded against one challenger and difficulty
    pub fn by_key(&self, key: &ChallengerKey) -> Result<NormalisedDrops, DropsError> {
        self.union_where(key.arena, |drops| drops.metadata.key() == *key)
    }

    /// Union of files grouped by `(arena, challenger, difficulty)`
    pub fn grouped_by_key(&self) -> Result<BTreeMap<ChallengerKey, NormalisedDrops>, DropsError> {
        let mut groups: BTreeMap<ChallengerKey, NormalisedDrops> = BTreeMap::new();
        for drops in &self.files {
            let normalised = drops.normalise()?;
            let key = drops.metadata.key();
            let merged = match groups.get(&key) {
                Some(existing) => existing.union(&normalised)?,
                None => normalised,
            };
            groups.insert(key, merged);
        }
        Ok(groups)
    }

    fn union_where<F>(&self, arena: Arena, mut select: F) -> Result<NormalisedDrops, DropsError>
    where
        F: FnMut(&Drops) -> bool,
    {
        let mut combined = NormalisedDrops::empty(arena);
        for drops in self.files.iter().filter(|d| select(d)) {
            combined = combined.union(&drops.normalise()?)?;
        }
        Ok(combined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{MULTIPLE_CHALLENGERS, MULTIPLE_SOURCES};

    const DAY: &str = "\
$arena: Central Arena
$challenger: Flaming Meerca
$Difficulty : Mighty
# first day
Har Codestone | 2
Robot Muffin|1
nothing | 12
";

    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Run `f` and return whatever it logged
    fn logged<T>(f: impl FnOnce() -> T) -> (T, String) {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let value = tracing::subscriber::with_default(subscriber, f);
        let text = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        (value, text)
    }

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_classify_order() {
        assert_eq!(
            DropLine::classify("$arena: Frost Arena"),
            DropLine::Metadata {
                key: "$arena".into(),
                value: "Frost Arena"
            }
        );
        assert_eq!(DropLine::classify("# Har Codestone | 2"), DropLine::Comment);
        assert_eq!(
            DropLine::classify(" Bone Club | 3 "),
            DropLine::Item {
                name: "Bone Club",
                quantity: "3"
            }
        );
        assert_eq!(DropLine::classify("   "), DropLine::Blank);
        assert_eq!(DropLine::classify("Bone Club"), DropLine::Unrecognised);
    }

    #[test]
    fn test_parse_day() {
        let drops = parse_str(DAY, "2024_12_20.txt", Path::new("2024_12_20.txt")).unwrap();

        assert_eq!(drops.metadata.source, "2024_12_20.txt");
        assert_eq!(drops.metadata.arena, Arena::CentralArena);
        assert_eq!(drops.metadata.challenger, "Flaming Meerca");
        assert_eq!(drops.metadata.difficulty, "Mighty");
        assert_eq!(drops.items.len(), 3);
        assert_eq!(drops.total_quantity(), 15);
    }

    #[test]
    fn test_unknown_key_is_ignored() {
        let content = format!("$weather: sunny\n{}", DAY);
        let drops = parse_str(&content, "a.txt", Path::new("a.txt")).unwrap();
        assert_eq!(drops.items.len(), 3);
    }

    #[test]
    fn test_bad_quantity_fails_file() {
        let content = format!("{}Bone Club | many\n", DAY);
        let err = parse_str(&content, "a.txt", Path::new("a.txt")).unwrap_err();
        assert!(matches!(err, ParseError::InvalidQuantity { line: 8, .. }));
    }

    #[test]
    fn test_missing_arena() {
        let err = parse_str("Bone Club | 1\n", "a.txt", Path::new("a.txt")).unwrap_err();
        assert!(matches!(err, ParseError::MissingArena { .. }));
    }

    #[test]
    fn test_short_day_is_kept() {
        let content = "$arena: Ugga Dome\nBone Club | 3\n";
        let drops = parse_str(content, "a.txt", Path::new("a.txt")).unwrap();
        assert_eq!(drops.total_quantity(), 3);
    }

    #[test]
    fn test_short_day_warns_with_file_name() {
        let content = "$arena: Ugga Dome\nBone Club | 3\n";
        let path = Path::new("drops/2024_12_23.txt");
        let (drops, logs) = logged(|| parse_str(content, "2024_12_23.txt", path));
        assert!(drops.is_ok());
        assert!(logs.contains("WARN"), "{logs}");
        assert!(logs.contains("drops/2024_12_23.txt contains 3 drops instead of 15"), "{logs}");
    }

    #[test]
    fn test_full_day_does_not_warn() {
        let (drops, logs) = logged(|| parse_str(DAY, "a.txt", Path::new("a.txt")));
        assert_eq!(drops.unwrap().total_quantity(), 15);
        assert!(!logs.contains("WARN"), "{logs}");
    }

    #[test]
    fn test_latest_filters_before_counting() {
        let day = |source: &str, arena: Arena| {
            Drops::new(DropMetadata::new(source, arena, "Yeti", "Mighty"))
        };
        let set = DropDataSet::from_drops(vec![
            day("2024_12_20.txt", Arena::FrostArena),
            day("2024_12_21.txt", Arena::FrostArena),
            day("2024_12_22.txt", Arena::UggaDome),
            day("2024_12_23.txt", Arena::UggaDome),
        ]);

        let frost: Vec<&str> = set
            .latest(2, |d| d.metadata.arena == Arena::FrostArena)
            .iter()
            .map(|d| d.metadata.source.as_str())
            .collect();
        assert_eq!(frost, vec!["2024_12_20.txt", "2024_12_21.txt"]);
        assert_eq!(set.latest(3, |d| d.metadata.arena == Arena::UggaDome).len(), 2);
        assert!(set.latest(0, |d| d.metadata.arena == Arena::CosmicDome).is_empty());
    }

    #[test]
    fn test_load_dir_order_and_grouping() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "2024_12_21.txt", DAY);
        write(dir.path(), "2024_12_20.txt", DAY);
        write(
            dir.path(),
            "2024_12_22.txt",
            "$arena: Central Arena\n$challenger: Kastraliss\n$difficulty: Mighty\nHar Codestone | 1\nnothing | 14\n",
        );
        write(dir.path(), "notes.md", "not a drop file");

        let set = DropDataSet::load_dir(dir.path()).unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.files()[0].metadata.source, "2024_12_20.txt");
        assert_eq!(set.latest(1, |_| true)[0].metadata.source, "2024_12_22.txt");
        assert_eq!(set.latest(0, |_| true).len(), 3);

        let arena = set.by_arena(Arena::CentralArena).unwrap();
        assert_eq!(arena.quantity("Har Codestone"), 5);
        assert_eq!(arena.metadata().challenger, MULTIPLE_CHALLENGERS);
        assert_eq!(arena.metadata().source, MULTIPLE_SOURCES);

        let key = ChallengerKey::new(Arena::CentralArena, "Flaming Meerca", "Mighty");
        let meerca = set.by_key(&key).unwrap();
        assert_eq!(meerca.quantity("Har Codestone"), 4);
        assert_eq!(meerca.metadata().challenger, "Flaming Meerca");

        let groups = set.grouped_by_key().unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[&key].quantity("Robot Muffin"), 2);
    }

    #[test]
    fn test_by_arena_without_files() {
        let set = DropDataSet::default();
        let drops = set.by_arena(Arena::FrostArena).unwrap();
        assert!(drops.is_empty());
        assert_eq!(drops.arena(), Arena::FrostArena);
    }

    #[test]
    fn test_load_dir_reports_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "bad.txt", "$arena: Ugga Dome\nBone Club | x\n");
        let err = DropDataSet::load_dir(dir.path()).unwrap_err();
        assert!(err.to_string().contains("bad.txt"));
    }

    #[test]
    fn test_load_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(DropDataSet::load_dir(dir.path().join("nope")).is_err());
    }
}
