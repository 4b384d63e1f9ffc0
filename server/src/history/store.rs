use std::fs;
use std::io;
use std::path::PathBuf;

use tracing::warn;

/// Durable per-room message log: one pretty-printed JSON array of formatted
/// lines per room, human-inspectable. Every save rewrites the room's file in
/// full; callers must not assume cheap amortized cost.
pub struct HistoryStore {
    dir: PathBuf,
}

impl HistoryStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn room_path(&self, room: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(room)))
    }

    /// Load the persisted history for a room, oldest line first. A missing
    /// file is the normal new-room case. An unreadable or unparsable file is
    /// logged and treated as empty; the in-memory history is authoritative
    /// from then on and the next save rewrites the file.
    pub fn load(&self, room: &str) -> Vec<String> {
        let path = self.room_path(room);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(room, path = %path.display(), error = %e, "failed to read history file");
                return Vec::new();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(lines) => lines,
            Err(e) => {
                warn!(room, path = %path.display(), error = %e, "history file is not a valid JSON array");
                Vec::new()
            }
        }
    }

    /// Persist the complete history for a room, replacing any prior state.
    /// Writes to a temp file and renames it into place so the previous
    /// snapshot survives a crash mid-write.
    pub fn save(&self, room: &str, history: &[String]) -> io::Result<()> {
        let path = self.room_path(room);
        let json = serde_json::to_string_pretty(history).map_err(io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)
    }
}

/// Map a room name to a filesystem-safe file stem. Keeps ASCII alphanumerics
/// plus '.', '_' and '-'; every other character becomes '_'. Distinct room
/// names can collide on disk; accepted at this scale.
fn file_stem(room: &str) -> String {
    room.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
