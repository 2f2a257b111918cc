use serde::{Deserialize, Serialize};

/// A monitored feed. The URL doubles as its key in the state file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedConfig {
    pub id: String,
    pub translation_enabled: bool,
}

impl FeedConfig {
    pub fn new(id: impl Into<String>, translation_enabled: bool) -> Self {
        Self {
            id: id.into(),
            translation_enabled,
        }
    }

    /// Parses one `URL[@T|@F]` entry. Translation defaults to on.
    pub fn parse(entry: &str) -> Option<Self> {
        let entry = entry.trim();
        let (url, flag) = match entry.rsplit_once('@') {
            Some((url, flag)) if is_flag(flag) => (url.trim(), Some(flag.trim())),
            _ => (entry, None),
        };
        if url.is_empty() {
            return None;
        }
        let translation_enabled = !matches!(flag, Some(f) if f.eq_ignore_ascii_case("f"));
        Some(Self::new(url, translation_enabled))
    }

    /// Shortened id for log lines.
    pub fn short_id(&self) -> &str {
        match self.id.char_indices().nth(40) {
            Some((idx, _)) => &self.id[..idx],
            None => &self.id,
        }
    }
}

fn is_flag(flag: &str) -> bool {
    let flag = flag.trim();
    flag.eq_ignore_ascii_case("t") || flag.eq_ignore_ascii_case("f")
}
