use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    pub fn new(id: impl Into<String>) -> Self {
        EntryId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        UserId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An authenticated account as reported by the auth collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub display_name: Option<String>,
}

impl User {
    /// Name shown in the workspace greeting.
    pub fn greeting_name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.email)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Sad,
    Unhappy,
    #[default]
    Neutral,
    Happy,
    Excited,
}

impl Mood {
    pub const ALL: [Mood; 5] = [
        Mood::Sad,
        Mood::Unhappy,
        Mood::Neutral,
        Mood::Happy,
        Mood::Excited,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Mood::Sad => "sad",
            Mood::Unhappy => "unhappy",
            Mood::Neutral => "neutral",
            Mood::Happy => "happy",
            Mood::Excited => "excited",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Mood::Sad => "😢",
            Mood::Unhappy => "😞",
            Mood::Neutral => "😐",
            Mood::Happy => "🙂",
            Mood::Excited => "😄",
        }
    }

    /// Reads a stored mood; anything unrecognised is neutral.
    pub fn parse_lenient(raw: &str) -> Mood {
        Mood::ALL
            .into_iter()
            .find(|mood| mood.as_str() == raw)
            .unwrap_or_default()
    }

    pub fn next(self) -> Mood {
        let index = Mood::ALL.iter().position(|m| *m == self).unwrap_or(2);
        Mood::ALL[(index + 1) % Mood::ALL.len()]
    }

    pub fn previous(self) -> Mood {
        let index = Mood::ALL.iter().position(|m| *m == self).unwrap_or(2);
        Mood::ALL[(index + Mood::ALL.len() - 1) % Mood::ALL.len()]
    }
}

/// A journal record as delivered by a store snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: EntryId,
    pub owner_id: UserId,
    pub title: Option<String>,
    pub text: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub mood: Mood,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Server timestamp of the last write; `None` until the store confirms it.
    pub created_at: Option<DateTime<Utc>>,
}

impl JournalEntry {
    pub fn matches_search(&self, needle_lowercase: &str) -> bool {
        self.text.to_lowercase().contains(needle_lowercase)
            || self
                .title
                .as_ref()
                .is_some_and(|t| t.to_lowercase().contains(needle_lowercase))
    }
}

/// Everything a caller supplies on create or update; the store owns `id` and
/// the server timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryDraft {
    pub owner_id: UserId,
    pub title: Option<String>,
    pub text: String,
    pub date: DateTime<Utc>,
    pub mood: Mood,
    pub tags: Vec<String>,
}

impl EntryDraft {
    pub fn into_entry(self, id: EntryId, created_at: Option<DateTime<Utc>>) -> JournalEntry {
        JournalEntry {
            id,
            owner_id: self.owner_id,
            title: self.title,
            text: self.text,
            date: self.date,
            mood: self.mood,
            tags: self.tags,
            created_at,
        }
    }
}

pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// Trimmed title, with blank input stored as absent.
pub fn normalize_title(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_drop_blank_segments_and_keep_order() {
        assert_eq!(
            parse_tags("work, , family,  goals "),
            vec!["work", "family", "goals"]
        );
        assert!(parse_tags("").is_empty());
        assert_eq!(parse_tags("a,a"), vec!["a", "a"]);
    }

    #[test]
    fn blank_title_is_absent() {
        assert_eq!(normalize_title("   "), None);
        assert_eq!(normalize_title(" Monday "), Some("Monday".to_string()));
    }

    #[test]
    fn unknown_mood_reads_as_neutral() {
        assert_eq!(Mood::parse_lenient("happy"), Mood::Happy);
        assert_eq!(Mood::parse_lenient("ecstatic"), Mood::Neutral);
        assert_eq!(Mood::Excited.next(), Mood::Sad);
        assert_eq!(Mood::Sad.previous(), Mood::Excited);
    }

    #[test]
    fn mood_serializes_lowercase() {
        let json = serde_json::to_string(&Mood::Unhappy).unwrap();
        assert_eq!(json, "\"unhappy\"");
    }

    #[test]
    fn greeting_falls_back_to_email() {
        let mut user = User {
            id: UserId::new("u1"),
            email: "ana@example.com".to_string(),
            display_name: None,
        };
        assert_eq!(user.greeting_name(), "ana@example.com");
        user.display_name = Some("Ana".to_string());
        assert_eq!(user.greeting_name(), "Ana");
    }
}
