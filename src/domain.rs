//! Domain models shared across the client core: catalog items, seniority
//! levels, difficulty ratings, and the signed-in identity.

use serde::{Deserialize, Serialize};

/// Seniority band a catalog item targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Junior,
    Mid,
    Senior,
}

impl Level {
    pub const ALL: [Level; 3] = [Level::Junior, Level::Mid, Level::Senior];

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Junior => "junior",
            Level::Mid => "mid",
            Level::Senior => "senior",
        }
    }
}

/// Difficulty rating as served by the backend ("Easy" / "Medium" / "Hard").
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// A coding question from the catalog.
///
/// The plain catalog fields are owned by the content team and immutable from
/// this side. The tail of the struct is the per-user overlay the backend
/// attaches once the viewer has attempted the item; `correct_answer` and the
/// grading fields are absent until then, and we never derive them locally.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Question {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub language: String,
    pub difficulty: Difficulty,
    pub level: Level,
    /// Estimated duration in minutes.
    pub duration: u32,
    #[serde(default)]
    pub source: Option<String>,
    pub is_premium: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,

    /// Multiple-choice options; not every question has them yet.
    #[serde(default)]
    pub options: Option<Vec<String>>,
    /// Revealed by the backend only once the viewer may see the answer.
    #[serde(default)]
    pub correct_answer: Option<usize>,
    #[serde(default)]
    pub explanation: Option<String>,

    // Per-user overlay.
    #[serde(default)]
    pub attempted: bool,
    #[serde(rename = "isCorrect", default)]
    pub is_correct: Option<bool>,
    #[serde(rename = "showAnswer", default)]
    pub show_answer: bool,
    #[serde(rename = "userSelectedAnswer", default)]
    pub user_selected_answer: Option<usize>,
    #[serde(rename = "userIsCorrect", default)]
    pub user_is_correct: Option<bool>,
}

/// A multiple-choice practice challenge. Same catalog shape as [`Question`]
/// plus the embedded question text and a mandatory option list.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Practice {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub language: String,
    pub difficulty: Difficulty,
    pub level: Level,
    pub duration: u32,
    pub is_premium: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,

    pub question_text: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub correct_answer: Option<usize>,
    #[serde(default)]
    pub explanation: Option<String>,

    // Per-user overlay.
    #[serde(default)]
    pub attempted: bool,
    #[serde(rename = "isCorrect", default)]
    pub is_correct: Option<bool>,
    #[serde(rename = "showAnswer", default)]
    pub show_answer: bool,
    #[serde(rename = "userSelectedAnswer", default)]
    pub user_selected_answer: Option<usize>,
    #[serde(rename = "userIsCorrect", default)]
    pub user_is_correct: Option<bool>,
}

/// Catalog items the filter sidebar can narrow down.
pub trait Filterable {
    fn title(&self) -> &str;
    fn description(&self) -> &str;
    fn language(&self) -> &str;
    fn level(&self) -> Level;
}

impl Filterable for Question {
    fn title(&self) -> &str {
        &self.title
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn language(&self) -> &str {
        &self.language
    }

    fn level(&self) -> Level {
        self.level
    }
}

impl Filterable for Practice {
    fn title(&self) -> &str {
        &self.title
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn language(&self) -> &str {
        &self.language
    }

    fn level(&self) -> Level {
        self.level
    }
}

/// The signed-in user as the rest of the client sees it. Owned by the
/// identity provider; read-only here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub email: Option<String>,
    pub name: String,
}

impl Identity {
    /// Display name falls back to the email local part, then "User".
    pub fn new(uid: impl Into<String>, email: Option<String>, display_name: Option<String>) -> Self {
        let name = display_name
            .filter(|n| !n.is_empty())
            .or_else(|| {
                email
                    .as_deref()
                    .and_then(|e| e.split('@').next())
                    .filter(|s| !s.is_empty())
                    .map(|s| s.to_string())
            })
            .unwrap_or_else(|| "User".to_string());
        Self {
            uid: uid.into(),
            email,
            name,
        }
    }
}
