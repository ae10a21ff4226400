//! Goals and append-only journal records.
//!
//! # Responsibility
//! - Define goals, reflections, life-area scores and chat messages.
//! - Keep reflection content explicit per reflection type.
//!
//! # Invariants
//! - Reflections, life-area scores and chat messages are never edited after
//!   they are written; they are only inserted or purged wholesale.
//! - `LifeAreaScore::score` is within `1..=10`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type GoalId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Active,
    Completed,
    Archived,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub id: GoalId,
    pub title: String,
    pub description: Option<String>,
    pub target_date: Option<NaiveDate>,
    pub status: GoalStatus,
    /// Percentage in `0..=100`.
    pub progress: u8,
}

impl Goal {
    pub fn new(title: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), title)
    }

    pub fn with_id(id: GoalId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: None,
            target_date: None,
            status: GoalStatus::Active,
            progress: 0,
        }
    }
}

/// Reflection body keyed by reflection type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum ReflectionContent {
    Daily {
        wins: String,
        challenges: String,
        gratitude: String,
    },
    Weekly {
        highlights: String,
        lessons: String,
        next_focus: String,
    },
    Monthly {
        summary: String,
        proudest_moment: String,
        next_month_intention: String,
    },
}

impl ReflectionContent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Daily { .. } => "daily",
            Self::Weekly { .. } => "weekly",
            Self::Monthly { .. } => "monthly",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reflection {
    pub id: Uuid,
    pub date: NaiveDate,
    #[serde(flatten)]
    pub content: ReflectionContent,
}

impl Reflection {
    pub fn new(date: NaiveDate, content: ReflectionContent) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            content,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifeArea {
    Health,
    Career,
    Relationships,
    Finances,
    Growth,
    Fun,
    Environment,
    Spirituality,
}

/// Score outside the accepted `1..=10` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreOutOfRange(pub u8);

impl Display for ScoreOutOfRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "life area score {} is outside 1..=10", self.0)
    }
}

impl Error for ScoreOutOfRange {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifeAreaScore {
    pub id: Uuid,
    pub date: NaiveDate,
    pub area: LifeArea,
    pub score: u8,
}

impl LifeAreaScore {
    pub fn new(date: NaiveDate, area: LifeArea, score: u8) -> Result<Self, ScoreOutOfRange> {
        if !(1..=10).contains(&score) {
            return Err(ScoreOutOfRange(score));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            date,
            area,
            score,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: ChatRole,
    pub content: String,
    pub created_at_ms: i64,
}
