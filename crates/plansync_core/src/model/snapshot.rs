//! Snapshot aggregate root.
//!
//! # Responsibility
//! - Hold every collection for one account plus profile and settings.
//! - Provide the deterministic seeded default used when nothing is cached.
//!
//! # Invariants
//! - Only `SnapshotStore` owns the canonical snapshot; everything else reads
//!   shared `Arc<Snapshot>` values or derived views.
//! - `Snapshot::seeded()` returns the same value on every call.

use crate::model::habit::{Habit, HabitCadence, HabitId, HabitLog};
use crate::model::item::{Bucket, Item, ItemId, RecurrenceGroupId};
use crate::model::journal::{ChatMessage, Goal, GoalId, LifeAreaScore, Reflection};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekStart {
    Monday,
    Sunday,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub display_name: String,
    pub timezone: String,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            display_name: String::new(),
            timezone: "UTC".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub week_starts_on: WeekStart,
    pub show_completed: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            week_starts_on: WeekStart::Monday,
            show_completed: true,
        }
    }
}

/// Complete in-memory state for one account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub profile: Profile,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub habits: Vec<Habit>,
    #[serde(default)]
    pub habit_logs: Vec<HabitLog>,
    #[serde(default)]
    pub goals: Vec<Goal>,
    #[serde(default)]
    pub reflections: Vec<Reflection>,
    #[serde(default)]
    pub life_area_scores: Vec<LifeAreaScore>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

const SEED_ITEM_IDS: [u128; 3] = [
    0x0000_0001_0000_4000_8000_0000_0000_0001,
    0x0000_0001_0000_4000_8000_0000_0000_0002,
    0x0000_0001_0000_4000_8000_0000_0000_0003,
];
const SEED_HABIT_IDS: [u128; 2] = [
    0x0000_0002_0000_4000_8000_0000_0000_0001,
    0x0000_0002_0000_4000_8000_0000_0000_0002,
];
const SEED_GOAL_ID: u128 = 0x0000_0003_0000_4000_8000_0000_0000_0001;

impl Snapshot {
    /// Returns the default snapshot with onboarding seed content.
    ///
    /// Seed ids are fixed so two fresh installs produce identical snapshots.
    pub fn seeded() -> Self {
        let goal = Goal::with_id(Uuid::from_u128(SEED_GOAL_ID), "Build a calmer week");

        let titles = [
            "Drag me to reorder",
            "Check me off to see me sink",
            "Schedule me on a day",
        ];
        let items = SEED_ITEM_IDS
            .iter()
            .zip(titles)
            .enumerate()
            .map(|(index, (id, title))| {
                let mut item = Item::with_id(Uuid::from_u128(*id), title);
                item.order_index = index as i64 + 1;
                if index == 0 {
                    item.goal_id = Some(goal.id);
                }
                item
            })
            .collect();

        let habits = [
            (SEED_HABIT_IDS[0], "Drink a glass of water", HabitCadence::Daily),
            (SEED_HABIT_IDS[1], "Read ten pages", HabitCadence::Weekdays),
        ]
        .into_iter()
        .enumerate()
        .map(|(index, (id, name, cadence))| {
            let mut habit = Habit::with_id(Uuid::from_u128(id), name, cadence);
            habit.order_index = index as i64 + 1;
            habit
        })
        .collect();

        Self {
            items,
            habits,
            goals: vec![goal],
            ..Self::default()
        }
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn habit(&self, id: HabitId) -> Option<&Habit> {
        self.habits.iter().find(|habit| habit.id == id)
    }

    pub fn goal(&self, id: GoalId) -> Option<&Goal> {
        self.goals.iter().find(|goal| goal.id == id)
    }

    /// Items in one bucket, in stored (not display) order.
    pub fn items_in(&self, bucket: Bucket) -> Vec<&Item> {
        self.items
            .iter()
            .filter(|item| item.bucket() == bucket)
            .collect()
    }

    pub fn series(&self, group_id: RecurrenceGroupId) -> Vec<&Item> {
        self.items
            .iter()
            .filter(|item| item.recurrence_group_id == Some(group_id))
            .collect()
    }

    pub fn habit_log(&self, habit_id: HabitId, date: NaiveDate) -> Option<&HabitLog> {
        self.habit_logs
            .iter()
            .find(|log| log.habit_id == habit_id && log.date == date)
    }

    /// Returns whether `habit_id` is checked off on `date`.
    pub fn habit_done_on(&self, habit_id: HabitId, date: NaiveDate) -> bool {
        self.habit_log(habit_id, date)
            .map(|log| log.completed)
            .unwrap_or(false)
    }
}
