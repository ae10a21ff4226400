//! Planner use-case service.
//!
//! # Responsibility
//! - Provide the entry points views call to change items, habits, goals and
//!   journal entries.
//! - Combine model validation, recurrence expansion and bucket ordering into
//!   single store mutations.
//!
//! # Invariants
//! - Validation runs before `mutate`; a rejected call leaves the snapshot
//!   untouched and queues no sync work.
//! - Every call that moves or toggles an item renumbers the affected
//!   bucket(s) so pending entries stay above completed ones.
//! - Deletion goes through the store's undo buffer.

use crate::model::habit::{Habit, HabitCadence, HabitId, HabitLog};
use crate::model::item::{
    Bucket, Item, ItemId, ItemStatus, ItemValidationError, Priority, RecurrenceGroupId,
};
use crate::model::journal::{
    ChatMessage, ChatRole, Goal, GoalId, GoalStatus, LifeArea, LifeAreaScore, Reflection,
    ReflectionContent, ScoreOutOfRange,
};
use crate::model::snapshot::{Profile, Settings, Snapshot};
use crate::schedule::order::{
    insert_into_bucket, remove_from_bucket, reorder, sort_for_display, toggle_completion,
    HabitLine, Reassignment,
};
use crate::schedule::recurrence::{parse_cadence, parse_start_date, plan_series, RecurrenceError};
use crate::store::undo::{DeletionId, UndoError};
use crate::store::SnapshotStore;
use crate::sync::remote::RemoteTable;
use chrono::{Local, NaiveDate};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use uuid::Uuid;

pub type PlannerResult<T> = Result<T, PlannerError>;

/// Service-level errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannerError {
    NotFound { kind: &'static str, id: Uuid },
    Validation(ItemValidationError),
    Recurrence(RecurrenceError),
    Score(ScoreOutOfRange),
    Undo(UndoError),
    /// Name or title is empty after trimming.
    BlankName(&'static str),
    /// Goal progress above 100.
    InvalidProgress(u8),
}

impl Display for PlannerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Recurrence(err) => write!(f, "{err}"),
            Self::Score(err) => write!(f, "{err}"),
            Self::Undo(err) => write!(f, "{err}"),
            Self::BlankName(kind) => write!(f, "{kind} name must not be blank"),
            Self::InvalidProgress(value) => {
                write!(f, "goal progress {value} is outside 0..=100")
            }
        }
    }
}

impl Error for PlannerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Recurrence(err) => Some(err),
            Self::Score(err) => Some(err),
            Self::Undo(err) => Some(err),
            Self::NotFound { .. } | Self::BlankName(_) | Self::InvalidProgress(_) => None,
        }
    }
}

impl From<ItemValidationError> for PlannerError {
    fn from(value: ItemValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RecurrenceError> for PlannerError {
    fn from(value: RecurrenceError) -> Self {
        Self::Recurrence(value)
    }
}

impl From<ScoreOutOfRange> for PlannerError {
    fn from(value: ScoreOutOfRange) -> Self {
        Self::Score(value)
    }
}

impl From<UndoError> for PlannerError {
    fn from(value: UndoError) -> Self {
        Self::Undo(value)
    }
}

/// Input for new items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDraft {
    pub title: String,
    pub notes: Option<String>,
    pub priority: Priority,
    pub scheduled_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub goal_id: Option<GoalId>,
}

impl ItemDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            notes: None,
            priority: Priority::Medium,
            scheduled_date: None,
            due_date: None,
            goal_id: None,
        }
    }

    pub fn scheduled_on(mut self, date: NaiveDate) -> Self {
        self.scheduled_date = Some(date);
        self
    }

    pub fn due_on(mut self, date: NaiveDate) -> Self {
        self.due_date = Some(date);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn for_goal(mut self, goal_id: GoalId) -> Self {
        self.goal_id = Some(goal_id);
        self
    }

    fn to_item(&self, scheduled_date: Option<NaiveDate>) -> Item {
        let mut item = Item::new(self.title.trim());
        item.notes = self.notes.clone();
        item.priority = self.priority;
        item.scheduled_date = scheduled_date;
        item.due_date = self.due_date;
        item.goal_id = self.goal_id;
        item
    }
}

/// Partial update for item fields that do not change its bucket.
///
/// `None` leaves a field unchanged; `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPatch {
    pub title: Option<String>,
    pub notes: Option<Option<String>>,
    pub priority: Option<Priority>,
    pub due_date: Option<Option<NaiveDate>>,
    pub goal_id: Option<Option<GoalId>>,
}

/// Items of one bucket in display order.
fn bucket_view(snapshot: &Snapshot, bucket: Bucket) -> Vec<&Item> {
    let mut items = snapshot.items_in(bucket);
    sort_for_display(&mut items);
    items
}

/// Every active habit with its completion state on `date`, in display order.
fn habit_board(snapshot: &Snapshot, date: NaiveDate) -> Vec<HabitLine> {
    let mut lines: Vec<HabitLine> = snapshot
        .habits
        .iter()
        .filter(|habit| habit.active)
        .map(|habit| HabitLine {
            habit_id: habit.id,
            name: habit.name.clone(),
            order_index: habit.order_index,
            done: snapshot.habit_done_on(habit.id, date),
        })
        .collect();
    sort_for_display(&mut lines);
    lines
}

fn normalize_name(kind: &'static str, value: &str) -> PlannerResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PlannerError::BlankName(kind));
    }
    Ok(trimmed.to_string())
}

/// Use-case facade over a [`SnapshotStore`].
pub struct PlannerService {
    store: SnapshotStore,
}

impl PlannerService {
    pub fn new(store: SnapshotStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut SnapshotStore {
        &mut self.store
    }

    pub fn into_store(self) -> SnapshotStore {
        self.store
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.store.snapshot()
    }

    fn find_item(&self, id: ItemId) -> PlannerResult<Item> {
        self.store
            .snapshot()
            .item(id)
            .cloned()
            .ok_or(PlannerError::NotFound { kind: "item", id })
    }

    fn ensure_goal(&self, goal_id: Option<GoalId>) -> PlannerResult<()> {
        match goal_id {
            Some(id) if self.store.snapshot().goal(id).is_none() => {
                Err(PlannerError::NotFound { kind: "goal", id })
            }
            _ => Ok(()),
        }
    }

    fn ensure_habit(&self, id: HabitId) -> PlannerResult<()> {
        if self.store.snapshot().habit(id).is_none() {
            return Err(PlannerError::NotFound { kind: "habit", id });
        }
        Ok(())
    }

    // Items

    /// Creates one item at the end of its bucket's pending partition.
    pub fn create_item(&mut self, draft: ItemDraft) -> PlannerResult<ItemId> {
        let item = draft.to_item(draft.scheduled_date);
        item.validate()?;
        item.validate_due_date()?;
        self.ensure_goal(item.goal_id)?;

        let id = item.id;
        let bucket = item.bucket();
        self.store.mutate(|snapshot| {
            let mut next = snapshot.clone();
            let placement = insert_into_bucket(&bucket_view(snapshot, bucket), id, false, None);
            next.items.push(item);
            placement.apply(&mut next.items);
            next
        });
        info!("event=item_create module=service status=ok item_id={id} bucket={bucket}");
        Ok(id)
    }

    /// Materializes a recurring series from `start` and `cadence`.
    ///
    /// Input is parsed and every generated item validated before the store is
    /// touched. A due date on the draft is kept at the same distance from
    /// each occurrence. `cadence = "none"` creates a single ungrouped item.
    pub fn create_recurring_item(
        &mut self,
        draft: ItemDraft,
        start: &str,
        cadence: &str,
    ) -> PlannerResult<Vec<ItemId>> {
        let start = parse_start_date(start)?;
        let cadence = parse_cadence(cadence)?;
        self.ensure_goal(draft.goal_id)?;

        let plan = plan_series(start, cadence);
        let due_offset = draft.due_date.map(|due| due - start);
        let mut items = Vec::with_capacity(plan.dates.len());
        for date in &plan.dates {
            let mut item = draft.to_item(Some(*date));
            item.due_date = due_offset.and_then(|offset| date.checked_add_signed(offset));
            if let Some(group_id) = plan.group_id {
                item.recurrence_group_id = Some(group_id);
                item.recurrence_cadence = Some(plan.cadence);
                item.recurrence_start_date = Some(plan.start);
            }
            item.validate()?;
            item.validate_due_date()?;
            items.push(item);
        }

        let ids: Vec<ItemId> = items.iter().map(|item| item.id).collect();
        self.store.mutate(|snapshot| {
            let mut next = snapshot.clone();
            for item in items {
                let placement =
                    insert_into_bucket(&bucket_view(&next, item.bucket()), item.id, false, None);
                next.items.push(item);
                placement.apply(&mut next.items);
            }
            next
        });
        info!(
            "event=series_create module=service status=ok cadence={} start={start} items={}",
            cadence.as_str(),
            ids.len()
        );
        Ok(ids)
    }

    /// Applies a patch that keeps the item in its bucket.
    pub fn update_item_details(&mut self, id: ItemId, patch: ItemPatch) -> PlannerResult<()> {
        let mut item = self.find_item(id)?;
        if let Some(title) = patch.title {
            item.title = title.trim().to_string();
        }
        if let Some(notes) = patch.notes {
            item.notes = notes;
        }
        if let Some(priority) = patch.priority {
            item.priority = priority;
        }
        if let Some(due_date) = patch.due_date {
            item.due_date = due_date;
        }
        if let Some(goal_id) = patch.goal_id {
            self.ensure_goal(goal_id)?;
            item.goal_id = goal_id;
        }
        item.validate()?;

        self.store.mutate(|snapshot| {
            let mut next = snapshot.clone();
            if let Some(slot) = next.items.iter_mut().find(|existing| existing.id == id) {
                *slot = item;
            }
            next
        });
        Ok(())
    }

    /// Sets an item's status; crossing the done boundary sinks it to the
    /// bottom of its new partition.
    pub fn set_item_status(&mut self, id: ItemId, status: ItemStatus) -> PlannerResult<()> {
        let item = self.find_item(id)?;
        if item.status == status {
            return Ok(());
        }
        let crosses = item.is_completed() != status.is_completed();
        let bucket = item.bucket();

        self.store.mutate(|snapshot| {
            let mut next = snapshot.clone();
            let placement = if crosses {
                toggle_completion(&bucket_view(snapshot, bucket), id, status.is_completed())
            } else {
                Reassignment::default()
            };
            if let Some(slot) = next.items.iter_mut().find(|existing| existing.id == id) {
                slot.status = status;
            }
            placement.apply(&mut next.items);
            next
        });
        info!(
            "event=item_status module=service status=ok item_id={id} to={status:?} resequenced={crosses}"
        );
        Ok(())
    }

    /// Flips between `Done` and `Pending`; returns the new status.
    pub fn toggle_item_complete(&mut self, id: ItemId) -> PlannerResult<ItemStatus> {
        let item = self.find_item(id)?;
        let status = if item.is_completed() {
            ItemStatus::Pending
        } else {
            ItemStatus::Done
        };
        self.set_item_status(id, status)?;
        Ok(status)
    }

    /// Drag-and-drop inside the item's bucket. `target_position` is clamped
    /// into the item's partition.
    pub fn reorder_item(&mut self, id: ItemId, target_position: usize) -> PlannerResult<()> {
        let bucket = self.find_item(id)?.bucket();
        self.store.mutate(|snapshot| {
            let mut next = snapshot.clone();
            reorder(&bucket_view(snapshot, bucket), id, target_position).apply(&mut next.items);
            next
        });
        Ok(())
    }

    /// Moves an item to another bucket, renumbering both.
    ///
    /// Without a target the item lands at the end of its partition.
    pub fn move_item(
        &mut self,
        id: ItemId,
        to: Bucket,
        target_position: Option<usize>,
    ) -> PlannerResult<()> {
        let item = self.find_item(id)?;
        let from = item.bucket();
        if from == to {
            return match target_position {
                Some(position) => self.reorder_item(id, position),
                None => Ok(()),
            };
        }

        let mut moved = item;
        moved.scheduled_date = to.date();
        let completed = moved.is_completed();

        self.store.mutate(|snapshot| {
            let mut next = snapshot.clone();
            let left = remove_from_bucket(&bucket_view(snapshot, from), id);
            let entered = insert_into_bucket(&bucket_view(snapshot, to), id, completed, target_position);
            if let Some(slot) = next.items.iter_mut().find(|existing| existing.id == id) {
                *slot = moved;
            }
            left.apply(&mut next.items);
            entered.apply(&mut next.items);
            next
        });
        info!("event=item_move module=service status=ok item_id={id} from={from} to={to}");
        Ok(())
    }

    /// Soft-deletes one item.
    pub fn delete_item(&mut self, id: ItemId) -> PlannerResult<DeletionId> {
        self.store
            .remove_items_with_undo(&[id])
            .ok_or(PlannerError::NotFound { kind: "item", id })
    }

    /// Soft-deletes every item of a recurrence group as one undo entry.
    pub fn delete_series(&mut self, group_id: RecurrenceGroupId) -> PlannerResult<DeletionId> {
        let ids: Vec<ItemId> = self
            .store
            .snapshot()
            .series(group_id)
            .iter()
            .map(|item| item.id)
            .collect();
        self.store
            .remove_items_with_undo(&ids)
            .ok_or(PlannerError::NotFound {
                kind: "series",
                id: group_id,
            })
    }

    /// Restores a soft delete inside the undo window.
    pub fn undo_delete(&mut self, deletion: DeletionId) -> PlannerResult<usize> {
        Ok(self.store.undo_delete(deletion)?)
    }

    /// Items of one bucket, pending first then completed.
    pub fn items_in_bucket(&self, bucket: Bucket) -> Vec<Item> {
        let snapshot = self.store.snapshot();
        bucket_view(&snapshot, bucket).into_iter().cloned().collect()
    }

    // Habits

    pub fn create_habit(&mut self, name: &str, cadence: HabitCadence) -> PlannerResult<HabitId> {
        let name = normalize_name("habit", name)?;
        let mut habit = Habit::new(name, cadence);
        let id = habit.id;
        self.store.mutate(|snapshot| {
            let mut next = snapshot.clone();
            habit.order_index = snapshot
                .habits
                .iter()
                .map(|existing| existing.order_index)
                .max()
                .unwrap_or(0)
                + 1;
            next.habits.push(habit);
            next
        });
        info!("event=habit_create module=service status=ok habit_id={id}");
        Ok(id)
    }

    /// Flips a habit's completion for `date`; returns the new state.
    ///
    /// The day's log is replaced as a whole record, never edited in place.
    pub fn toggle_habit_on(&mut self, habit_id: HabitId, date: NaiveDate) -> PlannerResult<bool> {
        self.ensure_habit(habit_id)?;
        let done = !self.store.snapshot().habit_done_on(habit_id, date);

        self.store.mutate(|snapshot| {
            let mut next = snapshot.clone();
            let placement = toggle_completion(&habit_board(snapshot, date), habit_id, done);
            match next
                .habit_logs
                .iter_mut()
                .find(|log| log.habit_id == habit_id && log.date == date)
            {
                Some(log) => *log = log.superseded_by(done),
                None => next.habit_logs.push(HabitLog::new(habit_id, date, done)),
            }
            placement.apply(&mut next.habits);
            next
        });
        info!("event=habit_toggle module=service status=ok habit_id={habit_id} date={date} done={done}");
        Ok(done)
    }

    pub fn toggle_habit_today(&mut self, habit_id: HabitId) -> PlannerResult<bool> {
        self.toggle_habit_on(habit_id, Local::now().date_naive())
    }

    pub fn reorder_habit(
        &mut self,
        habit_id: HabitId,
        date: NaiveDate,
        target_position: usize,
    ) -> PlannerResult<()> {
        self.ensure_habit(habit_id)?;
        self.store.mutate(|snapshot| {
            let mut next = snapshot.clone();
            reorder(&habit_board(snapshot, date), habit_id, target_position)
                .apply(&mut next.habits);
            next
        });
        Ok(())
    }

    /// Deletes a habit and its logs immediately.
    pub fn delete_habit(&mut self, habit_id: HabitId) -> PlannerResult<()> {
        self.ensure_habit(habit_id)?;
        self.store.mutate(|snapshot| {
            let mut next = snapshot.clone();
            next.habits.retain(|habit| habit.id != habit_id);
            next.habit_logs.retain(|log| log.habit_id != habit_id);
            next
        });
        info!("event=habit_delete module=service status=ok habit_id={habit_id}");
        Ok(())
    }

    /// Habits due on `date`, pending first.
    pub fn habit_lines(&self, date: NaiveDate) -> Vec<HabitLine> {
        let snapshot = self.store.snapshot();
        habit_board(&snapshot, date)
            .into_iter()
            .filter(|line| {
                snapshot
                    .habit(line.habit_id)
                    .is_some_and(|habit| habit.cadence.is_due_on(date))
            })
            .collect()
    }

    // Goals

    pub fn create_goal(
        &mut self,
        title: &str,
        target_date: Option<NaiveDate>,
    ) -> PlannerResult<GoalId> {
        let mut goal = Goal::new(normalize_name("goal", title)?);
        goal.target_date = target_date;
        let id = goal.id;
        self.store.mutate(|snapshot| {
            let mut next = snapshot.clone();
            next.goals.push(goal);
            next
        });
        Ok(id)
    }

    /// Sets progress; reaching 100 completes an active goal and dropping
    /// below 100 reactivates a completed one.
    pub fn update_goal_progress(&mut self, id: GoalId, progress: u8) -> PlannerResult<()> {
        if progress > 100 {
            return Err(PlannerError::InvalidProgress(progress));
        }
        self.ensure_goal(Some(id))?;
        self.store.mutate(|snapshot| {
            let mut next = snapshot.clone();
            if let Some(goal) = next.goals.iter_mut().find(|goal| goal.id == id) {
                goal.progress = progress;
                goal.status = match (goal.status, progress) {
                    (GoalStatus::Active, 100) => GoalStatus::Completed,
                    (GoalStatus::Completed, value) if value < 100 => GoalStatus::Active,
                    (status, _) => status,
                };
            }
            next
        });
        Ok(())
    }

    /// Deletes a goal and unlinks items that referenced it.
    pub fn delete_goal(&mut self, id: GoalId) -> PlannerResult<()> {
        self.ensure_goal(Some(id))?;
        self.store.mutate(|snapshot| {
            let mut next = snapshot.clone();
            next.goals.retain(|goal| goal.id != id);
            for item in next.items.iter_mut().filter(|item| item.goal_id == Some(id)) {
                item.goal_id = None;
            }
            next
        });
        info!("event=goal_delete module=service status=ok goal_id={id}");
        Ok(())
    }

    // Journal

    pub fn add_reflection(&mut self, date: NaiveDate, content: ReflectionContent) -> Uuid {
        let reflection = Reflection::new(date, content);
        let id = reflection.id;
        self.store.mutate(|snapshot| {
            let mut next = snapshot.clone();
            next.reflections.push(reflection);
            next
        });
        id
    }

    pub fn add_life_area_score(
        &mut self,
        date: NaiveDate,
        area: LifeArea,
        score: u8,
    ) -> PlannerResult<Uuid> {
        let entry = LifeAreaScore::new(date, area, score)?;
        let id = entry.id;
        self.store.mutate(|snapshot| {
            let mut next = snapshot.clone();
            next.life_area_scores.push(entry);
            next
        });
        Ok(id)
    }

    pub fn append_message(&mut self, role: ChatRole, content: impl Into<String>) -> Uuid {
        let message = ChatMessage {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            created_at_ms: self.store.now_ms(),
        };
        let id = message.id;
        self.store.mutate(|snapshot| {
            let mut next = snapshot.clone();
            next.messages.push(message);
            next
        });
        id
    }

    /// Removes every reflection locally and remotely.
    pub fn clear_reflections(&mut self) -> usize {
        let ids: Vec<Uuid> = self
            .store
            .snapshot()
            .reflections
            .iter()
            .map(|reflection| reflection.id)
            .collect();
        let removed = self
            .store
            .purge_append_only(RemoteTable::Reflections, &ids);
        info!("event=reflections_clear module=service status=ok removed={removed}");
        removed
    }

    // Profile

    pub fn update_profile(&mut self, profile: Profile) {
        self.store.mutate(|snapshot| Snapshot {
            profile,
            ..snapshot.clone()
        });
    }

    pub fn update_settings(&mut self, settings: Settings) {
        self.store.mutate(|snapshot| Snapshot {
            settings,
            ..snapshot.clone()
        });
    }
}
