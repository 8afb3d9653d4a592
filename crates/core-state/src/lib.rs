//! Entity arenas: slot-recycling pools for tasks and users, the bidirectional
//! task↔user bags they maintain, and the `World` that threads them alongside
//! the text buffer, cursor list, and schedule through the rest of the crate
//! graph.
//!
//! No crate in this workspace keeps domain state in a global or a
//! process-wide static. `World` is constructed once by the driver (`ox-bin`)
//! and passed by `&mut` into `core-parser`, `core-schedule`, and
//! `core-layout`. This mirrors the single-struct-threaded-through-the-call-
//! graph shape used elsewhere in this workspace for editor state, just
//! without any module-level pointers standing in for it.
//!
//! Handles (`TaskId`, `UserId`) are `Copy` indices into a growable `Vec`, not
//! pointers: growing an arena (via `Vec::push`/reallocation) never
//! invalidates a previously issued handle, because the handle never borrows
//! into the backing storage. A slot's only liveness marker is its `trash`
//! bit; destroying a slot clears it and detaches it from the name index and
//! from every cross-arena bag that referenced it.

use anyhow::Result;
use bitflags::bitflags;
use core_text::Buffer;
use smallvec::SmallVec;
use std::collections::HashMap;
use thiserror::Error;

pub const TASK_USERS_MAX: usize = 8;
pub const TASK_DEPENDENCIES_MAX: usize = 64;
pub const USER_TASKS_MAX: usize = 1024;

/// Domain-misuse and structural-bug error kinds. Per the design split this
/// crate follows: a `WorldError` is returned for conditions a caller can
/// legitimately trigger with malformed or oversized input (capacity limits);
/// conditions that indicate an arena invariant was violated by this crate's
/// own bookkeeping use `debug_assert!` instead, since those can only happen
/// from a bug here, not from user input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorldError {
    #[error("{bag} is full (limit {limit})")]
    CapacityExceeded { bag: &'static str, limit: usize },
    #[error("no live task named {0:?}")]
    NoSuchTask(String),
    #[error("no live user named {0:?}")]
    NoSuchUser(String),
}

bitflags! {
    /// Tags drawn from {HAS_DURATION, HAS_FIXED_START, HAS_FIXED_END, NO_SOONER}.
    /// `NO_SOONER` is carried over from the source model but unused by the
    /// scheduler: its intended semantics (a start lower-bound distinct from
    /// `fixed_start`) were never specified, so nothing is wired to it.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Constraints: u8 {
        const HAS_DURATION    = 0b0001;
        const HAS_FIXED_START = 0b0010;
        const HAS_FIXED_END   = 0b0100;
        const NO_SOONER       = 0b1000;
    }
}

/// Stable index handle for a task. Immune to arena growth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u32);

/// Stable index handle for a user. Immune to arena growth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub u32);

/// Fixed-capacity, insertion-ordered, duplicate-free bag. Backs
/// `Task::users`, `Task::prereqs`, and `User::tasks`.
#[derive(Debug, Clone)]
pub struct Bag<T: Copy + PartialEq, const CAP: usize> {
    items: SmallVec<[T; 8]>,
}

impl<T: Copy + PartialEq, const CAP: usize> Default for Bag<T, CAP> {
    fn default() -> Self {
        Self {
            items: SmallVec::new(),
        }
    }
}

impl<T: Copy + PartialEq, const CAP: usize> Bag<T, CAP> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, item: T) -> bool {
        self.items.contains(&item)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Insert `item` if not already present. Returns `Ok(false)` for a
    /// no-op duplicate insert, `Ok(true)` on a fresh insert, or
    /// `Err(WorldError::CapacityExceeded)` once `CAP` is reached.
    pub fn insert(&mut self, item: T, bag_name: &'static str) -> Result<bool, WorldError> {
        if self.items.contains(&item) {
            return Ok(false);
        }
        if self.items.len() >= CAP {
            return Err(WorldError::CapacityExceeded {
                bag: bag_name,
                limit: CAP,
            });
        }
        self.items.push(item);
        Ok(true)
    }

    /// Remove `item`; returns whether it was present.
    pub fn remove(&mut self, item: T) -> bool {
        if let Some(pos) = self.items.iter().position(|x| *x == item) {
            self.items.remove(pos);
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[derive(Debug, Clone, Default)]
pub struct Task {
    pub name: String,
    pub users: Bag<UserId, TASK_USERS_MAX>,
    pub prereqs: Bag<TaskId, TASK_DEPENDENCIES_MAX>,
    /// Derived inverse of `prereqs`; rebuilt wholesale after every parse.
    /// Never directly written outside of the rebuild pass.
    pub dependents: Bag<TaskId, TASK_DEPENDENCIES_MAX>,
    pub constraints: Constraints,
    pub day_start: i64,
    pub day_duration: i64,
    pub day_end: i64,
    pub status_color: u8,
    pub mode_edit: bool,
    pub mode_edit_temp: bool,
    /// Transient scheduler marker; never persisted or read outside
    /// `core-schedule`.
    pub schedule_done: bool,
    trash: bool,
    visited: bool,
}

impl Task {
    fn fresh(name: String) -> Self {
        Self {
            name,
            status_color: 0,
            trash: false,
            ..Default::default()
        }
    }

    pub fn is_live(&self) -> bool {
        !self.trash
    }

    /// Recompute `day_end` from `day_start`/`day_duration` per the invariant
    /// `end = start + duration - 1`, when a duration is known.
    pub fn recompute_end(&mut self) {
        if self.constraints.contains(Constraints::HAS_DURATION) {
            self.day_end = self.day_start + self.day_duration - 1;
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct User {
    pub name: String,
    pub tasks: Bag<TaskId, USER_TASKS_MAX>,
    pub column_index: usize,
    pub column_center_px: f64,
    pub mode_edit: bool,
    trash: bool,
    visited: bool,
}

impl User {
    pub fn is_live(&self) -> bool {
        !self.trash
    }
}

/// Generic slot-recycling arena. Allocation scans forward from a rotating
/// cursor for the next dead slot; when a full revolution finds none, the
/// backing storage grows by ×1.5 (never shrinks).
struct Arena<T> {
    slots: Vec<T>,
    last_created: usize,
    name_index: HashMap<String, u32>,
}

impl<T> Arena<T> {
    fn new() -> Self {
        Self {
            slots: Vec::new(),
            last_created: 0,
            name_index: HashMap::new(),
        }
    }

    fn grow(&mut self, make_trash: impl Fn() -> T) {
        let new_cap = if self.slots.is_empty() {
            4
        } else {
            (self.slots.len() as f64 * 1.5).ceil() as usize
        };
        while self.slots.len() < new_cap {
            self.slots.push(make_trash());
        }
    }
}

pub struct TaskArena {
    arena: Arena<Task>,
}

impl Default for TaskArena {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskArena {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<TaskId> {
        self.arena.name_index.get(name).map(|i| TaskId(*i))
    }

    pub fn task(&self, id: TaskId) -> &Task {
        &self.arena.slots[id.0 as usize]
    }

    pub fn task_mut(&mut self, id: TaskId) -> &mut Task {
        &mut self.arena.slots[id.0 as usize]
    }

    pub fn try_task(&self, id: TaskId) -> Option<&Task> {
        self.arena.slots.get(id.0 as usize).filter(|t| t.is_live())
    }

    /// Find-or-create a task by name, marking it visited either way. Mirrors
    /// the two-pass parser's task-detection semantics: a second `{}` block
    /// for an already-visited name in the same parse reuses that task (the
    /// silent-merge resolution of the duplicate-name open question).
    pub fn find_or_create(&mut self, name: &str) -> TaskId {
        if let Some(id) = self.get(name) {
            self.arena.slots[id.0 as usize].visited = true;
            return id;
        }
        let cap = self.arena.slots.len();
        let mut idx = self.arena.last_created;
        let mut found = None;
        for _ in 0..cap {
            if cap == 0 {
                break;
            }
            idx = (idx + 1) % cap;
            if self.arena.slots[idx].trash {
                found = Some(idx);
                break;
            }
        }
        let slot = match found {
            Some(i) => i,
            None => {
                let old_cap = self.arena.slots.len();
                self.arena.grow(|| {
                    let mut t = Task::fresh(String::new());
                    t.trash = true;
                    t
                });
                old_cap
            }
        };
        self.arena.last_created = slot;
        let mut task = Task::fresh(name.to_string());
        task.visited = true;
        self.arena.slots[slot] = task;
        self.arena
            .name_index
            .insert(name.to_string(), slot as u32);
        TaskId(slot as u32)
    }

    pub fn destroy(&mut self, id: TaskId, users: &mut UserArena) {
        let idx = id.0 as usize;
        if self.arena.slots[idx].trash {
            return;
        }
        let users_to_detach: Vec<UserId> = self.arena.slots[idx].users.iter().copied().collect();
        for uid in users_to_detach {
            users.user_mut(uid).tasks.remove(id);
        }
        let name = self.arena.slots[idx].name.clone();
        self.arena.name_index.remove(&name);
        self.arena.slots[idx] = {
            let mut t = Task::fresh(String::new());
            t.trash = true;
            t
        };
    }

    pub fn for_each_live(&self) -> impl Iterator<Item = (TaskId, &Task)> {
        self.arena
            .slots
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_live())
            .map(|(i, t)| (TaskId(i as u32), t))
    }

    pub fn reset_visited(&mut self) {
        for t in self.arena.slots.iter_mut().filter(|t| t.is_live()) {
            t.visited = false;
        }
    }

    pub fn is_visited(&self, id: TaskId) -> bool {
        self.arena.slots[id.0 as usize].visited
    }

    pub fn mark_visited(&mut self, id: TaskId) {
        self.arena.slots[id.0 as usize].visited = true;
    }

    /// Destroy every live, edit-mode task not visited this parse. Text
    /// removal implies task deletion.
    pub fn sweep_unvisited_edit_mode(&mut self, users: &mut UserArena) {
        let victims: Vec<TaskId> = self
            .for_each_live()
            .filter(|(_, t)| t.mode_edit && !t.visited)
            .map(|(id, _)| id)
            .collect();
        for id in victims {
            self.destroy(id, users);
        }
    }

    /// Rebuild `dependents` for every live task by scanning all live tasks'
    /// `prereqs`. Never called piecemeal; always a full rebuild.
    pub fn rebuild_dependents(&mut self) {
        let mut inverse: HashMap<u32, Vec<TaskId>> = HashMap::new();
        for (id, task) in self.for_each_live() {
            for prereq in task.prereqs.iter() {
                inverse.entry(prereq.0).or_default().push(id);
            }
        }
        for t in self.arena.slots.iter_mut().filter(|t| t.is_live()) {
            t.dependents.clear();
        }
        for (prereq_idx, dependents) in inverse {
            if let Some(t) = self.arena.slots.get_mut(prereq_idx as usize) {
                for d in dependents {
                    let _ = t.dependents.insert(d, "dependents");
                }
            }
        }
    }
}

pub struct UserArena {
    arena: Arena<User>,
}

impl Default for UserArena {
    fn default() -> Self {
        Self::new()
    }
}

impl UserArena {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<UserId> {
        self.arena.name_index.get(name).map(|i| UserId(*i))
    }

    pub fn user(&self, id: UserId) -> &User {
        &self.arena.slots[id.0 as usize]
    }

    pub fn user_mut(&mut self, id: UserId) -> &mut User {
        &mut self.arena.slots[id.0 as usize]
    }

    pub fn try_user(&self, id: UserId) -> Option<&User> {
        self.arena.slots.get(id.0 as usize).filter(|u| u.is_live())
    }

    pub fn find_or_create(&mut self, name: &str) -> UserId {
        if let Some(id) = self.get(name) {
            self.arena.slots[id.0 as usize].visited = true;
            return id;
        }
        let cap = self.arena.slots.len();
        let mut idx = self.arena.last_created;
        let mut found = None;
        for _ in 0..cap {
            if cap == 0 {
                break;
            }
            idx = (idx + 1) % cap;
            if self.arena.slots[idx].trash {
                found = Some(idx);
                break;
            }
        }
        let slot = match found {
            Some(i) => i,
            None => {
                let old_cap = self.arena.slots.len();
                self.arena.grow(|| {
                    let mut u = User::default();
                    u.trash = true;
                    u
                });
                old_cap
            }
        };
        self.arena.last_created = slot;
        let user = User {
            name: name.to_string(),
            trash: false,
            visited: true,
            ..Default::default()
        };
        self.arena.slots[slot] = user;
        self.arena
            .name_index
            .insert(name.to_string(), slot as u32);
        UserId(slot as u32)
    }

    pub fn destroy(&mut self, id: UserId) {
        let idx = id.0 as usize;
        if self.arena.slots[idx].trash {
            return;
        }
        let name = self.arena.slots[idx].name.clone();
        self.arena.name_index.remove(&name);
        self.arena.slots[idx] = {
            let mut u = User::default();
            u.trash = true;
            u
        };
    }

    pub fn for_each_live(&self) -> impl Iterator<Item = (UserId, &User)> {
        self.arena
            .slots
            .iter()
            .enumerate()
            .filter(|(_, u)| u.is_live())
            .map(|(i, u)| (UserId(i as u32), u))
    }

    pub fn reset_visited(&mut self) {
        for u in self.arena.slots.iter_mut().filter(|u| u.is_live()) {
            u.visited = false;
        }
    }

    pub fn is_visited(&self, id: UserId) -> bool {
        self.arena.slots[id.0 as usize].visited
    }

    /// Destroy every live user whose task-bag is empty.
    pub fn sweep_empty(&mut self) {
        let victims: Vec<UserId> = self
            .for_each_live()
            .filter(|(_, u)| u.tasks.is_empty())
            .map(|(id, _)| id)
            .collect();
        for id in victims {
            self.destroy(id);
        }
    }
}

/// The domain object a cursor offset is currently resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntityRef {
    #[default]
    None,
    Task(TaskId),
    User(UserId),
    Prereq(TaskId),
}

/// An ordered `(day, task)` schedule plus solve metadata. Populated by
/// `core-schedule`; the data shape lives here because it is part of the
/// shared data model, not the algorithm.
#[derive(Debug, Clone, Default)]
pub struct Schedule {
    pub entries: Vec<(i64, TaskId)>,
    pub solved: bool,
    pub day_start: i64,
    pub day_end: i64,
    pub day_duration: i64,
    pub solve_time_ms: f64,
}

/// The single struct threaded through the call graph: both arenas, the text
/// buffer, the derived `line_task` back-reference array, the cursor list,
/// the resolved entity, and the latest schedule. No crate downstream of this
/// one reaches for global/static domain state.
pub struct World {
    pub tasks: TaskArena,
    pub users: UserArena,
    pub buffer: Buffer,
    pub line_task: Vec<Option<TaskId>>,
    pub cursors: core_text::cursor::CursorList,
    pub resolved_entity: EntityRef,
    pub schedule: Schedule,
}

impl World {
    pub fn new(buffer: Buffer) -> Self {
        let mut cursors = core_text::cursor::CursorList::new();
        cursors.reset(&buffer);
        Self {
            tasks: TaskArena::new(),
            users: UserArena::new(),
            buffer,
            line_task: Vec::new(),
            cursors,
            resolved_entity: EntityRef::None,
            schedule: Schedule::default(),
        }
    }

    /// Check the symmetry/uniqueness invariants (§3) that must hold after
    /// every completed parse. Intended for tests and debug-mode calls, not
    /// hot-path use.
    pub fn check_invariants(&self) -> Result<(), String> {
        let mut names = std::collections::HashSet::new();
        for (id, task) in self.tasks.for_each_live() {
            if !names.insert(&task.name) {
                return Err(format!("duplicate live task name {:?}", task.name));
            }
            if task.name.is_empty() {
                return Err(format!("task {:?} has empty name", id));
            }
            for uid in task.users.iter() {
                let user = self.users.user(*uid);
                if !user.tasks.contains(id) {
                    return Err(format!(
                        "bag asymmetry: task {:?} claims user {:?} but not vice versa",
                        task.name, user.name
                    ));
                }
            }
        }
        let mut user_names = std::collections::HashSet::new();
        for (id, user) in self.users.for_each_live() {
            if !user_names.insert(&user.name) {
                return Err(format!("duplicate live user name {:?}", user.name));
            }
            if user.tasks.is_empty() {
                return Err(format!("user {:?} ({:?}) has zero tasks", id, user.name));
            }
        }
        for (id, task) in self.tasks.for_each_live() {
            for prereq in task.prereqs.iter() {
                let p = self.tasks.task(*prereq);
                if !p.dependents.contains(id) {
                    return Err(format!(
                        "dependents inverse missing: {:?} -> {:?}",
                        p.name, task.name
                    ));
                }
            }
        }
        Ok(())
    }
}
