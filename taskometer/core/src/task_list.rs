use crate::ValidationError;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::collections::btree_map;
use uuid::Uuid;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A named grouping of tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TaskList {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskList {
    /// Creates a task list with a freshly generated id, stamped with the current time.
    /// Returns an error if the name is blank.
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyListName);
        }

        let now = Utc::now();
        Ok(TaskList {
            id: Uuid::new_v4(),
            name,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Directory of every known task list, keyed by list id.
///
/// Persisted as a single JSON object whose keys are the string form of each id,
/// so it is the only place that knows which lists exist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct TaskListIndex {
    lists: BTreeMap<Uuid, TaskList>,
}

impl TaskListIndex {
    /// Creates an index with no lists in it.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts the list under its own id, returning the entry it replaced, if any.
    pub fn insert(&mut self, list: TaskList) -> Option<TaskList> {
        self.lists.insert(list.id, list)
    }

    pub fn get(&self, id: &Uuid) -> Option<&TaskList> {
        self.lists.get(id)
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.lists.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// Iterates over `(id, list)` pairs in id order.
    pub fn iter(&self) -> btree_map::Iter<'_, Uuid, TaskList> {
        self.lists.iter()
    }
}

impl FromIterator<TaskList> for TaskListIndex {
    fn from_iter<I: IntoIterator<Item = TaskList>>(iter: I) -> Self {
        let mut index = TaskListIndex::new();
        for list in iter {
            index.insert(list);
        }
        index
    }
}

impl IntoIterator for TaskListIndex {
    type Item = (Uuid, TaskList);
    type IntoIter = btree_map::IntoIter<Uuid, TaskList>;

    fn into_iter(self) -> Self::IntoIter {
        self.lists.into_iter()
    }
}
