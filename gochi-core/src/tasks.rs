//! The owner's to-do list shown beside the pet.
//!
//! Tasks live in memory only and start empty with each session.

use crate::error::{Error, Result};

/// An ordered list of pending tasks plus a count of finished ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskList {
    tasks: Vec<String>,
    completed: u32,
}

impl TaskList {
    /// An empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a task.
    ///
    /// # Errors
    ///
    /// Returns `Error::EmptyTask` if `task` is empty or only whitespace.
    pub fn add(&mut self, task: impl Into<String>) -> Result<()> {
        let task = task.into();
        if task.trim().is_empty() {
            return Err(Error::EmptyTask);
        }
        self.tasks.push(task);
        Ok(())
    }

    /// Mark the task at `index` done, removing it from the list.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidTaskIndex` if there is no task at `index`.
    pub fn complete(&mut self, index: usize) -> Result<String> {
        if index >= self.tasks.len() {
            return Err(Error::InvalidTaskIndex {
                index,
                len: self.tasks.len(),
            });
        }
        self.completed += 1;
        Ok(self.tasks.remove(index))
    }

    /// Pending tasks in insertion order.
    pub fn tasks(&self) -> &[String] {
        &self.tasks
    }

    /// How many tasks have been completed this session.
    pub fn completed(&self) -> u32 {
        self.completed
    }
}
