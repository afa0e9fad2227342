use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::types::Task;

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn get(&self, task_id: &str) -> Option<Task>;
    async fn save(&self, task: Task);
    async fn delete(&self, task_id: &str) -> bool;
}

/// Tasks live for the lifetime of the process.
#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<String, Task>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn get(&self, task_id: &str) -> Option<Task> {
        self.tasks.read().await.get(task_id).cloned()
    }

    async fn save(&self, task: Task) {
        tracing::debug!(task_id = %task.id, state = ?task.status.state, "Task saved");
        self.tasks.write().await.insert(task.id.clone(), task);
    }

    async fn delete(&self, task_id: &str) -> bool {
        self.tasks.write().await.remove(task_id).is_some()
    }
}
