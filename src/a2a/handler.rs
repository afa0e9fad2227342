use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use super::executor::{AgentExecutor, RequestContext};
use super::store::TaskStore;
use super::types::{
    A2aError, Artifact, Message, MessageSendParams, Task, TaskIdParams, TaskQueryParams,
    TaskState, TaskStatus,
};

#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn on_message_send(&self, params: MessageSendParams) -> Result<Task, A2aError>;
    async fn on_get_task(&self, params: TaskQueryParams) -> Result<Task, A2aError>;
    async fn on_cancel_task(&self, params: TaskIdParams) -> Result<Task, A2aError>;
}

/// Runs each message to completion through the executor and records the
/// task in the store.
pub struct DefaultRequestHandler {
    executor: Arc<dyn AgentExecutor>,
    store: Arc<dyn TaskStore>,
}

impl DefaultRequestHandler {
    pub fn new(executor: Arc<dyn AgentExecutor>, store: Arc<dyn TaskStore>) -> Self {
        Self { executor, store }
    }

    async fn load(&self, task_id: &str) -> Result<Task, A2aError> {
        self.store
            .get(task_id)
            .await
            .ok_or_else(|| A2aError::TaskNotFound(task_id.to_string()))
    }

    /// Existing task named by the message, or a fresh one.
    async fn task_for(&self, message: &Message) -> Result<Task, A2aError> {
        let Some(task_id) = &message.task_id else {
            let context_id = message
                .context_id
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string());
            return Ok(Task::new(Uuid::new_v4().to_string(), context_id));
        };

        let task = self.load(task_id).await?;
        if task.status.state.is_terminal() {
            return Err(A2aError::InvalidParams(format!(
                "Task {} is in terminal state: {:?}",
                task.id, task.status.state
            )));
        }
        if let Some(context_id) = &message.context_id {
            if context_id != &task.context_id {
                return Err(A2aError::InvalidParams(format!(
                    "contextId {} does not match task {}",
                    context_id, task.id
                )));
            }
        }
        Ok(task)
    }
}

/// Record the executor's outcome on `task`. A cancel stored while the agent
/// was working wins.
async fn finish(store: &dyn TaskStore, mut task: Task, result: anyhow::Result<String>) -> Task {
    match result {
        Ok(text) => {
            let reply = Message::agent_text(text.clone(), &task.id, &task.context_id);
            task.artifacts.push(Artifact::text("response", text));
            task.history.push(reply.clone());
            task.status = TaskStatus::new(TaskState::Completed, Some(reply));
        }
        Err(e) => {
            tracing::error!(task_id = %task.id, "Agent execution failed: {:#}", e);
            let reply = Message::agent_text(format!("Error: {:#}", e), &task.id, &task.context_id);
            task.status = TaskStatus::new(TaskState::Failed, Some(reply));
        }
    }

    if let Some(current) = store.get(&task.id).await {
        if current.status.state == TaskState::Canceled {
            return current;
        }
    }

    store.save(task.clone()).await;
    task
}

#[async_trait]
impl RequestHandler for DefaultRequestHandler {
    async fn on_message_send(&self, params: MessageSendParams) -> Result<Task, A2aError> {
        let mut message = params.message;
        if message.parts.is_empty() {
            return Err(A2aError::InvalidParams(
                "message must contain at least one part".to_string(),
            ));
        }

        let mut task = self.task_for(&message).await?;
        message.task_id = Some(task.id.clone());
        message.context_id = Some(task.context_id.clone());

        tracing::info!(task_id = %task.id, context_id = %task.context_id, "message/send");

        task.history.push(message.clone());
        task.status = TaskStatus::new(TaskState::Working, None);
        self.store.save(task.clone()).await;

        let context = RequestContext {
            task_id: task.id.clone(),
            context_id: task.context_id.clone(),
            message,
        };

        // The run belongs to the task, not to the request: it finishes and
        // records its outcome even if the caller goes away.
        let executor = self.executor.clone();
        let store = self.store.clone();
        tokio::spawn(async move {
            let result = executor.execute(&context).await;
            finish(store.as_ref(), task, result).await
        })
        .await
        .map_err(|e| A2aError::Internal(format!("agent execution aborted: {}", e)))
    }

    async fn on_get_task(&self, params: TaskQueryParams) -> Result<Task, A2aError> {
        let mut task = self.load(&params.id).await?;

        if let Some(limit) = params.history_length {
            let skip = task.history.len().saturating_sub(limit);
            task.history = task.history.split_off(skip);
        }

        Ok(task)
    }

    async fn on_cancel_task(&self, params: TaskIdParams) -> Result<Task, A2aError> {
        let mut task = self.load(&params.id).await?;

        if task.status.state.is_terminal() {
            return Err(A2aError::TaskNotCancelable(format!(
                "Task {} is in state {:?}",
                task.id, task.status.state
            )));
        }

        if let Err(e) = self.executor.cancel(&task.id).await {
            tracing::warn!(task_id = %task.id, "Executor cancel failed: {:#}", e);
        }

        task.status = TaskStatus::new(TaskState::Canceled, None);
        self.store.save(task.clone()).await;
        tracing::info!(task_id = %task.id, "Task canceled");
        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::a2a::store::InMemoryTaskStore;
    use anyhow::bail;
    use std::time::Duration;
    use tokio::sync::Notify;

    struct Echo;

    #[async_trait]
    impl AgentExecutor for Echo {
        async fn execute(&self, context: &RequestContext) -> anyhow::Result<String> {
            let input = context.user_input();
            if input == "fail" {
                bail!("boom");
            }
            Ok(format!("echo: {}", input))
        }
    }

    fn handler() -> (DefaultRequestHandler, Arc<InMemoryTaskStore>) {
        let store = Arc::new(InMemoryTaskStore::new());
        (DefaultRequestHandler::new(Arc::new(Echo), store.clone()), store)
    }

    fn send(text: &str) -> MessageSendParams {
        MessageSendParams {
            message: Message::user_text(text),
            configuration: None,
            metadata: None,
        }
    }

    #[tokio::test]
    async fn test_send_completes_task() {
        let (handler, store) = handler();
        let task = handler.on_message_send(send("hello")).await.unwrap();

        assert_eq!(task.status.state, TaskState::Completed);
        assert_eq!(task.history.len(), 2);
        assert_eq!(task.history[0].task_id.as_deref(), Some(task.id.as_str()));
        assert_eq!(task.artifacts[0].parts.len(), 1);
        assert_eq!(
            task.status.message.as_ref().unwrap().text_content(),
            "echo: hello"
        );
        assert_eq!(store.get(&task.id).await.unwrap(), task);
    }

    #[tokio::test]
    async fn test_executor_error_fails_task() {
        let (handler, _) = handler();
        let task = handler.on_message_send(send("fail")).await.unwrap();
        assert_eq!(task.status.state, TaskState::Failed);
        assert!(task
            .status
            .message
            .unwrap()
            .text_content()
            .contains("boom"));
    }

    #[tokio::test]
    async fn test_context_id_is_kept() {
        let (handler, _) = handler();
        let mut params = send("hi");
        params.message.context_id = Some("ctx-42".to_string());
        let task = handler.on_message_send(params).await.unwrap();
        assert_eq!(task.context_id, "ctx-42");
    }

    #[tokio::test]
    async fn test_unknown_task_id() {
        let (handler, _) = handler();
        let mut params = send("hi");
        params.message.task_id = Some("missing".to_string());
        let err = handler.on_message_send(params).await.unwrap_err();
        assert_eq!(err, A2aError::TaskNotFound("missing".to_string()));
    }

    #[tokio::test]
    async fn test_terminal_task_rejects_new_messages() {
        let (handler, _) = handler();
        let task = handler.on_message_send(send("one")).await.unwrap();

        let mut params = send("two");
        params.message.task_id = Some(task.id.clone());
        let err = handler.on_message_send(params).await.unwrap_err();
        assert!(matches!(err, A2aError::InvalidParams(_)));
    }

    #[tokio::test]
    async fn test_input_required_task_continues() {
        let (handler, store) = handler();
        let mut waiting = Task::new("t-wait", "ctx-wait");
        waiting.status = TaskStatus::new(TaskState::InputRequired, None);
        store.save(waiting).await;

        let mut params = send("London");
        params.message.task_id = Some("t-wait".to_string());
        let task = handler.on_message_send(params).await.unwrap();
        assert_eq!(task.id, "t-wait");
        assert_eq!(task.context_id, "ctx-wait");
        assert_eq!(task.status.state, TaskState::Completed);
    }

    #[tokio::test]
    async fn test_empty_parts_rejected() {
        let (handler, _) = handler();
        let mut params = send("x");
        params.message.parts.clear();
        assert!(matches!(
            handler.on_message_send(params).await,
            Err(A2aError::InvalidParams(_))
        ));
    }

    #[tokio::test]
    async fn test_get_trims_history() {
        let (handler, _) = handler();
        let task = handler.on_message_send(send("hello")).await.unwrap();

        let full = handler
            .on_get_task(TaskQueryParams {
                id: task.id.clone(),
                history_length: None,
            })
            .await
            .unwrap();
        assert_eq!(full.history.len(), 2);

        let last = handler
            .on_get_task(TaskQueryParams {
                id: task.id.clone(),
                history_length: Some(1),
            })
            .await
            .unwrap();
        assert_eq!(last.history.len(), 1);
        assert_eq!(last.history[0].text_content(), "echo: hello");
    }

    #[tokio::test]
    async fn test_cancel_rules() {
        let (handler, store) = handler();

        let done = handler.on_message_send(send("hello")).await.unwrap();
        let err = handler
            .on_cancel_task(TaskIdParams { id: done.id })
            .await
            .unwrap_err();
        assert!(matches!(err, A2aError::TaskNotCancelable(_)));

        let mut waiting = Task::new("t-wait", "ctx");
        waiting.status = TaskStatus::new(TaskState::InputRequired, None);
        store.save(waiting).await;
        let canceled = handler
            .on_cancel_task(TaskIdParams {
                id: "t-wait".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(canceled.status.state, TaskState::Canceled);

        let missing = handler
            .on_cancel_task(TaskIdParams {
                id: "nope".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(missing, A2aError::TaskNotFound("nope".to_string()));
    }

    /// Holds every run until the test releases it.
    #[derive(Default)]
    struct Gated {
        started: Notify,
        release: Notify,
    }

    #[async_trait]
    impl AgentExecutor for Gated {
        async fn execute(&self, context: &RequestContext) -> anyhow::Result<String> {
            self.started.notify_one();
            self.release.notified().await;
            Ok(format!("late: {}", context.user_input()))
        }
    }

    fn gated(
        task_id: &str,
    ) -> (
        Arc<DefaultRequestHandler>,
        Arc<Gated>,
        Arc<InMemoryTaskStore>,
        MessageSendParams,
    ) {
        let store = Arc::new(InMemoryTaskStore::new());
        let gate = Arc::new(Gated::default());
        let handler = Arc::new(DefaultRequestHandler::new(gate.clone(), store.clone()));

        let mut params = send("hello");
        params.message.task_id = Some(task_id.to_string());
        (handler, gate, store, params)
    }

    async fn state_of(store: &InMemoryTaskStore, task_id: &str) -> TaskState {
        store.get(task_id).await.unwrap().status.state
    }

    #[tokio::test]
    async fn test_dropped_send_still_finishes_task() {
        let (handler, gate, store, params) = gated("t-drop");
        let mut waiting = Task::new("t-drop", "ctx");
        waiting.status = TaskStatus::new(TaskState::InputRequired, None);
        store.save(waiting).await;

        let abandoned =
            tokio::time::timeout(Duration::from_millis(50), handler.on_message_send(params)).await;
        assert!(abandoned.is_err());
        assert_eq!(state_of(&store, "t-drop").await, TaskState::Working);

        gate.release.notify_one();
        for _ in 0..200 {
            if state_of(&store, "t-drop").await == TaskState::Completed {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let task = store.get("t-drop").await.unwrap();
        assert_eq!(task.status.state, TaskState::Completed);
        assert_eq!(task.status.message.unwrap().text_content(), "late: hello");
    }

    #[tokio::test]
    async fn test_cancel_during_run_wins() {
        let (handler, gate, store, params) = gated("t-race");
        let mut waiting = Task::new("t-race", "ctx");
        waiting.status = TaskStatus::new(TaskState::InputRequired, None);
        store.save(waiting).await;

        let running = tokio::spawn({
            let handler = handler.clone();
            async move { handler.on_message_send(params).await }
        });

        gate.started.notified().await;
        assert_eq!(state_of(&store, "t-race").await, TaskState::Working);

        let canceled = handler
            .on_cancel_task(TaskIdParams {
                id: "t-race".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(canceled.status.state, TaskState::Canceled);

        gate.release.notify_one();
        let returned = running.await.unwrap().unwrap();
        assert_eq!(returned.status.state, TaskState::Canceled);
        assert!(returned.artifacts.is_empty());
        assert_eq!(state_of(&store, "t-race").await, TaskState::Canceled);
    }
}
