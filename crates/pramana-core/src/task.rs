use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;

use crate::completion::CompletionService;
use crate::types::ChatMessage;

/// Produces an answer for one test case input.
#[async_trait]
pub trait Task: Send + Sync {
	async fn run(&self, input: &Value) -> Result<Value>;
}

/// Wrap an async closure as a `Task`.
pub fn from_async_fn<F, Fut>(f: F) -> Arc<dyn Task>
where
	F: Send + Sync + 'static + Fn(&Value) -> Fut,
	Fut: Future<Output = Result<Value>> + Send + 'static,
{
	struct ClosureTask<F, Fut>
	where
		F: Send + Sync + 'static + Fn(&Value) -> Fut,
		Fut: Future<Output = Result<Value>> + Send + 'static,
	{
		f: F,
	}

	#[async_trait]
	impl<F, Fut> Task for ClosureTask<F, Fut>
	where
		F: Send + Sync + 'static + Fn(&Value) -> Fut,
		Fut: Future<Output = Result<Value>> + Send + 'static,
	{
		async fn run(&self, input: &Value) -> Result<Value> {
			(self.f)(input).await
		}
	}

	Arc::new(ClosureTask { f })
}

/// Ask a completion service. The input must be the chat `messages` array of a
/// dataset row; the output is the raw completion text as a JSON string.
pub fn completion_task(service: Arc<dyn CompletionService>) -> Arc<dyn Task> {
	struct CompletionTask {
		service: Arc<dyn CompletionService>,
	}

	#[async_trait]
	impl Task for CompletionTask {
		async fn run(&self, input: &Value) -> Result<Value> {
			let messages: Vec<ChatMessage> = serde_json::from_value(input.clone())
				.context("task input is not a list of chat messages")?;
			let text = self.service.complete(&messages).await?;
			Ok(Value::String(text))
		}
	}

	Arc::new(CompletionTask { service })
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	struct Echo;

	#[async_trait]
	impl CompletionService for Echo {
		async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
			Ok(messages.last().map(|m| m.content.clone()).unwrap_or_default())
		}
	}

	#[tokio::test]
	async fn test_completion_task_returns_text() {
		let task = completion_task(Arc::new(Echo));
		let input = json!([
			{"role": "system", "content": "You are an expert in Sanskrit grammar."},
			{"role": "user", "content": "gam, laṭ, prathama, eka"}
		]);
		assert_eq!(task.run(&input).await.unwrap(), json!("gam, laṭ, prathama, eka"));
	}

	#[tokio::test]
	async fn test_completion_task_rejects_non_chat_input() {
		let task = completion_task(Arc::new(Echo));
		assert!(task.run(&json!("bhū")).await.is_err());
	}
}
