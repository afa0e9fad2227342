// ============================================
// WEATHER AGENT - LLM Provider Tests
// ============================================

#[cfg(test)]
mod llm_tests {
    use mockito::{Matcher, Server};
    use serde_json::json;
    use std::sync::Arc;
    use weather_agent::llm::{
        AzureOpenAIProvider, ChatOptions, LlmClient, LlmError, Message, OllamaProvider,
        OpenAIProvider, Provider, RetryConfig, ToolDefinition,
    };

    fn weather_tool() -> ToolDefinition {
        ToolDefinition {
            name: "get_weather".to_string(),
            description: "Current weather".to_string(),
            input_schema: json!({"type": "object", "properties": {"city": {"type": "string"}}}),
        }
    }

    /// Test OpenAI request shape and tool call parsing
    #[tokio::test]
    async fn test_openai_tool_call() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::AllOf(vec![
                Matcher::PartialJson(json!({"model": "gpt-4o-mini", "max_tokens": 4096})),
                Matcher::Regex(r#""name":"get_weather""#.to_string()),
                Matcher::Regex(r#""content":"Weather in Berlin\?""#.to_string()),
            ]))
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "choices": [{
                        "finish_reason": "tool_calls",
                        "message": {
                            "role": "assistant",
                            "content": null,
                            "tool_calls": [{
                                "id": "call_abc",
                                "type": "function",
                                "function": {"name": "get_weather", "arguments": "{\"city\":\"Berlin\"}"}
                            }]
                        }
                    }]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let provider = OpenAIProvider::new(
            "sk-test".to_string(),
            "gpt-4o-mini".to_string(),
            Some(format!("{}/v1/", server.url())),
        );
        let response = provider
            .chat(
                vec![Message::system("sys"), Message::user("Weather in Berlin?")],
                Some(vec![weather_tool()]),
                ChatOptions::default(),
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.content, "");
        assert_eq!(response.stop_reason.as_deref(), Some("tool_calls"));
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].id, "call_abc");
        assert_eq!(response.tool_calls[0].arguments, json!({"city": "Berlin"}));
    }

    /// Test Azure deployment URL and api-key header
    #[tokio::test]
    async fn test_azure_deployment_request() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/openai/deployments/gpt-4o/chat/completions")
            .match_query(Matcher::UrlEncoded(
                "api-version".to_string(),
                "2024-10-21".to_string(),
            ))
            .match_header("api-key", "azure-key")
            .with_header("content-type", "application/json")
            .with_body(
                json!({"choices": [{"finish_reason": "stop", "message": {"content": "Sunny."}}]})
                    .to_string(),
            )
            .create_async()
            .await;

        let provider = AzureOpenAIProvider::new(
            "azure-key".to_string(),
            server.url(),
            "gpt-4o".to_string(),
            None,
        );
        let response = provider
            .chat(vec![Message::user("hi")], None, ChatOptions::default())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.content, "Sunny.");
        assert!(response.tool_calls.is_empty());
    }

    /// Test Ollama chat endpoint
    #[tokio::test]
    async fn test_ollama_chat() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/api/chat")
            .match_body(Matcher::PartialJson(json!({"model": "llama3.1", "stream": false})))
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "message": {
                        "role": "assistant",
                        "content": "",
                        "tool_calls": [{"function": {"name": "get_weather", "arguments": {"city": "Tokyo"}}}]
                    },
                    "done": true
                })
                .to_string(),
            )
            .create_async()
            .await;

        let provider = OllamaProvider::new(server.url(), "llama3.1".to_string());
        let response = provider
            .chat(vec![Message::user("Tokyo?")], Some(vec![weather_tool()]), ChatOptions::default())
            .await
            .unwrap();

        assert_eq!(response.tool_calls[0].id, "call_0");
        assert_eq!(response.tool_calls[0].arguments["city"], "Tokyo");
    }

    /// Test client errors surface as LlmError::Api without retrying
    #[tokio::test]
    async fn test_client_error_not_retried() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body(r#"{"error": {"message": "invalid api key"}}"#)
            .expect(1)
            .create_async()
            .await;

        let provider = OpenAIProvider::new("bad".to_string(), "gpt-4o".to_string(), Some(server.url()));
        let client = LlmClient::from_provider(Arc::new(provider), "gpt-4o")
            .with_retry_config(RetryConfig::default());

        let err = client.complete(&[Message::user("hi")], &[]).await.unwrap_err();
        mock.assert_async().await;

        match err.downcast_ref::<LlmError>() {
            Some(LlmError::Api { status, body }) => {
                assert_eq!(*status, 401);
                assert!(body.contains("invalid api key"));
            }
            other => panic!("expected api error, got {:?}", other),
        }
    }

    /// Test an empty choices array is malformed
    #[tokio::test]
    async fn test_malformed_completion() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        let provider = OpenAIProvider::new("k".to_string(), "m".to_string(), Some(server.url()));
        let err = provider
            .chat(vec![Message::user("hi")], None, ChatOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LlmError>(),
            Some(LlmError::MalformedResponse(_))
        ));
    }
}
