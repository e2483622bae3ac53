//! HTTP-level tests for the streaming chat-completions client

use futures::StreamExt;
use mockito::{Matcher, Server};
use parley_provider::{
    ChatChunk, ChatParams, Message, OpenAiProvider, Provider, ProviderError, Tool,
};
use serde_json::json;

fn sse(events: &[&str]) -> String {
    events
        .iter()
        .map(|data| format!("data: {}\n\n", data))
        .collect()
}

async fn collect(provider: &OpenAiProvider, params: ChatParams) -> Vec<ChatChunk> {
    let stream = provider.stream_chat(params).await.unwrap();
    stream.map(|chunk| chunk.unwrap()).collect().await
}

fn params() -> ChatParams {
    ChatParams {
        model: "test-model".to_string(),
        messages: vec![Message::user("hi")],
        ..Default::default()
    }
}

#[tokio::test]
async fn test_streams_text_until_done() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer sk-test")
        .match_body(Matcher::PartialJson(json!({"model": "test-model", "stream": true})))
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(sse(&[
            r#"{"choices":[{"delta":{"role":"assistant"}}]}"#,
            r#"{"choices":[{"delta":{"content":"Hello"}}]}"#,
            r#"{"choices":[]}"#,
            r#"{"choices":[{"delta":{"content":", world"},"finish_reason":"stop"}]}"#,
            "[DONE]",
            r#"{"choices":[{"delta":{"content":"ignored"}}]}"#,
        ]))
        .create_async()
        .await;

    let provider = OpenAiProvider::new("sk-test", Some(server.url()), None);
    let chunks = collect(&provider, params()).await;

    let text: String = chunks.iter().filter_map(|c| c.content.as_deref()).collect();
    assert_eq!(text, "Hello, world");
    assert_eq!(chunks.last().unwrap().finish_reason.as_deref(), Some("stop"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_streams_tool_call_fragments() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::PartialJson(json!({"tools": [{"type": "function"}]})))
        .with_header("content-type", "text/event-stream")
        .with_body(sse(&[
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_1","function":{"name":"search","arguments":""}}]}}]}"#,
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"{\"q"}}]}}]}"#,
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"\":1}"}}]}}]}"#,
            "[DONE]",
        ]))
        .create_async()
        .await;

    let provider = OpenAiProvider::new("sk-test", Some(server.url()), None);
    let mut request = params();
    request.tools = vec![Tool::new("search", "Search", json!({"type": "object"}))];
    let chunks = collect(&provider, request).await;

    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0].tool_calls[0].id.as_deref(), Some("call_1"));
    let args: String = chunks
        .iter()
        .filter_map(|c| c.tool_calls[0].arguments.as_deref())
        .collect();
    assert_eq!(args, "{\"q\":1}");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_rate_limited() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(429)
        .with_body(r#"{"error":{"message":"slow down"}}"#)
        .create_async()
        .await;

    let provider = OpenAiProvider::new("sk-test", Some(server.url()), None);
    let result = provider.stream_chat(params()).await;
    assert!(matches!(result, Err(ProviderError::RateLimited)));
}

#[tokio::test]
async fn test_http_error_message() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(401)
        .with_body(r#"{"error":{"message":"invalid api key"}}"#)
        .create_async()
        .await;

    let provider = OpenAiProvider::new("sk-bad", Some(server.url()), None);
    match provider.stream_chat(params()).await {
        Err(ProviderError::Api(message)) => assert_eq!(message, "invalid api key"),
        Err(other) => panic!("Expected Api error, got {:?}", other),
        Ok(_) => panic!("Expected Api error, got a stream"),
    }
}

#[tokio::test]
async fn test_error_inside_stream() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_header("content-type", "text/event-stream")
        .with_body(sse(&[
            r#"{"choices":[{"delta":{"content":"par"}}]}"#,
            r#"{"error":{"message":"upstream overloaded"}}"#,
        ]))
        .create_async()
        .await;

    let provider = OpenAiProvider::new("sk-test", Some(server.url()), None);
    let mut stream = provider.stream_chat(params()).await.unwrap();

    assert_eq!(
        stream.next().await.unwrap().unwrap().content.as_deref(),
        Some("par")
    );
    match stream.next().await.unwrap() {
        Err(ProviderError::Api(message)) => assert_eq!(message, "upstream overloaded"),
        other => panic!("Expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_key_rejected_before_request() {
    let provider = OpenAiProvider::new("", Some("http://127.0.0.1:9".to_string()), None);
    assert!(matches!(
        provider.stream_chat(params()).await,
        Err(ProviderError::NoApiKey)
    ));
}
