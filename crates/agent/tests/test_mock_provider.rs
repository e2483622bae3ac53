//! AgentLoop driven by a mockall Provider

use async_trait::async_trait;
use futures::stream;
use mockall::{mock, Sequence};
use parley_agent::{AgentLoop, FunctionTool, Transcript};
use parley_provider::{
    ChatChunk, ChatParams, ChatStream, Provider, ProviderError, Role, ToolCallDelta,
};

mock! {
    pub Provider {}

    #[async_trait]
    impl Provider for Provider {
        async fn stream_chat(&self, params: ChatParams) -> Result<ChatStream, ProviderError>;
        fn default_model(&self) -> String;
        fn is_configured(&self) -> bool;
    }
}

fn replay(chunks: Vec<ChatChunk>) -> ChatStream {
    Box::pin(stream::iter(chunks.into_iter().map(Ok)))
}

#[tokio::test]
async fn test_request_shape_per_round() {
    let mut mock = MockProvider::new();
    let mut seq = Sequence::new();

    mock.expect_default_model()
        .returning(|| "mock-model".to_string());

    mock.expect_stream_chat()
        .withf(|params| {
            params.model == "mock-model"
                && params.tools.len() == 1
                && params.tools[0].function.name == "get_answer"
                && params.messages.len() == 2
                && params.messages[0].role == Role::System
        })
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| {
            Ok(replay(vec![ChatChunk::tool_call(ToolCallDelta {
                index: 0,
                id: Some("call_1".to_string()),
                name: Some("get_answer".to_string()),
                arguments: Some(String::new()),
            })]))
        });

    mock.expect_stream_chat()
        .withf(|params| {
            params.tools.is_empty()
                && params.messages.len() == 4
                && params.messages[3].tool_call_id.as_deref() == Some("call_1")
                && params.messages[3].content.as_deref() == Some("42")
        })
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(replay(vec![ChatChunk::text("The answer is 42")])));

    let tool = FunctionTool::builder("get_answer")
        .description("The answer")
        .handler(|_| async { Ok("42".to_string()) })
        .build()
        .unwrap();
    let agent = AgentLoop::builder(mock)
        .system_prompt(Some("Answer briefly".to_string()))
        .tool(tool)
        .max_tool_rounds(1)
        .build();

    let mut transcript = Transcript::new();
    let answer = agent
        .prompt("what is it?", &[], &mut transcript, agent.max_tool_rounds())
        .await
        .unwrap();

    assert_eq!(answer, "The answer is 42");
    assert_eq!(transcript.len(), 5);
    transcript.validate().unwrap();
}

#[tokio::test]
async fn test_rate_limit_propagates() {
    let mut mock = MockProvider::new();
    mock.expect_default_model().returning(|| "m".to_string());
    mock.expect_stream_chat()
        .times(1)
        .returning(|_| Err(ProviderError::RateLimited));

    let agent = AgentLoop::builder(mock).build();
    let err = agent.ask("hello").await.unwrap_err();

    assert!(err.to_string().contains("RATE LIMITED"));
}
