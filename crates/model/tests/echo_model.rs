use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::future::{poll_fn, ready};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{self, Poll, ready};
use std::time::Duration;

use loop_agent_model::{
    AssistantMessage, ErrorKind, ModelFinishReason, ModelMessage,
    ModelProvider, ModelProviderError, ModelRequest, ModelResponse,
    ModelResponseEvent, ToolCallRequest,
};
use tokio::time::{Sleep, sleep};

#[derive(Debug)]
struct EchoModelError(ErrorKind);

impl Display for EchoModelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Error for EchoModelError {}

impl ModelProviderError for EchoModelError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

/// Streams back "You said <input>" word by word. If the input mentions
/// "lookup", it asks for a tool call instead.
#[derive(Debug)]
struct EchoModelResponse {
    events: VecDeque<ModelResponseEvent>,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl EchoModelResponse {
    fn new(input: &str) -> Self {
        let mut events: VecDeque<_> = VecDeque::new();
        if input.contains("lookup") {
            events.push_back(ModelResponseEvent::ToolCall(ToolCallRequest::new(
                "call_0",
                "lookup",
                format!(r#"{{"query":"{input}"}}"#),
            )));
            events.push_back(ModelResponseEvent::Completed(
                ModelFinishReason::ToolCalls,
            ));
        } else {
            let words: Vec<_> = format!("You said {input}")
                .split(' ')
                .map(ToString::to_string)
                .collect();
            let count = words.len();
            for (idx, mut word) in words.into_iter().enumerate() {
                if idx + 1 < count {
                    word.push(' ');
                }
                events.push_back(ModelResponseEvent::MessageDelta(word));
            }
            events.push_back(ModelResponseEvent::Completed(
                ModelFinishReason::Stop,
            ));
        }
        Self {
            events,
            sleep: None,
        }
    }
}

impl ModelResponse for EchoModelResponse {
    type Error = EchoModelError;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.get_mut();
        let sleep = this
            .sleep
            .get_or_insert_with(|| Box::pin(sleep(Duration::from_millis(1))));
        ready!(sleep.as_mut().poll(cx));
        this.sleep = None;
        Poll::Ready(Ok(this.events.pop_front()))
    }
}

struct EchoModelProvider;

impl ModelProvider for EchoModelProvider {
    type Error = EchoModelError;
    type Response = EchoModelResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let last_user_input =
            req.messages.iter().rev().find_map(|msg| match msg {
                ModelMessage::User(text) => Some(text.as_str()),
                _ => None,
            });
        let result = match last_user_input {
            Some(input) => Ok(EchoModelResponse::new(input)),
            None => Err(EchoModelError(ErrorKind::Other)),
        };
        ready(result)
    }
}

async fn collect(
    mut resp: EchoModelResponse,
) -> (AssistantMessage, Option<ModelFinishReason>) {
    let mut msg = AssistantMessage::default();
    let mut finish_reason = None;
    loop {
        let event = poll_fn(|cx| Pin::new(&mut resp).poll_next_event(cx))
            .await
            .unwrap();
        match event {
            Some(ModelResponseEvent::MessageDelta(delta)) => {
                msg.content.push_str(&delta)
            }
            Some(ModelResponseEvent::ToolCall(req)) => msg.tool_calls.push(req),
            Some(ModelResponseEvent::Completed(reason)) => {
                finish_reason = Some(reason)
            }
            None => break,
        }
    }
    (msg, finish_reason)
}

#[tokio::test]
async fn test_text_completion() {
    let provider = EchoModelProvider;
    let req = ModelRequest {
        messages: vec![
            ModelMessage::System("Be brief.".to_owned()),
            ModelMessage::User("Good morning".to_owned()),
        ],
        ..Default::default()
    };
    let resp = provider.send_request(&req).await.unwrap();
    let (msg, finish_reason) = collect(resp).await;

    assert_eq!(msg.content, "You said Good morning");
    assert!(!msg.has_tool_calls());
    assert_eq!(finish_reason, Some(ModelFinishReason::Stop));
}

#[tokio::test]
async fn test_tool_call_completion() {
    let provider = Arc::new(EchoModelProvider);
    let req = ModelRequest {
        messages: vec![ModelMessage::User("lookup john".to_owned())],
        ..Default::default()
    };
    let resp = provider.send_request(&req).await.unwrap();
    let (msg, finish_reason) = collect(resp).await;

    assert!(!msg.has_text());
    assert_eq!(msg.tool_calls.len(), 1);
    assert_eq!(
        msg.tool_calls[0],
        ToolCallRequest::new("call_0", "lookup", r#"{"query":"lookup john"}"#)
    );
    assert_eq!(finish_reason, Some(ModelFinishReason::ToolCalls));
}

#[tokio::test]
async fn test_error() {
    let provider = EchoModelProvider;
    let req = ModelRequest::default();
    let err = provider.send_request(&req).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Other);
    assert!(!err.kind().is_transient());
}
