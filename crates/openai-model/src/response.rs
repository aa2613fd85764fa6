use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use loop_agent_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent,
    ToolCallRequest,
};
use pin_project_lite::pin_project;

use crate::Error;
use crate::io::Sse;
use crate::proto::{ChatCompletionChunk, ToolCallDelta};

#[derive(Default)]
struct PartialToolCall {
    index: Option<u32>,
    id: String,
    name: String,
    arguments: String,
}

struct PartialState {
    sse: Sse,
    tool_calls: Vec<PartialToolCall>,
    // Decoded events that are not yet handed out. Tool calls only land here
    // once the model has finished, so their arguments are complete.
    pending: VecDeque<ModelResponseEvent>,
    completed: bool,
    ended: bool,
}

impl PartialState {
    fn merge_tool_call(&mut self, delta: ToolCallDelta) {
        let slot = match delta.index {
            Some(index) => {
                self.tool_calls.iter().position(|t| t.index == Some(index))
            }
            // Without an index, a new id starts a new call and anything
            // else continues the last one.
            None if delta.id.is_some() => None,
            None => self.tool_calls.len().checked_sub(1),
        };
        let slot = slot.unwrap_or_else(|| {
            self.tool_calls.push(PartialToolCall {
                index: delta.index,
                ..Default::default()
            });
            self.tool_calls.len() - 1
        });

        let partial = &mut self.tool_calls[slot];
        if let Some(id) = delta.id.filter(|_| partial.id.is_empty()) {
            partial.id = id;
        }
        if let Some(function) = delta.function {
            if let Some(name) =
                function.name.filter(|_| partial.name.is_empty())
            {
                partial.name = name;
            }
            if let Some(arguments) = function.arguments {
                partial.arguments.push_str(&arguments);
            }
        }
    }

    /// Queues the accumulated tool calls and the completion event.
    fn complete(&mut self, finish_reason: Option<&str>) -> Result<(), Error> {
        let has_tool_calls = !self.tool_calls.is_empty();
        let finish_reason = match finish_reason {
            Some("content_filter") => {
                return Err(Error::new(
                    "the response was blocked by the content filter",
                    ErrorKind::Moderated,
                ));
            }
            Some("tool_calls" | "function_call") => {
                ModelFinishReason::ToolCalls
            }
            _ if has_tool_calls => ModelFinishReason::ToolCalls,
            _ => ModelFinishReason::Stop,
        };

        for (idx, partial) in self.tool_calls.drain(..).enumerate() {
            if partial.name.is_empty() {
                return Err(Error::new(
                    "got a tool call without a name",
                    ErrorKind::MalformedResponse,
                ));
            }
            let id = if partial.id.is_empty() {
                format!("call_{idx}")
            } else {
                partial.id
            };
            self.pending
                .push_back(ModelResponseEvent::ToolCall(ToolCallRequest {
                    id,
                    name: partial.name,
                    arguments: partial.arguments,
                }));
        }
        self.pending
            .push_back(ModelResponseEvent::Completed(finish_reason));
        self.completed = true;
        Ok(())
    }

    fn apply_chunk(&mut self, chunk: ChatCompletionChunk) -> Result<(), Error> {
        if let Some(err) = chunk.error {
            return Err(Error::new(err.message, ErrorKind::Other));
        }
        if let Some(usage) = chunk.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "token usage"
            );
        }
        if self.completed {
            return Ok(());
        }

        for choice in chunk.choices {
            if let Some(content) =
                choice.delta.content.filter(|content| !content.is_empty())
            {
                self.pending
                    .push_back(ModelResponseEvent::MessageDelta(content));
            }
            for tool_call in choice.delta.tool_calls.into_iter().flatten() {
                self.merge_tool_call(tool_call);
            }
            if let Some(finish_reason) = choice.finish_reason {
                self.complete(Some(&finish_reason))?;
            }
        }
        Ok(())
    }
}

type NextEvent = Result<(Option<ModelResponseEvent>, PartialState), Error>;

pin_project! {
    /// A streaming chat completion.
    pub struct OpenAIResponse {
        next_event_fut: Option<BoxFuture<'static, NextEvent>>,
    }
}

impl OpenAIResponse {
    #[inline]
    pub(crate) fn from_sse(sse: Sse) -> Self {
        let partial_state = PartialState {
            sse,
            tool_calls: Default::default(),
            pending: Default::default(),
            completed: false,
            ended: false,
        };
        Self {
            next_event_fut: Some(next_event(partial_state).boxed()),
        }
    }
}

impl ModelResponse for OpenAIResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.project();
        let Some(next_event_fut) = this.next_event_fut else {
            return Poll::Ready(Ok(None));
        };
        let (event, partial_state) = match ready!(next_event_fut.poll_unpin(cx))
        {
            Ok((Some(event), partial_state)) => (event, partial_state),
            Ok((None, _)) => {
                *this.next_event_fut = None;
                return Poll::Ready(Ok(None));
            }
            Err(err) => {
                *this.next_event_fut = None;
                return Poll::Ready(Err(err));
            }
        };

        // The stream may still have more data to pull, create a new future for
        // the next event.
        *this.next_event_fut = Some(next_event(partial_state).boxed());

        Poll::Ready(Ok(Some(event)))
    }
}

async fn next_event(mut partial_state: PartialState) -> NextEvent {
    loop {
        if let Some(event) = partial_state.pending.pop_front() {
            return Ok((Some(event), partial_state));
        }
        if partial_state.ended {
            return Ok((None, partial_state));
        }

        let sse_event = partial_state
            .sse
            .next_event()
            .await
            .map_err(|err| Error::new(err.to_string(), ErrorKind::Other))?;
        let sse_event = match sse_event {
            Some(event) if event.trim() != "[DONE]" => event,
            _ => {
                // Some servers close the stream without a finish reason.
                partial_state.ended = true;
                if !partial_state.completed {
                    partial_state.complete(None)?;
                }
                continue;
            }
        };
        trace!("got sse event: {sse_event}");

        let chunk = serde_json::from_str::<ChatCompletionChunk>(&sse_event)
            .map_err(|err| {
                Error::new(
                    format!("malformed chunk: {err}"),
                    ErrorKind::MalformedResponse,
                )
            })?;
        partial_state.apply_chunk(chunk)?;
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use bytes::Bytes;
    use loop_agent_model::ModelProviderError;

    use super::*;
    use crate::io::Chunks;

    async fn collect_events(
        chunks: &[&'static [u8]],
    ) -> Result<Vec<ModelResponseEvent>, Error> {
        let chunks = Chunks::from_vec_deque(
            chunks.iter().map(|&c| Bytes::from_static(c)).collect(),
        );
        let mut resp = pin!(OpenAIResponse::from_sse(Sse::new(chunks)));
        let mut events = vec![];
        while let Some(event) =
            poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await?
        {
            events.push(event);
        }
        // Polling after completion keeps returning `None`.
        assert_eq!(
            poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await?,
            None
        );
        Ok(events)
    }

    #[tokio::test]
    async fn test_tool_calls() {
        let events = collect_events(&[include_bytes!(
            "../fixtures/tool_calls_response.txt"
        )])
        .await
        .unwrap();
        assert_eq!(
            events,
            [
                ModelResponseEvent::MessageDelta("Let me look ".to_owned()),
                ModelResponseEvent::MessageDelta("them up.".to_owned()),
                ModelResponseEvent::ToolCall(ToolCallRequest {
                    id: "call_a".to_owned(),
                    name: "get_user_details".to_owned(),
                    arguments: r#"{"email": "john@co.com"}"#.to_owned(),
                }),
                ModelResponseEvent::ToolCall(ToolCallRequest {
                    id: "call_b".to_owned(),
                    name: "search_users".to_owned(),
                    arguments: r#"{"subscriptionStatus": "expired"}"#
                        .to_owned(),
                }),
                ModelResponseEvent::Completed(ModelFinishReason::ToolCalls),
            ]
        );
    }

    #[tokio::test]
    async fn test_stream_without_finish_reason() {
        let events = collect_events(&[include_bytes!(
            "../fixtures/text_response.txt"
        )])
        .await
        .unwrap();
        assert_eq!(
            events,
            [
                ModelResponseEvent::MessageDelta("Hello".to_owned()),
                ModelResponseEvent::MessageDelta(
                    ", how can I help?".to_owned()
                ),
                ModelResponseEvent::Completed(ModelFinishReason::Stop),
            ]
        );
    }

    #[tokio::test]
    async fn test_malformed_chunk() {
        let err = collect_events(&[
            b"data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\n",
            b"data: {not json\n\n",
        ])
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    }

    #[tokio::test]
    async fn test_content_filter() {
        let err = collect_events(&[
            b"data: {\"choices\":[{\"delta\":{},\
              \"finish_reason\":\"content_filter\"}]}\n\n",
        ])
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Moderated);
    }

    #[tokio::test]
    async fn test_error_chunk() {
        let err = collect_events(&[
            b"data: {\"error\":{\"message\":\"upstream overloaded\"}}\n\n",
        ])
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
        assert_eq!(err.message(), "upstream overloaded");
    }
}
