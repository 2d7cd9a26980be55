use std::time::Duration;

use anyhow::{Error, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error as ThisError;
use tokio::sync::mpsc;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "system")]
    System,
    #[serde(rename = "assistant")]
    Assistant,
    #[serde(rename = "user")]
    User,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: &str) -> Self {
        Message {
            role,
            content: content.to_string(),
        }
    }
}

/// Failures a caller needs to tell apart from a generic transport
/// error.
#[derive(Debug, ThisError)]
pub enum CompletionError {
    #[error("Missing API key for the completion service (set OPENAI_API_KEY)")]
    MissingApiKey,
}

/// A hosted chat completion service that streams its response.
///
/// Implementations send each text fragment through `tx` in the order
/// it arrives and return once the stream has ended. The sender is
/// dropped on return which closes the channel for the consumer.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn stream(
        &self,
        tx: mpsc::UnboundedSender<String>,
        messages: &[Message],
    ) -> Result<(), Error>;
}

/// Client for an OpenAI compatible chat completions API.
#[derive(Clone, Debug)]
pub struct OpenAICompletion {
    api_hostname: String,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
}

impl OpenAICompletion {
    pub fn new(api_hostname: &str, api_key: Option<&str>, model: &str, max_tokens: u32) -> Self {
        Self {
            api_hostname: api_hostname.to_string(),
            api_key: api_key.map(String::from),
            model: model.to_string(),
            max_tokens,
        }
    }
}

#[async_trait]
impl CompletionService for OpenAICompletion {
    async fn stream(
        &self,
        tx: mpsc::UnboundedSender<String>,
        messages: &[Message],
    ) -> Result<(), Error> {
        // An empty key is treated the same as an unset one
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(CompletionError::MissingApiKey)?;

        completion_stream(
            tx,
            messages,
            &self.api_hostname,
            api_key,
            &self.model,
            self.max_tokens,
        )
        .await
    }
}

#[derive(Debug, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionChunkChoice {
    delta: Delta,
    #[allow(dead_code)]
    finish_reason: Option<String>,
}

// Some providers (Azure) send a first chunk with an empty `choices`
// array holding content filter results, so everything else is
// optional.
#[derive(Debug, Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    choices: Vec<CompletionChunkChoice>,
}

/// Streams a chat completion, sending each content fragment through
/// `tx` as it arrives.
pub async fn completion_stream(
    tx: mpsc::UnboundedSender<String>,
    messages: &[Message],
    api_hostname: &str,
    api_key: &str,
    model: &str,
    max_tokens: u32,
) -> Result<(), Error> {
    let payload = json!({
        "model": model,
        "messages": messages,
        "max_tokens": max_tokens,
        "stream": true,
    });
    let url = format!("{}/v1/chat/completions", api_hostname.trim_end_matches("/"));
    let response = reqwest::Client::new()
        .post(url)
        .bearer_auth(api_key)
        .header("Content-Type", "application/json")
        .timeout(Duration::from_secs(60 * 5))
        .json(&payload)
        .send()
        .await?
        .error_for_status()?;

    let mut stream = response.bytes_stream();
    // Raw bytes, a multi-byte character can be split across chunks
    let mut buffer: Vec<u8> = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;

        // Append new data to buffer. This is necessary to handle SSE
        // fragmentation over HTTP/2 frames. Raw carriage returns can
        // only be CRLF line endings since JSON escapes them.
        buffer.extend(chunk.iter().copied().filter(|b| *b != b'\r'));

        while let Some(event_end) = find_event_end(&buffer) {
            let event: Vec<u8> = buffer.drain(..event_end + 2).collect();
            let event_data = std::str::from_utf8(&event)?;

            if forward_event(&tx, event_data)? == SseEvent::Done {
                return Ok(());
            }
        }
    }

    // The final event may not be terminated by a blank line
    if !buffer.is_empty() {
        forward_event(&tx, std::str::from_utf8(&buffer)?)?;
    }

    Ok(())
}

fn forward_event(tx: &mpsc::UnboundedSender<String>, event_data: &str) -> Result<SseEvent, Error> {
    let event = parse_event(event_data)?;
    if let SseEvent::Fragments(fragments) = &event {
        for fragment in fragments {
            // The consumer may have gone away but the stream is
            // still drained to completion
            let _ = tx.send(fragment.clone());
        }
    }
    Ok(event)
}

fn find_event_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|w| w == b"\n\n")
}

#[derive(Debug, PartialEq)]
enum SseEvent {
    Skip,
    Done,
    Fragments(Vec<String>),
}

fn parse_event(event_data: &str) -> Result<SseEvent, Error> {
    let event_data = event_data.trim();
    let Some(data) = event_data.strip_prefix("data:") else {
        return Ok(SseEvent::Skip);
    };
    let data = data.trim();

    // Data can sometimes be empty
    if data.is_empty() {
        return Ok(SseEvent::Skip);
    }
    if data == "[DONE]" {
        return Ok(SseEvent::Done);
    }

    let chunk = serde_json::from_str::<CompletionChunk>(data).inspect_err(|e| {
        tracing::error!("Parsing completion chunk failed for {}\nError:{}", data, e)
    })?;
    let fragments = chunk
        .choices
        .into_iter()
        .filter_map(|choice| choice.delta.content)
        .filter(|content| !content.is_empty())
        .collect();

    Ok(SseEvent::Fragments(fragments))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    async fn collect(mut rx: mpsc::UnboundedReceiver<String>) -> Vec<String> {
        let mut out = Vec::new();
        while let Some(fragment) = rx.recv().await {
            out.push(fragment);
        }
        out
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::System).unwrap(), r#""system""#);
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            r#""assistant""#
        );
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), r#""user""#);
    }

    #[test]
    fn test_message_new() {
        let msg = Message::new(Role::User, "Hello world");
        assert_eq!(
            serde_json::to_string(&msg).unwrap(),
            r#"{"role":"user","content":"Hello world"}"#
        );
    }

    #[test]
    fn test_parse_event_content() {
        let event = r#"data: {"id":"chunk1","choices":[{"index":0,"delta":{"content":"Hello"},"finish_reason":null}]}"#;
        assert_eq!(
            parse_event(event).unwrap(),
            SseEvent::Fragments(vec!["Hello".to_string()])
        );
    }

    #[test]
    fn test_parse_event_role_only_delta() {
        let event = r#"data: {"choices":[{"index":0,"delta":{"role":"assistant"},"finish_reason":null}]}"#;
        assert_eq!(parse_event(event).unwrap(), SseEvent::Fragments(vec![]));
    }

    #[test]
    fn test_parse_event_empty_choices() {
        let event = r#"data: {"id":"","choices":[],"prompt_filter_results":[]}"#;
        assert_eq!(parse_event(event).unwrap(), SseEvent::Fragments(vec![]));
    }

    #[test]
    fn test_parse_event_done_and_comments() {
        assert_eq!(parse_event("data: [DONE]").unwrap(), SseEvent::Done);
        assert_eq!(parse_event(": keep-alive").unwrap(), SseEvent::Skip);
        assert_eq!(parse_event("data: ").unwrap(), SseEvent::Skip);
    }

    #[test]
    fn test_parse_event_invalid_json() {
        assert!(parse_event("data: {not json").is_err());
    }

    #[test]
    fn test_find_event_end_waits_for_blank_line() {
        let mut buffer = b"data: {\"choices\":[]}\n".to_vec();
        assert_eq!(find_event_end(&buffer), None);

        buffer.extend_from_slice(b"\ndata: [DO");
        assert_eq!(find_event_end(&buffer), Some(20));
    }

    #[tokio::test]
    async fn test_missing_api_key_is_typed_error() {
        let client = OpenAICompletion::new("http://127.0.0.1:1", None, "gpt-4", 800);
        let (tx, _rx) = mpsc::unbounded_channel();
        let err = client
            .stream(tx, &[Message::new(Role::User, "Hi")])
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CompletionError>(),
            Some(CompletionError::MissingApiKey)
        ));
    }

    #[tokio::test]
    async fn test_blank_api_key_is_missing() {
        let client = OpenAICompletion::new("http://127.0.0.1:1", Some("  "), "gpt-4", 800);
        let (tx, _rx) = mpsc::unbounded_channel();
        let err = client.stream(tx, &[]).await.unwrap_err();
        assert!(err.downcast_ref::<CompletionError>().is_some());
    }

    #[tokio::test]
    async fn test_completion_stream_content() {
        let mut server = mockito::Server::new_async().await;

        let sse_response = r#"data: {"id":"chunk1","choices":[{"index":0,"delta":{"role":"assistant","content":""},"finish_reason":null}]}

data: {"id":"chunk2","choices":[{"index":0,"delta":{"content":"Hello"},"finish_reason":null}]}

data: {"id":"chunk3","choices":[{"index":0,"delta":{"content":" World"},"finish_reason":null}]}

data: {"id":"chunk4","choices":[{"index":0,"delta":{"content":"!"},"finish_reason":"stop"}]}

data: [DONE]

"#;

        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "model": "gpt-4",
                "max_tokens": 800,
                "stream": true,
            })))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(sse_response)
            .create_async()
            .await;

        let client = OpenAICompletion::new(&server.url(), Some("test-key"), "gpt-4", 800);
        let (tx, rx) = mpsc::unbounded_channel();
        let messages = vec![Message::new(Role::User, "Say hello")];

        let result = client.stream(tx, &messages).await;

        mock.assert_async().await;
        assert!(result.is_ok());
        assert_eq!(collect(rx).await, vec!["Hello", " World", "!"]);
    }

    #[tokio::test]
    async fn test_completion_stream_server_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let client = OpenAICompletion::new(&server.url(), Some("test-key"), "gpt-4", 800);
        let (tx, _rx) = mpsc::unbounded_channel();
        let result = client.stream(tx, &[Message::new(Role::User, "Hi")]).await;

        assert!(result.is_err());
        assert!(result.unwrap_err().downcast_ref::<CompletionError>().is_none());
    }

    #[tokio::test]
    async fn test_completion_stream_across_chunk_boundaries() {
        const SSE_RESPONSE: &str = "data: {\"choices\":[{\"delta\":{\"content\":\"Caf\u{e9} \"}}]}\n\ndata: {\"choices\":[{\"delta\":{\"content\":\"ol\u{e9}\"}}]}\n\ndata: [DONE]\n\n";

        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_chunked_body(|w| {
                let bytes = SSE_RESPONSE.as_bytes();
                // Inside the two bytes of the first "\u{e9}"
                let mid_char = SSE_RESPONSE.find('\u{e9}').unwrap() + 1;
                // Inside the JSON of the second event
                let mid_json = SSE_RESPONSE.find("ol").unwrap();
                w.write_all(&bytes[..mid_char])?;
                w.flush()?;
                w.write_all(&bytes[mid_char..mid_json])?;
                w.flush()?;
                w.write_all(&bytes[mid_json..])
            })
            .create_async()
            .await;

        let client = OpenAICompletion::new(&server.url(), Some("test-key"), "gpt-4", 800);
        let (tx, rx) = mpsc::unbounded_channel();
        client
            .stream(tx, &[Message::new(Role::User, "Hi")])
            .await
            .unwrap();

        assert_eq!(collect(rx).await, vec!["Caf\u{e9} ", "ol\u{e9}"]);
    }

    #[tokio::test]
    async fn test_completion_stream_with_crlf_line_endings() {
        let mut server = mockito::Server::new_async().await;
        let sse_response = "data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"}}]}\r\n\r\ndata: {\"choices\":[{\"delta\":{\"content\":\" there\"}}]}\r\n\r\ndata: [DONE]\r\n\r\n";
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(sse_response)
            .create_async()
            .await;

        let client = OpenAICompletion::new(&server.url(), Some("test-key"), "gpt-4", 800);
        let (tx, rx) = mpsc::unbounded_channel();
        client
            .stream(tx, &[Message::new(Role::User, "Hi")])
            .await
            .unwrap();

        assert_eq!(collect(rx).await, vec!["Hello", " there"]);
    }

    #[tokio::test]
    async fn test_completion_stream_without_done_marker() {
        let mut server = mockito::Server::new_async().await;

        // Stream ends without `[DONE]` and without a trailing blank line
        let sse_response = "data: {\"choices\":[{\"delta\":{\"content\":\"sounds \"}}]}\n\ndata: {\"choices\":[{\"delta\":{\"content\":\"great\"}}]}";

        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(sse_response)
            .create_async()
            .await;

        let client = OpenAICompletion::new(&server.url(), Some("test-key"), "gpt-4", 800);
        let (tx, rx) = mpsc::unbounded_channel();
        client
            .stream(tx, &[Message::new(Role::User, "Hi")])
            .await
            .unwrap();

        assert_eq!(collect(rx).await.concat(), "sounds great");
    }
}
