//! Server-Sent Events (SSE) processing for streaming responses.
//!
//! This module handles parsing and processing of SSE streams from the
//! generative-language API, converting raw byte streams into structured
//! [`GenerateContentResponse`] chunks and then into plain text chunks.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use crate::observability::{STREAM_BYTES, STREAM_ERRORS, STREAM_EVENTS};
use crate::types::{ApiErrorResponse, GenerateContentResponse};
use crate::{Error, Result};

/// Process a stream of bytes into a stream of server-sent events.
///
/// This function takes a byte stream from an HTTP response and converts it into
/// a stream of parsed responses, handling SSE parsing, buffering, and error
/// conditions.  The stream ends when the byte stream ends.
pub fn process_sse<S>(byte_stream: S) -> impl Stream<Item = Result<GenerateContentResponse>>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
{
    // Raw bytes: a read may end inside a character or a CRLF pair.
    let buffer: Vec<u8> = Vec::new();

    stream::unfold(
        (byte_stream, buffer),
        move |(mut stream, mut buffer)| async move {
            loop {
                // First check if we have a complete event in the buffer
                if let Some((end, rest)) = find_event_end(&buffer) {
                    let event = extract_event(&buffer[..end]);
                    buffer.drain(..rest);
                    match event {
                        Some(event) => return Some((event, (stream, buffer))),
                        None => continue,
                    }
                }

                // Read more data
                match stream.next().await {
                    Some(Ok(bytes)) => {
                        STREAM_BYTES.count(bytes.len() as u64);
                        buffer.extend_from_slice(&bytes);
                    }
                    Some(Err(e)) => {
                        return Some((Err(e), (stream, buffer)));
                    }
                    None => {
                        // End of stream; a final event may lack its blank line
                        let event = extract_event(&buffer);
                        buffer.clear();
                        return event.map(|event| (event, (stream, buffer)));
                    }
                }
            }
        },
    )
}

/// Locate the blank line ending the first event.
///
/// Returns the length of the event and the offset where the next one starts.
/// Accepts LF and CRLF line endings, mixed.
fn find_event_end(buffer: &[u8]) -> Option<(usize, usize)> {
    for (i, byte) in buffer.iter().enumerate() {
        if *byte != b'\n' {
            continue;
        }
        match &buffer[i + 1..] {
            [b'\n', ..] => return Some((i, i + 2)),
            [b'\r', b'\n', ..] => return Some((i, i + 3)),
            _ => {}
        }
    }
    None
}

/// Parse one complete event.
///
/// Returns `None` for events that carry no data (comments and keep-alives).
fn extract_event(event: &[u8]) -> Option<Result<GenerateContentResponse>> {
    let text = match std::str::from_utf8(event) {
        Ok(text) => text,
        Err(e) => {
            return Some(Err(Error::encoding(
                format!("Invalid UTF-8 in stream: {e}"),
                Some(Box::new(e)),
            )));
        }
    };

    let data = text
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|line| line.strip_prefix(' ').unwrap_or(line))
        .collect::<Vec<_>>();
    if data.is_empty() {
        return None;
    }
    let data = data.join("\n");
    STREAM_EVENTS.click();
    Some(parse_data(&data))
}

fn parse_data(data: &str) -> Result<GenerateContentResponse> {
    let value: serde_json::Value = serde_json::from_str(data).map_err(|e| {
        Error::serialization(
            format!("Failed to parse event JSON: {e}"),
            Some(Box::new(e)),
        )
    })?;
    if value.get("error").is_some() {
        let ApiErrorResponse { error } = serde_json::from_value(value)?;
        return Err(Error::streaming(
            format!(
                "{} ({})",
                error.message.unwrap_or_else(|| "backend error".to_string()),
                error.status.unwrap_or_else(|| "UNKNOWN".to_string()),
            ),
            None,
        ));
    }
    Ok(serde_json::from_value(value)?)
}

/// Turn parsed responses into the text chunks a generation cycle consumes.
///
/// Responses without text are dropped; a blocked prompt ends the stream with
/// an error.
///
/// ```
/// # use bytes::Bytes;
/// # use futures::stream::{self, StreamExt};
/// # use aifun::sse::{process_sse, text_chunks};
/// # tokio_test::block_on(async {
/// let body = "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Hi\"}]}}]}\n\n";
/// let bytes = stream::iter(vec![Ok(Bytes::from_static(body.as_bytes()))]);
/// let chunks: Vec<_> = text_chunks(process_sse(bytes)).collect().await;
/// assert_eq!(chunks[0].as_ref().unwrap(), "Hi");
/// # });
/// ```
pub fn text_chunks<S>(events: S) -> impl Stream<Item = Result<String>>
where
    S: Stream<Item = Result<GenerateContentResponse>>,
{
    events.filter_map(|event| async move {
        match event {
            Ok(response) => {
                if let Some(reason) = response.block_reason() {
                    STREAM_ERRORS.click();
                    return Some(Err(Error::streaming(
                        format!("prompt blocked: {reason}"),
                        None,
                    )));
                }
                response.text().map(Ok)
            }
            Err(err) => {
                STREAM_ERRORS.click();
                Some(Err(err))
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes_stream(parts: Vec<&'static str>) -> impl Stream<Item = Result<Bytes>> + Unpin {
        stream::iter(parts.into_iter().map(|p| Ok(Bytes::from_static(p.as_bytes()))))
    }

    async fn collect_text(parts: Vec<&'static str>) -> Vec<Result<String>> {
        let events = process_sse(bytes_stream(parts));
        let chunks = text_chunks(events);
        futures::pin_mut!(chunks);
        let mut out = Vec::new();
        while let Some(chunk) = chunks.next().await {
            out.push(chunk);
        }
        out
    }

    const HELLO: &str = "data: {\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[{\"text\":\"Hello, \"}]}}]}\r\n\r\n";
    const WORLD: &str = "data: {\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[{\"text\":\"world\"}]}}]}\r\n\r\n";
    const USAGE: &str = "data: {\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[]},\"finishReason\":\"STOP\"}],\"usageMetadata\":{\"totalTokenCount\":3}}\r\n\r\n";

    #[tokio::test]
    async fn parses_chunks_in_order() {
        let out = collect_text(vec![HELLO, WORLD, USAGE]).await;
        let texts: Vec<String> = out.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(texts, vec!["Hello, ".to_string(), "world".to_string()]);
    }

    #[tokio::test]
    async fn events_split_across_reads() {
        let (a, b) = HELLO.split_at(17);
        let out = collect_text(vec![a, b]).await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_ref().unwrap(), "Hello, ");
    }

    #[tokio::test]
    async fn multibyte_character_split_across_reads() {
        let body = "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"café\"}]}}]}\n\n";
        let split = body.find('é').unwrap() + 1;
        let (a, b) = body.as_bytes().split_at(split);
        let parts = stream::iter(vec![
            Ok(Bytes::copy_from_slice(a)),
            Ok(Bytes::copy_from_slice(b)),
        ]);
        let chunks: Vec<_> = text_chunks(process_sse(parts)).collect().await;
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_ref().unwrap(), "café");
    }

    #[tokio::test]
    async fn crlf_pair_split_across_reads() {
        let out = collect_text(vec![
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"A\"}]}}]}\r\n\r",
            "\ndata: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"B\"}]}}]}\r",
            "\n\r\n",
        ])
        .await;
        let texts: Vec<String> = out.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(texts, vec!["A".to_string(), "B".to_string()]);
    }

    #[tokio::test]
    async fn invalid_utf8_is_an_encoding_error() {
        let parts = stream::iter(vec![Ok(Bytes::from_static(b"data: \xff\xfe\n\n"))]);
        let events: Vec<_> = process_sse(parts).collect().await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Err(Error::Encoding { .. })));
    }

    #[test]
    fn event_end_accepts_mixed_line_endings() {
        assert_eq!(find_event_end(b"data: x\n\nrest"), Some((7, 9)));
        assert_eq!(find_event_end(b"data: x\r\n\r\nrest"), Some((8, 11)));
        assert_eq!(find_event_end(b"data: x\r\n\r"), None);
        assert_eq!(find_event_end(b"data: x\n"), None);
    }

    #[tokio::test]
    async fn keepalive_comments_are_skipped() {
        let out = collect_text(vec![": keep-alive\n\n", WORLD]).await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_ref().unwrap(), "world");
    }

    #[tokio::test]
    async fn trailing_event_without_blank_line() {
        let out = collect_text(vec![
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"end\"}]}}]}",
        ])
        .await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_ref().unwrap(), "end");
    }

    #[tokio::test]
    async fn error_payload_is_a_stream_error() {
        let out = collect_text(vec![
            HELLO,
            "data: {\"error\":{\"code\":500,\"message\":\"internal\",\"status\":\"INTERNAL\"}}\n\n",
        ])
        .await;
        assert_eq!(out.len(), 2);
        assert!(out[0].is_ok());
        let err = out[1].as_ref().unwrap_err();
        assert!(err.is_streaming());
        assert!(err.to_string().contains("internal (INTERNAL)"));
    }

    #[tokio::test]
    async fn blocked_prompt_is_a_stream_error() {
        let out =
            collect_text(vec!["data: {\"promptFeedback\":{\"blockReason\":\"SAFETY\"}}\n\n"]).await;
        assert_eq!(out.len(), 1);
        assert!(out[0].as_ref().unwrap_err().to_string().contains("SAFETY"));
    }

    #[tokio::test]
    async fn transport_error_is_forwarded() {
        let parts = stream::iter(vec![
            Ok(Bytes::from_static(HELLO.as_bytes())),
            Err(Error::streaming("connection reset", None)),
        ]);
        let chunks = text_chunks(process_sse(parts));
        futures::pin_mut!(chunks);
        assert_eq!(chunks.next().await.unwrap().unwrap(), "Hello, ");
        assert!(chunks.next().await.unwrap().is_err());
    }

    #[tokio::test]
    async fn malformed_json() {
        let out = collect_text(vec!["data: {not json}\n\n"]).await;
        assert!(matches!(out[0], Err(Error::Serialization { .. })));
    }
}
