use crate::LanguageModelError;
use eventsource_stream::{Event, EventStreamError, Eventsource};
use futures::{stream::StreamExt, Stream};
use reqwest::{header::HeaderMap, Client, Response};
use serde::{de::DeserializeOwned, Serialize};
use std::pin::Pin;

pub type ChunkStream<R> = Pin<Box<dyn Stream<Item = Result<R, LanguageModelError>> + Send>>;

/// POST a JSON body and return the response, failing on any non-2xx status
/// with the body text attached.
async fn post_json<T: Serialize>(
    client: &Client,
    url: &str,
    data: &T,
    headers: HeaderMap,
) -> Result<Response, LanguageModelError> {
    let response = client.post(url).headers(headers).json(data).send().await?;
    let status = response.status();

    if status.is_success() {
        Ok(response)
    } else {
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(%status, "provider returned an error status");
        Err(LanguageModelError::StatusCode(status, body))
    }
}

/// Create a JSON request, parse the JSON response.
pub async fn send_json<T: Serialize, R: DeserializeOwned>(
    client: &Client,
    url: &str,
    data: &T,
    headers: HeaderMap,
) -> Result<R, LanguageModelError> {
    let response = post_json(client, url, data, headers).await?;
    Ok(response.json::<R>().await?)
}

/// Create a JSON request that answers with server-sent events and expose the
/// `data` payload of each event as a typed chunk.
///
/// Empty events are skipped and a `[DONE]` sentinel ends the stream.
pub async fn send_sse_stream<T: Serialize, R: DeserializeOwned + Send + 'static>(
    client: &Client,
    url: &str,
    data: &T,
    headers: HeaderMap,
    provider: &'static str,
) -> Result<ChunkStream<R>, LanguageModelError> {
    let response = post_json(client, url, data, headers).await?;
    let mut events = response.bytes_stream().eventsource();

    let stream = async_stream::try_stream! {
        while let Some(event) = events.next().await {
            let Some(chunk) = parse_event::<R>(event, provider)? else {
                continue;
            };
            if let SseChunk::Data(chunk) = chunk {
                yield chunk;
            } else {
                break;
            }
        }
    };

    Ok(Box::pin(stream))
}

enum SseChunk<R> {
    Data(R),
    Done,
}

fn parse_event<R: DeserializeOwned>(
    event: Result<Event, EventStreamError<reqwest::Error>>,
    provider: &'static str,
) -> Result<Option<SseChunk<R>>, LanguageModelError> {
    let event = match event {
        Ok(event) => event,
        Err(EventStreamError::Utf8(_)) => {
            return Err(LanguageModelError::Invariant(
                provider,
                "Receive invalid UTF-8 sequence for stream data".to_string(),
            ));
        }
        Err(EventStreamError::Parser(error)) => {
            return Err(LanguageModelError::Invariant(
                provider,
                format!("Receive invalid EventStream data: {error}"),
            ));
        }
        Err(EventStreamError::Transport(error)) => {
            return Err(LanguageModelError::Transport(error));
        }
    };

    if event.data.is_empty() {
        return Ok(None);
    }
    if event.data == "[DONE]" {
        return Ok(Some(SseChunk::Done));
    }

    serde_json::from_str(&event.data)
        .map(|chunk| Some(SseChunk::Data(chunk)))
        .map_err(|e| {
            LanguageModelError::Invariant(provider, format!("Failed to parse stream chunk: {e}"))
        })
}
