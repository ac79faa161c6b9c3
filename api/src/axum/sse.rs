use async_fn_stream::fn_stream;
use axum::response::sse::{Event, KeepAlive, Sse};
use colab::stream::PartialResult;
use futures::{Stream, StreamExt};
use serde::Serialize;
use serde_json::Value;
use std::convert::Infallible;
use tracing::error;

#[derive(Debug, Serialize)]
struct StreamError {
    error: &'static str,
}

fn into_event(result: PartialResult) -> Event {
    let event = match result {
        PartialResult::References(sources) => Event::default()
            .event("references")
            .json_data(sources),
        PartialResult::PartialAnswer(delta) => {
            Event::default().event("partial_answer").json_data(delta)
        }
    };

    event.unwrap_or_else(|_| error_event())
}

fn error_event() -> Event {
    Event::default()
        .event("error")
        .json_data(StreamError {
            error: "Something went wrong!",
        })
        .unwrap_or_else(|_| Event::default().event("error"))
}

/// Turns a stream of results into server-sent events.
///
/// A successful stream ends with a `done` event carrying `done`. A failure
/// ends the stream with a single `error` event.
pub fn respond<S>(stream: S, done: Value) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    S: Stream<Item = anyhow::Result<PartialResult>> + Send + 'static,
{
    let events = fn_stream(|emitter| async move {
        let mut stream = Box::pin(stream);

        while let Some(result) = stream.next().await {
            match result {
                Ok(result) => emitter.emit(into_event(result)).await,
                Err(err) => {
                    error!("Failed to answer: {err:?}");
                    emitter.emit(error_event()).await;
                    return;
                }
            }
        }

        emitter
            .emit(
                Event::default()
                    .event("done")
                    .json_data(done)
                    .unwrap_or_else(|_| Event::default().event("done")),
            )
            .await;
    });

    Sse::new(events.map(Ok::<_, Infallible>)).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;
    use colab::Payload;
    use futures::stream;
    use serde_json::json;

    async fn body_of(stream: Vec<anyhow::Result<PartialResult>>, done: Value) -> String {
        let response = respond(stream::iter(stream), done).into_response();
        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();

        String::from_utf8(body.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn streams_references_then_answer() {
        let body = body_of(
            vec![
                Ok(PartialResult::References(vec![Payload {
                    document_id: "doc_1".into(),
                    document_name: "guide.md".into(),
                    title: None,
                    text: "Run it.".into(),
                    chunk_index: 0,
                }])),
                Ok(PartialResult::PartialAnswer("Hello\nworld".into())),
            ],
            json!({ "chatId": "chat_1" }),
        )
        .await;

        let references = body.find("event: references").unwrap();
        let answer = body.find("event: partial_answer").unwrap();
        let done = body.find("event: done").unwrap();

        assert!(references < answer && answer < done);
        assert!(body.contains(r#"data: "Hello\nworld""#));
        assert!(body.contains(r#"data: {"chatId":"chat_1"}"#));
    }

    #[tokio::test]
    async fn ends_with_an_error_event() {
        let body = body_of(
            vec![
                Ok(PartialResult::PartialAnswer("Hel".into())),
                Err(anyhow::anyhow!("upstream closed")),
                Ok(PartialResult::PartialAnswer("lo".into())),
            ],
            json!({}),
        )
        .await;

        assert!(body.contains(r#"data: {"error":"Something went wrong!"}"#));
        assert!(!body.contains("event: done"));
        assert!(!body.contains(r#""lo""#));
    }
}
