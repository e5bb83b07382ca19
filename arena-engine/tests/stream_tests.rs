//! Integration tests for the stream consumer against a real SSE endpoint
//!
//! Each test spins up an axum server on an ephemeral port, scripts the
//! frames it pushes, and drives a real `StreamConsumer` over the wire.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use arena_common::events::DebateEvent;
use arena_common::ArenaConfig;
use arena_engine::{StreamConsumer, StreamError};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures::stream::Stream;
use std::convert::Infallible;
use uuid::Uuid;

/// One scripted action of the fixture stream
#[derive(Debug, Clone)]
enum ScriptStep {
    Status(&'static str),
    Round {
        number: u32,
        first: &'static str,
        second: &'static str,
    },
    /// A `new_round` frame with an unparseable payload
    Garbage,
    /// A heartbeat comment line
    Heartbeat,
    End,
    Pause(u64),
    /// Close the connection without a terminal frame
    Disconnect,
}

struct Fixture {
    debate_id: Uuid,
    steps: Vec<ScriptStep>,
}

fn script_stream(steps: Vec<ScriptStep>) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        for step in steps {
            match step {
                ScriptStep::Status(text) => {
                    yield Ok(Event::default().event("status").data(text));
                }
                ScriptStep::Round { number, first, second } => {
                    let payload = serde_json::json!({
                        "number": number,
                        "mind1_arg": first,
                        "mind2_arg": second,
                    });
                    yield Ok(Event::default().event("new_round").data(payload.to_string()));
                }
                ScriptStep::Garbage => {
                    yield Ok(Event::default().event("new_round").data("this is not json"));
                }
                ScriptStep::Heartbeat => {
                    yield Ok(Event::default().comment("heartbeat"));
                }
                ScriptStep::End => {
                    yield Ok(Event::default().event("end").data(""));
                }
                ScriptStep::Pause(ms) => {
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                }
                ScriptStep::Disconnect => {
                    break;
                }
            }
        }
    }
}

async fn stream_handler(
    State(fixture): State<Arc<Fixture>>,
    Path(debate_id): Path<Uuid>,
) -> Response {
    if debate_id != fixture.debate_id {
        return StatusCode::NOT_FOUND.into_response();
    }
    Sse::new(script_stream(fixture.steps.clone())).into_response()
}

/// Serve the scripted stream, returning the bound address
async fn serve(fixture: Arc<Fixture>) -> SocketAddr {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let app = Router::new()
        .route("/api/debates/stream/:id", get(stream_handler))
        .with_state(fixture);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    addr
}

fn test_config(addr: SocketAddr) -> ArenaConfig {
    ArenaConfig {
        api_base_url: format!("http://{}", addr),
        create_timeout_secs: 5,
        connect_timeout_secs: 5,
        request_timeout_secs: 5,
        event_channel_capacity: 64,
    }
}

async fn collect_events(consumer: &mut StreamConsumer) -> Vec<DebateEvent> {
    let mut events = Vec::new();
    while let Ok(Some(event)) =
        tokio::time::timeout(Duration::from_secs(5), consumer.next_event()).await
    {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_stream_delivers_events_in_arrival_order() {
    let fixture = Arc::new(Fixture {
        debate_id: Uuid::new_v4(),
        steps: vec![
            ScriptStep::Status("debating"),
            ScriptStep::Round {
                number: 1,
                first: "opening for",
                second: "opening against",
            },
            ScriptStep::Heartbeat,
            ScriptStep::Round {
                number: 2,
                first: "closing for",
                second: "closing against",
            },
            ScriptStep::Status("completed"),
        ],
    });
    let addr = serve(fixture.clone()).await;
    let config = test_config(addr);
    let http = arena_engine::build_http_client(&config).expect("client");

    let mut consumer = StreamConsumer::open(&http, &config, fixture.debate_id, 2)
        .await
        .expect("stream opens");
    let events = collect_events(&mut consumer).await;

    let types: Vec<&str> = events.iter().map(|e| e.event_type()).collect();
    assert_eq!(types, vec!["Status", "NewRound", "NewRound", "Status"]);

    match &events[1] {
        DebateEvent::NewRound { round, .. } => {
            assert_eq!(round.number, 1);
            assert_eq!(round.first_argument, "opening for");
            assert_eq!(round.second_argument, "opening against");
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_frame_is_dropped_not_fatal() {
    let fixture = Arc::new(Fixture {
        debate_id: Uuid::new_v4(),
        steps: vec![
            ScriptStep::Garbage,
            ScriptStep::Round {
                number: 1,
                first: "a",
                second: "b",
            },
            ScriptStep::End,
        ],
    });
    let addr = serve(fixture.clone()).await;
    let config = test_config(addr);
    let http = arena_engine::build_http_client(&config).expect("client");

    let mut consumer = StreamConsumer::open(&http, &config, fixture.debate_id, 1)
        .await
        .expect("stream opens");
    let events = collect_events(&mut consumer).await;

    // The garbage frame vanished; everything after it still arrived
    let types: Vec<&str> = events.iter().map(|e| e.event_type()).collect();
    assert_eq!(types, vec!["NewRound", "End"]);
}

#[tokio::test]
async fn test_disconnect_before_completion_is_transport_error() {
    let fixture = Arc::new(Fixture {
        debate_id: Uuid::new_v4(),
        steps: vec![
            ScriptStep::Status("debating"),
            ScriptStep::Round {
                number: 1,
                first: "a",
                second: "b",
            },
            ScriptStep::Disconnect,
        ],
    });
    let addr = serve(fixture.clone()).await;
    let config = test_config(addr);
    let http = arena_engine::build_http_client(&config).expect("client");

    let mut consumer = StreamConsumer::open(&http, &config, fixture.debate_id, 3)
        .await
        .expect("stream opens");
    let events = collect_events(&mut consumer).await;

    assert_eq!(events.len(), 3);
    assert!(matches!(
        events.last(),
        Some(DebateEvent::TransportError { .. })
    ));
}

#[tokio::test]
async fn test_disconnect_after_completion_is_clean() {
    let fixture = Arc::new(Fixture {
        debate_id: Uuid::new_v4(),
        steps: vec![
            ScriptStep::Round {
                number: 1,
                first: "a",
                second: "b",
            },
            ScriptStep::End,
        ],
    });
    let addr = serve(fixture.clone()).await;
    let config = test_config(addr);
    let http = arena_engine::build_http_client(&config).expect("client");

    let mut consumer = StreamConsumer::open(&http, &config, fixture.debate_id, 1)
        .await
        .expect("stream opens");
    let events = collect_events(&mut consumer).await;

    // EOF after the end frame must not be reported as a transport error
    let types: Vec<&str> = events.iter().map(|e| e.event_type()).collect();
    assert_eq!(types, vec!["NewRound", "End"]);
}

#[tokio::test]
async fn test_unknown_debate_is_http_error() {
    let fixture = Arc::new(Fixture {
        debate_id: Uuid::new_v4(),
        steps: vec![],
    });
    let addr = serve(fixture).await;
    let config = test_config(addr);
    let http = arena_engine::build_http_client(&config).expect("client");

    let err = StreamConsumer::open(&http, &config, Uuid::new_v4(), 3)
        .await
        .err()
        .expect("unknown debate rejected");
    assert!(matches!(err, StreamError::HttpStatus(404)));
}

#[tokio::test]
async fn test_close_is_idempotent_and_stops_delivery() {
    let fixture = Arc::new(Fixture {
        debate_id: Uuid::new_v4(),
        steps: vec![
            ScriptStep::Round {
                number: 1,
                first: "a",
                second: "b",
            },
            ScriptStep::Pause(10_000),
            ScriptStep::Round {
                number: 2,
                first: "c",
                second: "d",
            },
        ],
    });
    let addr = serve(fixture.clone()).await;
    let config = test_config(addr);
    let http = arena_engine::build_http_client(&config).expect("client");

    let mut consumer = StreamConsumer::open(&http, &config, fixture.debate_id, 2)
        .await
        .expect("stream opens");

    consumer.close();
    consumer.close(); // must be safe to call multiple times
    assert!(consumer.is_closed());

    // Nothing is delivered after close, even though the server keeps pushing
    assert!(consumer.next_event().await.is_none());
}
