use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use capture_arbiter::engine::{ArbiterOptions, MatchArbiter};
use capture_arbiter::server_protocol::{parse_host_message, ParsedHostMessage};
use capture_arbiter::server_utils::{parse_standings_limit, sanitize_callsign};
use capture_arbiter::standings_store::StandingsStore;
use capture_arbiter::types::{GrabVerdict, MatchEvent, Role};
use futures_util::{SinkExt, StreamExt};
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};

type SharedState = Arc<Mutex<ServerState>>;

struct ServerState {
    standings_store: StandingsStore,
}

#[derive(Debug, Deserialize)]
struct StandingsQuery {
    limit: Option<String>,
}

#[tokio::main]
async fn main() {
    let port = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let standings_path = std::env::var("STANDINGS_DB_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(".data/standings.json"));

    let state = Arc::new(Mutex::new(ServerState {
        standings_store: StandingsStore::new(standings_path),
    }));

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/api/standings", get(standings_handler))
        .route("/ws", get(ws_handler))
        .with_state(state);

    let bind_addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("failed to bind server socket");

    println!("[server] listening on :{port}");
    axum::serve(listener, app)
        .await
        .expect("server runtime failed");
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn standings_handler(
    State(state): State<SharedState>,
    Query(query): Query<StandingsQuery>,
) -> impl IntoResponse {
    let guard = state.lock().await;
    Json(
        guard
            .standings_store
            .build_response(parse_standings_limit(query.limit.as_deref())),
    )
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

/// One socket carries one game host session. The arbiter lives inside the
/// connection; only the standings store outlives it.
async fn handle_socket(state: SharedState, socket: WebSocket) {
    let session_id = make_session_id();
    let (tx, mut rx) = mpsc::channel::<String>(256);

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            if ws_sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    println!("[server] session {session_id} connected");
    let mut arbiter = MatchArbiter::new(ArbiterOptions::default());
    send_json(
        &tx,
        &json!({
            "type": "welcome",
            "sessionId": session_id,
        }),
    );

    while let Some(received) = ws_receiver.next().await {
        let Ok(message) = received else {
            break;
        };

        match message {
            Message::Text(raw) => {
                handle_host_message(&state, &tx, &mut arbiter, raw.as_str()).await;
            }
            Message::Binary(raw) => {
                if let Ok(text) = String::from_utf8(raw.to_vec()) {
                    handle_host_message(&state, &tx, &mut arbiter, &text).await;
                } else {
                    send_error(&tx, "invalid utf8 message");
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    println!("[server] session {session_id} disconnected");
    drop(tx);
    let _ = writer.await;
}

async fn handle_host_message(
    state: &SharedState,
    tx: &mpsc::Sender<String>,
    arbiter: &mut MatchArbiter,
    raw: &str,
) {
    let Some(message) = parse_host_message(raw) else {
        send_error(tx, "invalid message");
        return;
    };

    match message {
        ParsedHostMessage::MatchStart => {
            *arbiter = MatchArbiter::new(ArbiterOptions::default());
        }
        ParsedHostMessage::Tick { now_ms } => {
            arbiter.apply(MatchEvent::Tick { now_ms });
        }
        ParsedHostMessage::Capture {
            now_ms,
            capturing,
            captured,
            player_id,
        } => {
            arbiter.apply(MatchEvent::Capture {
                now_ms,
                capturing,
                captured,
                capturing_player: player_id,
            });
        }
        ParsedHostMessage::Grab {
            now_ms,
            objective,
            grabber,
            player_id,
        } => {
            let verdict = arbiter
                .apply(MatchEvent::GrabAttempt {
                    now_ms,
                    objective,
                    grabber,
                    grabber_player: player_id.clone(),
                })
                .unwrap_or(GrabVerdict::Allowed);
            send_json(
                tx,
                &json!({
                    "type": "verdict",
                    "playerId": player_id,
                    "allowed": verdict.is_allowed(),
                }),
            );
        }
        ParsedHostMessage::Join {
            now_ms,
            player_id,
            network_id,
            callsign,
            faction,
        } => {
            let role = match faction {
                Some(faction) => Role::Playing(faction),
                None => Role::Observer,
            };
            arbiter.apply(MatchEvent::Join {
                now_ms,
                player_id,
                network_id,
                callsign: sanitize_callsign(&callsign),
                role,
            });
        }
        ParsedHostMessage::Part { now_ms, player_id } => {
            arbiter.apply(MatchEvent::Part { now_ms, player_id });
        }
        ParsedHostMessage::MatchEnd => {
            let summary = arbiter.summary();
            {
                let mut guard = state.lock().await;
                guard.standings_store.record_match(&summary);
            }
            send_json(
                tx,
                &json!({
                    "type": "summary",
                    "summary": summary,
                }),
            );
            *arbiter = MatchArbiter::new(ArbiterOptions::default());
            return;
        }
        ParsedHostMessage::Ping { t } => {
            send_json(
                tx,
                &json!({
                    "type": "pong",
                    "t": t,
                }),
            );
            return;
        }
    }

    flush_effects(tx, arbiter);
}

fn flush_effects(tx: &mpsc::Sender<String>, arbiter: &mut MatchArbiter) {
    let effects = arbiter.drain_effects();
    if effects.is_empty() {
        return;
    }
    send_json(
        tx,
        &json!({
            "type": "effects",
            "effects": effects,
        }),
    );
}

fn send_json(tx: &mpsc::Sender<String>, message: &Value) {
    // A full queue means the host stopped reading; the socket loop will
    // notice on its own.
    let _ = tx.try_send(message.to_string());
}

fn send_error(tx: &mpsc::Sender<String>, message: &str) {
    send_json(
        tx,
        &json!({
            "type": "error",
            "message": message,
        }),
    );
}

fn make_session_id() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(12)
        .map(char::from)
        .collect()
}
