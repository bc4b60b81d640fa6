//! Deepgram Live Streaming recognition engine.
//!
//! Streams microphone audio over WebSocket and translates the live
//! responses into tagged engine events: `StateChange(true)` once the socket
//! is up, running interpretations as `Result` events, classified failures
//! as `Error` events, and `StateChange(false)` when the session winds down.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam_channel::Sender;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        Message,
        client::IntoClientRequest,
        http::StatusCode,
        http::header::{AUTHORIZATION, HeaderValue},
    },
};

use crate::audio::{CaptureHandle, start_capture};
use crate::engine::{EngineEvent, RecognitionEngine, SessionId};
use crate::resample::TARGET_SAMPLE_RATE;

const WS_URL: &str = "wss://api.deepgram.com/v1/listen";
const MODEL: &str = "nova-3";
const CONNECT_TIMEOUT_SECS: u64 = 30;
/// Keepalive interval - 4s gives wide margin vs the 10s server timeout
const KEEPALIVE_INTERVAL_SECS: u64 = 4;
/// How long to keep accepting trailing results after CloseStream
const DRAIN_WINDOW_SECS: u64 = 5;

/// Live engine backed by Deepgram's streaming endpoint.
///
/// Owns its own runtime; all socket and audio work happens on background
/// tasks, and only tagged events cross back over the channel given at
/// construction.
pub struct DeepgramLiveEngine {
    api_key: Option<String>,
    device: Option<String>,
    events: Sender<EngineEvent>,
    runtime: tokio::runtime::Runtime,
    active: Option<ActiveSession>,
}

/// Handles that keep one session alive. Dropping them stops the microphone
/// and closes the audio channel, which lets the session task finish on its
/// own: CloseStream, trailing-result drain, final state change.
struct ActiveSession {
    _capture: CaptureHandle,
    _audio_tx: mpsc::UnboundedSender<Vec<f32>>,
}

impl DeepgramLiveEngine {
    /// Create an engine that pushes events into `events`. Without an API
    /// key the engine reports itself unsupported.
    pub fn new(
        api_key: Option<String>,
        device: Option<String>,
        events: Sender<EngineEvent>,
    ) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .context("Failed to start the async runtime")?;
        Ok(Self {
            api_key,
            device,
            events,
            runtime,
            active: None,
        })
    }
}

impl RecognitionEngine for DeepgramLiveEngine {
    fn is_supported(&self) -> bool {
        self.api_key.is_some()
    }

    fn is_microphone_available(&self) -> bool {
        crate::audio::default_input_available()
    }

    fn begin_continuous_recognition(&mut self, session: SessionId, language: &str) -> Result<()> {
        // Supersede a session still winding down; its remaining events carry
        // the old id and get dropped downstream.
        self.active = None;

        let api_key = self
            .api_key
            .clone()
            .context("No Deepgram API key configured")?;

        let (audio_tx, audio_rx) = mpsc::unbounded_channel();
        let capture = start_capture(self.device.as_deref(), audio_tx.clone())
            .context("Failed to open the microphone")?;

        let events = self.events.clone();
        let language = language.to_string();
        self.runtime
            .spawn(run_session(api_key, language, session, audio_rx, events));

        self.active = Some(ActiveSession {
            _capture: capture,
            _audio_tx: audio_tx,
        });
        Ok(())
    }

    fn end_recognition(&mut self) -> Result<()> {
        // Advisory: dropping the capture handles closes the audio channel and
        // the session task flushes trailing results before reporting the end.
        self.active = None;
        Ok(())
    }
}

/// Failure classified into an engine-native error identifier.
struct EngineFailure {
    code: &'static str,
    message: String,
}

impl EngineFailure {
    fn network(message: impl Into<String>) -> Self {
        Self {
            code: "network",
            message: message.into(),
        }
    }

    fn not_allowed(message: impl Into<String>) -> Self {
        Self {
            code: "not-allowed",
            message: message.into(),
        }
    }

    fn service(message: impl Into<String>) -> Self {
        Self {
            code: "service-not-allowed",
            message: message.into(),
        }
    }
}

// Response message types

#[derive(Deserialize, Debug)]
struct LiveEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    is_final: bool,
    #[serde(default)]
    channel: Option<LiveChannel>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Deserialize, Debug)]
struct LiveChannel {
    alternatives: Vec<LiveAlternative>,
}

#[derive(Deserialize, Debug)]
struct LiveAlternative {
    transcript: String,
}

/// Running interpretation for one session: committed finals plus the open
/// interim tail, which each new interim replaces.
#[derive(Default)]
struct RunningTranscript {
    committed: String,
}

impl RunningTranscript {
    /// Apply one alternative; returns the new running text when it changed.
    fn apply(&mut self, transcript: &str, is_final: bool) -> Option<String> {
        if transcript.is_empty() {
            return None;
        }
        if is_final {
            self.committed.push_str(transcript);
            self.committed.push(' ');
            Some(self.committed.clone())
        } else {
            Some(format!("{}{}", self.committed, transcript))
        }
    }
}

async fn run_session(
    api_key: String,
    language: String,
    session: SessionId,
    audio_rx: mpsc::UnboundedReceiver<Vec<f32>>,
    events: Sender<EngineEvent>,
) {
    if let Err(failure) = stream_session(&api_key, &language, session, audio_rx, &events).await {
        crate::verbose!(
            "session {}: {} ({})",
            session.0,
            failure.code,
            failure.message
        );
        let _ = events.send(EngineEvent::error(session, failure.code, failure.message));
    }
    // Always the last word: recognition is over for this session.
    let _ = events.send(EngineEvent::state_change(session, false));
}

enum StreamEnd {
    /// The audio channel closed: recognition was asked to end.
    StopRequested,
    /// The server closed the socket first.
    SocketClosed,
}

enum MessageOutcome {
    Continue,
    Closed,
}

async fn stream_session(
    api_key: &str,
    language: &str,
    session: SessionId,
    mut audio_rx: mpsc::UnboundedReceiver<Vec<f32>>,
    events: &Sender<EngineEvent>,
) -> Result<(), EngineFailure> {
    let mut url = format!(
        "{WS_URL}?model={MODEL}&encoding=linear16&sample_rate={TARGET_SAMPLE_RATE}\
         &channels=1&smart_format=true&interim_results=true"
    );
    if !language.is_empty() {
        url.push_str(&format!("&language={language}"));
    }

    let mut request = url
        .into_client_request()
        .map_err(|e| EngineFailure::network(format!("invalid endpoint: {e}")))?;
    request.headers_mut().insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Token {api_key}"))
            .map_err(|e| EngineFailure::not_allowed(format!("malformed API key: {e}")))?,
    );

    let (ws_stream, _response) = timeout(
        Duration::from_secs(CONNECT_TIMEOUT_SECS),
        connect_async(request),
    )
    .await
    .map_err(|_| EngineFailure::network("connection timeout"))?
    .map_err(classify_connect_error)?;

    // The socket is up: recognition is confirmed active.
    let _ = events.send(EngineEvent::state_change(session, true));

    let (write, mut read) = ws_stream.split();
    let write = Arc::new(Mutex::new(write));

    let (keepalive_cancel_tx, keepalive_cancel_rx) = oneshot::channel();
    let keepalive_handle = tokio::spawn({
        let write = Arc::clone(&write);
        async move { keepalive_task(write, keepalive_cancel_rx).await }
    });

    let mut running = RunningTranscript::default();

    // Phase 1: stream audio out, apply results as they arrive.
    let outcome = loop {
        tokio::select! {
            chunk = audio_rx.recv() => match chunk {
                Some(samples) => {
                    if samples.is_empty() {
                        continue;
                    }
                    let bytes = pcm16_bytes(&samples);
                    if let Err(e) = write.lock().await.send(Message::Binary(bytes.into())).await {
                        break Err(EngineFailure::network(format!("failed to send audio: {e}")));
                    }
                }
                None => break Ok(StreamEnd::StopRequested),
            },
            msg = read.next() => match apply_message(msg, session, &mut running, events) {
                Ok(MessageOutcome::Continue) => {}
                Ok(MessageOutcome::Closed) => break Ok(StreamEnd::SocketClosed),
                Err(failure) => break Err(failure),
            },
        }
    };

    let _ = keepalive_cancel_tx.send(());
    let _ = keepalive_handle.await;

    match outcome? {
        StreamEnd::SocketClosed => return Ok(()),
        StreamEnd::StopRequested => {}
    }

    // Phase 2: flush the server buffer and accept trailing results within a
    // bounded window. Stop is advisory, so these still count.
    write
        .lock()
        .await
        .send(Message::Text(
            r#"{"type":"CloseStream"}"#.to_string().into(),
        ))
        .await
        .map_err(|e| EngineFailure::network(format!("failed to send CloseStream: {e}")))?;

    let deadline = tokio::time::Instant::now() + Duration::from_secs(DRAIN_WINDOW_SECS);
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            break;
        }
        tokio::select! {
            _ = tokio::time::sleep(remaining) => break,
            msg = read.next() => match apply_message(msg, session, &mut running, events) {
                Ok(MessageOutcome::Continue) => {}
                Ok(MessageOutcome::Closed) => return Ok(()),
                Err(failure) => return Err(failure),
            },
        }
    }

    let _ = write.lock().await.send(Message::Close(None)).await;
    Ok(())
}

fn apply_message(
    msg: Option<Result<Message, tokio_tungstenite::tungstenite::Error>>,
    session: SessionId,
    running: &mut RunningTranscript,
    events: &Sender<EngineEvent>,
) -> Result<MessageOutcome, EngineFailure> {
    match msg {
        Some(Ok(Message::Text(text))) => {
            let event: LiveEvent = serde_json::from_str(&text)
                .map_err(|e| EngineFailure::service(format!("unparseable live event: {e}")))?;

            match event.event_type.as_str() {
                "Results" => {
                    if let Some(channel) = event.channel
                        && let Some(alt) = channel.alternatives.first()
                        && let Some(text) = running.apply(&alt.transcript, event.is_final)
                    {
                        let _ = events.send(EngineEvent::result(session, text));
                    }
                    Ok(MessageOutcome::Continue)
                }
                "Metadata" => Ok(MessageOutcome::Continue),
                "error" => Err(EngineFailure::service(
                    event
                        .description
                        .unwrap_or_else(|| "no description".to_string()),
                )),
                _ => Ok(MessageOutcome::Continue),
            }
        }
        Some(Ok(Message::Close(_))) => Ok(MessageOutcome::Closed),
        // Ping/pong are handled by tungstenite; binary from the server is unexpected.
        Some(Ok(_)) => Ok(MessageOutcome::Continue),
        Some(Err(e)) => Err(EngineFailure::network(format!("websocket error: {e}"))),
        None => Ok(MessageOutcome::Closed),
    }
}

fn classify_connect_error(error: tokio_tungstenite::tungstenite::Error) -> EngineFailure {
    match error {
        tokio_tungstenite::tungstenite::Error::Http(response) => {
            let status = response.status();
            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                EngineFailure::not_allowed(format!("credentials rejected ({status})"))
            } else {
                EngineFailure::service(format!("connection rejected ({status})"))
            }
        }
        other => EngineFailure::network(format!("failed to connect: {other}")),
    }
}

/// KeepAlive frames during silence; the server drops the connection after
/// 10 seconds without audio or keepalive.
async fn keepalive_task<W>(write: Arc<Mutex<W>>, mut cancel_rx: oneshot::Receiver<()>)
where
    W: SinkExt<Message> + Unpin,
{
    let mut interval = tokio::time::interval(Duration::from_secs(KEEPALIVE_INTERVAL_SECS));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let msg = r#"{"type":"KeepAlive"}"#;
                if write.lock().await.send(Message::Text(msg.to_string().into())).await.is_err() {
                    break;
                }
            }
            _ = &mut cancel_rx => break,
        }
    }
}

/// Convert f32 samples to little-endian PCM16 bytes.
fn pcm16_bytes(samples: &[f32]) -> Vec<u8> {
    samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
        .flat_map(|s| s.to_le_bytes())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_results_event() {
        let raw = r#"{
            "type": "Results",
            "is_final": true,
            "channel": {"alternatives": [{"transcript": "hello world", "confidence": 0.99}]}
        }"#;
        let event: LiveEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(event.event_type, "Results");
        assert!(event.is_final);
        let alt = &event.channel.unwrap().alternatives[0];
        assert_eq!(alt.transcript, "hello world");
    }

    #[test]
    fn parses_error_event_with_description() {
        let raw = r#"{"type": "error", "description": "bad model"}"#;
        let event: LiveEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(event.event_type, "error");
        assert_eq!(event.description.as_deref(), Some("bad model"));
    }

    #[test]
    fn interims_replace_and_finals_commit() {
        let mut running = RunningTranscript::default();
        assert_eq!(running.apply("hel", false).as_deref(), Some("hel"));
        assert_eq!(running.apply("hello", false).as_deref(), Some("hello"));
        assert_eq!(running.apply("hello", true).as_deref(), Some("hello "));
        // The next utterance extends the committed text.
        assert_eq!(
            running.apply("world", false).as_deref(),
            Some("hello world")
        );
        assert_eq!(running.apply("world", true).as_deref(), Some("hello world "));
    }

    #[test]
    fn empty_alternatives_emit_nothing() {
        let mut running = RunningTranscript::default();
        assert_eq!(running.apply("", false), None);
        assert_eq!(running.apply("", true), None);
    }

    #[test]
    fn pcm16_conversion_clamps_out_of_range_samples() {
        let bytes = pcm16_bytes(&[0.0, 1.0, -1.0, 2.0]);
        assert_eq!(bytes.len(), 8);
        assert_eq!(&bytes[0..2], &0i16.to_le_bytes());
        assert_eq!(&bytes[2..4], &i16::MAX.to_le_bytes());
        // Clamped overdrive equals full scale.
        assert_eq!(&bytes[6..8], &bytes[2..4]);
    }
}
