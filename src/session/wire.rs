//! JSON framing for sessions carried over a text transport.
//!
//! Server frames are objects carrying any of `setupComplete`,
//! `filteredPrompt` and `serverContent.audioChunks`. Client frames are
//! single-key objects: `setup`, `clientContent`, `musicGenerationConfig` or
//! `playbackControl`. Audio travels as base64 raw PCM16 with its format in
//! the mime type (`audio/l16;rate=48000;channels=2`).

use super::error::{SessionError, SessionResult};
use super::traits::{ServerMessage, Session, SessionConnector, SessionSender};
use crate::sync::{GenerationConfig, WeightedPrompt};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use crossbeam::channel::Sender;
use serde::{Deserialize, Serialize};

/// Format assumed when a chunk's mime type leaves it out.
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;
pub const DEFAULT_CHANNELS: u16 = 2;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerFrame {
    #[serde(default)]
    setup_complete: Option<serde_json::Value>,
    #[serde(default)]
    filtered_prompt: Option<FilteredPromptFrame>,
    #[serde(default)]
    server_content: Option<ServerContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FilteredPromptFrame {
    #[serde(default)]
    text: String,
    #[serde(default)]
    filtered_reason: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerContent {
    #[serde(default)]
    audio_chunks: Vec<AudioChunkFrame>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AudioChunkFrame {
    data: String,
    #[serde(default)]
    mime_type: Option<String>,
}

/// Read rate and channel count from an `audio/l16` mime type.
pub fn parse_mime_type(mime: &str) -> (u32, u16) {
    let mut rate = DEFAULT_SAMPLE_RATE;
    let mut channels = DEFAULT_CHANNELS;
    for param in mime.split(';').skip(1) {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        match key.trim() {
            "rate" => rate = value.trim().parse().unwrap_or(rate),
            "channels" => channels = value.trim().parse().unwrap_or(channels),
            _ => {}
        }
    }
    (rate, channels)
}

/// Parse one server frame into the messages it carries, in order.
pub fn parse_server_frame(frame: &str) -> SessionResult<Vec<ServerMessage>> {
    let frame: ServerFrame = serde_json::from_str(frame)?;
    let mut messages = Vec::new();

    if frame.setup_complete.is_some() {
        messages.push(ServerMessage::SetupComplete);
    }
    if let Some(filtered) = frame.filtered_prompt {
        messages.push(ServerMessage::FilteredPrompt {
            text: filtered.text,
            reason: filtered.filtered_reason,
        });
    }
    for chunk in frame.server_content.into_iter().flat_map(|c| c.audio_chunks) {
        let (sample_rate, channels) = chunk
            .mime_type
            .as_deref()
            .map_or((DEFAULT_SAMPLE_RATE, DEFAULT_CHANNELS), parse_mime_type);
        messages.push(ServerMessage::AudioChunk {
            data: STANDARD.decode(chunk.data.as_bytes())?,
            sample_rate,
            channels,
        });
    }
    Ok(messages)
}

/// Parse `frame` and hand its messages to `inbound`.
///
/// Returns how many messages were delivered.
pub fn deliver_frame(frame: &str, inbound: &SessionSender) -> SessionResult<usize> {
    let messages = parse_server_frame(frame)?;
    let count = messages.len();
    for message in messages {
        if !inbound.on_message(message) {
            return Err(SessionError::Closed);
        }
    }
    Ok(count)
}

/// Transport-level playback verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlaybackControl {
    Play,
    Pause,
    Stop,
    ResetContext,
}

/// Everything the client sends.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ClientFrame<'a> {
    Setup {
        model: &'a str,
    },
    ClientContent {
        #[serde(rename = "weightedPrompts")]
        weighted_prompts: &'a [WeightedPrompt],
    },
    MusicGenerationConfig(&'a GenerationConfig),
    PlaybackControl(PlaybackControl),
}

impl ClientFrame<'_> {
    pub fn to_json(&self) -> SessionResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Something text frames can be written to.
pub trait FrameSink {
    fn send_frame(&mut self, frame: String) -> SessionResult<()>;

    fn close(&mut self) {}
}

impl FrameSink for Sender<String> {
    fn send_frame(&mut self, frame: String) -> SessionResult<()> {
        self.send(frame)
            .map_err(|_| SessionError::connection_lost("frame channel closed"))
    }
}

/// A [`Session`] that writes JSON frames to a [`FrameSink`].
#[derive(Debug)]
pub struct FramedSession<T: FrameSink> {
    sink: T,
}

impl<T: FrameSink> FramedSession<T> {
    /// Send the setup frame for `model` and wrap `sink`.
    pub fn open(model: &str, mut sink: T) -> SessionResult<Self> {
        sink.send_frame(ClientFrame::Setup { model }.to_json()?)?;
        Ok(Self { sink })
    }

    pub fn sink(&self) -> &T {
        &self.sink
    }

    fn send(&mut self, frame: ClientFrame<'_>) -> SessionResult<()> {
        let json = frame.to_json()?;
        tracing::trace!(frame = %json, "sending frame");
        self.sink.send_frame(json)
    }

    fn control(&mut self, control: PlaybackControl) -> SessionResult<()> {
        self.send(ClientFrame::PlaybackControl(control))
    }
}

impl<T: FrameSink> Session for FramedSession<T> {
    fn play(&mut self) -> SessionResult<()> {
        self.control(PlaybackControl::Play)
    }

    fn pause(&mut self) -> SessionResult<()> {
        self.control(PlaybackControl::Pause)
    }

    fn stop(&mut self) -> SessionResult<()> {
        self.control(PlaybackControl::Stop)
    }

    fn reset_context(&mut self) -> SessionResult<()> {
        self.control(PlaybackControl::ResetContext)
    }

    fn set_weighted_prompts(&mut self, prompts: &[WeightedPrompt]) -> SessionResult<()> {
        self.send(ClientFrame::ClientContent {
            weighted_prompts: prompts,
        })
    }

    fn set_music_generation_config(&mut self, config: &GenerationConfig) -> SessionResult<()> {
        self.send(ClientFrame::MusicGenerationConfig(config))
    }

    fn close(&mut self) {
        self.sink.close();
    }
}

/// Opens [`FramedSession`]s over transports built by a closure.
///
/// The closure receives the inbound handlers for the new connection and
/// returns the sink for outgoing frames; whatever reads the transport calls
/// [`deliver_frame`] with those handlers.
pub struct FramedConnector<F> {
    open: F,
}

impl<F, T> FramedConnector<F>
where
    F: FnMut(SessionSender) -> SessionResult<T>,
    T: FrameSink,
{
    pub fn new(open: F) -> Self {
        Self { open }
    }
}

impl<F, T> SessionConnector for FramedConnector<F>
where
    F: FnMut(SessionSender) -> SessionResult<T>,
    T: FrameSink,
{
    type Session = FramedSession<T>;

    fn connect(&mut self, model: &str, inbound: SessionSender) -> SessionResult<Self::Session> {
        let sink = (self.open)(inbound).map_err(|e| match e {
            SessionError::Connect { .. } => e,
            other => SessionError::connect(model, other.to_string()),
        })?;
        FramedSession::open(model, sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionEvent;
    use crossbeam::channel::unbounded;
    use serde_json::{Value, json};

    #[test]
    fn parses_setup_and_filtered_prompt() {
        let messages = parse_server_frame(
            r#"{"setupComplete":{},"filteredPrompt":{"text":"bad","filteredReason":"unsafe"}}"#,
        )
        .unwrap();
        assert_eq!(
            messages,
            vec![
                ServerMessage::SetupComplete,
                ServerMessage::FilteredPrompt {
                    text: "bad".into(),
                    reason: "unsafe".into()
                }
            ]
        );
    }

    #[test]
    fn parses_audio_chunks_with_format() {
        let data = STANDARD.encode([1u8, 0, 2, 0]);
        let frame = json!({
            "serverContent": {
                "audioChunks": [
                    {"data": data, "mimeType": "audio/l16;rate=24000;channels=1"},
                    {"data": data}
                ]
            }
        });
        let messages = parse_server_frame(&frame.to_string()).unwrap();
        assert_eq!(
            messages[0],
            ServerMessage::AudioChunk {
                data: vec![1, 0, 2, 0],
                sample_rate: 24_000,
                channels: 1
            }
        );
        assert!(matches!(
            messages[1],
            ServerMessage::AudioChunk {
                sample_rate: 48_000,
                channels: 2,
                ..
            }
        ));
    }

    #[test]
    fn bad_payload_is_an_error() {
        let err = parse_server_frame(r#"{"serverContent":{"audioChunks":[{"data":"!!"}]}}"#)
            .unwrap_err();
        assert!(matches!(err, SessionError::Payload(_)));
        assert!(parse_server_frame("not json").is_err());
    }

    #[test]
    fn mime_type_defaults() {
        assert_eq!(parse_mime_type("audio/l16"), (48_000, 2));
        assert_eq!(parse_mime_type("audio/l16; rate=16000"), (16_000, 2));
        assert_eq!(parse_mime_type("audio/l16;channels=x"), (48_000, 2));
    }

    #[test]
    fn client_frames_are_single_key_objects() {
        let prompts = vec![WeightedPrompt {
            id: "p0".into(),
            text: "Minimal Techno".into(),
            weight: 1.0,
        }];
        let content: Value =
            serde_json::from_str(&ClientFrame::ClientContent { weighted_prompts: &prompts }.to_json().unwrap())
                .unwrap();
        assert_eq!(
            content,
            json!({"clientContent": {"weightedPrompts": [{"id": "p0", "text": "Minimal Techno", "weight": 1.0}]}})
        );

        let control = ClientFrame::PlaybackControl(PlaybackControl::ResetContext)
            .to_json()
            .unwrap();
        assert_eq!(control, r#"{"playbackControl":"RESET_CONTEXT"}"#);
    }

    #[test]
    fn framed_session_writes_setup_then_verbs() {
        let (tx, rx) = unbounded();
        let mut session = FramedSession::open("models/lyria", tx).unwrap();
        session.play().unwrap();
        session
            .set_music_generation_config(&GenerationConfig {
                bpm: Some(120),
                ..GenerationConfig::default()
            })
            .unwrap();

        let frames: Vec<String> = rx.try_iter().collect();
        assert_eq!(
            frames,
            vec![
                r#"{"setup":{"model":"models/lyria"}}"#.to_string(),
                r#"{"playbackControl":"PLAY"}"#.to_string(),
                r#"{"musicGenerationConfig":{"bpm":120}}"#.to_string(),
            ]
        );
    }

    #[test]
    fn closed_sink_is_connection_loss() {
        let (tx, rx) = unbounded();
        let mut session = FramedSession::open("m", tx).unwrap();
        drop(rx);
        assert!(session.pause().unwrap_err().is_connection_loss());
    }

    #[test]
    fn deliver_frame_feeds_inbound() {
        let (sender, rx) = SessionSender::channel();
        let count = deliver_frame(r#"{"setupComplete":{}}"#, &sender).unwrap();
        assert_eq!(count, 1);
        assert_eq!(
            rx.try_recv().unwrap(),
            SessionEvent::Message(ServerMessage::SetupComplete)
        );
    }

    #[test]
    fn connector_wraps_open_failures() {
        let mut connector = FramedConnector::new(|_inbound: SessionSender| -> SessionResult<Sender<String>> {
            Err(SessionError::protocol("handshake"))
        });
        let (sender, _rx) = SessionSender::channel();
        let err = connector.connect("m", sender).unwrap_err();
        assert!(err.is_connection_loss());
    }
}
