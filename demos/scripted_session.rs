//! Drive the engine against a scripted in-process server.
//!
//! The "server" is a thread reading the client's JSON frames. It answers the
//! setup frame, filters one prompt, and streams a one-second 220 Hz tone per
//! chunk once playback is requested. Output goes to a [`VirtualOutput`], so
//! no audio device is needed.
//!
//! ```bash
//! RUST_LOG=promptdj_engine=debug cargo run --example scripted_session
//! ```

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use crossbeam::channel::{Receiver, unbounded};
use promptdj_engine::session::{FramedConnector, SessionSender, deliver_frame};
use promptdj_engine::{
    Engine, EngineCommand, EngineConfig, EngineDriver, EngineEvent, Prompt, SystemClock,
    VirtualOutput,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const RATE: u32 = 48_000;

fn tone_chunk(seconds: f64, freq: f64) -> String {
    let frames = (RATE as f64 * seconds) as usize;
    let mut pcm = Vec::with_capacity(frames * 4);
    for n in 0..frames {
        let s = (2.0 * std::f64::consts::PI * freq * n as f64 / RATE as f64).sin() * 0.25;
        let v = (s * i16::MAX as f64) as i16;
        pcm.extend_from_slice(&v.to_le_bytes());
        pcm.extend_from_slice(&v.to_le_bytes());
    }
    serde_json::json!({
        "serverContent": {
            "audioChunks": [{
                "data": STANDARD.encode(&pcm),
                "mimeType": format!("audio/l16;rate={RATE};channels=2"),
            }]
        }
    })
    .to_string()
}

fn serve(frames: Receiver<String>, inbound: SessionSender) {
    for frame in frames {
        tracing::debug!(%frame, "server received");
        let reply = if frame.contains("\"setup\"") {
            vec![r#"{"setupComplete":{}}"#.to_string()]
        } else if frame.contains("Drum and Bass") {
            vec![
                serde_json::json!({
                    "filteredPrompt": {
                        "text": "Drum and Bass",
                        "filteredReason": "This prompt is not allowed in the demo."
                    }
                })
                .to_string(),
            ]
        } else if frame.contains("\"PLAY\"") {
            (0..4).map(|_| tone_chunk(1.0, 220.0)).collect()
        } else {
            Vec::new()
        };

        for reply in reply {
            if let Err(e) = deliver_frame(&reply, &inbound) {
                tracing::info!(error = %e, "client went away");
                return;
            }
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init();

    let connector = FramedConnector::new(|inbound: SessionSender| {
        let (tx, rx) = unbounded::<String>();
        std::thread::spawn(move || serve(rx, inbound));
        Ok(tx)
    });

    let clock = Arc::new(SystemClock::new());
    let output = VirtualOutput::new(clock.clone(), RATE, 2);
    let (engine, events) = Engine::builder(connector, output)
        .config(EngineConfig::low_latency().with_model("models/demo"))
        .clock(clock)
        .prompts(vec![
            Prompt::new("p0", "Bossa Nova", 1.0, "#9900ff"),
            Prompt::new("p1", "Drum and Bass", 0.0, "#ff25f6"),
        ])
        .build()?;

    let (driver, handle) = EngineDriver::new(engine);
    let task = tokio::spawn(driver.run());

    handle.send(EngineCommand::Play)?;
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    handle.send(EngineCommand::SetPromptWeight {
        id: "p1".into(),
        weight: 1.2,
    })?;
    tokio::time::sleep(Duration::from_millis(500)).await;
    handle.send(EngineCommand::PlayPause)?;
    tokio::time::sleep(Duration::from_millis(200)).await;
    handle.shutdown();

    let engine = task.await?;
    for event in events.try_iter() {
        match event {
            EngineEvent::StateChanged(state) => println!("state   {state}"),
            EngineEvent::Notice(notice) => println!("notice  {notice}"),
            EngineEvent::WeightsChanged(prompts) => println!("weights {} prompts", prompts.len()),
        }
    }
    println!(
        "{} buffers retained, final state {}",
        engine.controller().output().voices().len(),
        engine.state()
    );
    Ok(())
}
