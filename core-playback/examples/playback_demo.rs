//! # Playback Engine Demo
//!
//! Plays a three-track queue through an in-memory backend that simulates a
//! native player, printing every snapshot transition. Tracks "play" at 5x
//! speed so the whole queue finishes in a few seconds.
//!
//! Run with: `cargo run --example playback_demo --package core-playback`

use anyhow::Context;
use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::playback::{
    AudioBackend, AudioResource, LoadRequest, PlaybackStatus, StatusStream,
};
use bridge_traits::logger::LogLevel;
use core_playback::{
    format_timestamp, MediaResolver, PlaybackEngine, PlaybackPhase, PlayerSnapshot, Track,
};
use core_runtime::events::EventBus;
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use futures::channel::mpsc;
use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const TICK: Duration = Duration::from_millis(100);
const SPEEDUP: u32 = 5;

// ============================================================================
// Simulated Audio Backend
// ============================================================================

struct SimulatedBackend {
    track_length: Duration,
}

#[async_trait]
impl AudioBackend for SimulatedBackend {
    async fn load(&self, request: LoadRequest) -> BridgeResult<Box<dyn AudioResource>> {
        println!("  [backend] loading {}", request.url);
        tokio::time::sleep(Duration::from_millis(150)).await;

        let (tx, rx) = mpsc::unbounded();
        let resource = SimulatedResource {
            playing: Arc::new(AtomicBool::new(request.autoplay)),
            released: Arc::new(AtomicBool::new(false)),
            seek_to: Arc::new(Mutex::new(None)),
            status: Mutex::new(Some(rx)),
        };
        resource.spawn_clock(tx, self.track_length);

        Ok(Box::new(resource))
    }
}

struct SimulatedResource {
    playing: Arc<AtomicBool>,
    released: Arc<AtomicBool>,
    seek_to: Arc<Mutex<Option<Duration>>>,
    status: Mutex<Option<mpsc::UnboundedReceiver<PlaybackStatus>>>,
}

impl SimulatedResource {
    fn spawn_clock(&self, tx: mpsc::UnboundedSender<PlaybackStatus>, length: Duration) {
        let playing = Arc::clone(&self.playing);
        let released = Arc::clone(&self.released);
        let seek_to = Arc::clone(&self.seek_to);

        tokio::spawn(async move {
            let mut position = Duration::ZERO;
            let mut interval = tokio::time::interval(TICK);

            loop {
                interval.tick().await;
                if released.load(Ordering::SeqCst) {
                    return;
                }
                if let Some(target) = seek_to.lock().take() {
                    position = target;
                }
                if !playing.load(Ordering::SeqCst) {
                    continue;
                }

                position = (position + TICK * SPEEDUP).min(length);
                let status = if position >= length {
                    PlaybackStatus::finished(length)
                } else {
                    PlaybackStatus::loaded(position, Some(length))
                };
                if tx.unbounded_send(status).is_err() || status.did_finish {
                    return;
                }
            }
        });
    }
}

#[async_trait]
impl AudioResource for SimulatedResource {
    async fn play(&self) -> BridgeResult<()> {
        self.playing.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn pause(&self) -> BridgeResult<()> {
        self.playing.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn seek_to(&self, position: Duration) -> BridgeResult<()> {
        *self.seek_to.lock() = Some(position);
        Ok(())
    }

    async fn release(&self) -> BridgeResult<()> {
        self.released.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn status_stream(&self) -> StatusStream {
        match self.status.lock().take() {
            Some(rx) => rx.boxed(),
            None => futures::stream::empty().boxed(),
        }
    }
}

// ============================================================================
// Demo
// ============================================================================

fn render(snapshot: &PlayerSnapshot) -> String {
    let title = snapshot
        .current_track
        .as_ref()
        .map(|track| format!("{} - {}", track.title, track.display_artist()))
        .unwrap_or_else(|| "(nothing)".to_string());
    let duration = snapshot
        .duration
        .map(format_timestamp)
        .unwrap_or_else(|| "-:--".to_string());

    format!(
        "{:<8} {} [{} / {}]",
        snapshot.phase.to_string(),
        title,
        format_timestamp(snapshot.position),
        duration
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(
        LoggingConfig::default()
            .with_format(LogFormat::Compact)
            .with_level(LogLevel::Info),
    )
    .context("failed to initialize logging")?;

    println!("=== Playback Engine Demo ===\n");

    let backend = Arc::new(SimulatedBackend {
        track_length: Duration::from_secs(3),
    });
    let resolver = MediaResolver::new("http://localhost:5000").context("invalid origin")?;
    let engine = PlaybackEngine::new(backend, resolver, EventBus::default(), None);

    let queue = vec![
        Track::new(1, "Opening", "/uploads/songs/opening.mp3"),
        Track::new(2, "Interlude", "uploads/songs/interlude.mp3")
            .with_artist(core_auth::UserId::new("7"), "Luna"),
        Track::new(3, "Finale", "/uploads/songs/finale.mp3"),
    ];

    let mut updates = engine.subscribe();
    let printer = tokio::spawn(async move {
        let mut last_phase = PlaybackPhase::Idle;
        let mut last_second = u64::MAX;
        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow_and_update().clone();
            let second = snapshot.position.as_secs();
            if snapshot.phase != last_phase || second != last_second {
                println!("{}", render(&snapshot));
                last_phase = snapshot.phase;
                last_second = second;
            }
        }
    });

    engine
        .play_song(queue[0].clone(), queue.clone())
        .await
        .context("failed to start playback")?;

    tokio::time::sleep(Duration::from_millis(300)).await;
    println!("\n> pause");
    engine.toggle_play_pause().await?;
    tokio::time::sleep(Duration::from_millis(300)).await;
    println!("> resume\n");
    engine.toggle_play_pause().await?;

    // The last track has nothing after it except a wrap-around, so stop once
    // the queue has come back to the first track.
    let mut watch = engine.subscribe();
    let mut seen_finale = false;
    while watch.changed().await.is_ok() {
        let current = watch.borrow_and_update().current_track.clone();
        match current {
            Some(track) if track.id == queue[2].id => seen_finale = true,
            Some(track) if seen_finale && track.id == queue[0].id => break,
            _ => {}
        }
    }

    println!("\n> stop");
    engine.stop().await?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    printer.abort();

    println!("\n=== Demo complete ===");
    Ok(())
}
