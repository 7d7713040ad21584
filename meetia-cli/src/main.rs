use anyhow::{Context, Result};
use bytes::Bytes;
use clap::{Parser, Subcommand};
use colored::*;
use meetia_core::{IceServerConfig, TrackKind, UserId};
use meetia_rtc::{
    LocalStream, LocalTrack, MediaConstraints, MediaError, RtcPeerConnector, SampleDevices,
    SessionConfig, SessionHandle, SessionSnapshot, join,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Opus frame that decodes to 20 ms of silence.
const OPUS_SILENCE: [u8; 3] = [0xf8, 0xff, 0xfe];

/// Placeholder video payload. Not decodable, it only keeps RTP flowing.
const VIDEO_PLACEHOLDER: [u8; 10] = [0x10, 0x02, 0x00, 0x9d, 0x01, 0x2a, 0x10, 0x00, 0x10, 0x00];

#[derive(Parser)]
#[command(name = "meetia")]
#[command(about = "Join a meeting from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Join(JoinArgs),
}

#[derive(clap::Args)]
struct JoinArgs {
    /// Base URL of the meeting API.
    #[arg(long, env = "MEETIA_API_URL", default_value = "http://localhost:8080")]
    api: String,

    #[arg(long)]
    meeting: String,

    /// Defaults to a random id.
    #[arg(long, env = "MEETIA_USER_ID")]
    user: Option<String>,

    #[arg(long, env = "MEETIA_TOKEN", hide_env_values = true)]
    token: String,

    #[arg(long)]
    no_video: bool,

    #[arg(long)]
    no_audio: bool,

    #[arg(long)]
    share_screen: bool,

    /// Replaces the default STUN servers. Repeatable.
    #[arg(long = "stun", value_name = "URL")]
    stun: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    match Cli::parse().command {
        Commands::Join(args) => run_join(args).await,
    }
}

async fn run_join(args: JoinArgs) -> Result<()> {
    let user = args.user.map(UserId::from).unwrap_or_else(UserId::random);
    let mut config = SessionConfig::new(&args.api, args.meeting.as_str(), user.clone(), args.token)
        .context("Invalid --api url")?;
    if !args.stun.is_empty() {
        config = config.with_ice_servers(args.stun.into_iter().map(IceServerConfig::stun).collect());
    }

    println!(
        "{} {} as {}",
        "📞 Joining meeting".green().bold(),
        config.meeting_id.to_string().bold(),
        user.to_string().cyan()
    );

    let handle = join(
        config,
        Arc::new(RtcPeerConnector::default()),
        Arc::new(SampleDevices::new()),
    )
    .context("Failed to start session")?;

    let constraints = MediaConstraints {
        video: !args.no_video,
        audio: !args.no_audio,
    };

    let mut state = handle.subscribe();
    let mut last = state.borrow().clone();
    let mut media_started = false;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                println!("{}", "👋 Leaving meeting...".yellow());
                break;
            }

            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = state.borrow_and_update().clone();
                report(&last, &snapshot);

                if snapshot.connection_open && !media_started {
                    media_started = true;
                    start_media(&handle, constraints, args.share_screen).await;
                }
                if snapshot.closed {
                    break;
                }
                last = snapshot;
            }
        }
    }

    handle.disconnect().await.context("Failed to leave meeting")?;
    println!("{}", "✨ Disconnected".green().bold());
    Ok(())
}

async fn start_media(handle: &SessionHandle, constraints: MediaConstraints, share_screen: bool) {
    if constraints.video || constraints.audio {
        match handle.start_local_stream(constraints).await {
            Ok(stream) => {
                println!("   🎥 Local stream {}", stream.id().dimmed());
                pump_stream(&stream);
            }
            Err(e) => eprintln!("{} {}", "Camera/microphone unavailable:".red(), e),
        }
    }
    if share_screen {
        match handle.start_screen_share().await {
            Ok(stream) => {
                println!("   🖥  Sharing screen {}", stream.id().dimmed());
                pump_stream(&stream);
            }
            Err(e) => eprintln!("{} {}", "Screen share failed:".red(), e),
        }
    }
}

fn pump_stream(stream: &LocalStream) {
    for track in stream.tracks() {
        tokio::spawn(pump_samples(track.clone()));
    }
}

/// Feeds synthetic samples until the track stops.
async fn pump_samples(track: LocalTrack) {
    let (payload, period) = match track.kind() {
        TrackKind::Audio => (Bytes::from_static(&OPUS_SILENCE), Duration::from_millis(20)),
        TrackKind::Video | TrackKind::Screen => {
            (Bytes::from_static(&VIDEO_PLACEHOLDER), Duration::from_millis(33))
        }
    };

    let mut ticker = tokio::time::interval(period);
    loop {
        ticker.tick().await;
        match track.write_sample(payload.clone(), period).await {
            Ok(()) => {}
            Err(MediaError::TrackStopped(_)) => break,
            Err(e) => debug!(track = track.id(), "Failed to write sample: {}", e),
        }
    }
}

fn report(before: &SessionSnapshot, now: &SessionSnapshot) {
    if before.transport_state != now.transport_state {
        println!("   📡 Signaling {:?}", now.transport_state);
    }
    if before.connection_state != now.connection_state
        && let Some(state) = now.connection_state
    {
        println!("   🔗 Peer connection {}", state.to_string().cyan());
    }
    if before.remote_tracks.len() != now.remote_tracks.len() {
        let participants: Vec<String> = now
            .remote_tracks
            .iter()
            .map(|t| format!("{}:{}", t.participant, t.kind))
            .collect();
        println!(
            "   👥 {} remote track(s) {}",
            now.remote_tracks.len(),
            participants.join(" ").dimmed()
        );
    }
    if before.last_error != now.last_error
        && let Some(error) = &now.last_error
    {
        eprintln!("{} {}", "❌".red(), error.red());
    }
}
