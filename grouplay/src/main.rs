mod player;

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use grouplay_core::{
    Logic, LogicArgs, QueueName, Role, Session, SessionEvent, SortKey, Track, TrackId,
    config::Config,
    util::{millis_to_hms_string, seconds_to_hms_string},
};
use player::LogPlayer;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the config file
    #[arg(long, default_value = Config::FILENAME)]
    config: PathBuf,

    /// Override the configured role
    #[arg(long)]
    role: Option<RoleArg>,

    /// Override the configured session ID
    #[arg(long)]
    session: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum RoleArg {
    Owner,
    Guest,
}
impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Owner => Role::Owner,
            RoleArg::Guest => Role::Guest,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Write the effective configuration to the config file
    InitConfig,
    /// Print both queues and the current track
    Show,
    /// Print session events as they happen
    Watch {
        /// How often to re-read the current track, in seconds
        #[arg(long, default_value_t = 5)]
        refresh_secs: u64,
    },
    /// Suggest a track; it goes to the pending queue unless you own the session
    Propose(TrackArgs),
    /// Append a track to a queue
    Enqueue {
        #[command(flatten)]
        track: TrackArgs,
        /// Use the pending queue instead of the approved one
        #[arg(long)]
        pending: bool,
    },
    /// Insert a track ahead of the entry with the given sort key
    InsertBefore {
        #[command(flatten)]
        track: TrackArgs,
        /// The sort key of the entry to insert ahead of
        #[arg(long, allow_negative_numbers = true)]
        before: i64,
        /// Use the pending queue instead of the approved one
        #[arg(long)]
        pending: bool,
    },
    /// Remove a track from a queue
    Dequeue {
        id: String,
        /// Use the pending queue instead of the approved one
        #[arg(long)]
        pending: bool,
    },
    /// Move a pending track into the approved queue
    Approve { id: String },
    /// Drop a pending track
    Reject { id: String },
    /// Play an approved track
    Select { id: String },
    /// Play the next approved track
    Advance,
}

#[derive(clap::Args)]
struct TrackArgs {
    /// The catalog ID of the track
    id: String,
    #[arg(long, default_value = "")]
    title: String,
    #[arg(long, default_value = "")]
    artist: String,
    #[arg(long, default_value = "")]
    image_url: String,
    /// The track length in milliseconds
    #[arg(long, default_value_t = 0)]
    duration_ms: u64,
}
impl From<TrackArgs> for Track {
    fn from(args: TrackArgs) -> Self {
        Track {
            id: TrackId::from(args.id),
            title: args.title,
            artist: args.artist,
            album_image_url: args.image_url,
            duration_millis: args.duration_ms,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("grouplay=info")),
        )
        .init();

    let args = Args::parse();
    let mut config = Config::load_from(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    if let Some(role) = args.role {
        config.general.role = role.into();
    }
    if let Some(session) = args.session {
        config.store.session_id = session;
    }

    if let Command::InitConfig = args.command {
        config.save_to(&args.config)?;
        return Ok(());
    }

    let logic = Logic::connect(LogicArgs {
        store: Arc::new(config.store_client()),
        player: Arc::new(LogPlayer),
        role: config.general.role,
        catalog_uri_prefix: config.general.catalog_uri_prefix.clone(),
    })
    .await
    .context("Failed to connect to session")?;

    match args.command {
        Command::InitConfig => {}
        Command::Show => print_session(&logic.read_session()),
        Command::Watch { refresh_secs } => watch(&logic, refresh_secs).await?,
        Command::Propose(track) => {
            let sort_key = logic.propose(&track.into()).await?;
            println!("Proposed at {sort_key}");
        }
        Command::Enqueue { track, pending } => {
            let sort_key = logic
                .enqueue(&track.into(), QueueName::from_pending(pending))
                .await?;
            println!("Enqueued at {sort_key}");
        }
        Command::InsertBefore {
            track,
            before,
            pending,
        } => {
            let sort_key = logic
                .insert_before(
                    &track.into(),
                    QueueName::from_pending(pending),
                    SortKey(before),
                )
                .await?;
            println!("Inserted at {sort_key}");
        }
        Command::Dequeue { id, pending } => {
            logic
                .dequeue(&TrackId::from(id), QueueName::from_pending(pending))
                .await?;
        }
        Command::Approve { id } => {
            let sort_key = logic.approve(&TrackId::from(id)).await?;
            println!("Approved at {sort_key}");
        }
        Command::Reject { id } => logic.reject(&TrackId::from(id)).await?,
        Command::Select { id } => logic.select(&TrackId::from(id)).await?,
        Command::Advance => match logic.advance().await? {
            Some(track) => println!("Now playing {} - {}", track.artist, track.title),
            None => println!("Nothing left to play"),
        },
    }

    Ok(())
}

async fn watch(logic: &Logic, refresh_secs: u64) -> anyhow::Result<()> {
    let mut events = logic.subscribe();
    let mut refresh = tokio::time::interval(Duration::from_secs(refresh_secs.max(1)));
    print_session(&logic.read_session());
    let mut playing = logic
        .read_session()
        .current()
        .map(|current| current.track.id.clone());

    loop {
        tokio::select! {
            event = events.recv() => match event {
                // Refreshes report the current track every time; only print changes.
                Ok(SessionEvent::CurrentChanged(current)) => {
                    let id = current.as_ref().map(|current| current.track.id.clone());
                    if id != playing {
                        playing = id;
                        print_event(&SessionEvent::CurrentChanged(current));
                    }
                }
                Ok(event) => print_event(&event),
                Err(RecvError::Lagged(count)) => {
                    tracing::warn!("Missed {count} events, re-reading the session");
                    logic.refresh().await?;
                }
                Err(RecvError::Closed) => break,
            },
            _ = refresh.tick() => {
                if let Err(e) = logic.refresh().await {
                    tracing::warn!("Failed to refresh session: {e}");
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

fn print_session(session: &Session) {
    match session.current() {
        Some(current) => println!(
            "Now playing: {} - {} ({} left{})",
            current.track.artist,
            current.track.title,
            seconds_to_hms_string(current.time_left_secs),
            if current.paused { ", paused" } else { "" }
        ),
        None => println!("Nothing playing"),
    }
    for queue in QueueName::ALL {
        let mirror = session.queue(queue);
        println!("{queue} ({}):", mirror.len());
        for entry in mirror.sorted_by_key() {
            println!(
                "  [{}] {} {} - {} ({})",
                entry.sort_key,
                entry.id(),
                entry.track.artist,
                entry.track.title,
                millis_to_hms_string(entry.track.duration_millis)
            );
        }
    }
    for id in session.cross_queue_conflicts() {
        println!("warning: `{id}` is in both queues");
    }
}

fn print_event(event: &SessionEvent) {
    match event {
        SessionEvent::QueueChanged {
            queue,
            track_id,
            kind,
            outcome,
        } if outcome.is_applied() => println!("{queue}: {kind:?} `{track_id}`"),
        SessionEvent::QueueChanged { .. } => {}
        SessionEvent::ParseFailed { queue, key, error } => match queue {
            Some(queue) => println!("{queue}: ignored `{key}`: {error}"),
            None => println!("ignored current track: {error}"),
        },
        SessionEvent::SnapshotApplied { .. } => {}
        SessionEvent::CurrentChanged(Some(current)) => println!(
            "Now playing: {} - {}",
            current.track.artist, current.track.title
        ),
        SessionEvent::CurrentChanged(None) => println!("Nothing playing"),
        SessionEvent::CrossQueueConflict(id) => println!("warning: `{id}` is in both queues"),
    }
}
