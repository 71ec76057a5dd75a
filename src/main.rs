use anyhow::{Context, Result};
use clap::Parser;
use dailies_scribe::{
    BotClient, BotLifecycle, Command, Config, Error, MeetingRef, ReviewEngine, SessionEvent,
    StreamClient,
};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Join a review meeting and stream its live transcript.
#[derive(Debug, Parser)]
#[command(name = "dailies-scribe")]
struct Args {
    /// Meeting platform (e.g. google_meet)
    platform: String,

    /// The platform's native meeting id
    meeting_id: String,

    /// Config file (without extension)
    #[arg(short, long, default_value = "config/dailies-scribe")]
    config: String,

    /// Shot/version rows to pre-create; the first becomes the default target
    #[arg(long = "shot")]
    shots: Vec<String>,

    /// Skip asking the bot manager to join the call
    #[arg(long)]
    no_bot: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config).context("failed to load config")?;
    let meeting = MeetingRef::new(args.platform, args.meeting_id);

    if !args.no_bot {
        let bots = BotClient::new(&cfg.bot);
        match bots.request_bot(&meeting).await {
            Ok(()) => info!("bot joining {}", meeting.key()),
            Err(Error::BotAlreadyJoined) => info!("bot already in {}", meeting.key()),
            Err(e) => return Err(e).context("bot request failed"),
        }
    }

    let (cmd_tx, cmd_rx) = mpsc::channel(32);
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();

    let client = StreamClient::new(cfg.stream.clone());
    let engine = ReviewEngine::new(client, cfg.display.clone(), cmd_rx, event_tx);
    let engine_task = tokio::spawn(engine.run());

    cmd_tx.send(Command::Join(meeting.clone())).await?;
    for shot in args.shots {
        cmd_tx.send(Command::AddContext { identifier: shot }).await?;
    }

    loop {
        tokio::select! {
            event = event_rx.recv() => {
                match event {
                    Some(SessionEvent::TranscriptFinalized { groups, .. }) => {
                        for group in groups {
                            println!("{}", group.display_line(cfg.display.show_speakers));
                        }
                    }
                    Some(SessionEvent::TranscriptMutable { .. }) => {
                        // Interim revisions are noisy on a terminal; wait for
                        // the finalized pass.
                    }
                    Some(SessionEvent::MeetingStatus { meeting, status }) => {
                        info!("{}: {:?}", meeting, status);
                    }
                    Some(SessionEvent::Connected) => info!("stream connected"),
                    Some(SessionEvent::Disconnected) => info!("stream disconnected"),
                    Some(SessionEvent::Error { message }) => warn!("{}", message),
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                let _ = cmd_tx.send(Command::Leave(meeting.clone())).await;
                let _ = cmd_tx.send(Command::Shutdown).await;
                break;
            }
        }
    }

    if let Err(e) = engine_task.await? {
        warn!("engine exited with error: {}", e);
    }

    if !args.no_bot {
        let bots = BotClient::new(&cfg.bot);
        if let Err(e) = bots.stop_bot(&meeting).await {
            warn!("failed to stop bot: {}", e);
        }
    }

    Ok(())
}
