use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use mixer::{Session, SessionConfig, SessionEvent};
use tokio::sync::broadcast;
use tracing::warn;

use classifier::{Classifier, ClassifierAdapter, HttpClassifier, MoodLabel, StaticClassifier};
use dispenser::{CommandChannel, LoggingDriver, PumpBank, RecipeBook, SequenceOutcome, open_serial};
use tokio_serial::SerialStream;
use vision::{AlwaysPresent, CaptureConfig, FolderSource};

#[derive(Parser)]
#[command(author, version, about = "Mood-driven drink dispenser")]
struct Cli {
    /// Glob pattern of JPEG frames standing in for the camera
    #[arg(long, default_value = "frames/*.jpg")]
    frames: String,

    /// Serial device of the actuator controller (e.g. /dev/ttyACM0)
    #[arg(long, env = "MIXER_SERIAL")]
    serial: Option<String>,

    #[arg(long, default_value_t = 115_200)]
    baud: u32,

    /// Seconds presence must be held before capture
    #[arg(long, default_value_t = 2.0)]
    hold_secs: f64,

    /// Consecutive missed frames a presence run survives (0 = none)
    #[arg(long, default_value_t = 0)]
    grace_frames: u32,

    /// Detection loop cadence in milliseconds
    #[arg(long, default_value_t = 50)]
    cadence_ms: u64,

    /// Emotion service endpoint; omitted means a canned neutral answer
    #[arg(long, env = "CLASSIFIER_URL")]
    classifier_url: Option<String>,

    /// Classification deadline in seconds
    #[arg(long, default_value_t = 10.0)]
    classify_timeout_secs: f64,

    /// JSON recipe table replacing the built-in one
    #[arg(long)]
    recipes: Option<PathBuf>,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    mixer::logging::init();
    let cli = Cli::parse();

    let source = Box::new(FolderSource::new(&cli.frames)?);
    let detector = Box::new(AlwaysPresent);

    let inner: Arc<dyn Classifier> = match &cli.classifier_url {
        Some(url) => Arc::new(HttpClassifier::new(url.clone())),
        None => {
            warn!("no classifier configured; every face reads as neutral");
            Arc::new(StaticClassifier::certain(MoodLabel::Neutral))
        }
    };
    let classifier = Arc::new(ClassifierAdapter::new(
        inner,
        Duration::from_secs_f64(cli.classify_timeout_secs),
    ));

    let book = match &cli.recipes {
        Some(path) => RecipeBook::from_json(&std::fs::read_to_string(path)?)?,
        None => RecipeBook::default(),
    };

    let channel: Option<CommandChannel<SerialStream>> = match &cli.serial {
        Some(path) => Some(open_serial(path, cli.baud, Duration::from_secs(2)).await?),
        None => {
            warn!("no serial port configured; dispense commands stay local");
            None
        }
    };

    let config = SessionConfig {
        capture: CaptureConfig {
            hold: Duration::from_secs_f64(cli.hold_secs),
            grace_frames: cli.grace_frames,
        },
        cadence: Duration::from_millis(cli.cadence_ms),
        ..SessionConfig::default()
    };

    let bank = PumpBank::new(Box::new(LoggingDriver));
    let mut session = Session::new(source, detector, classifier, bank, book, channel, config);

    let printer = tokio::spawn(print_status(session.subscribe()));
    let cancel = session.cancel_handle();

    let outcome = tokio::select! {
        result = session.run_once() => result,
        _ = tokio::signal::ctrl_c() => {
            cancel.cancel().await;
            Err(mixer::SessionError::Cancelled)
        }
    };

    printer.abort();
    match outcome {
        Ok(SequenceOutcome::Done) => Ok(()),
        Ok(SequenceOutcome::Aborted) | Err(mixer::SessionError::Cancelled) => {
            println!("cancelled; all pumps off");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Render session events as the kiosk's status lines.
async fn print_status(mut events: broadcast::Receiver<SessionEvent>) {
    let mut last = String::new();
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => break,
        };
        let line = match event {
            SessionEvent::ScanProgress(p) if p > 0.0 => "Hold still...".to_string(),
            SessionEvent::ScanProgress(_) => "Searching for face...".to_string(),
            SessionEvent::Captured => "Captured".to_string(),
            SessionEvent::Analyzing => "Analyzing...".to_string(),
            SessionEvent::MoodDetected { label, scores } => {
                println!("MOOD DETECTED: {label}");
                for (mood, confidence) in scores.ranked() {
                    println!("  {:<9} {confidence:5.1}%", mood.as_str());
                }
                continue;
            }
            SessionEvent::Dispensing { pump, secs } => {
                format!("Dispensing: Pump {pump} for {secs:.1}s")
            }
            SessionEvent::DrinkReady { name } => format!("drink ready! ({name})"),
            SessionEvent::Aborted => "Scan cancelled".to_string(),
            SessionEvent::Failed(reason) => format!("Failed: {reason}"),
        };
        if line != last {
            println!("{line}");
            last = line;
        }
    }
}
