//! One scan→classify→dispense cycle.

use std::sync::Arc;
use std::time::Duration;

use classifier::{ClassificationError, Classifier, EmotionScores, MoodLabel};
use dispenser::{
    ChannelError, CommandChannel, DispenseError, DispenseEvent, PumpBank, RecipeBook,
    SequenceOutcome, Sequencer, SerialCommand,
};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};
use vision::{
    CaptureConfig, CaptureEvent, CaptureMonitor, DeviceError, Frame, FrameSource,
    PresenceDetector, ScanUpdate, scan_loop,
};

use crate::events::SessionEvent;

/// Anything that can end a session early. Every variant returns the
/// system to idle; none is fatal to the process.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error(transparent)]
    Classification(#[from] ClassificationError),
    #[error(transparent)]
    Dispense(#[from] DispenseError),
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error("session cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub capture: CaptureConfig,
    /// Frame cadence of the detection loop.
    pub cadence: Duration,
    /// How long to listen for the controller's optional reply line.
    pub reply_wait: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            capture: CaptureConfig::default(),
            cadence: Duration::from_millis(50),
            reply_wait: Duration::from_millis(200),
        }
    }
}

/// Lets any task cancel the session and kill the pumps, without waiting
/// for the running task to reach a checkpoint.
#[derive(Clone)]
pub struct CancelHandle {
    cancel: Arc<watch::Sender<bool>>,
    bank: PumpBank,
}

impl CancelHandle {
    /// Raise the cancel flag, then force every pump off. Idempotent.
    pub async fn cancel(&self) {
        warn!("session cancel requested");
        let _ = self.cancel.send(true);
        if let Err(fault) = self.bank.all_off().await {
            warn!(%fault, "kill switch write failed");
        }
    }
}

/// Owns the collaborators for one session at a time.
pub struct Session<S> {
    source: Box<dyn FrameSource>,
    detector: Box<dyn PresenceDetector>,
    classifier: Arc<dyn Classifier>,
    book: RecipeBook,
    sequencer: Sequencer,
    channel: Option<CommandChannel<S>>,
    config: SessionConfig,
    events: broadcast::Sender<SessionEvent>,
    cancel_tx: Arc<watch::Sender<bool>>,
    cancel_rx: watch::Receiver<bool>,
}

impl<S: AsyncRead + AsyncWrite + Unpin + Send> Session<S> {
    pub fn new(
        source: Box<dyn FrameSource>,
        detector: Box<dyn PresenceDetector>,
        classifier: Arc<dyn Classifier>,
        bank: PumpBank,
        book: RecipeBook,
        channel: Option<CommandChannel<S>>,
        config: SessionConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let sequencer = Sequencer::new(bank);
        spawn_dispense_forwarder(sequencer.subscribe(), events.clone());
        Self {
            source,
            detector,
            classifier,
            book,
            sequencer,
            channel,
            config,
            events,
            cancel_tx: Arc::new(cancel_tx),
            cancel_rx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            cancel: self.cancel_tx.clone(),
            bank: self.sequencer.bank(),
        }
    }

    /// Run the detection loop until the capture fires.
    pub async fn scan(&mut self) -> Result<CaptureEvent, SessionError> {
        let monitor = CaptureMonitor::new(self.config.capture);
        let (updates, progress_rx) = broadcast::channel(64);
        spawn_progress_forwarder(progress_rx, self.events.clone());

        let captured = scan_loop(
            self.source.as_mut(),
            self.detector.as_mut(),
            monitor,
            self.config.cadence,
            updates,
            self.cancel_rx.clone(),
        )
        .await?;

        match captured {
            Some(event) => {
                let _ = self.events.send(SessionEvent::Captured);
                Ok(event)
            }
            None => Err(SessionError::Cancelled),
        }
    }

    /// Classify the captured frame, isolated from this task, and report
    /// the dominant mood.
    pub async fn classify(
        &self,
        frame: &Frame,
    ) -> Result<(MoodLabel, EmotionScores), SessionError> {
        let _ = self.events.send(SessionEvent::Analyzing);
        let classifier = self.classifier.clone();
        let image = frame.bytes.clone();
        let scores = tokio::spawn(async move { classifier.classify(&image).await })
            .await
            .map_err(|e| {
                ClassificationError::Unavailable(format!("classification task failed: {e}"))
            })??;
        let label = scores.dominant();
        info!(%label, "dominant mood");
        let _ = self.events.send(SessionEvent::MoodDetected {
            label,
            scores: scores.clone(),
        });
        Ok((label, scores))
    }

    /// Announce the dispense on the wire and run the recipe.
    ///
    /// The serial announce and the sequencer run both live here: this task
    /// holds the channel and the bank for the whole dispense.
    pub async fn dispense(&mut self, label: MoodLabel) -> Result<SequenceOutcome, SessionError> {
        let recipe = self.book.plan(label).clone();
        info!(recipe = %recipe.name, %label, "dispensing");

        match self.channel.as_mut() {
            Some(channel) => {
                channel.send(&SerialCommand::dispense(label)).await?;
                if let Some(reply) = channel.read_reply(self.config.reply_wait).await? {
                    info!(%reply, "controller acknowledged");
                }
            }
            None => warn!("no serial port configured; skipping wire announce"),
        }

        let outcome = self
            .sequencer
            .run(&recipe, self.cancel_rx.clone())
            .await?;
        Ok(outcome)
    }

    /// One full kiosk cycle. Any failure emits [`SessionEvent::Failed`]
    /// and returns the system to idle.
    pub async fn run_once(&mut self) -> Result<SequenceOutcome, SessionError> {
        let result = self.cycle().await;
        match &result {
            Err(SessionError::Cancelled) | Ok(SequenceOutcome::Aborted) => {
                let _ = self.events.send(SessionEvent::Aborted);
            }
            Err(e) => {
                let _ = self.events.send(SessionEvent::Failed(e.to_string()));
            }
            Ok(SequenceOutcome::Done) => {}
        }
        result
    }

    async fn cycle(&mut self) -> Result<SequenceOutcome, SessionError> {
        let capture = self.scan().await?;
        let (label, _scores) = self.classify(&capture.frame).await?;
        self.dispense(label).await
    }
}

fn spawn_progress_forwarder(
    mut updates: broadcast::Receiver<ScanUpdate>,
    events: broadcast::Sender<SessionEvent>,
) {
    tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(ScanUpdate::Progress(p)) => {
                    let _ = events.send(SessionEvent::ScanProgress(p));
                }
                Ok(ScanUpdate::Captured) => {}
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

fn spawn_dispense_forwarder(
    mut updates: broadcast::Receiver<DispenseEvent>,
    events: broadcast::Sender<SessionEvent>,
) {
    tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(DispenseEvent::Started { .. }) => {}
                Ok(DispenseEvent::Step { pump, secs }) => {
                    let _ = events.send(SessionEvent::Dispensing { pump, secs });
                }
                Ok(DispenseEvent::Done { recipe }) => {
                    let _ = events.send(SessionEvent::DrinkReady { name: recipe });
                }
                Ok(DispenseEvent::Aborted) => {}
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}
