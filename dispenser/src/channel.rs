//! Line-oriented command transport to the remote actuator controller.
//!
//! The protocol is ASCII, one command per line; the only command this
//! system emits is `DISPENSE <MOOD_LABEL>`. The channel is opened once
//! per process and never reconnects on its own. The controller may echo
//! a reply line, but nothing downstream depends on one: step timing is
//! enforced client-side by the sequencer.

use std::time::Duration;

use classifier::MoodLabel;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("serial channel not connected")]
    NotConnected,
    #[error("serial I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// One outbound command line. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialCommand {
    line: String,
}

impl SerialCommand {
    /// The dispense announcement: `DISPENSE <MOOD_LABEL>`.
    pub fn dispense(mood: MoodLabel) -> Self {
        Self {
            line: format!("DISPENSE {mood}"),
        }
    }

    /// The command text, without the trailing newline.
    pub fn as_line(&self) -> &str {
        &self.line
    }
}

/// Command channel over any byte stream.
///
/// Generic so tests run over [`tokio::io::duplex`]; production uses the
/// serial port from [`open_serial`]. `send` takes `&mut self`, which is
/// the serialization discipline: one command in flight per channel.
pub struct CommandChannel<S> {
    stream: Option<BufReader<S>>,
}

impl<S: AsyncRead + AsyncWrite + Unpin + Send> CommandChannel<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream: Some(BufReader::new(stream)),
        }
    }

    /// A channel with no connection behind it. Every send fails with
    /// [`ChannelError::NotConnected`], matching a rig whose controller
    /// never came up.
    pub fn unconnected() -> Self {
        Self { stream: None }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Write the command line and flush it to the wire.
    pub async fn send(&mut self, command: &SerialCommand) -> Result<(), ChannelError> {
        let stream = self.stream.as_mut().ok_or(ChannelError::NotConnected)?;
        info!(command = command.as_line(), "sending serial command");
        stream.write_all(command.as_line().as_bytes()).await?;
        stream.write_all(b"\n").await?;
        stream.flush().await?;
        Ok(())
    }

    /// Best-effort read of one reply line within `wait`.
    ///
    /// `Ok(None)` when nothing arrives in time; the controller is not
    /// required to answer.
    pub async fn read_reply(&mut self, wait: Duration) -> Result<Option<String>, ChannelError> {
        let stream = self.stream.as_mut().ok_or(ChannelError::NotConnected)?;
        let mut line = String::new();
        match tokio::time::timeout(wait, stream.read_line(&mut line)).await {
            Err(_) => Ok(None),
            Ok(Ok(0)) => Ok(None),
            Ok(Ok(_)) => {
                let reply = line.trim_end().to_string();
                debug!(%reply, "controller replied");
                Ok(Some(reply))
            }
            Ok(Err(e)) => Err(e.into()),
        }
    }
}

/// Open the physical serial port, once per process.
///
/// `settle` covers the controller's reset-on-open (Arduino-style boards
/// reboot when the port opens); commands sent before it elapses are lost.
pub async fn open_serial(
    path: &str,
    baud: u32,
    settle: Duration,
) -> Result<CommandChannel<SerialStream>, ChannelError> {
    info!(path, baud, "opening serial port");
    let stream = tokio_serial::new(path, baud)
        .open_native_async()
        .map_err(|_| ChannelError::NotConnected)?;
    tokio::time::sleep(settle).await;
    Ok(CommandChannel::new(stream))
}
