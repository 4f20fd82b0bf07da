//! In-process RF scene
//!
//! An [`RfScene`] plays the part of the RF server that devices connect to.
//! Each connection gets a `u16` id, in connection order and never reused;
//! once every id below [`BROADCAST_ADDRESS`] is taken further devices are
//! refused. Frames read from a connection have their
//! `sender` field overwritten with that id, then go to every other
//! connection whose id is the frame's `receiver`, or to all of them when the
//! receiver is [`BROADCAST_ADDRESS`].
//!
//! When a connection drops, the remaining devices receive a
//! `DeactivateNotification` with reason `RfLinkLoss` sent from its id.
//!
//! Routing runs in a hub task; every connection adds one reader task and one
//! writer task.

use std::collections::BTreeMap;

use rf_protocol::{
    DeactivateNotification, DeactivateReason, DeactivateType, RfHeader, RfPacket,
    BROADCAST_ADDRESS,
};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::SceneError;
use crate::framer::split;

/// Messages from connection tasks to the hub
#[derive(Debug)]
enum SceneEvent {
    Connected {
        id: u16,
        outbound: mpsc::UnboundedSender<Vec<u8>>,
    },
    Frame {
        sender: u16,
        frame: Vec<u8>,
    },
    Disconnected {
        id: u16,
    },
}

/// Handle to a running RF scene
///
/// Dropping the handle stops accepting devices; routing continues until the
/// last connection closes.
#[derive(Debug)]
pub struct RfScene {
    next_id: u16,
    events: mpsc::UnboundedSender<SceneEvent>,
}

impl RfScene {
    /// Start an empty scene
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new() -> Self {
        let (events, event_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_scene(event_rx));
        Self { next_id: 0, events }
    }

    /// Connect a device and return its id
    ///
    /// The stream is dropped if no id is left.
    pub fn add_device<S>(&mut self, stream: S) -> Result<u16, SceneError>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        if self.next_id == BROADCAST_ADDRESS {
            warn!("Refusing RF device: {}", SceneError::AddressesExhausted);
            return Err(SceneError::AddressesExhausted);
        }
        let id = self.next_id;
        self.next_id += 1;

        let (mut reader, mut writer) = split(stream);
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let _ = self.events.send(SceneEvent::Connected { id, outbound });

        let events = self.events.clone();
        tokio::spawn(async move {
            loop {
                match reader.read_frame().await {
                    Ok(mut frame) => {
                        if frame.len() >= 2 {
                            frame[0..2].copy_from_slice(&id.to_le_bytes());
                        }
                        if events.send(SceneEvent::Frame { sender: id, frame }).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        debug!("RF device #{} connection closed: {}", id, e);
                        break;
                    }
                }
            }
            let _ = events.send(SceneEvent::Disconnected { id });
        });

        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                if let Err(e) = writer.write_frame(&frame).await {
                    warn!("Failed to deliver frame to RF device #{}: {}", id, e);
                    break;
                }
            }
        });

        info!("Accepted RF device #{}", id);
        Ok(id)
    }
}

impl Default for RfScene {
    fn default() -> Self {
        Self::new()
    }
}

/// Hub task: owns the routing table
async fn run_scene(mut events: mpsc::UnboundedReceiver<SceneEvent>) {
    let mut devices: BTreeMap<u16, mpsc::UnboundedSender<Vec<u8>>> = BTreeMap::new();

    while let Some(event) = events.recv().await {
        match event {
            SceneEvent::Connected { id, outbound } => {
                devices.insert(id, outbound);
            }
            SceneEvent::Frame { sender, frame } => match RfHeader::parse(&frame) {
                Ok((header, _)) => route(&devices, sender, &header, &frame),
                Err(e) => warn!("Dropping frame from RF device #{}: {}", sender, e),
            },
            SceneEvent::Disconnected { id } => {
                devices.remove(&id);
                info!("RF device #{} disconnected", id);

                for (&other, outbound) in &devices {
                    let notification = RfPacket::from(DeactivateNotification {
                        sender: id,
                        receiver: other,
                        type_: DeactivateType::IdleMode,
                        reason: DeactivateReason::RfLinkLoss,
                        ..Default::default()
                    });
                    let _ = outbound.send(notification.encode());
                }
            }
        }
    }

    debug!("RF scene stopped");
}

/// Deliver `frame` to every device it is addressed to, except its sender
fn route(
    devices: &BTreeMap<u16, mpsc::UnboundedSender<Vec<u8>>>,
    sender: u16,
    header: &RfHeader,
    frame: &[u8],
) {
    for (&id, outbound) in devices {
        if id != sender && header.is_addressed_to(id) {
            let _ = outbound.send(frame.to_vec());
        }
    }
}
