//! Emulated Type 4A tag device
//!
//! A [`T4atDevice`] owns one RF connection and runs it in one of two roles:
//!
//! - **Listen**: answers NFC-A polls with its NFCID1 and, once selected,
//!   enters an active session with the poller.
//! - **Poll**: broadcasts NFC-A polls, selects the first Type 4A tag that
//!   answers and enters an active session with it.
//!
//! An active session lasts until a `DeactivateNotification` is received or
//! [`DeviceCommand::Deactivate`] is sent; the role loop then resumes.
//!
//! The device is driven by a single `select!` over the next received packet,
//! the command channel and, while waiting for a response, a deadline.
//! State changes are published on a broadcast channel for observers.

use std::time::Duration;

use rf_protocol::{
    Data, DeactivateNotification, DeactivateReason, DeactivateType, NfcAPollResponse,
    PollCommand, Protocol, RfPacket, T4ATSelectCommand, T4ATSelectResponse, Technology,
    BROADCAST_ADDRESS, INT_PROTOCOL_T4AT,
};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{broadcast, mpsc};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::config::DeviceConfig;
use crate::error::DeviceError;
use crate::framer::{RfReader, RfWriter};

/// Capacity of the event channel
const EVENT_CAPACITY: usize = 64;

/// First byte of a generated NFCID1
const NFCID1_PREFIX: u8 = 0x08;

/// Role the device plays on the RF link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceMode {
    /// Passive tag waiting to be discovered
    Listen,
    /// Reader discovering and selecting tags
    Poll,
}

/// Current state of the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceState {
    /// Not running
    #[default]
    Idle,
    /// Waiting for polls in listen mode
    Listening,
    /// Discovering tags in poll mode
    Polling,
    /// Session established with `peer`
    ActiveSession { peer: u16 },
}

/// Commands that can be sent to a running device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCommand {
    /// End the active session, notifying the peer
    Deactivate {
        type_: DeactivateType,
        reason: DeactivateReason,
    },
    /// Send application data to the peer of the active session
    SendData(Vec<u8>),
    /// Stop the device
    Shutdown,
}

/// Event emitted by a running device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    /// The device moved to a new state
    StateChanged(DeviceState),
    /// The poller found a Type 4A tag
    Discovered { peer: u16, nfcid1: Vec<u8> },
    /// Application data arrived during the active session
    DataReceived { len: usize },
    /// The active session ended
    Deactivated {
        peer: u16,
        type_: DeactivateType,
        reason: DeactivateReason,
    },
}

/// Whether a role loop keeps running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Shutdown,
}

/// What woke the device up
enum Wake {
    Packet(RfPacket),
    Command(DeviceCommand),
    CommandsClosed,
    Timeout,
}

/// Outcome of waiting for a specific packet
enum Wait<T> {
    Matched(T),
    TimedOut,
    Shutdown,
}

/// Generate a random NFCID1: the fixed prefix followed by three random bytes
pub fn random_nfcid1() -> Vec<u8> {
    let mut nfcid1 = vec![NFCID1_PREFIX];
    nfcid1.extend_from_slice(&rand::random::<[u8; 3]>());
    nfcid1
}

/// T4AT device bound to one RF connection
pub struct T4atDevice<R, W> {
    reader: RfReader<R>,
    writer: RfWriter<W>,
    config: DeviceConfig,
    nfcid1: Vec<u8>,
    state: DeviceState,
    events: broadcast::Sender<DeviceEvent>,
}

impl<R, W> T4atDevice<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: RfReader<R>, writer: RfWriter<W>, config: DeviceConfig) -> Self {
        let nfcid1 = config.nfcid1.clone().unwrap_or_else(random_nfcid1);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            reader,
            writer,
            config,
            nfcid1,
            state: DeviceState::Idle,
            events,
        }
    }

    pub fn nfcid1(&self) -> &[u8] {
        &self.nfcid1
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    /// Subscribe to device events
    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.events.subscribe()
    }

    /// Run the device in `mode`
    ///
    /// Returns `Ok(())` on [`DeviceCommand::Shutdown`] or when every command
    /// sender is dropped while no session is active. A session outlives its
    /// command senders and ends only when the peer deactivates it. A
    /// transport failure or a frame that does not decode ends the run with an
    /// error.
    pub async fn run(
        &mut self,
        mode: DeviceMode,
        mut commands: mpsc::Receiver<DeviceCommand>,
    ) -> Result<(), DeviceError> {
        info!(
            "Starting T4AT device in {:?} mode, nfcid1 {:02X?}",
            mode, self.nfcid1
        );

        let result = match mode {
            DeviceMode::Listen => self.listen(&mut commands).await,
            DeviceMode::Poll => self.poll(&mut commands).await,
        };

        if let Err(e) = &result {
            warn!("T4AT device stopped: {}", e);
        }
        self.set_state(DeviceState::Idle);
        info!("T4AT device ended");
        result
    }

    /// Listen role: answer polls until selected, then serve the session
    async fn listen(
        &mut self,
        commands: &mut mpsc::Receiver<DeviceCommand>,
    ) -> Result<(), DeviceError> {
        loop {
            self.set_state(DeviceState::Listening);

            let packet = match self.next_wake(Some(&mut *commands), None).await? {
                Wake::Packet(packet) => packet,
                Wake::Command(command) => {
                    if self.idle_command(command) == Flow::Shutdown {
                        return Ok(());
                    }
                    continue;
                }
                Wake::CommandsClosed => {
                    debug!("Command channel closed for T4AT device");
                    return Ok(());
                }
                Wake::Timeout => continue,
            };

            match packet {
                RfPacket::PollCommand(poll) if poll.technology == Technology::NfcA => {
                    let response = NfcAPollResponse {
                        sender: 0,
                        receiver: poll.sender,
                        protocol: Protocol::Undetermined,
                        nfcid1: self.nfcid1.clone(),
                        int_protocol: INT_PROTOCOL_T4AT,
                        bit_frame_sdd: 0,
                    };
                    self.send(response.into()).await?;
                }
                RfPacket::T4ATSelectCommand(select) => {
                    let response = T4ATSelectResponse {
                        sender: 0,
                        receiver: select.sender,
                        rats_response: self.config.rats_response.clone(),
                    };
                    self.send(response.into()).await?;
                    info!("T4AT device selected by #{}", select.sender);

                    if self.session(select.sender, commands).await? == Flow::Shutdown {
                        return Ok(());
                    }
                }
                other => debug!("Listener ignoring {}", other),
            }
        }
    }

    /// Poll role: discover and select tags, one session at a time
    async fn poll(
        &mut self,
        commands: &mut mpsc::Receiver<DeviceCommand>,
    ) -> Result<(), DeviceError> {
        loop {
            self.set_state(DeviceState::Polling);

            if self.discover(commands).await? == Flow::Shutdown {
                return Ok(());
            }

            let interval = self.config.poll_interval();
            if self.pause(commands, interval).await? == Flow::Shutdown {
                return Ok(());
            }
        }
    }

    /// One poll attempt: poll, select the first T4AT responder, run the session
    ///
    /// A missing poll or select response ends the attempt without error.
    async fn discover(
        &mut self,
        commands: &mut mpsc::Receiver<DeviceCommand>,
    ) -> Result<Flow, DeviceError> {
        let poll = PollCommand {
            sender: 0,
            receiver: BROADCAST_ADDRESS,
            technology: Technology::NfcA,
            protocol: Protocol::Undetermined,
        };
        self.send(poll.into()).await?;

        let timeout = self.config.poll_timeout();
        let response = match self
            .wait_for(commands, timeout, |packet| match packet {
                // SEL_RES protocol bits 01b: configured for Type 4A tag platform
                RfPacket::NfcAPollResponse(r) if r.int_protocol == INT_PROTOCOL_T4AT => Some(r),
                _ => None,
            })
            .await?
        {
            Wait::Matched(response) => response,
            Wait::TimedOut => {
                debug!("No T4AT device answered the poll");
                return Ok(Flow::Continue);
            }
            Wait::Shutdown => return Ok(Flow::Shutdown),
        };

        let peer = response.sender;
        info!(
            "Discovered T4AT device #{} with nfcid1 {:02X?}",
            peer, response.nfcid1
        );
        self.emit(DeviceEvent::Discovered {
            peer,
            nfcid1: response.nfcid1,
        });

        let select = T4ATSelectCommand {
            sender: 0,
            receiver: peer,
            param: 0,
        };
        self.send(select.into()).await?;

        let timeout = self.config.select_timeout();
        match self
            .wait_for(commands, timeout, move |packet| match packet {
                RfPacket::T4ATSelectResponse(r) if r.sender == peer => Some(r),
                _ => None,
            })
            .await?
        {
            Wait::Matched(_) => {
                info!("T4AT device #{} activation complete", peer);
                self.session(peer, commands).await
            }
            Wait::TimedOut => {
                warn!("T4AT device #{} did not answer the select command", peer);
                Ok(Flow::Continue)
            }
            Wait::Shutdown => Ok(Flow::Shutdown),
        }
    }

    /// Active session with `peer`, until deactivated
    async fn session(
        &mut self,
        peer: u16,
        commands: &mut mpsc::Receiver<DeviceCommand>,
    ) -> Result<Flow, DeviceError> {
        self.set_state(DeviceState::ActiveSession { peer });

        // Without commands the session runs until the peer deactivates it
        let mut commands_open = true;

        loop {
            let open = commands_open.then_some(&mut *commands);
            match self.next_wake(open, None).await? {
                Wake::Packet(RfPacket::DeactivateNotification(notification)) => {
                    info!(
                        "Session with #{} deactivated by #{}: {:?}, {:?}",
                        peer, notification.sender, notification.type_, notification.reason
                    );
                    self.emit(DeviceEvent::Deactivated {
                        peer,
                        type_: notification.type_,
                        reason: notification.reason,
                    });
                    return Ok(Flow::Continue);
                }
                Wake::Packet(RfPacket::Data(data)) => {
                    debug!("Received {} data bytes from #{}", data.data.len(), data.sender);
                    self.emit(DeviceEvent::DataReceived {
                        len: data.data.len(),
                    });
                }
                Wake::Packet(other) => debug!("Session ignoring {}", other),
                Wake::Command(DeviceCommand::Deactivate { type_, reason }) => {
                    let notification = DeactivateNotification {
                        sender: 0,
                        receiver: peer,
                        technology: Technology::NfcA,
                        protocol: Protocol::IsoDep,
                        type_,
                        reason,
                    };
                    self.send(notification.into()).await?;
                    info!("Deactivated session with #{}: {:?}, {:?}", peer, type_, reason);
                    self.emit(DeviceEvent::Deactivated {
                        peer,
                        type_,
                        reason,
                    });
                    return Ok(Flow::Continue);
                }
                Wake::Command(DeviceCommand::SendData(bytes)) => {
                    let data = Data {
                        sender: 0,
                        receiver: peer,
                        technology: Technology::NfcA,
                        protocol: Protocol::IsoDep,
                        data: bytes,
                    };
                    self.send(data.into()).await?;
                }
                Wake::Command(DeviceCommand::Shutdown) => {
                    info!("Shutdown requested during session with #{}", peer);
                    return Ok(Flow::Shutdown);
                }
                Wake::CommandsClosed => {
                    debug!("Command channel closed during session with #{}", peer);
                    commands_open = false;
                }
                Wake::Timeout => {}
            }
        }
    }

    /// Wait until `accept` takes a packet or `timeout` elapses
    ///
    /// Packets `accept` declines are discarded. The deadline is fixed when
    /// the wait starts.
    async fn wait_for<T>(
        &mut self,
        commands: &mut mpsc::Receiver<DeviceCommand>,
        timeout: Duration,
        mut accept: impl FnMut(RfPacket) -> Option<T>,
    ) -> Result<Wait<T>, DeviceError> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.next_wake(Some(&mut *commands), Some(deadline)).await? {
                Wake::Packet(packet) => {
                    let name = packet.name();
                    match accept(packet) {
                        Some(matched) => return Ok(Wait::Matched(matched)),
                        None => debug!("Discarding {} while waiting", name),
                    }
                }
                Wake::Command(command) => {
                    if self.idle_command(command) == Flow::Shutdown {
                        return Ok(Wait::Shutdown);
                    }
                }
                Wake::CommandsClosed => {
                    debug!("Command channel closed for T4AT device");
                    return Ok(Wait::Shutdown);
                }
                Wake::Timeout => return Ok(Wait::TimedOut),
            }
        }
    }

    /// Sleep for `duration`, discarding received packets
    async fn pause(
        &mut self,
        commands: &mut mpsc::Receiver<DeviceCommand>,
        duration: Duration,
    ) -> Result<Flow, DeviceError> {
        match self.wait_for(commands, duration, |_| None::<()>).await? {
            Wait::Shutdown => Ok(Flow::Shutdown),
            Wait::Matched(()) | Wait::TimedOut => Ok(Flow::Continue),
        }
    }

    /// Race the next packet against the next command and the deadline
    ///
    /// With `commands` set to `None` only packets and the deadline wake the
    /// device.
    async fn next_wake(
        &mut self,
        commands: Option<&mut mpsc::Receiver<DeviceCommand>>,
        deadline: Option<Instant>,
    ) -> Result<Wake, DeviceError> {
        let timer = async move {
            match deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };
        let command = async move {
            match commands {
                Some(commands) => commands.recv().await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            packet = self.reader.read_packet() => Ok(Wake::Packet(packet?)),

            command = command => match command {
                Some(command) => Ok(Wake::Command(command)),
                None => Ok(Wake::CommandsClosed),
            },

            _ = timer => Ok(Wake::Timeout),
        }
    }

    /// Handle a command received outside an active session
    fn idle_command(&self, command: DeviceCommand) -> Flow {
        match command {
            DeviceCommand::Shutdown => {
                info!("Shutdown requested for T4AT device");
                Flow::Shutdown
            }
            other => {
                warn!("Ignoring {:?}: no active session", other);
                Flow::Continue
            }
        }
    }

    async fn send(&mut self, packet: RfPacket) -> Result<(), DeviceError> {
        self.writer.write_packet(&packet).await
    }

    fn set_state(&mut self, state: DeviceState) {
        if self.state != state {
            info!("T4AT device state {:?} -> {:?}", self.state, state);
            self.state = state;
            self.emit(DeviceEvent::StateChanged(state));
        }
    }

    fn emit(&self, event: DeviceEvent) {
        // No subscriber is fine
        let _ = self.events.send(event);
    }
}
