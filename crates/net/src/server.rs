//! TCP server hosting Hustings rooms
//!
//! Every connection declares its role with its first message. Host
//! connections drive one room; participant connections join one. Reads
//! happen per connection task, while room handlers run synchronously under
//! the room's lock and push outgoing events into per-connection queues.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hustings_core::{
    ids, Connection, HostCommand, HostEvent, Participant, ParticipantEvent, ParticipantId,
    RoomRegistry, SharedRoom,
};
use tokio::io::{ReadHalf, WriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::frame::{read_frame, write_frame};
use crate::protocol::{ClientMessage, ServerMessage};

/// Outgoing queue depth per connection
const OUTBOX_CAPACITY: usize = 256;

/// Idle-room eviction schedule
#[derive(Debug, Clone, Copy)]
pub struct IdleSweep {
    /// Rooms idle this long are evicted
    pub max_idle: Duration,
    /// How often to look
    pub interval: Duration,
}

/// Outgoing queue of one connection, usable as a room link
#[derive(Clone)]
struct Outbox {
    tx: mpsc::Sender<ServerMessage>,
}

impl Outbox {
    fn push(&self, msg: ServerMessage) {
        if let Err(e) = self.tx.try_send(msg) {
            debug!(error = %e, "Dropping message for slow or closed connection");
        }
    }
}

impl Connection<HostEvent> for Outbox {
    fn send(&self, event: HostEvent) {
        self.push(ServerMessage::Host(event));
    }
}

impl Connection<ParticipantEvent> for Outbox {
    fn send(&self, event: ParticipantEvent) {
        self.push(ServerMessage::Participant(event));
    }
}

/// Server handle
pub struct Server {
    addr: SocketAddr,
    registry: Arc<RoomRegistry>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Start a new server on the given address
    pub async fn start(
        addr: SocketAddr,
        registry: Arc<RoomRegistry>,
        sweep: Option<IdleSweep>,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let bound_addr = listener.local_addr()?;

        info!(addr = %bound_addr, "Server started");

        let (shutdown_tx, _) = broadcast::channel(1);

        // Spawn accept loop
        let shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(accept_loop(listener, registry.clone(), shutdown_rx));

        // Spawn idle sweeper
        if let Some(sweep) = sweep {
            let shutdown_rx = shutdown_tx.subscribe();
            tokio::spawn(sweep_task(registry.clone(), sweep, shutdown_rx));
        }

        Ok(Server {
            addr: bound_addr,
            registry,
            shutdown_tx,
        })
    }

    /// Get the server's bound address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.registry
    }

    /// Shutdown the server
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
        info!("Server shutdown initiated");
    }
}

/// Accept incoming connections
async fn accept_loop(
    listener: TcpListener,
    registry: Arc<RoomRegistry>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, addr)) => {
                        debug!(addr = %addr, "New connection");
                        tokio::spawn(handle_connection(stream, addr, registry.clone()));
                    }
                    Err(e) => {
                        error!(error = %e, "Accept failed");
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Accept loop shutting down");
                break;
            }
        }
    }
}

/// Handle a single client connection
async fn handle_connection(stream: TcpStream, addr: SocketAddr, registry: Arc<RoomRegistry>) {
    let (mut reader, writer) = tokio::io::split(stream);

    let (tx, rx) = mpsc::channel(OUTBOX_CAPACITY);
    let writer_handle = tokio::spawn(writer_task(writer, rx));
    let outbox = Outbox { tx };

    // First message decides the role
    let hello = loop {
        match read_frame::<ClientMessage, _>(&mut reader).await {
            Ok(ClientMessage::Ping) => outbox.push(ServerMessage::Pong),
            Ok(msg) => break msg,
            Err(Error::ConnectionClosed) => {
                debug!(addr = %addr, "Closed before handshake");
                writer_handle.abort();
                return;
            }
            Err(e) => {
                warn!(addr = %addr, error = %e, "Handshake failed");
                writer_handle.abort();
                return;
            }
        }
    };

    match hello {
        ClientMessage::CreateRoom => {
            let (code, host_secret, room) = registry.create(Arc::new(outbox.clone()));
            outbox.push(ServerMessage::RoomCreated {
                code: code.clone(),
                host_secret,
            });
            info!(addr = %addr, room = %code, "Host connected");
            host_session(&mut reader, &outbox, &registry, &room, &code).await;
        }
        ClientMessage::JoinRoom {
            code,
            name,
            properties,
        } => {
            let code = ids::normalize_room_code(&code);
            let quality = registry.config().initial_quality;
            let participant = Participant::new(name, properties, quality, Arc::new(outbox.clone()));
            let participant_id = participant.id;

            match registry.join(&code, participant) {
                Ok(()) => {
                    outbox.push(ServerMessage::Joined {
                        code: code.clone(),
                        participant_id,
                        quality,
                    });
                    info!(addr = %addr, room = %code, participant_id = %participant_id, "Participant joined");
                    participant_session(&mut reader, &outbox, &registry, &code, participant_id).await;
                }
                Err(e) => {
                    warn!(addr = %addr, room = %code, error = %e, "Join rejected");
                    outbox.push(ServerMessage::JoinRejected {
                        reason: e.to_string(),
                    });
                }
            }
        }
        other => {
            warn!(addr = %addr, message = ?other, "Expected CreateRoom or JoinRoom");
            outbox.push(ServerMessage::Error {
                reason: "Expected CreateRoom or JoinRoom".into(),
            });
        }
    }

    // Let queued messages flush before the writer goes away
    drop(outbox);
    let _ = writer_handle.await;
}

/// Read loop for a room's host
async fn host_session(
    reader: &mut ReadHalf<TcpStream>,
    outbox: &Outbox,
    registry: &RoomRegistry,
    room: &SharedRoom,
    code: &str,
) {
    loop {
        let msg = match read_frame::<ClientMessage, _>(reader).await {
            Ok(msg) => msg,
            Err(Error::ConnectionClosed) => {
                debug!(room = %code, "Host connection closed");
                break;
            }
            Err(e) => {
                warn!(room = %code, error = %e, "Host read error");
                break;
            }
        };

        let command = match msg {
            ClientMessage::GameStarted => HostCommand::GameStarted,
            ClientMessage::Cutscene => HostCommand::Cutscene,
            ClientMessage::RoundResult { winner, loser } => HostCommand::RoundResult { winner, loser },
            ClientMessage::StartRound { suppress_clear } => HostCommand::StartRound { suppress_clear },
            ClientMessage::Message { payload, to } => HostCommand::Message { payload, to },
            ClientMessage::Callback { payload, to } => HostCommand::Callback { payload, to },
            ClientMessage::EndRound { request_id } => {
                let reply = outbox.clone();
                HostCommand::EndRound(Box::new(move |results| {
                    reply.push(ServerMessage::RoundResults {
                        request_id,
                        results,
                    });
                }))
            }
            ClientMessage::Ping => {
                outbox.push(ServerMessage::Pong);
                continue;
            }
            other => {
                debug!(room = %code, message = ?other, "Ignoring non-host message from host");
                continue;
            }
        };

        if let Err(e) = registry.dispatch_room(room, command) {
            warn!(room = %code, error = %e, "Room no longer available");
            outbox.push(ServerMessage::Error {
                reason: e.to_string(),
            });
            return;
        }
    }

    if let Err(e) = registry.dispatch_room(room, HostCommand::HostDisconnected) {
        debug!(room = %code, error = %e, "Room already gone at host disconnect");
    }
    info!(room = %code, "Host disconnected");
}

/// Read loop for a participant
async fn participant_session(
    reader: &mut ReadHalf<TcpStream>,
    outbox: &Outbox,
    registry: &RoomRegistry,
    code: &str,
    id: ParticipantId,
) {
    loop {
        match read_frame::<ClientMessage, _>(reader).await {
            Ok(ClientMessage::Finished) => registry.mark_finished(code, id),
            Ok(ClientMessage::Ping) => outbox.push(ServerMessage::Pong),
            Ok(other) => {
                debug!(room = %code, participant_id = %id, message = ?other, "Ignoring host-only message from participant");
            }
            Err(Error::ConnectionClosed) => {
                debug!(room = %code, participant_id = %id, "Participant connection closed");
                break;
            }
            Err(e) => {
                warn!(room = %code, participant_id = %id, error = %e, "Participant read error");
                break;
            }
        }
    }

    registry.leave(code, id);
    info!(room = %code, participant_id = %id, "Participant disconnected");
}

/// Writer task - sends messages to the client
async fn writer_task(mut writer: WriteHalf<TcpStream>, mut rx: mpsc::Receiver<ServerMessage>) {
    while let Some(msg) = rx.recv().await {
        if let Err(e) = write_frame(&mut writer, &msg).await {
            debug!(error = %e, "Write failed");
            break;
        }
    }
}

/// Sweeper task - evicts idle rooms on a fixed interval
async fn sweep_task(
    registry: Arc<RoomRegistry>,
    sweep: IdleSweep,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(sweep.interval) => {
                let evicted = registry.evict_idle(sweep.max_idle);
                if evicted > 0 {
                    info!(evicted, remaining = registry.len(), "Evicted idle rooms");
                }
            }
            _ = shutdown_rx.recv() => {
                debug!("Sweep task shutting down");
                break;
            }
        }
    }
}
