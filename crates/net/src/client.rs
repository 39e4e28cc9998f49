//! TCP client for hosting or joining a room
//!
//! Used by game front-ends and by the integration tests. Reading and writing
//! run on separate tasks so a pending read never swallows an outgoing frame.

use std::net::SocketAddr;

use hustings_core::ParticipantId;
use serde_json::Value;
use tokio::io::{AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::frame::{read_frame, write_frame};
use crate::protocol::{ClientMessage, ServerMessage};

/// Client handle for network operations
pub struct Client {
    event_rx: mpsc::Receiver<ServerMessage>,
    cmd_tx: mpsc::Sender<ClientCommand>,
}

enum ClientCommand {
    Send(ClientMessage),
    Disconnect,
}

/// A client that created a room
pub struct HostClient {
    pub client: Client,
    pub code: String,
    pub host_secret: String,
}

/// A client that joined a room
pub struct ParticipantClient {
    pub client: Client,
    pub code: String,
    pub participant_id: ParticipantId,
    pub quality: f64,
}

impl Client {
    /// Open a raw connection to a server
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        info!(addr = %addr, "Connecting to server");

        let stream = TcpStream::connect(addr).await?;
        let (reader, writer) = tokio::io::split(stream);

        let (event_tx, event_rx) = mpsc::channel(64);
        let (cmd_tx, cmd_rx) = mpsc::channel(64);

        tokio::spawn(reader_task(reader, event_tx));
        tokio::spawn(writer_task(writer, cmd_rx));

        Ok(Client { event_rx, cmd_tx })
    }

    /// Connect and open a new room as its host
    pub async fn create_room(addr: SocketAddr) -> Result<HostClient> {
        let mut client = Self::connect(addr).await?;
        client.send(ClientMessage::CreateRoom).await?;

        loop {
            match client.next_message().await {
                Some(ServerMessage::RoomCreated { code, host_secret }) => {
                    return Ok(HostClient {
                        client,
                        code,
                        host_secret,
                    })
                }
                Some(ServerMessage::Error { reason }) => return Err(Error::Rejected(reason)),
                Some(other) => debug!(message = ?other, "Ignoring message before RoomCreated"),
                None => return Err(Error::ConnectionClosed),
            }
        }
    }

    /// Connect and join an existing room
    pub async fn join_room(
        addr: SocketAddr,
        code: &str,
        name: &str,
        properties: Value,
    ) -> Result<ParticipantClient> {
        let mut client = Self::connect(addr).await?;
        client
            .send(ClientMessage::JoinRoom {
                code: code.to_string(),
                name: name.to_string(),
                properties,
            })
            .await?;

        // Room events (such as ownership) may arrive ahead of the acknowledgment
        let mut early = Vec::new();
        loop {
            match client.next_message().await {
                Some(ServerMessage::Joined {
                    code,
                    participant_id,
                    quality,
                }) => {
                    if !early.is_empty() {
                        client.requeue(early);
                    }
                    return Ok(ParticipantClient {
                        client,
                        code,
                        participant_id,
                        quality,
                    });
                }
                Some(ServerMessage::JoinRejected { reason }) | Some(ServerMessage::Error { reason }) => {
                    warn!(reason = %reason, "Join rejected");
                    return Err(Error::Rejected(reason));
                }
                Some(other) => early.push(other),
                None => return Err(Error::ConnectionClosed),
            }
        }
    }

    /// Queue a message for the server
    pub async fn send(&self, msg: ClientMessage) -> Result<()> {
        self.cmd_tx
            .send(ClientCommand::Send(msg))
            .await
            .map_err(|_| Error::NotConnected)
    }

    /// Get the next server message
    pub async fn next_message(&mut self) -> Option<ServerMessage> {
        self.event_rx.recv().await
    }

    /// Close the connection
    pub async fn disconnect(&self) {
        let _ = self.cmd_tx.send(ClientCommand::Disconnect).await;
    }

    /// Put messages read during a handshake back in front of the queue
    fn requeue(&mut self, early: Vec<ServerMessage>) {
        let (tx, rx) = mpsc::channel(64);
        let mut previous = std::mem::replace(&mut self.event_rx, rx);
        tokio::spawn(async move {
            for msg in early {
                if tx.send(msg).await.is_err() {
                    return;
                }
            }
            while let Some(msg) = previous.recv().await {
                if tx.send(msg).await.is_err() {
                    return;
                }
            }
        });
    }
}

/// Reader task - forwards server messages to the handle
async fn reader_task(mut reader: ReadHalf<TcpStream>, event_tx: mpsc::Sender<ServerMessage>) {
    loop {
        match read_frame::<ServerMessage, _>(&mut reader).await {
            Ok(msg) => {
                if event_tx.send(msg).await.is_err() {
                    break;
                }
            }
            Err(Error::ConnectionClosed) => {
                debug!("Server closed connection");
                break;
            }
            Err(e) => {
                warn!(error = %e, "Read error");
                break;
            }
        }
    }
}

/// Writer task - sends queued messages until told to disconnect
async fn writer_task(mut writer: WriteHalf<TcpStream>, mut cmd_rx: mpsc::Receiver<ClientCommand>) {
    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            ClientCommand::Send(msg) => {
                if let Err(e) = write_frame(&mut writer, &msg).await {
                    warn!(error = %e, "Write error");
                    break;
                }
            }
            ClientCommand::Disconnect => {
                debug!("Disconnect requested");
                break;
            }
        }
    }

    let _ = writer.shutdown().await;
    info!("Disconnected from server");
}
