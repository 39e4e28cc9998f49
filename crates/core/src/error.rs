//! Error types for Hustings Core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Room not found: {0}")]
    RoomNotFound(String),

    #[error("Room {code} is full ({capacity} participants)")]
    RoomFull { code: String, capacity: usize },

    #[error("Game already in progress in room {0}")]
    GameInProgress(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
