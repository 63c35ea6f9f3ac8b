// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

/// Represents errors that can occur when using sorted maps and the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Key is empty
    InvalidKey,

    /// Map name is empty
    InvalidName,

    /// A map with the given name already exists
    AlreadyExists(String),

    /// No map with the given name exists
    NotFound(String),

    /// Transaction contains no operations
    EmptyBatch,

    /// Unrecognized operation tag in a batch or stream
    UnknownOp(u8),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidKey => write!(f, "key must not be empty"),
            Self::InvalidName => write!(f, "name must not be empty"),
            Self::AlreadyExists(name) => write!(f, "sorted map {name:?} already exists"),
            Self::NotFound(name) => write!(f, "sorted map {name:?} not found"),
            Self::EmptyBatch => write!(f, "transaction must not be empty"),
            Self::UnknownOp(op) => write!(f, "unknown operation {op:#04x}"),
        }
    }
}

impl std::error::Error for Error {}

/// Sorted map result
pub type Result<T> = std::result::Result<T, Error>;
