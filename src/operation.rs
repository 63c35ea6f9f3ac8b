// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{UserKey, UserValue};

/// Kind of a write operation
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OpKind {
    /// Insert or replace
    Put,

    /// Delete
    Remove,

    /// Insert only if the key does not exist
    PutIfAbsent,
}

impl TryFrom<u8> for OpKind {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Put),
            1 => Ok(Self::Remove),
            2 => Ok(Self::PutIfAbsent),
            _ => Err(()),
        }
    }
}

impl From<OpKind> for u8 {
    fn from(value: OpKind) -> Self {
        match value {
            OpKind::Put => 0,
            OpKind::Remove => 1,
            OpKind::PutIfAbsent => 2,
        }
    }
}

/// A write operation, as received from a batch or a stream
///
/// The operation tag is kept as a raw byte, because it usually comes from
/// the outside; unrecognized tags are rejected when the operation is applied.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Operation {
    /// Operation tag, see [`OpKind`]
    pub op: u8,

    /// Key
    pub key: UserKey,

    /// Value (ignored by removals)
    pub value: Option<UserValue>,
}

impl Operation {
    /// Creates an operation from its raw parts.
    pub fn new<K: Into<UserKey>>(op: u8, key: K, value: Option<UserValue>) -> Self {
        Self {
            op,
            key: key.into(),
            value,
        }
    }

    /// Creates a put operation.
    pub fn put<K: Into<UserKey>, V: Into<UserValue>>(key: K, value: V) -> Self {
        Self::new(OpKind::Put.into(), key, Some(value.into()))
    }

    /// Creates a put-if-absent operation.
    pub fn put_if_absent<K: Into<UserKey>, V: Into<UserValue>>(key: K, value: V) -> Self {
        Self::new(OpKind::PutIfAbsent.into(), key, Some(value.into()))
    }

    /// Creates a remove operation.
    pub fn remove<K: Into<UserKey>>(key: K) -> Self {
        Self::new(OpKind::Remove.into(), key, None)
    }

    /// Returns the kind of the operation.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnknownOp`] if the tag is not recognized.
    pub fn kind(&self) -> crate::Result<OpKind> {
        OpKind::try_from(self.op).map_err(|()| crate::Error::UnknownOp(self.op))
    }
}
