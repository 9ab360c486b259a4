//
// Copyright (c) The SLP Directory Agent Contributors
//
// SPDX-License-Identifier: MIT
//

use tracing::warn;

use crate::url::ServiceKey;

/// Wire error codes the core emits (§6, subset of RFC 2608 table 10).
pub const ERR_SUCCESS: u16 = 0;
pub const ERR_SCOPE_NOT_SUPPORTED: u16 = 2;
pub const ERR_AUTHENTICATION_UNKNOWN: u16 = 3;
pub const ERR_INVALID_REGISTRATION: u16 = 7;
pub const ERR_INVALID_UPDATE: u16 = 13;

/// Cache mutation failures (§4.1). Each variant carries a wire error
/// code via [`CacheError::code`] so handlers can turn it directly into a
/// protocol reply (§4.3, §7).
#[derive(Debug)]
pub enum CacheError {
    /// `put()` was given a service with an empty scope list.
    InvalidRegistration,
    /// `addAttributes`/`removeAttributes` targeted an absent key.
    InvalidUpdate(ServiceKey),
}

impl CacheError {
    pub fn code(&self) -> u16 {
        match self {
            CacheError::InvalidRegistration => ERR_INVALID_REGISTRATION,
            CacheError::InvalidUpdate(..) => ERR_INVALID_UPDATE,
        }
    }

    pub(crate) fn log(&self) {
        match self {
            CacheError::InvalidRegistration => warn!("{}", self),
            CacheError::InvalidUpdate(key) => warn!(%key, "{}", self),
        }
    }
}

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheError::InvalidRegistration => {
                write!(f, "registration has no scopes")
            }
            CacheError::InvalidUpdate(..) => {
                write!(f, "update targets an unregistered service")
            }
        }
    }
}

impl std::error::Error for CacheError {}

/// Protocol-level errors a handler can surface to a peer (§7 kind 1).
#[derive(Debug)]
pub enum ProtocolError {
    ScopeNotSupported,
    InvalidUpdate,
    InvalidRegistration,
}

impl ProtocolError {
    pub fn code(&self) -> u16 {
        match self {
            ProtocolError::ScopeNotSupported => ERR_SCOPE_NOT_SUPPORTED,
            ProtocolError::InvalidUpdate => ERR_INVALID_UPDATE,
            ProtocolError::InvalidRegistration => ERR_INVALID_REGISTRATION,
        }
    }
}

impl From<CacheError> for ProtocolError {
    fn from(error: CacheError) -> ProtocolError {
        match error {
            CacheError::InvalidRegistration => ProtocolError::InvalidRegistration,
            CacheError::InvalidUpdate(..) => ProtocolError::InvalidUpdate,
        }
    }
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolError::ScopeNotSupported => write!(f, "scope not supported"),
            ProtocolError::InvalidUpdate => write!(f, "invalid update"),
            ProtocolError::InvalidRegistration => write!(f, "invalid registration"),
        }
    }
}

impl std::error::Error for ProtocolError {}
