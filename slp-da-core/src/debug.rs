//
// Copyright (c) The SLP Directory Agent Contributors
//
// SPDX-License-Identifier: MIT
//

use tracing::debug;

use crate::url::ServiceKey;

/// DA debug messages, logged through a single call site per variant so
/// that verbosity and field choice stay centralized (§10.2).
#[derive(Debug)]
pub enum Debug<'a> {
    InstanceStart,
    InstanceStop,
    ServiceAdded(&'a ServiceKey),
    ServiceRemoved(&'a ServiceKey),
    ServiceUpdated(&'a ServiceKey),
    PurgeRun(usize),
    DropUnknownBinding(&'a str),
    DropResponderSuppressed(&'a str),
    DropWeakScopeMismatch,
    DropWrongServiceType(&'a str),
    DropUnhandledMessageType,
    UnsolicitedAdvert(&'a str),
    BootAdvert(&'a str),
    ShutdownAdvert(&'a str),
}

impl<'a> Debug<'a> {
    pub fn log(&self) {
        match self {
            Debug::InstanceStart | Debug::InstanceStop => {
                debug!("{}", self);
            }
            Debug::ServiceAdded(key)
            | Debug::ServiceRemoved(key)
            | Debug::ServiceUpdated(key) => {
                debug!(%key, "{}", self);
            }
            Debug::PurgeRun(count) => {
                debug!(%count, "{}", self);
            }
            Debug::DropUnknownBinding(iface) => {
                debug!(interface = %iface, "{}", self);
            }
            Debug::DropResponderSuppressed(remote) => {
                debug!(%remote, "{}", self);
            }
            Debug::DropWeakScopeMismatch | Debug::DropUnhandledMessageType => {
                debug!("{}", self);
            }
            Debug::DropWrongServiceType(service_type) => {
                debug!(%service_type, "{}", self);
            }
            Debug::UnsolicitedAdvert(address)
            | Debug::BootAdvert(address)
            | Debug::ShutdownAdvert(address) => {
                debug!(%address, "{}", self);
            }
        }
    }
}

impl<'a> std::fmt::Display for Debug<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Debug::InstanceStart => write!(f, "starting directory agent"),
            Debug::InstanceStop => write!(f, "stopping directory agent"),
            Debug::ServiceAdded(..) => write!(f, "service added"),
            Debug::ServiceRemoved(..) => write!(f, "service removed"),
            Debug::ServiceUpdated(..) => write!(f, "service updated"),
            Debug::PurgeRun(..) => write!(f, "purged expired services"),
            Debug::DropUnknownBinding(..) => {
                write!(f, "dropping request: no DA bound to local interface")
            }
            Debug::DropResponderSuppressed(..) => {
                write!(f, "dropping request: responder suppression")
            }
            Debug::DropWeakScopeMismatch => {
                write!(f, "dropping request: scopes don't overlap")
            }
            Debug::DropWrongServiceType(..) => {
                write!(f, "dropping multicast request: not a DA discovery request")
            }
            Debug::DropUnhandledMessageType => {
                write!(f, "dropping message: type not handled by a DA")
            }
            Debug::UnsolicitedAdvert(..) => write!(f, "sending unsolicited DAAdvert"),
            Debug::BootAdvert(..) => write!(f, "sending boot DAAdvert"),
            Debug::ShutdownAdvert(..) => write!(f, "sending shutdown DAAdvert"),
        }
    }
}
