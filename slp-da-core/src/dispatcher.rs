//
// Copyright (c) The SLP Directory Agent Contributors
//
// SPDX-License-Identifier: MIT
//

//! Routes decoded inbound events to the right handler (§4.4).
//!
//! Classification keys off two axes: whether the datagram arrived
//! multicast or unicast/TCP, and which message type it carries. Only
//! three (transport, type) combinations are meaningful to a DA; every
//! other combination is dropped and logged at debug.

use crate::cache::ServiceInfoCache;
use crate::debug::Debug;
use crate::handlers::{self, DaBindings};
use crate::message::{MessageBody, MessageEvent, Performer};

/// Dispatches one decoded event, mutating `cache` and writing at most
/// one reply through `performer` (§4.4, §5).
pub fn dispatch(
    bindings: &DaBindings,
    cache: &ServiceInfoCache,
    event: MessageEvent,
    performer: &mut dyn Performer,
) {
    match (event.is_multicast, event.body) {
        (true, MessageBody::SrvRqst(req)) => {
            handlers::handle_multicast_srv_rqst(bindings, &event.local, &event.remote, &req, performer);
        }
        (false, MessageBody::SrvRqst(req)) => {
            handlers::handle_tcp_srv_rqst(bindings, cache, &event.local, &req, performer);
        }
        (false, MessageBody::SrvReg(reg)) => {
            handlers::handle_tcp_srv_reg(bindings, cache, &event.local, &reg, performer);
        }
        (false, MessageBody::SrvDeReg(dereg)) => {
            handlers::handle_tcp_srv_dereg(bindings, cache, &event.local, &dereg, performer);
        }
        // Multicast SrvReg/SrvDeReg never happen on the wire (RFC 2608
        // mandates TCP for registration traffic); anything else a DA
        // doesn't act on at all.
        _ => {
            Debug::DropUnhandledMessageType.log();
        }
    }
}
