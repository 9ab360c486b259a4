//
// Copyright (c) The SLP Directory Agent Contributors
//
// SPDX-License-Identifier: MIT
//

//! Decoded SLPv2 message shapes the core consumes, and the outbound
//! "performer" contract it writes replies through (§6).
//!
//! Wire encode/decode is an external collaborator (§1); this module
//! only names the data the core needs out of a decoded message and the
//! data it needs to hand back to something that can serialize and
//! transmit a reply.

use crate::scope::Scopes;
use crate::url::{ServiceType, ServiceUrl};

/// Where a request came from, at both the socket and protocol level.
#[derive(Clone, Debug)]
pub struct Remote {
    /// Presentation form of the peer's address (dotted IPv4 or
    /// compressed IPv6), compared string-wise against
    /// `previous_responders` (§9 "Responder" equality).
    pub host: String,
}

/// The local interface/address a message arrived on, used to resolve
/// which [`crate::da_info::DirectoryAgentInfo`] is bound there (§4.3,
/// §9 "Wildcard bind addresses").
#[derive(Clone, Debug)]
pub struct LocalBinding {
    pub address: String,
}

/// A decoded SrvRqst.
#[derive(Clone, Debug)]
pub struct SrvRqst {
    pub xid: u16,
    pub language: String,
    pub service_type: ServiceType,
    pub scopes: Scopes,
    pub filter: String,
    pub previous_responders: Vec<String>,
}

/// A decoded SrvReg.
#[derive(Clone, Debug)]
pub struct SrvReg {
    pub xid: u16,
    pub language: String,
    pub url: ServiceUrl,
    pub service_type: ServiceType,
    pub scopes: Scopes,
    pub attributes: crate::attr::Attributes,
    /// True when this is a fresh registration (replace, don't merge);
    /// false means this is an attribute-merge update (§3 GLOSSARY
    /// "Fresh registration", §4.3). Computed by the wire codec from the
    /// RFC 2608 fresh-indicator bit — an external-collaborator concern
    /// (§1).
    pub is_fresh: bool,
}

/// A decoded SrvDeReg.
#[derive(Clone, Debug)]
pub struct SrvDeReg {
    pub xid: u16,
    pub language: String,
    pub url: ServiceUrl,
    pub scopes: Scopes,
    /// True when this deregisters specific attribute tags/values rather
    /// than the whole registration.
    pub is_updating: bool,
    pub attribute_tags: Vec<String>,
}

/// One entry in a SrvRply's URL-entry list.
#[derive(Clone, Debug, PartialEq)]
pub struct UrlEntry {
    pub url: String,
    pub lifetime: u16,
}

/// An outbound SrvRply.
#[derive(Clone, Debug)]
pub struct SrvRply {
    pub xid: u16,
    pub language: String,
    pub error_code: u16,
    pub urls: Vec<UrlEntry>,
}

/// An outbound SrvAck.
#[derive(Clone, Debug)]
pub struct SrvAck {
    pub xid: u16,
    pub language: String,
    pub error_code: u16,
}

/// An outbound DAAdvert.
#[derive(Clone, Debug)]
pub struct DaAdvert {
    pub xid: u16,
    pub language: String,
    pub error_code: u16,
    pub url: String,
    pub scopes: Scopes,
    pub attributes: crate::attr::Attributes,
    /// 0 on boot-down advert (§4.5), non-zero otherwise.
    pub boot_time: u32,
}

/// Tagged variant over every message kind the dispatcher can see (§9
/// "Dispatcher polymorphism").
#[derive(Clone, Debug)]
pub enum MessageBody {
    SrvRqst(SrvRqst),
    SrvReg(SrvReg),
    SrvDeReg(SrvDeReg),
    /// Any other decoded SLPv2 message type; the DA never acts on these.
    Other,
}

/// One inbound event as delivered to the dispatcher (§4.4).
#[derive(Clone, Debug)]
pub struct MessageEvent {
    pub is_multicast: bool,
    pub local: LocalBinding,
    pub remote: Remote,
    pub body: MessageBody,
}

/// The transport-side handle a handler writes its single reply through.
/// Implementations serialize and transmit the reply (§6); the core
/// never retains this handle past the call that produced the reply
/// (§5).
pub trait Performer: Send {
    fn send_srv_rply(&mut self, rply: SrvRply);
    fn send_srv_ack(&mut self, ack: SrvAck);
    fn send_da_advert_unicast(&mut self, advert: DaAdvert, to: &Remote);
}
