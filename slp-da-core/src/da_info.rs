//
// Copyright (c) The SLP Directory Agent Contributors
//
// SPDX-License-Identifier: MIT
//

//! The DA's self-description, emitted in DAAdverts (§3
//! "DirectoryAgentInfo").

use crate::attr::{AttrValue, Attributes};
use crate::scope::Scopes;
use crate::url::ServiceUrl;

const TCP_PORT_TAG: &str = "service:directory-agent.tcp-port";

/// One DA binding: the address it's reachable on, the scopes and
/// attributes it advertises, its default language, and its boot time.
#[derive(Clone, Debug)]
pub struct DirectoryAgentInfo {
    pub address: String,
    pub scopes: Scopes,
    pub attributes: Attributes,
    pub language: String,
    pub boot_time: u32,
    pub tcp_port: u16,
}

impl DirectoryAgentInfo {
    /// Builds a DA description, merging in the mandatory
    /// `service:directory-agent.tcp-port` attribute (§3 invariant).
    pub fn new(
        address: impl Into<String>,
        scopes: Scopes,
        mut attributes: Attributes,
        language: impl Into<String>,
        boot_time: u32,
        tcp_port: u16,
    ) -> DirectoryAgentInfo {
        attributes.set_values(TCP_PORT_TAG, vec![AttrValue::Integer(i64::from(tcp_port))]);
        DirectoryAgentInfo {
            address: address.into(),
            scopes,
            attributes,
            language: language.into(),
            boot_time,
            tcp_port,
        }
    }

    /// `service:directory-agent://<host-address>` (§6).
    pub fn service_url(&self) -> ServiceUrl {
        ServiceUrl::new(
            format!("service:directory-agent://{}", self.address),
            crate::url::LIFETIME_PERMANENT,
        )
    }
}
