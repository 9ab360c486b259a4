//
// Copyright (c) The SLP Directory Agent Contributors
//
// SPDX-License-Identifier: MIT
//

//! Request handlers (§4.3): SrvRqst/SrvReg/SrvDeReg processing and reply
//! production.

use std::collections::HashMap;

use crate::cache::ServiceInfoCache;
use crate::da_info::DirectoryAgentInfo;
use crate::debug::Debug;
use crate::error::{ERR_SUCCESS, ProtocolError};
use crate::message::{
    DaAdvert, LocalBinding, Performer, Remote, SrvAck, SrvDeReg, SrvReg, SrvRply, SrvRqst, UrlEntry,
};
use crate::service::ServiceInfo;
use crate::url::ServiceType;

/// DA bindings keyed by the local address they're bound to (§9
/// "Wildcard bind addresses": this map is keyed by the expanded
/// literal, never the original wildcard).
pub type DaBindings = HashMap<String, DirectoryAgentInfo>;

/// Multicast SrvRqst handling (§4.3). Either emits one unicast DAAdvert
/// or drops silently — this path never replies with an error.
pub fn handle_multicast_srv_rqst(
    bindings: &DaBindings,
    local: &LocalBinding,
    remote: &Remote,
    req: &SrvRqst,
    performer: &mut dyn Performer,
) {
    let Some(da) = bindings.get(&local.address) else {
        Debug::DropUnknownBinding(&local.address).log();
        return;
    };

    if req.previous_responders.iter().any(|r| r == &remote.host) {
        Debug::DropResponderSuppressed(&remote.host).log();
        return;
    }

    if !da.scopes.match_weak(&req.scopes) {
        Debug::DropWeakScopeMismatch.log();
        return;
    }

    if req.service_type != ServiceType::directory_agent() {
        Debug::DropWrongServiceType(req.service_type.as_str()).log();
        return;
    }

    let advert = DaAdvert {
        xid: req.xid,
        language: req.language.clone(),
        error_code: ERR_SUCCESS,
        url: da.service_url().as_str().to_string(),
        scopes: da.scopes.clone(),
        attributes: da.attributes.clone(),
        boot_time: da.boot_time,
    };
    performer.send_da_advert_unicast(advert, remote);
}

/// TCP SrvRqst handling (§4.3). Always writes a reply; a malformed
/// filter yields `errorCode = INVALID_REGISTRATION` with an empty list
/// rather than dropping (§9 open question).
pub fn handle_tcp_srv_rqst(
    bindings: &DaBindings,
    cache: &ServiceInfoCache,
    local: &LocalBinding,
    req: &SrvRqst,
    performer: &mut dyn Performer,
) {
    if !bindings.contains_key(&local.address) {
        Debug::DropUnknownBinding(&local.address).log();
        return;
    }

    let rply = match crate::filter::parse(&req.filter) {
        Ok(filter) => {
            let matches = cache.find(
                Some(&req.service_type),
                Some(&req.language),
                Some(&req.scopes),
                filter.as_ref(),
            );
            SrvRply {
                xid: req.xid,
                language: req.language.clone(),
                error_code: ERR_SUCCESS,
                urls: matches.iter().map(url_entry).collect(),
            }
        }
        Err(error) => {
            tracing::warn!(%error, "malformed filter in SrvRqst");
            SrvRply {
                xid: req.xid,
                language: req.language.clone(),
                error_code: ProtocolError::InvalidRegistration.code(),
                urls: Vec::new(),
            }
        }
    };
    performer.send_srv_rply(rply);
}

/// TCP SrvReg handling (§4.3).
pub fn handle_tcp_srv_reg(
    bindings: &DaBindings,
    cache: &ServiceInfoCache,
    local: &LocalBinding,
    reg: &SrvReg,
    performer: &mut dyn Performer,
) {
    let Some(da) = bindings.get(&local.address) else {
        Debug::DropUnknownBinding(&local.address).log();
        return;
    };

    if !da.scopes.match_strong(&reg.scopes) {
        performer.send_srv_ack(ack(reg.xid, &reg.language, ProtocolError::ScopeNotSupported.code()));
        return;
    }

    let service = ServiceInfo::new(
        reg.url.clone(),
        reg.service_type.clone(),
        reg.scopes.clone(),
        reg.attributes.clone(),
        reg.language.clone(),
    );

    let result = if reg.is_fresh {
        cache.put(service)
    } else {
        cache.add_attributes(&service.key(), &service.attributes)
    };

    let error_code = match result {
        Ok(..) => ERR_SUCCESS,
        Err(error) => {
            error.log();
            ProtocolError::from(error).code()
        }
    };
    performer.send_srv_ack(ack(reg.xid, &reg.language, error_code));
}

/// TCP SrvDeReg handling (§4.3).
pub fn handle_tcp_srv_dereg(
    bindings: &DaBindings,
    cache: &ServiceInfoCache,
    local: &LocalBinding,
    dereg: &SrvDeReg,
    performer: &mut dyn Performer,
) {
    let Some(da) = bindings.get(&local.address) else {
        Debug::DropUnknownBinding(&local.address).log();
        return;
    };

    if !da.scopes.match_strong(&dereg.scopes) {
        performer.send_srv_ack(ack(dereg.xid, &dereg.language, ProtocolError::ScopeNotSupported.code()));
        return;
    }

    let key = crate::url::ServiceKey::new(dereg.url.as_str(), &dereg.language);
    let error_code = if dereg.is_updating {
        match cache.remove_attributes(&key, &dereg.attribute_tags, &[]) {
            Ok(..) => ERR_SUCCESS,
            Err(error) => {
                error.log();
                ProtocolError::from(error).code()
            }
        }
    } else {
        cache.remove(&key);
        ERR_SUCCESS
    };
    performer.send_srv_ack(ack(dereg.xid, &dereg.language, error_code));
}

fn url_entry(service: &ServiceInfo) -> UrlEntry {
    UrlEntry {
        url: service.url.as_str().to_string(),
        lifetime: service.remaining_lifetime(),
    }
}

fn ack(xid: u16, language: &str, error_code: u16) -> SrvAck {
    SrvAck {
        xid,
        language: language.to_string(),
        error_code,
    }
}
