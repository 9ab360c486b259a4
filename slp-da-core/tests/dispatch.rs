//
// Copyright (c) The SLP Directory Agent Contributors
//
// SPDX-License-Identifier: MIT
//

//! Integration-style coverage of the dispatcher and handlers acting
//! together through the public API, over a real cache and an
//! in-memory fake [`Performer`] (§8).

use slp_da_core::attr::{AttrValue, Attributes};
use slp_da_core::cache::ServiceInfoCache;
use slp_da_core::da_info::DirectoryAgentInfo;
use slp_da_core::dispatcher::dispatch;
use slp_da_core::handlers::DaBindings;
use slp_da_core::message::{
    DaAdvert, LocalBinding, MessageBody, MessageEvent, Performer, Remote, SrvAck, SrvReg, SrvRply,
    SrvRqst,
};
use slp_da_core::scope::Scopes;
use slp_da_core::url::{ServiceType, ServiceUrl};

#[derive(Default)]
struct FakePerformer {
    srv_rply: Option<SrvRply>,
    srv_ack: Option<SrvAck>,
    da_advert: Option<(DaAdvert, Remote)>,
}

impl Performer for FakePerformer {
    fn send_srv_rply(&mut self, rply: SrvRply) {
        self.srv_rply = Some(rply);
    }
    fn send_srv_ack(&mut self, ack: SrvAck) {
        self.srv_ack = Some(ack);
    }
    fn send_da_advert_unicast(&mut self, advert: DaAdvert, to: &Remote) {
        self.da_advert = Some((advert, to.clone()));
    }
}

fn bindings() -> DaBindings {
    let mut map = DaBindings::new();
    map.insert(
        "10.0.0.1".to_string(),
        DirectoryAgentInfo::new("10.0.0.1", Scopes::default_scope(), Attributes::new(), "en", 1000, 427),
    );
    map
}

#[test]
fn multicast_discovery_then_tcp_registration_then_query() {
    let bindings = bindings();
    let cache = ServiceInfoCache::new();
    let local = LocalBinding { address: "10.0.0.1".to_string() };

    let discover = MessageEvent {
        is_multicast: true,
        local: local.clone(),
        remote: Remote { host: "10.0.0.9".to_string() },
        body: MessageBody::SrvRqst(SrvRqst {
            xid: 1,
            language: "en".to_string(),
            service_type: ServiceType::directory_agent(),
            scopes: Scopes::default_scope(),
            filter: String::new(),
            previous_responders: vec![],
        }),
    };
    let mut performer = FakePerformer::default();
    dispatch(&bindings, &cache, discover, &mut performer);
    assert!(performer.da_advert.is_some());

    let mut attrs = Attributes::new();
    attrs.set_values("ppm", vec![AttrValue::Integer(20)]);
    let register = MessageEvent {
        is_multicast: false,
        local: local.clone(),
        remote: Remote { host: "10.0.0.50".to_string() },
        body: MessageBody::SrvReg(SrvReg {
            xid: 2,
            language: "en".to_string(),
            url: ServiceUrl::new("service:printer://p1", 60),
            service_type: ServiceType::new("service:printer"),
            scopes: Scopes::default_scope(),
            attributes: attrs,
            is_fresh: true,
        }),
    };
    let mut performer = FakePerformer::default();
    dispatch(&bindings, &cache, register, &mut performer);
    assert_eq!(performer.srv_ack.unwrap().error_code, slp_da_core::error::ERR_SUCCESS);

    let query = MessageEvent {
        is_multicast: false,
        local,
        remote: Remote { host: "10.0.0.50".to_string() },
        body: MessageBody::SrvRqst(SrvRqst {
            xid: 3,
            language: "en".to_string(),
            service_type: ServiceType::new("service:printer"),
            scopes: Scopes::default_scope(),
            filter: "(ppm>=10)".to_string(),
            previous_responders: vec![],
        }),
    };
    let mut performer = FakePerformer::default();
    dispatch(&bindings, &cache, query, &mut performer);
    let rply = performer.srv_rply.unwrap();
    assert_eq!(rply.urls.len(), 1);
    assert_eq!(rply.urls[0].url, "service:printer://p1");
}

#[test]
fn registration_outside_da_scopes_is_rejected_and_not_queryable() {
    let bindings = bindings();
    let cache = ServiceInfoCache::new();
    let local = LocalBinding { address: "10.0.0.1".to_string() };

    let register = MessageEvent {
        is_multicast: false,
        local: local.clone(),
        remote: Remote { host: "10.0.0.50".to_string() },
        body: MessageBody::SrvReg(SrvReg {
            xid: 1,
            language: "en".to_string(),
            url: ServiceUrl::new("service:printer://p1", 60),
            service_type: ServiceType::new("service:printer"),
            scopes: Scopes::new(["engineering"]),
            attributes: Attributes::new(),
            is_fresh: true,
        }),
    };
    let mut performer = FakePerformer::default();
    dispatch(&bindings, &cache, register, &mut performer);
    assert_ne!(performer.srv_ack.unwrap().error_code, slp_da_core::error::ERR_SUCCESS);
    assert_eq!(cache.len(), 0);

    let query = MessageEvent {
        is_multicast: false,
        local,
        remote: Remote { host: "10.0.0.50".to_string() },
        body: MessageBody::SrvRqst(SrvRqst {
            xid: 2,
            language: "en".to_string(),
            service_type: ServiceType::new("service:printer"),
            scopes: Scopes::default_scope(),
            filter: String::new(),
            previous_responders: vec![],
        }),
    };
    let mut performer = FakePerformer::default();
    dispatch(&bindings, &cache, query, &mut performer);
    assert!(performer.srv_rply.unwrap().urls.is_empty());
}

#[test]
fn unbound_local_address_drops_every_message_type_silently() {
    let bindings = DaBindings::new();
    let cache = ServiceInfoCache::new();
    let local = LocalBinding { address: "192.168.1.1".to_string() };

    let query = MessageEvent {
        is_multicast: false,
        local: local.clone(),
        remote: Remote { host: "10.0.0.50".to_string() },
        body: MessageBody::SrvRqst(SrvRqst {
            xid: 1,
            language: "en".to_string(),
            service_type: ServiceType::new("service:printer"),
            scopes: Scopes::default(),
            filter: String::new(),
            previous_responders: vec![],
        }),
    };
    let mut performer = FakePerformer::default();
    dispatch(&bindings, &cache, query, &mut performer);
    assert!(performer.srv_rply.is_none());

    let discover = MessageEvent {
        is_multicast: true,
        local,
        remote: Remote { host: "10.0.0.9".to_string() },
        body: MessageBody::SrvRqst(SrvRqst {
            xid: 2,
            language: "en".to_string(),
            service_type: ServiceType::directory_agent(),
            scopes: Scopes::default_scope(),
            filter: String::new(),
            previous_responders: vec![],
        }),
    };
    let mut performer = FakePerformer::default();
    dispatch(&bindings, &cache, discover, &mut performer);
    assert!(performer.da_advert.is_none());
}
