//
// Copyright (c) The SLP Directory Agent Contributors
//
// SPDX-License-Identifier: MIT
//

//! Registered service state (§3 "ServiceInfo").

use std::time::Instant;

use crate::attr::Attributes;
use crate::scope::Scopes;
use crate::url::{LIFETIME_PERMANENT, ServiceKey, ServiceType, ServiceUrl};

/// A single registration: identity, scopes, attributes, language and
/// lifetime bookkeeping.
#[derive(Clone, Debug)]
pub struct ServiceInfo {
    pub url: ServiceUrl,
    pub service_type: ServiceType,
    pub scopes: Scopes,
    pub attributes: Attributes,
    pub language: String,
    registered_at: Instant,
    lifetime: u16,
}

impl ServiceInfo {
    /// Creates a fresh registration, stamping `registered_at` as now.
    /// Lifetime counts from this moment and is never reset by updates
    /// (§3 invariant).
    pub fn new(
        url: ServiceUrl,
        service_type: ServiceType,
        scopes: Scopes,
        attributes: Attributes,
        language: impl Into<String>,
    ) -> ServiceInfo {
        let lifetime = url.lifetime();
        ServiceInfo {
            url,
            service_type,
            scopes,
            attributes,
            language: language.into(),
            registered_at: Instant::now(),
            lifetime,
        }
    }

    pub fn key(&self) -> ServiceKey {
        ServiceKey::new(self.url.as_str(), &self.language)
    }

    pub fn registered_at(&self) -> Instant {
        self.registered_at
    }

    /// Remaining lifetime in seconds, for URLEntry encoding (§4.3
    /// scenario 3). Permanent registrations always report the maximum.
    pub fn remaining_lifetime(&self) -> u16 {
        if self.lifetime == LIFETIME_PERMANENT {
            return LIFETIME_PERMANENT;
        }
        let elapsed = self.registered_at.elapsed().as_secs();
        let lifetime = u64::from(self.lifetime);
        lifetime.saturating_sub(elapsed).min(u64::from(u16::MAX)) as u16
    }

    /// `expired = now - registered_at >= lifetime` (§3), unless
    /// permanent.
    pub fn is_expired(&self) -> bool {
        if self.lifetime == LIFETIME_PERMANENT {
            return false;
        }
        self.registered_at.elapsed().as_secs() >= u64::from(self.lifetime)
    }
}
