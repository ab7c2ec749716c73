//! Caller identity and the capability check consumed by listing.
//!
//! Authentication is not done here. An upstream layer inserts a [`Caller`]
//! into the request extensions; requests without one are anonymous.

use axum::{extract::FromRequestParts, http::request::Parts};
use std::collections::BTreeSet;
use std::convert::Infallible;

/// Capability letting a caller order by any column
pub const ORDER_BY_ANY_FIELD: &str = "order_by_any_field";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller {
    pub id: Option<String>,
    pub capabilities: BTreeSet<String>,
}

impl Caller {
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            capabilities: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.insert(capability.into());
        self
    }

    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.id.is_none()
    }
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Caller>().cloned().unwrap_or_default())
    }
}

/// `hasCapability(caller, name)`, used for the ordering bypass and preset visibility.
pub trait PermissionOracle: Send + Sync {
    fn has_capability(&self, caller: &Caller, capability: &str) -> bool;
}

/// Checks the capabilities carried by the caller itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct CapabilityOracle;

impl PermissionOracle for CapabilityOracle {
    fn has_capability(&self, caller: &Caller, capability: &str) -> bool {
        caller.capabilities.contains(capability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[test]
    fn test_capability_oracle() {
        let oracle = CapabilityOracle;
        let staff = Caller::new("42").with_capability(ORDER_BY_ANY_FIELD);
        assert!(oracle.has_capability(&staff, ORDER_BY_ANY_FIELD));
        assert!(!oracle.has_capability(&Caller::anonymous(), ORDER_BY_ANY_FIELD));
    }

    #[tokio::test]
    async fn test_extractor_defaults_to_anonymous() {
        let (mut parts, ()) = Request::builder().uri("/").body(()).unwrap().into_parts();
        let caller = Caller::from_request_parts(&mut parts, &()).await.unwrap();
        assert!(caller.is_anonymous());

        parts.extensions.insert(Caller::new("7"));
        let caller = Caller::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(caller.id.as_deref(), Some("7"));
    }
}
