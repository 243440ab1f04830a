use anyhow::anyhow;
use async_trait::async_trait;

use crate::geo::GeoCoordinate;
use crate::sensor::{LocationProvider, Permission};

/// A location known up front, or one the user refuses to share.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedLocation {
    coordinate: Option<GeoCoordinate>,
}

impl FixedLocation {
    pub fn new(coordinate: GeoCoordinate) -> Self {
        Self {
            coordinate: Some(coordinate),
        }
    }

    /// Denies every permission request.
    pub fn denied() -> Self {
        Self { coordinate: None }
    }
}

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn request_permission(&self) -> Permission {
        match self.coordinate {
            Some(_) => Permission::Granted,
            None => Permission::Denied,
        }
    }

    async fn current_location(&self) -> anyhow::Result<GeoCoordinate> {
        self.coordinate
            .ok_or_else(|| anyhow!("no location configured"))
    }
}
