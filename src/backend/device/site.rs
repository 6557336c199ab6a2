use serde::{Deserialize, Serialize};

use crate::backend::mathphysics::GeoPoint;

use super::SiteId;


#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Site {
    id: SiteId,
    #[serde(default)]
    name: String,
    #[serde(default)]
    position: Option<GeoPoint>,
}

impl Site {
    #[must_use]
    pub fn new(id: SiteId, name: &str, position: Option<GeoPoint>) -> Self {
        Self {
            id,
            name: name.to_string(),
            position,
        }
    }

    #[must_use]
    pub fn id(&self) -> &SiteId {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    // Invalid coordinates count as absent.
    #[must_use]
    pub fn position(&self) -> Option<&GeoPoint> {
        self.position
            .as_ref()
            .filter(|position| position.is_valid())
    }
}
