use derive_more::{Display, From};
use serde::{Deserialize, Serialize};


// Identifiers come from the network-management export and are opaque strings.
// Their ordering defines the device index order of a snapshot.
#[derive(
    Clone, Debug, Display, Default, Eq, From, Hash, Ord, PartialEq, PartialOrd,
    Serialize, Deserialize
)]
#[serde(transparent)]
#[display("{_0}")]
pub struct DeviceId(String);

impl DeviceId {
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}


#[derive(
    Clone, Debug, Display, Default, Eq, From, Hash, Ord, PartialEq, PartialOrd,
    Serialize, Deserialize
)]
#[serde(transparent)]
#[display("{_0}")]
pub struct SiteId(String);

impl SiteId {
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SiteId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}
