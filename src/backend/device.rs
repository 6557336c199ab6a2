use serde::{Deserialize, Serialize};

use super::allocation::FrequencyAllocation;
use super::mathphysics::{Decibel, Degree, GeoPoint};


pub use id::{DeviceId, SiteId};
pub use idmaps::*;
pub use orientation::{Orientation, DEFAULT_SECTOR_BEAMWIDTH};
pub use site::Site;


pub mod id;
pub mod idmaps;
pub mod orientation;
pub mod site;


#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceRole {
    #[serde(alias = "ap")]
    Sector,
    #[serde(alias = "station")]
    Client,
    #[default]
    Omni,
}


#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    #[default]
    Active,
    Inactive,
}


#[derive(Clone, Debug)]
pub struct DeviceBuilder {
    id: Option<DeviceId>,
    name: Option<String>,
    role: Option<DeviceRole>,
    site_id: Option<SiteId>,
    position: Option<GeoPoint>,
    orientation: Option<Orientation>,
    status: Option<DeviceStatus>,
    allocation: Option<FrequencyAllocation>,
    tx_power_dbm: Option<Decibel>,
}

impl DeviceBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: None,
            name: None,
            role: None,
            site_id: None,
            position: None,
            orientation: None,
            status: None,
            allocation: None,
            tx_power_dbm: None,
        }
    }

    #[must_use]
    pub fn set_id(mut self, id: DeviceId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn set_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    #[must_use]
    pub fn set_role(mut self, role: DeviceRole) -> Self {
        self.role = Some(role);
        self
    }

    #[must_use]
    pub fn set_site_id(mut self, site_id: SiteId) -> Self {
        self.site_id = Some(site_id);
        self
    }

    #[must_use]
    pub fn set_position(mut self, position: GeoPoint) -> Self {
        self.position = Some(position);
        self
    }

    #[must_use]
    pub fn set_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = Some(orientation);
        self
    }

    #[must_use]
    pub fn set_status(mut self, status: DeviceStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn set_allocation(mut self, allocation: FrequencyAllocation) -> Self {
        self.allocation = Some(allocation);
        self
    }

    // Non-finite values are ignored.
    #[must_use]
    pub fn set_tx_power(mut self, tx_power_dbm: Decibel) -> Self {
        self.tx_power_dbm = Some(tx_power_dbm).filter(|power| power.is_finite());
        self
    }

    // A sector without an explicit orientation falls back to the compass
    // word in its name. Orientation is dropped for non-sector roles.
    #[must_use]
    pub fn build(self) -> Device {
        let name = self.name.unwrap_or_default();
        let role = self.role.unwrap_or_default();
        let orientation = match role {
            DeviceRole::Sector => self.orientation
                .or_else(|| Orientation::from_name_hint(&name)),
            _                  => None,
        };

        Device::new(
            self.id.unwrap_or_default(),
            &name,
            role,
            self.site_id.unwrap_or_default(),
            self.position,
            orientation,
            self.status.unwrap_or_default(),
            self.allocation,
            self.tx_power_dbm,
        )
    }
}

impl Default for DeviceBuilder {
    fn default() -> Self {
        Self::new()
    }
}


#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Device {
    id: DeviceId,
    name: String,
    role: DeviceRole,
    site_id: SiteId,
    position: Option<GeoPoint>,
    orientation: Option<Orientation>,
    status: DeviceStatus,
    allocation: Option<FrequencyAllocation>,
    tx_power_dbm: Option<Decibel>,
}

impl Device {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: DeviceId,
        name: &str,
        role: DeviceRole,
        site_id: SiteId,
        position: Option<GeoPoint>,
        orientation: Option<Orientation>,
        status: DeviceStatus,
        allocation: Option<FrequencyAllocation>,
        tx_power_dbm: Option<Decibel>,
    ) -> Self {
        Self {
            id,
            name: name.to_string(),
            role,
            site_id,
            position,
            orientation,
            status,
            allocation,
            tx_power_dbm,
        }
    }

    #[must_use]
    pub fn id(&self) -> &DeviceId {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn role(&self) -> DeviceRole {
        self.role
    }

    #[must_use]
    pub fn site_id(&self) -> &SiteId {
        &self.site_id
    }

    // Own coordinate only. Use `Snapshot::effective_position` for the
    // site fallback.
    #[must_use]
    pub fn position(&self) -> Option<&GeoPoint> {
        self.position
            .as_ref()
            .filter(|position| position.is_valid())
    }

    // `None` means the device radiates in every direction.
    #[must_use]
    pub fn orientation(&self) -> Option<&Orientation> {
        self.orientation.as_ref()
    }

    #[must_use]
    pub fn status(&self) -> DeviceStatus {
        self.status
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self.status, DeviceStatus::Active)
    }

    #[must_use]
    pub fn allocation(&self) -> Option<&FrequencyAllocation> {
        self.allocation.as_ref()
    }

    // `None` if the export carries no transmit power.
    #[must_use]
    pub fn tx_power_dbm(&self) -> Option<Decibel> {
        self.tx_power_dbm
    }

    // Only active devices with a known allocation take part in pairwise
    // analysis.
    #[must_use]
    pub fn is_analysable(&self) -> bool {
        self.is_active() && self.allocation.is_some()
    }

    // Receivers without a directional antenna hear every bearing.
    #[must_use]
    pub fn beam_covers(&self, bearing: Degree) -> bool {
        self.orientation
            .as_ref()
            .is_none_or(|orientation| orientation.covers(bearing))
    }

    // 1.0 on boresight, falling to 0.0 at the beam edge. Always 1.0 without
    // a directional antenna.
    #[must_use]
    pub fn beam_alignment(&self, bearing: Degree) -> f64 {
        self.orientation
            .as_ref()
            .map_or(1.0, |orientation| orientation.alignment(bearing))
    }
}


#[cfg(test)]
mod tests {
    use super::*;


    fn allocation() -> FrequencyAllocation {
        FrequencyAllocation::build(5_700, 40)
            .unwrap_or_else(|error| panic!("{}", error))
    }


    #[test]
    fn sector_orientation_falls_back_to_name() {
        let device = DeviceBuilder::new()
            .set_id(DeviceId::new("a"))
            .set_name("1340-south")
            .set_role(DeviceRole::Sector)
            .build();

        let orientation = device.orientation()
            .unwrap_or_else(|| panic!("orientation was not inferred"));

        assert_eq!(180.0, orientation.azimuth());
    }

    #[test]
    fn explicit_orientation_wins_over_name() {
        let device = DeviceBuilder::new()
            .set_name("1340-south")
            .set_role(DeviceRole::Sector)
            .set_orientation(Orientation::new(45.0, 60.0))
            .build();

        assert_eq!(Some(45.0), device.orientation().map(Orientation::azimuth));
    }

    #[test]
    fn client_ignores_orientation_and_hears_every_bearing() {
        let device = DeviceBuilder::new()
            .set_name("client-north")
            .set_role(DeviceRole::Client)
            .set_orientation(Orientation::new(0.0, 30.0))
            .build();

        assert!(device.orientation().is_none());
        assert!(device.beam_covers(180.0));
        assert_eq!(1.0, device.beam_alignment(180.0));
    }

    #[test]
    fn non_finite_tx_power_is_dropped() {
        let powered = DeviceBuilder::new().set_tx_power(23.0).build();
        let broken = DeviceBuilder::new().set_tx_power(f64::NAN).build();

        assert_eq!(Some(23.0), powered.tx_power_dbm());
        assert!(broken.tx_power_dbm().is_none());
    }

    #[test]
    fn inactive_or_unallocated_devices_are_not_analysable() {
        let unallocated = DeviceBuilder::new().build();
        let inactive = DeviceBuilder::new()
            .set_allocation(allocation())
            .set_status(DeviceStatus::Inactive)
            .build();
        let active = DeviceBuilder::new()
            .set_allocation(allocation())
            .build();

        assert!(!unallocated.is_analysable());
        assert!(!inactive.is_analysable());
        assert!(active.is_analysable());
    }

    #[test]
    fn roles_accept_management_system_aliases() {
        let sector: DeviceRole = serde_json::from_str("\"ap\"")
            .unwrap_or_else(|error| panic!("{}", error));
        let client: DeviceRole = serde_json::from_str("\"station\"")
            .unwrap_or_else(|error| panic!("{}", error));

        assert_eq!(DeviceRole::Sector, sector);
        assert_eq!(DeviceRole::Client, client);
    }
}
