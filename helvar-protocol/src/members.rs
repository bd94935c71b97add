//! Plain data types for the members of a lighting network.
#[cfg(feature = "serde")]
use serde::Deserialize;

/// A cluster of routers. Valid identifiers are within `1..=253`.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub struct Cluster {
    pub id: u8,
}

/// A router within a cluster. Valid identifiers are within `1..=254`.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub struct Router {
    pub id: u8,
}

/// A group of devices. Valid identifiers are within `1..=16383`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Group {
    pub id: u16,
    pub name: String,
    /// Valid scenes are within `1..=16`, zero if unknown
    pub last_scene: u8,
    pub devices: Vec<Device>,
}

/// A device on a router subnet.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Device {
    /// Address in the form `cluster.router.subnet.device`
    pub address: String,
    pub name: String,
    pub state: DeviceState,
}

/// Device state as reported by the router.
///
/// Each bit represents one condition; zero means the device is ok.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct DeviceState(pub u32);

impl DeviceState {
    pub const OK: DeviceState = DeviceState(0x0000_0000);
    /// Device or subdevice has been disabled, usually an IR subdevice or a DMX channel.
    pub const DISABLED: DeviceState = DeviceState(0x0000_0001);
    /// Unspecified lamp problem.
    pub const LAMP_FAILURE: DeviceState = DeviceState(0x0000_0002);
    /// The device previously existed but is not currently present.
    pub const MISSING: DeviceState = DeviceState(0x0000_0004);
    /// Ran out of addresses, unknown control device or a load that keeps
    /// responding with multiple replies.
    pub const FAULTY: DeviceState = DeviceState(0x0000_0008);
    /// The subnet, load or control device is being discovered.
    pub const REFRESHING: DeviceState = DeviceState(0x0000_0010);
    /// The load is intentionally off whilst the control gear is powered by the emergency supply.
    pub const EM_RESTING: DeviceState = DeviceState(0x0000_0100);
    /// No mains power is being supplied.
    pub const EM_IN_EMERGENCY: DeviceState = DeviceState(0x0000_0400);
    /// Mains has been restored but the device is still using the emergency supply.
    pub const EM_IN_PROLONG: DeviceState = DeviceState(0x0000_0800);
    pub const EM_FUNCTION_TEST_IN_PROGRESS: DeviceState = DeviceState(0x0000_1000);
    pub const EM_DURATION_TEST_IN_PROGRESS: DeviceState = DeviceState(0x0000_2000);
    pub const EM_DURATION_TEST_PENDING: DeviceState = DeviceState(0x0001_0000);
    pub const EM_FUNCTION_TEST_PENDING: DeviceState = DeviceState(0x0002_0000);
    pub const EM_BATTERY_FAIL: DeviceState = DeviceState(0x0004_0000);
    /// Prevents an emergency fitting from going into emergency mode.
    pub const EM_INHIBIT: DeviceState = DeviceState(0x0020_0000);
    pub const EM_FUNCTION_TEST_REQUESTED: DeviceState = DeviceState(0x0040_0000);
    pub const EM_DURATION_TEST_REQUESTED: DeviceState = DeviceState(0x0080_0000);
    /// Initial state of an emergency fitting.
    pub const EM_UNKNOWN: DeviceState = DeviceState(0x0100_0000);
    pub const OVER_TEMPERATURE: DeviceState = DeviceState(0x0200_0000);
    /// Too much current is being drawn by the load.
    pub const OVER_CURRENT: DeviceState = DeviceState(0x0400_0000);
    pub const COMMS_ERROR: DeviceState = DeviceState(0x0800_0000);
    /// The load is over temperature, drawing too much current, or both.
    pub const SEVERE_ERROR: DeviceState = DeviceState(0x1000_0000);
    /// A reply to a query was malformed.
    pub const BAD_REPLY: DeviceState = DeviceState(0x2000_0000);
    /// The actual load type does not match the expected type.
    pub const DEVICE_MISMATCH: DeviceState = DeviceState(0x8000_0000);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_ok(self) -> bool {
        self.0 == 0
    }

    /// Whether all bits of `other` are set
    pub const fn contains(self, other: DeviceState) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for DeviceState {
    type Output = DeviceState;

    fn bitor(self, rhs: Self) -> Self::Output {
        DeviceState(self.0 | rhs.0)
    }
}

#[test]
fn device_state_flags() {
    let state = DeviceState::LAMP_FAILURE | DeviceState::COMMS_ERROR;
    assert!(!state.is_ok());
    assert!(state.contains(DeviceState::LAMP_FAILURE));
    assert!(state.contains(DeviceState::COMMS_ERROR));
    assert!(!state.contains(DeviceState::MISSING));
    assert!(DeviceState::default().is_ok());
}
