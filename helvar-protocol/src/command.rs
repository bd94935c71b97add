//! Command identifiers and builders for the messages a controller sends.
//!
//! Every builder emits the version and command parameters first, followed by
//! the destination (group or device address), the operation specific
//! parameters and finally any extra parameters supplied by the caller.
use crate::{
    color::Chromaticity,
    protocol::{FrameType, Message, Parameter, ParameterId},
};

/// Protocol version used by plain control and query commands.
pub const VERSION_1: u8 = 1;
/// Protocol version required when a direct level command carries a colour.
pub const VERSION_2: u8 = 2;

/// The commands understood by a router.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum CommandId {
    RecallSceneGroup = 11,
    RecallSceneDevice = 12,
    DirectLevelGroup = 13,
    DirectLevelDevice = 14,

    QueryDeviceTypesAndAddresses = 100,
    QueryClusters = 101,
    QueryRouters = 102,
    QueryLastSceneInBlock = 103,
    QueryGroupDescription = 105,
    QueryDeviceDescription = 106,
    QueryWorkgroupName = 107,
    QueryLastSceneInGroup = 109,
    QueryDeviceState = 110,
    QueryDeviceLoadLevel = 152,
    QueryGroup = 164,
    QueryGroups = 165,
    QuerySceneNames = 166,
    QuerySceneInfo = 167,
    QueryTime = 185,
    QueryRouterVersion = 190,
    QueryHelvarnetVersion = 191,
}

/// Static information about a command.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CommandRecord {
    pub id: CommandId,
    /// The lowest protocol version that knows the command
    pub version: u8,
    /// Whether the router sends a reply
    pub replies: bool,
}

const fn control(id: CommandId) -> CommandRecord {
    CommandRecord {
        id,
        version: VERSION_1,
        replies: false,
    }
}

const fn query(id: CommandId) -> CommandRecord {
    CommandRecord {
        id,
        version: VERSION_1,
        replies: true,
    }
}

/// All known commands.
pub static COMMANDS: &[CommandRecord] = &[
    control(CommandId::RecallSceneGroup),
    control(CommandId::RecallSceneDevice),
    control(CommandId::DirectLevelGroup),
    control(CommandId::DirectLevelDevice),
    query(CommandId::QueryDeviceTypesAndAddresses),
    query(CommandId::QueryClusters),
    query(CommandId::QueryRouters),
    query(CommandId::QueryLastSceneInBlock),
    query(CommandId::QueryGroupDescription),
    query(CommandId::QueryDeviceDescription),
    query(CommandId::QueryWorkgroupName),
    query(CommandId::QueryLastSceneInGroup),
    query(CommandId::QueryDeviceState),
    query(CommandId::QueryDeviceLoadLevel),
    query(CommandId::QueryGroup),
    query(CommandId::QueryGroups),
    query(CommandId::QuerySceneNames),
    query(CommandId::QuerySceneInfo),
    query(CommandId::QueryTime),
    query(CommandId::QueryRouterVersion),
    query(CommandId::QueryHelvarnetVersion),
];

impl CommandId {
    /// The numeric code used on the wire
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub fn record(self) -> CommandRecord {
        COMMANDS
            .iter()
            .copied()
            .find(|r| r.id == self)
            .unwrap_or(query(self))
    }

    pub fn expects_reply(self) -> bool {
        self.record().replies
    }
}

/// Returned when a numeric code does not name a known command.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct UnknownCommand(pub u64);

impl TryFrom<u64> for CommandId {
    type Error = UnknownCommand;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        COMMANDS
            .iter()
            .map(|r| r.id)
            .find(|id| u64::from(id.code()) == value)
            .ok_or(UnknownCommand(value))
    }
}

/// Target of a control command.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Destination<'a> {
    Group(u16),
    /// A device address such as `1.2.3.4`
    Device(&'a str),
}

impl Destination<'_> {
    fn parameter(self) -> Parameter {
        match self {
            Destination::Group(group) => Parameter::group(group),
            Destination::Device(address) => Parameter::address(address),
        }
    }

    fn recall_scene(self) -> CommandId {
        match self {
            Destination::Group(_) => CommandId::RecallSceneGroup,
            Destination::Device(_) => CommandId::RecallSceneDevice,
        }
    }

    fn direct_level(self) -> CommandId {
        match self {
            Destination::Group(_) => CommandId::DirectLevelGroup,
            Destination::Device(_) => CommandId::DirectLevelDevice,
        }
    }
}

/// Creates a bare command message with version and command parameters.
pub fn command(version: u8, id: CommandId) -> Message {
    Message::new(FrameType::Command).with_parameters([
        Parameter::new(ParameterId::VERSION, version),
        Parameter::new(ParameterId::COMMAND, id),
    ])
}

/// A command message using the lowest version that knows the command.
fn request(id: CommandId) -> Message {
    command(id.record().version, id)
}

pub fn query_clusters() -> Message {
    request(CommandId::QueryClusters)
}

/// Queries the routers of a cluster, given as an address such as `1`.
pub fn query_routers(cluster: &str) -> Message {
    request(CommandId::QueryRouters).with_parameter(Parameter::address(cluster))
}

pub fn query_groups() -> Message {
    request(CommandId::QueryGroups)
}

pub fn query_group_description(group: u16) -> Message {
    request(CommandId::QueryGroupDescription).with_parameter(Parameter::group(group))
}

/// Queries the device addresses that belong to a group.
pub fn query_group(group: u16) -> Message {
    request(CommandId::QueryGroup).with_parameter(Parameter::group(group))
}

pub fn query_device_description(address: &str) -> Message {
    request(CommandId::QueryDeviceDescription).with_parameter(Parameter::address(address))
}

pub fn query_device_state(address: &str) -> Message {
    request(CommandId::QueryDeviceState).with_parameter(Parameter::address(address))
}

pub fn query_last_scene_in_group(group: u16) -> Message {
    request(CommandId::QueryLastSceneInGroup).with_parameter(Parameter::group(group))
}

pub fn query_scene_names() -> Message {
    request(CommandId::QuerySceneNames)
}

pub fn query_time() -> Message {
    request(CommandId::QueryTime)
}

pub fn query_router_version(address: &str) -> Message {
    request(CommandId::QueryRouterVersion).with_parameter(Parameter::address(address))
}

pub fn query_helvarnet_version(address: &str) -> Message {
    request(CommandId::QueryHelvarnetVersion).with_parameter(Parameter::address(address))
}

pub fn recall_scene(
    destination: Destination<'_>,
    block: u8,
    scene: u8,
    extra: &[Parameter],
) -> Message {
    request(destination.recall_scene())
        .with_parameter(destination.parameter())
        .with_parameters([
            Parameter::new(ParameterId::BLOCK, block),
            Parameter::new(ParameterId::SCENE, scene),
        ])
        .with_parameters(extra.iter().cloned())
}

/// Sets the level (0 to 100) of a group or a device.
pub fn direct_level(destination: Destination<'_>, level: u8, extra: &[Parameter]) -> Message {
    request(destination.direct_level())
        .with_parameters([
            destination.parameter(),
            Parameter::new(ParameterId::LEVEL, level),
        ])
        .with_parameters(extra.iter().cloned())
}

/// Converts a colour temperature to the mired unit used on the wire.
///
/// A temperature of 0 K is clamped to 1 K, giving 1 000 000 mireds.
pub fn kelvin_to_mireds(kelvin: u16) -> u32 {
    (1_000_000.0 / f64::from(kelvin.max(1))).round() as u32
}

pub fn color_temperature(
    destination: Destination<'_>,
    kelvin: u16,
    level: u8,
    extra: &[Parameter],
) -> Message {
    request(destination.direct_level())
        .with_parameters([
            destination.parameter(),
            Parameter::new(ParameterId::LEVEL, level),
            Parameter::new(ParameterId::MIREDS, kelvin_to_mireds(kelvin)),
        ])
        .with_parameters(extra.iter().cloned())
}

/// Sets level and colour. Accepts anything convertible to a chromaticity,
/// for example an [`crate::color::Rgb`] value.
pub fn color(
    destination: Destination<'_>,
    color: impl Into<Chromaticity>,
    level: u8,
    extra: &[Parameter],
) -> Message {
    let Chromaticity { x, y } = color.into();
    let id = destination.direct_level();
    command(id.record().version.max(VERSION_2), id)
        .with_parameters([
            destination.parameter(),
            Parameter::new(ParameterId::LEVEL, level),
            Parameter::new(ParameterId::COLOUR_X, x),
            Parameter::new(ParameterId::COLOUR_Y, y),
        ])
        .with_parameters(extra.iter().cloned())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::color::Rgb;
    use crate::protocol::ParameterValue;

    #[test]
    fn new_command() {
        let msg = command(1, CommandId::DirectLevelDevice);
        assert_eq!(msg.frame_type, FrameType::Command);
        assert_eq!(
            msg.parameters,
            vec![
                Parameter::new(ParameterId::VERSION, 1u8),
                Parameter::new(ParameterId::COMMAND, CommandId::DirectLevelDevice),
            ]
        );
        assert!(msg.answer.is_empty());
        assert!(!msg.is_partial);
    }

    #[test]
    fn catalog_is_consistent() {
        for record in COMMANDS {
            assert_eq!(CommandId::try_from(u64::from(record.id.code())), Ok(record.id));
            assert_eq!(record.id.record(), *record);
        }
        assert_eq!(CommandId::try_from(99), Err(UnknownCommand(99)));
    }

    #[test]
    fn builders_use_the_recorded_version() {
        for msg in [query_time(), query_groups(), query_group(1), query_device_state("1.1.1.1")] {
            let id = msg.command().unwrap();
            assert_eq!(
                msg.parameter(&ParameterId::VERSION),
                Some(&ParameterValue::Unsigned(id.record().version.into()))
            );
        }
    }

    #[test]
    fn only_control_commands_skip_the_reply() {
        let silent: Vec<CommandId> = COMMANDS
            .iter()
            .filter(|r| !r.replies)
            .map(|r| r.id)
            .collect();
        assert_eq!(
            silent,
            vec![
                CommandId::RecallSceneGroup,
                CommandId::RecallSceneDevice,
                CommandId::DirectLevelGroup,
                CommandId::DirectLevelDevice,
            ]
        );
    }

    #[test]
    fn recall_scene_group_frame() {
        let msg = recall_scene(Destination::Group(2), 3, 4, &[]);
        assert_eq!(msg.to_string(), ">V:1,C:11,G:2,B:3,S:4#");
    }

    #[test]
    fn recall_scene_device_with_fade_time() {
        let msg = recall_scene(
            Destination::Device("1.2.3.4"),
            1,
            7,
            &[Parameter::fade_time(150)],
        );
        assert_eq!(msg.to_string(), ">V:1,C:12,@1.2.3.4,B:1,S:7,F:150#");
    }

    #[test]
    fn direct_level_frames() {
        assert_eq!(
            direct_level(Destination::Group(17), 80, &[]).to_string(),
            ">V:1,C:13,G:17,L:80#"
        );
        assert_eq!(
            direct_level(Destination::Device("1.1.2.15"), 0, &[]).to_string(),
            ">V:1,C:14,@1.1.2.15,L:0#"
        );
    }

    #[test]
    fn kelvin_conversion() {
        assert_eq!(kelvin_to_mireds(2700), 370);
        assert_eq!(kelvin_to_mireds(4000), 250);
        assert_eq!(kelvin_to_mireds(6500), 154);
        assert_eq!(kelvin_to_mireds(0), 1_000_000);
        assert_eq!(kelvin_to_mireds(1), 1_000_000);
    }

    #[test]
    fn color_temperature_frame() {
        let msg = color_temperature(Destination::Group(5), 4000, 60, &[]);
        assert_eq!(msg.to_string(), ">V:1,C:13,G:5,L:60,M:250#");
    }

    #[test]
    fn color_uses_version_two() {
        let msg = color(Destination::Device("1.1.1.1"), Rgb::new(255, 255, 255), 100, &[]);
        assert_eq!(
            msg.parameter(&ParameterId::VERSION),
            Some(&ParameterValue::Unsigned(2))
        );
        assert_eq!(msg.command(), Some(CommandId::DirectLevelDevice));
        assert_eq!(msg.to_string(), ">V:2,C:14,@1.1.1.1,L:100,CX:0.31,CY:0.33#");
    }

    #[test]
    fn explicit_chromaticity() {
        let msg = color(
            Destination::Group(1),
            Chromaticity { x: 0.7, y: 0.3 },
            50,
            &[],
        );
        assert_eq!(msg.to_string(), ">V:2,C:13,G:1,L:50,CX:0.70,CY:0.30#");
    }
}
