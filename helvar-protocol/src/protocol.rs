use std::{borrow::Cow, fmt::Display};

use crate::command::CommandId;

/// Messages must not exceed this many bytes on the wire.
pub const MAX_MESSAGE_BYTES: usize = 1500;
/// Upper bound of a reply including all of its partial chunks.
pub const MAX_REPLY_BYTES: usize = 64 * MAX_MESSAGE_BYTES;

/// Separates parameters from each other and the pieces of an answer.
pub const DELIMITER: char = ',';
/// Separates a parameter key from its value.
pub const PARAMETER_ID_DELIMITER: char = ':';
/// Separates the parameter list from the answer.
pub const ANSWER_SEPARATOR: char = '=';
/// Terminates a complete message.
pub const TERMINATOR: char = '#';
/// Terminates one chunk of a reply that continues in the next frame.
pub const PARTIAL_TERMINATOR: char = '$';
/// Prefix of the address parameter, which has no key/value delimiter.
pub const ADDRESS_MARKER: char = '@';

/// The kind of a frame, given by its first character.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum FrameType {
    /// `>`: a command sent by a controller.
    Command,
    /// `<`: a command used internally between routers.
    InternalCommand,
    /// `?`: a reply to a query.
    Reply,
    /// `!`: the router rejected the request. The answer holds an error code.
    Error,
}

impl FrameType {
    pub const ALL: [FrameType; 4] = [
        FrameType::Command,
        FrameType::InternalCommand,
        FrameType::Reply,
        FrameType::Error,
    ];

    /// The start marker of this frame type
    pub const fn marker(self) -> char {
        match self {
            FrameType::Command => '>',
            FrameType::InternalCommand => '<',
            FrameType::Reply => '?',
            FrameType::Error => '!',
        }
    }

    pub fn from_marker(marker: char) -> Option<FrameType> {
        FrameType::ALL.into_iter().find(|t| t.marker() == marker)
    }
}

/// Key of a message parameter.
///
/// Keys are short ASCII strings. Decoding keeps unknown keys verbatim so that
/// replies from newer routers still parse. Some keys are shared between
/// parameters whose meaning depends on the command (`L` is both level and latitude).
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ParameterId(Cow<'static, str>);

impl ParameterId {
    pub const VERSION: ParameterId = ParameterId::from_static("V");
    pub const COMMAND: ParameterId = ParameterId::from_static("C");
    pub const ADDRESS: ParameterId = ParameterId::from_static("@");
    pub const GROUP: ParameterId = ParameterId::from_static("G");
    pub const BLOCK: ParameterId = ParameterId::from_static("B");
    pub const SCENE: ParameterId = ParameterId::from_static("S");
    pub const FADE_TIME: ParameterId = ParameterId::from_static("F");
    pub const LEVEL: ParameterId = ParameterId::from_static("L");
    pub const PROPORTION: ParameterId = ParameterId::from_static("P");
    pub const DISPLAY_SCREEN: ParameterId = ParameterId::from_static("D");
    pub const SEQUENCE_NUMBER: ParameterId = ParameterId::from_static("Q");
    pub const TIME: ParameterId = ParameterId::from_static("T");
    pub const ACK: ParameterId = ParameterId::from_static("A");
    pub const LATITUDE: ParameterId = ParameterId::from_static("L");
    pub const LONGITUDE: ParameterId = ParameterId::from_static("E");
    pub const TIME_ZONE_DIFFERENCE: ParameterId = ParameterId::from_static("Z");
    pub const DAYLIGHT_SAVING_TIME: ParameterId = ParameterId::from_static("Y");
    pub const CONSTANT_LIGHT_SCENE: ParameterId = ParameterId::from_static("K");
    pub const FORCE_STORE_SCENE: ParameterId = ParameterId::from_static("O");
    pub const MIREDS: ParameterId = ParameterId::from_static("M");
    pub const COLOUR_X: ParameterId = ParameterId::from_static("CX");
    pub const COLOUR_Y: ParameterId = ParameterId::from_static("CY");

    pub const fn from_static(key: &'static str) -> ParameterId {
        ParameterId(Cow::Borrowed(key))
    }

    pub fn new(key: impl Into<Cow<'static, str>>) -> ParameterId {
        ParameterId(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ParameterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The value of a parameter.
///
/// Decoding infers the variant from the text: unsigned integers first, then
/// signed integers, then floats and finally plain text.
#[derive(Clone, Debug, PartialEq)]
pub enum ParameterValue {
    Unsigned(u64),
    Signed(i64),
    /// Rendered with two decimals on the wire.
    Float(f64),
    Text(String),
    /// Value of the `C` parameter
    Command(CommandId),
}

impl ParameterValue {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            ParameterValue::Unsigned(v) => Some(*v),
            ParameterValue::Signed(v) => u64::try_from(*v).ok(),
            ParameterValue::Command(id) => Some(id.code().into()),
            ParameterValue::Float(_) | ParameterValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParameterValue::Text(text) => Some(text),
            ParameterValue::Unsigned(_)
            | ParameterValue::Signed(_)
            | ParameterValue::Float(_)
            | ParameterValue::Command(_) => None,
        }
    }
}

impl Display for ParameterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParameterValue::Unsigned(v) => write!(f, "{}", v),
            ParameterValue::Signed(v) => write!(f, "{}", v),
            ParameterValue::Float(v) => write!(f, "{:.2}", v),
            ParameterValue::Text(v) => f.write_str(v),
            ParameterValue::Command(id) => write!(f, "{}", id.code()),
        }
    }
}

macro_rules! impl_from_unsigned {
    ($($t:ty),*) => {
        $(impl From<$t> for ParameterValue {
            fn from(value: $t) -> Self {
                ParameterValue::Unsigned(value.into())
            }
        })*
    };
}

macro_rules! impl_from_signed {
    ($($t:ty),*) => {
        $(impl From<$t> for ParameterValue {
            fn from(value: $t) -> Self {
                ParameterValue::Signed(value.into())
            }
        })*
    };
}

impl_from_unsigned!(u8, u16, u32, u64);
impl_from_signed!(i8, i16, i32, i64);

impl From<f32> for ParameterValue {
    fn from(value: f32) -> Self {
        ParameterValue::Float(value.into())
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        ParameterValue::Float(value)
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::Text(value.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        ParameterValue::Text(value)
    }
}

impl From<CommandId> for ParameterValue {
    fn from(value: CommandId) -> Self {
        ParameterValue::Command(value)
    }
}

/// A single `key:value` pair of a message.
#[derive(Clone, Debug, PartialEq)]
pub struct Parameter {
    pub id: ParameterId,
    pub value: ParameterValue,
}

impl Parameter {
    pub fn new(id: ParameterId, value: impl Into<ParameterValue>) -> Parameter {
        Parameter {
            id,
            value: value.into(),
        }
    }

    /// A device or subnet address such as `1.2.3.4`, written without the `@`.
    pub fn address(address: impl Into<String>) -> Parameter {
        Parameter::new(ParameterId::ADDRESS, address.into())
    }

    pub fn group(group: u16) -> Parameter {
        Parameter::new(ParameterId::GROUP, group)
    }

    /// Fade time in hundredths of a second.
    pub fn fade_time(centiseconds: u32) -> Parameter {
        Parameter::new(ParameterId::FADE_TIME, centiseconds)
    }

    pub fn constant_light_scene(enabled: bool) -> Parameter {
        Parameter::new(ParameterId::CONSTANT_LIGHT_SCENE, u8::from(enabled))
    }

    pub fn force_store_scene(enabled: bool) -> Parameter {
        Parameter::new(ParameterId::FORCE_STORE_SCENE, u8::from(enabled))
    }
}

/// A message exchanged between a controller and a router.
///
/// Both commands and replies share this shape:
/// `<type><parameter>[,<parameter>...][=<answer>]<terminator>`.
/// A router splits a long answer across several frames ending in `$`, with the
/// last one ending in `#`. A reassembled reply has `is_partial` set.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub frame_type: FrameType,
    /// Ordered as they appear on the wire
    pub parameters: Vec<Parameter>,
    /// Empty if the frame carried no answer
    pub answer: String,
    pub is_partial: bool,
}

impl Message {
    pub fn new(frame_type: FrameType) -> Message {
        Message {
            frame_type,
            parameters: Vec::new(),
            answer: String::new(),
            is_partial: false,
        }
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Message {
        self.parameters.push(parameter);
        self
    }

    pub fn with_parameters(mut self, parameters: impl IntoIterator<Item = Parameter>) -> Message {
        self.parameters.extend(parameters);
        self
    }

    pub fn with_answer(mut self, answer: impl Into<String>) -> Message {
        self.answer = answer.into();
        self
    }

    /// Returns the value of the first parameter with the given key.
    pub fn parameter(&self, id: &ParameterId) -> Option<&ParameterValue> {
        self.parameters
            .iter()
            .find(|p| &p.id == id)
            .map(|p| &p.value)
    }

    pub fn command(&self) -> Option<CommandId> {
        match self.parameter(&ParameterId::COMMAND)? {
            ParameterValue::Command(id) => Some(*id),
            other => other
                .as_u64()
                .and_then(|code| CommandId::try_from(code).ok()),
        }
    }

    pub fn group(&self) -> Option<u16> {
        self.parameter(&ParameterId::GROUP)?
            .as_u64()
            .and_then(|v| u16::try_from(v).ok())
    }

    pub fn address(&self) -> Option<&str> {
        self.parameter(&ParameterId::ADDRESS)?.as_str()
    }

    /// Whether the router answers this message.
    /// Messages without a command are assumed to be answered.
    pub fn expects_reply(&self) -> bool {
        self.command().is_none_or(CommandId::expects_reply)
    }

    /// The pieces of the answer, split at the delimiter.
    pub fn answer_strings(&self) -> Vec<&str> {
        self.answer.split(DELIMITER).collect()
    }
}

#[test]
fn frame_type_markers() {
    for frame_type in FrameType::ALL {
        assert_eq!(FrameType::from_marker(frame_type.marker()), Some(frame_type));
    }
    assert_eq!(FrameType::from_marker('#'), None);
}

#[test]
fn latitude_shares_level_key() {
    assert_eq!(ParameterId::LATITUDE, ParameterId::LEVEL);
    assert_eq!(ParameterId::new("CX"), ParameterId::COLOUR_X);
}

#[test]
fn message_accessors() {
    let msg = Message::new(FrameType::Reply)
        .with_parameter(Parameter::new(ParameterId::COMMAND, CommandId::QueryGroup))
        .with_parameter(Parameter::group(42))
        .with_parameter(Parameter::address("1.2.3.4"));
    assert_eq!(msg.command(), Some(CommandId::QueryGroup));
    assert_eq!(msg.group(), Some(42));
    assert_eq!(msg.address(), Some("1.2.3.4"));
    assert!(msg.expects_reply());
}

#[test]
fn control_commands_expect_no_reply() {
    let msg = Message::new(FrameType::Command)
        .with_parameter(Parameter::new(ParameterId::COMMAND, CommandId::DirectLevelDevice));
    assert!(!msg.expects_reply());
    assert!(Message::new(FrameType::Command).expects_reply());
}
