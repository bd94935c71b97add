/// Read and write implementations for the protocol messages
use std::{
    fmt::Display,
    io::{self, BufRead, Read, Write},
};

use crate::{
    command::CommandId,
    error::ReadError,
    protocol::{
        ADDRESS_MARKER, ANSWER_SEPARATOR, DELIMITER, FrameType, Message, PARAMETER_ID_DELIMITER,
        PARTIAL_TERMINATOR, Parameter, ParameterId, ParameterValue, TERMINATOR,
    },
};

impl Parameter {
    /// Parses a single `key:value` token, or an `@address` token.
    pub fn decode(token: &str) -> Result<Parameter, ReadError> {
        if let Some(address) = token.strip_prefix(ADDRESS_MARKER) {
            return Ok(Parameter::address(address));
        }

        let mut parts = token.split(PARAMETER_ID_DELIMITER);
        let (Some(key), Some(raw_value), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(ReadError::MalformedParameter(token.to_string()));
        };

        let id = ParameterId::new(key.to_string());
        // `parse` accepts a leading `+`, which marks a signed value here
        let unsigned = raw_value.starts_with(|c: char| c.is_ascii_digit());
        let value = if let Some(v) = raw_value.parse::<u64>().ok().filter(|_| unsigned) {
            ParameterValue::Unsigned(v)
        } else if let Ok(v) = raw_value.parse::<i64>() {
            ParameterValue::Signed(v)
        } else if let Ok(v) = raw_value.parse::<f64>() {
            ParameterValue::Float(v)
        } else {
            ParameterValue::Text(raw_value.to_string())
        };

        if id == ParameterId::COMMAND {
            let command = match value {
                ParameterValue::Unsigned(code) => CommandId::try_from(code).ok(),
                _ => None,
            }
            .ok_or_else(|| ReadError::MalformedParameter(token.to_string()))?;
            return Ok(Parameter::new(id, command));
        }

        Ok(Parameter { id, value })
    }

    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl Display for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.id == ParameterId::ADDRESS {
            write!(f, "{}{}", ADDRESS_MARKER, self.value)
        } else {
            write!(f, "{}{}{}", self.id, PARAMETER_ID_DELIMITER, self.value)
        }
    }
}

impl Message {
    /// Parses a single frame.
    ///
    /// General format: `<type><parameter>[,<parameter>...][=<answer>]<#|$>`
    pub fn decode(frame: &str) -> Result<Message, ReadError> {
        let mut chars = frame.chars();
        let (Some(start), Some(end)) = (chars.next(), chars.next_back()) else {
            return Err(ReadError::InvalidFrame(frame.to_string()));
        };
        let frame_type =
            FrameType::from_marker(start).ok_or_else(|| ReadError::InvalidFrame(frame.to_string()))?;
        let is_partial = match end {
            TERMINATOR => false,
            PARTIAL_TERMINATOR => true,
            _ => return Err(ReadError::InvalidFrame(frame.to_string())),
        };

        let body = chars.as_str();
        let (raw_parameters, answer) = body.split_once(ANSWER_SEPARATOR).unwrap_or((body, ""));
        let parameters = raw_parameters
            .split(DELIMITER)
            .map(Parameter::decode)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Message {
            frame_type,
            parameters,
            answer: answer.to_string(),
            is_partial,
        })
    }

    /// Parses a reply that may consist of several `$` terminated chunks
    /// followed by a final `#` terminated one.
    ///
    /// Type and parameters are taken from the first chunk, the answers of all
    /// chunks are joined with the delimiter.
    pub fn decode_partial(stream: &str) -> Result<Message, ReadError> {
        if !stream.ends_with(TERMINATOR) {
            return Err(ReadError::InvalidFrame(stream.to_string()));
        }
        let mut chunks = stream.split_inclusive(PARTIAL_TERMINATOR);
        let first = chunks
            .next()
            .ok_or_else(|| ReadError::InvalidFrame(stream.to_string()))?;
        let mut out = Message::decode(first)?;
        out.is_partial = false;

        for chunk in chunks {
            let msg = Message::decode(chunk)?;
            out.answer.push(DELIMITER);
            out.answer.push_str(&msg.answer);
            out.is_partial = true;
        }

        Ok(out)
    }

    /// Reads one complete reply, including all of its partial chunks.
    ///
    /// Fails with [`ReadError::TooManyBytes`] if no final terminator arrives
    /// within `max_len` bytes, and with [`ReadError::InvalidFrame`] if the
    /// stream ends in the middle of a reply.
    pub fn from_reader(reader: &mut impl BufRead, max_len: usize) -> Result<Message, ReadError> {
        let mut buf = Vec::with_capacity(64);
        let n = reader
            .by_ref()
            .take(max_len as u64 + 1)
            .read_until(TERMINATOR as u8, &mut buf)?;
        if n == 0 {
            return Err(ReadError::ConnectionClosed);
        }
        if n > max_len {
            return Err(ReadError::TooManyBytes {
                max: max_len,
                got: n,
            });
        }
        if buf.last() != Some(&(TERMINATOR as u8)) {
            return Err(ReadError::InvalidFrame(
                String::from_utf8_lossy(&buf).to_string(),
            ));
        }
        Message::decode_partial(str::from_utf8(&buf)?)
    }

    /// The wire representation of this message. Always uses the final terminator.
    pub fn encode(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }

    pub fn write_to(&self, writer: &mut impl Write) -> io::Result<()> {
        writer.write_all(&self.encode())
    }

    /// Parses every piece of the answer as an integer.
    pub fn answer_integers(&self) -> Result<Vec<i64>, ReadError> {
        self.answer_strings()
            .into_iter()
            .map(|piece| {
                piece
                    .parse::<i64>()
                    .map_err(|_| ReadError::InvalidAnswer(piece.to_string()))
            })
            .collect()
    }
}

impl Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.frame_type.marker())?;
        for (i, parameter) in self.parameters.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", DELIMITER)?;
            }
            write!(f, "{}", parameter)?;
        }
        if !self.answer.is_empty() {
            write!(f, "{}{}", ANSWER_SEPARATOR, self.answer)?;
        }
        write!(f, "{}", TERMINATOR)
    }
}

#[cfg(test)]
mod test {
    use crate::command::{self, CommandId};
    use crate::error::ReadError;
    use crate::protocol::{
        FrameType, MAX_REPLY_BYTES, Message, Parameter, ParameterId, ParameterValue,
    };
    use std::io::Cursor;

    fn p(id: ParameterId, value: impl Into<ParameterValue>) -> Parameter {
        Parameter::new(id, value)
    }

    #[test]
    fn decode_address() {
        let param = Parameter::decode("@1.2.3.4").unwrap();
        assert_eq!(param.id, ParameterId::ADDRESS);
        assert_eq!(param.value, ParameterValue::Text("1.2.3.4".to_string()));
    }

    #[test]
    fn decode_infers_value_types() {
        assert_eq!(Parameter::decode("V:1").unwrap(), p(ParameterId::VERSION, 1u64));
        assert_eq!(
            Parameter::decode("P:-5").unwrap(),
            p(ParameterId::PROPORTION, -5i64)
        );
        assert_eq!(
            Parameter::decode("CX:0.2499").unwrap(),
            p(ParameterId::COLOUR_X, 0.2499)
        );
        assert_eq!(
            Parameter::decode("N:kitchen").unwrap(),
            p(ParameterId::new("N"), "kitchen")
        );
    }

    #[test]
    fn decode_command_parameter() {
        assert_eq!(
            Parameter::decode("C:165").unwrap(),
            p(ParameterId::COMMAND, CommandId::QueryGroups)
        );
        for token in ["C:99", "C:-1", "C:abc", "C:1.5"] {
            match Parameter::decode(token) {
                Err(ReadError::MalformedParameter(t)) => assert_eq!(t, token),
                other => panic!("expected MalformedParameter, got {:?}", other),
            }
        }
    }

    #[test]
    fn decode_malformed_parameter() {
        for token in ["", "V", "V:1:2"] {
            assert!(matches!(
                Parameter::decode(token),
                Err(ReadError::MalformedParameter(_))
            ));
        }
    }

    #[test]
    fn encode_parameters() {
        assert_eq!(Parameter::address("x.y.z").encode(), "@x.y.z");
        assert_eq!(p(ParameterId::PROPORTION, -10i32).encode(), "P:-10");
        assert_eq!(p(ParameterId::VERSION, 1u8).encode(), "V:1");
        assert_eq!(p(ParameterId::MIREDS, 300u64).encode(), "M:300");
        assert_eq!(p(ParameterId::COLOUR_X, 0.77999f32).encode(), "CX:0.78");
        assert_eq!(p(ParameterId::COLOUR_Y, 0.49222).encode(), "CY:0.49");
        assert_eq!(p(ParameterId::new("N"), "hall").encode(), "N:hall");
        assert_eq!(p(ParameterId::COMMAND, CommandId::QueryTime).encode(), "C:185");
    }

    #[test]
    fn decode_recall_scene() {
        let msg = Message::decode(">V:1,C:11,G:1,S:1#").unwrap();
        assert_eq!(msg.frame_type, FrameType::Command);
        assert_eq!(
            msg.parameters,
            vec![
                p(ParameterId::VERSION, 1u64),
                p(ParameterId::COMMAND, CommandId::RecallSceneGroup),
                p(ParameterId::GROUP, 1u64),
                p(ParameterId::SCENE, 1u64),
            ]
        );
        assert_eq!(msg.answer, "");
        assert!(!msg.is_partial);
    }

    #[test]
    fn decode_query_reply() {
        let msg = Message::decode("?V:1,C:165=1,2,3,4,5#").unwrap();
        assert_eq!(msg.frame_type, FrameType::Reply);
        assert_eq!(msg.command(), Some(CommandId::QueryGroups));
        assert_eq!(msg.answer, "1,2,3,4,5");
        assert!(!msg.is_partial);
    }

    #[test]
    fn decode_partial_frame() {
        let msg = Message::decode("?V:1,C:165=5,4,3,2,1$").unwrap();
        assert_eq!(msg.answer, "5,4,3,2,1");
        assert!(msg.is_partial);
    }

    #[test]
    fn decode_error_reply() {
        let msg = Message::decode("!V:1,C:105,G:9999=1#").unwrap();
        assert_eq!(msg.frame_type, FrameType::Error);
        assert_eq!(msg.group(), Some(9999));
        assert_eq!(msg.answer, "1");
    }

    #[test]
    fn decode_invalid_frames() {
        for frame in ["", "#", "V:1,C:185#", ">V:1,C:185", ">V:1,C:185\n", "x#"] {
            match Message::decode(frame) {
                Err(ReadError::InvalidFrame(f)) => assert_eq!(f, frame),
                other => panic!("expected InvalidFrame for {:?}, got {:?}", frame, other),
            }
        }
    }

    #[test]
    fn decode_fails_on_any_bad_parameter() {
        assert!(matches!(
            Message::decode(">V:1,C:185,X#"),
            Err(ReadError::MalformedParameter(_))
        ));
        assert!(matches!(
            Message::decode(">#"),
            Err(ReadError::MalformedParameter(_))
        ));
    }

    #[test]
    fn answer_may_contain_separator() {
        let msg = Message::decode("?V:1,C:106,@1.1.1.1=a=b#").unwrap();
        assert_eq!(msg.answer, "a=b");
    }

    #[test]
    fn reassemble_partial_reply() {
        let msg = Message::decode_partial("?V:1,C:165=1,2$?V:1,C:165=3,4#").unwrap();
        assert_eq!(msg.frame_type, FrameType::Reply);
        assert_eq!(msg.command(), Some(CommandId::QueryGroups));
        assert_eq!(msg.parameters.len(), 2);
        assert_eq!(msg.answer, "1,2,3,4");
        assert!(msg.is_partial);
    }

    #[test]
    fn single_chunk_is_not_partial() {
        let msg = Message::decode_partial("?V:1,C:185=1700000000#").unwrap();
        assert_eq!(msg.answer, "1700000000");
        assert!(!msg.is_partial);
        assert!(matches!(
            Message::decode_partial(""),
            Err(ReadError::InvalidFrame(_))
        ));
    }

    #[test]
    fn reencoded_partial_reply_uses_final_terminator() {
        let msg = Message::decode_partial("?V:1,C:165=1$?V:1,C:165=2#").unwrap();
        assert_eq!(msg.to_string(), "?V:1,C:165=1,2#");
    }

    #[test]
    fn round_trip() {
        let messages = [
            command::recall_scene(command::Destination::Group(3), 1, 2, &[]),
            command::direct_level(
                command::Destination::Device("1.2.3.4"),
                40,
                &[Parameter::fade_time(200)],
            ),
            command::query_time(),
            Message::new(FrameType::Reply)
                .with_parameters([
                    p(ParameterId::VERSION, 1u8),
                    p(ParameterId::COMMAND, CommandId::QueryGroup),
                    p(ParameterId::GROUP, 7u16),
                    p(ParameterId::PROPORTION, -20i8),
                    p(ParameterId::COLOUR_X, 0.25),
                ])
                .with_answer("@1.1.1.1,@1.1.1.2"),
            Message::new(FrameType::Error)
                .with_parameter(p(ParameterId::COMMAND, CommandId::QueryClusters))
                .with_answer("15"),
        ];
        for msg in messages {
            let frame = msg.to_string();
            assert_eq!(Message::decode(&frame).unwrap(), msg, "{}", frame);
        }
    }

    #[test]
    fn answer_integers() {
        let msg = Message::decode("?V:1,C:101=1,2,253#").unwrap();
        assert_eq!(msg.answer_integers().unwrap(), vec![1, 2, 253]);

        let msg = Message::decode("?V:1,C:101=1,two#").unwrap();
        match msg.answer_integers() {
            Err(ReadError::InvalidAnswer(piece)) => assert_eq!(piece, "two"),
            other => panic!("expected InvalidAnswer, got {:?}", other),
        }
    }

    #[test]
    fn read_reply_from_stream() {
        let data = b"?V:1,C:165=1,2$?V:1,C:165=3#?V:1,C:185=42#".to_vec();
        let mut cursor = Cursor::new(data);
        let first = Message::from_reader(&mut cursor, MAX_REPLY_BYTES).unwrap();
        assert_eq!(first.answer, "1,2,3");
        assert!(first.is_partial);
        let second = Message::from_reader(&mut cursor, MAX_REPLY_BYTES).unwrap();
        assert_eq!(second.command(), Some(CommandId::QueryTime));
        assert!(matches!(
            Message::from_reader(&mut cursor, MAX_REPLY_BYTES),
            Err(ReadError::ConnectionClosed)
        ));
    }

    #[test]
    fn truncated_stream_is_invalid() {
        let mut cursor = Cursor::new(b"?V:1,C:185=4".to_vec());
        assert!(matches!(
            Message::from_reader(&mut cursor, MAX_REPLY_BYTES),
            Err(ReadError::InvalidFrame(_))
        ));
    }

    #[test]
    fn partial_reply_needs_final_terminator() {
        for stream in ["?V:1,C:165=1,2$", "?V:1,C:165=1,2$?V:1,C:165=3,4$"] {
            match Message::decode_partial(stream) {
                Err(ReadError::InvalidFrame(f)) => assert_eq!(f, stream),
                other => panic!("expected InvalidFrame for {:?}, got {:?}", stream, other),
            }
        }
    }

    #[test]
    fn stream_ending_inside_partial_reply_is_invalid() {
        let mut cursor = Cursor::new(b"?V:1,C:165=1,2$?V:1,C:165=3,4$".to_vec());
        assert!(matches!(
            Message::from_reader(&mut cursor, MAX_REPLY_BYTES),
            Err(ReadError::InvalidFrame(_))
        ));
    }

    #[test]
    fn reply_without_terminator_is_bounded() {
        let mut data = b"?V:1,C:165=".to_vec();
        data.extend(std::iter::repeat_n(b'1', 100));
        let mut cursor = Cursor::new(data);
        match Message::from_reader(&mut cursor, 64) {
            Err(ReadError::TooManyBytes { max, got }) => {
                assert_eq!(max, 64);
                assert_eq!(got, 65);
            }
            other => panic!("expected TooManyBytes, got {:?}", other),
        }

        let mut cursor = Cursor::new(b"?V:1,C:185=42#".to_vec());
        assert_eq!(
            Message::from_reader(&mut cursor, 14).unwrap().answer,
            "42"
        );
    }

    #[test]
    fn plus_sign_marks_signed_value() {
        assert_eq!(
            Parameter::decode("P:+5").unwrap(),
            p(ParameterId::PROPORTION, 5i64)
        );
        assert!(matches!(
            Parameter::decode("C:+185"),
            Err(ReadError::MalformedParameter(_))
        ));
    }

    #[test]
    fn write_message() {
        let mut out = Vec::new();
        command::query_groups().write_to(&mut out).unwrap();
        assert_eq!(out, b">V:1,C:165#".to_vec());
    }
}
