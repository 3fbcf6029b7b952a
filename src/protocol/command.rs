//! Text commands for the registration and control channels
//!
//! Both channels carry short UTF-8 datagrams. Parsing never fails loudly:
//! unknown text is [`ControlParse::Ignored`], a known command with bad
//! arguments is [`ControlParse::Invalid`] so the listener can reply with the
//! matching error token.

use std::num::IntErrorKind;

use crate::error::ValidationError;

use super::constants::*;

/// Message on the registration channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationMessage {
    Register,
    Unregister,
}

impl RegistrationMessage {
    /// Parse a registration datagram; anything unrecognized is `None`
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim() {
            MSG_REGISTER => Some(RegistrationMessage::Register),
            MSG_UNREGISTER => Some(RegistrationMessage::Unregister),
            _ => None,
        }
    }
}

/// Which parameter a control command targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Color,
    Intensity,
    Blur,
}

impl CommandKind {
    pub fn name(&self) -> &'static str {
        match self {
            CommandKind::Color => CMD_COLOR,
            CommandKind::Intensity => CMD_INTENSITY,
            CommandKind::Blur => CMD_BLUR,
        }
    }

    /// Reply sent when the command was applied
    pub fn ok_token(&self) -> &'static str {
        match self {
            CommandKind::Color => "COLOR_OK",
            CommandKind::Intensity => "INTENSITY_OK",
            CommandKind::Blur => "BLUR_OK",
        }
    }

    /// Reply sent when the command was rejected
    pub fn error_token(&self) -> &'static str {
        match self {
            CommandKind::Color => "COLOR_ERROR",
            CommandKind::Intensity => "INTENSITY_ERROR",
            CommandKind::Blur => "BLUR_ERROR",
        }
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A syntactically valid control command
///
/// Values are carried unvalidated; range checks belong to the parameter
/// store so the clamp-or-reject policy lives in one place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlCommand {
    Color { r: i64, g: i64, b: i64 },
    Intensity(f64),
    Blur(i64),
}

impl ControlCommand {
    pub fn kind(&self) -> CommandKind {
        match self {
            ControlCommand::Color { .. } => CommandKind::Color,
            ControlCommand::Intensity(_) => CommandKind::Intensity,
            ControlCommand::Blur(_) => CommandKind::Blur,
        }
    }
}

/// Result of parsing a control datagram
#[derive(Debug, Clone, PartialEq)]
pub enum ControlParse {
    /// Well-formed command
    Command(ControlCommand),
    /// Recognized command with malformed arguments
    Invalid(CommandKind, ValidationError),
    /// Not a command we know
    Ignored,
}

/// Parse `COLOR:r,g,b`, `INTENSITY:x` or `BLUR:n`
///
/// The value is the field between the first and second `:`; anything after
/// a second `:` is ignored.
pub fn parse_control(text: &str) -> ControlParse {
    let text = text.trim();

    let Some((name, rest)) = text.split_once(':') else {
        return ControlParse::Ignored;
    };
    let args = rest.split_once(':').map_or(rest, |(field, _)| field);

    let result = match name {
        CMD_COLOR => parse_color(args).map(|(r, g, b)| ControlCommand::Color { r, g, b }),
        CMD_INTENSITY => parse_float(args).map(ControlCommand::Intensity),
        CMD_BLUR => parse_int(args).map(ControlCommand::Blur),
        _ => return ControlParse::Ignored,
    };

    match result {
        Ok(cmd) => ControlParse::Command(cmd),
        Err(e) => {
            let kind = match name {
                CMD_COLOR => CommandKind::Color,
                CMD_INTENSITY => CommandKind::Intensity,
                _ => CommandKind::Blur,
            };
            ControlParse::Invalid(kind, e)
        }
    }
}

/// Integers beyond the i64 range saturate; every consumer clamps or
/// range-checks afterwards.
fn parse_int(s: &str) -> Result<i64, ValidationError> {
    let s = s.trim();
    s.parse::<i64>().or_else(|e| match e.kind() {
        IntErrorKind::PosOverflow => Ok(i64::MAX),
        IntErrorKind::NegOverflow => Ok(i64::MIN),
        _ => Err(ValidationError::InvalidNumber(s.to_string())),
    })
}

/// NaN parses; the parameter store decides what it means
fn parse_float(s: &str) -> Result<f64, ValidationError> {
    let s = s.trim();
    s.parse::<f64>()
        .map_err(|_| ValidationError::InvalidNumber(s.to_string()))
}

fn parse_color(s: &str) -> Result<(i64, i64, i64), ValidationError> {
    let fields: Vec<&str> = s.split(',').collect();
    if fields.len() != 3 {
        return Err(ValidationError::FieldCount {
            expected: 3,
            actual: fields.len(),
        });
    }

    Ok((
        parse_int(fields[0])?,
        parse_int(fields[1])?,
        parse_int(fields[2])?,
    ))
}
