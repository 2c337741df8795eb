use std::num::ParseFloatError;
use std::path::PathBuf;

use thiserror::Error;

use crate::events::{decode_event_json, EventDecodeError};
use crate::{ApplyMode, DamageEvent, ImpactVector, VehicleId};

/// Commands accepted on the operator console.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Register { vehicle: VehicleId },
    Record(DamageEvent),
    Reset { vehicle: VehicleId },
    Evict { vehicle: VehicleId },
    Render {
        vehicle: VehicleId,
        path: Option<PathBuf>,
    },
    Status,
}

#[derive(Debug, Error)]
pub enum CommandParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),
    #[error("invalid float '{value}' for {context}: {source}")]
    InvalidFloat {
        value: String,
        context: &'static str,
        source: ParseFloatError,
    },
    #[error("invalid event record: {0}")]
    InvalidEvent(#[from] EventDecodeError),
}

pub fn parse_command_line(input: &str) -> Result<ConsoleCommand, CommandParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CommandParseError::Empty);
    }

    let (verb, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb.to_ascii_lowercase(), rest.trim()),
        None => (trimmed.to_ascii_lowercase(), ""),
    };
    let mut parts = rest.split_whitespace();

    match verb.as_str() {
        "register" | "track" => {
            let vehicle = next_vehicle(&mut parts)?;
            Ok(ConsoleCommand::Register { vehicle })
        }
        "damage" | "hit" => {
            let vehicle = next_vehicle(&mut parts)?;
            let tag = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("zone"))?;
            let amount = parse_f32(parts.next().unwrap_or("0.1"), "damage amount")?;
            Ok(ConsoleCommand::Record(DamageEvent::tagged(
                vehicle,
                tag,
                amount,
                ApplyMode::Delta,
            )))
        }
        "set" => {
            let vehicle = next_vehicle(&mut parts)?;
            let tag = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("zone"))?;
            let value_str = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("value"))?;
            let value = parse_f32(value_str, "set value")?;
            Ok(ConsoleCommand::Record(DamageEvent::tagged(
                vehicle,
                tag,
                value,
                ApplyMode::Absolute,
            )))
        }
        "impact" => {
            let vehicle = next_vehicle(&mut parts)?;
            let x = parse_f32(
                parts.next().ok_or(CommandParseError::MissingArgument("x"))?,
                "impact x",
            )?;
            let y = parse_f32(
                parts.next().ok_or(CommandParseError::MissingArgument("y"))?,
                "impact y",
            )?;
            let z = parse_f32(
                parts.next().ok_or(CommandParseError::MissingArgument("z"))?,
                "impact z",
            )?;
            let amount = parse_f32(parts.next().unwrap_or("0.1"), "impact amount")?;
            Ok(ConsoleCommand::Record(DamageEvent::impact(
                vehicle,
                ImpactVector::new(x, y, z),
                amount,
                ApplyMode::Delta,
            )))
        }
        "event" => {
            if rest.is_empty() {
                return Err(CommandParseError::MissingArgument("json"));
            }
            Ok(ConsoleCommand::Record(decode_event_json(rest)?))
        }
        "reset" | "repair" => {
            let vehicle = next_vehicle(&mut parts)?;
            Ok(ConsoleCommand::Reset { vehicle })
        }
        "evict" | "untrack" => {
            let vehicle = next_vehicle(&mut parts)?;
            Ok(ConsoleCommand::Evict { vehicle })
        }
        "render" => {
            let vehicle = next_vehicle(&mut parts)?;
            let path = parts.next().map(PathBuf::from);
            Ok(ConsoleCommand::Render { vehicle, path })
        }
        "status" => Ok(ConsoleCommand::Status),
        other => Err(CommandParseError::UnknownCommand(other.to_string())),
    }
}

fn next_vehicle<'a>(
    parts: &mut impl Iterator<Item = &'a str>,
) -> Result<VehicleId, CommandParseError> {
    parts
        .next()
        .map(VehicleId::from)
        .ok_or(CommandParseError::MissingArgument("vehicle"))
}

fn parse_f32(value: &str, context: &'static str) -> Result<f32, CommandParseError> {
    value
        .parse::<f32>()
        .map_err(|source| CommandParseError::InvalidFloat {
            value: value.to_string(),
            context,
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ZoneSource;

    #[test]
    fn damage_is_a_delta() {
        let command = parse_command_line("damage V1 FRONT-BUMPER 0.3").expect("parses");
        match command {
            ConsoleCommand::Record(event) => {
                assert_eq!(event.vehicle, VehicleId::new("V1"));
                assert_eq!(event.source, ZoneSource::Tag("FRONT-BUMPER".into()));
                assert_eq!(event.value, 0.3);
                assert_eq!(event.mode, ApplyMode::Delta);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn set_requires_value() {
        let err = parse_command_line("set V1 left-skirt").unwrap_err();
        assert!(matches!(err, CommandParseError::MissingArgument("value")));
    }

    #[test]
    fn verbs_are_case_insensitive() {
        let command = parse_command_line("  RESET car-9 ").expect("parses");
        assert_eq!(
            command,
            ConsoleCommand::Reset {
                vehicle: VehicleId::new("car-9")
            }
        );
    }

    #[test]
    fn impact_parses_vector() {
        let command = parse_command_line("impact V2 0.5 0 -2 0.4").expect("parses");
        let ConsoleCommand::Record(event) = command else {
            panic!("expected a record command");
        };
        assert_eq!(
            event.source,
            ZoneSource::Impact(ImpactVector::new(0.5, 0.0, -2.0))
        );
        assert_eq!(event.value, 0.4);
    }

    #[test]
    fn event_line_carries_json() {
        let command = parse_command_line(
            r#"event {"vehicle":"V3","source":{"tag":"tyres"},"value":1.0,"mode":"absolute"}"#,
        )
        .expect("parses");
        let ConsoleCommand::Record(event) = command else {
            panic!("expected a record command");
        };
        assert_eq!(event.vehicle, VehicleId::new("V3"));
        assert_eq!(event.mode, ApplyMode::Absolute);
    }

    #[test]
    fn render_path_is_optional() {
        assert_eq!(
            parse_command_line("render V1").expect("parses"),
            ConsoleCommand::Render {
                vehicle: VehicleId::new("V1"),
                path: None
            }
        );
        assert_eq!(
            parse_command_line("render V1 out.svg").expect("parses"),
            ConsoleCommand::Render {
                vehicle: VehicleId::new("V1"),
                path: Some(PathBuf::from("out.svg"))
            }
        );
    }

    #[test]
    fn rejects_unknown_and_bad_numbers() {
        assert!(matches!(
            parse_command_line("explode V1"),
            Err(CommandParseError::UnknownCommand(verb)) if verb == "explode"
        ));
        assert!(matches!(
            parse_command_line("damage V1 front lots"),
            Err(CommandParseError::InvalidFloat { .. })
        ));
        assert!(matches!(parse_command_line("   "), Err(CommandParseError::Empty)));
    }
}
