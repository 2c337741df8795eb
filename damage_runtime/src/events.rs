use thiserror::Error;

use crate::DamageEvent;

/// Error returned when an inbound event record cannot be decoded.
#[derive(Debug, Error)]
pub enum EventDecodeError {
    #[error("malformed event json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("event json on line {line}: {source}")]
    Line {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("event value {0} is not a finite number")]
    NonFiniteValue(f32),
}

/// Decode a single JSON event record.
pub fn decode_event_json(input: &str) -> Result<DamageEvent, EventDecodeError> {
    let event: DamageEvent = serde_json::from_str(input.trim())?;
    validate(event)
}

/// Decode newline-delimited JSON records. Blank lines are skipped; a bad line
/// yields an error entry and does not stop the records after it.
pub fn decode_event_lines(input: &str) -> Vec<Result<DamageEvent, EventDecodeError>> {
    input
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str::<DamageEvent>(line.trim())
                .map_err(|source| EventDecodeError::Line {
                    line: index + 1,
                    source,
                })
                .and_then(validate)
        })
        .collect()
}

pub fn encode_event_json(event: &DamageEvent) -> Result<String, serde_json::Error> {
    serde_json::to_string(event)
}

fn validate(event: DamageEvent) -> Result<DamageEvent, EventDecodeError> {
    if !event.value.is_finite() {
        return Err(EventDecodeError::NonFiniteValue(event.value));
    }
    Ok(event)
}
