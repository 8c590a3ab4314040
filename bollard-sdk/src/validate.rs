#![forbid(unsafe_code)]

//! Pre-submission checks for the editable settings.

use crate::error::ValidationError;
use crate::proto::SettingsPatch;

pub const OCCUPY_RATIO_FIELD: &str = "occupy_ratio";
pub const MAINTAIN_FRAME_FIELD: &str = "maintain_frame";

pub const OCCUPY_RATIO_MIN: i64 = 1;
pub const OCCUPY_RATIO_MAX: i64 = 100;
pub const MAINTAIN_FRAME_MIN: i64 = 1;

/// Turn raw form text into a [`SettingsPatch`].
///
/// Both numeric fields are checked for presence first, so an empty field is
/// reported as such even when the other one is malformed.
pub fn validate(occupy_ratio: &str, maintain_frame: &str, target_object: &str) -> Result<SettingsPatch, ValidationError> {
	let occupy_text = required(OCCUPY_RATIO_FIELD, occupy_ratio)?;
	let maintain_text = required(MAINTAIN_FRAME_FIELD, maintain_frame)?;

	let occupy_ratio = parse_int(OCCUPY_RATIO_FIELD, occupy_text)?;
	let maintain_frame = parse_int(MAINTAIN_FRAME_FIELD, maintain_text)?;

	if !(OCCUPY_RATIO_MIN..=OCCUPY_RATIO_MAX).contains(&occupy_ratio) {
		return Err(ValidationError::OutOfRange {
			field: OCCUPY_RATIO_FIELD,
			value: occupy_ratio,
			min: OCCUPY_RATIO_MIN,
			max: Some(OCCUPY_RATIO_MAX),
		});
	}
	if maintain_frame < MAINTAIN_FRAME_MIN {
		return Err(ValidationError::OutOfRange { field: MAINTAIN_FRAME_FIELD, value: maintain_frame, min: MAINTAIN_FRAME_MIN, max: None });
	}

	let target = target_object.trim();
	Ok(SettingsPatch {
		occupy_ratio,
		maintain_frame,
		target_object: (!target.is_empty()).then(|| target.to_string()),
	})
}

fn required<'a>(field: &'static str, text: &'a str) -> Result<&'a str, ValidationError> {
	let t = text.trim();
	if t.is_empty() { Err(ValidationError::EmptyRequiredField { field }) } else { Ok(t) }
}

fn parse_int(field: &'static str, text: &str) -> Result<i64, ValidationError> {
	text.parse::<i64>().map_err(|_| ValidationError::NotANumber { field, input: text.to_string() })
}
