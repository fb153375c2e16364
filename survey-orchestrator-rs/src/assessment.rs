// survey-orchestrator-rs/src/assessment.rs
// Structured street assessment and its strict reply parser

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ClassifyError;

/// Keys the assessment reply must contain, and nothing else
pub const ASSESSMENT_KEYS: [&str; 7] = [
    "is_valid_image",
    "cleanliness_score",
    "trash_accumulation",
    "trash_intensity",
    "collection_urgency",
    "bins_present",
    "justification",
];

macro_rules! labelled_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal $(| $alias:literal)*),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        pub enum $name {
            $(#[serde(rename = $label)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let normalized = s.trim().to_lowercase();
                $(
                    if normalized == $label.to_lowercase() $(|| normalized == $alias.to_lowercase())* {
                        return Ok($name::$variant);
                    }
                )+
                Err(format!("unexpected {} value {:?}", stringify!($name), s))
            }
        }
    };
}

labelled_enum!(
    /// Yes/No answer
    YesNo {
        Yes => "Yes",
        No => "No",
    }
);

labelled_enum!(
    /// How much trash is accumulated
    TrashIntensity {
        None => "None" | "Not applicable",
        Light => "Light",
        Moderate => "Moderate",
        High => "High",
    }
);

labelled_enum!(
    /// How urgently the street needs collection
    CollectionUrgency {
        NotUrgent => "Not urgent",
        ModeratelyUrgent => "Moderately urgent",
        Urgent => "Urgent",
    }
);

/// Judgment of one panorama by the generative vision model
///
/// When `is_valid_image` is false the optional fields may be absent; they
/// mean "not applicable", not a failed capture.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssessmentResult {
    pub is_valid_image: bool,
    pub cleanliness_score: Option<u8>,
    pub trash_accumulation: Option<YesNo>,
    pub trash_intensity: Option<TrashIntensity>,
    pub collection_urgency: Option<CollectionUrgency>,
    pub bins_present: Option<YesNo>,
    pub justification: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAssessment {
    is_valid_image: bool,
    cleanliness_score: Option<i64>,
    trash_accumulation: Option<String>,
    trash_intensity: Option<String>,
    collection_urgency: Option<String>,
    bins_present: Option<String>,
    justification: String,
}

/// Remove every Markdown code fence marker, wherever it appears
pub fn strip_code_fences(reply: &str) -> String {
    reply.replace("```json", "").replace("```", "").trim().to_string()
}

/// The outermost `{...}` span, skipping any prose around it
fn json_object_span(text: &str) -> &str {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}

fn parse_field<T: FromStr<Err = String>>(value: Option<String>) -> Result<Option<T>, ClassifyError> {
    value
        .map(|v| v.parse::<T>())
        .transpose()
        .map_err(ClassifyError::MalformedReply)
}

/// Parse a model reply, failing closed on anything outside the schema
pub fn parse_assessment(reply: &str) -> Result<AssessmentResult, ClassifyError> {
    let stripped = strip_code_fences(reply);
    let value: Value = serde_json::from_str(json_object_span(&stripped))
        .map_err(|e| ClassifyError::MalformedReply(format!("not JSON: {}", e)))?;

    let object = value
        .as_object()
        .ok_or_else(|| ClassifyError::MalformedReply("reply is not a JSON object".to_string()))?;

    if let Some(missing) = ASSESSMENT_KEYS.iter().find(|key| !object.contains_key(**key)) {
        return Err(ClassifyError::MalformedReply(format!("missing key {}", missing)));
    }

    let raw: RawAssessment =
        serde_json::from_value(value).map_err(|e| ClassifyError::MalformedReply(e.to_string()))?;

    let cleanliness_score = match raw.cleanliness_score {
        Some(score) if (1..=10).contains(&score) => Some(score as u8),
        Some(score) => {
            return Err(ClassifyError::MalformedReply(format!(
                "cleanliness_score {} outside 1..=10",
                score
            )))
        }
        None => None,
    };

    let result = AssessmentResult {
        is_valid_image: raw.is_valid_image,
        cleanliness_score,
        trash_accumulation: parse_field(raw.trash_accumulation)?,
        trash_intensity: parse_field(raw.trash_intensity)?,
        collection_urgency: parse_field(raw.collection_urgency)?,
        bins_present: parse_field(raw.bins_present)?,
        justification: raw.justification,
    };

    if result.is_valid_image && !result.is_complete() {
        return Err(ClassifyError::MalformedReply(
            "valid image with unanswered fields".to_string(),
        ));
    }

    Ok(result)
}

impl AssessmentResult {
    /// Every rated field is present
    pub fn is_complete(&self) -> bool {
        self.cleanliness_score.is_some()
            && self.trash_accumulation.is_some()
            && self.trash_intensity.is_some()
            && self.collection_urgency.is_some()
            && self.bins_present.is_some()
    }
}

/// Instruction sent with every panorama
pub fn assessment_prompt(response_language: &str) -> String {
    format!(
        r#"You are an expert in visual analysis of streets, supporting efficient urban cleaning. You will receive one image composed of four different takes of the same street.

Step 1: validate the image.
Confirm the image clearly shows four takes of the same street and that it is an outdoor public space.
If it does not (for example it is not visible, it is damaged, it shows the inside of a shop, or it was taken by mistake), set "is_valid_image" to false, set every rated field to null and explain the specific reason in the justification.

Step 2: if the image is valid, answer:
1. How clean does the street look overall? Rate from 1 to 10 (10 = very clean, 1 = extremely dirty).
2. Is there visible accumulation of trash? Answer "Yes" or "No". If "Yes", rate the intensity as "Light", "Moderate" or "High"; if "No", use "None".
3. Does waste collection look urgent? Answer "Not urgent", "Moderately urgent" or "Urgent".
4. Are there litter bins or containers on the street? Answer "Yes" or "No".
5. Give the main reasons for your evaluation.

Reply with exactly this JSON object and nothing else, without Markdown:
{{
    "is_valid_image": <true or false>,
    "cleanliness_score": <integer from 1 to 10 or null>,
    "trash_accumulation": <"Yes", "No" or null>,
    "trash_intensity": <"None", "Light", "Moderate", "High" or null>,
    "collection_urgency": <"Not urgent", "Moderately urgent", "Urgent" or null>,
    "bins_present": <"Yes", "No" or null>,
    "justification": <string>
}}
Write the justification in this language: "{}""#,
        response_language
    )
}
