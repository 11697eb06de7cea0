use serde::{Deserialize, Serialize};

/// Request body for `models/<model>:generateContent`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

impl GenerateContentRequest {
    pub fn from_parts(parts: Vec<Part>) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            generation_config: None,
        }
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: impl Into<String>) -> Self {
        self.generation_config = Some(GenerationConfig {
            image_config: Some(ImageConfig {
                aspect_ratio: aspect_ratio.into(),
            }),
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// Wire part: which optional field is set says what it carries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// `data` is already base64 and is forwarded untouched.
    pub fn inline_base64(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            inline_data: Some(InlineData {
                mime_type: mime_type.into(),
                data: data.into(),
            }),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_config: Option<ImageConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    pub aspect_ratio: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// What a response part carries. Inline payloads are borrowed as sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentPart<'a> {
    Text(&'a str),
    InlineImage(&'a InlineData),
    Other,
}

impl<'a> From<&'a Part> for ContentPart<'a> {
    fn from(part: &'a Part) -> Self {
        if let Some(inline) = &part.inline_data {
            return ContentPart::InlineImage(inline);
        }
        match &part.text {
            Some(text) => ContentPart::Text(text),
            None => ContentPart::Other,
        }
    }
}

impl GenerateContentResponse {
    fn first_candidate_parts(&self) -> &[Part] {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or(&[])
    }

    /// Parts of the first candidate, in order.
    pub fn parts(&self) -> impl Iterator<Item = ContentPart<'_>> {
        self.first_candidate_parts().iter().map(ContentPart::from)
    }

    /// First inline image; later parts are never looked at.
    pub fn first_inline_image(&self) -> Option<&InlineData> {
        self.parts().find_map(|part| match part {
            ContentPart::InlineImage(inline) => Some(inline),
            _ => None,
        })
    }

    /// Concatenated text of the first candidate, `None` without text parts.
    pub fn text(&self) -> Option<String> {
        let texts: Vec<&str> = self
            .first_candidate_parts()
            .iter()
            .filter(|p| p.inline_data.is_none())
            .filter_map(|p| p.text.as_deref())
            .collect();
        if texts.is_empty() {
            None
        } else {
            Some(texts.concat())
        }
    }
}

/// `data:image/png;base64,<payload>` with the payload kept verbatim.
pub fn png_data_uri(payload: &str) -> String {
    format!("data:image/png;base64,{}", payload)
}

/// Drops a leading `data:<mime>;base64,` header, keeping everything after
/// the first comma.
pub fn strip_data_uri_header(payload: &str) -> &str {
    match payload.split_once(',') {
        Some((_, rest)) => rest,
        None => payload,
    }
}
