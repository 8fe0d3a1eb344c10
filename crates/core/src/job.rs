//! Invocation events and the validated job they describe.
//!
//! The host hands the worker a loosely shaped JSON event. [`JobRequest`]
//! mirrors the `input` object field for field; [`Job::from_request`] turns it
//! into a typed [`Job`] and rejects malformed shapes before any asset is
//! touched.

use serde::Deserialize;
use serde_json::Value;

use crate::error::InputError;

/// Default `dynamic_scale` when the caller does not provide one.
pub const DEFAULT_DYNAMIC_SCALE: f64 = 1.0;

/// Minimum output resolution passed to the generation engine.
pub const MIN_RESOLUTION: u32 = 512;

// ---------------------------------------------------------------------------
// Raw event shapes
// ---------------------------------------------------------------------------

/// Envelope delivered by the serverless host for one invocation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvocationEvent {
    /// Host-assigned invocation id.
    #[serde(default)]
    pub id: Option<String>,
    /// Caller payload; kept untyped so a malformed payload still yields a
    /// failure result instead of a rejected invocation.
    #[serde(default)]
    pub input: Option<Value>,
}

impl InvocationEvent {
    /// Parse an event from arbitrary JSON.
    pub fn from_value(value: Value) -> Result<Self, InputError> {
        serde_json::from_value(value).map_err(|e| InputError::Malformed(e.to_string()))
    }
}

/// The `input` object of an invocation event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobRequest {
    pub image_url: Option<String>,
    pub audio_url: Option<String>,
    pub image_base64: Option<String>,
    pub audio_base64: Option<String>,
    pub dynamic_scale: Option<f64>,
    pub crop: Option<bool>,
    pub job_id: Option<String>,
    pub webhook_url: Option<String>,
    pub webhook_data: Option<WebhookData>,
}

/// Caller-supplied overrides for the delivery notification.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookData {
    pub job_id: Option<String>,
    pub api_key: Option<String>,
}

impl JobRequest {
    /// Extract and deserialize the `input` object of an event.
    pub fn from_event(event: &InvocationEvent) -> Result<Self, InputError> {
        let input = match &event.input {
            None | Some(Value::Null) => return Err(InputError::NoInputField),
            Some(value) => value,
        };
        if !input.is_object() {
            return Err(InputError::Malformed(
                "'input' must be a JSON object".to_string(),
            ));
        }
        serde_json::from_value(input.clone()).map_err(|e| InputError::Malformed(e.to_string()))
    }

    /// Job id: the caller's `job_id`, then the host's invocation id, then a
    /// generated placeholder.
    pub fn resolve_job_id(&self, invocation_id: Option<&str>) -> String {
        non_blank(&self.job_id)
            .or_else(|| invocation_id.map(str::trim).filter(|s| !s.is_empty()))
            .map(str::to_string)
            .unwrap_or_else(placeholder_job_id)
    }

    /// Delivery target, present whenever `webhook_url` is set.
    pub fn delivery_target(&self, job_id: &str) -> Option<DeliveryTarget> {
        let url = non_blank(&self.webhook_url)?;
        let data = self.webhook_data.as_ref();
        Some(DeliveryTarget {
            url: url.to_string(),
            job_id: data
                .and_then(|d| non_blank(&d.job_id))
                .unwrap_or(job_id)
                .to_string(),
            api_key: data.and_then(|d| non_blank(&d.api_key)).map(str::to_string),
        })
    }
}

/// Generate a job id for events that carry none.
pub fn placeholder_job_id() -> String {
    format!("job-{}", uuid::Uuid::new_v4().simple())
}

// ---------------------------------------------------------------------------
// Validated job
// ---------------------------------------------------------------------------

/// Where the two input assets come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputDescriptor {
    /// Both assets are fetched over HTTP.
    Reference { image_url: String, audio_url: String },
    /// Both assets are embedded as base64 payloads.
    Inline {
        image_base64: String,
        audio_base64: String,
    },
}

impl InputDescriptor {
    /// Select the input form of a request.
    ///
    /// A complete reference form wins over everything else; a complete
    /// inline form is used otherwise. A half-filled form with no complete
    /// alternative is reported with the field it is missing.
    pub fn from_request(request: &JobRequest) -> Result<Self, InputError> {
        let image_url = non_blank(&request.image_url);
        let audio_url = non_blank(&request.audio_url);
        let image_base64 = non_blank(&request.image_base64);
        let audio_base64 = non_blank(&request.audio_base64);

        if let (Some(image_url), Some(audio_url)) = (image_url, audio_url) {
            validate_url("image_url", image_url)?;
            validate_url("audio_url", audio_url)?;
            return Ok(Self::Reference {
                image_url: image_url.to_string(),
                audio_url: audio_url.to_string(),
            });
        }

        if let (Some(image_base64), Some(audio_base64)) = (image_base64, audio_base64) {
            return Ok(Self::Inline {
                image_base64: image_base64.to_string(),
                audio_base64: audio_base64.to_string(),
            });
        }

        match (image_url, audio_url, image_base64, audio_base64) {
            (Some(_), None, _, _) => Err(InputError::IncompleteForm {
                present: "image_url",
                missing: "audio_url",
            }),
            (None, Some(_), _, _) => Err(InputError::IncompleteForm {
                present: "audio_url",
                missing: "image_url",
            }),
            (_, _, Some(_), None) => Err(InputError::IncompleteForm {
                present: "image_base64",
                missing: "audio_base64",
            }),
            (_, _, None, Some(_)) => Err(InputError::IncompleteForm {
                present: "audio_base64",
                missing: "image_base64",
            }),
            _ => Err(InputError::MissingInput),
        }
    }

    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Reference { .. } => "reference",
            Self::Inline { .. } => "inline",
        }
    }
}

/// Engine parameters for one job. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParameters {
    pub dynamic_scale: f64,
    pub crop: bool,
    pub min_resolution: u32,
    /// Operator-chosen quality/speed trade-off; callers cannot override it.
    pub inference_steps: u32,
}

/// Endpoint notified of the job outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryTarget {
    pub url: String,
    /// Job id reported in the notification payload.
    pub job_id: String,
    pub api_key: Option<String>,
}

impl DeliveryTarget {
    /// Best-effort target for an `input` object that failed to deserialize.
    pub fn from_raw_input(input: &Value, job_id: &str) -> Option<Self> {
        let url = input.get("webhook_url")?.as_str()?.trim();
        if url.is_empty() {
            return None;
        }
        let data = input.get("webhook_data");
        let field = |name: &str| {
            data.and_then(|d| d.get(name))
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
        };
        Some(Self {
            url: url.to_string(),
            job_id: field("job_id").unwrap_or(job_id).to_string(),
            api_key: field("api_key").map(str::to_string),
        })
    }

    /// Value of the `Authorization` header. An absent key still produces
    /// the `Bearer ` prefix.
    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.api_key.as_deref().unwrap_or(""))
    }
}

/// One invocation's unit of work.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: String,
    pub input: InputDescriptor,
    pub params: GenerationParameters,
    pub delivery: Option<DeliveryTarget>,
}

impl Job {
    /// Validate a request into a job.
    pub fn from_request(
        id: String,
        request: &JobRequest,
        inference_steps: u32,
    ) -> Result<Self, InputError> {
        let input = InputDescriptor::from_request(request)?;

        let dynamic_scale = request.dynamic_scale.unwrap_or(DEFAULT_DYNAMIC_SCALE);
        if !dynamic_scale.is_finite() || dynamic_scale <= 0.0 {
            return Err(InputError::InvalidDynamicScale(dynamic_scale));
        }

        let delivery = request.delivery_target(&id);

        Ok(Self {
            input,
            params: GenerationParameters {
                dynamic_scale,
                crop: request.crop.unwrap_or(false),
                min_resolution: MIN_RESOLUTION,
                inference_steps,
            },
            delivery,
            id,
        })
    }

    /// Job id reduced to characters that are safe in a file name.
    ///
    /// An id with nothing usable left gets a fresh placeholder id instead,
    /// so such jobs never share an output file.
    pub fn file_stem(&self) -> String {
        let stem = self
            .id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect::<String>();
        match stem.trim_start_matches('.') {
            "" => placeholder_job_id(),
            stem => stem.to_string(),
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn validate_url(field: &'static str, value: &str) -> Result<(), InputError> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(InputError::InvalidUrl {
            field,
            value: value.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
