/// Errors raised while turning an invocation event into a [`Job`](crate::job::Job).
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("No 'input' field in event")]
    NoInputField,

    #[error("Malformed input: {0}")]
    Malformed(String),

    #[error(
        "Missing input data. Provide either image_url/audio_url or image_base64/audio_base64"
    )]
    MissingInput,

    #[error("Missing input data: '{missing}' is required alongside '{present}'")]
    IncompleteForm {
        present: &'static str,
        missing: &'static str,
    },

    #[error("Invalid {field} '{value}': must start with http:// or https://")]
    InvalidUrl { field: &'static str, value: String },

    #[error("dynamic_scale must be a finite number greater than zero, got {0}")]
    InvalidDynamicScale(f64),
}

/// Errors raised while loading operator configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a valid {expected}, got '{value}'")]
    InvalidValue {
        var: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("{0} must not be empty")]
    Empty(&'static str),
}
