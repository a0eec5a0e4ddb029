use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::analysis::SkippedInstrument;
use crate::{ProviderId, StockId, ValidationError};

/// Schema version stamped on every envelope.
pub const SCHEMA_VERSION: &str = "v1.0.0";

/// Wrapper for every machine-readable `twmon` output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub meta: EnvelopeMeta,
    pub data: T,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<EnvelopeError>,
}

impl<T> Envelope<T> {
    pub fn success(meta: EnvelopeMeta, data: T) -> Self {
        Self {
            meta,
            data,
            errors: Vec::new(),
        }
    }

    /// Envelope for a batch where some instruments were skipped.
    pub fn with_errors(
        meta: EnvelopeMeta,
        data: T,
        errors: Vec<EnvelopeError>,
    ) -> Result<Self, ValidationError> {
        meta.validate()?;
        for error in &errors {
            error.validate()?;
        }

        Ok(Self { meta, data, errors })
    }

    pub fn is_partial(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeMeta {
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    pub schema_version: String,
    /// RFC3339, always UTC.
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
    pub source_chain: Vec<ProviderId>,
    pub latency_ms: u64,
    /// True when at least one upstream response was served from the cache.
    pub cache_hit: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl EnvelopeMeta {
    pub fn new(
        request_id: impl Into<String>,
        source_chain: Vec<ProviderId>,
        latency_ms: u64,
        cache_hit: bool,
    ) -> Result<Self, ValidationError> {
        let meta = Self {
            request_id: request_id.into(),
            trace_id: None,
            schema_version: String::from(SCHEMA_VERSION),
            generated_at: OffsetDateTime::now_utc(),
            source_chain,
            latency_ms,
            cache_hit,
            warnings: Vec::new(),
        };
        meta.validate()?;
        Ok(meta)
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Result<Self, ValidationError> {
        let trace_id = trace_id.into();
        if !is_valid_trace_id(&trace_id) {
            return Err(ValidationError::InvalidTraceId);
        }

        self.trace_id = Some(trace_id);
        Ok(self)
    }

    pub fn push_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.request_id.trim().len() < 8 {
            return Err(ValidationError::InvalidRequestId);
        }

        if let Some(trace_id) = &self.trace_id {
            if !is_valid_trace_id(trace_id) {
                return Err(ValidationError::InvalidTraceId);
            }
        }

        if !is_valid_schema_version(&self.schema_version) {
            return Err(ValidationError::InvalidSchemaVersion {
                value: self.schema_version.clone(),
            });
        }

        if self.source_chain.is_empty() {
            return Err(ValidationError::EmptySourceChain);
        }

        Ok(())
    }
}

/// Structured error for a skipped instrument or a failed command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock_id: Option<StockId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl EnvelopeError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let error = Self {
            code: code.into(),
            message: message.into(),
            stock_id: None,
            retryable: None,
        };
        error.validate()?;
        Ok(error)
    }

    pub fn with_stock_id(mut self, stock_id: StockId) -> Self {
        self.stock_id = Some(stock_id);
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = Some(retryable);
        self
    }

    /// Error entry for an instrument dropped from a batch; unknown ids read "not found".
    pub fn for_skipped(skipped: &SkippedInstrument) -> Self {
        Self {
            code: skipped.code.clone(),
            message: skipped.reason().to_owned(),
            stock_id: Some(skipped.stock_id.clone()),
            retryable: Some(skipped.retryable),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.code.trim().is_empty() {
            return Err(ValidationError::EmptyErrorCode);
        }

        if self.message.trim().is_empty() {
            return Err(ValidationError::EmptyErrorMessage);
        }

        Ok(())
    }
}

fn is_valid_schema_version(value: &str) -> bool {
    let Some(version) = value.strip_prefix('v') else {
        return false;
    };

    let parts = version.split('.').collect::<Vec<_>>();
    parts.len() == 3
        && parts
            .iter()
            .all(|part| !part.is_empty() && part.chars().all(|ch| ch.is_ascii_digit()))
}

fn is_valid_trace_id(value: &str) -> bool {
    value.len() == 32
        && value.chars().all(|ch| ch.is_ascii_hexdigit())
        && value.chars().any(|ch| ch != '0')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_uses_current_schema_version() {
        let meta = EnvelopeMeta::new("request-12345", vec![ProviderId::Yahoo], 11, true)
            .expect("meta should be valid");
        assert_eq!(meta.schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn rejects_short_request_id_and_empty_chain() {
        let err = EnvelopeMeta::new("short", vec![ProviderId::Yahoo], 1, false).expect_err("must fail");
        assert_eq!(err, ValidationError::InvalidRequestId);

        let err = EnvelopeMeta::new("request-12345", Vec::new(), 1, false).expect_err("must fail");
        assert_eq!(err, ValidationError::EmptySourceChain);
    }

    #[test]
    fn schema_version_format() {
        assert!(is_valid_schema_version("v1.2.3"));
        assert!(!is_valid_schema_version("1.2.3"));
        assert!(!is_valid_schema_version("v1.2"));
        assert!(!is_valid_schema_version("v1.2.x"));
    }

    #[test]
    fn rejects_all_zero_trace_id() {
        let meta = EnvelopeMeta::new("request-12345", vec![ProviderId::Fixture], 1, false)
            .expect("meta must be valid");
        let err = meta
            .with_trace_id("00000000000000000000000000000000")
            .expect_err("must fail");
        assert_eq!(err, ValidationError::InvalidTraceId);
    }

    #[test]
    fn generated_at_serializes_as_utc_rfc3339() {
        let meta = EnvelopeMeta::new("request-12345", vec![ProviderId::Yahoo], 3, false)
            .expect("meta must be valid");
        let json = serde_json::to_value(&meta).expect("serializes");
        let generated_at = json["generated_at"].as_str().expect("string timestamp");
        assert!(generated_at.ends_with('Z'), "{generated_at}");

        let back: EnvelopeMeta = serde_json::from_value(json).expect("deserializes");
        assert_eq!(back.generated_at, meta.generated_at);
    }

    #[test]
    fn skipped_instrument_keeps_code_subject_and_short_reason() {
        let skipped = SkippedInstrument {
            stock_id: StockId::parse("9999").expect("id"),
            code: String::from("source.not_found"),
            message: String::from("unknown identifier 9999: no price on TWSE or TPEx"),
            retryable: false,
        };

        let error = EnvelopeError::for_skipped(&skipped);

        assert_eq!(error.code, "source.not_found");
        assert_eq!(error.message, "not found");
        assert_eq!(error.stock_id, Some(skipped.stock_id.clone()));
        assert_eq!(error.retryable, Some(false));
        error.validate().expect("valid");
    }
}
