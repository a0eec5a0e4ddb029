use std::fmt::{Display, Formatter};

use serde::Serialize;
use twmon_core::{EnvelopeMeta, ProviderId, ValidationError};
use uuid::Uuid;

/// Request identifier (UUID v4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// 16-byte hex trace id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TraceId(String);

impl TraceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Per-invocation metadata gathered while a command runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub request_id: RequestId,
    pub trace_id: TraceId,
    pub source_chain: Vec<ProviderId>,
    pub latency_ms: u64,
    pub cache_hit: bool,
    pub warnings: Vec<String>,
}

impl Metadata {
    pub fn new(
        source_chain: Vec<ProviderId>,
        latency_ms: u64,
        cache_hit: bool,
    ) -> Result<Self, ValidationError> {
        if source_chain.is_empty() {
            return Err(ValidationError::EmptySourceChain);
        }

        Ok(Self {
            request_id: RequestId::new_v4(),
            trace_id: TraceId::new(),
            source_chain,
            latency_ms,
            cache_hit,
            warnings: Vec::new(),
        })
    }

    pub fn push_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn into_envelope_meta(self) -> Result<EnvelopeMeta, ValidationError> {
        let mut meta = EnvelopeMeta::new(
            self.request_id.to_string(),
            self.source_chain,
            self.latency_ms,
            self.cache_hit,
        )?
        .with_trace_id(self.trace_id.as_str())?;

        for warning in self.warnings {
            meta.push_warning(warning);
        }

        Ok(meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_id_is_uuid_v4() {
        assert_eq!(RequestId::new_v4().0.get_version_num(), 4);
    }

    #[test]
    fn envelope_meta_carries_ids_and_warnings() {
        let mut metadata = Metadata::new(vec![ProviderId::Fixture], 12, false).expect("valid");
        metadata.push_warning("w1");
        let trace_id = metadata.trace_id.clone();

        let meta = metadata.into_envelope_meta().expect("valid meta");
        assert_eq!(meta.trace_id.as_deref(), Some(trace_id.as_str()));
        assert_eq!(meta.warnings, vec![String::from("w1")]);
        assert_eq!(meta.latency_ms, 12);
    }

    #[test]
    fn empty_source_chain_is_rejected() {
        let err = Metadata::new(Vec::new(), 0, false).expect_err("must fail");
        assert_eq!(err, ValidationError::EmptySourceChain);
    }
}
