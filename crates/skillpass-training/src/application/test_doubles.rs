//! Test doubles for the training ports.

use async_trait::async_trait;
use skillpass_core::error::DomainError;

use crate::application::ports::{VariationGenerator, VariationRequest};
use crate::domain::variation::VariationMap;

/// A generator that always reports the service as unavailable.
#[derive(Debug)]
pub(crate) struct FailingVariationGenerator;

#[async_trait]
impl VariationGenerator for FailingVariationGenerator {
    async fn generate_varied_scenes(
        &self,
        _request: VariationRequest<'_>,
    ) -> Result<VariationMap, DomainError> {
        Err(DomainError::ExternalUnavailable(
            "variation service timed out".into(),
        ))
    }
}

/// A generator that must never be called.
#[derive(Debug)]
pub(crate) struct PanickingVariationGenerator;

#[async_trait]
impl VariationGenerator for PanickingVariationGenerator {
    async fn generate_varied_scenes(
        &self,
        _request: VariationRequest<'_>,
    ) -> Result<VariationMap, DomainError> {
        panic!("variation generator should not be consulted")
    }
}
