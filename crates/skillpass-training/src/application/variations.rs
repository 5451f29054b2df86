//! Retake content: the authored-variant generator and the fallback policy
//! around any generator.

use async_trait::async_trait;
use skillpass_catalog::Module;
use skillpass_core::error::DomainError;
use skillpass_core::ports::RetakeStatus;
use tracing::{debug, warn};

use crate::application::ports::{VariationGenerator, VariationRequest};
use crate::domain::variation::VariationMap;

/// Serves the variants authored next to each scene in the catalog.
///
/// Attempt `n` receives variant `(n - 2) mod len`, so the second attempt
/// gets the first variant and later attempts cycle.
#[derive(Debug, Default, Clone, Copy)]
pub struct AuthoredVariationGenerator;

#[async_trait]
impl VariationGenerator for AuthoredVariationGenerator {
    async fn generate_varied_scenes(
        &self,
        request: VariationRequest<'_>,
    ) -> Result<VariationMap, DomainError> {
        if request.attempt_number < 2 {
            return Err(DomainError::Validation(format!(
                "attempt {} does not take variations",
                request.attempt_number
            )));
        }
        let offset = (request.attempt_number - 2) as usize;

        Ok(request
            .base_scenes
            .iter()
            .filter(|scene| !scene.variants.is_empty())
            .map(|scene| {
                let variant = &scene.variants[offset % scene.variants.len()];
                (scene.id.clone(), variant.clone())
            })
            .filter(|(_, variant)| !variant.is_empty())
            .collect())
    }
}

/// Fetches variations for a retake, degrading to base content.
///
/// The generator is only consulted when `retake` asks for variation; any
/// failure is logged and yields an empty map.
pub async fn load_variations(
    generator: &dyn VariationGenerator,
    module: &Module,
    retake: RetakeStatus,
) -> VariationMap {
    if !retake.wants_variation() {
        return VariationMap::new();
    }

    let request = VariationRequest {
        module_title: &module.title,
        competencies: &module.competencies,
        base_scenes: &module.scenes,
        attempt_number: retake.attempt_number,
    };
    match generator.generate_varied_scenes(request).await {
        Ok(variations) => {
            debug!(
                module_id = %module.id,
                attempt = retake.attempt_number,
                varied_scenes = variations.len(),
                "loaded retake variations"
            );
            variations
        }
        Err(e) => {
            warn!(
                module_id = %module.id,
                attempt = retake.attempt_number,
                error = %e,
                "variation generation failed, using base content"
            );
            VariationMap::new()
        }
    }
}
