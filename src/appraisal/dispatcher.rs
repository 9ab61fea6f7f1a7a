//! Single-pass appraisal dispatch.
//!
//! Each call spends at most one rotation slot and makes at most one provider
//! request. Failures are classified and returned, never retried.

use crate::appraisal::client::{AppraisalRequest, VisionProvider};
use crate::appraisal::prompt::build_prompt;
use crate::error::FailureRecord;
use crate::models::{redact_key, DispatchOutcome, ImageHandle, ItemEvaluation, ListingItem};
use crate::rotation::CredentialRotator;
use tracing::{info, warn};

/// Default cap on images submitted per item.
pub const DEFAULT_MAX_IMAGES: usize = 900;

/// Submits one appraisal per item through a [`VisionProvider`].
pub struct AnalysisDispatcher<'a> {
    provider: &'a dyn VisionProvider,
    max_images: usize,
}

impl<'a> AnalysisDispatcher<'a> {
    pub fn new(provider: &'a dyn VisionProvider, max_images: usize) -> Self {
        Self {
            provider,
            max_images,
        }
    }

    /// Appraise one item.
    ///
    /// An empty image set fails without touching the rotator. Oversized sets
    /// are cut down to the configured maximum.
    pub async fn dispatch(
        &self,
        rotator: &mut CredentialRotator,
        item: &ListingItem,
        images: &[ImageHandle],
    ) -> DispatchOutcome {
        if images.is_empty() {
            return DispatchOutcome::Failed(FailureRecord::NoImages {
                message: "No images available".to_string(),
            });
        }

        let images = if images.len() > self.max_images {
            warn!(
                "{} images exceeds {} limit, using first {}",
                images.len(),
                self.max_images,
                self.max_images
            );
            &images[..self.max_images]
        } else {
            images
        };

        let selection = rotator.next_selection();
        info!(
            "Analysis: {} images | Model: {} | Key #{}",
            images.len(),
            selection.model,
            selection.key_index + 1
        );

        let prompt = build_prompt(item, images.len());
        let request = AppraisalRequest {
            api_key: &selection.api_key,
            model: &selection.model,
            prompt: &prompt,
            images,
        };

        match self.provider.appraise(request).await {
            Ok(text) => DispatchOutcome::Evaluated(ItemEvaluation {
                title: item.title.clone(),
                listing_price: item.price,
                item_url: item.item_url.clone(),
                total_images: images.len(),
                full_analysis: text,
                api_key_used: redact_key(&selection.api_key),
                model_used: selection.model,
            }),
            Err(e) => {
                let failure = FailureRecord::from_provider_message(format!("{:#}", e));
                if failure.is_rate_limited() {
                    warn!("Rate limited on key #{}", selection.key_index + 1);
                } else {
                    warn!("Appraisal failed: {}", failure);
                }
                DispatchOutcome::Failed(failure)
            }
        }
    }
}
