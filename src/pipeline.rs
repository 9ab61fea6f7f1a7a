//! Sequential triage run.
//!
//! Items are resolved one at a time: images loaded, one appraisal
//! dispatched, outcome classified. Per-item failures are recorded and the
//! run continues; only configuration and image-source errors abort it.

use crate::analysis::{build_digest, extract};
use crate::appraisal::{AnalysisDispatcher, VisionProvider, DEFAULT_MAX_IMAGES};
use crate::error::{FailureRecord, TriageError};
use crate::images::ImageSource;
use crate::models::{Digest, DispatchOutcome, ItemOutcome, ListingItem};
use crate::rotation::CredentialRotator;
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Settings for one triage run.
#[derive(Debug, Clone)]
pub struct TriageSettings {
    pub api_keys: Vec<String>,
    pub models: Vec<String>,
    /// Requests per key shown in the usage report. Never enforced.
    pub per_key_quota_estimate: u64,
    pub max_images_per_item: usize,
    /// Pause after every successful dispatch.
    pub inter_request_delay: Duration,
    /// Skip the remaining items after the first rate limit.
    pub stop_on_rate_limit: bool,
}

impl Default for TriageSettings {
    fn default() -> Self {
        Self {
            api_keys: Vec::new(),
            models: vec![
                "gemini-2.0-flash-lite".to_string(),
                "gemini-2.0-flash".to_string(),
            ],
            per_key_quota_estimate: 40,
            max_images_per_item: DEFAULT_MAX_IMAGES,
            inter_request_delay: Duration::from_secs(2),
            stop_on_rate_limit: false,
        }
    }
}

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct TriageRun {
    /// Ranked evaluations plus usage, for the report renderer.
    pub digest: Digest,
    /// Every item's outcome in input order, for persistence.
    pub outcomes: Vec<ItemOutcome>,
}

/// Run a full triage with a fresh rotator.
pub async fn run_triage(
    items: &[ListingItem],
    settings: &TriageSettings,
    image_source: &dyn ImageSource,
    provider: &dyn VisionProvider,
    show_progress: bool,
) -> Result<TriageRun, TriageError> {
    let mut rotator = CredentialRotator::new(
        settings.api_keys.clone(),
        settings.models.clone(),
        settings.per_key_quota_estimate,
    )?;

    triage_with_rotator(
        &mut rotator,
        items,
        settings,
        image_source,
        provider,
        show_progress,
    )
    .await
}

/// Run a triage against an existing rotator, so usage carries across runs.
pub async fn triage_with_rotator(
    rotator: &mut CredentialRotator,
    items: &[ListingItem],
    settings: &TriageSettings,
    image_source: &dyn ImageSource,
    provider: &dyn VisionProvider,
    show_progress: bool,
) -> Result<TriageRun, TriageError> {
    if settings.max_images_per_item == 0 {
        return Err(TriageError::Configuration(
            "max_images_per_item must be at least 1".to_string(),
        ));
    }

    let dispatcher = AnalysisDispatcher::new(provider, settings.max_images_per_item);
    let progress = progress_bar(items.len() as u64, show_progress);

    let mut outcomes = Vec::with_capacity(items.len());
    let mut halted = false;

    for (i, item) in items.iter().enumerate() {
        info!(
            "[{}/{}] {} | ID: {} | Price: ${}",
            i + 1,
            items.len(),
            short_title(&item.title),
            item.item_id,
            item.price
        );
        progress.set_message(short_title(&item.title));

        if halted {
            outcomes.push(ItemOutcome {
                item: item.clone(),
                images_found: 0,
                outcome: DispatchOutcome::Failed(FailureRecord::Skipped {
                    message: "run stopped after rate limit".to_string(),
                }),
            });
            progress.inc(1);
            continue;
        }

        let images = image_source
            .images_for(item)
            .await
            .map_err(|e| TriageError::ImageSource {
                item_id: item.item_id.clone(),
                message: format!("{:#}", e),
            })?;

        let outcome = dispatcher.dispatch(rotator, item, &images).await;

        match &outcome {
            DispatchOutcome::Evaluated(evaluation) => {
                let extraction = extract(&evaluation.full_analysis);
                info!(
                    "{} | {}",
                    extraction.recommendation, extraction.estimated_value
                );
            }
            DispatchOutcome::Failed(failure) => {
                debug!("Item {} not evaluated ({})", item.item_id, failure.label());
                if failure.is_rate_limited() && settings.stop_on_rate_limit {
                    warn!("Rate limited, skipping the remaining items");
                    halted = true;
                }
            }
        }

        // Throttle after anything that reached the provider, failures included
        if outcome.spent_slot() && !settings.inter_request_delay.is_zero() {
            tokio::time::sleep(settings.inter_request_delay).await;
        }

        outcomes.push(ItemOutcome {
            item: item.clone(),
            images_found: images.len(),
            outcome,
        });
        progress.inc(1);
    }

    progress.finish_and_clear();

    let digest = build_digest(&outcomes, rotator.usage_report(), Utc::now());
    info!(
        "Triage complete: {} evaluated, {} failed, {} quota slots used",
        digest.summary.evaluated,
        digest.summary.failed(),
        rotator.total_selections()
    );

    Ok(TriageRun { digest, outcomes })
}

fn progress_bar(len: u64, show: bool) -> ProgressBar {
    if !show {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

/// Title cut to 55 characters for log lines.
fn short_title(title: &str) -> String {
    title.chars().take(55).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appraisal::testing::{images, item, ScriptedProvider};
    use crate::models::{ImageHandle, Recommendation};
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Fixed image counts per item id; unknown ids have none.
    struct FixedImages(HashMap<String, usize>);

    impl FixedImages {
        fn new(counts: &[(&str, usize)]) -> Self {
            Self(
                counts
                    .iter()
                    .map(|(id, n)| (id.to_string(), *n))
                    .collect(),
            )
        }
    }

    #[async_trait]
    impl ImageSource for FixedImages {
        async fn images_for(&self, item: &ListingItem) -> anyhow::Result<Vec<ImageHandle>> {
            Ok(images(self.0.get(&item.item_id).copied().unwrap_or(0)))
        }
    }

    struct BrokenImages;

    #[async_trait]
    impl ImageSource for BrokenImages {
        async fn images_for(&self, _item: &ListingItem) -> anyhow::Result<Vec<ImageHandle>> {
            Err(anyhow::anyhow!("image server unreachable"))
        }
    }

    fn settings(keys: usize, models: usize) -> TriageSettings {
        TriageSettings {
            api_keys: (0..keys).map(|i| format!("api-key-{}", i)).collect(),
            models: (0..models).map(|i| format!("model-{}", i)).collect(),
            inter_request_delay: Duration::ZERO,
            ..TriageSettings::default()
        }
    }

    fn items(ids: &[&str]) -> Vec<ListingItem> {
        ids.iter().map(|id| item(id)).collect()
    }

    #[tokio::test]
    async fn test_rate_limit_scenario() {
        let provider = ScriptedProvider::new(vec![
            Ok("BUY: $60 profit expected".to_string()),
            Ok("PASS: $5 profit expected".to_string()),
            Ok("STRONG BUY: $200 profit expected".to_string()),
            Ok("MAYBE: $30 profit expected".to_string()),
            Err("429 Resource has been exhausted".to_string()),
        ]);
        let source = FixedImages::new(&[("1", 3), ("2", 3), ("3", 3), ("4", 3), ("5", 3)]);
        let items = items(&["1", "2", "3", "4", "5"]);

        let run = run_triage(&items, &settings(2, 2), &source, &provider, false)
            .await
            .unwrap();

        let evaluated = run
            .outcomes
            .iter()
            .filter(|o| o.outcome.evaluation().is_some())
            .count();
        assert_eq!(evaluated, 4);

        let failures: Vec<&FailureRecord> = run
            .outcomes
            .iter()
            .filter_map(|o| o.outcome.failure())
            .collect();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].is_rate_limited());

        assert_eq!(run.digest.usage.total(), 5);
        assert_eq!(run.digest.usage.counts[&0], 3);
        assert_eq!(run.digest.usage.counts[&1], 2);

        let order: Vec<Recommendation> =
            run.digest.entries.iter().map(|e| e.recommendation).collect();
        assert_eq!(
            order,
            vec![
                Recommendation::StrongBuy,
                Recommendation::Buy,
                Recommendation::Maybe,
                Recommendation::Pass
            ]
        );
        assert_eq!(run.digest.summary.rate_limited, 1);
    }

    #[tokio::test]
    async fn test_items_without_images_skip_rotation() {
        let provider = ScriptedProvider::new(vec![]);
        let source = FixedImages::new(&[("1", 2), ("3", 1)]);
        let items = items(&["1", "2", "3"]);

        let run = run_triage(&items, &settings(2, 2), &source, &provider, false)
            .await
            .unwrap();

        assert_eq!(provider.calls().len(), 2);
        assert_eq!(run.digest.usage.total(), 2);
        assert!(matches!(
            run.outcomes[1].outcome,
            DispatchOutcome::Failed(FailureRecord::NoImages { .. })
        ));
        assert_eq!(run.outcomes[1].images_found, 0);
        assert_eq!(run.digest.summary.no_images, 1);
    }

    #[tokio::test]
    async fn test_rotation_order_across_items() {
        let provider = ScriptedProvider::new(vec![]);
        let source = FixedImages::new(&[("1", 1), ("2", 1), ("3", 1)]);

        run_triage(&items(&["1", "2", "3"]), &settings(2, 2), &source, &provider, false)
            .await
            .unwrap();

        let used: Vec<(String, String)> = provider
            .calls()
            .into_iter()
            .map(|c| (c.api_key, c.model))
            .collect();
        assert_eq!(
            used,
            vec![
                ("api-key-0".to_string(), "model-0".to_string()),
                ("api-key-0".to_string(), "model-1".to_string()),
                ("api-key-1".to_string(), "model-0".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_configuration_is_fatal() {
        let provider = ScriptedProvider::new(vec![]);
        let source = FixedImages::new(&[("1", 1)]);

        let result = run_triage(&items(&["1"]), &settings(0, 2), &source, &provider, false).await;

        assert!(matches!(result, Err(TriageError::Configuration(_))));
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_stop_on_rate_limit_skips_rest() {
        let provider = ScriptedProvider::new(vec![
            Ok("BUY".to_string()),
            Err("quota exceeded for this key".to_string()),
        ]);
        let source = FixedImages::new(&[("1", 1), ("2", 1), ("3", 1), ("4", 1)]);
        let mut settings = settings(1, 1);
        settings.stop_on_rate_limit = true;

        let run = run_triage(&items(&["1", "2", "3", "4"]), &settings, &source, &provider, false)
            .await
            .unwrap();

        assert_eq!(provider.calls().len(), 2);
        assert_eq!(run.digest.usage.total(), 2);
        assert_eq!(run.digest.summary.skipped, 2);
        assert_eq!(run.outcomes.len(), 4);
    }

    #[tokio::test]
    async fn test_rate_limit_continues_by_default() {
        let provider = ScriptedProvider::new(vec![Err("HTTP 429".to_string())]);
        let source = FixedImages::new(&[("1", 1), ("2", 1)]);

        let run = run_triage(&items(&["1", "2"]), &settings(1, 1), &source, &provider, false)
            .await
            .unwrap();

        assert_eq!(provider.calls().len(), 2);
        assert_eq!(run.digest.entries.len(), 1);
    }

    #[tokio::test]
    async fn test_image_source_error_aborts() {
        let provider = ScriptedProvider::new(vec![]);

        let result =
            run_triage(&items(&["9"]), &settings(1, 1), &BrokenImages, &provider, false).await;

        match result {
            Err(TriageError::ImageSource { item_id, message }) => {
                assert_eq!(item_id, "9");
                assert!(message.contains("unreachable"));
            }
            other => panic!("unexpected result: {:?}", other.map(|r| r.outcomes.len())),
        }
    }

    #[tokio::test]
    async fn test_usage_carries_across_runs() {
        let provider = ScriptedProvider::new(vec![]);
        let source = FixedImages::new(&[("1", 1)]);
        let settings = settings(2, 1);
        let mut rotator = CredentialRotator::new(
            settings.api_keys.clone(),
            settings.models.clone(),
            settings.per_key_quota_estimate,
        )
        .unwrap();

        for _ in 0..3 {
            triage_with_rotator(&mut rotator, &items(&["1"]), &settings, &source, &provider, false)
                .await
                .unwrap();
        }

        let usage = rotator.usage_report();
        assert_eq!(usage.counts[&0], 2);
        assert_eq!(usage.counts[&1], 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_follows_every_provider_call() {
        let provider = ScriptedProvider::new(vec![
            Err("429 quota exceeded".to_string()),
            Err("connection reset".to_string()),
            Ok("BUY: $60 profit expected".to_string()),
        ]);
        // "4" has no images and must not be paced
        let source = FixedImages::new(&[("1", 1), ("2", 1), ("3", 1)]);
        let mut settings = settings(1, 1);
        settings.inter_request_delay = Duration::from_secs(2);

        let start = tokio::time::Instant::now();
        let run = run_triage(&items(&["1", "2", "3", "4"]), &settings, &source, &provider, false)
            .await
            .unwrap();
        let elapsed = start.elapsed();

        assert_eq!(provider.calls().len(), 3);
        assert_eq!(run.digest.summary.no_images, 1);
        assert!(elapsed >= Duration::from_secs(6), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(8), "elapsed {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_zero_max_images_is_rejected() {
        let provider = ScriptedProvider::new(vec![]);
        let source = FixedImages::new(&[("1", 1)]);
        let mut settings = settings(1, 1);
        settings.max_images_per_item = 0;

        let result = run_triage(&items(&["1"]), &settings, &source, &provider, false).await;

        assert!(matches!(result, Err(TriageError::Configuration(_))));
        assert!(provider.calls().is_empty());
    }

    #[test]
    fn test_short_title() {
        let long = "x".repeat(80);
        assert_eq!(short_title(&long).len(), 55);
        assert_eq!(short_title("Lot"), "Lot");
    }
}
