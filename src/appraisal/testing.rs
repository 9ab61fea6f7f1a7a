//! Scripted provider and fixtures for dispatch tests.

use crate::appraisal::client::{AppraisalRequest, VisionProvider};
use crate::models::{ImageHandle, ListingItem};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// What the provider was asked to do.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub api_key: String,
    pub model: String,
    pub prompt: String,
    pub image_count: usize,
}

/// Replays canned replies in order; answers "MAYBE" once they run out.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String, String>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Result<String, String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl VisionProvider for ScriptedProvider {
    async fn appraise(&self, request: AppraisalRequest<'_>) -> Result<String> {
        self.calls.lock().unwrap().push(RecordedCall {
            api_key: request.api_key.to_string(),
            model: request.model.to_string(),
            prompt: request.prompt.to_string(),
            image_count: request.images.len(),
        });

        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Ok("MAYBE: $25 profit expected".to_string()),
        }
    }
}

pub fn item(id: &str) -> ListingItem {
    ListingItem {
        item_id: id.to_string(),
        title: format!("Lot {}", id),
        price: 25.0,
        item_url: format!("https://example.com/item/{}", id),
    }
}

pub fn images(count: usize) -> Vec<ImageHandle> {
    (1..=count)
        .map(|i| ImageHandle {
            name: format!("image_{}.jpg", i),
            mime_type: "image/jpeg".to_string(),
            data: vec![0xFF, 0xD8, i as u8],
        })
        .collect()
}
