//! The backend REST surface the editors depend on

use crate::error::ClientResult;
use async_trait::async_trait;
use kerala_core::{
    AboutContent, BannerSlide, BannerSlot, BlockId, Booking, GalleryBlock, ImageUpload,
    TourPackage,
};
use serde::Deserialize;

/// Whole-record update for `PUT /api/about`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AboutUpdate {
    /// Section heading
    pub heading: String,
    /// Body paragraph
    pub paragraph: String,
    /// Replacement background image
    pub background_image: Option<ImageUpload>,
    /// Every card, in order; cards without a new image keep their stored one
    pub cards: Vec<CardUpdate>,
}

/// One card in an about update, or the body of `POST /api/about/card/:index`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardUpdate {
    /// Card title
    pub title: String,
    /// Replacement image
    pub image: Option<ImageUpload>,
}

/// A banner slide ready to upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BannerSlideUpload {
    /// Carousel position
    pub slot: BannerSlot,
    /// Heading and subheading
    pub slide: BannerSlide,
    /// Slide image
    pub image: ImageUpload,
}

/// Body of `POST /api/banner`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BannerUpload {
    /// Filled slots, in slot order
    pub slides: Vec<BannerSlideUpload>,
}

/// Body of `POST /api/gallery`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryUpdate {
    /// Target block
    pub block: BlockId,
    /// Caption
    pub title: String,
    /// Replacement image
    pub image: Option<ImageUpload>,
}

/// Success body of a mutating call
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ServerReply {
    /// Optional confirmation text from the backend
    #[serde(default)]
    pub message: Option<String>,
}

impl ServerReply {
    /// The backend's message, or `fallback` when it sent none
    #[must_use]
    pub fn message_or(&self, fallback: &str) -> String {
        self.message
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(fallback)
            .to_string()
    }
}

/// Backend operations used by the content editors
///
/// [`crate::ApiClient`] talks to the real REST API; [`crate::MockBackend`]
/// keeps everything in memory for tests.
#[async_trait]
pub trait ContentBackend: Send + Sync {
    /// Base URL that image references resolve against
    fn base_url(&self) -> &str;

    /// `GET /api/about`
    async fn fetch_about(&self) -> ClientResult<AboutContent>;

    /// `PUT /api/about`
    async fn update_about(&self, update: &AboutUpdate) -> ClientResult<ServerReply>;

    /// `POST /api/about/card/:index`
    async fn put_about_card(&self, index: usize, card: &CardUpdate) -> ClientResult<ServerReply>;

    /// `DELETE /api/about/card/:index`
    async fn delete_about_card(&self, index: usize) -> ClientResult<ServerReply>;

    /// `POST /api/banner`
    async fn upload_banner(&self, upload: &BannerUpload) -> ClientResult<ServerReply>;

    /// `GET /api/gallery`
    async fn fetch_gallery(&self) -> ClientResult<Vec<GalleryBlock>>;

    /// `POST /api/gallery`
    async fn upsert_gallery_block(&self, update: &GalleryUpdate) -> ClientResult<ServerReply>;

    /// `DELETE /api/gallery/:block`
    async fn delete_gallery_block(&self, block: &BlockId) -> ClientResult<ServerReply>;

    /// `GET /api/tours`
    async fn fetch_tours(&self) -> ClientResult<Vec<TourPackage>>;

    /// `POST /api/bookings`
    async fn create_booking(&self, booking: &Booking) -> ClientResult<ServerReply>;
}
