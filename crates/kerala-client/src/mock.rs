//! In-memory backend for tests

use crate::backend::{
    AboutUpdate, BannerUpload, CardUpdate, ContentBackend, GalleryUpdate, ServerReply,
};
use crate::error::{ClientError, ClientResult};
use async_trait::async_trait;
use kerala_core::{
    AboutCard, AboutContent, BlockId, Booking, GalleryBlock, ImageRef, ImageUpload, TourPackage,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::time::{Duration, sleep};

/// A backend call, as recorded by [`MockBackend`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// `GET /api/about`
    FetchAbout,
    /// `PUT /api/about`
    UpdateAbout,
    /// `POST /api/about/card/:index`
    PutAboutCard(usize),
    /// `DELETE /api/about/card/:index`
    DeleteAboutCard(usize),
    /// `POST /api/banner`
    UploadBanner,
    /// `GET /api/gallery`
    FetchGallery,
    /// `POST /api/gallery`
    UpsertGallery(BlockId),
    /// `DELETE /api/gallery/:block`
    DeleteGallery(BlockId),
    /// `GET /api/tours`
    FetchTours,
    /// `POST /api/bookings`
    CreateBooking,
}

/// Records held by the mock
#[derive(Debug, Default)]
struct Store {
    about: AboutContent,
    gallery: Vec<GalleryBlock>,
    tours: Vec<TourPackage>,
    bookings: Vec<Booking>,
    banners: Vec<BannerUpload>,
}

#[derive(Debug)]
struct Failure {
    only: Option<Call>,
    status: u16,
    message: String,
}

#[derive(Debug, Default)]
struct Script {
    calls: Vec<Call>,
    failures: Vec<Failure>,
    delays: VecDeque<Duration>,
}

/// Mock content backend
///
/// Text is trimmed on write and uploaded files are stored as
/// `/uploads/<file name>`, so a re-fetch returns what a real backend would.
#[derive(Debug)]
pub struct MockBackend {
    base_url: String,
    store: Mutex<Store>,
    script: Mutex<Script>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Empty backend at `http://localhost:5000`
    #[must_use]
    pub fn new() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            store: Mutex::new(Store::default()),
            script: Mutex::new(Script::default()),
        }
    }

    /// Set the base URL image references resolve against
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Seed the About record
    #[must_use]
    pub fn with_about(self, about: AboutContent) -> Self {
        self.set_about(about);
        self
    }

    /// Seed the gallery
    #[must_use]
    pub fn with_gallery(self, gallery: Vec<GalleryBlock>) -> Self {
        self.store.lock().gallery = gallery;
        self
    }

    /// Seed the tour packages
    #[must_use]
    pub fn with_tours(self, tours: Vec<TourPackage>) -> Self {
        self.store.lock().tours = tours;
        self
    }

    /// Replace the About record, as another admin would
    pub fn set_about(&self, about: AboutContent) {
        self.store.lock().about = about;
    }

    /// Make the next call fail with the given status and message
    pub fn fail_next(&self, status: u16, message: impl Into<String>) {
        self.script.lock().failures.push(Failure {
            only: None,
            status,
            message: message.into(),
        });
    }

    /// Make the next call of one kind fail, letting other calls through
    pub fn fail_on(&self, call: Call, status: u16, message: impl Into<String>) {
        self.script.lock().failures.push(Failure {
            only: Some(call),
            status,
            message: message.into(),
        });
    }

    /// Hold the response of the next call for `delay`
    pub fn delay_next(&self, delay: Duration) {
        self.script.lock().delays.push_back(delay);
    }

    /// Every call made so far, in order
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.script.lock().calls.clone()
    }

    /// How many times `call` was made
    #[must_use]
    pub fn call_count(&self, call: &Call) -> usize {
        self.script.lock().calls.iter().filter(|c| *c == call).count()
    }

    /// Forget the recorded calls
    pub fn clear_calls(&self) {
        self.script.lock().calls.clear();
    }

    /// Current About record
    #[must_use]
    pub fn about(&self) -> AboutContent {
        self.store.lock().about.clone()
    }

    /// Current gallery
    #[must_use]
    pub fn gallery(&self) -> Vec<GalleryBlock> {
        self.store.lock().gallery.clone()
    }

    /// Bookings received
    #[must_use]
    pub fn bookings(&self) -> Vec<Booking> {
        self.store.lock().bookings.clone()
    }

    /// Banner uploads received
    #[must_use]
    pub fn banners(&self) -> Vec<BannerUpload> {
        self.store.lock().banners.clone()
    }

    /// Record the call, run `apply` unless a failure is queued, then wait out
    /// any queued delay
    async fn respond<T, F>(&self, call: Call, apply: F) -> ClientResult<T>
    where
        T: Send,
        F: FnOnce(&mut Store) -> ClientResult<T> + Send,
    {
        let (failure, delay) = {
            let mut script = self.script.lock();
            let failure = script
                .failures
                .iter()
                .position(|f| f.only.as_ref().is_none_or(|only| *only == call))
                .map(|index| script.failures.remove(index));
            script.calls.push(call);
            (failure, script.delays.pop_front())
        };

        let result = match failure {
            Some(failure) => Err(ClientError::api(failure.status, failure.message)),
            None => apply(&mut self.store.lock()),
        };

        if let Some(delay) = delay {
            sleep(delay).await;
        }

        result
    }
}

fn stored(upload: &ImageUpload) -> ImageRef {
    ImageRef::new(format!("/uploads/{}", upload.file_name()))
}

fn ok() -> ClientResult<ServerReply> {
    Ok(ServerReply::default())
}

#[async_trait]
impl ContentBackend for MockBackend {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch_about(&self) -> ClientResult<AboutContent> {
        self.respond(Call::FetchAbout, |store| Ok(store.about.clone()))
            .await
    }

    async fn update_about(&self, update: &AboutUpdate) -> ClientResult<ServerReply> {
        self.respond(Call::UpdateAbout, |store| {
            let about = &mut store.about;
            about.heading = update.heading.trim().to_string();
            about.paragraph = update.paragraph.trim().to_string();
            if let Some(ref image) = update.background_image {
                about.background_image = Some(stored(image));
            }

            let previous = std::mem::take(&mut about.cards);
            about.cards = update
                .cards
                .iter()
                .enumerate()
                .map(|(index, card)| AboutCard {
                    title: card.title.trim().to_string(),
                    image: card
                        .image
                        .as_ref()
                        .map(stored)
                        .or_else(|| previous.get(index).and_then(|c| c.image.clone())),
                })
                .collect();
            ok()
        })
        .await
    }

    async fn put_about_card(&self, index: usize, card: &CardUpdate) -> ClientResult<ServerReply> {
        self.respond(Call::PutAboutCard(index), |store| {
            let cards = &mut store.about.cards;
            let title = card.title.trim().to_string();
            let image = card.image.as_ref().map(stored);

            if let Some(existing) = cards.get_mut(index) {
                existing.title = title;
                if image.is_some() {
                    existing.image = image;
                }
            } else if index == cards.len() {
                cards.push(AboutCard { title, image });
            } else {
                return Err(ClientError::api(400, "Invalid card index"));
            }
            ok()
        })
        .await
    }

    async fn delete_about_card(&self, index: usize) -> ClientResult<ServerReply> {
        self.respond(Call::DeleteAboutCard(index), |store| {
            let cards = &mut store.about.cards;
            if index >= cards.len() {
                return Err(ClientError::api(404, "Card not found"));
            }
            cards.remove(index);
            ok()
        })
        .await
    }

    async fn upload_banner(&self, upload: &BannerUpload) -> ClientResult<ServerReply> {
        self.respond(Call::UploadBanner, |store| {
            store.banners.push(upload.clone());
            ok()
        })
        .await
    }

    async fn fetch_gallery(&self) -> ClientResult<Vec<GalleryBlock>> {
        self.respond(Call::FetchGallery, |store| Ok(store.gallery.clone()))
            .await
    }

    async fn upsert_gallery_block(&self, update: &GalleryUpdate) -> ClientResult<ServerReply> {
        self.respond(Call::UpsertGallery(update.block.clone()), |store| {
            let title = update.title.trim().to_string();
            let image = update.image.as_ref().map(stored);

            match store.gallery.iter_mut().find(|b| b.block == update.block) {
                Some(existing) => {
                    existing.title = title;
                    if image.is_some() {
                        existing.image = image;
                    }
                }
                None => store.gallery.push(GalleryBlock {
                    block: update.block.clone(),
                    title,
                    image,
                }),
            }
            ok()
        })
        .await
    }

    async fn delete_gallery_block(&self, block: &BlockId) -> ClientResult<ServerReply> {
        self.respond(Call::DeleteGallery(block.clone()), |store| {
            let before = store.gallery.len();
            store.gallery.retain(|b| &b.block != block);
            if store.gallery.len() == before {
                return Err(ClientError::api(404, "Block not found"));
            }
            ok()
        })
        .await
    }

    async fn fetch_tours(&self) -> ClientResult<Vec<TourPackage>> {
        self.respond(Call::FetchTours, |store| Ok(store.tours.clone()))
            .await
    }

    async fn create_booking(&self, booking: &Booking) -> ClientResult<ServerReply> {
        self.respond(Call::CreateBooking, |store| {
            store.bookings.push(booking.clone());
            ok()
        })
        .await
    }
}
