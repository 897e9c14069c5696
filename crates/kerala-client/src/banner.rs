//! Banner carousel upload form

use crate::backend::{BannerSlideUpload, BannerUpload, ContentBackend};
use crate::error::ClientResult;
use crate::sync::{Notice, RecordSync};
use kerala_core::{BannerSlide, BannerSlot, Error, ImageUpload, UploadPolicy};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

const RECORD: &str = "banner";
const UPLOADED: &str = "Banner uploaded successfully!";
const UPLOAD_FAILED: &str = "Upload failed";

/// Form fields for one carousel slot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlideDraft {
    /// Slide heading
    pub heading: String,
    /// Slide subheading
    pub subheading: String,
    /// Selected image
    pub image: Option<ImageUpload>,
}

impl SlideDraft {
    fn is_blank(&self) -> bool {
        self.heading.trim().is_empty() && self.subheading.trim().is_empty() && self.image.is_none()
    }
}

#[derive(Debug, Default)]
struct State {
    slots: BTreeMap<BannerSlot, SlideDraft>,
    notice: Option<Notice>,
}

/// Write-only banner form
///
/// The backend has no read endpoint for banners, so there is nothing to load
/// and nothing to re-fetch. A successful upload resets the form.
#[derive(Debug)]
pub struct BannerEditor<B> {
    backend: Arc<B>,
    policy: UploadPolicy,
    sync: RecordSync,
    state: Mutex<State>,
}

impl<B: ContentBackend> BannerEditor<B> {
    /// Empty form using the banner upload policy
    pub fn new(backend: Arc<B>, policy: UploadPolicy) -> Self {
        Self {
            backend,
            policy,
            sync: RecordSync::new(RECORD),
            state: Mutex::new(State::default()),
        }
    }

    /// Upload policy applied to selected images
    pub const fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    /// Current form contents, by slot
    pub fn slots(&self) -> BTreeMap<BannerSlot, SlideDraft> {
        self.state.lock().slots.clone()
    }

    /// Last notice, cleared once read
    pub fn take_notice(&self) -> Option<Notice> {
        self.state.lock().notice.take()
    }

    fn record_notice(&self, notice: Notice) {
        self.state.lock().notice = Some(notice);
    }

    /// Set the heading of a slot
    pub fn set_heading(&self, slot: BannerSlot, heading: impl Into<String>) {
        self.state.lock().slots.entry(slot).or_default().heading = heading.into();
    }

    /// Set the subheading of a slot
    pub fn set_subheading(&self, slot: BannerSlot, subheading: impl Into<String>) {
        self.state.lock().slots.entry(slot).or_default().subheading = subheading.into();
    }

    /// Select the image for a slot
    ///
    /// # Errors
    ///
    /// Rejects images outside the banner upload policy. The rejection is also
    /// recorded as a notice and the slot keeps its previous image.
    pub fn select_image(&self, slot: BannerSlot, image: ImageUpload) -> ClientResult<()> {
        if let Err(err) = self.policy.admit(&image) {
            self.record_notice(Notice::error(err.to_string()));
            return Err(err.into());
        }
        self.state.lock().slots.entry(slot).or_default().image = Some(image);
        Ok(())
    }

    /// Empty one slot
    pub fn clear_slot(&self, slot: BannerSlot) {
        self.state.lock().slots.remove(&slot);
    }

    /// Filled slots as an upload, or the first missing field
    fn build_upload(&self) -> Result<BannerUpload, Error> {
        let state = self.state.lock();
        let mut slides = Vec::new();

        for (&slot, draft) in state.slots.iter().filter(|(_, d)| !d.is_blank()) {
            let heading = draft.heading.trim();
            if heading.is_empty() {
                return Err(Error::validation(slot.heading_field(), "Heading is required"));
            }
            let subheading = draft.subheading.trim();
            if subheading.is_empty() {
                return Err(Error::validation(slot.subheading_field(), "Subheading is required"));
            }
            let image = draft
                .image
                .clone()
                .ok_or_else(|| Error::validation(slot.image_field(), "Image is required"))?;

            slides.push(BannerSlideUpload {
                slot,
                slide: BannerSlide {
                    heading: heading.to_string(),
                    subheading: subheading.to_string(),
                },
                image,
            });
        }

        if slides.is_empty() {
            return Err(Error::validation("slides", "Fill in at least one slide"));
        }
        Ok(BannerUpload { slides })
    }

    /// Upload every filled slot with `POST /api/banner`
    ///
    /// # Errors
    ///
    /// Returns a validation error for an incomplete slot, [`crate::ClientError::Busy`]
    /// while an upload is in flight, or the backend error. A failed upload
    /// keeps the form.
    #[instrument(skip(self))]
    pub async fn submit(&self) -> ClientResult<Notice> {
        let upload = match self.build_upload() {
            Ok(upload) => upload,
            Err(err) => {
                self.record_notice(Notice::error(err.to_string()));
                return Err(err.into());
            }
        };

        let _guard = self.sync.begin_mutation()?;
        info!(slides = upload.slides.len(), "Uploading banner");
        match self.backend.upload_banner(&upload).await {
            Ok(reply) => {
                let notice = Notice::success(reply.message_or(UPLOADED));
                let mut state = self.state.lock();
                state.slots.clear();
                state.notice = Some(notice.clone());
                Ok(notice)
            }
            Err(err) => {
                warn!(error = %err, "Banner upload failed");
                self.record_notice(Notice::from_failure(&err, UPLOAD_FAILED));
                Err(err)
            }
        }
    }
}
