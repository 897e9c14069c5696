//! Gallery block editor

use crate::backend::{ContentBackend, GalleryUpdate};
use crate::error::{ClientError, ClientResult};
use crate::sync::{Confirm, ImageSlot, LoadState, Notice, Outcome, RecordSync};
use kerala_core::{BlockId, Error, GalleryBlock, ImageUpload, UploadPolicy};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{info, instrument, warn};

const RECORD: &str = "gallery";
const LOAD_FAILED: &str = "Failed to load gallery.";

/// Editable copy of one gallery block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryDraft {
    /// Block identifier; fixed once loaded
    pub block: BlockId,
    /// Caption
    pub title: String,
    /// Block image
    pub image: ImageSlot,
}

impl From<&GalleryBlock> for GalleryDraft {
    fn from(block: &GalleryBlock) -> Self {
        Self {
            block: block.block.clone(),
            title: block.title.clone(),
            image: ImageSlot::from_stored(block.image.as_ref()),
        }
    }
}

/// What a gallery view shows for one block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryCard {
    /// Block identifier
    pub block: BlockId,
    /// Caption
    pub title: String,
    /// Resolved image URL, or the name of a file not yet saved
    pub image: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    load: LoadState<Vec<GalleryBlock>>,
    /// `None` until the first successful load; kept if a later load fails
    drafts: Option<Vec<GalleryDraft>>,
    notice: Option<Notice>,
}

impl State {
    fn loaded_drafts(&self) -> ClientResult<&[GalleryDraft]> {
        self.drafts
            .as_deref()
            .ok_or_else(|| ClientError::not_loaded(RECORD))
    }

    fn draft_mut(&mut self, block: &BlockId) -> ClientResult<&mut GalleryDraft> {
        self.drafts
            .as_mut()
            .ok_or_else(|| ClientError::not_loaded(RECORD))?
            .iter_mut()
            .find(|d| &d.block == block)
            .ok_or_else(|| {
                Error::NotFound {
                    resource: format!("gallery block {block}"),
                }
                .into()
            })
    }
}

/// Loads and edits the gallery one block at a time
#[derive(Debug)]
pub struct GalleryEditor<B> {
    backend: Arc<B>,
    policy: UploadPolicy,
    sync: RecordSync,
    state: Mutex<State>,
}

impl<B: ContentBackend> GalleryEditor<B> {
    /// Create an editor; nothing is fetched until [`Self::load`]
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

    /// Fetch every block and replace all drafts
    ///
    /// # Errors
    ///
    /// Returns the fetch error; the load state then holds a static message.
    #[instrument(skip(self))]
    pub async fn load(&self) -> ClientResult<()> {
        let ticket = self.sync.next_fetch();
        let result = self.backend.fetch_gallery().await;

        if !self.sync.is_current(ticket) {
            return result.map(|_| ());
        }

        let mut state = self.state.lock();
        match result {
            Ok(blocks) => {
                state.drafts = Some(blocks.iter().map(GalleryDraft::from).collect());
                state.load = LoadState::Loaded(blocks);
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "Fetch error");
                state.load = LoadState::Failed(LOAD_FAILED.to_string());
                Err(err)
            }
        }
    }

    /// Result of the last load
    pub fn load_state(&self) -> LoadState<Vec<GalleryBlock>> {
        self.state.lock().load.clone()
    }

    /// Current drafts, in backend order
    pub fn drafts(&self) -> Vec<GalleryDraft> {
        self.state.lock().drafts.clone().unwrap_or_default()
    }

    /// Draft for one block
    pub fn draft(&self, block: &BlockId) -> Option<GalleryDraft> {
        self.state
            .lock()
            .drafts
            .iter()
            .flatten()
            .find(|d| &d.block == block)
            .cloned()
    }

    /// Blocks as a view renders them, image references resolved
    pub fn cards(&self) -> Vec<GalleryCard> {
        let base_url = self.backend.base_url();
        self.state
            .lock()
            .drafts
            .iter()
            .flatten()
            .map(|draft| GalleryCard {
                block: draft.block.clone(),
                title: draft.title.clone(),
                image: draft.image.preview(base_url),
            })
            .collect()
    }

    /// Last notice, cleared once read
    pub fn take_notice(&self) -> Option<Notice> {
        self.state.lock().notice.take()
    }

    fn record_notice(&self, notice: Notice) {
        self.state.lock().notice = Some(notice);
    }

    /// Set a block's caption
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotLoaded`] or a not-found error for an unknown block.
    pub fn set_title(&self, block: &BlockId, title: impl Into<String>) -> ClientResult<()> {
        self.state.lock().draft_mut(block)?.title = title.into();
        Ok(())
    }

    /// Select a new image for a block
    ///
    /// # Errors
    ///
    /// Rejects images outside the upload policy; the draft is left alone.
    pub fn select_image(&self, block: &BlockId, image: ImageUpload) -> ClientResult<()> {
        self.policy.admit(&image)?;
        self.state.lock().draft_mut(block)?.image = ImageSlot::Pending(image);
        Ok(())
    }

    /// Save one block's draft with `POST /api/gallery`, then re-fetch
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Busy`] while another gallery change is being
    /// saved, or the backend error. A failed save keeps the draft.
    #[instrument(skip(self))]
    pub async fn update(&self, block: &BlockId) -> ClientResult<Notice> {
        let _guard = self.sync.begin_mutation()?;
        let update = {
            let mut state = self.state.lock();
            let draft = state.draft_mut(block)?;
            GalleryUpdate {
                block: draft.block.clone(),
                title: draft.title.clone(),
                image: draft.image.pending().cloned(),
            }
        };

        info!(new_image = update.image.is_some(), "Updating gallery block");
        self.save(&update, format!("{block} updated"), format!("Update failed for {block}"))
            .await
    }

    /// Create a block that is not in the gallery yet
    ///
    /// # Errors
    ///
    /// Returns a validation error if the block already exists or the image is
    /// rejected, [`ClientError::Busy`], or the backend error.
    #[instrument(skip(self, image))]
    pub async fn add_block(
        &self,
        block: BlockId,
        title: &str,
        image: Option<ImageUpload>,
    ) -> ClientResult<Notice> {
        if let Some(ref image) = image {
            self.policy.admit(image)?;
        }

        let _guard = self.sync.begin_mutation()?;
        {
            let state = self.state.lock();
            if state.loaded_drafts()?.iter().any(|d| d.block == block) {
                return Err(Error::validation("block", format!("{block} already exists")).into());
            }
        }

        let update = GalleryUpdate {
            block,
            title: title.to_string(),
            image,
        };
        info!("Adding gallery block");
        let block = &update.block;
        self.save(&update, format!("{block} added"), format!("Failed to add {block}"))
            .await
    }

    /// Delete a block after confirmation, then re-fetch
    ///
    /// # Errors
    ///
    /// Returns a not-found error for an unknown block, [`ClientError::Busy`],
    /// or the backend error.
    #[instrument(skip(self, confirm))]
    pub async fn delete(
        &self,
        block: &BlockId,
        confirm: &(dyn Confirm + Sync),
    ) -> ClientResult<Outcome> {
        self.state.lock().draft_mut(block)?;

        if !confirm.confirm(&format!("Delete {block}?")) {
            info!("Gallery deletion cancelled");
            return Ok(Outcome::Cancelled);
        }

        let _guard = self.sync.begin_mutation()?;
        info!("Deleting gallery block");
        match self.backend.delete_gallery_block(block).await {
            Ok(_) => Ok(Outcome::Applied(self.applied(format!("{block} deleted")).await)),
            Err(err) => Err(self.failed(err, &format!("Failed to delete {block}"))),
        }
    }

    async fn save(
        &self,
        update: &GalleryUpdate,
        success: String,
        fallback: String,
    ) -> ClientResult<Notice> {
        match self.backend.upsert_gallery_block(update).await {
            Ok(_) => Ok(self.applied(success).await),
            Err(err) => Err(self.failed(err, &fallback)),
        }
    }

    async fn applied(&self, message: String) -> Notice {
        let notice = Notice::success(message);
        self.record_notice(notice.clone());

        if let Err(err) = self.load().await {
            warn!(error = %err, "Saved, but reloading the gallery failed");
        }
        notice
    }

    fn failed(&self, err: ClientError, fallback: &str) -> ClientError {
        warn!(error = %err, "Gallery update failed");
        self.record_notice(Notice::from_failure(&err, fallback));
        err
    }
}
