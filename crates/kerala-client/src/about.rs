//! About section editor

use crate::backend::{AboutUpdate, CardUpdate, ContentBackend};
use crate::error::{ClientError, ClientResult};
use crate::sync::{Confirm, ImageSlot, LoadState, Notice, Outcome, RecordSync};
use kerala_core::{AboutContent, Error, ImageUpload, UploadPolicy};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{info, instrument, warn};

const RECORD: &str = "about";
const LOAD_FAILED: &str = "Failed to load About section.";
const UPDATED: &str = "About section updated successfully!";
const UPDATE_FAILED: &str = "Update failed!";
const CARD_ADDED: &str = "Card added successfully!";
const CARD_ADD_FAILED: &str = "Failed to add card.";
const CARD_DELETED: &str = "Card deleted successfully!";
const CARD_DELETE_FAILED: &str = "Failed to delete card.";

/// Editable copy of the About record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AboutDraft {
    /// Section heading
    pub heading: String,
    /// Body paragraph
    pub paragraph: String,
    /// Background image
    pub background: ImageSlot,
    /// Cards, in display order
    pub cards: Vec<CardDraft>,
}

/// Editable copy of one card
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardDraft {
    /// Card title
    pub title: String,
    /// Card image
    pub image: ImageSlot,
}

impl From<&AboutContent> for AboutDraft {
    fn from(content: &AboutContent) -> Self {
        Self {
            heading: content.heading.clone(),
            paragraph: content.paragraph.clone(),
            background: ImageSlot::from_stored(content.background_image.as_ref()),
            cards: content
                .cards
                .iter()
                .map(|card| CardDraft {
                    title: card.title.clone(),
                    image: ImageSlot::from_stored(card.image.as_ref()),
                })
                .collect(),
        }
    }
}

impl AboutDraft {
    fn to_update(&self) -> AboutUpdate {
        AboutUpdate {
            heading: self.heading.clone(),
            paragraph: self.paragraph.clone(),
            background_image: self.background.pending().cloned(),
            cards: self
                .cards
                .iter()
                .map(|card| CardUpdate {
                    title: card.title.clone(),
                    image: card.image.pending().cloned(),
                })
                .collect(),
        }
    }

    fn card_mut(&mut self, index: usize) -> ClientResult<&mut CardDraft> {
        self.cards
            .get_mut(index)
            .ok_or_else(|| no_card(index).into())
    }
}

fn no_card(index: usize) -> Error {
    Error::validation("cards", format!("no card at index {index}"))
}

#[derive(Debug, Default)]
struct State {
    load: LoadState<AboutContent>,
    draft: Option<AboutDraft>,
    notice: Option<Notice>,
}

/// Loads, edits and saves the About section
#[derive(Debug)]
pub struct AboutEditor<B> {
    backend: Arc<B>,
    policy: UploadPolicy,
    sync: RecordSync,
    state: Mutex<State>,
}

impl<B: ContentBackend> AboutEditor<B> {
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

    /// Base URL for resolving image references
    pub fn base_url(&self) -> &str {
        self.backend.base_url()
    }

    /// Fetch the record and replace the draft with it
    ///
    /// A response that arrives after a newer fetch was issued is dropped.
    ///
    /// # Errors
    ///
    /// Returns the fetch error; the load state then holds a static message.
    #[instrument(skip(self))]
    pub async fn load(&self) -> ClientResult<()> {
        let ticket = self.sync.next_fetch();
        let result = self.backend.fetch_about().await;

        if !self.sync.is_current(ticket) {
            return result.map(|_| ());
        }

        let mut state = self.state.lock();
        match result {
            Ok(content) => {
                state.draft = Some(AboutDraft::from(&content));
                state.load = LoadState::Loaded(content);
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "Error fetching about data");
                state.load = LoadState::Failed(LOAD_FAILED.to_string());
                Err(err)
            }
        }
    }

    /// Result of the last load
    pub fn load_state(&self) -> LoadState<AboutContent> {
        self.state.lock().load.clone()
    }

    /// Current draft, once loaded
    pub fn draft(&self) -> Option<AboutDraft> {
        self.state.lock().draft.clone()
    }

    /// Last notice, left in place
    pub fn notice(&self) -> Option<Notice> {
        self.state.lock().notice.clone()
    }

    /// Last notice, cleared once read
    pub fn take_notice(&self) -> Option<Notice> {
        self.state.lock().notice.take()
    }

    fn edit<R>(&self, f: impl FnOnce(&mut AboutDraft) -> ClientResult<R>) -> ClientResult<R> {
        let mut state = self.state.lock();
        let draft = state
            .draft
            .as_mut()
            .ok_or_else(|| ClientError::not_loaded(RECORD))?;
        f(draft)
    }

    fn record_notice(&self, notice: Notice) {
        self.state.lock().notice = Some(notice);
    }

    /// Set the heading
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotLoaded`] before the first successful load.
    pub fn set_heading(&self, heading: impl Into<String>) -> ClientResult<()> {
        let heading = heading.into();
        self.edit(|draft| {
            draft.heading = heading;
            Ok(())
        })
    }

    /// Set the paragraph
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotLoaded`] before the first successful load.
    pub fn set_paragraph(&self, paragraph: impl Into<String>) -> ClientResult<()> {
        let paragraph = paragraph.into();
        self.edit(|draft| {
            draft.paragraph = paragraph;
            Ok(())
        })
    }

    /// Set the title of the card at `index`
    ///
    /// # Errors
    ///
    /// Returns a validation error for an unknown index.
    pub fn set_card_title(&self, index: usize, title: impl Into<String>) -> ClientResult<()> {
        let title = title.into();
        self.edit(|draft| {
            draft.card_mut(index)?.title = title;
            Ok(())
        })
    }

    /// Select a new background image
    ///
    /// # Errors
    ///
    /// Rejects images outside the upload policy; the draft is left alone.
    pub fn select_background(&self, image: ImageUpload) -> ClientResult<()> {
        self.policy.admit(&image)?;
        self.edit(|draft| {
            draft.background = ImageSlot::Pending(image);
            Ok(())
        })
    }

    /// Select a new image for the card at `index`
    ///
    /// # Errors
    ///
    /// Rejects images outside the upload policy and unknown indexes.
    pub fn select_card_image(&self, index: usize, image: ImageUpload) -> ClientResult<()> {
        self.policy.admit(&image)?;
        self.edit(|draft| {
            draft.card_mut(index)?.image = ImageSlot::Pending(image);
            Ok(())
        })
    }

    /// Push the whole draft with `PUT /api/about`, then re-fetch
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Busy`] while another change is being saved, or
    /// the backend error. A failed save keeps the draft as it was.
    #[instrument(skip(self))]
    pub async fn submit(&self) -> ClientResult<Notice> {
        let _guard = self.sync.begin_mutation()?;
        let update = self.edit(|draft| Ok(draft.to_update()))?;

        info!(cards = update.cards.len(), "Updating About section");
        match self.backend.update_about(&update).await {
            Ok(_) => Ok(self.applied(UPDATED).await),
            Err(err) => Err(self.failed(err, UPDATE_FAILED)),
        }
    }

    /// Append a card with `POST /api/about/card/:index`, then re-fetch
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty title or rejected image,
    /// [`ClientError::Busy`], or the backend error.
    #[instrument(skip(self, image))]
    pub async fn add_card(&self, title: &str, image: ImageUpload) -> ClientResult<Notice> {
        let title = title.trim();
        if title.is_empty() {
            return Err(Error::validation("title", "Card title is required").into());
        }
        self.policy.admit(&image)?;

        let _guard = self.sync.begin_mutation()?;
        let index = self.edit(|draft| Ok(draft.cards.len()))?;
        let card = CardUpdate {
            title: title.to_string(),
            image: Some(image),
        };

        info!(index, "Adding About card");
        match self.backend.put_about_card(index, &card).await {
            Ok(_) => Ok(self.applied(CARD_ADDED).await),
            Err(err) => Err(self.failed(err, CARD_ADD_FAILED)),
        }
    }

    /// Delete the card at `index` after confirmation, then re-fetch
    ///
    /// # Errors
    ///
    /// Returns a validation error for an unknown index, [`ClientError::Busy`],
    /// or the backend error.
    #[instrument(skip(self, confirm))]
    pub async fn delete_card(
        &self,
        index: usize,
        confirm: &(dyn Confirm + Sync),
    ) -> ClientResult<Outcome> {
        let title = self.edit(|draft| Ok(draft.card_mut(index)?.title.clone()))?;

        if !confirm.confirm(&format!("Delete card \"{title}\"?")) {
            info!(index, "Card deletion cancelled");
            return Ok(Outcome::Cancelled);
        }

        let _guard = self.sync.begin_mutation()?;
        info!(index, "Deleting About card");
        match self.backend.delete_about_card(index).await {
            Ok(_) => Ok(Outcome::Applied(self.applied(CARD_DELETED).await)),
            Err(err) => Err(self.failed(err, CARD_DELETE_FAILED)),
        }
    }

    /// Record the success notice and re-fetch once
    async fn applied(&self, message: &str) -> Notice {
        let notice = Notice::success(message);
        self.record_notice(notice.clone());

        if let Err(err) = self.load().await {
            warn!(error = %err, "Saved, but reloading the About section failed");
        }
        notice
    }

    fn failed(&self, err: ClientError, fallback: &str) -> ClientError {
        warn!(error = %err, "Error updating About section");
        self.record_notice(Notice::from_failure(&err, fallback));
        err
    }
}
