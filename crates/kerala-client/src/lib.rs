//! Backend client and content editors for the Kerala Travel admin
//!
//! Every editor follows the same loop: load the full record, edit a local
//! draft, submit through the record's canonical endpoint, then re-fetch and
//! replace the draft with what the backend stored. Editors are generic over
//! [`ContentBackend`], with [`ApiClient`] for the real REST API and
//! [`MockBackend`] for tests.

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    missing_docs
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::multiple_crate_versions,
    clippy::missing_errors_doc,
    clippy::significant_drop_tightening,
    clippy::cast_possible_truncation,
    clippy::return_self_not_must_use,
    clippy::needless_pass_by_value,
    clippy::missing_const_for_fn
)]

pub mod about;
pub mod backend;
pub mod banner;
pub mod error;
pub mod gallery;
pub mod http;
pub mod mock;
pub mod sync;
pub mod tours;

pub use about::{AboutDraft, AboutEditor, CardDraft};
pub use backend::{
    AboutUpdate, BannerSlideUpload, BannerUpload, CardUpdate, ContentBackend, GalleryUpdate,
    ServerReply,
};
pub use banner::{BannerEditor, SlideDraft};
pub use error::{ClientError, ClientResult};
pub use gallery::{GalleryCard, GalleryDraft, GalleryEditor};
pub use http::ApiClient;
pub use mock::{Call, MockBackend};
pub use sync::{
    Confirm, FetchTicket, ImageSlot, LoadState, MutationGuard, Notice, NoticeLevel, Outcome,
    RecordSync,
};
pub use tours::{BookingFlow, BookingForm, BookingState, TourCard, ToursView};
