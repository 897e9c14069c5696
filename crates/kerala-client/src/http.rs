//! HTTP client for the travel-agency backend

use crate::backend::{
    AboutUpdate, BannerUpload, CardUpdate, ContentBackend, GalleryUpdate, ServerReply,
};
use crate::error::{ClientError, ClientResult};
use async_trait::async_trait;
use kerala_core::{
    AboutContent, BlockId, Booking, GalleryBlock, ImageUpload, TourPackage, config::ApiConfig,
};
use reqwest::{
    Client, Method, RequestBuilder, Response,
    multipart::{Form, Part},
};
use serde::{Deserialize, de::DeserializeOwned};
use std::time::Duration;
use tracing::{debug, instrument};

/// Error body shapes the backend uses
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// API client for the backend REST endpoints
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl ApiClient {
    /// Create a new API client with default settings
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> ClientResult<Self> {
        Self::build(base_url.into(), Duration::from_secs(30), None)
    }

    /// Create a client from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn from_config(config: &ApiConfig) -> ClientResult<Self> {
        Self::build(
            config.base_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
            config.api_key.clone(),
        )
    }

    fn build(base_url: String, timeout: Duration, api_key: Option<String>) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("kerala-admin/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Set the API key for authentication
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{path}", self.base_url);
        let mut request = self.client.request(method, url);

        if let Some(ref api_key) = self.api_key {
            request = request.header("X-API-Key", api_key);
        }

        request
    }

    /// Send and turn non-success statuses into [`ClientError::Api`]
    async fn send(request: RequestBuilder) -> ClientResult<Response> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let parsed: ErrorBody = serde_json::from_str(&body).unwrap_or_default();
        let message = parsed
            .error
            .or(parsed.message)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_default();

        Err(ClientError::api(status.as_u16(), message))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let response = Self::send(self.request(Method::GET, path)).await?;
        Ok(response.json().await?)
    }

    async fn reply(response: Response) -> ClientResult<ServerReply> {
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(ServerReply::default());
        }
        Ok(serde_json::from_str(&body).unwrap_or_default())
    }

    async fn send_form(&self, method: Method, path: &str, form: Form) -> ClientResult<ServerReply> {
        let response = Self::send(self.request(method, path).multipart(form)).await?;
        Self::reply(response).await
    }
}

/// Multipart part for a validated upload
fn image_part(upload: &ImageUpload) -> ClientResult<Part> {
    Ok(Part::bytes(upload.data().to_vec())
        .file_name(upload.file_name().to_string())
        .mime_str(upload.image_type().mime())?)
}

/// Multipart body for `PUT /api/about`
///
/// # Errors
///
/// Returns an error if a part cannot be constructed.
pub fn about_form(update: &AboutUpdate) -> ClientResult<Form> {
    let mut form = Form::new()
        .text("heading", update.heading.clone())
        .text("paragraph", update.paragraph.clone());

    if let Some(ref image) = update.background_image {
        form = form.part("backgroundImage", image_part(image)?);
    }

    for (index, card) in update.cards.iter().enumerate() {
        form = form.text(format!("cards[{index}][title]"), card.title.clone());
        if let Some(ref image) = card.image {
            form = form.part(format!("cards[{index}][image]"), image_part(image)?);
        }
    }

    Ok(form)
}

/// Multipart body for `POST /api/about/card/:index`
///
/// # Errors
///
/// Returns an error if a part cannot be constructed.
pub fn card_form(card: &CardUpdate) -> ClientResult<Form> {
    let mut form = Form::new().text("title", card.title.clone());
    if let Some(ref image) = card.image {
        form = form.part("image", image_part(image)?);
    }
    Ok(form)
}

/// Multipart body for `POST /api/banner`
///
/// # Errors
///
/// Returns an error if a part cannot be constructed.
pub fn banner_form(upload: &BannerUpload) -> ClientResult<Form> {
    let mut form = Form::new();
    for slide in &upload.slides {
        form = form
            .text(slide.slot.heading_field(), slide.slide.heading.clone())
            .text(slide.slot.subheading_field(), slide.slide.subheading.clone())
            .part(slide.slot.image_field(), image_part(&slide.image)?);
    }
    Ok(form)
}

/// Multipart body for `POST /api/gallery`
///
/// # Errors
///
/// Returns an error if a part cannot be constructed.
pub fn gallery_form(update: &GalleryUpdate) -> ClientResult<Form> {
    let mut form = Form::new()
        .text("block", update.block.to_string())
        .text("title", update.title.clone());
    if let Some(ref image) = update.image {
        form = form.part("image", image_part(image)?);
    }
    Ok(form)
}

#[async_trait]
impl ContentBackend for ApiClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    #[instrument(skip(self))]
    async fn fetch_about(&self) -> ClientResult<AboutContent> {
        self.get_json("/api/about").await
    }

    #[instrument(skip_all, fields(cards = update.cards.len()))]
    async fn update_about(&self, update: &AboutUpdate) -> ClientResult<ServerReply> {
        self.send_form(Method::PUT, "/api/about", about_form(update)?)
            .await
    }

    #[instrument(skip(self, card))]
    async fn put_about_card(&self, index: usize, card: &CardUpdate) -> ClientResult<ServerReply> {
        self.send_form(
            Method::POST,
            &format!("/api/about/card/{index}"),
            card_form(card)?,
        )
        .await
    }

    #[instrument(skip(self))]
    async fn delete_about_card(&self, index: usize) -> ClientResult<ServerReply> {
        let response =
            Self::send(self.request(Method::DELETE, &format!("/api/about/card/{index}"))).await?;
        Self::reply(response).await
    }

    #[instrument(skip_all, fields(slides = upload.slides.len()))]
    async fn upload_banner(&self, upload: &BannerUpload) -> ClientResult<ServerReply> {
        self.send_form(Method::POST, "/api/banner", banner_form(upload)?)
            .await
    }

    #[instrument(skip(self))]
    async fn fetch_gallery(&self) -> ClientResult<Vec<GalleryBlock>> {
        self.get_json("/api/gallery").await
    }

    #[instrument(skip_all, fields(block = %update.block))]
    async fn upsert_gallery_block(&self, update: &GalleryUpdate) -> ClientResult<ServerReply> {
        self.send_form(Method::POST, "/api/gallery", gallery_form(update)?)
            .await
    }

    #[instrument(skip(self))]
    async fn delete_gallery_block(&self, block: &BlockId) -> ClientResult<ServerReply> {
        let response =
            Self::send(self.request(Method::DELETE, &format!("/api/gallery/{block}"))).await?;
        Self::reply(response).await
    }

    #[instrument(skip(self))]
    async fn fetch_tours(&self) -> ClientResult<Vec<TourPackage>> {
        self.get_json("/api/tours").await
    }

    #[instrument(skip_all, fields(package = %booking.package))]
    async fn create_booking(&self, booking: &Booking) -> ClientResult<ServerReply> {
        debug!("Posting booking");
        let response = Self::send(self.request(Method::POST, "/api/bookings").json(booking)).await?;
        Self::reply(response).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ApiClient::new("http://localhost:5000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:5000");
    }

    #[test]
    fn test_from_config_keeps_api_key() {
        let config = ApiConfig {
            base_url: "https://api.example".to_string(),
            request_timeout_secs: 5,
            api_key: Some("k".to_string()),
        };

        let client = ApiClient::from_config(&config).unwrap();
        assert_eq!(client.api_key.as_deref(), Some("k"));
        assert_eq!(client.base_url(), "https://api.example");
    }

    #[test]
    fn test_forms_build_without_images() {
        let update = AboutUpdate {
            heading: "h".to_string(),
            paragraph: "p".to_string(),
            background_image: None,
            cards: vec![CardUpdate {
                title: "t".to_string(),
                image: None,
            }],
        };

        assert!(about_form(&update).is_ok());
        assert!(card_form(&update.cards[0]).is_ok());
        assert!(banner_form(&BannerUpload::default()).is_ok());
    }
}
