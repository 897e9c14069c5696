//! Content records exchanged with the travel-agency backend

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Opaque reference to an image stored by the backend
///
/// The backend hands out relative paths such as `/uploads/1.jpg`; they only
/// become fetchable once joined onto the configured base URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    /// Wrap a backend path
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// The raw reference as returned by the backend
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the reference is already an absolute URL
    #[must_use]
    pub fn is_absolute(&self) -> bool {
        self.0.starts_with("http://") || self.0.starts_with("https://")
    }

    /// Resolve against `base_url` by concatenation
    #[must_use]
    pub fn resolve(&self, base_url: &str) -> String {
        if self.is_absolute() {
            return self.0.clone();
        }

        let base = base_url.trim_end_matches('/');
        if self.0.starts_with('/') {
            format!("{base}{}", self.0)
        } else {
            format!("{base}/{}", self.0)
        }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Empty strings and nulls both mean "no image"
fn deserialize_image_ref<'de, D>(deserializer: D) -> Result<Option<ImageRef>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.is_empty()).map(ImageRef))
}

/// Null-tolerant string field
fn deserialize_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// The "About" section of the site
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AboutContent {
    /// Section heading
    #[serde(default, deserialize_with = "deserialize_text")]
    pub heading: String,

    /// Body paragraph
    #[serde(default, deserialize_with = "deserialize_text")]
    pub paragraph: String,

    /// Background image
    #[serde(default, deserialize_with = "deserialize_image_ref")]
    pub background_image: Option<ImageRef>,

    /// Feature cards, in display order
    #[serde(default, deserialize_with = "deserialize_cards")]
    pub cards: Vec<AboutCard>,
}

/// A single card under the About section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AboutCard {
    /// Card title
    #[serde(default, deserialize_with = "deserialize_text")]
    pub title: String,

    /// Card image
    #[serde(default, deserialize_with = "deserialize_image_ref")]
    pub image: Option<ImageRef>,
}

/// Null card slots are dropped, keeping the remaining order
fn deserialize_cards<'de, D>(deserializer: D) -> Result<Vec<AboutCard>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<Option<AboutCard>>>::deserialize(deserializer)?;
    Ok(raw.unwrap_or_default().into_iter().flatten().collect())
}

/// Banner slot number, 1 through 3
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BannerSlot(u8);

impl BannerSlot {
    /// Number of slots on the banner carousel
    pub const COUNT: u8 = 3;

    /// Validate a slot number
    ///
    /// # Errors
    ///
    /// Returns a validation error when `n` is outside `1..=3`.
    pub fn new(n: u8) -> crate::Result<Self> {
        if (1..=Self::COUNT).contains(&n) {
            Ok(Self(n))
        } else {
            Err(crate::Error::validation(
                "slot",
                format!("banner slot must be between 1 and {}, got {n}", Self::COUNT),
            ))
        }
    }

    /// All slots in order
    pub fn all() -> impl Iterator<Item = Self> {
        (1..=Self::COUNT).map(Self)
    }

    /// Slot number
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Multipart field holding the image (`img1`)
    #[must_use]
    pub fn image_field(self) -> String {
        format!("img{}", self.0)
    }

    /// Multipart field holding the heading (`img1Heading`)
    #[must_use]
    pub fn heading_field(self) -> String {
        format!("img{}Heading", self.0)
    }

    /// Multipart field holding the subheading (`img1Subheading`)
    #[must_use]
    pub fn subheading_field(self) -> String {
        format!("img{}Subheading", self.0)
    }
}

impl fmt::Display for BannerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Text of one banner slide; the image travels separately as an upload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BannerSlide {
    /// Large heading
    pub heading: String,
    /// Smaller line under the heading
    pub subheading: String,
}

/// Identifier of a gallery slot, e.g. `img1`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    /// Validate a block identifier
    ///
    /// # Errors
    ///
    /// Returns a validation error for empty identifiers or characters that
    /// cannot appear in a URL path segment.
    pub fn new(id: impl Into<String>) -> crate::Result<Self> {
        let id = id.into();
        if id.is_empty() || id.len() > 64 {
            return Err(crate::Error::validation(
                "block",
                "block id must be 1 to 64 characters",
            ));
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(crate::Error::validation(
                "block",
                format!("block id '{id}' may only contain letters, digits, '-' and '_'"),
            ));
        }
        Ok(Self(id))
    }

    /// The identifier
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for BlockId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for BlockId {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        Self::new(s)
    }
}

/// One slot of the gallery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryBlock {
    /// Slot identifier
    pub block: BlockId,

    /// Caption
    #[serde(default, deserialize_with = "deserialize_text")]
    pub title: String,

    /// Stored image
    #[serde(default, deserialize_with = "deserialize_image_ref")]
    pub image: Option<ImageRef>,
}

/// A tour package offered on the site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TourPackage {
    /// Backend key, when supplied
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// Package title
    pub title: String,

    /// Marketing description
    #[serde(default, deserialize_with = "deserialize_text")]
    pub description: String,

    /// Price as displayed; the backend stores either a number or a string
    #[serde(default)]
    pub price: serde_json::Value,

    /// Cover image
    #[serde(default, deserialize_with = "deserialize_image_ref")]
    pub image: Option<ImageRef>,
}

impl TourPackage {
    /// Price rendered for display (`₹ 12000`)
    #[must_use]
    pub fn display_price(&self) -> String {
        match &self.price {
            serde_json::Value::Null => "₹ -".to_string(),
            serde_json::Value::String(s) => format!("₹ {s}"),
            other => format!("₹ {other}"),
        }
    }
}

/// Booking request body for `POST /api/bookings`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Customer name
    pub name: String,
    /// Contact phone number
    pub phone: String,
    /// Travel date, `YYYY-MM-DD`
    pub date: String,
    /// Party size as entered
    pub people: String,
    /// Title of the booked package
    pub package: String,
}
