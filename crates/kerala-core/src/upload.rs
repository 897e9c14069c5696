//! Image upload validation
//!
//! Every editor runs a selected file through an [`UploadPolicy`] before it is
//! kept in the draft, so an oversized or wrongly typed file never reaches the
//! backend.

use crate::{Error, Result, config::UploadConfig};
use bytes::Bytes;
use std::path::Path;
use tracing::debug;

/// Image formats the backend accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageType {
    /// `image/jpeg` (`.jpg`, `.jpeg`)
    Jpeg,
    /// `image/png`
    Png,
}

impl ImageType {
    /// Detect the type from a file extension
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            _ => None,
        }
    }

    /// MIME type sent in the multipart part
    #[must_use]
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }
}

/// Size and type constraints for one upload field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    max_bytes: u64,
    allowed_extensions: Vec<String>,
}

impl UploadPolicy {
    /// Build a policy with an explicit ceiling
    #[must_use]
    pub fn new(max_bytes: u64, allowed_extensions: Vec<String>) -> Self {
        Self {
            max_bytes,
            allowed_extensions,
        }
    }

    /// Policy for gallery and about images
    #[must_use]
    pub fn standard(config: &UploadConfig) -> Self {
        Self::new(config.max_image_bytes, config.allowed_extensions.clone())
    }

    /// Policy for banner images
    #[must_use]
    pub fn banner(config: &UploadConfig) -> Self {
        Self::new(
            config.banner_max_image_bytes,
            config.allowed_extensions.clone(),
        )
    }

    /// Size ceiling in bytes
    #[must_use]
    pub const fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Check a file name and size against the policy
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedImageType`] or [`Error::FileSizeExceeded`].
    pub fn check(&self, file_name: &str, size: u64) -> Result<ImageType> {
        let ext = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();

        let allowed = self
            .allowed_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ext));

        let image_type = ImageType::from_extension(ext)
            .filter(|_| allowed)
            .ok_or_else(|| Error::UnsupportedImageType {
                format: if ext.is_empty() {
                    file_name.to_string()
                } else {
                    ext.to_string()
                },
            })?;

        if size > self.max_bytes {
            return Err(Error::FileSizeExceeded {
                size,
                max_size: self.max_bytes,
            });
        }

        Ok(image_type)
    }

    /// Re-check an upload that may have been validated under another policy
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedImageType`] or [`Error::FileSizeExceeded`].
    pub fn admit(&self, upload: &ImageUpload) -> Result<()> {
        self.check(upload.file_name(), upload.len() as u64).map(|_| ())
    }
}

/// A validated image waiting to be submitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    file_name: String,
    image_type: ImageType,
    data: Bytes,
}

impl ImageUpload {
    /// Validate in-memory bytes
    ///
    /// # Errors
    ///
    /// Returns a validation error if the name or size violates `policy`.
    pub fn from_bytes(
        file_name: impl Into<String>,
        data: impl Into<Bytes>,
        policy: &UploadPolicy,
    ) -> Result<Self> {
        let file_name = file_name.into();
        let data = data.into();
        let image_type = policy.check(&file_name, data.len() as u64)?;

        Ok(Self {
            file_name,
            image_type,
            data,
        })
    }

    /// Read and validate a file from disk
    ///
    /// The size is checked from metadata first so an oversized file is never
    /// read into memory.
    ///
    /// # Errors
    ///
    /// Returns a validation error, or an I/O error if the file is unreadable.
    pub async fn from_path(path: &Path, policy: &UploadPolicy) -> Result<Self> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| Error::validation("image", format!("invalid file name: {}", path.display())))?
            .to_string();

        let metadata = tokio::fs::metadata(path).await?;
        policy.check(&file_name, metadata.len())?;

        let data = tokio::fs::read(path).await?;
        debug!(file = %file_name, bytes = data.len(), "Image selected");
        Self::from_bytes(file_name, data, policy)
    }

    /// File name as selected
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Detected image type
    #[must_use]
    pub const fn image_type(&self) -> ImageType {
        self.image_type
    }

    /// File contents
    #[must_use]
    pub const fn data(&self) -> &Bytes {
        &self.data
    }

    /// Size in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the file is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn policy(max: u64) -> UploadPolicy {
        UploadPolicy::standard(&UploadConfig {
            max_image_bytes: max,
            ..UploadConfig::default()
        })
    }

    #[rstest]
    #[case("beach.jpg", ImageType::Jpeg)]
    #[case("beach.JPEG", ImageType::Jpeg)]
    #[case("beach.png", ImageType::Png)]
    fn test_accepted_types(#[case] name: &str, #[case] expected: ImageType) {
        assert_eq!(policy(1024).check(name, 10).unwrap(), expected);
    }

    #[rstest]
    #[case("beach.gif")]
    #[case("beach.webp")]
    #[case("beach")]
    #[case("notes.txt")]
    fn test_rejected_types(#[case] name: &str) {
        let err = policy(1024).check(name, 10).unwrap_err();
        assert!(matches!(err, Error::UnsupportedImageType { .. }));
    }

    #[test]
    fn test_size_ceiling_is_inclusive() {
        assert!(policy(100).check("a.png", 100).is_ok());

        let err = policy(100).check("a.png", 101).unwrap_err();
        match err {
            Error::FileSizeExceeded { size, max_size } => {
                assert_eq!(size, 101);
                assert_eq!(max_size, 100);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_extension_must_also_be_configured() {
        let png_only = UploadPolicy::new(1024, vec!["png".to_string()]);

        assert!(png_only.check("a.png", 1).is_ok());
        assert!(png_only.check("a.jpg", 1).is_err());
    }

    #[test]
    fn test_banner_policy_uses_banner_ceiling() {
        let config = UploadConfig::default();

        assert_eq!(UploadPolicy::banner(&config).max_bytes(), 15 * 1024 * 1024);
        assert_eq!(UploadPolicy::standard(&config).max_bytes(), 5 * 1024 * 1024);
    }

    #[test]
    fn test_from_bytes() {
        let upload = ImageUpload::from_bytes("c1.png", vec![1_u8, 2, 3], &policy(1024)).unwrap();

        assert_eq!(upload.file_name(), "c1.png");
        assert_eq!(upload.image_type().mime(), "image/png");
        assert_eq!(upload.len(), 3);
        assert!(!upload.is_empty());
    }

    #[test]
    fn test_admit_rechecks_against_tighter_policy() {
        let upload = ImageUpload::from_bytes("wide.jpg", vec![0_u8; 200], &policy(1024)).unwrap();

        assert!(policy(1024).admit(&upload).is_ok());
        assert!(matches!(
            policy(100).admit(&upload),
            Err(Error::FileSizeExceeded { size: 200, max_size: 100 })
        ));
    }

    #[tokio::test]
    async fn test_from_path_checks_size_before_reading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.jpg");
        std::fs::write(&path, vec![0_u8; 2048]).unwrap();

        let err = ImageUpload::from_path(&path, &policy(1024)).await.unwrap_err();
        assert!(matches!(err, Error::FileSizeExceeded { size: 2048, .. }));

        let upload = ImageUpload::from_path(&path, &policy(4096)).await.unwrap();
        assert_eq!(upload.file_name(), "big.jpg");
        assert_eq!(upload.len(), 2048);
    }

    #[tokio::test]
    async fn test_from_path_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ImageUpload::from_path(&dir.path().join("gone.png"), &policy(10))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Io(_)));
    }
}
