//! Operator profile
//!
//! Display name plus an avatar, either a built-in icon or an uploaded image
//! kept inline as a base64 data URL. Persisted under
//! [`keys::USER_PROFILE`](crate::store::keys::USER_PROFILE).

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::{keys, EntityStore, StoreError};

/// Shortest accepted display name
pub const NAME_MIN_LEN: usize = 2;

/// Largest accepted avatar upload
pub const MAX_IMAGE_BYTES: usize = 2 * 1024 * 1024;

/// Errors editing or persisting the profile
#[derive(Error, Debug)]
pub enum ProfileError {
    /// Name left blank
    #[error("Please enter a name")]
    NameMissing,

    /// Name shorter than the minimum
    #[error("Name must be at least 2 characters")]
    NameTooShort,

    /// Upload is not an image
    #[error("Please select an image file (got {0})")]
    NotAnImage(String),

    /// Upload over the size limit
    #[error("Image size must be less than 2MB (got {0} bytes)")]
    ImageTooLarge(usize),

    /// Stored image cannot be decoded
    #[error("Stored avatar image is not a valid data URL")]
    InvalidImage,

    /// Storage failure
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

/// Built-in avatar icons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvatarIcon {
    /// Plain user silhouette
    #[default]
    Default,
    /// Picker icon 1
    Avatar1,
    /// Picker icon 2
    Avatar2,
    /// Picker icon 3
    Avatar3,
    /// Picker icon 4
    Avatar4,
    /// Picker icon 5
    Avatar5,
    /// Picker icon 6
    Avatar6,
    /// Picker icon 7
    Avatar7,
}

impl AvatarIcon {
    /// Every icon, in picker order
    pub const ALL: [AvatarIcon; 8] = [
        Self::Default,
        Self::Avatar1,
        Self::Avatar2,
        Self::Avatar3,
        Self::Avatar4,
        Self::Avatar5,
        Self::Avatar6,
        Self::Avatar7,
    ];

    /// Stored key, e.g. "avatar3"
    pub fn key(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Avatar1 => "avatar1",
            Self::Avatar2 => "avatar2",
            Self::Avatar3 => "avatar3",
            Self::Avatar4 => "avatar4",
            Self::Avatar5 => "avatar5",
            Self::Avatar6 => "avatar6",
            Self::Avatar7 => "avatar7",
        }
    }

    /// Parse a stored key; unknown keys fall back to the default icon
    pub fn from_key(key: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|icon| icon.key() == key)
            .unwrap_or_default()
    }

    /// Icon class for the presentation layer
    pub fn css_class(&self) -> &'static str {
        match self {
            Self::Default => "fas fa-user",
            Self::Avatar1 => "fas fa-user-graduate",
            Self::Avatar2 => "fas fa-user-tie",
            Self::Avatar3 => "fas fa-user-astronaut",
            Self::Avatar4 => "fas fa-user-ninja",
            Self::Avatar5 => "fas fa-user-secret",
            Self::Avatar6 => "fas fa-user-md",
            Self::Avatar7 => "fas fa-user-shield",
        }
    }
}

/// Avatar choice
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Avatar {
    /// A built-in icon
    Icon(AvatarIcon),
    /// An uploaded image as a `data:<mime>;base64,...` URL
    Image(String),
}

impl Default for Avatar {
    fn default() -> Self {
        Self::Icon(AvatarIcon::Default)
    }
}

/// Stored layout: `{name, avatar, avatarType, avatarImage}`
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredProfile {
    #[serde(default)]
    name: String,
    #[serde(default)]
    avatar: String,
    #[serde(default)]
    avatar_type: String,
    #[serde(default)]
    avatar_image: Option<String>,
}

/// Operator display name and avatar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredProfile", into = "StoredProfile")]
pub struct UserProfile {
    name: String,
    avatar: Avatar,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            name: "Operator".to_string(),
            avatar: Avatar::default(),
        }
    }
}

impl From<StoredProfile> for UserProfile {
    fn from(stored: StoredProfile) -> Self {
        let defaults = UserProfile::default();
        let name = if stored.name.trim().is_empty() {
            defaults.name
        } else {
            stored.name
        };
        let avatar = match (stored.avatar_type.as_str(), stored.avatar_image) {
            ("image", Some(url)) if !url.is_empty() => Avatar::Image(url),
            _ => Avatar::Icon(AvatarIcon::from_key(&stored.avatar)),
        };
        Self { name, avatar }
    }
}

impl From<UserProfile> for StoredProfile {
    fn from(profile: UserProfile) -> Self {
        let (avatar, avatar_type, avatar_image) = match profile.avatar {
            Avatar::Icon(icon) => (icon.key().to_string(), "icon".to_string(), None),
            Avatar::Image(url) => ("default".to_string(), "image".to_string(), Some(url)),
        };
        Self {
            name: profile.name,
            avatar,
            avatar_type,
            avatar_image,
        }
    }
}

impl UserProfile {
    /// Load the stored profile. Missing or unreadable snapshots give the defaults.
    pub fn load(store: &EntityStore) -> Result<Self, ProfileError> {
        match store.read_json::<UserProfile>(keys::USER_PROFILE) {
            Ok(Some(profile)) => Ok(profile),
            Ok(None) => Ok(Self::default()),
            Err(StoreError::Serialization(e)) => {
                tracing::warn!("error loading profile, using defaults: {e}");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Persist the profile
    pub fn save(&self, store: &mut EntityStore) -> Result<(), ProfileError> {
        store.write_json(keys::USER_PROFILE, self)?;
        tracing::debug!(name = %self.name, "profile saved");
        Ok(())
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current avatar
    pub fn avatar(&self) -> &Avatar {
        &self.avatar
    }

    /// Change the display name. Surrounding whitespace is dropped.
    pub fn rename(&mut self, name: &str) -> Result<(), ProfileError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ProfileError::NameMissing);
        }
        if name.chars().count() < NAME_MIN_LEN {
            return Err(ProfileError::NameTooShort);
        }
        self.name = name.to_string();
        Ok(())
    }

    /// Pick a built-in icon, discarding any uploaded image
    pub fn choose_icon(&mut self, icon: AvatarIcon) {
        self.avatar = Avatar::Icon(icon);
    }

    /// Use an uploaded image. `mime` must be `image/*` and the payload at most 2 MiB.
    pub fn set_avatar_image(&mut self, mime: &str, bytes: &[u8]) -> Result<(), ProfileError> {
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(ProfileError::ImageTooLarge(bytes.len()));
        }
        if !mime.starts_with("image/") {
            return Err(ProfileError::NotAnImage(mime.to_string()));
        }
        self.avatar = Avatar::Image(format!("data:{};base64,{}", mime, STANDARD.encode(bytes)));
        Ok(())
    }

    /// Decoded uploaded image with its MIME type, if the avatar is an image
    pub fn image(&self) -> Result<Option<(String, Vec<u8>)>, ProfileError> {
        let Avatar::Image(url) = &self.avatar else {
            return Ok(None);
        };
        let (header, payload) = url
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(','))
            .ok_or(ProfileError::InvalidImage)?;
        let mime = header
            .strip_suffix(";base64")
            .ok_or(ProfileError::InvalidImage)?;
        let bytes = STANDARD
            .decode(payload)
            .map_err(|_| ProfileError::InvalidImage)?;
        Ok(Some((mime.to_string(), bytes)))
    }
}
