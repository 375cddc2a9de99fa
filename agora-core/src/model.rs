//! Domain types for the board API.
//!
//! - [`Post`], [`PostPage`], [`Categories`] - server resources
//! - [`PageQuery`] - list filters
//! - [`SignupForm`], [`SigninForm`], [`PostForm`], [`Attachment`] - user input

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use url::Url;

/// Identifier of a post.
pub type PostId = u64;

/// A board post.
///
/// List responses omit some fields, so everything past the identity is
/// optional or defaulted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,

    pub title: String,

    #[serde(default)]
    pub content: String,

    /// Category key as sent in list entries.
    #[serde(default)]
    pub category: String,

    /// Category key as sent by the detail endpoint.
    #[serde(default, rename = "boardCategory", skip_serializing_if = "Option::is_none")]
    pub board_category: Option<String>,

    #[serde(default, alias = "authorName")]
    pub author: Option<String>,

    /// Creation time as sent by the server.
    #[serde(default)]
    pub created_at: Option<String>,

    /// Server-relative path of the attached image.
    #[serde(default)]
    pub image_url: Option<String>,
}

impl Post {
    /// Category key, whichever field the server used for it.
    pub fn category(&self) -> &str {
        if self.category.is_empty() {
            self.board_category.as_deref().unwrap_or_default()
        } else {
            &self.category
        }
    }

    /// Absolute URL of the attached image, resolved against `origin`.
    pub fn image_url(&self, origin: &Url) -> Option<Url> {
        let path = self.image_url.as_deref().filter(|p| !p.is_empty())?;
        origin.join(path).ok()
    }

    /// File name of the attached image.
    pub fn image_file_name(&self) -> Option<&str> {
        self.image_url
            .as_deref()
            .and_then(|p| p.rsplit('/').next())
            .filter(|name| !name.is_empty())
    }

    /// Creation time parsed as local date-time.
    ///
    /// Accepts RFC 3339 and the offset-less ISO form servers commonly emit.
    pub fn created(&self) -> Option<NaiveDateTime> {
        let raw = self.created_at.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.naive_local())
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
            .ok()
    }
}

/// One page of posts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPage {
    #[serde(default)]
    pub content: Vec<Post>,

    #[serde(default)]
    pub total_elements: u64,
}

impl PostPage {
    /// Posts in `category`; an empty category keeps everything.
    ///
    /// Servers that ignore the `category` query return unfiltered pages.
    pub fn in_category(&self, category: &str) -> Vec<&Post> {
        self.content
            .iter()
            .filter(|post| category.is_empty() || post.category() == category)
            .collect()
    }

    /// Number of pages of `size` needed for all elements.
    pub fn total_pages(&self, size: u32) -> u64 {
        if size == 0 {
            return 0;
        }
        self.total_elements.div_ceil(u64::from(size))
    }
}

/// Category key to display label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Categories(BTreeMap<String, String>);

impl Categories {
    pub fn label(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for Categories {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Default page size of the post list.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Filters for the post list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    /// Zero-based page index.
    pub page: u32,
    pub size: u32,
    pub category: Option<String>,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
            category: None,
        }
    }
}

impl PageQuery {
    pub fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Category filter, if one is set and non-empty.
    pub fn category_filter(&self) -> Option<&str> {
        self.category.as_deref().filter(|c| !c.is_empty())
    }
}

/// Account creation input.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupForm {
    pub username: String,
    pub name: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignupForm {
    /// Copy with surrounding whitespace removed from the username.
    pub fn normalized(&self) -> Self {
        Self {
            username: self.username.trim().to_string(),
            ..self.clone()
        }
    }
}

/// Sign-in input.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SigninForm {
    pub username: String,
    pub password: String,
}

impl SigninForm {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Copy with surrounding whitespace removed from the username.
    pub fn normalized(&self) -> Self {
        Self {
            username: self.username.trim().to_string(),
            password: self.password.clone(),
        }
    }
}

/// A file attached to a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, detecting its type from the content.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let mime_type = detect_mime(&bytes).to_string();
        Ok(Self {
            file_name,
            mime_type,
            bytes,
        })
    }
}

/// Fallback when the content matches no known signature.
const DEFAULT_MIME: &str = "application/octet-stream";

/// MIME type of `bytes`, detected from magic bytes rather than the file name.
fn detect_mime(bytes: &[u8]) -> &'static str {
    infer::get(bytes)
        .map(|kind| kind.mime_type())
        .unwrap_or(DEFAULT_MIME)
}

/// Post creation or update input.
#[derive(Debug, Clone, Default)]
pub struct PostForm {
    pub title: String,
    pub content: String,
    pub category: String,

    /// New attachment; on update, `None` keeps the current one.
    pub attachment: Option<Attachment>,
}

impl PostForm {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            category: category.into(),
            attachment: None,
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    /// The JSON part of the multipart body.
    pub(crate) fn payload(&self) -> PostPayload<'_> {
        PostPayload {
            title: &self.title,
            content: &self.content,
            category: &self.category,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct PostPayload<'a> {
    title: &'a str,
    content: &'a str,
    category: &'a str,
}
