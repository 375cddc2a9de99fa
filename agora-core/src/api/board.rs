//! Board endpoints.

use crate::client::{ApiClient, ApiError, ApiRequest, ApiResponse, MultipartPart};
use crate::model::{Categories, Post, PostForm, PostId, PostPage, PageQuery};
use crate::validate::Validate;

const BOARDS_PATH: &str = "/boards";

/// Name of the JSON part of post bodies.
const REQUEST_PART: &str = "request";
/// Name of the attachment part of post bodies.
const FILE_PART: &str = "file";

#[derive(Debug, Clone)]
pub struct BoardApi {
    client: ApiClient,
}

impl BoardApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn categories(&self) -> Result<Categories, ApiError> {
        let request = ApiRequest::get(format!("{}/categories", BOARDS_PATH));
        self.client.execute(request).await?.json()
    }

    pub async fn list(&self, query: &PageQuery) -> Result<PostPage, ApiError> {
        let mut request = ApiRequest::get(BOARDS_PATH)
            .query("page", query.page)
            .query("size", query.size);
        if let Some(category) = query.category_filter() {
            request = request.query("category", category);
        }
        self.client.execute(request).await?.json()
    }

    pub async fn detail(&self, id: PostId) -> Result<Post, ApiError> {
        self.client.execute(ApiRequest::get(post_path(id))).await?.json()
    }

    pub async fn create(&self, form: &PostForm) -> Result<ApiResponse, ApiError> {
        form.validate()?;
        let request = ApiRequest::post(BOARDS_PATH).multipart(post_parts(form)?);
        self.client.execute(request).await
    }

    /// Replace a post's fields; without an attachment the current one stays.
    pub async fn update(&self, id: PostId, form: &PostForm) -> Result<ApiResponse, ApiError> {
        form.validate()?;
        let request = ApiRequest::patch(post_path(id)).multipart(post_parts(form)?);
        self.client.execute(request).await
    }

    pub async fn delete(&self, id: PostId) -> Result<ApiResponse, ApiError> {
        self.client.execute(ApiRequest::delete(post_path(id))).await
    }
}

fn post_path(id: PostId) -> String {
    format!("{}/{}", BOARDS_PATH, id)
}

fn post_parts(form: &PostForm) -> Result<Vec<MultipartPart>, ApiError> {
    let mut parts = vec![MultipartPart::json(REQUEST_PART, &form.payload())?];
    if let Some(file) = &form.attachment {
        parts.push(MultipartPart::file(
            FILE_PART,
            file.file_name.clone(),
            file.mime_type.clone(),
            file.bytes.clone(),
        ));
    }
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Attachment;

    #[test]
    fn test_parts_without_attachment() {
        let parts = post_parts(&PostForm::new("t", "c", "FREE")).unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].name(), "request");
        assert_eq!(parts[0].mime_type(), Some("application/json"));
    }

    #[test]
    fn test_parts_with_attachment() {
        let form = PostForm::new("t", "c", "FREE")
            .with_attachment(Attachment::new("cat.png", "image/png", vec![1, 2]));
        let parts = post_parts(&form).unwrap();

        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1].name(), "file");
        assert_eq!(parts[1].file_name(), Some("cat.png"));
        assert_eq!(parts[1].bytes(), &[1u8, 2]);
    }
}
