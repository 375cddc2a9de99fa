//! Command handlers and output formatting.

use std::path::PathBuf;

use agora_core::{
    Agora, Attachment, Categories, PageQuery, Post, PostForm, PostPage, SigninForm, SignupForm,
};
use anyhow::{Context, Result};
use clap::Args;
use url::Url;

#[derive(Args)]
pub struct PostArgs {
    #[arg(short, long)]
    pub title: String,

    #[arg(long)]
    pub content: String,

    /// Category key (see `agora categories`)
    #[arg(short, long)]
    pub category: String,

    /// File to attach
    #[arg(short, long)]
    pub file: Option<PathBuf>,
}

impl PostArgs {
    async fn into_form(self) -> Result<PostForm> {
        let mut form = PostForm::new(self.title, self.content, self.category);
        if let Some(path) = self.file {
            let attachment = Attachment::from_path(&path)
                .await
                .with_context(|| format!("Failed to read {:?}", path))?;
            form = form.with_attachment(attachment);
        }
        Ok(form)
    }
}

pub async fn signup(
    agora: &Agora,
    username: String,
    name: String,
    password: String,
    confirm_password: String,
) -> Result<()> {
    let form = SignupForm {
        username,
        name,
        password,
        confirm_password,
    };
    agora.auth().signup(&form).await.context("Sign-up failed")?;
    println!("Account created. Sign in with: agora signin {}", form.username.trim());
    Ok(())
}

pub async fn signin(agora: &Agora, username: String, password: String) -> Result<()> {
    let claims = agora
        .auth()
        .sign_in(&SigninForm::new(username, password))
        .await
        .context("Sign-in failed")?;
    println!("Welcome, {}!", claims.name);
    if let Some(expires) = claims.expires_at() {
        println!("  Token expires: {}", expires.to_rfc3339());
    }
    Ok(())
}

pub async fn signout(agora: &Agora) -> Result<()> {
    agora.auth().sign_out().await;
    println!("Signed out");
    Ok(())
}

pub fn whoami(agora: &Agora) -> Result<()> {
    let credential = agora.client().credentials().get();
    match (credential.subject_id(), credential.display_name()) {
        (Some(subject), Some(name)) => println!("{} <{}>", name, subject),
        _ => println!("Not signed in"),
    }
    Ok(())
}

pub async fn categories(agora: &Agora) -> Result<()> {
    let categories = agora
        .boards()
        .categories()
        .await
        .context("Failed to fetch categories")?;
    print!("{}", format_categories(&categories));
    Ok(())
}

pub async fn list(
    agora: &Agora,
    page: u32,
    size: u32,
    category: Option<String>,
    json: bool,
) -> Result<()> {
    let mut query = PageQuery::default().page(page).size(size);
    if let Some(category) = category {
        query = query.category(category);
    }

    let result = agora
        .boards()
        .list(&query)
        .await
        .context("Failed to list posts")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", format_page(&result, &query));
    }
    Ok(())
}

pub async fn show(agora: &Agora, id: u64, json: bool) -> Result<()> {
    let post = agora
        .boards()
        .detail(id)
        .await
        .with_context(|| format!("Failed to fetch post {}", id))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&post)?);
    } else {
        print!("{}", format_post(&post, &agora.client().config().asset_origin));
    }
    Ok(())
}

pub async fn create(agora: &Agora, args: PostArgs) -> Result<()> {
    let form = args.into_form().await?;
    let response = agora
        .boards()
        .create(&form)
        .await
        .context("Failed to create post")?;

    match response.json::<Post>() {
        Ok(post) => println!("Created post {}", post.id),
        Err(_) => println!("Post created"),
    }
    Ok(())
}

pub async fn update(agora: &Agora, id: u64, args: PostArgs) -> Result<()> {
    let form = args.into_form().await?;
    agora
        .boards()
        .update(id, &form)
        .await
        .with_context(|| format!("Failed to update post {}", id))?;
    println!("Updated post {}", id);
    Ok(())
}

pub async fn delete(agora: &Agora, id: u64) -> Result<()> {
    agora
        .boards()
        .delete(id)
        .await
        .with_context(|| format!("Failed to delete post {}", id))?;
    println!("Deleted post {}", id);
    Ok(())
}

fn format_categories(categories: &Categories) -> String {
    categories
        .iter()
        .map(|(key, label)| format!("{:<12} {}\n", key, label))
        .collect()
}

fn format_page(page: &PostPage, query: &PageQuery) -> String {
    let category = query.category_filter().unwrap_or_default();
    let posts = page.in_category(category);
    if posts.is_empty() {
        return "No posts\n".to_string();
    }

    let mut out = String::new();
    for post in posts {
        let date = post
            .created()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        out.push_str(&format!(
            "{:>6}  {:<10} {:<10}  {}\n",
            post.id, post.category(), date, post.title
        ));
    }
    out.push_str(&format!(
        "Page {} of {} ({} posts)\n",
        query.page.saturating_add(1),
        page.total_pages(query.size).max(1),
        page.total_elements
    ));
    out
}

fn format_post(post: &Post, asset_origin: &Url) -> String {
    let mut out = format!("#{} [{}] {}\n", post.id, post.category(), post.title);
    if let Some(author) = &post.author {
        out.push_str(&format!("By: {}\n", author));
    }
    if let Some(created) = post.created() {
        out.push_str(&format!("Created: {}\n", created.format("%Y-%m-%d %H:%M")));
    }
    if let (Some(url), Some(name)) = (post.image_url(asset_origin), post.image_file_name()) {
        out.push_str(&format!("Attachment: {} ({})\n", name, url));
    }
    out.push('\n');
    out.push_str(&post.content);
    out.push('\n');
    out
}
