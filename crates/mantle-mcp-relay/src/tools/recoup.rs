//! Artist tools backed by the Recoup API.

use async_trait::async_trait;
use mantle_mcp_data::recoup::{ArtistProfile, FanPage, PostPage};
use mantle_mcp_data::{PageQuery, RecoupClient};
use serde::Deserialize;
use serde_json::{Value, json};

use super::format::format_count;
use super::{Tool, ToolError, parse_args};

#[derive(Deserialize)]
struct PagedArgs {
    artist_account_id: String,
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    limit: Option<u32>,
}

impl PagedArgs {
    const fn query(&self) -> PageQuery {
        PageQuery::new(self.page, self.limit)
    }
}

#[derive(Deserialize)]
struct ArtistArgs {
    artist_account_id: String,
}

fn paged_schema(what: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "artist_account_id": {
                "type": "string",
                "description": format!("The unique identifier of the artist account to fetch {what} for")
            },
            "page": {
                "type": "integer",
                "minimum": 1,
                "description": "The page number to retrieve (default: 1)"
            },
            "limit": {
                "type": "integer",
                "minimum": 1,
                "maximum": 100,
                "description": "The number of records per page (default: 20, max: 100)"
            }
        },
        "required": ["artist_account_id"]
    })
}

pub(crate) fn render_fans(page: &FanPage) -> String {
    let summaries: Vec<String> = page
        .fans
        .iter()
        .map(|fan| {
            let mut line = format!(
                "{} ({}) - {} followers",
                fan.username,
                fan.region.as_deref().unwrap_or("N/A"),
                format_count(fan.follower_count)
            );
            if let Some(bio) = fan.bio.as_deref().filter(|b| !b.is_empty()) {
                line.push('\n');
                line.push_str(bio);
            }
            line
        })
        .collect();
    format!(
        "Found {} fans (showing page {} of {}):\n\n{}",
        page.pagination.total_count,
        page.pagination.page,
        page.pagination.total_pages,
        summaries.join("\n\n")
    )
}

pub(crate) fn render_posts(page: &PostPage) -> String {
    let summaries: Vec<String> = page
        .posts
        .iter()
        .map(|post| {
            format!(
                "Post ID: {}\nURL: {}\nLast Updated: {}",
                post.id, post.post_url, post.updated_at
            )
        })
        .collect();
    format!(
        "Found {} posts (showing page {} of {}):\n\n{}",
        page.pagination.total_count,
        page.pagination.page,
        page.pagination.total_pages,
        summaries.join("\n\n")
    )
}

fn count_or_na(value: Option<u64>) -> String {
    value.map_or_else(|| "N/A".to_string(), format_count)
}

pub(crate) fn render_profile(profile: &ArtistProfile) -> String {
    let overall = format!(
        "Total Followers: {}\nTotal Following: {}\nTotal Posts: {}\nLast Updated: {}",
        format_count(profile.total_followers),
        format_count(profile.total_following),
        format_count(profile.total_posts),
        profile.updated_at
    );
    let profiles: Vec<String> = profile
        .profiles
        .iter()
        .map(|p| {
            format!(
                "Platform: {}\nUsername: {}\nProfile: {}\nBio: {}\nFollowers: {}\n\
                 Following: {}\nPosts: {}\nRegion: {}",
                p.platform(),
                p.username,
                p.profile_url,
                p.bio.as_deref().filter(|b| !b.is_empty()).unwrap_or("N/A"),
                count_or_na(p.follower_count),
                count_or_na(p.following_count),
                count_or_na(p.post_count),
                p.region.as_deref().unwrap_or("N/A"),
            )
        })
        .collect();
    format!(
        "Artist Profile Summary\n\nOverall Statistics:\n{overall}\n\nSocial Media Profiles:\n\n{}",
        profiles.join("\n\n")
    )
}

pub struct ArtistFansTool {
    client: RecoupClient,
}

impl ArtistFansTool {
    pub const fn new(client: RecoupClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for ArtistFansTool {
    fn name(&self) -> &str {
        "get_artist_fans"
    }

    fn description(&self) -> &str {
        "Get a list of fans for a specific artist across all social media profiles"
    }

    fn input_schema(&self) -> Value {
        paged_schema("fans")
    }

    async fn call(&self, arguments: Value) -> Result<String, ToolError> {
        let args: PagedArgs = parse_args(arguments)?;
        let page = self.client.fans(&args.artist_account_id, args.query()).await?;
        Ok(render_fans(&page))
    }
}

pub struct ArtistPostsTool {
    client: RecoupClient,
}

impl ArtistPostsTool {
    pub const fn new(client: RecoupClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for ArtistPostsTool {
    fn name(&self) -> &str {
        "get_artist_posts"
    }

    fn description(&self) -> &str {
        "Get a list of social media posts for a specific artist across all social media profiles"
    }

    fn input_schema(&self) -> Value {
        paged_schema("posts")
    }

    async fn call(&self, arguments: Value) -> Result<String, ToolError> {
        let args: PagedArgs = parse_args(arguments)?;
        let page = self.client.posts(&args.artist_account_id, args.query()).await?;
        Ok(render_posts(&page))
    }
}

pub struct ArtistProfileTool {
    client: RecoupClient,
}

impl ArtistProfileTool {
    pub const fn new(client: RecoupClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for ArtistProfileTool {
    fn name(&self) -> &str {
        "get_artist_profile"
    }

    fn description(&self) -> &str {
        "Get an artist's profile and statistics across all social media platforms"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "artist_account_id": {
                    "type": "string",
                    "description": "The unique identifier of the artist account"
                }
            },
            "required": ["artist_account_id"]
        })
    }

    async fn call(&self, arguments: Value) -> Result<String, ToolError> {
        let args: ArtistArgs = parse_args(arguments)?;
        let profile = self.client.artist_profile(&args.artist_account_id).await?;
        Ok(render_profile(&profile))
    }
}
