//! Recoup API response types.

use serde::Deserialize;

/// Envelope shared by every Recoup response: `status` plus an optional
/// error `message`; the payload fields sit beside them.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct Pagination {
    pub total_count: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Fan {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub profile_url: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default, rename = "followerCount")]
    pub follower_count: u64,
    #[serde(default, rename = "followingCount")]
    pub following_count: u64,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FanPage {
    pub fans: Vec<Fan>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Post {
    pub id: String,
    pub post_url: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostPage {
    pub posts: Vec<Post>,
    pub pagination: Pagination,
}

/// One social-media profile of an artist.
#[derive(Debug, Clone, Deserialize)]
pub struct SocialProfile {
    pub id: String,
    pub username: String,
    pub profile_url: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub follower_count: Option<u64>,
    #[serde(default)]
    pub following_count: Option<u64>,
    #[serde(default)]
    pub post_count: Option<u64>,
    #[serde(default)]
    pub region: Option<String>,
    pub updated_at: String,
}

impl SocialProfile {
    /// Host part of the profile URL (e.g. `www.tiktok.com`).
    pub fn platform(&self) -> &str {
        let rest = self
            .profile_url
            .split_once("://")
            .map_or(self.profile_url.as_str(), |(_, rest)| rest);
        rest.split(['/', '?', '#']).next().unwrap_or(rest)
    }
}

/// Aggregated artist profile across platforms.
#[derive(Debug, Clone, Deserialize)]
pub struct ArtistProfile {
    pub id: String,
    #[serde(default)]
    pub profiles: Vec<SocialProfile>,
    pub total_followers: u64,
    pub total_following: u64,
    pub total_posts: u64,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ProfileResponse {
    pub profile: ArtistProfile,
}
