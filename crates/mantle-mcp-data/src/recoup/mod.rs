//! Recoup artist-data API integration.
//!
//! Paginated fan and post listings plus an aggregated artist profile.

mod client;
pub mod types;

pub use client::{RecoupClient, RecoupConfig};
pub use types::{ArtistProfile, Fan, FanPage, Pagination, Post, PostPage, SocialProfile};
