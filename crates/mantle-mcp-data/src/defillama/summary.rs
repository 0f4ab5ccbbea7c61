//! Derived metrics computed from raw DefiLlama series.

use std::fmt;

use super::types::{ChainTvlPoint, ProtocolInfo};

/// Latest chain TVL with its daily and weekly percentage change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TvlSummary {
    pub latest: f64,
    pub daily_change_pct: f64,
    pub weekly_change_pct: f64,
}

impl TvlSummary {
    /// Summarise a daily TVL series (oldest first). Missing history falls
    /// back to the latest value, which yields a 0% change.
    pub fn from_history(points: &[ChainTvlPoint]) -> Option<Self> {
        let latest = points.last()?.tvl;
        let back = |days: usize| {
            points
                .len()
                .checked_sub(days + 1)
                .and_then(|i| points.get(i))
                .map(|p| p.tvl)
                .filter(|tvl| *tvl != 0.0)
                .unwrap_or(latest)
        };
        Some(Self {
            latest,
            daily_change_pct: pct_change(back(1), latest),
            weekly_change_pct: pct_change(back(7), latest),
        })
    }
}

fn pct_change(from: f64, to: f64) -> f64 {
    if from == 0.0 {
        0.0
    } else {
        (to - from) / from * 100.0
    }
}

/// Which social channels a protocol lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocialPresence {
    pub has_twitter: bool,
    pub has_github: bool,
    pub platform_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthCategory {
    Healthy,
    Moderate,
    AtRisk,
}

impl fmt::Display for HealthCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Healthy => "[Healthy]",
            Self::Moderate => "[Moderate]",
            Self::AtRisk => "[At Risk]",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthScore {
    /// 0..=100
    pub score: u32,
    pub category: HealthCategory,
}

/// Key metrics for one protocol, scoped to a chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolSummary {
    pub name: String,
    pub tvl: f64,
    pub social_presence: SocialPresence,
    pub is_multi_chain: bool,
    pub health: HealthScore,
}

impl ProtocolSummary {
    /// Build a summary from a protocol record. The TVL is the chain's
    /// current TVL when reported, the latest aggregated point otherwise.
    pub fn from_info(info: &ProtocolInfo, chain: &str) -> Self {
        let tvl = info
            .current_chain_tvls
            .get(chain)
            .copied()
            .or_else(|| info.tvl.last().map(|p| p.total_liquidity_usd))
            .unwrap_or(0.0);

        let has_twitter = info.twitter.as_deref().is_some_and(|t| !t.trim().is_empty());
        let has_github = info.github.as_ref().is_some_and(|g| !g.is_empty());
        let has_site = info.url.as_deref().is_some_and(|u| !u.trim().is_empty());
        let social_presence = SocialPresence {
            has_twitter,
            has_github,
            platform_count: u32::from(has_twitter) + u32::from(has_github) + u32::from(has_site),
        };
        let is_multi_chain = info.chains.len() > 1;
        let audited = info
            .audits
            .as_deref()
            .is_some_and(|a| a.parse::<u32>().is_ok_and(|n| n > 0));

        Self {
            name: info.name.clone(),
            tvl,
            social_presence,
            is_multi_chain,
            health: health_score(tvl, social_presence, is_multi_chain, audited),
        }
    }
}

/// Score a protocol: up to 50 points for TVL, 15 each for Twitter and
/// GitHub, 10 for multi-chain deployment and 10 for audits.
fn health_score(
    tvl: f64,
    social: SocialPresence,
    is_multi_chain: bool,
    audited: bool,
) -> HealthScore {
    let tvl_points = match tvl {
        t if t >= 100_000_000.0 => 50,
        t if t >= 10_000_000.0 => 40,
        t if t >= 1_000_000.0 => 30,
        t if t >= 100_000.0 => 20,
        t if t > 0.0 => 10,
        _ => 0,
    };
    let score = tvl_points
        + if social.has_twitter { 15 } else { 0 }
        + if social.has_github { 15 } else { 0 }
        + if is_multi_chain { 10 } else { 0 }
        + if audited { 10 } else { 0 };
    let category = match score {
        80.. => HealthCategory::Healthy,
        50..=79 => HealthCategory::Moderate,
        _ => HealthCategory::AtRisk,
    };
    HealthScore { score, category }
}
