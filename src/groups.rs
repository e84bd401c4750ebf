//! Parsing and ordering of the `X-PP-Groups` header.
//!
//! The header carries a comma-separated list of `name[;q=quality]` tokens,
//! borrowing HTTP content-negotiation syntax. Groups are tried in descending
//! order of quality when looking up a rate-limit class.
//!
//! The upstream proxy has a known defect where every quality is forwarded as
//! 1.0. When the product of all qualities is exactly 1.0 the request carries
//! no usable ordering, so each quality is scaled by the operator-configured
//! [`GroupPriorities`] weight before sorting.

use std::cell::OnceCell;

use tracing::debug;

use crate::priority::GroupPriorities;

/// Quality used when a token has no `q=` qualifier or an unparsable one.
pub const DEFAULT_QUALITY: f64 = 1.0;

/// A group named in the header with its declared quality.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupEntry {
    pub name: String,
    pub quality: f64,
}

impl GroupEntry {
    pub fn new(name: impl Into<String>, quality: f64) -> Self {
        Self {
            name: name.into(),
            quality,
        }
    }

    /// Parse a single `name[;q=quality]` token.
    ///
    /// Only the text after the first `;` is inspected, and only when it starts
    /// with `q=`. Anything else leaves the quality at [`DEFAULT_QUALITY`].
    pub fn parse(token: &str) -> Self {
        let token = token.trim();
        let (name, qualifier) = token.split_once(';').unwrap_or((token, ""));

        let quality = qualifier
            .strip_prefix("q=")
            .and_then(|q| q.trim().parse::<f64>().ok())
            .unwrap_or(DEFAULT_QUALITY);

        Self::new(name, quality)
    }
}

/// Parse the header into entries, returning them with the product of all
/// qualities in parse order.
pub fn parse_groups(header: &str) -> (Vec<GroupEntry>, f64) {
    let mut overall_quality = 1.0;
    let groups: Vec<GroupEntry> = header
        .split(',')
        .map(|token| {
            let entry = GroupEntry::parse(token);
            overall_quality *= entry.quality;
            entry
        })
        .collect();

    (groups, overall_quality)
}

/// Order groups by effective quality, highest first.
///
/// `priorities` is only called when the quality-collapse workaround applies.
/// Groups with equal weight keep their header order.
pub fn order_groups<'a, F>(header: &str, priorities: F) -> Vec<GroupEntry>
where
    F: FnOnce() -> &'a GroupPriorities,
{
    if header.is_empty() {
        return Vec::new();
    }

    let (mut groups, overall_quality) = parse_groups(header);
    debug!(
        groups = groups.len(),
        overall_quality, "Parsed group header"
    );

    if overall_quality == 1.0 {
        let prios = priorities();
        debug!(
            configured = prios.len(),
            "All group qualities are 1.0, weighting by configured priorities"
        );

        for group in &mut groups {
            group.quality *= prios.get(&group.name.to_lowercase());
        }
    }

    groups.sort_by(|a, b| sort_weight(b.quality).total_cmp(&sort_weight(a.quality)));
    groups
}

// -0.0 and 0.0 are the same weight and must keep header order.
fn sort_weight(quality: f64) -> f64 {
    if quality == 0.0 {
        0.0
    } else {
        quality
    }
}

/// Resolve the lookup order for a header, using a priority table already built.
pub fn resolve_with<'a, F>(header: &str, priorities: F) -> Vec<String>
where
    F: FnOnce() -> &'a GroupPriorities,
{
    order_groups(header, priorities)
        .into_iter()
        .map(|group| group.name)
        .collect()
}

/// Resolve the lookup order for a header.
///
/// `priorities_source` is the `rs_limits.groups` configuration value; it is
/// only parsed when the workaround applies.
pub fn resolve(header: &str, priorities_source: &str) -> Vec<String> {
    let prios = OnceCell::new();
    resolve_with(header, || {
        prios.get_or_init(|| GroupPriorities::new(priorities_source))
    })
}
