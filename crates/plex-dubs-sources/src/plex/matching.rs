use crate::plex::api::MetadataItem;

/// Minimum normalized similarity for a fuzzy title match
pub const FUZZY_CUTOFF: f64 = 0.75;

/// Exact title match, ignoring case
pub fn exact_match<'a>(title: &str, candidates: &'a [MetadataItem]) -> Option<&'a MetadataItem> {
    let wanted = title.trim().to_lowercase();
    candidates
        .iter()
        .find(|item| item.title.trim().to_lowercase() == wanted)
}

/// The candidate whose title is most similar to `title`, if it clears `cutoff`
pub fn fuzzy_match<'a>(title: &str, candidates: &'a [MetadataItem], cutoff: f64) -> Option<&'a MetadataItem> {
    let wanted = title.trim().to_lowercase();

    candidates
        .iter()
        .map(|item| {
            let score = strsim::normalized_levenshtein(&wanted, &item.title.trim().to_lowercase());
            (item, score)
        })
        .filter(|(_, score)| *score >= cutoff)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(item, _)| item)
}

pub fn find_episode(episodes: &[MetadataItem], season: u32, episode: u32) -> Option<&MetadataItem> {
    episodes
        .iter()
        .find(|item| item.parent_index == Some(season) && item.index == Some(episode))
}
