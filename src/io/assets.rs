use crate::types::{BrowseError, BrowseResult, Channel};
use std::sync::Arc;

/// Predicate deciding whether a URL or file name belongs to a channel
pub type Matcher = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// A matcher with the human-readable label used in error messages
#[derive(Clone)]
pub struct ChannelMatcher {
    pub label: String,
    matcher: Matcher,
}

impl ChannelMatcher {
    pub fn new<F>(label: impl Into<String>, matcher: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            matcher: Arc::new(matcher),
        }
    }

    pub fn matches(&self, candidate: &str) -> bool {
        (self.matcher)(candidate)
    }
}

impl std::fmt::Debug for ChannelMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelMatcher").field("label", &self.label).finish()
    }
}

/// Selects the co-pol and cross-pol inputs out of a list of candidates
#[derive(Debug, Clone)]
pub struct AssetSelector {
    co_pol: ChannelMatcher,
    cross_pol: ChannelMatcher,
}

impl AssetSelector {
    pub fn new(co_pol: ChannelMatcher, cross_pol: ChannelMatcher) -> Self {
        Self { co_pol, cross_pol }
    }

    /// Match candidates containing the given polarization tokens
    pub fn substring(co_pol: &str, cross_pol: &str) -> Self {
        let (co, cross) = (co_pol.to_string(), cross_pol.to_string());
        Self::new(
            ChannelMatcher::new(co_pol, move |c| c.contains(co.as_str())),
            ChannelMatcher::new(cross_pol, move |c| c.contains(cross.as_str())),
        )
    }

    /// Match candidates ending with the given suffixes
    pub fn suffix(co_pol: &str, cross_pol: &str) -> Self {
        let (co, cross) = (co_pol.to_string(), cross_pol.to_string());
        Self::new(
            ChannelMatcher::new(co_pol, move |c| c.ends_with(co.as_str())),
            ChannelMatcher::new(cross_pol, move |c| c.ends_with(cross.as_str())),
        )
    }

    /// `VV`/`VH` substrings, used for granule URL lists
    pub fn granule_urls() -> Self {
        Self::substring("VV", "VH")
    }

    /// `VV.tif`/`VH.tif` suffixes, used for catalog item assets
    pub fn catalog_assets() -> Self {
        Self::suffix("VV.tif", "VH.tif")
    }

    pub fn matcher(&self, channel: Channel) -> &ChannelMatcher {
        match channel {
            Channel::CoPol => &self.co_pol,
            Channel::CrossPol => &self.cross_pol,
        }
    }

    /// First candidate matching `channel`, or a missing-input error naming `id`
    pub fn select<'a, I>(&self, channel: Channel, candidates: I, id: &str) -> BrowseResult<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let matcher = self.matcher(channel);
        candidates
            .into_iter()
            .find(|candidate| matcher.matches(candidate))
            .ok_or_else(|| BrowseError::MissingInput {
                label: matcher.label.clone(),
                id: id.to_string(),
            })
    }

    /// Select both channels, co-pol first
    pub fn select_pair<'a>(&self, candidates: &[&'a str], id: &str) -> BrowseResult<(&'a str, &'a str)> {
        let co_pol = self.select(Channel::CoPol, candidates.iter().copied(), id)?;
        let cross_pol = self.select(Channel::CrossPol, candidates.iter().copied(), id)?;
        Ok((co_pol, cross_pol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_granule_url_selection() {
        let urls = [
            "https://host/OPERA_L2_RTC_mask.tif",
            "https://host/OPERA_L2_RTC_VH.tif",
            "https://host/OPERA_L2_RTC_VV.tif",
        ];
        let selector = AssetSelector::granule_urls();
        let (co, cross) = selector.select_pair(&urls, "granule").unwrap();
        assert_eq!(co, urls[2]);
        assert_eq!(cross, urls[1]);
    }

    #[test]
    fn test_catalog_suffix_requires_suffix() {
        let hrefs = ["url/to/VV.tif.xml", "url/to/mock_VH.tif"];
        let selector = AssetSelector::catalog_assets();
        let err = selector.select_pair(&hrefs, "mock-pystac-item").unwrap_err();
        assert_eq!(err.to_string(), "No VV.tif found for mock-pystac-item");
    }

    #[test]
    fn test_missing_cross_pol() {
        let selector = AssetSelector::catalog_assets();
        let err = selector
            .select(Channel::CrossPol, ["url/to/mock_VV.tif"], "item-1")
            .unwrap_err();
        assert_eq!(err.to_string(), "No VH.tif found for item-1");
    }

    #[test]
    fn test_custom_matcher() {
        let selector = AssetSelector::new(
            ChannelMatcher::new("HH", |c| c.to_lowercase().contains("_hh")),
            ChannelMatcher::new("HV", |c| c.to_lowercase().contains("_hv")),
        );
        let (co, cross) = selector.select_pair(&["a_hv.tif", "a_hh.tif"], "x").unwrap();
        assert_eq!(co, "a_hh.tif");
        assert_eq!(cross, "a_hv.tif");
    }
}
