use crate::events::{
    impression::{ImpressionEvent, ImpressionKind},
    traits::RelevantEventSelector,
};

/// A conversion measurement request.
///
/// The target host is both the site the conversion happened on and the
/// querier whose budget the report is charged to.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionQuery {
    pub target_host: String,

    /// Impression sites in scope for attribution. Must be non-empty.
    pub source_hosts: Vec<String>,

    /// Ad identifiers whose impressions are attribution candidates. An
    /// empty list matches nothing; the query still spends budget.
    pub ad_ids: Vec<String>,

    /// Number of buckets in the report. Zero is invalid.
    pub histogram_size: u32,

    /// Attribution window in days; None means the engine's maximum
    /// retention window.
    pub lookback_days: Option<u32>,

    /// Restricts candidates to one interaction kind when set.
    pub kind_filter: Option<ImpressionKind>,
}

/// Tags the impressions a conversion query may attribute.
#[derive(Debug)]
pub struct ConversionEventSelector<'a> {
    pub query: &'a ConversionQuery,
}

impl RelevantEventSelector for ConversionEventSelector<'_> {
    type Event = ImpressionEvent;

    fn is_relevant_event(&self, event: &ImpressionEvent) -> bool {
        let query = self.query;
        event.target_host == query.target_host
            && query.source_hosts.contains(&event.source_host)
            && query.ad_ids.contains(&event.ad_id)
            && query.kind_filter.map_or(true, |kind| kind == event.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_matches_on_all_fields() {
        let query = ConversionQuery::mock();
        let selector = ConversionEventSelector { query: &query };

        let event = ImpressionEvent::mock();
        assert!(selector.is_relevant_event(&event));

        let mut other_target = event.clone();
        other_target.target_host = "bags.example".into();
        assert!(!selector.is_relevant_event(&other_target));

        let mut unknown_source = event.clone();
        unknown_source.source_host = "forum.example".into();
        assert!(!selector.is_relevant_event(&unknown_source));

        let mut other_ad = event.clone();
        other_ad.ad_id = "unrelated-campaign".into();
        assert!(!selector.is_relevant_event(&other_ad));
    }

    #[test]
    fn test_selector_kind_filter() {
        let mut query = ConversionQuery::mock();
        query.kind_filter = Some(ImpressionKind::Click);
        let selector = ConversionEventSelector { query: &query };

        let mut event = ImpressionEvent::mock();
        event.kind = ImpressionKind::View;
        assert!(!selector.is_relevant_event(&event));
        event.kind = ImpressionKind::Click;
        assert!(selector.is_relevant_event(&event));
    }

    #[test]
    fn test_empty_ad_list_matches_nothing() {
        let mut query = ConversionQuery::mock();
        query.ad_ids.clear();
        let selector = ConversionEventSelector { query: &query };
        assert!(!selector.is_relevant_event(&ImpressionEvent::mock()));
    }
}
