use crate::events::impression::ImpressionEvent;

/// Picks the impression a conversion is attributed to: the most recent
/// candidate at or before the conversion, with ties broken by index and
/// then source host so the winner is the same on every run.
pub fn last_touch_winner(
    candidates: &[ImpressionEvent],
    conversion_ts: u64,
) -> Option<&ImpressionEvent> {
    candidates
        .iter()
        .filter(|event| event.timestamp <= conversion_ts)
        .max_by(|a, b| {
            (a.timestamp, a.index, &a.source_host)
                .cmp(&(b.timestamp, b.index, &b.source_host))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn impression(timestamp: u64, index: u64, source_host: &str) -> ImpressionEvent {
        ImpressionEvent {
            timestamp,
            index,
            source_host: source_host.into(),
            ..ImpressionEvent::mock()
        }
    }

    #[test]
    fn test_most_recent_impression_wins() {
        let candidates = vec![
            impression(100, 0, "blog.example"),
            impression(300, 1, "blog.example"),
            impression(200, 2, "news.example"),
        ];
        let winner = last_touch_winner(&candidates, 400);
        assert_eq!(winner, Some(&candidates[1]));
    }

    #[test]
    fn test_impressions_after_conversion_are_ignored() {
        let candidates = vec![
            impression(100, 0, "blog.example"),
            impression(500, 1, "blog.example"),
        ];
        let winner = last_touch_winner(&candidates, 250);
        assert_eq!(winner, Some(&candidates[0]));
    }

    #[test]
    fn test_timestamp_tie_breaks_on_index_then_host() {
        let candidates = vec![
            impression(100, 3, "blog.example"),
            impression(100, 7, "news.example"),
            impression(100, 7, "zine.example"),
        ];
        let winner = last_touch_winner(&candidates, 100);
        assert_eq!(winner, Some(&candidates[2]));
    }

    #[test]
    fn test_no_candidates_means_no_winner() {
        assert_eq!(last_touch_winner(&[], 100), None);

        let future_only = vec![impression(900, 0, "blog.example")];
        assert_eq!(last_touch_winner(&future_only, 100), None);
    }
}
