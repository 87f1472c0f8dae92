//! Target selection among eligible candidates

use std::cmp::Reverse;

use crate::candidate::Candidate;
use crate::config::{SelectionMode, SnipeConfig};

/// Orders candidates and picks the target for a tick
#[derive(Debug, Clone, Copy)]
pub struct TargetSelector {
    mode: SelectionMode,
    prioritize_vips: bool,
}

impl TargetSelector {
    pub fn new(mode: SelectionMode, prioritize_vips: bool) -> Self {
        Self {
            mode,
            prioritize_vips,
        }
    }

    pub fn from_config(config: &SnipeConfig) -> Self {
        Self::new(config.mode, config.prioritize_vips)
    }

    /// Sort in place.
    ///
    /// Both sorts are stable; the VIP sort runs last so it takes precedence
    /// while priority order is kept within each group.
    pub fn rank(&self, candidates: &mut [Candidate]) {
        if self.mode == SelectionMode::Priority {
            candidates.sort_by_key(|c| Reverse(c.priority));
        }
        if self.prioritize_vips {
            candidates.sort_by_key(|c| Reverse(c.is_vip));
        }
    }

    /// Head of an already ranked list
    pub fn select<'a>(&self, ranked: &'a [Candidate]) -> Option<&'a Candidate> {
        ranked.first()
    }

    /// Split a ranked list into candidates above `threshold` and the rest,
    /// both keeping rank order
    pub fn split_by_priority(
        ranked: &[Candidate],
        threshold: i32,
    ) -> (Vec<&Candidate>, Vec<&Candidate>) {
        ranked.iter().partition(|c| c.priority > threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, priority: i32, is_vip: bool) -> Candidate {
        Candidate {
            species_id: 1,
            name: name.to_string(),
            latitude: 0.0,
            longitude: 0.0,
            encounter_id: None,
            spawn_point_id: None,
            expires_at: 0,
            iv: None,
            distance: 0.0,
            priority,
            is_vip,
        }
    }

    fn priorities(list: &[Candidate]) -> Vec<i32> {
        list.iter().map(|c| c.priority).collect()
    }

    #[test]
    fn test_priority_mode_sorts_descending() {
        let mut list = vec![
            candidate("a", 5, false),
            candidate("b", 20, false),
            candidate("c", 1, false),
        ];
        TargetSelector::new(SelectionMode::Priority, false).rank(&mut list);
        assert_eq!(priorities(&list), vec![20, 5, 1]);
    }

    #[test]
    fn test_vip_takes_precedence() {
        let mut list = vec![
            candidate("a", 5, false),
            candidate("b", 20, false),
            candidate("vip", 1, true),
        ];
        let selector = TargetSelector::new(SelectionMode::Priority, true);
        selector.rank(&mut list);

        assert_eq!(selector.select(&list).unwrap().name, "vip");
        assert_eq!(priorities(&list), vec![1, 20, 5]);
    }

    #[test]
    fn test_feed_mode_keeps_order() {
        let mut list = vec![
            candidate("a", 5, false),
            candidate("b", 20, false),
            candidate("c", 1, false),
        ];
        TargetSelector::new(SelectionMode::Feed, false).rank(&mut list);
        assert_eq!(priorities(&list), vec![5, 20, 1]);
    }

    #[test]
    fn test_ties_are_stable() {
        let mut list = vec![
            candidate("first", 10, false),
            candidate("second", 10, false),
            candidate("third", 30, false),
        ];
        TargetSelector::new(SelectionMode::Priority, true).rank(&mut list);
        let names: Vec<_> = list.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["third", "first", "second"]);
    }

    #[test]
    fn test_empty_list_selects_nothing() {
        let selector = TargetSelector::new(SelectionMode::Priority, true);
        let mut list: Vec<Candidate> = Vec::new();
        selector.rank(&mut list);
        assert!(selector.select(&list).is_none());
    }

    #[test]
    fn test_split_by_priority() {
        let list = vec![
            candidate("a", 500, false),
            candidate("b", 400, false),
            candidate("c", 450, false),
        ];
        let (high, low) = TargetSelector::split_by_priority(&list, 400);
        let high: Vec<_> = high.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(high, vec!["a", "c"]);
        assert_eq!(low.len(), 1);
    }
}
