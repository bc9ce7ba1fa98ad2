use serde::{Deserialize, Serialize};

use crate::model::ids::TutorialId;

/// Per-user record of completed tutorials and the last one visited.
///
/// The completed set only ever grows: there is no uncomplete operation, and
/// `mark_completed` is idempotent. Insertion order is preserved for display
/// but carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    #[serde(default)]
    completed_tutorials: Vec<TutorialId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_visited: Option<TutorialId>,
}

impl Progress {
    #[must_use]
    pub fn completed_tutorials(&self) -> &[TutorialId] {
        &self.completed_tutorials
    }

    #[must_use]
    pub fn last_visited(&self) -> Option<TutorialId> {
        self.last_visited
    }

    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.completed_tutorials.len()
    }

    #[must_use]
    pub fn is_completed(&self, tutorial_id: TutorialId) -> bool {
        self.completed_tutorials.contains(&tutorial_id)
    }

    /// Adds the tutorial to the completed set.
    ///
    /// Returns true if the record changed; marking an already-completed
    /// tutorial is a no-op.
    pub fn mark_completed(&mut self, tutorial_id: TutorialId) -> bool {
        if self.is_completed(tutorial_id) {
            return false;
        }
        self.completed_tutorials.push(tutorial_id);
        true
    }

    /// Records the last tutorial the user navigated to, unconditionally.
    pub fn mark_visited(&mut self, tutorial_id: TutorialId) {
        self.last_visited = Some(tutorial_id);
    }

    /// Completion percentage over the given catalog size, rounded to the
    /// nearest integer. Returns 0 for an empty catalog rather than dividing
    /// by zero.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn percentage(&self, total_tutorials: usize) -> u8 {
        if total_tutorials == 0 {
            return 0;
        }
        let ratio = self.completed_count() as f64 / total_tutorials as f64;
        (ratio * 100.0).round() as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marking_completed_twice_is_idempotent() {
        let mut progress = Progress::default();
        assert!(progress.mark_completed(TutorialId::new(3)));
        assert!(!progress.mark_completed(TutorialId::new(3)));
        assert_eq!(progress.completed_tutorials(), &[TutorialId::new(3)]);
    }

    #[test]
    fn percentage_with_empty_catalog_is_zero() {
        let mut progress = Progress::default();
        progress.mark_completed(TutorialId::new(1));
        assert_eq!(progress.percentage(0), 0);
    }

    #[test]
    fn percentage_rounds_to_nearest_integer() {
        let mut progress = Progress::default();
        progress.mark_completed(TutorialId::new(1));
        // 1/6 -> 16.67 -> 17
        assert_eq!(progress.percentage(6), 17);
        progress.mark_completed(TutorialId::new(2));
        // 2/6 -> 33.33 -> 33
        assert_eq!(progress.percentage(6), 33);
        assert_eq!(progress.percentage(2), 100);
    }

    #[test]
    fn visited_overwrites_unconditionally() {
        let mut progress = Progress::default();
        progress.mark_visited(TutorialId::new(1));
        progress.mark_visited(TutorialId::new(5));
        assert_eq!(progress.last_visited(), Some(TutorialId::new(5)));
    }

    #[test]
    fn wire_shape_uses_camel_case_keys() {
        let mut progress = Progress::default();
        progress.mark_completed(TutorialId::new(2));
        progress.mark_visited(TutorialId::new(4));
        let json = serde_json::to_value(&progress).unwrap();
        assert_eq!(json["completedTutorials"][0], 2);
        assert_eq!(json["lastVisited"], 4);
    }
}
