//! Class filter policy
//!
//! Resolved once at server startup from a policy string and never mutated
//! afterwards. The filter decides which detections qualify as alerts:
//! confidence strictly above the threshold AND class in the configured set.

use std::collections::BTreeSet;

use tracing::warn;

use crate::classify::Detection;
use crate::core::classes::{self, ANIMAL_CLASSES, COCO_CLASSES};
use crate::core::Verdict;

/// Immutable set of COCO class ids that qualify as alert-worthy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassFilter {
    classes: BTreeSet<u16>,
}

impl ClassFilter {
    /// Every COCO class
    pub fn all() -> Self {
        Self {
            classes: (0..COCO_CLASSES.len() as u16).collect(),
        }
    }

    /// The default animal subset
    pub fn animals() -> Self {
        Self {
            classes: ANIMAL_CLASSES
                .iter()
                .filter_map(|name| classes::class_id(name))
                .collect(),
        }
    }

    /// Resolve a policy string: `"all"`, `"animal"` (default), or a
    /// comma-separated list of COCO class names.
    ///
    /// Matching is case- and whitespace-insensitive. Unknown names are
    /// dropped with a warning; a list that resolves to nothing falls back
    /// to the animal subset rather than failing startup. Resolution is a
    /// pure function of the input, so resolving twice gives the same set.
    pub fn resolve(policy: &str) -> Self {
        let policy = policy.trim().to_lowercase();
        match policy.as_str() {
            "all" => return Self::all(),
            "" | "animal" => return Self::animals(),
            _ => {}
        }

        let mut set = BTreeSet::new();
        for name in policy.split(',') {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            match classes::class_id(name) {
                Some(id) => {
                    set.insert(id);
                }
                None => warn!("Unknown class name {name:?} in filter, ignoring"),
            }
        }

        if set.is_empty() {
            warn!("Class filter {policy:?} resolved to nothing, using animal subset");
            return Self::animals();
        }
        Self { classes: set }
    }

    /// Whether a class id is in the alert set
    pub fn contains(&self, class_id: u16) -> bool {
        self.classes.contains(&class_id)
    }

    /// Labels in the set, in class-id order (for startup logging)
    pub fn labels(&self) -> Vec<&'static str> {
        self.classes
            .iter()
            .filter_map(|id| classes::class_name(*id))
            .collect()
    }

    /// Turn a detection set into a verdict.
    ///
    /// Scans until the first detection with confidence strictly above the
    /// threshold whose class is in the set; order among equally qualifying
    /// detections is whatever the classifier produced, first found wins.
    pub fn verdict(&self, detections: &[Detection], confidence_threshold: f32) -> Verdict {
        for det in detections {
            if det.confidence > confidence_threshold && self.contains(det.class_id) {
                return Verdict::Detected(Some(det.label.clone()));
            }
        }
        Verdict::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_named_policies() {
        assert_eq!(ClassFilter::resolve("all"), ClassFilter::all());
        assert_eq!(ClassFilter::resolve("animal"), ClassFilter::animals());
        assert_eq!(ClassFilter::resolve("  ANIMAL "), ClassFilter::animals());
    }

    #[test]
    fn test_resolve_explicit_list() {
        let filter = ClassFilter::resolve("person, dog");
        assert!(filter.contains(0));
        assert!(filter.contains(16));
        assert!(!filter.contains(15)); // cat
        assert_eq!(filter.labels(), vec!["person", "dog"]);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let a = ClassFilter::resolve("person,dog,cat");
        let b = ClassFilter::resolve("person,dog,cat");
        assert_eq!(a, b);
    }

    #[test]
    fn test_unrecognized_list_falls_back_to_animals() {
        assert_eq!(
            ClassFilter::resolve("gryphon,basilisk"),
            ClassFilter::animals()
        );
        assert_eq!(ClassFilter::resolve(" , ,"), ClassFilter::animals());
    }

    #[test]
    fn test_verdict_threshold_is_strict() {
        let filter = ClassFilter::animals();
        let at_threshold = [Detection::new(16, 0.5)];
        assert_eq!(filter.verdict(&at_threshold, 0.5), Verdict::Ok);

        let just_above = [Detection::new(16, 0.500001)];
        assert_eq!(
            filter.verdict(&just_above, 0.5),
            Verdict::Detected(Some("dog".to_string()))
        );
    }

    #[test]
    fn test_verdict_no_detections() {
        assert_eq!(ClassFilter::animals().verdict(&[], 0.5), Verdict::Ok);
    }

    #[test]
    fn test_verdict_first_qualifying_wins() {
        let filter = ClassFilter::animals();
        let dets = [
            Detection::new(0, 0.99),  // person, not in set
            Detection::new(15, 0.3),  // cat, below threshold
            Detection::new(16, 0.9),  // dog, qualifies
            Detection::new(21, 0.95), // bear, qualifies but later
        ];
        assert_eq!(
            filter.verdict(&dets, 0.5),
            Verdict::Detected(Some("dog".to_string()))
        );
    }
}
