//! Choosing between resolution candidates and discarding structures whose
//! bond length is out of line with the rest of the document.

use crate::model::molecule::RecognizedStructure;

/// Structures accepted on one page at one resolution candidate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolutionRun {
    pub resolution: u32,
    pub structures: Vec<RecognizedStructure>,
}

impl ResolutionRun {
    pub fn new(resolution: u32) -> Self {
        Self {
            resolution,
            structures: Vec::new(),
        }
    }

    /// Mean confidence of the accepted structures, `None` when there are none.
    pub fn mean_confidence(&self) -> Option<f64> {
        if self.structures.is_empty() {
            return None;
        }
        let total: f64 = self.structures.iter().map(|s| s.confidence).sum();
        Some(total / self.structures.len() as f64)
    }
}

/// The run with the highest mean confidence among those with structures.
///
/// Ties keep the earlier candidate.
pub fn best_run(runs: Vec<ResolutionRun>) -> Option<ResolutionRun> {
    let mut best: Option<(f64, ResolutionRun)> = None;
    for run in runs {
        let Some(mean) = run.mean_confidence() else {
            continue;
        };
        if best.as_ref().is_none_or(|(top, _)| mean > *top) {
            best = Some((mean, run));
        }
    }
    best.map(|(_, run)| run)
}

/// Open interval of accepted bond lengths.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BondLimits {
    pub min: f64,
    pub max: f64,
}

impl BondLimits {
    pub const UNBOUNDED: BondLimits = BondLimits {
        min: f64::MIN,
        max: f64::MAX,
    };

    pub fn admits(&self, bond_length: f64) -> bool {
        bond_length > self.min && bond_length < self.max
    }
}

/// Bond-length interval consistent with the most confident structure.
///
/// Starts at the most confident structure's bond length and repeatedly
/// widens to any length less than 5 pixels beyond the current bound, or of
/// a structure whose confidence is within 0.1 of the best. The final bounds
/// are widened by one pixel on each side.
pub fn find_limits_on_avg_bond<'a>(
    structures: impl IntoIterator<Item = &'a RecognizedStructure>,
) -> BondLimits {
    let samples: Vec<(f64, f64)> = structures
        .into_iter()
        .map(|s| (s.bond_length, s.confidence))
        .collect();
    let Some(&(seed, max_conf)) = samples
        .iter()
        .fold(None, |best: Option<&(f64, f64)>, s| match best {
            Some(b) if b.1 >= s.1 => Some(b),
            _ => Some(s),
        })
    else {
        return BondLimits::UNBOUNDED;
    };

    let (mut min, mut max) = (seed, seed);
    let mut changed = true;
    while changed {
        changed = false;
        for &(length, conf) in &samples {
            let trusted = conf > max_conf - 0.1;
            if length > max && (length - max < 5.0 || trusted) {
                max = length;
                changed = true;
            }
            if length < min && (min - length < 5.0 || trusted) {
                min = length;
                changed = true;
            }
        }
    }
    BondLimits {
        min: min - 1.0,
        max: max + 1.0,
    }
}

/// Drops structures whose bond length is an outlier across the document.
///
/// Applies only when at least `structure_count` structures were accepted in
/// total; returns the limits used.
pub fn filter_on_avg_bond(
    pages: &mut [Vec<RecognizedStructure>],
    structure_count: usize,
) -> BondLimits {
    let total: usize = pages.iter().map(Vec::len).sum();
    if total < structure_count {
        return BondLimits::UNBOUNDED;
    }
    let limits = find_limits_on_avg_bond(pages.iter().flatten());
    let mut dropped = 0usize;
    for page in pages.iter_mut() {
        let before = page.len();
        page.retain(|s| limits.admits(s.bond_length));
        dropped += before - page.len();
    }
    tracing::info!(min = limits.min, max = limits.max, dropped, "bond length limits applied");
    limits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::molecule::BoundingBox;

    fn make_structure(bond_length: f64, confidence: f64) -> RecognizedStructure {
        RecognizedStructure {
            structure: "C".to_string(),
            confidence,
            resolution: 150,
            page: 0,
            bbox: BoundingBox::default(),
            bond_length,
        }
    }

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn best_run_skips_empty_candidates() {
        let mut low = ResolutionRun::new(72);
        low.structures.push(make_structure(20.0, 0.2));
        let empty = ResolutionRun::new(150);
        let mut high = ResolutionRun::new(300);
        high.structures.extend([make_structure(20.0, 0.9), make_structure(20.0, 0.5)]);

        let best = best_run(vec![low, empty, high]).unwrap();
        assert_eq!(best.resolution, 300);
        assert!(approx_eq(best.mean_confidence().unwrap(), 0.7));
        assert!(best_run(vec![ResolutionRun::new(72)]).is_none());
    }

    #[test]
    fn limits_grow_in_small_steps_from_the_best_structure() {
        let structures = [
            make_structure(20.0, 1.0),
            make_structure(23.0, 0.1),
            make_structure(27.0, 0.1),
            make_structure(40.0, 0.1),
            make_structure(10.0, 0.95),
        ];
        let limits = find_limits_on_avg_bond(&structures);
        assert!(approx_eq(limits.min, 9.0));
        assert!(approx_eq(limits.max, 28.0));
        assert!(!limits.admits(40.0));
    }

    #[test]
    fn few_structures_are_not_filtered() {
        let mut pages = vec![vec![make_structure(20.0, 1.0), make_structure(90.0, 0.1)]];
        assert_eq!(filter_on_avg_bond(&mut pages, 20), BondLimits::UNBOUNDED);
        assert_eq!(pages[0].len(), 2);

        let limits = filter_on_avg_bond(&mut pages, 2);
        assert!(approx_eq(limits.max, 21.0));
        assert_eq!(pages[0].len(), 1);
    }
}
