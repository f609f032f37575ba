//! Position mapping through document changes.
//!
//! A [`StepMap`] describes what one step did to positions: a list of
//! replaced ranges `(start, old_size, new_size)`. A [`Mapping`] chains step
//! maps so a position recorded before a series of edits can be carried to
//! the equivalent position after all of them.
//!
//! Mirrors pair a map with the map of its inverse being re-applied (as in a
//! rebase). Positions that fall inside a range deleted by the first map are
//! then recovered exactly instead of collapsing to the range boundary.

use std::ops::BitOr;

/// Which side of inserted content a position sticks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    /// Stay before content inserted exactly at the position (-1).
    Before,
    /// Move after content inserted exactly at the position (+1).
    After,
}

/// Deletion flags reported by a mapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deleted {
    /// The token before the position was deleted.
    pub before: bool,
    /// The token after the position was deleted.
    pub after: bool,
    /// A range spanning both sides of the position was deleted.
    pub across: bool,
    /// The token on the biased side was deleted.
    pub side: bool,
}

impl BitOr for Deleted {
    type Output = Deleted;

    fn bitor(self, rhs: Deleted) -> Deleted {
        Deleted {
            before: self.before || rhs.before,
            after: self.after || rhs.after,
            across: self.across || rhs.across,
            side: self.side || rhs.side,
        }
    }
}

/// Where a position sat inside a replaced range, to recover it through a
/// mirrored map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recover {
    pub index: usize,
    pub offset: usize,
}

/// Mapped position plus what happened around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapResult {
    pub pos: usize,
    del: Deleted,
    recover: Option<Recover>,
}

impl MapResult {
    /// The content on the biased side of the position was deleted.
    pub fn deleted(&self) -> bool {
        self.del.side
    }

    pub fn deleted_before(&self) -> bool {
        self.del.before || self.del.across
    }

    pub fn deleted_after(&self) -> bool {
        self.del.after || self.del.across
    }

    pub fn deleted_across(&self) -> bool {
        self.del.across
    }

    pub fn recover(&self) -> Option<Recover> {
        self.recover
    }
}

/// Anything positions can be mapped through.
pub trait Mappable {
    fn map_result(&self, pos: usize, bias: Bias) -> MapResult;

    fn map(&self, pos: usize, bias: Bias) -> usize {
        self.map_result(pos, bias).pos
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MapRange {
    start: usize,
    old_size: usize,
    new_size: usize,
}

/// Position changes made by a single step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepMap {
    ranges: Vec<MapRange>,
    inverted: bool,
}

impl StepMap {
    /// Map from `(start, old_size, new_size)` triples, sorted by start.
    pub fn new(ranges: impl IntoIterator<Item = (usize, usize, usize)>) -> Self {
        Self {
            ranges: ranges
                .into_iter()
                .map(|(start, old_size, new_size)| MapRange { start, old_size, new_size })
                .collect(),
            inverted: false,
        }
    }

    /// The identity map.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The map of the inverse step.
    pub fn invert(&self) -> StepMap {
        StepMap { ranges: self.ranges.clone(), inverted: !self.inverted }
    }

    fn sizes(&self, range: &MapRange) -> (usize, usize) {
        if self.inverted {
            (range.new_size, range.old_size)
        } else {
            (range.old_size, range.new_size)
        }
    }

    /// Recover the position described by `value`, which must come from a
    /// map this one mirrors.
    pub fn recover(&self, value: Recover) -> usize {
        let mut diff: isize = 0;
        if !self.inverted {
            for range in self.ranges.iter().take(value.index) {
                diff += range.new_size as isize - range.old_size as isize;
            }
        }
        let start = self.ranges.get(value.index).map_or(0, |r| r.start);
        clamp(start as isize + diff + value.offset as isize)
    }

    /// Call `f(old_start, old_end, new_start, new_end)` for each changed range.
    pub fn for_each(&self, mut f: impl FnMut(usize, usize, usize, usize)) {
        let mut diff: isize = 0;
        for range in &self.ranges {
            let (old_size, new_size) = self.sizes(range);
            let start = range.start as isize;
            let old_start = if self.inverted { start - diff } else { start };
            let new_start = if self.inverted { start } else { start + diff };
            f(
                clamp(old_start),
                clamp(old_start + old_size as isize),
                clamp(new_start),
                clamp(new_start + new_size as isize),
            );
            diff += new_size as isize - old_size as isize;
        }
    }
}

impl Mappable for StepMap {
    fn map_result(&self, pos: usize, bias: Bias) -> MapResult {
        let mut diff: isize = 0;
        let ipos = pos as isize;
        for (i, range) in self.ranges.iter().enumerate() {
            let start = range.start as isize - if self.inverted { diff } else { 0 };
            if start > ipos {
                break;
            }
            let (old_size, new_size) = self.sizes(range);
            let end = start + old_size as isize;
            if ipos <= end {
                let side = if old_size == 0 {
                    bias
                } else if ipos == start {
                    Bias::Before
                } else if ipos == end {
                    Bias::After
                } else {
                    bias
                };
                let result = start + diff + if side == Bias::Before { 0 } else { new_size as isize };
                let anchor = if bias == Bias::Before { start } else { end };
                let recover = if ipos == anchor {
                    None
                } else {
                    Some(Recover { index: i, offset: (ipos - start) as usize })
                };
                let mut del = if ipos == start {
                    Deleted { after: true, ..Deleted::default() }
                } else if ipos == end {
                    Deleted { before: true, ..Deleted::default() }
                } else {
                    Deleted { across: true, ..Deleted::default() }
                };
                del.side = if bias == Bias::Before { ipos != start } else { ipos != end };
                return MapResult { pos: clamp(result), del, recover };
            }
            diff += new_size as isize - old_size as isize;
        }
        MapResult { pos: clamp(ipos + diff), del: Deleted::default(), recover: None }
    }
}

fn clamp(pos: isize) -> usize {
    pos.max(0) as usize
}

/// A chain of step maps with optional mirror pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    maps: Vec<StepMap>,
    mirrors: Vec<(usize, usize)>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_maps(maps: Vec<StepMap>) -> Self {
        Self { maps, mirrors: Vec::new() }
    }

    pub fn maps(&self) -> &[StepMap] {
        &self.maps
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    /// Append a map. `mirrors` names an earlier map this one is the inverse of.
    pub fn append_map(&mut self, map: StepMap, mirrors: Option<usize>) {
        self.maps.push(map);
        if let Some(other) = mirrors {
            self.set_mirror(self.maps.len() - 1, other);
        }
    }

    /// Append all maps of another mapping, keeping its internal mirrors.
    pub fn append_mapping(&mut self, other: &Mapping) {
        let base = self.maps.len();
        for (i, map) in other.maps.iter().enumerate() {
            let mirror = other.get_mirror(i).filter(|&m| m < i).map(|m| base + m);
            self.append_map(map.clone(), mirror);
        }
    }

    pub fn set_mirror(&mut self, n: usize, m: usize) {
        self.mirrors.push((n, m));
    }

    pub fn get_mirror(&self, n: usize) -> Option<usize> {
        self.mirrors.iter().rev().find_map(|&(a, b)| {
            if a == n {
                Some(b)
            } else if b == n {
                Some(a)
            } else {
                None
            }
        })
    }

    /// The mapping made of maps `from..`, mirrors re-indexed.
    pub fn slice(&self, from: usize) -> Mapping {
        let from = from.min(self.maps.len());
        let mirrors = self
            .mirrors
            .iter()
            .filter(|(a, b)| *a >= from && *b >= from)
            .map(|(a, b)| (a - from, b - from))
            .collect();
        Mapping { maps: self.maps[from..].to_vec(), mirrors }
    }
}

impl Mappable for Mapping {
    fn map_result(&self, pos: usize, bias: Bias) -> MapResult {
        let mut pos = pos;
        let mut del = Deleted::default();
        let mut i = 0;
        while i < self.maps.len() {
            let result = self.maps[i].map_result(pos, bias);
            if let Some(recover) = result.recover {
                if let Some(corr) = self.get_mirror(i).filter(|&c| c > i) {
                    pos = self.maps[corr].recover(recover);
                    i = corr + 1;
                    continue;
                }
            }
            del = del | result.del;
            pos = result.pos;
            i += 1;
        }
        MapResult { pos, del, recover: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // StepMap
    // ========================================================================

    #[test]
    fn test_insertion_bias() {
        let map = StepMap::new([(2, 0, 4)]);
        assert_eq!(map.map(2, Bias::Before), 2);
        assert_eq!(map.map(2, Bias::After), 6);
        assert_eq!(map.map(1, Bias::After), 1);
        assert_eq!(map.map(5, Bias::Before), 9);
    }

    #[test]
    fn test_deletion_flags() {
        let map = StepMap::new([(2, 4, 0)]);
        let inside = map.map_result(4, Bias::After);
        assert_eq!(inside.pos, 2);
        assert!(inside.deleted());
        assert!(inside.deleted_across());
        let at_start = map.map_result(2, Bias::After);
        assert!(at_start.deleted_after());
        assert!(!at_start.deleted_before());
        let at_end = map.map_result(6, Bias::After);
        assert!(at_end.deleted_before());
        assert!(!at_end.deleted());
        assert_eq!(map.map(10, Bias::After), 6);
    }

    #[test]
    fn test_inverted_map() {
        let map = StepMap::new([(2, 0, 4)]).invert();
        assert_eq!(map.map(4, Bias::After), 2);
        assert_eq!(map.map(8, Bias::After), 4);
    }

    #[test]
    fn test_for_each_ranges() {
        let map = StepMap::new([(1, 2, 0), (5, 0, 3)]);
        let mut seen = Vec::new();
        map.for_each(|a, b, c, d| seen.push((a, b, c, d)));
        assert_eq!(seen, vec![(1, 3, 1, 1), (5, 5, 3, 6)]);
    }

    // ========================================================================
    // Mapping
    // ========================================================================

    #[test]
    fn test_composition_equals_sequential_mapping() {
        let maps = [
            StepMap::new([(3, 0, 2)]),
            StepMap::new([(1, 3, 1)]),
            StepMap::new([(0, 0, 5), (7, 2, 0)]),
        ];
        for split in 0..=maps.len() {
            let mut m1 = Mapping::from_maps(maps[..split].to_vec());
            let m2 = Mapping::from_maps(maps[split..].to_vec());
            let before = m1.clone();
            m1.append_mapping(&m2);
            for pos in 0..12 {
                for bias in [Bias::Before, Bias::After] {
                    assert_eq!(
                        m1.map(pos, bias),
                        m2.map(before.map(pos, bias), bias),
                        "pos {pos} split {split}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_mirror_recovers_deleted_position() {
        // Delete 2..6, then re-insert the same content: positions inside the
        // deleted range come back where they were.
        let delete = StepMap::new([(2, 4, 0)]);
        let mut mapping = Mapping::new();
        mapping.append_map(delete.clone(), None);
        mapping.append_map(delete.invert(), Some(0));
        assert_eq!(mapping.map(4, Bias::After), 4);
        assert_eq!(mapping.map(3, Bias::Before), 3);

        let plain = Mapping::from_maps(vec![delete.clone(), delete.invert()]);
        assert_eq!(plain.map(4, Bias::After), 6);
    }

    #[test]
    fn test_slice_reindexes_mirrors() {
        let mut mapping = Mapping::new();
        mapping.append_map(StepMap::new([(0, 0, 1)]), None);
        mapping.append_map(StepMap::new([(2, 4, 0)]), None);
        mapping.append_map(StepMap::new([(2, 4, 0)]).invert(), Some(1));
        let tail = mapping.slice(1);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail.get_mirror(0), Some(1));
        assert_eq!(tail.map(4, Bias::After), 4);
    }

    #[test]
    fn test_never_underflows() {
        let map = StepMap::new([(0, 5, 0)]).invert();
        let mapping = Mapping::from_maps(vec![map, StepMap::new([(0, 3, 0)])]);
        assert_eq!(mapping.map(0, Bias::Before), 0);
    }
}
