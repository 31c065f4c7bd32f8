//! Position mapping through steps.

/// Which side a position sticks to when content is inserted exactly at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Assoc {
    /// Stay before inserted content.
    Left,
    /// Move after inserted content.
    #[default]
    Right,
}

const DEL_BEFORE: u8 = 1;
const DEL_AFTER: u8 = 2;
const DEL_ACROSS: u8 = 4;
const DEL_SIDE: u8 = 8;

/// A mapped position plus information about what was deleted around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapResult {
    /// The mapped position.
    pub pos: usize,
    del_info: u8,
}

impl MapResult {
    /// The content on the side the position associates with was deleted.
    pub fn deleted(&self) -> bool {
        self.del_info & DEL_SIDE > 0
    }

    /// The token before the position was deleted.
    pub fn deleted_before(&self) -> bool {
        self.del_info & (DEL_BEFORE | DEL_ACROSS) > 0
    }

    /// The token after the position was deleted.
    pub fn deleted_after(&self) -> bool {
        self.del_info & (DEL_AFTER | DEL_ACROSS) > 0
    }

    /// The position was inside a deleted range.
    pub fn deleted_across(&self) -> bool {
        self.del_info & DEL_ACROSS > 0
    }
}

/// Position map of a single step: a list of `(start, old_size, new_size)` ranges, sorted
/// by start, in the coordinates of the document before the step.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StepMap {
    ranges: Vec<(usize, usize, usize)>,
}

impl StepMap {
    /// Create a map from replaced ranges.
    pub fn new(ranges: Vec<(usize, usize, usize)>) -> Self {
        Self { ranges }
    }

    /// The identity map.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Map a position, sticking right on insertions.
    pub fn map(&self, pos: usize) -> usize {
        self.map_result(pos, Assoc::Right).pos
    }

    /// Map a position with explicit association and deletion info.
    pub fn map_result(&self, pos: usize, assoc: Assoc) -> MapResult {
        let mut diff: isize = 0;
        for &(start, old_size, new_size) in &self.ranges {
            if start > pos {
                break;
            }
            let end = start + old_size;
            if pos <= end {
                let side = if old_size == 0 {
                    assoc
                } else if pos == start {
                    Assoc::Left
                } else if pos == end {
                    Assoc::Right
                } else {
                    assoc
                };
                let base = start as isize + diff;
                let mapped = if side == Assoc::Left {
                    base
                } else {
                    base + new_size as isize
                };
                let mut del_info = if pos == start {
                    DEL_AFTER
                } else if pos == end {
                    DEL_BEFORE
                } else {
                    DEL_ACROSS
                };
                let on_side = match assoc {
                    Assoc::Left => pos != start,
                    Assoc::Right => pos != end,
                };
                if on_side {
                    del_info |= DEL_SIDE;
                }
                return MapResult {
                    pos: mapped.max(0) as usize,
                    del_info,
                };
            }
            diff += new_size as isize - old_size as isize;
        }
        MapResult {
            pos: (pos as isize + diff).max(0) as usize,
            del_info: 0,
        }
    }

    /// Call `f(old_start, old_end, new_start, new_end)` for each changed range.
    pub fn for_each(&self, mut f: impl FnMut(usize, usize, usize, usize)) {
        let mut diff: isize = 0;
        for &(start, old_size, new_size) in &self.ranges {
            let new_start = (start as isize + diff) as usize;
            f(start, start + old_size, new_start, new_start + new_size);
            diff += new_size as isize - old_size as isize;
        }
    }
}

/// A sequence of step maps.
#[derive(Debug, Clone, Default)]
pub struct Mapping {
    maps: Vec<StepMap>,
}

impl Mapping {
    /// Empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// The step maps, in order.
    pub fn maps(&self) -> &[StepMap] {
        &self.maps
    }

    /// Append a step map.
    pub fn append_map(&mut self, map: StepMap) {
        self.maps.push(map);
    }

    /// Mapping through the maps from index `from` on.
    pub fn slice(&self, from: usize) -> Mapping {
        Mapping {
            maps: self.maps[from.min(self.maps.len())..].to_vec(),
        }
    }

    /// Map a position, sticking right on insertions.
    pub fn map(&self, pos: usize) -> usize {
        self.map_result(pos, Assoc::Right).pos
    }

    /// Map a position with explicit association.
    pub fn map_with(&self, pos: usize, assoc: Assoc) -> usize {
        self.map_result(pos, assoc).pos
    }

    /// Map a position, accumulating deletion info across all maps.
    pub fn map_result(&self, pos: usize, assoc: Assoc) -> MapResult {
        let mut del_info = 0;
        let mut pos = pos;
        for map in &self.maps {
            let result = map.map_result(pos, assoc);
            del_info |= result.del_info;
            pos = result.pos;
        }
        MapResult { pos, del_info }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_through_deletion() {
        let map = StepMap::new(vec![(2, 4, 0)]);
        assert_eq!(map.map(1), 1);
        assert_eq!(map.map(3), 2);
        assert_eq!(map.map(8), 4);
        let inside = map.map_result(3, Assoc::Right);
        assert!(inside.deleted());
        assert!(inside.deleted_across());
        let at_start = map.map_result(2, Assoc::Left);
        assert!(!at_start.deleted());
        assert!(at_start.deleted_after());
    }

    #[test]
    fn test_insertion_assoc() {
        let map = StepMap::new(vec![(2, 0, 3)]);
        assert_eq!(map.map_result(2, Assoc::Left).pos, 2);
        assert_eq!(map.map_result(2, Assoc::Right).pos, 5);
    }

    #[test]
    fn test_mapping_slice() {
        let mut mapping = Mapping::new();
        mapping.append_map(StepMap::new(vec![(0, 0, 2)]));
        mapping.append_map(StepMap::new(vec![(4, 2, 0)]));
        // 3 -> 5 after the insertion, then lands inside the deleted 4..6.
        assert_eq!(mapping.map(3), 4);
        assert!(mapping.map_result(3, Assoc::Right).deleted());
        assert_eq!(mapping.slice(1).map(3), 3);
        assert_eq!(mapping.slice(1).map(7), 5);
    }
}
