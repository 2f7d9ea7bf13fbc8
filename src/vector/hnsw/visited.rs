/// Generation-stamped visited set over dense node indexes. `clear()` bumps
/// the generation instead of zeroing, with a full reset on wraparound.
#[derive(Debug)]
pub struct VisitedSet {
    marks: Vec<u16>,
    generation: u16,
}

impl VisitedSet {
    pub fn new(capacity: usize) -> Self {
        VisitedSet {
            marks: vec![0u16; capacity],
            generation: 1,
        }
    }

    pub fn clear(&mut self) {
        if self.generation == u16::MAX {
            self.marks.fill(0);
            self.generation = 1;
        } else {
            self.generation += 1;
        }
    }

    pub fn ensure_capacity(&mut self, capacity: usize) {
        if capacity > self.marks.len() {
            self.marks.resize(capacity, 0);
        }
    }

    /// True if `id` was not yet visited in this generation
    #[inline]
    pub fn insert(&mut self, id: u32) -> bool {
        let slot = &mut self.marks[id as usize];
        if *slot == self.generation {
            false
        } else {
            *slot = self.generation;
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_forgets_visits() {
        let mut visited = VisitedSet::new(8);
        assert!(visited.insert(3));
        assert!(!visited.insert(3));
        visited.clear();
        assert!(visited.insert(3));
    }

    #[test]
    fn wraparound_resets_marks() {
        let mut visited = VisitedSet::new(4);
        for _ in 0..u16::MAX as usize {
            visited.clear();
        }
        assert_eq!(visited.generation, 1);
        assert!(visited.insert(2));
    }
}
