/// Tracks how many consecutive iterations produced the same exemplar set.
#[derive(Debug)]
pub struct ExemplarWindow {
    window: usize,
    previous: Vec<usize>,
    stable_for: usize,
}

impl ExemplarWindow {
    pub fn new(window: usize) -> Self {
        assert!(window > 0);
        Self {
            window,
            previous: Vec::new(),
            stable_for: 0,
        }
    }

    /// Records the exemplars of the latest iteration. Returns true once a
    /// non-empty exemplar set has been unchanged for the whole window.
    pub fn observe(&mut self, exemplars: Vec<usize>) -> bool {
        if self.stable_for > 0 && exemplars == self.previous {
            self.stable_for += 1;
        } else {
            self.previous = exemplars;
            self.stable_for = 1;
        }

        self.stable_for >= self.window && !self.previous.is_empty()
    }

    pub fn stable_for(&self) -> usize {
        self.stable_for
    }
}
