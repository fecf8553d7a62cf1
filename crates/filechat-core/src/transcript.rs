use crate::state::Turn;

/// Ordered, append-only conversation log.
///
/// Insertion order is display order. Only the submission controller appends;
/// everything else gets a read-only view.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Turn> {
        self.turns.iter()
    }

    /// Copy of the current contents, used as the `history` of the next request
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.clone()
    }

    pub(crate) fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Turn;
    type IntoIter = std::slice::Iter<'a, Turn>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
