use uuid::Uuid;

/// A disposable object attached to a report, identified by a random UUID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafObject {
    name: Uuid,
}

impl LeafObject {
    pub fn new() -> Self {
        Self {
            name: Uuid::new_v4(),
        }
    }

    pub fn name(&self) -> Uuid {
        self.name
    }
}

impl Default for LeafObject {
    fn default() -> Self {
        Self::new()
    }
}
