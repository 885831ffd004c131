/// Row of the per-report slice
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FirstRow {
    pub id: String,
    pub level: u32,
}

/// Row of the per-object slice; `id` joins to a [`FirstRow`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SecondRow {
    pub id: String,
    pub object_name: String,
}

/// Append-only, insertion-ordered sequence of rows of one kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slice<T> {
    rows: Vec<T>,
}

impl<T> Slice<T> {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn append(&mut self, row: T) {
        self.rows.push(row);
    }

    /// Move all rows of `other` to the end of this slice
    pub fn extend(&mut self, other: Slice<T>) {
        self.rows.extend(other.rows);
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<T> {
        self.rows
    }
}

impl<T> Default for Slice<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Both slices produced from the same set of archives
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Slices {
    pub first: Slice<FirstRow>,
    pub second: Slice<SecondRow>,
}

impl Slices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, other: Slices) {
        self.first.extend(other.first);
        self.second.extend(other.second);
    }

    pub fn into_parts(self) -> (Slice<FirstRow>, Slice<SecondRow>) {
        (self.first, self.second)
    }
}
