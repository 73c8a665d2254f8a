//! Sort IR: a column and a direction per entry.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub col: String,
    pub direction: Direction,
}

impl Sort {
    pub fn new(col: impl Into<String>, direction: Direction) -> Self {
        Sort {
            col: col.into(),
            direction,
        }
    }
}

/// Ordered, append-only accumulator of sorts for one operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sorts {
    sorts: Vec<Sort>,
}

impl Sorts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collect(sfs: impl IntoIterator<Item = SortFunc>) -> Self {
        let mut sorts = Sorts::new();
        for sf in sfs {
            sf(&mut sorts);
        }
        sorts
    }

    pub fn add(&mut self, sort: Sort) {
        self.sorts.push(sort);
    }

    pub fn all(&self) -> &[Sort] {
        &self.sorts
    }

    pub fn is_empty(&self) -> bool {
        self.sorts.is_empty()
    }
}

pub type SortFunc = Box<dyn FnOnce(&mut Sorts) + Send>;
