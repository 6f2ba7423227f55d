//! Page-number pagination shared by all feed and profile views.

pub fn total_pages(total_items: usize, size: usize) -> usize {
    let size = size.max(1);
    if total_items == 0 {
        1
    } else {
        total_items.div_ceil(size)
    }
}

/// A resolved page request. Out-of-range numbers are clamped to the
/// nearest valid page rather than rejected, so stale pagination links
/// keep working after rows are deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    number: usize,
    size: usize,
}

impl PageRequest {
    pub fn clamped(requested: Option<usize>, total_items: usize, size: usize) -> Self {
        let size = size.max(1);
        let last = total_pages(total_items, size);
        let number = requested.unwrap_or(1).clamp(1, last);
        Self { number, size }
    }

    pub fn number(&self) -> usize {
        self.number
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn offset(&self) -> usize {
        (self.number - 1) * self.size
    }
}

#[derive(Debug, Clone)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub number: usize,
    pub size: usize,
    pub total_items: usize,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total_items: usize) -> Self {
        Self {
            items,
            number: request.number(),
            size: request.size(),
            total_items,
        }
    }

    pub fn total_pages(&self) -> usize {
        total_pages(self.total_items, self.size)
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.total_pages()
    }

    pub fn previous_number(&self) -> usize {
        self.number.saturating_sub(1).max(1)
    }

    pub fn next_number(&self) -> usize {
        (self.number + 1).min(self.total_pages())
    }
}
