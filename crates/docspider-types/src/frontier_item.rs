use serde::{Deserialize, Serialize};

/// Label assigned to a discovered link according to the DOM region it was
/// found in, used to prioritize topical navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTag {
    Sidebar,
    Content,
    Footer,
}

impl SourceTag {
    /// `source_weight` from §4.3: `sidebar=0, content=5, footer=10`.
    pub fn weight(self) -> u32 {
        match self {
            SourceTag::Sidebar => 0,
            SourceTag::Content => 5,
            SourceTag::Footer => 10,
        }
    }
}

impl Default for SourceTag {
    fn default() -> Self {
        SourceTag::Content
    }
}

/// An entry in the frontier. Created on push, consumed on pop, never
/// mutated afterward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlItem {
    pub url: String,
    pub depth: u32,
    pub parent_url: String,
    pub source: SourceTag,
}

impl UrlItem {
    pub fn seed(url: String) -> Self {
        Self {
            url,
            depth: 0,
            parent_url: String::new(),
            source: SourceTag::Content,
        }
    }

    /// `priority = source_weight + depth`; lower is served first.
    pub fn priority(&self) -> u32 {
        self.source.weight() + self.depth
    }
}

/// Ordering for the frontier's min-heap: by priority, then by depth, with
/// `std::cmp::Reverse` applied by the caller to turn `BinaryHeap`'s max-heap
/// into a min-heap.
impl Ord for UrlItem {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.priority()
            .cmp(&other.priority())
            .then_with(|| self.depth.cmp(&other.depth))
    }
}

impl PartialOrd for UrlItem {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_orders_sidebar_before_content_before_footer() {
        let sidebar = UrlItem {
            url: "a".into(),
            depth: 3,
            parent_url: String::new(),
            source: SourceTag::Sidebar,
        };
        let content = UrlItem {
            url: "b".into(),
            depth: 0,
            parent_url: String::new(),
            source: SourceTag::Content,
        };
        let footer = UrlItem {
            url: "c".into(),
            depth: 0,
            parent_url: String::new(),
            source: SourceTag::Footer,
        };
        assert!(sidebar.priority() < content.priority());
        assert!(content.priority() < footer.priority());
    }
}
