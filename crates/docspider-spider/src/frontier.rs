//! URL Frontier: a min-heap of pending work, plus lock-free visited/
//! in-queue/in-flight sets.
//!
//! Grounded on the teacher's concurrency idiom of pairing a short-lived
//! `std::sync::Mutex` around a plain data structure with `dashmap::DashMap`
//! for the high-churn membership sets (the same split `riptide-spider`
//! uses for deduplication bookkeeping) — since push/pop never hold the
//! lock across an `.await`, a blocking `Mutex` is simpler and cheaper than
//! `tokio::sync::Mutex` here.

use dashmap::DashSet;
use docspider_types::frontier_item::UrlItem;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::debug;

use crate::filter::UrlFilter;

/// Running counters exposed for observability, not correctness.
#[derive(Debug, Default)]
pub struct FrontierStats {
    pub added: AtomicUsize,
    pub popped: AtomicUsize,
    pub filtered: AtomicUsize,
}

pub struct UrlFrontier {
    heap: Mutex<BinaryHeap<Reverse<UrlItem>>>,
    visited: DashSet<String>,
    in_queue: DashSet<String>,
    in_flight: DashSet<String>,
    in_flight_count: AtomicUsize,
    max_depth: u32,
    max_pages: usize,
    stats: FrontierStats,
}

impl UrlFrontier {
    pub fn new(max_depth: u32, max_pages: usize) -> Self {
        Self {
            heap: Mutex::new(BinaryHeap::new()),
            visited: DashSet::new(),
            in_queue: DashSet::new(),
            in_flight: DashSet::new(),
            in_flight_count: AtomicUsize::new(0),
            max_depth,
            max_pages,
            stats: FrontierStats::default(),
        }
    }

    pub fn stats(&self) -> &FrontierStats {
        &self.stats
    }

    /// Normalizes `item.url` via `filter`, applies the reject ladder from
    /// §4.3, and pushes onto the heap under the mutex. Returns whether the
    /// item was accepted.
    pub fn push(&self, mut item: UrlItem, filter: &UrlFilter) -> bool {
        let normalized = match filter.normalize(&item.url) {
            Ok(url) => url,
            Err(_) => {
                self.stats.filtered.fetch_add(1, Ordering::Relaxed);
                return false;
            }
        };
        let key = normalized.as_str().to_string();
        item.url = key.clone();

        if item.depth > self.max_depth {
            self.stats.filtered.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        if self.stats.added.load(Ordering::Relaxed) >= self.max_pages {
            self.stats.filtered.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        if self.visited.contains(&key) || self.in_queue.contains(&key) {
            self.stats.filtered.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        if item.depth > 0 && !filter.is_relevant(&normalized) {
            self.stats.filtered.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        {
            let mut heap = self.heap.lock().expect("frontier heap mutex poisoned");
            if self.in_queue.contains(&key) {
                self.stats.filtered.fetch_add(1, Ordering::Relaxed);
                return false;
            }
            heap.push(Reverse(item));
            self.in_queue.insert(key.clone());
        }
        self.stats.added.fetch_add(1, Ordering::Relaxed);
        debug!(url = %key, "frontier: pushed");
        true
    }

    /// Non-blocking pop of the lowest-priority-value (highest-priority)
    /// item.
    pub fn pop(&self) -> Option<UrlItem> {
        let item = {
            let mut heap = self.heap.lock().expect("frontier heap mutex poisoned");
            heap.pop()?.0
        };
        self.in_queue.remove(&item.url);
        self.in_flight.insert(item.url.clone());
        self.in_flight_count.fetch_add(1, Ordering::Relaxed);
        self.stats.popped.fetch_add(1, Ordering::Relaxed);
        Some(item)
    }

    /// Idempotent: removes from in-flight and marks visited.
    pub fn mark_visited(&self, url: &str) {
        if self.in_flight.remove(url).is_some() {
            self.in_flight_count.fetch_sub(1, Ordering::Relaxed);
        }
        self.visited.insert(url.to_string());
    }

    /// Idempotent: removes from in-flight without marking visited (used
    /// on fetch failure, where a retry-by-revisit is not desired either,
    /// per the worker's single-attempt-per-item contract).
    pub fn mark_complete(&self, url: &str) {
        if self.in_flight.remove(url).is_some() {
            self.in_flight_count.fetch_sub(1, Ordering::Relaxed);
        }
    }

    pub fn has_work(&self) -> bool {
        let heap_nonempty = !self
            .heap
            .lock()
            .expect("frontier heap mutex poisoned")
            .is_empty();
        heap_nonempty || self.in_flight_count.load(Ordering::Relaxed) > 0
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight_count.load(Ordering::Relaxed)
    }

    /// Number of items currently sitting in the heap, not yet popped.
    /// Distinct from [`UrlFrontier::has_work`]: the completion monitor
    /// needs this separately to tell "idle" (nothing pending anywhere)
    /// apart from "stuck" (heap drained, but in-flight work remains).
    pub fn heap_len(&self) -> usize {
        self.heap.lock().expect("frontier heap mutex poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docspider_types::frontier_item::SourceTag;
    use url::Url;

    fn filter() -> UrlFilter {
        UrlFilter::new(&Url::parse("https://docs.example.com/").unwrap()).unwrap()
    }

    fn item(url: &str, depth: u32, source: SourceTag) -> UrlItem {
        UrlItem {
            url: url.to_string(),
            depth,
            parent_url: String::new(),
            source,
        }
    }

    #[test]
    fn push_accepts_seed_even_though_path_is_root() {
        let frontier = UrlFrontier::new(5, 20);
        let f = filter();
        let seed = UrlItem::seed("https://docs.example.com/".to_string());
        assert!(frontier.push(seed, &f));
    }

    #[test]
    fn push_rejects_url_over_max_depth() {
        let frontier = UrlFrontier::new(1, 20);
        let f = filter();
        let too_deep = item("https://docs.example.com/a/b", 2, SourceTag::Content);
        assert!(!frontier.push(too_deep, &f));
        assert_eq!(frontier.stats().filtered.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn push_rejects_past_max_pages_budget() {
        let frontier = UrlFrontier::new(5, 1);
        let f = filter();
        let seed = UrlItem::seed("https://docs.example.com/guide".to_string());
        assert!(frontier.push(seed, &f));
        let second = item("https://docs.example.com/other", 1, SourceTag::Content);
        assert!(!frontier.push(second, &f));
    }

    #[test]
    fn push_rejects_duplicate_url() {
        let frontier = UrlFrontier::new(5, 20);
        let f = filter();
        let make = || item("https://docs.example.com/guide", 1, SourceTag::Content);
        assert!(frontier.push(make(), &f));
        assert!(!frontier.push(make(), &f));
    }

    #[test]
    fn push_dedups_tracking_param_variant_of_an_already_queued_url() {
        // Same as push_rejects_duplicate_url, but the second push differs
        // only by a tracking query parameter the filter strips — `added`
        // must stay at 1 for the first push alone.
        let frontier = UrlFrontier::new(5, 20);
        let f = filter();
        assert!(frontier.push(
            item("https://docs.example.com/p?utm_source=g&v=1", 1, SourceTag::Content),
            &f
        ));
        assert!(!frontier.push(
            item("https://docs.example.com/p?v=1", 1, SourceTag::Content),
            &f
        ));
        assert_eq!(frontier.stats().added.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn push_dedups_trailing_slash_variant_of_a_visited_url() {
        let frontier = UrlFrontier::new(5, 20);
        let f = filter();
        let seed = UrlItem::seed("https://docs.example.com/guide".to_string());
        assert!(frontier.push(seed, &f));
        let popped = frontier.pop().unwrap();
        frontier.mark_visited(&popped.url);

        let slash_variant = item("https://docs.example.com/guide/", 1, SourceTag::Content);
        assert!(!frontier.push(slash_variant, &f));
    }

    #[test]
    fn push_rejects_non_relevant_nonzero_depth_url() {
        let frontier = UrlFrontier::new(5, 20);
        let f = filter();
        let offsite = item("https://evil.com/guide", 1, SourceTag::Content);
        assert!(!frontier.push(offsite, &f));
    }

    #[test]
    fn pop_returns_highest_priority_first() {
        // Seed discovers a sidebar link and a content link at the same
        // depth; sidebar (weight 0) must pop before content (weight 5)
        // before footer (weight 10), per the §4.3 priority ordering.
        let frontier = UrlFrontier::new(5, 20);
        let f = filter();
        frontier.push(item("https://docs.example.com/footer", 1, SourceTag::Footer), &f);
        frontier.push(item("https://docs.example.com/b", 1, SourceTag::Content), &f);
        frontier.push(item("https://docs.example.com/a", 1, SourceTag::Sidebar), &f);

        let first = frontier.pop().unwrap();
        assert_eq!(first.url, "https://docs.example.com/a");
        let second = frontier.pop().unwrap();
        assert_eq!(second.url, "https://docs.example.com/b");
        let third = frontier.pop().unwrap();
        assert_eq!(third.source, SourceTag::Footer);
    }

    #[test]
    fn mark_visited_and_mark_complete_are_idempotent() {
        let frontier = UrlFrontier::new(5, 20);
        let f = filter();
        frontier.push(UrlItem::seed("https://docs.example.com/guide".to_string()), &f);
        let popped = frontier.pop().unwrap();
        assert_eq!(frontier.in_flight_count(), 1);
        frontier.mark_visited(&popped.url);
        assert_eq!(frontier.in_flight_count(), 0);
        frontier.mark_visited(&popped.url);
        frontier.mark_complete(&popped.url);
        assert_eq!(frontier.in_flight_count(), 0);
    }

    #[test]
    fn has_work_reflects_heap_and_in_flight() {
        let frontier = UrlFrontier::new(5, 20);
        let f = filter();
        assert!(!frontier.has_work());
        frontier.push(UrlItem::seed("https://docs.example.com/guide".to_string()), &f);
        assert!(frontier.has_work());
        let popped = frontier.pop().unwrap();
        assert!(frontier.has_work()); // in-flight
        frontier.mark_complete(&popped.url);
        assert!(!frontier.has_work());
    }

    #[test]
    fn depth_cap_boundary_seed_discovers_chain() {
        // max_depth = 1: seed discovers /a (depth 1), /a discovers /b (depth 2, rejected).
        let frontier = UrlFrontier::new(1, 20);
        let f = filter();
        assert!(frontier.push(UrlItem::seed("https://docs.example.com/".to_string()), &f));
        assert!(frontier.push(item("https://docs.example.com/a", 1, SourceTag::Content), &f));
        assert!(!frontier.push(item("https://docs.example.com/b", 2, SourceTag::Content), &f));
        assert_eq!(frontier.stats().added.load(Ordering::Relaxed), 2);
        assert_eq!(frontier.stats().filtered.load(Ordering::Relaxed), 1);
    }
}
