//! Scheduler for managing the crawl queue, page cap and pacing
//!
//! This module handles:
//! - FIFO queue management with queued/visited dedup
//! - Site scope filtering of dequeued URLs
//! - The per-job page cap
//! - The delay between consecutive requests
//!
//! Nothing here performs network I/O, so the whole policy is unit-testable.

use crate::url::{canonical_url, in_crawl_scope};
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// FIFO work queue with membership sets for queued and visited URLs
///
/// URLs are keyed by their canonical form, so spelling variants of the same
/// address (`https://ex.com` and `https://ex.com/`) collapse into one entry.
/// The visited set only ever grows.
#[derive(Debug, Default)]
pub struct CrawlQueue {
    pending: VecDeque<String>,
    queued: HashSet<String>,
    visited: HashSet<String>,
}

impl CrawlQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a URL unless it is already queued or visited
    ///
    /// Returns true if the URL was added.
    pub fn push(&mut self, url: &str) -> bool {
        let key = canonical_url(url);
        if key.is_empty() || self.visited.contains(&key) || self.queued.contains(&key) {
            return false;
        }

        self.queued.insert(key.clone());
        self.pending.push_back(key);
        true
    }

    /// Adds every URL of an iterator, returning how many were added
    pub fn extend<I, S>(&mut self, urls: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        urls.into_iter()
            .filter(|url| self.push(url.as_ref()))
            .count()
    }

    /// Pops the next URL that was never handed out before and marks it visited
    pub fn pop_unvisited(&mut self) -> Option<String> {
        while let Some(url) = self.pending.pop_front() {
            self.queued.remove(&url);
            if self.visited.insert(url.clone()) {
                return Some(url);
            }
        }
        None
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(&canonical_url(url))
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}

/// A URL handed out by the scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dequeued {
    /// In scope: fetch it
    Fetch(String),
    /// Outside the site or unparsable: skipped without fetching or counting
    OutOfScope(String),
}

/// Drives the crawl queue under the page cap and the inter-request delay
#[derive(Debug)]
pub struct Scheduler {
    queue: CrawlQueue,
    base_host: String,
    max_pages: u32,
    delay: Duration,
    crawled: u32,
}

impl Scheduler {
    /// Creates a scheduler seeded with the initial URL set
    ///
    /// # Arguments
    ///
    /// * `base_host` - Host of the crawl target; it and its subdomains are in scope
    /// * `seeds` - Initial queue contents, in order
    /// * `max_pages` - Maximum number of pages attempted
    /// * `delay` - Pause between consecutive requests
    pub fn new<I, S>(base_host: &str, seeds: I, max_pages: u32, delay: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut queue = CrawlQueue::new();
        queue.extend(seeds);

        Self {
            queue,
            base_host: base_host.to_string(),
            max_pages,
            delay,
            crawled: 0,
        }
    }

    /// Returns true while there is work left and the cap is not reached
    pub fn has_work(&self) -> bool {
        !self.queue.is_empty() && !self.cap_reached()
    }

    pub fn cap_reached(&self) -> bool {
        self.crawled >= self.max_pages
    }

    /// Pops the next unvisited URL and applies the scope check
    pub fn next_url(&mut self) -> Option<Dequeued> {
        let url = self.queue.pop_unvisited()?;
        if in_crawl_scope(&url, &self.base_host) {
            Some(Dequeued::Fetch(url))
        } else {
            Some(Dequeued::OutOfScope(url))
        }
    }

    /// Counts one attempted page, whatever its outcome, and returns the new total
    pub fn record_crawled(&mut self) -> u32 {
        self.crawled += 1;
        self.crawled
    }

    /// Feeds links discovered on a page back into the queue
    pub fn enqueue_discovered<I, S>(&mut self, urls: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.queue.extend(urls)
    }

    /// Sleeps the inter-request delay if another request will follow
    ///
    /// Returns false if the sleep was interrupted by cancellation.
    pub async fn pace(&self, cancel: &CancellationToken) -> bool {
        if !self.has_work() || self.delay.is_zero() {
            return !cancel.is_cancelled();
        }

        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(self.delay) => true,
        }
    }

    pub fn crawled(&self) -> u32 {
        self.crawled
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn queue(&self) -> &CrawlQueue {
        &self.queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_queue_fifo_and_dedup() {
        let mut queue = CrawlQueue::new();
        assert!(queue.push("https://example.com/a"));
        assert!(queue.push("https://example.com/b"));
        assert!(!queue.push("https://example.com/a"));
        assert!(!queue.push("https://example.com/a#section"));
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.pop_unvisited().as_deref(), Some("https://example.com/a"));
        assert_eq!(queue.pop_unvisited().as_deref(), Some("https://example.com/b"));
        assert_eq!(queue.pop_unvisited(), None);
    }

    #[test]
    fn test_visited_urls_are_never_requeued() {
        let mut queue = CrawlQueue::new();
        queue.push("https://example.com/");
        queue.pop_unvisited();

        assert!(queue.is_visited("https://example.com"));
        assert!(!queue.push("https://example.com/"));
        assert!(!queue.push("https://example.com"));
        assert!(queue.is_empty());
        assert_eq!(queue.visited_count(), 1);
    }

    #[test]
    fn test_extend_counts_new_urls() {
        let mut queue = CrawlQueue::new();
        let added = queue.extend(vec![
            "https://example.com/a",
            "https://example.com/a",
            "https://example.com/b",
        ]);
        assert_eq!(added, 2);
    }

    #[test]
    fn test_scope_check_on_dequeue() {
        let mut scheduler = Scheduler::new(
            "example.com",
            vec![
                "https://other.org/",
                "https://blog.example.com/post",
                "not a url",
            ],
            10,
            Duration::ZERO,
        );

        assert_eq!(
            scheduler.next_url(),
            Some(Dequeued::OutOfScope("https://other.org/".to_string()))
        );
        assert_eq!(
            scheduler.next_url(),
            Some(Dequeued::Fetch("https://blog.example.com/post".to_string()))
        );
        assert!(matches!(scheduler.next_url(), Some(Dequeued::OutOfScope(_))));
        assert_eq!(scheduler.next_url(), None);
        assert_eq!(scheduler.crawled(), 0);
    }

    #[test]
    fn test_page_cap() {
        let seeds: Vec<String> = (0..5).map(|i| format!("https://example.com/{}", i)).collect();
        let mut scheduler = Scheduler::new("example.com", seeds, 2, Duration::ZERO);

        let mut fetched = 0;
        while scheduler.has_work() {
            if let Some(Dequeued::Fetch(_)) = scheduler.next_url() {
                scheduler.record_crawled();
                fetched += 1;
            }
        }

        assert_eq!(fetched, 2);
        assert!(scheduler.cap_reached());
        assert_eq!(scheduler.queue_len(), 3);
    }

    #[test]
    fn test_discovered_links_skip_visited() {
        let mut scheduler =
            Scheduler::new("example.com", vec!["https://example.com/"], 10, Duration::ZERO);
        scheduler.next_url();
        scheduler.record_crawled();

        let added = scheduler.enqueue_discovered(vec![
            "https://example.com/",
            "https://example.com/about",
            "https://example.com/about",
        ]);
        assert_eq!(added, 1);
        assert_eq!(scheduler.queue_len(), 1);
    }

    #[tokio::test]
    async fn test_pace_skips_sleep_without_more_work() {
        let scheduler = Scheduler::new(
            "example.com",
            Vec::<String>::new(),
            10,
            Duration::from_secs(30),
        );

        let started = Instant::now();
        assert!(scheduler.pace(&CancellationToken::new()).await);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_pace_sleeps_between_requests() {
        let scheduler = Scheduler::new(
            "example.com",
            vec!["https://example.com/next"],
            10,
            Duration::from_millis(50),
        );

        let started = Instant::now();
        assert!(scheduler.pace(&CancellationToken::new()).await);
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_pace_interrupted_by_cancel() {
        let scheduler = Scheduler::new(
            "example.com",
            vec!["https://example.com/next"],
            10,
            Duration::from_secs(30),
        );

        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        assert!(!scheduler.pace(&token).await);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
