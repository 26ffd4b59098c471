use std::{collections::VecDeque, time::Duration};
use tracing::debug;

use crate::{
    audio::Track,
    error::{PlaybackError, PlaybackResult},
};

/// Tracks waiting to be played in one session, strictly first in, first out.
///
/// The track that is currently playing is never stored here; the
/// coordinator keeps it in its own slot.
#[derive(Debug, Default)]
pub struct SessionQueue {
    items: VecDeque<Track>,
}

impl SessionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Agrega un track al final de la cola
    pub fn enqueue(&mut self, track: Track) {
        debug!("➕ Agregado a la cola: {}", track.title);
        self.items.push_back(track);
    }

    /// Removes and returns the earliest queued track.
    pub fn dequeue_next(&mut self) -> PlaybackResult<Track> {
        self.items.pop_front().ok_or(PlaybackError::EmptyQueue)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Returns up to `n` upcoming tracks in playback order.
    pub fn peek_upcoming(&self, n: usize) -> Vec<Track> {
        self.items.iter().take(n).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of the known track lengths; streams and unknown lengths count as zero.
    pub fn total_length(&self) -> Duration {
        self.items.iter().filter_map(|track| track.length).sum()
    }

    /// Obtiene una página específica de la cola (1-based)
    pub fn page(&self, page: usize, per_page: usize) -> QueuePage {
        let per_page = per_page.max(1);
        let total_items = self.items.len();
        let total_pages = if total_items == 0 {
            1
        } else {
            total_items.div_ceil(per_page)
        };
        let current_page = page.clamp(1, total_pages);
        let start = (current_page - 1) * per_page;

        QueuePage {
            items: self.items.iter().skip(start).take(per_page).cloned().collect(),
            first_position: start + 1,
            current_page,
            total_pages,
            total_items,
            total_length: self.total_length(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueuePage {
    pub items: Vec<Track>,
    /// 1-based queue position of `items[0]`.
    pub first_position: usize,
    pub current_page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    /// Known length of the whole queue, not just this page.
    pub total_length: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn track(n: usize) -> Track {
        Track::new(format!("Track {n}"), format!("enc:{n}"))
    }

    #[test]
    fn test_dequeue_follows_insertion_order() {
        let mut queue = SessionQueue::new();
        for n in 0..20 {
            queue.enqueue(track(n));
        }

        for n in 0..20 {
            assert_eq!(queue.dequeue_next(), Ok(track(n)));
        }
        assert_eq!(queue.dequeue_next(), Err(PlaybackError::EmptyQueue));
    }

    #[test]
    fn test_interleaved_enqueue_and_dequeue_stay_fifo() {
        let mut queue = SessionQueue::new();
        queue.enqueue(track(1));
        queue.enqueue(track(2));
        assert_eq!(queue.dequeue_next(), Ok(track(1)));
        queue.enqueue(track(3));
        assert_eq!(queue.dequeue_next(), Ok(track(2)));
        assert_eq!(queue.dequeue_next(), Ok(track(3)));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut queue = SessionQueue::new();
        queue.enqueue(track(1));
        queue.clear();
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.peek_upcoming(5), Vec::new());
    }

    #[test]
    fn test_peek_clamps_and_does_not_mutate() {
        let mut queue = SessionQueue::new();
        queue.enqueue(track(1));
        queue.enqueue(track(2));

        assert_eq!(queue.peek_upcoming(0), Vec::new());
        assert_eq!(queue.peek_upcoming(1), vec![track(1)]);
        assert_eq!(queue.peek_upcoming(10), vec![track(1), track(2)]);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_total_length_skips_unknown() {
        let mut queue = SessionQueue::new();
        queue.enqueue(track(1).with_length(Duration::from_secs(60)));
        queue.enqueue(track(2));
        queue.enqueue(track(3).with_length(Duration::from_secs(30)));
        assert_eq!(queue.total_length(), Duration::from_secs(90));
        assert_eq!(queue.page(2, 1).total_length, Duration::from_secs(90));
    }

    #[test]
    fn test_page_bounds() {
        let mut queue = SessionQueue::new();
        for n in 1..=23 {
            queue.enqueue(track(n));
        }

        let page = queue.page(3, 10);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.first_position, 21);
        assert_eq!(page.items, vec![track(21), track(22), track(23)]);

        // Out of range pages are clamped instead of coming back empty.
        assert_eq!(queue.page(0, 10).current_page, 1);
        assert_eq!(queue.page(99, 10).current_page, 3);
    }

    #[test]
    fn test_page_of_empty_queue() {
        let page = SessionQueue::new().page(1, 10);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.total_items, 0);
        assert!(page.items.is_empty());
    }
}
