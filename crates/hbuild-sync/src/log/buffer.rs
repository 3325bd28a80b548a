use std::collections::BTreeMap;

use hbuild_core::LogEvent;

/// Ordered, duplicate-free accumulation of log fragments for one package.
///
/// Events are keyed by id. The rendered text is the concatenation of every
/// fragment in ascending id order; nothing is inserted between fragments.
#[derive(Debug, Clone, Default)]
pub struct LogBuffer {
    events: BTreeMap<u64, LogEvent>,
    text: String,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a batch of events, in any order and with any overlap. Returns
    /// how many were new.
    pub fn merge<I>(&mut self, events: I) -> usize
    where
        I: IntoIterator<Item = LogEvent>,
    {
        let mut inserted = 0;
        let mut rebuild = false;
        for event in events {
            if self.events.contains_key(&event.id) {
                continue;
            }
            if self.cursor().is_some_and(|cursor| event.id < cursor) {
                rebuild = true;
            } else if !rebuild {
                self.text.push_str(&event.log);
            }
            self.events.insert(event.id, event);
            inserted += 1;
        }
        if rebuild {
            self.text = self.events.values().map(|e| e.log.as_str()).collect();
        }
        inserted
    }

    /// Merge a single event. Returns `false` if its id was already present.
    pub fn push(&mut self, event: LogEvent) -> bool {
        self.merge(std::iter::once(event)) == 1
    }

    pub fn render(&self) -> &str {
        &self.text
    }

    /// Highest id seen so far.
    pub fn cursor(&self) -> Option<u64> {
        self.events.keys().next_back().copied()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> impl Iterator<Item = &LogEvent> {
        self.events.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};

    fn ev(id: u64, log: &str) -> LogEvent {
        LogEvent {
            id,
            package: "libfoo".into(),
            stage: "build".into(),
            log: log.into(),
            created_at: String::new(),
        }
    }

    #[test]
    fn out_of_order_ids_render_sorted() {
        let mut buf = LogBuffer::new();
        buf.merge([ev(1, "Configuring...\n"), ev(3, "Done\n")]);
        assert_eq!(buf.render(), "Configuring...\nDone\n");

        assert_eq!(buf.merge([ev(2, "Building...\n")]), 1);
        assert_eq!(buf.render(), "Configuring...\nBuilding...\nDone\n");
        assert_eq!(buf.cursor(), Some(3));
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn duplicates_are_dropped_first_copy_wins() {
        let mut buf = LogBuffer::new();
        assert!(buf.push(ev(1, "a")));
        assert!(!buf.push(ev(1, "A")));
        assert_eq!(buf.merge([ev(2, "b"), ev(2, "B"), ev(1, "x")]), 1);
        assert_eq!(buf.render(), "ab");
    }

    #[test]
    fn fragments_are_not_newline_joined() {
        let mut buf = LogBuffer::new();
        buf.merge([ev(1, "compil"), ev(2, "ing foo.c"), ev(3, "\n")]);
        assert_eq!(buf.render(), "compiling foo.c\n");
    }

    #[test]
    fn empty_buffer_has_no_cursor() {
        let buf = LogBuffer::new();
        assert!(buf.is_empty());
        assert_eq!(buf.cursor(), None);
        assert_eq!(buf.render(), "");
    }

    #[test]
    fn snapshot_overlapping_stream_keeps_order() {
        let mut buf = LogBuffer::new();
        buf.merge([ev(4, "d"), ev(5, "e")]);
        // Full snapshot arrives after the stream already delivered 4 and 5.
        assert_eq!(
            buf.merge([ev(1, "a"), ev(2, "b"), ev(3, "c"), ev(4, "d"), ev(5, "e")]),
            3
        );
        assert_eq!(buf.render(), "abcde");
    }

    #[test]
    fn any_arrival_order_renders_the_same() {
        let mut rng = StdRng::seed_from_u64(0x6862_7569);
        let events: Vec<LogEvent> = (1..=60).map(|i| ev(i, &format!("{i};"))).collect();
        let expected: String = events.iter().map(|e| e.log.as_str()).collect();

        for _ in 0..50 {
            let mut arrivals = events.clone();
            // Re-deliver a random subset, as reconnects and snapshots do.
            for _ in 0..rng.gen_range(0..20) {
                let dup = events[rng.gen_range(0..events.len())].clone();
                arrivals.push(dup);
            }
            arrivals.shuffle(&mut rng);

            let mut buf = LogBuffer::new();
            for chunk in arrivals.chunks(rng.gen_range(1..8)) {
                buf.merge(chunk.iter().cloned());
            }
            assert_eq!(buf.render(), expected);
            assert_eq!(buf.len(), events.len());
            assert_eq!(buf.cursor(), Some(60));
        }
    }
}
