//! Time-ordered keys for appended children.
//!
//! A key is 20 characters: 8 encode the millisecond timestamp, 12 are random.
//! The alphabet is in ASCII order, so lexical key order follows creation
//! order. Keys generated within the same millisecond increment the random
//! part instead of drawing a new one.

use rand::Rng;

const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

/// Generator of monotonically increasing push keys
#[derive(Debug, Default)]
pub struct PushIdGenerator {
    last_millis: Option<u64>,
    last_random: [u8; 12],
}

impl PushIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next key for the current wall-clock time
    pub fn generate(&mut self) -> String {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        self.next_at(now)
    }

    /// Next key for a given timestamp. A clock that goes backwards is held at
    /// the last seen value so keys keep increasing.
    pub fn next_at(&mut self, now_millis: u64) -> String {
        let now = match self.last_millis {
            Some(last) => now_millis.max(last),
            None => now_millis,
        };

        if self.last_millis == Some(now) {
            self.increment_random();
        } else {
            let mut rng = rand::thread_rng();
            for slot in self.last_random.iter_mut() {
                *slot = rng.gen_range(0..64);
            }
        }
        self.last_millis = Some(now);

        let mut id = String::with_capacity(20);
        let mut time_chars = [0u8; 8];
        let mut remaining = now;
        for slot in time_chars.iter_mut().rev() {
            *slot = PUSH_CHARS[(remaining % 64) as usize];
            remaining /= 64;
        }
        id.extend(time_chars.iter().map(|&c| c as char));
        id.extend(self.last_random.iter().map(|&i| PUSH_CHARS[i as usize] as char));
        id
    }

    fn increment_random(&mut self) {
        for slot in self.last_random.iter_mut().rev() {
            if *slot == 63 {
                *slot = 0;
            } else {
                *slot += 1;
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_twenty_chars_from_alphabet() {
        let mut generator = PushIdGenerator::new();
        let key = generator.generate();
        assert_eq!(key.len(), 20);
        assert!(key.bytes().all(|b| PUSH_CHARS.contains(&b)));
    }

    #[test]
    fn test_same_millisecond_keys_increase() {
        let mut generator = PushIdGenerator::new();
        let keys: Vec<String> = (0..100).map(|_| generator.next_at(1_700_000_000_000)).collect();
        for pair in keys.windows(2) {
            assert!(pair[0] < pair[1], "{} !< {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_later_timestamp_sorts_after() {
        let mut generator = PushIdGenerator::new();
        let early = generator.next_at(1_000);
        let late = generator.next_at(2_000);
        assert!(early < late);
        assert_eq!(&early[..8], "------Ec");
    }

    #[test]
    fn test_clock_going_backwards_keeps_order() {
        let mut generator = PushIdGenerator::new();
        let first = generator.next_at(5_000);
        let second = generator.next_at(4_000);
        assert!(first < second);
    }
}
