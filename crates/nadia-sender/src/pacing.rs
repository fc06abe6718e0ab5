use rand::Rng;

const READING_WORDS_PER_MINUTE: f64 = 250.0;
const TYPING_CHARS_PER_WORD: f64 = 5.0;

/// Time to "read" the user's prior message before starting to reply, clamped
/// to a believable 0.5s–5s window regardless of message length.
pub fn reading_pause_secs(previous_message: &str) -> f64 {
    let words = previous_message.split_whitespace().count() as f64;
    let reading_time = (words / READING_WORDS_PER_MINUTE) * 60.0;
    reading_time.clamp(0.5, 5.0)
}

/// Time spent "typing" a single bubble, based on typing speed with ±20%
/// jitter so every bubble doesn't take a suspiciously identical duration.
pub fn typing_duration_secs(bubble: &str, typing_words_per_minute: f64) -> f64 {
    let chars = bubble.chars().count() as f64;
    let words = chars / TYPING_CHARS_PER_WORD;
    let base = (words / typing_words_per_minute) * 60.0;
    let jitter = rand::thread_rng().gen_range(0.8..=1.2);
    base * jitter
}

/// Pause between consecutive bubbles in the same batch.
pub fn inter_bubble_pause_secs() -> f64 {
    rand::thread_rng().gen_range(0.5..=2.0)
}

/// Initial "thinking" pause before the first bubble, used when there's no
/// prior user message to compute a reading pause from.
pub fn initial_thinking_pause_secs() -> f64 {
    rand::thread_rng().gen_range(1.0..=3.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_pause_is_clamped() {
        assert_eq!(reading_pause_secs(""), 0.5);
        let long = "word ".repeat(2000);
        assert_eq!(reading_pause_secs(&long), 5.0);
    }

    #[test]
    fn typing_duration_scales_with_length_and_speed() {
        let short = typing_duration_secs("hi", 60.0);
        let long = typing_duration_secs(&"word ".repeat(50), 60.0);
        assert!(long > short);
    }

    #[test]
    fn inter_bubble_pause_stays_in_bounds() {
        for _ in 0..50 {
            let p = inter_bubble_pause_secs();
            assert!((0.5..=2.0).contains(&p));
        }
    }

    #[test]
    fn initial_thinking_pause_stays_in_bounds() {
        for _ in 0..50 {
            let p = initial_thinking_pause_secs();
            assert!((1.0..=3.0).contains(&p));
        }
    }
}
