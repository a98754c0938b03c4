/// Estimated reading time in whole minutes, assuming 200 words per minute.
/// Rounded up, so any non-empty content reads as at least one minute.
pub fn estimate_read_time(content: &str) -> i64 {
    let words = content.split_whitespace().count();
    words.div_ceil(200) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_content_is_one_minute() {
        assert_eq!(estimate_read_time("hello world"), 1);
    }

    #[test]
    fn rounds_up_to_next_minute() {
        let content = std::iter::repeat("word")
            .take(450)
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(estimate_read_time(&content), 3);
    }

    #[test]
    fn exact_multiple_does_not_round_up() {
        let content = std::iter::repeat("word")
            .take(400)
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(estimate_read_time(&content), 2);
    }

    #[test]
    fn empty_content_reads_as_zero() {
        // Validation rejects empty content before this is ever consulted.
        assert_eq!(estimate_read_time(""), 0);
    }
}
