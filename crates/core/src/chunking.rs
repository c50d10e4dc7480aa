use crate::models::Chunk;
use sha2::{Digest, Sha256};

pub const DEFAULT_CHUNK_WORDS: usize = 400;

pub fn chunk_words(text: &str, size: usize) -> Vec<String> {
    let words = text.split_whitespace().collect::<Vec<_>>();
    words
        .chunks(size.max(1))
        .map(|window| window.join(" "))
        .collect()
}

pub fn build_chunks(text: &str, size: usize) -> Vec<Chunk> {
    chunk_words(text, size)
        .into_iter()
        .enumerate()
        .map(|(chunk_index, text)| Chunk {
            chunk_id: make_chunk_id(chunk_index, &text),
            chunk_index,
            text,
        })
        .collect()
}

fn make_chunk_id(index: usize, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update((index as u64).to_le_bytes());
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_words(count: usize) -> String {
        (0..count)
            .map(|index| format!("w{index}"))
            .collect::<Vec<_>>()
            .join(" \n ")
    }

    #[test]
    fn empty_text_has_no_chunks() {
        assert!(chunk_words("", 400).is_empty());
        assert!(chunk_words(" \n\t ", 3).is_empty());
    }

    #[test]
    fn windows_have_fixed_size_and_short_tail() {
        for (count, size) in [(10, 3), (9, 3), (1, 400), (401, 400), (7, 1)] {
            let chunks = chunk_words(&numbered_words(count), size);
            assert_eq!(chunks.len(), count.div_ceil(size), "count={count} size={size}");

            let tail = chunks.last().map_or(0, |chunk| chunk.split(' ').count());
            let expected_tail = if count % size == 0 { size } else { count % size };
            assert_eq!(tail, expected_tail);
        }
    }

    #[test]
    fn rejoined_chunks_rebuild_collapsed_text() {
        let text = "  alpha\tbeta\n\ngamma  مرحبا   delta ";
        for size in 1..=6 {
            let rebuilt = chunk_words(text, size).join(" ");
            assert_eq!(rebuilt, "alpha beta gamma مرحبا delta");
        }
    }

    #[test]
    fn zero_size_behaves_like_one() {
        assert_eq!(chunk_words("a b", 0), vec!["a", "b"]);
    }

    #[test]
    fn chunk_ids_are_stable_and_distinct() {
        let first = build_chunks("a b c d", 2);
        let second = build_chunks("a b c d", 2);
        assert_eq!(first, second);
        assert_eq!(first[1].chunk_index, 1);
        assert_eq!(first[1].text, "c d");
        assert_ne!(first[0].chunk_id, first[1].chunk_id);
    }
}
