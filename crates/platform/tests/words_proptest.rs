//! Property-based tests for typed word slices.
//! Verifies slicing invariants hold for ALL lengths, not just fixed examples.

use platform::words::Words;

proptest::proptest! {
    /// split_at never loses or duplicates elements.
    #[test]
    fn split_preserves_elements(data in proptest::collection::vec(0u16.., 0..64), mid in 0usize..80) {
        let words = Words::U16(&data);
        let (head, tail) = words.split_at(mid);
        assert_eq!(head.len() + tail.len(), data.len());
        let rejoined: Vec<u32> = head.iter().chain(tail.iter()).collect();
        let original: Vec<u32> = data.iter().map(|&v| u32::from(v)).collect();
        assert_eq!(rejoined, original);
    }

    /// slice returns None exactly when the range leaves the slice.
    #[test]
    fn slice_bounds(data in proptest::collection::vec(0u8.., 0..32), start in 0usize..40, len in 0usize..40) {
        let words = Words::U8(&data);
        let end = start + len;
        let sliced = words.slice(start..end);
        assert_eq!(sliced.is_some(), end <= data.len());
        if let Some(s) = sliced {
            assert_eq!(s.len(), len);
        }
    }

    /// byte_len is element count times element size.
    #[test]
    fn byte_len_scales_with_element_size(data in proptest::collection::vec(0u32.., 0..32)) {
        assert_eq!(Words::U32(&data).byte_len(), data.len() * 4);
    }
}
