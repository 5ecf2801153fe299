//! Track navigation within a post.
//!
//! Pure functions: the caller issues the `play()` for the resolved index.

/// Index of the track after `current`, or `None` at the last track.
pub fn resolve_next(current: usize, total_tracks: usize) -> Option<usize> {
    current.checked_add(1).filter(|next| *next < total_tracks)
}

/// Index of the track before `current`, or `None` at the first track.
pub fn resolve_previous(current: usize) -> Option<usize> {
    current.checked_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_stops_at_last_track() {
        assert_eq!(resolve_next(0, 2), Some(1));
        assert_eq!(resolve_next(1, 2), None);
        assert_eq!(resolve_next(0, 1), None);
        assert_eq!(resolve_next(0, 0), None);
    }

    #[test]
    fn previous_stops_at_first_track() {
        assert_eq!(resolve_previous(0), None);
        assert_eq!(resolve_previous(1), Some(0));
        assert_eq!(resolve_previous(7), Some(6));
    }

    #[test]
    fn every_interior_index_moves_by_one() {
        let total = 5;
        for index in 0..total {
            let expected_next = (index + 1 < total).then_some(index + 1);
            let expected_prev = (index > 0).then(|| index - 1);
            assert_eq!(resolve_next(index, total), expected_next);
            assert_eq!(resolve_previous(index), expected_prev);
        }
    }

    #[test]
    fn next_does_not_overflow() {
        assert_eq!(resolve_next(usize::MAX, usize::MAX), None);
    }
}
