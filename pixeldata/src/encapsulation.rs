//! Frame demarcation within encapsulated pixel data.
//!
//! Encapsulated pixel data is a run of fragments behind an optional
//! basic offset table (BOT). With a BOT, frame `i` starts at the
//! fragment whose byte position matches `bot[i]`, making frame access
//! a direct seek. Without one, fragments are walked sequentially,
//! assuming one fragment per frame; a single-frame image may still
//! spread over several fragments, which are then concatenated.

use snafu::ensure;

use crate::{FragmentMismatchSnafu, FrameIndexOutOfRangeSnafu, Result};

/// The byte position of each fragment, measured like the basic offset
/// table does: from the first byte of the first fragment's item
/// header, each item carrying an 8-byte header.
fn fragment_positions(fragments: &[Vec<u8>]) -> Vec<u32> {
    let mut positions = Vec::with_capacity(fragments.len());
    let mut position = 0u32;
    for fragment in fragments {
        positions.push(position);
        position += 8 + fragment.len() as u32;
    }
    positions
}

/// Select the fragments making up the given frame.
pub fn frame_fragments<'a>(
    offset_table: &[u32],
    fragments: &'a [Vec<u8>],
    number_of_frames: u32,
    frame: u32,
) -> Result<Vec<&'a [u8]>> {
    ensure!(
        frame < number_of_frames,
        FrameIndexOutOfRangeSnafu {
            frame,
            frames: number_of_frames,
        }
    );

    if !offset_table.is_empty() {
        ensure!(
            offset_table.len() as u32 >= number_of_frames,
            FragmentMismatchSnafu {
                detail: format!(
                    "basic offset table has {} entries for {} frames",
                    offset_table.len(),
                    number_of_frames
                ),
            }
        );
        let positions = fragment_positions(fragments);
        let start_offset = offset_table[frame as usize];
        let start = positions
            .iter()
            .position(|&p| p == start_offset)
            .ok_or_else(|| {
                FragmentMismatchSnafu {
                    detail: format!(
                        "no fragment starts at basic offset table entry {start_offset}"
                    ),
                }
                .build()
            })?;
        let end = offset_table
            .get(frame as usize + 1)
            .map(|&next_offset| {
                positions
                    .iter()
                    .position(|&p| p == next_offset)
                    .unwrap_or(fragments.len())
            })
            .unwrap_or(fragments.len());
        return Ok(fragments[start..end].iter().map(Vec::as_slice).collect());
    }

    // empty BOT: a single frame owns every fragment,
    // otherwise walk assuming one fragment per frame
    if number_of_frames == 1 {
        return Ok(fragments.iter().map(Vec::as_slice).collect());
    }
    ensure!(
        fragments.len() as u32 == number_of_frames,
        FragmentMismatchSnafu {
            detail: format!(
                "{} fragments cannot be demarcated into {} frames without an offset table",
                fragments.len(),
                number_of_frames
            ),
        }
    );
    Ok(vec![fragments[frame as usize].as_slice()])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragments() -> Vec<Vec<u8>> {
        vec![vec![1; 10], vec![2; 6], vec![3; 4]]
    }

    #[test]
    fn bot_directed_lookup() {
        // positions: 0, 18, 32
        let bot = vec![0, 18, 32];
        let frags = fragments();
        let frame1 = frame_fragments(&bot, &frags, 3, 1).unwrap();
        assert_eq!(frame1, vec![&[2u8; 6][..]]);
        let frame2 = frame_fragments(&bot, &frags, 3, 2).unwrap();
        assert_eq!(frame2, vec![&[3u8; 4][..]]);
    }

    #[test]
    fn bot_frame_spanning_fragments() {
        // two frames, the first spanning two fragments
        let bot = vec![0, 32];
        let frags = fragments();
        let frame0 = frame_fragments(&bot, &frags, 2, 0).unwrap();
        assert_eq!(frame0.len(), 2);
        let frame1 = frame_fragments(&bot, &frags, 2, 1).unwrap();
        assert_eq!(frame1, vec![&[3u8; 4][..]]);
    }

    #[test]
    fn empty_bot_single_frame_concatenates() {
        let frags = fragments();
        let frame = frame_fragments(&[], &frags, 1, 0).unwrap();
        assert_eq!(frame.len(), 3);
    }

    #[test]
    fn empty_bot_walks_one_fragment_per_frame() {
        let frags = fragments();
        let frame = frame_fragments(&[], &frags, 3, 2).unwrap();
        assert_eq!(frame, vec![&[3u8; 4][..]]);
    }

    #[test]
    fn out_of_range_frame() {
        let frags = fragments();
        let err = frame_fragments(&[], &frags, 3, 3).unwrap_err();
        assert!(matches!(err, crate::Error::FrameIndexOutOfRange { .. }));
    }

    #[test]
    fn fragment_frame_mismatch_without_bot() {
        let frags = fragments();
        let err = frame_fragments(&[], &frags, 2, 0).unwrap_err();
        assert!(matches!(err, crate::Error::FragmentMismatch { .. }));
    }
}
