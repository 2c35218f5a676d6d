use crate::defaults::{ETHERNET_OVERHEAD, FIRST_FRAGMENT_MIN_SIZE, MTU_PAYLOAD};

/// Split a video frame of `frame_size` bytes in fragments.
///
/// Every fragment but the last one carries a full payload of 1500 bytes
/// plus 42 bytes of overhead. The last one carries what remains of the
/// frame (rounded up) plus the overhead. A frame always has at least one
/// fragment and the first fragment is at least 64 bytes long.
///
/// ```
/// # use xrsim_core::split_frame;
/// assert_eq!(split_frame(3_200.0), vec![1_542, 1_542, 242]);
/// assert_eq!(split_frame(1_500.0), vec![1_542]);
/// assert_eq!(split_frame(10.0), vec![64]);
/// ```
pub fn split_frame(frame_size: f64) -> Vec<u64> {
    let frame_size = if frame_size.is_finite() {
        frame_size.max(0.0)
    } else {
        0.0
    };
    let payload = MTU_PAYLOAD as f64;

    let fragments = ((frame_size / payload).ceil() as u64).max(1);
    let remaining = (frame_size - (fragments - 1) as f64 * payload).ceil().max(0.0) as u64;

    let mut sizes = Vec::with_capacity(fragments as usize);
    sizes.extend((1..fragments).map(|_| MTU_PAYLOAD + ETHERNET_OVERHEAD));
    sizes.push(remaining.min(MTU_PAYLOAD) + ETHERNET_OVERHEAD);

    if let Some(first) = sizes.first_mut() {
        *first = (*first).max(FIRST_FRAGMENT_MIN_SIZE);
    }

    sizes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_fragments() {
        assert_eq!(split_frame(3_200.0), vec![1_542, 1_542, 242]);
    }

    #[test]
    fn fractional_remainder_is_rounded_up() {
        assert_eq!(split_frame(1_500.2), vec![1_542, 43]);
    }

    #[test]
    fn exact_multiple_of_the_payload() {
        assert_eq!(split_frame(3_000.0), vec![1_542, 1_542]);
    }

    #[test]
    fn small_frame_gets_the_first_fragment_floor() {
        assert_eq!(split_frame(21.0), vec![64]);
        assert_eq!(split_frame(22.0), vec![64]);
        assert_eq!(split_frame(23.0), vec![65]);
    }

    #[test]
    fn empty_frame_still_has_one_fragment() {
        assert_eq!(split_frame(0.0), vec![64]);
        assert_eq!(split_frame(-5.0), vec![64]);
        assert_eq!(split_frame(f64::NAN), vec![64]);
    }

    #[test]
    fn large_frame() {
        let sizes = split_frame(62_500.0);

        assert_eq!(sizes.len(), 42);
        assert!(sizes[..41].iter().all(|size| *size == 1_542));
        assert_eq!(sizes[41], 1_000 + 42);
    }
}
