//! Lazy frame iteration over a signal
//!
//! Frames start at multiples of the hop size. Only full windows are produced,
//! except that a signal shorter than one window yields a single short frame
//! (zero-padded later by the spectrum stage).

/// One analysis frame: a borrowed slice of the signal
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    /// Frame index (0-based)
    pub index: usize,

    /// Start sample index within the signal
    pub start_sample: usize,

    /// Start time in seconds
    pub time: f32,

    /// Samples covered by the frame (at most `window_size`)
    pub samples: &'a [f32],
}

/// Forward-only iterator over frames
#[derive(Debug, Clone)]
pub struct Frames<'a> {
    samples: &'a [f32],
    sample_rate: u32,
    window_size: usize,
    hop_size: usize,
    next_index: usize,
    total: usize,
}

/// Number of frames a signal of `len` samples produces
pub fn frame_count(len: usize, window_size: usize, hop_size: usize) -> usize {
    if len == 0 || hop_size == 0 {
        0
    } else if len < window_size {
        1
    } else {
        (len - window_size) / hop_size + 1
    }
}

impl<'a> Frames<'a> {
    /// Create a frame iterator
    pub fn new(samples: &'a [f32], sample_rate: u32, window_size: usize, hop_size: usize) -> Self {
        Self {
            samples,
            sample_rate,
            window_size,
            hop_size,
            next_index: 0,
            total: frame_count(samples.len(), window_size, hop_size),
        }
    }

    /// Total number of frames this iterator yields
    pub fn total(&self) -> usize {
        self.total
    }
}

impl<'a> Iterator for Frames<'a> {
    type Item = Frame<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_index >= self.total {
            return None;
        }

        let index = self.next_index;
        self.next_index += 1;

        let start = index * self.hop_size;
        let end = (start + self.window_size).min(self.samples.len());

        Some(Frame {
            index,
            start_sample: start,
            time: start as f32 / self.sample_rate as f32,
            samples: &self.samples[start..end],
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total - self.next_index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Frames<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_count() {
        assert_eq!(frame_count(0, 2048, 512), 0);
        assert_eq!(frame_count(100, 2048, 512), 1);
        assert_eq!(frame_count(2048, 2048, 512), 1);
        assert_eq!(frame_count(2560, 2048, 512), 2);
        assert_eq!(frame_count(44100, 2048, 512), 83);
    }

    #[test]
    fn test_frames_are_time_ordered() {
        let samples = vec![0.0f32; 8000];
        let frames: Vec<Frame> = Frames::new(&samples, 8000, 1024, 256).collect();
        assert_eq!(frames.len(), frame_count(8000, 1024, 256));
        for pair in frames.windows(2) {
            assert!(pair[1].time > pair[0].time);
            assert_eq!(pair[1].start_sample - pair[0].start_sample, 256);
        }
        assert!(frames.iter().all(|f| f.samples.len() == 1024));
        assert!((frames[4].time - 1024.0 / 8000.0).abs() < 1e-6);
    }

    #[test]
    fn test_short_signal_single_frame() {
        let samples = vec![0.5f32; 300];
        let frames: Vec<Frame> = Frames::new(&samples, 44100, 2048, 512).collect();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].samples.len(), 300);
    }
}
