/// Frame rate of the extracted envelope and of the rendered video.
pub const FPS: u32 = 24;

/// Sub-buckets per frame window.
pub const AMPLITUDE_POINTS: usize = 100;

/// One video frame's slice of the waveform envelope.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioAmplitudeFrame {
    pub index: usize,
    /// Start time in seconds (`index / fps`)
    pub time: f64,
    /// Mean absolute sample value per sub-bucket, `AMPLITUDE_POINTS` long
    pub amplitudes: Vec<f32>,
}

#[derive(Clone, Debug)]
pub struct AudioAnalysis {
    pub frames: Vec<AudioAmplitudeFrame>,
    pub duration: f64,
    pub sample_rate: u32,
    pub total_frame_count: usize,
    pub fps: u32,
}

impl AudioAnalysis {
    /// Length of the rendered frame sequence in seconds.
    pub fn frame_sequence_duration(&self) -> f64 {
        self.total_frame_count as f64 / self.fps as f64
    }
}
