pub mod analysis;
pub mod decode;
pub mod features;
#[cfg(test)]
pub(crate) mod testing;

pub use analysis::analyze;
pub use features::{AudioAmplitudeFrame, AudioAnalysis, FPS};
