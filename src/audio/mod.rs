pub mod artifact;
pub mod capture;
pub mod device;

pub use artifact::{artifact_path, write_artifact};
pub use capture::AudioCapture;
pub use device::{open_device, AudioDevice, AudioFrame, CaptureConfig, DeviceError, SilenceDevice};
