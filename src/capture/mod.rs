//! Capture adapters turn a user action into a payload ready for dispatch:
//! a validated file, or a recorded voice clip.

pub mod audio;
pub mod command_device;
pub mod file;

pub use audio::{
    AudioAdapter, AudioClip, CaptureDevice, CaptureError, CaptureStream, RecorderState,
};
pub use command_device::CommandCaptureDevice;
pub use file::{FileRejection, ValidatedFile};
