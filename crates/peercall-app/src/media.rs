//! Local media without devices: tracks the requested state and logs it.

use peercall_signaling::LocalMedia;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Camera {
    #[default]
    Front,
    Back,
}

#[derive(Debug, Default)]
pub struct HeadlessMedia {
    capturing: bool,
    audio_enabled: bool,
    video_enabled: bool,
    camera: Camera,
}

impl HeadlessMedia {
    pub fn is_capturing(&self) -> bool {
        self.capturing
    }

    pub fn audio_enabled(&self) -> bool {
        self.audio_enabled
    }

    pub fn video_enabled(&self) -> bool {
        self.video_enabled
    }

    pub fn camera(&self) -> Camera {
        self.camera
    }
}

impl LocalMedia for HeadlessMedia {
    fn start_capture(&mut self) -> Result<(), String> {
        self.capturing = true;
        self.audio_enabled = true;
        self.video_enabled = true;
        info!(camera = ?self.camera, "Capture started");
        Ok(())
    }

    fn stop_capture(&mut self) {
        if self.capturing {
            info!("Capture stopped");
        }
        *self = Self {
            camera: self.camera,
            ..Self::default()
        };
    }

    fn set_audio_enabled(&mut self, enabled: bool) {
        self.audio_enabled = enabled;
        info!(enabled, "Microphone");
    }

    fn set_video_enabled(&mut self, enabled: bool) {
        self.video_enabled = enabled;
        info!(enabled, "Camera");
    }

    fn switch_camera(&mut self) {
        self.camera = match self.camera {
            Camera::Front => Camera::Back,
            Camera::Back => Camera::Front,
        };
        info!(camera = ?self.camera, "Switched camera");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_enables_both_tracks() {
        let mut media = HeadlessMedia::default();
        media.start_capture().unwrap();
        assert!(media.is_capturing());
        assert!(media.audio_enabled());
        assert!(media.video_enabled());
    }

    #[test]
    fn stop_resets_tracks_but_keeps_camera() {
        let mut media = HeadlessMedia::default();
        media.start_capture().unwrap();
        media.switch_camera();
        media.set_audio_enabled(false);
        media.stop_capture();

        assert!(!media.is_capturing());
        assert!(!media.audio_enabled());
        assert_eq!(media.camera(), Camera::Back);
    }

    #[test]
    fn switch_camera_toggles() {
        let mut media = HeadlessMedia::default();
        media.switch_camera();
        media.switch_camera();
        assert_eq!(media.camera(), Camera::Front);
    }
}
