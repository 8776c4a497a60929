//! Capabilities the call core drives but does not implement.
//!
//! A [`NegotiationEngine`] wraps the peer connection (SDP generation, ICE,
//! codecs). [`LocalMedia`] wraps camera and microphone capture. Both are
//! supplied by the embedding application; the driver calls them from a
//! single task, in the order the state machine issued the operations.

use async_trait::async_trait;

use crate::protocol::{IceCandidate, SessionDescription};

/// The peer-connection side of a call.
///
/// Failures are plain strings; the state machine turns them into
/// `CallError::Negotiation`.
#[async_trait]
pub trait NegotiationEngine: Send + Sync {
    async fn create_offer(&self) -> Result<SessionDescription, String>;

    async fn create_answer(&self) -> Result<SessionDescription, String>;

    async fn set_local_description(&self, description: SessionDescription) -> Result<(), String>;

    async fn set_remote_description(&self, description: SessionDescription)
        -> Result<(), String>;

    async fn add_candidate(&self, candidate: IceCandidate) -> Result<(), String>;

    /// Tear down the current peer connection. Must tolerate being called
    /// when nothing is open.
    async fn close(&self);
}

/// Local capture devices.
pub trait LocalMedia: Send {
    fn start_capture(&mut self) -> Result<(), String>;

    fn stop_capture(&mut self);

    fn set_audio_enabled(&mut self, enabled: bool);

    fn set_video_enabled(&mut self, enabled: bool);

    fn switch_camera(&mut self);
}
