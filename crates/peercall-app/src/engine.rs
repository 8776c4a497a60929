//! [`NegotiationEngine`] backed by webrtc-rs.
//!
//! A fresh `RTCPeerConnection` is created on the first operation of each
//! call and torn down by `close()`. Its callbacks report under the
//! generation of the operation that built it, so the controller can drop
//! anything a previous call's connection says late.

use std::sync::Arc;

use async_trait::async_trait;
use peercall_signaling::call::EngineObserver;
use peercall_signaling::protocol::{IceCandidate, SdpType, SessionDescription};
use peercall_signaling::NegotiationEngine;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::{APIBuilder, API};
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;

pub struct RtcEngine {
    api: API,
    rtc_config: RTCConfiguration,
    observer: EngineObserver,
    peer: Mutex<Option<Arc<RTCPeerConnection>>>,
}

impl RtcEngine {
    pub fn new(stun_servers: &[String], observer: EngineObserver) -> Result<Self, String> {
        let mut media_engine = MediaEngine::default();
        media_engine
            .register_default_codecs()
            .map_err(|e| format!("failed to register codecs: {e}"))?;

        let interceptors = register_default_interceptors(Registry::new(), &mut media_engine)
            .map_err(|e| format!("failed to register interceptors: {e}"))?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(interceptors)
            .build();

        let ice_servers = stun_servers
            .iter()
            .map(|url| RTCIceServer {
                urls: vec![url.clone()],
                ..Default::default()
            })
            .collect();

        Ok(Self {
            api,
            rtc_config: RTCConfiguration {
                ice_servers,
                ..Default::default()
            },
            observer,
            peer: Mutex::new(None),
        })
    }

    /// The live peer connection, created on first use.
    async fn peer(&self) -> Result<Arc<RTCPeerConnection>, String> {
        let mut slot = self.peer.lock().await;
        if let Some(pc) = slot.as_ref() {
            return Ok(Arc::clone(pc));
        }

        let pc = Arc::new(
            self.api
                .new_peer_connection(self.rtc_config.clone())
                .await
                .map_err(|e| format!("failed to create peer connection: {e}"))?,
        );

        for kind in [RTPCodecType::Audio, RTPCodecType::Video] {
            pc.add_transceiver_from_kind(kind, None)
                .await
                .map_err(|e| format!("failed to add {kind:?} transceiver: {e}"))?;
        }

        let generation = self.observer.generation();
        self.wire_callbacks(&pc, generation);
        info!(generation, "Peer connection created");

        *slot = Some(Arc::clone(&pc));
        Ok(pc)
    }

    fn wire_callbacks(&self, pc: &RTCPeerConnection, generation: u64) {
        let observer = self.observer.clone();
        pc.on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
            let observer = observer.clone();
            Box::pin(async move {
                // `None` marks the end of gathering.
                let Some(candidate) = candidate else { return };
                match candidate.to_json() {
                    Ok(init) => observer.on_ice_candidate(generation, from_rtc_candidate(init)),
                    Err(e) => warn!(error = %e, "Failed to serialize local candidate"),
                }
            })
        }));

        let observer = self.observer.clone();
        pc.on_peer_connection_state_change(Box::new(move |state: RTCPeerConnectionState| {
            let observer = observer.clone();
            Box::pin(async move {
                debug!(generation, state = ?state, "Peer connection state");
                if matches!(
                    state,
                    RTCPeerConnectionState::Failed | RTCPeerConnectionState::Closed
                ) {
                    observer.on_connection_closed(generation);
                }
            })
        }));
    }
}

#[async_trait]
impl NegotiationEngine for RtcEngine {
    async fn create_offer(&self) -> Result<SessionDescription, String> {
        let pc = self.peer().await?;
        let offer = pc.create_offer(None).await.map_err(|e| e.to_string())?;
        from_rtc_description(&offer)
    }

    async fn create_answer(&self) -> Result<SessionDescription, String> {
        let pc = self.peer().await?;
        let answer = pc.create_answer(None).await.map_err(|e| e.to_string())?;
        from_rtc_description(&answer)
    }

    async fn set_local_description(&self, description: SessionDescription) -> Result<(), String> {
        let pc = self.peer().await?;
        pc.set_local_description(to_rtc_description(description)?)
            .await
            .map_err(|e| e.to_string())
    }

    async fn set_remote_description(&self, description: SessionDescription) -> Result<(), String> {
        let pc = self.peer().await?;
        pc.set_remote_description(to_rtc_description(description)?)
            .await
            .map_err(|e| e.to_string())
    }

    async fn add_candidate(&self, candidate: IceCandidate) -> Result<(), String> {
        let pc = self.peer().await?;
        pc.add_ice_candidate(to_rtc_candidate(candidate))
            .await
            .map_err(|e| e.to_string())
    }

    async fn close(&self) {
        let Some(pc) = self.peer.lock().await.take() else {
            return;
        };
        if let Err(e) = pc.close().await {
            warn!(error = %e, "Error closing peer connection");
        }
        info!("Peer connection closed");
    }
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

fn to_rtc_description(description: SessionDescription) -> Result<RTCSessionDescription, String> {
    let result = match description.sdp_type {
        SdpType::Offer => RTCSessionDescription::offer(description.sdp),
        SdpType::Answer => RTCSessionDescription::answer(description.sdp),
    };
    result.map_err(|e| format!("invalid session description: {e}"))
}

fn from_rtc_description(description: &RTCSessionDescription) -> Result<SessionDescription, String> {
    let sdp_type = match description.sdp_type {
        RTCSdpType::Offer => SdpType::Offer,
        RTCSdpType::Answer => SdpType::Answer,
        other => return Err(format!("unsupported description type: {other:?}")),
    };
    Ok(SessionDescription {
        sdp: description.sdp.clone(),
        sdp_type,
    })
}

fn to_rtc_candidate(candidate: IceCandidate) -> RTCIceCandidateInit {
    RTCIceCandidateInit {
        candidate: candidate.sdp_candidate,
        sdp_mid: Some(candidate.sdp_mid),
        sdp_mline_index: u16::try_from(candidate.sdp_m_line_index).ok(),
        username_fragment: None,
    }
}

fn from_rtc_candidate(init: RTCIceCandidateInit) -> IceCandidate {
    IceCandidate {
        sdp_mid: init.sdp_mid.unwrap_or_default(),
        sdp_m_line_index: init.sdp_mline_index.map(i32::from).unwrap_or(0),
        sdp_candidate: init.candidate,
    }
}
