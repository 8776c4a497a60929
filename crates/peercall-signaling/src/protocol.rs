//! Relay wire protocol.
//!
//! One JSON object per WebSocket text frame:
//!
//! ```json
//! {"type": "create_offer", "name": "alice", "target": "bob",
//!  "data": {"sdp": "v=0...", "sdpType": "offer"}}
//! ```
//!
//! The shape of `data` depends on `type`, so decoding happens in two steps:
//! the frame is first read as a [`WireEnvelope`] with an untyped `data`
//! value, then the payload schema is chosen from the message type.

use peercall_common::RelayError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `call_response` status sent when the callee is not registered.
pub const USER_NOT_ONLINE: &str = "user is not online";

/// `call_response` status sent when the callee is registered.
pub const USER_READY: &str = "user is ready for call";

// ---------------------------------------------------------------------------
// Message types
// ---------------------------------------------------------------------------

/// The `type` tag of an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    StoreUser,
    StartCall,
    CallResponse,
    CreateOffer,
    OfferReceived,
    CreateAnswer,
    AnswerReceived,
    IceCandidate,
}

impl MessageType {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::StoreUser => "store_user",
            MessageType::StartCall => "start_call",
            MessageType::CallResponse => "call_response",
            MessageType::CreateOffer => "create_offer",
            MessageType::OfferReceived => "offer_received",
            MessageType::CreateAnswer => "create_answer",
            MessageType::AnswerReceived => "answer_received",
            MessageType::IceCandidate => "ice_candidate",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Role of a session description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    #[serde(alias = "OFFER")]
    Offer,
    #[serde(alias = "ANSWER")]
    Answer,
}

/// A session description produced by the negotiation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    pub sdp: String,
    #[serde(rename = "sdpType")]
    pub sdp_type: SdpType,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp: sdp.into(),
            sdp_type: SdpType::Offer,
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp: sdp.into(),
            sdp_type: SdpType::Answer,
        }
    }
}

/// Inbound form of a descriptor: the role key may be `sdpType` or `type`,
/// or missing entirely.
#[derive(Deserialize)]
struct DescriptorRecord {
    sdp: String,
    #[serde(default, rename = "sdpType", alias = "type")]
    sdp_type: Option<SdpType>,
}

/// An ICE connectivity candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceCandidate {
    #[serde(rename = "sdpMid")]
    pub sdp_mid: String,
    #[serde(rename = "sdpMLineIndex")]
    pub sdp_m_line_index: i32,
    #[serde(rename = "sdpCandidate")]
    pub sdp_candidate: String,
}

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

/// A typed signaling message.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    StoreUser,
    StartCall,
    /// Relay status string, see [`USER_NOT_ONLINE`] and [`USER_READY`].
    CallResponse(String),
    CreateOffer(SessionDescription),
    OfferReceived(SessionDescription),
    CreateAnswer(SessionDescription),
    AnswerReceived(SessionDescription),
    IceCandidate(IceCandidate),
}

impl Signal {
    pub fn message_type(&self) -> MessageType {
        match self {
            Signal::StoreUser => MessageType::StoreUser,
            Signal::StartCall => MessageType::StartCall,
            Signal::CallResponse(_) => MessageType::CallResponse,
            Signal::CreateOffer(_) => MessageType::CreateOffer,
            Signal::OfferReceived(_) => MessageType::OfferReceived,
            Signal::CreateAnswer(_) => MessageType::CreateAnswer,
            Signal::AnswerReceived(_) => MessageType::AnswerReceived,
            Signal::IceCandidate(_) => MessageType::IceCandidate,
        }
    }
}

/// One relay message with a decoded payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Sender identity. Empty on some relay-originated messages.
    pub name: String,
    /// Recipient identity.
    pub target: Option<String>,
    pub signal: Signal,
}

/// Untyped form of an envelope as it appears on the wire.
///
/// The relay routes on this form so it never has to understand the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireEnvelope {
    #[serde(rename = "type")]
    pub kind: MessageType,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl WireEnvelope {
    pub fn decode(text: &str) -> Result<Self, RelayError> {
        serde_json::from_str(text).map_err(|e| RelayError::Protocol(e.to_string()))
    }

    pub fn encode(&self) -> Result<String, RelayError> {
        serde_json::to_string(self).map_err(|e| RelayError::Protocol(e.to_string()))
    }
}

impl Envelope {
    pub fn new(name: impl Into<String>, target: Option<String>, signal: Signal) -> Self {
        Self {
            name: name.into(),
            target,
            signal,
        }
    }

    pub fn store_user(name: &str) -> Self {
        Self::new(name, None, Signal::StoreUser)
    }

    pub fn start_call(name: &str, target: &str) -> Self {
        Self::new(name, Some(target.to_string()), Signal::StartCall)
    }

    pub fn create_offer(name: &str, target: &str, offer: SessionDescription) -> Self {
        Self::new(name, Some(target.to_string()), Signal::CreateOffer(offer))
    }

    pub fn create_answer(name: &str, target: &str, answer: SessionDescription) -> Self {
        Self::new(name, Some(target.to_string()), Signal::CreateAnswer(answer))
    }

    pub fn ice_candidate(name: &str, target: &str, candidate: IceCandidate) -> Self {
        Self::new(name, Some(target.to_string()), Signal::IceCandidate(candidate))
    }

    pub fn message_type(&self) -> MessageType {
        self.signal.message_type()
    }

    /// Parse one text frame.
    pub fn decode(text: &str) -> Result<Self, RelayError> {
        Self::try_from(WireEnvelope::decode(text)?)
    }

    /// Serialize to one text frame.
    pub fn encode(&self) -> Result<String, RelayError> {
        WireEnvelope::try_from(self)?.encode()
    }
}

impl TryFrom<WireEnvelope> for Envelope {
    type Error = RelayError;

    fn try_from(wire: WireEnvelope) -> Result<Self, Self::Error> {
        let WireEnvelope {
            kind,
            name,
            target,
            data,
        } = wire;

        let signal = match kind {
            MessageType::StoreUser => Signal::StoreUser,
            MessageType::StartCall => Signal::StartCall,
            MessageType::CallResponse => match data {
                Some(Value::String(status)) => Signal::CallResponse(status),
                other => return Err(bad_payload(kind, "a status string", other.as_ref())),
            },
            MessageType::CreateOffer => {
                Signal::CreateOffer(decode_descriptor(kind, data, SdpType::Offer)?)
            }
            MessageType::OfferReceived => {
                Signal::OfferReceived(decode_descriptor(kind, data, SdpType::Offer)?)
            }
            MessageType::CreateAnswer => {
                Signal::CreateAnswer(decode_descriptor(kind, data, SdpType::Answer)?)
            }
            MessageType::AnswerReceived => {
                Signal::AnswerReceived(decode_descriptor(kind, data, SdpType::Answer)?)
            }
            MessageType::IceCandidate => {
                let value = data.ok_or_else(|| bad_payload(kind, "a candidate record", None))?;
                let candidate = serde_json::from_value(value)
                    .map_err(|e| RelayError::Protocol(format!("{kind}: {e}")))?;
                Signal::IceCandidate(candidate)
            }
        };

        Ok(Envelope {
            name,
            target,
            signal,
        })
    }
}

impl TryFrom<&Envelope> for WireEnvelope {
    type Error = RelayError;

    fn try_from(envelope: &Envelope) -> Result<Self, Self::Error> {
        let data = match &envelope.signal {
            Signal::StoreUser | Signal::StartCall => None,
            Signal::CallResponse(status) => Some(Value::String(status.clone())),
            Signal::CreateOffer(desc)
            | Signal::OfferReceived(desc)
            | Signal::CreateAnswer(desc)
            | Signal::AnswerReceived(desc) => Some(to_value(desc)?),
            Signal::IceCandidate(candidate) => Some(to_value(candidate)?),
        };

        Ok(WireEnvelope {
            kind: envelope.message_type(),
            name: envelope.name.clone(),
            target: envelope.target.clone(),
            data,
        })
    }
}

/// Descriptor payloads arrive either as a record or, from older relays, as
/// the bare SDP text. A missing role falls back to the one implied by the
/// envelope type.
fn decode_descriptor(
    kind: MessageType,
    data: Option<Value>,
    implied: SdpType,
) -> Result<SessionDescription, RelayError> {
    match data {
        Some(Value::String(sdp)) => Ok(SessionDescription {
            sdp,
            sdp_type: implied,
        }),
        Some(value @ Value::Object(_)) => {
            let record: DescriptorRecord = serde_json::from_value(value)
                .map_err(|e| RelayError::Protocol(format!("{kind}: {e}")))?;
            Ok(SessionDescription {
                sdp: record.sdp,
                sdp_type: record.sdp_type.unwrap_or(implied),
            })
        }
        other => Err(bad_payload(kind, "a session description", other.as_ref())),
    }
}

fn bad_payload(kind: MessageType, expected: &str, found: Option<&Value>) -> RelayError {
    let found = match found {
        None | Some(Value::Null) => "nothing",
        Some(Value::Bool(_)) => "a boolean",
        Some(Value::Number(_)) => "a number",
        Some(Value::String(_)) => "a string",
        Some(Value::Array(_)) => "an array",
        Some(Value::Object(_)) => "an object",
    };
    RelayError::Protocol(format!("{kind}: expected {expected} in data, found {found}"))
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, RelayError> {
    serde_json::to_value(value).map_err(|e| RelayError::Protocol(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate() -> IceCandidate {
        IceCandidate {
            sdp_mid: "0".into(),
            sdp_m_line_index: 0,
            sdp_candidate: "candidate:1 1 udp 2122260223 192.168.1.2 54321 typ host".into(),
        }
    }

    #[test]
    fn store_user_has_no_target_or_data() {
        let json = Envelope::store_user("alice").encode().unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "store_user");
        assert_eq!(value["name"], "alice");
        assert!(value.get("target").is_none());
        assert!(value.get("data").is_none());
    }

    #[test]
    fn create_offer_carries_sdp_unchanged() {
        let sdp = "v=0\r\no=- 4611731400430051336 2 IN IP4 127.0.0.1\r\ns=-\r\n";
        let json = Envelope::create_offer("alice", "bob", SessionDescription::offer(sdp))
            .encode()
            .unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "create_offer");
        assert_eq!(value["target"], "bob");
        assert_eq!(value["data"]["sdp"].as_str().unwrap(), sdp);
        assert_eq!(value["data"]["sdpType"], "offer");
    }

    #[test]
    fn ice_candidate_uses_camel_case_fields() {
        let json = Envelope::ice_candidate("alice", "bob", candidate()).encode().unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["data"]["sdpMid"], "0");
        assert_eq!(value["data"]["sdpMLineIndex"], 0);
        assert!(value["data"]["sdpCandidate"]
            .as_str()
            .unwrap()
            .starts_with("candidate:"));
    }

    #[test]
    fn decodes_offer_received_record() {
        let env = Envelope::decode(
            r#"{"type":"offer_received","name":"alice","data":{"sdp":"v=0...","sdpType":"offer"}}"#,
        )
        .unwrap();
        assert_eq!(env.name, "alice");
        assert_eq!(env.target, None);
        assert_eq!(
            env.signal,
            Signal::OfferReceived(SessionDescription::offer("v=0..."))
        );
    }

    #[test]
    fn decodes_bare_sdp_string_with_role_from_type() {
        let env =
            Envelope::decode(r#"{"type":"answer_received","name":"bob","data":"v=0 answer"}"#)
                .unwrap();
        assert_eq!(
            env.signal,
            Signal::AnswerReceived(SessionDescription::answer("v=0 answer"))
        );
    }

    #[test]
    fn accepts_legacy_role_key_and_case() {
        let env = Envelope::decode(
            r#"{"type":"answer_received","name":"bob","data":{"sdp":"x","type":"ANSWER"}}"#,
        )
        .unwrap();
        assert_eq!(env.signal, Signal::AnswerReceived(SessionDescription::answer("x")));
    }

    #[test]
    fn decodes_call_response_without_name() {
        let env = Envelope::decode(r#"{"type":"call_response","data":"user is not online"}"#)
            .unwrap();
        assert_eq!(env.name, "");
        assert_eq!(env.signal, Signal::CallResponse(USER_NOT_ONLINE.into()));
    }

    #[test]
    fn decodes_ice_candidate() {
        let env = Envelope::decode(
            r#"{"type":"ice_candidate","name":"alice","target":"bob",
                "data":{"sdpMid":"audio","sdpMLineIndex":1,"sdpCandidate":"candidate:2"}}"#,
        )
        .unwrap();
        assert_eq!(
            env.signal,
            Signal::IceCandidate(IceCandidate {
                sdp_mid: "audio".into(),
                sdp_m_line_index: 1,
                sdp_candidate: "candidate:2".into(),
            })
        );
        assert_eq!(env.target.as_deref(), Some("bob"));
    }

    #[test]
    fn unknown_type_is_protocol_error() {
        let err = Envelope::decode(r#"{"type":"hang_up","name":"alice"}"#).unwrap_err();
        assert!(matches!(err, RelayError::Protocol(_)));
    }

    #[test]
    fn missing_descriptor_is_protocol_error() {
        let err = Envelope::decode(r#"{"type":"offer_received","name":"alice"}"#).unwrap_err();
        assert!(err.to_string().contains("offer_received"));
        assert!(err.to_string().contains("found nothing"));
    }

    #[test]
    fn candidate_payload_shape_is_checked() {
        let err = Envelope::decode(
            r#"{"type":"ice_candidate","name":"alice","data":{"sdp":"v=0","sdpType":"offer"}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, RelayError::Protocol(_)));
    }

    #[test]
    fn call_response_requires_string() {
        let err = Envelope::decode(r#"{"type":"call_response","data":{"ok":true}}"#).unwrap_err();
        assert!(err.to_string().contains("status string"));
    }

    #[test]
    fn malformed_json_is_protocol_error() {
        let err = Envelope::decode("{not json").unwrap_err();
        assert!(matches!(err, RelayError::Protocol(_)));
    }

    #[test]
    fn wire_envelope_keeps_payload_opaque() {
        let wire = WireEnvelope::decode(
            r#"{"type":"create_answer","name":"bob","target":"alice","data":{"sdp":"s","sdpType":"answer","extra":1}}"#,
        )
        .unwrap();
        assert_eq!(wire.kind, MessageType::CreateAnswer);
        assert_eq!(wire.data.as_ref().unwrap()["extra"], 1);
    }
}
