//! The RPC engine: envelope construction, signal assembly, and response
//! parsing.
//!
//! One `request()` round is build → post → parse; the status-code state
//! machine surfaces recoverable conditions (token expiry, endpoint
//! redirect) as errors the caller's retry loop handles.

use std::collections::HashMap;
use std::sync::Arc;

use prost::Message;
use rand::Rng as _;
use tokio::task::JoinSet;
use tracing::instrument;

use pogo_types::envelopes::{
    AuthInfo, AuthTicket, Jwt, PlatEightRequest, PlatEightResponse, PlatformRequest, Request,
    SendEncryptedSignatureRequest,
};
use pogo_types::registry::{self, ArgMap};
use pogo_types::requests::RequestType;
use pogo_types::responses::ResponseMessage;
use pogo_types::{RequestEnvelope, ResponseEnvelope};

use crate::auth::{AuthProvider, Ticket};
use crate::clock;
use crate::error::Error;
use crate::hash_server::{HashInput, HashServer};
use crate::session::{HttpSession, TransportError};
use crate::signal::{self, SignalParams};
use crate::state::RpcState;
use crate::{DeviceProfile, ENCRYPT_VERSION, SignalEncryptor};

/// One subrequest of a batch call.
#[derive(Clone, Debug)]
pub enum Subrequest {
    /// A bare operation carrying no payload.
    Plain(RequestType),
    /// An operation with an argument map applied to its payload message.
    WithArgs(RequestType, ArgMap),
}

impl Subrequest {
    /// The operation's type tag.
    pub fn request_type(&self) -> RequestType {
        match self {
            Subrequest::Plain(request_type) => *request_type,
            Subrequest::WithArgs(request_type, _) => *request_type,
        }
    }
}

impl From<RequestType> for Subrequest {
    fn from(request_type: RequestType) -> Self {
        Subrequest::Plain(request_type)
    }
}

/// Player position attached to a call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Position {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Altitude in meters; synthesized when absent.
    pub altitude: Option<f64>,
}

/// Decoded result of one successful call.
#[derive(Debug)]
pub struct CallResponse {
    /// Protocol status code (1 or 2).
    pub status_code: i32,
    /// Echo of the envelope's request id.
    pub request_id: u64,
    /// Per-subrequest responses, keyed by request name.
    pub responses: HashMap<&'static str, ResponseMessage>,
}

pub(crate) struct RpcApi {
    pub(crate) session: HttpSession,
    pub(crate) auth: Arc<dyn AuthProvider>,
    pub(crate) state: Arc<RpcState>,
    pub(crate) hash: Arc<HashServer>,
    pub(crate) encryptor: Arc<dyn SignalEncryptor>,
    pub(crate) device_info: Option<DeviceProfile>,
}

impl RpcApi {
    /// One build → post → parse round against `endpoint`.
    #[instrument(level = "debug", skip_all)]
    pub(crate) async fn request(
        &self,
        endpoint: &str,
        subrequests: &[Subrequest],
        position: Position,
    ) -> Result<CallResponse, Error> {
        let envelope = self.build_envelope(subrequests, position).await?;
        let raw = self.post(endpoint, envelope.encode_to_vec()).await?;
        self.parse_response(&raw, subrequests)
    }

    async fn post(&self, endpoint: &str, body: Vec<u8>) -> Result<Vec<u8>, Error> {
        tracing::debug!("executing RPC");
        let response = self
            .session
            .post(endpoint, Default::default(), body)
            .await
            .map_err(|err| match err {
                TransportError::Proxy(detail) => Error::Proxy(detail),
                TransportError::Timeout => Error::NianticTimeout,
                TransportError::Network(detail) => Error::NianticOffline(detail),
                TransportError::Unexpected(detail) => Error::UnexpectedResponse(detail),
            })?;
        match response.status.as_u16() {
            code if (200..300).contains(&code) => {
                if response.body.is_empty() {
                    Err(Error::MalformedResponse("empty server response".into()))
                } else {
                    Ok(response.body)
                }
            }
            400 => Err(Error::BadRequest),
            403 => Err(Error::NianticIpBanned),
            code if code >= 500 => Err(Error::NianticOffline(format!("server error {code}"))),
            code => Err(Error::UnexpectedResponse(format!("HTTP status {code}"))),
        }
    }

    /// Builds one envelope, launching the hash-oracle request before the
    /// signal log is synthesized and joining it before encryption.
    async fn build_envelope(
        &self,
        subrequests: &[Subrequest],
        position: Position,
    ) -> Result<RequestEnvelope, Error> {
        tracing::debug!("generating RPC envelope");
        let accuracy = {
            let mut rng = rand::thread_rng();
            crate::sample::accuracy(&mut rng)
        };
        let mut envelope = RequestEnvelope {
            status_code: 2,
            request_id: self.state.next_request_id(),
            latitude: position.latitude,
            longitude: position.longitude,
            accuracy: accuracy.value(),
            ..Default::default()
        };

        // subrequests are serialized before the signal is assembled
        for subrequest in subrequests {
            envelope.requests.push(materialize(subrequest));
        }

        let ticket_bytes = match self.auth.tickets().ticket() {
            Some(ticket) => {
                tracing::debug!("found session ticket, using it instead of the oauth token");
                let auth_ticket = AuthTicket {
                    start: ticket.start,
                    end: ticket.end,
                    expire_timestamp_ms: ticket.expire_timestamp_ms,
                };
                let bytes = auth_ticket.encode_to_vec();
                envelope.auth_ticket = Some(auth_ticket);
                bytes
            }
            None => {
                tracing::debug!("no session ticket, using the oauth access token");
                let contents = self.auth.access_token(false).await?;
                let unknown2 = {
                    let mut rng = rand::thread_rng();
                    crate::sample::token_unknown2(&mut rng)
                };
                let auth_info = AuthInfo {
                    provider: self.auth.provider().as_str().to_owned(),
                    token: Some(Jwt { contents, unknown2 }),
                };
                let bytes = auth_info.encode_to_vec();
                envelope.auth_info = Some(auth_info);
                bytes
            }
        };

        let now_ms = clock::epoch_ms();
        // JoinSet aborts the in-flight oracle request if this future is
        // dropped mid-call
        let mut hashing = JoinSet::new();
        {
            let hash = Arc::clone(&self.hash);
            let request_bytes: Vec<Vec<u8>> = envelope
                .requests
                .iter()
                .map(Message::encode_to_vec)
                .collect();
            let session_hash = self.state.session_hash().to_vec();
            let auth_ticket = ticket_bytes;
            let (latitude, longitude, accuracy_value) =
                (envelope.latitude, envelope.longitude, envelope.accuracy);
            hashing.spawn(async move {
                hash.hash(&HashInput {
                    timestamp_ms: now_ms,
                    latitude,
                    longitude,
                    accuracy: accuracy_value,
                    auth_ticket: &auth_ticket,
                    session_hash: &session_hash,
                    requests: &request_bytes,
                })
                .await
            });
        }

        let mut signal = signal::build_signal(
            &self.state,
            &mut rand::thread_rng(),
            now_ms,
            &SignalParams {
                latitude: position.latitude,
                longitude: position.longitude,
                altitude: position.altitude,
                accuracy,
                device_info: self.device_info.as_ref(),
            },
        );

        if let Some(first) = subrequests.first() {
            let chance = match first.request_type() {
                RequestType::GetPlayer | RequestType::GetMapObjects => 0.5,
                RequestType::Encounter => 0.1,
                _ => 0.03,
            };
            let fires = {
                let mut rng = rand::thread_rng();
                rng.gen_bool(chance)
            };
            if fires {
                let probe = PlatEightRequest {
                    field1: self.state.message8(),
                };
                envelope.platform_requests.push(PlatformRequest {
                    r#type: 8,
                    request_message: probe.encode_to_vec(),
                });
            }
        }

        let hashes = match hashing.join_next().await {
            Some(Ok(result)) => result?,
            _ => {
                return Err(Error::UnexpectedResponse(
                    "hash oracle task failed".into(),
                ));
            }
        };
        signal.location_hash_by_token_seed = hashes.location_auth_hash;
        signal.location_hash = hashes.location_hash;
        signal.request_hashes = hashes.request_hashes;

        let location_timestamp = signal
            .location_updates
            .first()
            .map(|location| location.timestamp_ms)
            .unwrap_or_default();
        let encrypted = self.encryptor.encrypt(
            &signal.encode_to_vec(),
            signal.timestamp_ms_since_start as u64,
            ENCRYPT_VERSION,
        );
        envelope.platform_requests.push(PlatformRequest {
            r#type: 6,
            request_message: SendEncryptedSignatureRequest {
                encrypted_signature: encrypted,
            }
            .encode_to_vec(),
        });
        envelope.ms_since_last_locationfix = signal.timestamp_ms_since_start - location_timestamp;

        Ok(envelope)
    }

    fn parse_response(
        &self,
        raw: &[u8],
        subrequests: &[Subrequest],
    ) -> Result<CallResponse, Error> {
        tracing::debug!("parsing RPC response");
        let envelope = ResponseEnvelope::decode(raw).map_err(|err| {
            Error::MalformedResponse(format!("could not parse response envelope: {err}"))
        })?;

        if let Some(auth_ticket) = &envelope.auth_ticket {
            let tickets = self.auth.tickets();
            if tickets.is_new_ticket(auth_ticket.expire_timestamp_ms) {
                tickets.set_ticket(Ticket {
                    expire_timestamp_ms: auth_ticket.expire_timestamp_ms,
                    start: auth_ticket.start.clone(),
                    end: auth_ticket.end.clone(),
                });
            }
        }

        if self.state.message8().is_none()
            && let Some(plat_return) = envelope
                .platform_returns
                .iter()
                .find(|plat_return| plat_return.r#type == 8)
        {
            match PlatEightResponse::decode(plat_return.response.as_slice()) {
                Ok(echo) if !echo.message.is_empty() => self.state.set_message8(echo.message),
                Ok(_) => {}
                Err(err) => tracing::debug!("undecodable type-8 platform return: {err}"),
            }
        }

        match envelope.status_code {
            1 | 2 => {
                let mut responses = HashMap::new();
                for (subrequest, payload) in subrequests.iter().zip(&envelope.returns) {
                    let request_type = subrequest.request_type();
                    let parsed = (registry::descriptor(request_type).parse)(payload);
                    responses.insert(request_type.name(), parsed);
                }
                Ok(CallResponse {
                    status_code: envelope.status_code,
                    request_id: envelope.request_id,
                    responses,
                })
            }
            3 => Err(Error::BadRpc(request_name(subrequests))),
            52 | 100 => Err(Error::InvalidRpc(request_name(subrequests))),
            53 => Err(Error::Redirect(envelope.api_url)),
            102 => Err(Error::AuthTokenExpired),
            code => Err(Error::Unexpected(code)),
        }
    }
}

fn materialize(subrequest: &Subrequest) -> Request {
    match subrequest {
        Subrequest::Plain(request_type) => Request {
            request_type: *request_type as i32,
            request_message: Vec::new(),
        },
        Subrequest::WithArgs(request_type, args) => Request {
            request_type: *request_type as i32,
            request_message: (registry::descriptor(*request_type).build)(args),
        },
    }
}

fn request_name(subrequests: &[Subrequest]) -> &'static str {
    subrequests
        .first()
        .map(|subrequest| subrequest.request_type().name())
        .unwrap_or("empty")
}
