use crate::configuration::PushClientSettings;
use crate::models::PushSubscription;
use crate::push::{DeliveryStatus, PushTransport};
use aes_gcm::aead::Aead;
use aes_gcm::{Aes128Gcm, KeyInit};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::Utc;
use hkdf::Hkdf;
use p256::ecdh::EphemeralSecret;
use p256::ecdsa::signature::Signer;
use p256::ecdsa::SigningKey;
use p256::elliptic_curve::rand_core::{OsRng, RngCore};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use secrecy::{ExposeSecret, Secret};
use sha2::Sha256;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

const SALT_LEN: usize = 16;
const PUBLIC_KEY_LEN: usize = 65;
const AUTH_SECRET_LEN: usize = 16;
const PRIVATE_KEY_LEN: usize = 32;
/// Record size field of the aes128gcm body header; a push message is always
/// a single record well below this.
const RECORD_SIZE: u32 = 4096;
const TTL_SECONDS: &str = "3600";
const JWT_VALIDITY_SECS: i64 = 12 * 60 * 60;
const JWT_RENEWAL_SKEW_SECS: i64 = 60;

const IKM_INFO_PREFIX: &[u8] = b"WebPush: info\0";
const CEK_INFO: &[u8] = b"Content-Encoding: aes128gcm\0";
const NONCE_INFO: &[u8] = b"Content-Encoding: nonce\0";

#[derive(Debug)]
struct CachedJwt {
    token: String,
    expires_at: i64,
}

/// Web Push delivery over HTTP: VAPID-signed requests (RFC 8292) carrying
/// an aes128gcm-encrypted payload (RFC 8291).
pub struct WebPushClient {
    http_client: reqwest::Client,
    vapid_public_key: String,
    vapid_private_key: Secret<Vec<u8>>,
    vapid_subject: String,
    // One VAPID JWT per push-service origin, reused until close to expiry.
    jwt_cache: Mutex<HashMap<String, CachedJwt>>,
}

impl std::fmt::Debug for WebPushClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebPushClient")
            .field("http_client", &self.http_client)
            .field("vapid_public_key", &self.vapid_public_key)
            .field("vapid_private_key", &"[REDACTED]")
            .field("vapid_subject", &self.vapid_subject)
            .field("jwt_cache", &self.jwt_cache)
            .finish()
    }
}

impl WebPushClient {
    /// Builds the client from configuration. Returns `Ok(None)` when no
    /// VAPID key pair is configured — the service then runs without
    /// delivery. A half-configured or undecodable key pair is an error:
    /// better to refuse to start than to fail on the first dispatch.
    pub fn from_settings(settings: &PushClientSettings) -> Result<Option<Self>, anyhow::Error> {
        let (public_key, private_key) =
            match (&settings.vapid_public_key, &settings.vapid_private_key) {
                (None, None) => return Ok(None),
                (Some(public_key), Some(private_key)) => (public_key.clone(), private_key.clone()),
                _ => {
                    return Err(anyhow!(
                        "vapid_public_key and vapid_private_key must be configured together."
                    ))
                }
            };

        let public_raw = b64url_decode(&public_key)
            .map_err(|_| anyhow!("vapid_public_key is not valid base64url."))?;
        if public_raw.len() != PUBLIC_KEY_LEN {
            return Err(anyhow!(
                "vapid_public_key must decode to {} bytes.",
                PUBLIC_KEY_LEN
            ));
        }
        let private_raw = b64url_decode(&private_key)
            .map_err(|_| anyhow!("vapid_private_key is not valid base64url."))?;
        let private_arr: [u8; PRIVATE_KEY_LEN] = private_raw
            .as_slice()
            .try_into()
            .map_err(|_| anyhow!("vapid_private_key must decode to {} bytes.", PRIVATE_KEY_LEN))?;
        SigningKey::from_bytes((&private_arr).into())
            .map_err(|_| anyhow!("vapid_private_key is not a valid P-256 scalar."))?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.timeout_milliseconds))
            .build()
            .context("Failed to build the push HTTP client.")?;

        Ok(Some(Self {
            http_client,
            vapid_public_key: public_key,
            vapid_private_key: Secret::new(private_raw),
            vapid_subject: settings.vapid_subject.clone(),
            jwt_cache: Mutex::new(HashMap::new()),
        }))
    }

    fn vapid_jwt(&self, audience: &str) -> Result<String, anyhow::Error> {
        let now = Utc::now().timestamp();
        {
            let cache = self.jwt_cache.lock().unwrap();
            if let Some(cached) = cache.get(audience) {
                if cached.expires_at - JWT_RENEWAL_SKEW_SECS > now {
                    return Ok(cached.token.clone());
                }
            }
        }

        let expires_at = now + JWT_VALIDITY_SECS;
        let token = self.sign_jwt(audience, expires_at)?;
        self.jwt_cache.lock().unwrap().insert(
            audience.to_string(),
            CachedJwt {
                token: token.clone(),
                expires_at,
            },
        );
        Ok(token)
    }

    fn sign_jwt(&self, audience: &str, expires_at: i64) -> Result<String, anyhow::Error> {
        let header = b64url_encode(br#"{"typ":"JWT","alg":"ES256"}"#);
        let claims = serde_json::json!({
            "aud": audience,
            "exp": expires_at,
            "sub": self.vapid_subject,
        });
        let claims = b64url_encode(
            serde_json::to_string(&claims)
                .context("Failed to serialize the VAPID claims.")?
                .as_bytes(),
        );
        let signing_input = format!("{}.{}", header, claims);

        let private_arr: [u8; PRIVATE_KEY_LEN] = self
            .vapid_private_key
            .expose_secret()
            .as_slice()
            .try_into()
            .map_err(|_| anyhow!("The VAPID private key has the wrong length."))?;
        let signing_key = SigningKey::from_bytes((&private_arr).into())
            .map_err(|_| anyhow!("The VAPID private key is not a valid P-256 scalar."))?;
        let signature: p256::ecdsa::Signature = signing_key.sign(signing_input.as_bytes());

        Ok(format!(
            "{}.{}",
            signing_input,
            b64url_encode(&signature.to_bytes())
        ))
    }
}

#[async_trait]
impl PushTransport for WebPushClient {
    async fn deliver(
        &self,
        subscription: &PushSubscription,
        payload: &[u8],
    ) -> Result<DeliveryStatus, anyhow::Error> {
        let audience = push_service_origin(&subscription.endpoint)?;
        let jwt = self.vapid_jwt(&audience)?;

        let client_public: [u8; PUBLIC_KEY_LEN] = b64url_decode(&subscription.public_key)
            .map_err(|_| anyhow!("The stored p256dh key is not valid base64url."))?
            .as_slice()
            .try_into()
            .map_err(|_| anyhow!("The stored p256dh key has the wrong length."))?;
        let client_auth: [u8; AUTH_SECRET_LEN] = b64url_decode(&subscription.auth_secret)
            .map_err(|_| anyhow!("The stored auth secret is not valid base64url."))?
            .as_slice()
            .try_into()
            .map_err(|_| anyhow!("The stored auth secret has the wrong length."))?;

        let encrypted = encrypt_payload(payload, &client_public, &client_auth)?;

        let response = self
            .http_client
            .post(&subscription.endpoint)
            .header("TTL", TTL_SECONDS)
            .header("Content-Encoding", "aes128gcm")
            .header("Content-Type", "application/octet-stream")
            .header("Encryption", format!("salt={}", encrypted.salt))
            .header(
                "Crypto-Key",
                format!(
                    "dh={}; p256ecdsa={}",
                    encrypted.message_key, self.vapid_public_key
                ),
            )
            .header(
                "Authorization",
                format!("vapid t={}, k={}", jwt, self.vapid_public_key),
            )
            .body(encrypted.body)
            .send()
            .await
            .context("The push request could not be completed.")?;

        let status = response.status();
        if status.is_success() {
            return Ok(DeliveryStatus::Accepted);
        }
        if endpoint_is_gone(status.as_u16()) {
            return Ok(DeliveryStatus::EndpointGone);
        }
        let detail = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable response body>".to_string());
        Ok(DeliveryStatus::Rejected {
            status: status.as_u16(),
            detail: detail.chars().take(300).collect(),
        })
    }
}

/// 404 and 410 are the push service's way of saying the subscription no
/// longer exists anywhere; everything else non-2xx is worth another try on
/// a later send.
fn endpoint_is_gone(status: u16) -> bool {
    matches!(status, 404 | 410)
}

/// The VAPID audience: scheme and host (and explicit port) of the push
/// service, nothing else.
fn push_service_origin(endpoint: &str) -> Result<String, anyhow::Error> {
    let url = url::Url::parse(endpoint).context("The push endpoint is not a valid URL.")?;
    let host = url
        .host_str()
        .ok_or_else(|| anyhow!("The push endpoint has no host."))?;
    Ok(match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    })
}

#[derive(Debug)]
struct EncryptedPayload {
    body: Vec<u8>,
    /// base64url of the record salt, echoed in the `Encryption` header.
    salt: String,
    /// base64url of the ephemeral message public key (`dh=`).
    message_key: String,
}

/// RFC 8291 aes128gcm encryption of one push message: ephemeral P-256 ECDH
/// against the subscription's key, HKDF key schedule bound to both public
/// keys, a single padded record, and the salt‖rs‖idlen‖key body header.
fn encrypt_payload(
    plaintext: &[u8],
    client_public_key: &[u8; PUBLIC_KEY_LEN],
    client_auth: &[u8; AUTH_SECRET_LEN],
) -> Result<EncryptedPayload, anyhow::Error> {
    if plaintext.is_empty() {
        return Err(anyhow!("A push payload cannot be empty."));
    }

    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let client_key = p256::PublicKey::from_sec1_bytes(client_public_key)
        .map_err(|_| anyhow!("The subscription public key is not a valid P-256 point."))?;
    let message_secret = EphemeralSecret::random(&mut OsRng);
    let message_public = p256::PublicKey::from(&message_secret);
    let message_public_point = message_public.to_encoded_point(false);
    let message_public_raw: [u8; PUBLIC_KEY_LEN] = message_public_point
        .as_bytes()
        .try_into()
        .map_err(|_| anyhow!("Unexpected ephemeral public key length."))?;

    let shared_secret = message_secret.diffie_hellman(&client_key);

    let mut ikm_info = Vec::with_capacity(IKM_INFO_PREFIX.len() + PUBLIC_KEY_LEN * 2);
    ikm_info.extend_from_slice(IKM_INFO_PREFIX);
    ikm_info.extend_from_slice(client_public_key);
    ikm_info.extend_from_slice(&message_public_raw);

    let ikm = hkdf_sha256(
        client_auth,
        shared_secret.raw_secret_bytes().as_slice(),
        &ikm_info,
        32,
    )?;
    let cek = hkdf_sha256(&salt, &ikm, CEK_INFO, 16)?;
    let nonce = hkdf_sha256(&salt, &ikm, NONCE_INFO, 12)?;
    // Single record, sequence number zero: the IV is the derived nonce.
    let nonce_arr: [u8; 12] = nonce
        .as_slice()
        .try_into()
        .map_err(|_| anyhow!("Unexpected nonce length."))?;

    let cipher = Aes128Gcm::new_from_slice(&cek)
        .map_err(|_| anyhow!("The derived content key has the wrong length."))?;

    let mut record = Vec::with_capacity(plaintext.len() + 1);
    record.extend_from_slice(plaintext);
    // Last-record padding delimiter.
    record.push(0x02);

    let ciphertext = cipher
        .encrypt((&nonce_arr).into(), record.as_slice())
        .map_err(|_| anyhow!("Payload encryption failed."))?;

    let mut body =
        Vec::with_capacity(SALT_LEN + 4 + 1 + PUBLIC_KEY_LEN + ciphertext.len());
    body.extend_from_slice(&salt);
    body.extend_from_slice(&RECORD_SIZE.to_be_bytes());
    body.push(PUBLIC_KEY_LEN as u8);
    body.extend_from_slice(&message_public_raw);
    body.extend_from_slice(&ciphertext);

    Ok(EncryptedPayload {
        body,
        salt: b64url_encode(&salt),
        message_key: b64url_encode(&message_public_raw),
    })
}

fn hkdf_sha256(salt: &[u8], ikm: &[u8], info: &[u8], len: usize) -> Result<Vec<u8>, anyhow::Error> {
    let hk = Hkdf::<Sha256>::new(Some(salt), ikm);
    let mut okm = vec![0u8; len];
    hk.expand(info, &mut okm)
        .map_err(|_| anyhow!("HKDF expand failed."))?;
    Ok(okm)
}

fn b64url_decode(input: &str) -> Result<Vec<u8>, base64::DecodeError> {
    base64::decode_config(input, base64::URL_SAFE_NO_PAD)
}

fn b64url_encode(input: &[u8]) -> String {
    base64::encode_config(input, base64::URL_SAFE_NO_PAD)
}
