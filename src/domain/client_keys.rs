/// Decoded length of an uncompressed SEC1 P-256 public key.
const PUBLIC_KEY_LEN: usize = 65;
/// Decoded length of the Web Push authentication secret.
const AUTH_SECRET_LEN: usize = 16;

/// The delivery credentials a browser attaches to a push subscription:
/// its P-256 public key (`p256dh`) and shared authentication secret
/// (`auth`), both unpadded base64url.
#[derive(Debug, Clone)]
pub struct ClientKeys {
    public_key: String,
    auth_secret: String,
}

impl ClientKeys {
    pub fn parse(p256dh: String, auth: String) -> Result<ClientKeys, String> {
        let public_key = base64::decode_config(&p256dh, base64::URL_SAFE_NO_PAD)
            .map_err(|_| "The p256dh key is not valid base64url.".to_string())?;
        if public_key.len() != PUBLIC_KEY_LEN {
            return Err(format!(
                "The p256dh key must decode to {} bytes.",
                PUBLIC_KEY_LEN
            ));
        }
        if public_key[0] != 0x04 {
            return Err("The p256dh key is not an uncompressed P-256 point.".to_string());
        }
        let auth_secret = base64::decode_config(&auth, base64::URL_SAFE_NO_PAD)
            .map_err(|_| "The auth secret is not valid base64url.".to_string())?;
        if auth_secret.len() != AUTH_SECRET_LEN {
            return Err(format!(
                "The auth secret must decode to {} bytes.",
                AUTH_SECRET_LEN
            ));
        }
        Ok(Self {
            public_key: p256dh,
            auth_secret: auth,
        })
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    pub fn auth_secret(&self) -> &str {
        &self.auth_secret
    }
}
