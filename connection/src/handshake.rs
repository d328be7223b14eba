use common::err::{CResult, GatewayError};
use rand::RngCore;
use sha1::{Digest, Sha1};

use crate::declar::CapabilityFlags;
use crate::packet::codec::{read_len_enc_int, read_null_terminated_string, write_null_terminated_string};

pub const PROTOCOL_VERSION_10: u8 = 10;
pub const AUTH_PLUGIN_NAME: &str = "mysql_native_password";
const SCRAMBLE_LEN: usize = 20;

/// The server's initial handshake packet (protocol version 10):
/// advertises this gateway's capabilities and hands the client a fresh
/// scramble to use with `mysql_native_password`.
#[derive(Debug, Clone)]
pub struct InitialHandshake {
    pub connection_id: u32,
    pub server_version: String,
    pub scramble: [u8; SCRAMBLE_LEN],
    pub capabilities: CapabilityFlags,
}

impl InitialHandshake {
    pub fn new(connection_id: u32, server_version: impl Into<String>) -> Self {
        let mut scramble = [0u8; SCRAMBLE_LEN];
        rand::thread_rng().fill_bytes(&mut scramble);
        InitialHandshake { connection_id, server_version: server_version.into(), scramble, capabilities: CapabilityFlags::default_server() }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.push(PROTOCOL_VERSION_10);
        write_null_terminated_string(&mut buf, &self.server_version);
        buf.extend_from_slice(&self.connection_id.to_le_bytes());
        buf.extend_from_slice(&self.scramble[..8]);
        buf.push(0); // filler
        let caps = self.capabilities.bits();
        buf.extend_from_slice(&(caps as u16).to_le_bytes());
        buf.push(45); // utf8mb4_general_ci
        buf.extend_from_slice(&0u16.to_le_bytes()); // status flags: none yet
        buf.extend_from_slice(&((caps >> 16) as u16).to_le_bytes());
        buf.push((SCRAMBLE_LEN + 1) as u8);
        buf.extend_from_slice(&[0u8; 10]); // reserved
        buf.extend_from_slice(&self.scramble[8..]);
        buf.push(0);
        write_null_terminated_string(&mut buf, AUTH_PLUGIN_NAME);
        buf
    }
}

/// The client's protocol-41 handshake response.
#[derive(Debug, Clone)]
pub struct HandshakeResponse {
    pub capabilities: CapabilityFlags,
    pub username: String,
    pub auth_response: Vec<u8>,
    pub database: Option<String>,
}

impl HandshakeResponse {
    pub fn decode(bytes: &[u8]) -> CResult<Self> {
        if bytes.len() < 32 {
            return Err(GatewayError::Protocol("truncated handshake response".into()));
        }
        let client_caps = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let capabilities = CapabilityFlags::from_bits_truncate(client_caps);
        let mut pos = 32; // capabilities(4) + max_packet(4) + charset(1) + reserved(23)
        let username = read_null_terminated_string(bytes, &mut pos)?;

        let auth_response = if capabilities.contains(CapabilityFlags::CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA) {
            let len = read_len_enc_int(bytes, &mut pos)? as usize;
            let slice = bytes.get(pos..pos + len).ok_or_else(|| GatewayError::Protocol("truncated auth response".into()))?;
            pos += len;
            slice.to_vec()
        } else if capabilities.contains(CapabilityFlags::CLIENT_SECURE_CONNECTION) {
            let len = *bytes.get(pos).ok_or_else(|| GatewayError::Protocol("truncated auth response length".into()))? as usize;
            pos += 1;
            let slice = bytes.get(pos..pos + len).ok_or_else(|| GatewayError::Protocol("truncated auth response".into()))?;
            pos += len;
            slice.to_vec()
        } else {
            read_null_terminated_string(bytes, &mut pos)?.into_bytes()
        };

        let database = if capabilities.contains(CapabilityFlags::CLIENT_CONNECT_WITH_DB) && pos < bytes.len() {
            Some(read_null_terminated_string(bytes, &mut pos)?)
        } else {
            None
        };

        Ok(HandshakeResponse { capabilities, username, auth_response, database })
    }
}

/// Computes the `mysql_native_password` response a correctly-behaving
/// client would send: `SHA1(password) XOR SHA1(scramble + SHA1(SHA1(password)))`.
pub fn scramble_password(password: &str, scramble: &[u8]) -> Vec<u8> {
    if password.is_empty() {
        return Vec::new();
    }
    let stage1 = Sha1::digest(password.as_bytes());
    let stage2 = Sha1::digest(&stage1);
    let mut to_hash = Vec::with_capacity(scramble.len() + stage2.len());
    to_hash.extend_from_slice(scramble);
    to_hash.extend_from_slice(&stage2);
    let stage3 = Sha1::digest(&to_hash);
    stage1.iter().zip(stage3.iter()).map(|(a, b)| a ^ b).collect()
}

/// Verifies credentials presented in a handshake response. Production
/// deployments supply a backend-specific implementation (e.g. one
/// checking a grants table); [`StaticCredentials`] covers the common
/// single-account case and tests.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, username: &str, scramble: &[u8; SCRAMBLE_LEN], auth_response: &[u8]) -> CResult<()>;
}

/// Authenticates every user against one fixed username/password pair.
pub struct StaticCredentials {
    pub username: String,
    pub password: String,
}

impl Authenticator for StaticCredentials {
    fn authenticate(&self, username: &str, scramble: &[u8; SCRAMBLE_LEN], auth_response: &[u8]) -> CResult<()> {
        if username != self.username {
            return Err(GatewayError::AuthenticationFailed(username.to_string()));
        }
        let expected = scramble_password(&self.password, scramble);
        if expected == auth_response {
            Ok(())
        } else {
            Err(GatewayError::AuthenticationFailed(username.to_string()))
        }
    }
}

/// Accepts any credentials; used for embed-mode and local development.
pub struct AllowAll;

impl Authenticator for AllowAll {
    fn authenticate(&self, _username: &str, _scramble: &[u8; SCRAMBLE_LEN], _auth_response: &[u8]) -> CResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_handshake_leads_with_protocol_version_10() {
        let handshake = InitialHandshake::new(1, "8.0.34-gateway");
        assert_eq!(handshake.encode()[0], PROTOCOL_VERSION_10);
    }

    #[test]
    fn static_credentials_accepts_the_matching_scramble() {
        let handshake = InitialHandshake::new(1, "8.0.34-gateway");
        let response = scramble_password("secret", &handshake.scramble);
        let auth = StaticCredentials { username: "root".into(), password: "secret".into() };
        assert!(auth.authenticate("root", &handshake.scramble, &response).is_ok());
    }

    #[test]
    fn static_credentials_rejects_the_wrong_password() {
        let handshake = InitialHandshake::new(1, "8.0.34-gateway");
        let response = scramble_password("wrong", &handshake.scramble);
        let auth = StaticCredentials { username: "root".into(), password: "secret".into() };
        assert!(auth.authenticate("root", &handshake.scramble, &response).is_err());
    }

    #[test]
    fn empty_password_round_trips_as_empty_response() {
        let handshake = InitialHandshake::new(1, "8.0.34-gateway");
        let response = scramble_password("", &handshake.scramble);
        assert!(response.is_empty());
    }
}
