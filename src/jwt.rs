use base64::engine::{general_purpose::URL_SAFE_NO_PAD as BASE64_URL_NO_PAD, Engine};
use rsa::RsaPublicKey;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    error::{Result, WalletError},
    signer::{verify_rs256, Signer, SigningAlgorithm},
};

/// Compact token header.
///
/// Field order is part of the wire format: `{"alg":"RS256","typ":"JWT"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    pub typ: String,
}

impl JwtHeader {
    pub fn new(alg: SigningAlgorithm) -> Self {
        Self {
            alg: alg.to_string(),
            typ: "JWT".to_owned(),
        }
    }
}

/// Signs `claims` and returns the three-segment compact token.
///
/// # Arguments
/// * `claims` - Claims to embed in the second segment
/// * `signer` - Signer producing the third segment
///
/// # Returns
/// * `Result<String>` - `header.claims.signature`, each segment base64url without padding
pub fn encode_compact<T: Serialize + ?Sized>(claims: &T, signer: &dyn Signer) -> Result<String> {
    let header = JwtHeader::new(signer.algorithm());

    let header_json = serde_json::to_vec(&header)?;
    let claims_json = serde_json::to_vec(claims)?;

    let signing_input = format!(
        "{}.{}",
        BASE64_URL_NO_PAD.encode(header_json),
        BASE64_URL_NO_PAD.encode(claims_json)
    );

    let signature = signer.sign(signing_input.as_bytes())?;

    Ok(format!(
        "{signing_input}.{}",
        BASE64_URL_NO_PAD.encode(signature)
    ))
}

struct Segments<'a> {
    header: &'a str,
    claims: &'a str,
    signature: &'a str,
}

fn split_segments(token: &str) -> Result<Segments<'_>> {
    let mut parts = token.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(header), Some(claims), Some(signature), None) => Ok(Segments {
            header,
            claims,
            signature,
        }),
        _ => Err(WalletError::validation(
            "compact token must have exactly three segments",
        )),
    }
}

fn decode_segment<T: DeserializeOwned>(segment: &str, name: &str) -> Result<T> {
    let bytes = BASE64_URL_NO_PAD
        .decode(segment)
        .map_err(|e| WalletError::validation(format!("{name} segment is not base64url: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| WalletError::validation(format!("{name} segment is not valid JSON: {e}")))
}

/// Decodes the header of a compact token without checking the signature.
pub fn decode_header(token: &str) -> Result<JwtHeader> {
    let segments = split_segments(token)?;
    decode_segment(segments.header, "header")
}

/// Decodes the claims of a compact token without checking the signature.
pub fn decode_claims_unverified<T: DeserializeOwned>(token: &str) -> Result<T> {
    let segments = split_segments(token)?;
    decode_segment(segments.claims, "claims")
}

/// Verifies an RS256 compact token and returns its claims.
///
/// Any failure, structural or cryptographic, is reported as a signing error.
pub fn verify_compact<T: DeserializeOwned>(token: &str, public_key: &RsaPublicKey) -> Result<T> {
    let segments = split_segments(token).map_err(|e| WalletError::signing(e.to_string()))?;

    let header: JwtHeader = decode_segment(segments.header, "header")
        .map_err(|e| WalletError::signing(e.to_string()))?;
    if header.alg != SigningAlgorithm::RS256.to_string() {
        return Err(WalletError::signing(format!(
            "unexpected token algorithm '{}'",
            header.alg
        )));
    }

    let signature = BASE64_URL_NO_PAD
        .decode(segments.signature)
        .map_err(|e| WalletError::signing(format!("signature segment is not base64url: {e}")))?;

    let signed_len = segments.header.len() + 1 + segments.claims.len();
    verify_rs256(public_key, token[..signed_len].as_bytes(), &signature)?;

    decode_segment(segments.claims, "claims").map_err(|e| WalletError::signing(e.to_string()))
}
