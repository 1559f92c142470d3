//! `bce-auth-v1` request signing
//!
//! ```text
//! prefix    = bce-auth-v1/{ak}/{timestamp}/{expiration}
//! key       = hex(hmac_sha256(sk, prefix))
//! canonical = METHOD \n uri \n query \n headers
//! auth      = prefix/{signed headers}/hex(hmac_sha256(key, canonical))
//! ```

use super::error::ApiError;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const AUTH_VERSION: &str = "bce-auth-v1";
pub const DEFAULT_EXPIRATION_SECS: u32 = 1800;
pub const BCE_DATE_HEADER: &str = "x-bce-date";

#[derive(Clone)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// What gets signed for one request
pub struct SigningRequest<'a> {
    pub method: &'a str,
    pub path: &'a str,
    pub query: &'a [(String, String)],
    /// Lower-case header name and value pairs
    pub headers: &'a [(&'a str, &'a str)],
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Signer {
    credentials: Credentials,
    expiration_secs: u32,
}

impl Signer {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            expiration_secs: DEFAULT_EXPIRATION_SECS,
        }
    }

    pub fn access_key(&self) -> &str {
        &self.credentials.access_key
    }

    /// Value of the `Authorization` header
    pub fn sign(&self, request: &SigningRequest<'_>) -> Result<String, ApiError> {
        let prefix = format!(
            "{}/{}/{}/{}",
            AUTH_VERSION,
            self.credentials.access_key,
            format_timestamp(&request.timestamp),
            self.expiration_secs
        );
        let signing_key = hmac_hex(self.credentials.secret_key.as_bytes(), &prefix)?;

        let (canonical_headers, signed_headers) = canonical_headers(request.headers);
        let canonical_request = format!(
            "{}\n{}\n{}\n{}",
            request.method.to_uppercase(),
            canonical_uri(request.path),
            canonical_query_string(request.query),
            canonical_headers
        );
        tracing::trace!("canonical request: {:?}", canonical_request);

        let signature = hmac_hex(signing_key.as_bytes(), &canonical_request)?;
        Ok(format!("{}/{}/{}", prefix, signed_headers, signature))
    }
}

/// `2015-04-27T08:23:49Z`
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

fn hmac_hex(key: &[u8], data: &str) -> Result<String, ApiError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| ApiError::AuthError(format!("invalid signing key: {}", e)))?;
    mac.update(data.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Path with every segment RFC 3986 encoded, `/` kept
pub fn canonical_uri(path: &str) -> String {
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Sorted `key=value` pairs; value-less parameters keep a trailing `=`
pub fn canonical_query_string(query: &[(String, String)]) -> String {
    let mut pairs: Vec<String> = query
        .iter()
        .filter(|(k, _)| !k.eq_ignore_ascii_case("authorization"))
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect();
    pairs.sort();
    pairs.join("&")
}

/// Returns the canonical header block and the `;`-joined signed header names
pub fn canonical_headers(headers: &[(&str, &str)]) -> (String, String) {
    let mut entries: Vec<(String, String)> = headers
        .iter()
        .map(|(name, value)| {
            let name = name.trim().to_lowercase();
            let value = urlencoding::encode(value.trim()).into_owned();
            (name, value)
        })
        .filter(|(_, value)| !value.is_empty())
        .collect();
    entries.sort();

    let block = entries
        .iter()
        .map(|(name, value)| format!("{}:{}", urlencoding::encode(name), value))
        .collect::<Vec<_>>()
        .join("\n");
    let signed = entries
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(";");
    (block, signed)
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn signer() -> Signer {
        Signer::new(Credentials {
            access_key: "aabbccddeeff".to_string(),
            secret_key: "0011223344556677".to_string(),
        })
    }

    fn timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2015, 4, 27, 8, 23, 49).unwrap()
    }

    #[test]
    fn query_string_is_sorted_and_encoded() {
        let query = vec![
            ("maxKeys".to_string(), "100".to_string()),
            ("marker".to_string(), "vpc a/b".to_string()),
            ("resize".to_string(), String::new()),
            ("authorization".to_string(), "skip".to_string()),
        ];

        assert_eq!(
            canonical_query_string(&query),
            "marker=vpc%20a%2Fb&maxKeys=100&resize="
        );
    }

    #[test]
    fn uri_keeps_slashes() {
        assert_eq!(canonical_uri("/v1/vpc/vpc-1"), "/v1/vpc/vpc-1");
        assert_eq!(canonical_uri("v1/eip/1.2.3.4"), "/v1/eip/1.2.3.4");
        assert_eq!(canonical_uri("/v1/a b"), "/v1/a%20b");
    }

    #[test]
    fn headers_are_lowercased_and_sorted() {
        let (block, signed) = canonical_headers(&[
            ("x-bce-date", "2015-04-27T08:23:49Z"),
            ("Host", "bcc.bj.baidubce.com"),
        ]);

        assert_eq!(
            block,
            "host:bcc.bj.baidubce.com\nx-bce-date:2015-04-27T08%3A23%3A49Z"
        );
        assert_eq!(signed, "host;x-bce-date");
    }

    #[test]
    fn signature_is_deterministic() {
        let headers = [("host", "bcc.bj.baidubce.com"), ("x-bce-date", "2015-04-27T08:23:49Z")];
        let query = vec![("maxKeys".to_string(), "10".to_string())];
        let request = SigningRequest {
            method: "GET",
            path: "/v1/vpc",
            query: &query,
            headers: &headers,
            timestamp: timestamp(),
        };

        let first = signer().sign(&request).unwrap();
        let second = signer().sign(&request).unwrap();

        assert_eq!(first, second);
        assert!(first.starts_with("bce-auth-v1/aabbccddeeff/2015-04-27T08:23:49Z/1800/host;x-bce-date/"));
        let signature = first.rsplit('/').next().unwrap();
        assert_eq!(signature.len(), 64);
    }

    #[test]
    fn signature_changes_with_request() {
        let headers = [("host", "bcc.bj.baidubce.com")];
        let query = Vec::new();
        let get = SigningRequest {
            method: "GET",
            path: "/v1/vpc",
            query: &query,
            headers: &headers,
            timestamp: timestamp(),
        };
        let delete = SigningRequest {
            method: "DELETE",
            ..get
        };

        assert_ne!(signer().sign(&get).unwrap(), signer().sign(&delete).unwrap());
    }

    #[test]
    fn credentials_debug_hides_secret() {
        let rendered = format!("{:?}", signer());
        assert!(!rendered.contains("0011223344556677"));
    }
}
