//! Attestation claim carried in request headers.

use std::collections::BTreeMap;
use std::net::IpAddr;

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use tracing::warn;

use super::error::ApiError;

pub const ATTESTATION_TYPE_HEADER: &str = "X-Flashbots-Attestation-Type";
pub const MEASUREMENT_HEADER: &str = "X-Flashbots-Measurement";
pub const FORWARDED_FOR_HEADER: &str = "X-Forwarded-For";

/// What a caller claims about itself: attestation type, register values and
/// client address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationClaim {
    pub attestation_type: String,
    pub measurements: BTreeMap<String, String>,
    pub ip: IpAddr,
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, String> {
    headers
        .get(name)
        .ok_or_else(|| format!("missing {name}"))?
        .to_str()
        .map_err(|_| format!("non-ASCII {name}"))
}

/// The left-most entry of a forwarded-for chain is the client.
fn client_ip(chain: &str) -> Result<IpAddr, String> {
    let first = chain.split(',').next().unwrap_or_default().trim();
    first
        .parse()
        .map_err(|_| format!("invalid client address {first:?}"))
}

impl AttestationClaim {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, String> {
        let attestation_type = header(headers, ATTESTATION_TYPE_HEADER)?.trim();
        if attestation_type.is_empty() {
            return Err(format!("empty {ATTESTATION_TYPE_HEADER}"));
        }
        let measurements: BTreeMap<String, String> =
            serde_json::from_str(header(headers, MEASUREMENT_HEADER)?)
                .map_err(|e| format!("malformed {MEASUREMENT_HEADER}: {e}"))?;
        let ip = client_ip(header(headers, FORWARDED_FOR_HEADER)?)?;

        Ok(Self {
            attestation_type: attestation_type.to_string(),
            measurements,
            ip,
        })
    }
}

impl<S: Send + Sync> FromRequestParts<S> for AttestationClaim {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_headers(&parts.headers).map_err(|reason| {
            warn!(%reason, "Malformed attestation headers");
            ApiError::Forbidden
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, value.parse().unwrap());
        }
        map
    }

    fn valid() -> Vec<(&'static str, &'static str)> {
        vec![
            (ATTESTATION_TYPE_HEADER, "azure-tdx"),
            (MEASUREMENT_HEADER, r#"{"8":"00","11":"ef"}"#),
            (FORWARDED_FOR_HEADER, "10.0.0.1"),
        ]
    }

    #[test]
    fn parses_complete_claim() {
        let claim = AttestationClaim::from_headers(&headers(&valid())).unwrap();
        assert_eq!(claim.attestation_type, "azure-tdx");
        assert_eq!(claim.measurements["11"], "ef");
        assert_eq!(claim.ip, "10.0.0.1".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn uses_left_most_forwarded_address() {
        let mut pairs = valid();
        pairs[2] = (FORWARDED_FOR_HEADER, "203.0.113.7, 10.1.1.1, 10.2.2.2");
        let claim = AttestationClaim::from_headers(&headers(&pairs)).unwrap();
        assert_eq!(claim.ip, "203.0.113.7".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn accepts_ipv6_client() {
        let mut pairs = valid();
        pairs[2] = (FORWARDED_FOR_HEADER, "2001:db8::1");
        assert!(AttestationClaim::from_headers(&headers(&pairs)).is_ok());
    }

    #[test]
    fn rejects_each_missing_header() {
        for skip in 0..3 {
            let pairs: Vec<_> = valid()
                .into_iter()
                .enumerate()
                .filter(|(i, _)| *i != skip)
                .map(|(_, p)| p)
                .collect();
            assert!(AttestationClaim::from_headers(&headers(&pairs)).is_err());
        }
    }

    #[test]
    fn rejects_malformed_values() {
        let mut pairs = valid();
        pairs[1] = (MEASUREMENT_HEADER, r#"{"8":{"expected":"00"}}"#);
        assert!(AttestationClaim::from_headers(&headers(&pairs)).is_err());

        let mut pairs = valid();
        pairs[2] = (FORWARDED_FOR_HEADER, "not-an-ip");
        assert!(AttestationClaim::from_headers(&headers(&pairs)).is_err());

        let mut pairs = valid();
        pairs[0] = (ATTESTATION_TYPE_HEADER, "  ");
        assert!(AttestationClaim::from_headers(&headers(&pairs)).is_err());
    }
}
