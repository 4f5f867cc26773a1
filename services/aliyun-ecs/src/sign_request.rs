use crate::constants::*;
use crate::Credential;
use cloudrt_core::hash::base64_hmac_sha1;
use cloudrt_core::time::format_iso8601;
use cloudrt_core::{
    ensure_unique_keys, percent_encode, Context, Error, Result, SignRequest, SignedRequest,
    SigningCredential, UnsignedRequest,
};
use http::Method;
use log::debug;
use std::fmt::Write;

/// RequestSigner for the aliyun RPC signature (`HMAC-SHA1`, version `1.0`).
///
/// The signer injects the protocol parameters, sorts every parameter by key,
/// and appends the resulting `Signature`. See
/// <https://help.aliyun.com/document_detail/25492.html> for the algorithm.
#[derive(Debug, Clone)]
pub struct RequestSigner {
    version: String,
    format: String,
    nonce: Option<String>,
}

impl Default for RequestSigner {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestSigner {
    /// Create a new signer for the default API version and format.
    pub fn new() -> Self {
        Self {
            version: DEFAULT_API_VERSION.to_string(),
            format: DEFAULT_FORMAT.to_string(),
            nonce: None,
        }
    }

    /// Set the API version sent as `Version`.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Set the response format sent as `Format`.
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    /// Specify the signature nonce.
    ///
    /// # Note
    ///
    /// Every request must carry a fresh nonce or the service rejects it as a
    /// replay. Only use this function for testing.
    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    fn nonce(&self) -> String {
        match &self.nonce {
            Some(nonce) => nonce.clone(),
            None => format!("{:032x}", rand::random::<u128>()),
        }
    }
}

impl SignRequest for RequestSigner {
    type Credential = Credential;

    fn sign_request(
        &self,
        ctx: &Context,
        req: UnsignedRequest,
        credential: Option<&Self::Credential>,
    ) -> Result<SignedRequest> {
        let Some(cred) = credential.filter(|c| c.is_valid()) else {
            return Err(Error::unauthenticated(
                "access key id and secret are required to sign the request",
            ));
        };

        let (method, endpoint, mut params, body) = req.into_parts();
        if body.is_some() {
            return Err(Error::malformed_request(
                "rpc requests carry their parameters in the query or form body, raw bodies are not supported",
            ));
        }
        ensure_unique_keys(&params)?;

        let timestamp = format_iso8601(ctx.now());
        let nonce = self.nonce();

        let mut protocol = vec![
            (FORMAT, self.format.clone()),
            (VERSION, self.version.clone()),
            (ACCESS_KEY_ID, cred.access_key_id.clone()),
            (SIGNATURE_NONCE, nonce.clone()),
            (TIMESTAMP, timestamp.clone()),
            (SIGNATURE_METHOD, HMAC_SHA1.to_string()),
            (SIGNATURE_VERSION, SIGNATURE_VERSION_1_0.to_string()),
        ];
        if let Some(token) = &cred.security_token {
            protocol.push((SECURITY_TOKEN, token.clone()));
        }

        if let Some((k, _)) = params
            .iter()
            .find(|(k, _)| k == SIGNATURE || protocol.iter().any(|(p, _)| k == p))
        {
            return Err(Error::malformed_request(format!(
                "parameter {k} is set by the signer and must not be supplied"
            )));
        }

        params.extend(protocol.into_iter().map(|(k, v)| (k.to_string(), v)));
        // Keys are unique here, so the order is fully determined by the key bytes.
        params.sort_by(|a, b| a.0.cmp(&b.0));

        let string_to_sign = string_to_sign(&method, &params)?;
        debug!("calculated string to sign: {string_to_sign}");

        let signature = base64_hmac_sha1(
            format!("{}&", cred.access_key_secret).as_bytes(),
            string_to_sign.as_bytes(),
        );
        params.push((SIGNATURE.to_string(), signature.clone()));

        Ok(SignedRequest {
            method,
            endpoint,
            params,
            timestamp,
            nonce,
            signature_version: SIGNATURE_VERSION_1_0.to_string(),
            signature,
        })
    }
}

/// Build the canonical string: `METHOD&%2F&<encoded sorted query>`.
fn string_to_sign(method: &Method, sorted: &[(String, String)]) -> Result<String> {
    let mut query = String::new();
    for (idx, (k, v)) in sorted.iter().enumerate() {
        if idx != 0 {
            query.push('&');
        }
        write!(query, "{}={}", percent_encode(k), percent_encode(v))?;
    }

    let mut s = String::with_capacity(query.len() * 2);
    write!(s, "{}&{}&{}", method, percent_encode("/"), percent_encode(&query))?;
    Ok(s)
}
