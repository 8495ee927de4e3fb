use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use thiserror::Error;

use crate::domain::{Cid, CompoundRecord, Decimal, StructureKind};
use crate::error::KiraError;

pub const DEFAULT_BASE_URL: &str = "https://pubchem.ncbi.nlm.nih.gov/rest/pug";

const PROPERTY_LIST: &str = "MolecularWeight,XLogP,HBondDonorCount,HBondAcceptorCount,TPSA";

/// Why a resource could not be obtained. Callers treat every variant as
/// absence; the tag is kept for diagnostics only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Unavailable {
    #[error("PubChem returned status {0}")]
    Status(u16),

    #[error("request failed: {0}")]
    Transport(String),

    #[error("unexpected payload: {0}")]
    Malformed(String),
}

pub trait PubchemClient: Send + Sync {
    fn fetch_properties(&self, cid: Cid) -> Result<CompoundRecord, Unavailable>;
    fn fetch_structure(&self, cid: Cid, kind: StructureKind) -> Result<Vec<u8>, Unavailable>;
}

#[derive(Clone)]
pub struct PubchemHttpClient {
    client: Client,
    base_url: String,
}

impl PubchemHttpClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, KiraError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("kira-pc/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| KiraError::PubchemHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| KiraError::PubchemHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn property_url(&self, cid: Cid) -> String {
        format!(
            "{}/compound/cid/{cid}/property/{PROPERTY_LIST}/JSON",
            self.base_url
        )
    }

    pub fn structure_url(&self, cid: Cid, kind: StructureKind) -> String {
        format!(
            "{}/compound/cid/{cid}/SDF?record_type={}",
            self.base_url,
            kind.record_type()
        )
    }

    fn get(&self, url: &str) -> Result<reqwest::blocking::Response, Unavailable> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| Unavailable::Transport(err.to_string()))?;
        if !response.status().is_success() {
            return Err(Unavailable::Status(response.status().as_u16()));
        }
        Ok(response)
    }
}

impl PubchemClient for PubchemHttpClient {
    fn fetch_properties(&self, cid: Cid) -> Result<CompoundRecord, Unavailable> {
        let response = self.get(&self.property_url(cid))?;
        let raw: Value = response
            .json()
            .map_err(|err| Unavailable::Malformed(err.to_string()))?;
        extract_properties(cid, &raw)
    }

    fn fetch_structure(&self, cid: Cid, kind: StructureKind) -> Result<Vec<u8>, Unavailable> {
        let response = self.get(&self.structure_url(cid, kind))?;
        let bytes = response
            .bytes()
            .map_err(|err| Unavailable::Transport(err.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Pulls the descriptor set out of a `PropertyTable` response. A missing
/// table or empty property list is `Malformed`; missing individual
/// descriptors are kept as `None`.
pub fn extract_properties(cid: Cid, raw: &Value) -> Result<CompoundRecord, Unavailable> {
    let entry = raw
        .get("PropertyTable")
        .ok_or_else(|| Unavailable::Malformed("missing PropertyTable".to_string()))?
        .get("Properties")
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .ok_or_else(|| Unavailable::Malformed("missing Properties[0]".to_string()))?;

    Ok(CompoundRecord {
        cid,
        molecular_weight: entry.get("MolecularWeight").and_then(as_decimal),
        xlogp: entry.get("XLogP").and_then(as_decimal),
        hbond_donors: entry.get("HBondDonorCount").and_then(as_count),
        hbond_acceptors: entry.get("HBondAcceptorCount").and_then(as_count),
        tpsa: entry.get("TPSA").and_then(as_decimal),
    })
}

// PubChem sends MolecularWeight as a string ("180.16") and the rest as
// numbers. Either way the text is kept as sent.
fn as_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Decimal::parse(&n.to_string()),
        Value::String(s) => Decimal::parse(s),
        _ => None,
    }
}

fn as_count(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
