//! HTTP mirror client for the EMR REST API.

use crate::client::{MirrorClient, MirrorError, MirrorResult, PatientProfile, VitalsRecord};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

pub struct HttpMirrorClient {
    client: Client,
    base_url: String,
}

impl HttpMirrorClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[derive(Deserialize)]
struct IdResponse {
    id: i64,
}

#[async_trait::async_trait]
impl MirrorClient for HttpMirrorClient {
    async fn upsert_patient(&self, profile: &PatientProfile) -> MirrorResult<i64> {
        let url = format!("{}/patients/", self.base_url);
        debug!(%url, name = %profile.name, "registering patient");

        let response = self.client.post(&url).json(profile).send().await?;
        if !response.status().is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(MirrorError::Rejected(detail));
        }
        let body: IdResponse = response
            .json()
            .await
            .map_err(|e| MirrorError::InvalidResponse(e.to_string()))?;
        Ok(body.id)
    }

    async fn find_patient_by_identity(&self, address: &str) -> MirrorResult<Option<i64>> {
        let url = format!("{}/patients/by-wallet/{address}", self.base_url);
        debug!(%url, "resolving patient by session address");

        let response = self.client.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(MirrorError::Rejected(detail));
        }
        let body: IdResponse = response
            .json()
            .await
            .map_err(|e| MirrorError::InvalidResponse(e.to_string()))?;
        Ok(Some(body.id))
    }

    async fn append_vitals(&self, patient_id: i64, record: &VitalsRecord) -> MirrorResult<i64> {
        let url = format!("{}/patients/{patient_id}/vitals/", self.base_url);

        let response = self.client.post(&url).json(record).send().await?;
        if !response.status().is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(MirrorError::Rejected(detail));
        }
        let body: IdResponse = response
            .json()
            .await
            .map_err(|e| MirrorError::InvalidResponse(e.to_string()))?;
        Ok(body.id)
    }
}
