// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Google Sheets REST client authenticated as a service account.

use crate::config::SheetsConfig;
use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::RequestBuilder;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Spreadsheet service errors, surfaced verbatim to the caller.
#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("Google Sheets not configured: missing {0}")]
    NotConfigured(&'static str),

    #[error("Invalid service account credentials: {0}")]
    Credentials(String),

    #[error("{operation} request failed: {source}")]
    Request {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{operation} returned {status}: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("{operation} response parse failed: {message}")]
    InvalidResponse {
        operation: &'static str,
        message: String,
    },
}

/// OAuth bearer token for one save.
#[derive(Debug, Clone)]
pub struct AccessToken(pub String);

/// Spreadsheet title and its tab titles.
#[derive(Debug, Clone, Default)]
pub struct SpreadsheetMetadata {
    pub title: String,
    pub sheet_titles: Vec<String>,
}

/// Properties of a newly created tab.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetProperties {
    #[serde(default)]
    pub sheet_id: i64,
    pub title: String,
}

/// The Sheets operations the quote stores need, against one spreadsheet.
#[async_trait]
pub trait SpreadsheetApi: Send + Sync {
    async fn authenticate(&self) -> Result<AccessToken, SheetsError>;

    async fn metadata(&self, token: &AccessToken) -> Result<SpreadsheetMetadata, SheetsError>;

    async fn add_sheet(
        &self,
        token: &AccessToken,
        title: &str,
    ) -> Result<SheetProperties, SheetsError>;

    /// Overwrites `range`; returns the updated range.
    async fn update_values(
        &self,
        token: &AccessToken,
        range: &str,
        rows: Vec<Vec<Value>>,
    ) -> Result<String, SheetsError>;

    /// Appends after the last row of `range`; returns the updated range.
    async fn append_values(
        &self,
        token: &AccessToken,
        range: &str,
        rows: Vec<Vec<Value>>,
    ) -> Result<String, SheetsError>;
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct MetadataResponse {
    #[serde(default)]
    properties: TitleProperties,
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct TitleProperties {
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    #[serde(default)]
    properties: TitleProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchUpdateResponse {
    #[serde(default)]
    replies: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateValuesResponse {
    #[serde(default)]
    updated_range: String,
}

#[derive(Debug, Deserialize)]
struct AppendValuesResponse {
    #[serde(default)]
    updates: UpdateValuesResponse,
}

/// HTTP implementation of [`SpreadsheetApi`].
pub struct GoogleSheetsClient {
    service_account_email: Option<String>,
    private_key: Option<String>,
    spreadsheet_id: Option<String>,
    token_url: String,
    api_base: String,
    http: reqwest::Client,
}

impl GoogleSheetsClient {
    pub fn new(config: &SheetsConfig) -> Self {
        Self {
            service_account_email: config.service_account_email.clone(),
            private_key: config.private_key.clone(),
            spreadsheet_id: config.spreadsheet_id.clone(),
            token_url: TOKEN_URL.to_string(),
            api_base: SHEETS_API.to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn spreadsheet_url(&self) -> Result<String, SheetsError> {
        let id = self
            .spreadsheet_id
            .as_deref()
            .ok_or(SheetsError::NotConfigured("GOOGLE_SHEET_ID"))?;
        Ok(format!("{}/{}", self.api_base, urlencoding::encode(id)))
    }

    /// Signed RS256 assertion for the token exchange.
    fn assertion(&self, now: i64) -> Result<String, SheetsError> {
        let email = self
            .service_account_email
            .as_deref()
            .ok_or(SheetsError::NotConfigured("GOOGLE_SERVICE_ACCOUNT_EMAIL"))?;
        let pem = self
            .private_key
            .as_deref()
            .ok_or(SheetsError::NotConfigured("GOOGLE_PRIVATE_KEY"))?;

        let key = EncodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| SheetsError::Credentials(e.to_string()))?;
        let claims = Claims {
            iss: email,
            scope: SPREADSHEETS_SCOPE,
            aud: &self.token_url,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| SheetsError::Credentials(e.to_string()))
    }

    /// Sends a request and decodes a JSON body, keeping status and body on failure.
    async fn send_json<T: DeserializeOwned>(
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<T, SheetsError> {
        let resp = request
            .send()
            .await
            .map_err(|source| SheetsError::Request { operation, source })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SheetsError::Status {
                operation,
                status: status.as_u16(),
                body,
            });
        }

        resp.json().await.map_err(|e| SheetsError::InvalidResponse {
            operation,
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl SpreadsheetApi for GoogleSheetsClient {
    async fn authenticate(&self) -> Result<AccessToken, SheetsError> {
        let assertion = self.assertion(chrono::Utc::now().timestamp())?;
        let request = self
            .http
            .post(&self.token_url)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())]);

        let body: TokenResponse = Self::send_json("Token exchange", request).await?;
        tracing::debug!("Obtained Sheets access token");
        Ok(AccessToken(body.access_token))
    }

    async fn metadata(&self, token: &AccessToken) -> Result<SpreadsheetMetadata, SheetsError> {
        let request = self
            .http
            .get(self.spreadsheet_url()?)
            .bearer_auth(&token.0)
            .query(&[("fields", "properties.title,sheets.properties.title")]);

        let body: MetadataResponse = Self::send_json("Spreadsheet metadata", request).await?;
        Ok(SpreadsheetMetadata {
            title: body.properties.title,
            sheet_titles: body.sheets.into_iter().map(|s| s.properties.title).collect(),
        })
    }

    async fn add_sheet(
        &self,
        token: &AccessToken,
        title: &str,
    ) -> Result<SheetProperties, SheetsError> {
        let request = self
            .http
            .post(format!("{}:batchUpdate", self.spreadsheet_url()?))
            .bearer_auth(&token.0)
            .json(&json!({
                "requests": [{ "addSheet": { "properties": { "title": title } } }]
            }));

        let body: BatchUpdateResponse = Self::send_json("Add sheet", request).await?;
        let properties = body
            .replies
            .first()
            .and_then(|reply| reply.pointer("/addSheet/properties"))
            .cloned()
            .ok_or_else(|| SheetsError::InvalidResponse {
                operation: "Add sheet",
                message: "missing addSheet reply".into(),
            })?;
        serde_json::from_value(properties).map_err(|e| SheetsError::InvalidResponse {
            operation: "Add sheet",
            message: e.to_string(),
        })
    }

    async fn update_values(
        &self,
        token: &AccessToken,
        range: &str,
        rows: Vec<Vec<Value>>,
    ) -> Result<String, SheetsError> {
        let request = self
            .http
            .put(format!(
                "{}/values/{}",
                self.spreadsheet_url()?,
                urlencoding::encode(range)
            ))
            .bearer_auth(&token.0)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .json(&json!({ "range": range, "majorDimension": "ROWS", "values": rows }));

        let body: UpdateValuesResponse = Self::send_json("Update values", request).await?;
        Ok(body.updated_range)
    }

    async fn append_values(
        &self,
        token: &AccessToken,
        range: &str,
        rows: Vec<Vec<Value>>,
    ) -> Result<String, SheetsError> {
        let request = self
            .http
            .post(format!(
                "{}/values/{}:append",
                self.spreadsheet_url()?,
                urlencoding::encode(range)
            ))
            .bearer_auth(&token.0)
            .query(&[
                ("valueInputOption", "USER_ENTERED"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&json!({ "majorDimension": "ROWS", "values": rows }));

        let body: AppendValuesResponse = Self::send_json("Append values", request).await?;
        Ok(body.updates.updated_range)
    }
}
