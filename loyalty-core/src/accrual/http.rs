use super::{AccrualError, AccrualOracle, AccrualResponse};
use crate::config::AccrualClientConfig;
use async_trait::async_trait;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use tracing::debug;

/// Accrual oracle reached over HTTP at `GET {base}/api/orders/{number}`.
#[derive(Debug, Clone)]
pub struct HttpAccrualOracle {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpAccrualOracle {
    pub fn new(config: &AccrualClientConfig) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http_client,
            base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
        })
    }

    fn order_url(&self, order_id: &str) -> String {
        format!("{}/api/orders/{}", self.base_url, order_id)
    }
}

/// Map an oracle HTTP status onto the lookup outcome.
///
/// Only 200 carries an answer; 429 and 500 are the transient ones.
pub fn classify_status(status: StatusCode) -> Result<(), AccrualError> {
    match status {
        StatusCode::OK => Ok(()),
        StatusCode::NO_CONTENT => Err(AccrualError::NoContent),
        StatusCode::TOO_MANY_REQUESTS => Err(AccrualError::RateLimited),
        StatusCode::INTERNAL_SERVER_ERROR => Err(AccrualError::ServerError),
        other => Err(AccrualError::Other {
            status: other.as_u16(),
        }),
    }
}

fn transport_error(err: reqwest::Error) -> AccrualError {
    if err.is_timeout() {
        AccrualError::Timeout
    } else {
        AccrualError::Transport(err.to_string())
    }
}

fn decode_response(order_id: &str, body: &[u8]) -> Result<AccrualResponse, AccrualError> {
    let response: AccrualResponse =
        serde_json::from_slice(body).map_err(|e| AccrualError::Decode(e.to_string()))?;
    if response.order != order_id {
        return Err(AccrualError::Decode(format!(
            "answer is for order {}",
            response.order
        )));
    }
    if response.accrual.is_some_and(|accrual| accrual < Decimal::ZERO) {
        return Err(AccrualError::Decode("negative accrual".to_string()));
    }
    Ok(response)
}

#[async_trait]
impl AccrualOracle for HttpAccrualOracle {
    #[tracing::instrument(skip(self), err(level = "debug"), name = "Accrual:Fetch")]
    async fn fetch(&self, order_id: &str) -> Result<AccrualResponse, AccrualError> {
        let response = self
            .http_client
            .get(self.order_url(order_id))
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        debug!(status = status.as_u16(), "Accrual system answered");
        classify_status(status)?;

        let body = response.bytes().await.map_err(transport_error)?;
        decode_response(order_id, &body)
    }
}
