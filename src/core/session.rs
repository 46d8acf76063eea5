/// Per-wallet claim session
///
/// Drives the challenge → sign → verify → query sequence against the claim
/// portal. A session owns the wallet key, a browser id fixed for its
/// lifetime and, once VerifySignature succeeds, the authorization token
/// that every later call carries verbatim.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::error::{ClaimError, ClaimResult, TransportError};
use crate::core::framing::{frame, unframe};
use crate::core::message::{simple_request, verify_signature_request, REQUEST_TYPE};
use crate::core::parser::{parse_message, ParsedMessage};
use crate::core::retry::{with_retry, Sleeper};
use crate::core::signer::{MessageSignature, WalletSigner};
use crate::core::transport::{HttpRequest, HttpTransport};
use crate::core::vesting::{extract_vesting, is_eligible, VestingData};
use crate::utils::constants::{
    RpcMethod, ACCEPT_LANGUAGE, BROWSER_ID_LEN, CONTENT_TYPE, ORIGIN, REFERER, USER_AGENT,
};
use crate::utils::CheckerConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    New,
    ChallengeReceived,
    Signed,
    Authorized,
    Queried,
    Eligible,
    NotEligible,
    Done,
    Failed(String),
}

/// What a completed session learned about its wallet
#[derive(Debug, Clone, PartialEq)]
pub struct WalletOutcome {
    pub address: String,
    pub eligible: bool,
    /// `None` when not eligible or when no amounts could be extracted
    pub vesting: Option<VestingData>,
    pub base_info: Option<ParsedMessage>,
}

pub struct ClaimSession {
    signer: WalletSigner,
    transport: Arc<dyn HttpTransport>,
    sleeper: Arc<dyn Sleeper>,
    config: Arc<CheckerConfig>,
    browser_id: String,
    token: Option<String>,
    state: SessionState,
}

impl ClaimSession {
    pub fn new(
        signer: WalletSigner,
        transport: Arc<dyn HttpTransport>,
        sleeper: Arc<dyn Sleeper>,
        config: Arc<CheckerConfig>,
    ) -> Self {
        let browser_id = STANDARD.encode(rand::random::<[u8; BROWSER_ID_LEN]>());
        Self {
            signer,
            transport,
            sleeper,
            config,
            browser_id,
            token: None,
            state: SessionState::New,
        }
    }

    pub fn address(&self) -> &str {
        self.signer.address()
    }

    pub fn browser_id(&self) -> &str {
        &self.browser_id
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Run the whole pipeline for this wallet
    pub async fn check(&mut self, fetch_base_info: bool) -> ClaimResult<WalletOutcome> {
        match self.run(fetch_base_info).await {
            Ok(outcome) => {
                self.state = SessionState::Done;
                Ok(outcome)
            }
            Err(err) => {
                self.state = SessionState::Failed(err.to_string());
                Err(err)
            }
        }
    }

    async fn run(&mut self, fetch_base_info: bool) -> ClaimResult<WalletOutcome> {
        let challenge = self.get_signature_message().await?;
        let signature = self.sign_challenge(&challenge);
        self.verify_signature(&signature).await?;

        let account = self.get_account_info().await?;
        let eligible = is_eligible(&account, self.config.eligibility_min_length);

        if !eligible {
            self.state = SessionState::NotEligible;
            return Ok(WalletOutcome {
                address: self.address().to_string(),
                eligible,
                vesting: None,
                base_info: None,
            });
        }
        self.state = SessionState::Eligible;

        let base_info = if fetch_base_info {
            Some(self.get_vesting_base_info().await?)
        } else {
            None
        };

        // eligibility stands even when the vesting query fails
        let vesting = match self.get_vesting_claim_info().await {
            Ok(claim) => extract_vesting(&claim, 1, self.config.allocation_min_value),
            Err(err) => {
                warn!(address = self.address(), error = %err, "vesting query failed, amounts unknown");
                None
            }
        };

        Ok(WalletOutcome {
            address: self.address().to_string(),
            eligible,
            vesting,
            base_info,
        })
    }

    /// Request the login challenge. Field 1 of the reply is the message to sign.
    pub async fn get_signature_message(&mut self) -> ClaimResult<String> {
        let reply = self
            .call(RpcMethod::GetSignatureMessage, &simple_request(REQUEST_TYPE))
            .await?;
        let challenge = reply
            .text(1)
            .ok_or_else(|| ClaimError::protocol("GetSignatureMessage reply has no text field 1"))?
            .to_string();

        self.state = SessionState::ChallengeReceived;
        Ok(challenge)
    }

    pub fn sign_challenge(&mut self, challenge: &str) -> MessageSignature {
        let signature = self.signer.sign(challenge.as_bytes());
        debug!(address = self.address(), signature = %signature.to_base58(), "signed challenge");
        self.state = SessionState::Signed;
        signature
    }

    /// Exchange the signature for an authorization token and keep it
    pub async fn verify_signature(&mut self, signature: &MessageSignature) -> ClaimResult<String> {
        let nonce = Uuid::new_v4().to_string();
        let body = verify_signature_request(
            self.signer.address(),
            signature.as_bytes(),
            &nonce,
            &self.config.wallet_type,
        );

        let reply = self.call(RpcMethod::VerifySignature, &body).await?;
        let token = reply
            .text(1)
            .ok_or_else(|| ClaimError::protocol("VerifySignature reply has no token in field 1"))?
            .to_string();

        self.token = Some(token.clone());
        self.state = SessionState::Authorized;
        Ok(token)
    }

    /// Authorized call with an empty message body
    pub async fn get_account_info(&mut self) -> ClaimResult<ParsedMessage> {
        let reply = self.call(RpcMethod::GetAccountInfo, &[]).await?;
        self.state = SessionState::Queried;
        Ok(reply)
    }

    pub async fn get_vesting_base_info(&self) -> ClaimResult<ParsedMessage> {
        self.call(RpcMethod::GetVestingBaseInfo, &simple_request(REQUEST_TYPE))
            .await
    }

    pub async fn get_vesting_claim_info(&self) -> ClaimResult<ParsedMessage> {
        self.call(RpcMethod::GetVestingClaimInfo, &simple_request(REQUEST_TYPE))
            .await
    }

    fn base_headers(&self, method: RpcMethod) -> ClaimResult<Vec<(String, String)>> {
        let mut headers: Vec<(String, String)> = [
            ("accept", "*/*"),
            ("accept-language", ACCEPT_LANGUAGE),
            ("browser-id", self.browser_id.as_str()),
            ("content-type", CONTENT_TYPE),
            ("origin", ORIGIN),
            ("platform", "WEB"),
            ("referer", REFERER),
            ("user-agent", USER_AGENT),
            ("x-grpc-web", "1"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        if method.is_authorized() {
            let token = self.token.as_ref().ok_or_else(|| {
                ClaimError::protocol(format!(
                    "{} needs an authorization token; call VerifySignature first",
                    method.name()
                ))
            })?;
            headers.push(("authorization".to_string(), token.clone()));
        }

        Ok(headers)
    }

    /// Frame, send with retries, check status, unframe and parse
    async fn call(&self, method: RpcMethod, payload: &[u8]) -> ClaimResult<ParsedMessage> {
        let headers = self.base_headers(method)?;
        let url = method.url(&self.config.base_url);
        let body = frame(payload);
        let transport = self.transport.as_ref();

        info!(method = method.name(), address = self.address(), "calling");

        let response = with_retry(
            &self.config.retry_policy(),
            self.sleeper.as_ref(),
            method.name(),
            || {
                let mut headers = headers.clone();
                headers.push(("x-request-id".to_string(), Uuid::new_v4().to_string()));
                let request = HttpRequest {
                    url: url.clone(),
                    headers,
                    body: body.clone(),
                };
                async move {
                    let url = request.url.clone();
                    let response = transport.post(request).await?;
                    if response.is_success() {
                        Ok(response)
                    } else {
                        Err(TransportError::Status {
                            url,
                            status: response.status,
                        })
                    }
                }
            },
        )
        .await?;

        let payload = unframe(&response.body)?;
        let message = parse_message(payload)?;
        debug!(method = method.name(), %message, "reply");
        Ok(message)
    }
}
