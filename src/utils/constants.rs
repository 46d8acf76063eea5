/// Solayer claim portal endpoints and request constants

/// gRPC-Web service root of the claim portal
pub const BASE_URL: &str = "https://claim.solayer.foundation/api/solayerservice.v1.SolayerService";

pub const ORIGIN: &str = "https://claim.solayer.foundation";
pub const REFERER: &str = "https://claim.solayer.foundation/";

pub const CONTENT_TYPE: &str = "application/grpc-web+proto";
pub const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";
pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36";

/// Wallet label sent with VerifySignature
pub const WALLET_TYPE: &str = "Phantom";

/// Environment variable holding the single-wallet secret key
pub const PRIVATE_KEY_ENV: &str = "PRIVATE_KEY";

pub const DEFAULT_KEYS_FILE: &str = "keys.txt";
pub const DEFAULT_CONFIG_FILE: &str = "config.json";
pub const RESULTS_FILE_PREFIX: &str = "solayer_results";

/// Lower bound for the randomized pause between wallets, in seconds
pub const MIN_WALLET_DELAY_SECS: f64 = 0.1;

/// Length of the random browser id, before base64
pub const BROWSER_ID_LEN: usize = 16;

/// Service methods, in the order a session calls them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcMethod {
    GetSignatureMessage,
    VerifySignature,
    GetAccountInfo,
    GetVestingBaseInfo,
    GetVestingClaimInfo,
}

impl RpcMethod {
    pub fn name(&self) -> &'static str {
        match self {
            RpcMethod::GetSignatureMessage => "GetSignatureMessage",
            RpcMethod::VerifySignature => "VerifySignature",
            RpcMethod::GetAccountInfo => "GetAccountInfo",
            RpcMethod::GetVestingBaseInfo => "GetVestingBaseInfo",
            RpcMethod::GetVestingClaimInfo => "GetVestingClaimInfo",
        }
    }

    /// Whether the call carries the authorization token
    pub fn is_authorized(&self) -> bool {
        !matches!(self, RpcMethod::GetSignatureMessage | RpcMethod::VerifySignature)
    }

    pub fn url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_urls() {
        assert_eq!(
            RpcMethod::GetVestingClaimInfo.url("https://host/api/Svc/"),
            "https://host/api/Svc/GetVestingClaimInfo"
        );
        assert!(RpcMethod::GetSignatureMessage.url(BASE_URL).ends_with("SolayerService/GetSignatureMessage"));
    }

    #[test]
    fn test_login_calls_are_unauthorized() {
        assert!(!RpcMethod::GetSignatureMessage.is_authorized());
        assert!(!RpcMethod::VerifySignature.is_authorized());
        assert!(RpcMethod::GetAccountInfo.is_authorized());
        assert!(RpcMethod::GetVestingBaseInfo.is_authorized());
        assert!(RpcMethod::GetVestingClaimInfo.is_authorized());
    }
}
