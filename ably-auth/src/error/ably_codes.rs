// Ably error codes relevant to authentication
// Values follow the Ably protocol so they can be compared with server responses

use super::{AblyError, ErrorInfo};

/// Ably error codes produced or interpreted by the auth engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AblyErrorCode {
    // 40xxx Client errors
    BadRequest = 40000,
    InvalidRequestBody = 40001,

    // 401xx Authentication errors
    Unauthorized = 40100,
    InvalidCredentials = 40101,
    IncompatibleCredentials = 40102,
    InvalidUseOfBasicAuthOverHttp = 40103,

    // 4014x Token errors, all trigger renewal
    TokenError = 40140,
    TokenRevoked = 40141,
    TokenExpired = 40142,
    TokenUnrecognised = 40144,

    NoAuthOptions = 40160,
    TokenCallbackError = 40170,
    NoMeansToRenewToken = 40171,

    // 403xx Authorization errors
    Forbidden = 40300,

    // 404xx Not found errors
    NotFound = 40400,

    // 50xxx Server errors
    InternalServerError = 50000,
    TimeoutError = 50003,
    RequestFailed = 50004,

    // 8xxxx Client library errors
    InvalidResponse = 80019,
}

impl AblyErrorCode {
    pub fn to_u32(self) -> u32 {
        self as u32
    }

    pub fn from_u32(code: u32) -> Option<Self> {
        match code {
            40000 => Some(Self::BadRequest),
            40001 => Some(Self::InvalidRequestBody),

            40100 => Some(Self::Unauthorized),
            40101 => Some(Self::InvalidCredentials),
            40102 => Some(Self::IncompatibleCredentials),
            40103 => Some(Self::InvalidUseOfBasicAuthOverHttp),

            40140 => Some(Self::TokenError),
            40141 => Some(Self::TokenRevoked),
            40142 => Some(Self::TokenExpired),
            40144 => Some(Self::TokenUnrecognised),

            40160 => Some(Self::NoAuthOptions),
            40170 => Some(Self::TokenCallbackError),
            40171 => Some(Self::NoMeansToRenewToken),

            40300 => Some(Self::Forbidden),
            40400 => Some(Self::NotFound),

            50000 => Some(Self::InternalServerError),
            50003 => Some(Self::TimeoutError),
            50004 => Some(Self::RequestFailed),

            80019 => Some(Self::InvalidResponse),

            _ => None,
        }
    }

    /// HTTP status that accompanies this code
    pub fn status_code(&self) -> u16 {
        match self.to_u32() {
            40000..=40099 => 400,
            40100..=40199 => 401,
            40300..=40399 => 403,
            40400..=40499 => 404,
            50003 => 504,
            _ => 500,
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            Self::BadRequest => "Bad request",
            Self::InvalidRequestBody => "Invalid request body",

            Self::Unauthorized => "Unauthorized",
            Self::InvalidCredentials => "Invalid credentials",
            Self::IncompatibleCredentials => "Incompatible credentials",
            Self::InvalidUseOfBasicAuthOverHttp => "Invalid use of basic auth over non-TLS connection",

            Self::TokenError => "Token error",
            Self::TokenRevoked => "Token revoked",
            Self::TokenExpired => "Token expired",
            Self::TokenUnrecognised => "Token unrecognised",

            Self::NoAuthOptions => "No authentication options provided",
            Self::TokenCallbackError => "Error from client token callback",
            Self::NoMeansToRenewToken => "No means provided to renew auth token",

            Self::Forbidden => "Forbidden",
            Self::NotFound => "Not found",

            Self::InternalServerError => "Internal server error",
            Self::TimeoutError => "Timeout error",
            Self::RequestFailed => "Request failed",

            Self::InvalidResponse => "Unexpected response from server",
        }
    }
}

/// Codes in the 4014x range mean the token is expired or otherwise unusable
pub fn is_token_error(code: u32) -> bool {
    (40140..40150).contains(&code)
}

/// Convert HTTP status codes to Ably error codes
pub fn http_to_ably_code(status: u16) -> AblyErrorCode {
    match status {
        400 => AblyErrorCode::BadRequest,
        401 => AblyErrorCode::Unauthorized,
        403 => AblyErrorCode::Forbidden,
        404 => AblyErrorCode::NotFound,
        408 | 504 => AblyErrorCode::TimeoutError,
        500 => AblyErrorCode::InternalServerError,
        _ => AblyErrorCode::RequestFailed,
    }
}

/// Parse error response from Ably API
pub fn parse_ably_error(status: u16, body: &[u8]) -> AblyError {
    if let Some(info) = ErrorInfo::from_body(body) {
        let message = info.message.unwrap_or_else(|| {
            AblyErrorCode::from_u32(info.code)
                .map(|code| code.default_message())
                .unwrap_or("Unknown error")
                .to_string()
        });
        return AblyError::api(info.status_code.unwrap_or(status), info.code, message);
    }

    // Fallback to status-based error
    let code = http_to_ably_code(status);
    AblyError::api(status, code.to_u32(), code.default_message())
}
