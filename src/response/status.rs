//! Status markers.
//!
//! A response type names its status code with an associated marker type:
//!
//! ```rust
//! use typeroute::response::status::{FixedStatus, StatusCreated};
//!
//! assert_eq!(StatusCreated::CODE, 201);
//! assert_eq!(StatusCreated::REASON, "Created");
//! ```
//!
//! One marker exists for every IANA-registered code.

/// A type that stands for one fixed HTTP status code.
pub trait FixedStatus: Send + Sync + 'static {
    const CODE: u16;
    const REASON: &'static str;
}

macro_rules! status_markers {
    ($($name:ident = $code:literal, $reason:literal;)*) => {
        $(
            #[doc = concat!("`", stringify!($code), " ", $reason, "`")]
            #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
            pub struct $name;

            impl FixedStatus for $name {
                const CODE: u16 = $code;
                const REASON: &'static str = $reason;
            }
        )*

        /// Every registered `(code, reason)` pair, ascending.
        pub const REGISTERED: &[(u16, &str)] = &[$(($code, $reason)),*];
    };
}

status_markers! {
    StatusContinue = 100, "Continue";
    StatusSwitchingProtocols = 101, "Switching Protocols";
    StatusProcessing = 102, "Processing";
    StatusEarlyHints = 103, "Early Hints";

    StatusOk = 200, "OK";
    StatusCreated = 201, "Created";
    StatusAccepted = 202, "Accepted";
    StatusNonAuthoritativeInfo = 203, "Non-Authoritative Information";
    StatusNoContent = 204, "No Content";
    StatusResetContent = 205, "Reset Content";
    StatusPartialContent = 206, "Partial Content";
    StatusMultiStatus = 207, "Multi-Status";
    StatusAlreadyReported = 208, "Already Reported";
    StatusImUsed = 226, "IM Used";

    StatusMultipleChoices = 300, "Multiple Choices";
    StatusMovedPermanently = 301, "Moved Permanently";
    StatusFound = 302, "Found";
    StatusSeeOther = 303, "See Other";
    StatusNotModified = 304, "Not Modified";
    StatusUseProxy = 305, "Use Proxy";
    StatusTemporaryRedirect = 307, "Temporary Redirect";
    StatusPermanentRedirect = 308, "Permanent Redirect";

    StatusBadRequest = 400, "Bad Request";
    StatusUnauthorized = 401, "Unauthorized";
    StatusPaymentRequired = 402, "Payment Required";
    StatusForbidden = 403, "Forbidden";
    StatusNotFound = 404, "Not Found";
    StatusMethodNotAllowed = 405, "Method Not Allowed";
    StatusNotAcceptable = 406, "Not Acceptable";
    StatusProxyAuthRequired = 407, "Proxy Authentication Required";
    StatusRequestTimeout = 408, "Request Timeout";
    StatusConflict = 409, "Conflict";
    StatusGone = 410, "Gone";
    StatusLengthRequired = 411, "Length Required";
    StatusPreconditionFailed = 412, "Precondition Failed";
    StatusContentTooLarge = 413, "Content Too Large";
    StatusUriTooLong = 414, "URI Too Long";
    StatusUnsupportedMediaType = 415, "Unsupported Media Type";
    StatusRangeNotSatisfiable = 416, "Range Not Satisfiable";
    StatusExpectationFailed = 417, "Expectation Failed";
    StatusTeapot = 418, "I'm a teapot";
    StatusMisdirectedRequest = 421, "Misdirected Request";
    StatusUnprocessableContent = 422, "Unprocessable Content";
    StatusLocked = 423, "Locked";
    StatusFailedDependency = 424, "Failed Dependency";
    StatusTooEarly = 425, "Too Early";
    StatusUpgradeRequired = 426, "Upgrade Required";
    StatusPreconditionRequired = 428, "Precondition Required";
    StatusTooManyRequests = 429, "Too Many Requests";
    StatusRequestHeaderFieldsTooLarge = 431, "Request Header Fields Too Large";
    StatusUnavailableForLegalReasons = 451, "Unavailable For Legal Reasons";

    StatusInternalServerError = 500, "Internal Server Error";
    StatusNotImplemented = 501, "Not Implemented";
    StatusBadGateway = 502, "Bad Gateway";
    StatusServiceUnavailable = 503, "Service Unavailable";
    StatusGatewayTimeout = 504, "Gateway Timeout";
    StatusHttpVersionNotSupported = 505, "HTTP Version Not Supported";
    StatusVariantAlsoNegotiates = 506, "Variant Also Negotiates";
    StatusInsufficientStorage = 507, "Insufficient Storage";
    StatusLoopDetected = 508, "Loop Detected";
    StatusNotExtended = 510, "Not Extended";
    StatusNetworkAuthenticationRequired = 511, "Network Authentication Required";
}

/// Reason phrase of a registered code.
#[must_use]
pub fn reason(code: u16) -> Option<&'static str> {
    REGISTERED
        .binary_search_by_key(&code, |(c, _)| *c)
        .ok()
        .map(|i| REGISTERED[i].1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markers() {
        assert_eq!(StatusOk::CODE, 200);
        assert_eq!(StatusBadRequest::CODE, 400);
        assert_eq!(StatusNetworkAuthenticationRequired::CODE, 511);
    }

    #[test]
    fn test_registry_is_sorted_and_valid() {
        assert!(REGISTERED.windows(2).all(|w| w[0].0 < w[1].0));
        for (code, _) in REGISTERED {
            assert!(http::StatusCode::from_u16(*code).is_ok());
        }
        assert_eq!(reason(418), Some("I'm a teapot"));
        assert_eq!(reason(299), None);
    }
}
