use crate::config::AllowedOrigins;
use crate::error::{reject, ApiError};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use warp::{Filter, Rejection};

/// Origins must already be validated by `config::parse_origins`.
pub fn cors(allowed_origins: &AllowedOrigins) -> warp::cors::Builder {
    let builder = match allowed_origins {
        AllowedOrigins::Any => warp::cors().allow_any_origin(),
        AllowedOrigins::List(origins) => {
            warp::cors().allow_origins(origins.iter().map(String::as_str))
        }
    };
    builder
        .allow_headers(vec![
            "User-Agent",
            "Sec-Fetch-Mode",
            "Referer",
            "Origin",
            "Access-Control-Request-Method",
            "Access-Control-Request-Headers",
            "Content-Type",
            "Authorization",
            "Accept",
            "Content-Length",
        ])
        .allow_methods(vec!["POST", "GET", "OPTIONS"])
        .allow_credentials(true)
}

pub type SharedLimiter = Arc<DefaultDirectRateLimiter>;

/// Process-wide limiter for the question endpoint. Zero is treated as one.
pub fn limiter(per_minute: u32) -> SharedLimiter {
    let per_minute = NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN);
    Arc::new(RateLimiter::direct(Quota::per_minute(per_minute)))
}

pub fn rate_limited(
    limiter: SharedLimiter,
) -> impl Filter<Extract = (), Error = Rejection> + Clone {
    warp::any()
        .and_then(move || {
            let limiter = limiter.clone();
            async move {
                limiter
                    .check()
                    .map_err(|_| reject(ApiError::RateLimitExceeded))
            }
        })
        .untuple_one()
}
