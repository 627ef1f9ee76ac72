//! Cache-Control policies for read responses.

use axum::http::{header, HeaderValue, Response};
use std::time::Duration;
use stratus_types::Visibility;

use crate::access::REQUESTER_HEADER;

/// How long moving views (branches, trees, history) stay fresh.
const LISTING_MAX_AGE: Duration = Duration::from_secs(10);
/// How long a stale moving view may be served while revalidating.
const LISTING_STALE: Duration = Duration::from_secs(60);
/// Freshness of blob content addressed by branch.
const BLOB_MAX_AGE: Duration = Duration::from_secs(300);
/// One year; used for content addressed by commit id.
const IMMUTABLE_MAX_AGE: Duration = Duration::from_secs(31_536_000);

/// Cache control directives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheControl {
    /// Content that never changes (addressed by commit id).
    Immutable {
        /// Restrict to private caches.
        private: bool,
    },
    /// Cacheable for a duration.
    MaxAge {
        /// Restrict to private caches.
        private: bool,
        /// Freshness lifetime.
        max_age: Duration,
        /// Window during which a stale copy may be served while revalidating.
        stale_while_revalidate: Option<Duration>,
    },
}

impl CacheControl {
    /// Converts to a Cache-Control header value.
    pub fn to_header_value(&self) -> HeaderValue {
        let scope = |private: bool| if private { "private" } else { "public" };
        let value = match self {
            CacheControl::Immutable { private } => format!(
                "{}, max-age={}, immutable",
                scope(*private),
                IMMUTABLE_MAX_AGE.as_secs()
            ),
            CacheControl::MaxAge {
                private,
                max_age,
                stale_while_revalidate,
            } => {
                let mut value = format!("{}, max-age={}", scope(*private), max_age.as_secs());
                if let Some(stale) = stale_while_revalidate {
                    value.push_str(&format!(", stale-while-revalidate={}", stale.as_secs()));
                }
                value
            }
        };
        HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("no-cache"))
    }

    /// Branches, trees and commit history: short-lived, served stale while refreshing.
    pub fn for_listing(visibility: Visibility) -> Self {
        CacheControl::MaxAge {
            private: visibility == Visibility::Private,
            max_age: LISTING_MAX_AGE,
            stale_while_revalidate: Some(LISTING_STALE),
        }
    }

    /// Content resolved through a branch name.
    pub fn for_blob(visibility: Visibility) -> Self {
        CacheControl::MaxAge {
            private: visibility == Visibility::Private,
            max_age: BLOB_MAX_AGE,
            stale_while_revalidate: None,
        }
    }

    /// Content addressed by commit id.
    pub fn for_commit_addressed(visibility: Visibility) -> Self {
        CacheControl::Immutable {
            private: visibility == Visibility::Private,
        }
    }
}

/// Adds cache headers to a response.
pub fn add_cache_headers<B>(response: &mut Response<B>, cache_control: CacheControl) {
    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, cache_control.to_header_value());
    // Responses differ by requester for private repositories.
    headers.insert(
        header::VARY,
        HeaderValue::from_str(&format!("Accept-Encoding, {}", REQUESTER_HEADER))
            .unwrap_or_else(|_| HeaderValue::from_static("Accept-Encoding")),
    );
}
