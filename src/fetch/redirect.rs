//! Explicit re-authorization of every redirect hop.

use reqwest::Url;
use reqwest::redirect::{Attempt, Policy};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RedirectRejected {
    #[error("too many redirects (limit {0})")]
    TooMany(usize),

    #[error("refusing to downgrade from {from} to {to}")]
    Downgrade { from: Url, to: Url },

    #[error("unsupported redirect target scheme '{0}'")]
    Scheme(String),

    #[error("cross-origin redirect from {from} to {to}")]
    CrossOrigin { from: Url, to: Url },
}

/// Decide whether a redirect to `next` may be followed.
///
/// `chain` holds the URLs requested so far, starting with the original one.
pub fn check_redirect(
    chain: &[Url],
    next: &Url,
    max_redirects: usize,
    allow_cross_origin: bool,
) -> Result<(), RedirectRejected> {
    if chain.len() > max_redirects {
        return Err(RedirectRejected::TooMany(max_redirects));
    }

    if !matches!(next.scheme(), "http" | "https") {
        return Err(RedirectRejected::Scheme(next.scheme().to_string()));
    }

    if let Some(previous) = chain.last() {
        if previous.scheme() == "https" && next.scheme() == "http" {
            return Err(RedirectRejected::Downgrade {
                from: previous.clone(),
                to: next.clone(),
            });
        }
    }

    if let Some(origin) = chain.first() {
        if !allow_cross_origin && origin.origin() != next.origin() {
            return Err(RedirectRejected::CrossOrigin {
                from: origin.clone(),
                to: next.clone(),
            });
        }
    }

    Ok(())
}

pub(super) fn policy(max_redirects: usize, allow_cross_origin: bool) -> Policy {
    Policy::custom(move |attempt: Attempt| {
        let decision = check_redirect(
            attempt.previous(),
            attempt.url(),
            max_redirects,
            allow_cross_origin,
        );
        match decision {
            Ok(()) => {
                tracing::debug!(to = %attempt.url(), "following redirect");
                attempt.follow()
            }
            Err(err) => {
                tracing::warn!(%err, "rejected redirect");
                attempt.error(err)
            }
        }
    })
}
