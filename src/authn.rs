// Copyright (C) 2025-2026 Michael Herstine <sp1ff@pobox.com>
//
// This file is part of tabs.
//
// tabs is free software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// tabs is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without
// even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
// General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with tabs.  If not,
// see <http://www.gnu.org/licenses/>.

//! # authn
//!
//! Stateless, header-based authentication.
//!
//! There are no accounts, no sessions & no server-side credential storage of any kind. A request
//! is authenticated by two headers:
//!
//! - `user`: the caller's identity (any non-empty string)
//! - `token`: `hex(HMAC-SHA256(key: salt, message: user))`, where the salt is a server-side
//!   configuration value
//!
//! The server recomputes the MAC over the presented username & compares, so verification requires
//! no I/O at all. Nb. the consequence: anyone who knows the salt can mint a token for *any*
//! username-- the salt is a shared secret between the server and everyone it trusts, and user
//! identities merely partition the data. That's the intended trust model for a personal, few-user
//! deployment, not an oversight.

use crate::{entities::Username, tabs::Tabs};

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use snafu::{Backtrace, OptionExt, ResultExt, Snafu, ensure};
use tracing::{debug, error};

use std::{str::FromStr, sync::Arc};

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("No (or an invalid) user header accompanied this request"))]
    BadUser {
        source: crate::entities::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("The presented token doesn't verify for the presented user"))]
    BadToken { backtrace: Backtrace },
    #[snafu(display("No token header accompanied this request"))]
    MissingToken { backtrace: Backtrace },
    #[snafu(display("No user header accompanied this request"))]
    MissingUser { backtrace: Backtrace },
    #[snafu(display("A header value wasn't legal ASCII: {source}"))]
    NonAsciiHeader {
        source: axum::http::header::ToStrError,
        backtrace: Backtrace,
    },
}

type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                        token derivation                                        //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Compute the token for `user` under `salt`: lowercase hex of HMAC-SHA256 keyed by the salt's
/// UTF-8 bytes over the username's UTF-8 bytes
pub fn token_for(salt: &SecretString, user: &Username) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(salt.expose_secret().as_bytes())
        .unwrap(/* HMAC-SHA256 accepts keys of any length */);
    mac.update(user.as_str().as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verify `token` for `user`; the comparison is ASCII case-insensitive, so upper-case hex is as
/// good as lower
pub fn verify(salt: &SecretString, user: &Username, token: &str) -> Result<()> {
    ensure!(
        token.eq_ignore_ascii_case(&token_for(salt, user)),
        BadTokenSnafu
    );
    Ok(())
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                           middleware                                           //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Authenticate the current request
///
/// Function-based axum [middleware]: on success, attach the authenticated [Username] to the
/// request's extensions & invoke the rest of the stack; on failure, respond 401 with the bare
/// body `Unauthorized`. Deliberately the *same* response for every failure mode-- missing
/// headers, unknown scheme, bad MAC-- so a probing caller learns nothing from the error shape.
///
/// [middleware]: https://docs.rs/axum/latest/axum/middleware/index.html
pub async fn authenticate(
    State(state): State<Arc<Tabs>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Response {
    // Use a nested function returning a `Result` so I can use the `?` sigil, Snafu's `ResultExt`
    // & `OptionExt` and generally write idiomatically; then have the outer implementation handle
    // converting that to an axum Response.
    fn authenticate1(headers: &HeaderMap, salt: &SecretString) -> Result<Username> {
        let user = headers
            .get("user")
            .context(MissingUserSnafu)?
            .to_str()
            .context(NonAsciiHeaderSnafu)?;
        let user = Username::from_str(user).context(BadUserSnafu)?;
        let token = headers
            .get("token")
            .context(MissingTokenSnafu)?
            .to_str()
            .context(NonAsciiHeaderSnafu)?;
        verify(salt, &user, token)?;
        Ok(user)
    }

    match authenticate1(&headers, &state.salt) {
        Ok(user) => {
            debug!("tabs authorized user {}", user);
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        // I want to be careful about what sort of information we reveal to our caller...
        Err(err) => {
            error!("tabs failed to authenticate this request: {}", err);
            (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
        }
    }
}

#[cfg(test)]
mod authn_tests {
    use super::*;

    fn salt(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    #[test]
    fn tokens_are_deterministic_lowercase_hex() {
        let user = Username::from_str("a").unwrap();
        let tok1 = token_for(&salt("tabs"), &user);
        let tok2 = token_for(&salt("tabs"), &user);
        assert_eq!(tok1, tok2);
        // 32-byte MAC, hex-encoded
        assert_eq!(tok1.len(), 64);
        assert!(tok1.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn verification_is_case_insensitive() {
        let user = Username::from_str("sp1ff").unwrap();
        let tok = token_for(&salt("tabs"), &user).to_uppercase();
        assert!(verify(&salt("tabs"), &user, &tok).is_ok());
    }

    #[test]
    fn wrong_salt_or_user_fails() {
        let user = Username::from_str("sp1ff").unwrap();
        let tok = token_for(&salt("tabs"), &user);
        assert!(verify(&salt("not-tabs"), &user, &tok).is_err());
        let other = Username::from_str("mallory").unwrap();
        assert!(verify(&salt("tabs"), &other, &tok).is_err());
        assert!(verify(&salt("tabs"), &user, "").is_err());
    }
}
