//! Issues and verifies the signed session tokens handed out at log-in.

use std::fmt::Debug;

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::{
    Error,
    auth::{Identity, IdentityStore, UserID},
};

/// The contents of a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// The ID of the user the token was issued to.
    pub sub: String,
    /// The email of the user at the time the token was issued.
    pub email: String,
    /// When the token was issued, as a Unix timestamp.
    pub iat: i64,
    /// When the token expires, as a Unix timestamp.
    pub exp: i64,
}

impl Claims {
    /// Parse the subject claim as a user ID.
    ///
    /// # Errors
    /// Returns [TokenError::Malformed] if the subject is not an integer.
    pub fn user_id(&self) -> Result<UserID, TokenError> {
        self.sub
            .parse::<i64>()
            .map(UserID::new)
            .map_err(|_| TokenError::Malformed)
    }
}

/// Why a token could not be verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// The token is not a well-formed token or its claims have the wrong shape.
    #[error("the token is malformed")]
    Malformed,
    /// The token's expiry time has passed.
    #[error("the token has expired")]
    Expired,
    /// The token was not signed with this server's secret.
    #[error("the token signature is invalid")]
    SignatureInvalid,
    /// The user the token was issued to no longer exists.
    #[error("the token subject no longer exists")]
    SubjectMissing,
}

/// A freshly signed token.
#[derive(Debug, Clone, PartialEq)]
pub struct IssuedToken {
    /// The encoded token to hand to the client.
    pub token: String,
    /// When the token stops being accepted.
    pub expires_at: OffsetDateTime,
}

/// A token that has passed every check, along with who it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedToken {
    /// The identity of the user as currently stored.
    pub identity: Identity,
    /// The raw claims embedded in the token.
    pub claims: Claims,
    /// When the token was issued.
    pub issued_at: OffsetDateTime,
    /// When the token expires.
    pub expires_at: OffsetDateTime,
}

/// Signs and verifies session tokens with a shared secret (HMAC-SHA256).
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    time_to_live: Duration,
}

impl TokenCodec {
    /// Create a codec that signs with `secret` and issues tokens valid for `time_to_live`.
    pub fn new(secret: &[u8], time_to_live: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);
        // Tokens are issued and checked by the same clock.
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            time_to_live,
        }
    }

    /// How long issued tokens stay valid.
    pub fn time_to_live(&self) -> Duration {
        self.time_to_live
    }

    /// Issue a token for `identity` that expires [Self::time_to_live] from now.
    ///
    /// # Errors
    /// Returns [Error::TokenCreation] if the token could not be signed.
    pub fn issue(&self, identity: &Identity) -> Result<IssuedToken, Error> {
        self.issue_at(identity, OffsetDateTime::now_utc())
    }

    /// Issue a token for `identity` as if it were issued at `issued_at`.
    ///
    /// The same identity and issue time always produce the same token.
    ///
    /// # Errors
    /// Returns [Error::TokenCreation] if the expiry is out of range or the token
    /// could not be signed.
    pub fn issue_at(
        &self,
        identity: &Identity,
        issued_at: OffsetDateTime,
    ) -> Result<IssuedToken, Error> {
        let expires_at = issued_at
            .checked_add(self.time_to_live)
            .ok_or_else(|| Error::TokenCreation("token expiry is out of range".to_owned()))?;
        let claims = Claims {
            sub: identity.user_id.to_string(),
            email: identity.email.clone(),
            iat: issued_at.unix_timestamp(),
            exp: expires_at.unix_timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|error| Error::TokenCreation(error.to_string()))?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Check the signature and expiry of `token` and return its claims.
    ///
    /// The signature is checked before any claim is read.
    ///
    /// # Errors
    /// Returns [TokenError::SignatureInvalid], [TokenError::Expired] or
    /// [TokenError::Malformed].
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|token_data| token_data.claims)
            .map_err(|error| match error.kind() {
                ErrorKind::InvalidSignature => TokenError::SignatureInvalid,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            })
    }

    /// Decode `token` and resolve its subject through `identities`.
    ///
    /// # Errors
    /// Returns [Error::Authentication] wrapping the [TokenError] if the token is
    /// rejected, or the store's error if the identity lookup itself failed.
    pub fn verify(
        &self,
        token: &str,
        identities: &dyn IdentityStore,
    ) -> Result<VerifiedToken, Error> {
        let claims = self.decode(token)?;
        let user_id = claims.user_id()?;
        let issued_at =
            OffsetDateTime::from_unix_timestamp(claims.iat).map_err(|_| TokenError::Malformed)?;
        let expires_at =
            OffsetDateTime::from_unix_timestamp(claims.exp).map_err(|_| TokenError::Malformed)?;

        let identity = identities
            .find_identity(user_id)?
            .ok_or(TokenError::SubjectMissing)?;

        Ok(VerifiedToken {
            identity,
            claims,
            issued_at,
            expires_at,
        })
    }
}

impl Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &"HS256")
            .field("time_to_live", &self.time_to_live)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
    use time::{Duration, OffsetDateTime, macros::datetime};

    use crate::{
        Error,
        auth::{AuthFailure, Identity, IdentityStore, UserID},
    };

    use super::{Claims, TokenCodec, TokenError};

    const SECRET: &[u8] = b"a-test-secret-that-is-long-enough";

    struct StubIdentities(HashMap<UserID, Identity>);

    impl StubIdentities {
        fn with(identity: &Identity) -> Self {
            Self(HashMap::from([(identity.user_id, identity.clone())]))
        }
    }

    impl IdentityStore for StubIdentities {
        fn find_identity(&self, user_id: UserID) -> Result<Option<Identity>, Error> {
            Ok(self.0.get(&user_id).cloned())
        }
    }

    fn test_identity() -> Identity {
        Identity {
            user_id: UserID::new(7),
            email: "test@example.com".to_owned(),
        }
    }

    fn get_codec() -> TokenCodec {
        TokenCodec::new(SECRET, Duration::hours(1))
    }

    #[test]
    fn issue_fails_when_expiry_is_out_of_range() {
        let codec = TokenCodec::new(SECRET, Duration::minutes(i64::from(u32::MAX)));

        let result = codec.issue_at(&test_identity(), datetime!(9999-01-01 0:00 UTC));

        assert!(matches!(result, Err(Error::TokenCreation(_))));
    }

    #[test]
    fn verify_returns_identity_of_issued_token() {
        let codec = get_codec();
        let identity = test_identity();

        let issued = codec.issue(&identity).unwrap();
        let verified = codec
            .verify(&issued.token, &StubIdentities::with(&identity))
            .unwrap();

        assert_eq!(verified.identity, identity);
        assert_eq!(verified.claims.email, identity.email);
        assert_eq!(verified.claims.sub, "7");
        assert_eq!(verified.expires_at.unix_timestamp(), issued.expires_at.unix_timestamp());
        assert_eq!(verified.expires_at - verified.issued_at, Duration::hours(1));
    }

    #[test]
    fn issue_is_deterministic_for_same_payload() {
        let codec = get_codec();
        let identity = test_identity();
        let issued_at = datetime!(2025-06-01 12:00:00 UTC);

        let first = codec.issue_at(&identity, issued_at).unwrap();
        let second = codec.issue_at(&identity, issued_at).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn expired_token_fails_with_expired() {
        let codec = get_codec();
        let issued_at = OffsetDateTime::now_utc() - Duration::days(1);
        let issued = codec.issue_at(&test_identity(), issued_at).unwrap();

        assert_eq!(codec.decode(&issued.token), Err(TokenError::Expired));
    }

    #[test]
    fn token_signed_with_other_secret_fails_with_signature_invalid() {
        let other_codec = TokenCodec::new(b"some-other-secret-entirely", Duration::hours(1));
        let issued = other_codec.issue(&test_identity()).unwrap();

        assert_eq!(get_codec().decode(&issued.token), Err(TokenError::SignatureInvalid));
    }

    #[test]
    fn expired_token_with_wrong_signature_fails_with_signature_invalid() {
        let other_codec = TokenCodec::new(b"some-other-secret-entirely", Duration::hours(1));
        let issued = other_codec
            .issue_at(&test_identity(), OffsetDateTime::now_utc() - Duration::days(1))
            .unwrap();

        assert_eq!(get_codec().decode(&issued.token), Err(TokenError::SignatureInvalid));
    }

    #[test]
    fn garbage_fails_with_malformed() {
        let codec = get_codec();

        assert_eq!(codec.decode("not.a.token"), Err(TokenError::Malformed));
        assert_eq!(codec.decode(""), Err(TokenError::Malformed));
    }

    #[test]
    fn missing_claims_fail_with_malformed() {
        #[derive(serde::Serialize)]
        struct PartialClaims {
            sub: String,
            exp: i64,
        }

        let claims = PartialClaims {
            sub: "7".to_owned(),
            exp: (OffsetDateTime::now_utc() + Duration::hours(1)).unix_timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert_eq!(get_codec().decode(&token), Err(TokenError::Malformed));
    }

    #[test]
    fn non_numeric_subject_fails_with_malformed() {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: "not-a-number".to_owned(),
            email: "test@example.com".to_owned(),
            iat: now.unix_timestamp(),
            exp: (now + Duration::hours(1)).unix_timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        let result = get_codec().verify(&token, &StubIdentities(HashMap::new()));

        assert_eq!(result, Err(Error::Authentication(AuthFailure::Malformed)));
    }

    #[test]
    fn deleted_user_fails_with_subject_missing() {
        let codec = get_codec();
        let issued = codec.issue(&test_identity()).unwrap();

        let result = codec.verify(&issued.token, &StubIdentities(HashMap::new()));

        assert_eq!(
            result,
            Err(Error::Authentication(AuthFailure::SubjectMissing))
        );
    }
}
