//! HS256 JWT token maker

use chrono::{DateTime, Duration, SubsecRound, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::token::{Payload, TokenError, TokenMaker};

pub const MIN_SECRET_KEY_SIZE: usize = 32;

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    jti: String, // Payload id
    sub: String, // Username
    iat: i64,
    exp: i64,
}

impl From<&Payload> for Claims {
    fn from(p: &Payload) -> Self {
        Self {
            jti: p.id.to_string(),
            sub: p.username.clone(),
            iat: p.issued_at.timestamp(),
            exp: p.expired_at.timestamp(),
        }
    }
}

impl TryFrom<Claims> for Payload {
    type Error = TokenError;

    fn try_from(c: Claims) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&c.jti).map_err(|e| TokenError::Invalid(e.to_string()))?;
        let issued_at = DateTime::from_timestamp(c.iat, 0)
            .ok_or_else(|| TokenError::Invalid(format!("bad iat: {}", c.iat)))?;
        let expired_at = DateTime::from_timestamp(c.exp, 0)
            .ok_or_else(|| TokenError::Invalid(format!("bad exp: {}", c.exp)))?;
        Ok(Payload {
            id,
            username: c.sub,
            issued_at,
            expired_at,
        })
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid(e.to_string()),
        }
    }
}

/// Symmetric-key JWT maker
pub struct JwtMaker {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtMaker {
    pub fn new(secret_key: &str) -> Result<Self, TokenError> {
        if secret_key.len() < MIN_SECRET_KEY_SIZE {
            return Err(TokenError::KeyTooShort {
                min: MIN_SECRET_KEY_SIZE,
                actual: secret_key.len(),
            });
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret_key.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret_key.as_bytes()),
            validation,
        })
    }
}

impl TokenMaker for JwtMaker {
    fn create_token(
        &self,
        username: &str,
        duration: Duration,
    ) -> Result<(String, Payload), TokenError> {
        // JWT timestamps are whole seconds
        let payload = Payload::new(username, Utc::now().trunc_subsecs(0), duration);
        let token = encode(
            &Header::new(Algorithm::HS256),
            &Claims::from(&payload),
            &self.encoding_key,
        )?;
        Ok((token, payload))
    }

    fn verify_token(&self, token: &str) -> Result<Payload, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        let payload = Payload::try_from(data.claims)?;
        payload.valid()?;
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::RandomGen;

    fn maker() -> JwtMaker {
        JwtMaker::new(&RandomGen::seeded(42).string(32)).unwrap()
    }

    #[test]
    fn test_create_and_verify() {
        let maker = maker();
        let (token, issued) = maker.create_token("alice", Duration::minutes(1)).unwrap();
        assert!(!token.is_empty());

        let payload = maker.verify_token(&token).unwrap();
        assert_eq!(payload, issued);
        assert_eq!(payload.username, "alice");
        assert!(payload.expired_at > Utc::now());
    }

    #[test]
    fn test_expired_token() {
        let maker = maker();
        let (token, _) = maker.create_token("alice", -Duration::minutes(1)).unwrap();
        assert_eq!(maker.verify_token(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_garbage_token() {
        let err = maker().verify_token("not.a.jwt").unwrap_err();
        assert!(matches!(err, TokenError::Invalid(_)));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let (token, _) = maker().create_token("alice", Duration::minutes(1)).unwrap();
        let other = JwtMaker::new(&RandomGen::seeded(7).string(40)).unwrap();
        assert!(matches!(
            other.verify_token(&token),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn test_none_algorithm_rejected() {
        // {"alg":"none","typ":"JWT"} with a plausible claim set and no signature
        let header = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0";
        let claims = "eyJqdGkiOiIwMDAwMDAwMC0wMDAwLTAwMDAtMDAwMC0wMDAwMDAwMDAwMDAiLCJzdWIiOiJhbGljZSIsImlhdCI6MCwiZXhwIjo0MTAyNDQ0ODAwfQ";
        let token = format!("{}.{}.", header, claims);
        assert!(maker().verify_token(&token).is_err());
    }

    #[test]
    fn test_short_key_rejected() {
        assert_eq!(
            JwtMaker::new("short").err(),
            Some(TokenError::KeyTooShort {
                min: MIN_SECRET_KEY_SIZE,
                actual: 5
            })
        );
    }
}
