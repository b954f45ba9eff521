//! Algorithm descriptors: a closed family × hash-width product.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::TokenError;

/// Signature algorithm family, keyed by the two-letter code prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlgorithmFamily {
    /// `RS`: RSASSA-PKCS1-v1_5.
    Rs,
    /// `PS`: RSASSA-PSS.
    Ps,
    /// `ES`: ECDSA.
    Es,
    /// `HS`: HMAC.
    Hs,
}

impl AlgorithmFamily {
    /// Native algorithm name a key must carry to be used with this family.
    pub fn name(&self) -> &'static str {
        match self {
            AlgorithmFamily::Rs => "RSASSA-PKCS1-v1_5",
            AlgorithmFamily::Ps => "RSASSA-PSS",
            AlgorithmFamily::Es => "ECDSA",
            AlgorithmFamily::Hs => "HMAC",
        }
    }

    fn prefix(&self) -> &'static str {
        match self {
            AlgorithmFamily::Rs => "RS",
            AlgorithmFamily::Ps => "PS",
            AlgorithmFamily::Es => "ES",
            AlgorithmFamily::Hs => "HS",
        }
    }
}

/// Digest width paired with the family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashWidth {
    /// SHA-256
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

impl HashWidth {
    /// Digest size in bits.
    pub fn bits(&self) -> u16 {
        match self {
            HashWidth::Sha256 => 256,
            HashWidth::Sha384 => 384,
            HashWidth::Sha512 => 512,
        }
    }

    /// Hash name, always `SHA-<bits>`.
    pub fn name(&self) -> &'static str {
        match self {
            HashWidth::Sha256 => "SHA-256",
            HashWidth::Sha384 => "SHA-384",
            HashWidth::Sha512 => "SHA-512",
        }
    }
}

/// A parsed algorithm code such as `ES256`.
///
/// Serialises as the short code string, so it can sit directly in a token header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Algorithm {
    /// Signature family.
    pub family: AlgorithmFamily,
    /// Digest width.
    pub hash: HashWidth,
}

impl Algorithm {
    /// ECDSA over P-256 with SHA-256, the VAPID algorithm.
    pub const ES256: Algorithm = Algorithm {
        family: AlgorithmFamily::Es,
        hash: HashWidth::Sha256,
    };

    /// Split a code like `ES256` into family and width.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::UnsupportedAlgorithm`] unless `code` matches
    /// `{RS,PS,ES,HS}{256,384,512}` exactly.
    pub fn parse(code: &str) -> Result<Self, TokenError> {
        let unsupported = || TokenError::UnsupportedAlgorithm(code.to_owned());
        if code.len() != 5 || !code.is_ascii() {
            return Err(unsupported());
        }
        let (prefix, bits) = code.split_at(2);
        let family = match prefix {
            "RS" => AlgorithmFamily::Rs,
            "PS" => AlgorithmFamily::Ps,
            "ES" => AlgorithmFamily::Es,
            "HS" => AlgorithmFamily::Hs,
            _ => return Err(unsupported()),
        };
        let hash = match bits {
            "256" => HashWidth::Sha256,
            "384" => HashWidth::Sha384,
            "512" => HashWidth::Sha512,
            _ => return Err(unsupported()),
        };
        Ok(Self { family, hash })
    }

    /// Native algorithm name, e.g. `ECDSA`.
    pub fn name(&self) -> &'static str {
        self.family.name()
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.family.prefix(), self.hash.bits())
    }
}

impl FromStr for Algorithm {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Algorithm {
    type Error = TokenError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Algorithm> for String {
    fn from(alg: Algorithm) -> Self {
        alg.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn es256_is_ecdsa_sha256() {
        let alg = Algorithm::parse("ES256").unwrap();
        assert_eq!(alg, Algorithm::ES256);
        assert_eq!(alg.name(), "ECDSA");
        assert_eq!(alg.hash.name(), "SHA-256");
    }

    #[test]
    fn all_families_and_widths_parse() {
        for prefix in ["RS", "PS", "ES", "HS"] {
            for bits in ["256", "384", "512"] {
                let code = format!("{prefix}{bits}");
                let alg = Algorithm::parse(&code).unwrap();
                assert_eq!(alg.to_string(), code);
                assert_eq!(alg.hash.name(), format!("SHA-{bits}"));
            }
        }
    }

    #[test]
    fn family_names() {
        assert_eq!(Algorithm::parse("RS384").unwrap().name(), "RSASSA-PKCS1-v1_5");
        assert_eq!(Algorithm::parse("PS512").unwrap().name(), "RSASSA-PSS");
        assert_eq!(Algorithm::parse("HS256").unwrap().name(), "HMAC");
    }

    #[test]
    fn unknown_family_rejected() {
        assert!(matches!(
            Algorithm::parse("XX256"),
            Err(TokenError::UnsupportedAlgorithm(ref c)) if c == "XX256"
        ));
    }

    #[test]
    fn unknown_width_and_junk_rejected() {
        for code in ["ES128", "ES2566", "es256", "ES", "", "ÉS256", "none"] {
            assert!(Algorithm::parse(code).is_err(), "{code} should be rejected");
        }
    }

    #[test]
    fn serde_uses_short_code() {
        let json = serde_json::to_string(&Algorithm::ES256).unwrap();
        assert_eq!(json, r#""ES256""#);
        let back: Algorithm = serde_json::from_str(r#""HS512""#).unwrap();
        assert_eq!(back.family, AlgorithmFamily::Hs);
        assert!(serde_json::from_str::<Algorithm>(r#""XX256""#).is_err());
    }
}
