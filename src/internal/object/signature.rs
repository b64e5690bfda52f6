//! Author/committer identity lines as they appear in commit and tag objects:
//! `{author|committer} {name} <{email}> {timestamp} {timezone}`.

use std::fmt::Display;
use std::str::FromStr;

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::errors::GitError;

#[derive(PartialEq, Eq, Debug, Clone, Copy, Serialize, Deserialize, Decode, Encode)]
pub enum SignatureType {
    Author,
    Committer,
    Tagger,
}

impl Display for SignatureType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            SignatureType::Author => write!(f, "author"),
            SignatureType::Committer => write!(f, "committer"),
            SignatureType::Tagger => write!(f, "tagger"),
        }
    }
}

impl FromStr for SignatureType {
    type Err = GitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "author" => Ok(SignatureType::Author),
            "committer" => Ok(SignatureType::Committer),
            "tagger" => Ok(SignatureType::Tagger),
            _ => Err(GitError::InvalidSignatureType(s.to_string())),
        }
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize, Decode, Encode)]
pub struct Signature {
    pub signature_type: SignatureType,
    pub name: String,
    pub email: String,
    pub timestamp: i64,
    pub timezone: String,
}

impl Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} <{}> {} {}",
            self.name, self.email, self.timestamp, self.timezone
        )
    }
}

impl Signature {
    /// Build a signature stamped with the current time, in UTC.
    pub fn new(signature_type: SignatureType, name: String, email: String) -> Self {
        Signature {
            signature_type,
            name,
            email,
            timestamp: chrono::Utc::now().timestamp(),
            timezone: "+0000".to_string(),
        }
    }

    /// Parse one `{type} {name} <{email}> {timestamp} {timezone}` line.
    pub fn from_data(data: Vec<u8>) -> Result<Self, GitError> {
        let text = String::from_utf8(data)
            .map_err(|e| GitError::InvalidSignatureType(e.to_string()))?;

        let (type_str, rest) = text
            .split_once(' ')
            .ok_or_else(|| GitError::InvalidSignatureType(text.clone()))?;
        let signature_type = SignatureType::from_str(type_str)?;

        let email_start = rest
            .find('<')
            .ok_or_else(|| GitError::InvalidSignatureType(text.clone()))?;
        let email_end = rest
            .find('>')
            .ok_or_else(|| GitError::InvalidSignatureType(text.clone()))?;
        let name = rest[..email_start].trim().to_string();
        let email = rest[email_start + 1..email_end].to_string();

        let remainder = rest[email_end + 1..].trim();
        let mut parts = remainder.split_whitespace();
        let timestamp: i64 = parts
            .next()
            .ok_or_else(|| GitError::InvalidSignatureType(text.clone()))?
            .parse()
            .map_err(|_| GitError::InvalidSignatureType(text.clone()))?;
        let timezone = parts.next().unwrap_or("+0000").to_string();

        Ok(Signature {
            signature_type,
            name,
            email,
            timestamp,
            timezone,
        })
    }

    pub fn to_data(&self) -> Result<Vec<u8>, GitError> {
        Ok(format!(
            "{} {} <{}> {} {}",
            self.signature_type, self.name, self.email, self.timestamp, self.timezone
        )
        .into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let sig = Signature::new(
            SignatureType::Author,
            "benjamin.747".to_string(),
            "benjamin.747@outlook.com".to_string(),
        );
        let data = sig.to_data().unwrap();
        let parsed = Signature::from_data(data).unwrap();
        assert_eq!(parsed.name, sig.name);
        assert_eq!(parsed.email, sig.email);
        assert_eq!(parsed.signature_type, SignatureType::Author);
    }

    #[test]
    fn test_from_data_fixed() {
        let line = b"author benjamin.747 <benjamin.747@outlook.com> 1757467768 +0800".to_vec();
        let sig = Signature::from_data(line).unwrap();
        assert_eq!(sig.name, "benjamin.747");
        assert_eq!(sig.email, "benjamin.747@outlook.com");
        assert_eq!(sig.timestamp, 1757467768);
        assert_eq!(sig.timezone, "+0800");
    }
}
