use crate::TypeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 32-byte digest (result commitments, seeds, block entropy)
pub type Hash = [u8; 32];

/// Identifier assigned to a job by the external job ledger
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct JobId(u64);

impl JobId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// Big-endian 32-byte encoding, used when the id is mixed into a hash
    pub fn to_word(&self) -> [u8; 32] {
        let mut word = [0u8; 32];
        word[24..].copy_from_slice(&self.0.to_be_bytes());
        word
    }
}

impl From<u64> for JobId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job#{}", self.0)
    }
}

/// Marketplace roles that may carry a temperature override
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Employer,
    Agent,
    Validator,
    Operator,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Employer, Role::Agent, Role::Validator, Role::Operator];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Employer => "employer",
            Role::Agent => "agent",
            Role::Validator => "validator",
            Role::Operator => "operator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| TypeError::UnknownRole(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_word_is_big_endian() {
        let word = JobId::new(0x0102).to_word();
        assert_eq!(word[30], 0x01);
        assert_eq!(word[31], 0x02);
        assert!(word[..24].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("Validator".parse::<Role>().unwrap(), Role::Validator);
        assert!("juror".parse::<Role>().is_err());
    }
}
