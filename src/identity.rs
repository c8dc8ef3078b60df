// src/identity.rs

use std::fmt;

/// The identity of the caller of an authorization request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Identity {
    /// Anonymous caller.
    #[default]
    None,
    /// A verified subject name.
    Subject(String),
    /// A raw JWT to be resolved by the authorizer.
    Jwt(String),
}

impl Identity {
    /// The identity type as sent to the authorizer.
    pub fn type_field(&self) -> &'static str {
        match self {
            Identity::None => "IDENTITY_TYPE_NONE",
            Identity::Subject(_) => "IDENTITY_TYPE_SUB",
            Identity::Jwt(_) => "IDENTITY_TYPE_JWT",
        }
    }

    /// The identity value as sent to the authorizer; `None` for anonymous callers.
    pub fn identity_field(&self) -> Option<&str> {
        match self {
            Identity::None => None,
            Identity::Subject(value) | Identity::Jwt(value) => Some(value),
        }
    }

    /// The subject name, if this is a verified subject.
    pub fn subject(&self) -> Option<&str> {
        match self {
            Identity::Subject(subject) => Some(subject),
            _ => None,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::None => f.write_str("IdentityContext(type=NONE)"),
            Identity::Subject(subject) => write!(f, "IdentityContext(type=SUBJECT, subject={subject})"),
            // Tokens are credentials; keep them out of logs.
            Identity::Jwt(_) => f.write_str("IdentityContext(type=JWT)"),
        }
    }
}
