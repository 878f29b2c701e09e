// ============================
// crates/backend-lib/src/policy.rs
// ============================
//! Ordered path rules deciding who may reach which part of the application.
//!
//! Rules are evaluated in declared order and the first matching pattern wins,
//! even when a later rule is more specific. A path no rule matches is public.
use std::fmt;

use warden_common::Role;

use crate::auth::{SessionClaim, TokenError};
use crate::config::{ConfigError, RequireKind, RuleSettings};

/// Path pattern with prefix/glob semantics
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    /// `*`
    Any,
    /// `/dashboard/*`: `/dashboard` itself and everything below it
    Subtree(String),
    /// `/api*`: raw string prefix
    Prefix(String),
    /// anything else
    Exact(String),
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Self {
        if pattern == "*" {
            PathPattern::Any
        } else if let Some(base) = pattern.strip_suffix("/*") {
            PathPattern::Subtree(base.to_string())
        } else if let Some(prefix) = pattern.strip_suffix('*') {
            PathPattern::Prefix(prefix.to_string())
        } else {
            PathPattern::Exact(pattern.to_string())
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Any => true,
            PathPattern::Subtree(base) => match path.strip_prefix(base.as_str()) {
                Some(rest) => rest.is_empty() || rest.starts_with('/'),
                None => false,
            },
            PathPattern::Prefix(prefix) => path.starts_with(prefix.as_str()),
            PathPattern::Exact(exact) => path == exact,
        }
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathPattern::Any => f.write_str("*"),
            PathPattern::Subtree(base) => write!(f, "{base}/*"),
            PathPattern::Prefix(prefix) => write!(f, "{prefix}*"),
            PathPattern::Exact(exact) => f.write_str(exact),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    Public,
    Authenticated,
    /// Holder's role must be one of these
    Roles(Vec<Role>),
}

/// What the request presented, after token verification
#[derive(Debug, Clone, Copy)]
pub enum Presented<'a> {
    Missing,
    Rejected(TokenError),
    Valid(&'a SessionClaim),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    MissingToken,
    InvalidToken(TokenError),
    InsufficientRole,
}

impl DenyReason {
    /// Label used for logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::MissingToken => "missing_token",
            DenyReason::InvalidToken(TokenError::Malformed) => "malformed_token",
            DenyReason::InvalidToken(TokenError::InvalidSignature) => "invalid_signature",
            DenyReason::InvalidToken(TokenError::Expired) => "expired_token",
            DenyReason::InsufficientRole => "insufficient_role",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Requirement {
    pub fn is_public(&self) -> bool {
        matches!(self, Requirement::Public)
    }

    pub fn evaluate(&self, presented: Presented<'_>) -> Decision {
        let claim = match (self, presented) {
            (Requirement::Public, _) => return Decision::Allow,
            (_, Presented::Missing) => return Decision::Deny(DenyReason::MissingToken),
            (_, Presented::Rejected(e)) => return Decision::Deny(DenyReason::InvalidToken(e)),
            (_, Presented::Valid(claim)) => claim,
        };
        match self {
            Requirement::Roles(roles) if !roles.contains(&claim.role) => {
                Decision::Deny(DenyReason::InsufficientRole)
            },
            _ => Decision::Allow,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub pattern: PathPattern,
    pub requirement: Requirement,
}

impl Rule {
    pub fn new(pattern: &str, requirement: Requirement) -> Self {
        Self {
            pattern: PathPattern::parse(pattern),
            requirement,
        }
    }
}

impl TryFrom<&RuleSettings> for Rule {
    type Error = ConfigError;

    fn try_from(settings: &RuleSettings) -> Result<Self, Self::Error> {
        let requirement = match settings.require {
            RequireKind::Public => Requirement::Public,
            RequireKind::Authenticated => Requirement::Authenticated,
            RequireKind::Roles if settings.roles.is_empty() => {
                return Err(ConfigError::Invalid(format!(
                    "gate rule '{}' requires roles but lists none",
                    settings.pattern
                )))
            },
            RequireKind::Roles => Requirement::Roles(settings.roles.clone()),
        };
        Ok(Rule::new(&settings.pattern, requirement))
    }
}

/// Ordered authorization policy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Policy {
    rules: Vec<Rule>,
}

static PUBLIC: Requirement = Requirement::Public;

impl Policy {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn from_settings(rules: &[RuleSettings]) -> Result<Self, ConfigError> {
        let rules = rules.iter().map(Rule::try_from).collect::<Result<_, _>>()?;
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Requirement of the first rule matching `path`; public if none does
    pub fn requirement_for(&self, path: &str) -> &Requirement {
        self.rules
            .iter()
            .find(|rule| rule.pattern.matches(path))
            .map_or(&PUBLIC, |rule| &rule.requirement)
    }

    pub fn decide(&self, path: &str, presented: Presented<'_>) -> Decision {
        self.requirement_for(path).evaluate(presented)
    }
}
