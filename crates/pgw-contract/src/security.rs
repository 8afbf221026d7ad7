//! # Security Requirement Checks
//!
//! Presence checks for declared security schemes. The gateway verifies that
//! the credential a requirement asks for was sent in the right place; it
//! does not verify the credential itself, which belongs to the
//! authentication layer behind it.
//!
//! A `security` list is a set of alternatives: the request passes when any
//! one requirement has all of its schemes satisfied. An empty list means the
//! operation is public.

use std::collections::BTreeMap;

use pgw_core::{RequestDescriptor, ValidationFailure};

use crate::document::{ParameterLocation, SecurityRequirement, SecurityScheme};

/// Check `requirements` against the request.
///
/// On failure the detail describes the first unmet scheme of the first
/// requirement, which is the one a client is expected to satisfy.
pub fn check_security(
    requirements: &[SecurityRequirement],
    schemes: &BTreeMap<String, SecurityScheme>,
    request: &RequestDescriptor,
) -> Result<(), ValidationFailure> {
    if requirements.is_empty() {
        return Ok(());
    }
    let mut first_violation: Option<String> = None;
    for requirement in requirements {
        let unmet = requirement.schemes.iter().find_map(|name| {
            let scheme = schemes.get(name)?;
            check_scheme(scheme, request).err().map(|reason| format!("{name}: {reason}"))
        });
        match unmet {
            None => return Ok(()),
            Some(reason) => {
                first_violation.get_or_insert(reason);
            }
        }
    }
    Err(ValidationFailure::security(format!(
        "security requirement not satisfied: {}",
        first_violation.unwrap_or_default()
    )))
}

fn check_scheme(scheme: &SecurityScheme, request: &RequestDescriptor) -> Result<(), String> {
    match scheme {
        SecurityScheme::Http { scheme } => authorization_credentials(request, scheme),
        SecurityScheme::OAuth => authorization_credentials(request, "bearer"),
        SecurityScheme::ApiKey { name, location } => {
            let value = match location {
                ParameterLocation::Header => request.header(name),
                ParameterLocation::Query => request.query_values(name).first().copied(),
                ParameterLocation::Cookie => request.cookie(name),
                ParameterLocation::Path => None,
            };
            match value {
                Some(v) if !v.trim().is_empty() => Ok(()),
                _ => Err(format!("missing API key '{name}' in {location}")),
            }
        }
    }
}

/// `Authorization: <scheme> <credentials>` with non-empty credentials.
fn authorization_credentials(request: &RequestDescriptor, scheme: &str) -> Result<(), String> {
    let Some(header) = request.header("authorization") else {
        return Err(format!("missing {scheme} credentials in Authorization header"));
    };
    let mut parts = header.trim().splitn(2, ' ');
    let given = parts.next().unwrap_or("");
    let credentials = parts.next().unwrap_or("").trim();
    if !given.eq_ignore_ascii_case(scheme) {
        return Err(format!("Authorization header does not use the {scheme} scheme"));
    }
    if credentials.is_empty() {
        return Err(format!("empty {scheme} credentials in Authorization header"));
    }
    Ok(())
}
