// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Allow/deny gate for function names and environment-variable names.
//!
//! Each axis has an optional allow set and an optional deny set of exact
//! names. An absent set is unrestricted for that axis; when both are
//! configured, a name must pass both (allow membership AND deny absence).
//! Entries are exact matches — no wildcard expansion.

use std::collections::HashSet;

use crate::error::{CallError, Result};

/// Security policy evaluated at bind time.
///
/// Function names are checked when the call text is parsed; variable names
/// are checked the moment each variable is set. Checks are never deferred to
/// invocation time.
#[derive(Debug, Clone, Default)]
pub struct SecurityPolicy {
    allowed_functions: Option<HashSet<String>>,
    denied_functions: Option<HashSet<String>>,
    allowed_variables: Option<HashSet<String>>,
    denied_variables: Option<HashSet<String>>,
}

impl SecurityPolicy {
    /// An unrestricted policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a policy from the comma-separated connection configuration
    /// strings. `None` or empty strings leave the corresponding axis
    /// unrestricted.
    pub fn from_lists(
        allowed_functions: Option<&str>,
        denied_functions: Option<&str>,
        allowed_variables: Option<&str>,
        denied_variables: Option<&str>,
    ) -> Self {
        Self {
            allowed_functions: parse_list(allowed_functions),
            denied_functions: parse_list(denied_functions),
            allowed_variables: parse_list(allowed_variables),
            denied_variables: parse_list(denied_variables),
        }
    }

    /// Set the function allow list.
    pub fn with_allowed_functions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_functions = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Set the function deny list.
    pub fn with_denied_functions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.denied_functions = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Set the variable allow list.
    pub fn with_allowed_variables<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_variables = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Set the variable deny list.
    pub fn with_denied_variables<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.denied_variables = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Check a function name against both function lists.
    pub fn check_function(&self, name: &str) -> Result<()> {
        check(
            name,
            "function",
            self.allowed_functions.as_ref(),
            self.denied_functions.as_ref(),
        )
    }

    /// Check an environment-variable name against both variable lists.
    pub fn check_variable(&self, name: &str) -> Result<()> {
        check(
            name,
            "environment variable",
            self.allowed_variables.as_ref(),
            self.denied_variables.as_ref(),
        )
    }
}

fn check(
    name: &str,
    axis: &str,
    allowed: Option<&HashSet<String>>,
    denied: Option<&HashSet<String>>,
) -> Result<()> {
    if let Some(allowed) = allowed
        && !allowed.contains(name)
    {
        return Err(CallError::Authorization(format!(
            "{axis} '{name}' is not in the allow list"
        )));
    }
    if let Some(denied) = denied
        && denied.contains(name)
    {
        return Err(CallError::Authorization(format!(
            "{axis} '{name}' is in the deny list"
        )));
    }
    Ok(())
}

fn parse_list(list: Option<&str>) -> Option<HashSet<String>> {
    let list = list?.trim();
    if list.is_empty() {
        return None;
    }
    Some(
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CallErrorKind;

    #[test]
    fn test_unrestricted_by_default() {
        let policy = SecurityPolicy::new();
        assert!(policy.check_function("anything").is_ok());
        assert!(policy.check_variable("ANYTHING").is_ok());
    }

    #[test]
    fn test_allow_list_is_exclusive() {
        let policy = SecurityPolicy::new().with_allowed_functions(["calc"]);
        assert!(policy.check_function("calc").is_ok());
        let err = policy.check_function("other").unwrap_err();
        assert_eq!(err.kind(), CallErrorKind::Authorization);
    }

    #[test]
    fn test_both_lists_apply() {
        // A name on both lists fails the deny check even though allowed.
        let policy = SecurityPolicy::new()
            .with_allowed_functions(["calc", "report"])
            .with_denied_functions(["report"]);
        assert!(policy.check_function("calc").is_ok());
        assert!(policy.check_function("report").is_err());
    }

    #[test]
    fn test_variable_axis_independent_of_function_axis() {
        let policy = SecurityPolicy::new().with_denied_variables(["SECRET"]);
        assert!(policy.check_function("SECRET").is_ok());
        assert!(policy.check_variable("SECRET").is_err());
    }

    #[test]
    fn test_from_lists_parsing() {
        let policy = SecurityPolicy::from_lists(Some(" calc , report "), None, None, Some(""));
        assert!(policy.check_function("calc").is_ok());
        assert!(policy.check_function("report").is_ok());
        assert!(policy.check_function("x").is_err());
        // Empty deny string leaves variables unrestricted.
        assert!(policy.check_variable("ANY").is_ok());
    }

    #[test]
    fn test_wildcards_are_literal() {
        let policy = SecurityPolicy::new().with_allowed_functions(["prod-*"]);
        assert!(policy.check_function("prod-*").is_ok());
        assert!(policy.check_function("prod-calc").is_err());
    }
}
