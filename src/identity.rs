//! Account and permission set of the caller.
//!
//! IAM Identity Center materialises a permission set as a role named
//! `AWSReservedSSO_<PermissionSetName>_<suffix>`, so the caller identity ARN
//! looks like
//! `arn:aws:sts::<account>:assumed-role/AWSReservedSSO_<PermissionSetName>_<suffix>/<session>`.

use aws_types::SdkConfig;

use crate::error::{Error, Result};

const ARN_SEPARATOR: char = '/';
const ROLE_SEPARATOR: char = '_';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleIdentity {
    pub account: String,
    pub permission_set: String,
}

impl RoleIdentity {
    /// `account` is taken as returned by STS; only the ARN is decomposed.
    pub fn from_caller_identity(account: impl Into<String>, arn: &str) -> Result<Self> {
        Ok(Self {
            account: account.into(),
            permission_set: permission_set(arn)?,
        })
    }
}

/// Extracts the permission set name from an assumed-role ARN by dropping the
/// first and last `_` token of the role name. Underscores inside the name are
/// kept.
pub fn permission_set(arn: &str) -> Result<String> {
    let parts: Vec<&str> = arn.split(ARN_SEPARATOR).collect();
    let role = match parts.as_slice() {
        [_, role, _] => *role,
        _ => return Err(Error::MalformedArn(arn.to_owned())),
    };

    let tokens: Vec<&str> = role.split(ROLE_SEPARATOR).collect();
    if tokens.len() < 3 {
        return Err(Error::MalformedRole(role.to_owned()));
    }

    Ok(tokens[1..tokens.len() - 1].join("_"))
}

/// Asks STS who the profile's credentials belong to.
pub async fn caller_identity(config: &SdkConfig) -> Result<RoleIdentity> {
    let sts = aws_sdk_sts::Client::new(config);
    let output = sts
        .get_caller_identity()
        .send()
        .await
        .map_err(|e| Error::Identity(e.into()))?;

    let missing = |field| Error::MissingField {
        operation: "GetCallerIdentity",
        field,
    };
    let account = output.account().ok_or_else(|| missing("Account"))?;
    let arn = output.arn().ok_or_else(|| missing("Arn"))?;
    log::debug!("caller identity: account {account}, arn {arn}");

    RoleIdentity::from_caller_identity(account, arn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decomposes_sso_role_arn() {
        let identity = RoleIdentity::from_caller_identity(
            "123456789012",
            "arn:aws:sts::123456789012:assumed-role/AWSReservedSSO_MyPermissionSet_abc123/session",
        )
        .unwrap();

        assert_eq!(
            identity,
            RoleIdentity {
                account: "123456789012".to_owned(),
                permission_set: "MyPermissionSet".to_owned(),
            }
        );
    }

    #[test]
    fn keeps_underscores_inside_permission_set() {
        assert_eq!(
            permission_set("arn:aws:sts::123:assumed-role/Prefix_My_Long_Set_suffix/session").unwrap(),
            "My_Long_Set"
        );
    }

    #[test]
    fn account_is_passed_through() {
        let identity =
            RoleIdentity::from_caller_identity("999", "arn:aws:sts::123:assumed-role/A_B_C/s").unwrap();
        assert_eq!(identity.account, "999");
        assert_eq!(identity.permission_set, "B");
    }

    #[test]
    fn rejects_wrong_segment_count() {
        for arn in [
            "arn:aws:iam::123456789012:user/alice",
            "arn:aws:sts::123:assumed-role/AWSReservedSSO_Set_abc/session/extra",
            "",
        ] {
            match permission_set(arn) {
                Err(Error::MalformedArn(got)) => assert_eq!(got, arn),
                other => panic!("{arn}: unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn rejects_role_with_too_few_tokens() {
        let err = permission_set("arn:aws:sts::123:assumed-role/Admin_abc/session").unwrap_err();
        assert!(matches!(err, Error::MalformedRole(ref role) if role == "Admin_abc"));
        assert_eq!(err.to_string(), "cannot parse role: Admin_abc");

        assert!(matches!(
            permission_set("arn:aws:sts::123:assumed-role//session"),
            Err(Error::MalformedRole(_))
        ));
    }
}
