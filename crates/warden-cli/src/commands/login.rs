//! login command - authenticate, optionally remembering the credentials

use super::CommandContext;
use crate::utils::prompt;
use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::io;
use std::process::ExitCode;
use warden_auth::{Gatekeeper, Prefill};

#[derive(Serialize)]
struct LoginResult<'a> {
    identifier: &'a str,
    granted: bool,
    message: &'static str,
}

/// Fields already known before prompting
#[derive(Debug, PartialEq, Eq)]
struct Known {
    identifier: Option<String>,
    secret: Option<String>,
}

/// The saved secret is only reused for the saved identifier.
fn known_fields(user: Option<String>, prefill: Prefill) -> Known {
    if !prefill.found {
        return Known {
            identifier: user,
            secret: None,
        };
    }

    match user {
        Some(user) if user != prefill.identifier => Known {
            identifier: Some(user),
            secret: None,
        },
        _ => Known {
            identifier: Some(prefill.identifier),
            secret: Some(prefill.secret),
        },
    }
}

pub async fn execute(
    ctx: &CommandContext,
    gatekeeper: &Gatekeeper,
    user: Option<String>,
    remember: bool,
) -> Result<ExitCode> {
    let prefill = gatekeeper.cache_load().await;
    if let Some(notice) = prefill.notice {
        ctx.notice(&notice.yellow().to_string());
    }

    let known = known_fields(user, prefill);
    let (identifier, secret) = {
        let mut input = io::stdin().lock();
        let mut output = io::stderr();

        let identifier = match known.identifier {
            Some(identifier) => identifier,
            None => prompt(&mut input, &mut output, "Username")?,
        };
        let secret = match known.secret {
            Some(secret) => secret,
            None => prompt(&mut input, &mut output, "Password")?,
        };
        (identifier, secret)
    };

    let outcome = gatekeeper.login(&identifier, &secret, remember).await;
    let granted = outcome.is_granted();

    if ctx.is_json() {
        let result = LoginResult {
            identifier: &identifier,
            granted,
            message: outcome.user_message(),
        };
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if granted {
        println!("{}", outcome.user_message().green());
    } else {
        println!("{}", outcome.user_message().red());
    }

    Ok(if granted {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn saved(identifier: &str, secret: &str) -> Prefill {
        Prefill {
            identifier: identifier.to_string(),
            secret: secret.to_string(),
            found: true,
            notice: None,
        }
    }

    #[test]
    fn test_nothing_saved() {
        assert_eq!(
            known_fields(None, Prefill::default()),
            Known {
                identifier: None,
                secret: None
            }
        );
        assert_eq!(
            known_fields(Some("jdoe".into()), Prefill::default()),
            Known {
                identifier: Some("jdoe".into()),
                secret: None
            }
        );
    }

    #[test]
    fn test_saved_pair_used() {
        let expected = Known {
            identifier: Some("jdoe".into()),
            secret: Some("secret1".into()),
        };
        assert_eq!(known_fields(None, saved("jdoe", "secret1")), expected);
        assert_eq!(
            known_fields(Some("jdoe".into()), saved("jdoe", "secret1")),
            expected
        );
    }

    #[test]
    fn test_other_user_never_gets_saved_secret() {
        assert_eq!(
            known_fields(Some("bsmith".into()), saved("jdoe", "secret1")),
            Known {
                identifier: Some("bsmith".into()),
                secret: None
            }
        );
    }
}
