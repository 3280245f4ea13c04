use crate::cli::actions::{Action, server::Args};
use anyhow::{Context, Result};
use secrecy::SecretString;

/// Turn parsed CLI matches into an [`Action`].
///
/// # Errors
///
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let jwt_secret = matches
        .get_one::<String>("jwt-secret")
        .cloned()
        .map(SecretString::from)
        .context("missing required argument: --jwt-secret")?;

    let jwt_validity_hours = matches
        .get_one::<i64>("jwt-validity-hours")
        .copied()
        .unwrap_or(10);

    let cookie_name = matches
        .get_one::<String>("cookie-name")
        .cloned()
        .unwrap_or_else(|| "jwt".to_string());

    let base_path = matches
        .get_one::<String>("base-path")
        .cloned()
        .unwrap_or_default();

    Ok(Action::Server(Args {
        port,
        dsn,
        jwt_secret,
        jwt_validity_hours,
        cookie_name,
        cookie_secure: matches.get_flag("cookie-secure"),
        base_path,
    }))
}

#[cfg(test)]
mod tests {
    use super::handler;
    use crate::cli::{actions::Action, commands};
    use anyhow::Result;

    #[test]
    fn handler_builds_server_action() -> Result<()> {
        let matches = commands::new().get_matches_from(vec![
            "finsight-auth",
            "--dsn",
            "postgres://localhost/finsight",
            "--jwt-secret",
            "0123456789abcdef0123456789abcdef",
            "--base-path",
            "/auth",
        ]);

        let Action::Server(args) = handler(&matches)?;
        assert_eq!(args.port, 8080);
        assert_eq!(args.dsn, "postgres://localhost/finsight");
        assert_eq!(args.jwt_validity_hours, 10);
        assert_eq!(args.cookie_name, "jwt");
        assert!(!args.cookie_secure);
        assert_eq!(args.base_path, "/auth");
        Ok(())
    }
}
