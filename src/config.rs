use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};

use crate::client::{Auth, ClientConfig};
use crate::util::strip_quotes;

#[derive(Debug, Default)]
struct RcConfig {
    username: Option<String>,
    password: Option<String>,
    verify: Option<bool>,
}

/// Resolves client settings from (in order of precedence) the arguments,
/// `ERDDAP_USERNAME` / `ERDDAP_PASSWORD` / `ERDDAP_VERIFY`, and the first
/// rc file found. Credentials are optional, but must come as a pair.
pub(crate) fn load_config(
    username: Option<String>,
    password: Option<String>,
    verify: Option<bool>,
) -> Result<ClientConfig> {
    load_config_from(username, password, verify, |name| std::env::var(name).ok())
}

/// [`load_config`] with the environment supplied by `env`.
fn load_config_from<E>(
    username: Option<String>,
    password: Option<String>,
    verify: Option<bool>,
    env: E,
) -> Result<ClientConfig>
where
    E: Fn(&str) -> Option<String>,
{
    let mut username = username.or_else(|| env("ERDDAP_USERNAME"));
    let mut password = password.or_else(|| env("ERDDAP_PASSWORD"));
    let verify = verify.or_else(|| env("ERDDAP_VERIFY").map(|v| parse_verify(&v)));

    let rc_candidates = rc_candidates(env("ERDDAP_RC"));
    let mut file_verify: Option<bool> = None;

    if username.is_none() || password.is_none() || verify.is_none() {
        for rc_path in &rc_candidates {
            if rc_path.exists() {
                let cfg = read_rc(rc_path).with_context(|| {
                    format!("failed to read configuration file {}", rc_path.display())
                })?;

                if username.is_none() {
                    username = cfg.username;
                }
                if password.is_none() {
                    password = cfg.password;
                }
                file_verify = cfg.verify;
                break;
            }
        }
    }

    let auth = match (username, password) {
        (Some(username), Some(password)) => Some(Auth { username, password }),
        (None, None) => None,
        (Some(_), None) => {
            bail!("Incomplete configuration: username given without password (set ERDDAP_PASSWORD or put `password:` in .erddaprc)")
        }
        (None, Some(_)) => {
            bail!("Incomplete configuration: password given without username (set ERDDAP_USERNAME or put `username:` in .erddaprc)")
        }
    };

    let verify = verify.or(file_verify).unwrap_or(true);

    Ok(ClientConfig {
        auth,
        verify,
        ..ClientConfig::default()
    })
}

fn parse_verify(v: &str) -> bool {
    !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no")
}

fn read_rc(path: &Path) -> Result<RcConfig> {
    let text = std::fs::read_to_string(path)?;
    let mut cfg = RcConfig::default();

    // Support formatting where `password:` is on one line and the value is on the next line.
    let mut pending_key: Option<&str> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(pk) = pending_key.take() {
            // A value may itself contain ':', only a known key starts a new entry.
            if !starts_with_key(line) {
                let v = strip_quotes(line).to_string();
                match pk {
                    "username" => cfg.username = Some(v),
                    "password" => cfg.password = Some(v),
                    _ => {}
                }
                continue;
            }
        }

        if let Some((k, v)) = line.split_once(':') {
            let k = k.trim();
            let v = strip_quotes(v.trim());
            match k {
                "username" | "password" if v.is_empty() => pending_key = Some(k),
                "username" => cfg.username = Some(v.to_string()),
                "password" => cfg.password = Some(v.to_string()),
                "verify" => {
                    if !v.is_empty() {
                        cfg.verify = Some(parse_verify(v));
                    }
                }
                _ => {}
            }
        }
    }

    Ok(cfg)
}

fn starts_with_key(line: &str) -> bool {
    line.split_once(':')
        .is_some_and(|(k, _)| matches!(k.trim(), "username" | "password" | "verify"))
}

fn rc_candidates(explicit: Option<String>) -> Vec<PathBuf> {
    // 1) ERDDAP_RC (explicit)
    // 2) ./.erddaprc
    // 3) ~/.erddaprc
    if let Some(p) = explicit {
        return vec![PathBuf::from(p)];
    }

    let mut v = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        v.push(cwd.join(".erddaprc"));
    }
    if let Some(home) = dirs::home_dir() {
        v.push(home.join(".erddaprc"));
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn rc_file(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    fn env_of(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn reads_key_value_lines() {
        let f = rc_file("# private server\nusername: alice\npassword: \"s3cret\"\nverify: 0\n");
        let cfg = read_rc(f.path()).unwrap();
        assert_eq!(cfg.username.as_deref(), Some("alice"));
        assert_eq!(cfg.password.as_deref(), Some("s3cret"));
        assert_eq!(cfg.verify, Some(false));
    }

    #[test]
    fn reads_value_on_following_line() {
        let f = rc_file("username:\n  bob\npassword:\n'pw:with:colons'\nverify: no\n");
        let cfg = read_rc(f.path()).unwrap();
        assert_eq!(cfg.username.as_deref(), Some("bob"));
        assert_eq!(cfg.password.as_deref(), Some("pw:with:colons"));
        assert_eq!(cfg.verify, Some(false));
    }

    #[test]
    fn empty_value_followed_by_a_key_stays_unset() {
        let f = rc_file("username:\npassword: pw\n");
        let cfg = read_rc(f.path()).unwrap();
        assert_eq!(cfg.username, None);
        assert_eq!(cfg.password.as_deref(), Some("pw"));
    }

    #[test]
    fn explicit_arguments_win() {
        let f = rc_file("username: file-user\npassword: file-pw\nverify: 1\n");
        let rc = f.path().display().to_string();
        let env = env_of(&[
            ("ERDDAP_RC", rc.as_str()),
            ("ERDDAP_USERNAME", "env-user"),
            ("ERDDAP_PASSWORD", "env-pw"),
            ("ERDDAP_VERIFY", "1"),
        ]);

        let cfg = load_config_from(Some("u".into()), Some("p".into()), Some(false), env).unwrap();
        assert_eq!(cfg.auth, Some(Auth::new("u", "p")));
        assert!(!cfg.verify);
    }

    #[test]
    fn rc_file_is_picked_up() {
        let f = rc_file("username: file-user\npassword: file-pw\nverify: 0\n");
        let rc = f.path().display().to_string();

        let cfg = load_config_from(None, None, None, env_of(&[("ERDDAP_RC", rc.as_str())])).unwrap();
        assert_eq!(cfg.auth, Some(Auth::new("file-user", "file-pw")));
        assert!(!cfg.verify);
    }

    #[test]
    fn environment_overrides_rc_file() {
        let f = rc_file("username: file-user\npassword: file-pw\nverify: 0\n");
        let rc = f.path().display().to_string();
        let env = env_of(&[
            ("ERDDAP_RC", rc.as_str()),
            ("ERDDAP_USERNAME", "env-user"),
            ("ERDDAP_VERIFY", "true"),
        ]);

        let cfg = load_config_from(None, None, None, env).unwrap();
        // The password still comes from the file.
        assert_eq!(cfg.auth, Some(Auth::new("env-user", "file-pw")));
        assert!(cfg.verify);
    }

    #[test]
    fn half_configured_credentials_are_rejected() {
        let missing = tempfile::tempdir().unwrap().path().join("absent");
        let rc = missing.display().to_string();

        let err = load_config_from(None, None, None, env_of(&[
            ("ERDDAP_RC", rc.as_str()),
            ("ERDDAP_USERNAME", "alice"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("username given without password"));

        let err = load_config_from(None, Some("pw".into()), None, env_of(&[("ERDDAP_RC", rc.as_str())]))
            .unwrap_err();
        assert!(err.to_string().contains("password given without username"));
    }

    #[test]
    fn no_credentials_anywhere_means_anonymous() {
        let missing = tempfile::tempdir().unwrap().path().join("absent");
        let rc = missing.display().to_string();

        let cfg = load_config_from(None, None, None, env_of(&[
            ("ERDDAP_RC", rc.as_str()),
            ("ERDDAP_VERIFY", "0"),
        ]))
        .unwrap();
        assert_eq!(cfg.auth, None);
        assert!(!cfg.verify);
    }

    #[test]
    fn unreadable_rc_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let rc = dir.path().display().to_string();

        let err = load_config_from(None, None, None, env_of(&[("ERDDAP_RC", rc.as_str())])).unwrap_err();
        assert!(err.to_string().contains("failed to read configuration file"));
    }

    #[test]
    fn verify_strings() {
        assert!(parse_verify("1"));
        assert!(parse_verify("true"));
        assert!(!parse_verify("False"));
        assert!(!parse_verify("no"));
    }
}
