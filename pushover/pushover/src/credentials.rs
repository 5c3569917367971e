use std::fmt::Formatter;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::debug;
use thiserror::Error;

/// Name of the credentials dotfile in home directory.
const DOTFILE: &str = ".pushover";

/// Credentials error.
#[derive(Error, Debug)]
pub enum CredentialsError {
    /// Credentials file cannot be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// Where we looked.
        path: PathBuf,
        /// Error from [`std::io`].
        source: std::io::Error,
    },
    /// `token` or `user` is absent or empty.
    #[error("'{0}' is missing from credentials")]
    Missing(&'static str),
    /// Home directory cannot be determined.
    #[error("failed to determine home directory")]
    NoHome,
}

/// Application token and user key, read from a `key=value` file e.g.
///
/// ```text
/// token=XXXXXXXXXX
/// user=XXXXXXXXXX
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Your application's API token. <https://pushover.net/api#identifiers>
    pub token: String,
    /// The user / group key of your user. <https://pushover.net/api#identifiers>
    pub user: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Credentials {{ token: \"***\", user: {:?} }}", self.user)
    }
}

impl FromStr for Credentials {
    type Err = CredentialsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut token = None;
        let mut user = None;
        for line in s.lines().map(str::trim) {
            if line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            match key.trim() {
                "token" => token = Some(value.trim().to_string()),
                "user" => user = Some(value.trim().to_string()),
                _ => {}
            }
        }

        let token = token
            .filter(|t| !t.is_empty())
            .ok_or(CredentialsError::Missing("token"))?;
        let user = user
            .filter(|u| !u.is_empty())
            .ok_or(CredentialsError::Missing("user"))?;
        Ok(Self { token, user })
    }
}

impl Credentials {
    /// Default location of credentials, `~/.pushover`.
    pub fn default_path() -> Result<PathBuf, CredentialsError> {
        let home = dirs::home_dir().ok_or(CredentialsError::NoHome)?;
        Ok(home.join(DOTFILE))
    }

    /// Reads [`Credentials`] from path.
    pub fn from_path<T>(path: T) -> Result<Credentials, CredentialsError>
    where
        T: AsRef<Path>,
    {
        let path = path.as_ref();
        debug!("load credentials from {path:?}");
        let content = fs::read_to_string(path).map_err(|source| CredentialsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        content.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write as _;

    #[test]
    fn t_parse() -> Result<(), CredentialsError> {
        let c: Credentials = "token=abc\nuser=def\n".parse()?;
        assert_eq!("abc", c.token);
        assert_eq!("def", c.user);
        Ok(())
    }

    #[test]
    fn t_parse_without_trailing_newline() -> Result<(), CredentialsError> {
        let c: Credentials = "user = def\ntoken = abc".parse()?;
        assert_eq!("abc", c.token);
        assert_eq!("def", c.user);
        Ok(())
    }

    #[test]
    fn t_parse_ignores_comments_and_unknown_keys() -> Result<(), CredentialsError> {
        let c: Credentials = "# pushover\n\ndevice=iphone\ntoken=a=b\r\nuser=def\r\n".parse()?;
        assert_eq!("a=b", c.token);
        assert_eq!("def", c.user);
        Ok(())
    }

    #[test]
    fn t_missing_user() {
        let err = "token=abc\n".parse::<Credentials>().unwrap_err();
        assert!(matches!(err, CredentialsError::Missing("user")));
    }

    #[test]
    fn t_empty_token() {
        let err = "token=\nuser=def\n".parse::<Credentials>().unwrap_err();
        assert!(matches!(err, CredentialsError::Missing("token")));
    }

    #[test]
    fn t_from_path() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "token=abc")?;
        writeln!(file, "user=def")?;

        let c = Credentials::from_path(file.path())?;
        assert_eq!("abc", c.token);
        assert_eq!("def", c.user);
        Ok(())
    }

    #[test]
    fn t_from_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DOTFILE);
        match Credentials::from_path(&path) {
            Err(CredentialsError::Io { path: p, .. }) => assert_eq!(path, p),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn t_debug_hides_token() {
        let c = Credentials {
            token: "secret".to_string(),
            user: "def".to_string(),
        };
        assert!(!format!("{c:?}").contains("secret"));
    }
}
