#![deny(
    missing_docs,
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications
)]

//! pushover is a command line application to send one notification with Pushover API.
//!
//! Put your API token and user key in `~/.pushover`,
//!
//! ```text
//! token=XXXXXXXXXX
//! user=XXXXXXXXXX
//! ```
//!
//! Then,
//!
//! ```text
//! $ pushover -m message
//! ```
//!
//! For more information,
//!
//! ```text
//! $ pushover -h
//! ```

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::Context as _;
use clap::Parser;
use log::{debug, Level};
use logging_timer::{finish, stimer};

use pushover::{
    Credentials, CredentialsError, Notification, NotificationError, Priority, Sent,
};

mod report;

const EXIT_SUCCESS: u8 = 0;
const EXIT_FAILURE: u8 = 1;

const CREDENTIALS_HINT: &str = "You need to create a dot file '.pushover' in your home \
directory, containing your token and user API keys, in the format:\n\
token=XXXXXXXXXX\nuser=XXXXXXXXXX";

#[doc(hidden)]
#[derive(Parser)]
#[clap(name = "pushover", about, author, version)]
struct Opts {
    /// Your message. <https://pushover.net/api#messages>
    #[clap(short, long)]
    message: String,
    /// Display message response details.
    #[clap(short, long)]
    verbose: bool,
    /// Read token and user keys from this file instead of ~/.pushover
    #[clap(short, long, env = "PUSHOVER_CREDENTIALS")]
    credentials: Option<PathBuf>,
    /// Your user's device name to send the message directly to that device, rather than all of the user's devices. <https://pushover.net/api#identifiers>
    #[clap(long)]
    device: Option<String>,
    /// Your message's title, otherwise your app's name is used. <https://pushover.net/api#messages>
    #[clap(long)]
    title: Option<String>,
    /// A Unix timestamp of your message's date and time to display to the user, rather than the time your message is received by our API. <https://pushover.net/api#timestamp>
    #[clap(long)]
    timestamp: Option<u64>,
    /// Messages may be sent with a different priority that affects how the message is presented to the user
    /// e.g. -2, -1, 0, 1, 2, lowest, low, normal, high, emergency. <https://pushover.net/api#priority>
    #[clap(long, allow_hyphen_values = true)]
    priority: Option<String>,
    /// Sound to play when user receives notification, overrides the user's default sound choice. <https://pushover.net/api#sounds>
    #[clap(long)]
    sound: Option<String>,
    /// A supplementary URL to show with your message. <https://pushover.net/api#urls>
    #[clap(long)]
    url: Option<String>,
    /// A title for your supplementary URL, otherwise just the URL is shown. <https://pushover.net/api#urls>
    #[clap(long)]
    url_title: Option<String>,
}

impl Opts {
    fn load_credentials(&self) -> anyhow::Result<Credentials> {
        let path = match self.credentials {
            Some(ref p) => p.clone(),
            None => Credentials::default_path()?,
        };
        Credentials::from_path(&path).map_err(|e| match e {
            CredentialsError::Io { .. } => anyhow::Error::new(e).context(CREDENTIALS_HINT),
            e => e.into(),
        })
    }

    fn priority(&self) -> anyhow::Result<Option<Priority>> {
        match self.priority.as_deref() {
            Some(p) => {
                let priority = Priority::from_str(p).with_context(|| {
                    format!("unknown priority {p:?}, use -2, -1, 0, 1, 2 or lowest, low, normal, high, emergency")
                })?;
                Ok(Some(priority))
            }
            None => Ok(None),
        }
    }

    fn notification<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> anyhow::Result<Notification<'a>> {
        let mut notification =
            Notification::new(&credentials.token, &credentials.user, &self.message);
        notification.device = self.device.as_deref();
        notification.title = self.title.as_deref();
        notification.timestamp = self.timestamp;
        notification.priority = self.priority()?;
        notification.sound = self.sound.as_deref();
        notification.url = self.url.as_deref();
        notification.url_title = self.url_title.as_deref();
        Ok(notification)
    }
}

/// Renders the outcome of a send, success to `out` and failure to `err`.
fn exit_code<O: Write, E: Write>(
    res: &Result<Sent, NotificationError>,
    verbose: bool,
    out: &mut O,
    err: &mut E,
) -> io::Result<u8> {
    match res {
        Ok(sent) => {
            report::success(out, sent, verbose)?;
            Ok(EXIT_SUCCESS)
        }
        Err(e) => {
            report::failure(err, e)?;
            Ok(EXIT_FAILURE)
        }
    }
}

#[doc(hidden)]
fn main() -> anyhow::Result<ExitCode> {
    pretty_env_logger::init();

    let opts: Opts = Opts::parse();
    let credentials = opts.load_credentials()?;
    debug!("loaded {credentials:?}");
    let notification = opts.notification(&credentials)?;

    let tmr = stimer!(Level::Debug; "NOTIFY");
    let res = notification.send();
    finish!(tmr);

    let code = exit_code(
        &res,
        opts.verbose,
        &mut io::stdout().lock(),
        &mut io::stderr().lock(),
    )?;
    Ok(ExitCode::from(code))
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use clap::{CommandFactory, Parser};

    use crate::{exit_code, Opts, EXIT_FAILURE, EXIT_SUCCESS};
    use pushover::{Credentials, NotificationError, Priority, Sent};

    fn parse(args: &[&str]) -> Opts {
        let mut argv = vec!["pushover"];
        argv.extend_from_slice(args);
        Opts::try_parse_from(argv).unwrap()
    }

    #[test]
    fn t_negative_priority() {
        let parsed = parse(&["-m", "message", "--priority", "-2"]);
        assert_eq!(parsed.priority, Some("-2".to_string()));
        assert_eq!(Some(Priority::Lowest), parsed.priority().unwrap());

        let parsed = parse(&["-m", "message", "--priority", "-1"]);
        assert_eq!(parsed.priority, Some("-1".to_string()));
        assert_eq!(Some(Priority::Low), parsed.priority().unwrap());
    }

    #[test]
    fn t_named_priority() {
        let parsed = parse(&["-m", "message", "--priority", "emergency"]);
        assert_eq!(Some(Priority::Emergency), parsed.priority().unwrap());
    }

    #[test]
    fn t_unknown_priority() {
        let parsed = parse(&["-m", "message", "--priority", "urgent"]);
        assert!(parsed.priority().is_err());
    }

    fn run(res: Result<Sent, NotificationError>, verbose: bool) -> (u8, String, String) {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let code = exit_code(&res, verbose, &mut out, &mut err).unwrap();
        (
            code,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[test]
    fn t_exit_code_success() {
        let sent = Sent {
            request: "abc123".to_string(),
            quota: None,
        };
        let (code, out, err) = run(Ok(sent), true);
        assert_eq!(EXIT_SUCCESS, code);
        assert!(out.starts_with("Success\nRequest id: abc123\n"));
        assert!(out.contains("Message limit resets on: ?\n"));
        assert!(err.is_empty());
    }

    #[test]
    fn t_exit_code_client_error() {
        let res = Err(NotificationError::Client {
            status: 422,
            errors: vec!["message too long".to_string()],
        });
        let (code, out, err) = run(res, false);
        assert_eq!(EXIT_FAILURE, code);
        assert!(out.is_empty());
        assert_eq!("Fail: message too long\n", err);
    }

    #[test]
    fn t_exit_code_server_error() {
        let res = Err(NotificationError::Server {
            status: 500,
            reason: "Internal Server Error".to_string(),
        });
        let (code, out, err) = run(res, true);
        assert_eq!(EXIT_FAILURE, code);
        assert!(out.is_empty());
        assert_eq!("Internal Server Error\n", err);
    }

    #[test]
    fn t_version_name() {
        let version = Opts::command().render_version();
        assert!(version.starts_with("pushover "), "{version}");
    }

    #[test]
    fn t_message_is_required() {
        assert!(Opts::try_parse_from(["pushover", "-v"]).is_err());
    }

    #[test]
    fn t_notification_fields() -> anyhow::Result<()> {
        let opts = parse(&[
            "-m",
            "message",
            "--device",
            "iphone",
            "--url-title",
            "docs",
            "--timestamp",
            "1600000000",
        ]);
        let credentials: Credentials = "token=abc\nuser=def".parse()?;
        let form = opts.notification(&credentials)?.form();
        assert_eq!(
            vec![
                ("token", "abc".to_string()),
                ("user", "def".to_string()),
                ("message", "message".to_string()),
                ("device", "iphone".to_string()),
                ("timestamp", "1600000000".to_string()),
                ("url_title", "docs".to_string()),
            ],
            form
        );
        Ok(())
    }

    #[test]
    fn t_credentials_from_flag() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(file, "token=abc\nuser=def")?;
        let path = file.path().to_string_lossy().to_string();

        let opts = parse(&["-m", "message", "-c", path.as_str()]);
        let credentials = opts.load_credentials()?;
        assert_eq!("abc", credentials.token);
        assert_eq!("def", credentials.user);
        Ok(())
    }

    #[test]
    fn t_credentials_without_user() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "token=abc")?;
        let path = file.path().to_string_lossy().to_string();

        let opts = parse(&["-m", "message", "--credentials", path.as_str()]);
        let err = opts.load_credentials().unwrap_err();
        assert!(format!("{err:#}").contains("'user' is missing"));
        Ok(())
    }
}
