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

//! Pushover is a blocking Pushover messages API client in Rust 2021 edition.

use std::borrow::Cow;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use log::{debug, warn};
use serde::Deserialize;
use thiserror::Error;

pub use credentials::{Credentials, CredentialsError};

mod credentials;

const EMERGENCY_RETRY: u32 = 60;
const EMERGENCY_EXPIRE: u32 = 3600;
const TIMEOUT: Duration = Duration::from_secs(30);

const LIMIT_HEADER: &str = "X-Limit-App-Limit";
const REMAINING_HEADER: &str = "X-Limit-App-Remaining";
const RESET_HEADER: &str = "X-Limit-App-Reset";

/// Notification error.
#[derive(Error, Debug)]
pub enum NotificationError {
    /// Notification is rejected before anything is sent.
    #[error("invalid notification: {0}")]
    Invalid(&'static str),
    /// Connection, DNS, TLS or timeout failure from [`ureq`] crate.
    #[error("transport error: {0}")]
    Transport(Box<ureq::Transport>),
    /// Failed to read response body.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Response body is not the JSON object we expect.
    #[error("deserialization error: {0}")]
    Deserialize(#[from] serde_json::Error),
    /// Pushover refused the request with HTTP 4xx. <https://pushover.net/api#response>
    #[error("{}", client_message(.status, .errors))]
    Client {
        /// HTTP status code.
        status: u16,
        /// Human-readable reasons given by Pushover.
        errors: Vec<String>,
    },
    /// Any other unexpected HTTP status.
    #[error("HTTP {status} {reason}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Standard reason phrase of the status code.
        reason: String,
    },
}

impl NotificationError {
    /// Whether the request failed before a usable response was obtained,
    /// including responses whose body cannot be read or decoded.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            NotificationError::Transport(_)
                | NotificationError::Io(_)
                | NotificationError::Deserialize(_)
        )
    }
}

/// Pushover API parameters <https://pushover.net/api#messages>.
#[derive(Default, Debug, Clone)]
pub struct Notification<'a> {
    token: Cow<'a, str>,
    identifier: Cow<'a, str>,
    message: Cow<'a, str>,
    /// Your user's device name to send the message directly to that device,
    /// rather than all of the user's devices. <https://pushover.net/api#identifiers>
    pub device: Option<&'a str>,
    /// Your message's title, otherwise your app's name is used. <https://pushover.net/api#messages>
    pub title: Option<&'a str>,
    /// A Unix timestamp of your message's date and time to display to the user,
    /// rather than the time your message is received by the API. <https://pushover.net/api#timestamp>
    pub timestamp: Option<u64>,
    /// Messages may be sent with a different priority that affects
    /// how the message is presented to the user. <https://pushover.net/api#priority>
    pub priority: Option<Priority>,
    /// A supplementary URL to show with your message. <https://pushover.net/api#urls>
    pub url: Option<&'a str>,
    /// A title for your supplementary URL,
    /// otherwise just the URL is shown. <https://pushover.net/api#urls>
    pub url_title: Option<&'a str>,
    /// Name of the sound to play, built-in or uploaded, overriding
    /// the user's default sound choice. <https://pushover.net/api#sounds>
    pub sound: Option<&'a str>,
}

/// Messages may be sent with a different priority
/// that affects how the message is presented to the user. <https://pushover.net/api#priority>
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display, strum::EnumString)]
pub enum Priority {
    /// Normal (default)
    #[strum(to_string = "0", serialize = "normal")]
    Normal,
    /// Lowest
    #[strum(to_string = "-2", serialize = "lowest")]
    Lowest,
    /// Low
    #[strum(to_string = "-1", serialize = "low")]
    Low,
    /// High
    #[strum(to_string = "1", serialize = "high")]
    High,
    /// Emergency, repeated until acknowledged. Always sent with
    /// `retry` and `expire`. <https://pushover.net/api#priority2>
    #[strum(to_string = "2", serialize = "emergency")]
    Emergency,
}

/// Message accepted by Pushover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    /// Randomly-generated unique token associated with the request.
    pub request: String,
    /// Application quota reported with the response, if any.
    pub quota: Option<Quota>,
}

/// Application message limits. <https://pushover.net/api#limits>
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    /// Messages allowed per month.
    pub limit: u64,
    /// Messages left this month.
    pub remaining: u64,
    /// When the quota resets, unknown if the header is absent or malformed.
    pub reset_at: Option<DateTime<Utc>>,
}

impl Quota {
    /// Reads quota from `X-Limit-App-*` response headers.
    ///
    /// Returns [`None`] unless both limit and remaining are present and numeric.
    ///
    /// ```rust
    /// # use pushover::Quota;
    /// let headers = [("X-Limit-App-Limit", "7500"), ("X-Limit-App-Remaining", "7496")];
    /// let quota = Quota::from_headers(|name| {
    ///     headers.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| *v)
    /// });
    /// assert_eq!(Some(7496), quota.map(|q| q.remaining));
    /// ```
    pub fn from_headers<'h, F>(header: F) -> Option<Quota>
    where
        F: Fn(&str) -> Option<&'h str>,
    {
        let limit = parse_header(&header, LIMIT_HEADER)?;
        let remaining = parse_header(&header, REMAINING_HEADER)?;
        let reset_at = parse_header::<i64, _>(&header, RESET_HEADER)
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single());
        Some(Quota {
            limit,
            remaining,
            reset_at,
        })
    }
}

fn parse_header<'h, T, F>(header: &F, name: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<&'h str>,
{
    let raw = header(name)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("malformed {name} header: {raw:?}");
            None
        }
    }
}

/// Body of HTTP 200. <https://pushover.net/api#response>
#[derive(Debug, Deserialize)]
struct Acknowledgement {
    request: String,
}

/// Body of HTTP 4xx. <https://pushover.net/api#response>
#[derive(Debug, Deserialize)]
struct Rejection {
    errors: Vec<String>,
}

#[cfg(test)]
fn server_url() -> String {
    mockito::server_url()
}

#[cfg(not(test))]
fn server_url() -> String {
    "https://api.pushover.net".to_string()
}

/// Shorthand function to send notification to Pushover.
/// ```no_run
/// use pushover::send_notification;
/// send_notification("token", "user", "message");
/// send_notification("token", "group", "message");
/// ```
pub fn send_notification<'a, S>(
    token: S,
    identifier: S,
    message: S,
) -> Result<Sent, NotificationError>
where
    S: Into<Cow<'a, str>>,
{
    Notification::new(token, identifier, message).send()
}

fn add_optional_field<T: Display>(
    form: &mut Vec<(&'static str, String)>,
    n: &'static str,
    v: Option<T>,
) {
    if let Some(v) = v {
        form.push((n, v.to_string()));
    }
}

fn client_message(status: &u16, errors: &[String]) -> String {
    if errors.is_empty() {
        format!("HTTP {status} {}", reason_phrase(*status, ""))
    } else {
        format!("HTTP {status}: {}", errors.join(", "))
    }
}

/// Standard reason phrase of an HTTP status code, or what the server said
/// when the code is not a registered one.
fn reason_phrase(status: u16, status_text: &str) -> String {
    http::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or(status_text)
        .to_string()
}

impl<'a> Notification<'a> {
    /// Creates a [`Notification`].
    ///
    /// Once you have an API token, you'll need the user key and optional device name
    /// for each user to which you are pushing notifications. Instead of a user key,
    /// a group key may be supplied.
    ///
    /// ```rust
    /// # use pushover::Notification;
    /// // Notify user
    /// Notification::new("token", "user", "message");
    /// // Notify group of users
    /// Notification::new("token", "group", "message");
    /// ```
    pub fn new<T>(token: T, identifier: T, message: T) -> Self
    where
        T: Into<Cow<'a, str>>,
    {
        Self {
            token: token.into(),
            identifier: identifier.into(),
            message: message.into(),
            ..Default::default()
        }
    }

    fn validate(&self) -> Result<(), NotificationError> {
        if self.token.is_empty() {
            return Err(NotificationError::Invalid("token is empty"));
        }
        if self.identifier.is_empty() {
            return Err(NotificationError::Invalid("user is empty"));
        }
        if self.message.is_empty() {
            return Err(NotificationError::Invalid("message is empty"));
        }
        Ok(())
    }

    /// Form fields in the order they are sent. Unset optional fields are left out.
    ///
    /// ```rust
    /// # use pushover::{Notification, Priority};
    /// let mut n = Notification::new("token", "user", "message");
    /// n.priority = Some(Priority::Emergency);
    /// let names: Vec<_> = n.form().into_iter().map(|(k, _)| k).collect();
    /// assert_eq!(vec!["token", "user", "message", "priority", "retry", "expire"], names);
    /// ```
    pub fn form(&self) -> Vec<(&'static str, String)> {
        let mut form = vec![
            ("token", self.token.to_string()),
            ("user", self.identifier.to_string()), // User or group key
            ("message", self.message.to_string()),
        ];

        add_optional_field(&mut form, "device", self.device);
        if let Some(priority) = self.priority {
            form.push(("priority", priority.to_string()));
            if priority == Priority::Emergency {
                form.push(("retry", EMERGENCY_RETRY.to_string()));
                form.push(("expire", EMERGENCY_EXPIRE.to_string()));
            }
        }
        add_optional_field(&mut form, "sound", self.sound);
        add_optional_field(&mut form, "timestamp", self.timestamp);
        add_optional_field(&mut form, "title", self.title);
        add_optional_field(&mut form, "url", self.url);
        add_optional_field(&mut form, "url_title", self.url_title);

        form
    }

    /// `application/x-www-form-urlencoded` request body.
    pub fn encode(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.form())
            .finish()
    }

    /// Send [`Notification`] to Pushover.
    pub fn send(&self) -> Result<Sent, NotificationError> {
        self.send_to(&server_url())
    }

    fn send_to(&self, host: &str) -> Result<Sent, NotificationError> {
        self.validate()?;

        let body = self.encode();
        let uri = format!("{host}/1/messages.json");
        debug!(
            "POST {uri} with {:?}",
            self.form().iter().map(|(k, _)| *k).collect::<Vec<_>>()
        );

        let agent = ureq::AgentBuilder::new().timeout(TIMEOUT).build();
        let result = agent
            .post(&uri)
            .set("Content-Type", "application/x-www-form-urlencoded")
            .set("Content-Length", &body.len().to_string())
            .send_string(&body);

        // ureq reports 4xx and 5xx as errors, the response is still there to classify
        let response = match result {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(t)) => {
                return Err(NotificationError::Transport(Box::new(t)))
            }
        };
        classify(response)
    }
}

fn classify(response: ureq::Response) -> Result<Sent, NotificationError> {
    let status = response.status();
    debug!("received HTTP {status}");

    match status {
        200 => {
            let quota = Quota::from_headers(|name| response.header(name));
            let body = response.into_string()?;
            let ack: Acknowledgement = serde_json::from_str(&body)?;
            Ok(Sent {
                request: ack.request,
                quota,
            })
        }
        400..=499 => {
            let body = response.into_string()?;
            let rejection: Rejection = serde_json::from_str(&body)?;
            Err(NotificationError::Client {
                status,
                errors: rejection.errors,
            })
        }
        _ => Err(NotificationError::Server {
            status,
            reason: reason_phrase(status, response.status_text()),
        }),
    }
}
