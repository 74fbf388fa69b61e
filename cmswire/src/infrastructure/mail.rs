//! Mail transport selection
//!
//! Only the transport choice lives here; delivery is left to the concrete
//! transport the host application plugs in.

use std::path::PathBuf;

use tracing::debug;

use crate::application::{ApplicationError, ApplicationResult};
use crate::config::MailConfig;

const DEFAULT_SMTP_PORT: u16 = 25;
const DEFAULT_SENDMAIL_PATH: &str = "/usr/sbin/sendmail -bs";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailTransport {
    Smtp {
        host: String,
        port: u16,
        username: Option<String>,
        password: Option<String>,
    },
    Sendmail {
        command: PathBuf,
    },
    /// Local `mail()` delivery.
    Direct,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mailer {
    pub transport: MailTransport,
    pub from: Option<String>,
}

impl Mailer {
    /// Build a mailer from configuration. No `[mail]` section means no mailer.
    pub fn from_config(config: Option<&MailConfig>) -> ApplicationResult<Option<Mailer>> {
        let Some(config) = config else {
            debug!("mail: not configured");
            return Ok(None);
        };
        let transport = match config.transport.as_deref().map(str::trim) {
            Some("smtp") => {
                let host = config
                    .host
                    .as_deref()
                    .map(str::trim)
                    .filter(|h| !h.is_empty())
                    .ok_or_else(|| ApplicationError::Config {
                        message: "smtp transport requires mail.host".into(),
                    })?;
                MailTransport::Smtp {
                    host: host.to_string(),
                    port: config.port.unwrap_or(DEFAULT_SMTP_PORT),
                    username: config.username.clone(),
                    password: config.password.clone(),
                }
            }
            Some("sendmail") => MailTransport::Sendmail {
                command: config
                    .sendmail_path
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_SENDMAIL_PATH)),
            },
            Some("mail") | None => MailTransport::Direct,
            Some(other) => {
                return Err(ApplicationError::Config {
                    message: format!("unknown mail transport: {other}"),
                })
            }
        };
        debug!("mail: {:?}", transport);
        Ok(Some(Mailer {
            transport,
            from: config.from.clone(),
        }))
    }
}
