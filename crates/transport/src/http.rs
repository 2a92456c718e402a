use engine::{Sink, SinkError};
use percent_encoding::{NON_ALPHANUMERIC, percent_encode};
use reqwest::blocking::{Client, RequestBuilder, Response};
use tracing::debug;

/// Route prefix of the companion upload server's delta API.
const API_PREFIX: &str = "/index.php/apps/deltasync/api/0.0.1/upload";

/// Sink that drives the remote upload API.
///
/// Each operation maps to one synchronous request carrying a
/// form-urlencoded body; `done` returns the digest the server computed
/// over the reconstructed file as the raw response body. Credentials are
/// passed through opaquely as HTTP basic auth.
#[derive(Debug)]
pub struct HttpSink {
    client: Client,
    host: String,
    path: String,
    user: String,
    pass: String,
}

impl HttpSink {
    /// Creates a sink for `path` on `host` (scheme included, e.g.
    /// `https://example.org`).
    pub fn new(
        host: impl Into<String>,
        path: impl Into<String>,
        user: impl Into<String>,
        pass: impl Into<String>,
    ) -> Result<Self, SinkError> {
        let client = Client::builder().build().map_err(|err| SinkError::Transport {
            operation: "start",
            source: Box::new(err),
        })?;
        Ok(Self {
            client,
            host: host.into(),
            path: path.into(),
            user: user.into(),
            pass: pass.into(),
        })
    }

    fn url(&self, operation: &str) -> String {
        format!("{}{API_PREFIX}/{operation}/{}", self.host, self.path)
    }

    fn send(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<Response, SinkError> {
        let response = request
            .basic_auth(&self.user, Some(&self.pass))
            .send()
            .map_err(|err| SinkError::Transport {
                operation,
                source: Box::new(err),
            })?;
        if !response.status().is_success() {
            return Err(SinkError::Rejected {
                operation,
                detail: format!("HTTP {}", response.status()),
            });
        }
        Ok(response)
    }
}

impl Sink for HttpSink {
    fn start(&mut self, size: u64) -> Result<(), SinkError> {
        debug!(size, "starting remote transfer");
        self.send(
            "start",
            self.client
                .post(self.url("start"))
                .form(&[("size", size.to_string())]),
        )?;
        Ok(())
    }

    fn move_range(&mut self, from: u64, to: u64, size: u64) -> Result<(), SinkError> {
        debug!(from, to, size, "moving remote bytes");
        self.send(
            "move",
            self.client.patch(self.url("move")).form(&[
                ("from", from.to_string()),
                ("to", to.to_string()),
                ("size", size.to_string()),
            ]),
        )?;
        Ok(())
    }

    fn add(&mut self, offset: u64, data: &[u8]) -> Result<(), SinkError> {
        debug!(offset, len = data.len(), "adding literal bytes");
        let body = format!(
            "start={offset}&size={}&data={}",
            data.len(),
            percent_encode(data, NON_ALPHANUMERIC)
        );
        self.send(
            "add",
            self.client
                .patch(self.url("add"))
                .header("content-type", "application/x-www-form-urlencoded")
                .body(body),
        )?;
        Ok(())
    }

    fn done(&mut self) -> Result<String, SinkError> {
        let response = self.send("done", self.client.post(self.url("done")).body(""))?;
        let digest = response.text().map_err(|err| SinkError::Transport {
            operation: "done",
            source: Box::new(err),
        })?;
        let digest = digest.trim().to_owned();
        debug!(digest = %digest, "remote transfer finished");
        Ok(digest)
    }
}
