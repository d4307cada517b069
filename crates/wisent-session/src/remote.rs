use std::path::Path;

use url::Url;

use crate::error::SessionError;

/// The external service that publishes datasets into shared memory.
///
/// Requests are plain commands; the service answers with a short text
/// body on success. Nothing here retries.
pub trait ControlPlane {
    /// Load the dataset at `path` into the shared memory region `name`.
    ///
    /// # Errors
    ///
    /// [`SessionError::Remote`] or [`SessionError::Transport`].
    fn load(&self, name: &str, path: &Path, load_csv: bool) -> Result<String, SessionError>;

    /// Drop the service's association with region `name`.
    ///
    /// # Errors
    ///
    /// [`SessionError::Remote`] or [`SessionError::Transport`].
    fn unload(&self, name: &str) -> Result<String, SessionError>;

    /// Unload and delete region `name`, forcing the next load to rebuild
    /// it from the source file.
    ///
    /// # Errors
    ///
    /// [`SessionError::Remote`] or [`SessionError::Transport`].
    fn erase(&self, name: &str) -> Result<String, SessionError>;
}

/// [`ControlPlane`] over the service's HTTP interface.
///
/// ```text
///   GET /load?name=<name>&path=<path>&loadCSV=<bool>
///   GET /unload?name=<name>
///   GET /erase?name=<name>
/// ```
#[derive(Clone, Debug)]
pub struct HttpControlPlane {
    base_url: Url,
    agent: ureq::Agent,
}

impl HttpControlPlane {
    /// A client for the service at `base_url` (scheme and authority only).
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidUrl`] if `base_url` does not parse, is not
    /// http(s), or carries a path.
    pub fn new(base_url: &str) -> Result<Self, SessionError> {
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            agent: ureq::AgentBuilder::new().build(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn get(&self, operation: &'static str, query: &[(&str, &str)]) -> Result<String, SessionError> {
        let mut url = self.base_url.clone();
        url.set_path(operation);
        url.query_pairs_mut().extend_pairs(query);

        tracing::debug!(%url, "sending {operation} request");
        match self.agent.request_url("GET", &url).call() {
            Ok(response) => {
                let status = response.status();
                let body = read_body(operation, response)?;
                tracing::info!(operation, status, body = body.trim(), "service answered");
                Ok(body)
            }
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                Err(SessionError::Remote {
                    operation,
                    status,
                    body,
                })
            }
            Err(ureq::Error::Transport(err)) => Err(SessionError::Transport {
                operation,
                message: err.to_string(),
            }),
        }
    }
}

impl ControlPlane for HttpControlPlane {
    fn load(&self, name: &str, path: &Path, load_csv: bool) -> Result<String, SessionError> {
        let path = path.to_string_lossy();
        let load_csv = if load_csv { "true" } else { "false" };
        self.get("load", &[("name", name), ("path", &*path), ("loadCSV", load_csv)])
    }

    fn unload(&self, name: &str) -> Result<String, SessionError> {
        self.get("unload", &[("name", name)])
    }

    fn erase(&self, name: &str) -> Result<String, SessionError> {
        self.get("erase", &[("name", name)])
    }
}

fn read_body(operation: &'static str, response: ureq::Response) -> Result<String, SessionError> {
    response
        .into_string()
        .map_err(|err| SessionError::Transport {
            operation,
            message: format!("reading response body: {err}"),
        })
}

fn normalize_base_url(raw: &str) -> Result<Url, SessionError> {
    let invalid = |reason: &str| SessionError::InvalidUrl {
        url: raw.to_owned(),
        reason: reason.to_owned(),
    };
    let mut url = Url::parse(raw).map_err(|err| invalid(&err.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(invalid("scheme must be http or https"));
    }
    if url.path() != "/" && !url.path().is_empty() {
        return Err(invalid("must not include a path"));
    }
    url.set_path("/");
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}
