//! High-level client API.

use crate::connection::{Connection, ConnectionConfig};
use crate::error::ClientError;
use textrpc_protocol::{Request, Response};

/// How `list_files` walks a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListingMode {
    /// Regular files directly inside the directory.
    #[default]
    Flat,
    /// Every regular file under the tree, as full paths.
    Walk,
    /// Output of the server's recursive listing command.
    Command,
}

impl ListingMode {
    /// Returns the server function implementing this mode.
    pub fn function_name(self) -> &'static str {
        match self {
            ListingMode::Flat => "list_files",
            ListingMode::Walk => "list_files2",
            ListingMode::Command => "list_files3",
        }
    }
}

/// High-level client for textrpc.
#[derive(Debug, Clone)]
pub struct Client {
    conn: Connection,
}

impl Client {
    /// Creates a new client with the given configuration.
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            conn: Connection::new(config),
        }
    }

    /// Returns the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Calls `function` with `args` and returns the raw reply.
    ///
    /// An unknown function is not an error here; check
    /// [`Response::is_unknown_function`].
    pub async fn call<S: AsRef<str>>(
        &self,
        function: &str,
        args: &[S],
    ) -> Result<Response, ClientError> {
        let request = Request::new(function).with_args(args.iter().map(|a| a.as_ref()));
        self.conn.call(&request).await
    }

    async fn call_text<S: AsRef<str>>(
        &self,
        function: &str,
        args: &[S],
    ) -> Result<String, ClientError> {
        Ok(self.call(function, args).await?.into_string())
    }

    /// Returns the usage summary, or the help of one function.
    pub async fn help(&self, function: Option<&str>) -> Result<String, ClientError> {
        let args: Vec<&str> = function.into_iter().collect();
        self.call_text("help", &args).await
    }

    /// Returns the space-separated names of the registered functions.
    pub async fn functions(&self) -> Result<String, ClientError> {
        self.call_text::<&str>("functions", &[]).await
    }

    pub async fn rot13(&self, text: &str) -> Result<String, ClientError> {
        self.call_text("rot13", &[text]).await
    }

    /// Returns the largest even integer among `values`, or the server's error text.
    pub async fn max_even(&self, values: &[&str]) -> Result<String, ClientError> {
        self.call_text("max_even", values).await
    }

    /// Returns the server's call count report.
    pub async fn calls(&self) -> Result<String, ClientError> {
        self.call_text::<&str>("calls", &[]).await
    }

    /// Returns `"True"` or `"False"`.
    pub async fn file_exists(
        &self,
        filename: &str,
        directory: Option<&str>,
    ) -> Result<String, ClientError> {
        let mut args = vec![filename];
        args.extend(directory);
        self.call_text("file_exists", &args).await
    }

    pub async fn list_files(&self, path: &str, mode: ListingMode) -> Result<String, ClientError> {
        self.call_text(mode.function_name(), &[path]).await
    }
}
