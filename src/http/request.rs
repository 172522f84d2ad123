/// Request method, as far as dispatch cares.
///
/// Only `GET` is served; every other verb is carried as [`Method::Other`]
/// and answered with a 404.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET - Retrieve a resource
    Get,
    /// Any other verb
    Other,
}

impl Method {
    /// Classifies a method token by exact, case-sensitive comparison.
    ///
    /// # Example
    ///
    /// ```
    /// # use platbench::http::request::Method;
    /// assert_eq!(Method::from_bytes(b"GET"), Method::Get);
    /// assert_eq!(Method::from_bytes(b"get"), Method::Other);
    /// ```
    #[inline]
    pub fn from_bytes(token: &[u8]) -> Self {
        match token {
            b"GET" => Method::Get,
            _ => Method::Other,
        }
    }
}

/// The fixed set of destinations this server answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// `/plaintext`
    Plaintext,
    /// `/json`
    Json,
    /// Anything else; answered with 404.
    Unknown,
}

impl Route {
    pub const PLAINTEXT_PATH: &'static str = "/plaintext";
    pub const JSON_PATH: &'static str = "/json";

    /// Classifies a request target by exact byte comparison.
    ///
    /// No URL decoding or query handling: `/json?x=1` is [`Route::Unknown`].
    #[inline]
    pub fn from_path(path: &[u8]) -> Self {
        match path {
            b"/plaintext" => Route::Plaintext,
            b"/json" => Route::Json,
            _ => Route::Unknown,
        }
    }
}

/// What the parser extracts from one request head.
///
/// Lives on the stack for a single parse-dispatch-write cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedRequest {
    pub method: Method,
    pub route: Route,
    /// Whether the connection should stay open after the response.
    pub keep_alive: bool,
    /// The request line said `HTTP/1.0`.
    pub http10: bool,
    /// Declared body length. The body follows the head and is discarded.
    pub content_length: u64,
}

impl ParsedRequest {
    /// The route to answer with.
    ///
    /// Known paths are only served to `GET`; other methods fall through to
    /// [`Route::Unknown`].
    #[inline]
    pub fn dispatch_route(&self) -> Route {
        match self.method {
            Method::Get => self.route,
            Method::Other => Route::Unknown,
        }
    }
}
