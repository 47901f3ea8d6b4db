use bytes::Bytes;

/// A published resource, immutable once the registry is built.
///
/// Content is held as [`Bytes`] so handlers can write it to a transport
/// without copying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    path: String,
    content: Bytes,
    magic: Option<String>,
    reserved: bool,
}

impl Resource {
    pub fn new(path: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            magic: None,
            reserved: false,
        }
    }

    /// Attach a magic token that selects this resource over the byte-stream protocol
    pub fn with_magic(mut self, magic: impl Into<String>) -> Self {
        self.magic = Some(magic.into());
        self
    }

    pub fn reserved(mut self, reserved: bool) -> Self {
        self.reserved = reserved;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn magic(&self) -> Option<&str> {
        self.magic.as_deref()
    }

    pub fn is_reserved(&self) -> bool {
        self.reserved
    }

    /// Guess a `Content-Type` from the path's extension.
    ///
    /// Paths ending in `/` are treated as directory indexes and served as HTML.
    pub fn content_type(&self) -> &'static str {
        if self.path.ends_with('/') {
            return "text/html; charset=utf-8";
        }

        let extension = self
            .path
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("html") | Some("htm") => "text/html; charset=utf-8",
            Some("txt") => "text/plain; charset=utf-8",
            Some("css") => "text/css",
            Some("js") => "application/javascript",
            Some("json") => "application/json",
            Some("png") => "image/png",
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("apk") => "application/vnd.android.package-archive",
            Some("jar") => "application/java-archive",
            _ => "application/octet-stream",
        }
    }
}
