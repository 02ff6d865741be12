//! In-memory `multipart/form-data` bodies.

use bytes::{BufMut, Bytes, BytesMut};
use std::borrow::Cow;
use tower_rest_core::Error;

const DEFAULT_FILE_CONTENT_TYPE: &str = "application/octet-stream";

/// A `multipart/form-data` form built from in-memory values.
///
/// # Examples
///
/// ```
/// use tower_rest::{Form, Part, Request};
///
/// let form = Form::new()
///     .text("title", "report")
///     .part("attachment", Part::bytes(&b"a,b\n1,2\n"[..]).file_name("data.csv").content_type("text/csv"));
///
/// let req = Request::post("https://upload.example.com/").multipart(form).build().unwrap();
/// assert!(req.headers()["content-type"]
///     .to_str()
///     .unwrap()
///     .starts_with("multipart/form-data; boundary="));
/// ```
#[derive(Debug, Clone)]
pub struct Form {
    boundary: String,
    parts: Vec<(Cow<'static, str>, Part)>,
}

/// One field of a [`Form`].
#[derive(Debug, Clone)]
pub struct Part {
    data: Bytes,
    file_name: Option<Cow<'static, str>>,
    content_type: Option<Cow<'static, str>>,
}

impl Form {
    /// Creates an empty form with a random boundary.
    pub fn new() -> Self {
        Self::with_boundary(random_boundary())
    }

    /// Creates an empty form with a fixed boundary.
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            parts: Vec::new(),
        }
    }

    /// Adds a plain text field.
    pub fn text(self, name: impl Into<Cow<'static, str>>, value: impl Into<String>) -> Self {
        self.part(name, Part::text(value))
    }

    /// Adds a file field from bytes already in memory.
    pub fn file(
        self,
        name: impl Into<Cow<'static, str>>,
        file_name: impl Into<Cow<'static, str>>,
        data: impl Into<Bytes>,
    ) -> Self {
        self.part(name, Part::bytes(data).file_name(file_name))
    }

    pub fn part(mut self, name: impl Into<Cow<'static, str>>, part: Part) -> Self {
        self.parts.push((name.into(), part));
        self
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// The `Content-Type` header value announcing this form's boundary.
    ///
    /// The boundary is quoted when it contains a character that is special in
    /// a header parameter value.
    pub fn content_type(&self) -> String {
        if self.boundary.contains(TSPECIALS) {
            format!("multipart/form-data; boundary=\"{}\"", self.boundary)
        } else {
            format!("multipart/form-data; boundary={}", self.boundary)
        }
    }

    /// Encodes the form.
    ///
    /// Fails with [`Error::Build`] if the boundary is unusable or a name,
    /// file name, or content type contains a line break.
    pub fn encode(&self) -> Result<Bytes, Error> {
        validate_boundary(&self.boundary)?;

        let mut out = BytesMut::new();
        for (name, part) in &self.parts {
            check_header_text("field name", name)?;
            out.put_slice(b"--");
            out.put_slice(self.boundary.as_bytes());
            out.put_slice(b"\r\nContent-Disposition: form-data; name=\"");
            out.put_slice(escape_quotes(name).as_bytes());
            out.put_u8(b'"');

            if let Some(file_name) = &part.file_name {
                check_header_text("file name", file_name)?;
                out.put_slice(b"; filename=\"");
                out.put_slice(escape_quotes(file_name).as_bytes());
                out.put_u8(b'"');
            }
            out.put_slice(b"\r\n");

            let content_type = match (&part.content_type, &part.file_name) {
                (Some(content_type), _) => Some(content_type.as_ref()),
                (None, Some(_)) => Some(DEFAULT_FILE_CONTENT_TYPE),
                (None, None) => None,
            };
            if let Some(content_type) = content_type {
                check_header_text("content type", content_type)?;
                out.put_slice(b"Content-Type: ");
                out.put_slice(content_type.as_bytes());
                out.put_slice(b"\r\n");
            }

            out.put_slice(b"\r\n");
            out.put_slice(&part.data);
            out.put_slice(b"\r\n");
        }
        out.put_slice(b"--");
        out.put_slice(self.boundary.as_bytes());
        out.put_slice(b"--\r\n");
        Ok(out.freeze())
    }
}

impl Default for Form {
    fn default() -> Self {
        Self::new()
    }
}

impl Part {
    pub fn text(value: impl Into<String>) -> Self {
        Self::bytes(value.into())
    }

    pub fn bytes(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            file_name: None,
            content_type: None,
        }
    }

    pub fn file_name(mut self, file_name: impl Into<Cow<'static, str>>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Overrides the part's content type. File parts default to
    /// `application/octet-stream`, text parts carry none.
    pub fn content_type(mut self, content_type: impl Into<Cow<'static, str>>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

fn random_boundary() -> String {
    let bytes: [u8; 30] = rand::random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// RFC 2046: 1 to 70 characters, no trailing space.
/// Characters RFC 2045 forbids in an unquoted parameter value.
const TSPECIALS: [char; 16] = [
    '(', ')', '<', '>', '@', ',', ';', ':', '\\', '"', '/', '[', ']', '?', '=', ' ',
];

fn validate_boundary(boundary: &str) -> Result<(), Error> {
    let valid_char = |c: char| {
        c.is_ascii_alphanumeric() || "'()+_,-./:=? ".contains(c)
    };
    if boundary.is_empty()
        || boundary.len() > 70
        || boundary.ends_with(' ')
        || !boundary.chars().all(valid_char)
    {
        return Err(Error::build(format!(
            "invalid multipart boundary {boundary:?}"
        )));
    }
    Ok(())
}

fn check_header_text(what: &str, value: &str) -> Result<(), Error> {
    if value.contains(['\r', '\n']) {
        return Err(Error::build(format!(
            "multipart {what} {value:?} contains a line break"
        )));
    }
    Ok(())
}

fn escape_quotes(value: &str) -> Cow<'_, str> {
    if value.contains(['\\', '"']) {
        Cow::Owned(value.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        Cow::Borrowed(value)
    }
}
