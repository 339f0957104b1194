//! Normalization of view return values.

use axum::http::StatusCode;

use crate::app::App;
use crate::error::ResponseError;
use crate::wrappers::{HeaderList, Response, Status, StatusOrHeaders, ViewReturn};

impl App {
    /// Convert a view's raw result into a [`Response`].
    ///
    /// Tuples are unpacked first: `(body, status_or_headers, headers)`, where
    /// headers in the middle slot mean "no explicit status". The body becomes a
    /// response (text gets the default mimetype, JSON mappings are serialized),
    /// then the status is applied and the headers are appended.
    pub fn make_response(&self, rv: ViewReturn) -> Result<Response, ResponseError> {
        let (body, status, headers) = match rv {
            ViewReturn::Tuple(body, StatusOrHeaders::Status(status), headers) => {
                (*body, Some(status), headers)
            }
            ViewReturn::Tuple(body, StatusOrHeaders::Headers(headers), _) => {
                (*body, None, Some(headers))
            }
            rv => (rv, None, None),
        };

        let mut response = match body {
            ViewReturn::None => return Err(ResponseError::NoReturnValue),
            ViewReturn::Response(response) => response,
            ViewReturn::Text(text) => Response::new(text),
            ViewReturn::Bytes(bytes) => Response::new(bytes),
            ViewReturn::Json(value) => {
                if !(value.is_object() || value.is_array()) {
                    return Err(ResponseError::UnsupportedBody(
                        "JSON bodies must be objects or arrays",
                    ));
                }
                Response::json_with(&value, self.config.json.pretty)?
            }
            ViewReturn::Tuple(..) => {
                return Err(ResponseError::UnsupportedBody("nested tuple"));
            }
        };

        if let Some(status) = status {
            apply_status(&mut response, status)?;
        }
        if let Some(headers) = headers {
            apply_headers(&mut response, headers)?;
        }
        Ok(response)
    }
}

fn apply_status(response: &mut Response, status: Status) -> Result<(), ResponseError> {
    match status {
        Status::Code(code) => {
            let code = StatusCode::from_u16(code)
                .map_err(|_| ResponseError::InvalidStatus(code.to_string()))?;
            response.set_status(code);
            Ok(())
        }
        Status::Line(line) => response.set_status_line(&line),
    }
}

fn apply_headers(response: &mut Response, headers: HeaderList) -> Result<(), ResponseError> {
    if headers.is_empty() {
        return Ok(());
    }
    response.extend_headers(headers)
}
