//! Serves an upload form on `127.0.0.1:8612` and stores uploaded files.
//!
//! - `GET /` answers a small HTML form
//! - `POST /upload` parses the form, writes files into `$UPLOAD_DIR` (default `upload`)
//!   and answers the fields as JSON
//!
//! ```sh
//! cargo run -p micro-form --example upload_server
//! curl -F title=hello -F doc=@Cargo.toml http://127.0.0.1:8612/upload
//! ```

use std::env;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::{Response, StatusCode, header};
use tokio::net::TcpListener;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use micro_form::connection::{HttpConnection, RequestBody, Transport};
use micro_form::form::parse_form;
use micro_form::handler::Handler;
use micro_form::protocol::{FormError, RawHeader};
use micro_form::sink::DirSink;

const ADDRESS: &str = "127.0.0.1:8612";

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>upload</title></head>
<body>
<form action="/upload" method="post" enctype="multipart/form-data">
    <p><input type="text" name="title" placeholder="title"></p>
    <p><input type="file" name="file" multiple></p>
    <p><button type="submit">upload</button></p>
</form>
</body>
</html>
"#;

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let upload_dir = env::var("UPLOAD_DIR").unwrap_or_else(|_| "upload".to_owned());
    let handler = Arc::new(UploadHandler { upload_dir });

    info!(address = ADDRESS, "start listening");
    let tcp_listener = match TcpListener::bind(ADDRESS).await {
        Ok(tcp_listener) => tcp_listener,
        Err(e) => {
            error!(cause = %e, "bind server error");
            return;
        }
    };

    loop {
        let (tcp_stream, _remote_addr) = match tcp_listener.accept().await {
            Ok(stream_and_addr) => stream_and_addr,
            Err(e) => {
                warn!(cause = %e, "failed to accept");
                continue;
            }
        };

        let handler = Arc::clone(&handler);

        tokio::spawn(async move {
            let (reader, writer) = tcp_stream.into_split();
            let connection = HttpConnection::new(reader, writer);
            match connection.process(handler).await {
                Ok(()) => info!("finished process, connection shutdown"),
                Err(e) => error!("service has error, cause {}, connection shutdown", e),
            }
        });
    }
}

struct UploadHandler {
    upload_dir: String,
}

#[async_trait]
impl<T: Transport + Send> Handler<T> for UploadHandler {
    type Error = FormError;

    async fn call(&self, header: &RawHeader, body: &mut RequestBody<'_, T>) -> Result<Response<Bytes>, Self::Error> {
        match (header.method(), header.path()) {
            ("GET", "/") => Ok(response(StatusCode::OK, "text/html; charset=utf-8", Bytes::from_static(INDEX_HTML.as_bytes()))),

            ("POST", "/upload") => {
                let mut sink = DirSink::new(&self.upload_dir);
                match parse_form(header, body, &mut sink).await {
                    Ok(fields) => {
                        info!(fields = fields.len(), "upload complete");
                        let json = serde_json::to_vec(&fields).map_err(|e| FormError::internal(e.to_string()))?;
                        Ok(response(StatusCode::OK, "application/json", Bytes::from(json)))
                    }
                    Err(e @ (FormError::Config { .. } | FormError::Format { .. })) => {
                        warn!(cause = %e, "reject upload");
                        Ok(response(StatusCode::BAD_REQUEST, "text/plain", Bytes::from(e.to_string())))
                    }
                    Err(e) => Err(e),
                }
            }

            _ => Ok(response(StatusCode::NOT_FOUND, "text/plain", Bytes::from_static(b"404"))),
        }
    }
}

fn response(status: StatusCode, content_type: &'static str, body: Bytes) -> Response<Bytes> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response.headers_mut().insert(header::CONTENT_TYPE, header::HeaderValue::from_static(content_type));
    response
}
