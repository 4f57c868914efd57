//! Core data model shared by the decoders, the connection driver and the form parser.
//!
//! # Components
//!
//! - **Message Handling** ([`message`]): what the request decoder yields
//!   - [`Message`]: either a parsed header or a payload item
//!   - [`PayloadItem`]: a body chunk or the end-of-body marker
//!   - [`PayloadSize`]: how many body bytes the header announced
//!
//! - **Request Header** ([`header`]): [`RawHeader`], the request line plus header fields
//!
//! - **Form Result** ([`form`]): [`FormFields`], [`FieldValue`], [`FileDescriptor`] and
//!   the terminal [`ParseResult`]
//!
//! - **Error Handling** ([`error`]):
//!   - [`FormError`]: every framing and multipart failure
//!   - [`SendError`]: response sending errors
//!   - [`HttpError`]: top-level error of a connection

mod message;
pub use message::Message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod header;
pub use header::RawHeader;

mod form;
pub use form::FieldValue;
pub use form::FileDescriptor;
pub use form::FormFields;
pub use form::ParseResult;

mod error;
pub use error::FormError;
pub use error::HttpError;
pub use error::SendError;
