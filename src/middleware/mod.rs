pub mod owner;
pub mod request_id;

pub use owner::{OwnerId, OWNER_ID_HEADER};
pub use request_id::{make_span_with_request_id, request_id_middleware, RequestId, REQUEST_ID_HEADER};
