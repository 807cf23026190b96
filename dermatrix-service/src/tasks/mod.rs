pub mod chat_reply;
pub mod classify_lesion;
pub mod lookup_condition;
pub mod normalize_image;
pub mod types;

pub use chat_reply::ChatReplyTask;
pub use classify_lesion::ClassifyLesionTask;
pub use lookup_condition::LookupConditionTask;
pub use normalize_image::NormalizeImageTask;
pub use types::session_keys;
