// Context keys shared by the workflow tasks and the HTTP layer
pub mod session_keys {
    /// Base64 of the uploaded file, removed once decoded
    pub const UPLOAD: &str = "upload";
    /// `NormalizedImage`, removed once classified
    pub const NORMALIZED_IMAGE: &str = "normalized_image";
    pub const CLASSIFICATION: &str = "classification";
    pub const REPORT: &str = "report";
    pub const USER_INPUT: &str = "user_input";
    pub const SESSION_ID: &str = "session_id";
}
