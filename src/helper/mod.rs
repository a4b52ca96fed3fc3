pub mod admin_helpers;
pub mod member_helpers;
pub mod public_helpers;
pub mod sanitization_helpers;
pub mod validation_helpers;
