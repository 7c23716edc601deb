pub mod ip_extraction;
pub mod ssrf_validation;
pub mod upload;
