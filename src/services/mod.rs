pub mod broadcast;
pub mod gateway_service;
pub mod notify_service;
pub mod templates;
