//! Vendor API clients and background services

pub mod chat_client;
pub mod email_client;
pub mod mailer_client;
pub mod messaging_client;
pub mod pim_client;
pub mod token_service;
pub mod tts_client;
