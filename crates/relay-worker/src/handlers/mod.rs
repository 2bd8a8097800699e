/// Handlers for the relay Lambda functions
pub mod api;
pub mod backups;
pub mod notify;
pub mod pagespeed;
pub mod publish;
pub mod whois;
