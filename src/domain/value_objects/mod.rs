pub mod enums;
pub mod forwarding;
pub mod iam;
pub mod operations;
pub mod payloads;
