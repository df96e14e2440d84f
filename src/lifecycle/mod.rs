pub mod assignment;
pub mod intake;
pub mod machine;
pub mod policy;
pub mod service;
