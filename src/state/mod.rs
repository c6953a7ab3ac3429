pub mod flow;
pub mod session;
pub mod validation;
