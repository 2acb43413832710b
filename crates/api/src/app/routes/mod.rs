pub mod portal;
pub mod session;
pub mod system;
