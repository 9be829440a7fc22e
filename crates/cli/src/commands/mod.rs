pub mod investigate;
pub mod wallet;
