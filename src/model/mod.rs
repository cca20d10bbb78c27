pub mod quote;
pub mod tick;
