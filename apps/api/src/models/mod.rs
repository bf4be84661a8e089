pub mod assessment;
pub mod engagement;
pub mod token;
