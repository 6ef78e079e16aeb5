pub mod classifier;
pub mod validator;
