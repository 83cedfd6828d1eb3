pub mod signup;

pub use signup::{signup_steps, SignupInput, SignupSelectors};
