pub mod actions;
pub mod dropdown;
pub mod gesture;
pub mod locator;
pub mod text;

pub use actions::{tap, type_text};
pub use dropdown::select_value;
pub use gesture::{press_and_hold, HoldTarget};
pub use locator::resolve;
pub use text::set_text;
