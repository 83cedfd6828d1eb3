pub mod adb;
pub mod appium;
pub mod traits;

pub use appium::{AppiumBackend, AppiumConfig};
pub use traits::{
    BackendError, Bounds, ElementHandle, LocatorStrategy, RawInput, UiBackend,
};
